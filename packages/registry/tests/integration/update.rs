use registry::RegistryError;
use registry::models::file::UpdateFileParams;

use crate::common::{TestDb, file_params, hashed_params};

#[tokio::test]
async fn patches_metadata_fields() {
    let t = TestDb::new().await;
    let files = t.registry("user1");
    let record = files.create(hashed_params("draft.pdf", "h1", 10)).await.unwrap();

    let updated = files
        .update(
            &record.id,
            UpdateFileParams {
                name: Some("final.pdf".into()),
                size: Some(20),
                metadata: Some(serde_json::json!({ "reviewed": true })),
                ..Default::default()
            },
        )
        .await
        .unwrap()
        .unwrap();

    assert_eq!(updated.name, "final.pdf");
    assert_eq!(updated.size, 20);
    assert_eq!(updated.metadata, Some(serde_json::json!({ "reviewed": true })));
    assert_eq!(updated.user_id, "user1");
    assert_eq!(updated.file_hash.as_deref(), Some("h1"));
    assert!(updated.updated_at >= record.updated_at);
    assert_eq!(updated.created_at, record.created_at);

    let stored = files.find_by_id(&record.id).await.unwrap();
    assert_eq!(stored.name, "final.pdf");
}

#[tokio::test]
async fn other_users_record_is_not_updated() {
    let t = TestDb::new().await;
    let record = t
        .registry("user2")
        .create(file_params("theirs.pdf", "application/pdf", 1))
        .await
        .unwrap();

    let result = t
        .registry("user1")
        .update(
            &record.id,
            UpdateFileParams {
                name: Some("hijacked.pdf".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    assert!(result.is_none());
    let stored = t.registry("user2").find_by_id(&record.id).await.unwrap();
    assert_eq!(stored.name, "theirs.pdf");
}

#[tokio::test]
async fn missing_record_is_a_no_op() {
    let t = TestDb::new().await;
    let result = t
        .registry("user1")
        .update("missing", UpdateFileParams::default())
        .await
        .unwrap();
    assert!(result.is_none());
}

#[tokio::test]
async fn empty_patch_returns_record_unchanged() {
    let t = TestDb::new().await;
    let files = t.registry("user1");
    let record = files.create(file_params("a.pdf", "application/pdf", 1)).await.unwrap();

    let same = files
        .update(&record.id, UpdateFileParams::default())
        .await
        .unwrap()
        .unwrap();

    assert_eq!(same, record);
}

#[tokio::test]
async fn blank_name_is_rejected() {
    let t = TestDb::new().await;
    let files = t.registry("user1");
    let record = files.create(file_params("a.pdf", "application/pdf", 1)).await.unwrap();

    let err = files
        .update(
            &record.id,
            UpdateFileParams {
                name: Some(" ".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();

    assert!(matches!(err, RegistryError::Constraint(_)));
    assert_eq!(files.find_by_id(&record.id).await.unwrap().name, "a.pdf");
}
