use registry::RegistryError;
use registry::models::file::CreateFileParams;

use crate::common::{TestDb, file_params, global_entry, hashed_params};

mod create_file {
    use super::*;

    #[tokio::test]
    async fn fresh_hash_creates_global_entry() {
        let t = TestDb::new().await;
        let files = t.registry("user1");

        let record = files.create(hashed_params("report.pdf", "h-fresh", 2048)).await.unwrap();

        assert_eq!(record.user_id, "user1");
        assert_eq!(record.file_hash.as_deref(), Some("h-fresh"));
        assert_eq!(files.count_files_by_hash("h-fresh").await.unwrap(), 1);

        let check = files.check_hash("h-fresh").await.unwrap();
        assert!(check.exists);
        assert_eq!(check.file_type.as_deref(), Some("application/pdf"));
        assert_eq!(check.size, Some(2048));
        assert_eq!(check.url.as_deref(), Some("s3://bucket/report.pdf"));

        let entry = t.global_file("h-fresh").await.unwrap();
        assert_eq!(entry.creator.as_deref(), Some("user1"));
    }

    #[tokio::test]
    async fn unknown_hash_without_entry_data_is_rejected() {
        let t = TestDb::new().await;
        let files = t.registry("user1");

        let params = CreateFileParams {
            id: Some("orphan-ref".into()),
            file_hash: Some("h-missing".into()),
            ..file_params("a.pdf", "application/pdf", 10)
        };
        let err = files.create(params).await.unwrap_err();

        assert!(matches!(err, RegistryError::Constraint(_)), "got {err:?}");
        assert!(!t.file_exists("orphan-ref").await);
        assert!(t.global_file("h-missing").await.is_none());
    }

    #[tokio::test]
    async fn existing_hash_is_shared_not_duplicated() {
        let t = TestDb::new().await;
        files_with_shared_hash(&t).await;

        let check = t.registry("user1").check_hash("h-shared").await.unwrap();
        assert!(check.exists);
        // First upload's entry data wins.
        assert_eq!(check.size, Some(100));
        assert_eq!(
            t.registry("user1").count_files_by_hash("h-shared").await.unwrap(),
            2
        );
    }

    async fn files_with_shared_hash(t: &TestDb) {
        t.registry("user1")
            .create(hashed_params("one.pdf", "h-shared", 100))
            .await
            .unwrap();
        let params = CreateFileParams {
            file_hash: Some("h-shared".into()),
            ..file_params("two.pdf", "application/pdf", 999)
        };
        t.registry("user2").create(params).await.unwrap();
    }

    #[tokio::test]
    async fn explicit_and_generated_ids() {
        let t = TestDb::new().await;
        let files = t.registry("user1");

        let explicit = files
            .create(CreateFileParams {
                id: Some("my-id".into()),
                ..file_params("a.txt", "text/plain", 1)
            })
            .await
            .unwrap();
        assert_eq!(explicit.id, "my-id");

        let generated = files.create(file_params("b.txt", "text/plain", 1)).await.unwrap();
        assert!(generated.id.starts_with("file_"));
        assert_ne!(generated.id, explicit.id);
    }

    #[tokio::test]
    async fn knowledge_base_link_is_created_with_record() {
        let t = TestDb::new().await;
        let files = t.registry("user1");

        let record = files
            .create(CreateFileParams {
                knowledge_base_id: Some("kb1".into()),
                ..file_params("notes.md", "text/markdown", 5)
            })
            .await
            .unwrap();

        assert_eq!(t.association_count(&record.id).await, 1);
    }

    #[tokio::test]
    async fn empty_name_is_rejected() {
        let t = TestDb::new().await;
        let err = t
            .registry("user1")
            .create(file_params("   ", "text/plain", 1))
            .await
            .unwrap_err();
        assert!(matches!(err, RegistryError::Constraint(_)));
    }
}

mod global_files {
    use super::*;

    #[tokio::test]
    async fn create_global_file_is_idempotent() {
        let t = TestDb::new().await;
        let files = t.registry("user1");

        let first = files.create_global_file(global_entry("h1")).await.unwrap();
        let mut again = global_entry("h1");
        again.size = 7;
        let second = files.create_global_file(again).await.unwrap();

        assert_eq!(first.hash_id, "h1");
        assert_eq!(second.size, 1024);
        assert_eq!(files.count_files_by_hash("h1").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn check_hash_reports_missing_and_present() {
        let t = TestDb::new().await;
        let files = t.registry("user1");

        let missing = files.check_hash("nope").await.unwrap();
        assert!(!missing.exists);
        assert!(missing.url.is_none());

        files.create_global_file(global_entry("h2")).await.unwrap();
        let present = files.check_hash("h2").await.unwrap();
        assert!(present.exists);
        assert_eq!(present.metadata, Some(serde_json::json!({ "pages": 3 })));
    }

    #[tokio::test]
    async fn record_can_reference_directly_created_entry() {
        let t = TestDb::new().await;
        let files = t.registry("user1");
        files.create_global_file(global_entry("h3")).await.unwrap();

        let record = files
            .create(CreateFileParams {
                file_hash: Some("h3".into()),
                ..file_params("x.pdf", "application/pdf", 1024)
            })
            .await
            .unwrap();

        assert_eq!(record.file_hash.as_deref(), Some("h3"));
        assert_eq!(files.count_files_by_hash("h3").await.unwrap(), 1);
    }
}
