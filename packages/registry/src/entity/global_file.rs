use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// One physically stored blob, shared by every file record carrying its hash.
#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "global_file")]
pub struct Model {
    /// Content hash (hex SHA-256 in practice, opaque to the registry).
    #[sea_orm(primary_key, auto_increment = false)]
    pub hash_id: String,

    /// MIME type of the blob.
    pub file_type: String,

    pub size: i64,

    /// Opaque storage location.
    #[sea_orm(column_type = "Text")]
    pub url: String,

    #[sea_orm(column_type = "JsonBinary", nullable)]
    pub metadata: Option<serde_json::Value>,

    /// User that first uploaded the blob, if known.
    pub creator: Option<String>,

    #[sea_orm(has_many)]
    pub files: HasMany<super::file::Entity>,

    pub created_at: DateTimeUtc,
    pub accessed_at: DateTimeUtc,
}

impl ActiveModelBehavior for ActiveModel {}
