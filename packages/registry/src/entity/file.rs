use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "file")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    /// Owner. Never changes after insert.
    #[sea_orm(indexed)]
    pub user_id: String,

    /// MIME type.
    pub file_type: String,

    #[sea_orm(indexed)]
    pub file_hash: Option<String>,
    #[sea_orm(belongs_to, from = "file_hash", to = "hash_id")]
    pub global_file: HasOne<super::global_file::Entity>,

    /// Display name.
    pub name: String,

    /// Logical size; duplicates of one blob each count in full.
    pub size: i64,

    #[sea_orm(column_type = "Text")]
    pub url: String,

    #[sea_orm(column_type = "JsonBinary", nullable)]
    pub metadata: Option<serde_json::Value>,

    #[sea_orm(has_many)]
    pub knowledge_base_files: HasMany<super::knowledge_base_file::Entity>,

    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
    pub accessed_at: DateTimeUtc,
}

impl ActiveModelBehavior for ActiveModel {}
