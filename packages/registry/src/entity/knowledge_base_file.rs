use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Link between a file record and a knowledge base owned elsewhere.
#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "knowledge_base_file")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub knowledge_base_id: String,
    #[sea_orm(primary_key, auto_increment = false)]
    pub file_id: String,
    #[sea_orm(belongs_to, from = "file_id", to = "id")]
    pub file: HasOne<super::file::Entity>,

    pub created_at: DateTimeUtc,
}

impl ActiveModelBehavior for ActiveModel {}
