//! Document chunk with its embedding

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "document_chunks")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    pub document_id: Uuid,

    #[sea_orm(column_type = "Text")]
    pub content: String,

    /// Embedding serialized as a JSON array of floats
    #[sea_orm(column_type = "Text")]
    pub embedding: String,

    pub chunk_index: i32,

    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::document::Entity",
        from = "Column::DocumentId",
        to = "super::document::Column::Id",
        on_delete = "Cascade"
    )]
    Document,
}

impl Related<super::document::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Document.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

/// Serialize an embedding for storage
pub fn encode_embedding(embedding: &[f32]) -> String {
    // A float slice always serializes
    serde_json::to_string(embedding).unwrap_or_else(|_| "[]".to_string())
}

/// Decode a stored embedding; fails when the text is not a float array
pub fn decode_embedding(stored: &str) -> Result<Vec<f32>, serde_json::Error> {
    serde_json::from_str(stored)
}
