//! Schema bootstrap from the entity definitions
//!
//! Tables are created in foreign-key order with `IF NOT EXISTS`, so running
//! this against an already-migrated database is a no-op.

use crate::db::models::*;
use crate::errors::Result;
use sea_orm::sea_query::{Index, IndexCreateStatement};
use sea_orm::{ConnectionTrait, DatabaseConnection, EntityTrait, Schema};
use tracing::info;

/// Create every table and index used by the services
pub async fn create_schema(db: &DatabaseConnection) -> Result<()> {
    create_table(db, UserEntity).await?;
    create_table(db, WorkspaceEntity).await?;
    create_table(db, MemberEntity).await?;
    create_table(db, InviteEntity).await?;
    create_table(db, DocumentEntity).await?;
    create_table(db, ChunkEntity).await?;
    create_table(db, NotificationEntity).await?;
    create_table(db, ChatQueryEntity).await?;

    let indexes: Vec<IndexCreateStatement> = vec![
        Index::create()
            .name("idx_workspace_members_workspace_user")
            .table(MemberEntity)
            .col(MemberColumn::WorkspaceId)
            .col(MemberColumn::UserId)
            .unique()
            .if_not_exists()
            .to_owned(),
        Index::create()
            .name("idx_documents_workspace")
            .table(DocumentEntity)
            .col(DocumentColumn::WorkspaceId)
            .if_not_exists()
            .to_owned(),
        Index::create()
            .name("idx_document_chunks_document")
            .table(ChunkEntity)
            .col(ChunkColumn::DocumentId)
            .if_not_exists()
            .to_owned(),
        Index::create()
            .name("idx_notifications_user")
            .table(NotificationEntity)
            .col(NotificationColumn::UserId)
            .if_not_exists()
            .to_owned(),
        Index::create()
            .name("idx_chat_queries_workspace_created")
            .table(ChatQueryEntity)
            .col(ChatQueryColumn::WorkspaceId)
            .col(ChatQueryColumn::CreatedAt)
            .if_not_exists()
            .to_owned(),
    ];

    let backend = db.get_database_backend();
    for index in indexes {
        db.execute(backend.build(&index)).await?;
    }

    info!("Database schema ready");
    Ok(())
}

async fn create_table<E: EntityTrait>(db: &DatabaseConnection, entity: E) -> Result<()> {
    let backend = db.get_database_backend();
    let schema = Schema::new(backend);
    let mut stmt = schema.create_table_from_entity(entity);
    stmt.if_not_exists();
    db.execute(backend.build(&stmt)).await?;
    Ok(())
}
