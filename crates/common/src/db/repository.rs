//! Repository pattern for database operations
//!
//! Provides a clean interface for all data access operations
//! with proper error handling and transaction support.

use crate::db::models::*;
use crate::db::DbPool;
use crate::errors::{AppError, Result};
use chrono::{DateTime, Utc};
use sea_orm::sea_query::{Expr, Query};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, Set, SqlErr, TransactionTrait,
};
use serde::Serialize;
use uuid::Uuid;

/// Chunk loaded for similarity search, with its document name
#[derive(Debug, Clone)]
pub struct RetrievedChunk {
    pub chunk_id: Uuid,
    pub document_id: Uuid,
    pub document_name: String,
    pub content: String,
    pub chunk_index: i32,
    /// Serialized embedding as stored
    pub embedding: String,
}

/// Workspace as seen by one of its members
#[derive(Debug, Clone, Serialize)]
pub struct WorkspaceSummary {
    pub workspace: Workspace,
    pub role: Role,
    pub member_count: u64,
    pub document_count: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct MemberWithUser {
    pub member: Member,
    pub user: User,
}

#[derive(Debug, Clone, Serialize)]
pub struct DocumentStatus {
    pub document: Document,
    pub chunk_count: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct NotificationWithWorkspace {
    pub notification: Notification,
    pub workspace_name: Option<String>,
}

/// Repository for data access operations
#[derive(Clone)]
pub struct Repository {
    pool: DbPool,
}

impl Repository {
    /// Create a new repository with the given connection pool
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Get the read connection
    fn read_conn(&self) -> &DatabaseConnection {
        self.pool.read()
    }

    /// Get the write connection
    fn write_conn(&self) -> &DatabaseConnection {
        self.pool.write()
    }

    // ========================================================================
    // Health Check
    // ========================================================================

    /// Ping the database
    pub async fn ping(&self) -> Result<()> {
        self.pool.ping().await
    }

    // ========================================================================
    // User Operations
    // ========================================================================

    /// Find user by ID
    pub async fn find_user_by_id(&self, id: Uuid) -> Result<Option<User>> {
        UserEntity::find_by_id(id)
            .one(self.read_conn())
            .await
            .map_err(Into::into)
    }

    /// Find user by (normalized) email
    pub async fn find_user_by_email(&self, email: &str) -> Result<Option<User>> {
        UserEntity::find()
            .filter(UserColumn::Email.eq(normalize_email(email)))
            .one(self.write_conn())
            .await
            .map_err(Into::into)
    }

    /// Return the user for an email, creating it on first sight
    pub async fn ensure_user(
        &self,
        id: Option<Uuid>,
        email: &str,
        name: Option<String>,
        image: Option<String>,
    ) -> Result<User> {
        let email = normalize_email(email);

        if let Some(user) = self.find_user_by_email(&email).await? {
            return Ok(user);
        }

        let now = Utc::now();
        let user = UserActiveModel {
            id: Set(id.unwrap_or_else(Uuid::new_v4)),
            name: Set(name),
            email: Set(email.clone()),
            image: Set(image),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
        };

        match user.insert(self.write_conn()).await {
            Ok(user) => {
                tracing::info!(user_id = %user.id, "Provisioned user");
                Ok(user)
            }
            // A concurrent first request may have inserted the same email
            Err(err) => self
                .find_user_by_email(&email)
                .await?
                .ok_or(AppError::Database(err)),
        }
    }

    /// Update a user's display name
    pub async fn update_user_name(&self, id: Uuid, name: String) -> Result<User> {
        let mut user: UserActiveModel = UserEntity::find_by_id(id)
            .one(self.write_conn())
            .await?
            .ok_or_else(|| AppError::NotFound {
                resource_type: "user".into(),
                id: id.to_string(),
            })?
            .into();

        user.name = Set(Some(name));
        user.updated_at = Set(Utc::now().into());
        user.update(self.write_conn()).await.map_err(Into::into)
    }

    /// Highest role the user holds in any workspace
    pub async fn highest_role(&self, user_id: Uuid) -> Result<Option<Role>> {
        let memberships = MemberEntity::find()
            .filter(MemberColumn::UserId.eq(user_id))
            .all(self.read_conn())
            .await?;

        Ok(memberships.iter().map(Member::role).max())
    }

    // ========================================================================
    // Workspace Operations
    // ========================================================================

    /// Create a workspace and make the creator its owner
    pub async fn create_workspace(
        &self,
        owner_id: Uuid,
        name: String,
        company_id: String,
        description: Option<String>,
    ) -> Result<Workspace> {
        let taken = WorkspaceEntity::find()
            .filter(WorkspaceColumn::CompanyId.eq(company_id.as_str()))
            .one(self.write_conn())
            .await?;

        if taken.is_some() {
            return Err(company_id_taken(&company_id));
        }

        self.insert_owned_workspace(owner_id, name, company_id, description)
            .await
    }

    /// Insert the workspace and its owner membership in one transaction.
    /// A concurrent create that wins the unique index surfaces as a conflict.
    async fn insert_owned_workspace(
        &self,
        owner_id: Uuid,
        name: String,
        company_id: String,
        description: Option<String>,
    ) -> Result<Workspace> {
        let now = Utc::now();
        let workspace_id = Uuid::new_v4();
        let txn = self.write_conn().begin().await?;

        let workspace = WorkspaceActiveModel {
            id: Set(workspace_id),
            name: Set(name),
            company_id: Set(company_id.clone()),
            description: Set(description),
            owner_id: Set(owner_id),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
        }
        .insert(&txn)
        .await
        .map_err(|e| conflict_on_unique(e, || company_id_taken(&company_id)))?;

        MemberActiveModel {
            id: Set(Uuid::new_v4()),
            workspace_id: Set(workspace_id),
            user_id: Set(owner_id),
            role: Set(Role::Owner.as_str().to_string()),
            joined_at: Set(now.into()),
        }
        .insert(&txn)
        .await?;

        txn.commit().await?;
        Ok(workspace)
    }

    /// Find workspace by ID
    pub async fn find_workspace(&self, id: Uuid) -> Result<Option<Workspace>> {
        WorkspaceEntity::find_by_id(id)
            .one(self.read_conn())
            .await
            .map_err(Into::into)
    }

    /// Workspaces the user belongs to, with their role and counts
    pub async fn list_workspaces_for_user(&self, user_id: Uuid) -> Result<Vec<WorkspaceSummary>> {
        let memberships = MemberEntity::find()
            .filter(MemberColumn::UserId.eq(user_id))
            .find_also_related(WorkspaceEntity)
            .order_by_asc(MemberColumn::JoinedAt)
            .all(self.read_conn())
            .await?;

        let mut summaries = Vec::with_capacity(memberships.len());
        for (member, workspace) in memberships {
            let Some(workspace) = workspace else { continue };
            let member_count = self.count_members(workspace.id).await?;
            let document_count = self.count_documents(workspace.id).await?;
            summaries.push(WorkspaceSummary {
                role: member.role(),
                workspace,
                member_count,
                document_count,
            });
        }

        Ok(summaries)
    }

    /// Update workspace name and/or description
    pub async fn update_workspace(
        &self,
        id: Uuid,
        name: Option<String>,
        description: Option<String>,
    ) -> Result<Workspace> {
        let mut workspace: WorkspaceActiveModel = WorkspaceEntity::find_by_id(id)
            .one(self.write_conn())
            .await?
            .ok_or_else(|| AppError::WorkspaceNotFound { id: id.to_string() })?
            .into();

        if let Some(name) = name {
            workspace.name = Set(name);
        }
        if let Some(description) = description {
            workspace.description = Set(Some(description));
        }
        workspace.updated_at = Set(Utc::now().into());

        workspace.update(self.write_conn()).await.map_err(Into::into)
    }

    /// Delete a workspace with everything it owns.
    ///
    /// Notifications survive with their workspace reference cleared.
    pub async fn delete_workspace(&self, id: Uuid) -> Result<bool> {
        let txn = self.write_conn().begin().await?;

        NotificationEntity::update_many()
            .col_expr(NotificationColumn::WorkspaceId, Expr::value(None::<Uuid>))
            .filter(NotificationColumn::WorkspaceId.eq(id))
            .exec(&txn)
            .await?;

        ChunkEntity::delete_many()
            .filter(
                ChunkColumn::DocumentId.in_subquery(
                    Query::select()
                        .column(DocumentColumn::Id)
                        .from(DocumentEntity)
                        .and_where(DocumentColumn::WorkspaceId.eq(id))
                        .to_owned(),
                ),
            )
            .exec(&txn)
            .await?;

        DocumentEntity::delete_many()
            .filter(DocumentColumn::WorkspaceId.eq(id))
            .exec(&txn)
            .await?;
        ChatQueryEntity::delete_many()
            .filter(ChatQueryColumn::WorkspaceId.eq(id))
            .exec(&txn)
            .await?;
        InviteEntity::delete_many()
            .filter(InviteColumn::WorkspaceId.eq(id))
            .exec(&txn)
            .await?;
        MemberEntity::delete_many()
            .filter(MemberColumn::WorkspaceId.eq(id))
            .exec(&txn)
            .await?;

        let result = WorkspaceEntity::delete_by_id(id).exec(&txn).await?;
        txn.commit().await?;

        Ok(result.rows_affected > 0)
    }

    // ========================================================================
    // Membership Operations
    // ========================================================================

    /// Find a user's membership in a workspace
    pub async fn find_membership(&self, workspace_id: Uuid, user_id: Uuid) -> Result<Option<Member>> {
        MemberEntity::find()
            .filter(MemberColumn::WorkspaceId.eq(workspace_id))
            .filter(MemberColumn::UserId.eq(user_id))
            .one(self.read_conn())
            .await
            .map_err(Into::into)
    }

    /// Resolve a workspace for a member.
    ///
    /// Non-members get the same error as for a missing workspace.
    pub async fn require_member(&self, workspace_id: Uuid, user_id: Uuid) -> Result<(Workspace, Member)> {
        let not_found = || AppError::WorkspaceNotFound {
            id: workspace_id.to_string(),
        };

        let workspace = self.find_workspace(workspace_id).await?.ok_or_else(not_found)?;
        let member = self
            .find_membership(workspace_id, user_id)
            .await?
            .ok_or_else(not_found)?;

        Ok((workspace, member))
    }

    /// Find a membership row by its ID within a workspace
    pub async fn find_member_by_id(&self, workspace_id: Uuid, member_id: Uuid) -> Result<Option<Member>> {
        MemberEntity::find_by_id(member_id)
            .filter(MemberColumn::WorkspaceId.eq(workspace_id))
            .one(self.read_conn())
            .await
            .map_err(Into::into)
    }

    /// Members of a workspace with their user records
    pub async fn list_members(&self, workspace_id: Uuid) -> Result<Vec<MemberWithUser>> {
        let rows = MemberEntity::find()
            .filter(MemberColumn::WorkspaceId.eq(workspace_id))
            .find_also_related(UserEntity)
            .order_by_asc(MemberColumn::JoinedAt)
            .all(self.read_conn())
            .await?;

        Ok(rows
            .into_iter()
            .filter_map(|(member, user)| user.map(|user| MemberWithUser { member, user }))
            .collect())
    }

    /// User IDs of every member of a workspace
    pub async fn member_user_ids(&self, workspace_id: Uuid) -> Result<Vec<Uuid>> {
        let members = MemberEntity::find()
            .filter(MemberColumn::WorkspaceId.eq(workspace_id))
            .all(self.read_conn())
            .await?;

        Ok(members.into_iter().map(|m| m.user_id).collect())
    }

    /// Count members of a workspace
    pub async fn count_members(&self, workspace_id: Uuid) -> Result<u64> {
        MemberEntity::find()
            .filter(MemberColumn::WorkspaceId.eq(workspace_id))
            .count(self.read_conn())
            .await
            .map_err(Into::into)
    }

    /// Whether a user with this email already belongs to the workspace
    pub async fn is_member_email(&self, workspace_id: Uuid, email: &str) -> Result<bool> {
        let found = MemberEntity::find()
            .inner_join(UserEntity)
            .filter(MemberColumn::WorkspaceId.eq(workspace_id))
            .filter(UserColumn::Email.eq(normalize_email(email)))
            .one(self.read_conn())
            .await?;

        Ok(found.is_some())
    }

    /// Change a member's role
    pub async fn update_member_role(&self, member: Member, role: Role) -> Result<Member> {
        let mut active: MemberActiveModel = member.into();
        active.role = Set(role.as_str().to_string());
        active.update(self.write_conn()).await.map_err(Into::into)
    }

    /// Remove a membership
    pub async fn remove_member(&self, member_id: Uuid) -> Result<bool> {
        let result = MemberEntity::delete_by_id(member_id)
            .exec(self.write_conn())
            .await?;

        Ok(result.rows_affected > 0)
    }

    // ========================================================================
    // Invite Operations
    // ========================================================================

    /// Store a new invitation
    pub async fn create_invite(
        &self,
        workspace_id: Uuid,
        email: &str,
        role: Role,
        invited_by: Uuid,
        token: String,
        expires_at: DateTime<Utc>,
    ) -> Result<Invite> {
        let invite = InviteActiveModel {
            id: Set(Uuid::new_v4()),
            workspace_id: Set(workspace_id),
            email: Set(normalize_email(email)),
            role: Set(role.as_str().to_string()),
            token: Set(token),
            invited_by: Set(invited_by),
            accepted: Set(false),
            expires_at: Set(expires_at.into()),
            created_at: Set(Utc::now().into()),
        };

        invite.insert(self.write_conn()).await.map_err(Into::into)
    }

    /// Unaccepted, unexpired invitation for an email
    pub async fn find_live_invite(&self, workspace_id: Uuid, email: &str) -> Result<Option<Invite>> {
        let now: sea_orm::prelude::DateTimeWithTimeZone = Utc::now().into();

        InviteEntity::find()
            .filter(InviteColumn::WorkspaceId.eq(workspace_id))
            .filter(InviteColumn::Email.eq(normalize_email(email)))
            .filter(InviteColumn::Accepted.eq(false))
            .filter(InviteColumn::ExpiresAt.gt(now))
            .one(self.read_conn())
            .await
            .map_err(Into::into)
    }

    /// Pending (unaccepted) invitations for a workspace, newest first
    pub async fn list_invites(&self, workspace_id: Uuid) -> Result<Vec<Invite>> {
        InviteEntity::find()
            .filter(InviteColumn::WorkspaceId.eq(workspace_id))
            .filter(InviteColumn::Accepted.eq(false))
            .order_by_desc(InviteColumn::CreatedAt)
            .all(self.read_conn())
            .await
            .map_err(Into::into)
    }

    /// Find invitation by token
    pub async fn find_invite_by_token(&self, token: &str) -> Result<Option<Invite>> {
        InviteEntity::find()
            .filter(InviteColumn::Token.eq(token))
            .one(self.read_conn())
            .await
            .map_err(Into::into)
    }

    /// Add the user as a member and mark the invitation accepted, atomically
    pub async fn accept_invite(&self, invite: Invite, user_id: Uuid) -> Result<Member> {
        let role = Role::parse(&invite.role).unwrap_or(Role::Member);
        let txn = self.write_conn().begin().await?;

        let member = MemberActiveModel {
            id: Set(Uuid::new_v4()),
            workspace_id: Set(invite.workspace_id),
            user_id: Set(user_id),
            role: Set(role.as_str().to_string()),
            joined_at: Set(Utc::now().into()),
        }
        .insert(&txn)
        .await?;

        let mut active: InviteActiveModel = invite.into();
        active.accepted = Set(true);
        active.update(&txn).await?;

        txn.commit().await?;
        Ok(member)
    }

    // ========================================================================
    // Document Operations
    // ========================================================================

    /// Create a document record (unprocessed)
    pub async fn create_document(
        &self,
        workspace_id: Uuid,
        name: String,
        url: String,
        size: i64,
        mime_type: String,
        uploaded_by: Uuid,
    ) -> Result<Document> {
        let now = Utc::now();

        let document = DocumentActiveModel {
            id: Set(Uuid::new_v4()),
            workspace_id: Set(workspace_id),
            name: Set(name),
            url: Set(url),
            size: Set(size),
            mime_type: Set(mime_type),
            uploaded_by: Set(uploaded_by),
            processed: Set(false),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
        };

        document.insert(self.write_conn()).await.map_err(Into::into)
    }

    /// Find a document within a workspace
    pub async fn find_document(&self, workspace_id: Uuid, id: Uuid) -> Result<Option<Document>> {
        DocumentEntity::find_by_id(id)
            .filter(DocumentColumn::WorkspaceId.eq(workspace_id))
            .one(self.read_conn())
            .await
            .map_err(Into::into)
    }

    /// Documents of a workspace, newest first
    pub async fn list_documents(&self, workspace_id: Uuid) -> Result<Vec<Document>> {
        DocumentEntity::find()
            .filter(DocumentColumn::WorkspaceId.eq(workspace_id))
            .order_by_desc(DocumentColumn::CreatedAt)
            .all(self.read_conn())
            .await
            .map_err(Into::into)
    }

    /// Count documents of a workspace
    pub async fn count_documents(&self, workspace_id: Uuid) -> Result<u64> {
        DocumentEntity::find()
            .filter(DocumentColumn::WorkspaceId.eq(workspace_id))
            .count(self.read_conn())
            .await
            .map_err(Into::into)
    }

    /// Documents with their stored chunk counts
    pub async fn document_statuses(&self, workspace_id: Uuid) -> Result<Vec<DocumentStatus>> {
        let documents = self.list_documents(workspace_id).await?;

        let mut statuses = Vec::with_capacity(documents.len());
        for document in documents {
            let chunk_count = self.count_chunks(document.id).await?;
            statuses.push(DocumentStatus {
                document,
                chunk_count,
            });
        }

        Ok(statuses)
    }

    /// Flip the processed flag
    pub async fn set_document_processed(&self, id: Uuid, processed: bool) -> Result<()> {
        DocumentEntity::update_many()
            .col_expr(DocumentColumn::Processed, Expr::value(processed))
            .col_expr(
                DocumentColumn::UpdatedAt,
                Expr::value(sea_orm::prelude::DateTimeWithTimeZone::from(Utc::now())),
            )
            .filter(DocumentColumn::Id.eq(id))
            .exec(self.write_conn())
            .await?;

        Ok(())
    }

    /// Delete a document and its chunks in one transaction
    pub async fn delete_document(&self, id: Uuid) -> Result<bool> {
        let txn = self.write_conn().begin().await?;

        ChunkEntity::delete_many()
            .filter(ChunkColumn::DocumentId.eq(id))
            .exec(&txn)
            .await?;

        let result = DocumentEntity::delete_by_id(id).exec(&txn).await?;
        txn.commit().await?;

        Ok(result.rows_affected > 0)
    }

    // ========================================================================
    // Chunk Operations
    // ========================================================================

    /// Insert one embedding batch of chunks atomically.
    ///
    /// Each entry is `(chunk_index, content, embedding)`.
    pub async fn insert_chunk_batch(
        &self,
        document_id: Uuid,
        chunks: Vec<(i32, String, Vec<f32>)>,
    ) -> Result<u64> {
        if chunks.is_empty() {
            return Ok(0);
        }

        let now = Utc::now();
        let count = chunks.len() as u64;
        let models: Vec<ChunkActiveModel> = chunks
            .into_iter()
            .map(|(index, content, embedding)| ChunkActiveModel {
                id: Set(Uuid::new_v4()),
                document_id: Set(document_id),
                content: Set(content),
                embedding: Set(encode_embedding(&embedding)),
                chunk_index: Set(index),
                created_at: Set(now.into()),
            })
            .collect();

        let txn = self.write_conn().begin().await?;
        ChunkEntity::insert_many(models)
            .exec_without_returning(&txn)
            .await?;
        txn.commit().await?;

        Ok(count)
    }

    /// Delete every chunk of a document
    pub async fn delete_chunks(&self, document_id: Uuid) -> Result<u64> {
        let result = ChunkEntity::delete_many()
            .filter(ChunkColumn::DocumentId.eq(document_id))
            .exec(self.write_conn())
            .await?;

        Ok(result.rows_affected)
    }

    /// Count chunks of a document
    pub async fn count_chunks(&self, document_id: Uuid) -> Result<u64> {
        ChunkEntity::find()
            .filter(ChunkColumn::DocumentId.eq(document_id))
            .count(self.read_conn())
            .await
            .map_err(Into::into)
    }

    /// Every chunk of every processed document in a workspace (single join)
    pub async fn processed_chunks(&self, workspace_id: Uuid) -> Result<Vec<RetrievedChunk>> {
        let rows = ChunkEntity::find()
            .find_also_related(DocumentEntity)
            .filter(DocumentColumn::WorkspaceId.eq(workspace_id))
            .filter(DocumentColumn::Processed.eq(true))
            .all(self.read_conn())
            .await?;

        Ok(rows
            .into_iter()
            .filter_map(|(chunk, document)| {
                let document = document?;
                Some(RetrievedChunk {
                    chunk_id: chunk.id,
                    document_id: document.id,
                    document_name: document.name,
                    content: chunk.content,
                    chunk_index: chunk.chunk_index,
                    embedding: chunk.embedding,
                })
            })
            .collect())
    }

    // ========================================================================
    // Notification Operations
    // ========================================================================

    /// Create a notification for one user
    pub async fn create_notification(
        &self,
        user_id: Uuid,
        workspace_id: Option<Uuid>,
        title: &str,
        message: &str,
    ) -> Result<Notification> {
        notification_model(user_id, workspace_id, title, message)
            .insert(self.write_conn())
            .await
            .map_err(Into::into)
    }

    /// Create the same notification for several users
    pub async fn create_notifications(
        &self,
        user_ids: &[Uuid],
        workspace_id: Option<Uuid>,
        title: &str,
        message: &str,
    ) -> Result<u64> {
        if user_ids.is_empty() {
            return Ok(0);
        }

        let models: Vec<NotificationActiveModel> = user_ids
            .iter()
            .map(|user_id| notification_model(*user_id, workspace_id, title, message))
            .collect();

        NotificationEntity::insert_many(models)
            .exec_without_returning(self.write_conn())
            .await
            .map_err(Into::into)
    }

    /// Notifications for a user, optionally limited to one workspace, newest first
    pub async fn list_notifications(
        &self,
        user_id: Uuid,
        workspace_id: Option<Uuid>,
    ) -> Result<Vec<NotificationWithWorkspace>> {
        let mut query = NotificationEntity::find().filter(NotificationColumn::UserId.eq(user_id));
        if let Some(workspace_id) = workspace_id {
            query = query.filter(NotificationColumn::WorkspaceId.eq(workspace_id));
        }

        let rows = query
            .find_also_related(WorkspaceEntity)
            .order_by_desc(NotificationColumn::CreatedAt)
            .all(self.read_conn())
            .await?;

        Ok(rows
            .into_iter()
            .map(|(notification, workspace)| NotificationWithWorkspace {
                notification,
                workspace_name: workspace.map(|w| w.name),
            })
            .collect())
    }

    /// Mark every unread notification of a user as read
    pub async fn mark_all_notifications_read(&self, user_id: Uuid) -> Result<u64> {
        let result = NotificationEntity::update_many()
            .col_expr(NotificationColumn::Read, Expr::value(true))
            .filter(NotificationColumn::UserId.eq(user_id))
            .filter(NotificationColumn::Read.eq(false))
            .exec(self.write_conn())
            .await?;

        Ok(result.rows_affected)
    }

    /// Mark one of the user's notifications as read
    pub async fn mark_notification_read(&self, user_id: Uuid, id: Uuid) -> Result<bool> {
        let result = NotificationEntity::update_many()
            .col_expr(NotificationColumn::Read, Expr::value(true))
            .filter(NotificationColumn::Id.eq(id))
            .filter(NotificationColumn::UserId.eq(user_id))
            .exec(self.write_conn())
            .await?;

        Ok(result.rows_affected > 0)
    }

    // ========================================================================
    // Chat Query Operations
    // ========================================================================

    /// Log an answered question
    pub async fn record_chat_query(
        &self,
        workspace_id: Uuid,
        user_id: Uuid,
        question: String,
        answer: String,
        confidence: i32,
        sources: &[String],
    ) -> Result<ChatQuery> {
        let query = ChatQueryActiveModel {
            id: Set(Uuid::new_v4()),
            workspace_id: Set(workspace_id),
            user_id: Set(user_id),
            question: Set(question),
            answer: Set(answer),
            confidence: Set(confidence),
            sources: Set(serde_json::to_string(sources)?),
            created_at: Set(Utc::now().into()),
        };

        query.insert(self.write_conn()).await.map_err(Into::into)
    }

    /// Count chat queries in `[from, to)`
    pub async fn count_chat_queries(
        &self,
        workspace_id: Uuid,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<u64> {
        let from: sea_orm::prelude::DateTimeWithTimeZone = from.into();
        let to: sea_orm::prelude::DateTimeWithTimeZone = to.into();

        ChatQueryEntity::find()
            .filter(ChatQueryColumn::WorkspaceId.eq(workspace_id))
            .filter(ChatQueryColumn::CreatedAt.gte(from))
            .filter(ChatQueryColumn::CreatedAt.lt(to))
            .select_only()
            .column(ChatQueryColumn::Id)
            .count(self.read_conn())
            .await
            .map_err(Into::into)
    }
}

fn notification_model(
    user_id: Uuid,
    workspace_id: Option<Uuid>,
    title: &str,
    message: &str,
) -> NotificationActiveModel {
    NotificationActiveModel {
        id: Set(Uuid::new_v4()),
        user_id: Set(user_id),
        workspace_id: Set(workspace_id),
        title: Set(title.to_string()),
        message: Set(message.to_string()),
        read: Set(false),
        created_at: Set(Utc::now().into()),
    }
}

/// Emails are compared case-insensitively
fn company_id_taken(company_id: &str) -> AppError {
    AppError::Conflict {
        message: format!("Company ID \"{}\" is already taken", company_id),
    }
}

/// Unique-index rejections become `conflict`; other errors stay database errors
fn conflict_on_unique(err: DbErr, conflict: impl FnOnce() -> AppError) -> AppError {
    match err.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(_)) => conflict(),
        _ => AppError::Database(err),
    }
}

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}
