//! SeaORM entity models
//!
//! Database entities for QuickOnboard

mod chat_query;
mod document;
mod document_chunk;
mod notification;
mod user;
mod workspace;
mod workspace_invite;
mod workspace_member;

pub use user::{
    Entity as UserEntity,
    Model as User,
    ActiveModel as UserActiveModel,
    Column as UserColumn,
};

pub use workspace::{
    Entity as WorkspaceEntity,
    Model as Workspace,
    ActiveModel as WorkspaceActiveModel,
    Column as WorkspaceColumn,
};

pub use workspace_member::{
    Entity as MemberEntity,
    Model as Member,
    ActiveModel as MemberActiveModel,
    Column as MemberColumn,
    Role,
};

pub use workspace_invite::{
    Entity as InviteEntity,
    Model as Invite,
    ActiveModel as InviteActiveModel,
    Column as InviteColumn,
};

pub use document::{
    Entity as DocumentEntity,
    Model as Document,
    ActiveModel as DocumentActiveModel,
    Column as DocumentColumn,
};

pub use document_chunk::{
    decode_embedding,
    encode_embedding,
    Entity as ChunkEntity,
    Model as Chunk,
    ActiveModel as ChunkActiveModel,
    Column as ChunkColumn,
};

pub use notification::{
    Entity as NotificationEntity,
    Model as Notification,
    ActiveModel as NotificationActiveModel,
    Column as NotificationColumn,
};

pub use chat_query::{
    Entity as ChatQueryEntity,
    Model as ChatQuery,
    ActiveModel as ChatQueryActiveModel,
    Column as ChatQueryColumn,
};
