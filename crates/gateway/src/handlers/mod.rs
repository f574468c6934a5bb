//! API handlers module

pub mod chat;
pub mod documents;
pub mod health;
pub mod invites;
pub mod members;
pub mod notifications;
pub mod profile;
pub mod stats;
pub mod workspaces;
