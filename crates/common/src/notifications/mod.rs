//! Notification helpers
//!
//! Titles and messages for the events users are told about, plus fan-out to
//! workspace members. Callers decide whether a failed notification matters;
//! most log and move on.

use crate::db::Repository;
use crate::errors::Result;
use uuid::Uuid;

/// A rendered notification
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub title: String,
    pub message: String,
}

impl Notice {
    fn new(title: &str, message: String) -> Self {
        Self {
            title: title.to_string(),
            message,
        }
    }

    pub fn document_processed(document_name: &str) -> Self {
        Self::new(
            "Document Processed",
            format!("\"{}\" has been processed and is ready for AI chat", document_name),
        )
    }

    pub fn document_failed(document_name: &str) -> Self {
        Self::new(
            "Document Processing Failed",
            format!("Failed to process \"{}\". Please try uploading again.", document_name),
        )
    }

    /// Sent to the user who deleted the document
    pub fn document_deleted_by_you(document_name: &str) -> Self {
        Self::new("Document Deleted", format!("You deleted \"{}\"", document_name))
    }

    /// Sent to every other member
    pub fn document_deleted_by(actor: &str, document_name: &str) -> Self {
        Self::new("Document Deleted", format!("{} deleted \"{}\"", actor, document_name))
    }

    pub fn workspace_created(workspace_name: &str) -> Self {
        Self::new(
            "Workspace Created",
            format!("Successfully created workspace \"{}\"", workspace_name),
        )
    }

    /// Sent to the user who just joined
    pub fn joined_workspace(workspace_name: &str, role: &str) -> Self {
        Self::new(
            "Joined Workspace",
            format!("You joined \"{}\" as {}", workspace_name, role),
        )
    }

    /// Sent to the existing members when someone joins
    pub fn member_joined(member: &str, workspace_name: &str) -> Self {
        Self::new(
            "New Team Member",
            format!("{} joined \"{}\"", member, workspace_name),
        )
    }

    pub fn role_changed(workspace_name: &str, role: &str) -> Self {
        Self::new(
            "Role Updated",
            format!("Your role in \"{}\" is now {}", workspace_name, role),
        )
    }

    pub fn removed_from_workspace(workspace_name: &str) -> Self {
        Self::new(
            "Removed from Workspace",
            format!("You were removed from \"{}\"", workspace_name),
        )
    }
}

/// Notify a single user
pub async fn notify_user(
    repo: &Repository,
    user_id: Uuid,
    workspace_id: Option<Uuid>,
    notice: &Notice,
) -> Result<()> {
    repo.create_notification(user_id, workspace_id, &notice.title, &notice.message)
        .await?;
    Ok(())
}

/// Notify every member of a workspace except `exclude`
pub async fn notify_workspace_members(
    repo: &Repository,
    workspace_id: Uuid,
    exclude: Option<Uuid>,
    notice: &Notice,
) -> Result<u64> {
    let recipients: Vec<Uuid> = repo
        .member_user_ids(workspace_id)
        .await?
        .into_iter()
        .filter(|id| Some(*id) != exclude)
        .collect();

    repo.create_notifications(&recipients, Some(workspace_id), &notice.title, &notice.message)
        .await
}

/// Log a failed notification instead of failing the request that caused it
pub fn log_failure(result: Result<impl Sized>, event: &str) {
    if let Err(e) = result {
        tracing::warn!(error = %e, event = event, "Failed to create notification");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_messages() {
        let ok = Notice::document_processed("Handbook.pdf");
        assert_eq!(ok.title, "Document Processed");
        assert_eq!(ok.message, "\"Handbook.pdf\" has been processed and is ready for AI chat");

        let failed = Notice::document_failed("Handbook.pdf");
        assert_eq!(failed.title, "Document Processing Failed");
        assert_eq!(
            failed.message,
            "Failed to process \"Handbook.pdf\". Please try uploading again."
        );
    }

    #[test]
    fn test_deletion_messages() {
        assert_eq!(Notice::document_deleted_by_you("a.txt").message, "You deleted \"a.txt\"");
        assert_eq!(
            Notice::document_deleted_by("Grace", "a.txt").message,
            "Grace deleted \"a.txt\""
        );
    }

    #[test]
    fn test_workspace_created() {
        let notice = Notice::workspace_created("Acme");
        assert_eq!(notice.title, "Workspace Created");
        assert_eq!(notice.message, "Successfully created workspace \"Acme\"");
    }
}
