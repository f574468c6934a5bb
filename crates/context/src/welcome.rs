//! Workspace welcome message

/// Greeting shown when a member opens the chat, listing the workspace's documents
pub fn welcome_message(workspace_name: &str, document_names: &[String]) -> String {
    let documents = if document_names.is_empty() {
        "No documents uploaded yet. Upload some documents in the Storage page to get started!"
            .to_string()
    } else {
        document_names
            .iter()
            .map(|name| format!("• {}", name))
            .collect::<Vec<_>>()
            .join("\n")
    };

    format!(
        "Welcome to {}! 🎉\n\nI'm your AI documentation assistant, here to help you navigate your company resources and answer questions.\n\n**Available documents ({}):**\n{}\n\nFeel free to ask me anything about your documentation!",
        workspace_name,
        document_names.len(),
        documents
    )
}
