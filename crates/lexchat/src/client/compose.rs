//! Inline extracted documents into an outbound user message.

use lexchat_protocol::AttachedFile;

/// The two renderings of a user message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Composed {
    /// Sent to the server: input followed by every document block.
    pub outbound: String,
    /// Shown in the conversation: the input alone.
    pub display: String,
}

/// Compose `input` with `files`, in list order.
pub fn compose(input: &str, files: &[AttachedFile]) -> Composed {
    Composed {
        outbound: outbound_content(input, files),
        display: input.to_string(),
    }
}

/// Input text followed by one delimited block per document.
pub fn outbound_content(input: &str, files: &[AttachedFile]) -> String {
    let mut out = String::with_capacity(
        input.len() + files.iter().map(|f| f.text.len() + f.name.len() + 64).sum::<usize>(),
    );
    out.push_str(input);
    for file in files {
        out.push_str(&document_block(file));
    }
    out
}

fn document_block(file: &AttachedFile) -> String {
    format!(
        "\n\n--- Contenu du document \"{}\" ({} pages) ---\n{}\n--- Fin du document ---",
        file.name, file.pages, file.text
    )
}
