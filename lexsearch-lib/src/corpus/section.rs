use serde::{Deserialize, Serialize};

/// One numbered section of the statute.
///
/// Serialized as `{section, title, text}` to match the extracted corpus files.
#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq)]
pub struct Section {
    /// Statute section number, unique within a corpus
    #[serde(rename = "section")]
    pub id: String,
    /// Short human-readable heading
    pub title: String,
    /// Full body text
    pub text: String,
}

impl Section {
    pub fn new(id: impl Into<String>, title: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            text: text.into(),
        }
    }

    /// Text handed to the embedder for this section.
    ///
    /// Only the index sees this form; lookup and explanation work on the raw fields.
    pub fn composite_text(&self) -> String {
        format!("Section {} {} {}", self.id, self.title, self.text)
    }

    /// First `max_chars` characters of the body, suffixed with `...`.
    pub fn preview(&self, max_chars: usize) -> String {
        let preview: String = self.text.chars().take(max_chars).collect();
        format!("{preview}...")
    }
}
