use serde::{Deserialize, Serialize};

/// Message body: either a plain string or a list of typed parts.
///
/// Chat front-ends send parts; the planner itself only ever writes text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Content {
    Text(String),
    Parts(Vec<ContentPart>),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentPart {
    Text { text: String },
    /// Images, files and anything else the planner cannot read
    #[serde(other)]
    Unsupported,
}

impl ContentPart {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text { text } => Some(text),
            Self::Unsupported => None,
        }
    }
}

impl Content {
    pub fn text(s: impl Into<String>) -> Self {
        Self::Text(s.into())
    }

    /// Borrow the text when the body is exactly one text fragment
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            Self::Parts(parts) => match parts.as_slice() {
                [only] => only.as_text(),
                _ => None,
            },
        }
    }

    /// All readable text, parts joined by newlines
    pub fn to_text(&self) -> String {
        match self {
            Self::Text(s) => s.clone(),
            Self::Parts(parts) => parts
                .iter()
                .filter_map(ContentPart::as_text)
                .collect::<Vec<_>>()
                .join("\n"),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.to_text().trim().is_empty()
    }
}

impl From<String> for Content {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<&str> for Content {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_unsupported_parts_are_skipped() {
        let content: Content = serde_json::from_value(json!([
            { "type": "image_url", "image_url": { "url": "https://acme.com/logo.png" } },
            { "type": "text", "text": "Here is our logo" }
        ]))
        .unwrap();

        assert_eq!(content.to_text(), "Here is our logo");
        assert_eq!(content.as_text(), None);
        assert!(!content.is_empty());
        assert!(Content::text("  ").is_empty());
    }
}
