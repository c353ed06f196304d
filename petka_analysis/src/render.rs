use serde::Serialize;

/// One line of annotated output. The indexer listings and the dialog
/// disassembler both produce these so the presentation side deals with a
/// single shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RenderEntry {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub link: Option<CrossLink>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

impl RenderEntry {
    pub fn line(text: impl Into<String>) -> Self {
        Self {
            label: None,
            text: text.into(),
            link: None,
            comment: None,
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn with_link(mut self, link: CrossLink) -> Self {
        self.link = Some(link);
        self
    }

    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }
}

/// Navigation target attached to a render entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum CrossLink {
    Object(u16),
    Scene(u16),
    Message(u16),
    DialogGroup(u16),
    Resource(u16),
}

pub fn label_name(addr: u16) -> String {
    format!("loc_{addr:04x}")
}

pub fn format_addr(addr: u16) -> String {
    format!("{addr:04x}")
}

/// Optional refs print as "-" when unset; sentinels never leak as numbers.
pub fn format_opt(value: Option<u16>) -> String {
    match value {
        Some(value) => value.to_string(),
        None => String::from("-"),
    }
}
