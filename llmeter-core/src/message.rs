//! Chat message shapes and prompt normalization.

use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    Developer,
    User,
    Assistant,
    Tool,
    Function,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::System => "system",
            Role::Developer => "developer",
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::Tool => "tool",
            Role::Function => "function",
        }
    }
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct ChatMessage {
    pub role: Role,
    pub content: MessageContent,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
}

impl ChatMessage {
    pub fn new(role: Role, content: impl Into<MessageContent>) -> Self {
        Self {
            role,
            content: content.into(),
            name: None,
            tool_call_id: None,
        }
    }

    pub fn system(content: impl Into<MessageContent>) -> Self {
        Self::new(Role::System, content)
    }

    pub fn user(content: impl Into<MessageContent>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<MessageContent>) -> Self {
        Self::new(Role::Assistant, content)
    }

    /// `"{role}: {content}"`, with typed parts comma-joined.
    pub fn render(&self) -> String {
        format!("{}: {}", self.role.as_str(), self.content.render())
    }
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
#[serde(untagged)]
pub enum MessageContent {
    Text(String),
    Parts(Vec<ContentPart>),
}

impl MessageContent {
    pub fn render(&self) -> String {
        match self {
            MessageContent::Text(text) => text.clone(),
            MessageContent::Parts(parts) => parts
                .iter()
                .map(ContentPart::render)
                .collect::<Vec<_>>()
                .join(", "),
        }
    }
}

impl From<String> for MessageContent {
    fn from(value: String) -> Self {
        MessageContent::Text(value)
    }
}

impl From<&str> for MessageContent {
    fn from(value: &str) -> Self {
        MessageContent::Text(value.to_string())
    }
}

impl From<Vec<ContentPart>> for MessageContent {
    fn from(value: Vec<ContentPart>) -> Self {
        MessageContent::Parts(value)
    }
}

/// A typed fragment of a multi-part message (text or image reference).
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct ContentPart {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<Value>,
}

impl ContentPart {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            kind: Some("text".to_string()),
            text: Some(text.into()),
            image_url: None,
        }
    }

    pub fn image_url(url: impl Into<String>) -> Self {
        Self {
            kind: Some("image_url".to_string()),
            text: None,
            image_url: Some(serde_json::json!({ "url": url.into() })),
        }
    }

    /// Untyped parts are treated as text.
    pub fn render(&self) -> String {
        let kind = self.kind.as_deref().unwrap_or("text");
        let body = match (&self.text, &self.image_url) {
            (Some(text), _) => text.clone(),
            (None, Some(reference)) => render_reference(reference),
            (None, None) => String::new(),
        };
        format!("{kind}: {body}")
    }
}

fn render_reference(reference: &Value) -> String {
    match reference {
        Value::String(url) => url.clone(),
        Value::Object(map) => match map.get("url") {
            Some(Value::String(url)) => url.clone(),
            _ => reference.to_string(),
        },
        other => other.to_string(),
    }
}

/// Renders every message in order and joins them with `separator`.
pub fn normalize_messages<'a, I>(messages: I, separator: &str) -> String
where
    I: IntoIterator<Item = &'a ChatMessage>,
{
    messages
        .into_iter()
        .map(ChatMessage::render)
        .collect::<Vec<_>>()
        .join(separator)
}
