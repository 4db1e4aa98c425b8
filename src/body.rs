//! Body values shared by requests and responses.

use serde_json::Value;

/// A parsed request body or a response body waiting to be serialized.
///
/// Structured data lives in [`Body::Json`], whatever its shape; form-encoded
/// request bodies are decoded into a JSON object too.
#[derive(Clone, Debug, Default, PartialEq)]
pub enum Body {
    #[default]
    Empty,
    Text(String),
    Json(Value),
}

impl Body {
    /// `true` for [`Body::Empty`] and for a JSON `null`.
    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Empty | Self::Json(Value::Null))
    }

    pub fn as_json(&self) -> Option<&Value> {
        match self {
            Self::Json(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Wire bytes: JSON-encoded for structured values, raw UTF-8 for text.
    pub(crate) fn to_bytes(&self) -> Vec<u8> {
        match self {
            Self::Empty => Vec::new(),
            Self::Text(s) => s.clone().into_bytes(),
            // Serializing a `Value` cannot fail: its map keys are strings.
            Self::Json(v) => serde_json::to_vec(v).unwrap_or_default(),
        }
    }
}

impl From<Value> for Body {
    fn from(v: Value) -> Self {
        Self::Json(v)
    }
}

impl From<String> for Body {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<&str> for Body {
    fn from(s: &str) -> Self {
        Self::Text(s.to_owned())
    }
}

impl From<()> for Body {
    fn from(_: ()) -> Self {
        Self::Empty
    }
}
