// Content block classification
// Turns opaque stored content into typed blocks, skipping anything malformed

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::debug;

use crate::types::{DisplayImage, DEFAULT_IMAGE_MEDIA_TYPE};

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TextBlock {
    pub text: String,
}

/// Inline image payload (`{"type": "base64", "media_type": ..., "data": ...}`)
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ImageSource {
    #[serde(rename = "type")]
    pub encoding: String,
    #[serde(default, alias = "mediaType")]
    pub media_type: Option<String>,
    #[serde(default)]
    pub data: String,
}

impl ImageSource {
    /// Only non-empty base64 sources can be shown; a missing media type
    /// falls back to [`DEFAULT_IMAGE_MEDIA_TYPE`].
    pub fn to_display_image(&self) -> Option<DisplayImage> {
        if self.encoding != "base64" || self.data.is_empty() {
            return None;
        }

        let media_type = self
            .media_type
            .as_deref()
            .filter(|m| !m.is_empty())
            .unwrap_or(DEFAULT_IMAGE_MEDIA_TYPE);

        Some(DisplayImage {
            data: self.data.clone(),
            media_type: media_type.to_string(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ImageBlock {
    pub source: ImageSource,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ToolUseBlock {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub input: Map<String, Value>,
}

/// Sub-block of a tool result. Tool results never nest further.
#[derive(Debug, Clone, PartialEq)]
pub enum ToolResultPart {
    Text { text: String },
    Image(ImageBlock),
}

impl ToolResultPart {
    pub fn classify(value: &Value) -> Option<Self> {
        #[derive(Deserialize)]
        struct TextPart {
            #[serde(default)]
            text: String,
        }

        match block_tag(value)? {
            "text" => decode::<TextPart>(value, "text").map(|p| ToolResultPart::Text { text: p.text }),
            "image" => decode(value, "image").map(ToolResultPart::Image),
            other => {
                debug!(tag = other, "skipping unsupported tool result part");
                None
            }
        }
    }

    pub fn is_image(&self) -> bool {
        matches!(self, ToolResultPart::Image(_))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ToolResultBlock {
    pub tool_use_id: String,
    pub is_error: bool,
    pub content: Vec<ToolResultPart>,
}

impl ToolResultBlock {
    fn classify(value: &Value) -> Option<Self> {
        // Null ids and flags must not cost the block its content
        #[derive(Deserialize)]
        struct Wire {
            #[serde(default, alias = "toolUseId")]
            tool_use_id: Option<String>,
            #[serde(default, alias = "isError")]
            is_error: Option<bool>,
            #[serde(default)]
            content: Value,
        }

        let wire: Wire = decode(value, "tool_result")?;
        let content = match wire.content {
            Value::Array(parts) => parts.iter().filter_map(ToolResultPart::classify).collect(),
            Value::String(text) => vec![ToolResultPart::Text { text }],
            _ => Vec::new(),
        };

        Some(ToolResultBlock {
            tool_use_id: wire.tool_use_id.unwrap_or_default(),
            is_error: wire.is_error.unwrap_or_default(),
            content,
        })
    }

    pub fn first_part(&self) -> Option<&ToolResultPart> {
        self.content.first()
    }
}

/// One unit of a stored record's payload
#[derive(Debug, Clone, PartialEq)]
pub enum ContentBlock {
    Text(TextBlock),
    Image(ImageBlock),
    ToolUse(ToolUseBlock),
    ToolResult(ToolResultBlock),
}

impl ContentBlock {
    /// Classify a decoded block by its `type` tag.
    ///
    /// Returns `None` for untagged, unknown, or malformed blocks so callers can
    /// skip them without abandoning the rest of the record.
    pub fn classify(value: &Value) -> Option<Self> {
        let tag = block_tag(value)?;
        match tag {
            "text" => decode(value, tag).map(ContentBlock::Text),
            "image" => decode(value, tag).map(ContentBlock::Image),
            "tool_use" => decode(value, tag).map(ContentBlock::ToolUse),
            "tool_result" => ToolResultBlock::classify(value).map(ContentBlock::ToolResult),
            other => {
                debug!(tag = other, "skipping unrecognized content block");
                None
            }
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            ContentBlock::Text(block) => Some(&block.text),
            _ => None,
        }
    }

    pub fn as_image(&self) -> Option<&ImageBlock> {
        match self {
            ContentBlock::Image(block) => Some(block),
            _ => None,
        }
    }

    pub fn as_tool_result(&self) -> Option<&ToolResultBlock> {
        match self {
            ContentBlock::ToolResult(block) => Some(block),
            _ => None,
        }
    }

    pub fn is_tool_use(&self) -> bool {
        matches!(self, ContentBlock::ToolUse(_))
    }
}

/// Shape of a record's `content` column
#[derive(Debug, Clone, PartialEq)]
pub enum RecordContent {
    /// Legacy records store a bare string
    Plain(String),
    Blocks(Vec<ContentBlock>),
    Unrecognized,
}

impl RecordContent {
    pub fn classify(value: &Value) -> Self {
        match value {
            Value::String(text) => RecordContent::Plain(text.clone()),
            Value::Array(blocks) => {
                RecordContent::Blocks(blocks.iter().filter_map(ContentBlock::classify).collect())
            }
            other => {
                debug!(kind = value_kind(other), "skipping record content of unexpected shape");
                RecordContent::Unrecognized
            }
        }
    }
}

fn block_tag(value: &Value) -> Option<&str> {
    let tag = value.as_object().and_then(|obj| obj.get("type")).and_then(Value::as_str);
    if tag.is_none() {
        debug!(kind = value_kind(value), "skipping untagged content block");
    }
    tag
}

fn decode<T: DeserializeOwned>(value: &Value, tag: &str) -> Option<T> {
    T::deserialize(value)
        .map_err(|err| debug!(tag, %err, "skipping malformed content block"))
        .ok()
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
