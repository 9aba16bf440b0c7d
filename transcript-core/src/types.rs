// Core type definitions for Transcript

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Media type assumed for image sources that don't declare one
pub const DEFAULT_IMAGE_MEDIA_TYPE: &str = "image/png";

/// Actor that produced a stored record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[serde(alias = "USER")]
    User,
    #[serde(alias = "ASSISTANT")]
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown role: {0}")]
pub struct UnknownRole(pub String);

impl FromStr for Role {
    type Err = UnknownRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "USER" | "user" => Ok(Role::User),
            "ASSISTANT" | "assistant" => Ok(Role::Assistant),
            other => Err(UnknownRole(other.to_string())),
        }
    }
}

/// One persisted conversation unit, exactly as the store hands it back.
///
/// `content` stays untyped: it is either a plain string or an array of
/// provider-shaped content blocks, and is only interpreted by
/// [`crate::blocks::RecordContent::classify`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawRecord {
    pub id: String,
    pub task_id: String,
    #[serde(alias = "type")]
    pub role: Role,
    pub content: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

/// Image extracted from a turn, ready for the client
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DisplayImage {
    pub data: String,
    pub media_type: String,
}

/// Reconstructed chat entry derived from one turn
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DisplayMessage {
    pub id: String,
    pub content: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub images: Option<Vec<DisplayImage>>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_role_accepts_stored_and_lowercase_forms() {
        assert_eq!("USER".parse::<Role>().unwrap(), Role::User);
        assert_eq!("assistant".parse::<Role>().unwrap(), Role::Assistant);
        let err = "SYSTEM".parse::<Role>().unwrap_err();
        assert_eq!(err, UnknownRole("SYSTEM".to_string()));
        assert_eq!(err.to_string(), "unknown role: SYSTEM");

        let role: Role = serde_json::from_value(json!("ASSISTANT")).unwrap();
        assert_eq!(role, Role::Assistant);
        assert_eq!(serde_json::to_value(role).unwrap(), json!("assistant"));
    }

    #[test]
    fn test_raw_record_accepts_legacy_type_key() {
        let record: RawRecord = serde_json::from_value(json!({
            "id": "m1",
            "taskId": "t1",
            "type": "USER",
            "content": "hello",
            "createdAt": "2025-03-01T10:00:00.250Z",
        }))
        .unwrap();

        assert_eq!(record.role, Role::User);
        assert_eq!(record.content, json!("hello"));
        assert_eq!(record.created_at.timestamp_millis() % 1000, 250);
    }

    #[test]
    fn test_display_message_omits_missing_images() {
        let message = DisplayMessage {
            id: "m1".to_string(),
            content: "hi".to_string(),
            role: Role::User,
            created_at: DateTime::<Utc>::from_timestamp_millis(1_000).unwrap(),
            images: None,
        };

        let value = serde_json::to_value(&message).unwrap();
        assert_eq!(value["role"], "user");
        assert!(value.get("createdAt").is_some());
        assert!(value.get("images").is_none());

        let with_images = DisplayMessage {
            images: Some(vec![DisplayImage {
                data: "abc".to_string(),
                media_type: "image/jpeg".to_string(),
            }]),
            ..message
        };
        let value = serde_json::to_value(&with_images).unwrap();
        assert_eq!(value["images"][0]["mediaType"], "image/jpeg");
    }
}
