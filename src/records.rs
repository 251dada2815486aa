//! JSONL record types and per-file parsing for Claude session logs.
//!
//! Claude stores each session as a JSONL file under
//! `~/.claude/projects/{project_id}/{session_id}.jsonl`. Each line is one
//! record; the ones we care about carry a `message.content` field that is
//! either a plain string (old format) or an array of typed content blocks.

use serde::{Deserialize, Deserializer, Serialize};
use std::path::Path;
use tracing::warn;

/// Record type of a log event. Unknown values (e.g. "summary", "system")
/// map to `Other` so a new record type never breaks parsing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    #[default]
    #[serde(other)]
    Other,
}

/// One parsed line of a session log file.
#[derive(Debug, Deserialize)]
pub struct LogEvent {
    pub uuid: String,
    #[serde(rename = "type", default)]
    pub role: Role,
    #[serde(default)]
    message: Option<MessagePayload>,
    #[serde(default)]
    pub timestamp: String,
    #[serde(rename = "parentUuid", default)]
    pub parent_uuid: Option<String>,
    #[serde(rename = "isMeta", default)]
    pub is_meta: bool,
}

#[derive(Debug, Deserialize)]
struct MessagePayload {
    #[serde(default)]
    content: Option<RawContent>,
}

/// The two content shapes found in session files: a bare string (old
/// format) or an ordered array of typed blocks (current format).
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum RawContent {
    Text(String),
    Items(Vec<ContentItem>),
}

/// A content block within an array-shaped message.
#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
pub enum ContentItem {
    #[serde(rename = "text")]
    Text {
        #[serde(default)]
        text: String,
    },
    #[serde(rename = "thinking")]
    Thinking {
        #[serde(default)]
        thinking: String,
    },
    #[serde(rename = "tool_use")]
    ToolUse { name: String },
    #[serde(rename = "tool_result")]
    ToolResult {
        #[serde(default, deserialize_with = "tool_result_text")]
        content: String,
        #[serde(rename = "is_error", default)]
        is_error: bool,
    },
    /// Anything we don't render (e.g. "image").
    #[serde(other)]
    Unknown,
}

/// Flatten a `tool_result` content field to one string. The field is a
/// plain string in old logs and an array of `{type: "text", text}` blocks
/// in newer ones.
fn tool_result_text<'de, D>(de: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(de)?;
    Ok(match value {
        serde_json::Value::String(s) => s,
        serde_json::Value::Array(items) => items
            .iter()
            .filter_map(|item| item.get("text").and_then(|t| t.as_str()))
            .collect::<Vec<_>>()
            .join("\n"),
        _ => String::new(),
    })
}

impl LogEvent {
    pub fn content(&self) -> Option<&RawContent> {
        self.message.as_ref().and_then(|m| m.content.as_ref())
    }

    /// Whether this event is a real conversational turn. Drops, in order:
    /// producer-flagged meta records, records with no content, and user
    /// records that consist purely of relayed tool output.
    pub fn is_conversational(&self) -> bool {
        if self.is_meta {
            return false;
        }
        match self.content() {
            None => false,
            Some(RawContent::Text(s)) => !s.is_empty(),
            Some(RawContent::Items(items)) => {
                if items.is_empty() {
                    return false;
                }
                if self.role == Role::User
                    && items
                        .iter()
                        .all(|item| matches!(item, ContentItem::ToolResult { .. }))
                {
                    return false;
                }
                true
            }
        }
    }
}

/// Parse one log line. Blank lines and lines that are not valid records
/// yield `None`; a bad line never aborts the surrounding scan.
pub fn parse_line(line: &str) -> Option<LogEvent> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }
    serde_json::from_str(line).ok()
}

/// Parse a session file into its surviving (conversational) events, in
/// file order. An unreadable file contributes nothing rather than failing
/// the caller's scan.
pub fn parse_session_file(path: &Path) -> Vec<LogEvent> {
    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) => {
            warn!("Failed to read session file {}: {}", path.display(), e);
            return Vec::new();
        }
    };

    content
        .lines()
        .filter_map(parse_line)
        .filter(LogEvent::is_conversational)
        .collect()
}
