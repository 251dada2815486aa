//! Content normalization - collapses the heterogeneous content shapes into
//! a single display string per message.
//!
//! The same rules feed both the session view (full rendering) and search
//! (haystack construction), so every policy about what a block "looks like"
//! lives here and nowhere else.

use crate::records::{ContentItem, RawContent};

/// Sentinel for a message whose content produced no renderable output.
pub const NO_CONTENT: &str = "No content";

/// Tool results at or above this length are summarized instead of inlined.
const INLINE_RESULT_MAX_CHARS: usize = 100;

/// Render a message's content with the full per-block rules. Blocks are
/// joined by newlines in their original order.
pub fn render_content(content: Option<&RawContent>) -> String {
    let content = match content {
        Some(c) => c,
        None => return NO_CONTENT.to_string(),
    };

    match content {
        // Old format: content is the message text itself.
        RawContent::Text(s) => s.clone(),
        RawContent::Items(items) => {
            let mut parts = Vec::new();
            for item in items {
                match item {
                    ContentItem::Text { text } => parts.push(text.clone()),
                    ContentItem::Thinking { thinking } => {
                        parts.push(format!("🤔 Thinking: {}", thinking))
                    }
                    ContentItem::ToolUse { name } => parts.push(format!("🔧 Tool: {}", name)),
                    ContentItem::ToolResult { content, is_error } => {
                        if !content.is_empty()
                            && content.chars().count() < INLINE_RESULT_MAX_CHARS
                        {
                            parts.push(format!("📋 Result: {}", content));
                        } else {
                            let status = if *is_error { "error" } else { "success" };
                            parts.push(format!("📋 Tool result ({})", status));
                        }
                    }
                    ContentItem::Unknown => {}
                }
            }
            if parts.is_empty() {
                NO_CONTENT.to_string()
            } else {
                parts.join("\n")
            }
        }
    }
}

/// Cheap preview for session listings: the first block's text, without
/// rendering the rest of the message.
pub fn preview(content: &RawContent) -> String {
    match content {
        RawContent::Text(s) => s.clone(),
        RawContent::Items(items) => match items.first() {
            Some(ContentItem::Text { text }) if !text.is_empty() => text.clone(),
            _ => NO_CONTENT.to_string(),
        },
    }
}

/// Build the searchable text for a message: text, thinking and tool result
/// payloads in document order. Tool names are deliberately not searchable.
pub fn haystack(content: &RawContent) -> String {
    match content {
        RawContent::Text(s) => s.clone(),
        RawContent::Items(items) => {
            let mut parts = Vec::new();
            for item in items {
                match item {
                    ContentItem::Text { text } if !text.is_empty() => parts.push(text.as_str()),
                    ContentItem::Thinking { thinking } if !thinking.is_empty() => {
                        parts.push(thinking.as_str())
                    }
                    ContentItem::ToolResult { content, .. } if !content.is_empty() => {
                        parts.push(content.as_str())
                    }
                    _ => {}
                }
            }
            parts.join(" ")
        }
    }
}

/// Truncate to `max` characters with a trailing ellipsis. A string of
/// exactly `max` characters is returned unchanged.
pub fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() > max {
        let mut out: String = s.chars().take(max).collect();
        out.push_str("...");
        out
    } else {
        s.to_string()
    }
}
