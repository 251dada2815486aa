//! Session discovery and querying over the Claude log root.
//!
//! The log root (`~/.claude/projects/`) holds one directory per project;
//! each directory holds one JSONL file per session. Nothing here is cached
//! or indexed: every query re-scans the filesystem, so an append to a log
//! file between two requests is visible on the next one. The store never
//! writes to the log root.

use crate::records::{self, Role};
use crate::render;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// File extension reserved for session logs.
const SESSION_LOG_EXT: &str = "jsonl";

/// Search snippets are cut to this many characters.
const SNIPPET_MAX_CHARS: usize = 200;

/// Preview shown for a session with no surviving user message.
const NO_MESSAGES: &str = "No messages";

/// Summary metadata for one session, as returned by the listing API.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSummary {
    pub session_id: String,
    pub project_name: String,
    pub last_modified: DateTime<Utc>,
    pub message_count: usize,
    pub first_message: String,
    /// Resolved on every scan; not part of the API surface.
    #[serde(skip)]
    pub file_path: PathBuf,
}

/// One display-ready message from a session.
#[derive(Debug, Serialize)]
pub struct DisplayMessage {
    pub id: String,
    #[serde(rename = "type")]
    pub role: Role,
    pub content: String,
    pub timestamp: String,
    #[serde(rename = "parentUuid")]
    pub parent_uuid: Option<String>,
}

/// A session plus its full ordered message sequence.
#[derive(Debug, Serialize)]
pub struct SessionDetail {
    pub session: SessionSummary,
    pub messages: Vec<DisplayMessage>,
}

/// One full-text search match.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchHit {
    pub session_id: String,
    pub project_name: String,
    pub message_id: String,
    #[serde(rename = "type")]
    pub role: Role,
    pub content: String,
    pub timestamp: String,
}

/// Read-only view over the session log root.
pub struct SessionStore {
    log_root: PathBuf,
}

impl SessionStore {
    pub fn new(log_root: PathBuf) -> Self {
        Self { log_root }
    }

    /// Scan the log root and build summaries for every session, newest
    /// first. Unreadable directories and files are skipped, never fatal.
    pub fn scan_sessions(&self) -> Vec<SessionSummary> {
        let mut sessions = Vec::new();

        let project_dirs = match fs::read_dir(&self.log_root) {
            Ok(entries) => entries,
            Err(e) => {
                warn!("Failed to read log root {}: {}", self.log_root.display(), e);
                return sessions;
            }
        };

        for project_entry in project_dirs.flatten() {
            let project_path = project_entry.path();
            if !project_path.is_dir() {
                continue;
            }

            let project_dir = match project_path.file_name().and_then(|n| n.to_str()) {
                Some(name) => name.to_string(),
                None => continue,
            };
            let project_name = decode_project_name(&project_dir);

            let files = match fs::read_dir(&project_path) {
                Ok(entries) => entries,
                Err(e) => {
                    warn!("Skipping project {}: {}", project_path.display(), e);
                    continue;
                }
            };

            for file_entry in files.flatten() {
                let file_path = file_entry.path();
                if !file_path
                    .extension()
                    .map_or(false, |ext| ext == SESSION_LOG_EXT)
                {
                    continue;
                }

                let session_id = match file_path.file_stem().and_then(|n| n.to_str()) {
                    Some(stem) => stem.to_string(),
                    None => continue,
                };

                let last_modified = match fs::metadata(&file_path).and_then(|m| m.modified()) {
                    Ok(mtime) => DateTime::<Utc>::from(mtime),
                    Err(e) => {
                        debug!("Skipping {}: {}", file_path.display(), e);
                        continue;
                    }
                };

                let events = records::parse_session_file(&file_path);
                let first_message = events
                    .iter()
                    .find(|e| e.role == Role::User)
                    .and_then(|e| e.content())
                    .map(render::preview)
                    .unwrap_or_else(|| NO_MESSAGES.to_string());

                sessions.push(SessionSummary {
                    session_id,
                    project_name: project_name.clone(),
                    last_modified,
                    message_count: events.len(),
                    first_message,
                    file_path,
                });
            }
        }

        sessions.sort_by(|a, b| b.last_modified.cmp(&a.last_modified));
        sessions
    }

    /// Resolve one session by id and return it with all of its messages,
    /// or `None` if no session file matches.
    pub fn read_session(&self, session_id: &str) -> Option<SessionDetail> {
        let session = self
            .scan_sessions()
            .into_iter()
            .find(|s| s.session_id == session_id)?;

        let messages = records::parse_session_file(&session.file_path)
            .into_iter()
            .map(|event| DisplayMessage {
                content: render::render_content(event.content()),
                id: event.uuid,
                role: event.role,
                timestamp: event.timestamp,
                parent_uuid: event.parent_uuid,
            })
            .collect();

        Some(SessionDetail { session, messages })
    }

    /// Case-insensitive substring search across every session's messages.
    /// Hits carry a truncated snippet and are ordered newest first across
    /// all sessions. The caller guarantees a non-empty query.
    pub fn search(&self, query: &str) -> Vec<SearchHit> {
        let query_lower = query.to_lowercase();
        let mut hits = Vec::new();

        for session in self.scan_sessions() {
            for event in records::parse_session_file(&session.file_path) {
                let hay = match event.content() {
                    Some(content) => render::haystack(content),
                    None => continue,
                };

                if hay.to_lowercase().contains(&query_lower) {
                    hits.push(SearchHit {
                        session_id: session.session_id.clone(),
                        project_name: session.project_name.clone(),
                        message_id: event.uuid,
                        role: event.role,
                        content: render::truncate(&hay, SNIPPET_MAX_CHARS),
                        timestamp: event.timestamp,
                    });
                }
            }
        }

        // ISO 8601 timestamps sort chronologically as strings.
        hits.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        hits
    }
}

/// Decode a project directory name back to a human-readable path.
///
/// Claude encodes the project's working directory into the directory name
/// with `-` standing in for the path separator (`C--foo-bar` for
/// `C:\foo\bar`). The encoding is lossy: a literal hyphen in a directory
/// name is indistinguishable from a separator, and we deliberately keep
/// the same ambiguous decoding rather than guessing.
fn decode_project_name(dir_name: &str) -> String {
    dir_name.replace("C--", "C:\\").replace('-', "\\")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    /// Builds a log root with one `{project}/{session}.jsonl` per call.
    fn write_session(root: &Path, project: &str, session_id: &str, lines: &[&str]) {
        let project_dir = root.join(project);
        fs::create_dir_all(&project_dir).unwrap();
        let mut file =
            fs::File::create(project_dir.join(format!("{}.{}", session_id, SESSION_LOG_EXT)))
                .unwrap();
        for line in lines {
            writeln!(file, "{}", line).unwrap();
        }
    }

    const USER_HI: &str = r#"{"uuid":"m1","type":"user","message":{"content":"hi"},"timestamp":"2024-03-01T10:00:00Z","parentUuid":null}"#;
    const ASSISTANT_HELLO: &str = r#"{"uuid":"m2","type":"assistant","message":{"content":[{"type":"text","text":"hello there"}]},"timestamp":"2024-03-01T10:00:05Z","parentUuid":"m1"}"#;

    #[test]
    fn test_scan_basic_scenario() {
        let root = TempDir::new().unwrap();
        write_session(root.path(), "-home-user-proj", "abc", &[USER_HI, ASSISTANT_HELLO]);

        let store = SessionStore::new(root.path().to_path_buf());
        let sessions = store.scan_sessions();

        assert_eq!(sessions.len(), 1);
        assert_eq!(sessions[0].session_id, "abc");
        assert_eq!(sessions[0].message_count, 2);
        assert_eq!(sessions[0].first_message, "hi");
    }

    #[test]
    fn test_scan_skips_malformed_and_filtered_lines() {
        let root = TempDir::new().unwrap();
        write_session(
            root.path(),
            "-proj",
            "s1",
            &[
                USER_HI,
                "{{{{not json",
                "",
                r#"{"uuid":"meta1","type":"user","isMeta":true,"message":{"content":"internal"}}"#,
                r#"{"uuid":"relay","type":"user","message":{"content":[{"type":"tool_result","content":"raw output"}]}}"#,
                ASSISTANT_HELLO,
            ],
        );

        let store = SessionStore::new(root.path().to_path_buf());
        let sessions = store.scan_sessions();
        assert_eq!(sessions[0].message_count, 2);
    }

    #[test]
    fn test_scan_ordering_and_idempotence() {
        let root = TempDir::new().unwrap();
        write_session(root.path(), "-proj", "older", &[USER_HI]);
        write_session(root.path(), "-proj", "newer", &[USER_HI]);

        let store = SessionStore::new(root.path().to_path_buf());
        let first = store.scan_sessions();
        assert_eq!(first.len(), 2);
        for pair in first.windows(2) {
            assert!(pair[0].last_modified >= pair[1].last_modified);
        }

        let second = store.scan_sessions();
        let ids = |scan: &[SessionSummary]| {
            scan.iter().map(|s| s.session_id.clone()).collect::<Vec<_>>()
        };
        assert_eq!(ids(&first), ids(&second));
    }

    #[test]
    fn test_scan_missing_root_yields_empty() {
        let store = SessionStore::new(PathBuf::from("/nonexistent/log/root"));
        assert!(store.scan_sessions().is_empty());
    }

    #[test]
    fn test_session_with_no_user_message() {
        let root = TempDir::new().unwrap();
        write_session(root.path(), "-proj", "s1", &[ASSISTANT_HELLO]);

        let store = SessionStore::new(root.path().to_path_buf());
        let sessions = store.scan_sessions();
        assert_eq!(sessions[0].first_message, NO_MESSAGES);
    }

    #[test]
    fn test_read_session_maps_messages() {
        let root = TempDir::new().unwrap();
        write_session(root.path(), "-proj", "abc", &[USER_HI, ASSISTANT_HELLO]);

        let store = SessionStore::new(root.path().to_path_buf());
        let detail = store.read_session("abc").expect("session should resolve");

        assert_eq!(detail.session.session_id, "abc");
        assert_eq!(detail.messages.len(), 2);
        assert_eq!(detail.messages[0].id, "m1");
        assert_eq!(detail.messages[0].content, "hi");
        assert_eq!(detail.messages[0].parent_uuid, None);
        assert_eq!(detail.messages[1].content, "hello there");
        assert_eq!(detail.messages[1].parent_uuid.as_deref(), Some("m1"));
    }

    #[test]
    fn test_read_session_not_found() {
        let root = TempDir::new().unwrap();
        let store = SessionStore::new(root.path().to_path_buf());
        assert!(store.read_session("no-such-id").is_none());
    }

    #[test]
    fn test_search_matches_and_truncates() {
        let root = TempDir::new().unwrap();
        let long_text = "needle ".to_string() + &"x".repeat(300);
        let long_line = format!(
            r#"{{"uuid":"m3","type":"assistant","message":{{"content":[{{"type":"text","text":"{}"}}]}},"timestamp":"2024-03-02T09:00:00Z"}}"#,
            long_text
        );
        write_session(root.path(), "-proj", "abc", &[USER_HI, ASSISTANT_HELLO, &long_line]);

        let store = SessionStore::new(root.path().to_path_buf());

        let hits = store.search("HELLO");
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].content, "hello there");
        assert_eq!(hits[0].message_id, "m2");

        let hits = store.search("needle");
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].content.chars().count(), SNIPPET_MAX_CHARS + 3);
        assert!(hits[0].content.ends_with("..."));
    }

    #[test]
    fn test_search_orders_by_timestamp_desc_across_sessions() {
        let root = TempDir::new().unwrap();
        write_session(
            root.path(),
            "-proj",
            "a",
            &[r#"{"uuid":"m1","type":"user","message":{"content":"needle one"},"timestamp":"2024-01-01T00:00:00Z"}"#],
        );
        write_session(
            root.path(),
            "-proj",
            "b",
            &[r#"{"uuid":"m2","type":"user","message":{"content":"needle two"},"timestamp":"2024-02-01T00:00:00Z"}"#],
        );

        let store = SessionStore::new(root.path().to_path_buf());
        let hits = store.search("needle");
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].message_id, "m2");
        assert_eq!(hits[1].message_id, "m1");
    }

    #[test]
    fn test_search_does_not_match_tool_names() {
        let root = TempDir::new().unwrap();
        write_session(
            root.path(),
            "-proj",
            "s1",
            &[r#"{"uuid":"m1","type":"assistant","message":{"content":[{"type":"tool_use","name":"UniqueToolName"}]},"timestamp":"2024-01-01T00:00:00Z"}"#],
        );

        let store = SessionStore::new(root.path().to_path_buf());
        assert!(store.search("UniqueToolName").is_empty());
    }

    #[test]
    fn test_decode_project_name() {
        assert_eq!(decode_project_name("C--Users-dev-app"), "C:\\Users\\dev\\app");
        // Lossy on purpose: a literal hyphen decodes as a separator too.
        assert_eq!(decode_project_name("-home-user-my-app"), "\\home\\user\\my\\app");
    }
}
