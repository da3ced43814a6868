use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

use crate::config::Provider;

/// Total entries retained across all repositories; oldest dropped first.
pub const MAX_ENTRIES: usize = 100;
pub const DEFAULT_LIMIT: usize = 10;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub timestamp: DateTime<Utc>,
    pub repo_path: String,
    pub message: String,
    pub provider: Provider,
    pub model: String,
    pub files_changed: Vec<String>,
}

/// File-backed log of generated messages. One JSON file holds every
/// repository's entries; `repo_path` scopes reads and clears. Appends are
/// write-to-temp-then-rename, so an interrupted run never leaves a
/// half-written file behind.
#[derive(Debug)]
pub struct MessageHistory {
    storage_file: PathBuf,
}

impl MessageHistory {
    pub fn new(storage_file: PathBuf) -> Self {
        Self { storage_file }
    }

    pub fn open_default() -> Result<Self> {
        let proj_dirs = ProjectDirs::from("com", "quill", "quill")
            .ok_or_else(|| anyhow::anyhow!("Could not determine data directory"))?;
        Ok(Self::new(proj_dirs.data_dir().join("history.json")))
    }

    /// A missing or corrupt file reads as an empty log.
    fn load(&self) -> Vec<HistoryEntry> {
        fs::read_to_string(&self.storage_file)
            .ok()
            .and_then(|content| serde_json::from_str(&content).ok())
            .unwrap_or_default()
    }

    fn write(&self, entries: &[HistoryEntry]) -> Result<()> {
        if let Some(parent) = self.storage_file.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("could not create {:?}", parent))?;
        }
        let json = serde_json::to_string_pretty(entries)?;
        let tmp = self.storage_file.with_extension("json.tmp");
        fs::write(&tmp, json).with_context(|| format!("could not write {:?}", tmp))?;
        fs::rename(&tmp, &self.storage_file)
            .with_context(|| format!("could not replace {:?}", self.storage_file))?;
        Ok(())
    }

    pub fn append(&self, entry: HistoryEntry) -> Result<()> {
        let mut entries = self.load();
        entries.push(entry);
        if entries.len() > MAX_ENTRIES {
            let excess = entries.len() - MAX_ENTRIES;
            entries.drain(..excess);
        }
        self.write(&entries)
    }

    /// Entries, most recent first. `repo_path` restricts to one repository;
    /// `limit` caps the result.
    pub fn list(&self, repo_path: Option<&str>, limit: Option<usize>) -> Vec<HistoryEntry> {
        let mut entries = self.load();
        if let Some(repo) = repo_path {
            entries.retain(|e| e.repo_path == repo);
        }
        entries.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        if let Some(limit) = limit {
            entries.truncate(limit);
        }
        entries
    }

    /// Remove entries for one repository, or everything when `repo_path`
    /// is `None`.
    pub fn clear(&self, repo_path: Option<&str>) -> Result<()> {
        match repo_path {
            None => {
                if self.storage_file.exists() {
                    fs::remove_file(&self.storage_file)
                        .with_context(|| format!("could not remove {:?}", self.storage_file))?;
                }
                Ok(())
            }
            Some(repo) => {
                let mut entries = self.load();
                entries.retain(|e| e.repo_path != repo);
                self.write(&entries)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use pretty_assertions::assert_eq;

    fn entry(repo: &str, message: &str, offset_secs: i64) -> HistoryEntry {
        HistoryEntry {
            timestamp: Utc::now() + Duration::seconds(offset_secs),
            repo_path: repo.to_string(),
            message: message.to_string(),
            provider: Provider::Anthropic,
            model: "claude-3-haiku-20240307".to_string(),
            files_changed: vec!["src/lib.rs".to_string()],
        }
    }

    fn temp_history() -> (tempfile::TempDir, MessageHistory) {
        let dir = tempfile::tempdir().unwrap();
        let history = MessageHistory::new(dir.path().join("history.json"));
        (dir, history)
    }

    #[test]
    fn append_then_list_limit_one_returns_the_entry() {
        let (_dir, history) = temp_history();
        history.append(entry("/repo/a", "Add parser", 0)).unwrap();

        let listed = history.list(Some("/repo/a"), Some(1));
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].message, "Add parser");
        assert_eq!(listed[0].repo_path, "/repo/a");
    }

    #[test]
    fn list_returns_most_recent_first() {
        let (_dir, history) = temp_history();
        for i in 0..5 {
            history
                .append(entry("/repo/a", &format!("message {}", i), i))
                .unwrap();
        }

        let listed = history.list(None, None);
        assert_eq!(listed.len(), 5);
        let timestamps: Vec<_> = listed.iter().map(|e| e.timestamp).collect();
        let mut sorted = timestamps.clone();
        sorted.sort_by(|a, b| b.cmp(a));
        assert_eq!(timestamps, sorted);
        assert_eq!(listed[0].message, "message 4");
    }

    #[test]
    fn list_without_repo_merges_all_repositories() {
        let (_dir, history) = temp_history();
        history.append(entry("/repo/a", "from a", 0)).unwrap();
        history.append(entry("/repo/b", "from b", 1)).unwrap();

        assert_eq!(history.list(None, None).len(), 2);
        assert_eq!(history.list(Some("/repo/a"), None).len(), 1);
    }

    #[test]
    fn scoped_clear_leaves_other_repositories() {
        let (_dir, history) = temp_history();
        history.append(entry("/repo/a", "from a", 0)).unwrap();
        history.append(entry("/repo/b", "from b", 1)).unwrap();

        history.clear(Some("/repo/a")).unwrap();

        assert!(history.list(Some("/repo/a"), None).is_empty());
        let remaining = history.list(None, None);
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].repo_path, "/repo/b");
    }

    #[test]
    fn full_clear_removes_everything() {
        let (_dir, history) = temp_history();
        history.append(entry("/repo/a", "from a", 0)).unwrap();
        history.append(entry("/repo/b", "from b", 1)).unwrap();

        history.clear(None).unwrap();
        assert!(history.list(None, None).is_empty());
        // Clearing an already-empty store is fine.
        history.clear(None).unwrap();
    }

    #[test]
    fn retention_cap_drops_the_oldest_entries() {
        let (_dir, history) = temp_history();
        for i in 0..(MAX_ENTRIES + 5) {
            history
                .append(entry("/repo/a", &format!("message {}", i), i as i64))
                .unwrap();
        }

        let listed = history.list(Some("/repo/a"), None);
        assert_eq!(listed.len(), MAX_ENTRIES);
        assert_eq!(listed[0].message, format!("message {}", MAX_ENTRIES + 4));
        assert!(listed.iter().all(|e| e.message != "message 0"));
    }

    #[test]
    fn corrupt_file_reads_as_empty() {
        let (_dir, history) = temp_history();
        history.append(entry("/repo/a", "ok", 0)).unwrap();
        fs::write(history.storage_file.clone(), "{ not json").unwrap();

        assert!(history.list(None, None).is_empty());
        // And the store recovers on the next append.
        history.append(entry("/repo/a", "recovered", 1)).unwrap();
        assert_eq!(history.list(None, None).len(), 1);
    }
}
