// Plain-text transcript export
// Writes rendered transcripts to <base>/<task_id>/{messages.jsonl,task.json}

use color_eyre::{eyre::Context, Result};
use serde_json::{json, Map, Value};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::types::DisplayMessage;

const MESSAGES_FILE: &str = "messages.jsonl";
const METADATA_FILE: &str = "task.json";

/// Plain-text transcript writer
pub struct TranscriptWriter {
    base_dir: PathBuf,
}

impl TranscriptWriter {
    /// Create a new writer with the default base directory
    pub fn new() -> Result<Self> {
        let home = std::env::var("HOME").context("HOME not set")?;
        let base_dir = PathBuf::from(home).join("Assistants").join("transcripts");
        Ok(TranscriptWriter { base_dir })
    }

    /// Create a new writer with a custom base directory
    pub fn with_base_dir(base_dir: PathBuf) -> Self {
        TranscriptWriter { base_dir }
    }

    fn task_dir(&self, task_id: &str) -> PathBuf {
        self.base_dir.join(task_id)
    }

    pub fn messages_path(&self, task_id: &str) -> PathBuf {
        self.task_dir(task_id).join(MESSAGES_FILE)
    }

    /// Append display messages to the task's messages.jsonl
    pub fn append_messages(&self, task_id: &str, messages: &[DisplayMessage]) -> Result<PathBuf> {
        let task_dir = self.task_dir(task_id);
        fs::create_dir_all(&task_dir)
            .with_context(|| format!("Failed to create directory: {}", task_dir.display()))?;

        let messages_path = self.messages_path(task_id);
        let mut file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&messages_path)
            .with_context(|| format!("Failed to open {}", messages_path.display()))?;

        for message in messages {
            serde_json::to_writer(&mut file, message)?;
            writeln!(file)?;
        }

        Ok(messages_path)
    }

    fn read_metadata(&self, task_id: &str) -> Result<Map<String, Value>> {
        let path = self.task_dir(task_id).join(METADATA_FILE);
        if !path.exists() {
            return Ok(Map::new());
        }

        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let value: Value = serde_json::from_str(&content)
            .with_context(|| format!("Invalid metadata in {}", path.display()))?;

        Ok(match value {
            Value::Object(map) => map,
            _ => Map::new(),
        })
    }

    /// Merge fields into task.json, keeping any existing keys not in `updates`
    pub fn update_task_metadata(&self, task_id: &str, updates: Value) -> Result<()> {
        let task_dir = self.task_dir(task_id);
        fs::create_dir_all(&task_dir)
            .with_context(|| format!("Failed to create directory: {}", task_dir.display()))?;

        let mut merged = self.read_metadata(task_id)?;
        merged.insert("task_id".to_string(), json!(task_id));
        if let Value::Object(updates) = updates {
            merged.extend(updates);
        }

        let path = task_dir.join(METADATA_FILE);
        let mut file = fs::File::create(&path)
            .with_context(|| format!("Failed to create {}", path.display()))?;
        serde_json::to_writer_pretty(&mut file, &Value::Object(merged))?;

        Ok(())
    }

    /// Id of the newest raw record already exported for a task
    pub fn load_checkpoint(&self, task_id: &str) -> Result<Option<String>> {
        Ok(self
            .read_metadata(task_id)?
            .get("last_record_id")
            .and_then(Value::as_str)
            .map(String::from))
    }

    /// Number of messages exported so far
    pub fn message_count(&self, task_id: &str) -> Result<u64> {
        Ok(self
            .read_metadata(task_id)?
            .get("message_count")
            .and_then(Value::as_u64)
            .unwrap_or(0))
    }

    /// Get the base directory
    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }
}
