// Source and output resolution for CLI commands

use std::path::PathBuf;

use clap::Args;
use color_eyre::{eyre::Context, Result};
use transcript_core::{JsonlFeed, MessageFeed, SqliteFeed, TranscriptWriter};

#[derive(Args, Debug, Clone)]
pub struct SourceArgs {
    /// SQLite message database (default: ~/.local/share/transcript/messages.db)
    #[arg(long, env = "TRANSCRIPT_DB", conflicts_with = "jsonl")]
    pub db: Option<PathBuf>,
    /// Read raw records from a JSONL export instead of a database
    #[arg(long)]
    pub jsonl: Option<PathBuf>,
    /// Task whose records to read
    #[arg(short, long)]
    pub task: Option<String>,
}

impl SourceArgs {
    pub fn open_feed(&self) -> Result<Box<dyn MessageFeed>> {
        if let Some(ref path) = self.jsonl {
            return Ok(Box::new(JsonlFeed::new(path)));
        }

        let db_path = match self.db {
            Some(ref path) => path.clone(),
            None => default_db_path()?,
        };
        let feed = SqliteFeed::open(&db_path)
            .with_context(|| format!("Failed to open message database {}", db_path.display()))?;
        Ok(Box::new(feed))
    }
}

pub fn default_db_path() -> Result<PathBuf> {
    let home = std::env::var("HOME").context("HOME not set")?;
    Ok(PathBuf::from(home).join(".local/share/transcript/messages.db"))
}

pub fn export_writer(output: Option<&PathBuf>) -> Result<TranscriptWriter> {
    match output {
        Some(dir) => Ok(TranscriptWriter::with_base_dir(dir.clone())),
        None => TranscriptWriter::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn source(db: Option<PathBuf>, jsonl: Option<PathBuf>) -> SourceArgs {
        SourceArgs {
            db,
            jsonl,
            task: Some("task-1".to_string()),
        }
    }

    #[test]
    fn test_jsonl_source_takes_precedence() -> Result<()> {
        let feed = source(None, Some(PathBuf::from("records.jsonl"))).open_feed()?;
        assert_eq!(feed.name(), "jsonl");
        Ok(())
    }

    #[test]
    fn test_missing_database_is_reported() {
        let dir = TempDir::new().unwrap();
        let result = source(Some(dir.path().join("missing.db")), None).open_feed();
        let message = format!("{:?}", result.err().unwrap());
        assert!(message.contains("Failed to open message database"));
    }

    #[test]
    fn test_export_writer_uses_given_dir() -> Result<()> {
        let dir = TempDir::new()?;
        let writer = export_writer(Some(&dir.path().to_path_buf()))?;
        assert_eq!(writer.base_dir(), dir.path());
        Ok(())
    }
}
