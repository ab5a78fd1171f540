//! File-backed history of applied documents
//!
//! Layout of the history directory:
//!
//! ```text
//! <history dir>/
//!   current.yaml                     last successfully applied document
//!   applied-20260101-120000.yaml     one archive copy per recorded change
//!   applied-20260101-120000.1.yaml   next archive within the same second
//! ```
//!
//! `current.yaml` is replaced atomically (temp file in the same directory,
//! then rename), so a crash mid-write leaves the previous record intact.

use anyhow::{Context, Result};
use chrono::{DateTime, Local, NaiveDateTime, TimeZone};
use declarative::{Document, HistoryStore};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

use crate::config::{self, ConfigFormat};

const CURRENT_FILE: &str = "current.yaml";
const ARCHIVE_PREFIX: &str = "applied-";
const ARCHIVE_TIME_FORMAT: &str = "%Y%m%d-%H%M%S";

/// One archived applied document
#[derive(Debug, Clone)]
pub struct ArchiveEntry {
    pub path: PathBuf,
    pub applied_at: Option<DateTime<Local>>,
}

/// History store rooted at a directory
#[derive(Debug, Clone)]
pub struct FileHistory {
    dir: PathBuf,
    /// Read the previous document from here instead of `current.yaml`
    previous_override: Option<PathBuf>,
}

impl FileHistory {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            previous_override: None,
        }
    }

    /// Diff against an explicit document instead of the recorded one
    pub fn with_previous(mut self, path: Option<PathBuf>) -> Self {
        self.previous_override = path;
        self
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the current record
    pub fn current_path(&self) -> PathBuf {
        self.dir.join(CURRENT_FILE)
    }

    /// Load the document to diff against
    pub fn load_previous(&self) -> Result<Option<Document>> {
        match &self.previous_override {
            Some(path) => config::load(path).map(Some),
            None => config::load_optional(&self.current_path()),
        }
    }

    /// Write `document` as the current record and archive a copy
    ///
    /// Returns the archive path, or `None` when `current.yaml` already holds
    /// the same content and nothing was written.
    pub fn save(&self, document: &Document) -> Result<Option<PathBuf>> {
        fs::create_dir_all(&self.dir).with_context(|| {
            format!("Failed to create history directory: {}", self.dir.display())
        })?;

        let content = ConfigFormat::Yaml.render(document)?;
        if fs::read_to_string(self.current_path()).is_ok_and(|current| current == content) {
            log::debug!("History already up to date, not archiving");
            return Ok(None);
        }
        atomic_write(&self.current_path(), &content)?;

        let archive = self.next_archive_path(Local::now());
        fs::write(&archive, &content)
            .with_context(|| format!("Failed to write history archive: {}", archive.display()))?;

        log::debug!(
            "Saved history to {} (archived as {})",
            self.current_path().display(),
            archive.display()
        );
        Ok(Some(archive))
    }

    /// Archived documents, oldest first
    pub fn archives(&self) -> Result<Vec<ArchiveEntry>> {
        if !self.dir.exists() {
            return Ok(Vec::new());
        }

        let mut entries = Vec::new();
        for entry in fs::read_dir(&self.dir)
            .with_context(|| format!("Failed to read history directory: {}", self.dir.display()))?
        {
            let path = entry?.path();
            let Some(stem) = archive_stem(&path) else {
                continue;
            };
            let (stamp, sequence) = split_stem(stem);
            entries.push((
                (stamp.to_string(), sequence),
                ArchiveEntry {
                    applied_at: parse_archive_time(stem),
                    path,
                },
            ));
        }

        // Stamps sort chronologically as text; the sequence breaks ties
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(entries.into_iter().map(|(_, entry)| entry).collect())
    }

    /// First free archive path for `now`
    fn next_archive_path(&self, now: DateTime<Local>) -> PathBuf {
        let stamp = now.format(ARCHIVE_TIME_FORMAT).to_string();
        let mut path = self.dir.join(format!("{ARCHIVE_PREFIX}{stamp}.yaml"));
        let mut counter = 1;
        while path.exists() {
            path = self
                .dir
                .join(format!("{ARCHIVE_PREFIX}{stamp}.{counter}.yaml"));
            counter += 1;
        }
        path
    }
}

impl HistoryStore for FileHistory {
    fn load(&self) -> declarative::Result<Option<Document>> {
        self.load_previous()
            .map_err(|e| declarative::Error::History {
                message: format!("{e:#}"),
            })
    }

    fn record(&mut self, document: &Document) -> declarative::Result<()> {
        self.save(document)
            .map(|_| ())
            .map_err(|e| declarative::Error::History {
                message: format!("{e:#}"),
            })
    }
}

/// Replace `path` with `content` via a temp file in the same directory
fn atomic_write(path: &Path, content: &str) -> Result<()> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let mut tmp = NamedTempFile::new_in(dir)
        .with_context(|| format!("Failed to create temp file in {}", dir.display()))?;
    tmp.write_all(content.as_bytes())
        .context("Failed to write temp file")?;
    tmp.as_file().sync_all().context("Failed to sync temp file")?;
    tmp.persist(path)
        .with_context(|| format!("Failed to replace {}", path.display()))?;
    Ok(())
}

fn archive_stem(path: &Path) -> Option<&str> {
    let name = path.file_name()?.to_str()?;
    name.strip_prefix(ARCHIVE_PREFIX)?.strip_suffix(".yaml")
}

/// Timestamp and same-second sequence of an archive stem (`0` when unsuffixed)
fn split_stem(stem: &str) -> (&str, u32) {
    match stem.split_once('.') {
        Some((stamp, sequence)) => (stamp, sequence.parse().unwrap_or(u32::MAX)),
        None => (stem, 0),
    }
}

fn parse_archive_time(stem: &str) -> Option<DateTime<Local>> {
    let (stamp, _) = split_stem(stem);
    let naive = NaiveDateTime::parse_from_str(stamp, ARCHIVE_TIME_FORMAT).ok()?;
    Local.from_local_datetime(&naive).single()
}

#[cfg(test)]
mod tests {
    use super::*;
    use declarative::Section;

    fn sample() -> Document {
        Document::with_sections(vec![Section::new().with("apt", vec!["git"])])
    }

    #[test]
    fn test_empty_history() {
        let dir = tempfile::tempdir().unwrap();
        let history = FileHistory::new(dir.path().join("missing"));

        assert!(history.load_previous().unwrap().is_none());
        assert!(history.archives().unwrap().is_empty());
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let history = FileHistory::new(dir.path());

        history.save(&sample()).unwrap();

        assert_eq!(history.load_previous().unwrap(), Some(sample()));
        assert_eq!(history.archives().unwrap().len(), 1);
    }

    fn packages(names: &[&str]) -> Document {
        Document::with_sections(vec![Section::new().with("apt", names.to_vec())])
    }

    #[test]
    fn test_archives_do_not_collide() {
        let dir = tempfile::tempdir().unwrap();
        let history = FileHistory::new(dir.path());

        let docs = [packages(&["p0"]), packages(&["p1"]), packages(&["p2"])];
        for doc in &docs {
            assert!(history.save(doc).unwrap().is_some());
        }

        let archives = history.archives().unwrap();
        assert_eq!(archives.len(), 3);
        assert!(archives.iter().all(|a| a.applied_at.is_some()));
        for (archive, doc) in archives.iter().zip(&docs) {
            assert_eq!(config::load(&archive.path).unwrap(), *doc);
        }
        assert_eq!(history.load_previous().unwrap(), Some(docs[2].clone()));
    }

    #[test]
    fn test_archives_order_by_sequence_within_a_second() {
        let dir = tempfile::tempdir().unwrap();
        for name in [
            "applied-20260101-120000.10.yaml",
            "applied-20260101-120000.2.yaml",
            "applied-20260101-120001.yaml",
            "applied-20260101-120000.yaml",
            "applied-20260101-120000.1.yaml",
        ] {
            fs::write(dir.path().join(name), "version: 1\n").unwrap();
        }
        fs::write(dir.path().join(CURRENT_FILE), "version: 1\n").unwrap();

        let history = FileHistory::new(dir.path());
        let names: Vec<String> = history
            .archives()
            .unwrap()
            .iter()
            .map(|a| a.path.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(
            names,
            vec![
                "applied-20260101-120000.yaml",
                "applied-20260101-120000.1.yaml",
                "applied-20260101-120000.2.yaml",
                "applied-20260101-120000.10.yaml",
                "applied-20260101-120001.yaml",
            ]
        );
    }

    #[test]
    fn test_unchanged_save_writes_no_archive() {
        let dir = tempfile::tempdir().unwrap();
        let mut history = FileHistory::new(dir.path());

        assert!(history.save(&sample()).unwrap().is_some());
        assert!(history.save(&sample()).unwrap().is_none());
        HistoryStore::record(&mut history, &sample()).unwrap();

        assert_eq!(history.archives().unwrap().len(), 1);
    }

    #[test]
    fn test_previous_override() {
        let dir = tempfile::tempdir().unwrap();
        let last = dir.path().join("last.yaml");
        fs::write(&last, "version: 1\nsections:\n  - apt: [git]\n").unwrap();

        let history = FileHistory::new(dir.path().join("history")).with_previous(Some(last));
        assert_eq!(history.load_previous().unwrap(), Some(sample()));
    }

    #[test]
    fn test_history_store_impl() {
        let dir = tempfile::tempdir().unwrap();
        let mut history = FileHistory::new(dir.path());

        HistoryStore::record(&mut history, &sample()).unwrap();
        assert_eq!(HistoryStore::load(&history).unwrap(), Some(sample()));
    }

    #[test]
    fn test_corrupt_history_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(CURRENT_FILE), "version: [").unwrap();
        let history = FileHistory::new(dir.path());

        let err = HistoryStore::load(&history).unwrap_err();
        assert!(matches!(err, declarative::Error::History { .. }));
    }

    #[test]
    fn test_parse_archive_time() {
        assert!(parse_archive_time("20260101-120000").is_some());
        assert!(parse_archive_time("20260101-120000.2").is_some());
        assert!(parse_archive_time("garbage").is_none());
        assert_eq!(split_stem("20260101-120000"), ("20260101-120000", 0));
        assert_eq!(split_stem("20260101-120000.12"), ("20260101-120000", 12));
    }
}
