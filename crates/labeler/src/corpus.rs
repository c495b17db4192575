//! The training corpus: deduplicated, ordered, tab-separated rows.
//!
//! Entries are keyed by [`TrainingItem`] (creation time, repository name,
//! item number). The key deliberately ignores the label, so an item carrying
//! two labels of interest occupies a single row: whichever label was inserted
//! first. Later inserts under an existing key are dropped.
//!
//! Serialization walks the map in key order, so the output is sorted by
//! `(created_at, repository_name, identifier)` no matter how entries arrived.

use std::collections::btree_map::Entry;
use std::collections::{BTreeMap, BTreeSet};
use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use tempfile::NamedTempFile;
use thiserror::Error;

use crate::repository::RepositoryRef;

/// Header row of every corpus file.
pub const HEADER: &str = "CombinedID\tID\tLabel\tTitle\tDescription\tAuthor\tIsPR\tFilePaths";

/// Author recorded when the original account no longer exists.
pub const DELETED_USER: &str = "ghost";

/// Seconds between 1601-01-01 and the Unix epoch.
const FILE_TIME_EPOCH_OFFSET_SECS: i64 = 11_644_473_600;

/// 100-nanosecond intervals per second.
const TICKS_PER_SECOND: i64 = 10_000_000;

/// Errors raised while reading or writing corpus files.
#[derive(Debug, Error)]
pub enum CorpusError {
    #[error("failed to access corpus file {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("malformed corpus line {line}: {reason}")]
    MalformedLine { line: usize, reason: String },
}

/// Convert a timestamp to file-time ticks (100ns intervals since 1601-01-01 UTC).
pub fn file_time_ticks(at: DateTime<Utc>) -> i64 {
    (at.timestamp() + FILE_TIME_EPOCH_OFFSET_SECS) * TICKS_PER_SECOND
        + i64::from(at.timestamp_subsec_nanos() / 100)
}

/// Replace characters that would break the row format.
///
/// Control characters (carriage returns, newlines, tabs and the rest) become
/// spaces; double quotes become backticks. Applying it twice gives the same
/// result as applying it once.
pub fn sanitize(text: &str) -> String {
    text.chars()
        .map(|c| match c {
            '"' => '`',
            c if c.is_control() => ' ',
            other => other,
        })
        .collect()
}

/// Identity of a corpus entry.
///
/// Field order matters: the derived ordering is the output ordering.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TrainingItem {
    /// Creation time in file-time ticks.
    pub created_at: i64,
    pub repository_name: String,
    /// Item number, unique within a repository.
    pub identifier: u64,
}

impl TrainingItem {
    pub fn new(created_at: DateTime<Utc>, identifier: u64, repository_name: impl Into<String>) -> Self {
        Self {
            created_at: file_time_ticks(created_at),
            repository_name: repository_name.into(),
            identifier,
        }
    }

    /// The `ticks,repository,number` composite id that opens each row.
    pub fn combined_id(&self) -> String {
        format!(
            "{},{},{}",
            self.created_at, self.repository_name, self.identifier
        )
    }

    /// Parse a composite id back into a key.
    pub fn parse_combined_id(combined: &str) -> Option<Self> {
        let mut parts = combined.split(',');
        let (ticks, repo, number) = (parts.next()?, parts.next()?, parts.next()?);
        if parts.next().is_some() || repo.is_empty() {
            return None;
        }
        Some(Self {
            created_at: ticks.parse().ok()?,
            repository_name: repo.to_string(),
            identifier: number.parse().ok()?,
        })
    }
}

/// Raw content of one row before sanitization.
#[derive(Debug, Clone, Copy)]
pub struct Record<'a> {
    pub label: &'a str,
    pub title: &'a str,
    pub body: Option<&'a str>,
    pub author: Option<&'a str>,
    /// Changed files; `Some` marks the row as a pull request.
    pub files: Option<&'a [String]>,
}

/// A fully serialized corpus row, without the trailing newline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CorpusLine(String);

impl CorpusLine {
    pub fn new(key: &TrainingItem, record: &Record<'_>) -> Self {
        let (is_pr, files) = match record.files {
            Some(files) => (
                1,
                files
                    .iter()
                    .map(|f| sanitize(f))
                    .collect::<Vec<_>>()
                    .join(";"),
            ),
            None => (0, String::new()),
        };

        Self(format!(
            "{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}",
            key.combined_id(),
            key.identifier,
            sanitize(record.label),
            sanitize(record.title),
            sanitize(record.body.unwrap_or_default()),
            sanitize(record.author.unwrap_or(DELETED_USER)),
            is_pr,
            files
        ))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The label column.
    pub fn label(&self) -> &str {
        self.0.split('\t').nth(2).unwrap_or_default()
    }

    /// Whether this row describes a pull request.
    pub fn is_pull_request(&self) -> bool {
        self.0.split('\t').nth(6) == Some("1")
    }
}

/// Deduplicated, ordered collection of corpus rows.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Corpus {
    entries: BTreeMap<TrainingItem, CorpusLine>,
}

impl Corpus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert unless the key is already present. Returns whether it was inserted.
    pub fn insert(&mut self, key: TrainingItem, line: CorpusLine) -> bool {
        match self.entries.entry(key) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                slot.insert(line);
                true
            }
        }
    }

    /// Move every entry of `other` in, keeping existing entries on collision.
    /// Returns how many entries were added.
    pub fn merge(&mut self, other: Corpus) -> usize {
        let mut added = 0;
        for (key, line) in other.entries {
            if self.insert(key, line) {
                added += 1;
            }
        }
        added
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, key: &TrainingItem) -> Option<&CorpusLine> {
        self.entries.get(key)
    }

    /// Entries in output order.
    pub fn iter(&self) -> impl Iterator<Item = (&TrainingItem, &CorpusLine)> {
        self.entries.iter()
    }

    /// Item numbers already held for `repo`.
    pub fn numbers_for(&self, repo: &RepositoryRef) -> BTreeSet<u64> {
        self.entries
            .keys()
            .filter(|k| repo.matches_name(&k.repository_name))
            .map(|k| k.identifier)
            .collect()
    }

    /// Write the header and every row in key order.
    pub fn write_to<W: Write>(&self, mut writer: W) -> io::Result<()> {
        writeln!(writer, "{HEADER}")?;
        for line in self.entries.values() {
            writeln!(writer, "{}", line.as_str())?;
        }
        writer.flush()
    }

    /// Write the corpus to `path`, replacing any existing file.
    ///
    /// Rows go to a temporary file next to `path` that is renamed over it, so
    /// a failed write leaves the previous file intact.
    pub fn save(&self, path: &Path) -> Result<(), CorpusError> {
        let io_err = |source: io::Error| CorpusError::Io {
            path: path.to_path_buf(),
            source,
        };
        let dir = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or(Path::new("."));

        let mut file = NamedTempFile::new_in(dir).map_err(io_err)?;
        self.write_to(BufWriter::new(&mut file)).map_err(io_err)?;
        file.persist(path).map_err(|e| io_err(e.error))?;
        Ok(())
    }

    /// Read a previously written corpus file.
    pub fn load(path: &Path) -> Result<Self, CorpusError> {
        let file = File::open(path).map_err(|source| CorpusError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::read_from(BufReader::new(file)).map_err(|e| match e {
            CorpusError::Io { source, .. } => CorpusError::Io {
                path: path.to_path_buf(),
                source,
            },
            other => other,
        })
    }

    /// Parse corpus rows. A header row and blank lines are skipped.
    pub fn read_from<R: BufRead>(reader: R) -> Result<Self, CorpusError> {
        let mut corpus = Self::new();

        for (index, line) in reader.lines().enumerate() {
            let line = line.map_err(|source| CorpusError::Io {
                path: PathBuf::new(),
                source,
            })?;
            let line_number = index + 1;
            let trimmed = line.trim_end_matches('\r');

            if trimmed.is_empty() || trimmed == HEADER {
                continue;
            }

            let fields = trimmed.split('\t').count();
            if fields != 8 {
                return Err(CorpusError::MalformedLine {
                    line: line_number,
                    reason: format!("expected 8 tab-separated fields, found {fields}"),
                });
            }

            let combined = trimmed.split('\t').next().unwrap_or_default();
            let key = TrainingItem::parse_combined_id(combined).ok_or_else(|| {
                CorpusError::MalformedLine {
                    line: line_number,
                    reason: format!("invalid combined id '{combined}'"),
                }
            })?;

            corpus.insert(key, CorpusLine(trimmed.to_string()));
        }

        Ok(corpus)
    }
}
