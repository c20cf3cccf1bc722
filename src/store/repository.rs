//! File-backed event store
//!
//! Owns the full collection of events, keyed by name, plus the quote-all
//! delimited backing file. CRUD lives here; the per-tick sweep lives in the
//! events service.
//!
//! On disk: one record per line, all eleven fields double-quoted (embedded
//! quotes doubled), comma-separated, UTF-8, no header row, sorted by key.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use tokio::fs;

use super::models::Event;
use crate::error::{AppError, Result};

/// File-backed store of events, keyed by event name.
#[derive(Debug)]
pub struct EventStore {
    path: PathBuf,
    events: BTreeMap<String, Event>,
}

impl EventStore {
    /// Open the store, loading the backing file if it exists. A missing
    /// file is an empty store, not an error.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let mut store = Self {
            path: path.into(),
            events: BTreeMap::new(),
        };
        store.load().await?;
        Ok(store)
    }

    async fn load(&mut self) -> Result<()> {
        let contents = match fs::read_to_string(&self.path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!(
                    "Event store not found at {:?}, using an empty store",
                    self.path
                );
                return Ok(());
            }
            Err(e) => return Err(e.into()),
        };

        for line in contents.lines() {
            if line.trim().is_empty() {
                continue;
            }
            match parse_row(line).and_then(|fields| Event::from_row(&fields)) {
                Ok(event) => {
                    self.events.insert(event.name.clone(), event);
                }
                Err(e) => tracing::warn!("Skipping malformed event row: {}", e),
            }
        }

        tracing::info!("Loaded {} events from {:?}", self.events.len(), self.path);
        Ok(())
    }

    /// Serialize every record, sorted by key, overwriting the backing file.
    pub async fn save(&self) -> Result<()> {
        let mut out = String::new();
        for event in self.events.values() {
            out.push_str(&encode_row(&event.to_row()));
            out.push('\n');
        }

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).await?;
        }
        fs::write(&self.path, out).await?;

        tracing::debug!("Saved {} events to {:?}", self.events.len(), self.path);
        Ok(())
    }

    /// Insert or overwrite the event keyed by its name. Last write wins and
    /// the caller decides when to persist.
    pub fn add(&mut self, event: Event) {
        self.events.insert(event.name.clone(), event);
    }

    /// Delete the named event if present and persist immediately. Deleting
    /// a missing key is a no-op, not an error.
    pub async fn delete(&mut self, name: &str) -> Result<()> {
        if self.events.remove(name).is_some() {
            self.save().await?;
            tracing::info!("Deleted event: {}", name);
        }
        Ok(())
    }

    /// Look up an event by name. A miss returns the sentinel record with
    /// the error marker in the notes field, so display code needs no
    /// special case.
    pub fn get(&self, name: &str) -> Event {
        self.events
            .get(name)
            .cloned()
            .unwrap_or_else(Event::not_found)
    }

    /// All events as display rows, sorted by key ascending. Stage latches
    /// are not included.
    pub fn list(&self) -> Vec<[String; 7]> {
        self.events.values().map(Event::display_row).collect()
    }

    /// Number of stored events.
    pub fn count(&self) -> usize {
        self.events.len()
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Snapshot of the stored keys, so the sweep can mutate records while
    /// iterating.
    pub(crate) fn names(&self) -> Vec<String> {
        self.events.keys().cloned().collect()
    }

    pub(crate) fn get_mut(&mut self, name: &str) -> Option<&mut Event> {
        self.events.get_mut(name)
    }
}

/// Quote every field, doubling embedded quotes, and join with commas.
fn encode_row(fields: &[String]) -> String {
    let quoted: Vec<String> = fields
        .iter()
        .map(|field| format!("\"{}\"", field.replace('"', "\"\"")))
        .collect();
    quoted.join(",")
}

/// Split one stored line into its fields. Accepts quoted fields with
/// doubled embedded quotes as well as bare unquoted fields.
fn parse_row(line: &str) -> Result<Vec<String>> {
    let mut fields = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        if in_quotes {
            if c == '"' {
                if chars.peek() == Some(&'"') {
                    chars.next();
                    field.push('"');
                } else {
                    in_quotes = false;
                }
            } else {
                field.push(c);
            }
        } else {
            match c {
                '"' => in_quotes = true,
                ',' => fields.push(std::mem::take(&mut field)),
                _ => field.push(c),
            }
        }
    }

    if in_quotes {
        return Err(AppError::MalformedRecord(format!(
            "unterminated quote in row: {line}"
        )));
    }

    fields.push(field);
    Ok(fields)
}
