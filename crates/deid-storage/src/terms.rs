//! Persisted blacklist, one term per line.

use std::fs;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::{Result, StorageError};

pub struct TermStore {
    path: PathBuf,
}

impl TermStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Stored terms in file order. A missing file is an empty list.
    pub fn load(&self) -> Result<Vec<String>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let content =
            fs::read_to_string(&self.path).map_err(|e| StorageError::io(&self.path, e))?;
        Ok(content
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(String::from)
            .collect())
    }

    /// Overwrite the file with `terms`.
    pub fn save(&self, terms: &[String]) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| StorageError::io(parent, e))?;
        }
        let file = fs::File::create(&self.path).map_err(|e| StorageError::io(&self.path, e))?;
        let mut writer = BufWriter::new(file);
        for term in terms {
            writeln!(writer, "{}", term).map_err(|e| StorageError::io(&self.path, e))?;
        }
        writer.flush().map_err(|e| StorageError::io(&self.path, e))?;
        debug!("Saved {} terms to {}", terms.len(), self.path.display());
        Ok(())
    }

    /// Append `term` unless it is blank or already stored. Returns whether
    /// the file changed.
    pub fn add(&self, term: &str) -> Result<bool> {
        let term = term.trim();
        if term.is_empty() {
            return Ok(false);
        }
        let mut terms = self.load()?;
        if terms.iter().any(|t| t == term) {
            return Ok(false);
        }
        terms.push(term.to_string());
        self.save(&terms)?;
        Ok(true)
    }

    /// Remove the first occurrence of `term`. Returns whether it was present.
    pub fn remove(&self, term: &str) -> Result<bool> {
        let term = term.trim();
        let mut terms = self.load()?;
        match terms.iter().position(|t| t == term) {
            Some(index) => {
                terms.remove(index);
                self.save(&terms)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

/// Session terms followed by persisted terms. Duplicates are kept; the
/// matcher tolerates them.
pub fn combine(session: &[String], persisted: &[String]) -> Vec<String> {
    session.iter().chain(persisted).cloned().collect()
}
