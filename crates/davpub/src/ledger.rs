use std::collections::BTreeSet;
use std::fs;
use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Remote name of the ledger uploaded into the build root.
pub const LEDGER_FILE_NAME: &str = "published-artifacts.json";

/// Ordered, append-only list of URLs published during one run.
///
/// Serialized as a bare JSON array of strings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Ledger {
    entries: Vec<String>,
}

/// URLs present in only one of two ledgers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LedgerDiff {
    pub added: Vec<String>,
    pub removed: Vec<String>,
}

impl LedgerDiff {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, url: impl Into<String>) {
        self.entries.push(url.into());
    }

    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, url: &str) -> bool {
        self.entries.iter().any(|e| e == url)
    }

    /// Write the ledger as JSON, replacing `path` atomically.
    pub fn write_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create ledger dir {}", parent.display()))?;
        }
        atomic_write_json(path, self)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("failed to read ledger {}", path.display()))?;
        serde_json::from_str(&content)
            .with_context(|| format!("failed to parse ledger JSON {}", path.display()))
    }

    /// Entries of `newer` missing here, and entries here missing from `newer`.
    ///
    /// Both lists keep the order of the ledger they come from.
    pub fn diff(&self, newer: &Ledger) -> LedgerDiff {
        let old: BTreeSet<&str> = self.entries.iter().map(String::as_str).collect();
        let new: BTreeSet<&str> = newer.entries.iter().map(String::as_str).collect();
        LedgerDiff {
            added: newer
                .entries
                .iter()
                .filter(|e| !old.contains(e.as_str()))
                .cloned()
                .collect(),
            removed: self
                .entries
                .iter()
                .filter(|e| !new.contains(e.as_str()))
                .cloned()
                .collect(),
        }
    }
}

fn atomic_write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let tmp = path.with_extension("tmp");
    let data = serde_json::to_vec_pretty(value).context("failed to serialize ledger JSON")?;

    {
        let mut f = fs::File::create(&tmp)
            .with_context(|| format!("failed to create tmp file {}", tmp.display()))?;
        f.write_all(&data)
            .with_context(|| format!("failed to write tmp file {}", tmp.display()))?;
        f.sync_all().ok();
    }

    fs::rename(&tmp, path).with_context(|| {
        format!(
            "failed to rename tmp file {} to {}",
            tmp.display(),
            path.display()
        )
    })?;

    Ok(())
}
