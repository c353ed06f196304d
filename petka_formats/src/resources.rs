use std::collections::BTreeMap;

use anyhow::{Context, Result, bail, ensure};
use serde::Serialize;

/// The `resource.qrc` id → path table. Paths keep the backslash separators
/// the retail data uses; callers normalize when they touch the filesystem.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ResourceTable {
    entries: BTreeMap<u16, String>,
}

impl ResourceTable {
    pub fn from_text(text: &str) -> Result<Self> {
        let mut entries = BTreeMap::new();
        for (index, raw_line) in text.lines().enumerate() {
            let line_no = index + 1;
            let line = raw_line.trim();
            if line.is_empty() || line.starts_with(';') || line.starts_with('#') {
                continue;
            }
            let (id_part, path_part) = line
                .split_once('=')
                .with_context(|| format!("resource line {line_no} has no '='"))?;
            let id: u16 = id_part
                .trim()
                .parse()
                .with_context(|| format!("bad resource id on line {line_no}"))?;
            let path = path_part.trim();
            ensure!(!path.is_empty(), "resource {id} on line {line_no} has an empty path");
            if entries.insert(id, path.to_string()).is_some() {
                bail!("duplicate resource id {id} on line {line_no}");
            }
        }
        Ok(Self { entries })
    }

    pub fn from_entries(entries: impl IntoIterator<Item = (u16, String)>) -> Self {
        Self {
            entries: entries.into_iter().collect(),
        }
    }

    pub fn get(&self, id: u16) -> Option<&str> {
        self.entries.get(&id).map(String::as_str)
    }

    pub fn contains(&self, id: u16) -> bool {
        self.entries.contains_key(&id)
    }

    pub fn iter(&self) -> impl Iterator<Item = (u16, &str)> {
        self.entries.iter().map(|(id, path)| (*id, path.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Counts entries per uppercased extension, for the statistics view.
    /// Paths without a dot stay out of the histogram.
    pub fn filetype_counts(&self) -> BTreeMap<String, usize> {
        let mut counts = BTreeMap::new();
        for path in self.entries.values() {
            if let Some(filetype) = filetype_of(path) {
                *counts.entry(filetype).or_insert(0) += 1;
            }
        }
        counts
    }

    /// Entries in one filetype bucket. The filetype matches case
    /// insensitively, so the lowercase form a user types finds the
    /// uppercase keys of `filetype_counts`.
    pub fn iter_by_filetype(&self, filetype: &str) -> impl Iterator<Item = (u16, &str)> {
        let wanted = filetype.to_ascii_uppercase();
        self.entries
            .iter()
            .map(|(id, path)| (*id, path.as_str()))
            .filter(move |(_, path)| filetype_of(path).as_deref() == Some(wanted.as_str()))
    }
}

/// Everything after the last dot in the path, uppercased. `None` when the
/// path has no dot at all.
fn filetype_of(path: &str) -> Option<String> {
    let dot = path.rfind('.')?;
    Some(path[dot + 1..].to_ascii_uppercase())
}
