use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use walkdir::WalkDir;

use crate::strings::TextCodec;

/// Case-insensitive view of the data tree. Shipped discs mix upper and lower
/// case freely, so every lookup goes through a lowercased relative path
/// built once per scan. Backslash and slash separators are interchangeable.
#[derive(Debug, Clone, Default)]
pub struct FileMap {
    root: PathBuf,
    paths: BTreeMap<String, PathBuf>,
}

impl FileMap {
    pub fn scan(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref();
        let mut paths = BTreeMap::new();
        for entry in WalkDir::new(root) {
            let entry = entry.with_context(|| format!("scanning {}", root.display()))?;
            if !entry.file_type().is_file() {
                continue;
            }
            let relative = entry.path().strip_prefix(root).with_context(|| {
                format!(
                    "path {} is outside {}",
                    entry.path().display(),
                    root.display()
                )
            })?;
            paths.insert(
                normalize(&relative.to_string_lossy()),
                entry.path().to_path_buf(),
            );
        }
        Ok(Self {
            root: root.to_path_buf(),
            paths,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    pub fn find(&self, name: &str) -> Option<&Path> {
        self.paths.get(&normalize(name)).map(PathBuf::as_path)
    }

    pub fn read(&self, name: &str) -> Result<Vec<u8>> {
        let path = self
            .find(name)
            .with_context(|| format!("no file {name:?} under {}", self.root.display()))?;
        fs::read(path).with_context(|| format!("reading {}", path.display()))
    }

    pub fn read_text(&self, name: &str, codec: TextCodec) -> Result<String> {
        Ok(codec.decode(&self.read(name)?))
    }
}

fn normalize(name: &str) -> String {
    name.replace('\\', "/").to_lowercase()
}
