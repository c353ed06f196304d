use std::fmt;

use anyhow::Result;
use serde::Serialize;

use crate::ini::IniFile;

/// Addresses one loadable data unit. The retail games split their data into
/// parts, some of which carry chapters; the demo keeps everything in the
/// data root as part 0.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PartId {
    pub part: u32,
    pub chapter: u32,
}

impl PartId {
    pub fn new(part: u32, chapter: u32) -> Self {
        Self { part, chapter }
    }

    /// Directory of this part relative to the data root, `None` for part 0.
    pub fn subdir(&self) -> Option<String> {
        if self.part == 0 {
            return None;
        }
        let mut dir = format!("part{}", self.part);
        if self.chapter > 0 {
            dir.push_str(&format!("/chapter{}", self.chapter));
        }
        Some(dir)
    }

    /// Relative path of one of this part's files under the data root.
    pub fn file_path(&self, file: &str) -> String {
        match self.subdir() {
            Some(dir) => format!("{dir}/{file}"),
            None => file.to_string(),
        }
    }
}

impl fmt::Display for PartId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "part {}", self.part)?;
        if self.chapter > 0 {
            write!(f, " chapter {}", self.chapter)?;
        }
        Ok(())
    }
}

/// Part titles from `parts.ini`, in file order.
pub fn parse_part_list(text: &str) -> Result<Vec<String>> {
    let ini = IniFile::parse(text)?;
    let Some(section) = ini.section("Parts") else {
        return Ok(Vec::new());
    };
    Ok(section.pairs().map(|(_, value)| value.to_string()).collect())
}
