use std::collections::BTreeMap;

use anyhow::{Context, Result, ensure};
use serde::Serialize;

use crate::script::{CastColor, EnterArea};

/// Minimal reader for the ini-family tables a part ships (`parts.ini`,
/// `names.ini`, `cast.ini`, `bgs.ini`, `invntr.txt`). Pairs keep file order;
/// pairs before the first section header land in the unnamed section.
#[derive(Debug, Clone, Default)]
pub struct IniFile {
    sections: BTreeMap<String, IniSection>,
}

#[derive(Debug, Clone, Default)]
pub struct IniSection {
    pairs: Vec<(String, String)>,
}

impl IniFile {
    pub fn parse(text: &str) -> Result<Self> {
        let mut sections: BTreeMap<String, IniSection> = BTreeMap::new();
        let mut current = String::new();
        for (index, raw_line) in text.lines().enumerate() {
            let line_no = index + 1;
            let line = raw_line.trim();
            if line.is_empty() || line.starts_with(';') || line.starts_with('#') {
                continue;
            }
            if let Some(header) = line.strip_prefix('[') {
                let name = header
                    .strip_suffix(']')
                    .with_context(|| format!("unterminated section header on line {line_no}"))?;
                current = name.trim().to_string();
                sections.entry(current.clone()).or_default();
                continue;
            }
            let (key, value) = line.split_once('=').with_context(|| {
                format!("line {line_no} is neither a section header nor a key=value pair")
            })?;
            sections
                .entry(current.clone())
                .or_default()
                .pairs
                .push((key.trim().to_string(), value.trim().to_string()));
        }
        Ok(Self { sections })
    }

    pub fn section(&self, name: &str) -> Option<&IniSection> {
        self.sections.get(name)
    }

    pub fn sections(&self) -> impl Iterator<Item = (&str, &IniSection)> {
        self.sections
            .iter()
            .map(|(name, section)| (name.as_str(), section))
    }

    /// Every pair from every section, section by section.
    pub fn flattened(&self) -> impl Iterator<Item = (&str, &str)> {
        self.sections.values().flat_map(IniSection::pairs)
    }
}

impl IniSection {
    pub fn get(&self, key: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(key))
            .map(|(_, value)| value.as_str())
    }

    pub fn pairs(&self) -> impl Iterator<Item = (&str, &str)> {
        self.pairs
            .iter()
            .map(|(key, value)| (key.as_str(), value.as_str()))
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}

/// Flat name → value table (`names.ini`, `invntr.txt`). Section headers, if
/// any, are only grouping and get merged away.
pub fn parse_name_table(text: &str) -> Result<BTreeMap<String, String>> {
    let ini = IniFile::parse(text)?;
    let mut table = BTreeMap::new();
    for (key, value) in ini.flattened() {
        table.insert(key.to_string(), value.to_string());
    }
    Ok(table)
}

/// `cast.ini`: record name → speech color, value is "r g b".
pub fn parse_cast_table(text: &str) -> Result<BTreeMap<String, CastColor>> {
    let ini = IniFile::parse(text)?;
    let mut table = BTreeMap::new();
    for (key, value) in ini.flattened() {
        let color = parse_color(value).with_context(|| format!("cast color for {key:?}"))?;
        table.insert(key.to_string(), color);
    }
    Ok(table)
}

fn parse_color(value: &str) -> Result<CastColor> {
    let mut parts = value.split_whitespace();
    let mut channel = |name: &str| -> Result<u8> {
        let text = parts
            .next()
            .with_context(|| format!("missing {name} channel"))?;
        text.parse()
            .with_context(|| format!("bad {name} channel {text:?}"))
    };
    let r = channel("red")?;
    let g = channel("green")?;
    let b = channel("blue")?;
    ensure!(parts.next().is_none(), "color has more than three channels");
    Ok(CastColor { r, g, b })
}

/// Per-scene display settings from `bgs.ini`: one section per scene name,
/// a `persp` line with five values and any number of `entranceN` lines of
/// the form `from scene, on object`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SceneSettings {
    pub perspective: Option<[f32; 5]>,
    pub enter_areas: Vec<EnterArea>,
}

pub fn parse_scene_settings(text: &str) -> Result<BTreeMap<String, SceneSettings>> {
    let ini = IniFile::parse(text)?;
    let mut table = BTreeMap::new();
    for (name, section) in ini.sections() {
        if name.is_empty() {
            continue;
        }
        let mut settings = SceneSettings::default();
        for (key, value) in section.pairs() {
            if key.eq_ignore_ascii_case("persp") {
                let perspective =
                    parse_perspective(value).with_context(|| format!("perspective of {name}"))?;
                settings.perspective = Some(perspective);
            } else if key.to_ascii_lowercase().starts_with("entrance") {
                let (from_scene, on_object) = value.split_once(',').with_context(|| {
                    format!("entrance {key} of {name} is not 'scene, object'")
                })?;
                settings.enter_areas.push(EnterArea {
                    from_scene: from_scene.trim().to_string(),
                    on_object: on_object.trim().to_string(),
                });
            }
            // other keys are engine settings this toolkit does not read
        }
        table.insert(name.to_string(), settings);
    }
    Ok(table)
}

fn parse_perspective(value: &str) -> Result<[f32; 5]> {
    let parts: Vec<&str> = value.split_whitespace().collect();
    ensure!(parts.len() == 5, "expected five values, got {}", parts.len());
    let mut values = [0f32; 5];
    for (slot, part) in values.iter_mut().zip(&parts) {
        *slot = part
            .parse()
            .with_context(|| format!("bad perspective value {part:?}"))?;
    }
    Ok(values)
}
