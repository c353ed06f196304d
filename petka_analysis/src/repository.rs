use std::collections::btree_map::Entry;
use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result};
use log::warn;

use petka_formats::dialogs::{DialogFile, MessageFile};
use petka_formats::ini::{self, SceneSettings};
use petka_formats::part::{self, PartId};
use petka_formats::script::CastColor;
use petka_formats::{
    BackgroundEntry, BackgroundFile, DialogGroup, DialogOpcode, FileMap, Message, ResourceTable,
    ScriptFile, ScriptRecord, TextCodec,
};

/// Everything one part contributes, before lookup tables are built. Tests
/// assemble this directly; `Repository::from_files` fills it from a data
/// tree.
#[derive(Debug, Clone, Default)]
pub struct PartData {
    pub part: PartId,
    pub part_names: Vec<String>,
    pub objects: Vec<ScriptRecord>,
    pub scenes: Vec<ScriptRecord>,
    pub messages: Vec<Message>,
    pub resources: ResourceTable,
    pub dialog_groups: Vec<DialogGroup>,
    pub names: BTreeMap<String, String>,
    pub inventory: BTreeMap<String, String>,
}

/// The loaded record set of one part. Immutable once built; the analysis
/// passes only ever borrow it.
#[derive(Debug, Clone)]
pub struct Repository {
    part: PartId,
    part_names: Vec<String>,
    records: Vec<ScriptRecord>,
    object_count: usize,
    record_index: BTreeMap<u16, usize>,
    messages: Vec<Message>,
    message_by_wav: BTreeMap<(u16, String), u16>,
    resources: ResourceTable,
    dialog_groups: Vec<DialogGroup>,
    group_index: BTreeMap<u16, usize>,
    names: BTreeMap<String, String>,
    inventory: BTreeMap<String, String>,
}

impl Repository {
    /// Scans `root` and loads one part from it.
    pub fn load(root: impl AsRef<Path>, part: PartId, codec: TextCodec) -> Result<Self> {
        let files = FileMap::scan(root)?;
        Self::from_files(&files, part, codec)
    }

    pub fn from_files(files: &FileMap, part: PartId, codec: TextCodec) -> Result<Self> {
        let script_path = part.file_path("script.dat");
        let script_bytes = files
            .read(&script_path)
            .with_context(|| format!("loading {part}"))?;
        let mut script = ScriptFile::from_bytes(&script_bytes, codec)
            .with_context(|| format!("parsing {script_path}"))?;

        let resource_path = part.file_path("resource.qrc");
        let resource_text = files
            .read_text(&resource_path, codec)
            .with_context(|| format!("loading {part}"))?;
        let resources = ResourceTable::from_text(&resource_text)
            .with_context(|| format!("parsing {resource_path}"))?;

        // parts.ini lives next to the data root, not inside a part
        let part_names =
            load_optional_text(files, "parts.ini", codec, |text| part::parse_part_list(text))
                .unwrap_or_default();

        if let Some(entries) = load_optional(files, &part.file_path("backgrnd.bg"), |bytes| {
            BackgroundFile::from_bytes(bytes, codec).map(|file| file.entries)
        }) {
            attach_backgrounds(&mut script.scenes, entries);
        }

        if let Some(settings) = load_optional_text(files, &part.file_path("bgs.ini"), codec, |text| {
            ini::parse_scene_settings(text)
        }) {
            attach_scene_settings(&mut script.scenes, &settings);
        }

        if let Some(cast) = load_optional_text(files, &part.file_path("cast.ini"), codec, |text| {
            ini::parse_cast_table(text)
        }) {
            attach_cast_colors(
                script.objects.iter_mut().chain(script.scenes.iter_mut()),
                &cast,
            );
        }

        let names =
            load_optional_text(files, &part.file_path("names.ini"), codec, |text| {
                ini::parse_name_table(text)
            })
            .unwrap_or_default();
        let inventory =
            load_optional_text(files, &part.file_path("invntr.txt"), codec, |text| {
                ini::parse_name_table(text)
            })
            .unwrap_or_default();

        let messages = load_optional(files, &part.file_path("dialogue.lod"), |bytes| {
            MessageFile::from_bytes(bytes, codec).map(|file| file.messages)
        })
        .unwrap_or_default();
        let dialog_groups = load_optional(files, &part.file_path("dialogue.fix"), |bytes| {
            DialogFile::from_bytes(bytes).map(|file| file.groups)
        })
        .unwrap_or_default();

        Ok(Self::from_part_data(PartData {
            part,
            part_names,
            objects: script.objects,
            scenes: script.scenes,
            messages,
            resources,
            dialog_groups,
            names,
            inventory,
        }))
    }

    pub fn from_part_data(data: PartData) -> Self {
        let PartData {
            part,
            part_names,
            objects,
            scenes,
            messages,
            resources,
            mut dialog_groups,
            names,
            inventory,
        } = data;

        let object_count = objects.len();
        let mut records = objects;
        records.extend(scenes);

        let mut record_index = BTreeMap::new();
        for (index, record) in records.iter().enumerate() {
            match record_index.entry(record.id) {
                Entry::Vacant(slot) => {
                    slot.insert(index);
                }
                Entry::Occupied(_) => warn!(
                    "duplicate record id {} ({}) ignored for lookups",
                    record.id, record.name
                ),
            }
        }

        let mut group_index = BTreeMap::new();
        for (index, group) in dialog_groups.iter().enumerate() {
            match group_index.entry(group.id) {
                Entry::Vacant(slot) => {
                    slot.insert(index);
                }
                Entry::Occupied(_) => {
                    warn!("duplicate dialog group id {} ignored for lookups", group.id)
                }
            }
        }

        let mut message_by_wav = BTreeMap::new();
        for message in &messages {
            message_by_wav
                .entry((message.object_id, message.wav.to_lowercase()))
                .or_insert(message.id);
        }

        resolve_play_refs(&mut dialog_groups, messages.len());

        Self {
            part,
            part_names,
            records,
            object_count,
            record_index,
            messages,
            message_by_wav,
            resources,
            dialog_groups,
            group_index,
            names,
            inventory,
        }
    }

    pub fn part(&self) -> PartId {
        self.part
    }

    pub fn part_names(&self) -> &[String] {
        &self.part_names
    }

    pub fn objects(&self) -> &[ScriptRecord] {
        &self.records[..self.object_count]
    }

    pub fn scenes(&self) -> &[ScriptRecord] {
        &self.records[self.object_count..]
    }

    /// Objects followed by scenes, the shared id space the ops point into.
    pub fn records(&self) -> &[ScriptRecord] {
        &self.records
    }

    pub fn record(&self, id: u16) -> Option<&ScriptRecord> {
        self.record_index.get(&id).map(|&index| &self.records[index])
    }

    /// Display label for a record id, for comments and listings. Unknown
    /// ids keep their number so broken data stays visible.
    pub fn record_label(&self, id: u16) -> String {
        match self.record(id) {
            Some(record) => record.name.clone(),
            None => format!("#{id}"),
        }
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Message ids are table positions.
    pub fn message(&self, id: u16) -> Option<&Message> {
        self.messages.get(id as usize)
    }

    pub fn message_by_wav(&self, object_id: u16, wav: &str) -> Option<&Message> {
        let id = *self.message_by_wav.get(&(object_id, wav.to_lowercase()))?;
        self.message(id)
    }

    pub fn resources(&self) -> &ResourceTable {
        &self.resources
    }

    pub fn dialog_groups(&self) -> &[DialogGroup] {
        &self.dialog_groups
    }

    pub fn dialog_group(&self, id: u16) -> Option<&DialogGroup> {
        self.group_index.get(&id).map(|&index| &self.dialog_groups[index])
    }

    pub fn names(&self) -> &BTreeMap<String, String> {
        &self.names
    }

    pub fn inventory(&self) -> &BTreeMap<String, String> {
        &self.inventory
    }

    pub fn display_name(&self, key: &str) -> Option<&str> {
        self.names.get(key).map(String::as_str)
    }

    pub fn inventory_description(&self, key: &str) -> Option<&str> {
        self.inventory.get(key).map(String::as_str)
    }

    /// Records a name table key applies to, in record order.
    pub fn records_by_name(&self, key: &str) -> Vec<&ScriptRecord> {
        self.records
            .iter()
            .filter(|record| record.name == key)
            .collect()
    }
}

fn load_optional<T>(
    files: &FileMap,
    path: &str,
    parse: impl FnOnce(&[u8]) -> Result<T>,
) -> Option<T> {
    if files.find(path).is_none() {
        warn!("part file {path} not found");
        return None;
    }
    match files.read(path).and_then(|bytes| parse(&bytes)) {
        Ok(value) => Some(value),
        Err(err) => {
            warn!("skipping {path}: {err:#}");
            None
        }
    }
}

fn load_optional_text<T>(
    files: &FileMap,
    path: &str,
    codec: TextCodec,
    parse: impl FnOnce(&str) -> Result<T>,
) -> Option<T> {
    if files.find(path).is_none() {
        warn!("part file {path} not found");
        return None;
    }
    match files.read_text(path, codec).and_then(|text| parse(&text)) {
        Ok(value) => Some(value),
        Err(err) => {
            warn!("skipping {path}: {err:#}");
            None
        }
    }
}

fn attach_backgrounds(scenes: &mut [ScriptRecord], entries: Vec<BackgroundEntry>) {
    let index: BTreeMap<String, usize> = scenes
        .iter()
        .enumerate()
        .map(|(position, scene)| (scene.name.clone(), position))
        .collect();
    for entry in entries {
        match index.get(&entry.scene_name) {
            Some(&position) => scenes[position].refs = entry.refs,
            None => warn!(
                "background entry {:?} has no matching scene",
                entry.scene_name
            ),
        }
    }
}

fn attach_scene_settings(scenes: &mut [ScriptRecord], settings: &BTreeMap<String, SceneSettings>) {
    for scene in scenes.iter_mut() {
        if let Some(entry) = settings.get(&scene.name) {
            scene.perspective = entry.perspective;
            scene.enter_areas = entry.enter_areas.clone();
        }
    }
}

fn attach_cast_colors<'a>(
    records: impl Iterator<Item = &'a mut ScriptRecord>,
    cast: &BTreeMap<String, CastColor>,
) {
    for record in records {
        if let Some(color) = cast.get(&record.name) {
            record.cast_color = Some(*color);
        }
    }
}

/// Binds PLAY refs to the message table once, so later passes never compare
/// raw ids against table bounds again.
fn resolve_play_refs(groups: &mut [DialogGroup], message_count: usize) {
    for group in groups {
        for act in &mut group.acts {
            for block in &mut act.blocks {
                for op in &mut block.ops {
                    if op.opcode == DialogOpcode::Play && (op.ref_val as usize) < message_count {
                        op.message = Some(op.ref_val);
                    }
                }
            }
        }
    }
}
