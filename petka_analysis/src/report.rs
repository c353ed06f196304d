//! Report assembly on top of the repository and cross index.
//!
//! Everything here renders to either `RenderEntry` rows for the terminal or
//! serializable row types for the JSON report; no I/O happens in this
//! module.

use std::collections::BTreeMap;

use serde::Serialize;

use petka_formats::opcodes::{action_opcode_name, dialog_opcode_name};
use petka_formats::script::RecordKind;
use petka_formats::{Operation, ScriptRecord, DIALOG_OPCODE};

use crate::disasm;
use crate::render::{format_addr, format_opt, CrossLink, RenderEntry};
use crate::repository::Repository;
use crate::xref::{
    ActionUsages, BackReferences, CrossIndex, DialogActSite, DialogSite, HandlerSite, OpSite,
};

#[derive(Debug, Clone, Serialize)]
pub struct PartSummary {
    pub part: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub part_names: Vec<String>,
    pub objects: usize,
    pub scenes: usize,
    pub messages: usize,
    pub resources: usize,
    pub dialog_groups: usize,
    pub names: usize,
    pub inventory: usize,
    pub filetypes: Vec<FiletypeCount>,
}

#[derive(Debug, Clone, Serialize)]
pub struct FiletypeCount {
    pub filetype: String,
    pub count: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct ActionOpcodeRow {
    pub opcode: u16,
    pub name: String,
    pub operations: usize,
    pub handlers: usize,
    pub dialog_acts: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct DialogOpcodeRow {
    pub opcode: u8,
    pub name: String,
    pub count: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct NameRow {
    pub key: String,
    pub value: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub records: Vec<u16>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ResourceRow {
    pub id: u16,
    pub path: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct RecordRow {
    pub id: u16,
    pub name: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct OpcodeUsagesReport {
    pub opcode: u16,
    pub name: String,
    pub usages: ActionUsages,
}

#[derive(Debug, Clone, Serialize)]
pub struct ResourceUsagesReport {
    pub id: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    pub sites: Vec<OpSite>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DialogGroupUsagesReport {
    pub id: u16,
    pub sites: Vec<OpSite>,
}

#[derive(Debug, Clone, Serialize)]
pub struct MessageUsagesReport {
    pub id: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wav: Option<String>,
    pub sites: Vec<DialogSite>,
}

/// Shape of `--json-report`. Sections mirror the chosen selectors; the
/// unselected ones stay out of the output entirely.
#[derive(Debug, Default, Serialize)]
pub struct JsonReport {
    pub part: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<PartSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resources: Option<Vec<ResourceRow>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub objects: Option<Vec<RecordRow>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scenes: Option<Vec<RecordRow>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action_opcodes: Option<Vec<ActionOpcodeRow>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dialog_opcodes: Option<Vec<DialogOpcodeRow>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub opcode_usages: Option<OpcodeUsagesReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resource_usages: Option<ResourceUsagesReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dialog_group_usages: Option<DialogGroupUsagesReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message_usages: Option<MessageUsagesReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub record: Option<Vec<RenderEntry>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub disassembly: Option<Vec<RenderEntry>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub names: Option<Vec<NameRow>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub inventory: Option<Vec<NameRow>>,
}

pub fn part_summary(repo: &Repository) -> PartSummary {
    PartSummary {
        part: repo.part().to_string(),
        part_names: repo.part_names().to_vec(),
        objects: repo.objects().len(),
        scenes: repo.scenes().len(),
        messages: repo.messages().len(),
        resources: repo.resources().len(),
        dialog_groups: repo.dialog_groups().len(),
        names: repo.names().len(),
        inventory: repo.inventory().len(),
        filetypes: repo
            .resources()
            .filetype_counts()
            .into_iter()
            .map(|(filetype, count)| FiletypeCount { filetype, count })
            .collect(),
    }
}

pub fn summary_entries(repo: &Repository) -> Vec<RenderEntry> {
    let summary = part_summary(repo);
    let mut entries = vec![RenderEntry::line(summary.part.clone())];
    for (position, name) in summary.part_names.iter().enumerate() {
        entries.push(RenderEntry::line(format!("part {}: {name}", position + 1)));
    }
    entries.push(RenderEntry::line(format!("objects: {}", summary.objects)));
    entries.push(RenderEntry::line(format!("scenes: {}", summary.scenes)));
    entries.push(RenderEntry::line(format!("messages: {}", summary.messages)));
    entries.push(RenderEntry::line(format!("resources: {}", summary.resources)));
    entries.push(RenderEntry::line(format!(
        "dialog groups: {}",
        summary.dialog_groups
    )));
    entries.push(RenderEntry::line(format!("names: {}", summary.names)));
    entries.push(RenderEntry::line(format!("inventory: {}", summary.inventory)));
    if !summary.filetypes.is_empty() {
        entries.push(RenderEntry::line("resource filetypes"));
        for filetype in &summary.filetypes {
            entries.push(RenderEntry::line(format!(
                "{}: {}",
                filetype.filetype, filetype.count
            )));
        }
    }
    entries
}

/// Every resource as `id - path`, ascending by id. `filetype` narrows the
/// list to one bucket of the summary statistics.
pub fn resource_rows(repo: &Repository, filetype: Option<&str>) -> Vec<ResourceRow> {
    let row = |(id, path): (u16, &str)| ResourceRow {
        id,
        path: path.to_string(),
    };
    match filetype {
        Some(filetype) => repo.resources().iter_by_filetype(filetype).map(row).collect(),
        None => repo.resources().iter().map(row).collect(),
    }
}

pub fn resource_entries(repo: &Repository, filetype: Option<&str>) -> Vec<RenderEntry> {
    let rows = resource_rows(repo, filetype);
    let header = match filetype {
        Some(filetype) => format!(
            "resources ({}): {}",
            rows.len(),
            filetype.to_ascii_uppercase()
        ),
        None => format!("resources ({})", rows.len()),
    };
    let mut entries = vec![RenderEntry::line(header)];
    for row in rows {
        entries.push(
            RenderEntry::line(format!("{} - {}", row.id, row.path))
                .with_link(CrossLink::Resource(row.id)),
        );
    }
    entries
}

/// Record id and name rows for the object and scene lists.
pub fn record_rows(records: &[ScriptRecord]) -> Vec<RecordRow> {
    records
        .iter()
        .map(|record| RecordRow {
            id: record.id,
            name: record.name.clone(),
        })
        .collect()
}

pub fn record_entries(label: &str, records: &[ScriptRecord]) -> Vec<RenderEntry> {
    let mut entries = vec![RenderEntry::line(format!("{label} ({})", records.len()))];
    for record in records {
        let link = match record.kind {
            RecordKind::Object => CrossLink::Object(record.id),
            RecordKind::Scene => CrossLink::Scene(record.id),
        };
        entries.push(
            RenderEntry::line(format!("{} - {}", record.id, record.name)).with_link(link),
        );
    }
    entries
}

/// Every known or observed action opcode with its role counts, ascending.
pub fn action_opcode_listing(index: &CrossIndex) -> Vec<ActionOpcodeRow> {
    index
        .action_key_set()
        .into_iter()
        .map(|opcode| {
            let stats = index.action_stats(opcode);
            ActionOpcodeRow {
                opcode,
                name: action_opcode_name(opcode),
                operations: stats.operation_occurrences,
                handlers: stats.handler_occurrences,
                dialog_acts: stats.dialog_act_occurrences,
            }
        })
        .collect()
}

pub fn dialog_opcode_listing(index: &CrossIndex) -> Vec<DialogOpcodeRow> {
    index
        .dialog_key_set()
        .into_iter()
        .map(|opcode| DialogOpcodeRow {
            opcode,
            name: dialog_opcode_name(opcode),
            count: index.dialog_count(opcode),
        })
        .collect()
}

pub fn action_opcode_entries(index: &CrossIndex) -> Vec<RenderEntry> {
    let mut entries = vec![RenderEntry::line(format!(
        "{:>5}  {:<12} {:>6} {:>9} {:>6}",
        "code", "name", "ops", "handlers", "acts"
    ))];
    for row in action_opcode_listing(index) {
        entries.push(RenderEntry::line(format!(
            "{:>5}  {:<12} {:>6} {:>9} {:>6}",
            row.opcode, row.name, row.operations, row.handlers, row.dialog_acts
        )));
    }
    entries
}

pub fn dialog_opcode_entries(index: &CrossIndex) -> Vec<RenderEntry> {
    let mut entries = vec![RenderEntry::line(format!(
        "{:>5}  {:<12} {:>6}",
        "code", "name", "count"
    ))];
    for row in dialog_opcode_listing(index) {
        entries.push(RenderEntry::line(format!(
            "{:>5}  {:<12} {:>6}",
            row.opcode, row.name, row.count
        )));
    }
    entries
}

pub fn action_usage_entries(
    repo: &Repository,
    index: &CrossIndex,
    opcode: u16,
) -> Vec<RenderEntry> {
    let usages = index.action_usages(opcode);
    let mut entries = vec![RenderEntry::line(format!(
        "opcode {opcode} ({})",
        action_opcode_name(opcode)
    ))];
    if !usages.operations.is_empty() {
        entries.push(RenderEntry::line(format!(
            "operations ({})",
            usages.operations.len()
        )));
        for site in &usages.operations {
            entries.push(op_site_entry(repo, site));
        }
    }
    if !usages.handlers.is_empty() {
        entries.push(RenderEntry::line(format!(
            "handlers ({})",
            usages.handlers.len()
        )));
        for site in &usages.handlers {
            entries.push(handler_site_entry(repo, site));
        }
    }
    if !usages.dialog_acts.is_empty() {
        entries.push(RenderEntry::line(format!(
            "dialog acts ({})",
            usages.dialog_acts.len()
        )));
        for site in &usages.dialog_acts {
            entries.push(dialog_act_site_entry(site));
        }
    }
    entries
}

pub fn resource_usage_entries(repo: &Repository, index: &CrossIndex, id: u16) -> Vec<RenderEntry> {
    let header = match repo.resources().get(id) {
        Some(path) => format!("resource {id}: {path}"),
        None => format!("resource {id}: not in table"),
    };
    let mut entries = vec![RenderEntry::line(header).with_link(CrossLink::Resource(id))];
    for site in index.resource_usages(id) {
        entries.push(op_site_entry(repo, site));
    }
    entries
}

pub fn dialog_group_usage_entries(
    repo: &Repository,
    index: &CrossIndex,
    id: u16,
) -> Vec<RenderEntry> {
    let mut entries =
        vec![RenderEntry::line(format!("dialog group {id}")).with_link(CrossLink::DialogGroup(id))];
    for site in index.dialog_group_usages(id) {
        entries.push(op_site_entry(repo, site));
    }
    entries
}

pub fn message_usage_entries(repo: &Repository, index: &CrossIndex, id: u16) -> Vec<RenderEntry> {
    let mut header = match repo.message(id) {
        Some(message) => RenderEntry::line(format!(
            "message {id}: {}: {}",
            repo.record_label(message.object_id),
            message.wav
        ))
        .with_comment(message.text.clone()),
        None => RenderEntry::line(format!("message {id}: not in table")),
    };
    header = header.with_link(CrossLink::Message(id));
    let mut entries = vec![header];
    for site in index.message_usages(id) {
        entries.push(dialog_site_entry(site));
    }
    entries
}

/// Annotated handler and op listing for one object or scene, with its
/// metadata and back references.
pub fn record_listing(repo: &Repository, index: &CrossIndex, id: u16) -> Vec<RenderEntry> {
    let Some(record) = repo.record(id) else {
        return vec![RenderEntry::line(format!("record {id}: no such record"))];
    };

    let mut entries = vec![RenderEntry::line(format!(
        "{} {}: {}",
        record.kind.label(),
        record.id,
        record.name
    ))];
    if let Some(display) = repo.display_name(&record.name) {
        entries.push(RenderEntry::line(format!("name: {display}")));
    }
    if let Some(description) = repo.inventory_description(&record.name) {
        entries.push(RenderEntry::line(format!("inventory: {description}")));
    }
    if let Some(color) = record.cast_color {
        entries.push(RenderEntry::line(format!("cast color: {}", color.hex())));
    }
    if let Some(perspective) = record.perspective {
        entries.push(RenderEntry::line(format!("perspective: {perspective:?}")));
    }
    for area in &record.enter_areas {
        entries.push(RenderEntry::line(format!(
            "enter from {} at {}",
            area.from_scene, area.on_object
        )));
    }
    for scene_ref in &record.refs {
        let mut entry = RenderEntry::line(format!(
            "places {} {:?}",
            repo.record_label(scene_ref.object_id),
            scene_ref.values
        ));
        if let Some(link) = record_link(repo, scene_ref.object_id) {
            entry = entry.with_link(link);
        }
        entries.push(entry);
    }

    for (handler_pos, handler) in record.handlers.iter().enumerate() {
        let mut line = format!(
            "handler {handler_pos}: {}",
            action_opcode_name(handler.opcode)
        );
        if let Some(status) = handler.status {
            line.push_str(&format!(" status {status}"));
        }
        if let Some(target) = handler.target {
            line.push_str(&format!(" target {target}"));
        }
        entries.push(RenderEntry::line(line));
        for op in &handler.ops {
            entries.push(op_entry(repo, record, op));
        }
    }

    // scene back references are the placement lines above
    if let BackReferences::ObjectSites(sites) = index.back_references(record) {
        if !sites.is_empty() {
            entries.push(RenderEntry::line(format!("referenced by ({})", sites.len())));
            for site in sites {
                entries.push(op_site_entry(repo, site));
            }
        }
    }
    entries
}

fn op_entry(repo: &Repository, record: &ScriptRecord, op: &Operation) -> RenderEntry {
    let name = action_opcode_name(op.opcode);
    let target = match op.target {
        Some(target) if op.opcode == DIALOG_OPCODE => format!("dialog {target}"),
        Some(target) if target == record.id => "self".to_string(),
        Some(target) => repo.record_label(target),
        None => "-".to_string(),
    };
    let mut entry = RenderEntry::line(format!(
        "{name} {target}, {}, {}, {}",
        format_opt(op.args[0]),
        format_opt(op.args[1]),
        format_opt(op.args[2])
    ));
    match op.target {
        Some(target) if op.opcode == DIALOG_OPCODE => {
            entry = entry.with_link(CrossLink::DialogGroup(target));
        }
        Some(target) if target != record.id => {
            if let Some(link) = record_link(repo, target) {
                entry = entry.with_link(link);
            }
        }
        _ => {}
    }
    if let Some(arg) = op.args[0] {
        if let Some(path) = repo.resources().get(arg) {
            entry = entry.with_comment(format!("resource {arg}: {path}"));
        }
    }
    entry
}

/// All blocks of one dialog group, disassembled in order.
pub fn dialog_group_listing(repo: &Repository, id: u16) -> Vec<RenderEntry> {
    let Some(group) = repo.dialog_group(id) else {
        return vec![RenderEntry::line(format!("dialog group {id}: no such group"))];
    };

    let mut header = format!("dialog group {id}");
    if let Some(arg) = group.arg {
        header.push_str(&format!(" arg {arg}"));
    }
    let mut entries = vec![RenderEntry::line(header)];

    for (act_pos, act) in group.acts.iter().enumerate() {
        let mut line = format!("act {act_pos}: {}", action_opcode_name(act.opcode));
        if let Some(object) = act.object {
            line.push_str(&format!(" object {}", repo.record_label(object)));
        }
        if act.args.iter().any(Option::is_some) {
            line.push_str(&format!(
                " args {}, {}",
                format_opt(act.args[0]),
                format_opt(act.args[1])
            ));
        }
        let mut entry = RenderEntry::line(line);
        if let Some(object) = act.object {
            if let Some(link) = record_link(repo, object) {
                entry = entry.with_link(link);
            }
        }
        entries.push(entry);

        for (block_pos, block) in act.blocks.iter().enumerate() {
            entries.push(RenderEntry::line(format!(
                "block {block_pos} entry {}",
                format_addr(block.entry)
            )));
            entries.extend(disasm::disassemble(repo, block));
        }
    }
    entries
}

pub fn name_entries(repo: &Repository, table: &BTreeMap<String, String>) -> Vec<RenderEntry> {
    table
        .iter()
        .map(|(key, value)| {
            let mut entry = RenderEntry::line(format!("{key} = {value}"));
            let applied: Vec<String> = repo
                .records_by_name(key)
                .iter()
                .map(|record| format!("{} {}", record.kind.label(), record.id))
                .collect();
            if !applied.is_empty() {
                entry = entry.with_comment(applied.join(", "));
            }
            entry
        })
        .collect()
}

pub fn name_rows(repo: &Repository, table: &BTreeMap<String, String>) -> Vec<NameRow> {
    table
        .iter()
        .map(|(key, value)| NameRow {
            key: key.clone(),
            value: value.clone(),
            records: repo
                .records_by_name(key)
                .iter()
                .map(|record| record.id)
                .collect(),
        })
        .collect()
}

pub fn opcode_usages_report(index: &CrossIndex, opcode: u16) -> OpcodeUsagesReport {
    OpcodeUsagesReport {
        opcode,
        name: action_opcode_name(opcode),
        usages: index.action_usages(opcode).clone(),
    }
}

pub fn resource_usages_report(
    repo: &Repository,
    index: &CrossIndex,
    id: u16,
) -> ResourceUsagesReport {
    ResourceUsagesReport {
        id,
        path: repo.resources().get(id).map(str::to_string),
        sites: index.resource_usages(id).to_vec(),
    }
}

pub fn dialog_group_usages_report(index: &CrossIndex, id: u16) -> DialogGroupUsagesReport {
    DialogGroupUsagesReport {
        id,
        sites: index.dialog_group_usages(id).to_vec(),
    }
}

pub fn message_usages_report(
    repo: &Repository,
    index: &CrossIndex,
    id: u16,
) -> MessageUsagesReport {
    MessageUsagesReport {
        id,
        wav: repo.message(id).map(|message| message.wav.clone()),
        sites: index.message_usages(id).to_vec(),
    }
}

fn record_link(repo: &Repository, id: u16) -> Option<CrossLink> {
    repo.record(id).map(|record| match record.kind {
        RecordKind::Object => CrossLink::Object(id),
        RecordKind::Scene => CrossLink::Scene(id),
    })
}

fn op_site_entry(repo: &Repository, site: &OpSite) -> RenderEntry {
    let mut entry = RenderEntry::line(format!(
        "{} handler {} op {}",
        repo.record_label(site.record_id),
        site.handler,
        site.op
    ));
    if let Some(link) = record_link(repo, site.record_id) {
        entry = entry.with_link(link);
    }
    entry
}

fn handler_site_entry(repo: &Repository, site: &HandlerSite) -> RenderEntry {
    let mut entry = RenderEntry::line(format!(
        "{} handler {}",
        repo.record_label(site.record_id),
        site.handler
    ));
    if let Some(link) = record_link(repo, site.record_id) {
        entry = entry.with_link(link);
    }
    entry
}

fn dialog_act_site_entry(site: &DialogActSite) -> RenderEntry {
    RenderEntry::line(format!("group {} act {}", site.group_id, site.act))
        .with_link(CrossLink::DialogGroup(site.group_id))
}

fn dialog_site_entry(site: &DialogSite) -> RenderEntry {
    RenderEntry::line(format!(
        "group {} act {} block {} at {}",
        site.group_id,
        site.act,
        site.block,
        format_addr(site.addr)
    ))
    .with_link(CrossLink::DialogGroup(site.group_id))
}
