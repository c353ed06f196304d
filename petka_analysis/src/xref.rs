//! Cross-reference index over one loaded part.
//!
//! Built in a single pass and thrown away whenever the repository reloads;
//! nothing here updates in place. Lookups against ids that never occur
//! answer with empty slices rather than errors, so callers can probe
//! freely.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

use petka_formats::opcodes::{ACTION_OPCODES, DIALOG_OPCODES};
use petka_formats::{DialogGroup, RecordKind, ScriptRecord, DIALOG_OPCODE};

use crate::repository::Repository;

/// Position of one op in the action tables: record, handler slot, op slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct OpSite {
    pub record_id: u16,
    pub handler: usize,
    pub op: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct HandlerSite {
    pub record_id: u16,
    pub handler: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DialogActSite {
    pub group_id: u16,
    pub act: usize,
}

/// Position of one dialog op, addressed the way the disassembly labels it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DialogSite {
    pub group_id: u16,
    pub act: usize,
    pub block: usize,
    pub addr: u16,
}

/// Every place an action opcode shows up, split by role.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ActionUsages {
    pub operations: Vec<OpSite>,
    pub handlers: Vec<HandlerSite>,
    pub dialog_acts: Vec<DialogActSite>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ActionStats {
    pub operation_occurrences: usize,
    pub handler_occurrences: usize,
    pub dialog_act_occurrences: usize,
}

/// What points at a record. Scenes answer with the object ids they place,
/// in placement order with repeats kept; objects answer with the op sites
/// elsewhere that target them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackReferences<'a> {
    SceneObjects(Vec<u16>),
    ObjectSites(&'a [OpSite]),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CrossIndex {
    action_usages: BTreeMap<u16, ActionUsages>,
    dialog_counts: BTreeMap<u8, usize>,
    resource_usages: BTreeMap<u16, Vec<OpSite>>,
    dialog_group_usages: BTreeMap<u16, Vec<OpSite>>,
    record_usages: BTreeMap<u16, Vec<OpSite>>,
    message_usages: BTreeMap<u16, Vec<DialogSite>>,
}

impl CrossIndex {
    pub fn build(repo: &Repository) -> Self {
        let mut index = Self::default();
        for record in repo.records() {
            index.scan_record(repo, record);
        }
        for group in repo.dialog_groups() {
            index.scan_group(group);
        }
        index
    }

    fn scan_record(&mut self, repo: &Repository, record: &ScriptRecord) {
        for (handler_pos, handler) in record.handlers.iter().enumerate() {
            self.action_usages
                .entry(handler.opcode)
                .or_default()
                .handlers
                .push(HandlerSite {
                    record_id: record.id,
                    handler: handler_pos,
                });
            for (op_pos, op) in handler.ops.iter().enumerate() {
                let site = OpSite {
                    record_id: record.id,
                    handler: handler_pos,
                    op: op_pos,
                };
                self.action_usages
                    .entry(op.opcode)
                    .or_default()
                    .operations
                    .push(site);
                if let Some(target) = op.target {
                    if op.opcode == DIALOG_OPCODE {
                        self.dialog_group_usages.entry(target).or_default().push(site);
                    } else if target != record.id {
                        // self references are not back references
                        self.record_usages.entry(target).or_default().push(site);
                    }
                }
                if let Some(arg) = op.args[0] {
                    if repo.resources().contains(arg) {
                        self.resource_usages.entry(arg).or_default().push(site);
                    }
                }
            }
        }
    }

    fn scan_group(&mut self, group: &DialogGroup) {
        for (act_pos, act) in group.acts.iter().enumerate() {
            self.action_usages
                .entry(act.opcode)
                .or_default()
                .dialog_acts
                .push(DialogActSite {
                    group_id: group.id,
                    act: act_pos,
                });
            for (block_pos, block) in act.blocks.iter().enumerate() {
                for op in &block.ops {
                    // one tally per op, whatever role it plays in its block
                    *self.dialog_counts.entry(op.opcode.code()).or_default() += 1;
                    if let Some(message) = op.message {
                        self.message_usages.entry(message).or_default().push(DialogSite {
                            group_id: group.id,
                            act: act_pos,
                            block: block_pos,
                            addr: op.addr,
                        });
                    }
                }
            }
        }
    }

    pub fn action_usages(&self, opcode: u16) -> &ActionUsages {
        static EMPTY: ActionUsages = ActionUsages {
            operations: Vec::new(),
            handlers: Vec::new(),
            dialog_acts: Vec::new(),
        };
        self.action_usages.get(&opcode).unwrap_or(&EMPTY)
    }

    /// Counts derived from the usage lists, never tallied separately.
    pub fn action_stats(&self, opcode: u16) -> ActionStats {
        let usages = self.action_usages(opcode);
        ActionStats {
            operation_occurrences: usages.operations.len(),
            handler_occurrences: usages.handlers.len(),
            dialog_act_occurrences: usages.dialog_acts.len(),
        }
    }

    pub fn dialog_count(&self, opcode: u8) -> usize {
        self.dialog_counts.get(&opcode).copied().unwrap_or(0)
    }

    /// Table codes plus everything observed, ascending.
    pub fn action_key_set(&self) -> Vec<u16> {
        let mut keys: BTreeSet<u16> = ACTION_OPCODES.keys().copied().collect();
        keys.extend(self.action_usages.keys().copied());
        keys.into_iter().collect()
    }

    pub fn dialog_key_set(&self) -> Vec<u8> {
        let mut keys: BTreeSet<u8> = DIALOG_OPCODES.keys().copied().collect();
        keys.extend(self.dialog_counts.keys().copied());
        keys.into_iter().collect()
    }

    pub fn resource_usages(&self, id: u16) -> &[OpSite] {
        self.resource_usages.get(&id).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn dialog_group_usages(&self, id: u16) -> &[OpSite] {
        self.dialog_group_usages.get(&id).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn record_usages(&self, id: u16) -> &[OpSite] {
        self.record_usages.get(&id).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn message_usages(&self, id: u16) -> &[DialogSite] {
        self.message_usages.get(&id).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn back_references<'a>(&'a self, record: &ScriptRecord) -> BackReferences<'a> {
        match record.kind {
            RecordKind::Scene => BackReferences::SceneObjects(
                record.refs.iter().map(|scene_ref| scene_ref.object_id).collect(),
            ),
            RecordKind::Object => BackReferences::ObjectSites(self.record_usages(record.id)),
        }
    }
}
