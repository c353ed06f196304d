//! Dialog block disassembly.
//!
//! One forward pass per block. Select ops (MENU, CIRCLE) trigger a bounded
//! lookahead that groups the following ops into cases; every select rescans
//! from its own position, so pathological blocks cost quadratic time. The
//! correlation maps are filled as each select is visited, which is enough
//! for the ops that consult them: breaks and dispatch targets always sit
//! after their select.

use std::collections::{BTreeMap, BTreeSet};

use petka_formats::dialogs::{DialogBlock, DialogOp};
use petka_formats::DialogOpcode;

use crate::render::{format_addr, label_name, CrossLink, RenderEntry};
use crate::repository::Repository;

/// Addresses that get a `loc_` label: the block entry plus every jump ref.
pub fn label_addresses(block: &DialogBlock) -> BTreeSet<u16> {
    let mut labels = BTreeSet::new();
    labels.insert(block.entry);
    for op in &block.ops {
        if op.opcode.is_jump() {
            labels.insert(op.ref_val);
        }
    }
    labels
}

#[derive(Debug, PartialEq, Eq)]
enum CaseSummary {
    /// Case body is exactly one play op.
    Play { ref_val: u16, message: Option<u16> },
    Complex,
}

#[derive(Debug, PartialEq, Eq)]
enum SelectOutcome {
    Complete { cases: Vec<CaseSummary> },
    Broken { required: usize, got: usize },
}

pub fn disassemble(repo: &Repository, block: &DialogBlock) -> Vec<RenderEntry> {
    let labels = label_addresses(block);
    let mut case_of: BTreeMap<u16, (u16, usize)> = BTreeMap::new();
    let mut menu_target_of: BTreeMap<u16, (u16, usize)> = BTreeMap::new();
    let mut entries = Vec::new();

    for (index, op) in block.ops.iter().enumerate() {
        let mut comments = Vec::new();
        let mut summaries = Vec::new();

        if op.opcode.is_select() {
            match scan_select(block, index, &mut case_of, &mut menu_target_of) {
                SelectOutcome::Complete { cases } => {
                    summaries = cases
                        .iter()
                        .enumerate()
                        .map(|(case_index, case)| case_entry(repo, case_index, case))
                        .collect();
                }
                SelectOutcome::Broken { required, got } => {
                    comments.push(format!("broken, required={required} got={got}"));
                }
            }
        }

        if let Some(&(select_addr, case_index)) = case_of.get(&op.addr) {
            comments.push(format!(
                "case {case_index} of {}",
                select_display(select_addr, &labels)
            ));
        }
        if let Some(&(menu_addr, option)) = menu_target_of.get(&op.addr) {
            comments.push(format!(
                "option {option} of {}",
                select_display(menu_addr, &labels)
            ));
        }

        let (text, link, note) = op_body(repo, op);
        if let Some(note) = note {
            comments.push(note);
        }

        let mut entry = RenderEntry::line(text);
        if labels.contains(&op.addr) {
            entry = entry.with_label(label_name(op.addr));
        }
        if let Some(link) = link {
            entry = entry.with_link(link);
        }
        if !comments.is_empty() {
            entry = entry.with_comment(comments.join("; "));
        }
        entries.push(entry);
        entries.extend(summaries);
    }

    entries
}

/// Lookahead for one select op. The declared case count rides in the low
/// byte of the ref. Breaks close cases; once all are closed, a MENU (and
/// only a MENU) claims the next N ops as per-option dispatch targets.
fn scan_select(
    block: &DialogBlock,
    select_index: usize,
    case_of: &mut BTreeMap<u16, (u16, usize)>,
    menu_target_of: &mut BTreeMap<u16, (u16, usize)>,
) -> SelectOutcome {
    let select = &block.ops[select_index];
    let select_addr = select.addr;
    let required = usize::from(select.ref_val % 256);

    let mut cases = Vec::new();
    let mut case_ops: Vec<&DialogOp> = Vec::new();
    let mut cursor = select_index + 1;

    while cursor < block.ops.len() && cases.len() < required {
        let op = &block.ops[cursor];
        if op.opcode == DialogOpcode::Break {
            case_of.insert(op.addr, (select_addr, cases.len()));
            cases.push(summarize_case(&case_ops));
            case_ops.clear();
        } else {
            case_ops.push(op);
        }
        cursor += 1;
    }

    if cases.len() < required {
        return SelectOutcome::Broken {
            required,
            got: cases.len(),
        };
    }

    if select.opcode == DialogOpcode::Menu {
        for option in 0..required {
            match block.ops.get(cursor + option) {
                Some(op) => {
                    menu_target_of.insert(op.addr, (select_addr, option));
                }
                None => break,
            }
        }
    }

    SelectOutcome::Complete { cases }
}

fn summarize_case(ops: &[&DialogOp]) -> CaseSummary {
    match ops {
        [op] if op.opcode == DialogOpcode::Play => CaseSummary::Play {
            ref_val: op.ref_val,
            message: op.message,
        },
        _ => CaseSummary::Complex,
    }
}

fn case_entry(repo: &Repository, case_index: usize, case: &CaseSummary) -> RenderEntry {
    let entry = RenderEntry::line(format!("case {case_index}"));
    match case {
        CaseSummary::Play { ref_val, message } => {
            match message.and_then(|id| repo.message(id)) {
                Some(resolved) => entry
                    .with_link(CrossLink::Message(resolved.id))
                    .with_comment(format!(
                        "message {} ({}: {})",
                        resolved.id,
                        repo.record_label(resolved.object_id),
                        resolved.wav
                    )),
                None => entry.with_comment(format!("message {ref_val}")),
            }
        }
        CaseSummary::Complex => entry.with_comment("complex"),
    }
}

fn select_display(addr: u16, labels: &BTreeSet<u16>) -> String {
    if labels.contains(&addr) {
        label_name(addr)
    } else {
        format!("select at {}", format_addr(addr))
    }
}

fn op_body(repo: &Repository, op: &DialogOp) -> (String, Option<CrossLink>, Option<String>) {
    let name = op.opcode.display_name();

    // BREAK and RETURN with both operands zero are placeholders
    if matches!(op.opcode, DialogOpcode::Break | DialogOpcode::Return)
        && op.ref_val == 0
        && op.arg == 0
    {
        return (name, None, None);
    }

    if op.opcode.is_jump() {
        return (format!("{name} {}", label_name(op.ref_val)), None, None);
    }

    if op.opcode == DialogOpcode::Play {
        if let Some(message) = op.message.and_then(|id| repo.message(id)) {
            return (
                format!("{name} msg {}", message.id),
                Some(CrossLink::Message(message.id)),
                Some(format!(
                    "{}: {}",
                    repo.record_label(message.object_id),
                    message.wav
                )),
            );
        }
    }

    (format!("{name} {:#06x}, {}", op.ref_val, op.arg), None, None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::PartData;
    use petka_formats::dialogs::{DialogAct, DialogGroup, Message};
    use petka_formats::script::RecordKind;
    use petka_formats::ScriptRecord;

    fn repo_with_block(entry: u16, ops: Vec<DialogOp>) -> Repository {
        let group = DialogGroup {
            id: 1,
            arg: None,
            acts: vec![DialogAct {
                opcode: 1,
                object: Some(4),
                args: [None, None],
                blocks: vec![DialogBlock { entry, ops }],
            }],
        };
        let messages = (0..8)
            .map(|id| Message {
                id,
                object_id: 4,
                args: [0, 0],
                wav: format!("CHAP{id:03}.WAV"),
                text: format!("line {id}"),
            })
            .collect();
        Repository::from_part_data(PartData {
            objects: vec![ScriptRecord::new(4, RecordKind::Object, "CHAPAEV")],
            messages,
            dialog_groups: vec![group],
            ..PartData::default()
        })
    }

    fn block_of(repo: &Repository) -> &DialogBlock {
        &repo.dialog_groups()[0].acts[0].blocks[0]
    }

    fn comment(entry: &RenderEntry) -> &str {
        entry.comment.as_deref().unwrap_or("")
    }

    #[test]
    fn menu_with_two_cases_summarizes_both_messages() {
        let repo = repo_with_block(
            0,
            vec![
                DialogOp::new(0, DialogOpcode::Menu, 0x102, 0),
                DialogOp::new(1, DialogOpcode::Play, 5, 0),
                DialogOp::new(2, DialogOpcode::Break, 0, 0),
                DialogOp::new(3, DialogOpcode::Play, 7, 0),
                DialogOp::new(4, DialogOpcode::Break, 0, 0),
            ],
        );
        let entries = disassemble(&repo, block_of(&repo));

        // five ops plus two case summaries
        assert_eq!(entries.len(), 7);

        assert_eq!(entries[0].label.as_deref(), Some("loc_0000"));
        assert_eq!(entries[0].text, "MENU 0x0102, 0");
        assert_eq!(entries[0].comment, None);

        assert_eq!(entries[1].text, "case 0");
        assert!(comment(&entries[1]).starts_with("message 5"));
        assert_eq!(entries[1].link, Some(CrossLink::Message(5)));
        assert_eq!(entries[2].text, "case 1");
        assert!(comment(&entries[2]).starts_with("message 7"));

        assert_eq!(entries[3].text, "PLAY msg 5");
        assert_eq!(comment(&entries[3]), "CHAPAEV: CHAP005.WAV");
        assert_eq!(entries[4].text, "BREAK");
        assert_eq!(comment(&entries[4]), "case 0 of loc_0000");
        assert_eq!(entries[5].text, "PLAY msg 7");
        assert_eq!(entries[6].text, "BREAK");
        assert_eq!(comment(&entries[6]), "case 1 of loc_0000");
    }

    #[test]
    fn menu_short_one_break_is_reported_broken() {
        let repo = repo_with_block(
            0,
            vec![
                DialogOp::new(0, DialogOpcode::Menu, 0x102, 0),
                DialogOp::new(1, DialogOpcode::Play, 5, 0),
                DialogOp::new(2, DialogOpcode::Break, 0, 0),
            ],
        );
        let entries = disassemble(&repo, block_of(&repo));

        assert_eq!(entries.len(), 3);
        assert_eq!(comment(&entries[0]), "broken, required=2 got=1");
        assert!(entries.iter().all(|entry| !entry.text.starts_with("case ")));
        // the break that was found still knows its case
        assert_eq!(comment(&entries[2]), "case 0 of loc_0000");
    }

    #[test]
    fn menu_dispatch_targets_follow_the_final_break() {
        let repo = repo_with_block(
            0,
            vec![
                DialogOp::new(0, DialogOpcode::Menu, 2, 0),
                DialogOp::new(1, DialogOpcode::Break, 0, 0),
                DialogOp::new(2, DialogOpcode::Break, 0, 0),
                DialogOp::new(3, DialogOpcode::Play, 5, 0),
                DialogOp::new(4, DialogOpcode::Goto, 3, 0),
            ],
        );
        let entries = disassemble(&repo, block_of(&repo));

        // empty case bodies summarize as complex
        assert_eq!(entries[1].text, "case 0");
        assert_eq!(comment(&entries[1]), "complex");
        assert_eq!(entries[2].text, "case 1");
        assert_eq!(comment(&entries[2]), "complex");

        assert!(comment(&entries[5]).contains("option 0 of loc_0000"));
        assert!(comment(&entries[6]).contains("option 1 of loc_0000"));
    }

    #[test]
    fn circle_groups_cases_without_dispatch_targets() {
        let repo = repo_with_block(
            0,
            vec![
                DialogOp::new(0, DialogOpcode::Circle, 2, 0),
                DialogOp::new(1, DialogOpcode::Break, 0, 0),
                DialogOp::new(2, DialogOpcode::Break, 0, 0),
                DialogOp::new(3, DialogOpcode::Play, 5, 0),
                DialogOp::new(4, DialogOpcode::Play, 7, 0),
            ],
        );
        let entries = disassemble(&repo, block_of(&repo));

        assert_eq!(comment(&entries[3]), "case 0 of loc_0000");
        assert_eq!(comment(&entries[4]), "case 1 of loc_0000");
        assert!(!comment(&entries[5]).contains("option"));
        assert!(!comment(&entries[6]).contains("option"));
    }

    #[test]
    fn menu_declaring_zero_cases_is_trivially_complete() {
        let repo = repo_with_block(
            0,
            vec![
                DialogOp::new(0, DialogOpcode::Menu, 0x100, 0),
                DialogOp::new(1, DialogOpcode::Return, 0, 0),
            ],
        );
        let entries = disassemble(&repo, block_of(&repo));
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].comment, None);
    }

    #[test]
    fn labels_cover_entry_and_every_jump_ref() {
        let repo = repo_with_block(
            40,
            vec![
                DialogOp::new(40, DialogOpcode::Goto, 42, 0),
                DialogOp::new(41, DialogOpcode::Play, 5, 0),
                DialogOp::new(42, DialogOpcode::Return, 0, 0),
            ],
        );
        let block = block_of(&repo);

        let labels = label_addresses(block);
        // entry, the goto target, and the plain return's zero ref
        assert_eq!(labels, BTreeSet::from([0, 40, 42]));

        let entries = disassemble(&repo, block);
        assert_eq!(entries[0].label.as_deref(), Some("loc_0028"));
        assert_eq!(entries[0].text, "GOTO loc_002a");
        assert_eq!(entries[1].label, None);
        assert_eq!(entries[2].label.as_deref(), Some("loc_002a"));
        assert_eq!(entries[2].text, "RETURN");
    }

    #[test]
    fn return_with_an_address_renders_as_a_jump() {
        let repo = repo_with_block(
            0,
            vec![
                DialogOp::new(0, DialogOpcode::Play, 5, 0),
                DialogOp::new(1, DialogOpcode::Return, 0, 1),
            ],
        );
        let entries = disassemble(&repo, block_of(&repo));
        // nonzero arg keeps the operand form
        assert_eq!(entries[1].text, "RETURN loc_0000");
    }

    #[test]
    fn unknown_opcodes_render_with_numeric_names() {
        let repo = repo_with_block(
            0,
            vec![DialogOp::new(0, DialogOpcode::from_code(0x0c), 0x1234, 9)],
        );
        let entries = disassemble(&repo, block_of(&repo));
        assert_eq!(entries[0].text, "OP_0C 0x1234, 9");
    }

    #[test]
    fn unresolved_play_keeps_the_numeric_form() {
        let repo = repo_with_block(0, vec![DialogOp::new(0, DialogOpcode::Play, 500, 0)]);
        let entries = disassemble(&repo, block_of(&repo));
        assert_eq!(entries[0].text, "PLAY 0x01f4, 0");
        assert_eq!(entries[0].link, None);
        assert_eq!(entries[0].comment, None);
    }
}
