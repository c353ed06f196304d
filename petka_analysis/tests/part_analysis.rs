//! End to end: synthesize a part on disk, load it, index it, disassemble it.

use std::fs;
use std::path::Path;

use petka_analysis::disasm;
use petka_analysis::report;
use petka_analysis::repository::Repository;
use petka_analysis::xref::{BackReferences, CrossIndex, OpSite};
use petka_formats::part::PartId;
use petka_formats::strings::TextCodec;

fn push_u16(buf: &mut Vec<u8>, value: u16) {
    buf.extend_from_slice(&value.to_le_bytes());
}

fn push_u32(buf: &mut Vec<u8>, value: u32) {
    buf.extend_from_slice(&value.to_le_bytes());
}

fn push_i32(buf: &mut Vec<u8>, value: i32) {
    buf.extend_from_slice(&value.to_le_bytes());
}

fn push_str(buf: &mut Vec<u8>, text: &[u8]) {
    push_u32(buf, text.len() as u32);
    buf.extend_from_slice(text);
}

fn push_action_op(buf: &mut Vec<u8>, target: u16, opcode: u16, args: [u16; 3]) {
    push_u16(buf, target);
    push_u16(buf, opcode);
    for arg in args {
        push_u16(buf, arg);
    }
}

fn push_dialog_op(buf: &mut Vec<u8>, ref_val: u16, code: u8, arg: u8) {
    push_u16(buf, ref_val);
    buf.push(code);
    buf.push(arg);
}

fn script_bytes() -> Vec<u8> {
    let mut buf = Vec::new();
    push_u32(&mut buf, 2); // objects
    push_u32(&mut buf, 1); // scenes

    // CHAPAEV: one USE handler, DIALOG on group 7 then ANIMATE on itself
    push_u16(&mut buf, 4);
    push_str(&mut buf, b"CHAPAEV");
    push_u32(&mut buf, 1);
    push_u16(&mut buf, 1);
    buf.push(0xFF);
    push_u16(&mut buf, 0xFFFF);
    push_u32(&mut buf, 2);
    push_action_op(&mut buf, 7, 13, [0xFFFF, 0xFFFF, 0xFFFF]);
    push_action_op(&mut buf, 4, 16, [1634, 0, 0xFFFF]);

    // ANKA: one TALK handler that GOTOs CHAPAEV
    push_u16(&mut buf, 5);
    push_str(&mut buf, b"ANKA");
    push_u32(&mut buf, 1);
    push_u16(&mut buf, 8);
    buf.push(0xFF);
    push_u16(&mut buf, 0xFFFF);
    push_u32(&mut buf, 1);
    push_action_op(&mut buf, 4, 3, [0xFFFF, 0xFFFF, 0xFFFF]);

    // YARD, no handlers
    push_u16(&mut buf, 90);
    push_str(&mut buf, b"YARD");
    push_u32(&mut buf, 0);
    buf
}

fn background_bytes() -> Vec<u8> {
    let mut buf = Vec::new();
    push_u32(&mut buf, 1);
    push_str(&mut buf, b"YARD");
    push_u32(&mut buf, 2);
    for (object_id, x) in [(4u16, 120i32), (5, -40)] {
        push_u16(&mut buf, object_id);
        push_i32(&mut buf, x);
        for value in [200, 0, 1, 0] {
            push_i32(&mut buf, value);
        }
    }
    buf
}

fn dialog_bytes() -> Vec<u8> {
    let mut buf = Vec::new();
    push_u32(&mut buf, 1); // groups
    push_u32(&mut buf, 7); // id
    push_u32(&mut buf, 0xFFFF_FFFF); // arg unset
    push_u32(&mut buf, 1); // acts
    push_u16(&mut buf, 1); // USE
    push_u16(&mut buf, 4); // object
    push_u16(&mut buf, 0xFFFF);
    push_u16(&mut buf, 0xFFFF);
    push_u32(&mut buf, 1); // blocks
    push_u32(&mut buf, 0); // entry
    push_u32(&mut buf, 5); // ops
    push_dialog_op(&mut buf, 0x0102, 2, 0); // MENU, two cases
    push_dialog_op(&mut buf, 5, 7, 0); // PLAY message 5
    push_dialog_op(&mut buf, 0, 1, 0); // BREAK
    push_dialog_op(&mut buf, 7, 7, 0); // PLAY message 7
    push_dialog_op(&mut buf, 0, 1, 0); // BREAK
    buf
}

fn message_bytes() -> Vec<u8> {
    let mut buf = Vec::new();
    push_u32(&mut buf, 8);
    for id in 0u16..8 {
        push_u16(&mut buf, 4);
        push_u16(&mut buf, 0);
        push_u16(&mut buf, 0);
        push_str(&mut buf, format!("CHAP{id:03}.WAV").as_bytes());
        push_str(&mut buf, format!("line {id}").as_bytes());
    }
    buf
}

fn write_part(root: &Path) {
    let part_dir = root.join("part1");
    fs::create_dir_all(&part_dir).expect("create part dir");
    // uppercase on disk, lowercase when asked for
    fs::write(part_dir.join("SCRIPT.DAT"), script_bytes()).expect("script");
    fs::write(part_dir.join("backgrnd.bg"), background_bytes()).expect("backgrounds");
    fs::write(part_dir.join("dialogue.fix"), dialog_bytes()).expect("dialogs");
    fs::write(part_dir.join("dialogue.lod"), message_bytes()).expect("messages");
    fs::write(
        part_dir.join("resource.qrc"),
        b"; resources\n9 = music\\intro.wav\n1634 = video\\chapaev.cvx\n",
    )
    .expect("resources");

    let mut names = b"[names]\r\nCHAPAEV = ".to_vec();
    names.extend_from_slice(&[0xC2, 0xE0, 0xF1, 0xE8, 0xEB, 0xE8, 0xE9]); // cp1251
    names.extend_from_slice(b"\r\n");
    fs::write(part_dir.join("names.ini"), names).expect("names");

    fs::write(
        part_dir.join("invntr.txt"),
        b"[inventory]\nBOTTLE = samogon bottle\n",
    )
    .expect("inventory");
    fs::write(part_dir.join("cast.ini"), b"[cast]\nCHAPAEV = 255 128 0\n").expect("cast");
    fs::write(
        part_dir.join("bgs.ini"),
        b"[YARD]\npersp = 1.0 0.5 0.0 0.0 1.5\nentrance1 = STREET, GATE\n",
    )
    .expect("scene settings");
    fs::write(root.join("parts.ini"), b"[Parts]\n1 = Part One\n2 = Part Two\n")
        .expect("part list");
}

fn load_part1(root: &Path) -> Repository {
    Repository::load(root, PartId::new(1, 0), TextCodec::cp1251()).expect("load part 1")
}

#[test]
fn loads_a_part_with_all_attachments() {
    let dir = tempfile::tempdir().expect("tempdir");
    write_part(dir.path());
    let repo = load_part1(dir.path());

    assert_eq!(repo.part_names(), ["Part One", "Part Two"]);
    assert_eq!(repo.objects().len(), 2);
    assert_eq!(repo.scenes().len(), 1);
    assert_eq!(repo.messages().len(), 8);
    assert_eq!(repo.resources().len(), 2);

    let chapaev = repo.record(4).expect("CHAPAEV");
    assert_eq!(chapaev.name, "CHAPAEV");
    let color = chapaev.cast_color.expect("cast color");
    assert_eq!(color.hex(), "#FF8000");

    let yard = repo.record(90).expect("YARD");
    assert_eq!(yard.refs.len(), 2);
    assert_eq!(yard.refs[0].object_id, 4);
    assert_eq!(yard.refs[0].values, [120, 200, 0, 1, 0]);
    assert_eq!(yard.refs[1].values[0], -40);
    assert_eq!(yard.perspective, Some([1.0, 0.5, 0.0, 0.0, 1.5]));
    assert_eq!(yard.enter_areas.len(), 1);
    assert_eq!(yard.enter_areas[0].from_scene, "STREET");
    assert_eq!(yard.enter_areas[0].on_object, "GATE");

    assert_eq!(repo.display_name("CHAPAEV"), Some("Василий"));
    assert_eq!(repo.inventory_description("BOTTLE"), Some("samogon bottle"));

    // plays were bound to the message table during the load
    let block = &repo.dialog_groups()[0].acts[0].blocks[0];
    assert_eq!(block.ops[1].message, Some(5));
    assert_eq!(block.ops[3].message, Some(7));
}

#[test]
fn indexes_the_loaded_part() {
    let dir = tempfile::tempdir().expect("tempdir");
    write_part(dir.path());
    let repo = load_part1(dir.path());
    let index = CrossIndex::build(&repo);

    assert_eq!(
        index.resource_usages(1634),
        &[OpSite { record_id: 4, handler: 0, op: 1 }]
    );
    assert!(index.resource_usages(9).is_empty()); // in the table, never used
    assert_eq!(
        index.dialog_group_usages(7),
        &[OpSite { record_id: 4, handler: 0, op: 0 }]
    );
    assert_eq!(
        index.record_usages(4),
        &[OpSite { record_id: 5, handler: 0, op: 0 }]
    );

    let yard = repo.record(90).expect("YARD");
    assert_eq!(
        index.back_references(yard),
        BackReferences::SceneObjects(vec![4, 5])
    );

    let use_stats = index.action_stats(1);
    assert_eq!(use_stats.handler_occurrences, 1);
    assert_eq!(use_stats.dialog_act_occurrences, 1);

    assert_eq!(index.message_usages(5).len(), 1);
    assert_eq!(index.message_usages(6).len(), 0);
}

#[test]
fn disassembles_the_loaded_dialog() {
    let dir = tempfile::tempdir().expect("tempdir");
    write_part(dir.path());
    let repo = load_part1(dir.path());

    let block = &repo.dialog_groups()[0].acts[0].blocks[0];
    let entries = disasm::disassemble(&repo, block);

    assert_eq!(entries.len(), 7);
    assert_eq!(entries[0].text, "MENU 0x0102, 0");
    assert_eq!(entries[0].label.as_deref(), Some("loc_0000"));
    assert_eq!(entries[1].text, "case 0");
    assert_eq!(
        entries[1].comment.as_deref(),
        Some("message 5 (CHAPAEV: CHAP005.WAV)")
    );
    assert_eq!(entries[2].text, "case 1");
    assert_eq!(entries[3].text, "PLAY msg 5");
    assert_eq!(entries[4].comment.as_deref(), Some("case 0 of loc_0000"));
    assert_eq!(entries[6].comment.as_deref(), Some("case 1 of loc_0000"));
}

#[test]
fn lists_resources_and_records_of_the_loaded_part() {
    let dir = tempfile::tempdir().expect("tempdir");
    write_part(dir.path());
    let repo = load_part1(dir.path());

    let resources = report::resource_entries(&repo, None);
    assert_eq!(resources[0].text, "resources (2)");
    assert_eq!(resources[1].text, "9 - music\\intro.wav");
    assert_eq!(resources[2].text, "1634 - video\\chapaev.cvx");

    let filtered = report::resource_entries(&repo, Some("wav"));
    assert_eq!(filtered[0].text, "resources (1): WAV");
    assert_eq!(filtered[1].text, "9 - music\\intro.wav");

    let objects = report::record_entries("objects", repo.objects());
    assert_eq!(objects[0].text, "objects (2)");
    assert_eq!(objects[1].text, "4 - CHAPAEV");
    assert_eq!(objects[2].text, "5 - ANKA");

    let scenes = report::record_entries("scenes", repo.scenes());
    assert_eq!(scenes[1].text, "90 - YARD");
}

#[test]
fn missing_optional_files_leave_empty_tables() {
    let dir = tempfile::tempdir().expect("tempdir");
    let part_dir = dir.path().join("part2");
    fs::create_dir_all(&part_dir).expect("create part dir");
    fs::write(part_dir.join("script.dat"), script_bytes()).expect("script");
    fs::write(part_dir.join("resource.qrc"), b"9 = music\\intro.wav\n").expect("resources");

    let repo = Repository::load(dir.path(), PartId::new(2, 0), TextCodec::cp1251())
        .expect("load part 2");
    assert_eq!(repo.objects().len(), 2);
    assert!(repo.messages().is_empty());
    assert!(repo.dialog_groups().is_empty());
    assert!(repo.names().is_empty());
    assert!(repo.part_names().is_empty());
    assert!(repo.record(4).expect("CHAPAEV").cast_color.is_none());
}

#[test]
fn missing_script_is_a_real_error() {
    let dir = tempfile::tempdir().expect("tempdir");
    fs::write(dir.path().join("parts.ini"), b"[Parts]\n1 = Part One\n").expect("part list");

    let err = Repository::load(dir.path(), PartId::new(3, 0), TextCodec::cp1251())
        .expect_err("part 3 has no data");
    let chain = format!("{err:#}");
    assert!(chain.contains("part3/script.dat"), "{chain}");
}
