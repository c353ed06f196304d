use std::io::Cursor;

use anyhow::{Context, Result, ensure};
use byteorder::{LittleEndian, ReadBytesExt};
use serde::Serialize;

use crate::opcodes::DialogOpcode;
use crate::script::{opt_ref16, opt_ref32};
use crate::strings::{TextCodec, read_prefixed_string};

/// One dialog op on the wire: u16 ref, u8 opcode, u8 arg.
const OP_SIZE: u64 = 4;
/// Act header: opcode, object ref, two args, block count.
const ACT_HEADER_SIZE: u64 = 12;

/// Parsed `dialogue.fix`: the dialog structure without any text. Text lives
/// in the companion `dialogue.lod` message table.
#[derive(Debug, Clone, Serialize)]
pub struct DialogFile {
    pub groups: Vec<DialogGroup>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DialogGroup {
    pub id: u16,
    pub arg: Option<u32>,
    pub acts: Vec<DialogAct>,
}

/// A script-side trigger (USE, TALK, ...) with the dialog blocks it runs.
#[derive(Debug, Clone, Serialize)]
pub struct DialogAct {
    pub opcode: u16,
    pub object: Option<u16>,
    pub args: [Option<u16>; 2],
    pub blocks: Vec<DialogBlock>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DialogBlock {
    pub entry: u16,
    pub ops: Vec<DialogOp>,
}

/// One dialog bytecode op. `ref_val` is a jump address, an object id or a
/// message id depending on the opcode; `message` is filled once the message
/// table is loaded and the ref names a real entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DialogOp {
    pub addr: u16,
    pub opcode: DialogOpcode,
    pub ref_val: u16,
    pub arg: u8,
    pub message: Option<u16>,
}

impl DialogOp {
    pub fn new(addr: u16, opcode: DialogOpcode, ref_val: u16, arg: u8) -> Self {
        Self {
            addr,
            opcode,
            ref_val,
            arg,
            message: None,
        }
    }
}

impl DialogFile {
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let mut cursor = Cursor::new(bytes);
        let group_count = cursor
            .read_u32::<LittleEndian>()
            .context("dialog header truncated")?;

        let mut groups = Vec::with_capacity(group_count.min(0xFFFF) as usize);
        for index in 0..group_count {
            let group =
                read_group(&mut cursor).with_context(|| format!("dialog group {index}"))?;
            groups.push(group);
        }
        Ok(Self { groups })
    }
}

fn remaining(cursor: &Cursor<&[u8]>) -> u64 {
    (cursor.get_ref().len() as u64).saturating_sub(cursor.position())
}

fn read_group(cursor: &mut Cursor<&[u8]>) -> Result<DialogGroup> {
    let raw_id = cursor.read_u32::<LittleEndian>().context("group id")?;
    ensure!(raw_id <= u32::from(u16::MAX), "group id {raw_id} exceeds 16 bits");
    let id = raw_id as u16;
    let arg = opt_ref32(cursor.read_u32::<LittleEndian>().context("group arg")?);
    let act_count = cursor.read_u32::<LittleEndian>().context("act count")?;
    ensure!(
        u64::from(act_count) * ACT_HEADER_SIZE <= remaining(cursor),
        "group {id} declares {act_count} acts beyond end of input"
    );

    let mut acts = Vec::with_capacity(act_count as usize);
    for index in 0..act_count {
        let act = read_act(cursor).with_context(|| format!("act {index} of group {id}"))?;
        acts.push(act);
    }
    Ok(DialogGroup { id, arg, acts })
}

fn read_act(cursor: &mut Cursor<&[u8]>) -> Result<DialogAct> {
    let opcode = cursor.read_u16::<LittleEndian>().context("act opcode")?;
    let object = opt_ref16(cursor.read_u16::<LittleEndian>().context("act object")?);
    let arg1 = opt_ref16(cursor.read_u16::<LittleEndian>().context("act arg1")?);
    let arg2 = opt_ref16(cursor.read_u16::<LittleEndian>().context("act arg2")?);
    let block_count = cursor.read_u32::<LittleEndian>().context("block count")?;

    let mut blocks = Vec::with_capacity(block_count.min(0xFFFF) as usize);
    for index in 0..block_count {
        let block = read_block(cursor).with_context(|| format!("block {index}"))?;
        blocks.push(block);
    }
    Ok(DialogAct {
        opcode,
        object,
        args: [arg1, arg2],
        blocks,
    })
}

fn read_block(cursor: &mut Cursor<&[u8]>) -> Result<DialogBlock> {
    let entry = cursor.read_u32::<LittleEndian>().context("block entry")?;
    let op_count = cursor.read_u32::<LittleEndian>().context("block op count")?;
    ensure!(
        u64::from(entry) + u64::from(op_count) <= 0x10000,
        "block at {entry} with {op_count} ops overflows the 16-bit address space"
    );
    ensure!(
        u64::from(op_count) * OP_SIZE <= remaining(cursor),
        "block declares {op_count} ops beyond end of input"
    );

    let entry = entry as u16;
    let mut ops = Vec::with_capacity(op_count as usize);
    for index in 0..op_count {
        let ref_val = cursor.read_u16::<LittleEndian>()?;
        let opcode = DialogOpcode::from_code(cursor.read_u8()?);
        let arg = cursor.read_u8()?;
        ops.push(DialogOp::new(entry + index as u16, opcode, ref_val, arg));
    }
    Ok(DialogBlock { entry, ops })
}

/// Parsed `dialogue.lod`. A message's id is its position in the table; the
/// dialog PLAY op refs and the save format both count on that.
#[derive(Debug, Clone, Serialize)]
pub struct MessageFile {
    pub messages: Vec<Message>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Message {
    pub id: u16,
    pub object_id: u16,
    pub args: [u16; 2],
    pub wav: String,
    pub text: String,
}

impl MessageFile {
    pub fn from_bytes(bytes: &[u8], codec: TextCodec) -> Result<Self> {
        let mut cursor = Cursor::new(bytes);
        let count = cursor
            .read_u32::<LittleEndian>()
            .context("message header truncated")?;
        ensure!(count <= 0x10000, "message table of {count} entries is too large");

        let mut messages = Vec::with_capacity(count as usize);
        for id in 0..count {
            let message = read_message(&mut cursor, id as u16, codec)
                .with_context(|| format!("message {id}"))?;
            messages.push(message);
        }
        Ok(Self { messages })
    }
}

fn read_message(cursor: &mut Cursor<&[u8]>, id: u16, codec: TextCodec) -> Result<Message> {
    let object_id = cursor.read_u16::<LittleEndian>().context("object id")?;
    let arg1 = cursor.read_u16::<LittleEndian>().context("arg1")?;
    let arg2 = cursor.read_u16::<LittleEndian>().context("arg2")?;
    let wav = read_prefixed_string(cursor, codec).context("wav name")?;
    let text = read_prefixed_string(cursor, codec).context("text")?;
    Ok(Message {
        id,
        object_id,
        args: [arg1, arg2],
        wav,
        text,
    })
}
