use std::io::Cursor;

use anyhow::{Context, Result, ensure};
use byteorder::{LittleEndian, ReadBytesExt};
use serde::Serialize;

use crate::strings::{TextCodec, read_prefixed_string};

pub const NO_REF_16: u16 = 0xFFFF;
pub const NO_REF_32: u32 = 0xFFFF_FFFF;
pub const NO_STATUS: u8 = 0xFF;

/// Smallest possible record: id, empty name, zero handlers.
const MIN_RECORD_SIZE: u64 = 10;
/// Handler header: opcode, status byte, target ref, op count.
const HANDLER_HEADER_SIZE: u64 = 9;
/// One operation: five little-endian u16 fields.
const OP_SIZE: u64 = 10;

pub fn opt_ref16(raw: u16) -> Option<u16> {
    (raw != NO_REF_16).then_some(raw)
}

pub fn opt_ref32(raw: u32) -> Option<u32> {
    (raw != NO_REF_32).then_some(raw)
}

pub fn opt_status(raw: u8) -> Option<u8> {
    (raw != NO_STATUS).then_some(raw)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordKind {
    Object,
    Scene,
}

impl RecordKind {
    pub fn label(self) -> &'static str {
        match self {
            RecordKind::Object => "object",
            RecordKind::Scene => "scene",
        }
    }
}

/// One object or scene from `script.dat`. Scene-only attributes (incoming
/// refs, perspective, enter areas) stay empty on objects and are attached
/// from `backgrnd.bg` and `bgs.ini` after the base parse.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScriptRecord {
    pub id: u16,
    pub kind: RecordKind,
    pub name: String,
    pub handlers: Vec<ActionHandler>,
    pub cast_color: Option<CastColor>,
    pub refs: Vec<SceneRef>,
    pub perspective: Option<[f32; 5]>,
    pub enter_areas: Vec<EnterArea>,
}

impl ScriptRecord {
    pub fn new(id: u16, kind: RecordKind, name: impl Into<String>) -> Self {
        Self {
            id,
            kind,
            name: name.into(),
            handlers: Vec::new(),
            cast_color: None,
            refs: Vec::new(),
            perspective: None,
            enter_areas: Vec::new(),
        }
    }

    pub fn op_count(&self) -> usize {
        self.handlers.iter().map(|handler| handler.ops.len()).sum()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CastColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl CastColor {
    pub fn hex(&self) -> String {
        format!("#{:02X}{:02X}{:02X}", self.r, self.g, self.b)
    }
}

/// One incoming reference tuple on a scene: the object placed there and its
/// five placement values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SceneRef {
    pub object_id: u16,
    pub values: [i32; 5],
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EnterArea {
    pub from_scene: String,
    pub on_object: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActionHandler {
    pub opcode: u16,
    pub status: Option<u8>,
    pub target: Option<u16>,
    pub ops: Vec<Operation>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Operation {
    pub opcode: u16,
    pub target: Option<u16>,
    pub args: [Option<u16>; 3],
}

/// Parsed `script.dat`: every object record followed by every scene record.
#[derive(Debug, Clone, Serialize)]
pub struct ScriptFile {
    pub objects: Vec<ScriptRecord>,
    pub scenes: Vec<ScriptRecord>,
}

impl ScriptFile {
    pub fn from_bytes(bytes: &[u8], codec: TextCodec) -> Result<Self> {
        let mut cursor = Cursor::new(bytes);
        let object_count = cursor
            .read_u32::<LittleEndian>()
            .context("script header truncated at object count")?;
        let scene_count = cursor
            .read_u32::<LittleEndian>()
            .context("script header truncated at scene count")?;
        let total = u64::from(object_count) + u64::from(scene_count);
        ensure!(
            total * MIN_RECORD_SIZE <= remaining(&cursor),
            "script declares {total} records beyond end of input"
        );

        let mut objects = Vec::with_capacity(object_count as usize);
        for index in 0..object_count {
            let record = read_record(&mut cursor, RecordKind::Object, codec)
                .with_context(|| format!("object record {index}"))?;
            objects.push(record);
        }
        let mut scenes = Vec::with_capacity(scene_count as usize);
        for index in 0..scene_count {
            let record = read_record(&mut cursor, RecordKind::Scene, codec)
                .with_context(|| format!("scene record {index}"))?;
            scenes.push(record);
        }
        Ok(Self { objects, scenes })
    }
}

fn remaining(cursor: &Cursor<&[u8]>) -> u64 {
    (cursor.get_ref().len() as u64).saturating_sub(cursor.position())
}

fn read_record(
    cursor: &mut Cursor<&[u8]>,
    kind: RecordKind,
    codec: TextCodec,
) -> Result<ScriptRecord> {
    let id = cursor.read_u16::<LittleEndian>().context("record id")?;
    let name = read_prefixed_string(cursor, codec).context("record name")?;
    let handler_count = cursor.read_u32::<LittleEndian>().context("handler count")?;
    ensure!(
        u64::from(handler_count) * HANDLER_HEADER_SIZE <= remaining(cursor),
        "record {id} declares {handler_count} handlers beyond end of input"
    );

    let mut record = ScriptRecord::new(id, kind, name);
    record.handlers.reserve(handler_count as usize);
    for index in 0..handler_count {
        let handler = read_handler(cursor)
            .with_context(|| format!("handler {index} of record {id} ({})", record.name))?;
        record.handlers.push(handler);
    }
    Ok(record)
}

fn read_handler(cursor: &mut Cursor<&[u8]>) -> Result<ActionHandler> {
    let opcode = cursor.read_u16::<LittleEndian>().context("handler opcode")?;
    let status = opt_status(cursor.read_u8().context("handler status")?);
    let target = opt_ref16(cursor.read_u16::<LittleEndian>().context("handler target")?);
    let op_count = cursor.read_u32::<LittleEndian>().context("op count")?;
    ensure!(
        u64::from(op_count) * OP_SIZE <= remaining(cursor),
        "handler declares {op_count} operations beyond end of input"
    );

    let mut ops = Vec::with_capacity(op_count as usize);
    for _ in 0..op_count {
        ops.push(read_operation(cursor)?);
    }
    Ok(ActionHandler {
        opcode,
        status,
        target,
        ops,
    })
}

fn read_operation(cursor: &mut Cursor<&[u8]>) -> Result<Operation> {
    let target = opt_ref16(cursor.read_u16::<LittleEndian>().context("op target")?);
    let opcode = cursor.read_u16::<LittleEndian>().context("op opcode")?;
    let arg1 = opt_ref16(cursor.read_u16::<LittleEndian>().context("op arg1")?);
    let arg2 = opt_ref16(cursor.read_u16::<LittleEndian>().context("op arg2")?);
    let arg3 = opt_ref16(cursor.read_u16::<LittleEndian>().context("op arg3")?);
    Ok(Operation {
        opcode,
        target,
        args: [arg1, arg2, arg3],
    })
}
