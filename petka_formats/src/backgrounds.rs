use std::io::Cursor;

use anyhow::{Context, Result, ensure};
use byteorder::{LittleEndian, ReadBytesExt};
use serde::Serialize;

use crate::script::SceneRef;
use crate::strings::{TextCodec, read_prefixed_string};

/// One ref: object id plus five i32 placement values.
const REF_SIZE: u64 = 22;

/// Parsed `backgrnd.bg`: for each scene, the objects placed on it. The
/// entries are keyed by scene name because the file predates stable ids in
/// the toolchain that produced it.
#[derive(Debug, Clone, Serialize)]
pub struct BackgroundFile {
    pub entries: Vec<BackgroundEntry>,
}

#[derive(Debug, Clone, Serialize)]
pub struct BackgroundEntry {
    pub scene_name: String,
    pub refs: Vec<SceneRef>,
}

impl BackgroundFile {
    pub fn from_bytes(bytes: &[u8], codec: TextCodec) -> Result<Self> {
        let mut cursor = Cursor::new(bytes);
        let entry_count = cursor
            .read_u32::<LittleEndian>()
            .context("background header truncated")?;

        let mut entries = Vec::with_capacity(entry_count.min(0xFFFF) as usize);
        for index in 0..entry_count {
            let entry = read_entry(&mut cursor, codec)
                .with_context(|| format!("background entry {index}"))?;
            entries.push(entry);
        }
        Ok(Self { entries })
    }
}

fn read_entry(cursor: &mut Cursor<&[u8]>, codec: TextCodec) -> Result<BackgroundEntry> {
    let scene_name = read_prefixed_string(cursor, codec).context("scene name")?;
    let ref_count = cursor.read_u32::<LittleEndian>().context("ref count")?;
    let available = (cursor.get_ref().len() as u64).saturating_sub(cursor.position());
    ensure!(
        u64::from(ref_count) * REF_SIZE <= available,
        "scene {scene_name} declares {ref_count} refs beyond end of input"
    );

    let mut refs = Vec::with_capacity(ref_count as usize);
    for _ in 0..ref_count {
        let object_id = cursor.read_u16::<LittleEndian>()?;
        let mut values = [0i32; 5];
        for value in &mut values {
            *value = cursor.read_i32::<LittleEndian>()?;
        }
        refs.push(SceneRef { object_id, values });
    }
    Ok(BackgroundEntry { scene_name, refs })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn push_u32(buf: &mut Vec<u8>, value: u32) {
        buf.extend_from_slice(&value.to_le_bytes());
    }

    fn sample_backgrounds() -> Vec<u8> {
        let mut buf = Vec::new();
        push_u32(&mut buf, 1);
        push_u32(&mut buf, 4);
        buf.extend_from_slice(b"YARD");
        push_u32(&mut buf, 2);
        for (object_id, x) in [(4u16, 120i32), (5, -40)] {
            buf.extend_from_slice(&object_id.to_le_bytes());
            buf.extend_from_slice(&x.to_le_bytes());
            for value in [200i32, 0, 1, 0] {
                buf.extend_from_slice(&value.to_le_bytes());
            }
        }
        buf
    }

    #[test]
    fn parses_scene_refs() {
        let file = BackgroundFile::from_bytes(&sample_backgrounds(), TextCodec::cp1251())
            .expect("valid background file");
        assert_eq!(file.entries.len(), 1);
        let entry = &file.entries[0];
        assert_eq!(entry.scene_name, "YARD");
        assert_eq!(entry.refs.len(), 2);
        assert_eq!(entry.refs[0].object_id, 4);
        assert_eq!(entry.refs[0].values, [120, 200, 0, 1, 0]);
        assert_eq!(entry.refs[1].object_id, 5);
        assert_eq!(entry.refs[1].values, [-40, 200, 0, 1, 0]);
    }

    #[test]
    fn rejects_ref_table_past_input() {
        let mut buf = sample_backgrounds();
        buf.truncate(buf.len() - 10);
        let err = BackgroundFile::from_bytes(&buf, TextCodec::cp1251()).unwrap_err();
        assert!(format!("{err:#}").contains("background entry 0"));
    }
}
