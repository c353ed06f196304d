use std::io::Read;

use anyhow::{Context, Result, ensure};
use byteorder::{LittleEndian, ReadBytesExt};
use encoding_rs::{Encoding, WINDOWS_1251};

/// Longest string any of the part files legitimately stores. Anything above
/// this is a corrupt length prefix, not data.
const MAX_STRING_LEN: usize = 4096;

pub const DEFAULT_ENCODING: &str = "cp1251";

/// Decodes the single-byte text stored in the part files. The retail discs
/// ship cp1251; fan translations occasionally use other single-byte pages,
/// so the label stays configurable.
#[derive(Debug, Clone, Copy)]
pub struct TextCodec {
    encoding: &'static Encoding,
}

impl TextCodec {
    pub fn for_label(label: &str) -> Result<Self> {
        let encoding = Encoding::for_label(label.as_bytes())
            .with_context(|| format!("unknown text encoding label {label:?}"))?;
        Ok(Self { encoding })
    }

    pub fn cp1251() -> Self {
        Self {
            encoding: WINDOWS_1251,
        }
    }

    pub fn decode(&self, bytes: &[u8]) -> String {
        let (text, _, _) = self.encoding.decode(bytes);
        text.into_owned()
    }

    pub fn name(&self) -> &'static str {
        self.encoding.name()
    }
}

impl Default for TextCodec {
    fn default() -> Self {
        Self::cp1251()
    }
}

/// Reads a u32-length-prefixed byte string and decodes it.
pub fn read_prefixed_string<R: Read>(reader: &mut R, codec: TextCodec) -> Result<String> {
    let len = reader.read_u32::<LittleEndian>().context("string length")? as usize;
    ensure!(
        len <= MAX_STRING_LEN,
        "string length {len} exceeds the {MAX_STRING_LEN} byte limit"
    );
    let mut bytes = vec![0u8; len];
    reader
        .read_exact(&mut bytes)
        .with_context(|| format!("string body of {len} bytes"))?;
    Ok(codec.decode(&bytes))
}
