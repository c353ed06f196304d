//! Cross-reference and disassembly analysis for Petka 1&2 game data.
//!
//! `repository` loads one part into memory, `xref` builds the reverse
//! indices over it, `disasm` reconstructs dialog blocks, and `report`
//! shapes all of it for the CLI and the JSON report.

pub mod disasm;
pub mod render;
pub mod report;
pub mod repository;
pub mod xref;
