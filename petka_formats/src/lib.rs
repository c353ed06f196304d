//! Parsers for the per-part data files of the Petka 1&2 adventure engine.
//! Bytes and text in, plain structs out; no engine behavior lives here.

pub mod backgrounds;
pub mod dialogs;
pub mod files;
pub mod ini;
pub mod opcodes;
pub mod part;
pub mod resources;
pub mod script;
pub mod strings;

pub use backgrounds::{BackgroundEntry, BackgroundFile};
pub use dialogs::{DialogAct, DialogBlock, DialogFile, DialogGroup, DialogOp, Message, MessageFile};
pub use files::FileMap;
pub use ini::SceneSettings;
pub use opcodes::{DIALOG_OPCODE, DialogOpcode};
pub use part::PartId;
pub use resources::ResourceTable;
pub use script::{
    ActionHandler, CastColor, EnterArea, Operation, RecordKind, SceneRef, ScriptFile, ScriptRecord,
};
pub use strings::TextCodec;
