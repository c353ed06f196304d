use std::collections::BTreeMap;

use once_cell::sync::Lazy;
use serde::Serialize;

/// Script action opcode whose target ref names a dialog group instead of an
/// object or scene.
pub const DIALOG_OPCODE: u16 = 13;

/// Display names for the script action opcodes, as reconstructed from the
/// retail engine. Codes missing here still flow through every listing with a
/// numeric fallback name.
const ACTION_OPCODE_NAMES: &[(u16, &str)] = &[
    (1, "USE"),
    (2, "SETPOS"),
    (3, "GOTO"),
    (4, "LOOK"),
    (5, "SAY"),
    (6, "TAKE"),
    (7, "WALK"),
    (8, "TALK"),
    (9, "END"),
    (10, "SET"),
    (11, "SHOW"),
    (12, "HIDE"),
    (13, "DIALOG"),
    (14, "ZBUFFER"),
    (15, "TOTALINIT"),
    (16, "ANIMATE"),
    (17, "STATUS"),
    (18, "ADDINV"),
    (19, "DELINV"),
    (20, "STOP"),
    (21, "CURSOR"),
    (22, "OBJECTUSE"),
    (23, "ACTIVE"),
    (24, "SAID"),
    (25, "SETSEQ"),
    (26, "ENDSEQ"),
    (27, "WAIT"),
    (28, "RANDOM"),
    (29, "WALKTO"),
    (30, "WALKVICH"),
    (31, "IMAGE"),
    (32, "STAND"),
    (33, "ON"),
    (34, "OFF"),
    (35, "PLAY"),
    (36, "LEAVEBG"),
    (37, "SHAKE"),
    (38, "SP"),
    (39, "SETINV"),
    (40, "JUMP"),
    (41, "JUMPVICH"),
    (42, "PART"),
    (43, "CHAPTER"),
    (44, "AVI"),
    (45, "TOMAP"),
    (46, "FROMMAP"),
    (47, "EXTRATOMAP"),
    (48, "MUSIC"),
    (49, "BGSFX"),
    (50, "NOMAP"),
    (51, "MAP"),
    (52, "SYSTEM"),
    (53, "QUIT"),
];

const DIALOG_OPCODE_NAMES: &[(u8, &str)] = &[
    (1, "BREAK"),
    (2, "MENU"),
    (3, "GOTO"),
    (4, "DISABLE"),
    (5, "ENABLE"),
    (6, "RETURN"),
    (7, "PLAY"),
    (8, "CIRCLE"),
    (9, "USERMSG"),
];

pub static ACTION_OPCODES: Lazy<BTreeMap<u16, &'static str>> =
    Lazy::new(|| ACTION_OPCODE_NAMES.iter().copied().collect());

pub static DIALOG_OPCODES: Lazy<BTreeMap<u8, &'static str>> =
    Lazy::new(|| DIALOG_OPCODE_NAMES.iter().copied().collect());

/// Fallback display name for codes absent from the static tables.
pub fn fallback_name(code: u16) -> String {
    format!("OP_{code:02X}")
}

pub fn action_opcode_name(code: u16) -> String {
    match ACTION_OPCODES.get(&code) {
        Some(name) => (*name).to_string(),
        None => fallback_name(code),
    }
}

/// Dialog bytecode operations. The stream stores one byte per opcode; codes
/// outside the known set are carried as `Unknown` so they keep flowing
/// through label and branch analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DialogOpcode {
    Break,
    Menu,
    Goto,
    DisableMenuItem,
    EnableMenuItem,
    Return,
    Play,
    Circle,
    UserMessage,
    Unknown(u8),
}

impl DialogOpcode {
    pub fn from_code(code: u8) -> Self {
        match code {
            1 => Self::Break,
            2 => Self::Menu,
            3 => Self::Goto,
            4 => Self::DisableMenuItem,
            5 => Self::EnableMenuItem,
            6 => Self::Return,
            7 => Self::Play,
            8 => Self::Circle,
            9 => Self::UserMessage,
            other => Self::Unknown(other),
        }
    }

    pub fn code(self) -> u8 {
        match self {
            Self::Break => 1,
            Self::Menu => 2,
            Self::Goto => 3,
            Self::DisableMenuItem => 4,
            Self::EnableMenuItem => 5,
            Self::Return => 6,
            Self::Play => 7,
            Self::Circle => 8,
            Self::UserMessage => 9,
            Self::Unknown(code) => code,
        }
    }

    pub fn display_name(self) -> String {
        match DIALOG_OPCODES.get(&self.code()) {
            Some(name) => (*name).to_string(),
            None => fallback_name(u16::from(self.code())),
        }
    }

    /// Opcodes whose ref field is an address inside the current block.
    pub fn is_jump(self) -> bool {
        matches!(self, Self::Goto | Self::Return)
    }

    /// Multi-way branch opcodes whose ref carries the case count.
    pub fn is_select(self) -> bool {
        matches!(self, Self::Menu | Self::Circle)
    }
}

pub fn dialog_opcode_name(code: u8) -> String {
    DialogOpcode::from_code(code).display_name()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dialog_codes_round_trip() {
        for code in 0..=u8::MAX {
            assert_eq!(DialogOpcode::from_code(code).code(), code);
        }
    }

    #[test]
    fn known_names_resolve() {
        assert_eq!(action_opcode_name(DIALOG_OPCODE), "DIALOG");
        assert_eq!(DialogOpcode::Menu.display_name(), "MENU");
        assert_eq!(DialogOpcode::from_code(2), DialogOpcode::Menu);
    }

    #[test]
    fn unknown_codes_fall_back_to_numeric_names() {
        assert_eq!(action_opcode_name(0x2000), "OP_2000");
        assert_eq!(DialogOpcode::from_code(0x0C).display_name(), "OP_0C");
    }

    #[test]
    fn jump_and_select_classes_are_disjoint() {
        for code in 0..=u8::MAX {
            let opcode = DialogOpcode::from_code(code);
            assert!(!(opcode.is_jump() && opcode.is_select()));
        }
    }
}
