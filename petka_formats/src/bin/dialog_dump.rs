//! Outline a `dialogue.fix`, optionally resolving PLAY refs against the
//! companion `dialogue.lod` message table.

use std::fs;
use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use petka_formats::opcodes::action_opcode_name;
use petka_formats::{DialogFile, DialogOpcode, MessageFile, TextCodec};

#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// dialogue.fix to read
    input: PathBuf,

    /// Companion dialogue.lod with the message texts
    #[arg(long)]
    messages: Option<PathBuf>,

    /// Text encoding of the message table
    #[arg(long, default_value = petka_formats::strings::DEFAULT_ENCODING)]
    encoding: String,

    /// Emit the parsed structure as pretty-printed JSON
    #[arg(long, default_value_t = false)]
    json: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();
    let bytes = fs::read(&args.input)?;
    let dialogs = DialogFile::from_bytes(&bytes)?;

    let messages = match &args.messages {
        Some(path) => {
            let codec = TextCodec::for_label(&args.encoding)?;
            Some(MessageFile::from_bytes(&fs::read(path)?, codec)?)
        }
        None => None,
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&dialogs)?);
        return Ok(());
    }

    println!("{} dialog groups in {}", dialogs.groups.len(), args.input.display());
    for group in &dialogs.groups {
        println!("group {:>5} ({} acts)", group.id, group.acts.len());
        for act in &group.acts {
            println!(
                "  on {name}, object {object}",
                name = action_opcode_name(act.opcode),
                object = act
                    .object
                    .map(|id| id.to_string())
                    .unwrap_or_else(|| String::from("-"))
            );
            for block in &act.blocks {
                println!("    block at {:04x}, {} ops", block.entry, block.ops.len());
                for op in &block.ops {
                    let detail = match (op.opcode, &messages) {
                        (DialogOpcode::Play, Some(table)) => table
                            .messages
                            .get(op.ref_val as usize)
                            .map(|message| format!("  ; {}", message.wav))
                            .unwrap_or_default(),
                        _ => String::new(),
                    };
                    println!(
                        "      {addr:04x}: {name:<8} {ref_val:#06x}, {arg}{detail}",
                        addr = op.addr,
                        name = op.opcode.display_name(),
                        ref_val = op.ref_val,
                        arg = op.arg
                    );
                }
            }
        }
    }
    Ok(())
}
