//! List the records of a `script.dat`, either as a text outline or as JSON.

use std::fs;
use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use petka_formats::opcodes::action_opcode_name;
use petka_formats::{ScriptFile, TextCodec};

#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// script.dat to read
    input: PathBuf,

    /// Text encoding of record names
    #[arg(long, default_value = petka_formats::strings::DEFAULT_ENCODING)]
    encoding: String,

    /// Emit the parsed file as pretty-printed JSON
    #[arg(long, default_value_t = false)]
    json: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();
    let codec = TextCodec::for_label(&args.encoding)?;
    let bytes = fs::read(&args.input)?;
    let script = ScriptFile::from_bytes(&bytes, codec)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&script)?);
        return Ok(());
    }

    println!(
        "{} objects, {} scenes in {}",
        script.objects.len(),
        script.scenes.len(),
        args.input.display()
    );
    for record in script.objects.iter().chain(script.scenes.iter()) {
        println!(
            "{kind:<6} {id:>5} {name} ({handlers} handlers, {ops} ops)",
            kind = record.kind.label(),
            id = record.id,
            name = record.name,
            handlers = record.handlers.len(),
            ops = record.op_count()
        );
        for handler in &record.handlers {
            println!(
                "    on {name} (status {status}, target {target}) -> {ops} ops",
                name = action_opcode_name(handler.opcode),
                status = opt_text(handler.status.map(u16::from)),
                target = opt_text(handler.target),
                ops = handler.ops.len()
            );
        }
    }
    Ok(())
}

fn opt_text(value: Option<u16>) -> String {
    match value {
        Some(value) => value.to_string(),
        None => String::from("-"),
    }
}
