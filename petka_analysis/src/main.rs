use std::fs::File;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;

use petka_analysis::render::RenderEntry;
use petka_analysis::report::{self, JsonReport};
use petka_analysis::repository::Repository;
use petka_analysis::xref::CrossIndex;
use petka_formats::part::PartId;
use petka_formats::strings::{TextCodec, DEFAULT_ENCODING};

/// Cross-reference and disassembly reports over one game part.
#[derive(Debug, Parser)]
#[command(version, about)]
struct Args {
    /// Root directory of the installed game data
    #[arg(long)]
    data_root: PathBuf,

    /// Part number, 0 for a layout without part directories
    #[arg(long, default_value_t = 0)]
    part: u32,

    /// Chapter inside the part, 0 when the part has no chapters
    #[arg(long, default_value_t = 0)]
    chapter: u32,

    /// Text encoding of the data files
    #[arg(long, default_value = DEFAULT_ENCODING)]
    encoding: String,

    /// Part list and table counts
    #[arg(long)]
    summary: bool,

    /// List every resource as `id - path`
    #[arg(long)]
    resources: bool,

    /// Limit --resources to one filetype bucket of the summary statistics
    #[arg(long, value_name = "EXT", requires = "resources")]
    filetype: Option<String>,

    /// List every object as `id - name`
    #[arg(long)]
    objects: bool,

    /// List every scene as `id - name`
    #[arg(long)]
    scenes: bool,

    /// Action opcode listing with per-role counts
    #[arg(long)]
    opcodes: bool,

    /// Dialog opcode listing with counts
    #[arg(long)]
    dialog_opcodes: bool,

    /// Every site using one action opcode
    #[arg(long, value_name = "CODE")]
    opcode_usages: Option<u16>,

    /// Every op whose first argument names this resource
    #[arg(long, value_name = "ID")]
    resource_usages: Option<u16>,

    /// Every DIALOG op invoking this dialog group
    #[arg(long, value_name = "ID")]
    dialog_group_usages: Option<u16>,

    /// Every play op carrying this message
    #[arg(long, value_name = "ID")]
    message_usages: Option<u16>,

    /// Annotated listing of one object or scene
    #[arg(long, value_name = "ID")]
    record: Option<u16>,

    /// Disassemble every block of one dialog group
    #[arg(long, value_name = "GROUP")]
    disassemble: Option<u16>,

    /// Display name table with the records each key applies to
    #[arg(long)]
    names: bool,

    /// Inventory description table
    #[arg(long)]
    inventory: bool,

    /// Write the selected reports as JSON
    #[arg(long, value_name = "PATH")]
    json_report: Option<PathBuf>,
}

impl Args {
    /// Summary is the default when nothing else is asked for.
    fn wants_summary(&self) -> bool {
        self.summary
            || !(self.resources
                || self.objects
                || self.scenes
                || self.opcodes
                || self.dialog_opcodes
                || self.opcode_usages.is_some()
                || self.resource_usages.is_some()
                || self.dialog_group_usages.is_some()
                || self.message_usages.is_some()
                || self.record.is_some()
                || self.disassemble.is_some()
                || self.names
                || self.inventory)
    }
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let codec = TextCodec::for_label(&args.encoding)?;
    let part = PartId::new(args.part, args.chapter);
    let repo = Repository::load(&args.data_root, part, codec)
        .with_context(|| format!("loading {part} from {}", args.data_root.display()))?;
    let index = CrossIndex::build(&repo);

    let mut json = JsonReport {
        part: part.to_string(),
        ..JsonReport::default()
    };
    let mut sections: Vec<Vec<RenderEntry>> = Vec::new();

    if args.wants_summary() {
        sections.push(report::summary_entries(&repo));
        json.summary = Some(report::part_summary(&repo));
    }
    if args.resources {
        let filetype = args.filetype.as_deref();
        sections.push(report::resource_entries(&repo, filetype));
        json.resources = Some(report::resource_rows(&repo, filetype));
    }
    if args.objects {
        sections.push(report::record_entries("objects", repo.objects()));
        json.objects = Some(report::record_rows(repo.objects()));
    }
    if args.scenes {
        sections.push(report::record_entries("scenes", repo.scenes()));
        json.scenes = Some(report::record_rows(repo.scenes()));
    }
    if args.opcodes {
        sections.push(report::action_opcode_entries(&index));
        json.action_opcodes = Some(report::action_opcode_listing(&index));
    }
    if args.dialog_opcodes {
        sections.push(report::dialog_opcode_entries(&index));
        json.dialog_opcodes = Some(report::dialog_opcode_listing(&index));
    }
    if let Some(opcode) = args.opcode_usages {
        sections.push(report::action_usage_entries(&repo, &index, opcode));
        json.opcode_usages = Some(report::opcode_usages_report(&index, opcode));
    }
    if let Some(id) = args.resource_usages {
        sections.push(report::resource_usage_entries(&repo, &index, id));
        json.resource_usages = Some(report::resource_usages_report(&repo, &index, id));
    }
    if let Some(id) = args.dialog_group_usages {
        sections.push(report::dialog_group_usage_entries(&repo, &index, id));
        json.dialog_group_usages = Some(report::dialog_group_usages_report(&index, id));
    }
    if let Some(id) = args.message_usages {
        sections.push(report::message_usage_entries(&repo, &index, id));
        json.message_usages = Some(report::message_usages_report(&repo, &index, id));
    }
    if let Some(id) = args.record {
        let entries = report::record_listing(&repo, &index, id);
        json.record = Some(entries.clone());
        sections.push(entries);
    }
    if let Some(id) = args.disassemble {
        let entries = report::dialog_group_listing(&repo, id);
        json.disassembly = Some(entries.clone());
        sections.push(entries);
    }
    if args.names {
        sections.push(report::name_entries(&repo, repo.names()));
        json.names = Some(report::name_rows(&repo, repo.names()));
    }
    if args.inventory {
        sections.push(report::name_entries(&repo, repo.inventory()));
        json.inventory = Some(report::name_rows(&repo, repo.inventory()));
    }

    for (position, section) in sections.iter().enumerate() {
        if position > 0 {
            println!();
        }
        print_entries(section);
    }

    if let Some(path) = &args.json_report {
        let file =
            File::create(path).with_context(|| format!("creating {}", path.display()))?;
        serde_json::to_writer_pretty(file, &json)
            .with_context(|| format!("writing {}", path.display()))?;
    }
    Ok(())
}

fn print_entries(entries: &[RenderEntry]) {
    for entry in entries {
        if let Some(label) = &entry.label {
            println!("{label}:");
        }
        match &entry.comment {
            Some(comment) => println!("  {}  ; {comment}", entry.text),
            None => println!("  {}", entry.text),
        }
    }
}
