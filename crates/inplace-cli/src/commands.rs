use std::fs::File;
use std::path::Path;

use anyhow::{bail, Context};
use colored::Colorize;
use inplace_arena::ArenaConfig;
use inplace_header::{BufferView, EntrySummary, Lookup};
use inplace_types::{GitHash, Magic, Version};
use memmap2::Mmap;
use serde::Serialize;
use tracing::{debug, info};

use crate::cli::*;
use crate::demo::{self, DemoHeader, DemoSummary};

pub fn run_command(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Command::Demo(args) => cmd_demo(args, cli.format),
        Command::Inspect(args) => cmd_inspect(args, cli.format),
        Command::Verify(args) => cmd_verify(args, cli.format),
    }
}

fn load_config(path: Option<&Path>) -> anyhow::Result<ArenaConfig> {
    let Some(path) = path else {
        return Ok(ArenaConfig::default());
    };
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading arena config {}", path.display()))?;
    let config = ArenaConfig::from_toml_str(&text)
        .with_context(|| format!("parsing arena config {}", path.display()))?;
    debug!(?config, "loaded arena config");
    Ok(config)
}

fn map_file(path: &Path) -> anyhow::Result<Mmap> {
    let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    // The mapping is read-only and only ever accessed through checked views.
    let map = unsafe { Mmap::map(&file) }.with_context(|| format!("mapping {}", path.display()))?;
    debug!(path = %path.display(), bytes = map.len(), "mapped buffer");
    Ok(map)
}

#[derive(Serialize)]
struct DemoReport {
    path: String,
    bytes: usize,
    count: usize,
    fill: i32,
}

fn cmd_demo(args: DemoArgs, format: OutputFormat) -> anyhow::Result<()> {
    let config = load_config(args.config.as_deref())?;
    let provenance = match &args.provenance {
        Some(text) => GitHash::try_new(text).context("provenance string too long")?,
        None => GitHash::UNKNOWN,
    };
    let arena = demo::build(args.count, args.fill, provenance, &config)
        .context("building demo buffer")?;
    std::fs::write(&args.path, arena.as_bytes())
        .with_context(|| format!("writing {}", args.path.display()))?;
    info!(path = %args.path.display(), bytes = arena.bytes_allocated(), "demo buffer written");

    match format {
        OutputFormat::Json => {
            let report = DemoReport {
                path: args.path.display().to_string(),
                bytes: arena.bytes_allocated(),
                count: args.count,
                fill: args.fill,
            };
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        OutputFormat::Text => {
            println!(
                "{} Wrote {} ({} bytes)",
                "✓".green().bold(),
                args.path.display().to_string().bold(),
                arena.bytes_allocated()
            );
            println!("  Values: {} × {}", args.count, args.fill.to_string().cyan());
        }
    }
    Ok(())
}

#[derive(Serialize)]
struct InspectReport {
    path: String,
    bytes: usize,
    identifier: Magic,
    framework_magic: Magic,
    framework_version: Version,
    platform: String,
    magic_valid: bool,
    compatible: bool,
    directory_len: usize,
    directory_in_bounds: bool,
    headers: Vec<EntrySummary>,
    demo: Option<DemoSummary>,
}

fn inspect(path: &Path, bytes: &[u8]) -> anyhow::Result<InspectReport> {
    let view =
        BufferView::unvalidated(bytes).with_context(|| format!("reading {}", path.display()))?;
    let root = view.root();
    Ok(InspectReport {
        path: path.display().to_string(),
        bytes: view.len(),
        identifier: root.identifier,
        framework_magic: root.framework_magic,
        framework_version: root.framework_version,
        platform: root.platform.to_string(),
        magic_valid: root.magic_valid(),
        compatible: root.binary_compatible(),
        directory_len: view.directory_len(),
        directory_in_bounds: view.directory().is_some(),
        headers: view.summarize(),
        demo: demo::summarize(&view),
    })
}

fn flag(ok: bool) -> colored::ColoredString {
    if ok {
        "yes".green()
    } else {
        "no".red()
    }
}

fn cmd_inspect(args: InspectArgs, format: OutputFormat) -> anyhow::Result<()> {
    let map = map_file(&args.path)?;
    let report = inspect(&args.path, &map)?;

    if format == OutputFormat::Json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("{} ({} bytes)", report.path.bold(), report.bytes);
    println!("  Identifier: {}", report.identifier.to_string().yellow());
    println!(
        "  Framework:  {} v{} (magic valid: {})",
        report.framework_magic,
        report.framework_version,
        flag(report.magic_valid)
    );
    println!("  Platform:   {} (compatible: {})", report.platform, flag(report.compatible));
    println!(
        "  Directory:  {} entries (in bounds: {})",
        report.directory_len,
        flag(report.directory_in_bounds)
    );
    for entry in &report.headers {
        println!(
            "    [{:>3}] {:<16} v{:<10} @ {:#010x}  {}",
            entry.index,
            entry.identifier.to_string().cyan(),
            entry.version.to_string(),
            entry.offset,
            entry.provenance.dimmed()
        );
    }
    if let Some(demo) = &report.demo {
        println!(
            "  Demo:       {} values, first {:?}, last {:?}, sum {}",
            demo.count, demo.first, demo.last, demo.sum
        );
    }
    Ok(())
}

#[derive(Serialize)]
struct VerifyReport {
    path: String,
    valid: bool,
    headers: usize,
    demo: &'static str,
}

fn cmd_verify(args: VerifyArgs, format: OutputFormat) -> anyhow::Result<()> {
    let map = map_file(&args.path)?;
    let view = BufferView::new(&map)
        .with_context(|| format!("{} is not a valid buffer", args.path.display()))?;
    let headers = view
        .verify_directory()
        .with_context(|| format!("{} has a corrupt header directory", args.path.display()))?;

    let demo = match view.lookup::<DemoHeader>() {
        Lookup::Found(found) => {
            if view.resolve_slice(&found.values).is_none() {
                bail!("{}: demo values lie outside the buffer", args.path.display());
            }
            "readable"
        }
        Lookup::Incompatible { stored } => {
            bail!("{}: demo header version {stored} is not supported", args.path.display())
        }
        Lookup::Absent => "absent",
    };

    match format {
        OutputFormat::Json => {
            let report = VerifyReport {
                path: args.path.display().to_string(),
                valid: true,
                headers,
                demo,
            };
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        OutputFormat::Text => {
            println!(
                "{} {} is a valid buffer",
                "✓".green().bold(),
                args.path.display().to_string().bold()
            );
            println!("  Headers: {}", headers);
            println!("  Demo data: {}", demo);
        }
    }
    Ok(())
}
