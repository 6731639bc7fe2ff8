//! msgc driver
//!
//! Loads a source unit (declaration fragments and directive comments) from
//! JSON, runs the generator core over it and writes the finished file set
//! as JSON for the printer.

use anyhow::{Context, Result};
use clap::Parser;
use log::info;
use msgc_common::GenConfig;
use msgc_frontend::Frontend;
use std::fs;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "msgc", version, about = "Positional MessagePack code generator core")]
struct Args {
    /// Input source unit (JSON)
    input: PathBuf,

    /// Output file for the processed file set (defaults to stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Keep unexported declarations and fields
    #[arg(long)]
    unexported: bool,

    /// Struct tag key read before `msg` and `msgpack`
    #[arg(long, value_name = "NAME")]
    tag_name: Option<String>,

    /// Generate methods with pointer receivers
    #[arg(long)]
    pointer: bool,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

impl Args {
    /// Starting configuration; file directives override it
    fn frontend(&self) -> Frontend {
        let config = GenConfig {
            tag_name: self.tag_name.clone(),
            pointer_receiver: self.pointer,
            ..GenConfig::default()
        };
        Frontend::new(config).with_unexported(self.unexported)
    }
}

fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();
}

/// Process a unit given as JSON text into pretty JSON
fn convert(args: &Args, json: &str) -> Result<String> {
    let fileset = args.frontend().process_json(json)?;
    info!(
        "{}: {} declaration(s), {} suppressed",
        fileset.package,
        fileset.identities.len(),
        fileset.config.suppressed.len()
    );
    Ok(serde_json::to_string_pretty(&fileset)?)
}

fn run(args: &Args) -> Result<()> {
    let input = fs::read_to_string(&args.input)
        .with_context(|| format!("reading {}", args.input.display()))?;
    let output = convert(args, &input)?;

    if let Some(path) = &args.output {
        fs::write(path, output).with_context(|| format!("writing {}", path.display()))?;
        info!("wrote {}", path.display());
    } else {
        println!("{}", output);
    }
    Ok(())
}

fn main() {
    let args = Args::parse();
    init_logging(args.verbose);

    if let Err(e) = run(&args) {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}
