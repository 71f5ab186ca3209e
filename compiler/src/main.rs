use clap::Parser;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

use sdc::decode::DecodedFile;

#[derive(Debug, Clone, clap::ValueEnum)]
enum EmitKind {
    Dump,
    Json,
    Dot,
    Info,
}

#[derive(Parser, Debug)]
#[command(
    name = "sdc",
    version,
    about = "SynthDef graph compiler — inspects compiled SCgf containers"
)]
struct Cli {
    /// Compiled container file
    file: PathBuf,

    /// Output form
    #[arg(long, value_enum, default_value_t = EmitKind::Dump)]
    emit: EmitKind,

    /// Print processing detail to stderr
    #[arg(long)]
    verbose: bool,
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    // ── Read container bytes ──
    let bytes = match std::fs::read(&cli.file) {
        Ok(b) => b,
        Err(e) => {
            eprintln!("sdc: error: {}: {}", cli.file.display(), e);
            std::process::exit(2);
        }
    };

    if cli.verbose {
        eprintln!("sdc: read {} bytes from {}", bytes.len(), cli.file.display());
    }

    // ── Decode ──
    let decoded = match sdc::decode::decode(&bytes) {
        Ok(d) => d,
        Err(e) => {
            eprintln!("sdc: decode error: {}", e);
            std::process::exit(1);
        }
    };

    if cli.verbose {
        eprintln!("sdc: decoded {} definitions", decoded.defs.len());
    }

    // ── Emit ──
    match cli.emit {
        EmitKind::Dump => print!("{}", decoded),
        EmitKind::Json => match serde_json::to_string_pretty(&decoded) {
            Ok(json) => println!("{}", json),
            Err(e) => {
                eprintln!("sdc: error: {}", e);
                std::process::exit(1);
            }
        },
        EmitKind::Dot => print!("{}", sdc::dot::emit_dot(&decoded)),
        EmitKind::Info => print_info(&cli.file, &bytes, &decoded),
    }
}

fn init_tracing(verbose: bool) {
    let fallback = if verbose { "sdc=debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn print_info(path: &Path, bytes: &[u8], decoded: &DecodedFile) {
    println!(
        "{}: {} bytes, container v{}",
        path.display(),
        bytes.len(),
        decoded.version
    );
    println!("sha256: {}", sdc::encode::fingerprint(bytes));
    for def in &decoded.defs {
        println!(
            "  {}: {} nodes, {} constants, {} params",
            def.name,
            def.nodes.len(),
            def.constants.len(),
            def.parameter_defaults.len()
        );
    }
}
