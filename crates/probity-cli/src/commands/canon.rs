//! Canon command
//!
//! Usage: probity canon <FILE> [--output <FILE>]

use clap::Args;
use probity_core::snapshot::{canonicalize, content_digest};
use std::path::PathBuf;

#[derive(Debug, Args)]
pub struct CanonArgs {
    /// JSON document to canonicalize
    pub file: PathBuf,

    /// Output file path (default: stdout)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Print the SHA-256 digest of the canonical form instead
    #[arg(long)]
    pub digest: bool,
}

pub fn execute(args: CanonArgs) -> Result<(), Box<dyn std::error::Error>> {
    let value = super::read_json(&args.file)?;
    let canonical = canonicalize(&value)?;

    let text = if args.digest {
        format!("{}\n", content_digest(&canonical))
    } else {
        canonical
    };

    if let Some(output_path) = args.output {
        std::fs::write(&output_path, text)?;
        println!("✓ Wrote {}", output_path.display());
    } else {
        print!("{}", text);
    }

    Ok(())
}
