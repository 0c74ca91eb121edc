mod byte_source;
mod formats;
mod graphics;
mod logging;
mod progress;
mod report;
mod sprite_extractor;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use log::{debug, error, info, warn};

use formats::{
    dat::{ThingCategory, ThingList},
    spr::SpriteDecoder,
};
use graphics::PngEncoder;
use sprite_extractor::SpriteExtractor;

/// Dump every sprite referenced by Tibia.dat from Tibia.spr as PNG files
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Folder to dump into
    output: PathBuf,

    /// Thing metadata file
    #[arg(long, default_value = "./Tibia.dat")]
    dat: PathBuf,

    /// Sprite atlas file
    #[arg(long, default_value = "./Tibia.spr")]
    spr: PathBuf,

    /// Where to list the ids of entities whose sprites could not be decoded
    #[arg(long, default_value = "corrupt_ids.txt")]
    corrupt_report: PathBuf,

    /// Do not write the corrupt id list
    #[arg(long)]
    no_corrupt_report: bool,

    /// Write a JSON summary of the run
    #[arg(long)]
    summary: Option<PathBuf>,

    /// Keep a JSON progress file updated while dumping
    #[arg(long)]
    progress_file: Option<PathBuf>,

    /// Re-compress every PNG with oxipng
    #[arg(long)]
    optimise: bool,

    /// Debug logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> ExitCode {
    let args = Args::parse();
    logging::setup_logger(args.verbose);

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(args: &Args) -> Result<(), Box<dyn std::error::Error>> {
    let things = ThingList::load(&args.dat)
        .map_err(|e| format!("Failed to load {}: {}", args.dat.display(), e))?;
    info!(
        "Loaded {} things (content revision {})",
        things.len(),
        things.content_revision
    );
    for (category, count) in ThingCategory::ALL.iter().zip(things.counts) {
        debug!("  {}: highest id {}", category.dir_name(), count);
    }

    let decoder = SpriteDecoder::load(&args.spr)
        .map_err(|e| format!("Failed to load {}: {}", args.spr.display(), e))?;

    let mut extractor = SpriteExtractor::new(decoder, PngEncoder::new(args.optimise))
        .with_progress_file(args.progress_file.clone());
    let (summary, corrupt) = extractor.run(&things.things, &args.output)?;

    info!(
        "{} entities processed, {} sprites were saved",
        summary.entities_processed, summary.sprites_saved
    );
    if summary.encode_failures > 0 {
        warn!("{} sprites could not be encoded", summary.encode_failures);
    }

    if !corrupt.is_empty() {
        warn!("{} entities were corrupt", corrupt.len());
        if !args.no_corrupt_report {
            match corrupt.save(&args.corrupt_report) {
                Ok(()) => info!(
                    "Saved corrupt ids to {}",
                    args.corrupt_report.display()
                ),
                Err(e) => warn!(
                    "Failed to save corrupt ids to {}: {}",
                    args.corrupt_report.display(),
                    e
                ),
            }
        }
    }

    if let Some(path) = &args.summary {
        summary.save_json(path)?;
        info!("Summary saved to {}", path.display());
    }

    Ok(())
}
