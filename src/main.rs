use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use lipopick::convert::{self, FuseConfig, SUBTRACTED_FIELD};
use lipopick::detection::preprocessing::Polarity;
use lipopick::detection::{PrecomputedMasks, Segmenter, ThresholdSegmenter};
use lipopick::{DetectionPipeline, SelectionConfig};

#[derive(Parser)]
#[command(name = "lipopick")]
#[command(about = "Pick round vesicles from segmentation masks and move their geometry between image, MRC and MAT files")]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Select round masks for every image and write overlays and records
    Detect(DetectArgs),
    /// Join MRC micrographs with their records into MicData_N.mat files
    Fuse {
        /// Directory of .mrc micrographs
        #[arg(long, value_name = "DIR")]
        mrc: PathBuf,
        /// Directory of *_centers_and_radii.txt records
        #[arg(long, value_name = "DIR")]
        records: PathBuf,
        /// Output directory for .mat files
        #[arg(long, value_name = "DIR")]
        output: PathBuf,
    },
    /// Write one field of a .mat file as a float32 MRC micrograph
    Export {
        #[arg(long, value_name = "FILE")]
        mat: PathBuf,
        #[arg(long, value_name = "FILE")]
        output: PathBuf,
        /// Name of the micrograph variable
        #[arg(long, default_value = SUBTRACTED_FIELD)]
        field: String,
    },
    /// Save 8-bit JPEG previews of MRC micrographs
    Preview {
        #[arg(long, value_name = "DIR")]
        mrc: PathBuf,
        #[arg(long, value_name = "DIR")]
        output: PathBuf,
    },
}

#[derive(Args)]
struct DetectArgs {
    /// Directory of png/jpg/jpeg images
    #[arg(long, value_name = "DIR")]
    input: PathBuf,

    /// Directory for overlays and records
    #[arg(long, value_name = "DIR")]
    output: PathBuf,

    /// Directory of masks exported by a segmentation model (<stem>_mask_<n>.png)
    #[arg(long, value_name = "DIR", conflicts_with = "segmenter")]
    masks: Option<PathBuf>,

    /// Built-in segmenter to use when no mask directory is given
    #[arg(long, value_enum)]
    segmenter: Option<SegmenterKind>,

    /// Foreground side of the Otsu level for the threshold segmenter
    #[arg(long, value_enum, default_value_t = PolarityArg::Dark)]
    polarity: PolarityArg,

    /// Minimum fraction of the circumscribing disk a mask must fill
    #[arg(long, default_value_t = 0.9)]
    threshold: f64,

    /// Minimum radius in pixels
    #[arg(long, default_value_t = 100.0)]
    min_radius: f64,

    /// Save every candidate mask with its verdict to directory (must be empty)
    #[arg(long, value_name = "DIR")]
    debug_out: Option<PathBuf>,
}

#[derive(Clone, Copy, ValueEnum)]
enum SegmenterKind {
    Threshold,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum PolarityArg {
    Dark,
    Bright,
}

impl From<PolarityArg> for Polarity {
    fn from(p: PolarityArg) -> Self {
        match p {
            PolarityArg::Dark => Polarity::Dark,
            PolarityArg::Bright => Polarity::Bright,
        }
    }
}

fn run_detect<S: Segmenter>(segmenter: S, args: &DetectArgs) -> anyhow::Result<()> {
    let config = SelectionConfig::new()
        .with_threshold(args.threshold)
        .with_min_radius(args.min_radius);

    let mut pipeline = DetectionPipeline::new(segmenter).with_config(config)?;
    if let Some(debug_dir) = &args.debug_out {
        pipeline = pipeline.with_debug(debug_dir.clone())?;
    }

    let report = pipeline.run_directory(&args.input, &args.output)?;

    println!("\n=== Round Mask Detection Results ===");
    println!("Images processed: {}", report.processed.len());
    for outcome in &report.processed {
        println!(
            "  {}: {} round of {} candidates",
            outcome.image.display(),
            outcome.accepted.len(),
            outcome.candidates
        );
    }
    if !report.failed.is_empty() {
        println!("Images failed: {}", report.failed.len());
        for (path, reason) in &report.failed {
            println!("  {}: {}", path.display(), reason);
        }
    }
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let args = Cli::parse();

    lipopick::logging::setup_logging(if args.verbose { "debug" } else { "info" })?;

    match args.command {
        Command::Detect(detect) => match &detect.masks {
            Some(dir) => run_detect(PrecomputedMasks::open(dir)?, &detect),
            None => {
                let segmenter = match detect.segmenter.unwrap_or(SegmenterKind::Threshold) {
                    SegmenterKind::Threshold => ThresholdSegmenter {
                        polarity: detect.polarity.into(),
                        ..ThresholdSegmenter::new()
                    },
                };
                run_detect(segmenter, &detect)
            }
        },
        Command::Fuse { mrc, records, output } => {
            let report = convert::fuse_directory(&FuseConfig {
                mrc_dir: mrc,
                record_dir: records,
                output_dir: output,
            })?;

            println!("\n=== Fuse Results ===");
            for item in &report.written {
                println!(
                    "  {} + {} -> {}",
                    item.container.display(),
                    item.record.display(),
                    item.output.display()
                );
            }
            for path in &report.unmatched {
                println!("  No matching record for {}", path.display());
            }
            for (path, reason) in &report.failed {
                println!("  Failed {}: {}", path.display(), reason);
            }
            Ok(())
        }
        Command::Export { mat, output, field } => convert::export(&mat, &field, &output),
        Command::Preview { mrc, output } => {
            let written = convert::preview_directory(&mrc, &output)?;
            println!("Saved {} previews to {}", written.len(), output.display());
            Ok(())
        }
    }
}
