use clap::{Parser, Subcommand, ValueEnum};
use photo_stamp::export::ExportItem;
use photo_stamp::imaging::{ImageBackend, OutputFormat, Quality, SourceInput};
use photo_stamp::types::{CaptionMetadata, TargetSize};
use photo_stamp::{RenderOptions, StampEngine, config, output};
use std::path::PathBuf;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "photo-stamp")]
#[command(about = "Stamp photos with a white border and a caption at print sizes")]
#[command(long_about = "\
Stamp photos with a white border and a caption at print sizes

Each photo is placed on a white canvas at a fixed print size (300 DPI) with
a caption band holding the place, description and date. Landscape and
portrait photos get a band along the bottom; very tall photos get a rotated
caption strip on the right.

Print sizes:

  5    1500×1050 px   (5×3.5 in)
  6    1800×1200 px   (6×4 in)
  6L   1800×1350 px   (6×4.5 in)
  7    2100×1500 px   (7×5 in)

Batch export reads a JSON array of items:

  [
    {
      \"source_relative_path\": \"2024/IMG_0001.JPG\",
      \"output_filename_stem\": \"outing\",
      \"caption\": { \"date\": \"2024-05-01\", \"location\": \"Shanghai\", \"description\": \"Spring outing\" }
    }
  ]

Run 'photo-stamp gen-config' to generate a documented stamp.toml.")]
#[command(version)]
struct Cli {
    /// Config file (stamp.toml); stock defaults when omitted
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Verbose logging (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Clone, Copy, ValueEnum)]
enum FormatArg {
    Jpeg,
    Png,
}

impl From<FormatArg> for OutputFormat {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::Jpeg => OutputFormat::Jpeg,
            FormatArg::Png => OutputFormat::Png,
        }
    }
}

#[derive(clap::Args)]
struct RenderArgs {
    /// Source photo (JPEG or PNG)
    source: PathBuf,

    /// Output file
    #[arg(short, long)]
    output: PathBuf,

    /// Print size: 5, 6, 6L or 7
    #[arg(long, default_value = "6L")]
    target: TargetSize,

    #[arg(long)]
    date: Option<String>,

    #[arg(long, default_value = "")]
    location: String,

    #[arg(long, default_value = "")]
    description: String,

    /// Border only, no caption band
    #[arg(long)]
    no_text: bool,

    /// Output format; defaults to the output file extension, then JPEG
    #[arg(long, value_enum)]
    format: Option<FormatArg>,

    /// JPEG quality 1-100; defaults to output.quality from the config
    #[arg(long)]
    quality: Option<u32>,

    /// Render at the preview scale instead of full print resolution
    #[arg(long)]
    preview: bool,
}

#[derive(clap::Args)]
struct ExportArgs {
    /// JSON file with the items to export
    #[arg(long)]
    items: PathBuf,

    /// Directory that item paths are relative to
    #[arg(long, default_value = ".")]
    source_root: PathBuf,

    /// Directory that receives the run directory
    #[arg(long, default_value = "exports")]
    output: PathBuf,

    /// Print size: 5, 6, 6L or 7
    #[arg(long, default_value = "6L")]
    target: TargetSize,
}

#[derive(Subcommand)]
enum Command {
    /// Stamp a single photo
    Render(RenderArgs),
    /// Stamp a batch of photos into a new run directory
    Export(ExportArgs),
    /// List the print-size presets
    Sizes,
    /// Print a stock stamp.toml with all options documented
    GenConfig,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Command::Render(args) => {
            let cfg = config::load_config(cli.config.as_deref())?;
            let engine = StampEngine::new(cfg);

            let format = args
                .format
                .map(OutputFormat::from)
                .or_else(|| {
                    args.output
                        .extension()
                        .and_then(|e| e.to_str())
                        .and_then(OutputFormat::from_extension)
                })
                .unwrap_or(OutputFormat::Jpeg);
            let quality = Quality::new(args.quality.unwrap_or(engine.config().output.quality));
            let mut options = if args.preview {
                RenderOptions::preview(format, engine.config())
            } else {
                RenderOptions::export(format, engine.config())
            }
            .with_quality(quality);
            if args.no_text {
                options = options.without_text();
            }

            let source = SourceInput::Path(args.source);
            let info = engine.backend().identify(&source)?;
            let caption = CaptionMetadata {
                date: args.date,
                location: args.location,
                description: args.description,
            };
            let bytes = engine.render(&source, Some(info), args.target, &caption, &options)?;

            if let Some(parent) = args.output.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(&args.output, &bytes)?;
            let plan = engine.plan(args.target, Some(info), options.include_text, options.scale);
            output::print_render_output(&args.output, &plan, bytes.len());
        }
        Command::Export(args) => {
            let cfg = config::load_config(cli.config.as_deref())?;
            let engine = StampEngine::new(cfg);

            let content = std::fs::read_to_string(&args.items)?;
            let items: Vec<ExportItem> = serde_json::from_str(&content)?;

            let (tx, rx) = std::sync::mpsc::channel();
            let printer = std::thread::spawn(move || {
                for event in rx {
                    output::print_export_event(&event);
                }
            });
            let result = engine.export_batch(
                &items,
                args.target,
                &args.source_root,
                &args.output,
                Some(tx),
            );
            let _ = printer.join();
            result?;
        }
        Command::Sizes => {
            output::print_sizes();
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}

/// Log to stderr so stdout stays clean for command output.
fn init_tracing(verbose: bool) {
    let default = if verbose {
        "photo_stamp=debug"
    } else {
        "photo_stamp=warn"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();
}
