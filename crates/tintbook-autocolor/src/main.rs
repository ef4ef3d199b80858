//! Tintbook autocolor CLI
//!
//! Finds the fillable regions of a line-art image and turns a region to
//! color mapping, produced by an external classifier, into fill seeds or a
//! ready-to-save magic fill action.

use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand, ValueEnum};
use image::RgbaImage;
use kurbo::Size;
use std::fs;
use std::path::{Path, PathBuf};
use tintbook_core::action::{MagicFill, MagicFillEntry};
use tintbook_core::autocolor::{ColorMap, FillPoint, assign_colors, magic_fill_action};
use tintbook_core::fill::{
    BoundaryRule, FillEngine, FillOptions, Region, RegionOptions, composite_boundary, enumerate_regions,
};

#[derive(Parser)]
#[command(name = "tintbook-autocolor")]
#[command(about = "Region detection and color assignment for line art", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the fillable regions of a line-art image as JSON
    Regions {
        #[command(flatten)]
        scan: ScanArgs,

        /// Write JSON here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Seed each region named in a color map
    Assign {
        #[command(flatten)]
        scan: ScanArgs,

        /// JSON object of region id to hex color, e.g. {"0": "#ff8800"}
        #[arg(short, long)]
        colors: PathBuf,

        /// Emit fill points or a single magic fill action record
        #[arg(short, long, value_enum, default_value = "points")]
        format: OutputFormat,

        /// Write JSON here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Also render the filled image to this PNG
        #[arg(long)]
        render: Option<PathBuf>,
    },
}

#[derive(Args)]
struct ScanArgs {
    /// Line-art image (PNG)
    image: PathBuf,

    /// Seed grid spacing in pixels
    #[arg(long, default_value_t = 4)]
    grid_step: u32,

    /// Smallest region kept, in pixels
    #[arg(long, default_value_t = 50)]
    min_region_size: usize,

    /// Minimum alpha of a line-art pixel
    #[arg(long, default_value_t = 128)]
    alpha_threshold: u8,

    /// Luminance below which an opaque pixel is line art
    #[arg(long, default_value_t = 100.0)]
    luminance_threshold: f32,
}

impl ScanArgs {
    fn options(&self) -> Result<RegionOptions> {
        if self.grid_step == 0 {
            bail!("--grid-step must be at least 1");
        }
        Ok(RegionOptions {
            rule: BoundaryRule {
                alpha_threshold: self.alpha_threshold,
                luminance_threshold: self.luminance_threshold,
            },
            grid_step: self.grid_step,
            min_region_size: self.min_region_size,
        })
    }
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Points,
    Action,
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    if let Err(e) = run(cli.command) {
        log::error!("{:#}", e);
        std::process::exit(1);
    }
}

fn run(command: Commands) -> Result<()> {
    match command {
        Commands::Regions { scan, output } => {
            let (_, regions) = scan_image(&scan)?;
            write_json(&serde_json::to_string_pretty(&regions)?, output.as_deref())
        }
        Commands::Assign {
            scan,
            colors,
            format,
            output,
            render,
        } => {
            let (line_art, regions) = scan_image(&scan)?;
            let raw = fs::read_to_string(&colors).with_context(|| format!("reading {}", colors.display()))?;
            let map = ColorMap::from_json(&raw).with_context(|| format!("parsing {}", colors.display()))?;
            let points = assign_colors(&regions, &map);

            let json = match format {
                OutputFormat::Points => serde_json::to_string_pretty(&points)?,
                OutputFormat::Action => {
                    let size = Size::new(line_art.width() as f64, line_art.height() as f64);
                    let record = magic_fill_action(&points, size).to_record()?;
                    serde_json::to_string_pretty(&record)?
                }
            };
            write_json(&json, output.as_deref())?;

            if let Some(path) = render {
                let filled = render_fills(&line_art, &points, &scan.options()?);
                filled.save(&path).with_context(|| format!("writing {}", path.display()))?;
                log::info!("Rendered {}", path.display());
            }
            Ok(())
        }
    }
}

fn scan_image(scan: &ScanArgs) -> Result<(RgbaImage, Vec<Region>)> {
    let options = scan.options()?;
    let line_art = image::open(&scan.image)
        .with_context(|| format!("opening {}", scan.image.display()))?
        .to_rgba8();
    log::info!("Scanning {} ({}x{})", scan.image.display(), line_art.width(), line_art.height());
    let regions = enumerate_regions(&line_art, &options);
    Ok((line_art, regions))
}

/// Paint the fill points onto a fresh layer and lay it over the line art.
fn render_fills(line_art: &RgbaImage, points: &[FillPoint], options: &RegionOptions) -> RgbaImage {
    let engine = FillEngine::new(FillOptions {
        rule: options.rule,
        ..Default::default()
    });
    let magic = MagicFill {
        entries: points.iter().copied().map(MagicFillEntry::from).collect(),
    };
    let mut drawing = RgbaImage::new(line_art.width(), line_art.height());
    let filled = engine.apply_magic_fill(&mut drawing, line_art, &magic);
    log::info!("Filled {} of {} regions", filled, points.len());
    composite_boundary(&drawing, line_art, &options.rule)
}

fn write_json(json: &str, output: Option<&Path>) -> Result<()> {
    match output {
        Some(path) => {
            fs::write(path, json).with_context(|| format!("writing {}", path.display()))?;
            log::info!("Wrote {}", path.display());
        }
        None => println!("{}", json),
    }
    Ok(())
}
