use std::fs;
use std::io;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::Parser;

use vizplan::plan::Dimension;
use vizplan::{backend, provider, render, Dataset, Descriptor, RenderConfig, RenderPlan};

#[derive(Parser, Debug)]
#[command(name = "vizplan")]
#[command(about = "Resolve a visualization descriptor against tabular data", long_about = None)]
struct Args {
    /// Dataset file (.csv or .json); "-" reads CSV from stdin
    #[arg(long)]
    data: String,

    /// Visualization descriptor JSON file
    #[arg(long, conflicts_with = "analysis")]
    descriptor: Option<PathBuf>,

    /// Raw analysis-provider response to extract the descriptor from
    #[arg(long)]
    analysis: Option<PathBuf>,

    /// Draw the plan to a PNG file instead of printing JSON
    #[arg(long)]
    png: Option<PathBuf>,

    /// Increase output logging verbosity
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();
    simple_logger::init_with_level(if args.verbose {
        log::Level::Debug
    } else {
        log::Level::Warn
    })
    .context("Failed to initialize logging")?;

    let dataset = load_dataset(&args.data)?;
    let descriptor = load_descriptor(&args)?;

    let plan = render(&dataset, &descriptor, &RenderConfig::default())?;
    if plan.is_no_data() {
        log::info!("no renderable data; emitting the empty state");
    }

    match &args.png {
        Some(path) => {
            let (width, height) = pixel_size(&plan);
            let png = backend::draw_png(&plan, width, height)?;
            fs::write(path, png)
                .with_context(|| format!("Failed to write PNG to {}", path.display()))?;
        }
        None => {
            let json = serde_json::to_string_pretty(&plan)
                .context("Failed to serialize render plan")?;
            let stdout = io::stdout();
            let mut handle = stdout.lock();
            writeln!(handle, "{}", json).context("Failed to write render plan to stdout")?;
        }
    }

    Ok(())
}

fn load_dataset(source: &str) -> Result<Dataset> {
    if source == "-" {
        return Dataset::from_csv_reader(io::stdin()).context("Failed to read CSV from stdin");
    }

    let path = Path::new(source);
    if path.extension().is_some_and(|ext| ext.eq_ignore_ascii_case("json")) {
        let text = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let value = serde_json::from_str(&text)
            .with_context(|| format!("{} is not valid JSON", path.display()))?;
        Dataset::from_json(&value)
    } else {
        let file = fs::File::open(path)
            .with_context(|| format!("Failed to open {}", path.display()))?;
        Dataset::from_csv_reader(file)
            .with_context(|| format!("Failed to parse {} as CSV", path.display()))
    }
}

fn load_descriptor(args: &Args) -> Result<Descriptor> {
    if let Some(path) = &args.descriptor {
        let text = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let descriptor = serde_json::from_str(&text)
            .with_context(|| format!("{} is not a valid descriptor", path.display()))?;
        Ok(descriptor)
    } else if let Some(path) = &args.analysis {
        let text = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let analysis = provider::parse_analysis(&text)?;
        if let Some(explanation) = &analysis.explanation {
            log::info!("analysis rationale: {}", explanation);
        }
        Ok(analysis.descriptor)
    } else {
        bail!("either --descriptor or --analysis is required");
    }
}

/// Percentage widths have no pixel meaning on a raster canvas; fall back to
/// a fixed 800px.
fn pixel_size(plan: &RenderPlan) -> (u32, u32) {
    let width = match plan.display.width {
        Dimension::Px(px) => px,
        Dimension::Percent(_) => 800,
    };
    (width, plan.display.height)
}
