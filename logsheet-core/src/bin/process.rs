use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use logsheet_core::{
    LogsheetConfig, PageInput, Processor, Service, ServiceMap,
    analysis::open_image,
    layout::read_detections,
    visualise::{load_font, save_overlay},
};

#[derive(Parser)]
#[command(name = "process")]
#[command(about = "Reconcile the detections of an aligned logsheet page")]
struct Args {
    #[arg(help = "Aligned page image")]
    image: PathBuf,

    #[arg(short, long, help = "Logsheet config JSON")]
    config: PathBuf,

    #[arg(long, help = "Google detections JSON")]
    google: Option<PathBuf>,

    #[arg(long, help = "Amazon detections JSON")]
    amazon: Option<PathBuf>,

    #[arg(long, help = "Azure detections JSON")]
    azure: Option<PathBuf>,

    #[arg(short, long, help = "Write the report here instead of stdout")]
    output: Option<PathBuf>,

    #[arg(long, help = "Write a debug overlay of regions and detections")]
    debug: Option<PathBuf>,

    #[arg(long, help = "TrueType font for overlay labels (default: a system font)")]
    font: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let config = LogsheetConfig::from_path(&args.config)?;
    let image = open_image(&args.image)?;

    let mut detections = ServiceMap::new();
    for (service, path) in [
        (Service::Google, &args.google),
        (Service::Amazon, &args.amazon),
        (Service::Azure, &args.azure),
    ] {
        match path {
            Some(path) => {
                let found = read_detections(path)?;
                info!("Loaded {} detections for {}", found.len(), service);
                detections.insert(service, found);
            }
            None => warn!("No detections given for {}, it abstains", service),
        }
    }

    if let Some(path) = &args.debug {
        let font = load_font(args.font.as_deref())?;
        save_overlay(&image, &config.regions, &detections, font.as_ref(), path)?;
        info!("Debug overlay written to {}", path.display());
    }

    let processor = Processor::new(config);
    let report = processor.process_page(PageInput { image, detections });
    if let Some(ratio) = report.success_ratio {
        info!("Success ratio {:.2}", ratio);
    }

    let json = serde_json::to_string_pretty(&report)?;
    match &args.output {
        Some(path) => std::fs::write(path, json)
            .with_context(|| format!("writing {}", path.display()))?,
        None => println!("{json}"),
    }

    Ok(())
}
