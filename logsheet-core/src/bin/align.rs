use std::path::PathBuf;

use anyhow::{Context, ensure};
use clap::Parser;
use glam::Vec2;
use tracing::info;
use tracing_subscriber::EnvFilter;

use logsheet_core::{
    align::{AlignConfigBuilder, align, align_with_points},
    analysis::open_image,
};

#[derive(Parser)]
#[command(name = "align")]
#[command(about = "Warp a scanned logsheet onto its template")]
struct Args {
    #[arg(help = "Scanned page image")]
    scanned: PathBuf,

    #[arg(help = "Template page image")]
    template: PathBuf,

    #[arg(short, long, default_value = "aligned.png", help = "Output image path")]
    output: PathBuf,

    #[arg(
        long,
        value_delimiter = ',',
        help = "Hand-picked scan corners x0,y0,...,x3,y3 (TL, TR, BR, BL); skips detection"
    )]
    points: Option<Vec<f32>>,

    #[arg(long, help = "Skip binarisation before edge detection")]
    no_binarize: bool,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args = Args::parse();

    let scanned = open_image(&args.scanned)?;
    let template = open_image(&args.template)?;

    let aligned = match args.points {
        Some(points) => {
            ensure!(points.len() == 8, "--points takes 8 numbers, got {}", points.len());
            let scanned_points = [0, 1, 2, 3].map(|i| Vec2::new(points[2 * i], points[2 * i + 1]));
            let (width, height) = (template.width() as f32, template.height() as f32);
            let template_points = [
                Vec2::new(0.0, 0.0),
                Vec2::new(width, 0.0),
                Vec2::new(width, height),
                Vec2::new(0.0, height),
            ];
            info!("Aligning with hand-picked corners");
            align_with_points(
                &scanned,
                &scanned_points,
                &template_points,
                (template.width(), template.height()),
            )?
        }
        None => {
            let config = AlignConfigBuilder::default()
                .binarize(!args.no_binarize)
                .build()?;
            align(&scanned, &template, &config)?
        }
    };

    aligned
        .save(&args.output)
        .with_context(|| format!("writing {}", args.output.display()))?;
    info!("Aligned page written to {}", args.output.display());

    Ok(())
}
