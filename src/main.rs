use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use threadcards::distribute::{
    Distribution, DistributionCase, ImageCoverage, ImageDistributor, MidSequence, SlotImage,
};
use threadcards::imaging::{NumberedImageGenerator, RasterRenderer, RenderStyle};
use threadcards::loader::DefaultLoader;
use threadcards::logging::LogFormat;
use threadcards::{config, logging, output, references};
use tracing::info;

#[derive(Parser)]
#[command(name = "threadcards")]
#[command(about = "Per-post images for social media threads")]
#[command(long_about = "\
Per-post images for social media threads

Given the images of an article and the number of posts in its thread, picks
an image for every post and renders numbered cards where needed:

  post 1         first image, unmodified
  posts 2..N     numbered overlay on their own image, if there is one
                 (or the image as is, with mid_sequence = \"verbatim\")
  beyond images  numbered overlay on the first image
  no images      numbered flat tiles

Images are URLs, data: URIs or local file paths.

Run 'threadcards gen-config' to generate a documented threadcards.toml.")]
#[command(version)]
struct Cli {
    /// Config file (defaults are used when absent)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log line format, overriding the config file
    #[arg(long, value_enum, global = true)]
    log_format: Option<LogFormat>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Assign images to posts and write the rendered cards
    Distribute {
        /// Number of posts in the thread
        #[arg(long)]
        posts: usize,
        /// Output directory for rendered cards and manifest.json
        #[arg(long, default_value = "cards")]
        out: PathBuf,
        /// Treatment of posts 2..N that have their own image
        #[arg(long, value_enum)]
        mid_sequence: Option<MidSequence>,
        /// Source images, in article order
        images: Vec<String>,
    },
    /// Render a single numbered card
    Render {
        /// 0-based post index (the card shows index + 1)
        #[arg(long)]
        index: usize,
        /// Base image to overlay; a flat tile is rendered without one
        #[arg(long)]
        base: Option<String>,
        /// Output file
        #[arg(long)]
        out: PathBuf,
    },
    /// Show how images would be distributed, without rendering
    Stats {
        /// Number of posts in the thread
        #[arg(long)]
        posts: usize,
        /// Treatment of posts 2..N that have their own image
        #[arg(long, value_enum)]
        mid_sequence: Option<MidSequence>,
        /// Source images, in article order
        images: Vec<String>,
    },
    /// Keep content images from scraped references, ranked by relevance
    Filter {
        /// Article URL, for resolving relative references
        #[arg(long)]
        source_url: Option<String>,
        /// Scraped image references
        images: Vec<String>,
    },
    /// Print a stock threadcards.toml with all options documented
    GenConfig,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    if let Command::GenConfig = cli.command {
        print!("{}", config::stock_config_toml());
        return Ok(());
    }

    let mut config = config::load_config(cli.config.as_deref())?;
    if let Some(format) = cli.log_format {
        config.logging.format = format;
    }
    logging::init(&config.logging)?;

    match cli.command {
        Command::Distribute {
            posts,
            out,
            mid_sequence,
            images,
        } => {
            init_thread_pool(&config.processing);
            let policy = mid_sequence.unwrap_or(config.distribution.mid_sequence);
            let generator = build_generator(&config)?;
            let distribution = ImageDistributor::new(&generator, policy).distribute(&images, posts);
            let coverage = distribution.coverage();
            write_distribution(&distribution, &coverage, &out)?;
            output::print_distribution(
                &distribution,
                &coverage,
                DistributionCase::classify(images.len(), posts),
                policy,
            );
        }
        Command::Render { index, base, out } => {
            let generator = build_generator(&config)?;
            let image = generator.generate(index, base.as_deref())?;
            std::fs::write(&out, &image.bytes)?;
            println!(
                "{} → {} ({}x{})",
                threadcards::imaging::numeral_for(index),
                out.display(),
                image.width,
                image.height
            );
        }
        Command::Stats {
            posts,
            mid_sequence,
            images,
        } => {
            let policy = mid_sequence.unwrap_or(config.distribution.mid_sequence);
            output::print_stats(&images, posts, policy);
        }
        Command::Filter { source_url, images } => {
            let kept = references::extract_valid_images(&images, source_url.as_deref());
            output::print_filter(&kept);
        }
        Command::GenConfig => {}
    }

    Ok(())
}

fn build_generator(
    config: &config::Config,
) -> Result<NumberedImageGenerator<DefaultLoader, RasterRenderer>, Box<dyn std::error::Error>> {
    let loader = DefaultLoader::new(&config.loading)?;
    let style = RenderStyle::from_config(config)?;
    Ok(NumberedImageGenerator::new(
        loader,
        RasterRenderer::new(),
        style,
    ))
}

/// Write rendered cards plus a `manifest.json` with one entry per post.
fn write_distribution(
    distribution: &Distribution,
    coverage: &ImageCoverage,
    out: &Path,
) -> std::io::Result<()> {
    std::fs::create_dir_all(out)?;

    let mut entries = Vec::with_capacity(distribution.len());
    for (i, slot) in distribution.slots.iter().enumerate() {
        let entry = match slot {
            SlotImage::Source(reference) => serde_json::json!({
                "post": i + 1,
                "kind": "source",
                "reference": reference,
            }),
            SlotImage::Rendered(image) => {
                let file = output::post_file_name(i, image.format);
                std::fs::write(out.join(&file), &image.bytes)?;
                serde_json::json!({
                    "post": i + 1,
                    "kind": "rendered",
                    "file": file,
                    "width": image.width,
                    "height": image.height,
                })
            }
            SlotImage::Empty => serde_json::json!({
                "post": i + 1,
                "kind": "empty",
            }),
        };
        entries.push(entry);
    }

    let manifest = serde_json::json!({
        "posts": entries,
        "coverage": coverage,
    });
    let json = serde_json::to_string_pretty(&manifest)?;
    std::fs::write(out.join("manifest.json"), json)?;
    info!(dir = %out.display(), "wrote distribution");
    Ok(())
}

/// Initialize the rayon thread pool based on processing config.
///
/// Caps at the number of available CPU cores; the user can constrain down, not up.
fn init_thread_pool(processing: &config::ProcessingConfig) {
    let threads = config::effective_threads(processing);
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build_global()
        .ok();
}
