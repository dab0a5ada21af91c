use deep_zoom::util::colouring::GradientPalette;
use deep_zoom::util::image::Image;
use deep_zoom::{FractalRenderer, Location, RenderOutcome};

use clap::{Arg, Command};
use config::{Config, File};
use std::error::Error;
use std::time::Instant;
use tracing::info;
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let matches = Command::new("deep_zoom")
        .version(env!("CARGO_PKG_VERSION"))
        .about(env!("CARGO_PKG_DESCRIPTION"))
        .arg(Arg::new("config")
            .short('c')
            .long("config")
            .value_name("FILE")
            .help("TOML file with the location and image settings")
            .takes_value(true))
        .arg(Arg::new("output")
            .short('o')
            .long("output")
            .value_name("PNG")
            .help("Where to write the rendered image")
            .default_value("output.png")
            .takes_value(true))
        .arg(Arg::new("width")
            .short('w')
            .long("width")
            .help("Image width in pixels")
            .takes_value(true))
        .arg(Arg::new("height")
            .long("height")
            .help("Image height in pixels")
            .takes_value(true))
        .arg(Arg::new("iterations")
            .short('i')
            .long("iterations")
            .help("Maximum iteration count")
            .takes_value(true))
        .arg(Arg::new("order")
            .long("order")
            .help("Number of series approximation terms")
            .takes_value(true))
        .arg(Arg::new("threads")
            .short('t')
            .long("threads")
            .help("Worker threads, 1 renders single threaded and 0 uses every core")
            .takes_value(true))
        .get_matches();

    let mut settings = Config::default();

    settings.set_default("real", "0")?;
    settings.set_default("imaginary", "0")?;
    settings.set_default("scale", "4e0")?;
    settings.set_default("iterations", 256i64)?;
    settings.set_default("image_width", 800i64)?;
    settings.set_default("image_height", 600i64)?;
    settings.set_default("approximation_order", 6i64)?;
    settings.set_default("threads", 0i64)?;

    if let Some(path) = matches.value_of("config") {
        settings.merge(File::with_name(path))?;
    }

    for (argument, key) in &[("width", "image_width"), ("height", "image_height"), ("iterations", "iterations"), ("order", "approximation_order"), ("threads", "threads")] {
        if let Some(value) = matches.value_of(*argument) {
            settings.set(*key, value.parse::<i64>()?)?;
        }
    }

    let location = Location::from_config(&settings)?;
    let image_width = settings.get_int("image_width")?.max(1) as usize;
    let image_height = settings.get_int("image_height")?.max(1) as usize;
    let approximation_order = settings.get_int("approximation_order")?.max(1).min(16) as usize;
    let threads = settings.get_int("threads")?.max(0) as usize;

    info!("{:<14}{}", "Scale", location.scale);
    info!("{:<14}{}", "Iterations", location.maximum_iteration);
    info!("{:<14}{}x{}", "Image", image_width, image_height);

    let image = Image::new(image_width, image_height);
    let palette = GradientPalette::default_palette()?;

    let mut renderer = FractalRenderer::with_threads(image_width, image_height, location, approximation_order, threads)?;

    if renderer.render(&image, &palette) == RenderOutcome::Cancelled {
        return Ok(());
    }

    let stats = renderer.stats();
    info!("{:<14}{:>6} (guessed {}, evaluated {})", "Pixels", stats.total, stats.guessed, stats.evaluated);

    let output = matches.value_of("output").unwrap_or("output.png");

    let time = Instant::now();
    image.save(output)?;
    info!("{:<14}{:>6} ms", "Saving", time.elapsed().as_millis());

    Ok(())
}
