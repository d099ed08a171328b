use std::path::PathBuf;

use clap::{Parser, Subcommand};

use patchpaint::blur::ImageprocBlur;
use patchpaint::config::{parse_config_json, DistanceMetric, InpaintConfig, RefinerKind};
use patchpaint::debug_sink::{DebugSink, FileDebugSink, NullDebugSink};
use patchpaint::driver::Inpainter;
use patchpaint::im::{ColorIm, MaskIm};

#[derive(Parser)]
#[command(name = "patchpaint", version, about = "Exemplar-based image inpainting")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Fill the masked region of an image by exemplar-based patch copy.
    Inpaint {
        /// Input image to inpaint.
        #[arg(long)]
        image: PathBuf,
        /// Mask image: white pixels mark the region to fill.
        #[arg(long)]
        mask: PathBuf,
        /// Patch half-width; ignored if --config sets it.
        #[arg(long, default_value_t = 5)]
        radius: usize,
        /// Number of KNN candidates retained per target.
        #[arg(long, default_value_t = 200)]
        k: usize,
        #[arg(long, value_enum, default_value = "ssd")]
        distance: DistanceArg,
        #[arg(long, value_enum, default_value = "identity")]
        refiner: RefinerArg,
        /// Fraction used by `--refiner reuse-limited`.
        #[arg(long, default_value_t = 0.5)]
        reuse_frac: f32,
        /// JSON config file overriding the flags above where present.
        #[arg(long)]
        config: Option<PathBuf>,
        /// Write result image + final mask here.
        #[arg(long)]
        out: PathBuf,
        /// Write a per-iteration image/mask pair into this directory.
        #[arg(long)]
        debug_dir: Option<PathBuf>,
    },
}

#[derive(Clone, Copy, clap::ValueEnum)]
enum DistanceArg {
    Ssd,
    Sad,
}

impl From<DistanceArg> for DistanceMetric {
    fn from(v: DistanceArg) -> Self {
        match v {
            DistanceArg::Ssd => DistanceMetric::Ssd,
            DistanceArg::Sad => DistanceMetric::Sad,
        }
    }
}

#[derive(Clone, Copy, clap::ValueEnum)]
enum RefinerArg {
    Identity,
    IntroducedEnergy,
    ReuseLimited,
}

/// White pixels (luma above the midpoint) mark the hole to fill.
fn threshold_raw_mask(raw: patchpaint::im::Lum8Im) -> MaskIm {
    let mut out = MaskIm::new(raw.w, raw.h);
    for y in 0..raw.h {
        for x in 0..raw.w {
            let v = unsafe { *raw.get_unchecked(x, y, 0) };
            let is_hole = v > 128;
            unsafe {
                *out.get_unchecked_mut(x, y, 0) = if is_hole {
                    patchpaint::mask::HOLE
                } else {
                    patchpaint::mask::VALID
                };
            }
        }
    }
    out
}

fn build_config(
    radius: usize,
    k: usize,
    distance: DistanceArg,
    refiner: RefinerArg,
    reuse_frac: f32,
    config_path: &Option<PathBuf>,
) -> anyhow::Result<InpaintConfig> {
    if let Some(path) = config_path {
        let text = std::fs::read_to_string(path)?;
        return Ok(parse_config_json(&text)?);
    }

    let refiner = match refiner {
        RefinerArg::Identity => RefinerKind::Identity,
        RefinerArg::IntroducedEnergy => RefinerKind::IntroducedEnergy,
        RefinerArg::ReuseLimited => RefinerKind::ReuseLimited { frac: reuse_frac },
    };
    let config = InpaintConfig {
        r: radius,
        k,
        distance: distance.into(),
        refiner,
        ..InpaintConfig::default()
    };
    config.validate()?;
    Ok(config)
}

fn run_inpaint(
    image: PathBuf,
    mask: PathBuf,
    radius: usize,
    k: usize,
    distance: DistanceArg,
    refiner: RefinerArg,
    reuse_frac: f32,
    config: Option<PathBuf>,
    out: PathBuf,
    debug_dir: Option<PathBuf>,
) -> anyhow::Result<()> {
    let config = build_config(radius, k, distance, refiner, reuse_frac, &config)?;

    let rgba = patchpaint::im::RGBAIm::load_png(&image)?;
    let raw_mask = patchpaint::im::Lum8Im::load_png(&mask)?;
    let color: ColorIm = rgba.to_color_im();
    let binary_mask = threshold_raw_mask(raw_mask);

    let blur = ImageprocBlur;
    let mut inpainter = Inpainter::new(color, binary_mask, config, &blur)?;

    let mut sink: Box<dyn DebugSink> = match debug_dir {
        Some(dir) => {
            std::fs::create_dir_all(&dir)?;
            Box::new(FileDebugSink::new(dir))
        }
        None => Box::new(NullDebugSink),
    };
    sink.on_iteration(0, inpainter.image(), inpainter.mask());

    let never_cancel = || false;
    inpainter.run_to_completion(&never_cancel)?;
    sink.on_iteration(inpainter.iteration(), inpainter.image(), inpainter.mask());

    inpainter.image().to_rgba_im().save_png(&out)?;
    let mask_out = out.with_file_name(format!(
        "{}-mask.png",
        out.file_stem().and_then(|s| s.to_str()).unwrap_or("result")
    ));
    inpainter.mask().im.save_png(&mask_out)?;

    log::info!(
        "inpainting finished after {} iterations; wrote {} and {}",
        inpainter.iteration(),
        out.display(),
        mask_out.display()
    );
    Ok(())
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Command::Inpaint {
            image,
            mask,
            radius,
            k,
            distance,
            refiner,
            reuse_frac,
            config,
            out,
            debug_dir,
        } => run_inpaint(image, mask, radius, k, distance, refiner, reuse_frac, config, out, debug_dir),
    }
}
