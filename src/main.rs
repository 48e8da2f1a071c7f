use anyhow::{bail, Context, Result};
use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use std::time::Instant;
use strokecut::input::{self, MaskFile, MaskSource, Stroke, StrokeCanvas, DEFAULT_LINE_WIDTH};
use strokecut::output::{ImageFileOutput, LabelMaskOutput, OutputSink};
use strokecut::segmentation::DEFAULT_SEED;
use strokecut::{PriorModel, SegmentationConfig, Segmenter, SolverKind};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Image to segment
    #[arg(short, long)]
    image: PathBuf,

    /// Pre-painted stroke mask (white background, blue foreground, red background)
    #[arg(short, long, conflicts_with_all = ["fg", "bg"])]
    mask: Option<PathBuf>,

    /// Foreground stroke as "x,y x,y ..." (repeatable)
    #[arg(long)]
    fg: Vec<Stroke>,

    /// Background stroke as "x,y x,y ..." (repeatable)
    #[arg(long)]
    bg: Vec<Stroke>,

    /// Pen width for --fg/--bg strokes
    #[arg(long, default_value_t = DEFAULT_LINE_WIDTH)]
    line_width: f32,

    /// Where to write the segmented image
    #[arg(short, long, default_value = "result.png")]
    output: PathBuf,

    /// Also write the labelling as a black/white mask
    #[arg(long)]
    labels: Option<PathBuf>,

    /// Color buckets per axis
    #[arg(long, default_value_t = 25)]
    resolution: usize,

    /// Optimisation rounds
    #[arg(long, default_value_t = 10)]
    rounds: usize,

    /// Solver passes per round
    #[arg(long, default_value_t = 10)]
    passes: usize,

    /// Seed for solver-internal randomness
    #[arg(long, default_value_t = DEFAULT_SEED)]
    seed: u64,

    /// How stroke colors become a foreground prior
    #[arg(long, value_enum, default_value_t = PriorArg::Kernel)]
    prior: PriorArg,

    /// Optimisation backend
    #[arg(long, value_enum, default_value_t = SolverArg::Bp)]
    solver: SolverArg,

    /// Decay of the boundary cost with prior difference (kernel prior)
    #[arg(long, default_value_t = 5.0)]
    beta: f32,

    /// Scale of the boundary cost (kernel prior)
    #[arg(long, default_value_t = 1.0)]
    smoothness_weight: f32,

    /// Enable debug logging
    #[arg(long)]
    debug: bool,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum PriorArg {
    /// Kernel regression of stroke foreground fractions
    Kernel,
    /// Sign of the kernel-weighted stroke vote
    Vote,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum SolverArg {
    /// Sequential belief propagation
    Bp,
    /// Iterated conditional modes
    Icm,
}

impl Args {
    fn config(&self) -> SegmentationConfig {
        SegmentationConfig {
            resolution: self.resolution,
            rounds: self.rounds,
            passes_per_round: self.passes,
            seed: self.seed,
            prior: match self.prior {
                PriorArg::Kernel => PriorModel::KernelDensity,
                PriorArg::Vote => PriorModel::SignedVote,
            },
            beta: self.beta,
            smoothness_weight: self.smoothness_weight,
            solver: match self.solver {
                SolverArg::Bp => SolverKind::BeliefPropagation,
                SolverArg::Icm => SolverKind::Icm,
            },
        }
    }

    fn mask_source(&self) -> Result<Box<dyn MaskSource>> {
        if let Some(path) = &self.mask {
            return Ok(Box::new(MaskFile::new(path)));
        }
        if self.fg.is_empty() && self.bg.is_empty() {
            bail!("Provide a stroke mask with --mask or draw strokes with --fg/--bg");
        }

        let mut canvas = StrokeCanvas::new(self.line_width);
        for stroke in &self.fg {
            canvas.add_foreground(stroke.clone());
        }
        for stroke in &self.bg {
            canvas.add_background(stroke.clone());
        }
        Ok(Box::new(canvas))
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let log_level = if args.debug {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };

    tracing_subscriber::fmt()
        .with_max_level(log_level)
        .with_target(false)
        .init();

    let config = args.config();
    tracing::info!("strokecut starting");
    tracing::info!("Color resolution: {}^3", config.resolution);
    tracing::info!(
        "Budget: {} rounds x {} passes ({:?}, {:?})",
        config.rounds,
        config.passes_per_round,
        config.solver,
        config.prior
    );

    let segmenter = Segmenter::new(config).context("Invalid segmentation settings")?;

    let image = input::load_image(&args.image)?;
    let mask = args
        .mask_source()?
        .render_mask(image.width(), image.height())
        .context("Failed to prepare stroke mask")?;

    let start = Instant::now();
    let segmentation = segmenter
        .segment(&image, &mask)
        .context("Segmentation failed")?;
    tracing::info!(
        "Segmented {}x{} image in {:.1}ms: {} foreground pixels, final energy {:.4}",
        segmentation.width(),
        segmentation.height(),
        start.elapsed().as_secs_f64() * 1000.0,
        segmentation.foreground_count(),
        segmentation.final_energy()
    );

    let mut sinks: Vec<Box<dyn OutputSink>> = vec![Box::new(ImageFileOutput::new(&args.output))];
    if let Some(path) = &args.labels {
        sinks.push(Box::new(LabelMaskOutput::new(path)));
    }
    for sink in &mut sinks {
        sink.write(&segmentation)?;
    }

    Ok(())
}
