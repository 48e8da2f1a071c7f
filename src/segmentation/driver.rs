use super::context::RunContext;
use super::energy::{EnergyModel, EnergyParams};
use super::histogram::StrokeHistogram;
use super::preprocess;
use super::prior::{PriorField, PriorModel};
use super::quantize::{ColorQuantizer, DEFAULT_RESOLUTION};
use super::types::{Label, Result, SegmentationError};
use crate::solver::{self, MrfSolver, SolverKind};
use image::{DynamicImage, GrayImage, RgbImage};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Fixed seed so solver-internal randomness is reproducible across runs
pub const DEFAULT_SEED: u64 = 1_124_285_485;

/// Settings for one segmentation run
#[derive(Debug, Clone, PartialEq)]
pub struct SegmentationConfig {
    /// Buckets per color axis
    pub resolution: usize,
    /// Outer optimisation rounds, each followed by an energy report
    pub rounds: usize,
    /// Solver passes per round
    pub passes_per_round: usize,
    pub seed: u64,
    pub prior: PriorModel,
    /// Kernel-density boundary decay
    pub beta: f32,
    /// Kernel-density boundary scale
    pub smoothness_weight: f32,
    pub solver: SolverKind,
}

impl Default for SegmentationConfig {
    fn default() -> Self {
        let energy = EnergyParams::default();
        Self {
            resolution: DEFAULT_RESOLUTION,
            rounds: 10,
            passes_per_round: 10,
            seed: DEFAULT_SEED,
            prior: PriorModel::default(),
            beta: energy.beta,
            smoothness_weight: energy.smoothness_weight,
            solver: SolverKind::default(),
        }
    }
}

impl SegmentationConfig {
    pub fn validate(&self) -> Result<()> {
        ColorQuantizer::new(self.resolution)?;
        if self.rounds == 0 || self.passes_per_round == 0 {
            return Err(SegmentationError::InvalidConfig(format!(
                "rounds and passes must be positive, got {} x {}",
                self.rounds, self.passes_per_round
            )));
        }
        for (name, value) in [("beta", self.beta), ("smoothness weight", self.smoothness_weight)] {
            if !value.is_finite() || value < 0.0 {
                return Err(SegmentationError::InvalidConfig(format!(
                    "{} must be finite and non-negative, got {}",
                    name, value
                )));
            }
        }
        Ok(())
    }

    fn energy_params(&self) -> EnergyParams {
        EnergyParams {
            beta: self.beta,
            smoothness_weight: self.smoothness_weight,
        }
    }
}

/// Progress of a run; `Done` and `Failed` are terminal
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverState {
    Idle,
    HistogramBuilt,
    PriorEstimated,
    SolverConstructed,
    Iterating,
    LabelsReady,
    Done,
    Failed,
}

/// Energy after one outer round
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RoundReport {
    /// 1-based round number
    pub round: usize,
    pub energy: f64,
    /// Solver time accumulated up to and including this round
    pub elapsed: Duration,
}

/// Result of a completed run
#[derive(Debug, Clone)]
pub struct Segmentation {
    /// Source colors where foreground, black elsewhere
    pub image: RgbImage,
    /// Row-major per-pixel labels
    pub labels: Vec<Label>,
    /// Energy of the solver's starting labelling
    pub initial_energy: f64,
    pub rounds: Vec<RoundReport>,
}

impl Segmentation {
    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn foreground_count(&self) -> usize {
        self.labels.iter().filter(|&&l| l == Label::Foreground).count()
    }

    /// Labels as a grayscale mask, 255 for foreground
    pub fn label_mask(&self) -> GrayImage {
        preprocess::labels_to_mask(&self.labels, self.width(), self.height())
    }

    /// Energy after the last round
    pub fn final_energy(&self) -> f64 {
        self.rounds.last().map_or(self.initial_energy, |r| r.energy)
    }
}

/// Stroke-guided foreground/background segmenter
#[derive(Debug, Clone, Default)]
pub struct Segmenter {
    config: SegmentationConfig,
    cancel: Option<Arc<AtomicBool>>,
}

impl Segmenter {
    pub fn new(config: SegmentationConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            cancel: None,
        })
    }

    /// Abort between rounds once `flag` is set
    pub fn with_cancel_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel = Some(flag);
        self
    }

    pub fn config(&self) -> &SegmentationConfig {
        &self.config
    }

    /// Segment `image` using the strokes painted in `mask`.
    ///
    /// The mask must have the image's dimensions; bluish pixels mark
    /// foreground, reddish pixels mark background.
    pub fn segment(&self, image: &DynamicImage, mask: &RgbImage) -> Result<Segmentation> {
        let _span = tracing::debug_span!("segment").entered();

        let mut run = Run::new(self);
        match run.execute(image, mask) {
            Ok(segmentation) => Ok(segmentation),
            Err(err) => {
                run.fail(&err);
                Err(err)
            }
        }
    }
}

/// Per-call state machine; owns nothing beyond the call
struct Run<'s> {
    segmenter: &'s Segmenter,
    state: DriverState,
}

impl<'s> Run<'s> {
    fn new(segmenter: &'s Segmenter) -> Self {
        Self {
            segmenter,
            state: DriverState::Idle,
        }
    }

    fn advance(&mut self, next: DriverState) {
        tracing::debug!(from = ?self.state, to = ?next, "segmentation state");
        self.state = next;
    }

    fn fail(&mut self, err: &SegmentationError) {
        match err {
            SegmentationError::Cancelled => tracing::warn!("Segmentation cancelled"),
            other => tracing::error!("Segmentation failed in {:?}: {}", self.state, other),
        }
        self.advance(DriverState::Failed);
    }

    fn cancelled(&self) -> bool {
        self.segmenter
            .cancel
            .as_ref()
            .is_some_and(|flag| flag.load(Ordering::Relaxed))
    }

    fn execute(&mut self, image: &DynamicImage, mask: &RgbImage) -> Result<Segmentation> {
        let segmenter = self.segmenter;
        let config = &segmenter.config;

        let image = preprocess::to_color_image(image)?;
        preprocess::check_mask(&image, mask)?;

        let quantizer = ColorQuantizer::new(config.resolution)?;
        let ctx = RunContext::new(&image, quantizer);
        let (width, height) = (ctx.width(), ctx.height());

        let histogram = StrokeHistogram::build(&ctx, mask);
        self.advance(DriverState::HistogramBuilt);

        let prior = PriorField::estimate(&histogram, quantizer, config.prior)?;
        drop(histogram);
        self.advance(DriverState::PriorEstimated);

        let energy = EnergyModel::new(ctx, &prior, config.energy_params());
        let mut solver = {
            let _span = tracing::debug_span!("solver_construct").entered();
            solver::create_solver(config.solver, width, height, &energy, config.seed)?
        };
        self.advance(DriverState::SolverConstructed);

        solver.initialize();
        let initial_energy = solver.total_energy();
        tracing::info!(
            "Energy at the start = {:.4} (smoothness {:.4}, data {:.4})",
            initial_energy,
            solver.smoothness_energy(),
            solver.data_energy()
        );

        self.advance(DriverState::Iterating);
        let rounds = self.iterate(solver.as_mut())?;

        let labels: Vec<Label> = (0..width * height).map(|p| solver.label(p)).collect();
        drop(solver);
        self.advance(DriverState::LabelsReady);

        let output = preprocess::composite(&image, &labels);
        self.advance(DriverState::Done);

        Ok(Segmentation {
            image: output,
            labels,
            initial_energy,
            rounds,
        })
    }

    /// Run the full round budget; energies are reported, never used to stop early.
    fn iterate(&self, solver: &mut (dyn MrfSolver + '_)) -> Result<Vec<RoundReport>> {
        let _span = tracing::debug_span!("optimize").entered();
        let config = &self.segmenter.config;

        let mut reports = Vec::with_capacity(config.rounds);
        let mut elapsed = Duration::ZERO;
        for round in 1..=config.rounds {
            if self.cancelled() {
                return Err(SegmentationError::Cancelled);
            }

            elapsed += solver.optimize(config.passes_per_round);
            let energy = solver.total_energy();
            tracing::info!(
                "Round {}: energy = {:.4} ({:.3} secs)",
                round,
                energy,
                elapsed.as_secs_f64()
            );
            reports.push(RoundReport {
                round,
                energy,
                elapsed,
            });
        }
        Ok(reports)
    }
}
