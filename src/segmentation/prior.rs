use super::histogram::StrokeHistogram;
use super::quantize::{BucketCoords, ColorQuantizer};
use super::types::{Result, SegmentationError};
use image::Rgb;
use ndarray::{Array3, ArrayView3};

/// How stroke counts become a per-bucket foreground prior
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PriorModel {
    /// Kernel regression of the foreground fraction; values in `[0, 1]`.
    #[default]
    KernelDensity,
    /// Sign of the kernel-weighted `fg - bg` vote; values are `0` or `1`.
    SignedVote,
}

/// Dense foreground probability over the whole quantized color cube,
/// indexed `[b, g, r]`.
#[derive(Debug, Clone)]
pub struct PriorField {
    model: PriorModel,
    quantizer: ColorQuantizer,
    values: Array3<f32>,
}

impl PriorField {
    /// Smooth the histogram over every bucket of the cube.
    ///
    /// Fails with [`SegmentationError::EmptyAnnotation`] when no stroke was
    /// drawn, since every bucket would be a 0/0 average.
    pub fn estimate(
        histogram: &StrokeHistogram,
        quantizer: ColorQuantizer,
        model: PriorModel,
    ) -> Result<Self> {
        let _span = tracing::debug_span!("prior", ?model).entered();

        if histogram.is_empty() {
            return Err(SegmentationError::EmptyAnnotation);
        }

        let to_coords = |(bucket, value): (usize, f64)| (quantizer.from_index(bucket), value);
        let observations: Vec<(BucketCoords, f64)> = match model {
            PriorModel::KernelDensity => histogram.fractions().map(to_coords).collect(),
            PriorModel::SignedVote => histogram.votes().map(to_coords).collect(),
        };

        let smoothed = kernel_average(&observations, quantizer.resolution());
        let values = match model {
            PriorModel::KernelDensity => smoothed.mapv(|p| p.clamp(0.0, 1.0) as f32),
            PriorModel::SignedVote => smoothed.mapv(|v| if v >= 0.0 { 1.0 } else { 0.0 }),
        };

        tracing::debug!(
            "Estimated {}^3 prior from {} observed buckets",
            quantizer.resolution(),
            observations.len()
        );

        Ok(Self {
            model,
            quantizer,
            values,
        })
    }

    pub fn model(&self) -> PriorModel {
        self.model
    }

    pub fn quantizer(&self) -> &ColorQuantizer {
        &self.quantizer
    }

    /// Foreground probability of a bucket
    pub fn probability(&self, coords: BucketCoords) -> f32 {
        self.values[[coords.b, coords.g, coords.r]]
    }

    /// Foreground probability of a pixel color
    pub fn probability_of(&self, pixel: &Rgb<u8>) -> f32 {
        self.probability(self.quantizer.quantize(pixel))
    }

    pub fn values(&self) -> ArrayView3<'_, f32> {
        self.values.view()
    }
}

/// Gaussian-weighted mean of `observations` at every bucket of the cube,
/// with `sigma^2 = R^2 / 100` over squared bucket distance.
///
/// The kernel factorizes per axis, so weights come from a 1-D table. The
/// exponent never exceeds `3 * (R-1)^2 / sigma^2 < 300`, so no weight
/// underflows to zero and the denominator stays positive.
fn kernel_average(observations: &[(BucketCoords, f64)], resolution: usize) -> Array3<f64> {
    let sigma2 = (resolution * resolution) as f64 / 100.0;
    let kernel: Vec<f64> = (0..resolution)
        .map(|d| (-((d * d) as f64) / sigma2).exp())
        .collect();

    Array3::from_shape_fn((resolution, resolution, resolution), |(b, g, r)| {
        let mut weighted = 0.0;
        let mut total_weight = 0.0;
        for (coords, value) in observations {
            let weight = kernel[coords.b.abs_diff(b)]
                * kernel[coords.g.abs_diff(g)]
                * kernel[coords.r.abs_diff(r)];
            weighted += weight * value;
            total_weight += weight;
        }
        weighted / total_weight
    })
}
