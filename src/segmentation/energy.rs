use super::context::RunContext;
use super::prior::{PriorField, PriorModel};
use super::types::Label;
use crate::solver::EnergyFunction;

/// Cost of a label disagreeing with a binary prior
const SIGNED_VOTE_MISMATCH: f32 = 3.0;
/// Boundary cost between pixels whose binary priors agree
const SIGNED_VOTE_SAME_CLASS: f32 = 3.0;
/// Boundary cost between pixels whose binary priors differ
const SIGNED_VOTE_OTHER_CLASS: f32 = 1.0;

/// Tunables of the kernel-density energy
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EnergyParams {
    /// Decay of the boundary cost with prior difference
    pub beta: f32,
    /// Scale of the boundary cost
    pub smoothness_weight: f32,
}

impl Default for EnergyParams {
    fn default() -> Self {
        Self {
            beta: 5.0,
            smoothness_weight: 1.0,
        }
    }
}

/// Data and smoothness costs of one run, read from its prior field.
///
/// Holds only shared borrows, so it is safe to evaluate from any thread.
#[derive(Debug, Clone, Copy)]
pub struct EnergyModel<'a> {
    ctx: RunContext<'a>,
    prior: &'a PriorField,
    params: EnergyParams,
}

impl<'a> EnergyModel<'a> {
    pub fn new(ctx: RunContext<'a>, prior: &'a PriorField, params: EnergyParams) -> Self {
        Self { ctx, prior, params }
    }

    /// Foreground probability of a pixel's color bucket
    pub fn pixel_prior(&self, pixel: usize) -> f32 {
        self.prior.probability_of(self.ctx.pixel(pixel))
    }
}

impl EnergyFunction for EnergyModel<'_> {
    /// Background costs the foreground probability, foreground its complement.
    fn data_cost(&self, pixel: usize, label: Label) -> f32 {
        let p = self.pixel_prior(pixel);
        match self.prior.model() {
            PriorModel::KernelDensity => match label {
                Label::Background => p,
                Label::Foreground => 1.0 - p,
            },
            PriorModel::SignedVote => {
                if p == label.index() as f32 {
                    0.0
                } else {
                    SIGNED_VOTE_MISMATCH
                }
            }
        }
    }

    fn smoothness_cost(&self, a: usize, b: usize, label_a: Label, label_b: Label) -> f32 {
        // Canonical argument order keeps cost(a, b, i, j) == cost(b, a, j, i).
        let (a, b, label_a, label_b) = if b < a {
            (b, a, label_b, label_a)
        } else {
            (a, b, label_a, label_b)
        };

        if label_a == label_b {
            return 0.0;
        }

        let pa = self.pixel_prior(a);
        let pb = self.pixel_prior(b);
        match self.prior.model() {
            PriorModel::KernelDensity => {
                self.params.smoothness_weight * (-self.params.beta * (pa - pb).abs()).exp()
            }
            PriorModel::SignedVote => {
                if pa == pb {
                    SIGNED_VOTE_SAME_CLASS
                } else {
                    SIGNED_VOTE_OTHER_CLASS
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::segmentation::histogram::StrokeHistogram;
    use crate::segmentation::quantize::ColorQuantizer;
    use approx::assert_relative_eq;
    use image::{ImageBuffer, Rgb, RgbImage};

    // Row of colors from pure red to pure green; first pixel marked
    // foreground, last pixel marked background.
    fn gradient_fixture() -> (RgbImage, RgbImage) {
        let image: RgbImage = ImageBuffer::from_fn(6, 1, |x, _| {
            let t = (x * 51) as u8;
            Rgb([255 - t, t, 0])
        });
        let mask: RgbImage = ImageBuffer::from_fn(6, 1, |x, _| match x {
            0 => Rgb([0, 0, 255]),
            5 => Rgb([255, 0, 0]),
            _ => Rgb([255, 255, 255]),
        });
        (image, mask)
    }

    fn prior_for(image: &RgbImage, mask: &RgbImage, model: PriorModel) -> PriorField {
        let quantizer = ColorQuantizer::default();
        let histogram = StrokeHistogram::build(&RunContext::new(image, quantizer), mask);
        PriorField::estimate(&histogram, quantizer, model).unwrap()
    }

    #[test]
    fn data_cost_favours_the_prior_class() {
        let (image, mask) = gradient_fixture();
        for model in [PriorModel::KernelDensity, PriorModel::SignedVote] {
            let prior = prior_for(&image, &mask, model);
            let energy = EnergyModel::new(
                RunContext::new(&image, ColorQuantizer::default()),
                &prior,
                EnergyParams::default(),
            );
            assert!(energy.data_cost(0, Label::Foreground) < energy.data_cost(0, Label::Background));
            assert!(energy.data_cost(5, Label::Background) < energy.data_cost(5, Label::Foreground));
        }
    }

    #[test]
    fn kernel_data_costs_are_complementary() {
        let (image, mask) = gradient_fixture();
        let prior = prior_for(&image, &mask, PriorModel::KernelDensity);
        let energy = EnergyModel::new(
            RunContext::new(&image, ColorQuantizer::default()),
            &prior,
            EnergyParams::default(),
        );
        for p in 0..6 {
            let sum = energy.data_cost(p, Label::Background) + energy.data_cost(p, Label::Foreground);
            assert_relative_eq!(sum, 1.0, epsilon = 1e-6);
            assert_relative_eq!(energy.data_cost(p, Label::Background), energy.pixel_prior(p));
        }
    }

    #[test]
    fn smoothness_is_symmetric_and_free_for_agreeing_labels() {
        let (image, mask) = gradient_fixture();
        for model in [PriorModel::KernelDensity, PriorModel::SignedVote] {
            let prior = prior_for(&image, &mask, model);
            let energy = EnergyModel::new(
                RunContext::new(&image, ColorQuantizer::default()),
                &prior,
                EnergyParams {
                    beta: 2.5,
                    smoothness_weight: 0.7,
                },
            );
            for a in 0..6 {
                for b in 0..6 {
                    for i in Label::ALL {
                        assert_eq!(energy.smoothness_cost(a, b, i, i), 0.0);
                        for j in Label::ALL {
                            assert_eq!(
                                energy.smoothness_cost(a, b, i, j),
                                energy.smoothness_cost(b, a, j, i)
                            );
                        }
                    }
                }
            }
        }
    }

    #[test]
    fn kernel_boundary_cost_decays_with_prior_difference() {
        let (image, mask) = gradient_fixture();
        let prior = prior_for(&image, &mask, PriorModel::KernelDensity);
        let params = EnergyParams::default();
        let energy = EnergyModel::new(
            RunContext::new(&image, ColorQuantizer::default()),
            &prior,
            params,
        );

        // Same color: full weight.
        let same = energy.smoothness_cost(0, 0, Label::Foreground, Label::Background);
        assert_relative_eq!(same, params.smoothness_weight);

        // Opposite ends of the gradient: priors near 1 and 0.
        let far = energy.smoothness_cost(0, 5, Label::Foreground, Label::Background);
        assert_relative_eq!(far, (-params.beta).exp(), epsilon = 1e-4);
        assert!(far < same);
    }

    #[test]
    fn signed_vote_boundary_costs() {
        let (image, mask) = gradient_fixture();
        let prior = prior_for(&image, &mask, PriorModel::SignedVote);
        let energy = EnergyModel::new(
            RunContext::new(&image, ColorQuantizer::default()),
            &prior,
            EnergyParams::default(),
        );
        assert_eq!(
            energy.smoothness_cost(0, 1, Label::Foreground, Label::Background),
            SIGNED_VOTE_SAME_CLASS
        );
        assert_eq!(
            energy.smoothness_cost(0, 5, Label::Foreground, Label::Background),
            SIGNED_VOTE_OTHER_CLASS
        );
        assert_eq!(energy.data_cost(0, Label::Foreground), 0.0);
        assert_eq!(energy.data_cost(0, Label::Background), SIGNED_VOTE_MISMATCH);
    }
}
