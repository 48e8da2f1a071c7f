//! Interactive foreground/background segmentation from sparse color strokes.
//!
//! Strokes painted over an image (bluish for foreground, reddish for
//! background) are turned into a smooth per-color foreground prior, which
//! drives a binary MRF solved on the pixel grid.

pub mod input;
pub mod output;
pub mod segmentation;
pub mod solver;

pub use segmentation::{
    segment, Label, PriorModel, Segmentation, SegmentationConfig, SegmentationError, Segmenter,
};
pub use solver::SolverKind;
