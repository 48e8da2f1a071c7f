use crate::solver::SolverError;
use thiserror::Error;

/// Per-pixel assignment produced by the solver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Label {
    Background = 0,
    Foreground = 1,
}

impl Label {
    /// Both labels, in solver index order.
    pub const ALL: [Label; 2] = [Label::Background, Label::Foreground];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn from_index(index: usize) -> Option<Self> {
        match index {
            0 => Some(Label::Background),
            1 => Some(Label::Foreground),
            _ => None,
        }
    }
}

/// Errors reported by a segmentation run
#[derive(Debug, Error)]
pub enum SegmentationError {
    /// The mask carried neither foreground nor background strokes
    #[error("no foreground or background strokes were drawn")]
    EmptyAnnotation,

    /// The source image is not grayscale, color or color+alpha
    #[error("unsupported channel layout: {channels} channels (expected 1, 3 or 4)")]
    UnsupportedChannelLayout { channels: u8 },

    /// The stroke mask does not cover the image pixel for pixel
    #[error("mask is {mask_width}x{mask_height} but image is {width}x{height}")]
    DimensionMismatch {
        width: u32,
        height: u32,
        mask_width: u32,
        mask_height: u32,
    },

    /// The solver could not obtain its working memory
    #[error("not enough memory for the solver")]
    SolverAllocation(#[from] SolverError),

    /// The run was cancelled between optimisation rounds
    #[error("segmentation cancelled")]
    Cancelled,

    #[error("invalid segmentation configuration: {0}")]
    InvalidConfig(String),
}

pub type Result<T> = std::result::Result<T, SegmentationError>;
