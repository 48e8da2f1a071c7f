mod bps;
mod icm;

pub use bps::BeliefPropagation;
pub use icm::Icm;

use crate::segmentation::Label;
use std::time::Duration;
use thiserror::Error;

/// Cost oracle a solver evaluates.
///
/// Pixels are addressed by row-major index. Implementations must be pure so
/// a solver may evaluate them from several threads.
pub trait EnergyFunction: Sync {
    /// Cost of giving `pixel` the label `label`
    fn data_cost(&self, pixel: usize, label: Label) -> f32;

    /// Cost of labelling neighbours `a` and `b` with `label_a` and `label_b`.
    ///
    /// Must satisfy `smoothness_cost(a, b, i, j) == smoothness_cost(b, a, j, i)`.
    fn smoothness_cost(&self, a: usize, b: usize, label_a: Label, label_b: Label) -> f32;
}

/// Binary MRF solver over a 4-connected pixel grid
///
/// Allows swapping between optimisation backends. Dropping the solver
/// releases all of its working memory.
pub trait MrfSolver {
    /// Reset messages and the current labelling to the starting state
    fn initialize(&mut self);

    /// Run `passes` optimisation passes and return the time they took
    fn optimize(&mut self, passes: usize) -> Duration;

    /// Label currently assigned to `pixel`
    fn label(&self, pixel: usize) -> Label;

    fn data_energy(&self) -> f64;

    fn smoothness_energy(&self) -> f64;

    fn total_energy(&self) -> f64 {
        self.data_energy() + self.smoothness_energy()
    }
}

/// Available optimisation backends
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SolverKind {
    /// Sequential min-sum loopy belief propagation
    #[default]
    BeliefPropagation,
    /// Iterated conditional modes with a seeded visiting order
    Icm,
}

#[derive(Debug, Error)]
pub enum SolverError {
    #[error("failed to allocate {bytes} bytes for {what}")]
    Allocation { what: &'static str, bytes: usize },

    #[error("grid of {width}x{height} pixels is too large to address")]
    GridTooLarge { width: usize, height: usize },
}

/// Create a solver for a `width x height` grid with two labels
pub fn create_solver<'e, E: EnergyFunction>(
    kind: SolverKind,
    width: usize,
    height: usize,
    energy: &'e E,
    seed: u64,
) -> Result<Box<dyn MrfSolver + 'e>, SolverError> {
    let solver: Box<dyn MrfSolver + 'e> = match kind {
        SolverKind::BeliefPropagation => Box::new(BeliefPropagation::new(width, height, energy)?),
        SolverKind::Icm => Box::new(Icm::new(width, height, energy, seed)?),
    };
    Ok(solver)
}

/// Row-major pixel grid and its neighbourhood helpers
#[derive(Debug, Clone, Copy)]
pub(crate) struct Grid {
    pub width: usize,
    pub height: usize,
}

impl Grid {
    pub fn new(width: usize, height: usize) -> Result<Self, SolverError> {
        // Message buffers hold 4 entries per pixel, keep that addressable too.
        width
            .checked_mul(height)
            .and_then(|n| n.checked_mul(4))
            .ok_or(SolverError::GridTooLarge { width, height })?;
        Ok(Self { width, height })
    }

    pub fn len(&self) -> usize {
        self.width * self.height
    }

    /// Right and down neighbours, each undirected edge once
    pub fn edges(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        (0..self.len()).flat_map(move |p| {
            let x = p % self.width;
            let y = p / self.width;
            let right = (x + 1 < self.width).then_some((p, p + 1));
            let down = (y + 1 < self.height).then_some((p, p + self.width));
            right.into_iter().chain(down)
        })
    }

    /// Up to four 4-connected neighbours of `p`
    pub fn neighbours(&self, p: usize) -> impl Iterator<Item = usize> {
        let (w, h) = (self.width, self.height);
        let x = p % w;
        let y = p / w;
        [
            (x > 0).then(|| p - 1),
            (x + 1 < w).then(|| p + 1),
            (y > 0).then(|| p - w),
            (y + 1 < h).then(|| p + w),
        ]
        .into_iter()
        .flatten()
    }
}

/// Allocate `len` copies of `value` without aborting on exhaustion
pub(crate) fn try_filled<T: Clone>(
    len: usize,
    value: T,
    what: &'static str,
) -> Result<Vec<T>, SolverError> {
    let bytes = len.saturating_mul(std::mem::size_of::<T>());
    let mut buffer = Vec::new();
    buffer
        .try_reserve_exact(len)
        .map_err(|_| SolverError::Allocation { what, bytes })?;
    buffer.resize(len, value);
    Ok(buffer)
}

/// Sum of data costs for the given labelling
pub(crate) fn data_energy<E: EnergyFunction>(energy: &E, labels: &[Label]) -> f64 {
    labels
        .iter()
        .enumerate()
        .map(|(p, &label)| energy.data_cost(p, label) as f64)
        .sum()
}

/// Sum of smoothness costs over every grid edge for the given labelling
pub(crate) fn smoothness_energy<E: EnergyFunction>(
    energy: &E,
    grid: &Grid,
    labels: &[Label],
) -> f64 {
    grid.edges()
        .map(|(a, b)| energy.smoothness_cost(a, b, labels[a], labels[b]) as f64)
        .sum()
}


#[cfg(test)]
mod tests {
    use super::test_support::PottsEnergy;
    use super::*;

    #[test]
    fn grid_enumerates_each_edge_once() {
        let grid = Grid::new(3, 2).unwrap();
        let edges: Vec<_> = grid.edges().collect();
        // 2 horizontal per row * 2 rows + 3 vertical
        assert_eq!(edges.len(), 7);
        assert!(edges.contains(&(0, 1)));
        assert!(edges.contains(&(2, 5)));
        assert!(!edges.contains(&(2, 3)));
    }

    #[test]
    fn grid_neighbours_respect_borders() {
        let grid = Grid::new(3, 3).unwrap();
        let corner: Vec<_> = grid.neighbours(0).collect();
        assert_eq!(corner, vec![1, 3]);
        let centre: Vec<_> = grid.neighbours(4).collect();
        assert_eq!(centre, vec![3, 5, 1, 7]);
    }

    #[test]
    fn oversized_grid_is_reported_not_aborted() {
        let energy = PottsEnergy {
            preferred: Vec::new(),
            mismatch: 1.0,
            penalty: 1.0,
        };
        for kind in [SolverKind::BeliefPropagation, SolverKind::Icm] {
            let err = create_solver(kind, usize::MAX / 2, 3, &energy, 7)
                .err()
                .expect("grid must not fit");
            assert!(matches!(err, SolverError::GridTooLarge { .. }));
        }
    }

    #[test]
    fn impossible_allocation_is_reported() {
        let err = try_filled(usize::MAX / 8, 0u64, "test buffer").unwrap_err();
        assert!(matches!(
            err,
            SolverError::Allocation {
                what: "test buffer",
                ..
            }
        ));
    }

    #[test]
    fn energies_sum_data_and_edges() {
        let energy = PottsEnergy {
            preferred: vec![Label::Foreground, Label::Background, Label::Background],
            mismatch: 2.0,
            penalty: 0.5,
        };
        let grid = Grid::new(3, 1).unwrap();
        let labels = [Label::Foreground, Label::Foreground, Label::Background];
        assert_eq!(data_energy(&energy, &labels), 2.0);
        assert_eq!(smoothness_energy(&energy, &grid, &labels), 0.5);
    }
}
