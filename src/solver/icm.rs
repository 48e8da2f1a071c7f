use super::{try_filled, EnergyFunction, Grid, MrfSolver, SolverError};
use crate::segmentation::Label;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use std::time::{Duration, Instant};

/// Iterated conditional modes.
///
/// Starts from the per-pixel data minimum and greedily relabels one pixel at
/// a time given its neighbours. The visiting order is reshuffled every pass
/// from a seeded generator, so equal seeds give equal labellings.
pub struct Icm<'e, E> {
    energy: &'e E,
    grid: Grid,
    seed: u64,
    rng: StdRng,
    order: Vec<usize>,
    labels: Vec<Label>,
}

impl<'e, E: EnergyFunction> Icm<'e, E> {
    pub fn new(width: usize, height: usize, energy: &'e E, seed: u64) -> Result<Self, SolverError> {
        let grid = Grid::new(width, height)?;
        let n = grid.len();

        let order = try_filled(n, 0usize, "visiting order")?;
        let labels = try_filled(n, Label::Background, "labels")?;

        tracing::debug!("ICM allocated for {}x{} grid, seed {}", width, height, seed);

        Ok(Self {
            energy,
            grid,
            seed,
            rng: StdRng::seed_from_u64(seed),
            order,
            labels,
        })
    }

    fn local_cost(&self, p: usize, label: Label) -> f32 {
        let mut cost = self.energy.data_cost(p, label);
        for q in self.grid.neighbours(p) {
            cost += self.energy.smoothness_cost(p, q, label, self.labels[q]);
        }
        cost
    }
}

impl<E: EnergyFunction> MrfSolver for Icm<'_, E> {
    fn initialize(&mut self) {
        self.rng = StdRng::seed_from_u64(self.seed);
        for (p, slot) in self.order.iter_mut().enumerate() {
            *slot = p;
        }
        for (p, label) in self.labels.iter_mut().enumerate() {
            let background = self.energy.data_cost(p, Label::Background);
            let foreground = self.energy.data_cost(p, Label::Foreground);
            *label = if foreground < background {
                Label::Foreground
            } else {
                Label::Background
            };
        }
    }

    fn optimize(&mut self, passes: usize) -> Duration {
        let start = Instant::now();
        for _ in 0..passes {
            let mut order = std::mem::take(&mut self.order);
            order.shuffle(&mut self.rng);

            let mut changed = 0usize;
            for &p in &order {
                let current = self.labels[p];
                let mut best = current;
                let mut best_cost = self.local_cost(p, current);
                for label in Label::ALL {
                    let cost = self.local_cost(p, label);
                    if cost < best_cost {
                        best = label;
                        best_cost = cost;
                    }
                }
                if best != current {
                    self.labels[p] = best;
                    changed += 1;
                }
            }

            self.order = order;
            tracing::trace!("ICM pass relabelled {} pixels", changed);
        }
        start.elapsed()
    }

    fn label(&self, pixel: usize) -> Label {
        self.labels[pixel]
    }

    fn data_energy(&self) -> f64 {
        super::data_energy(self.energy, &self.labels)
    }

    fn smoothness_energy(&self) -> f64 {
        super::smoothness_energy(self.energy, &self.grid, &self.labels)
    }
}
