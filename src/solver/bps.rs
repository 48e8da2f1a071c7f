use super::{try_filled, EnergyFunction, Grid, MrfSolver, SolverError};
use crate::segmentation::Label;
use std::time::{Duration, Instant};

// Slot of an incoming message, named after the neighbour that sent it.
const FROM_LEFT: usize = 0;
const FROM_RIGHT: usize = 1;
const FROM_ABOVE: usize = 2;
const FROM_BELOW: usize = 3;

type Costs = [f32; 2];

/// Sequential min-sum loopy belief propagation.
///
/// Each pass sweeps messages along every row (left to right, then back) and
/// then along every column (top to bottom, then back), updating in place so
/// later messages in a sweep already see earlier ones.
pub struct BeliefPropagation<'e, E> {
    energy: &'e E,
    grid: Grid,
    /// Cached data costs per pixel
    data: Vec<Costs>,
    /// Incoming messages, four slots per pixel
    messages: Vec<Costs>,
    labels: Vec<Label>,
}

impl<'e, E: EnergyFunction> BeliefPropagation<'e, E> {
    pub fn new(width: usize, height: usize, energy: &'e E) -> Result<Self, SolverError> {
        let grid = Grid::new(width, height)?;
        let n = grid.len();

        let mut data = try_filled(n, [0.0; 2], "data costs")?;
        for (p, costs) in data.iter_mut().enumerate() {
            for label in Label::ALL {
                costs[label.index()] = energy.data_cost(p, label);
            }
        }
        let messages = try_filled(n * 4, [0.0; 2], "messages")?;
        let labels = try_filled(n, Label::Background, "labels")?;

        tracing::debug!("Belief propagation allocated for {}x{} grid", width, height);

        Ok(Self {
            energy,
            grid,
            data,
            messages,
            labels,
        })
    }

    /// Send the message from `p` to `q`, stored in `q`'s `slot`.
    ///
    /// `skip` is the slot of `p` holding what `q` last sent back.
    fn send(&mut self, p: usize, q: usize, slot: usize, skip: usize) {
        let mut h = self.data[p];
        for dir in [FROM_LEFT, FROM_RIGHT, FROM_ABOVE, FROM_BELOW] {
            if dir == skip {
                continue;
            }
            let incoming = self.messages[p * 4 + dir];
            h[0] += incoming[0];
            h[1] += incoming[1];
        }

        let mut message = [f32::INFINITY; 2];
        for lq in Label::ALL {
            for lp in Label::ALL {
                let cost = h[lp.index()] + self.energy.smoothness_cost(p, q, lp, lq);
                if cost < message[lq.index()] {
                    message[lq.index()] = cost;
                }
            }
        }

        let floor = message[0].min(message[1]);
        self.messages[q * 4 + slot] = [message[0] - floor, message[1] - floor];
    }

    fn sweep(&mut self) {
        let Grid { width, height } = self.grid;

        for y in 0..height {
            let row = y * width;
            for x in 0..width.saturating_sub(1) {
                self.send(row + x, row + x + 1, FROM_LEFT, FROM_RIGHT);
            }
            for x in (1..width).rev() {
                self.send(row + x, row + x - 1, FROM_RIGHT, FROM_LEFT);
            }
        }

        for x in 0..width {
            for y in 0..height.saturating_sub(1) {
                let p = y * width + x;
                self.send(p, p + width, FROM_ABOVE, FROM_BELOW);
            }
            for y in (1..height).rev() {
                let p = y * width + x;
                self.send(p, p - width, FROM_BELOW, FROM_ABOVE);
            }
        }
    }

    /// Label each pixel with its belief minimum, ties going to background.
    fn update_labels(&mut self) {
        for (p, label) in self.labels.iter_mut().enumerate() {
            let mut belief = self.data[p];
            for incoming in &self.messages[p * 4..p * 4 + 4] {
                belief[0] += incoming[0];
                belief[1] += incoming[1];
            }
            *label = if belief[1] < belief[0] {
                Label::Foreground
            } else {
                Label::Background
            };
        }
    }
}

impl<E: EnergyFunction> MrfSolver for BeliefPropagation<'_, E> {
    fn initialize(&mut self) {
        self.messages.fill([0.0; 2]);
        self.labels.fill(Label::Background);
    }

    fn optimize(&mut self, passes: usize) -> Duration {
        let start = Instant::now();
        for _ in 0..passes {
            self.sweep();
        }
        self.update_labels();
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
