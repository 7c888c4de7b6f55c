use std::time::Instant;

use colored::Colorize;
use ndarray::Array2;
use rand::{rngs::StdRng, Rng, SeedableRng};
use thiserror::Error;

use crate::{
    autodiff::{Graph, GraphError, NodeId, ParamId, ParameterSet, Pass},
    constants::training,
    types::{Prediction, SymbolWindow},
};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ModelError {
    #[error("no price windows to train on")]
    Empty,
    #[error("window {index} has {found} prices, expected {expected}")]
    WindowMismatch {
        index: usize,
        expected: usize,
        found: usize,
    },
    #[error(transparent)]
    Graph(#[from] GraphError),
}

#[derive(Debug, Clone, PartialEq)]
pub struct TrainingConfig {
    pub iterations: usize,
    pub alpha: f32,
    pub eta: f32,
    pub loss_threshold: f32,
    pub seed: u64,
    /// Folder the loss series is written to with `debug_training`, nothing is written when unset
    pub record_dir: Option<String>,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            iterations: training::ITERATIONS,
            alpha: training::ALPHA,
            eta: training::ETA,
            loss_threshold: training::LOSS_THRESHOLD,
            seed: training::SEED,
            record_dir: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Step {
    pub loss: f32,
    pub norm: f32,
    pub clipped: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TrainingReport {
    /// Loss of every completed iteration
    pub losses: Vec<f32>,
    pub converged: bool,
}

/// Linear autoencoder over price windows.
///
/// Each column of `values` is a window followed by a copy of its close, `w1` is lower
/// triangular so row `i` of the reconstruction only sees rows `0..=i` of the input.
/// Training moves `w1`, `b1` and the copied close, never the window itself.
pub struct PriceModel {
    params: ParameterSet<f32>,
    graph: Graph<f32>,
    cost: NodeId,
    w1: ParamId,
    b1: ParamId,
    values: ParamId,
    velocities: [Array2<f32>; 3],
}

impl PriceModel {
    pub fn new(windows: &[&[f32]], seed: u64) -> Result<Self, ModelError> {
        let width = windows.first().ok_or(ModelError::Empty)?.len();
        for (index, window) in windows.iter().enumerate() {
            if window.len() != width || width == 0 {
                return Err(ModelError::WindowMismatch {
                    index,
                    expected: width.max(1),
                    found: window.len(),
                });
            }
        }

        let size = width + 1;
        let mut rng = StdRng::seed_from_u64(seed);
        let mut params = ParameterSet::new();

        let w1 = params.add("w1", (size, size));
        let b1 = params.add("b1", (size, 1));
        let values = params.add("values", (size, windows.len()));

        let factor = (size as f32).sqrt();
        for bias in params.get_mut(b1).data_mut().iter_mut() {
            *bias = rng.gen_range(-1.0f32..1.0) / factor;
        }

        let weights = params.get_mut(w1).data_mut();
        for i in 0..size {
            let factor = ((i + 1) as f32).sqrt();
            for j in 0..=i {
                weights[[i, j]] = rng.gen_range(-1.0f32..1.0) / factor;
            }
        }

        let data = params.get_mut(values).data_mut();
        for (mut column, window) in data.columns_mut().into_iter().zip(windows) {
            for (cell, price) in column.iter_mut().zip(window.iter()) {
                *cell = *price;
            }
            column[width] = window[width - 1];
        }

        let mut graph = Graph::new();
        let w = graph.param(&params, "w1")?;
        let b = graph.param(&params, "b1")?;
        let v = graph.param(&params, "values")?;
        let product = graph.mul(w, v)?;
        let l1 = graph.add(product, b)?;
        let squared = graph.quadratic(l1, v)?;
        let cost = graph.average(squared)?;

        let velocities = [
            Array2::zeros((size, size)),
            Array2::zeros((size, 1)),
            Array2::zeros((size, windows.len())),
        ];

        Ok(Self {
            params,
            graph,
            cost,
            w1,
            b1,
            values,
            velocities,
        })
    }

    pub fn from_windows(windows: &[SymbolWindow], seed: u64) -> Result<Self, ModelError> {
        let prices = windows
            .iter()
            .map(|window| window.prices.as_slice())
            .collect::<Vec<_>>();
        Self::new(&prices, seed)
    }

    /// Rows of every column, the window length plus the copied close.
    pub fn size(&self) -> usize {
        self.params.get(self.w1).shape().0
    }

    pub fn symbols(&self) -> usize {
        self.params.get(self.values).shape().1
    }

    pub fn params(&self) -> &ParameterSet<f32> {
        &self.params
    }

    /// Current mean squared reconstruction error, gradients untouched.
    pub fn loss(&mut self) -> Result<f32, ModelError> {
        Ok(self.graph.forward(&self.params, self.cost)?[[0, 0]])
    }

    /// Zeroes all gradients, then runs a forward and backward pass. Returns the loss.
    pub fn compute_gradient(&mut self) -> Result<f32, ModelError> {
        self.params.zero();
        let output = self
            .graph
            .evaluate(&mut self.params, self.cost, Pass::ForwardBackward)?;
        Ok(output[[0, 0]])
    }

    /// L2 norm of the `w1` gradient over its lower triangle together with the `b1` gradient.
    pub fn gradient_norm(&self) -> f32 {
        let w1 = self.params.get(self.w1).grad();
        let mut norm = 0.0f32;
        for i in 0..self.size() {
            for j in 0..=i {
                let d = w1[[i, j]];
                norm += d * d;
            }
        }
        for d in self.params.get(self.b1).grad().iter() {
            norm += d * d;
        }
        norm.sqrt()
    }

    /// Heavy ball update from the current gradients. `w1` and `b1` steps are divided by
    /// `norm` when it exceeds the clip norm, the copied closes always take the plain step.
    /// Returns whether the step was clipped.
    pub fn apply_update(&mut self, config: &TrainingConfig, norm: f32) -> bool {
        let clipped = norm > training::CLIP_NORM;
        let scaling = if clipped { 1.0 / norm } else { 1.0 };
        let (alpha, eta) = (config.alpha, config.eta);
        let size = self.size();

        let [w1_velocity, b1_velocity, values_velocity] = &mut self.velocities;

        let w1 = self.params.get_mut(self.w1);
        let grad = w1.grad().clone();
        let weights = w1.data_mut();
        for i in 0..size {
            for j in 0..=i {
                let velocity = &mut w1_velocity[[i, j]];
                *velocity = alpha * *velocity - eta * grad[[i, j]] * scaling;
                weights[[i, j]] += *velocity;
            }
        }

        let b1 = self.params.get_mut(self.b1);
        let grad = b1.grad().clone();
        for ((bias, velocity), d) in b1
            .data_mut()
            .iter_mut()
            .zip(b1_velocity.iter_mut())
            .zip(grad.iter())
        {
            *velocity = alpha * *velocity - eta * d * scaling;
            *bias += *velocity;
        }

        let values = self.params.get_mut(self.values);
        let close = size - 1;
        let grad = values.grad().row(close).to_owned();
        let data = values.data_mut();
        for (n, d) in grad.iter().enumerate() {
            let velocity = &mut values_velocity[[close, n]];
            *velocity = alpha * *velocity - eta * d;
            data[[close, n]] += *velocity;
        }

        clipped
    }

    pub fn step(&mut self, config: &TrainingConfig) -> Result<Step, ModelError> {
        let loss = self.compute_gradient()?;
        let norm = self.gradient_norm();
        let clipped = self.apply_update(config, norm);

        Ok(Step {
            loss,
            norm,
            clipped,
        })
    }

    /// Runs up to `config.iterations` steps, stopping once the loss drops below the threshold.
    pub fn train(&mut self, config: &TrainingConfig) -> Result<TrainingReport, ModelError> {
        let mut losses = Vec::with_capacity(config.iterations);
        let mut converged = false;
        let mut start = Instant::now();

        for iteration in 0..config.iterations {
            let step = self.step(config)?;
            losses.push(step.loss);

            println!(
                "{} {} {:?}{}",
                iteration,
                step.loss,
                start.elapsed(),
                if step.clipped { " clipped" } else { "" }
            );
            start = Instant::now();

            if step.loss < config.loss_threshold {
                println!("{}", "stopping...".green());
                converged = true;
                break;
            }
        }

        #[cfg(feature = "debug_training")]
        if let Some(dir) = &config.record_dir {
            if let Err(error) = record_losses(dir, &losses) {
                println!("{} {error}", "Unable to record losses:".red());
            }
        }

        Ok(TrainingReport { losses, converged })
    }

    /// Original close (never trained) against the refined copy, per column.
    pub fn closes(&self) -> Vec<(f32, f32)> {
        let values = self.params.get(self.values).data();
        let size = self.size();
        values
            .columns()
            .into_iter()
            .map(|column| (column[size - 2], column[size - 1]))
            .collect()
    }

    pub fn predictions(&self, windows: &[SymbolWindow]) -> Vec<Prediction> {
        windows
            .iter()
            .zip(self.closes())
            .map(|(window, (original, refined))| Prediction {
                symbol: window.symbol.clone(),
                original,
                refined,
            })
            .collect()
    }
}

#[cfg(feature = "debug_training")]
fn record_losses(dir: &str, losses: &[f32]) -> std::io::Result<()> {
    use std::fs;

    use crate::utils::create_folder_if_not_exists;

    create_folder_if_not_exists(dir)?;

    let lines = losses
        .iter()
        .enumerate()
        .map(|(iteration, loss)| format!("{iteration}\t{loss}"))
        .collect::<Vec<_>>()
        .join("\n");

    fs::write(format!("{dir}/losses.txt"), lines)
}
