use colored::Colorize;
use ordered_float::OrderedFloat;
use rustfft::num_complex::Complex64;
use std::cmp::Reverse;

use crate::{
    autodiff::{Graph, GraphError, NodeId, ParamId, ParameterSet, Pass},
    features::SpectralFeaturizer,
    types::{Score, SymbolWindow},
};

/// Fixed attention graph over the spectra of a batch of symbols.
///
/// `points` holds one spectrum per column. For a query spectrum the graph computes
/// attention weights over the batch, mixes the batch spectra with them, and reduces the
/// mix to a complex entropy. Nothing is trained, every evaluation is forward only.
pub struct AttentionScorer {
    params: ParameterSet<Complex64>,
    graph: Graph<Complex64>,
    input: ParamId,
    cost: NodeId,
}

impl AttentionScorer {
    /// `spectra` must be non-empty and share one length.
    pub fn new(spectra: &[Vec<Complex64>]) -> Result<Self, GraphError> {
        let width = spectra.first().map(|spectrum| spectrum.len()).unwrap_or(0);
        if let Some(spectrum) = spectra.iter().find(|spectrum| spectrum.len() != width) {
            return Err(GraphError::ShapeMismatch {
                op: "points",
                left: (width, 1),
                right: (spectrum.len(), 1),
            });
        }

        let mut params = ParameterSet::new();
        let points = params.add("points", (width, spectra.len()));
        let input = params.add("input", (width, 1));

        let data = params.get_mut(points).data_mut();
        for (mut column, spectrum) in data.columns_mut().into_iter().zip(spectra) {
            for (cell, bin) in column.iter_mut().zip(spectrum) {
                *cell = *bin;
            }
        }

        let mut graph = Graph::new();
        let x = graph.param(&params, "points")?;
        let query = graph.param(&params, "input")?;

        let xt = graph.transpose(x)?;
        let weights = graph.mul(xt, query)?;
        let layer1 = graph.spherical_softmax(weights)?;

        let layer1t = graph.transpose(layer1)?;
        let mixed = graph.mul(layer1t, xt)?;
        let mixed = graph.transpose(mixed)?;
        let layer2 = graph.spherical_softmax(mixed)?;

        let cost = graph.entropy(layer2)?;

        Ok(Self {
            params,
            graph,
            input,
            cost,
        })
    }

    pub fn width(&self) -> usize {
        self.params.get(self.input).shape().0
    }

    /// Complex entropy of the batch as seen through `spectrum`.
    pub fn score(&mut self, spectrum: &[Complex64]) -> Result<Complex64, GraphError> {
        let width = self.width();
        if spectrum.len() != width {
            return Err(GraphError::ShapeMismatch {
                op: "input",
                left: (width, 1),
                right: (spectrum.len(), 1),
            });
        }

        let input = self.params.get_mut(self.input).data_mut();
        for (cell, bin) in input.iter_mut().zip(spectrum) {
            *cell = *bin;
        }

        let output = self
            .graph
            .evaluate(&mut self.params, self.cost, Pass::ForwardOnly)?;
        Ok(output[[0, 0]])
    }
}

/// Scores every window against the whole batch and sorts by entropy magnitude,
/// highest first. Windows that cannot be featurized are skipped.
pub fn rank(windows: &[SymbolWindow]) -> Result<Vec<Score>, GraphError> {
    let mut featurizer = SpectralFeaturizer::new();
    let mut usable = Vec::with_capacity(windows.len());
    let mut spectra = Vec::with_capacity(windows.len());

    for window in windows {
        match featurizer.transform(&window.prices) {
            Ok(spectrum) => {
                usable.push(window);
                spectra.push(spectrum);
            }
            Err(error) => {
                println!("{} {} {error}", "Skipping".yellow(), window.symbol);
            }
        }
    }

    if spectra.is_empty() {
        return Ok(Vec::new());
    }

    let mut scorer = AttentionScorer::new(&spectra)?;
    let mut scores = Vec::with_capacity(usable.len());

    for (window, spectrum) in usable.iter().zip(spectra.iter()) {
        let entropy = scorer.score(spectrum)?;
        scores.push(Score {
            symbol: window.symbol.clone(),
            name: window.name.clone(),
            entropy: entropy.norm(),
            phase: entropy.arg(),
            change: window.change(),
        });
    }

    scores.sort_by_key(|score| Reverse(OrderedFloat(score.entropy)));
    Ok(scores)
}
