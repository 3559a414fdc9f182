/*!
This module measures how close the greedy construction of a scoring list comes to the best scoring system of each size.

Every score vector over a small score set is fit as a scoring system and evaluated by its in sample expected entropy. Each vector becomes a node `(number of nonzero scores, rounded entropy)`, and vectors that differ in one nonzero score are joined by an edge. The stages of a greedily fit list form the cascade to compare against.
*/

use anyhow::{format_err, Result};
use ndarray::prelude::*;
use pslab_psl::{
	compute_thresholds, CalibrationMethod, ProbabilisticScoringList, ProbabilisticScoringSystem,
	PslOptions, ThresholdMethod,
};
use pslab_util::finite::Finite;
use rayon::prelude::*;
use serde::Serialize;
use std::{
	collections::{BTreeSet, HashMap},
	convert::TryFrom,
};

#[derive(Clone, Debug, PartialEq)]
pub struct GreedyOptimalityOptions {
	/// The scores every feature may take, including `0` for an unused feature.
	pub score_set: Vec<i64>,
	pub method: ThresholdMethod,
	pub calibration_method: CalibrationMethod,
}

impl Default for GreedyOptimalityOptions {
	fn default() -> Self {
		GreedyOptimalityOptions {
			score_set: vec![0, 1, 2],
			method: ThresholdMethod::Bisect,
			calibration_method: CalibrationMethod::Isotonic,
		}
	}
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct NodeId {
	/// The number of features with a nonzero score.
	pub complexity: usize,
	/// The in sample expected entropy rounded to three decimals.
	pub entropy: Finite<f64>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct GreedyOptimality {
	pub n_score_vectors: usize,
	pub nodes: Vec<NodeId>,
	pub edges: Vec<(NodeId, NodeId)>,
	/// One node per stage of the greedily fit list.
	pub cascade: Vec<NodeId>,
}

pub fn greedy_optimality(
	features: ArrayView2<f32>,
	labels: ArrayView1<usize>,
	options: &GreedyOptimalityOptions,
) -> Result<GreedyOptimality> {
	let n_features = features.ncols();
	let radix = options.score_set.len();
	let n_score_vectors = u32::try_from(n_features)
		.ok()
		.and_then(|n_features| radix.checked_pow(n_features))
		.ok_or_else(|| {
			format_err!(
				"{} score vectors over {} features is too many to enumerate",
				radix,
				n_features
			)
		})?;
	let thresholds = compute_thresholds(features, labels, options.method);
	tracing::info!(n_features, n_score_vectors, "enumerating score vectors");

	let evaluated: Vec<(Vec<i64>, f32)> = (0..n_score_vectors)
		.into_par_iter()
		.map(|index| {
			let vector = score_vector(index, n_features, &options.score_set);
			let (feature_indices, scores): (Vec<usize>, Vec<i64>) = vector
				.iter()
				.enumerate()
				.filter(|(_, score)| **score != 0)
				.map(|(feature_index, score)| (feature_index, *score))
				.unzip();
			let feature_thresholds: Vec<f32> = feature_indices.iter().map(|i| thresholds[*i]).collect();
			let system = ProbabilisticScoringSystem::fit(
				features,
				labels,
				&feature_indices,
				&scores,
				&feature_thresholds,
				options.calibration_method,
			);
			(vector, system.expected_entropy(features))
		})
		.collect();

	let mut node_ids = HashMap::with_capacity(evaluated.len());
	for (vector, entropy) in evaluated.iter() {
		let complexity = vector.iter().filter(|score| **score != 0).count();
		node_ids.insert(vector.as_slice(), node_id(complexity, *entropy)?);
	}
	let mut edges = BTreeSet::new();
	for (vector, _) in evaluated.iter() {
		let to = node_ids[vector.as_slice()];
		for (index, score) in vector.iter().enumerate() {
			if *score == 0 {
				continue;
			}
			let mut from = vector.clone();
			from[index] = 0;
			// Without zero in the score set there is no smaller vector to come from.
			if let Some(from) = node_ids.get(from.as_slice()) {
				edges.insert((*from.min(&to), *from.max(&to)));
			}
		}
	}
	let nodes: BTreeSet<NodeId> = node_ids.values().cloned().collect();

	let psl = ProbabilisticScoringList::fit(
		features,
		labels,
		&PslOptions {
			score_set: options.score_set.iter().cloned().filter(|score| *score != 0).collect(),
			method: options.method,
			calibration_method: options.calibration_method,
			..Default::default()
		},
	);
	let cascade = psl
		.stages
		.iter()
		.enumerate()
		.map(|(index, stage)| node_id(index, stage.expected_entropy(features)))
		.collect::<Result<Vec<_>>>()?;

	Ok(GreedyOptimality {
		n_score_vectors,
		nodes: nodes.into_iter().collect(),
		edges: edges.into_iter().collect(),
		cascade,
	})
}

/// The `index`th vector of the cross product of `score_set` over `n_features` positions, with the first position varying slowest.
fn score_vector(mut index: usize, n_features: usize, score_set: &[i64]) -> Vec<i64> {
	let mut vector = vec![0; n_features];
	for position in (0..n_features).rev() {
		vector[position] = score_set[index % score_set.len()];
		index /= score_set.len();
	}
	vector
}

fn node_id(complexity: usize, entropy: f32) -> Result<NodeId> {
	let entropy = (f64::from(entropy) * 1000.0).round() / 1000.0;
	let entropy = Finite::new(entropy)
		.map_err(|_| format_err!("expected entropy is not finite for complexity {}", complexity))?;
	Ok(NodeId {
		complexity,
		entropy,
	})
}
