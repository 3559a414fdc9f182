use crate::{
	binarizer::{binarize, optimal_threshold, ThresholdMethod},
	calibration::{CalibrationMethod, Calibrator},
	confidence::wilson_interval,
};
use ndarray::prelude::*;
use num_traits::ToPrimitive;
use std::collections::BTreeMap;

/**
A `ProbabilisticScoringSystem` adds an integer score for every selected feature whose value exceeds its threshold and maps the total score to a probability with a calibrator.

Besides the calibrated probability it can report a confidence interval for each total score, computed as the Wilson interval of the positive fraction among the training examples with that total score.
*/
#[derive(Clone, Debug, PartialEq)]
pub struct ProbabilisticScoringSystem {
	/// The column indices of the selected features.
	pub features: Vec<usize>,
	/// The score added when the corresponding feature is active.
	pub scores: Vec<i64>,
	/// A feature is active when its value is greater than its threshold.
	pub thresholds: Vec<f32>,
	pub calibrator: Calibrator,
	/// The number of positive and total training examples at each total score.
	pub score_counts: BTreeMap<i64, (usize, usize)>,
}

impl ProbabilisticScoringSystem {
	pub fn fit(
		features: ArrayView2<f32>,
		labels: ArrayView1<usize>,
		feature_indices: &[usize],
		scores: &[i64],
		thresholds: &[f32],
		calibration_method: CalibrationMethod,
	) -> ProbabilisticScoringSystem {
		let total_scores = compute_total_scores(features, feature_indices, scores, thresholds);
		let mut score_counts = BTreeMap::new();
		for (total_score, label) in total_scores.iter().zip(labels.iter()) {
			let entry = score_counts.entry(*total_score).or_insert((0, 0));
			if *label == 1 {
				entry.0 += 1;
			}
			entry.1 += 1;
		}
		let total_scores = total_scores.mapv(|score| score.to_f32().unwrap());
		let calibrator = Calibrator::fit(calibration_method, total_scores.view(), labels);
		ProbabilisticScoringSystem {
			features: feature_indices.to_owned(),
			scores: scores.to_owned(),
			thresholds: thresholds.to_owned(),
			calibrator,
			score_counts,
		}
	}

	pub fn total_scores(&self, features: ArrayView2<f32>) -> Array1<i64> {
		compute_total_scores(features, &self.features, &self.scores, &self.thresholds)
	}

	/// Return the predicted probability of the positive class for each row of `features`.
	pub fn predict_proba(&self, features: ArrayView2<f32>) -> Array1<f32> {
		let total_scores = self.total_scores(features).mapv(|score| score.to_f32().unwrap());
		self.calibrator.transform(total_scores.view())
	}

	/// Return one row `[lower bound, probability, upper bound]` per example. A total score never seen in training uses the counts of the nearest seen total score. The bounds are widened to contain the calibrated probability.
	pub fn predict_proba_ci(&self, features: ArrayView2<f32>, confidence: f64) -> Array2<f32> {
		let total_scores = self.total_scores(features);
		let probabilities = self
			.calibrator
			.transform(total_scores.mapv(|score| score.to_f32().unwrap()).view());
		let mut intervals = Array2::zeros((features.nrows(), 3));
		for (mut row, total_score, probability) in itertools::izip!(
			intervals.axis_iter_mut(Axis(0)),
			total_scores.iter(),
			probabilities.iter()
		) {
			let (n_positives, n_examples) = self.nearest_counts(*total_score);
			let (lower, upper) = wilson_interval(n_positives, n_examples, confidence);
			row[0] = lower.to_f32().unwrap().min(*probability);
			row[1] = *probability;
			row[2] = upper.to_f32().unwrap().max(*probability);
		}
		intervals
	}

	/// The expected entropy of the predicted probabilities on `features`.
	pub fn expected_entropy(&self, features: ArrayView2<f32>) -> f32 {
		let probabilities = self.predict_proba(features);
		pslab_metrics::expected_entropy_loss(probabilities.as_slice().unwrap_or(&[]))
	}

	fn nearest_counts(&self, total_score: i64) -> (usize, usize) {
		if let Some(counts) = self.score_counts.get(&total_score) {
			return *counts;
		}
		let below = self.score_counts.range(..total_score).next_back();
		let above = self.score_counts.range(total_score..).next();
		match (below, above) {
			(Some((b, below)), Some((a, above))) => {
				if total_score - b <= a - total_score {
					*below
				} else {
					*above
				}
			}
			(Some((_, counts)), None) | (None, Some((_, counts))) => *counts,
			(None, None) => (0, 0),
		}
	}
}

/// The sum of `scores[i]` over the features `feature_indices[i]` that exceed `thresholds[i]`, for every row.
pub fn compute_total_scores(
	features: ArrayView2<f32>,
	feature_indices: &[usize],
	scores: &[i64],
	thresholds: &[f32],
) -> Array1<i64> {
	features
		.axis_iter(Axis(0))
		.map(|row| {
			itertools::izip!(feature_indices, scores, thresholds)
				.map(|(feature_index, score, threshold)| {
					if binarize(row[*feature_index], *threshold) > 0.0 {
						*score
					} else {
						0
					}
				})
				.sum()
		})
		.collect()
}

/// A threshold for every column. Columns that only hold zeros and ones use `0.5`, others use the entropy minimizing threshold.
pub fn compute_thresholds(
	features: ArrayView2<f32>,
	labels: ArrayView1<usize>,
	method: ThresholdMethod,
) -> Vec<f32> {
	features
		.axis_iter(Axis(1))
		.map(|column| {
			let is_binary = column
				.iter()
				.all(|value| *value == 0.0 || *value == 1.0 || value.is_nan());
			if is_binary {
				0.5
			} else {
				optimal_threshold(column, labels, method)
			}
		})
		.collect()
}
