/*!
This module computes the data behind a comparison of isotonic and beta calibration of a scoring list: the total scores of the training examples, the isotonic step function, the beta curve sampled over the score range, and how many examples of each label have each total score.
*/

use crate::impute::MostFrequentImputer;
use anyhow::{format_err, Result};
use ndarray::prelude::*;
use num_traits::ToPrimitive;
use pslab_psl::{CalibrationMethod, IsotonicCalibrator, ProbabilisticScoringList, PslOptions};
use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Clone, Debug, PartialEq)]
pub struct CalibrationCurvesOptions {
	pub score_set: Vec<i64>,
	/// The number of points at which the beta curve is sampled.
	pub n_points: usize,
}

impl Default for CalibrationCurvesOptions {
	fn default() -> Self {
		CalibrationCurvesOptions {
			score_set: vec![-3, -2, -1, 1, 2, 3],
			n_points: 1000,
		}
	}
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CalibrationCurves {
	/// The total score of every example under the final stage of the beta calibrated list.
	pub scores: Vec<i64>,
	pub isotonic: IsotonicCurve,
	/// `(score, probability)` pairs evenly spaced from the smallest to the largest total score.
	pub beta: Vec<(f32, f32)>,
	pub counts: Vec<ScoreCount>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct IsotonicCurve {
	pub x_thresholds: Vec<f32>,
	pub y_thresholds: Vec<f32>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ScoreCount {
	pub score: i64,
	pub label: usize,
	pub count: usize,
}

pub fn calibration_curves(
	features: ArrayView2<f32>,
	labels: ArrayView1<usize>,
	options: &CalibrationCurvesOptions,
) -> Result<CalibrationCurves> {
	if features.nrows() == 0 {
		return Err(format_err!("cannot compute calibration curves without examples"));
	}
	let features = MostFrequentImputer::fit(features).transform(features);
	let beta = ProbabilisticScoringList::fit(
		features.view(),
		labels,
		&PslOptions {
			score_set: options.score_set.clone(),
			calibration_method: CalibrationMethod::Beta,
			..Default::default()
		},
	);
	// isotonic is refit on the total scores of the beta list
	let stage = beta.last_stage();
	let scores = stage.total_scores(features.view());
	let float_scores = scores.mapv(|score| score.to_f32().unwrap_or(0.0));
	let isotonic = IsotonicCalibrator::fit(float_scores.view(), labels);

	let min_score = float_scores.iter().cloned().fold(std::f32::INFINITY, f32::min);
	let max_score = float_scores.iter().cloned().fold(std::f32::NEG_INFINITY, f32::max);
	let grid = Array1::linspace(min_score, max_score, options.n_points);
	let probabilities = stage.calibrator.transform(grid.view());
	let beta_curve = grid.iter().cloned().zip(probabilities.iter().cloned()).collect();

	let mut counts = BTreeMap::new();
	for (score, label) in scores.iter().zip(labels.iter()) {
		*counts.entry((*score, *label)).or_insert(0) += 1;
	}
	let counts = counts
		.into_iter()
		.map(|((score, label), count)| ScoreCount { score, label, count })
		.collect();

	Ok(CalibrationCurves {
		scores: scores.to_vec(),
		isotonic: IsotonicCurve {
			x_thresholds: isotonic.x_thresholds,
			y_thresholds: isotonic.y_thresholds,
		},
		beta: beta_curve,
		counts,
	})
}

#[cfg(test)]
mod test {
	use super::*;

	#[test]
	fn test_calibration_curves() {
		let n = 50;
		let mut features = Array2::zeros((n, 2));
		let mut labels = Array1::zeros(n);
		for i in 0..n {
			features[[i, 0]] = if i % 10 == 0 { -1.0 } else { (i % 2) as f32 };
			features[[i, 1]] = (i % 5) as f32;
			labels[i] = if i % 2 == 1 || i % 5 == 4 { 1 } else { 0 };
		}
		let options = CalibrationCurvesOptions {
			n_points: 20,
			..Default::default()
		};
		let curves = calibration_curves(features.view(), labels.view(), &options).unwrap();
		assert_eq!(curves.scores.len(), n);
		assert_eq!(curves.beta.len(), 20);
		let total: usize = curves.counts.iter().map(|count| count.count).sum();
		assert_eq!(total, n);
		assert!(curves
			.isotonic
			.y_thresholds
			.windows(2)
			.all(|pair| pair[0] <= pair[1]));
		assert_eq!(
			curves.isotonic.x_thresholds.len(),
			curves.isotonic.y_thresholds.len()
		);
		let min = *curves.scores.iter().min().unwrap() as f32;
		let max = *curves.scores.iter().max().unwrap() as f32;
		assert!((curves.beta[0].0 - min).abs() < 1e-4);
		assert!((curves.beta[19].0 - max).abs() < 1e-4);
		assert!(curves
			.beta
			.iter()
			.all(|(_, probability)| (0.0..=1.0).contains(probability)));
	}
}
