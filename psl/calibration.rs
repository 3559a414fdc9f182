use ndarray::prelude::*;
use num_traits::{clamp, ToPrimitive};
use pslab_linear::TrainOptions;

/// How total scores are mapped to probabilities.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CalibrationMethod {
	/// A non decreasing step function fit with pool adjacent violators, interpolated linearly between scores.
	Isotonic,
	/// Logistic regression on the score.
	Sigmoid,
	/// Logistic regression on `ln(s)` and `-ln(1 - s)` of the score rescaled to the unit interval.
	Beta,
	/// Like `Beta` with an L2 penalty on the two coefficients.
	BetaReg,
}

const BETA_REG_L2_REGULARIZATION: f32 = 0.01;

#[derive(Clone, Debug, PartialEq)]
pub enum Calibrator {
	Isotonic(IsotonicCalibrator),
	Logistic(LogisticCalibrator),
}

#[derive(Clone, Debug, PartialEq)]
pub struct IsotonicCalibrator {
	/// The distinct training scores in increasing order.
	pub x_thresholds: Vec<f32>,
	/// The fitted probability at each of `x_thresholds`. Non decreasing.
	pub y_thresholds: Vec<f32>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct LogisticCalibrator {
	pub method: CalibrationMethod,
	pub min_score: f32,
	pub max_score: f32,
	pub model: pslab_linear::BinaryClassifier,
}

impl Calibrator {
	pub fn fit(
		method: CalibrationMethod,
		scores: ArrayView1<f32>,
		labels: ArrayView1<usize>,
	) -> Calibrator {
		match method {
			CalibrationMethod::Isotonic => Calibrator::Isotonic(IsotonicCalibrator::fit(scores, labels)),
			_ => Calibrator::Logistic(LogisticCalibrator::fit(method, scores, labels)),
		}
	}

	pub fn transform(&self, scores: ArrayView1<f32>) -> Array1<f32> {
		match self {
			Calibrator::Isotonic(calibrator) => scores.mapv(|score| calibrator.transform_one(score)),
			Calibrator::Logistic(calibrator) => calibrator.transform(scores),
		}
	}
}

impl IsotonicCalibrator {
	pub fn fit(scores: ArrayView1<f32>, labels: ArrayView1<usize>) -> IsotonicCalibrator {
		let mut pairs: Vec<(f32, usize)> = scores.iter().cloned().zip(labels.iter().cloned()).collect();
		pairs.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal));
		// (score, sum of labels, count) per distinct score
		let mut groups: Vec<(f32, f64, f64)> = Vec::new();
		for (score, label) in pairs {
			let label = if label == 1 { 1.0 } else { 0.0 };
			match groups.last_mut() {
				Some(group) if group.0 == score => {
					group.1 += label;
					group.2 += 1.0;
				}
				_ => groups.push((score, label, 1.0)),
			}
		}
		// pool adjacent violators, each block is (sum, weight, number of groups)
		let mut blocks: Vec<(f64, f64, usize)> = Vec::new();
		for (_, sum, weight) in groups.iter() {
			blocks.push((*sum, *weight, 1));
			while blocks.len() > 1 {
				let last = blocks[blocks.len() - 1];
				let previous = blocks[blocks.len() - 2];
				if previous.0 / previous.1 > last.0 / last.1 {
					blocks.pop();
					if let Some(merged) = blocks.last_mut() {
						merged.0 += last.0;
						merged.1 += last.1;
						merged.2 += last.2;
					}
				} else {
					break;
				}
			}
		}
		let x_thresholds = groups.iter().map(|group| group.0).collect();
		let y_thresholds = blocks
			.iter()
			.flat_map(|(sum, weight, n_groups)| {
				std::iter::repeat((sum / weight).to_f32().unwrap()).take(*n_groups)
			})
			.collect();
		IsotonicCalibrator {
			x_thresholds,
			y_thresholds,
		}
	}

	/// Interpolate linearly between the fitted points, clipping outside the training range.
	pub fn transform_one(&self, score: f32) -> f32 {
		let n = self.x_thresholds.len();
		if n == 0 {
			return 0.5;
		}
		if score <= self.x_thresholds[0] {
			return self.y_thresholds[0];
		}
		if score >= self.x_thresholds[n - 1] {
			return self.y_thresholds[n - 1];
		}
		let upper = self.x_thresholds.partition_point(|x| *x < score);
		let (x0, x1) = (self.x_thresholds[upper - 1], self.x_thresholds[upper]);
		let (y0, y1) = (self.y_thresholds[upper - 1], self.y_thresholds[upper]);
		if x1 == score {
			return y1;
		}
		y0 + (y1 - y0) * (score - x0) / (x1 - x0)
	}
}

impl LogisticCalibrator {
	pub fn fit(
		method: CalibrationMethod,
		scores: ArrayView1<f32>,
		labels: ArrayView1<usize>,
	) -> LogisticCalibrator {
		let min_score = scores.iter().cloned().fold(std::f32::INFINITY, f32::min);
		let max_score = scores.iter().cloned().fold(std::f32::NEG_INFINITY, f32::max);
		let (min_score, max_score) = if min_score <= max_score {
			(min_score, max_score)
		} else {
			(0.0, 0.0)
		};
		let options = TrainOptions {
			l2_regularization: match method {
				CalibrationMethod::BetaReg => BETA_REG_L2_REGULARIZATION,
				_ => 0.0,
			},
			learning_rate: 0.5,
			max_epochs: 100,
			n_examples_per_batch: 256,
		};
		let mut calibrator = LogisticCalibrator {
			method,
			min_score,
			max_score,
			model: pslab_linear::BinaryClassifier {
				weights: Array1::zeros(0),
				bias: 0.0,
				means: vec![],
				scales: vec![],
				losses: vec![],
			},
		};
		let features = calibrator.features(scores);
		calibrator.model = pslab_linear::BinaryClassifier::train(features.view(), labels, &options);
		calibrator
	}

	fn features(&self, scores: ArrayView1<f32>) -> Array2<f32> {
		match self.method {
			CalibrationMethod::Beta | CalibrationMethod::BetaReg => {
				let range = self.max_score - self.min_score;
				let mut features = Array2::zeros((scores.len(), 2));
				for (mut row, score) in features.axis_iter_mut(Axis(0)).zip(scores.iter()) {
					let s = if range > 0.0 {
						(score - self.min_score) / range
					} else {
						0.5
					};
					let s = clamp(s, 1e-6, 1.0 - 1e-6);
					row[0] = s.ln();
					row[1] = -(1.0 - s).ln();
				}
				features
			}
			_ => scores.to_owned().insert_axis(Axis(1)),
		}
	}

	pub fn transform(&self, scores: ArrayView1<f32>) -> Array1<f32> {
		self.model.predict(self.features(scores).view())
	}
}

#[cfg(test)]
mod test {
	use super::*;

	#[test]
	fn test_isotonic_pools_violators() {
		let scores = arr1(&[0.0, 0.0, 1.0, 1.0, 2.0, 2.0, 3.0, 3.0]);
		let labels = arr1(&[0, 0, 1, 1, 0, 1, 1, 1]);
		let calibrator = IsotonicCalibrator::fit(scores.view(), labels.view());
		assert_eq!(calibrator.x_thresholds, vec![0.0, 1.0, 2.0, 3.0]);
		assert_eq!(calibrator.y_thresholds, vec![0.0, 0.75, 0.75, 1.0]);
		assert_eq!(calibrator.transform_one(-5.0), 0.0);
		assert_eq!(calibrator.transform_one(0.5), 0.375);
		assert_eq!(calibrator.transform_one(2.0), 0.75);
		assert_eq!(calibrator.transform_one(9.0), 1.0);
	}

	#[test]
	fn test_constant_scores_predict_base_rate() {
		let scores = arr1(&[0.0, 0.0, 0.0, 0.0]);
		let labels = arr1(&[0, 1, 1, 1]);
		for method in [
			CalibrationMethod::Isotonic,
			CalibrationMethod::Sigmoid,
			CalibrationMethod::Beta,
			CalibrationMethod::BetaReg,
		]
		.iter()
		{
			let calibrator = Calibrator::fit(*method, scores.view(), labels.view());
			let probabilities = calibrator.transform(scores.view());
			assert!((probabilities[0] - 0.75).abs() < 1e-3, "{:?}", method);
		}
	}

	#[test]
	fn test_logistic_calibrators_are_monotone() {
		let scores = Array1::from_shape_fn(100, |i| (i % 10) as f32 - 3.0);
		let labels = Array1::from_shape_fn(100, |i| if (i % 10) + (i / 10) % 3 >= 6 { 1 } else { 0 });
		for method in [CalibrationMethod::Sigmoid, CalibrationMethod::Beta].iter() {
			let calibrator = Calibrator::fit(*method, scores.view(), labels.view());
			let probabilities = calibrator.transform(arr1(&[-3.0, 0.0, 6.0]).view());
			assert!(probabilities[0] < probabilities[1], "{:?}", method);
			assert!(probabilities[1] < probabilities[2], "{:?}", method);
		}
	}
}
