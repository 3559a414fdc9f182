use super::{BinaryConfusionMatrix, BinaryConfusionMatrixOutput};
use ndarray::prelude::*;

/// The decision rule implied by a cost ratio of `m` between false negatives and false positives: predict positive when the expected cost of a negative prediction, `m * p`, exceeds that of a positive prediction, `1 - p`.
pub fn cost_weighted_decision(probability: f32, m: f32) -> bool {
	1.0 - probability < m * probability
}

fn cost(confusion_matrix: BinaryConfusionMatrixOutput, m: f32) -> f32 {
	confusion_matrix.false_positive_fraction() + m * confusion_matrix.false_negative_fraction()
}

/// The weighted loss is `fp + m * fn`, where the false positives and false negatives are fractions of all examples and the predictions follow [`cost_weighted_decision`](fn.cost_weighted_decision.html).
pub fn weighted_loss(labels: &[usize], probabilities: &[f32], m: f32) -> f32 {
	let confusion_matrix = BinaryConfusionMatrix::from_predictions(
		probabilities
			.iter()
			.map(|probability| cost_weighted_decision(*probability, m)),
		labels.iter().cloned(),
	);
	cost(confusion_matrix, m)
}

/**
The conservative weighted loss scores predictions that come with a confidence interval. `intervals` has one row per example holding the lower bound, the point estimate, and the upper bound of the positive class probability. The decision is taken on the upper bound, so an example is predicted negative only when even the most optimistic estimate does not justify a positive prediction.
*/
pub fn conservative_weighted_loss(labels: &[usize], intervals: ArrayView2<f32>, m: f32) -> f32 {
	let confusion_matrix = BinaryConfusionMatrix::from_predictions(
		intervals
			.column(2)
			.iter()
			.map(|upper_bound| cost_weighted_decision(*upper_bound, m))
			.collect::<Vec<_>>(),
		labels.iter().cloned(),
	);
	cost(confusion_matrix, m)
}

#[cfg(test)]
mod test {
	use super::*;

	#[test]
	fn test_decision_boundary() {
		// The boundary sits at p = 1 / (m + 1).
		assert!(cost_weighted_decision(0.1, 10.0));
		assert!(!cost_weighted_decision(0.09, 10.0));
	}

	#[test]
	fn test_weighted_loss() {
		let labels = [1, 0, 1, 0];
		let probabilities = [0.5, 0.5, 0.01, 0.01];
		// one false positive and one false negative out of four examples
		assert!((weighted_loss(&labels, &probabilities, 10.0) - (0.25 + 2.5)).abs() < 1e-6);
	}

	#[test]
	fn test_conservative_weighted_loss_with_wide_interval() {
		let labels = [1, 1, 1];
		let intervals = arr2(&[[0.2, 0.5, 0.8], [0.2, 0.5, 0.8], [0.2, 0.5, 0.8]]);
		assert_eq!(
			conservative_weighted_loss(&labels, intervals.view(), 10.0),
			0.0
		);
	}

	#[test]
	fn test_conservative_weighted_loss_uses_upper_bound() {
		let labels = [1, 0];
		let intervals = arr2(&[[0.01, 0.05, 0.08], [0.01, 0.05, 0.5]]);
		// the positive example is missed and the negative example is flagged
		let loss = conservative_weighted_loss(&labels, intervals.view(), 10.0);
		assert!((loss - (0.5 + 10.0 * 0.5)).abs() < 1e-6);
	}
}
