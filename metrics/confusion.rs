use super::StreamingMetric;
use num_traits::ToPrimitive;

/// `BinaryConfusionMatrix` counts predictions against labels for a single decision rule.
#[derive(Clone, Debug, Default)]
pub struct BinaryConfusionMatrix {
	true_positives: u64,
	false_positives: u64,
	true_negatives: u64,
	false_negatives: u64,
}

/// The input to [BinaryConfusionMatrix](struct.BinaryConfusionMatrix.html).
pub struct BinaryConfusionMatrixInput {
	/// Whether the example was predicted to be positive.
	pub predicted: bool,
	/// The actual label, `1` for positive and `0` for negative.
	pub label: usize,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BinaryConfusionMatrixOutput {
	pub true_positives: u64,
	pub false_positives: u64,
	pub true_negatives: u64,
	pub false_negatives: u64,
}

impl BinaryConfusionMatrix {
	pub fn new() -> Self {
		Self::default()
	}

	/// Tally a full set of predictions and labels at once.
	pub fn from_predictions(
		predicted: impl IntoIterator<Item = bool>,
		labels: impl IntoIterator<Item = usize>,
	) -> BinaryConfusionMatrixOutput {
		let mut confusion_matrix = Self::new();
		for (predicted, label) in predicted.into_iter().zip(labels) {
			confusion_matrix.update(BinaryConfusionMatrixInput { predicted, label });
		}
		confusion_matrix.finalize()
	}
}

impl StreamingMetric<'_> for BinaryConfusionMatrix {
	type Input = BinaryConfusionMatrixInput;
	type Output = BinaryConfusionMatrixOutput;

	fn update(&mut self, input: BinaryConfusionMatrixInput) {
		match (input.predicted, input.label == 1) {
			(true, true) => self.true_positives += 1,
			(true, false) => self.false_positives += 1,
			(false, false) => self.true_negatives += 1,
			(false, true) => self.false_negatives += 1,
		}
	}

	fn merge(&mut self, other: Self) {
		self.true_positives += other.true_positives;
		self.false_positives += other.false_positives;
		self.true_negatives += other.true_negatives;
		self.false_negatives += other.false_negatives;
	}

	fn finalize(self) -> BinaryConfusionMatrixOutput {
		BinaryConfusionMatrixOutput {
			true_positives: self.true_positives,
			false_positives: self.false_positives,
			true_negatives: self.true_negatives,
			false_negatives: self.false_negatives,
		}
	}
}

// Ratios whose denominator is zero are reported as zero, matching the convention of the scoring functions this battery is compared against.
fn ratio(numerator: u64, denominator: u64) -> f32 {
	if denominator == 0 {
		0.0
	} else {
		numerator.to_f32().unwrap_or(0.0) / denominator.to_f32().unwrap_or(1.0)
	}
}

impl BinaryConfusionMatrixOutput {
	pub fn n_examples(&self) -> u64 {
		self.true_positives + self.false_positives + self.true_negatives + self.false_negatives
	}

	pub fn accuracy(&self) -> f32 {
		ratio(self.true_positives + self.true_negatives, self.n_examples())
	}

	pub fn precision(&self) -> f32 {
		ratio(self.true_positives, self.true_positives + self.false_positives)
	}

	/// tpr = tp / p = tp / (tp + fn)
	pub fn recall(&self) -> f32 {
		ratio(self.true_positives, self.true_positives + self.false_negatives)
	}

	/// tnr = tn / n = tn / (tn + fp)
	pub fn specificity(&self) -> f32 {
		ratio(self.true_negatives, self.true_negatives + self.false_positives)
	}

	pub fn f1_score(&self) -> f32 {
		let precision = self.precision();
		let recall = self.recall();
		if precision + recall == 0.0 {
			0.0
		} else {
			2.0 * (precision * recall) / (precision + recall)
		}
	}

	/// The mean of the recall of each class that is present among the labels.
	pub fn balanced_accuracy(&self) -> f32 {
		let n_positives = self.true_positives + self.false_negatives;
		let n_negatives = self.true_negatives + self.false_positives;
		match (n_positives > 0, n_negatives > 0) {
			(true, true) => (self.recall() + self.specificity()) / 2.0,
			(true, false) => self.recall(),
			(false, true) => self.specificity(),
			(false, false) => 0.0,
		}
	}

	/// The false positives as a fraction of all examples.
	pub fn false_positive_fraction(&self) -> f32 {
		ratio(self.false_positives, self.n_examples())
	}

	/// The false negatives as a fraction of all examples.
	pub fn false_negative_fraction(&self) -> f32 {
		ratio(self.false_negatives, self.n_examples())
	}
}

#[test]
fn test_confusion_matrix() {
	let predicted = vec![true, true, false, false, true, false, false, false];
	let labels = vec![1, 0, 1, 0, 1, 0, 0, 0];
	let output = BinaryConfusionMatrix::from_predictions(predicted, labels);
	insta::assert_debug_snapshot!(output, @r###"
 BinaryConfusionMatrixOutput {
     true_positives: 2,
     false_positives: 1,
     true_negatives: 4,
     false_negatives: 1,
 }
 "###);
	assert_eq!(output.accuracy(), 0.75);
	assert!((output.precision() - 2.0 / 3.0).abs() < 1e-6);
	assert!((output.recall() - 2.0 / 3.0).abs() < 1e-6);
	assert!((output.specificity() - 0.8).abs() < 1e-6);
	assert!((output.balanced_accuracy() - (2.0 / 3.0 + 0.8) / 2.0).abs() < 1e-6);
	assert_eq!(output.false_positive_fraction(), 0.125);
}

#[test]
fn test_undefined_ratios_are_zero() {
	let output = BinaryConfusionMatrix::from_predictions(vec![false, false], vec![0, 0]);
	assert_eq!(output.precision(), 0.0);
	assert_eq!(output.recall(), 0.0);
	assert_eq!(output.f1_score(), 0.0);
	assert_eq!(output.balanced_accuracy(), 1.0);
}
