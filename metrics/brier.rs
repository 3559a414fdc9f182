use super::{mean::Mean, StreamingMetric};

/// The Brier score is the mean squared difference between the predicted probability of the positive class and the label.
#[derive(Debug, Default)]
pub struct BrierScore(Mean);

pub struct BrierScoreInput {
	pub probability: f32,
	pub label: usize,
}

impl StreamingMetric<'_> for BrierScore {
	type Input = BrierScoreInput;
	type Output = Option<f32>;

	fn update(&mut self, input: BrierScoreInput) {
		let label = if input.label == 1 { 1.0 } else { 0.0 };
		self.0.update((input.probability - label).powi(2));
	}

	fn merge(&mut self, other: Self) {
		self.0.merge(other.0)
	}

	fn finalize(self) -> Option<f32> {
		self.0.finalize()
	}
}

#[test]
fn test_brier_score() {
	let mut brier = BrierScore::default();
	brier.update(BrierScoreInput {
		probability: 0.8,
		label: 1,
	});
	brier.update(BrierScoreInput {
		probability: 0.4,
		label: 0,
	});
	assert!((brier.finalize().unwrap() - 0.1).abs() < 1e-6);
}
