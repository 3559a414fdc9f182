use super::{mean::Mean, StreamingMetric};

/// The entropy in bits of a Bernoulli distribution with parameter `probability`. Zero at the endpoints.
pub fn binary_entropy(probability: f32) -> f32 {
	let p = f64::from(probability);
	if p <= 0.0 || p >= 1.0 {
		return 0.0;
	}
	(-(p * p.log2()) - (1.0 - p) * (1.0 - p).log2()) as f32
}

/// `ExpectedEntropy` is the mean binary entropy of the predicted probabilities. It does not look at the labels.
#[derive(Debug, Default)]
pub struct ExpectedEntropy(Mean);

impl StreamingMetric<'_> for ExpectedEntropy {
	type Input = f32;
	type Output = Option<f32>;

	fn update(&mut self, probability: f32) {
		self.0.update(binary_entropy(probability));
	}

	fn merge(&mut self, other: Self) {
		self.0.merge(other.0)
	}

	fn finalize(self) -> Option<f32> {
		self.0.finalize()
	}
}

/// The expected entropy loss of a set of predicted probabilities, or NaN if there are none.
pub fn expected_entropy_loss(probabilities: &[f32]) -> f32 {
	let mut metric = ExpectedEntropy::default();
	for probability in probabilities {
		metric.update(*probability);
	}
	metric.finalize().unwrap_or(std::f32::NAN)
}

#[test]
fn test_expected_entropy_loss() {
	assert_eq!(binary_entropy(0.5), 1.0);
	assert_eq!(binary_entropy(0.0), 0.0);
	assert_eq!(binary_entropy(1.0), 0.0);
	assert!((expected_entropy_loss(&[0.5, 0.0]) - 0.5).abs() < 1e-6);
	assert!(expected_entropy_loss(&[]).is_nan());
}
