use pslab_metrics::{expected_entropy_loss, soft_ranking_loss};

/// The loss minimized when choosing the next stage of a scoring list. Both are evaluated in sample.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum StageLoss {
	ExpectedEntropy,
	SoftRankingLoss,
}

impl StageLoss {
	pub fn compute(&self, labels: &[usize], probabilities: &[f32]) -> f32 {
		let loss = match self {
			StageLoss::ExpectedEntropy => expected_entropy_loss(probabilities),
			StageLoss::SoftRankingLoss => soft_ranking_loss(labels, probabilities),
		};
		if loss.is_nan() {
			std::f32::INFINITY
		} else {
			loss
		}
	}
}
