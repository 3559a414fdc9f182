use crate::classifier::Classifier;
use ndarray::prelude::*;
use pslab_metrics::{
	auc_roc, conservative_weighted_loss, cost_weighted_decision, expected_entropy_loss,
	weighted_loss, BinaryConfusionMatrix, BrierScore, BrierScoreInput, StreamingMetric,
};
use std::collections::BTreeMap;

/// The metric battery applied to every classifier the worker fits.
#[derive(Clone, Debug, PartialEq)]
pub struct Scoring {
	/// The cost of a false negative relative to a false positive.
	pub cost_ratio: f32,
	/// Confidence levels in percent at which the conservative weighted loss is computed.
	pub confidence_levels: Vec<u32>,
}

impl Default for Scoring {
	fn default() -> Self {
		Self {
			cost_ratio: 10.0,
			confidence_levels: vec![5, 10, 20, 50, 80, 90, 95, 99],
		}
	}
}

/// A train and a test partition of features and labels.
pub struct Partitions<'a> {
	pub features_train: ArrayView2<'a, f32>,
	pub labels_train: ArrayView1<'a, usize>,
	pub features_test: ArrayView2<'a, f32>,
	pub labels_test: ArrayView1<'a, usize>,
}

impl<'a> Partitions<'a> {
	/// The same partitions restricted to `columns`.
	pub fn select_columns(&self, columns: &[usize]) -> (Array2<f32>, Array2<f32>) {
		(
			self.features_train.select(Axis(1), columns),
			self.features_test.select(Axis(1), columns),
		)
	}
}

impl Scoring {
	/// Every metric of the battery on both partitions, under `train_` and `test_` prefixed names. Classifiers with confidence intervals also get the conservative weighted loss at each confidence level.
	pub fn score_partitions(&self, classifier: &dyn Classifier, partitions: &Partitions) -> BTreeMap<String, f64> {
		let mut metrics = self.for_each_partition(partitions, |features, labels| self.score(classifier, features, labels));
		metrics.append(&mut self.score_conservative_partitions(classifier, partitions));
		metrics
	}

	/// Only the conservative weighted losses on both partitions, under `train_` and `test_` prefixed names.
	pub fn score_conservative_partitions(
		&self,
		classifier: &dyn Classifier,
		partitions: &Partitions,
	) -> BTreeMap<String, f64> {
		self.for_each_partition(partitions, |features, labels| {
			self.score_conservative(classifier, features, labels)
		})
	}

	fn for_each_partition(
		&self,
		partitions: &Partitions,
		f: impl Fn(ArrayView2<f32>, ArrayView1<usize>) -> BTreeMap<String, f64>,
	) -> BTreeMap<String, f64> {
		let mut metrics = BTreeMap::new();
		for (prefix, features, labels) in [
			("train", partitions.features_train, partitions.labels_train),
			("test", partitions.features_test, partitions.labels_test),
		]
		.iter()
		{
			for (name, value) in f(*features, *labels) {
				metrics.insert(format!("{}_{}", prefix, name), value);
			}
		}
		metrics
	}

	pub fn score(
		&self,
		classifier: &dyn Classifier,
		features: ArrayView2<f32>,
		labels: ArrayView1<usize>,
	) -> BTreeMap<String, f64> {
		let probabilities = classifier.predict_proba(features).to_vec();
		let labels = labels.to_vec();
		let m = self.cost_ratio;
		let confusion_matrix = BinaryConfusionMatrix::from_predictions(
			probabilities.iter().map(|probability| *probability > 0.5),
			labels.iter().cloned(),
		);
		let cost_confusion_matrix = BinaryConfusionMatrix::from_predictions(
			probabilities
				.iter()
				.map(|probability| cost_weighted_decision(*probability, m)),
			labels.iter().cloned(),
		);
		let mut brier_score = BrierScore::default();
		for (probability, label) in probabilities.iter().zip(labels.iter()) {
			brier_score.update(BrierScoreInput {
				probability: *probability,
				label: *label,
			});
		}
		let brier_score = brier_score.finalize().unwrap_or(std::f32::NAN);
		let metrics = vec![
			("acc", confusion_matrix.accuracy()),
			("bacc", confusion_matrix.balanced_accuracy()),
			("roc", auc_roc(&probabilities, &labels)),
			("brier", -brier_score),
			("recall", confusion_matrix.recall()),
			("recall_at_wloss", cost_confusion_matrix.recall()),
			("prec", confusion_matrix.precision()),
			("spec_at_wloss", cost_confusion_matrix.specificity()),
			("f1", confusion_matrix.f1_score()),
			("ent", expected_entropy_loss(&probabilities)),
			("wloss", weighted_loss(&labels, &probabilities, m)),
		];
		metrics
			.into_iter()
			.map(|(name, value)| (name.to_owned(), f64::from(value)))
			.collect()
	}

	/// `conservative_wloss<level>` for every confidence level, or nothing if the classifier has no confidence intervals.
	pub fn score_conservative(
		&self,
		classifier: &dyn Classifier,
		features: ArrayView2<f32>,
		labels: ArrayView1<usize>,
	) -> BTreeMap<String, f64> {
		let classifier = match classifier.confidence_interval() {
			Some(classifier) => classifier,
			None => return BTreeMap::new(),
		};
		let labels = labels.to_vec();
		self
			.confidence_levels
			.iter()
			.map(|level| {
				let intervals = classifier.predict_proba_ci(features, f64::from(*level) / 100.0);
				let loss = conservative_weighted_loss(&labels, intervals.view(), self.cost_ratio);
				(format!("conservative_wloss{}", level), f64::from(loss))
			})
			.collect()
	}
}

#[cfg(test)]
mod test {
	use super::*;
	use crate::classifier::SupportsConfidenceInterval;

	struct Fixed {
		probabilities: Array1<f32>,
		lower: f32,
		upper: f32,
	}

	impl Classifier for Fixed {
		fn predict_proba(&self, _: ArrayView2<f32>) -> Array1<f32> {
			self.probabilities.clone()
		}
		fn confidence_interval(&self) -> Option<&dyn SupportsConfidenceInterval> {
			Some(self)
		}
	}

	impl SupportsConfidenceInterval for Fixed {
		fn predict_proba_ci(&self, _: ArrayView2<f32>, _: f64) -> Array2<f32> {
			let mut intervals = Array2::zeros((self.probabilities.len(), 3));
			intervals.column_mut(0).fill(self.lower);
			intervals.column_mut(1).assign(&self.probabilities);
			intervals.column_mut(2).fill(self.upper);
			intervals
		}
	}

	#[test]
	fn test_battery() {
		let classifier = Fixed {
			probabilities: arr1(&[0.9, 0.6, 0.2, 0.05]),
			lower: 0.2,
			upper: 0.8,
		};
		let features = Array2::zeros((4, 1));
		let labels = arr1(&[1, 0, 1, 0]);
		let metrics = Scoring::default().score(&classifier, features.view(), labels.view());
		assert_eq!(metrics["acc"], 0.5);
		assert_eq!(metrics["recall"], 0.5);
		assert_eq!(metrics["prec"], 0.5);
		assert_eq!(metrics["roc"], 0.75);
		// 1 - p < 10 p holds for all but 0.05
		assert_eq!(metrics["recall_at_wloss"], 1.0);
		assert_eq!(metrics["spec_at_wloss"], 0.5);
		assert!((metrics["wloss"] - 0.25).abs() < 1e-6);
		assert!(metrics["brier"] < 0.0);
		assert_eq!(metrics.len(), 11);
	}

	#[test]
	fn test_conservative_loss_is_zero_for_positive_truth() {
		let classifier = Fixed {
			probabilities: arr1(&[0.5, 0.5, 0.5]),
			lower: 0.2,
			upper: 0.8,
		};
		let features = Array2::zeros((3, 1));
		let labels = arr1(&[1, 1, 1]);
		let metrics = Scoring::default().score_conservative(&classifier, features.view(), labels.view());
		assert_eq!(metrics.len(), 8);
		assert!(metrics.values().all(|loss| *loss == 0.0));
		assert!(metrics.contains_key("conservative_wloss95"));
	}

	#[test]
	fn test_prefixes() {
		let classifier = Fixed {
			probabilities: arr1(&[0.9, 0.1]),
			lower: 0.0,
			upper: 1.0,
		};
		let features = Array2::zeros((2, 1));
		let labels = arr1(&[1, 0]);
		let partitions = Partitions {
			features_train: features.view(),
			labels_train: labels.view(),
			features_test: features.view(),
			labels_test: labels.view(),
		};
		let metrics = Scoring::default().score_partitions(&classifier, &partitions);
		assert_eq!(metrics.len(), 2 * (11 + 8));
		assert!(metrics.contains_key("train_acc"));
		assert!(metrics.contains_key("test_conservative_wloss5"));
	}
}
