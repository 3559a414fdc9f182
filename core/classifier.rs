/*!
This module defines the interface the worker scores classifiers through, and implements it for every model the experiments fit.
*/

use crate::impute::MostFrequentImputer;
use crate::params::Variant;
use ndarray::prelude::*;
use num_traits::ToPrimitive;
use pslab_psl::{ProbabilisticScoringList, ProbabilisticScoringSystem};
use pslab_tree::{BoostingOptions, RandomForest, RandomForestOptions, StagedDecisionTree, TreeStage};

/// A fitted binary classifier.
pub trait Classifier: Send + Sync {
	/// The probability of the positive class for each row of `features`.
	fn predict_proba(&self, features: ArrayView2<f32>) -> Array1<f32>;

	/// Classifiers that can bound their probabilities return themselves here.
	fn confidence_interval(&self) -> Option<&dyn SupportsConfidenceInterval> {
		None
	}
}

/// Classifiers that report a confidence interval around each predicted probability.
pub trait SupportsConfidenceInterval {
	/// One row `[lower bound, probability, upper bound]` per row of `features`, at the two sided `confidence` level.
	fn predict_proba_ci(&self, features: ArrayView2<f32>, confidence: f64) -> Array2<f32>;
}

/// One intermediate classifier of a staged model along with the columns it reads.
pub struct Stage<'a> {
	pub index: usize,
	pub classifier: Box<dyn Classifier + 'a>,
	pub features: Vec<usize>,
}

/// Models made of a sequence of increasingly complex stages.
pub trait StagedClassifier: Classifier {
	fn stages(&self) -> Vec<Stage<'_>>;
}

impl Classifier for ProbabilisticScoringSystem {
	fn predict_proba(&self, features: ArrayView2<f32>) -> Array1<f32> {
		ProbabilisticScoringSystem::predict_proba(self, features)
	}

	fn confidence_interval(&self) -> Option<&dyn SupportsConfidenceInterval> {
		Some(self)
	}
}

impl SupportsConfidenceInterval for ProbabilisticScoringSystem {
	fn predict_proba_ci(&self, features: ArrayView2<f32>, confidence: f64) -> Array2<f32> {
		ProbabilisticScoringSystem::predict_proba_ci(self, features, confidence)
	}
}

impl Classifier for ProbabilisticScoringList {
	fn predict_proba(&self, features: ArrayView2<f32>) -> Array1<f32> {
		ProbabilisticScoringList::predict_proba(self, features)
	}

	fn confidence_interval(&self) -> Option<&dyn SupportsConfidenceInterval> {
		Some(self)
	}
}

impl SupportsConfidenceInterval for ProbabilisticScoringList {
	fn predict_proba_ci(&self, features: ArrayView2<f32>, confidence: f64) -> Array2<f32> {
		ProbabilisticScoringList::predict_proba_ci(self, features, confidence)
	}
}

impl StagedClassifier for ProbabilisticScoringList {
	fn stages(&self) -> Vec<Stage<'_>> {
		self
			.stages
			.iter()
			.enumerate()
			.map(|(index, stage)| Stage {
				index,
				classifier: Box::new(stage),
				features: stage.features.clone(),
			})
			.collect()
	}
}

impl Classifier for StagedDecisionTree {
	fn predict_proba(&self, features: ArrayView2<f32>) -> Array1<f32> {
		self.predict(features)
	}
}

impl<'a> Classifier for TreeStage<'a> {
	fn predict_proba(&self, features: ArrayView2<f32>) -> Array1<f32> {
		self.predict(features)
	}
}

impl StagedClassifier for StagedDecisionTree {
	fn stages(&self) -> Vec<Stage<'_>> {
		StagedDecisionTree::stages(self)
			.enumerate()
			.map(|(index, stage)| Stage {
				index,
				features: stage.features(),
				classifier: Box::new(stage),
			})
			.collect()
	}
}

impl<'a, T> Classifier for &'a T
where
	T: Classifier,
{
	fn predict_proba(&self, features: ArrayView2<f32>) -> Array1<f32> {
		(*self).predict_proba(features)
	}

	fn confidence_interval(&self) -> Option<&dyn SupportsConfidenceInterval> {
		(*self).confidence_interval()
	}
}

impl Classifier for pslab_linear::BinaryClassifier {
	fn predict_proba(&self, features: ArrayView2<f32>) -> Array1<f32> {
		self.predict(features)
	}
}

impl Classifier for pslab_tree::BinaryClassifier {
	fn predict_proba(&self, features: ArrayView2<f32>) -> Array1<f32> {
		self.predict(features)
	}
}

impl Classifier for RandomForest {
	fn predict_proba(&self, features: ArrayView2<f32>) -> Array1<f32> {
		self.predict(features)
	}
}

/// A baseline refit on the columns selected by a stage: an imputer followed by one of the variant models.
pub struct VariantPipeline {
	pub imputer: MostFrequentImputer,
	pub model: Box<dyn Classifier>,
}

impl VariantPipeline {
	pub fn fit(
		variant: Variant,
		features: ArrayView2<f32>,
		labels: ArrayView1<usize>,
		seed: u64,
	) -> VariantPipeline {
		let imputer = MostFrequentImputer::fit(features);
		let features = imputer.transform(features);
		let features = features.view();
		let model: Box<dyn Classifier> = match variant {
			Variant::Logreg | Variant::LogregUnregularized => {
				// An inverse regularization strength of 1 on the summed loss is an L2 coefficient of 1 / n on the mean loss.
				let l2_regularization = match variant {
					Variant::Logreg => 1.0 / features.nrows().max(1).to_f32().unwrap(),
					_ => 0.0,
				};
				let options = pslab_linear::TrainOptions {
					l2_regularization,
					max_epochs: 200,
					..Default::default()
				};
				Box::new(pslab_linear::BinaryClassifier::train(features, labels, &options))
			}
			Variant::Xgboost => Box::new(pslab_tree::BinaryClassifier::train(
				features,
				labels,
				&BoostingOptions::default(),
			)),
			Variant::RandomForest => Box::new(RandomForest::train(
				features,
				labels,
				&RandomForestOptions {
					seed,
					..Default::default()
				},
			)),
		};
		VariantPipeline { imputer, model }
	}
}

impl Classifier for VariantPipeline {
	fn predict_proba(&self, features: ArrayView2<f32>) -> Array1<f32> {
		self.model.predict_proba(self.imputer.transform(features).view())
	}
}

#[cfg(test)]
mod test {
	use super::*;
	use pslab_psl::PslOptions;

	#[test]
	fn test_capabilities() {
		let features = arr2(&[[0.0, 1.0], [1.0, 0.0], [1.0, 1.0], [0.0, 0.0]]);
		let labels = arr1(&[0, 1, 1, 0]);
		let psl = ProbabilisticScoringList::fit(features.view(), labels.view(), &PslOptions::default());
		assert!(Classifier::confidence_interval(&psl).is_some());
		assert!(StagedClassifier::stages(&psl).iter().all(|stage| stage.classifier.confidence_interval().is_some()));
		let tree = StagedDecisionTree::train(features.view(), labels.view(), &Default::default());
		assert!(Classifier::confidence_interval(&tree).is_none());
		let stages = StagedClassifier::stages(&tree);
		assert_eq!(stages.len(), 2);
		assert_eq!(stages[1].features, vec![0]);
	}

	#[test]
	fn test_variant_pipeline_imputes() {
		let pattern = [(0.0, 0), (-1.0, 1), (1.0, 1), (1.0, 1), (0.0, 0), (1.0, 1)];
		let features = Array2::from_shape_fn((60, 1), |(i, _)| pattern[i % 6].0);
		let labels = Array1::from_shape_fn(60, |i| pattern[i % 6].1);
		for variant in Variant::ALL.iter() {
			let pipeline = VariantPipeline::fit(*variant, features.view(), labels.view(), 0);
			assert_eq!(pipeline.imputer.fill_values, vec![1.0]);
			let probabilities = pipeline.predict_proba(arr2(&[[0.0], [1.0]]).view());
			assert!(probabilities[0] < probabilities[1], "{:?}", variant);
		}
	}
}
