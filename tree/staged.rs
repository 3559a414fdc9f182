use crate::{split::TrainTargets, train::train_tree, TrainOptions, Tree};
use ndarray::prelude::*;

/// A single decision tree viewed as a sequence of stages. Stage `k` is the tree truncated at depth `k`: branches at depth `k` act as leaves and predict the positive fraction of the training examples that reached them. Stage 0 predicts the training base rate.
#[derive(Clone, Debug, PartialEq)]
pub struct StagedDecisionTree {
	pub tree: Tree,
}

/// One stage of a [`StagedDecisionTree`](struct.StagedDecisionTree.html).
#[derive(Clone, Copy, Debug)]
pub struct TreeStage<'a> {
	pub tree: &'a Tree,
	pub depth: usize,
}

impl StagedDecisionTree {
	pub fn train(
		features: ArrayView2<f32>,
		labels: ArrayView1<usize>,
		options: &TrainOptions,
	) -> StagedDecisionTree {
		let tree = train_tree(
			features,
			TrainTargets::Labels(labels),
			(0..features.nrows()).collect(),
			options,
		);
		StagedDecisionTree { tree }
	}

	/// The number of stages, one more than the depth of the fitted tree.
	pub fn n_stages(&self) -> usize {
		self.tree.depth() + 1
	}

	pub fn stage(&self, depth: usize) -> TreeStage {
		TreeStage {
			tree: &self.tree,
			depth,
		}
	}

	pub fn stages(&self) -> impl Iterator<Item = TreeStage> {
		(0..self.n_stages()).map(move |depth| self.stage(depth))
	}

	/// Return the predicted probability of the positive class for each row of `features` using the full tree.
	pub fn predict(&self, features: ArrayView2<f32>) -> Array1<f32> {
		features
			.axis_iter(Axis(0))
			.map(|row| self.tree.predict(row))
			.collect()
	}
}

impl<'a> TreeStage<'a> {
	pub fn predict(&self, features: ArrayView2<f32>) -> Array1<f32> {
		features
			.axis_iter(Axis(0))
			.map(|row| self.tree.predict_at_depth(row, Some(self.depth)))
			.collect()
	}

	/// The features this stage's branches split on.
	pub fn features(&self) -> Vec<usize> {
		self.tree.features_above_depth(self.depth)
	}
}

#[cfg(test)]
mod test {
	use super::*;
	use crate::Criterion;

	#[test]
	fn test_stages() {
		let features = arr2(&[
			[0.0, 0.0],
			[0.0, 1.0],
			[1.0, 0.0],
			[1.0, 1.0],
			[1.0, 1.0],
			[1.0, 1.0],
		]);
		let labels = arr1(&[0, 0, 0, 1, 1, 1]);
		let model = StagedDecisionTree::train(
			features.view(),
			labels.view(),
			&TrainOptions {
				criterion: Criterion::Entropy,
				max_depth: Some(5),
				..Default::default()
			},
		);
		assert_eq!(model.n_stages(), 3);
		let base_rate = model.stage(0).predict(features.view());
		assert!(base_rate.iter().all(|p| (*p - 0.5).abs() < 1e-6));
		assert!(model.stage(0).features().is_empty());
		assert_eq!(model.stage(1).features().len(), 1);
		assert_eq!(model.stage(2).predict(features.view()), model.predict(features.view()));
		assert_eq!(model.predict(features.view()), arr1(&[0.0, 0.0, 0.0, 1.0, 1.0, 1.0]));
	}
}
