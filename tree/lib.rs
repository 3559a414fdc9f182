/*!
This crate implements decision trees and the ensembles built from them for binary classification:

- [`StagedDecisionTree`](struct.StagedDecisionTree.html): a single CART tree whose stages are the tree truncated at each depth.
- [`RandomForest`](struct.RandomForest.html): bagged trees with a random subset of features considered at each split.
- [`BinaryClassifier`](struct.BinaryClassifier.html): gradient boosted trees trained on the logistic loss with second order leaf values.

All three share the tree builder in the `train` module. A tree routes an example to the left child when its feature value is less than or equal to the split value.
*/

#![allow(clippy::tabs_in_doc_comments)]

use ndarray::prelude::*;

mod binary_classifier;
mod random_forest;
mod split;
mod staged;
mod train;

pub use self::binary_classifier::{BinaryClassifier, BoostingOptions};
pub use self::random_forest::{RandomForest, RandomForestOptions};
pub use self::split::{NodeStats, TrainTargets};
pub use self::staged::{StagedDecisionTree, TreeStage};
pub use self::train::train_tree;

/// The options passed to `train_tree` and used by each of the models in this crate.
#[derive(Clone, Debug)]
pub struct TrainOptions {
	/// The impurity measure minimized by classification splits. Ignored by boosting, which uses the gradient gain.
	pub criterion: Criterion,
	/// maximum depth we will grow a tree. `None` grows until the leaves are pure or too small to split.
	pub max_depth: Option<usize>,
	/// the minimum number of examples that must be present in each child of a split.
	pub min_examples_per_leaf: usize,
	/// the minimum number of examples a node must have to be considered for splitting.
	pub min_examples_to_split: usize,
	/// How many features to consider at each split.
	pub max_features: MaxFeatures,
	/// serves to help avoid overfitting in boosting. Refer to XGBOOST paper section 2.1 Regularized Learning Objective.
	pub l2_regularization: f32,
	/// The minimum value of the sum of hessians in a child for a boosting split to be valid.
	pub min_sum_hessians_per_leaf: f32,
	/// Splits whose gain does not exceed this value are not made.
	pub min_gain_to_split: f32,
	/// Seeds the feature sampling when `max_features` is not `All`.
	pub seed: u64,
}

impl Default for TrainOptions {
	fn default() -> Self {
		Self {
			criterion: Criterion::Gini,
			max_depth: None,
			min_examples_per_leaf: 1,
			min_examples_to_split: 2,
			max_features: MaxFeatures::All,
			l2_regularization: 1.0,
			min_sum_hessians_per_leaf: 1.0,
			min_gain_to_split: 0.0,
			seed: 0,
		}
	}
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Criterion {
	Gini,
	Entropy,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum MaxFeatures {
	All,
	/// `ceil(sqrt(n_features))`
	Sqrt,
}

/// Whether a tree is grown for class probabilities or for boosting gradients.
#[derive(Clone, Copy, Debug)]
pub enum Task {
	Classification,
	Boosting,
}

/// Trees are stored as a `Vec` of nodes. The root is the node at index 0.
#[derive(Clone, Debug, PartialEq)]
pub struct Tree {
	pub nodes: Vec<Node>,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Node {
	Branch(BranchNode),
	Leaf(LeafNode),
}

#[derive(Clone, Debug, PartialEq)]
pub struct BranchNode {
	pub feature_index: usize,
	pub split_value: f32,
	pub left_child_index: usize,
	pub right_child_index: usize,
	/// The value this node would predict if it were a leaf. Used when the tree is truncated above this node's children.
	pub value: f32,
	pub depth: usize,
}

#[derive(Clone, Debug, PartialEq)]
pub struct LeafNode {
	pub value: f32,
	pub depth: usize,
}

impl Node {
	pub fn value(&self) -> f32 {
		match self {
			Node::Branch(branch) => branch.value,
			Node::Leaf(leaf) => leaf.value,
		}
	}

	pub fn depth(&self) -> usize {
		match self {
			Node::Branch(branch) => branch.depth,
			Node::Leaf(leaf) => leaf.depth,
		}
	}
}

impl Tree {
	/// Make a prediction for a single example.
	pub fn predict(&self, example: ArrayView1<f32>) -> f32 {
		self.predict_at_depth(example, None)
	}

	/// Make a prediction for a single example with the tree truncated at `max_depth`, so that nodes at that depth act as leaves.
	pub fn predict_at_depth(&self, example: ArrayView1<f32>, max_depth: Option<usize>) -> f32 {
		let mut node_index = 0;
		loop {
			match &self.nodes[node_index] {
				Node::Branch(branch) if max_depth.map(|d| branch.depth < d).unwrap_or(true) => {
					node_index = if example[branch.feature_index] <= branch.split_value {
						branch.left_child_index
					} else {
						branch.right_child_index
					};
				}
				node => return node.value(),
			}
		}
	}

	/// The depth of the deepest node.
	pub fn depth(&self) -> usize {
		self.nodes.iter().map(Node::depth).max().unwrap_or(0)
	}

	/// The features used by branches above `max_depth`, in order of first use in a breadth first walk.
	pub fn features_above_depth(&self, max_depth: usize) -> Vec<usize> {
		let mut features = Vec::new();
		let mut queue = std::collections::VecDeque::new();
		queue.push_back(0);
		while let Some(node_index) = queue.pop_front() {
			if let Node::Branch(branch) = &self.nodes[node_index] {
				if branch.depth < max_depth {
					if !features.contains(&branch.feature_index) {
						features.push(branch.feature_index);
					}
					queue.push_back(branch.left_child_index);
					queue.push_back(branch.right_child_index);
				}
			}
		}
		features
	}
}

#[cfg(test)]
mod test {
	use super::*;

	fn stump() -> Tree {
		Tree {
			nodes: vec![
				Node::Branch(BranchNode {
					feature_index: 1,
					split_value: 0.5,
					left_child_index: 1,
					right_child_index: 2,
					value: 0.5,
					depth: 0,
				}),
				Node::Leaf(LeafNode {
					value: 0.1,
					depth: 1,
				}),
				Node::Leaf(LeafNode {
					value: 0.9,
					depth: 1,
				}),
			],
		}
	}

	#[test]
	fn test_predict() {
		let tree = stump();
		assert_eq!(tree.predict(arr1(&[7.0, 0.0]).view()), 0.1);
		assert_eq!(tree.predict(arr1(&[7.0, 1.0]).view()), 0.9);
		assert_eq!(tree.predict_at_depth(arr1(&[7.0, 1.0]).view(), Some(0)), 0.5);
		assert_eq!(tree.depth(), 1);
		assert_eq!(tree.features_above_depth(0), Vec::<usize>::new());
		assert_eq!(tree.features_above_depth(1), vec![1]);
	}
}
