use crate::{split::TrainTargets, train::train_tree, TrainOptions, Tree};
use itertools::izip;
use ndarray::prelude::*;
use num_traits::{clamp, ToPrimitive};
use std::ops::Neg;

/// A gradient boosted trees binary classifier trained on the logistic loss.
#[derive(Clone, Debug, PartialEq)]
pub struct BinaryClassifier {
	/// The initial prediction of the model given no trained trees, the log odds of the positive class in the training labels.
	pub bias: f32,
	/// The trees for this model.
	pub trees: Vec<Tree>,
	/// The learning rate the leaf values were scaled by.
	pub learning_rate: f32,
	/// The training losses in each round of training this model.
	pub losses: Vec<f32>,
}

#[derive(Clone, Debug)]
pub struct BoostingOptions {
	pub n_rounds: usize,
	pub learning_rate: f32,
	pub tree_options: TrainOptions,
}

impl Default for BoostingOptions {
	fn default() -> Self {
		Self {
			n_rounds: 100,
			learning_rate: 0.3,
			tree_options: TrainOptions {
				max_depth: Some(6),
				l2_regularization: 1.0,
				min_sum_hessians_per_leaf: 1.0,
				..Default::default()
			},
		}
	}
}

impl BinaryClassifier {
	/// Train a binary classifier.
	pub fn train(
		features: ArrayView2<f32>,
		labels: ArrayView1<usize>,
		options: &BoostingOptions,
	) -> Self {
		let n_examples = features.nrows();
		let bias = compute_bias(labels);
		let mut logits = Array1::<f32>::from_elem(n_examples, bias);
		let mut gradients = vec![0.0; n_examples];
		let mut hessians = vec![0.0; n_examples];
		let mut trees = Vec::with_capacity(options.n_rounds);
		let mut losses = Vec::with_capacity(options.n_rounds);
		if n_examples == 0 {
			return BinaryClassifier {
				bias,
				trees,
				learning_rate: options.learning_rate,
				losses,
			};
		}
		for _ in 0..options.n_rounds {
			update_gradients_and_hessians(&mut gradients, &mut hessians, labels, logits.view());
			let mut tree = train_tree(
				features,
				TrainTargets::Gradients {
					gradients: &gradients,
					hessians: &hessians,
				},
				(0..n_examples).collect(),
				&options.tree_options,
			);
			scale_tree(&mut tree, options.learning_rate);
			for (logit, row) in logits.iter_mut().zip(features.axis_iter(Axis(0))) {
				*logit += tree.predict(row);
			}
			losses.push(compute_loss(labels, logits.view()));
			trees.push(tree);
		}
		BinaryClassifier {
			bias,
			trees,
			learning_rate: options.learning_rate,
			losses,
		}
	}

	/// Return the predicted probability of the positive class for each row of `features`.
	pub fn predict(&self, features: ArrayView2<f32>) -> Array1<f32> {
		features
			.axis_iter(Axis(0))
			.map(|row| {
				let logit = self.bias + self.trees.iter().map(|tree| tree.predict(row)).sum::<f32>();
				sigmoid(logit)
			})
			.collect()
	}
}

fn scale_tree(tree: &mut Tree, learning_rate: f32) {
	for node in tree.nodes.iter_mut() {
		match node {
			crate::Node::Branch(branch) => branch.value *= learning_rate,
			crate::Node::Leaf(leaf) => leaf.value *= learning_rate,
		}
	}
}

/// Compute the binary cross entropy loss.
fn compute_loss(labels: ArrayView1<usize>, logits: ArrayView1<f32>) -> f32 {
	let mut total = 0.0;
	for (label, logit) in labels.iter().zip(logits) {
		let label = if *label == 1 { 1.0 } else { 0.0 };
		let probability = clamp(sigmoid(*logit), std::f32::EPSILON, 1.0 - std::f32::EPSILON);
		total += -1.0 * label * probability.ln() + -1.0 * (1.0 - label) * (1.0 - probability).ln()
	}
	total / labels.len().to_f32().unwrap()
}

/// The log odds of the positive class, clamped so that single class labels produce a finite bias.
fn compute_bias(labels: ArrayView1<usize>) -> f32 {
	let n_positives = labels.iter().filter(|label| **label == 1).count();
	let base_rate = n_positives.to_f32().unwrap() / labels.len().max(1).to_f32().unwrap();
	let base_rate = clamp(base_rate, 1e-6, 1.0 - 1e-6);
	(base_rate / (1.0 - base_rate)).ln()
}

/// Compute the gradients and hessians for each example given the labels and predictions.
fn update_gradients_and_hessians(
	gradients: &mut [f32],
	hessians: &mut [f32],
	labels: ArrayView1<usize>,
	logits: ArrayView1<f32>,
) {
	izip!(gradients.iter_mut(), hessians.iter_mut(), labels, logits).for_each(
		|(gradient, hessian, label, logit)| {
			let probability = clamp(sigmoid(*logit), std::f32::EPSILON, 1.0 - std::f32::EPSILON);
			*gradient = probability - if *label == 1 { 1.0 } else { 0.0 };
			*hessian = probability * (1.0 - probability);
		},
	);
}

fn sigmoid(value: f32) -> f32 {
	1.0 / (value.neg().exp() + 1.0)
}
