use super::TrainOptions;
use itertools::izip;
use ndarray::prelude::*;
use num_traits::{clamp, ToPrimitive};
use pslab_metrics::{BinaryCrossEntropy, BinaryCrossEntropyInput, StreamingMetric};
use std::ops::Neg;

#[derive(Clone, Debug, PartialEq)]
pub struct BinaryClassifier {
	/// The weights of the standardized features.
	pub weights: Array1<f32>,
	pub bias: f32,
	/// The mean of each feature in the training set, subtracted before the weights are applied.
	pub means: Vec<f32>,
	/// The standard deviation of each feature in the training set, or 1 for constant features.
	pub scales: Vec<f32>,
	/// The binary cross entropy on the training data after each epoch.
	pub losses: Vec<f32>,
}

impl BinaryClassifier {
	pub fn train(
		features: ArrayView2<f32>,
		labels: ArrayView1<usize>,
		options: &TrainOptions,
	) -> BinaryClassifier {
		let n_features = features.ncols();
		let (means, scales) = compute_means_and_scales(features);
		let features = standardize(features, &means, &scales);
		let base_rate = labels.iter().filter(|label| **label == 1).count().to_f32().unwrap_or(0.0)
			/ labels.len().max(1).to_f32().unwrap_or(1.0);
		let base_rate = clamp(base_rate, 1e-6, 1.0 - 1e-6);
		let mut model = BinaryClassifier {
			bias: (base_rate / (1.0 - base_rate)).ln(),
			weights: Array1::<f32>::zeros(n_features),
			means,
			scales,
			losses: vec![],
		};
		if features.nrows() == 0 {
			return model;
		}
		let n_examples_per_batch = options.n_examples_per_batch.max(1);
		for _ in 0..options.max_epochs {
			for (features, labels) in izip!(
				features.axis_chunks_iter(Axis(0), n_examples_per_batch),
				labels.axis_chunks_iter(Axis(0), n_examples_per_batch),
			) {
				model.train_batch(features, labels, options);
			}
			let loss = model.compute_loss(features.view(), labels);
			model.losses.push(loss);
		}
		model
	}

	/// Take one gradient step on a batch of standardized features.
	fn train_batch(
		&mut self,
		features: ArrayView2<f32>,
		labels: ArrayView1<usize>,
		options: &TrainOptions,
	) {
		let learning_rate = options.learning_rate;
		let logits = features.dot(&self.weights) + self.bias;
		let mut predictions = logits.mapv_into(sigmoid);
		izip!(predictions.view_mut(), labels).for_each(|(prediction, label)| {
			let label = if *label == 1 { 1.0 } else { 0.0 };
			*prediction -= label
		});
		let py = predictions.insert_axis(Axis(1));
		let weight_gradients = match (&features * &py).mean_axis(Axis(0)) {
			Some(weight_gradients) => weight_gradients,
			None => return,
		};
		let bias_gradient = py.mean().unwrap_or(0.0);
		izip!(self.weights.view_mut(), weight_gradients.view()).for_each(
			|(weight, weight_gradient)| {
				*weight += -learning_rate * (weight_gradient + options.l2_regularization * *weight);
			},
		);
		self.bias += -learning_rate * bias_gradient;
	}

	/// The binary cross entropy of the model on standardized features.
	fn compute_loss(
		&self,
		features: ArrayView2<f32>,
		labels: ArrayView1<usize>,
	) -> f32 {
		let logits = features.dot(&self.weights) + self.bias;
		let mut metric = BinaryCrossEntropy::default();
		for (logit, label) in logits.iter().zip(labels.iter()) {
			metric.update(BinaryCrossEntropyInput {
				probability: sigmoid(*logit),
				label: *label,
			});
		}
		metric.finalize().unwrap_or(std::f32::INFINITY)
	}

	/// Return the predicted probability of the positive class for each row of `features`.
	pub fn predict(&self, features: ArrayView2<f32>) -> Array1<f32> {
		let features = standardize(features, &self.means, &self.scales);
		let logits = features.dot(&self.weights) + self.bias;
		logits.mapv_into(sigmoid)
	}
}

fn sigmoid(logit: f32) -> f32 {
	1.0 / (logit.neg().exp() + 1.0)
}

fn compute_means_and_scales(features: ArrayView2<f32>) -> (Vec<f32>, Vec<f32>) {
	features
		.axis_iter(Axis(1))
		.map(|column| {
			let mean = column.mean().unwrap_or(0.0);
			let variance = column.iter().map(|value| (value - mean).powi(2)).sum::<f32>()
				/ column.len().max(1).to_f32().unwrap_or(1.0);
			let scale = variance.sqrt();
			let scale = if scale > std::f32::EPSILON { scale } else { 1.0 };
			(mean, scale)
		})
		.unzip()
}

fn standardize(features: ArrayView2<f32>, means: &[f32], scales: &[f32]) -> Array2<f32> {
	let mut standardized = features.to_owned();
	for (mut column, mean, scale) in izip!(standardized.axis_iter_mut(Axis(1)), means, scales) {
		column.mapv_inplace(|value| (value - mean) / scale);
	}
	standardized
}

#[cfg(test)]
mod test {
	use super::*;
	use crate::TrainOptions;

	fn separable() -> (Array2<f32>, Array1<usize>) {
		let features = Array2::from_shape_fn((200, 2), |(i, j)| {
			let x = (i % 100) as f32 / 10.0;
			if j == 0 {
				x
			} else {
				1.0
			}
		});
		let labels = Array1::from_shape_fn(200, |i| if (i % 100) >= 50 { 1 } else { 0 });
		(features, labels)
	}

	#[test]
	fn test_learns_monotone_relationship() {
		let (features, labels) = separable();
		let model = BinaryClassifier::train(features.view(), labels.view(), &TrainOptions::default());
		let probabilities = model.predict(arr2(&[[0.5, 1.0], [9.5, 1.0]]).view());
		assert!(probabilities[0] < 0.5);
		assert!(probabilities[1] > 0.5);
		assert!(model.weights[0] > 0.0);
		assert_eq!(model.losses.len(), 100);
		assert!(model.losses.last().unwrap() < model.losses.first().unwrap());
	}

	#[test]
	fn test_l2_regularization_shrinks_weights() {
		let (features, labels) = separable();
		let options = TrainOptions::default();
		let unregularized = BinaryClassifier::train(features.view(), labels.view(), &options);
		let regularized = BinaryClassifier::train(
			features.view(),
			labels.view(),
			&TrainOptions {
				l2_regularization: 0.5,
				..options.clone()
			},
		);
		assert!(regularized.weights[0].abs() < unregularized.weights[0].abs());
	}

	#[test]
	fn test_constant_labels_predict_base_rate() {
		let features = Array2::<f32>::zeros((10, 1));
		let labels = Array1::<usize>::ones(10);
		let model = BinaryClassifier::train(features.view(), labels.view(), &TrainOptions::default());
		assert!(model.predict(features.view())[0] > 0.99);
	}
}
