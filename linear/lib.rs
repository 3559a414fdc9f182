/*!
This crate is an implementation of logistic regression for binary classification. [`BinaryClassifier`](struct.BinaryClassifier.html) standardizes its input features, then trains weights and a bias with mini batch gradient descent on the binary cross entropy plus an optional L2 penalty. It trains for a fixed number of epochs and records the training loss after each one.
*/

#![allow(clippy::tabs_in_doc_comments)]

mod binary_classifier;

pub use self::binary_classifier::BinaryClassifier;

/// These are the options passed to `BinaryClassifier::train`.
#[derive(Clone, Debug)]
pub struct TrainOptions {
	/// This is the L2 regularization value to use when updating the model parameters. The penalty is `l2_regularization / 2 * |w|^2` added to the mean loss, so it does not scale with the number of examples.
	pub l2_regularization: f32,
	/// This is the learning rate to use when updating the model parameters.
	pub learning_rate: f32,
	/// This is the number of epochs to train.
	pub max_epochs: usize,
	/// This is the number of examples to use for each batch of training.
	pub n_examples_per_batch: usize,
}

impl Default for TrainOptions {
	fn default() -> Self {
		Self {
			l2_regularization: 0.0,
			learning_rate: 0.1,
			max_epochs: 100,
			n_examples_per_batch: 128,
		}
	}
}
