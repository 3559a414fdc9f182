/*!
This crate defines the [`Metric`](trait.Metric.html) and [`StreamingMetric`](trait.StreamingMetric.html) traits and the metrics used to score binary classifiers, such as the [`BinaryConfusionMatrix`](struct.BinaryConfusionMatrix.html), [`auc_roc`](fn.auc_roc.html), and the cost weighted losses.

Labels are `usize` values where `0` is the negative class and `1` is the positive class. Probabilities are the predicted probability of the positive class.
*/

#![allow(clippy::tabs_in_doc_comments)]

mod auc_roc;
mod binary_cross_entropy;
mod brier;
mod confusion;
mod entropy;
mod mean;
mod mode;
mod ranking;
mod weighted_loss;

pub use self::auc_roc::{auc_roc, compute_roc_curve, ROCCurvePoint};
pub use self::binary_cross_entropy::{BinaryCrossEntropy, BinaryCrossEntropyInput};
pub use self::brier::{BrierScore, BrierScoreInput};
pub use self::confusion::{BinaryConfusionMatrix, BinaryConfusionMatrixInput, BinaryConfusionMatrixOutput};
pub use self::entropy::{binary_entropy, expected_entropy_loss, ExpectedEntropy};
pub use self::mean::Mean;
pub use self::mode::Mode;
pub use self::ranking::soft_ranking_loss;
pub use self::weighted_loss::{
	conservative_weighted_loss, cost_weighted_decision, weighted_loss,
};

/**
The `Metric` trait defines a common interface to metrics that can be computed when the entire input is available at once.

The seemingly unused generic lifetime `'a` exists here to allow `Input`s and `Output`s to borrow from their enclosing scope.
*/
pub trait Metric<'a> {
	type Input;
	type Output;
	fn compute(input: Self::Input) -> Self::Output;
}

/**
The `StreamingMetric` trait defines a common interface to metrics that can be computed in a streaming manner, where the input is available in chunks, such as the mean or the Brier score.

After being initialized, a value of type `T` implementing the `StreamingMetric` trait can have `update()` called on it with values of the associated type `Input`. Multiple values of `T` can be merged together by calling `merge()`. When finished aggregating, you can call `finalize()` on the metric to produce the associated type `Output`.

# Examples

Here is a basic example implementation of a `Min` metric, which takes `f32`s as input and produces an `f32` as output that is the minimum of all the inputs.

```
use pslab_metrics::StreamingMetric;

struct Min(f32);

impl StreamingMetric<'_> for Min {
	type Input = f32;
	type Output = f32;
	fn update(&mut self, input: Self::Input) {
		self.0 = self.0.min(input)
	}
	fn merge(&mut self, other: Self) { self.0 = self.0.min(other.0) }
	fn finalize(self) -> Self::Output { self.0 }
}
```
*/
pub trait StreamingMetric<'a> {
	/// `Input` is the type to aggregate in calls to `update()`.
	type Input;
	/// `Output` is the return type of `finalize()`.
	type Output;
	/// Update this streaming metric with the `Input` `input`.
	fn update(&mut self, input: Self::Input);
	/// Merge multiple independently computed streaming metrics.
	fn merge(&mut self, other: Self);
	/// When you are done aggregating `Input`s, call `finalize()` to produce an `Output`.
	fn finalize(self) -> Self::Output;
}
