use crate::{Criterion, Task, TrainOptions};
use ndarray::prelude::*;
use num_traits::ToPrimitive;

/// The targets a tree is fit to. Classification trees see labels, boosting trees see the gradients and hessians of the loss for the current predictions.
#[derive(Clone, Copy, Debug)]
pub enum TrainTargets<'a> {
	Labels(ArrayView1<'a, usize>),
	Gradients {
		gradients: &'a [f32],
		hessians: &'a [f32],
	},
}

impl<'a> TrainTargets<'a> {
	pub fn task(&self) -> Task {
		match self {
			TrainTargets::Labels(_) => Task::Classification,
			TrainTargets::Gradients { .. } => Task::Boosting,
		}
	}
}

/// Sufficient statistics of a set of examples for both tasks. Only the fields relevant to the task are filled.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct NodeStats {
	pub n_examples: usize,
	pub n_positives: usize,
	pub sum_gradients: f64,
	pub sum_hessians: f64,
}

impl NodeStats {
	pub fn compute(targets: &TrainTargets, example_indices: &[usize]) -> NodeStats {
		let mut stats = NodeStats::default();
		for example_index in example_indices {
			stats.add(targets, *example_index);
		}
		stats
	}

	pub fn add(&mut self, targets: &TrainTargets, example_index: usize) {
		self.n_examples += 1;
		match targets {
			TrainTargets::Labels(labels) => {
				if labels[example_index] == 1 {
					self.n_positives += 1;
				}
			}
			TrainTargets::Gradients {
				gradients,
				hessians,
			} => {
				self.sum_gradients += f64::from(gradients[example_index]);
				self.sum_hessians += f64::from(hessians[example_index]);
			}
		}
	}

	pub fn sub(&self, other: &NodeStats) -> NodeStats {
		NodeStats {
			n_examples: self.n_examples - other.n_examples,
			n_positives: self.n_positives - other.n_positives,
			sum_gradients: self.sum_gradients - other.sum_gradients,
			sum_hessians: self.sum_hessians - other.sum_hessians,
		}
	}

	/// The fraction of positive examples for classification, and the newton step `-G / (H + lambda)` for boosting.
	pub fn value(&self, task: Task, l2_regularization: f32) -> f32 {
		match task {
			Task::Classification => {
				if self.n_examples == 0 {
					0.0
				} else {
					(self.n_positives.to_f64().unwrap() / self.n_examples.to_f64().unwrap())
						.to_f32()
						.unwrap()
				}
			}
			Task::Boosting => (-self.sum_gradients
				/ (self.sum_hessians + f64::from(l2_regularization)))
			.to_f32()
			.unwrap_or(0.0),
		}
	}

	/// Higher is better. The gain of a split is the children's score minus the parent's.
	pub fn score(&self, task: Task, options: &TrainOptions) -> f64 {
		match task {
			Task::Classification => {
				let n = self.n_examples.to_f64().unwrap();
				if self.n_examples == 0 {
					return 0.0;
				}
				let p = self.n_positives.to_f64().unwrap() / n;
				let impurity = match options.criterion {
					Criterion::Gini => 1.0 - p * p - (1.0 - p) * (1.0 - p),
					Criterion::Entropy => entropy(p),
				};
				-n * impurity
			}
			Task::Boosting => {
				0.5 * self.sum_gradients * self.sum_gradients
					/ (self.sum_hessians + f64::from(options.l2_regularization))
			}
		}
	}

	pub fn is_pure(&self) -> bool {
		self.n_positives == 0 || self.n_positives == self.n_examples
	}
}

fn entropy(p: f64) -> f64 {
	if p <= 0.0 || p >= 1.0 {
		0.0
	} else {
		-p * p.log2() - (1.0 - p) * (1.0 - p).log2()
	}
}

#[derive(Clone, Debug, PartialEq)]
pub struct Split {
	pub feature_index: usize,
	pub split_value: f32,
	pub gain: f64,
	/// The examples with a feature value `<= split_value`.
	pub left_example_indices: Vec<usize>,
	pub right_example_indices: Vec<usize>,
}

/// Find the split with the highest gain among `feature_indices`. Candidate split values are the midpoints between consecutive distinct feature values. Returns `None` if no candidate satisfies the minimum leaf size and hessian constraints.
pub fn choose_best_split(
	features: ArrayView2<f32>,
	targets: &TrainTargets,
	example_indices: &[usize],
	parent_stats: &NodeStats,
	feature_indices: &[usize],
	options: &TrainOptions,
) -> Option<Split> {
	let task = targets.task();
	let parent_score = parent_stats.score(task, options);
	let min_examples_per_leaf = options.min_examples_per_leaf.max(1);
	let mut best: Option<(usize, f32, f64)> = None;
	let mut sorted = example_indices.to_owned();
	for feature_index in feature_indices.iter().cloned() {
		let column = features.column(feature_index);
		sorted.sort_by(|a, b| {
			column[*a]
				.partial_cmp(&column[*b])
				.unwrap_or(std::cmp::Ordering::Equal)
		});
		let mut left_stats = NodeStats::default();
		for position in 0..sorted.len().saturating_sub(1) {
			left_stats.add(targets, sorted[position]);
			let value = column[sorted[position]];
			let next_value = column[sorted[position + 1]];
			if !(value < next_value) {
				continue;
			}
			let n_left = position + 1;
			if n_left < min_examples_per_leaf || sorted.len() - n_left < min_examples_per_leaf {
				continue;
			}
			let right_stats = parent_stats.sub(&left_stats);
			if let Task::Boosting = task {
				let min_sum_hessians = f64::from(options.min_sum_hessians_per_leaf);
				if left_stats.sum_hessians < min_sum_hessians
					|| right_stats.sum_hessians < min_sum_hessians
				{
					continue;
				}
			}
			let gain = left_stats.score(task, options) + right_stats.score(task, options) - parent_score;
			if best.map(|(_, _, best_gain)| gain > best_gain).unwrap_or(true) {
				best = Some((feature_index, midpoint(value, next_value), gain));
			}
		}
	}
	let (feature_index, split_value, gain) = best?;
	let column = features.column(feature_index);
	let (left_example_indices, right_example_indices) = example_indices
		.iter()
		.partition(|example_index| column[**example_index] <= split_value);
	Some(Split {
		feature_index,
		split_value,
		gain,
		left_example_indices,
		right_example_indices,
	})
}

/// The midpoint of two consecutive distinct values, falling back to the lower value when rounding would place the midpoint on the upper one.
fn midpoint(low: f32, high: f32) -> f32 {
	let mid = low + (high - low) / 2.0;
	if mid < high && mid.is_finite() {
		mid
	} else {
		low
	}
}

#[cfg(test)]
mod test {
	use super::*;

	#[test]
	fn test_perfect_split() {
		let features = arr2(&[[1.0, 5.0], [2.0, 5.0], [3.0, 5.0], [4.0, 5.0]]);
		let labels = arr1(&[0, 0, 1, 1]);
		let targets = TrainTargets::Labels(labels.view());
		let example_indices = vec![0, 1, 2, 3];
		let stats = NodeStats::compute(&targets, &example_indices);
		let split = choose_best_split(
			features.view(),
			&targets,
			&example_indices,
			&stats,
			&[0, 1],
			&TrainOptions::default(),
		)
		.unwrap();
		assert_eq!(split.feature_index, 0);
		assert_eq!(split.split_value, 2.5);
		assert_eq!(split.left_example_indices, vec![0, 1]);
		assert_eq!(split.right_example_indices, vec![2, 3]);
		assert!((split.gain - 2.0).abs() < 1e-9);
	}

	#[test]
	fn test_constant_feature_has_no_split() {
		let features = arr2(&[[1.0], [1.0], [1.0]]);
		let labels = arr1(&[0, 1, 1]);
		let targets = TrainTargets::Labels(labels.view());
		let example_indices = vec![0, 1, 2];
		let stats = NodeStats::compute(&targets, &example_indices);
		let split = choose_best_split(
			features.view(),
			&targets,
			&example_indices,
			&stats,
			&[0],
			&TrainOptions::default(),
		);
		assert!(split.is_none());
	}

	#[test]
	fn test_boosting_value() {
		let gradients = [0.5, 0.5, -0.5];
		let hessians = [0.25, 0.25, 0.25];
		let targets = TrainTargets::Gradients {
			gradients: &gradients,
			hessians: &hessians,
		};
		let stats = NodeStats::compute(&targets, &[0, 1, 2]);
		assert!((stats.value(Task::Boosting, 1.0) - (-0.5 / 1.75)).abs() < 1e-6);
	}
}
