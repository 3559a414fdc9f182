use crate::{
	split::{choose_best_split, NodeStats, TrainTargets},
	BranchNode, LeafNode, MaxFeatures, Node, Task, TrainOptions, Tree,
};
use ndarray::prelude::*;
use num_traits::ToPrimitive;
use rand::{seq::index::sample, SeedableRng};
use rand_xoshiro::Xoshiro256Plus;
use std::collections::VecDeque;

struct QueueItem {
	node_index: usize,
	depth: usize,
	example_indices: Vec<usize>,
}

/// Grow a single tree on the examples in `example_indices`. Indices may repeat, which is how a bootstrap sample is represented. Nodes are expanded breadth first, so they are stored in order of increasing depth.
pub fn train_tree(
	features: ArrayView2<f32>,
	targets: TrainTargets,
	example_indices: Vec<usize>,
	options: &TrainOptions,
) -> Tree {
	let task = targets.task();
	let n_features = features.ncols();
	let mut rng = Xoshiro256Plus::seed_from_u64(options.seed);
	let n_features_to_sample = match options.max_features {
		MaxFeatures::All => n_features,
		MaxFeatures::Sqrt => n_features.to_f64().unwrap().sqrt().ceil().to_usize().unwrap().max(1),
	}
	.min(n_features);
	let mut nodes = vec![Node::Leaf(LeafNode {
		value: 0.0,
		depth: 0,
	})];
	let mut queue = VecDeque::new();
	queue.push_back(QueueItem {
		node_index: 0,
		depth: 0,
		example_indices,
	});
	while let Some(item) = queue.pop_front() {
		let stats = NodeStats::compute(&targets, &item.example_indices);
		let value = stats.value(task, options.l2_regularization);
		let leaf = Node::Leaf(LeafNode {
			value,
			depth: item.depth,
		});
		let can_split = options.max_depth.map(|d| item.depth < d).unwrap_or(true)
			&& item.example_indices.len() >= options.min_examples_to_split.max(2)
			&& !(matches!(task, Task::Classification) && stats.is_pure());
		if !can_split || n_features == 0 {
			nodes[item.node_index] = leaf;
			continue;
		}
		let feature_indices: Vec<usize> = if n_features_to_sample == n_features {
			(0..n_features).collect()
		} else {
			let mut feature_indices = sample(&mut rng, n_features, n_features_to_sample).into_vec();
			feature_indices.sort_unstable();
			feature_indices
		};
		let split = choose_best_split(
			features,
			&targets,
			&item.example_indices,
			&stats,
			&feature_indices,
			options,
		);
		let split = match split {
			Some(split) if split.gain >= f64::from(options.min_gain_to_split) => split,
			_ => {
				nodes[item.node_index] = leaf;
				continue;
			}
		};
		let left_child_index = nodes.len();
		let right_child_index = nodes.len() + 1;
		for _ in 0..2 {
			nodes.push(Node::Leaf(LeafNode {
				value: 0.0,
				depth: item.depth + 1,
			}));
		}
		nodes[item.node_index] = Node::Branch(BranchNode {
			feature_index: split.feature_index,
			split_value: split.split_value,
			left_child_index,
			right_child_index,
			value,
			depth: item.depth,
		});
		queue.push_back(QueueItem {
			node_index: left_child_index,
			depth: item.depth + 1,
			example_indices: split.left_example_indices,
		});
		queue.push_back(QueueItem {
			node_index: right_child_index,
			depth: item.depth + 1,
			example_indices: split.right_example_indices,
		});
	}
	Tree { nodes }
}

#[cfg(test)]
mod test {
	use super::*;
	use crate::Criterion;

	fn xor() -> (Array2<f32>, Array1<usize>) {
		let features = arr2(&[
			[0.0, 0.0],
			[0.0, 1.0],
			[1.0, 0.0],
			[1.0, 1.0],
			[0.0, 0.0],
			[0.0, 1.0],
			[1.0, 0.0],
			[1.0, 1.0],
		]);
		let labels = arr1(&[0, 1, 1, 0, 0, 1, 1, 0]);
		(features, labels)
	}

	#[test]
	fn test_grows_until_pure() {
		let (features, labels) = xor();
		let options = TrainOptions {
			criterion: Criterion::Entropy,
			..Default::default()
		};
		let tree = train_tree(
			features.view(),
			TrainTargets::Labels(labels.view()),
			(0..8).collect(),
			&options,
		);
		assert_eq!(tree.depth(), 2);
		for (row, label) in features.axis_iter(Axis(0)).zip(labels.iter()) {
			assert_eq!(tree.predict(row), *label as f32);
		}
		assert_eq!(tree.nodes[0].value(), 0.5);
	}

	#[test]
	fn test_max_depth() {
		let (features, labels) = xor();
		let options = TrainOptions {
			max_depth: Some(1),
			..Default::default()
		};
		let tree = train_tree(
			features.view(),
			TrainTargets::Labels(labels.view()),
			(0..8).collect(),
			&options,
		);
		assert_eq!(tree.depth(), 1);
	}

	#[test]
	fn test_min_examples_per_leaf() {
		let features = arr2(&[[0.0], [1.0], [2.0], [3.0]]);
		let labels = arr1(&[1, 0, 0, 0]);
		let options = TrainOptions {
			min_examples_per_leaf: 2,
			..Default::default()
		};
		let tree = train_tree(
			features.view(),
			TrainTargets::Labels(labels.view()),
			(0..4).collect(),
			&options,
		);
		match &tree.nodes[0] {
			Node::Branch(branch) => assert_eq!(branch.split_value, 1.5),
			Node::Leaf(_) => panic!("expected a branch"),
		}
	}
}
