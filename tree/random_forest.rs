use crate::{split::TrainTargets, train::train_tree, MaxFeatures, TrainOptions, Tree};
use ndarray::prelude::*;
use rand::{Rng, SeedableRng};
use rand_xoshiro::Xoshiro256Plus;
use rayon::prelude::*;

/// A random forest averages the class probabilities of fully grown trees, each trained on a bootstrap sample of the examples with `sqrt(n_features)` features considered at every split.
#[derive(Clone, Debug, PartialEq)]
pub struct RandomForest {
	pub trees: Vec<Tree>,
}

#[derive(Clone, Debug)]
pub struct RandomForestOptions {
	pub n_trees: usize,
	pub tree_options: TrainOptions,
	pub seed: u64,
}

impl Default for RandomForestOptions {
	fn default() -> Self {
		Self {
			n_trees: 100,
			tree_options: TrainOptions {
				max_features: MaxFeatures::Sqrt,
				..Default::default()
			},
			seed: 0,
		}
	}
}

impl RandomForest {
	/// Train the trees in parallel. Tree `i` draws its bootstrap sample and its feature subsets from generators seeded with `seed + i`, so the result does not depend on the number of threads.
	pub fn train(
		features: ArrayView2<f32>,
		labels: ArrayView1<usize>,
		options: &RandomForestOptions,
	) -> RandomForest {
		let n_examples = features.nrows();
		let trees = (0..options.n_trees)
			.into_par_iter()
			.map(|tree_index| {
				let seed = options.seed.wrapping_add(tree_index as u64);
				let mut rng = Xoshiro256Plus::seed_from_u64(seed);
				let example_indices = (0..n_examples)
					.map(|_| rng.gen_range(0..n_examples))
					.collect();
				let tree_options = TrainOptions {
					seed: seed.wrapping_mul(0x9E37_79B9_7F4A_7C15),
					..options.tree_options.clone()
				};
				train_tree(
					features,
					TrainTargets::Labels(labels),
					example_indices,
					&tree_options,
				)
			})
			.collect();
		RandomForest { trees }
	}

	pub fn predict(&self, features: ArrayView2<f32>) -> Array1<f32> {
		let n_trees = self.trees.len().max(1) as f32;
		features
			.axis_iter(Axis(0))
			.map(|row| self.trees.iter().map(|tree| tree.predict(row)).sum::<f32>() / n_trees)
			.collect()
	}
}

#[cfg(test)]
mod test {
	use super::*;

	#[test]
	fn test_random_forest() {
		let features = Array2::from_shape_fn((100, 3), |(i, j)| match j {
			0 => i as f32,
			1 => (i % 7) as f32,
			_ => (i % 3) as f32,
		});
		let labels = Array1::from_shape_fn(100, |i| if i >= 50 { 1 } else { 0 });
		let options = RandomForestOptions {
			n_trees: 10,
			..Default::default()
		};
		let model = RandomForest::train(features.view(), labels.view(), &options);
		assert_eq!(model.trees.len(), 10);
		let probabilities = model.predict(arr2(&[[5.0, 5.0, 2.0], [95.0, 4.0, 2.0]]).view());
		assert!(probabilities[0] < 0.5);
		assert!(probabilities[1] > 0.5);
		let again = RandomForest::train(features.view(), labels.view(), &options);
		assert_eq!(model, again);
	}
}
