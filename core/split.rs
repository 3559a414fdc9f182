use num_traits::ToPrimitive;
use rand::{seq::SliceRandom, SeedableRng};
use rand_xoshiro::Xoshiro256Plus;

/// A single shuffled train/test split. The test partition holds `ceil(test_fraction * n)` examples, at most `n - 1` so that the training partition is never empty.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ShuffleSplit {
	pub test_fraction: f64,
	pub seed: u64,
}

impl ShuffleSplit {
	/// Return the `(train, test)` row indices. The test rows are the first rows of a permutation seeded by `seed`.
	pub fn split(&self, n_examples: usize) -> (Vec<usize>, Vec<usize>) {
		let mut indices: Vec<usize> = (0..n_examples).collect();
		let mut rng = Xoshiro256Plus::seed_from_u64(self.seed);
		indices.shuffle(&mut rng);
		let n_test = (self.test_fraction * n_examples.to_f64().unwrap())
			.ceil()
			.to_usize()
			.unwrap_or(0)
			.min(n_examples.saturating_sub(1));
		let train = indices.split_off(n_test);
		(train, indices)
	}
}
