use ndarray::prelude::*;
use num_traits::ToPrimitive;

/// How the entropy minimizing threshold of a feature is searched for.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ThresholdMethod {
	/// Evaluate every candidate threshold.
	Brute,
	/// Assume the split entropy is unimodal over the sorted candidates and binary search for its minimum.
	Bisect,
}

/**
The `MinEntropyBinarizer` replaces each feature with the indicator `x > t`, where `t` is the threshold that minimizes the weighted entropy of the labels on the two sides of the split.

Candidate thresholds are the midpoints between consecutive distinct values of the feature. A constant feature gets the threshold of its only value, so it becomes all zeros.
*/
#[derive(Clone, Debug, PartialEq)]
pub struct MinEntropyBinarizer {
	pub method: ThresholdMethod,
	pub thresholds: Vec<f32>,
}

impl MinEntropyBinarizer {
	pub fn fit(
		features: ArrayView2<f32>,
		labels: ArrayView1<usize>,
		method: ThresholdMethod,
	) -> MinEntropyBinarizer {
		let thresholds = features
			.axis_iter(Axis(1))
			.map(|column| optimal_threshold(column, labels, method))
			.collect();
		MinEntropyBinarizer { method, thresholds }
	}

	pub fn transform(&self, features: ArrayView2<f32>) -> Array2<f32> {
		let mut binarized = Array2::zeros(features.raw_dim());
		for (mut binarized_column, column, threshold) in itertools::izip!(
			binarized.axis_iter_mut(Axis(1)),
			features.axis_iter(Axis(1)),
			self.thresholds.iter(),
		) {
			binarized_column.zip_mut_with(&column, |binarized_value, value| {
				*binarized_value = binarize(*value, *threshold);
			});
		}
		binarized
	}
}

/// `1` if `value > threshold`, `0` otherwise. NaN is `0`.
pub fn binarize(value: f32, threshold: f32) -> f32 {
	if value > threshold {
		1.0
	} else {
		0.0
	}
}

/// Find the threshold of `column` that minimizes the weighted label entropy of the split `x <= t` / `x > t`. NaN values are ignored.
pub fn optimal_threshold(
	column: ArrayView1<f32>,
	labels: ArrayView1<usize>,
	method: ThresholdMethod,
) -> f32 {
	let mut pairs: Vec<(f32, usize)> = column
		.iter()
		.cloned()
		.zip(labels.iter().cloned())
		.filter(|(value, _)| !value.is_nan())
		.collect();
	if pairs.is_empty() {
		return 0.0;
	}
	pairs.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal));
	// cumulative (count, positives) at the end of each distinct value
	let mut values: Vec<f32> = Vec::new();
	let mut cumulative: Vec<(usize, usize)> = Vec::new();
	let (mut count, mut positives) = (0, 0);
	for (index, (value, label)) in pairs.iter().enumerate() {
		count += 1;
		if *label == 1 {
			positives += 1;
		}
		let is_last_of_value = pairs.get(index + 1).map(|next| next.0 > *value).unwrap_or(true);
		if is_last_of_value {
			values.push(*value);
			cumulative.push((count, positives));
		}
	}
	if values.len() == 1 {
		return values[0];
	}
	let (total, total_positives) = (count, positives);
	// candidate `i` splits after distinct value `i`
	let n_candidates = values.len() - 1;
	let split_entropy = |i: usize| -> f64 {
		let (left, left_positives) = cumulative[i];
		let (right, right_positives) = (total - left, total_positives - left_positives);
		(weighted_entropy(left, left_positives) + weighted_entropy(right, right_positives))
			/ total.to_f64().unwrap()
	};
	let best = match method {
		ThresholdMethod::Brute => {
			let mut best = 0;
			let mut best_entropy = split_entropy(0);
			for i in 1..n_candidates {
				let entropy = split_entropy(i);
				if entropy < best_entropy {
					best = i;
					best_entropy = entropy;
				}
			}
			best
		}
		ThresholdMethod::Bisect => {
			let (mut low, mut high) = (0, n_candidates - 1);
			while low < high {
				let mid = (low + high) / 2;
				if split_entropy(mid) <= split_entropy(mid + 1) {
					high = mid;
				} else {
					low = mid + 1;
				}
			}
			low
		}
	};
	let (low, high) = (values[best], values[best + 1]);
	let mid = low + (high - low) / 2.0;
	if mid < high {
		mid
	} else {
		low
	}
}

fn weighted_entropy(n: usize, positives: usize) -> f64 {
	if n == 0 {
		return 0.0;
	}
	let n = n.to_f64().unwrap();
	let p = positives.to_f64().unwrap() / n;
	let entropy = if p <= 0.0 || p >= 1.0 {
		0.0
	} else {
		-p * p.log2() - (1.0 - p) * (1.0 - p).log2()
	};
	n * entropy
}
