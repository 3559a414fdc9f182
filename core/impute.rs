use ndarray::prelude::*;
use pslab_dataframe::MISSING_VALUE;
use pslab_metrics::{Metric, Mode};

/// Replaces missing values, coded as `-1` or NaN, with the most frequent observed value of the column. Ties go to the smallest value and a column without observed values is filled with `0`.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MostFrequentImputer {
	pub fill_values: Vec<f32>,
}

fn is_missing(value: f32) -> bool {
	value.is_nan() || value == MISSING_VALUE
}

impl MostFrequentImputer {
	pub fn fit(features: ArrayView2<f32>) -> MostFrequentImputer {
		let fill_values = features
			.axis_iter(Axis(1))
			.map(|column| {
				let observed: Vec<f32> = column.iter().cloned().filter(|value| !is_missing(*value)).collect();
				Mode::compute(observed.as_slice()).unwrap_or(0.0)
			})
			.collect();
		MostFrequentImputer { fill_values }
	}

	pub fn transform(&self, features: ArrayView2<f32>) -> Array2<f32> {
		let mut imputed = features.to_owned();
		for (mut column, fill_value) in imputed.axis_iter_mut(Axis(1)).zip(self.fill_values.iter()) {
			column.mapv_inplace(|value| if is_missing(value) { *fill_value } else { value });
		}
		imputed
	}
}

#[cfg(test)]
mod test {
	use super::*;

	#[test]
	fn test_imputer() {
		let features = arr2(&[
			[1.0, -1.0, 3.0],
			[-1.0, -1.0, 2.0],
			[1.0, -1.0, std::f32::NAN],
			[2.0, -1.0, 3.0],
			[2.0, -1.0, 2.0],
		]);
		let imputer = MostFrequentImputer::fit(features.view());
		assert_eq!(imputer.fill_values, vec![1.0, 0.0, 2.0]);
		let imputed = imputer.transform(features.view());
		assert_eq!(imputed.column(0), arr1(&[1.0, 1.0, 1.0, 2.0, 2.0]));
		assert_eq!(imputed.column(1), arr1(&[0.0; 5]));
		assert_eq!(imputed[[2, 2]], 2.0);
	}
}
