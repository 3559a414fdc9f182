use super::Metric;
use pslab_util::finite::Finite;
use std::collections::BTreeMap;

/// The most frequent finite value. Ties go to the smallest value. Non-finite values are ignored.
#[derive(Debug, Clone, Default)]
pub struct Mode;

impl<'a> Metric<'a> for Mode {
	type Input = &'a [f32];
	type Output = Option<f32>;

	fn compute(input: Self::Input) -> Self::Output {
		let mut histogram: BTreeMap<Finite<f32>, usize> = BTreeMap::new();
		for value in input.iter().filter_map(|value| Finite::new(*value).ok()) {
			*histogram.entry(value).or_insert(0) += 1;
		}
		// Iterating in increasing order and only replacing on a strictly higher count keeps the smallest of tied values.
		let mut mode: Option<(Finite<f32>, usize)> = None;
		for (value, count) in histogram {
			match mode {
				Some((_, best_count)) if best_count >= count => {}
				_ => mode = Some((value, count)),
			}
		}
		mode.map(|(value, _)| value.get())
	}
}

#[test]
fn test_mode() {
	assert_eq!(Mode::compute(&[3.0, 1.0, 3.0, 2.0]), Some(3.0));
	assert_eq!(Mode::compute(&[2.0, 1.0, 2.0, 1.0]), Some(1.0));
	assert_eq!(Mode::compute(&[std::f32::NAN]), None);
}
