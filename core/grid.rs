/*!
This module expands option maps into parameter tuples and parameter tuples into the keys of an experiment.
*/

use crate::params::{DatasetId, GridKey, ParamTuple, ParamValue};
use itertools::iproduct;
use serde::{
	de::{MapAccess, Visitor},
	ser::SerializeMap,
	Deserialize, Deserializer, Serialize, Serializer,
};
use std::{collections::HashSet, fmt, hash::Hash};

/// An ordered mapping from parameter name to the values to try. Declaration order is kept, both when building one in code and when deserializing one from a config file.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct OptionMap {
	entries: Vec<(String, Vec<ParamValue>)>,
}

impl OptionMap {
	pub fn new() -> OptionMap {
		OptionMap::default()
	}

	/// Set the values of `name`, keeping its position if it is already present.
	pub fn with(mut self, name: &str, values: Vec<ParamValue>) -> OptionMap {
		self.insert(name, values);
		self
	}

	pub fn insert(&mut self, name: &str, values: Vec<ParamValue>) {
		match self.entries.iter_mut().find(|(entry_name, _)| entry_name == name) {
			Some(entry) => entry.1 = values,
			None => self.entries.push((name.to_owned(), values)),
		}
	}

	/// The union of two maps, where the values of `overrides` win. Names already present keep their position and new names are appended.
	pub fn merge(&self, overrides: &OptionMap) -> OptionMap {
		let mut merged = self.clone();
		for (name, values) in overrides.entries.iter() {
			merged.insert(name, values.clone());
		}
		merged
	}

	pub fn len(&self) -> usize {
		self.entries.len()
	}

	pub fn is_empty(&self) -> bool {
		self.entries.is_empty()
	}

	pub fn iter(&self) -> impl Iterator<Item = (&str, &[ParamValue])> {
		self
			.entries
			.iter()
			.map(|(name, values)| (name.as_str(), values.as_slice()))
	}
}

impl Serialize for OptionMap {
	fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
	where
		S: Serializer,
	{
		let mut map = serializer.serialize_map(Some(self.entries.len()))?;
		for (name, values) in self.entries.iter() {
			map.serialize_entry(name, values)?;
		}
		map.end()
	}
}

impl<'de> Deserialize<'de> for OptionMap {
	fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
	where
		D: Deserializer<'de>,
	{
		struct OptionMapVisitor;
		impl<'de> Visitor<'de> for OptionMapVisitor {
			type Value = OptionMap;
			fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
				formatter.write_str("a map from parameter names to lists of values")
			}
			fn visit_map<A>(self, mut access: A) -> Result<OptionMap, A::Error>
			where
				A: MapAccess<'de>,
			{
				let mut options = OptionMap::new();
				while let Some((name, values)) = access.next_entry::<String, Vec<ParamValue>>()? {
					options.insert(&name, values);
				}
				Ok(options)
			}
		}
		deserializer.deserialize_map(OptionMapVisitor)
	}
}

/**
Build one parameter tuple per element of the cross product of the options, in row major order over the declared names, each starting with `prefix`.

An option with no values yields no tuples. A map with no options yields the single tuple holding only the prefix.
*/
pub fn dict_product(prefix: &str, options: &OptionMap) -> Vec<ParamTuple> {
	options
		.entries
		.iter()
		.fold(vec![ParamTuple::new(prefix)], |tuples, (name, values)| {
			tuples
				.iter()
				.flat_map(|tuple| {
					values
						.iter()
						.map(move |value| tuple.clone().with(name, value.clone()))
				})
				.collect()
		})
}

/// Keep the first occurrence of every distinct item.
pub fn dedup_preserving_order<T, I>(items: I) -> Vec<T>
where
	T: Clone + Eq + Hash,
	I: IntoIterator<Item = T>,
{
	let mut seen = HashSet::new();
	items
		.into_iter()
		.filter(|item| seen.insert(item.clone()))
		.collect()
}

/// A set of datasets crossed with a set of parameter tuples.
#[derive(Clone, Debug, PartialEq)]
pub struct GridGroup {
	pub datasets: Vec<DatasetId>,
	pub params: Vec<ParamTuple>,
}

/// The whole space of an experiment. Every group is crossed with the folds `0..n_splits`.
#[derive(Clone, Debug, PartialEq)]
pub struct ExperimentGrid {
	pub n_splits: u64,
	pub groups: Vec<GridGroup>,
}

impl ExperimentGrid {
	/// The keys of each group in `fold, dataset, params` order, deduplicated within the group.
	pub fn group_keys(&self) -> Vec<Vec<GridKey>> {
		self
			.groups
			.iter()
			.map(|group| {
				dedup_preserving_order(
					iproduct!(0..self.n_splits, group.datasets.iter(), group.params.iter()).map(
						|(fold, dataset, params)| GridKey {
							fold,
							dataset: dataset.clone(),
							params: params.clone(),
						},
					),
				)
			})
			.collect()
	}
}

#[cfg(test)]
mod test {
	use super::*;

	fn base() -> OptionMap {
		OptionMap::new()
			.with("score_set", vec![ParamValue::Ints(vec![-3, -2, -1, 1, 2, 3])])
			.with("lookahead", vec![ParamValue::Int(1)])
			.with("method", vec![ParamValue::str("bisect")])
			.with(
				"stage_clf_params",
				vec![ParamValue::pair("calibration_method", ParamValue::str("isotonic"))],
			)
	}

	#[test]
	fn test_dict_product_cardinality() {
		let calib = base().merge(&OptionMap::new().with(
			"stage_clf_params",
			["isotonic", "sigmoid", "beta", "beta_reg"]
				.iter()
				.map(|method| ParamValue::pair("calibration_method", ParamValue::str(method)))
				.collect(),
		));
		let tuples = dict_product("psl", &calib);
		assert_eq!(tuples.len(), 4);
		assert!(tuples.iter().all(|tuple| tuple.tag == "psl"));
		assert_eq!(dedup_preserving_order(tuples.clone()).len(), 4);
		let names: Vec<&str> = tuples[0].params.iter().map(|(name, _)| name.as_str()).collect();
		assert_eq!(names, vec!["score_set", "lookahead", "method", "stage_clf_params"]);
		insta::assert_snapshot!(tuples[3].to_string(), @"(psl, score_set=(-3, -2, -1, 1, 2, 3), lookahead=1, method=bisect, stage_clf_params=(calibration_method, beta_reg))");
	}

	#[test]
	fn test_dict_product_order() {
		let options = OptionMap::new()
			.with("a", vec![ParamValue::Int(1), ParamValue::Int(2)])
			.with("b", vec![ParamValue::str("x"), ParamValue::str("y")]);
		let tuples: Vec<String> = dict_product("t", &options)
			.iter()
			.map(|tuple| tuple.to_string())
			.collect();
		assert_eq!(tuples, vec!["(t, a=1, b=x)", "(t, a=1, b=y)", "(t, a=2, b=x)", "(t, a=2, b=y)"]);
	}

	#[test]
	fn test_dict_product_edge_cases() {
		assert_eq!(dict_product("dt", &OptionMap::new()), vec![ParamTuple::new("dt")]);
		let empty = OptionMap::new().with("a", vec![ParamValue::Int(1)]).with("b", vec![]);
		assert!(dict_product("dt", &empty).is_empty());
	}

	#[test]
	fn test_merge_keeps_position() {
		let merged = base().merge(
			&OptionMap::new()
				.with("stage_loss", vec![ParamValue::str("soft_ranking_loss")])
				.with("method", vec![ParamValue::str("bisect"), ParamValue::str("brute")]),
		);
		let names: Vec<&str> = merged.iter().map(|(name, _)| name).collect();
		assert_eq!(names, vec!["score_set", "lookahead", "method", "stage_clf_params", "stage_loss"]);
		assert_eq!(dict_product("psl", &merged).len(), 2);
	}

	#[test]
	fn test_dedup_preserving_order() {
		assert_eq!(dedup_preserving_order(vec![3, 1, 3, 2, 1]), vec![3, 1, 2]);
	}

	#[test]
	fn test_group_keys() {
		let dt = dict_product(
			"dt",
			&OptionMap::new()
				.with("criterion", vec![ParamValue::str("entropy")])
				.with("max_depth", vec![ParamValue::Int(5)]),
		);
		let grid = ExperimentGrid {
			n_splits: 2,
			groups: vec![GridGroup {
				datasets: vec![DatasetId::from("thorax"), DatasetId::from(41945u64)],
				params: [dt.clone(), dt].concat(),
			}],
		};
		let keys = grid.group_keys();
		assert_eq!(keys.len(), 1);
		assert_eq!(keys[0].len(), 4);
		assert_eq!(keys[0][0].fold, 0);
		assert_eq!(keys[0][1].dataset, DatasetId::Code(41945));
		assert_eq!(keys[0][2].fold, 1);
	}

	#[test]
	fn test_deserialize_preserves_order() {
		let options: OptionMap = serde_yaml::from_str("z: [1]\na: [x, y]\nm: [[-1, 1]]\n").unwrap();
		let names: Vec<&str> = options.iter().map(|(name, _)| name).collect();
		assert_eq!(names, vec!["z", "a", "m"]);
		assert_eq!(options.iter().nth(2).unwrap().1, &[ParamValue::Ints(vec![-1, 1])][..]);
	}
}
