/*!
This module defines the values a grid is made of. A [`GridKey`](struct.GridKey.html) identifies one unit of work: the fold that seeds the train/test split, the dataset, and the [`ParamTuple`](struct.ParamTuple.html) describing the classifier pipeline.
*/

use pslab_util::finite::Finite;
use serde::{Deserialize, Serialize};
use std::{collections::BTreeMap, fmt};

/// A single hyperparameter value. Values are totally ordered and hashable so that keys can be deduplicated and used as map keys.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
	Bool(bool),
	Int(i64),
	Float(Finite<f64>),
	Str(String),
	/// A score set.
	Ints(Vec<i64>),
	/// A nested keyword argument, such as `("calibration_method", "isotonic")`.
	Pair(String, Box<ParamValue>),
}

impl ParamValue {
	pub fn str(value: &str) -> ParamValue {
		ParamValue::Str(value.to_owned())
	}

	pub fn pair(name: &str, value: ParamValue) -> ParamValue {
		ParamValue::Pair(name.to_owned(), Box::new(value))
	}
}

impl fmt::Display for ParamValue {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			ParamValue::Bool(value) => write!(f, "{}", value),
			ParamValue::Int(value) => write!(f, "{}", value),
			ParamValue::Float(value) => write!(f, "{}", value),
			ParamValue::Str(value) => write!(f, "{}", value),
			ParamValue::Ints(values) => {
				let values: Vec<String> = values.iter().map(|value| value.to_string()).collect();
				write!(f, "({})", values.join(", "))
			}
			ParamValue::Pair(name, value) => write!(f, "({}, {})", name, value),
		}
	}
}

/// A classifier tag followed by named parameters in declaration order.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ParamTuple {
	pub tag: String,
	pub params: Vec<(String, ParamValue)>,
}

impl ParamTuple {
	pub fn new(tag: &str) -> ParamTuple {
		ParamTuple {
			tag: tag.to_owned(),
			params: Vec::new(),
		}
	}

	pub fn with(mut self, name: &str, value: ParamValue) -> ParamTuple {
		self.params.push((name.to_owned(), value));
		self
	}

	pub fn get(&self, name: &str) -> Option<&ParamValue> {
		self
			.params
			.iter()
			.find(|(param_name, _)| param_name == name)
			.map(|(_, value)| value)
	}
}

impl fmt::Display for ParamTuple {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "({}", self.tag)?;
		for (name, value) in self.params.iter() {
			write!(f, ", {}={}", name, value)?;
		}
		write!(f, ")")
	}
}

/// Datasets are referred to by name or by a numeric dataset code.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DatasetId {
	Code(u64),
	Name(String),
}

impl fmt::Display for DatasetId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			DatasetId::Code(code) => write!(f, "{}", code),
			DatasetId::Name(name) => write!(f, "{}", name),
		}
	}
}

impl From<&str> for DatasetId {
	fn from(name: &str) -> DatasetId {
		DatasetId::Name(name.to_owned())
	}
}

impl From<u64> for DatasetId {
	fn from(code: u64) -> DatasetId {
		DatasetId::Code(code)
	}
}

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct GridKey {
	pub fold: u64,
	pub dataset: DatasetId,
	pub params: ParamTuple,
}

impl fmt::Display for GridKey {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "fold={} dataset={} params={}", self.fold, self.dataset, self.params)
	}
}

/// The stage-wise refit baselines scored next to every stage of a scoring list.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Variant {
	Logreg,
	LogregUnregularized,
	Xgboost,
	RandomForest,
}

impl Variant {
	pub const ALL: [Variant; 4] = [
		Variant::Logreg,
		Variant::LogregUnregularized,
		Variant::Xgboost,
		Variant::RandomForest,
	];

	pub fn name(&self) -> &'static str {
		match self {
			Variant::Logreg => "logreg",
			Variant::LogregUnregularized => "logreg_unregularized",
			Variant::Xgboost => "xgboost",
			Variant::RandomForest => "random_forest",
		}
	}
}

/// One row of results for a key. `stage` is `None` for the record of the whole pipeline.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ResultRecord {
	pub stage: Option<usize>,
	pub clf_variant: Option<Variant>,
	/// Undefined metrics, such as the ROC AUC of a single class partition, are NaN and stored as `null`.
	#[serde(with = "nan_as_null")]
	pub metrics: BTreeMap<String, f64>,
}

mod nan_as_null {
	use serde::{Deserialize, Deserializer, Serialize, Serializer};
	use std::collections::BTreeMap;

	pub fn serialize<S>(metrics: &BTreeMap<String, f64>, serializer: S) -> Result<S::Ok, S::Error>
	where
		S: Serializer,
	{
		metrics
			.iter()
			.map(|(name, value)| (name, if value.is_finite() { Some(*value) } else { None }))
			.collect::<BTreeMap<&String, Option<f64>>>()
			.serialize(serializer)
	}

	pub fn deserialize<'de, D>(deserializer: D) -> Result<BTreeMap<String, f64>, D::Error>
	where
		D: Deserializer<'de>,
	{
		let metrics = BTreeMap::<String, Option<f64>>::deserialize(deserializer)?;
		Ok(metrics
			.into_iter()
			.map(|(name, value)| (name, value.unwrap_or(std::f64::NAN)))
			.collect())
	}
}

#[cfg(test)]
mod test {
	use super::*;

	fn key() -> GridKey {
		GridKey {
			fold: 3,
			dataset: DatasetId::Code(41945),
			params: ParamTuple::new("psl")
				.with("score_set", ParamValue::Ints(vec![-1, 1]))
				.with("lookahead", ParamValue::Int(1))
				.with(
					"stage_clf_params",
					ParamValue::pair("calibration_method", ParamValue::str("isotonic")),
				),
		}
	}

	#[test]
	fn test_display() {
		insta::assert_snapshot!(key().to_string(), @"fold=3 dataset=41945 params=(psl, score_set=(-1, 1), lookahead=1, stage_clf_params=(calibration_method, isotonic))");
	}

	#[test]
	fn test_json() {
		let json = serde_json::to_string(&key()).unwrap();
		insta::assert_snapshot!(json, @r###"{"fold":3,"dataset":41945,"params":{"tag":"psl","params":[["score_set",[-1,1]],["lookahead",1],["stage_clf_params",["calibration_method","isotonic"]]]}}"###);
		let parsed: GridKey = serde_json::from_str(&json).unwrap();
		assert_eq!(parsed, key());
	}

	#[test]
	fn test_record_nan_round_trips_through_null() {
		let mut metrics = BTreeMap::new();
		metrics.insert("test_roc".to_owned(), std::f64::NAN);
		metrics.insert("test_acc".to_owned(), 0.5);
		let record = ResultRecord {
			stage: Some(2),
			clf_variant: Some(Variant::LogregUnregularized),
			metrics,
		};
		let json = serde_json::to_string(&record).unwrap();
		insta::assert_snapshot!(json, @r###"{"stage":2,"clf_variant":"logreg_unregularized","metrics":{"test_acc":0.5,"test_roc":null}}"###);
		let parsed: ResultRecord = serde_json::from_str(&json).unwrap();
		assert!(parsed.metrics["test_roc"].is_nan());
	}

	#[test]
	fn test_untagged_values() {
		let values: Vec<ParamValue> = serde_json::from_str(r#"[true, 5, 0.5, "entropy", [1, 2], ["a", "b"]]"#).unwrap();
		assert_eq!(
			values,
			vec![
				ParamValue::Bool(true),
				ParamValue::Int(5),
				ParamValue::Float(Finite::new(0.5).unwrap()),
				ParamValue::str("entropy"),
				ParamValue::Ints(vec![1, 2]),
				ParamValue::pair("a", ParamValue::str("b")),
			]
		);
	}
}
