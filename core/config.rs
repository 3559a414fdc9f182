/*!
This module defines the `ExperimentConfig` struct, which describes an experiment: where datasets and results live, how keys are scored, and which parameter tuples are crossed with which datasets.

A config file is YAML, or JSON if its extension is `.json`. Every field has a default, and [`ExperimentConfig::reference`] builds the configuration of the published experiment.

```yaml
n_splits: 100
option_sets:
  base:
    score_set: [[-3, -2, -1, 1, 2, 3]]
    lookahead: [1]
    method: [bisect]
    stage_clf_params: [[calibration_method, isotonic]]
groups:
  - datasets: [thorax, 41945]
    products:
      - prefix: psl
        merge: [base]
        options:
          method: [bisect, brute]
```
*/

use crate::{
	grid::{dedup_preserving_order, dict_product, ExperimentGrid, GridGroup, OptionMap},
	params::{DatasetId, ParamValue},
	scoring::Scoring,
};
use anyhow::{format_err, Context, Result};
use serde::{Deserialize, Serialize};
use std::{
	collections::BTreeMap,
	path::{Path, PathBuf},
};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExperimentConfig {
	pub result_folder: PathBuf,
	pub data_folder: PathBuf,
	/// The label column of every dataset. The last column is used when this is not set.
	pub target_column: Option<String>,
	pub n_jobs: usize,
	pub n_splits: u64,
	pub test_fraction: f64,
	pub cost_ratio: f32,
	pub confidence_levels: Vec<u32>,
	/// Named option maps that products can merge, in order, before their own options.
	pub option_sets: BTreeMap<String, OptionMap>,
	pub groups: Vec<GroupConfig>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GroupConfig {
	pub datasets: Vec<DatasetId>,
	pub products: Vec<ProductConfig>,
}

/// One call to [`dict_product`]: the options are the named sets in `merge` unioned left to right, then `options`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProductConfig {
	pub prefix: String,
	#[serde(default)]
	pub merge: Vec<String>,
	#[serde(default)]
	pub options: OptionMap,
}

impl Default for ExperimentConfig {
	fn default() -> Self {
		let scoring = Scoring::default();
		ExperimentConfig {
			result_folder: PathBuf::from("results"),
			data_folder: PathBuf::from("data"),
			target_column: None,
			n_jobs: 12,
			n_splits: 100,
			test_fraction: 0.33,
			cost_ratio: scoring.cost_ratio,
			confidence_levels: scoring.confidence_levels,
			option_sets: BTreeMap::new(),
			groups: Vec::new(),
		}
	}
}

impl ExperimentConfig {
	pub fn from_path(path: &Path) -> Result<ExperimentConfig> {
		let config = std::fs::read_to_string(path)
			.with_context(|| format!("failed to read config file {}", path.display()))?;
		let is_json = path.extension().map(|extension| extension == "json").unwrap_or(false);
		let config = if is_json {
			serde_json::from_str(&config).map_err(anyhow::Error::from)
		} else {
			serde_yaml::from_str(&config).map_err(anyhow::Error::from)
		};
		config.with_context(|| format!("failed to parse config file {}", path.display()))
	}

	/// The grid of the published experiment: three small datasets with the full parameter space and two larger datasets with the calibration and score set comparisons.
	pub fn reference() -> ExperimentConfig {
		let calibration_method = |method: &str| ParamValue::pair("calibration_method", ParamValue::str(method));
		let strs = |values: &[&str]| values.iter().map(|value| ParamValue::str(value)).collect();
		let base = OptionMap::new()
			.with("score_set", vec![ParamValue::Ints(vec![-3, -2, -1, 1, 2, 3])])
			.with("lookahead", vec![ParamValue::Int(1)])
			.with("method", strs(&["bisect"]))
			.with("stage_clf_params", vec![calibration_method("isotonic")]);
		let calib = OptionMap::new().with(
			"stage_clf_params",
			["isotonic", "sigmoid", "beta", "beta_reg"]
				.iter()
				.map(|method| calibration_method(method))
				.collect(),
		);
		let wide: Vec<i64> = (-50..0).chain(1..51).collect();
		let scoreset = OptionMap::new().with(
			"score_set",
			vec![
				ParamValue::Ints(vec![-3, -2, -1, 1, 2, 3]),
				ParamValue::Ints(vec![-2, -1, 1, 2]),
				ParamValue::Ints(vec![-1, 1]),
				ParamValue::Ints(wide),
			],
		);
		let dt = OptionMap::new()
			.with("criterion", strs(&["entropy"]))
			.with("max_depth", vec![ParamValue::Int(5)]);
		let product = |prefix: &str, merge: &[&str], options: OptionMap| ProductConfig {
			prefix: prefix.to_owned(),
			merge: merge.iter().map(|name| (*name).to_owned()).collect(),
			options,
		};
		let methods = OptionMap::new().with("method", strs(&["bisect", "brute"]));
		let soft_ranking = OptionMap::new().with("stage_loss", strs(&["soft_ranking_loss"]));
		let orig = GroupConfig {
			datasets: vec![
				DatasetId::from("thorax"),
				DatasetId::from(41945u64),
				DatasetId::from(42900u64),
			],
			products: vec![
				product("psl", &["base"], methods.clone()),
				product("psl_prebin", &["base"], methods),
				product("psl", &["base", "calib"], OptionMap::new()),
				product("psl_prebin", &["base", "calib"], OptionMap::new()),
				product("psl", &["base", "scoreset"], OptionMap::new()),
				product("psl_prebin", &["base", "scoreset"], OptionMap::new()),
				product("psl", &["base"], soft_ranking),
				product("dt", &["dt"], OptionMap::new()),
			],
		};
		let new = GroupConfig {
			datasets: vec![
				DatasetId::from("ACSIncome"),
				DatasetId::from("cali_housing_binary"),
			],
			products: vec![
				product("psl", &["base", "calib"], OptionMap::new()),
				product("psl_prebin", &["base", "calib"], OptionMap::new()),
				product("psl", &["base", "scoreset"], OptionMap::new()),
				product("psl_prebin", &["base", "scoreset"], OptionMap::new()),
				product("dt", &["dt"], OptionMap::new()),
			],
		};
		let mut option_sets = BTreeMap::new();
		option_sets.insert("base".to_owned(), base);
		option_sets.insert("calib".to_owned(), calib);
		option_sets.insert("scoreset".to_owned(), scoreset);
		option_sets.insert("dt".to_owned(), dt);
		ExperimentConfig {
			option_sets,
			groups: vec![orig, new],
			..Default::default()
		}
	}

	/// Expand every group's products into parameter tuples. Tuples repeated across products of a group are kept once, at their first position.
	pub fn grid(&self) -> Result<ExperimentGrid> {
		let groups = self
			.groups
			.iter()
			.map(|group| {
				let mut params = Vec::new();
				for product in group.products.iter() {
					let mut options = OptionMap::new();
					for name in product.merge.iter() {
						let set = self
							.option_sets
							.get(name)
							.ok_or_else(|| format_err!("unknown option set {:?} in product {}", name, product.prefix))?;
						options = options.merge(set);
					}
					options = options.merge(&product.options);
					params.extend(dict_product(&product.prefix, &options));
				}
				Ok(GridGroup {
					datasets: group.datasets.clone(),
					params: dedup_preserving_order(params),
				})
			})
			.collect::<Result<Vec<_>>>()?;
		Ok(ExperimentGrid {
			n_splits: self.n_splits,
			groups,
		})
	}

	pub fn scoring(&self) -> Scoring {
		Scoring {
			cost_ratio: self.cost_ratio,
			confidence_levels: self.confidence_levels.clone(),
		}
	}
}
