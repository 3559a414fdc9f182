/*!
This module turns a [`ParamTuple`](../params/struct.ParamTuple.html) into an unfitted [`Pipeline`](struct.Pipeline.html). Every pipeline imputes missing values, optionally binarizes the features, and ends in a staged classifier.
*/

use crate::{
	classifier::{Classifier, StagedClassifier},
	error::ConfigError,
	impute::MostFrequentImputer,
	params::{ParamTuple, ParamValue},
};
use ndarray::prelude::*;
use num_traits::ToPrimitive;
use pslab_psl::{
	CalibrationMethod, MinEntropyBinarizer, ProbabilisticScoringList, PslOptions, StageLoss,
	ThresholdMethod,
};
use pslab_tree::{Criterion, StagedDecisionTree};

#[derive(Clone, Debug, PartialEq)]
pub struct Pipeline {
	pub imputer: MostFrequentImputer,
	pub preprocessor: Preprocessor,
	pub classifier: ClassifierSpec,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Preprocessor {
	Identity,
	Binarizer(ThresholdMethod),
}

#[derive(Clone, Debug)]
pub enum ClassifierSpec {
	Psl(PslOptions),
	StagedTree(pslab_tree::TrainOptions),
}

impl PartialEq for ClassifierSpec {
	fn eq(&self, other: &ClassifierSpec) -> bool {
		match (self, other) {
			(ClassifierSpec::Psl(a), ClassifierSpec::Psl(b)) => a == b,
			(ClassifierSpec::StagedTree(a), ClassifierSpec::StagedTree(b)) => {
				a.criterion == b.criterion
					&& a.max_depth == b.max_depth
					&& a.min_examples_per_leaf == b.min_examples_per_leaf
			}
			_ => false,
		}
	}
}

/// Build the pipeline described by `params`.
pub fn estimator_factory(params: &ParamTuple) -> Result<Pipeline, ConfigError> {
	let classifier = params.tag.as_str();
	let kwargs = expand_kwargs(params);
	let (preprocessor, classifier) = match classifier {
		"psl_prebin" => {
			let method = match kwargs.iter().find(|(name, _)| name == "method") {
				Some((_, value)) => parse_threshold_method("method", value)?,
				None => {
					return Err(ConfigError::MissingParameter {
						classifier: classifier.to_owned(),
						name: "method".to_owned(),
					})
				}
			};
			let kwargs: Vec<(String, Kwarg)> =
				kwargs.into_iter().filter(|(name, _)| name != "method").collect();
			(
				Preprocessor::Binarizer(method),
				ClassifierSpec::Psl(parse_psl_options(classifier, &kwargs)?),
			)
		}
		"psl" => (
			Preprocessor::Identity,
			ClassifierSpec::Psl(parse_psl_options(classifier, &kwargs)?),
		),
		"dt" => (
			Preprocessor::Identity,
			ClassifierSpec::StagedTree(parse_tree_options(classifier, &kwargs)?),
		),
		_ => return Err(ConfigError::UnknownClassifier(classifier.to_owned())),
	};
	Ok(Pipeline {
		imputer: MostFrequentImputer::default(),
		preprocessor,
		classifier,
	})
}

/// A keyword argument after expansion. A `Pair(name, value)` value becomes the one entry mapping `{name: value}`.
#[derive(Clone, Debug, PartialEq)]
enum Kwarg {
	Value(ParamValue),
	Mapping(Vec<(String, ParamValue)>),
}

impl std::fmt::Display for Kwarg {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			Kwarg::Value(value) => write!(f, "{}", value),
			Kwarg::Mapping(entries) => {
				let entries: Vec<String> = entries
					.iter()
					.map(|(name, value)| format!("{}: {}", name, value))
					.collect();
				write!(f, "{{{}}}", entries.join(", "))
			}
		}
	}
}

fn expand_kwargs(params: &ParamTuple) -> Vec<(String, Kwarg)> {
	params
		.params
		.iter()
		.map(|(name, value)| {
			let kwarg = match value {
				ParamValue::Pair(key, value) => Kwarg::Mapping(vec![(key.clone(), (**value).clone())]),
				value => Kwarg::Value(value.clone()),
			};
			(name.clone(), kwarg)
		})
		.collect()
}

fn invalid(name: &str, value: &Kwarg, reason: &str) -> ConfigError {
	let value = match value {
		Kwarg::Value(value) => value.clone(),
		mapping => ParamValue::Str(mapping.to_string()),
	};
	ConfigError::InvalidParameter {
		name: name.to_owned(),
		value,
		reason: reason.to_owned(),
	}
}

fn parse_str<'a>(name: &str, value: &'a Kwarg) -> Result<&'a str, ConfigError> {
	match value {
		Kwarg::Value(ParamValue::Str(value)) => Ok(value),
		_ => Err(invalid(name, value, "expected a string")),
	}
}

fn parse_count(name: &str, value: &Kwarg, min: i64) -> Result<usize, ConfigError> {
	match value {
		Kwarg::Value(ParamValue::Int(count)) if *count >= min => {
			count.to_usize().ok_or_else(|| invalid(name, value, "out of range"))
		}
		_ => Err(invalid(name, value, &format!("expected an integer of at least {}", min))),
	}
}

fn parse_threshold_method(name: &str, value: &Kwarg) -> Result<ThresholdMethod, ConfigError> {
	match parse_str(name, value)? {
		"bisect" => Ok(ThresholdMethod::Bisect),
		"brute" => Ok(ThresholdMethod::Brute),
		_ => Err(invalid(name, value, "expected bisect or brute")),
	}
}

fn parse_psl_options(classifier: &str, kwargs: &[(String, Kwarg)]) -> Result<PslOptions, ConfigError> {
	let mut options = PslOptions::default();
	let mut has_score_set = false;
	for (name, value) in kwargs.iter() {
		match name.as_str() {
			"score_set" => {
				options.score_set = match value {
					Kwarg::Value(ParamValue::Ints(scores)) if scores.iter().any(|score| *score != 0) => {
						scores.clone()
					}
					_ => return Err(invalid(name, value, "expected a list of integers with a non zero entry")),
				};
				has_score_set = true;
			}
			"lookahead" => options.lookahead = parse_count(name, value, 1)?,
			"method" => options.method = parse_threshold_method(name, value)?,
			"max_stages" => options.max_stages = Some(parse_count(name, value, 0)?),
			"stage_loss" => {
				options.stage_loss = match parse_str(name, value)? {
					"expected_entropy" => StageLoss::ExpectedEntropy,
					"soft_ranking_loss" => StageLoss::SoftRankingLoss,
					_ => return Err(invalid(name, value, "expected expected_entropy or soft_ranking_loss")),
				}
			}
			"stage_clf_params" => {
				let entries = match value {
					Kwarg::Mapping(entries) => entries,
					_ => return Err(invalid(name, value, "expected a (name, value) pair")),
				};
				for (key, entry) in entries.iter() {
					let qualified_name = format!("{}.{}", name, key);
					match key.as_str() {
						"calibration_method" => {
							let entry = Kwarg::Value(entry.clone());
							options.calibration_method = match parse_str(&qualified_name, &entry)? {
								"isotonic" => CalibrationMethod::Isotonic,
								"sigmoid" => CalibrationMethod::Sigmoid,
								"beta" => CalibrationMethod::Beta,
								"beta_reg" => CalibrationMethod::BetaReg,
								_ => {
									return Err(invalid(
										&qualified_name,
										&entry,
										"expected isotonic, sigmoid, beta or beta_reg",
									))
								}
							}
						}
						_ => {
							return Err(ConfigError::UnknownParameter {
								classifier: classifier.to_owned(),
								name: qualified_name,
							})
						}
					}
				}
			}
			_ => {
				return Err(ConfigError::UnknownParameter {
					classifier: classifier.to_owned(),
					name: name.clone(),
				})
			}
		}
	}
	if !has_score_set {
		return Err(ConfigError::MissingParameter {
			classifier: classifier.to_owned(),
			name: "score_set".to_owned(),
		});
	}
	Ok(options)
}

fn parse_tree_options(
	classifier: &str,
	kwargs: &[(String, Kwarg)],
) -> Result<pslab_tree::TrainOptions, ConfigError> {
	let mut options = pslab_tree::TrainOptions::default();
	for (name, value) in kwargs.iter() {
		match name.as_str() {
			"criterion" => {
				options.criterion = match parse_str(name, value)? {
					"entropy" => Criterion::Entropy,
					"gini" => Criterion::Gini,
					_ => return Err(invalid(name, value, "expected entropy or gini")),
				}
			}
			"max_depth" => options.max_depth = Some(parse_count(name, value, 0)?),
			"min_samples_leaf" => options.min_examples_per_leaf = parse_count(name, value, 1)?,
			_ => {
				return Err(ConfigError::UnknownParameter {
					classifier: classifier.to_owned(),
					name: name.clone(),
				})
			}
		}
	}
	Ok(options)
}

pub enum FittedPreprocessor {
	Identity,
	Binarizer(MinEntropyBinarizer),
}

pub enum FittedClassifier {
	Psl(ProbabilisticScoringList),
	StagedTree(StagedDecisionTree),
}

impl FittedClassifier {
	pub fn as_staged(&self) -> &dyn StagedClassifier {
		match self {
			FittedClassifier::Psl(psl) => psl,
			FittedClassifier::StagedTree(tree) => tree,
		}
	}

	pub fn as_classifier(&self) -> &dyn Classifier {
		match self {
			FittedClassifier::Psl(psl) => psl,
			FittedClassifier::StagedTree(tree) => tree,
		}
	}
}

/// A pipeline fitted on training data.
pub struct FittedPipeline {
	pub imputer: MostFrequentImputer,
	pub preprocessor: FittedPreprocessor,
	pub classifier: FittedClassifier,
}

impl Pipeline {
	/// Whether the stage-wise refit baselines are scored for this pipeline.
	pub fn has_variants(&self) -> bool {
		matches!(self.classifier, ClassifierSpec::Psl(_))
	}

	pub fn fit(&self, features: ArrayView2<f32>, labels: ArrayView1<usize>) -> FittedPipeline {
		let imputer = MostFrequentImputer::fit(features);
		let imputed = imputer.transform(features);
		let (preprocessor, transformed) = match &self.preprocessor {
			Preprocessor::Identity => (FittedPreprocessor::Identity, imputed),
			Preprocessor::Binarizer(method) => {
				let binarizer = MinEntropyBinarizer::fit(imputed.view(), labels, *method);
				let transformed = binarizer.transform(imputed.view());
				(FittedPreprocessor::Binarizer(binarizer), transformed)
			}
		};
		let classifier = match &self.classifier {
			ClassifierSpec::Psl(options) => FittedClassifier::Psl(ProbabilisticScoringList::fit(
				transformed.view(),
				labels,
				options,
			)),
			ClassifierSpec::StagedTree(options) => FittedClassifier::StagedTree(
				StagedDecisionTree::train(transformed.view(), labels, options),
			),
		};
		FittedPipeline {
			imputer,
			preprocessor,
			classifier,
		}
	}
}

impl FittedPipeline {
	/// Apply every step but the classifier.
	pub fn transform(&self, features: ArrayView2<f32>) -> Array2<f32> {
		let imputed = self.imputer.transform(features);
		match &self.preprocessor {
			FittedPreprocessor::Identity => imputed,
			FittedPreprocessor::Binarizer(binarizer) => binarizer.transform(imputed.view()),
		}
	}

	pub fn classifier(&self) -> &dyn StagedClassifier {
		self.classifier.as_staged()
	}
}

impl Classifier for FittedPipeline {
	fn predict_proba(&self, features: ArrayView2<f32>) -> Array1<f32> {
		self.classifier.as_classifier().predict_proba(self.transform(features).view())
	}
}

#[cfg(test)]
mod test {
	use super::*;

	fn psl_params(tag: &str) -> ParamTuple {
		ParamTuple::new(tag)
			.with("score_set", ParamValue::Ints(vec![-3, -2, -1, 1, 2, 3]))
			.with("lookahead", ParamValue::Int(1))
			.with("method", ParamValue::str("brute"))
			.with(
				"stage_clf_params",
				ParamValue::pair("calibration_method", ParamValue::str("beta_reg")),
			)
	}

	#[test]
	fn test_dispatch() {
		let pipeline = estimator_factory(&psl_params("psl_prebin")).unwrap();
		assert_eq!(pipeline.preprocessor, Preprocessor::Binarizer(ThresholdMethod::Brute));
		match &pipeline.classifier {
			ClassifierSpec::Psl(options) => {
				assert_eq!(options.calibration_method, CalibrationMethod::BetaReg);
				assert_eq!(options.method, ThresholdMethod::Bisect);
			}
			_ => panic!("expected a scoring list"),
		}
		assert!(pipeline.has_variants());

		let pipeline = estimator_factory(&psl_params("psl")).unwrap();
		assert_eq!(pipeline.preprocessor, Preprocessor::Identity);
		match &pipeline.classifier {
			ClassifierSpec::Psl(options) => assert_eq!(options.method, ThresholdMethod::Brute),
			_ => panic!("expected a scoring list"),
		}

		let params = ParamTuple::new("dt")
			.with("criterion", ParamValue::str("entropy"))
			.with("max_depth", ParamValue::Int(5));
		let pipeline = estimator_factory(&params).unwrap();
		assert_eq!(pipeline.preprocessor, Preprocessor::Identity);
		match &pipeline.classifier {
			ClassifierSpec::StagedTree(options) => {
				assert_eq!(options.criterion, Criterion::Entropy);
				assert_eq!(options.max_depth, Some(5));
			}
			_ => panic!("expected a staged tree"),
		}
		assert!(!pipeline.has_variants());
	}

	#[test]
	fn test_errors() {
		assert_eq!(
			estimator_factory(&ParamTuple::new("svm")),
			Err(ConfigError::UnknownClassifier("svm".to_owned()))
		);
		assert_eq!(
			estimator_factory(&ParamTuple::new("psl_prebin")),
			Err(ConfigError::MissingParameter {
				classifier: "psl_prebin".to_owned(),
				name: "method".to_owned(),
			})
		);
		assert_eq!(
			estimator_factory(&psl_params("psl").with("depth", ParamValue::Int(1))),
			Err(ConfigError::UnknownParameter {
				classifier: "psl".to_owned(),
				name: "depth".to_owned(),
			})
		);
		let error = estimator_factory(&ParamTuple::new("dt").with("criterion", ParamValue::str("mse")))
			.unwrap_err();
		insta::assert_snapshot!(error.to_string(), @"invalid value mse for parameter criterion: expected entropy or gini");
		let params = ParamTuple::new("psl")
			.with("score_set", ParamValue::Ints(vec![1]))
			.with("stage_clf_params", ParamValue::pair("calibration", ParamValue::str("beta")));
		assert_eq!(
			estimator_factory(&params),
			Err(ConfigError::UnknownParameter {
				classifier: "psl".to_owned(),
				name: "stage_clf_params.calibration".to_owned(),
			})
		);
	}

	#[test]
	fn test_fit_binarizes() {
		let features = Array2::from_shape_fn((20, 2), |(i, j)| match j {
			0 => i as f32,
			_ => if i % 4 == 0 { -1.0 } else { (i % 3) as f32 },
		});
		let labels = Array1::from_shape_fn(20, |i| if i >= 10 { 1 } else { 0 });
		let params = ParamTuple::new("psl_prebin")
			.with("score_set", ParamValue::Ints(vec![-1, 1, 2]))
			.with("method", ParamValue::str("bisect"));
		let pipeline = estimator_factory(&params).unwrap();
		let fitted = pipeline.fit(features.view(), labels.view());
		let transformed = fitted.transform(features.view());
		assert!(transformed.iter().all(|value| *value == 0.0 || *value == 1.0));
		assert_eq!(transformed.column(0).sum(), 10.0);
		let probabilities = fitted.predict_proba(features.view());
		assert!(probabilities[0] < 0.5 && probabilities[19] > 0.5);
	}
}
