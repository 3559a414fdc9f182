/*!
This crate runs the experiment grid comparing probabilistic scoring lists with staged decision trees and baseline classifiers.

An experiment is a set of [`GridKey`](struct.GridKey.html)s, each a fold, a dataset, and a parameter tuple. The [`Driver`](struct.Driver.html) runs every key that the [`ResultStore`](trait.ResultStore.html) has no results for on a fixed size thread pool, and the [`ExperimentWorker`](struct.ExperimentWorker.html) fits and scores the pipeline the [`estimator_factory`](fn.estimator_factory.html) builds for the key. Because results are stored per key, an interrupted run picks up where it left off.
*/

#![allow(clippy::tabs_in_doc_comments)]

mod calibration_curves;
mod classifier;
mod config;
mod data;
mod driver;
mod error;
mod export;
mod factory;
mod greedy;
mod grid;
mod impute;
mod params;
mod results;
mod scoring;
mod split;
mod worker;

pub use self::calibration_curves::{
	calibration_curves, CalibrationCurves, CalibrationCurvesOptions, IsotonicCurve, ScoreCount,
};
pub use self::classifier::{
	Classifier, Stage, StagedClassifier, SupportsConfidenceInterval, VariantPipeline,
};
pub use self::config::{ExperimentConfig, GroupConfig, ProductConfig};
pub use self::data::{DataLoader, DatasetSource};
pub use self::driver::{Driver, Progress, RunSummary};
pub use self::error::ConfigError;
pub use self::export::write_csv;
pub use self::factory::{
	estimator_factory, ClassifierSpec, FittedClassifier, FittedPipeline, FittedPreprocessor,
	Pipeline, Preprocessor,
};
pub use self::greedy::{greedy_optimality, GreedyOptimality, GreedyOptimalityOptions, NodeId};
pub use self::grid::{
	dedup_preserving_order, dict_product, ExperimentGrid, GridGroup, OptionMap,
};
pub use self::impute::MostFrequentImputer;
pub use self::params::{DatasetId, GridKey, ParamTuple, ParamValue, ResultRecord, Variant};
pub use self::results::{FolderResultStore, ResultStore};
pub use self::scoring::{Partitions, Scoring};
pub use self::split::ShuffleSplit;
pub use self::worker::{ExperimentWorker, Worker};
pub use pslab_dataframe::Dataset;
