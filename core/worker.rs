use crate::{
	classifier::VariantPipeline,
	data::DatasetSource,
	factory::estimator_factory,
	params::{GridKey, ResultRecord, Variant},
	results::ResultStore,
	scoring::{Partitions, Scoring},
	split::ShuffleSplit,
};
use anyhow::Result;
use ndarray::prelude::*;
use std::{sync::Arc, time::Instant};

/// Runs the work for one grid key.
pub trait Worker: Send + Sync {
	fn run(&self, key: &GridKey) -> Result<()>;
}

/**
The `ExperimentWorker` fits the pipeline of a key on one shuffled train/test split and writes one record for the whole pipeline, one per stage of the fitted classifier, and for scoring lists one per stage and baseline variant.

Records are buffered and written once at the end, so a key either has all of its records or none of them.
*/
pub struct ExperimentWorker {
	pub store: Arc<dyn ResultStore>,
	pub source: Arc<dyn DatasetSource>,
	pub scoring: Scoring,
	pub test_fraction: f64,
}

impl Worker for ExperimentWorker {
	fn run(&self, key: &GridKey) -> Result<()> {
		self.store.register_run(key)?;
		let start = Instant::now();
		let records = self.compute_records(key)?;
		self.store.write_results(key, &records)?;
		tracing::info!(
			%key,
			n_records = records.len(),
			elapsed_secs = start.elapsed().as_secs_f64(),
			"finished key"
		);
		Ok(())
	}
}

impl ExperimentWorker {
	pub fn compute_records(&self, key: &GridKey) -> Result<Vec<ResultRecord>> {
		let dataset = self.source.load(&key.dataset)?;
		let pipeline = estimator_factory(&key.params)?;
		let (train, test) = ShuffleSplit {
			test_fraction: self.test_fraction,
			seed: key.fold,
		}
		.split(dataset.features.nrows());
		let features_train = dataset.features.select(Axis(0), &train);
		let labels_train = dataset.labels.select(Axis(0), &train);
		let features_test = dataset.features.select(Axis(0), &test);
		let labels_test = dataset.labels.select(Axis(0), &test);
		tracing::debug!(%key, n_train = train.len(), n_test = test.len(), "split dataset");

		let fit_start = Instant::now();
		let fitted = pipeline.fit(features_train.view(), labels_train.view());
		let fit_time = fit_start.elapsed().as_secs_f64();

		let mut records = Vec::new();

		// the whole pipeline on the raw features
		let score_start = Instant::now();
		let mut metrics = self.scoring.score_partitions(
			&fitted,
			&Partitions {
				features_train: features_train.view(),
				labels_train: labels_train.view(),
				features_test: features_test.view(),
				labels_test: labels_test.view(),
			},
		);
		let score_time = score_start.elapsed().as_secs_f64();

		// the fitted classifier and its stages on the transformed features
		let transformed_train = fitted.transform(features_train.view());
		let transformed_test = fitted.transform(features_test.view());
		let transformed = Partitions {
			features_train: transformed_train.view(),
			labels_train: labels_train.view(),
			features_test: transformed_test.view(),
			labels_test: labels_test.view(),
		};
		metrics.append(
			&mut self
				.scoring
				.score_conservative_partitions(fitted.classifier.as_classifier(), &transformed),
		);
		metrics.insert("fit_time".to_owned(), fit_time);
		metrics.insert("score_time".to_owned(), score_time);
		records.push(ResultRecord {
			stage: None,
			clf_variant: None,
			metrics,
		});

		for stage in fitted.classifier().stages() {
			let stage_metrics = self
				.scoring
				.score_partitions(stage.classifier.as_ref(), &transformed);
			records.push(ResultRecord {
				stage: Some(stage.index),
				clf_variant: None,
				metrics: stage_metrics.clone(),
			});
			if pipeline.has_variants() {
				for variant in Variant::ALL.iter() {
					let variant_metrics = if stage.index == 0 {
						// Stage 0 has no features, so the stage itself stands in for every baseline.
						stage_metrics.clone()
					} else {
						let (variant_train, variant_test) = transformed.select_columns(&stage.features);
						let model = VariantPipeline::fit(
							*variant,
							variant_train.view(),
							labels_train.view(),
							key.fold,
						);
						self.scoring.score_partitions(
							&model,
							&Partitions {
								features_train: variant_train.view(),
								labels_train: labels_train.view(),
								features_test: variant_test.view(),
								labels_test: labels_test.view(),
							},
						)
					};
					records.push(ResultRecord {
						stage: Some(stage.index),
						clf_variant: Some(*variant),
						metrics: variant_metrics,
					});
				}
			}
		}
		Ok(records)
	}
}

#[cfg(test)]
mod test {
	use super::*;
	use crate::{
		driver::Driver,
		factory::FittedClassifier,
		grid::{ExperimentGrid, GridGroup},
		params::{DatasetId, ParamTuple, ParamValue},
		results::test::MemoryResultStore,
	};
	use pslab_dataframe::Dataset;

	struct InMemory(Dataset);

	impl DatasetSource for InMemory {
		fn load(&self, _dataset: &DatasetId) -> Result<Dataset> {
			Ok(Dataset {
				feature_names: self.0.feature_names.clone(),
				features: self.0.features.clone(),
				labels: self.0.labels.clone(),
			})
		}
	}

	fn dataset() -> Dataset {
		let n = 60;
		let mut features = Array2::zeros((n, 2));
		let mut labels = Array1::zeros(n);
		for i in 0..n {
			let a = (i % 2) as f32;
			let b = ((i / 2) % 3 == 0) as usize as f32;
			features[[i, 0]] = a;
			features[[i, 1]] = b;
			// mostly determined by the first feature, flipped every seventh row
			let label = if i % 7 == 0 { 1 - i % 2 } else { i % 2 };
			labels[i] = label;
		}
		Dataset {
			feature_names: vec!["a".to_owned(), "b".to_owned()],
			features,
			labels,
		}
	}

	fn worker(store: Arc<MemoryResultStore>) -> ExperimentWorker {
		ExperimentWorker {
			store,
			source: Arc::new(InMemory(dataset())),
			scoring: Scoring::default(),
			test_fraction: 0.33,
		}
	}

	fn dt_params() -> ParamTuple {
		ParamTuple::new("dt")
			.with("criterion", ParamValue::str("entropy"))
			.with("max_depth", ParamValue::Int(2))
	}

	/// The number of stages of the tree fitted on the training rows of `fold`.
	fn n_tree_stages(params: &ParamTuple, fold: u64) -> usize {
		let dataset = dataset();
		let (train, _) = ShuffleSplit {
			test_fraction: 0.33,
			seed: fold,
		}
		.split(dataset.features.nrows());
		let fitted = estimator_factory(params).unwrap().fit(
			dataset.features.select(Axis(0), &train).view(),
			dataset.labels.select(Axis(0), &train).view(),
		);
		match fitted.classifier {
			FittedClassifier::StagedTree(tree) => tree.n_stages(),
			FittedClassifier::Psl(_) => unreachable!(),
		}
	}

	#[test]
	fn test_dt_records() {
		let store = Arc::new(MemoryResultStore::default());
		let key = GridKey {
			fold: 3,
			dataset: DatasetId::from("thorax"),
			params: dt_params(),
		};
		worker(store.clone()).run(&key).unwrap();
		assert_eq!(*store.registered.lock().unwrap(), vec![key.clone()]);
		let results = store.results.lock().unwrap();
		assert_eq!(results.len(), 1);
		let records = &results[0].1;
		let whole = &records[0];
		assert_eq!(whole.stage, None);
		assert!(whole.metrics.contains_key("fit_time"));
		assert!(whole.metrics.contains_key("score_time"));
		assert!(whole.metrics.contains_key("test_wloss"));
		assert!(!whole.metrics.contains_key("test_conservative_wloss95"));
		let n_stages = n_tree_stages(&key.params, key.fold);
		assert!(n_stages > 1);
		assert_eq!(records.len(), 1 + n_stages);
		let stages: Vec<Option<usize>> = records[1..].iter().map(|record| record.stage).collect();
		let expected: Vec<Option<usize>> = (0..n_stages).map(Some).collect();
		assert_eq!(stages, expected);
		assert!(records.iter().all(|record| record.clf_variant.is_none()));
		assert!(records.iter().all(|record| record.metrics.contains_key("train_acc")));
	}

	#[test]
	fn test_psl_records() {
		let store = Arc::new(MemoryResultStore::default());
		let key = GridKey {
			fold: 0,
			dataset: DatasetId::from(41945u64),
			params: ParamTuple::new("psl")
				.with("score_set", ParamValue::Ints(vec![-1, 1, 2]))
				.with("lookahead", ParamValue::Int(1))
				.with(
					"stage_clf_params",
					ParamValue::pair("calibration_method", ParamValue::str("isotonic")),
				),
		};
		let records = worker(store.clone()).compute_records(&key).unwrap();
		// the whole pipeline, then for each of the 3 stages the stage itself and four variants
		assert_eq!(records.len(), 1 + 3 * 5);
		assert!(records[0].metrics.contains_key("test_conservative_wloss95"));
		assert!(records[0].metrics.contains_key("train_conservative_wloss5"));
		for stage in 0..3 {
			let stage_records: Vec<&ResultRecord> = records
				.iter()
				.filter(|record| record.stage == Some(stage))
				.collect();
			assert_eq!(stage_records.len(), 5);
			let variants: Vec<Option<Variant>> =
				stage_records.iter().map(|record| record.clf_variant).collect();
			assert_eq!(
				variants,
				vec![
					None,
					Some(Variant::Logreg),
					Some(Variant::LogregUnregularized),
					Some(Variant::Xgboost),
					Some(Variant::RandomForest),
				]
			);
			let stage_record = stage_records[0];
			assert!(stage_record.metrics.contains_key("test_conservative_wloss50"));
			if stage == 0 {
				for variant_record in &stage_records[1..] {
					assert_eq!(variant_record.metrics, stage_record.metrics);
				}
			} else {
				for variant_record in &stage_records[1..] {
					assert!(variant_record.metrics.contains_key("test_roc"));
					assert!(!variant_record.metrics.contains_key("test_conservative_wloss50"));
				}
			}
		}
		// nothing is written by compute_records alone
		assert!(store.results.lock().unwrap().is_empty());
	}

	#[test]
	fn test_driver_runs_worker_end_to_end() {
		let store = Arc::new(MemoryResultStore::default());
		let grid = ExperimentGrid {
			n_splits: 1,
			groups: vec![GridGroup {
				datasets: vec![DatasetId::from("thorax")],
				params: vec![dt_params()],
			}],
		};
		let driver = Driver {
			n_jobs: 1,
			store: store.clone(),
		};
		let summary = driver
			.run(&grid, Arc::new(worker(store.clone())), &mut |_| {})
			.unwrap();
		assert_eq!(summary.n_candidates, 1);
		assert_eq!(summary.n_completed, 1);
		assert!(summary.failures.is_empty());
		let registered = store.registered.lock().unwrap().clone();
		assert_eq!(registered.len(), 1);
		let key = &registered[0];
		assert!(!store.is_unprocessed(key).unwrap());
		let results = store.results.lock().unwrap();
		assert_eq!(results.len(), 1);
		let records = &results[0].1;
		let n_whole = records.iter().filter(|record| record.stage.is_none()).count();
		let n_stage = records.iter().filter(|record| record.stage.is_some()).count();
		assert_eq!(n_whole, 1);
		assert_eq!(n_stage, n_tree_stages(&key.params, key.fold));
	}
}
