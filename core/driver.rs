use crate::{
	grid::{dedup_preserving_order, ExperimentGrid},
	params::GridKey,
	results::ResultStore,
	worker::Worker,
};
use anyhow::Result;
use pslab_util::{progress_counter::ProgressCounter, thread_pool::ThreadPool};
use std::sync::Arc;

#[derive(Debug)]
pub enum Progress {
	/// Checking the result store for keys that were already processed.
	Filtering(ProgressCounter),
	/// Running the remaining keys. The counter counts finished keys, successful or not.
	Running(ProgressCounter),
}

/// What happened in one call to [`Driver::run`].
#[derive(Debug, Default)]
pub struct RunSummary {
	/// The number of distinct keys in the grid.
	pub n_candidates: usize,
	/// The number of keys skipped because their results were already written.
	pub n_skipped: usize,
	pub n_completed: usize,
	/// The keys whose worker returned an error or panicked. They stay unprocessed and run again next time.
	pub failures: Vec<(GridKey, String)>,
}

/// Runs every unprocessed key of a grid exactly once on a pool of `n_jobs` threads.
pub struct Driver {
	pub n_jobs: usize,
	pub store: Arc<dyn ResultStore>,
}

impl Driver {
	pub fn run(
		&self,
		grid: &ExperimentGrid,
		worker: Arc<dyn Worker>,
		update_progress: &mut dyn FnMut(Progress),
	) -> Result<RunSummary> {
		// Groups may overlap, so keys are deduplicated across the whole grid.
		let candidates = dedup_preserving_order(grid.group_keys().into_iter().flatten());
		let n_candidates = candidates.len();
		let progress_counter = ProgressCounter::new(n_candidates as u64);
		update_progress(Progress::Filtering(progress_counter.clone()));
		let mut keys = Vec::new();
		for key in candidates {
			if self.store.is_unprocessed(&key)? {
				keys.push(key);
			}
			progress_counter.inc(1);
		}
		let n_skipped = n_candidates - keys.len();
		tracing::info!(
			n_candidates,
			n_skipped,
			n_remaining = keys.len(),
			n_jobs = self.n_jobs,
			"starting grid"
		);

		let progress_counter = ProgressCounter::new(keys.len() as u64);
		update_progress(Progress::Running(progress_counter.clone()));
		let pool = ThreadPool::new(self.n_jobs);
		let mut summary = RunSummary {
			n_candidates,
			n_skipped,
			..Default::default()
		};
		let results = pool.map_unordered(keys.into_iter(), move |key| {
			let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| worker.run(&key)));
			(key, result)
		});
		for result in results {
			progress_counter.inc(1);
			let (key, result) = match result {
				Ok(result) => result,
				// The inner catch_unwind keeps the key, so this only happens if the task itself could not run.
				Err(_) => continue,
			};
			match result {
				Ok(Ok(())) => summary.n_completed += 1,
				Ok(Err(error)) => {
					tracing::warn!(%key, "key failed: {:#}", error);
					summary.failures.push((key, format!("{:#}", error)));
				}
				Err(panic) => {
					let message = panic_message(panic.as_ref());
					tracing::warn!(%key, "key panicked: {}", message);
					summary.failures.push((key, message));
				}
			}
		}
		tracing::info!(
			n_completed = summary.n_completed,
			n_failed = summary.failures.len(),
			"finished grid"
		);
		Ok(summary)
	}
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
	if let Some(message) = panic.downcast_ref::<&str>() {
		(*message).to_owned()
	} else if let Some(message) = panic.downcast_ref::<String>() {
		message.clone()
	} else {
		"unknown panic".to_owned()
	}
}

#[cfg(test)]
mod test {
	use super::*;
	use crate::{
		grid::GridGroup,
		params::{DatasetId, ParamTuple, ParamValue, ResultRecord},
		results::test::MemoryResultStore,
	};
	use anyhow::format_err;
	use std::sync::Mutex;

	struct CountingWorker {
		store: Arc<MemoryResultStore>,
		calls: Mutex<Vec<GridKey>>,
	}

	impl Worker for CountingWorker {
		fn run(&self, key: &GridKey) -> Result<()> {
			self.calls.lock().unwrap().push(key.clone());
			match key.dataset {
				DatasetId::Code(1) => return Err(format_err!("dataset 1 is broken")),
				DatasetId::Code(2) => panic!("dataset 2 panics"),
				_ => {}
			}
			self.store.register_run(key)?;
			self.store.write_results(
				key,
				&[ResultRecord {
					stage: None,
					clf_variant: None,
					metrics: Default::default(),
				}],
			)
		}
	}

	fn grid(datasets: Vec<DatasetId>) -> ExperimentGrid {
		let params = ParamTuple::new("dt").with("max_depth", ParamValue::Int(5));
		ExperimentGrid {
			n_splits: 3,
			groups: vec![GridGroup {
				datasets,
				// the duplicate is dispatched once
				params: vec![params.clone(), params],
			}],
		}
	}

	#[test]
	fn test_skips_processed_keys() {
		let store = Arc::new(MemoryResultStore::default());
		let grid = grid(vec![DatasetId::from("thorax")]);
		let keys = grid.group_keys().concat();
		assert_eq!(keys.len(), 3);
		store.write_results(&keys[1], &[]).unwrap();
		let worker = Arc::new(CountingWorker {
			store: store.clone(),
			calls: Mutex::new(Vec::new()),
		});
		let driver = Driver {
			n_jobs: 2,
			store: store.clone(),
		};
		let mut n_updates = 0;
		let summary = driver
			.run(&grid, worker.clone(), &mut |_| n_updates += 1)
			.unwrap();
		assert_eq!(n_updates, 2);
		assert_eq!(summary.n_candidates, 3);
		assert_eq!(summary.n_skipped, 1);
		assert_eq!(summary.n_completed, 2);
		let mut calls = worker.calls.lock().unwrap().clone();
		calls.sort();
		assert_eq!(calls, vec![keys[0].clone(), keys[2].clone()]);

		// a second run has nothing left to do
		let summary = driver.run(&grid, worker.clone(), &mut |_| {}).unwrap();
		assert_eq!(summary.n_skipped, 3);
		assert_eq!(summary.n_completed, 0);
		assert_eq!(worker.calls.lock().unwrap().len(), 2);
	}

	#[test]
	fn test_failures_stay_unprocessed() {
		let store = Arc::new(MemoryResultStore::default());
		let grid = grid(vec![DatasetId::Code(0), DatasetId::Code(1), DatasetId::Code(2)]);
		let worker = Arc::new(CountingWorker {
			store: store.clone(),
			calls: Mutex::new(Vec::new()),
		});
		let driver = Driver {
			n_jobs: 3,
			store: store.clone(),
		};
		let summary = driver.run(&grid, worker, &mut |_| {}).unwrap();
		assert_eq!(summary.n_candidates, 9);
		assert_eq!(summary.n_completed, 3);
		assert_eq!(summary.failures.len(), 6);
		assert!(summary
			.failures
			.iter()
			.any(|(_, message)| message == "dataset 1 is broken"));
		assert!(summary
			.failures
			.iter()
			.any(|(_, message)| message == "dataset 2 panics"));
		for (key, _) in summary.failures.iter() {
			assert!(store.is_unprocessed(key).unwrap());
		}
	}

	#[test]
	fn test_overlapping_groups_run_each_key_once() {
		let store = Arc::new(MemoryResultStore::default());
		let group = GridGroup {
			datasets: vec![DatasetId::from("thorax")],
			params: vec![ParamTuple::new("dt").with("max_depth", ParamValue::Int(5))],
		};
		let grid = ExperimentGrid {
			n_splits: 1,
			groups: vec![group.clone(), group],
		};
		let worker = Arc::new(CountingWorker {
			store: store.clone(),
			calls: Mutex::new(Vec::new()),
		});
		let driver = Driver {
			n_jobs: 2,
			store: store.clone(),
		};
		let summary = driver.run(&grid, worker.clone(), &mut |_| {}).unwrap();
		assert_eq!(summary.n_candidates, 1);
		assert_eq!(summary.n_skipped, 0);
		assert_eq!(summary.n_completed, 1);
		assert_eq!(worker.calls.lock().unwrap().len(), 1);
	}
}
