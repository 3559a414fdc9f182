use crate::params::DatasetId;
use anyhow::{Context, Result};
use pslab_dataframe::{DataFrame, Dataset, FromCsvOptions};
use std::path::PathBuf;

/// Where the worker gets its datasets from.
pub trait DatasetSource: Send + Sync {
	fn load(&self, dataset: &DatasetId) -> Result<Dataset>;
}

/// Loads `<data_folder>/<dataset>.csv`. The label is `target_column`, or the last column when it is not set.
#[derive(Clone, Debug)]
pub struct DataLoader {
	pub data_folder: PathBuf,
	pub target_column: Option<String>,
}

impl DataLoader {
	pub fn new(data_folder: impl Into<PathBuf>) -> DataLoader {
		DataLoader {
			data_folder: data_folder.into(),
			target_column: None,
		}
	}

	pub fn path(&self, dataset: &DatasetId) -> PathBuf {
		self.data_folder.join(format!("{}.csv", dataset))
	}
}

impl DatasetSource for DataLoader {
	fn load(&self, dataset: &DatasetId) -> Result<Dataset> {
		let path = self.path(dataset);
		let dataframe = DataFrame::from_path(&path, FromCsvOptions::default())
			.with_context(|| format!("failed to load dataset {} from {}", dataset, path.display()))?;
		dataframe
			.to_features_and_labels(self.target_column.as_deref())
			.with_context(|| format!("dataset {} has no usable binary target", dataset))
	}
}
