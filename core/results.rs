/*!
This module persists the records of each grid key so that an interrupted experiment can be resumed.
*/

use crate::params::{GridKey, ResultRecord};
use anyhow::{format_err, Context, Result};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::{
	fs,
	io::Write,
	path::{Path, PathBuf},
};

/// Storage for per key results. Implementations must tolerate concurrent calls for distinct keys.
pub trait ResultStore: Send + Sync {
	/// Remove every stored result and registration.
	fn clean(&self) -> Result<()>;
	/// Whether no results have been written for `key`.
	fn is_unprocessed(&self, key: &GridKey) -> Result<bool>;
	/// Record that work on `key` has started.
	fn register_run(&self, key: &GridKey) -> Result<()>;
	/// Persist the records of `key`. After this returns `key` is processed.
	fn write_results(&self, key: &GridKey, records: &[ResultRecord]) -> Result<()>;
	/// Every processed key with its records.
	fn load_results(&self) -> Result<Vec<(GridKey, Vec<ResultRecord>)>>;
}

/**
A `FolderResultStore` keeps one file per key in a folder. A key's file name is the SHA-256 digest of its canonical JSON encoding. `register_run` writes `<digest>.started.json` and `write_results` writes `<digest>.json` through a temporary file and a rename, so a results file is either absent or complete.

A key counts as processed only once its results file exists, so keys whose worker crashed after registering are run again.
*/
#[derive(Clone, Debug)]
pub struct FolderResultStore {
	folder: PathBuf,
}

#[derive(Serialize, Deserialize)]
struct StoredResults {
	key: GridKey,
	records: Vec<ResultRecord>,
}

const RESULTS_EXTENSION: &str = ".json";
const STARTED_EXTENSION: &str = ".started.json";

impl FolderResultStore {
	pub fn new(folder: impl Into<PathBuf>) -> Result<FolderResultStore> {
		let folder = folder.into();
		fs::create_dir_all(&folder)
			.with_context(|| format!("failed to create result folder {}", folder.display()))?;
		Ok(FolderResultStore { folder })
	}

	pub fn folder(&self) -> &Path {
		&self.folder
	}

	pub fn digest(key: &GridKey) -> Result<String> {
		let canonical = serde_json::to_vec(key)?;
		Ok(hex::encode(Sha256::digest(&canonical)))
	}

	fn results_path(&self, key: &GridKey) -> Result<PathBuf> {
		Ok(self.folder.join(format!("{}{}", Self::digest(key)?, RESULTS_EXTENSION)))
	}

	fn started_path(&self, key: &GridKey) -> Result<PathBuf> {
		Ok(self.folder.join(format!("{}{}", Self::digest(key)?, STARTED_EXTENSION)))
	}
}

/// Whether `name` is a results file, a started marker, or a temporary file left by an interrupted write. Every one of them is named after a key digest.
fn is_store_file(name: &str) -> bool {
	let (is_tmp, name) = match name.strip_prefix('.') {
		Some(name) => (true, name),
		None => (false, name),
	};
	if name.len() < 64 || !name.is_char_boundary(64) {
		return false;
	}
	let (digest, rest) = name.split_at(64);
	if !digest.chars().all(|c| c.is_ascii_hexdigit()) {
		return false;
	}
	let suffix = if is_tmp {
		match rest.find(".tmp.") {
			Some(index) => &rest[..index],
			None => return false,
		}
	} else {
		rest
	};
	suffix == RESULTS_EXTENSION || suffix == STARTED_EXTENSION
}

fn atomic_write(path: &Path, bytes: &[u8]) -> Result<()> {
	let name = path
		.file_name()
		.and_then(|name| name.to_str())
		.ok_or_else(|| format_err!("invalid result path {}", path.display()))?;
	let tmp = path.with_file_name(format!(".{}.tmp.{}", name, std::process::id()));
	let mut file = fs::File::create(&tmp)?;
	file.write_all(bytes)?;
	file.sync_all()?;
	fs::rename(&tmp, path)?;
	Ok(())
}

impl ResultStore for FolderResultStore {
	fn clean(&self) -> Result<()> {
		let mut n_removed = 0;
		for entry in fs::read_dir(&self.folder)? {
			let path = entry?.path();
			let is_result_file = path
				.file_name()
				.and_then(|name| name.to_str())
				.map(is_store_file)
				.unwrap_or(false);
			if is_result_file {
				fs::remove_file(&path)?;
				n_removed += 1;
			}
		}
		tracing::info!(folder = %self.folder.display(), n_removed, "cleaned result folder");
		Ok(())
	}

	fn is_unprocessed(&self, key: &GridKey) -> Result<bool> {
		Ok(!self.results_path(key)?.exists())
	}

	fn register_run(&self, key: &GridKey) -> Result<()> {
		let bytes = serde_json::to_vec(key)?;
		atomic_write(&self.started_path(key)?, &bytes)?;
		tracing::debug!(%key, "registered run");
		Ok(())
	}

	fn write_results(&self, key: &GridKey, records: &[ResultRecord]) -> Result<()> {
		let stored = StoredResults {
			key: key.clone(),
			records: records.to_owned(),
		};
		let bytes = serde_json::to_vec_pretty(&stored)?;
		atomic_write(&self.results_path(key)?, &bytes)?;
		tracing::debug!(%key, n_records = records.len(), "wrote results");
		Ok(())
	}

	fn load_results(&self) -> Result<Vec<(GridKey, Vec<ResultRecord>)>> {
		let mut results = Vec::new();
		for entry in fs::read_dir(&self.folder)? {
			let path = entry?.path();
			let name = match path.file_name().and_then(|name| name.to_str()) {
				Some(name) => name,
				None => continue,
			};
			if name.starts_with('.')
				|| name.ends_with(STARTED_EXTENSION)
				|| !name.ends_with(RESULTS_EXTENSION)
				|| !is_store_file(name)
			{
				continue;
			}
			let bytes = fs::read(&path)?;
			let stored: StoredResults = serde_json::from_slice(&bytes)
				.with_context(|| format!("failed to parse results file {}", path.display()))?;
			results.push((stored.key, stored.records));
		}
		results.sort_by(|a, b| a.0.cmp(&b.0));
		Ok(results)
	}
}

#[cfg(test)]
pub(crate) mod test {
	use super::*;
	use crate::params::{DatasetId, ParamTuple, ParamValue};
	use std::{collections::BTreeSet, sync::Mutex};

	/// An in memory store for driver and worker tests.
	#[derive(Default)]
	pub struct MemoryResultStore {
		pub registered: Mutex<Vec<GridKey>>,
		pub results: Mutex<Vec<(GridKey, Vec<ResultRecord>)>>,
		pub processed: Mutex<BTreeSet<GridKey>>,
	}

	impl ResultStore for MemoryResultStore {
		fn clean(&self) -> Result<()> {
			self.results.lock().unwrap().clear();
			self.processed.lock().unwrap().clear();
			Ok(())
		}
		fn is_unprocessed(&self, key: &GridKey) -> Result<bool> {
			Ok(!self.processed.lock().unwrap().contains(key))
		}
		fn register_run(&self, key: &GridKey) -> Result<()> {
			self.registered.lock().unwrap().push(key.clone());
			Ok(())
		}
		fn write_results(&self, key: &GridKey, records: &[ResultRecord]) -> Result<()> {
			self.results.lock().unwrap().push((key.clone(), records.to_owned()));
			self.processed.lock().unwrap().insert(key.clone());
			Ok(())
		}
		fn load_results(&self) -> Result<Vec<(GridKey, Vec<ResultRecord>)>> {
			Ok(self.results.lock().unwrap().clone())
		}
	}

	fn key(fold: u64) -> GridKey {
		GridKey {
			fold,
			dataset: DatasetId::from("thorax"),
			params: ParamTuple::new("dt").with("max_depth", ParamValue::Int(5)),
		}
	}

	fn record() -> ResultRecord {
		ResultRecord {
			stage: None,
			clf_variant: None,
			metrics: vec![("test_acc".to_owned(), 0.75)].into_iter().collect(),
		}
	}

	#[test]
	fn test_folder_store() {
		let dir = tempfile::tempdir().unwrap();
		let store = FolderResultStore::new(dir.path().join("results")).unwrap();
		assert!(store.is_unprocessed(&key(0)).unwrap());
		store.register_run(&key(0)).unwrap();
		assert!(store.is_unprocessed(&key(0)).unwrap());
		store.write_results(&key(0), &[record()]).unwrap();
		assert!(!store.is_unprocessed(&key(0)).unwrap());
		assert!(store.is_unprocessed(&key(1)).unwrap());
		let results = store.load_results().unwrap();
		assert_eq!(results, vec![(key(0), vec![record()])]);
		store.clean().unwrap();
		assert!(store.is_unprocessed(&key(0)).unwrap());
		assert!(store.load_results().unwrap().is_empty());
	}

	#[test]
	fn test_clean_keeps_unrelated_files() {
		let dir = tempfile::tempdir().unwrap();
		let store = FolderResultStore::new(dir.path()).unwrap();
		store.register_run(&key(0)).unwrap();
		store.write_results(&key(0), &[record()]).unwrap();
		let digest = FolderResultStore::digest(&key(1)).unwrap();
		let leftover = dir.path().join(format!(".{}.json.tmp.42", digest));
		fs::write(&leftover, b"{").unwrap();
		fs::write(dir.path().join("notes.json"), b"{}").unwrap();
		fs::write(dir.path().join("config.yaml"), b"n_splits: 1").unwrap();
		assert_eq!(store.load_results().unwrap().len(), 1);
		store.clean().unwrap();
		let mut remaining: Vec<String> = fs::read_dir(dir.path())
			.unwrap()
			.map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
			.collect();
		remaining.sort();
		assert_eq!(remaining, vec!["config.yaml".to_owned(), "notes.json".to_owned()]);
	}

	#[test]
	fn test_is_store_file() {
		let digest = FolderResultStore::digest(&key(0)).unwrap();
		assert!(is_store_file(&format!("{}.json", digest)));
		assert!(is_store_file(&format!("{}.started.json", digest)));
		assert!(is_store_file(&format!(".{}.json.tmp.17", digest)));
		assert!(is_store_file(&format!(".{}.started.json.tmp.17", digest)));
		assert!(!is_store_file(&format!("{}.json.bak", digest)));
		assert!(!is_store_file(&format!("{}.json", &digest[1..])));
		assert!(!is_store_file("notes.json"));
		assert!(!is_store_file(".notes.json.tmp.17"));
	}

	#[test]
	fn test_digest_is_stable() {
		assert_eq!(
			FolderResultStore::digest(&key(0)).unwrap(),
			FolderResultStore::digest(&key(0)).unwrap()
		);
		assert_ne!(
			FolderResultStore::digest(&key(0)).unwrap(),
			FolderResultStore::digest(&key(1)).unwrap()
		);
		assert_eq!(FolderResultStore::digest(&key(0)).unwrap().len(), 64);
	}
}
