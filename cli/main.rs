//! This module contains the main entrypoint to the pslab cli.

use self::progress_view::ProgressView;
use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;
use pslab_core::{
	calibration_curves, greedy_optimality, write_csv, CalibrationCurvesOptions, DataLoader,
	Dataset, DatasetId, DatasetSource, Driver, ExperimentConfig, ExperimentWorker, FolderResultStore,
	GreedyOptimalityOptions, ResultStore,
};
use std::{
	path::{Path, PathBuf},
	sync::Arc,
};
use tracing_subscriber::EnvFilter;

mod progress_view;

#[derive(Parser)]
#[command(
	name = "pslab",
	about = "Compare probabilistic scoring lists with decision trees and baseline classifiers.",
	disable_help_subcommand = true
)]
enum Options {
	/// run every key of the grid that has no results yet
	Run(RunOptions),
	/// delete all results and run markers
	Clean(ConfigArgs),
	/// print the size of every group of the grid
	Grid(ConfigArgs),
	/// write every stored record to a csv file
	Export(ExportOptions),
	/// print the configuration of the published experiment as yaml
	ReferenceConfig,
	/// enumerate all score vectors on a dataset and compare them to the greedy cascade
	GreedyOptimality(SideExperimentOptions),
	/// compute isotonic and beta calibration curves on a dataset
	Calibration(SideExperimentOptions),
}

#[derive(clap::Args, Debug)]
struct ConfigArgs {
	/// the path to a yaml or json config file, defaults to the published experiment
	#[arg(short, long)]
	config: Option<PathBuf>,
	/// the folder results are stored in
	#[arg(long)]
	result_folder: Option<PathBuf>,
	/// the folder datasets are loaded from
	#[arg(long)]
	data_folder: Option<PathBuf>,
}

#[derive(clap::Args, Debug)]
struct RunOptions {
	#[command(flatten)]
	config: ConfigArgs,
	/// the number of keys to run at once
	#[arg(short, long)]
	jobs: Option<usize>,
	/// delete all results before running
	#[arg(long)]
	clean: bool,
	/// disable the progress bar
	#[arg(long = "no-progress", action = clap::ArgAction::SetFalse)]
	progress: bool,
}

#[derive(clap::Args, Debug)]
struct ExportOptions {
	#[command(flatten)]
	config: ConfigArgs,
	/// the path to write the csv file to, defaults to stdout
	#[arg(short, long)]
	output: Option<PathBuf>,
}

#[derive(clap::Args, Debug)]
struct SideExperimentOptions {
	/// the dataset to load from the data folder
	#[arg(short, long, default_value = "thorax")]
	dataset: String,
	/// the folder datasets are loaded from
	#[arg(long, default_value = "data")]
	data_folder: PathBuf,
	/// the name of the label column, defaults to the last column
	#[arg(short, long)]
	target: Option<String>,
	/// the path to write the json output to, defaults to stdout
	#[arg(short, long)]
	output: Option<PathBuf>,
}

fn main() {
	tracing_subscriber::fmt()
		.with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
		.with_writer(std::io::stderr)
		.init();
	let options = Options::parse();
	let result = match options {
		Options::Run(options) => cli_run(options),
		Options::Clean(options) => cli_clean(options),
		Options::Grid(options) => cli_grid(options),
		Options::Export(options) => cli_export(options),
		Options::ReferenceConfig => cli_reference_config(),
		Options::GreedyOptimality(options) => cli_greedy_optimality(options),
		Options::Calibration(options) => cli_calibration(options),
	};
	if let Err(error) = result {
		eprintln!("{}: {:#}", "error".red().bold(), error);
		std::process::exit(1);
	}
}

fn load_config(args: &ConfigArgs) -> Result<ExperimentConfig> {
	let mut config = match args.config.as_deref() {
		Some(path) => ExperimentConfig::from_path(path)?,
		None => ExperimentConfig::reference(),
	};
	if let Some(result_folder) = args.result_folder.as_ref() {
		config.result_folder = result_folder.clone();
	}
	if let Some(data_folder) = args.data_folder.as_ref() {
		config.data_folder = data_folder.clone();
	}
	Ok(config)
}

fn cli_run(options: RunOptions) -> Result<()> {
	let mut config = load_config(&options.config)?;
	if let Some(jobs) = options.jobs {
		config.n_jobs = jobs;
	}
	let grid = config.grid()?;
	let store: Arc<dyn ResultStore> = Arc::new(FolderResultStore::new(&config.result_folder)?);
	if options.clean {
		store.clean()?;
	}
	let worker = Arc::new(ExperimentWorker {
		store: store.clone(),
		source: Arc::new(DataLoader {
			data_folder: config.data_folder.clone(),
			target_column: config.target_column.clone(),
		}),
		scoring: config.scoring(),
		test_fraction: config.test_fraction,
	});
	let driver = Driver {
		n_jobs: config.n_jobs,
		store,
	};
	let summary = {
		let mut progress_view = if options.progress {
			Some(ProgressView::new())
		} else {
			None
		};
		driver.run(&grid, worker, &mut |progress| {
			if let Some(progress_view) = progress_view.as_mut() {
				progress_view.update(progress)
			}
		})?
	};
	eprintln!(
		"{} of {} keys were already done, {} completed now.",
		summary.n_skipped, summary.n_candidates, summary.n_completed
	);
	if !summary.failures.is_empty() {
		eprintln!(
			"{}: {} keys failed and will run again next time.",
			"warning".yellow().bold(),
			summary.failures.len()
		);
		for (key, message) in summary.failures.iter() {
			eprintln!("  {}: {}", key, message);
		}
	}
	Ok(())
}

fn cli_clean(options: ConfigArgs) -> Result<()> {
	let config = load_config(&options)?;
	FolderResultStore::new(&config.result_folder)?.clean()?;
	eprintln!("Removed all results from {}.", config.result_folder.display());
	Ok(())
}

fn cli_grid(options: ConfigArgs) -> Result<()> {
	let config = load_config(&options)?;
	let grid = config.grid()?;
	let mut total = 0;
	for (group, keys) in grid.groups.iter().zip(grid.group_keys()) {
		let datasets: Vec<String> = group.datasets.iter().map(|dataset| dataset.to_string()).collect();
		println!(
			"{} parameter tuples x {} datasets x {} folds = {} keys ({})",
			group.params.len(),
			group.datasets.len(),
			grid.n_splits,
			keys.len(),
			datasets.join(", ")
		);
		total += keys.len();
	}
	println!("{} keys in total", total);
	Ok(())
}

fn cli_export(options: ExportOptions) -> Result<()> {
	let config = load_config(&options.config)?;
	let results = FolderResultStore::new(&config.result_folder)?.load_results()?;
	match options.output.as_deref() {
		Some(path) => {
			let file = std::fs::File::create(path)
				.with_context(|| format!("failed to create {}", path.display()))?;
			write_csv(file, &results)?;
		}
		None => write_csv(std::io::stdout(), &results)?,
	}
	Ok(())
}

fn cli_reference_config() -> Result<()> {
	print!("{}", serde_yaml::to_string(&ExperimentConfig::reference())?);
	Ok(())
}

fn cli_greedy_optimality(options: SideExperimentOptions) -> Result<()> {
	let dataset = load_dataset(&options)?;
	let result = greedy_optimality(
		dataset.features.view(),
		dataset.labels.view(),
		&GreedyOptimalityOptions::default(),
	)?;
	write_json(options.output.as_deref(), &result)
}

fn cli_calibration(options: SideExperimentOptions) -> Result<()> {
	let dataset = load_dataset(&options)?;
	let result = calibration_curves(
		dataset.features.view(),
		dataset.labels.view(),
		&CalibrationCurvesOptions::default(),
	)?;
	write_json(options.output.as_deref(), &result)
}

fn load_dataset(options: &SideExperimentOptions) -> Result<Dataset> {
	let loader = DataLoader {
		data_folder: options.data_folder.clone(),
		target_column: options.target.clone(),
	};
	let dataset = match options.dataset.parse::<u64>() {
		Ok(code) => DatasetId::Code(code),
		Err(_) => DatasetId::Name(options.dataset.clone()),
	};
	let loaded = loader.load(&dataset)?;
	tracing::info!(
		%dataset,
		n_examples = loaded.features.nrows(),
		n_features = loaded.features.ncols(),
		"loaded dataset"
	);
	Ok(loaded)
}

fn write_json<T: serde::Serialize>(path: Option<&Path>, value: &T) -> Result<()> {
	match path {
		Some(path) => {
			let file = std::fs::File::create(path)
				.with_context(|| format!("failed to create {}", path.display()))?;
			serde_json::to_writer_pretty(file, value)?;
		}
		None => {
			serde_json::to_writer_pretty(std::io::stdout(), value)?;
			println!();
		}
	}
	Ok(())
}
