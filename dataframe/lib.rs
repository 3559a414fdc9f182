/*!
This crate implements a small columnar `DataFrame` for loading tabular binary classification datasets from csv files. Every column is either a number column or an enum column. A `DataFrame` is turned into a dense `f32` feature matrix and a `usize` label vector with [`DataFrame::to_features_and_labels`](struct.DataFrame.html#method.to_features_and_labels).

Missing values in number columns are stored as NaN. Missing values in enum columns are stored as `None` and become the missing code `-1.0` in the feature matrix.
*/

#![allow(clippy::tabs_in_doc_comments)]

use anyhow::{format_err, Result};
use ndarray::prelude::*;
use num_traits::ToPrimitive;

mod load;

pub use self::load::{FromCsvOptions, InferOptions};

/// The value that marks a missing entry in the feature matrix.
pub const MISSING_VALUE: f32 = -1.0;

#[derive(Debug, Clone, PartialEq)]
pub struct DataFrame {
	pub columns: Vec<Column>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Column {
	Number(NumberColumn),
	Enum(EnumColumn),
}

#[derive(Debug, Clone, PartialEq)]
pub struct NumberColumn {
	pub name: String,
	pub data: Vec<f32>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EnumColumn {
	pub name: String,
	/// The distinct values of this column in sorted order.
	pub options: Vec<String>,
	/// The index into `options` of each value, or `None` if the value is missing.
	pub data: Vec<Option<usize>>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ColumnType {
	Number,
	Enum { options: Vec<String> },
}

/// The dense arrays a classifier is trained on.
#[derive(Debug, Clone)]
pub struct Dataset {
	pub feature_names: Vec<String>,
	/// (n_examples, n_features)
	pub features: Array2<f32>,
	/// (n_examples), `1` for the positive class
	pub labels: Array1<usize>,
}

impl DataFrame {
	pub fn new(column_names: Vec<String>, column_types: Vec<ColumnType>) -> Self {
		let columns = column_names
			.into_iter()
			.zip(column_types.into_iter())
			.map(|(name, column_type)| match column_type {
				ColumnType::Number => Column::Number(NumberColumn {
					name,
					data: Vec::new(),
				}),
				ColumnType::Enum { options } => Column::Enum(EnumColumn {
					name,
					options,
					data: Vec::new(),
				}),
			})
			.collect();
		Self { columns }
	}

	pub fn ncols(&self) -> usize {
		self.columns.len()
	}

	pub fn nrows(&self) -> usize {
		self.columns.first().map(|column| column.len()).unwrap_or(0)
	}

	/**
	Split this dataframe into a feature matrix and a label vector. The target column is the column named `target_column_name`, or the last column if no name is given. The target column must have exactly two distinct values: for a number column the larger value is the positive class, and for an enum column the option that sorts last is.
	*/
	pub fn to_features_and_labels(&self, target_column_name: Option<&str>) -> Result<Dataset> {
		let target_column_index = match target_column_name {
			Some(target_column_name) => self
				.columns
				.iter()
				.position(|column| column.name() == target_column_name)
				.ok_or_else(|| {
					format_err!(
						"did not find target column \"{}\" among column names \"{}\"",
						target_column_name,
						self.columns
							.iter()
							.map(|column| column.name())
							.collect::<Vec<_>>()
							.join(", ")
					)
				})?,
			None => self
				.ncols()
				.checked_sub(1)
				.ok_or_else(|| format_err!("the dataframe has no columns"))?,
		};
		let labels = self.columns[target_column_index].to_binary_labels()?;
		let feature_columns: Vec<&Column> = self
			.columns
			.iter()
			.enumerate()
			.filter(|(index, _)| *index != target_column_index)
			.map(|(_, column)| column)
			.collect();
		let mut features = Array2::zeros((self.nrows(), feature_columns.len()));
		for (mut feature_column, column) in features.axis_iter_mut(Axis(1)).zip(feature_columns.iter()) {
			match column {
				Column::Number(column) => {
					for (feature, value) in feature_column.iter_mut().zip(column.data.iter()) {
						*feature = *value;
					}
				}
				Column::Enum(column) => {
					for (feature, value) in feature_column.iter_mut().zip(column.data.iter()) {
						*feature = value
							.and_then(|value| value.to_f32())
							.unwrap_or(MISSING_VALUE);
					}
				}
			}
		}
		Ok(Dataset {
			feature_names: feature_columns
				.iter()
				.map(|column| column.name().to_owned())
				.collect(),
			features,
			labels: Array1::from(labels),
		})
	}
}

impl Column {
	pub fn len(&self) -> usize {
		match self {
			Column::Number(column) => column.data.len(),
			Column::Enum(column) => column.data.len(),
		}
	}

	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}

	pub fn name(&self) -> &str {
		match self {
			Column::Number(column) => &column.name,
			Column::Enum(column) => &column.name,
		}
	}

	fn to_binary_labels(&self) -> Result<Vec<usize>> {
		match self {
			Column::Number(column) => {
				let mut distinct: Vec<f32> = Vec::new();
				for value in column.data.iter() {
					if !value.is_finite() {
						return Err(format_err!(
							"the target column \"{}\" has a missing value",
							column.name
						));
					}
					if !distinct.contains(value) {
						distinct.push(*value);
					}
				}
				if distinct.len() != 2 {
					return Err(format_err!(
						"the target column \"{}\" must have exactly two distinct values but has {}",
						column.name,
						distinct.len()
					));
				}
				let positive = distinct[0].max(distinct[1]);
				Ok(column
					.data
					.iter()
					.map(|value| if *value == positive { 1 } else { 0 })
					.collect())
			}
			Column::Enum(column) => {
				let present: std::collections::BTreeSet<usize> =
					column.data.iter().filter_map(|value| *value).collect();
				if column.data.iter().any(|value| value.is_none()) {
					return Err(format_err!(
						"the target column \"{}\" has a missing value",
						column.name
					));
				}
				if present.len() != 2 {
					return Err(format_err!(
						"the target column \"{}\" must have exactly two distinct values but has {}",
						column.name,
						present.len()
					));
				}
				let positive = present.iter().max().cloned();
				Ok(column
					.data
					.iter()
					.map(|value| if *value == positive { 1 } else { 0 })
					.collect())
			}
		}
	}
}
