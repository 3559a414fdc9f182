use super::*;
use anyhow::Result;
use std::{
	collections::{BTreeMap, BTreeSet},
	path::Path,
};

#[derive(Clone, Default)]
pub struct FromCsvOptions {
	pub column_types: Option<BTreeMap<String, ColumnType>>,
	pub infer_options: InferOptions,
}

#[derive(Clone, Debug)]
pub struct InferOptions {
	pub enum_max_unique_values: usize,
}

impl Default for InferOptions {
	fn default() -> Self {
		Self {
			enum_max_unique_values: 100,
		}
	}
}

/// These values are the default values that are considered invalid.
const DEFAULT_INVALID_VALUES: &[&str] = &[
	"", "null", "NULL", "n/a", "N/A", "nan", "-nan", "NaN", "-NaN", "?",
];

impl DataFrame {
	pub fn from_path(path: &Path, options: FromCsvOptions) -> Result<Self> {
		Self::from_csv(&mut csv::Reader::from_path(path)?, options)
	}

	pub fn from_csv<R>(reader: &mut csv::Reader<R>, options: FromCsvOptions) -> Result<Self>
	where
		R: std::io::Read + std::io::Seek,
	{
		let column_names: Vec<String> = reader
			.headers()?
			.into_iter()
			.map(|column_name| column_name.to_owned())
			.collect();
		let start_position = reader.position().clone();

		// Columns whose types were given in the options skip inference.
		let given_column_types: Vec<Option<ColumnType>> = column_names
			.iter()
			.map(|column_name| {
				options
					.column_types
					.as_ref()
					.and_then(|column_types| column_types.get(column_name).cloned())
			})
			.collect();

		// Pass over the csv once to infer the types of the remaining columns.
		let column_types: Vec<ColumnType> = if given_column_types.iter().any(Option::is_none) {
			let mut infer_stats: Vec<InferStats> = column_names
				.iter()
				.map(|_| InferStats::new(&options.infer_options))
				.collect();
			let mut record = csv::StringRecord::new();
			while reader.read_record(&mut record)? {
				for (infer_stats, value) in infer_stats.iter_mut().zip(record.iter()) {
					infer_stats.update(value);
				}
			}
			reader.seek(start_position)?;
			given_column_types
				.into_iter()
				.zip(infer_stats.into_iter())
				.map(|(given, infer_stats)| given.unwrap_or_else(|| infer_stats.finalize()))
				.collect()
		} else {
			given_column_types.into_iter().flatten().collect()
		};

		let mut dataframe = Self::new(column_names, column_types);
		let option_indexes: Vec<Option<BTreeMap<String, usize>>> = dataframe
			.columns
			.iter()
			.map(|column| match column {
				Column::Number(_) => None,
				Column::Enum(column) => Some(
					column
						.options
						.iter()
						.enumerate()
						.map(|(index, option)| (option.clone(), index))
						.collect(),
				),
			})
			.collect();
		// Read each csv record and insert the values into the columns of the dataframe.
		let mut record = csv::ByteRecord::new();
		while reader.read_byte_record(&mut record)? {
			for ((column, option_index), value) in dataframe
				.columns
				.iter_mut()
				.zip(option_indexes.iter())
				.zip(record.iter())
			{
				match column {
					Column::Number(column) => {
						let value = match lexical::parse::<f32, _>(value) {
							Ok(value) if value.is_finite() => value,
							_ => std::f32::NAN,
						};
						column.data.push(value);
					}
					Column::Enum(column) => {
						let value = std::str::from_utf8(value).ok().and_then(|value| {
							option_index
								.as_ref()
								.and_then(|option_index| option_index.get(value).cloned())
						});
						column.data.push(value);
					}
				}
			}
		}
		Ok(dataframe)
	}
}

#[derive(Clone, Debug)]
struct InferStats<'a> {
	infer_options: &'a InferOptions,
	column_type: InferColumnType,
	unique_values: BTreeSet<String>,
}

#[derive(PartialEq, Clone, Copy, Debug)]
enum InferColumnType {
	Unknown,
	Number,
	Enum,
}

impl<'a> InferStats<'a> {
	fn new(infer_options: &'a InferOptions) -> Self {
		Self {
			infer_options,
			column_type: InferColumnType::Unknown,
			unique_values: BTreeSet::new(),
		}
	}

	fn update(&mut self, value: &str) {
		if DEFAULT_INVALID_VALUES.contains(&value) {
			return;
		}
		if !self.unique_values.contains(value)
			&& self.unique_values.len() <= self.infer_options.enum_max_unique_values
		{
			self.unique_values.insert(value.to_owned());
		}
		if let InferColumnType::Unknown | InferColumnType::Number = self.column_type {
			let is_number = lexical::parse::<f32, _>(value.as_bytes())
				.map(|value| value.is_finite())
				.unwrap_or(false);
			self.column_type = if is_number {
				InferColumnType::Number
			} else {
				InferColumnType::Enum
			};
		}
	}

	// A column that is not entirely numeric becomes an enum column. Options beyond the cap are treated as missing.
	fn finalize(self) -> ColumnType {
		match self.column_type {
			InferColumnType::Unknown | InferColumnType::Number => ColumnType::Number,
			InferColumnType::Enum => ColumnType::Enum {
				options: self
					.unique_values
					.into_iter()
					.take(self.infer_options.enum_max_unique_values)
					.collect(),
			},
		}
	}
}

#[cfg(test)]
mod test {
	use super::*;
	use std::io::Cursor;

	#[test]
	fn test_from_csv() {
		let csv = "age,smoker,outcome\n50,yes,1\n?,no,0\n61,no,1\n";
		let mut reader = csv::Reader::from_reader(Cursor::new(csv));
		let dataframe = DataFrame::from_csv(&mut reader, FromCsvOptions::default()).unwrap();
		insta::assert_debug_snapshot!(dataframe.columns[1], @r###"
		Enum(
		    EnumColumn {
		        name: "smoker",
		        options: [
		            "no",
		            "yes",
		        ],
		        data: [
		            Some(
		                1,
		            ),
		            Some(
		                0,
		            ),
		            Some(
		                0,
		            ),
		        ],
		    },
		)
		"###);
		let dataset = dataframe.to_features_and_labels(Some("outcome")).unwrap();
		assert_eq!(dataset.labels, arr1(&[1, 0, 1]));
		assert!(dataset.features[(1, 0)].is_nan());
	}

	#[test]
	fn test_given_column_types_skip_inference() {
		let csv = "code,label\n1,a\n2,b\n";
		let mut column_types = BTreeMap::new();
		column_types.insert(
			"code".to_owned(),
			ColumnType::Enum {
				options: vec!["1".to_owned(), "2".to_owned()],
			},
		);
		column_types.insert(
			"label".to_owned(),
			ColumnType::Enum {
				options: vec!["a".to_owned(), "b".to_owned()],
			},
		);
		let mut reader = csv::Reader::from_reader(Cursor::new(csv));
		let dataframe = DataFrame::from_csv(
			&mut reader,
			FromCsvOptions {
				column_types: Some(column_types),
				..Default::default()
			},
		)
		.unwrap();
		let dataset = dataframe.to_features_and_labels(None).unwrap();
		assert_eq!(dataset.features, arr2(&[[0.0], [1.0]]));
	}
}
