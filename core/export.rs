use crate::params::{GridKey, ResultRecord};
use anyhow::Result;
use std::{collections::BTreeSet, io::Write};

/**
Write every record as one csv row. The leading columns identify the key and the record: `fold`, `dataset`, `clf`, `params`, `stage`, `clf_variant`. They are followed by one column per metric name found in any record, in sorted order. Missing and NaN metrics are written as empty fields.
*/
pub fn write_csv<W: Write>(writer: W, results: &[(GridKey, Vec<ResultRecord>)]) -> Result<()> {
	let metric_names: BTreeSet<&str> = results
		.iter()
		.flat_map(|(_, records)| records.iter())
		.flat_map(|record| record.metrics.keys())
		.map(|name| name.as_str())
		.collect();
	let mut writer = csv::Writer::from_writer(writer);
	let mut header = vec!["fold", "dataset", "clf", "params", "stage", "clf_variant"];
	header.extend(metric_names.iter().cloned());
	writer.write_record(&header)?;
	for (key, records) in results.iter() {
		for record in records.iter() {
			let mut row = vec![
				key.fold.to_string(),
				key.dataset.to_string(),
				key.params.tag.clone(),
				key.params.to_string(),
				record.stage.map(|stage| stage.to_string()).unwrap_or_default(),
				record
					.clf_variant
					.map(|variant| variant.name().to_owned())
					.unwrap_or_default(),
			];
			for name in metric_names.iter() {
				let value = record
					.metrics
					.get(*name)
					.filter(|value| !value.is_nan())
					.map(|value| value.to_string())
					.unwrap_or_default();
				row.push(value);
			}
			writer.write_record(&row)?;
		}
	}
	writer.flush()?;
	Ok(())
}

#[cfg(test)]
mod test {
	use super::*;
	use crate::params::{DatasetId, ParamTuple, ParamValue, Variant};

	#[test]
	fn test_write_csv() {
		let key = GridKey {
			fold: 7,
			dataset: DatasetId::from(42900u64),
			params: ParamTuple::new("dt").with("max_depth", ParamValue::Int(5)),
		};
		let records = vec![
			ResultRecord {
				stage: None,
				clf_variant: None,
				metrics: vec![("fit_time".to_owned(), 0.5), ("test_acc".to_owned(), 0.75)]
					.into_iter()
					.collect(),
			},
			ResultRecord {
				stage: Some(1),
				clf_variant: Some(Variant::RandomForest),
				metrics: vec![("test_acc".to_owned(), 0.5), ("test_roc".to_owned(), std::f64::NAN)]
					.into_iter()
					.collect(),
			},
		];
		let mut output = Vec::new();
		write_csv(&mut output, &[(key, records)]).unwrap();
		let output = String::from_utf8(output).unwrap();
		assert_eq!(
			output,
			"fold,dataset,clf,params,stage,clf_variant,fit_time,test_acc,test_roc\n\
			 7,42900,dt,\"(dt, max_depth=5)\",,,0.5,0.75,\n\
			 7,42900,dt,\"(dt, max_depth=5)\",1,random_forest,,0.5,\n"
		);
	}
}
