use crate::params::ParamValue;
use thiserror::Error;

/// The ways a parameter tuple can fail to describe a pipeline.
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
	#[error("classifier {0} not defined")]
	UnknownClassifier(String),
	#[error("classifier {classifier} requires the parameter {name}")]
	MissingParameter { classifier: String, name: String },
	#[error("classifier {classifier} does not accept the parameter {name}")]
	UnknownParameter { classifier: String, name: String },
	#[error("invalid value {value} for parameter {name}: {reason}")]
	InvalidParameter {
		name: String,
		value: ParamValue,
		reason: String,
	},
}
