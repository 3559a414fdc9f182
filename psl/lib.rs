/*!
This crate implements probabilistic scoring lists for binary classification.

A [`ProbabilisticScoringSystem`](struct.ProbabilisticScoringSystem.html) assigns an integer score to each of a few thresholded features and calibrates the total score into a probability. A [`ProbabilisticScoringList`](struct.ProbabilisticScoringList.html) is a sequence of such systems built greedily one feature at a time, so that every prefix is itself a usable classifier.

The crate also provides the [`MinEntropyBinarizer`](struct.MinEntropyBinarizer.html) used to preprocess continuous features, the calibrators, and the Wilson confidence intervals reported by scoring systems.
*/

#![allow(clippy::tabs_in_doc_comments)]

mod binarizer;
mod calibration;
mod confidence;
mod list;
mod loss;
mod system;

pub use self::binarizer::{binarize, optimal_threshold, MinEntropyBinarizer, ThresholdMethod};
pub use self::calibration::{CalibrationMethod, Calibrator, IsotonicCalibrator, LogisticCalibrator};
pub use self::confidence::{normal_quantile, wilson_interval};
pub use self::list::{ProbabilisticScoringList, PslOptions};
pub use self::loss::StageLoss;
pub use self::system::{compute_thresholds, compute_total_scores, ProbabilisticScoringSystem};
