use crate::{
	binarizer::ThresholdMethod,
	calibration::CalibrationMethod,
	loss::StageLoss,
	system::{compute_thresholds, ProbabilisticScoringSystem},
};
use ndarray::prelude::*;
use rayon::prelude::*;

/// These are the options passed to `ProbabilisticScoringList::fit`.
#[derive(Clone, Debug, PartialEq)]
pub struct PslOptions {
	/// The scores a selected feature may be assigned. Zero is never assigned.
	pub score_set: Vec<i64>,
	/// How many stages ahead each candidate is evaluated before committing to it.
	pub lookahead: usize,
	/// How thresholds of non binary features are chosen.
	pub method: ThresholdMethod,
	pub calibration_method: CalibrationMethod,
	pub stage_loss: StageLoss,
	/// The maximum number of stages after stage 0. `None` adds stages until every feature is used.
	pub max_stages: Option<usize>,
}

impl Default for PslOptions {
	fn default() -> Self {
		Self {
			score_set: vec![-3, -2, -1, 1, 2, 3],
			lookahead: 1,
			method: ThresholdMethod::Bisect,
			calibration_method: CalibrationMethod::Isotonic,
			stage_loss: StageLoss::ExpectedEntropy,
			max_stages: None,
		}
	}
}

/**
A `ProbabilisticScoringList` is a sequence of nested scoring systems. Stage 0 uses no features and predicts the training base rate. Each following stage adds one feature with one score from the score set to the previous stage, chosen greedily to minimize the stage loss on the training data.

The list predicts with its last stage.
*/
#[derive(Clone, Debug, PartialEq)]
pub struct ProbabilisticScoringList {
	pub options: PslOptions,
	/// The threshold of every column of the training features.
	pub thresholds: Vec<f32>,
	pub stages: Vec<ProbabilisticScoringSystem>,
}

type Candidate = (usize, i64);

impl ProbabilisticScoringList {
	pub fn fit(
		features: ArrayView2<f32>,
		labels: ArrayView1<usize>,
		options: &PslOptions,
	) -> ProbabilisticScoringList {
		let thresholds = compute_thresholds(features, labels, options.method);
		let score_set: Vec<i64> = options.score_set.iter().cloned().filter(|s| *s != 0).collect();
		let mut selected: Vec<Candidate> = Vec::new();
		let mut remaining: Vec<usize> = (0..features.ncols()).collect();
		let search = Search {
			features: features.view(),
			labels: labels.view(),
			thresholds: &thresholds,
			score_set: &score_set,
			options,
		};
		let mut stages = vec![search.fit_system(&selected)];
		let max_stages = options.max_stages.unwrap_or(std::usize::MAX);
		while !remaining.is_empty() && !score_set.is_empty() && selected.len() < max_stages {
			let lookahead = options.lookahead.max(1).min(remaining.len());
			let (_, best) = search.best_candidate(&selected, &remaining, lookahead);
			let best = match best {
				Some(best) => best,
				None => break,
			};
			selected.push(best);
			remaining.retain(|feature| *feature != best.0);
			stages.push(search.fit_system(&selected));
		}
		ProbabilisticScoringList {
			options: options.clone(),
			thresholds,
			stages,
		}
	}

	pub fn n_stages(&self) -> usize {
		self.stages.len()
	}

	pub fn stage(&self, index: usize) -> Option<&ProbabilisticScoringSystem> {
		self.stages.get(index)
	}

	pub fn last_stage(&self) -> &ProbabilisticScoringSystem {
		&self.stages[self.stages.len() - 1]
	}

	/// The selected features in the order they were added.
	pub fn features(&self) -> &[usize] {
		&self.last_stage().features
	}

	pub fn scores(&self) -> &[i64] {
		&self.last_stage().scores
	}

	pub fn predict_proba(&self, features: ArrayView2<f32>) -> Array1<f32> {
		self.last_stage().predict_proba(features)
	}

	pub fn predict_proba_ci(&self, features: ArrayView2<f32>, confidence: f64) -> Array2<f32> {
		self.last_stage().predict_proba_ci(features, confidence)
	}
}

struct Search<'a> {
	features: ArrayView2<'a, f32>,
	labels: ArrayView1<'a, usize>,
	thresholds: &'a [f32],
	score_set: &'a [i64],
	options: &'a PslOptions,
}

impl<'a> Search<'a> {
	fn fit_system(&self, selected: &[Candidate]) -> ProbabilisticScoringSystem {
		let feature_indices: Vec<usize> = selected.iter().map(|(feature, _)| *feature).collect();
		let scores: Vec<i64> = selected.iter().map(|(_, score)| *score).collect();
		let thresholds: Vec<f32> = feature_indices
			.iter()
			.map(|feature| self.thresholds[*feature])
			.collect();
		ProbabilisticScoringSystem::fit(
			self.features,
			self.labels,
			&feature_indices,
			&scores,
			&thresholds,
			self.options.calibration_method,
		)
	}

	fn loss(&self, selected: &[Candidate]) -> f32 {
		let system = self.fit_system(selected);
		let probabilities = system.predict_proba(self.features);
		let labels: Vec<usize> = self.labels.iter().cloned().collect();
		self
			.options
			.stage_loss
			.compute(&labels, probabilities.as_slice().unwrap_or(&[]))
	}

	/// The candidate whose best continuation of `depth - 1` further stages has the lowest loss. Ties go to the candidate with the lowest feature index, then to the earliest score in the score set.
	fn best_candidate(
		&self,
		selected: &[Candidate],
		remaining: &[usize],
		depth: usize,
	) -> (f32, Option<Candidate>) {
		let candidates: Vec<Candidate> = remaining
			.iter()
			.flat_map(|feature| self.score_set.iter().map(move |score| (*feature, *score)))
			.collect();
		let losses: Vec<f32> = candidates
			.par_iter()
			.map(|candidate| {
				let mut path = selected.to_owned();
				path.push(*candidate);
				let rest: Vec<usize> = remaining
					.iter()
					.cloned()
					.filter(|feature| *feature != candidate.0)
					.collect();
				if depth > 1 && !rest.is_empty() {
					self.best_candidate(&path, &rest, depth - 1).0
				} else {
					self.loss(&path)
				}
			})
			.collect();
		let mut best: (f32, Option<Candidate>) = (std::f32::INFINITY, None);
		for (loss, candidate) in losses.into_iter().zip(candidates) {
			if best.1.is_none() || loss < best.0 {
				best = (loss, Some(candidate));
			}
		}
		best
	}
}
