use std::cmp::Ordering;

/**
The soft ranking loss is the fraction of (positive, negative) example pairs that the probabilities order incorrectly, where a tie counts as half an error. It equals `1 - auc_roc`, but unlike the trapezoid computation it is defined directly over pairs and is used as a stage loss when building scoring lists. Returns 0 when either class is absent.
*/
pub fn soft_ranking_loss(labels: &[usize], probabilities: &[f32]) -> f32 {
	let mut pairs: Vec<(f32, usize)> = probabilities
		.iter()
		.cloned()
		.zip(labels.iter().cloned())
		.collect();
	pairs.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(Ordering::Equal));
	let n_positives = labels.iter().filter(|label| **label == 1).count();
	let n_negatives = labels.len() - n_positives;
	if n_positives == 0 || n_negatives == 0 {
		return 0.0;
	}
	// Walk groups of tied probabilities in increasing order. Every positive is misordered against the negatives strictly above it, and half misordered against the negatives tied with it.
	let mut n_negatives_seen = 0usize;
	let mut errors = 0.0f64;
	let mut i = 0;
	while i < pairs.len() {
		let mut j = i;
		let mut group_positives = 0usize;
		let mut group_negatives = 0usize;
		while j < pairs.len() && pairs[j].0 == pairs[i].0 {
			if pairs[j].1 == 1 {
				group_positives += 1;
			} else {
				group_negatives += 1;
			}
			j += 1;
		}
		let negatives_above = n_negatives - n_negatives_seen - group_negatives;
		errors += group_positives as f64 * (negatives_above as f64 + 0.5 * group_negatives as f64);
		n_negatives_seen += group_negatives;
		i = j;
	}
	(errors / (n_positives as f64 * n_negatives as f64)) as f32
}

#[test]
fn test_soft_ranking_loss() {
	// perfectly ordered
	assert_eq!(soft_ranking_loss(&[0, 0, 1, 1], &[0.1, 0.2, 0.7, 0.9]), 0.0);
	// perfectly reversed
	assert_eq!(soft_ranking_loss(&[1, 1, 0, 0], &[0.1, 0.2, 0.7, 0.9]), 1.0);
	// all tied
	assert_eq!(soft_ranking_loss(&[1, 0, 1, 0], &[0.5, 0.5, 0.5, 0.5]), 0.5);
	let auc = super::auc_roc(&[0.9, 0.4, 0.4, 0.2], &[1, 1, 0, 0]);
	let loss = soft_ranking_loss(&[1, 1, 0, 0], &[0.9, 0.4, 0.4, 0.2]);
	assert!((loss - (1.0 - auc)).abs() < 1e-6);
}
