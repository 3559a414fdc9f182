use std::sync::{
	atomic::{AtomicU64, Ordering},
	Arc,
};

/// A `ProgressCounter` is a cheaply cloneable counter toward a fixed total. Clones share the same current value, so one thread can increment it while another reads it to draw a progress bar.
#[derive(Clone, Debug)]
pub struct ProgressCounter {
	current: Arc<AtomicU64>,
	total: u64,
}

impl ProgressCounter {
	pub fn new(total: u64) -> Self {
		Self {
			current: Arc::new(AtomicU64::new(0)),
			total,
		}
	}

	pub fn total(&self) -> u64 {
		self.total
	}

	pub fn get(&self) -> u64 {
		self.current.load(Ordering::Relaxed)
	}

	pub fn set(&self, value: u64) {
		self.current.store(value, Ordering::Relaxed);
	}

	pub fn inc(&self, amount: u64) {
		self.current.fetch_add(amount, Ordering::Relaxed);
	}

	/// The fraction of the total that has been reached, or `1.0` if the total is zero.
	pub fn fraction(&self) -> f64 {
		if self.total == 0 {
			1.0
		} else {
			self.get() as f64 / self.total as f64
		}
	}
}

#[test]
fn test_progress_counter_is_shared_between_clones() {
	let counter = ProgressCounter::new(4);
	let clone = counter.clone();
	clone.inc(1);
	counter.inc(2);
	assert_eq!(clone.get(), 3);
	assert!((counter.fraction() - 0.75).abs() < f64::EPSILON);
	counter.set(0);
	assert_eq!(clone.get(), 0);
	assert!((ProgressCounter::new(0).fraction() - 1.0).abs() < f64::EPSILON);
}
