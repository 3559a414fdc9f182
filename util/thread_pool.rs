use crossbeam::channel::{unbounded, Receiver, Sender};
use std::{
	any::Any,
	panic::{catch_unwind, AssertUnwindSafe},
	sync::Arc,
	thread::JoinHandle,
};

/// The outcome of one task. A task that panicked yields `Err` with the panic payload rather than taking down the pool.
pub type TaskResult<T> = Result<T, Box<dyn Any + Send + 'static>>;

/**
A `ThreadPool` owns a fixed number of OS threads that pull tasks from a shared queue. At most `size` tasks run at once, each task runs to completion on a single thread, and a task that panics does not affect its siblings.
*/
pub struct ThreadPool {
	task_sender: Option<Sender<Task>>,
	threads: Vec<JoinHandle<()>>,
}

type Task = Box<dyn FnOnce() + Send + 'static>;

impl ThreadPool {
	pub fn new(size: usize) -> ThreadPool {
		let size = size.max(1);
		let (task_sender, task_receiver) = unbounded::<Task>();
		let threads = (0..size)
			.map(|_| {
				let task_receiver = task_receiver.clone();
				std::thread::spawn(move || {
					while let Ok(task) = task_receiver.recv() {
						task();
					}
				})
			})
			.collect();
		ThreadPool {
			task_sender: Some(task_sender),
			threads,
		}
	}

	pub fn size(&self) -> usize {
		self.threads.len()
	}

	/**
	Run `f` on every item. The returned iterator yields one `TaskResult` per item as soon as that item's task finishes, so results arrive in completion order rather than submission order. Dropping the iterator early does not cancel tasks that were already queued.
	*/
	pub fn map_unordered<I, F, T>(&self, items: I, f: F) -> MapUnordered<T>
	where
		I: IntoIterator,
		I::Item: Send + 'static,
		F: Fn(I::Item) -> T + Send + Sync + 'static,
		T: Send + 'static,
	{
		let f = Arc::new(f);
		let (result_sender, result_receiver) = unbounded::<TaskResult<T>>();
		let mut n_tasks = 0;
		for item in items {
			let f = f.clone();
			let result_sender = result_sender.clone();
			self.spawn(Box::new(move || {
				let result = catch_unwind(AssertUnwindSafe(|| f(item)));
				// The receiver may already be gone if the caller stopped listening.
				result_sender.send(result).ok();
			}));
			n_tasks += 1;
		}
		MapUnordered {
			result_receiver,
			n_remaining: n_tasks,
		}
	}

	fn spawn(&self, task: Task) {
		if let Some(task_sender) = self.task_sender.as_ref() {
			// The worker threads hold the receiver until the pool is dropped.
			task_sender.send(task).ok();
		}
	}
}

impl Drop for ThreadPool {
	fn drop(&mut self) {
		// Closing the queue lets every thread finish its current task and exit.
		self.task_sender.take();
		for thread in self.threads.drain(..) {
			thread.join().ok();
		}
	}
}

/// The iterator returned by [`ThreadPool::map_unordered`].
pub struct MapUnordered<T> {
	result_receiver: Receiver<TaskResult<T>>,
	n_remaining: usize,
}

impl<T> Iterator for MapUnordered<T> {
	type Item = TaskResult<T>;

	fn next(&mut self) -> Option<Self::Item> {
		if self.n_remaining == 0 {
			return None;
		}
		let result = self.result_receiver.recv().ok()?;
		self.n_remaining -= 1;
		Some(result)
	}

	fn size_hint(&self) -> (usize, Option<usize>) {
		(self.n_remaining, Some(self.n_remaining))
	}
}
