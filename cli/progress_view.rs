use num_traits::ToPrimitive;
use pslab_core::Progress;
use pslab_util::progress_counter::ProgressCounter;
use std::{
	io::Write,
	sync::mpsc::{channel, Receiver, Sender, TryRecvError},
	thread::{sleep, spawn, JoinHandle},
	time::{Duration, Instant},
};

/// Draws a progress bar for the driver on stderr from a background thread.
pub struct ProgressView {
	thread: Option<JoinHandle<()>>,
	sender: Option<Sender<Option<Progress>>>,
}

impl ProgressView {
	pub fn new() -> ProgressView {
		let (sender, receiver) = channel::<Option<Progress>>();
		let thread = Some(spawn(move || thread_main(receiver)));
		ProgressView {
			thread,
			sender: Some(sender),
		}
	}

	pub fn update(&mut self, progress: Progress) {
		if let Some(sender) = self.sender.as_ref() {
			sender.send(Some(progress)).ok();
		}
	}
}

impl Drop for ProgressView {
	fn drop(&mut self) {
		if let Some(sender) = self.sender.take() {
			sender.send(None).ok();
		}
		if let Some(thread) = self.thread.take() {
			thread.join().ok();
		}
	}
}

fn thread_main(receiver: Receiver<Option<Progress>>) {
	let mut progress: Option<(&'static str, ProgressCounter, Instant)> = None;
	loop {
		let done = match receiver.try_recv() {
			Err(TryRecvError::Empty) => false,
			Err(TryRecvError::Disconnected) | Ok(None) => true,
			Ok(Some(new_progress)) => {
				if let Some((label, counter, start)) = progress.as_ref() {
					draw(label, counter, *start);
					eprintln!();
				}
				let (label, counter) = match new_progress {
					Progress::Filtering(counter) => ("filtering", counter),
					Progress::Running(counter) => ("running", counter),
				};
				progress = Some((label, counter, Instant::now()));
				false
			}
		};
		if let Some((label, counter, start)) = progress.as_ref() {
			draw(label, counter, *start);
		}
		if done {
			if progress.is_some() {
				eprintln!();
			}
			break;
		}
		sleep(Duration::from_millis(100));
	}
}

const BAR_WIDTH: usize = 40;
const BAR_CHARS: [char; 9] = [' ', '▏', '▎', '▍', '▌', '▋', '▊', '▉', '█'];

fn draw(label: &str, counter: &ProgressCounter, start: Instant) {
	let fraction = counter.fraction();
	let mut bar = String::with_capacity(BAR_WIDTH);
	for i in 0..BAR_WIDTH {
		let fill_fraction = (fraction * BAR_WIDTH.to_f64().unwrap() - i.to_f64().unwrap())
			.max(0.0)
			.min(1.0);
		let char_index = (fill_fraction * (BAR_CHARS.len() - 1).to_f64().unwrap())
			.floor()
			.to_usize()
			.unwrap_or(0);
		bar.push(BAR_CHARS[char_index]);
	}
	let elapsed = start.elapsed();
	let eta = if fraction > std::f64::EPSILON && fraction < 1.0 {
		let elapsed_secs = elapsed.as_secs_f64();
		Some(Duration::from_secs_f64(elapsed_secs / fraction - elapsed_secs))
	} else {
		None
	};
	let mut line = format!(
		"\r\x1b[0K{} |{}| {} / {} {} elapsed",
		label,
		bar,
		counter.get(),
		counter.total(),
		DisplayDuration(elapsed)
	);
	if let Some(eta) = eta {
		line.push_str(&format!(" {} remaining", DisplayDuration(eta)));
	}
	let mut stderr = std::io::stderr();
	stderr.write_all(line.as_bytes()).ok();
	stderr.flush().ok();
}

pub struct DisplayDuration(pub Duration);

impl std::fmt::Display for DisplayDuration {
	fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
		let seconds = self.0.as_secs();
		let minutes = seconds / 60;
		let hours = seconds / (60 * 60);
		let days = seconds / (24 * 60 * 60);
		if days >= 1 {
			write!(f, "{}d {}h", days, (seconds - days * (24 * 60 * 60)) / (60 * 60))
		} else if hours >= 1 {
			write!(f, "{}h {}m", hours, (seconds - hours * (60 * 60)) / 60)
		} else if minutes >= 1 {
			write!(f, "{}m {}s", minutes, seconds - minutes * 60)
		} else {
			write!(f, "{}s", seconds)
		}
	}
}

#[test]
fn test_display_duration() {
	assert_eq!(DisplayDuration(Duration::from_secs(42)).to_string(), "42s");
	assert_eq!(DisplayDuration(Duration::from_secs(125)).to_string(), "2m 5s");
	assert_eq!(DisplayDuration(Duration::from_secs(3 * 3600 + 120)).to_string(), "3h 2m");
	assert_eq!(DisplayDuration(Duration::from_secs(26 * 3600)).to_string(), "1d 2h");
}
