use std::time::{Duration, Instant};

/// A cached value reported by a device, along with when it was last reported.
#[derive(Debug, Clone)]
pub struct Refreshable<T> {
	pub data: Option<T>,
	pub max_age: Duration,
	pub last_updated: Option<Instant>,
}

impl<T> Refreshable<T> {
	pub fn empty(max_age: Duration) -> Refreshable<T> {
		Refreshable {
			data: None,
			max_age,
			last_updated: None,
		}
	}

	pub fn update(&mut self, data: T) {
		self.data = Some(data);
		self.last_updated = Some(Instant::now());
	}

	/// Missing, or older than `max_age`.
	pub fn needs_refresh(&self) -> bool {
		match self.last_updated {
			Some(at) => at.elapsed() > self.max_age,
			None => true,
		}
	}

	pub fn as_ref(&self) -> Option<&T> {
		self.data.as_ref()
	}
}
