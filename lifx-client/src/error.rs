use std::io;
use thiserror::Error;

/// Errors returned by a [crate::Client] or one of its [crate::Light]s.
#[derive(Error, Debug)]
pub enum Error {
	/// No light matched the request, or no lights have been discovered yet.
	///
	/// Discovery is asynchronous, so this is usually worth retrying until some deadline.
	#[error("not found")]
	NotFound,

	/// The light is known, but it hasn't reported this part of its state yet.
	#[error("no {what} reported yet by light {id}")]
	NoState { id: u64, what: &'static str },

	/// There is no interface to broadcast on, and none was configured.
	#[error("no broadcast address available")]
	NoBroadcastAddress,

	/// A message could not be encoded or decoded.
	#[error("protocol error: `{0}`")]
	Protocol(String),

	#[error("i/o error")]
	Io(#[from] io::Error),
}

impl Error {
	pub(crate) fn protocol(err: impl std::fmt::Display) -> Self {
		Error::Protocol(err.to_string())
	}

	/// True for the errors that only mean "nothing (yet)".
	pub fn is_not_found(&self) -> bool {
		matches!(self, Error::NotFound)
	}
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
