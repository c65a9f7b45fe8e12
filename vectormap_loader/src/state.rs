//! Cache entry states.

use std::sync::Arc;

/// State of one `(coordinate, type)` cache entry.
///
/// An entry is created in `Pending` exactly once per load and moves to
/// exactly one terminal state. Terminal entries are immutable until
/// explicit eviction; their payloads are reference-counted so renderer
/// snapshots can share them without holding the cache lock.
#[derive(Debug)]
pub enum TileState<P> {
	/// Load in flight; wait for the callback.
	Pending,
	/// Payload available.
	Ready(Arc<P>),
	/// Bytes were present but undecodable; not retried automatically.
	ParsingFailed,
	/// Load abandoned during loader shutdown.
	Cancelled,
	/// Network or disk error with no bytes; an explicit re-request is
	/// allowed after evicting the entry.
	UnknownError,
}

/// Payload-free view of an entry's state, for callers that only need to
/// know where a load stands.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum TileStatus {
	Pending,
	Ready,
	ParsingFailed,
	Cancelled,
	UnknownError,
}

impl<P> TileState<P> {
	#[must_use]
	pub fn is_terminal(&self) -> bool {
		!matches!(self, TileState::Pending)
	}

	#[must_use]
	pub fn status(&self) -> TileStatus {
		match self {
			TileState::Pending => TileStatus::Pending,
			TileState::Ready(_) => TileStatus::Ready,
			TileState::ParsingFailed => TileStatus::ParsingFailed,
			TileState::Cancelled => TileStatus::Cancelled,
			TileState::UnknownError => TileStatus::UnknownError,
		}
	}

	#[must_use]
	pub fn payload(&self) -> Option<Arc<P>> {
		match self {
			TileState::Ready(payload) => Some(Arc::clone(payload)),
			_ => None,
		}
	}
}

impl<P> Clone for TileState<P> {
	fn clone(&self) -> Self {
		match self {
			TileState::Pending => TileState::Pending,
			TileState::Ready(payload) => TileState::Ready(Arc::clone(payload)),
			TileState::ParsingFailed => TileState::ParsingFailed,
			TileState::Cancelled => TileState::Cancelled,
			TileState::UnknownError => TileState::UnknownError,
		}
	}
}
