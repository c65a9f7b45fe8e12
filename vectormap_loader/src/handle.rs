//! Completion subscriptions and the opaque request handle.
//!
//! Load jobs do not own their callbacks; they look subscribers up in a
//! table keyed by `(type, coordinate)` when a terminal state is
//! published. Cancelling a subscription is therefore a table mutation,
//! never thread interruption: dropping a [`RequestHandle`] silences the
//! callbacks it registered while the underlying job keeps running and
//! still populates the cache.

use parking_lot::Mutex;
use std::{
	collections::HashMap,
	sync::{Arc, Weak},
};
use vectormap_core::{TileCoord, TileType};

pub(crate) type TileKey = (TileType, TileCoord);
/// Invoked once per subscription when a tile reaches a terminal state.
pub type ReadyCallback = Arc<dyn Fn(TileCoord) + Send + Sync>;

#[derive(Default)]
pub(crate) struct SubscriptionTable {
	next_id: u64,
	by_tile: HashMap<TileKey, Vec<(u64, ReadyCallback)>>,
}

impl SubscriptionTable {
	pub fn subscribe(&mut self, key: TileKey, callback: ReadyCallback) -> u64 {
		let id = self.next_id;
		self.next_id += 1;
		self.by_tile.entry(key).or_default().push((id, callback));
		id
	}

	/// Removes and returns every callback waiting on `key`.
	pub fn drain(&mut self, key: &TileKey) -> Vec<ReadyCallback> {
		self
			.by_tile
			.remove(key)
			.map(|subscribers| subscribers.into_iter().map(|(_, callback)| callback).collect())
			.unwrap_or_default()
	}

	pub fn remove(&mut self, key: &TileKey, id: u64) {
		if let Some(subscribers) = self.by_tile.get_mut(key) {
			subscribers.retain(|(entry_id, _)| *entry_id != id);
			if subscribers.is_empty() {
				self.by_tile.remove(key);
			}
		}
	}

	#[cfg(test)]
	pub fn waiting_on(&self, key: &TileKey) -> usize {
		self.by_tile.get(key).map_or(0, Vec::len)
	}
}

/// Opaque token returned by `request_tiles`. Its only observable
/// operation is destruction, which silences the callbacks it carried;
/// dropping it from any thread is safe. The in-flight loads themselves
/// are not aborted.
pub struct RequestHandle {
	table: Weak<Mutex<SubscriptionTable>>,
	subscriptions: Vec<(TileKey, u64)>,
}

impl RequestHandle {
	pub(crate) fn new(table: Weak<Mutex<SubscriptionTable>>, subscriptions: Vec<(TileKey, u64)>) -> RequestHandle {
		RequestHandle { table, subscriptions }
	}

	/// Number of callbacks this handle still keeps alive.
	#[must_use]
	pub fn subscription_count(&self) -> usize {
		self.subscriptions.len()
	}
}

impl Drop for RequestHandle {
	fn drop(&mut self) {
		// loader already gone: nothing left to silence
		let Some(table) = self.table.upgrade() else {
			return;
		};
		let mut table = table.lock();
		for (key, id) in &self.subscriptions {
			table.remove(key, *id);
		}
	}
}
