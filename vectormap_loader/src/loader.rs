//! The three-tier tile loader.
//!
//! `request_tiles` returns synchronously with a snapshot of everything
//! already decoded in memory; missing tiles are loaded on a bounded worker
//! pool that consults the disk cache and then the network (or an injected
//! byte source), publishing exactly one terminal state per load and
//! notifying subscribers once per subscription.
//!
//! Locking: one mutex guards both memory maps, a second guards the
//! subscription table, and they are only ever nested in the order
//! memory → subscriptions (`request_tiles`). Workers take them one at a
//! time: publish under the memory lock, then drain subscribers under the
//! table lock, then invoke callbacks with no lock held. Because a job can
//! only publish while `request_tiles` is not holding the memory lock,
//! every subscription made against a `Pending` entry is observed by that
//! job's drain; callbacks are neither lost nor duplicated.

use crate::{
	disk::DiskCache,
	handle::{ReadyCallback, RequestHandle, SubscriptionTable, TileKey},
	http::TileFetcher,
	pool::WorkerPool,
	state::{TileState, TileStatus},
};
use anyhow::{Result, anyhow, ensure};
use image::RgbaImage;
use log::{debug, warn};
use parking_lot::Mutex;
use std::{
	collections::{BTreeMap, BTreeSet, HashMap},
	path::Path,
	sync::{
		Arc,
		atomic::{AtomicBool, Ordering},
	},
};
use vectormap_core::{Blob, LoaderConfig, TileCoord, TileType};
use vectormap_geometry::VectorTile;

/// Injectable byte source standing in for the network tier in
/// deterministic tests: `None` means "no such tile".
pub type ByteSource = Arc<dyn Fn(&TileCoord, TileType) -> Option<Blob> + Send + Sync>;

/// What `request_tiles` hands back synchronously: the requested tiles
/// that are already decoded, sharing their immutable payloads.
#[derive(Clone, Debug, Default)]
pub struct TileSnapshot {
	pub vector: BTreeMap<TileCoord, Arc<VectorTile>>,
	pub raster: BTreeMap<TileCoord, Arc<RgbaImage>>,
}

#[derive(Default)]
struct MemoryMaps {
	vector: HashMap<TileCoord, TileState<VectorTile>>,
	raster: HashMap<TileCoord, TileState<RgbaImage>>,
}

pub(crate) struct LoaderShared {
	config: LoaderConfig,
	memory: Mutex<MemoryMaps>,
	subscriptions: Arc<Mutex<SubscriptionTable>>,
	disk: DiskCache,
	fetcher: Option<TileFetcher>,
	source: Option<ByteSource>,
	shutting_down: AtomicBool,
}

#[derive(Clone, Copy, Debug)]
pub(crate) struct LoadJob {
	pub coord: TileCoord,
	pub tile_type: TileType,
}

pub struct TileLoader {
	shared: Arc<LoaderShared>,
	pool: WorkerPool,
}

impl TileLoader {
	/// Builds a loader from its configuration; the network tier is active
	/// when `use_web` is set.
	pub fn new(config: LoaderConfig) -> Result<TileLoader> {
		if config.use_web {
			ensure!(
				!config.pbf_url_template.is_empty(),
				"web-enabled loader needs a vector tile URL template"
			);
			ensure!(
				!config.load_raster || !config.png_url_template.is_empty(),
				"raster loading needs a raster tile URL template"
			);
		}
		TileLoader::build(config, None)
	}

	/// Offline loader: memory and disk only, the network is never
	/// contacted.
	pub fn local(mut config: LoaderConfig) -> Result<TileLoader> {
		config.use_web = false;
		TileLoader::build(config, None)
	}

	/// Offline loader with an injectable byte source standing in for the
	/// network; used by deterministic tests.
	pub fn dummy(
		cache_dir: &Path,
		source: Option<ByteSource>,
		load_raster: bool,
		worker_threads: Option<usize>,
	) -> Result<TileLoader> {
		let config = LoaderConfig {
			cache_dir: cache_dir.to_path_buf(),
			load_raster,
			worker_threads: worker_threads.unwrap_or_else(num_cpus::get),
			..LoaderConfig::default()
		};
		TileLoader::build(config, source)
	}

	fn build(config: LoaderConfig, source: Option<ByteSource>) -> Result<TileLoader> {
		let fetcher = if config.use_web { Some(TileFetcher::new(&config)?) } else { None };
		let disk = DiskCache::new(&config.cache_dir)?;
		let workers = config.worker_threads.max(1);

		let shared = Arc::new(LoaderShared {
			config,
			memory: Mutex::new(MemoryMaps::default()),
			subscriptions: Arc::new(Mutex::new(SubscriptionTable::default())),
			disk,
			fetcher,
			source,
			shutting_down: AtomicBool::new(false),
		});
		let pool = WorkerPool::spawn(workers, &shared);

		Ok(TileLoader { shared, pool })
	}

	/// Requests a set of tiles.
	///
	/// Returns synchronously with the requested tiles that are already in
	/// `Ready` state. For each missing tile, when `load_missing` is set
	/// and a callback is present, an entry is created in `Pending` (iff no
	/// entry exists; concurrent requests coalesce into the one in-flight
	/// job) and a load job is queued; the callback fires exactly once per
	/// subscription when the tile reaches a terminal state. Dropping the
	/// returned handle silences its callbacks without aborting loads.
	pub fn request_tiles(
		&self,
		requested: &BTreeSet<TileCoord>,
		on_ready: Option<ReadyCallback>,
		load_missing: bool,
	) -> Result<(TileSnapshot, RequestHandle)> {
		for coord in requested {
			ensure!(
				coord.is_valid() && coord.level <= self.shared.config.max_zoom,
				"invalid coordinate {coord:?} (max zoom {})",
				self.shared.config.max_zoom
			);
		}

		let subscribe = if load_missing { on_ready.as_ref() } else { None };
		let mut snapshot = TileSnapshot::default();
		let mut subscriptions: Vec<(TileKey, u64)> = Vec::new();
		let mut jobs: Vec<LoadJob> = Vec::new();

		{
			let mut memory = self.shared.memory.lock();
			let mut table = self.shared.subscriptions.lock();
			for &coord in requested {
				classify(
					&mut memory.vector,
					&mut table,
					coord,
					TileType::Vector,
					subscribe,
					&mut snapshot.vector,
					&mut jobs,
					&mut subscriptions,
				);
				if self.shared.config.load_raster {
					classify(
						&mut memory.raster,
						&mut table,
						coord,
						TileType::Raster,
						subscribe,
						&mut snapshot.raster,
						&mut jobs,
						&mut subscriptions,
					);
				}
			}
		}

		for job in jobs {
			self.pool.enqueue(job);
		}

		let handle = RequestHandle::new(Arc::downgrade(&self.shared.subscriptions), subscriptions);
		Ok((snapshot, handle))
	}

	/// Payload-free state of an entry, if one exists.
	#[must_use]
	pub fn status(&self, coord: &TileCoord, tile_type: TileType) -> Option<TileStatus> {
		let memory = self.shared.memory.lock();
		match tile_type {
			TileType::Vector => memory.vector.get(coord).map(TileState::status),
			TileType::Raster => memory.raster.get(coord).map(TileState::status),
		}
	}

	/// Evicts a terminal entry so the next request starts a fresh load;
	/// the explicit path for retrying after `UnknownError`. Pending
	/// entries are kept, since removing them would break single-flight.
	pub fn forget(&self, coord: &TileCoord, tile_type: TileType) -> bool {
		fn evict<P>(entries: &mut HashMap<TileCoord, TileState<P>>, coord: &TileCoord) -> bool {
			if entries.get(coord).is_some_and(TileState::is_terminal) {
				entries.remove(coord);
				return true;
			}
			false
		}

		let mut memory = self.shared.memory.lock();
		match tile_type {
			TileType::Vector => evict(&mut memory.vector, coord),
			TileType::Raster => evict(&mut memory.raster, coord),
		}
	}
}

impl Drop for TileLoader {
	fn drop(&mut self) {
		// jobs still queued when the pool drains observe this flag and
		// publish `Cancelled`
		self.shared.shutting_down.store(true, Ordering::SeqCst);
	}
}

#[allow(clippy::too_many_arguments)]
fn classify<P>(
	entries: &mut HashMap<TileCoord, TileState<P>>,
	table: &mut SubscriptionTable,
	coord: TileCoord,
	tile_type: TileType,
	subscribe: Option<&ReadyCallback>,
	ready: &mut BTreeMap<TileCoord, Arc<P>>,
	jobs: &mut Vec<LoadJob>,
	subscriptions: &mut Vec<(TileKey, u64)>,
) {
	match entries.get(&coord) {
		Some(TileState::Ready(payload)) => {
			ready.insert(coord, Arc::clone(payload));
		}
		Some(TileState::Pending) => {
			// the in-flight job will notify everyone subscribed by then
			if let Some(callback) = subscribe {
				let id = table.subscribe((tile_type, coord), Arc::clone(callback));
				subscriptions.push(((tile_type, coord), id));
			}
		}
		Some(_) => {
			// failed terminally before; not retried automatically
		}
		None => {
			if let Some(callback) = subscribe {
				entries.insert(coord, TileState::Pending);
				let id = table.subscribe((tile_type, coord), Arc::clone(callback));
				subscriptions.push(((tile_type, coord), id));
				jobs.push(LoadJob { coord, tile_type });
			}
		}
	}
}

enum Decoded {
	Vector(VectorTile),
	Raster(RgbaImage),
}

enum Outcome {
	Ready(Decoded),
	ParsingFailed,
	Cancelled,
	UnknownError,
}

/// Executes one load job on a worker thread: memory, then disk, then the
/// remote tier. Decoding and I/O happen without any lock held.
pub(crate) fn run_job(shared: &Arc<LoaderShared>, job: &LoadJob) {
	if shared.shutting_down.load(Ordering::SeqCst) {
		publish(shared, job, Outcome::Cancelled);
		return;
	}

	// memory tier: the entry may have completed while this job sat queued
	{
		let memory = shared.memory.lock();
		let already_ready = match job.tile_type {
			TileType::Vector => matches!(memory.vector.get(&job.coord), Some(TileState::Ready(_))),
			TileType::Raster => matches!(memory.raster.get(&job.coord), Some(TileState::Ready(_))),
		};
		if already_ready {
			drop(memory);
			notify(shared, job);
			return;
		}
	}

	// disk tier
	match shared.disk.read(&job.coord, job.tile_type) {
		Ok(Some(bytes)) => {
			match decode(job.tile_type, &bytes) {
				Ok(payload) => publish(shared, job, Outcome::Ready(payload)),
				Err(err) => {
					debug!("cached tile {} is undecodable: {err:#}", job.coord.file_stem());
					publish(shared, job, Outcome::ParsingFailed);
				}
			}
			return;
		}
		Ok(None) => {}
		// a disk failure is logged and the pipeline proceeds
		Err(err) => warn!("disk read failed for {}: {err:#}", job.coord.file_stem()),
	}

	// remote tier: injected byte source, or the network when enabled
	let bytes = if let Some(source) = &shared.source {
		source(&job.coord, job.tile_type).ok_or_else(|| anyhow!("byte source has no such tile"))
	} else if let Some(fetcher) = &shared.fetcher {
		fetcher.fetch(&job.coord, job.tile_type)
	} else {
		publish(shared, job, Outcome::UnknownError);
		return;
	};

	match bytes {
		Ok(bytes) => match decode(job.tile_type, &bytes) {
			Ok(payload) => {
				// write-through is best effort and never downgrades the
				// memory state
				if let Err(err) = shared.disk.write(&job.coord, job.tile_type, &bytes) {
					warn!("disk write-through failed for {}: {err:#}", job.coord.file_stem());
				}
				publish(shared, job, Outcome::Ready(payload));
			}
			Err(err) => {
				debug!("fetched tile {} is undecodable: {err:#}", job.coord.file_stem());
				publish(shared, job, Outcome::ParsingFailed);
			}
		},
		Err(err) => {
			debug!("fetch failed for {}: {err:#}", job.coord.file_stem());
			publish(shared, job, Outcome::UnknownError);
		}
	}
}

/// Publishes a terminal state under the memory lock, then notifies.
fn publish(shared: &Arc<LoaderShared>, job: &LoadJob, outcome: Outcome) {
	{
		let mut memory = shared.memory.lock();
		match job.tile_type {
			TileType::Vector => {
				let state = match outcome {
					Outcome::Ready(Decoded::Vector(tile)) => TileState::Ready(Arc::new(tile)),
					Outcome::Ready(Decoded::Raster(_)) => unreachable!("raster payload for a vector job"),
					Outcome::ParsingFailed => TileState::ParsingFailed,
					Outcome::Cancelled => TileState::Cancelled,
					Outcome::UnknownError => TileState::UnknownError,
				};
				set_terminal(&mut memory.vector, job.coord, state);
			}
			TileType::Raster => {
				let state = match outcome {
					Outcome::Ready(Decoded::Raster(image)) => TileState::Ready(Arc::new(image)),
					Outcome::Ready(Decoded::Vector(_)) => unreachable!("vector payload for a raster job"),
					Outcome::ParsingFailed => TileState::ParsingFailed,
					Outcome::Cancelled => TileState::Cancelled,
					Outcome::UnknownError => TileState::UnknownError,
				};
				set_terminal(&mut memory.raster, job.coord, state);
			}
		}
	}
	notify(shared, job);
}

/// A terminal entry never transitions again.
fn set_terminal<P>(entries: &mut HashMap<TileCoord, TileState<P>>, coord: TileCoord, state: TileState<P>) {
	if entries.get(&coord).is_some_and(TileState::is_terminal) {
		warn!("ignoring second terminal state for {}", coord.file_stem());
		return;
	}
	entries.insert(coord, state);
}

/// Invokes every callback subscribed to this tile, outside all locks.
fn notify(shared: &Arc<LoaderShared>, job: &LoadJob) {
	let callbacks = shared.subscriptions.lock().drain(&(job.tile_type, job.coord));
	for callback in callbacks {
		callback(job.coord);
	}
}

fn decode(tile_type: TileType, bytes: &Blob) -> Result<Decoded> {
	match tile_type {
		TileType::Vector => Ok(Decoded::Vector(VectorTile::from_blob(bytes)?)),
		TileType::Raster => Ok(Decoded::Raster(
			image::load_from_memory_with_format(bytes.as_slice(), image::ImageFormat::Png)?.to_rgba8(),
		)),
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::{
		sync::atomic::AtomicUsize,
		sync::mpsc,
		time::Duration,
	};
	use tempfile::TempDir;
	use vectormap_geometry::{FeatureGeometry, FeatureMeta, TagValue, TileFeature, TileLayer};

	const WAIT: Duration = Duration::from_secs(5);

	fn example_tile_bytes() -> Blob {
		let mut layer = TileLayer::new("water");
		layer.features.push(TileFeature {
			id: None,
			geometry: FeatureGeometry::Point(vec![[2048.0, 2048.0]]),
			meta: FeatureMeta::from(vec![("class", TagValue::from("ocean"))]),
		});
		VectorTile::new(vec![layer]).to_blob().unwrap()
	}

	fn tiny_png() -> Blob {
		let image = image::RgbaImage::from_pixel(1, 1, image::Rgba([10, 20, 30, 255]));
		let mut bytes = std::io::Cursor::new(Vec::new());
		image::DynamicImage::ImageRgba8(image)
			.write_to(&mut bytes, image::ImageFormat::Png)
			.unwrap();
		Blob::from(bytes.into_inner())
	}

	fn channel_callback() -> (ReadyCallback, mpsc::Receiver<TileCoord>) {
		let (sender, receiver) = mpsc::channel();
		let callback: ReadyCallback = Arc::new(move |coord| {
			sender.send(coord).ok();
		});
		(callback, receiver)
	}

	fn request_one(
		loader: &TileLoader,
		coord: TileCoord,
		on_ready: Option<ReadyCallback>,
		load_missing: bool,
	) -> (TileSnapshot, RequestHandle) {
		loader
			.request_tiles(&BTreeSet::from([coord]), on_ready, load_missing)
			.expect("request_tiles")
	}

	#[test]
	fn offline_disk_hit_notifies_once_then_serves_synchronously() -> Result<()> {
		let dir = TempDir::new()?;
		let coord = TileCoord::new(2, 1, 1)?;
		std::fs::write(dir.path().join("z2x1y1.mvt"), example_tile_bytes().as_slice())?;

		let loader = TileLoader::dummy(dir.path(), None, false, Some(2))?;
		let (callback, received) = channel_callback();

		let (snapshot, _handle) = request_one(&loader, coord, Some(callback), true);
		assert!(snapshot.vector.is_empty());

		assert_eq!(received.recv_timeout(WAIT).unwrap(), coord);
		// exactly one notification
		assert!(received.recv_timeout(Duration::from_millis(100)).is_err());

		let (snapshot, _handle) = request_one(&loader, coord, None, false);
		let tile = snapshot.vector.get(&coord).expect("tile is served synchronously now");
		assert!(tile.layer("water").is_some());
		Ok(())
	}

	#[test]
	fn corrupt_disk_tile_is_parsing_failed_and_not_retried() -> Result<()> {
		let dir = TempDir::new()?;
		let coord = TileCoord::new(2, 1, 1)?;
		let mut bytes = example_tile_bytes().into_vec();
		bytes[0] ^= 0xFF;
		std::fs::write(dir.path().join("z2x1y1.mvt"), &bytes)?;

		let loader = TileLoader::dummy(dir.path(), None, false, Some(1))?;
		let (callback, received) = channel_callback();

		let (_, _handle) = request_one(&loader, coord, Some(callback), true);
		assert_eq!(received.recv_timeout(WAIT).unwrap(), coord);
		assert_eq!(loader.status(&coord, TileType::Vector), Some(TileStatus::ParsingFailed));

		// a repeat request does not re-attempt the disk read
		let (another, receiver2) = channel_callback();
		let (snapshot, handle) = request_one(&loader, coord, Some(another), true);
		assert!(snapshot.vector.is_empty());
		assert_eq!(handle.subscription_count(), 0);
		assert!(receiver2.recv_timeout(Duration::from_millis(200)).is_err());
		Ok(())
	}

	#[test]
	fn concurrent_requests_share_a_single_load() -> Result<()> {
		let dir = TempDir::new()?;
		let coord = TileCoord::new(3, 2, 5)?;

		let fetches = Arc::new(AtomicUsize::new(0));
		let (release, gate) = mpsc::channel::<()>();
		let gate = std::sync::Mutex::new(gate);
		let tile_bytes = example_tile_bytes();
		let source: ByteSource = {
			let fetches = Arc::clone(&fetches);
			Arc::new(move |_, _| {
				fetches.fetch_add(1, Ordering::SeqCst);
				gate.lock().unwrap().recv().ok();
				Some(tile_bytes.clone())
			})
		};

		let loader = TileLoader::dummy(dir.path(), Some(source), false, Some(2))?;

		let (callback_a, received_a) = channel_callback();
		let (callback_b, received_b) = channel_callback();
		// both requests arrive while the single job is still in flight
		let (_, _handle_a) = request_one(&loader, coord, Some(callback_a), true);
		let (_, _handle_b) = request_one(&loader, coord, Some(callback_b), true);
		release.send(()).unwrap();

		assert_eq!(received_a.recv_timeout(WAIT).unwrap(), coord);
		assert_eq!(received_b.recv_timeout(WAIT).unwrap(), coord);
		assert_eq!(fetches.load(Ordering::SeqCst), 1);
		assert_eq!(loader.status(&coord, TileType::Vector), Some(TileStatus::Ready));
		Ok(())
	}

	#[test]
	fn dropping_the_handle_silences_the_callback() -> Result<()> {
		let dir = TempDir::new()?;
		let coord = TileCoord::new(1, 0, 0)?;

		let (release, gate) = mpsc::channel::<()>();
		let gate = std::sync::Mutex::new(gate);
		let tile_bytes = example_tile_bytes();
		let source: ByteSource = Arc::new(move |_, _| {
			gate.lock().unwrap().recv().ok();
			Some(tile_bytes.clone())
		});

		let loader = TileLoader::dummy(dir.path(), Some(source), false, Some(1))?;
		let (callback, received) = channel_callback();

		let (_, handle) = request_one(&loader, coord, Some(callback), true);
		drop(handle);
		release.send(()).unwrap();

		// the load itself still completes and populates the cache
		while loader.status(&coord, TileType::Vector) == Some(TileStatus::Pending) {
			std::thread::sleep(Duration::from_millis(10));
		}
		assert_eq!(loader.status(&coord, TileType::Vector), Some(TileStatus::Ready));
		assert!(received.recv_timeout(Duration::from_millis(200)).is_err());
		Ok(())
	}

	#[test]
	fn fetched_tiles_are_written_through_to_disk() -> Result<()> {
		let dir = TempDir::new()?;
		let coord = TileCoord::new(2, 3, 0)?;
		let tile_bytes = example_tile_bytes();
		let source: ByteSource = {
			let bytes = tile_bytes.clone();
			Arc::new(move |_, _| Some(bytes.clone()))
		};

		let loader = TileLoader::dummy(dir.path(), Some(source), false, Some(1))?;
		let (callback, received) = channel_callback();
		let (_, _handle) = request_one(&loader, coord, Some(callback), true);
		received.recv_timeout(WAIT).unwrap();

		let written = std::fs::read(dir.path().join("z2x3y0.mvt"))?;
		assert_eq!(written, tile_bytes.into_vec());
		Ok(())
	}

	#[test]
	fn missing_remote_tile_is_unknown_error_and_forget_allows_retry() -> Result<()> {
		let dir = TempDir::new()?;
		let coord = TileCoord::new(4, 7, 9)?;
		let calls = Arc::new(AtomicUsize::new(0));
		let source: ByteSource = {
			let calls = Arc::clone(&calls);
			Arc::new(move |_, _| {
				calls.fetch_add(1, Ordering::SeqCst);
				None
			})
		};

		let loader = TileLoader::dummy(dir.path(), Some(source), false, Some(1))?;
		let (callback, received) = channel_callback();
		let (_, _handle) = request_one(&loader, coord, Some(callback), true);
		received.recv_timeout(WAIT).unwrap();
		assert_eq!(loader.status(&coord, TileType::Vector), Some(TileStatus::UnknownError));
		assert_eq!(calls.load(Ordering::SeqCst), 1);

		// terminal entries are not retried until explicitly evicted
		let (callback2, received2) = channel_callback();
		let (_, _handle) = request_one(&loader, coord, Some(callback2), true);
		assert!(received2.recv_timeout(Duration::from_millis(200)).is_err());

		assert!(loader.forget(&coord, TileType::Vector));
		let (callback3, received3) = channel_callback();
		let (_, _handle) = request_one(&loader, coord, Some(callback3), true);
		received3.recv_timeout(WAIT).unwrap();
		assert_eq!(calls.load(Ordering::SeqCst), 2);
		Ok(())
	}

	#[test]
	fn load_missing_false_or_no_callback_does_nothing() -> Result<()> {
		let dir = TempDir::new()?;
		let coord = TileCoord::new(2, 1, 1)?;
		let loader = TileLoader::dummy(dir.path(), None, false, Some(1))?;

		let (callback, _received) = channel_callback();
		let (snapshot, handle) = request_one(&loader, coord, Some(callback), false);
		assert!(snapshot.vector.is_empty());
		assert_eq!(handle.subscription_count(), 0);
		assert_eq!(loader.status(&coord, TileType::Vector), None);

		let (snapshot, _handle) = request_one(&loader, coord, None, true);
		assert!(snapshot.vector.is_empty());
		assert_eq!(loader.status(&coord, TileType::Vector), None);
		Ok(())
	}

	#[test]
	fn raster_pipeline_decodes_png() -> Result<()> {
		let dir = TempDir::new()?;
		let coord = TileCoord::new(2, 1, 1)?;
		let png = tiny_png();
		let source: ByteSource = {
			let png = png.clone();
			Arc::new(move |_, tile_type| match tile_type {
				TileType::Raster => Some(png.clone()),
				TileType::Vector => None,
			})
		};

		let loader = TileLoader::dummy(dir.path(), Some(source), true, Some(2))?;
		let (callback, received) = channel_callback();
		let (_, _handle) = request_one(&loader, coord, Some(callback), true);

		// one notification per tile type
		received.recv_timeout(WAIT).unwrap();
		received.recv_timeout(WAIT).unwrap();

		assert_eq!(loader.status(&coord, TileType::Raster), Some(TileStatus::Ready));
		assert_eq!(loader.status(&coord, TileType::Vector), Some(TileStatus::UnknownError));

		let (snapshot, _handle) = request_one(&loader, coord, None, false);
		let image = snapshot.raster.get(&coord).expect("raster payload");
		assert_eq!(image.dimensions(), (1, 1));
		assert_eq!(image.get_pixel(0, 0).0, [10, 20, 30, 255]);
		Ok(())
	}

	#[test]
	fn out_of_range_coordinates_are_rejected_at_the_surface() -> Result<()> {
		let dir = TempDir::new()?;
		let loader = TileLoader::dummy(dir.path(), None, false, Some(1))?;
		let mut forged = TileCoord::new(2, 3, 3)?;
		forged.x = 77;
		assert!(
			loader
				.request_tiles(&BTreeSet::from([forged]), None, false)
				.is_err()
		);
		Ok(())
	}

	#[test]
	fn shutdown_cancels_queued_jobs_but_still_notifies() -> Result<()> {
		let dir = TempDir::new()?;
		let coord_a = TileCoord::new(5, 1, 1)?;
		let coord_b = TileCoord::new(5, 2, 2)?;

		let calls = Arc::new(AtomicUsize::new(0));
		let (release, gate) = mpsc::channel::<()>();
		let gate = std::sync::Mutex::new(gate);
		let tile_bytes = example_tile_bytes();
		let source: ByteSource = {
			let calls = Arc::clone(&calls);
			Arc::new(move |_, _| {
				calls.fetch_add(1, Ordering::SeqCst);
				gate.lock().unwrap().recv().ok();
				Some(tile_bytes.clone())
			})
		};

		// one worker: job A blocks in the source while job B sits queued
		let loader = TileLoader::dummy(dir.path(), Some(source), false, Some(1))?;
		let (callback, received) = channel_callback();
		let (_snapshot, _handle) = loader.request_tiles(&BTreeSet::from([coord_a, coord_b]), Some(callback), true)?;

		// wait until job A is inside the source before shutting down
		while calls.load(Ordering::SeqCst) == 0 {
			std::thread::sleep(Duration::from_millis(5));
		}
		let releaser = std::thread::spawn(move || {
			std::thread::sleep(Duration::from_millis(50));
			release.send(()).ok();
		});
		// drop sets the shutdown flag, closes the queue and joins workers
		drop(loader);
		releaser.join().unwrap();

		// both tiles notified: A through its real load, B through Cancelled
		let mut seen = vec![received.try_recv().unwrap(), received.try_recv().unwrap()];
		seen.sort();
		assert_eq!(seen, vec![coord_a, coord_b]);
		// the source was only ever consulted for A
		assert_eq!(calls.load(Ordering::SeqCst), 1);
		Ok(())
	}
}
