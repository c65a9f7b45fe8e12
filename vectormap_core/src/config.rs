//! Loader configuration.

use crate::MAX_ZOOM;
use std::{path::PathBuf, time::Duration};

/// Configuration for the tile loader. `Default` describes an offline
/// loader: no network, raster pipeline off, worker pool sized to the host
/// CPU count.
#[derive(Clone, Debug)]
pub struct LoaderConfig {
	/// Vector tile source URL template (`{z}`, `{x}`, `{y}` tokens).
	pub pbf_url_template: String,
	/// Raster tile source URL template.
	pub png_url_template: String,
	/// Root directory of the disk cache.
	pub cache_dir: PathBuf,
	/// Whether missing tiles may be fetched from the network.
	pub use_web: bool,
	/// Whether requested coordinates also drive raster loads.
	pub load_raster: bool,
	/// Worker pool size.
	pub worker_threads: usize,
	/// Per-fetch network timeout.
	pub network_timeout: Duration,
	/// Highest tile zoom the loader accepts.
	pub max_zoom: u8,
}

impl Default for LoaderConfig {
	fn default() -> Self {
		LoaderConfig {
			pbf_url_template: String::new(),
			png_url_template: String::new(),
			cache_dir: PathBuf::from("tile-cache"),
			use_web: false,
			load_raster: false,
			worker_threads: num_cpus::get(),
			network_timeout: Duration::from_secs(30),
			max_zoom: MAX_ZOOM,
		}
	}
}
