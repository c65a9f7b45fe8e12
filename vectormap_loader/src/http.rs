//! Network tier of the tile cache.

use anyhow::{Context, Result, bail};
use std::time::Duration;
use vectormap_core::{Blob, LoaderConfig, TileCoord, TileType, tile_url};

/// Shared blocking HTTP client with the loader's per-request timeout.
/// One fetcher exists per web-enabled loader; workers share it.
#[derive(Debug)]
pub struct TileFetcher {
	client: reqwest::blocking::Client,
	pbf_template: String,
	png_template: String,
}

impl TileFetcher {
	pub fn new(config: &LoaderConfig) -> Result<TileFetcher> {
		let client = reqwest::blocking::Client::builder()
			.tcp_keepalive(Duration::from_secs(600))
			.timeout(config.network_timeout)
			.build()
			.context("failed to build HTTP client")?;

		Ok(TileFetcher {
			client,
			pbf_template: config.pbf_url_template.clone(),
			png_template: config.png_url_template.clone(),
		})
	}

	/// Fetches one tile. Non-2xx responses, timeouts and transport
	/// failures are errors; the caller maps them to `UnknownError`.
	pub fn fetch(&self, coord: &TileCoord, tile_type: TileType) -> Result<Blob> {
		let template = match tile_type {
			TileType::Vector => &self.pbf_template,
			TileType::Raster => &self.png_template,
		};
		let url = tile_url(template, coord)?;

		let response = self
			.client
			.get(&url)
			.send()
			.with_context(|| format!("request to '{url}' failed"))?;

		let status = response.status();
		if !status.is_success() {
			bail!("unexpected status {status} from '{url}'");
		}

		let bytes = response
			.bytes()
			.with_context(|| format!("failed to read body from '{url}'"))?;
		Ok(Blob::from(bytes.to_vec()))
	}
}
