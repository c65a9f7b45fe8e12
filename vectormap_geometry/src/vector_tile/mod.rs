//! Vector tile (MVT) wire-format support.
//!
//! Decoding resolves the whole tile eagerly: geometry command streams
//! become typed shapes, dictionary indices become per-feature metadata
//! maps. Malformed input fails the entire tile; partial tiles are never
//! surfaced. Encoding covers the subset of features this crate models and
//! is byte-stable for tiles it produced itself.

mod feature;
mod geometry;
mod layer;
mod tile;

pub use feature::TileFeature;
pub use geometry::{FeatureGeometry, TilePath, TilePoint, ring_area};
pub use layer::{DEFAULT_EXTENT, TileLayer};
pub use tile::VectorTile;
