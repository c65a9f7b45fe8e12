//! Decoded vector-tile model for the vectormap workspace.
//!
//! - `tag_value` / `meta`: typed feature metadata.
//! - `vector_tile`: MVT wire-format decode and encode.

mod meta;
mod tag_value;
pub mod vector_tile;

pub use meta::FeatureMeta;
pub use tag_value::TagValue;
pub use vector_tile::{DEFAULT_EXTENT, FeatureGeometry, TileFeature, TileLayer, TilePath, TilePoint, VectorTile};
