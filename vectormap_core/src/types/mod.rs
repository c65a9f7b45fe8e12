mod blob;
mod tile_coord;
mod tile_type;

pub use blob::Blob;
pub use tile_coord::{MAX_ZOOM, TileCoord};
pub use tile_type::TileType;
