//! Binary readers and writers for the tile wire format.

mod value_reader;
mod value_writer;

pub use value_reader::ValueReader;
pub use value_writer::ValueWriter;
