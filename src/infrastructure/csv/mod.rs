// ============================================================
// CSV INFRASTRUCTURE LAYER
// ============================================================
// Decoding of uploaded product files

mod row_decoder;

pub use row_decoder::{ProductCsvReader, RowDecoder};
