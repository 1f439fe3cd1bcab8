pub mod batch;
pub mod product_ingestion;
pub mod products;
pub mod rate_attacher;
pub mod sanitizer;
