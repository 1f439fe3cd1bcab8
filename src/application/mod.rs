pub mod use_cases;

pub use use_cases::product_ingestion::ProductIngestionUseCase;
pub use use_cases::products::ProductCatalogUseCase;
