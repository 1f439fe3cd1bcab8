use crate::application::{ProductCatalogUseCase, ProductIngestionUseCase};

/// Everything the HTTP handlers reach through `web::Data`.
pub struct AppState {
    pub ingestion_use_case: ProductIngestionUseCase,
    pub catalog_use_case: ProductCatalogUseCase,
    pub max_upload_bytes: usize,
}
