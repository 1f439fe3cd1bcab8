mod state;

pub use state::AppState;

use crate::domain::error::AppError;
use crate::domain::ingest::UploadedFile;
use crate::domain::product::NewProduct;
use crate::infrastructure::config::ServerConfig;
use crate::infrastructure::log_buffer::LogBuffer;
use actix_cors::Cors;
use actix_multipart::Multipart;
use actix_web::{
    delete, dev::Server, get, http::StatusCode, post, web, App, HttpResponse, HttpServer,
    Responder, ResponseError,
};
use futures_util::TryStreamExt;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Multipart field carrying the CSV.
pub const UPLOAD_FIELD: &str = "file";

pub struct HttpState {
    pub app_state: Arc<AppState>,
    pub logs: Arc<LogBuffer>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorBody {
    pub status_code: u16,
    pub error: String,
    pub message: String,
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::ValidationError(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::RateProviderError(_) => StatusCode::BAD_GATEWAY,
            AppError::StreamError(_)
            | AppError::DatabaseError(_)
            | AppError::IoError(_)
            | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        HttpResponse::build(status).json(ErrorBody {
            status_code: status.as_u16(),
            error: status.canonical_reason().unwrap_or("Error").to_string(),
            message: self.to_string(),
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// Reads the `file` part of a multipart body into memory, refusing bodies
/// larger than `limit` bytes. Other parts are skipped.
async fn read_upload(mut payload: Multipart, limit: usize) -> Result<Option<UploadedFile>, AppError> {
    while let Some(mut field) = payload
        .try_next()
        .await
        .map_err(|e| AppError::ValidationError(format!("Malformed multipart body: {}", e)))?
    {
        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }

        let file_name = field
            .content_disposition()
            .and_then(|cd| cd.get_filename())
            .unwrap_or_default()
            .to_string();

        let mut bytes = Vec::new();
        while let Some(chunk) = field
            .try_next()
            .await
            .map_err(|e| AppError::ValidationError(format!("Failed to read upload: {}", e)))?
        {
            if bytes.len() + chunk.len() > limit {
                return Err(AppError::ValidationError(format!(
                    "File is larger than the {} byte upload limit",
                    limit
                )));
            }
            bytes.extend_from_slice(&chunk);
        }

        return Ok(Some(UploadedFile { file_name, bytes }));
    }

    Ok(None)
}

#[post("/products/upload")]
async fn upload_products(
    data: web::Data<HttpState>,
    payload: Multipart,
) -> Result<HttpResponse, AppError> {
    let file = read_upload(payload, data.app_state.max_upload_bytes).await?;
    if let Some(file) = &file {
        data.logs.add(
            "INFO",
            "HttpApi",
            &format!("Received upload {}", file.file_name),
        );
    }

    match data.app_state.ingestion_use_case.execute(file).await {
        Ok(result) => Ok(HttpResponse::Ok().json(result)),
        Err(e) => {
            data.logs
                .add("ERROR", "HttpApi", &format!("Upload failed: {}", e));
            Err(e)
        }
    }
}

#[get("/products")]
async fn list_products(
    data: web::Data<HttpState>,
    query: web::Query<ListQuery>,
) -> Result<HttpResponse, AppError> {
    let products = data
        .app_state
        .catalog_use_case
        .list(query.limit, query.offset)
        .await?;
    Ok(HttpResponse::Ok().json(products))
}

#[post("/products")]
async fn create_product(
    data: web::Data<HttpState>,
    req: web::Json<NewProduct>,
) -> Result<HttpResponse, AppError> {
    let product = data
        .app_state
        .catalog_use_case
        .create(req.into_inner())
        .await?;
    data.logs.add(
        "INFO",
        "HttpApi",
        &format!("Created product {}", product.id),
    );
    Ok(HttpResponse::Created().json(product))
}

#[get("/products/{id}")]
async fn get_product(
    data: web::Data<HttpState>,
    id: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
    let product = data.app_state.catalog_use_case.get(id.into_inner()).await?;
    Ok(HttpResponse::Ok().json(product))
}

#[delete("/products/{id}")]
async fn delete_product(
    data: web::Data<HttpState>,
    id: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
    let id = id.into_inner();
    data.app_state.catalog_use_case.delete(id).await?;
    data.logs
        .add("INFO", "HttpApi", &format!("Deleted product {}", id));
    Ok(HttpResponse::NoContent().finish())
}

#[get("/logs")]
async fn get_logs(data: web::Data<HttpState>) -> impl Responder {
    HttpResponse::Ok().json(data.logs.snapshot())
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api").service(get_logs).service(
            web::scope("/v1")
                .service(upload_products)
                .service(list_products)
                .service(create_product)
                .service(get_product)
                .service(delete_product),
        ),
    );
}

pub fn start_server(
    app_state: Arc<AppState>,
    logs: Arc<LogBuffer>,
    config: &ServerConfig,
) -> std::io::Result<Server> {
    let state = web::Data::new(HttpState { app_state, logs });

    let server = HttpServer::new(move || {
        let cors = Cors::permissive();

        App::new()
            .wrap(cors)
            .app_data(state.clone())
            .configure(configure)
    })
    .bind((config.host.as_str(), config.port))?
    .run();

    Ok(server)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::{ProductCatalogUseCase, ProductIngestionUseCase};
    use crate::domain::error::Result;
    use crate::domain::ingest::ProcessResult;
    use crate::domain::product::{Product, RateTable};
    use crate::infrastructure::db::sqlite::SqliteRepository;
    use crate::infrastructure::log_buffer::LogEntry;
    use crate::infrastructure::rates::RateProvider;
    use actix_web::{http::header, test};
    use async_trait::async_trait;

    const BOUNDARY: &str = "product-reader-boundary";

    struct StaticRates(RateTable);

    #[async_trait]
    impl RateProvider for StaticRates {
        async fn latest_rates(&self) -> Result<RateTable> {
            Ok(self.0.clone())
        }
    }

    async fn http_state(rates: RateTable, max_upload_bytes: usize) -> web::Data<HttpState> {
        let logs = Arc::new(LogBuffer::default());
        let repository = Arc::new(SqliteRepository::init("sqlite::memory:", 1).await.unwrap());
        let app_state = AppState {
            ingestion_use_case: ProductIngestionUseCase::new(
                repository.clone(),
                Arc::new(StaticRates(rates)),
                500,
                logs.clone(),
            ),
            catalog_use_case: ProductCatalogUseCase::new(repository),
            max_upload_bytes,
        };
        web::Data::new(HttpState {
            app_state: Arc::new(app_state),
            logs,
        })
    }

    fn rates() -> RateTable {
        RateTable::from([("EUR".to_string(), 0.92), ("CAD".to_string(), 1.36)])
    }

    fn multipart_body(field: &str, file_name: &str, content: &str) -> Vec<u8> {
        format!(
            "--{b}\r\nContent-Disposition: form-data; name=\"{field}\"; filename=\"{file_name}\"\r\nContent-Type: text/csv\r\n\r\n{content}\r\n--{b}--\r\n",
            b = BOUNDARY
        )
        .into_bytes()
    }

    fn upload_request(body: Vec<u8>) -> test::TestRequest {
        test::TestRequest::post()
            .uri("/api/v1/products/upload")
            .insert_header((
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={}", BOUNDARY),
            ))
            .set_payload(body)
    }

    #[actix_web::test]
    async fn test_upload_processes_csv_and_lists_products() {
        let state = http_state(rates(), 1024 * 1024).await;
        let app = test::init_service(App::new().app_data(state.clone()).configure(configure)).await;

        let body = multipart_body("file", "products.csv", "Milk;2.50;1/2/2030\n;;\nTea;1.75;5/6/2031");
        let resp = test::call_service(&app, upload_request(body).to_request()).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let result: ProcessResult = test::read_body_json(resp).await;
        assert_eq!(result.processed, 2);
        assert_eq!(result.omitted, 1);
        assert_eq!(result.errors, vec!["Empty row encountered"]);
        assert!(result.success);

        let req = test::TestRequest::get().uri("/api/v1/products").to_request();
        let products: Vec<Product> = test::call_and_read_body_json(&app, req).await;
        assert_eq!(products.len(), 2);
        assert_eq!(products[0].name, "Tea");
        assert_eq!(products[0].currency_rates.get("CAD"), Some(&1.36));

        let req = test::TestRequest::get().uri("/api/logs").to_request();
        let logs: Vec<LogEntry> = test::call_and_read_body_json(&app, req).await;
        assert!(logs.iter().any(|e| e.message == "Processed 2 rows, omitted 1"));
    }

    #[actix_web::test]
    async fn test_upload_rejects_non_csv() {
        let state = http_state(rates(), 1024).await;
        let app = test::init_service(App::new().app_data(state).configure(configure)).await;

        let body = multipart_body("file", "products.txt", "Milk;2.50;1/2/2030");
        let resp = test::call_service(&app, upload_request(body).to_request()).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let err: ErrorBody = test::read_body_json(resp).await;
        assert_eq!(err.status_code, 400);
        assert_eq!(err.error, "Bad Request");
        assert!(err.message.contains("Only csv files are allowed!"));
    }

    #[actix_web::test]
    async fn test_upload_without_file_field() {
        let state = http_state(rates(), 1024).await;
        let app = test::init_service(App::new().app_data(state).configure(configure)).await;

        let body = multipart_body("attachment", "products.csv", "Milk;2.50;1/2/2030");
        let resp = test::call_service(&app, upload_request(body).to_request()).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let err: ErrorBody = test::read_body_json(resp).await;
        assert!(err.message.contains("No file provided"));
    }

    #[actix_web::test]
    async fn test_upload_with_no_rates_is_refused() {
        let state = http_state(RateTable::new(), 1024).await;
        let app = test::init_service(App::new().app_data(state.clone()).configure(configure)).await;

        let body = multipart_body("file", "products.csv", "Milk;2.50;1/2/2030");
        let resp = test::call_service(&app, upload_request(body).to_request()).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let err: ErrorBody = test::read_body_json(resp).await;
        assert!(err.message.contains("No exchange rates found"));

        let req = test::TestRequest::get().uri("/api/v1/products").to_request();
        let products: Vec<Product> = test::call_and_read_body_json(&app, req).await;
        assert!(products.is_empty());
    }

    #[actix_web::test]
    async fn test_upload_over_limit_is_refused() {
        let state = http_state(rates(), 16).await;
        let app = test::init_service(App::new().app_data(state).configure(configure)).await;

        let body = multipart_body("file", "products.csv", &"Milk;2.50;1/2/2030\n".repeat(4));
        let resp = test::call_service(&app, upload_request(body).to_request()).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[actix_web::test]
    async fn test_product_crud_endpoints() {
        let state = http_state(rates(), 1024).await;
        let app = test::init_service(App::new().app_data(state).configure(configure)).await;

        let req = test::TestRequest::post()
            .uri("/api/v1/products")
            .set_json(serde_json::json!({
                "name": "Honey",
                "price": 8.25,
                "expiration": "2032-01-31",
                "currency_rates": { "EUR": 0.92 }
            }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::CREATED);
        let created: Product = test::read_body_json(resp).await;

        let req = test::TestRequest::get()
            .uri(&format!("/api/v1/products/{}", created.id))
            .to_request();
        let fetched: Product = test::call_and_read_body_json(&app, req).await;
        assert_eq!(fetched, created);

        let req = test::TestRequest::delete()
            .uri(&format!("/api/v1/products/{}", created.id))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NO_CONTENT);

        let req = test::TestRequest::get()
            .uri(&format!("/api/v1/products/{}", created.id))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        let err: ErrorBody = test::read_body_json(resp).await;
        assert_eq!(err.status_code, 404);
    }

    #[actix_web::test]
    async fn test_create_product_validation_error() {
        let state = http_state(rates(), 1024).await;
        let app = test::init_service(App::new().app_data(state).configure(configure)).await;

        let req = test::TestRequest::post()
            .uri("/api/v1/products")
            .set_json(serde_json::json!({
                "name": "",
                "price": 1.0,
                "expiration": "2032-01-31"
            }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[actix_web::test]
    async fn test_error_status_mapping() {
        assert_eq!(
            AppError::RateProviderError("down".into()).status_code(),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            AppError::StreamError("x".into()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            AppError::NotFound("x".into()).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            AppError::ValidationError("x".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
    }
}
