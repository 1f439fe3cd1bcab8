use crate::domain::error::{AppError, Result};
use crate::domain::product::{CleanRow, NewProduct, Product};
use crate::infrastructure::db::sqlite::SqliteRepository;
use std::sync::Arc;
use validator::Validate;

pub const DEFAULT_PAGE_SIZE: i64 = 50;
pub const MAX_PAGE_SIZE: i64 = 500;

/// Read, create and delete access to stored products.
pub struct ProductCatalogUseCase {
    repository: Arc<SqliteRepository>,
}

impl ProductCatalogUseCase {
    pub fn new(repository: Arc<SqliteRepository>) -> Self {
        Self { repository }
    }

    pub async fn list(&self, limit: Option<i64>, offset: Option<i64>) -> Result<Vec<Product>> {
        let limit = limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE);
        let offset = offset.unwrap_or(0).max(0);
        self.repository.list_products(limit, offset).await
    }

    pub async fn get(&self, id: i64) -> Result<Product> {
        self.repository
            .find_product(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Product {} does not exist", id)))
    }

    pub async fn create(&self, product: NewProduct) -> Result<Product> {
        product
            .validate()
            .map_err(|e| AppError::ValidationError(e.to_string()))?;
        self.repository.create_product(&CleanRow::from(product)).await
    }

    pub async fn delete(&self, id: i64) -> Result<()> {
        if self.repository.delete_product(id).await? {
            Ok(())
        } else {
            Err(AppError::NotFound(format!("Product {} does not exist", id)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::product::RateTable;
    use chrono::NaiveDate;

    async fn catalog() -> ProductCatalogUseCase {
        let repository = SqliteRepository::init("sqlite::memory:", 1).await.unwrap();
        ProductCatalogUseCase::new(Arc::new(repository))
    }

    fn new_product(name: &str, price: f64) -> NewProduct {
        NewProduct {
            name: name.to_string(),
            price,
            expiration: NaiveDate::from_ymd_opt(2031, 3, 1).unwrap(),
            currency_rates: RateTable::from([("GBP".to_string(), 0.79)]),
        }
    }

    #[tokio::test]
    async fn test_create_get_delete() {
        let catalog = catalog().await;

        let created = catalog.create(new_product("Coffee", 7.5)).await.unwrap();
        let fetched = catalog.get(created.id).await.unwrap();
        assert_eq!(fetched.name, "Coffee");
        assert_eq!(fetched.currency_rates.get("GBP"), Some(&0.79));

        catalog.delete(created.id).await.unwrap();
        assert!(matches!(
            catalog.get(created.id).await,
            Err(AppError::NotFound(_))
        ));
        assert!(matches!(
            catalog.delete(created.id).await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_create_rejects_invalid_payload() {
        let catalog = catalog().await;
        let err = catalog.create(new_product("", 1.0)).await.unwrap_err();
        assert!(matches!(err, AppError::ValidationError(_)));
        assert!(catalog.list(None, None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_list_clamps_paging() {
        let catalog = catalog().await;
        for i in 0..3 {
            catalog
                .create(new_product(&format!("P{}", i), 1.0))
                .await
                .unwrap();
        }

        assert_eq!(catalog.list(Some(0), None).await.unwrap().len(), 1);
        assert_eq!(catalog.list(Some(10_000), Some(-5)).await.unwrap().len(), 3);
        let page = catalog.list(Some(2), Some(2)).await.unwrap();
        assert_eq!(page.len(), 1);
        assert_eq!(page[0].name, "P0");
    }
}
