pub mod sqlite;

use crate::domain::error::Result;
use crate::domain::product::CleanRow;
use async_trait::async_trait;

/// Bulk destination for validated rows.
///
/// An `Err` means nothing from `rows` was stored.
#[async_trait]
pub trait ProductSink {
    async fn insert_many(&self, rows: &[CleanRow]) -> Result<()>;
}
