use super::batch::Batch;
use super::rate_attacher::RateAttacher;
use super::sanitizer::{check_row, RowVerdict};
use crate::domain::error::{AppError, Result};
use crate::domain::ingest::{ProcessResult, UploadedFile};
use crate::domain::product::{CurrencyRates, RawRow};
use crate::infrastructure::csv::ProductCsvReader;
use crate::infrastructure::db::ProductSink;
use crate::infrastructure::log_buffer::LogBuffer;
use crate::infrastructure::rates::RateProvider;
use std::io::Read;
use std::sync::Arc;

pub const NO_FILE_MESSAGE: &str = "No file provided. Please upload a valid CSV file.";
pub const NOT_CSV_MESSAGE: &str = "Only csv files are allowed!";
pub const NO_RATES_MESSAGE: &str = "No exchange rates found. Unable to process the file.";
pub const FLUSH_FAILED_MESSAGE: &str = "Failed to insert batch into the database.";
pub const EMPTY_ROW_MESSAGE: &str = "Empty row encountered";

// ============================================================
// USE CASE
// ============================================================

/// Streams an uploaded CSV through sanitizing, validation, rate attachment
/// and batched persistence.
pub struct ProductIngestionUseCase {
    sink: Arc<dyn ProductSink + Send + Sync>,
    rate_provider: Arc<dyn RateProvider + Send + Sync>,
    batch_size: usize,
    logs: Arc<LogBuffer>,
}

impl ProductIngestionUseCase {
    pub fn new(
        sink: Arc<dyn ProductSink + Send + Sync>,
        rate_provider: Arc<dyn RateProvider + Send + Sync>,
        batch_size: usize,
        logs: Arc<LogBuffer>,
    ) -> Self {
        Self {
            sink,
            rate_provider,
            batch_size,
            logs,
        }
    }

    /// Checks the upload, fetches rates once, then processes the file.
    pub async fn execute(&self, file: Option<UploadedFile>) -> Result<ProcessResult> {
        let file = file.ok_or_else(|| AppError::ValidationError(NO_FILE_MESSAGE.to_string()))?;
        if !file.is_csv() {
            return Err(AppError::ValidationError(NOT_CSV_MESSAGE.to_string()));
        }

        self.logs.add(
            "INFO",
            "Ingest",
            &format!("Processing {} ({} bytes)", file.file_name, file.bytes.len()),
        );

        let rates = self.rate_provider.latest_rates().await?;
        self.process_file(file.bytes.as_slice(), Arc::new(rates)).await
    }

    pub async fn process_file<R: Read>(
        &self,
        source: R,
        rates: CurrencyRates,
    ) -> Result<ProcessResult> {
        let rows = ProductCsvReader::new().rows(source);
        self.process_rows(rows, rates).await
    }

    /// Drives one run over already-decoded rows.
    ///
    /// Row problems are tallied in the result. A decoder failure or a failed
    /// flush ends the run with an error; batches flushed before that point
    /// stay persisted.
    pub async fn process_rows<I>(&self, rows: I, rates: CurrencyRates) -> Result<ProcessResult>
    where
        I: IntoIterator<Item = Result<RawRow>>,
    {
        if rates.is_empty() {
            return Err(AppError::ValidationError(NO_RATES_MESSAGE.to_string()));
        }

        let attacher = RateAttacher::new(rates);
        let mut batch = Batch::with_capacity(self.batch_size);
        let mut result = ProcessResult::default();

        for decoded in rows {
            let raw = match decoded {
                Ok(raw) => raw,
                Err(err) => {
                    self.logs.add(
                        "ERROR",
                        "Ingest",
                        &format!("{} ({} rows already persisted)", err, result.processed),
                    );
                    return Err(err);
                }
            };

            if raw.is_blank() {
                result.omit(EMPTY_ROW_MESSAGE.to_string());
                continue;
            }

            match check_row(&raw) {
                Ok(RowVerdict::Valid(row)) => {
                    if batch.push(attacher.attach(row)) {
                        self.flush(&mut batch, &mut result).await?;
                    }
                }
                Ok(RowVerdict::Omit(diagnostic)) => result.omit(diagnostic),
                Err(err) => result.omit(format!(
                    "Error processing row: {} - {}",
                    raw.to_json(),
                    err.message()
                )),
            }
        }

        if !batch.is_empty() {
            self.flush(&mut batch, &mut result).await?;
        }

        let result = result.finish();
        self.logs.add(
            "INFO",
            "Ingest",
            &format!(
                "Processed {} rows, omitted {}",
                result.processed, result.omitted
            ),
        );
        Ok(result)
    }

    async fn flush(&self, batch: &mut Batch, result: &mut ProcessResult) -> Result<()> {
        if let Err(err) = self.sink.insert_many(batch.rows()).await {
            self.logs.add(
                "ERROR",
                "Ingest",
                &format!(
                    "Batch of {} rows failed: {} ({} rows already persisted)",
                    batch.len(),
                    err,
                    result.processed
                ),
            );
            return Err(AppError::StreamError(FLUSH_FAILED_MESSAGE.to_string()));
        }

        result.processed += batch.len();
        batch.clear();
        Ok(())
    }
}

// ============================================================
// TESTS
// ============================================================
