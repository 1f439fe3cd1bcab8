// ============================================================
// PRODUCT ROW DECODER
// ============================================================
// Pull-based decoding of uploaded CSV bytes into raw product rows

use std::io::Read;

use csv::{ByteRecord, Reader, ReaderBuilder};

use crate::domain::error::{AppError, Result};
use crate::domain::product::RawRow;

/// Field separator of product uploads.
pub const PRODUCT_DELIMITER: u8 = b';';

/// Reader settings for product uploads: `name;price;expiration`, no header
/// row, values passed through untrimmed.
#[derive(Debug, Default)]
pub struct ProductCsvReader;

impl ProductCsvReader {
    pub fn new() -> Self {
        Self
    }

    /// Starts decoding `source`. Rows are produced lazily, one per call to
    /// `next`, and the sequence cannot be restarted.
    pub fn rows<R: Read>(&self, source: R) -> RowDecoder<R> {
        let reader = ReaderBuilder::new()
            .delimiter(PRODUCT_DELIMITER)
            .has_headers(false)
            .flexible(true) // Short and long rows are both accepted
            .from_reader(source);

        RowDecoder {
            reader,
            record: ByteRecord::new(),
            finished: false,
        }
    }
}

/// Iterator over the rows of one upload.
///
/// Yields `Err` once if the underlying stream fails and then stops. Blank
/// lines produce nothing; a line with only separators produces a blank row.
pub struct RowDecoder<R> {
    reader: Reader<R>,
    record: ByteRecord,
    finished: bool,
}

impl<R: Read> RowDecoder<R> {
    fn field(&self, index: usize) -> String {
        self.record
            .get(index)
            .map(|bytes| String::from_utf8_lossy(bytes).into_owned())
            .unwrap_or_default()
    }
}

impl<R: Read> Iterator for RowDecoder<R> {
    type Item = Result<RawRow>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }

        match self.reader.read_byte_record(&mut self.record) {
            Ok(true) => Some(Ok(RawRow {
                name: self.field(0),
                price: self.field(1),
                expiration: self.field(2),
            })),
            Ok(false) => {
                self.finished = true;
                None
            }
            Err(e) => {
                self.finished = true;
                let line = e.position().map(|p| p.line()).unwrap_or_default();
                Some(Err(AppError::StreamError(format!(
                    "Failed to read CSV near line {}: {}",
                    line, e
                ))))
            }
        }
    }
}
