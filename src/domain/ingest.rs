use serde::{Deserialize, Serialize};

/// A file received from an uploader.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UploadedFile {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

impl UploadedFile {
    pub fn new(file_name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            file_name: file_name.into(),
            bytes: bytes.into(),
        }
    }

    /// Uploads are accepted by a lowercase `.csv` suffix.
    pub fn is_csv(&self) -> bool {
        self.file_name.ends_with(".csv")
    }
}

/// Summary of one CSV ingestion run, returned to the uploader.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessResult {
    pub processed: usize,
    pub omitted: usize,
    pub errors: Vec<String>,
    pub success: bool,
}

impl ProcessResult {
    /// Records a row that was not persisted.
    pub fn omit(&mut self, diagnostic: String) {
        self.omitted += 1;
        self.errors.push(diagnostic);
    }

    /// Finalizes the run; `success` means at least one row was persisted.
    pub fn finish(mut self) -> Self {
        self.success = self.processed > 0;
        self
    }

    pub fn rows_seen(&self) -> usize {
        self.processed + self.omitted
    }
}
