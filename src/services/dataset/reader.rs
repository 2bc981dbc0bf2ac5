use bytes::Bytes;

use super::bundle::BundleReader;
use super::workbook::WorkbookReader;
use crate::error::AppError;
use crate::models::Dataset;

/// Turns an uploaded file into a dataset plus its variable metadata.
pub trait DatasetReader: Send + Sync {
    fn read(&self, bytes: Bytes) -> Result<Dataset, AppError>;
}

pub const ACCEPTED_EXTENSIONS: &[&str] = &["json", "xlsx"];

/// Lowercased extension without the dot, or an empty string.
pub fn detect_ext(filename: &str) -> String {
    std::path::Path::new(filename)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_lowercase())
        .unwrap_or_default()
}

pub fn reader_for(filename: &str) -> Result<Box<dyn DatasetReader>, AppError> {
    match detect_ext(filename).as_str() {
        "json" => Ok(Box::new(BundleReader)),
        "xlsx" => Ok(Box::new(WorkbookReader)),
        "sav" => Err(AppError::UnsupportedFormat(format!(
            "{}: SPSS system files must be converted to a dataset bundle (.json) first",
            filename
        ))),
        _ => Err(AppError::UnsupportedFormat(format!(
            "{}: upload one of {}",
            filename,
            ACCEPTED_EXTENSIONS
                .iter()
                .map(|ext| format!(".{ext}"))
                .collect::<Vec<_>>()
                .join(", ")
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extension_detection_is_case_insensitive() {
        assert_eq!(detect_ext("Survey.XLSX"), "xlsx");
        assert_eq!(detect_ext("data.tar.json"), "json");
        assert_eq!(detect_ext("noext"), "");
    }

    #[test]
    fn rejects_unknown_formats() {
        assert!(matches!(reader_for("a.csv"), Err(AppError::UnsupportedFormat(_))));
        assert!(matches!(reader_for("a.sav"), Err(AppError::UnsupportedFormat(_))));
        assert!(reader_for("a.json").is_ok());
        assert!(reader_for("a.xlsx").is_ok());
    }
}
