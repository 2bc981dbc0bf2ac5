pub mod bundle;
pub mod columns;
pub mod metadata;
pub mod reader;
pub mod workbook;

pub use bundle::{BundleReader, DatasetBundle};
pub use reader::{detect_ext, reader_for, DatasetReader};
pub use workbook::WorkbookReader;
