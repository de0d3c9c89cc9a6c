pub mod delimited;
pub mod pdf;
pub mod workbook;

use crate::error::ExtractError;
use crate::model::{PageFragments, SheetGrid};

/// Output of a page-based adapter: positioned fragments per page plus the
/// document-level facts the format exposes.
#[derive(Debug, Clone, Default)]
pub struct PageExtraction {
    pub pages: Vec<PageFragments>,
    pub author: Option<String>,
    pub creator: Option<String>,
    pub created: Option<String>,
    pub encrypted: bool,
    /// Set when decoding failed partway through; `pages` holds everything
    /// decoded before the failure.
    pub failure: Option<String>,
    pub warnings: Vec<String>,
}

/// Output of a grid-based adapter: one grid per sheet.
#[derive(Debug, Clone, Default)]
pub struct GridExtraction {
    pub sheets: Vec<SheetGrid>,
    pub failure: Option<String>,
    pub warnings: Vec<String>,
}

/// Trait for page-based extraction backends.
///
/// The shipped backend decodes PDFs; tests and alternative decoders inject
/// their own fragment sets through this seam.
pub trait PageSource: Send + Sync {
    /// Decode the byte stream into positioned fragments, one entry per page.
    ///
    /// Best-effort: a failure after some pages decoded is reported through
    /// [`PageExtraction::failure`], not as an `Err`. `Err` means nothing
    /// could be decoded at all.
    fn extract_pages(&self, bytes: &[u8]) -> Result<PageExtraction, ExtractError>;

    /// Name of this extraction backend (for diagnostics).
    fn backend_name(&self) -> &str;
}
