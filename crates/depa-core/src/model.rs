use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Input formats the engine accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentFormat {
    Pdf,
    Csv,
    Xlsx,
    Xls,
}

impl DocumentFormat {
    /// Resolve a format from a file extension (case-insensitive).
    pub fn from_extension(ext: &str) -> Option<DocumentFormat> {
        match ext.to_ascii_lowercase().as_str() {
            "pdf" => Some(DocumentFormat::Pdf),
            "csv" => Some(DocumentFormat::Csv),
            "xlsx" => Some(DocumentFormat::Xlsx),
            "xls" => Some(DocumentFormat::Xls),
            _ => None,
        }
    }

    /// True for formats that deliver cell grids directly instead of
    /// positioned text.
    pub fn is_grid(&self) -> bool {
        matches!(
            self,
            DocumentFormat::Csv | DocumentFormat::Xlsx | DocumentFormat::Xls
        )
    }
}

impl fmt::Display for DocumentFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DocumentFormat::Pdf => write!(f, "pdf"),
            DocumentFormat::Csv => write!(f, "csv"),
            DocumentFormat::Xlsx => write!(f, "xlsx"),
            DocumentFormat::Xls => write!(f, "xls"),
        }
    }
}

/// A run of text with its position in page space.
///
/// Coordinates follow PDF user space: origin at the lower-left corner of the
/// page, y increasing upward. Immutable once produced by an adapter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionedFragment {
    pub text: String,
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub page_index: usize,
}

/// All fragments of a single page, plus the page dimensions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageFragments {
    pub page_index: usize,
    pub width: f32,
    pub height: f32,
    pub fragments: Vec<PositionedFragment>,
}

/// One sheet worth of raw cell values (or the single grid of a delimited
/// file). Rows are kept ragged here; alignment to the header happens when
/// the grid becomes a [`Table`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SheetGrid {
    pub name: String,
    pub rows: Vec<Vec<String>>,
}

/// Where a table came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TableSource {
    Page(usize),
    Sheet(String),
}

/// A reconstructed or directly-read table.
///
/// Invariant: every row has exactly `header.len()` cells; missing values are
/// empty strings, never omitted. `id` is assigned in document order and is
/// stable for a given input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Table {
    pub id: usize,
    pub source: TableSource,
    pub header: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Table {
    pub fn column_count(&self) -> usize {
        self.header.len()
    }
}

/// A 12-character security code: two ASCII uppercase letters followed by
/// ten uppercase alphanumerics.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SecurityIdentifier(String);

impl SecurityIdentifier {
    /// Validate a candidate strictly. Returns `None` for anything that does
    /// not match the shape exactly.
    pub fn parse(raw: &str) -> Option<SecurityIdentifier> {
        let s = raw.trim();
        if s.len() != 12 {
            return None;
        }
        let bytes = s.as_bytes();
        if !bytes[..2].iter().all(|b| b.is_ascii_uppercase()) {
            return None;
        }
        if !bytes[2..]
            .iter()
            .all(|b| b.is_ascii_uppercase() || b.is_ascii_digit())
        {
            return None;
        }
        Some(SecurityIdentifier(s.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SecurityIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A price value with the currency symbol or code it was quoted in, when
/// one was present next to the number.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Price {
    pub value: Decimal,
    pub currency: Option<String>,
}

/// The source that contributed an extracted attribute.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Origin {
    FreeText { context: String },
    Table { table_id: usize, row: usize },
}

/// One identified security with everything the document said about it.
///
/// Created on first detection, completed by the reconciler, immutable
/// afterwards. Provenance is kept sorted and deduplicated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SecurityRecord {
    pub identifier: SecurityIdentifier,
    pub display_name: Option<String>,
    pub quantity: Option<Decimal>,
    pub price: Option<Price>,
    pub provenance: Vec<Origin>,
}

impl SecurityRecord {
    pub fn new(identifier: SecurityIdentifier, origin: Origin) -> SecurityRecord {
        SecurityRecord {
            identifier,
            display_name: None,
            quantity: None,
            price: None,
            provenance: vec![origin],
        }
    }

    pub fn add_origin(&mut self, origin: Origin) {
        if !self.provenance.contains(&origin) {
            self.provenance.push(origin);
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnitKind {
    Page,
    Sheet,
}

/// One page or sheet of the document, with its assembled text.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentUnit {
    pub index: usize,
    pub kind: UnitKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub text: String,
}

/// Adapter-level facts about the document plus degradation flags.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DocumentMetadata {
    pub format: Option<DocumentFormat>,
    pub unit_count: usize,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sheet_names: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub creator: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created: Option<String>,
    pub encrypted: bool,
    /// The adapter failed mid-document; everything decoded before the
    /// failure is present.
    pub partial: bool,
    /// The extraction deadline expired; later stages were skipped.
    pub incomplete: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

/// The immutable output of one extraction. Owned exclusively by the caller;
/// the engine holds no reference after returning it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionResult {
    pub full_text: String,
    pub units: Vec<DocumentUnit>,
    pub tables: Vec<Table>,
    pub securities: Vec<SecurityRecord>,
    pub metadata: DocumentMetadata,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identifier_accepts_isin_shape() {
        let id = SecurityIdentifier::parse("US0378331005").unwrap();
        assert_eq!(id.as_str(), "US0378331005");
    }

    #[test]
    fn identifier_trims_whitespace() {
        assert!(SecurityIdentifier::parse("  DE000BAY0017 ").is_some());
    }

    #[test]
    fn identifier_rejects_wrong_length() {
        assert!(SecurityIdentifier::parse("US037833100").is_none());
        assert!(SecurityIdentifier::parse("US03783310055").is_none());
    }

    #[test]
    fn identifier_rejects_digit_prefix() {
        assert!(SecurityIdentifier::parse("0S0378331005").is_none());
    }

    #[test]
    fn identifier_rejects_lowercase() {
        assert!(SecurityIdentifier::parse("us0378331005").is_none());
        assert!(SecurityIdentifier::parse("US037833100a").is_none());
    }

    #[test]
    fn format_from_extension() {
        assert_eq!(
            DocumentFormat::from_extension("PDF"),
            Some(DocumentFormat::Pdf)
        );
        assert_eq!(
            DocumentFormat::from_extension("xlsx"),
            Some(DocumentFormat::Xlsx)
        );
        assert_eq!(DocumentFormat::from_extension("docx"), None);
    }

    #[test]
    fn provenance_deduplicates() {
        let mut rec = SecurityRecord::new(
            SecurityIdentifier::parse("US0378331005").unwrap(),
            Origin::Table {
                table_id: 0,
                row: 1,
            },
        );
        rec.add_origin(Origin::Table {
            table_id: 0,
            row: 1,
        });
        assert_eq!(rec.provenance.len(), 1);
    }
}
