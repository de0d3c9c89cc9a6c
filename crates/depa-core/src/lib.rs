pub mod entities;
pub mod error;
pub mod extraction;
pub mod model;
pub mod reconcile;
pub mod tables;

use std::path::Path;
use std::time::{Duration, Instant};

use error::ExtractError;
use extraction::pdf::PdfAdapter;
use extraction::{GridExtraction, PageExtraction, PageSource};
use model::{
    DocumentFormat, DocumentMetadata, DocumentUnit, ExtractionResult, Table, UnitKind,
};
use tables::ReconstructorConfig;

/// Per-extraction knobs. One instance can serve many extractions; the
/// engine itself keeps no state between calls.
#[derive(Debug, Clone)]
pub struct ExtractOptions {
    /// Soft deadline for the whole extraction. Checked between stages and
    /// between pages; on expiry the partial result is returned tagged
    /// incomplete instead of an error.
    pub timeout: Option<Duration>,
    /// Character radius of the context window around free-text identifier
    /// matches.
    pub context_radius: usize,
    pub reconstructor: ReconstructorConfig,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        ExtractOptions {
            timeout: None,
            context_radius: 120,
            reconstructor: ReconstructorConfig::default(),
        }
    }
}

/// Read a file and extract it, sniffing the format from the extension.
pub fn extract_file(
    path: &Path,
    options: &ExtractOptions,
) -> Result<ExtractionResult, ExtractError> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_string();
    let format = DocumentFormat::from_extension(&extension)
        .ok_or(ExtractError::UnsupportedFormat { extension })?;
    let bytes = std::fs::read(path)?;
    extract(&bytes, format, options)
}

/// Main API entry point: turn one document's bytes into an
/// [`ExtractionResult`].
///
/// Pure transformation with no shared state between invocations, so
/// independent documents can be extracted fully in parallel from the
/// outside.
pub fn extract(
    bytes: &[u8],
    format: DocumentFormat,
    options: &ExtractOptions,
) -> Result<ExtractionResult, ExtractError> {
    match format {
        DocumentFormat::Pdf => {
            let mut result = extract_with_source(bytes, &PdfAdapter::new(), options)?;
            result.metadata.format = Some(DocumentFormat::Pdf);
            Ok(result)
        }
        DocumentFormat::Csv => {
            let deadline = Deadline::start(options.timeout);
            let grids = extraction::delimited::read_delimited(bytes)?;
            finish_grids(grids, DocumentFormat::Csv, options, &deadline)
        }
        DocumentFormat::Xlsx | DocumentFormat::Xls => {
            let deadline = Deadline::start(options.timeout);
            let grids = extraction::workbook::read_workbook(bytes, format)?;
            finish_grids(grids, format, options, &deadline)
        }
    }
}

/// Run the page-based pipeline with an injected extraction backend.
///
/// This is the seam tests and alternative PDF decoders plug into; `extract`
/// routes PDFs through it with the shipped [`PdfAdapter`].
pub fn extract_with_source(
    bytes: &[u8],
    source: &dyn PageSource,
    options: &ExtractOptions,
) -> Result<ExtractionResult, ExtractError> {
    let deadline = Deadline::start(options.timeout);
    let extraction = source.extract_pages(bytes)?;
    log::debug!(
        "{} page(s) decoded via {}",
        extraction.pages.len(),
        source.backend_name()
    );
    if extraction.pages.is_empty() && deadline.expired() {
        return Err(ExtractError::Timeout {
            elapsed: deadline.elapsed(),
        });
    }

    let PageExtraction {
        pages,
        author,
        creator,
        created,
        encrypted,
        failure,
        warnings,
    } = extraction;

    let mut metadata = DocumentMetadata {
        author,
        creator,
        created,
        encrypted,
        partial: failure.is_some(),
        warnings,
        ..DocumentMetadata::default()
    };
    if let Some(reason) = failure {
        log::warn!("partial extraction: {reason}");
        metadata.warnings.push(reason);
    }

    let units: Vec<DocumentUnit> = pages
        .iter()
        .map(|page| DocumentUnit {
            index: page.page_index,
            kind: UnitKind::Page,
            name: None,
            text: tables::page_lines(page, &options.reconstructor).join("\n"),
        })
        .collect();

    // Pages are independent; the deadline is only consulted between them.
    let mut detected: Vec<Table> = Vec::new();
    for page in &pages {
        if deadline.expired() {
            mark_incomplete(&mut metadata, &deadline);
            break;
        }
        let found = tables::reconstruct_page_tables(page, &options.reconstructor, detected.len());
        detected.extend(found);
    }

    Ok(assemble(units, detected, metadata, options, &deadline))
}

fn finish_grids(
    grids: GridExtraction,
    format: DocumentFormat,
    options: &ExtractOptions,
    deadline: &Deadline,
) -> Result<ExtractionResult, ExtractError> {
    if grids.sheets.is_empty() && deadline.expired() {
        return Err(ExtractError::Timeout {
            elapsed: deadline.elapsed(),
        });
    }

    let mut metadata = DocumentMetadata {
        format: Some(format),
        sheet_names: grids
            .sheets
            .iter()
            .filter(|s| !s.name.is_empty())
            .map(|s| s.name.clone())
            .collect(),
        partial: grids.failure.is_some(),
        warnings: grids.warnings,
        ..DocumentMetadata::default()
    };
    if let Some(reason) = grids.failure {
        log::warn!("partial extraction: {reason}");
        metadata.warnings.push(reason);
    }

    let units: Vec<DocumentUnit> = grids
        .sheets
        .iter()
        .enumerate()
        .map(|(index, sheet)| DocumentUnit {
            index,
            kind: UnitKind::Sheet,
            name: (!sheet.name.is_empty()).then(|| sheet.name.clone()),
            text: sheet
                .rows
                .iter()
                .map(|row| row.join(" "))
                .collect::<Vec<_>>()
                .join("\n"),
        })
        .collect();

    let mut detected: Vec<Table> = Vec::new();
    for sheet in &grids.sheets {
        if deadline.expired() {
            mark_incomplete(&mut metadata, deadline);
            break;
        }
        if let Some(table) = tables::table_from_grid(sheet, detected.len()) {
            detected.push(table);
        }
    }

    Ok(assemble(units, detected, metadata, options, deadline))
}

/// Final stages shared by both pipelines: entity passes, reconciliation,
/// result assembly. The reconciler is the only stage needing the complete
/// per-document view, so it always runs over whatever the earlier stages
/// managed to produce.
fn assemble(
    units: Vec<DocumentUnit>,
    tables: Vec<Table>,
    mut metadata: DocumentMetadata,
    options: &ExtractOptions,
    deadline: &Deadline,
) -> ExtractionResult {
    let full_text = units
        .iter()
        .map(|u| u.text.as_str())
        .collect::<Vec<_>>()
        .join("\n");

    let (text_records, table_records) = if deadline.expired() {
        mark_incomplete(&mut metadata, deadline);
        (Vec::new(), Vec::new())
    } else {
        (
            entities::text::scan_text(&full_text, options.context_radius),
            entities::table::scan_tables(&tables),
        )
    };
    let securities = reconcile::reconcile(text_records, table_records);

    metadata.unit_count = units.len();
    ExtractionResult {
        full_text,
        units,
        tables,
        securities,
        metadata,
    }
}

fn mark_incomplete(metadata: &mut DocumentMetadata, deadline: &Deadline) {
    if !metadata.incomplete {
        metadata.incomplete = true;
        let warning = format!(
            "extraction deadline expired after {:?}; later stages skipped",
            deadline.elapsed()
        );
        log::warn!("{warning}");
        metadata.warnings.push(warning);
    }
}

/// Soft per-document deadline. Stages poll it at their boundaries; nothing
/// is cancelled mid-stage.
struct Deadline {
    started: Instant,
    timeout: Option<Duration>,
}

impl Deadline {
    fn start(timeout: Option<Duration>) -> Deadline {
        Deadline {
            started: Instant::now(),
            timeout,
        }
    }

    fn expired(&self) -> bool {
        self.timeout
            .is_some_and(|limit| self.started.elapsed() >= limit)
    }

    fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deadline_without_timeout_never_expires() {
        let deadline = Deadline::start(None);
        assert!(!deadline.expired());
    }

    #[test]
    fn zero_timeout_expires_immediately() {
        let deadline = Deadline::start(Some(Duration::ZERO));
        assert!(deadline.expired());
    }
}
