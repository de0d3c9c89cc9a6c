use std::io::Cursor;

use calamine::{Reader, Xls, Xlsx};

use crate::error::ExtractError;
use crate::extraction::GridExtraction;
use crate::model::{DocumentFormat, SheetGrid};

/// Read every sheet of an XLSX/XLS workbook into raw cell grids.
///
/// Sheets are iterated independently; a sheet that fails to load is skipped
/// with a warning rather than failing the whole workbook.
pub fn read_workbook(bytes: &[u8], format: DocumentFormat) -> Result<GridExtraction, ExtractError> {
    let cursor = Cursor::new(bytes);
    match format {
        DocumentFormat::Xlsx => {
            let mut workbook: Xlsx<_> = calamine::open_workbook_from_rs(cursor)
                .map_err(|e| ExtractError::Format(format!("failed to open xlsx: {e}")))?;
            finish(sheets_from(&mut workbook))
        }
        DocumentFormat::Xls => {
            let mut workbook: Xls<_> = calamine::open_workbook_from_rs(cursor)
                .map_err(|e| ExtractError::Format(format!("failed to open xls: {e}")))?;
            finish(sheets_from(&mut workbook))
        }
        other => Err(ExtractError::Format(format!(
            "'{other}' is not a workbook format"
        ))),
    }
}

/// Best-effort policy: sheets that failed only dent the result when at
/// least one sheet survived; a workbook where nothing decoded is a hard
/// format error.
fn finish(mut out: GridExtraction) -> Result<GridExtraction, ExtractError> {
    if out.sheets.is_empty() && !out.warnings.is_empty() {
        return Err(ExtractError::Format(format!(
            "no sheet could be decoded: {}",
            out.warnings.join("; ")
        )));
    }
    if !out.warnings.is_empty() {
        out.failure = Some(format!("{} sheet(s) failed to decode", out.warnings.len()));
    }
    Ok(out)
}

fn sheets_from<RS, R>(workbook: &mut R) -> GridExtraction
where
    RS: std::io::Read + std::io::Seek,
    R: Reader<RS>,
{
    let mut out = GridExtraction::default();
    let names: Vec<String> = workbook.sheet_names().to_owned();

    for name in names {
        let range = match workbook.worksheet_range(&name) {
            Ok(range) => range,
            Err(e) => {
                log::warn!("skipping sheet '{name}': {e:?}");
                out.warnings.push(format!("sheet '{name}': {e:?}"));
                continue;
            }
        };
        let rows: Vec<Vec<String>> = range
            .rows()
            .map(|row| {
                row.iter()
                    .map(|cell| cell_as_string(cell).unwrap_or_default())
                    .collect()
            })
            .collect();
        out.sheets.push(SheetGrid { name, rows });
    }

    out
}

fn cell_as_string(cell: &calamine::Data) -> Option<String> {
    match cell {
        calamine::Data::String(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                None
            } else {
                Some(trimmed.to_string())
            }
        }
        calamine::Data::Float(f) => Some(f.to_string()),
        calamine::Data::Int(i) => Some(i.to_string()),
        calamine::Data::Bool(b) => Some(b.to_string()),
        calamine::Data::DateTime(dt) => Some(dt.to_string()),
        calamine::Data::Empty => None,
        _ => Some(format!("{cell}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cell_string_trims_and_drops_empty() {
        assert_eq!(
            cell_as_string(&calamine::Data::String("  Bayer AG ".into())),
            Some("Bayer AG".to_string())
        );
        assert_eq!(cell_as_string(&calamine::Data::String("   ".into())), None);
        assert_eq!(cell_as_string(&calamine::Data::Empty), None);
    }

    #[test]
    fn cell_numbers_render_as_text() {
        assert_eq!(
            cell_as_string(&calamine::Data::Float(62.3)),
            Some("62.3".to_string())
        );
        assert_eq!(
            cell_as_string(&calamine::Data::Int(50)),
            Some("50".to_string())
        );
    }

    #[test]
    fn workbook_rejects_non_workbook_format() {
        assert!(read_workbook(b"a,b\n", DocumentFormat::Csv).is_err());
    }
}
