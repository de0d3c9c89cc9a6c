use crate::error::ExtractError;
use crate::extraction::GridExtraction;
use crate::model::SheetGrid;

/// Read a delimited text file into a single raw cell grid.
///
/// The delimiter is sniffed from the first line; real-world exports use
/// comma, semicolon and tab. Ragged rows are allowed; alignment to
/// the header happens when the grid becomes a table. Records that fail to
/// decode are skipped with a warning (best effort).
pub fn read_delimited(bytes: &[u8]) -> Result<GridExtraction, ExtractError> {
    if bytes.is_empty() {
        return Err(ExtractError::Format("empty delimited file".into()));
    }

    let delimiter = sniff_delimiter(bytes);
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(false)
        .flexible(true)
        .from_reader(bytes);

    let mut out = GridExtraction::default();
    let mut rows: Vec<Vec<String>> = Vec::new();
    for (i, record) in reader.records().enumerate() {
        match record {
            Ok(record) => {
                rows.push(record.iter().map(|field| field.trim().to_string()).collect());
            }
            Err(e) => {
                log::warn!("skipping record {}: {e}", i + 1);
                out.warnings.push(format!("record {}: {e}", i + 1));
            }
        }
    }

    if rows.is_empty() {
        if let Some(first) = out.warnings.first() {
            return Err(ExtractError::Format(format!(
                "no records could be decoded: {first}"
            )));
        }
        return Err(ExtractError::Format("no records in delimited file".into()));
    }
    if !out.warnings.is_empty() {
        out.failure = Some(format!("{} record(s) failed to decode", out.warnings.len()));
    }

    out.sheets.push(SheetGrid {
        name: String::new(),
        rows,
    });
    Ok(out)
}

/// Pick the candidate delimiter occurring most often in the first line.
fn sniff_delimiter(bytes: &[u8]) -> u8 {
    let first_line = bytes.split(|&b| b == b'\n').next().unwrap_or(bytes);
    let mut best = (b',', 0usize);
    for candidate in [b',', b';', b'\t'] {
        let count = first_line.iter().filter(|&&b| b == candidate).count();
        if count > best.1 {
            best = (candidate, count);
        }
    }
    best.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sniffs_comma() {
        assert_eq!(sniff_delimiter(b"ISIN,Name,Quantity\nUS..,Apple,100\n"), b',');
    }

    #[test]
    fn sniffs_semicolon() {
        assert_eq!(sniff_delimiter(b"ISIN;Name;Quantity"), b';');
    }

    #[test]
    fn sniffs_tab() {
        assert_eq!(sniff_delimiter(b"ISIN\tName\tQuantity"), b'\t');
    }

    #[test]
    fn reads_rows_with_trimmed_fields() {
        let grid = read_delimited(b"ISIN, Name ,Quantity\nDE000BAY0017, Bayer AG ,50\n").unwrap();
        assert_eq!(grid.sheets.len(), 1);
        let rows = &grid.sheets[0].rows;
        assert_eq!(rows[0], vec!["ISIN", "Name", "Quantity"]);
        assert_eq!(rows[1], vec!["DE000BAY0017", "Bayer AG", "50"]);
    }

    #[test]
    fn keeps_ragged_rows() {
        let grid = read_delimited(b"a,b,c\n1,2\n1,2,3,4\n").unwrap();
        let rows = &grid.sheets[0].rows;
        assert_eq!(rows[1].len(), 2);
        assert_eq!(rows[2].len(), 4);
    }

    #[test]
    fn empty_input_is_a_format_error() {
        assert!(matches!(
            read_delimited(b""),
            Err(ExtractError::Format(_))
        ));
    }
}
