use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::model::{PageFragments, PositionedFragment, SheetGrid, Table, TableSource};

/// Tunable clustering thresholds for table reconstruction.
///
/// The defaults reproduce the heuristic behavior the engine was built
/// around; callers with unusually tight or loose layouts can adjust them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconstructorConfig {
    /// Fragments whose rounded vertical positions fall within this delta
    /// belong to the same row.
    pub row_tolerance: f32,
    /// Horizontal positions are rounded to multiples of this delta before
    /// becoming column boundaries.
    pub column_tolerance: f32,
    /// Minimum number of consecutive structurally similar rows for a
    /// candidate table.
    pub min_run_rows: usize,
    /// Minimum fragments per row for a run to count as tabular.
    pub min_row_fragments: usize,
}

impl Default for ReconstructorConfig {
    fn default() -> Self {
        ReconstructorConfig {
            row_tolerance: 1.0,
            column_tolerance: 1.0,
            min_run_rows: 3,
            min_row_fragments: 3,
        }
    }
}

/// One visual row: fragments sharing a vertical bucket, ordered
/// left-to-right.
#[derive(Debug, Clone)]
pub struct TextRow {
    pub y: f32,
    pub fragments: Vec<PositionedFragment>,
}

/// Cluster a page's fragments into rows, top-to-bottom.
///
/// Rows are keyed by vertical position rounded to `row_tolerance`; page
/// space has y increasing upward, so larger keys come first.
pub fn bucket_rows(fragments: &[PositionedFragment], config: &ReconstructorConfig) -> Vec<TextRow> {
    let tolerance = config.row_tolerance.max(f32::EPSILON);
    let mut keyed: Vec<(i64, &PositionedFragment)> = fragments
        .iter()
        .map(|f| ((f.y / tolerance).round() as i64, f))
        .collect();
    keyed.sort_by(|a, b| {
        b.0.cmp(&a.0)
            .then_with(|| a.1.x.total_cmp(&b.1.x))
    });

    let mut rows: Vec<TextRow> = Vec::new();
    let mut current_key: Option<i64> = None;
    for (key, fragment) in keyed {
        match rows.last_mut() {
            Some(row) if current_key == Some(key) => row.fragments.push(fragment.clone()),
            _ => {
                rows.push(TextRow {
                    y: fragment.y,
                    fragments: vec![fragment.clone()],
                });
                current_key = Some(key);
            }
        }
    }
    rows
}

/// The assembled text lines of a page, reading order.
pub fn page_lines(page: &PageFragments, config: &ReconstructorConfig) -> Vec<String> {
    bucket_rows(&page.fragments, config)
        .iter()
        .map(|row| {
            row.fragments
                .iter()
                .map(|f| f.text.as_str())
                .collect::<Vec<_>>()
                .join(" ")
        })
        .collect()
}

/// Reconstruct candidate tables from one page of positioned fragments.
///
/// Table ids are assigned sequentially starting at `id_offset` so that ids
/// stay stable in document order when pages are processed one by one.
pub fn reconstruct_page_tables(
    page: &PageFragments,
    config: &ReconstructorConfig,
    id_offset: usize,
) -> Vec<Table> {
    let rows = bucket_rows(&page.fragments, config);
    let mut tables = Vec::new();

    for run in find_runs(&rows, config) {
        if let Some((header, data)) = materialize_run(&rows[run.clone()], config) {
            tables.push(Table {
                id: id_offset + tables.len(),
                source: TableSource::Page(page.page_index),
                header,
                rows: data,
            });
        }
    }

    tables
}

/// Maximal runs of consecutive structurally similar rows. The first row of
/// a run sets the expected fragment count; a row with a different count
/// ends the run and starts the next one.
fn find_runs(rows: &[TextRow], config: &ReconstructorConfig) -> Vec<std::ops::Range<usize>> {
    let mut runs = Vec::new();
    let mut start = 0;
    while start < rows.len() {
        let expected = rows[start].fragments.len();
        let mut end = start + 1;
        while end < rows.len() && rows[end].fragments.len() == expected {
            end += 1;
        }
        if end - start >= config.min_run_rows && expected >= config.min_row_fragments {
            runs.push(start..end);
        }
        start = end;
    }
    runs
}

/// Turn a confirmed run into header and data rows via column inference.
///
/// Column boundaries are the union of rounded horizontal positions across
/// the whole run; fragments bucket into the column whose boundary they fall
/// at or after, and same-bucket fragments concatenate with a single space.
/// Returns `None` when fewer than 2 boundaries emerge.
fn materialize_run(
    rows: &[TextRow],
    config: &ReconstructorConfig,
) -> Option<(Vec<String>, Vec<Vec<String>>)> {
    let tolerance = config.column_tolerance.max(f32::EPSILON);
    let round = |x: f32| (x / tolerance).round() as i64;

    let boundaries: Vec<i64> = rows
        .iter()
        .flat_map(|row| row.fragments.iter().map(|f| round(f.x)))
        .collect::<BTreeSet<i64>>()
        .into_iter()
        .collect();
    if boundaries.len() < 2 {
        return None;
    }

    let column_of = |x: f32| match boundaries.binary_search(&round(x)) {
        Ok(i) => i,
        Err(i) => i.saturating_sub(1),
    };

    let mut cells_per_row: Vec<Vec<String>> = rows
        .iter()
        .map(|row| {
            let mut cells = vec![String::new(); boundaries.len()];
            for fragment in &row.fragments {
                let cell = &mut cells[column_of(fragment.x)];
                if !cell.is_empty() {
                    cell.push(' ');
                }
                cell.push_str(&fragment.text);
            }
            cells
        })
        .collect();

    let header = cells_per_row.remove(0);
    Some((header, cells_per_row))
}

/// Build a table directly from a raw sheet grid.
///
/// Grid formats skip positional reconstruction: the first non-empty row is
/// the header, and every following row is aligned to the header width by
/// padding with empty cells (or truncating overlong rows).
pub fn table_from_grid(grid: &SheetGrid, id: usize) -> Option<Table> {
    let header_index = grid
        .rows
        .iter()
        .position(|row| row.iter().any(|cell| !cell.trim().is_empty()))?;
    let header = grid.rows[header_index].clone();
    if header.is_empty() {
        return None;
    }

    let rows = grid.rows[header_index + 1..]
        .iter()
        .map(|row| {
            let mut aligned = row.clone();
            aligned.resize(header.len(), String::new());
            aligned
        })
        .collect();

    Some(Table {
        id,
        source: TableSource::Sheet(grid.name.clone()),
        header,
        rows,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frag(text: &str, x: f32, y: f32) -> PositionedFragment {
        PositionedFragment {
            text: text.to_string(),
            x,
            y,
            width: 10.0,
            height: 10.0,
            page_index: 0,
        }
    }

    fn page(fragments: Vec<PositionedFragment>) -> PageFragments {
        PageFragments {
            page_index: 0,
            width: 612.0,
            height: 792.0,
            fragments,
        }
    }

    fn holdings_page() -> PageFragments {
        page(vec![
            frag("ISIN", 50.0, 700.0),
            frag("Name", 150.0, 700.0),
            frag("Quantity", 250.0, 700.0),
            frag("US0378331005", 50.0, 680.0),
            frag("Apple Inc", 150.0, 680.0),
            frag("100", 250.0, 680.0),
            frag("DE000BAY0017", 50.0, 660.0),
            frag("Bayer AG", 150.0, 660.0),
            frag("50", 250.0, 660.0),
        ])
    }

    #[test]
    fn rows_bucket_within_tolerance() {
        let rows = bucket_rows(
            &[
                frag("a", 10.0, 100.2),
                frag("b", 30.0, 100.4),
                frag("c", 10.0, 80.0),
            ],
            &ReconstructorConfig::default(),
        );
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].fragments.len(), 2);
        assert_eq!(rows[0].fragments[0].text, "a");
        assert_eq!(rows[1].fragments[0].text, "c");
    }

    #[test]
    fn rows_order_top_to_bottom_and_left_to_right() {
        let rows = bucket_rows(
            &[
                frag("lower", 10.0, 50.0),
                frag("right", 90.0, 100.0),
                frag("left", 10.0, 100.0),
            ],
            &ReconstructorConfig::default(),
        );
        assert_eq!(rows[0].fragments[0].text, "left");
        assert_eq!(rows[0].fragments[1].text, "right");
        assert_eq!(rows[1].fragments[0].text, "lower");
    }

    #[test]
    fn three_similar_rows_become_a_table() {
        let tables = reconstruct_page_tables(&holdings_page(), &ReconstructorConfig::default(), 0);
        assert_eq!(tables.len(), 1);
        let table = &tables[0];
        assert_eq!(table.header, vec!["ISIN", "Name", "Quantity"]);
        assert_eq!(table.rows.len(), 2);
        assert_eq!(table.rows[0], vec!["US0378331005", "Apple Inc", "100"]);
        assert_eq!(table.source, TableSource::Page(0));
    }

    #[test]
    fn two_similar_rows_yield_no_table() {
        let p = page(vec![
            frag("ISIN", 50.0, 700.0),
            frag("Name", 150.0, 700.0),
            frag("Qty", 250.0, 700.0),
            frag("US0378331005", 50.0, 680.0),
            frag("Apple Inc", 150.0, 680.0),
            frag("100", 250.0, 680.0),
        ]);
        assert!(reconstruct_page_tables(&p, &ReconstructorConfig::default(), 0).is_empty());
    }

    #[test]
    fn sparse_rows_yield_no_table() {
        // Five rows of prose-like content, two fragments each.
        let fragments = (0..5)
            .flat_map(|i| {
                let y = 700.0 - 20.0 * i as f32;
                vec![frag("word", 50.0, y), frag("another", 150.0, y)]
            })
            .collect();
        assert!(reconstruct_page_tables(&page(fragments), &ReconstructorConfig::default(), 0)
            .is_empty());
    }

    #[test]
    fn run_broken_by_dissimilar_row_splits() {
        // 3 rows of 3, then a 1-fragment row, then only 2 rows of 3.
        let mut fragments = holdings_page().fragments;
        fragments.push(frag("Portfolio summary follows", 50.0, 640.0));
        for (i, y) in [620.0, 600.0].iter().enumerate() {
            fragments.push(frag("GB0002634946", 50.0, *y));
            fragments.push(frag("BAE Systems", 150.0, *y));
            fragments.push(frag(if i == 0 { "10" } else { "20" }, 250.0, *y));
        }
        let tables = reconstruct_page_tables(&page(fragments), &ReconstructorConfig::default(), 0);
        assert_eq!(tables.len(), 1);
        assert_eq!(tables[0].rows.len(), 2);
    }

    #[test]
    fn single_column_run_is_discarded() {
        let fragments = (0..4)
            .flat_map(|i| {
                let y = 700.0 - 20.0 * i as f32;
                // Three fragments per row but all at the same x.
                vec![
                    frag("a", 50.0, y),
                    frag("b", 50.2, y),
                    frag("c", 50.4, y),
                ]
            })
            .collect();
        assert!(reconstruct_page_tables(&page(fragments), &ReconstructorConfig::default(), 0)
            .is_empty());
    }

    #[test]
    fn same_bucket_fragments_concatenate() {
        // Every row has 4 fragments, but two of them share a rounded x, so
        // only 3 column boundaries emerge and the pair joins with a space.
        let fragments = [
            ("ISIN", "Name", "of holding", "Qty", 700.0),
            ("US0378331005", "Apple", "Inc", "100", 680.0),
            ("DE000BAY0017", "Bayer", "AG", "50", 660.0),
        ]
        .into_iter()
        .flat_map(|(a, b, c, d, y)| {
            vec![
                frag(a, 50.0, y),
                frag(b, 150.0, y),
                frag(c, 150.4, y),
                frag(d, 250.0, y),
            ]
        })
        .collect();
        let tables = reconstruct_page_tables(&page(fragments), &ReconstructorConfig::default(), 0);
        assert_eq!(tables.len(), 1);
        assert_eq!(tables[0].header, vec!["ISIN", "Name of holding", "Qty"]);
        assert_eq!(tables[0].rows[0], vec!["US0378331005", "Apple Inc", "100"]);
    }

    #[test]
    fn extra_fragment_breaks_structural_similarity() {
        let mut p = holdings_page();
        // A fourth fragment in the middle row changes its count; the run
        // of 3 structurally similar rows is gone.
        p.fragments.push(frag("(ADR)", 350.0, 680.0));
        assert!(reconstruct_page_tables(&p, &ReconstructorConfig::default(), 0).is_empty());
    }

    #[test]
    fn every_row_matches_header_width() {
        let tables = reconstruct_page_tables(&holdings_page(), &ReconstructorConfig::default(), 0);
        let table = &tables[0];
        for row in &table.rows {
            assert_eq!(row.len(), table.header.len());
        }
    }

    #[test]
    fn ids_offset_sequentially() {
        let tables = reconstruct_page_tables(&holdings_page(), &ReconstructorConfig::default(), 7);
        assert_eq!(tables[0].id, 7);
    }

    #[test]
    fn page_lines_join_fragments_in_reading_order() {
        let lines = page_lines(&holdings_page(), &ReconstructorConfig::default());
        assert_eq!(lines[0], "ISIN Name Quantity");
        assert_eq!(lines[1], "US0378331005 Apple Inc 100");
    }

    #[test]
    fn grid_rows_align_to_header() {
        let grid = SheetGrid {
            name: "Holdings".into(),
            rows: vec![
                vec!["ISIN".into(), "Name".into(), "Quantity".into()],
                vec!["DE000BAY0017".into(), "Bayer AG".into()],
                vec![
                    "US0378331005".into(),
                    "Apple Inc".into(),
                    "100".into(),
                    "extra".into(),
                ],
            ],
        };
        let table = table_from_grid(&grid, 2).unwrap();
        assert_eq!(table.id, 2);
        assert_eq!(table.source, TableSource::Sheet("Holdings".into()));
        assert_eq!(table.rows[0], vec!["DE000BAY0017", "Bayer AG", ""]);
        assert_eq!(table.rows[1], vec!["US0378331005", "Apple Inc", "100"]);
    }

    #[test]
    fn grid_header_skips_leading_blank_rows() {
        let grid = SheetGrid {
            name: String::new(),
            rows: vec![
                vec!["".into(), "".into()],
                vec!["ISIN".into(), "Name".into()],
                vec!["DE000BAY0017".into(), "Bayer AG".into()],
            ],
        };
        let table = table_from_grid(&grid, 0).unwrap();
        assert_eq!(table.header, vec!["ISIN", "Name"]);
        assert_eq!(table.rows.len(), 1);
    }

    #[test]
    fn empty_grid_yields_no_table() {
        let grid = SheetGrid {
            name: String::new(),
            rows: vec![],
        };
        assert!(table_from_grid(&grid, 0).is_none());
    }
}
