use depa_core::model::{ExtractionResult, Origin, SecurityRecord, Table, TableSource};

/// Human-readable overview of a full extraction.
pub fn summary(result: &ExtractionResult) -> String {
    let mut out = String::new();
    let meta = &result.metadata;

    if let Some(format) = meta.format {
        out.push_str(&format!("Format:     {format}\n"));
    }
    out.push_str(&format!("Units:      {}\n", meta.unit_count));
    if !meta.sheet_names.is_empty() {
        out.push_str(&format!("Sheets:     {}\n", meta.sheet_names.join(", ")));
    }
    if let Some(author) = &meta.author {
        out.push_str(&format!("Author:     {author}\n"));
    }
    if meta.encrypted {
        out.push_str("Encrypted:  yes\n");
    }
    if meta.partial {
        out.push_str("Partial:    yes (adapter failed mid-document)\n");
    }
    if meta.incomplete {
        out.push_str("Incomplete: yes (deadline expired)\n");
    }
    out.push_str(&format!("Tables:     {}\n", result.tables.len()));
    out.push_str(&format!("Securities: {}\n", result.securities.len()));

    if !result.securities.is_empty() {
        out.push('\n');
        out.push_str(&securities(result));
    }
    if !meta.warnings.is_empty() {
        out.push('\n');
        for w in &meta.warnings {
            out.push_str(&format!("warning: {w}\n"));
        }
    }

    out
}

/// Render every detected table with aligned columns.
pub fn tables(result: &ExtractionResult) -> String {
    if result.tables.is_empty() {
        return "No tables detected.".to_string();
    }

    let mut out = String::new();
    for table in &result.tables {
        if !out.is_empty() {
            out.push('\n');
        }
        let origin = match &table.source {
            TableSource::Page(index) => format!("page {}", index + 1),
            TableSource::Sheet(name) if name.is_empty() => "sheet".to_string(),
            TableSource::Sheet(name) => format!("sheet '{name}'"),
        };
        out.push_str(&format!(
            "=== Table {} ({origin}, {} columns, {} rows) ===\n",
            table.id,
            table.column_count(),
            table.rows.len()
        ));
        out.push_str(&render_grid(table));
    }
    out
}

fn render_grid(table: &Table) -> String {
    let widths: Vec<usize> = (0..table.header.len())
        .map(|col| {
            table
                .rows
                .iter()
                .map(|row| row[col].len())
                .chain(std::iter::once(table.header[col].len()))
                .max()
                .unwrap_or(0)
        })
        .collect();

    let mut out = String::new();
    let render_row = |row: &[String]| -> String {
        row.iter()
            .enumerate()
            .map(|(i, cell)| format!("{:<width$}", cell, width = widths[i]))
            .collect::<Vec<_>>()
            .join("  ")
            .trim_end()
            .to_string()
    };

    out.push_str(&render_row(&table.header));
    out.push('\n');
    for row in &table.rows {
        out.push_str(&render_row(row));
        out.push('\n');
    }
    out
}

/// Aligned listing of the identified securities.
pub fn securities(result: &ExtractionResult) -> String {
    if result.securities.is_empty() {
        return "No securities identified.".to_string();
    }

    let name_width = result
        .securities
        .iter()
        .map(|r| r.display_name.as_deref().unwrap_or("-").len())
        .max()
        .unwrap_or(1);

    let mut out = String::new();
    for record in &result.securities {
        let name = record.display_name.as_deref().unwrap_or("-");
        let quantity = record
            .quantity
            .map(|q| q.to_string())
            .unwrap_or_else(|| "-".to_string());
        let price = match &record.price {
            Some(p) => match &p.currency {
                Some(c) => format!("{} {}", c, p.value),
                None => p.value.to_string(),
            },
            None => "-".to_string(),
        };
        out.push_str(&format!(
            "{}  {:<name_width$}  qty {:>10}  price {:>12}  [{}]\n",
            record.identifier,
            name,
            quantity,
            price,
            provenance_label(record)
        ));
    }
    out
}

fn provenance_label(record: &SecurityRecord) -> &'static str {
    let mut text = false;
    let mut table = false;
    for origin in &record.provenance {
        match origin {
            Origin::FreeText { .. } => text = true,
            Origin::Table { .. } => table = true,
        }
    }
    match (text, table) {
        (true, true) => "text+table",
        (false, true) => "table",
        (true, false) => "text",
        (false, false) => "none",
    }
}
