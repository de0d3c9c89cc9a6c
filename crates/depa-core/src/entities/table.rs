use std::collections::btree_map::Entry;
use std::collections::BTreeMap;

use crate::entities::{
    contains_any, parse_decimal_loose, split_leading_currency, IDENTIFIER_COLUMN_KEYWORDS,
    NAME_COLUMN_KEYWORDS, PRICE_COLUMN_KEYWORDS, QUANTITY_COLUMN_KEYWORDS,
    SECURITY_TABLE_KEYWORDS,
};
use crate::model::{Origin, Price, SecurityIdentifier, SecurityRecord, Table};
use crate::reconcile::fill_missing;

/// Scan reconstructed and grid tables for security rows.
///
/// A table participates only when its header mentions the security
/// vocabulary and one column can be pinned down as the identifier column.
/// Rows whose identifier cell fails strict validation are skipped silently;
/// the table itself stays in the extraction output either way.
pub fn scan_tables(tables: &[Table]) -> Vec<SecurityRecord> {
    let mut records: BTreeMap<SecurityIdentifier, SecurityRecord> = BTreeMap::new();

    for table in tables {
        let Some(columns) = locate_columns(table) else {
            continue;
        };
        for (row_index, row) in table.rows.iter().enumerate() {
            let raw_id = row.get(columns.identifier).map(String::as_str).unwrap_or("");
            let Some(identifier) = SecurityIdentifier::parse(raw_id) else {
                if !raw_id.is_empty() {
                    log::debug!(
                        "table {}: row {} has malformed identifier '{raw_id}'",
                        table.id,
                        row_index
                    );
                }
                continue;
            };

            let mut record = SecurityRecord::new(
                identifier.clone(),
                Origin::Table {
                    table_id: table.id,
                    row: row_index,
                },
            );
            record.display_name = columns
                .name
                .and_then(|c| row.get(c))
                .map(|v| v.trim())
                .filter(|v| !v.is_empty())
                .map(str::to_string);
            record.quantity = columns
                .quantity
                .and_then(|c| row.get(c))
                .and_then(|v| parse_decimal_loose(v));
            record.price = columns.price.and_then(|c| row.get(c)).and_then(|v| {
                let (currency, rest) = split_leading_currency(v);
                parse_decimal_loose(rest).map(|value| Price { value, currency })
            });

            match records.entry(identifier) {
                Entry::Occupied(mut existing) => fill_missing(existing.get_mut(), &record),
                Entry::Vacant(slot) => {
                    slot.insert(record);
                }
            }
        }
    }

    records.into_values().collect()
}

struct ColumnMap {
    identifier: usize,
    name: Option<usize>,
    quantity: Option<usize>,
    price: Option<usize>,
}

/// Pin header columns down by keyword. Returns `None` when the table is not
/// about securities or has no identifier column.
fn locate_columns(table: &Table) -> Option<ColumnMap> {
    if !table
        .header
        .iter()
        .any(|h| contains_any(h, SECURITY_TABLE_KEYWORDS))
    {
        return None;
    }

    let identifier = find_column(&table.header, IDENTIFIER_COLUMN_KEYWORDS, &[])?;
    let mut used = vec![identifier];
    let name = find_column(&table.header, NAME_COLUMN_KEYWORDS, &used);
    if let Some(c) = name {
        used.push(c);
    }
    let quantity = find_column(&table.header, QUANTITY_COLUMN_KEYWORDS, &used);
    if let Some(c) = quantity {
        used.push(c);
    }
    let price = find_column(&table.header, PRICE_COLUMN_KEYWORDS, &used);

    Some(ColumnMap {
        identifier,
        name,
        quantity,
        price,
    })
}

fn find_column(header: &[String], keywords: &[&str], used: &[usize]) -> Option<usize> {
    header
        .iter()
        .enumerate()
        .find(|(i, h)| !used.contains(i) && contains_any(h, keywords))
        .map(|(i, _)| i)
}
