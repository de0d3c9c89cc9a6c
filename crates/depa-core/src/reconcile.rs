use std::collections::btree_map::Entry;
use std::collections::BTreeMap;

use crate::model::{SecurityIdentifier, SecurityRecord};

/// Merge the free-text and table passes into the final record set.
///
/// Table-derived attributes take precedence: cell values are less ambiguous
/// than prose proximity matches. Free text fills only the gaps a table left
/// open. Provenance is the union of all origins. The output is sorted by
/// identifier and contains each identifier exactly once; records are
/// immutable afterwards; downstream corrections require a new result.
pub fn reconcile(
    text_records: Vec<SecurityRecord>,
    table_records: Vec<SecurityRecord>,
) -> Vec<SecurityRecord> {
    let mut merged: BTreeMap<SecurityIdentifier, SecurityRecord> = BTreeMap::new();

    // Table records first so their attributes win.
    for record in table_records.into_iter().chain(text_records) {
        match merged.entry(record.identifier.clone()) {
            Entry::Occupied(mut existing) => fill_missing(existing.get_mut(), &record),
            Entry::Vacant(slot) => {
                slot.insert(record);
            }
        }
    }

    merged
        .into_values()
        .map(|mut record| {
            record.provenance.sort();
            record
        })
        .collect()
}

/// Copy attributes the target is missing from `source` and union the
/// provenance. Attributes the target already has are left untouched.
pub(crate) fn fill_missing(target: &mut SecurityRecord, source: &SecurityRecord) {
    if target.display_name.is_none() {
        target.display_name = source.display_name.clone();
    }
    if target.quantity.is_none() {
        target.quantity = source.quantity;
    }
    if target.price.is_none() {
        target.price = source.price.clone();
    }
    for origin in &source.provenance {
        target.add_origin(origin.clone());
    }
}
