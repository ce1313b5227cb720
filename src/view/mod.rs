//! Chart-ready data for the hosting dashboard.
//!
//! Nothing here draws. The functions shape a dataset view into series the
//! host hands to its chart library, coloured by region.

pub mod bars;
pub mod spatial;

use serde::Serialize;

/// Serialise rows as a JSON array of objects, one per row.
pub fn to_json_records<T: Serialize>(rows: &[T]) -> serde_json::Result<String> {
    serde_json::to_string(rows)
}

/// `"norte"` → `"Norte"`.
pub fn capitalize(label: &str) -> String {
    let mut chars = label.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
