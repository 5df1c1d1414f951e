//! Table formatting helpers shared by the listing commands.

use comfy_table::presets::UTF8_FULL_CONDENSED;
use comfy_table::{ContentArrangement, Table};

/// Create a table with the house style.
pub fn create_table(headers: &[&str]) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL_CONDENSED)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(headers.to_vec());
    table
}

/// Mask a secret for display unless the caller asked to reveal it.
pub fn mask(secret: &str, reveal: bool) -> String {
    if reveal {
        secret.to_owned()
    } else {
        "•".repeat(secret.chars().count().clamp(4, 12))
    }
}

/// Case-insensitive substring filter used by the list commands.
pub fn matches_filter(haystacks: &[&str], filter: Option<&str>) -> bool {
    let Some(filter) = filter else {
        return true;
    };
    let needle = filter.to_lowercase();
    haystacks
        .iter()
        .any(|h| h.to_lowercase().contains(&needle))
}
