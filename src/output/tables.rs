use comfy_table::modifiers::UTF8_ROUND_CORNERS;
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Color as TableColor, ContentArrangement, Table};

use crate::outcome::Outcome;

/// Table creation helper
pub fn create_table() -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table
}

/// Maps an attachment colour back to a terminal colour.
pub fn outcome_color(html_color: &str) -> TableColor {
    match Outcome::from_html_color(html_color) {
        Some(Outcome::Success) => TableColor::Green,
        Some(Outcome::Unstable) => TableColor::Yellow,
        Some(Outcome::Failure) => TableColor::Red,
        _ => TableColor::DarkGrey,
    }
}
