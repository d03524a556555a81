//! Display metadata for location categories.
//!
//! Labels, icons and colors are presentation concerns. Aggregation only ever
//! deals in [`LocationCategory`] values; this table is consulted by whoever
//! renders the results. Categories without an entry fall back to `unknown`.

use std::collections::HashMap;

use once_cell::sync::Lazy;
use serde::Serialize;

use crate::LocationCategory;

/// How a category is shown to a reader.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryDisplay {
    pub label: &'static str,
    pub icon: &'static str,
    /// CSS hex color
    pub color: &'static str,
}

const UNKNOWN_DISPLAY: CategoryDisplay = entry("Unknown", "❓", "#666");

const fn entry(label: &'static str, icon: &'static str, color: &'static str) -> CategoryDisplay {
    CategoryDisplay { label, icon, color }
}

static DISPLAY_TABLE: Lazy<HashMap<&'static str, CategoryDisplay>> = Lazy::new(|| {
    HashMap::from([
        ("landfill", entry("Landfill", "🗑️", "#c62828")),
        ("mrf", entry("MRF (Recycling)", "♻️", "#2e7d32")),
        ("incinerator", entry("Incinerator", "🔥", "#e65100")),
        (
            "waste_transfer_station",
            entry("Transfer Station", "🚛", "#6a1b9a"),
        ),
        ("starting_point", entry("Starting Point", "📍", "#1565c0")),
        ("transit", entry("In Transit", "🚚", "#f57f17")),
        ("unknown", UNKNOWN_DISPLAY),
    ])
});

/// Display metadata for a category.
pub fn display_for(category: &LocationCategory) -> &'static CategoryDisplay {
    DISPLAY_TABLE
        .get(category.as_str())
        .unwrap_or(&UNKNOWN_DISPLAY)
}
