//! Column names of the source population table and of the exported tables. The source names
//! must match the headers of the province population spreadsheet; the export names are part of
//! the spreadsheet layout consumers depend on.

pub const DISTRICT: &str = "İLÇE";
pub const NEIGHBORHOOD: &str = "MAHALLE";

pub const LATITUDE: &str = "lat";
pub const LONGITUDE: &str = "lon";
pub const SOURCE_LATITUDE: &str = "Latitude";
pub const SOURCE_LONGITUDE: &str = "Longitude";

pub const YEAR: &str = "YIL";
pub const POPULATION: &str = "NÜFUS";
pub const LOCATION: &str = "KONUM";

/// Suffix of the per-year population columns, e.g. `2024 YILI NÜFUSU`.
pub const YEAR_COLUMN_SUFFIX: &str = "YILI NÜFUSU";

/// Label replacing the grouping key of the synthetic total row.
pub const GRAND_TOTAL: &str = "Grand Total";

pub fn year_column(year: i32) -> String {
    format!("{year} {YEAR_COLUMN_SUFFIX}")
}
