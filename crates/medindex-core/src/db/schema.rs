//! SQLite schema definition.

/// Complete database schema for medindex.
pub const SCHEMA: &str = r#"
-- ============================================================================
-- Medicines
-- ============================================================================

CREATE TABLE IF NOT EXISTS medicines (
    brand_name TEXT PRIMARY KEY,
    barcode TEXT,
    atc_code TEXT,
    atc_name TEXT,
    company_name TEXT,
    prescription_type TEXT,
    status TEXT,
    description TEXT,
    basic_medicine_list INTEGER NOT NULL DEFAULT 0,
    child_medicine_list INTEGER NOT NULL DEFAULT 0,
    newborn_medicine_list INTEGER NOT NULL DEFAULT 0,
    active_product_date TEXT,                     -- ISO-8601 calendar date
    created_at TEXT NOT NULL DEFAULT (datetime('now')),
    updated_at TEXT NOT NULL DEFAULT (datetime('now'))
);

-- Index backing case-insensitive brand-name search and its ordering
CREATE INDEX IF NOT EXISTS idx_medicines_brand_nocase
    ON medicines(brand_name COLLATE NOCASE);
"#;
