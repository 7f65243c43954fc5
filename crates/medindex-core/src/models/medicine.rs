//! Regulated medicine record model.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One regulated pharmaceutical product from the agency spreadsheet.
///
/// `brand_name` is the matching key: a record never reaches the store with
/// an empty brand name, and reconciliation overwrites all other attributes
/// of the row holding the same key.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MedicineRecord {
    /// Brand name - primary matching key, never empty
    pub brand_name: String,
    /// Product barcode
    pub barcode: Option<String>,
    /// ATC classification code
    pub atc_code: Option<String>,
    /// ATC classification name
    pub atc_name: Option<String>,
    /// Marketing authorization holder
    pub company_name: Option<String>,
    /// Prescription type (e.g. normal, controlled)
    pub prescription_type: Option<String>,
    /// Regulatory status text
    pub status: Option<String>,
    /// Free-form description
    pub description: Option<String>,
    /// Basic medicine list membership flag (0 when blank or malformed)
    pub basic_medicine_list: u32,
    /// Child medicine list membership flag (0 when blank or malformed)
    pub child_medicine_list: u32,
    /// Newborn medicine list membership flag (0 when blank or malformed)
    pub newborn_medicine_list: u32,
    /// Date the product became active, when the source row carries one
    pub active_product_date: Option<NaiveDate>,
}

impl MedicineRecord {
    /// Create a record with the required brand name and defaults elsewhere.
    pub fn new(brand_name: impl Into<String>) -> Self {
        Self {
            brand_name: brand_name.into(),
            barcode: None,
            atc_code: None,
            atc_name: None,
            company_name: None,
            prescription_type: None,
            status: None,
            description: None,
            basic_medicine_list: 0,
            child_medicine_list: 0,
            newborn_medicine_list: 0,
            active_product_date: None,
        }
    }
}
