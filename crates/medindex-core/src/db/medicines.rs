//! Medicine store operations: reconciliation and brand-name search.

use chrono::NaiveDate;
use rusqlite::{params, Row};

use super::{Database, DbResult};
use crate::models::MedicineRecord;

/// Maximum number of rows a brand-name search returns.
pub const SEARCH_LIMIT: usize = 50;

impl Database {
    /// Merge a parsed snapshot into the store.
    ///
    /// Each record is upserted by `brand_name`: an existing row is fully
    /// overwritten with the new attributes, a missing row is inserted. Keys
    /// already in the store but absent from `records` are left untouched.
    /// Runs inside one transaction so a refresh costs a single commit;
    /// statement order follows `records` order.
    ///
    /// Returns the number of newly created rows. Empty input is a no-op.
    pub fn reconcile(&mut self, records: &[MedicineRecord]) -> DbResult<usize> {
        if records.is_empty() {
            return Ok(0);
        }

        let tx = self.conn.transaction()?;
        let mut created = 0usize;
        {
            let mut exists_stmt =
                tx.prepare("SELECT 1 FROM medicines WHERE brand_name = ?1")?;
            let mut upsert_stmt = tx.prepare(
                r#"
                INSERT INTO medicines (
                    brand_name, barcode, atc_code, atc_name, company_name,
                    prescription_type, status, description,
                    basic_medicine_list, child_medicine_list, newborn_medicine_list,
                    active_product_date, updated_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, datetime('now'))
                ON CONFLICT(brand_name) DO UPDATE SET
                    barcode = excluded.barcode,
                    atc_code = excluded.atc_code,
                    atc_name = excluded.atc_name,
                    company_name = excluded.company_name,
                    prescription_type = excluded.prescription_type,
                    status = excluded.status,
                    description = excluded.description,
                    basic_medicine_list = excluded.basic_medicine_list,
                    child_medicine_list = excluded.child_medicine_list,
                    newborn_medicine_list = excluded.newborn_medicine_list,
                    active_product_date = excluded.active_product_date,
                    updated_at = datetime('now')
                "#,
            )?;

            for record in records {
                let exists = exists_stmt.exists(params![record.brand_name])?;
                upsert_stmt.execute(params![
                    record.brand_name,
                    record.barcode,
                    record.atc_code,
                    record.atc_name,
                    record.company_name,
                    record.prescription_type,
                    record.status,
                    record.description,
                    record.basic_medicine_list,
                    record.child_medicine_list,
                    record.newborn_medicine_list,
                    record.active_product_date.map(|d| d.to_string()),
                ])?;
                if !exists {
                    created += 1;
                }
            }
        }
        tx.commit()?;
        Ok(created)
    }

    /// Case-insensitive substring search on brand name.
    ///
    /// The fragment is passed through as a raw LIKE pattern fragment, so
    /// `%` and `_` in user input act as wildcards. Results come back
    /// ascending by brand name, capped at [`SEARCH_LIMIT`].
    pub fn search_by_brand(&self, fragment: &str) -> DbResult<Vec<MedicineRecord>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT brand_name, barcode, atc_code, atc_name, company_name,
                   prescription_type, status, description,
                   basic_medicine_list, child_medicine_list, newborn_medicine_list,
                   active_product_date
            FROM medicines
            WHERE brand_name LIKE '%' || ?1 || '%'
            ORDER BY brand_name COLLATE NOCASE ASC
            LIMIT ?2
            "#,
        )?;

        let rows = stmt.query_map(params![fragment, SEARCH_LIMIT as i64], map_medicine_row)?;

        let mut medicines = Vec::new();
        for row in rows {
            medicines.push(row?);
        }
        Ok(medicines)
    }

    /// Get a single medicine by its exact brand name.
    pub fn get_medicine(&self, brand_name: &str) -> DbResult<Option<MedicineRecord>> {
        use rusqlite::OptionalExtension;

        let result = self
            .conn
            .query_row(
                r#"
                SELECT brand_name, barcode, atc_code, atc_name, company_name,
                       prescription_type, status, description,
                       basic_medicine_list, child_medicine_list, newborn_medicine_list,
                       active_product_date
                FROM medicines
                WHERE brand_name = ?1
                "#,
                [brand_name],
                map_medicine_row,
            )
            .optional()?;
        Ok(result)
    }

    /// Total number of stored medicines.
    pub fn count_medicines(&self) -> DbResult<usize> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM medicines", [], |row| row.get(0))?;
        Ok(count as usize)
    }
}

fn map_medicine_row(row: &Row<'_>) -> rusqlite::Result<MedicineRecord> {
    let date_text: Option<String> = row.get(11)?;
    Ok(MedicineRecord {
        brand_name: row.get(0)?,
        barcode: row.get(1)?,
        atc_code: row.get(2)?,
        atc_name: row.get(3)?,
        company_name: row.get(4)?,
        prescription_type: row.get(5)?,
        status: row.get(6)?,
        description: row.get(7)?,
        basic_medicine_list: flag_from_column(row.get(8)?),
        child_medicine_list: flag_from_column(row.get(9)?),
        newborn_medicine_list: flag_from_column(row.get(10)?),
        active_product_date: date_text
            .and_then(|s| NaiveDate::parse_from_str(&s, "%Y-%m-%d").ok()),
    })
}

fn flag_from_column(value: i64) -> u32 {
    u32::try_from(value).unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup_db() -> Database {
        Database::open_in_memory().unwrap()
    }

    fn record(brand: impl Into<String>) -> MedicineRecord {
        MedicineRecord::new(brand)
    }

    #[test]
    fn test_reconcile_inserts_and_reads_back() {
        let mut db = setup_db();

        let mut rec = record("PAROL 500 MG");
        rec.barcode = Some("8690000000001".into());
        rec.atc_code = Some("N02BE01".into());
        rec.basic_medicine_list = 1;
        rec.active_product_date = NaiveDate::from_ymd_opt(2024, 3, 15);

        let created = db.reconcile(&[rec.clone()]).unwrap();
        assert_eq!(created, 1);

        let stored = db.get_medicine("PAROL 500 MG").unwrap().unwrap();
        assert_eq!(stored, rec);
    }

    #[test]
    fn test_reconcile_empty_is_noop() {
        let mut db = setup_db();
        assert_eq!(db.reconcile(&[]).unwrap(), 0);
        assert_eq!(db.count_medicines().unwrap(), 0);
    }

    #[test]
    fn test_reconcile_is_idempotent() {
        let mut db = setup_db();
        let records = vec![record("A"), record("B"), record("C")];

        assert_eq!(db.reconcile(&records).unwrap(), 3);
        let before = db.get_medicine("B").unwrap().unwrap();

        // Second run with the identical snapshot changes nothing
        assert_eq!(db.reconcile(&records).unwrap(), 0);
        assert_eq!(db.count_medicines().unwrap(), 3);
        assert_eq!(db.get_medicine("B").unwrap().unwrap(), before);
    }

    #[test]
    fn test_reconcile_overwrites_matching_key() {
        let mut db = setup_db();

        let mut rec = record("MAJEZIK");
        rec.status = Some("Aktif".into());
        db.reconcile(&[rec.clone(), record("OTHER")]).unwrap();

        rec.status = Some("Pasif".into());
        let created = db.reconcile(&[rec]).unwrap();
        assert_eq!(created, 0);

        let updated = db.get_medicine("MAJEZIK").unwrap().unwrap();
        assert_eq!(updated.status.as_deref(), Some("Pasif"));

        // Unrelated record untouched
        let other = db.get_medicine("OTHER").unwrap().unwrap();
        assert!(other.status.is_none());
        assert_eq!(db.count_medicines().unwrap(), 2);
    }

    #[test]
    fn test_reconcile_keeps_keys_missing_from_snapshot() {
        let mut db = setup_db();
        db.reconcile(&[record("KEEP ME"), record("ALSO ME")]).unwrap();

        db.reconcile(&[record("NEW ONE")]).unwrap();
        assert_eq!(db.count_medicines().unwrap(), 3);
        assert!(db.get_medicine("KEEP ME").unwrap().is_some());
    }

    #[test]
    fn test_reconcile_duplicate_keys_in_one_batch() {
        let mut db = setup_db();

        let mut first = record("DUP");
        first.status = Some("old".into());
        let mut second = record("DUP");
        second.status = Some("new".into());

        // Later occurrence wins, and the key counts as created once
        let created = db.reconcile(&[first, second]).unwrap();
        assert_eq!(created, 1);
        assert_eq!(db.count_medicines().unwrap(), 1);
        let stored = db.get_medicine("DUP").unwrap().unwrap();
        assert_eq!(stored.status.as_deref(), Some("new"));
    }

    #[test]
    fn test_search_case_insensitive_substring() {
        let mut db = setup_db();
        db.reconcile(&[
            record("Aspirin 100 mg"),
            record("ASPIRIN FORTE"),
            record("Parol 500 mg"),
        ])
        .unwrap();

        let results = db.search_by_brand("aspirin").unwrap();
        assert_eq!(results.len(), 2);

        let results = db.search_by_brand("PIRIN").unwrap();
        assert_eq!(results.len(), 2);

        let results = db.search_by_brand("ibuprofen").unwrap();
        assert!(results.is_empty());
    }

    #[test]
    fn test_search_caps_and_orders_results() {
        let mut db = setup_db();
        let records: Vec<MedicineRecord> = (0..60)
            .map(|i| record(format!("MED {:03}", i)))
            .collect();
        db.reconcile(&records).unwrap();

        let results = db.search_by_brand("MED").unwrap();
        assert_eq!(results.len(), SEARCH_LIMIT);

        let names: Vec<&str> = results.iter().map(|m| m.brand_name.as_str()).collect();
        let mut sorted = names.clone();
        sorted.sort();
        assert_eq!(names, sorted);
        assert_eq!(names[0], "MED 000");
    }

    #[test]
    fn test_search_fragment_is_raw_pattern() {
        let mut db = setup_db();
        db.reconcile(&[record("ABC"), record("AXC")]).unwrap();

        // `_` is a single-character wildcard, passed through unescaped
        let results = db.search_by_brand("A_C").unwrap();
        assert_eq!(results.len(), 2);
    }
}
