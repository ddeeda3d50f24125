// storage/src/store.rs

use std::path::Path;
use std::str::FromStr;

use models::{Medicine, PrescriptionData};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::{FromRow, Sqlite, Transaction};

use crate::errors::{StorageError, StorageResult};

/// Row shape of the `prescriptions` table. Column names match the on-disk
/// schema, which keeps compatibility with databases created by earlier
/// versions of this service.
#[derive(Debug, FromRow)]
struct PrescriptionRow {
    #[sqlx(rename = "patientName")]
    patient_name: String,
    #[sqlx(rename = "patientAge")]
    patient_age: String,
    #[sqlx(rename = "patientDescription")]
    patient_description: String,
    #[sqlx(rename = "currentDate")]
    current_date: String,
    // Nullable in the schema; mapped to "" at this boundary.
    #[sqlx(rename = "sendToValue")]
    send_to_value: Option<String>,
}

/// Row shape of the `medicines` table.
#[derive(Debug, FromRow)]
struct MedicineRow {
    name: String,
    dosage: String,
    frequency: String,
    note: Option<String>,
}

impl From<MedicineRow> for Medicine {
    fn from(row: MedicineRow) -> Self {
        Medicine {
            name: row.name,
            dosage: row.dosage,
            frequency: row.frequency,
            note: row.note.unwrap_or_default(),
        }
    }
}

/// The storage gateway: translates between `PrescriptionData` records and the
/// two-table relational representation, over a managed SQLite pool.
///
/// Every logical operation runs inside a single transaction, so a failure
/// mid-sequence rolls back rather than leaving a prescription with a
/// half-replaced medicine list.
pub struct PrescriptionStore {
    pool: SqlitePool,
}

impl PrescriptionStore {
    /// Opens (creating if missing) the database file at `database_path` and
    /// builds the connection pool. Foreign-key enforcement is switched on
    /// for every connection.
    ///
    /// # Errors
    /// Returns a `StorageError::Database` if the file cannot be opened or the
    /// pool cannot be established.
    pub async fn connect(database_path: impl AsRef<Path>) -> StorageResult<Self> {
        let options = SqliteConnectOptions::new()
            .filename(database_path)
            .create_if_missing(true)
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;

        Ok(Self { pool })
    }

    /// Opens an in-memory database. A single-connection pool is required
    /// here: every `:memory:` connection is its own database.
    pub async fn in_memory() -> StorageResult<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?.foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await?;

        Ok(Self { pool })
    }

    /// Idempotently creates both tables. Called once during process
    /// bootstrap, never implicitly.
    pub async fn ensure_schema(&self) -> StorageResult<()> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS prescriptions (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                patientName TEXT NOT NULL,
                patientAge TEXT NOT NULL,
                patientDescription TEXT NOT NULL,
                currentDate TEXT NOT NULL,
                sendToValue TEXT
            )",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS medicines (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                prescription_id INTEGER NOT NULL,
                name TEXT NOT NULL,
                dosage TEXT NOT NULL,
                frequency TEXT NOT NULL,
                note TEXT,
                FOREIGN KEY (prescription_id) REFERENCES prescriptions(id) ON DELETE CASCADE
            )",
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Fetches the prescription with the given id together with its
    /// medicines, in insertion order. Both reads happen inside one
    /// transaction, so the record is a consistent point-in-time view.
    ///
    /// # Errors
    /// Returns `StorageError::NotFound` when no prescription has that id.
    pub async fn fetch(&self, prescription_id: i64) -> StorageResult<PrescriptionData> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query_as::<_, PrescriptionRow>(
            "SELECT patientName, patientAge, patientDescription, currentDate, sendToValue
             FROM prescriptions WHERE id = ?",
        )
        .bind(prescription_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(StorageError::NotFound(prescription_id))?;

        let medicines = sqlx::query_as::<_, MedicineRow>(
            "SELECT name, dosage, frequency, note
             FROM medicines WHERE prescription_id = ? ORDER BY id",
        )
        .bind(prescription_id)
        .fetch_all(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(PrescriptionData {
            patient_name: row.patient_name,
            patient_age: row.patient_age,
            patient_description: row.patient_description,
            current_date: row.current_date,
            send_to_value: row.send_to_value.unwrap_or_default(),
            medicines: medicines.into_iter().map(Medicine::from).collect(),
        })
    }

    /// Replaces the prescription with the given id in full: all scalar
    /// fields are overwritten and the medicine list is deleted and
    /// re-inserted from `data`. Never a merge.
    ///
    /// The existence check, update, delete, and inserts share one
    /// transaction; on any failure (including an unknown id) nothing is
    /// committed.
    ///
    /// # Errors
    /// Returns `StorageError::NotFound` when no prescription has that id.
    pub async fn replace(&self, prescription_id: i64, data: &PrescriptionData) -> StorageResult<()> {
        let mut tx = self.pool.begin().await?;

        let existing = sqlx::query_scalar::<_, i64>("SELECT id FROM prescriptions WHERE id = ?")
            .bind(prescription_id)
            .fetch_optional(&mut *tx)
            .await?;
        if existing.is_none() {
            return Err(StorageError::NotFound(prescription_id));
        }

        sqlx::query(
            "UPDATE prescriptions SET patientName = ?, patientAge = ?, patientDescription = ?,
             currentDate = ?, sendToValue = ? WHERE id = ?",
        )
        .bind(&data.patient_name)
        .bind(&data.patient_age)
        .bind(&data.patient_description)
        .bind(&data.current_date)
        .bind(&data.send_to_value)
        .bind(prescription_id)
        .execute(&mut *tx)
        .await?;

        sqlx::query("DELETE FROM medicines WHERE prescription_id = ?")
            .bind(prescription_id)
            .execute(&mut *tx)
            .await?;

        for medicine in &data.medicines {
            insert_medicine(&mut tx, prescription_id, medicine).await?;
        }

        tx.commit().await?;
        Ok(())
    }

    /// Inserts a new prescription and its medicines in one transaction and
    /// returns the generated id.
    pub async fn create(&self, data: &PrescriptionData) -> StorageResult<i64> {
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            "INSERT INTO prescriptions (patientName, patientAge, patientDescription, currentDate, sendToValue)
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&data.patient_name)
        .bind(&data.patient_age)
        .bind(&data.patient_description)
        .bind(&data.current_date)
        .bind(&data.send_to_value)
        .execute(&mut *tx)
        .await?;

        let prescription_id = result.last_insert_rowid();

        for medicine in &data.medicines {
            insert_medicine(&mut tx, prescription_id, medicine).await?;
        }

        tx.commit().await?;
        Ok(prescription_id)
    }
}

async fn insert_medicine(
    tx: &mut Transaction<'_, Sqlite>,
    prescription_id: i64,
    medicine: &Medicine,
) -> StorageResult<()> {
    sqlx::query(
        "INSERT INTO medicines (prescription_id, name, dosage, frequency, note)
         VALUES (?, ?, ?, ?, ?)",
    )
    .bind(prescription_id)
    .bind(&medicine.name)
    .bind(&medicine.dosage)
    .bind(&medicine.frequency)
    .bind(&medicine.note)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn new_store() -> PrescriptionStore {
        let store = PrescriptionStore::in_memory().await.unwrap();
        store.ensure_schema().await.unwrap();
        store
    }

    fn medicine(name: &str, dosage: &str, frequency: &str, note: &str) -> Medicine {
        Medicine {
            name: name.to_string(),
            dosage: dosage.to_string(),
            frequency: frequency.to_string(),
            note: note.to_string(),
        }
    }

    fn sample_prescription() -> PrescriptionData {
        PrescriptionData {
            patient_name: "Jane Doe".to_string(),
            patient_age: "34".to_string(),
            patient_description: "flu".to_string(),
            current_date: "2024-01-01".to_string(),
            send_to_value: String::new(),
            medicines: vec![medicine("Amoxicillin", "500mg", "2x/day", "")],
        }
    }

    #[tokio::test]
    async fn should_round_trip_created_prescription() {
        let store = new_store().await;
        let data = sample_prescription();

        let id = store.create(&data).await.unwrap();
        let fetched = store.fetch(id).await.unwrap();

        assert_eq!(fetched, data);
    }

    #[tokio::test]
    async fn should_preserve_medicine_insertion_order() {
        let store = new_store().await;
        let mut data = sample_prescription();
        data.medicines = vec![
            medicine("Amoxicillin", "500mg", "2x/day", ""),
            medicine("Ibuprofen", "200mg", "3x/day", "with food"),
            medicine("Paracetamol", "1g", "as needed", ""),
        ];

        let id = store.create(&data).await.unwrap();
        let fetched = store.fetch(id).await.unwrap();

        let names: Vec<&str> = fetched.medicines.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, ["Amoxicillin", "Ibuprofen", "Paracetamol"]);
    }

    #[tokio::test]
    async fn should_report_not_found_for_unknown_id() {
        let store = new_store().await;

        let err = store.fetch(42).await.unwrap_err();
        assert!(matches!(err, StorageError::NotFound(42)));
    }

    #[tokio::test]
    async fn should_not_mutate_anything_when_replacing_unknown_id() {
        let store = new_store().await;
        let data = sample_prescription();
        let id = store.create(&data).await.unwrap();

        let err = store.replace(id + 1, &data).await.unwrap_err();
        assert!(matches!(err, StorageError::NotFound(_)));

        // The existing record is untouched.
        assert_eq!(store.fetch(id).await.unwrap(), data);
    }

    #[tokio::test]
    async fn should_replace_medicine_list_in_full() {
        let store = new_store().await;
        let mut data = sample_prescription();
        let id = store.create(&data).await.unwrap();

        data.medicines = vec![medicine("Cetirizine", "10mg", "1x/day", "")];
        store.replace(id, &data).await.unwrap();

        let fetched = store.fetch(id).await.unwrap();
        assert_eq!(fetched.medicines.len(), 1);
        assert_eq!(fetched.medicines[0].name, "Cetirizine");
    }

    #[tokio::test]
    async fn should_clear_medicines_when_replacement_has_none() {
        let store = new_store().await;
        let mut data = sample_prescription();
        let id = store.create(&data).await.unwrap();

        data.medicines.clear();
        store.replace(id, &data).await.unwrap();

        assert!(store.fetch(id).await.unwrap().medicines.is_empty());
    }

    #[tokio::test]
    async fn should_be_idempotent_on_repeated_replace() {
        let store = new_store().await;
        let data = sample_prescription();
        let id = store.create(&data).await.unwrap();

        let mut updated = data.clone();
        updated.patient_description = "flu, recovering".to_string();
        updated.medicines = vec![medicine("Ibuprofen", "200mg", "3x/day", "")];

        store.replace(id, &updated).await.unwrap();
        let first = store.fetch(id).await.unwrap();
        store.replace(id, &updated).await.unwrap();
        let second = store.fetch(id).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(second, updated);
    }

    #[tokio::test]
    async fn should_update_scalar_fields_unconditionally() {
        let store = new_store().await;
        let data = sample_prescription();
        let id = store.create(&data).await.unwrap();

        let mut updated = data.clone();
        updated.patient_name = "Jane A. Doe".to_string();
        updated.send_to_value = "pharmacy-12".to_string();
        store.replace(id, &updated).await.unwrap();

        let fetched = store.fetch(id).await.unwrap();
        assert_eq!(fetched.patient_name, "Jane A. Doe");
        assert_eq!(fetched.send_to_value, "pharmacy-12");
    }

    #[tokio::test]
    async fn should_keep_generated_ids_distinct() {
        let store = new_store().await;
        let data = sample_prescription();

        let first = store.create(&data).await.unwrap();
        let second = store.create(&data).await.unwrap();

        assert_ne!(first, second);
    }

    #[tokio::test]
    async fn should_tolerate_repeated_schema_creation() {
        let store = new_store().await;
        // A second call must be a no-op, not an error.
        store.ensure_schema().await.unwrap();
    }
}
