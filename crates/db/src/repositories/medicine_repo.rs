//! Repository for the `medicines` table.

use hippo_core::types::DbId;
use sqlx::PgPool;

use crate::models::medicine::{CreateMedicine, Medicine, UpdateMedicine};

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, global_id, name, dosage, form, active_ingredient, pharma_company";

/// Provides CRUD operations for medicines.
pub struct MedicineRepo;

impl MedicineRepo {
    /// Insert a new medicine, returning the created row.
    pub async fn create(pool: &PgPool, input: &CreateMedicine) -> Result<Medicine, sqlx::Error> {
        let query = format!(
            "INSERT INTO medicines (global_id, name, dosage, form, active_ingredient, pharma_company)
             VALUES ($1, $2, $3, $4, $5, $6)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Medicine>(&query)
            .bind(&input.global_id)
            .bind(&input.name)
            .bind(&input.dosage)
            .bind(&input.form)
            .bind(&input.active_ingredient)
            .bind(&input.pharma_company)
            .fetch_one(pool)
            .await
    }

    /// Find a medicine by its internal ID.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Medicine>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM medicines WHERE id = $1");
        sqlx::query_as::<_, Medicine>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// List all medicines ordered by id.
    pub async fn list(pool: &PgPool) -> Result<Vec<Medicine>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM medicines ORDER BY id");
        sqlx::query_as::<_, Medicine>(&query).fetch_all(pool).await
    }

    /// Update a medicine. Only non-`None` fields in `input` are applied.
    ///
    /// Returns `None` if no row with the given `id` exists.
    pub async fn update(
        pool: &PgPool,
        id: DbId,
        input: &UpdateMedicine,
    ) -> Result<Option<Medicine>, sqlx::Error> {
        let query = format!(
            "UPDATE medicines SET
                global_id = COALESCE($2, global_id),
                name = COALESCE($3, name),
                dosage = COALESCE($4, dosage),
                form = COALESCE($5, form),
                active_ingredient = COALESCE($6, active_ingredient),
                pharma_company = COALESCE($7, pharma_company)
             WHERE id = $1
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Medicine>(&query)
            .bind(id)
            .bind(&input.global_id)
            .bind(&input.name)
            .bind(&input.dosage)
            .bind(&input.form)
            .bind(&input.active_ingredient)
            .bind(&input.pharma_company)
            .fetch_optional(pool)
            .await
    }

    /// Permanently delete a medicine by ID. Returns `true` if a row was removed.
    pub async fn delete(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM medicines WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
