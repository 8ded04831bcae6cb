//! Medicine entity model and DTOs.

use hippo_core::types::DbId;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A medicine row from the `medicines` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Medicine {
    pub id: DbId,
    /// National drug code.
    pub global_id: String,
    pub name: String,
    pub dosage: String,
    pub form: String,
    pub active_ingredient: String,
    pub pharma_company: String,
}

/// DTO for creating a new medicine.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateMedicine {
    #[serde(default)]
    pub global_id: String,
    pub name: String,
    #[serde(default)]
    pub dosage: String,
    #[serde(default)]
    pub form: String,
    #[serde(default)]
    pub active_ingredient: String,
    #[serde(default)]
    pub pharma_company: String,
}

/// DTO for updating an existing medicine. All fields are optional.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct UpdateMedicine {
    pub global_id: Option<String>,
    pub name: Option<String>,
    pub dosage: Option<String>,
    pub form: Option<String>,
    pub active_ingredient: Option<String>,
    pub pharma_company: Option<String>,
}

impl UpdateMedicine {
    /// True when no field would change.
    pub fn is_empty(&self) -> bool {
        self.global_id.is_none()
            && self.name.is_none()
            && self.dosage.is_none()
            && self.form.is_none()
            && self.active_ingredient.is_none()
            && self.pharma_company.is_none()
    }
}
