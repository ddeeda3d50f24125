// models/src/medicine.rs
use serde::{Deserialize, Serialize};

/// A single drug entry belonging to exactly one prescription.
///
/// All fields are opaque text; `note` defaults to the empty string when the
/// caller omits it and is always present on output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Medicine {
    pub name: String,
    pub dosage: String,
    pub frequency: String,
    #[serde(default)]
    pub note: String,
}
