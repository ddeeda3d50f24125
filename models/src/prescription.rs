// models/src/prescription.rs
use serde::{Deserialize, Serialize};

use crate::medicine::Medicine;

/// The full prescription record as exchanged over the wire: the patient's
/// scalar fields plus the owned list of medicines, in submission order.
///
/// `patientAge` and `currentDate` are stored and returned as opaque text;
/// no numeric or calendar validation is applied. `sendToValue` defaults to
/// the empty string when omitted and is always present on output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrescriptionData {
    pub patient_name: String,
    pub patient_age: String,
    pub patient_description: String,
    pub current_date: String,
    #[serde(default)]
    pub send_to_value: String,
    pub medicines: Vec<Medicine>,
}
