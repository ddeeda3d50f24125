// models/src/lib.rs

pub mod medicine;
pub mod prescription;

pub use medicine::Medicine;
pub use prescription::PrescriptionData;
