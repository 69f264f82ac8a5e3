pub mod admissions;
pub mod targets;
