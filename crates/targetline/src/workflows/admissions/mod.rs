//! Admissions dashboard analytics built from applicant and payment CSV exports.

mod parser;
mod summary;

use std::io::Read;
use std::path::Path;

pub use parser::{ApplicantRecord, ApplicationRecord};
pub use summary::{
    paid_applicants_by_reference, paid_applications_by_date, paid_applications_by_location,
    AdmissionsSummary, CountTable, REFERENCE_SOURCES,
};

#[derive(Debug)]
pub enum AdmissionsImportError {
    Io(std::io::Error),
    Csv(csv::Error),
}

impl std::fmt::Display for AdmissionsImportError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AdmissionsImportError::Io(err) => {
                write!(f, "failed to read admissions export: {}", err)
            }
            AdmissionsImportError::Csv(err) => write!(f, "invalid admissions CSV data: {}", err),
        }
    }
}

impl std::error::Error for AdmissionsImportError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AdmissionsImportError::Io(err) => Some(err),
            AdmissionsImportError::Csv(err) => Some(err),
        }
    }
}

impl From<std::io::Error> for AdmissionsImportError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<csv::Error> for AdmissionsImportError {
    fn from(err: csv::Error) -> Self {
        Self::Csv(err)
    }
}

pub struct AdmissionsImporter;

impl AdmissionsImporter {
    pub fn from_paths<A: AsRef<Path>, B: AsRef<Path>>(
        applicants: A,
        applications: B,
    ) -> Result<AdmissionsSummary, AdmissionsImportError> {
        let applicants = std::fs::File::open(applicants)?;
        let applications = std::fs::File::open(applications)?;
        Self::from_readers(applicants, applications)
    }

    pub fn from_readers<A: Read, B: Read>(
        applicants: A,
        applications: B,
    ) -> Result<AdmissionsSummary, AdmissionsImportError> {
        let applicants = parser::parse_applicants(applicants)?;
        let applications = parser::parse_applications(applications)?;

        tracing::debug!(
            applicants = applicants.len(),
            applications = applications.len(),
            "admissions exports parsed"
        );

        Ok(AdmissionsSummary::build(&applicants, &applications))
    }
}
