use chrono::NaiveDate;
use serde::ser::{Serialize, SerializeMap, Serializer};
use std::collections::BTreeMap;

use super::parser::{ApplicantRecord, ApplicationRecord};

/// Reference options offered on the application form. The last one is free text.
pub const REFERENCE_SOURCES: [&str; 7] = [
    "Friend",
    "Seniors",
    "Facebook",
    "Twitter",
    "Newspaper",
    "College / Professor",
    OTHER_PLEASE_SPECIFY,
];

const OTHER_PLEASE_SPECIFY: &str = "Other (Please Specify)";
const OTHER: &str = "Other";

/// Ordered label → count pairs, serialized as a JSON object in insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CountTable(pub Vec<(String, usize)>);

impl CountTable {
    pub fn get(&self, label: &str) -> Option<usize> {
        self.0
            .iter()
            .find(|(candidate, _)| candidate == label)
            .map(|(_, count)| *count)
    }

    pub fn total(&self) -> usize {
        self.0.iter().map(|(_, count)| count).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, usize)> {
        self.0.iter().map(|(label, count)| (label.as_str(), *count))
    }
}

impl Serialize for CountTable {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (label, count) in &self.0 {
            map.serialize_entry(label, count)?;
        }
        map.end()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize)]
pub struct AdmissionsSummary {
    pub paid_applicants_by_reference: CountTable,
    pub paid_applications_by_location: CountTable,
    pub paid_applications_by_date: CountTable,
}

impl AdmissionsSummary {
    pub fn build(applicants: &[ApplicantRecord], applications: &[ApplicationRecord]) -> Self {
        Self {
            paid_applicants_by_reference: paid_applicants_by_reference(applicants),
            paid_applications_by_location: paid_applications_by_location(applications),
            paid_applications_by_date: paid_applications_by_date(applications),
        }
    }
}

/// Paid applicants per named reference source. Free-text and missing references are folded into
/// a trailing "Other" bucket, present only when non-zero.
pub fn paid_applicants_by_reference(applicants: &[ApplicantRecord]) -> CountTable {
    let named = || {
        REFERENCE_SOURCES
            .iter()
            .copied()
            .filter(|source| *source != OTHER_PLEASE_SPECIFY)
    };

    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    let mut others = 0;
    for applicant in applicants.iter().filter(|applicant| applicant.paid) {
        match applicant
            .reference
            .as_deref()
            .filter(|reference| named().any(|source| source == *reference))
        {
            Some(reference) => *counts.entry(reference).or_default() += 1,
            None => others += 1,
        }
    }

    let mut table: Vec<(String, usize)> = named()
        .filter_map(|source| counts.get(source).map(|count| (source.to_string(), *count)))
        .collect();
    if others > 0 {
        table.push((OTHER.to_string(), others));
    }
    CountTable(table)
}

/// Paid applications per university location, alphabetically. Applications without a university
/// are not counted.
pub fn paid_applications_by_location(applications: &[ApplicationRecord]) -> CountTable {
    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for application in applications
        .iter()
        .filter(|application| application.paid_at.is_some())
    {
        if let Some(location) = application.university_location.as_deref() {
            *counts.entry(location).or_default() += 1;
        }
    }

    CountTable(
        counts
            .into_iter()
            .map(|(location, count)| (location.to_string(), count))
            .collect(),
    )
}

/// Paid applications per payment day, oldest first, labelled like `"Mar 04"`.
pub fn paid_applications_by_date(applications: &[ApplicationRecord]) -> CountTable {
    let mut counts: BTreeMap<NaiveDate, usize> = BTreeMap::new();
    for paid_at in applications
        .iter()
        .filter_map(|application| application.paid_at)
    {
        *counts.entry(paid_at.date()).or_default() += 1;
    }

    CountTable(
        counts
            .into_iter()
            .map(|(day, count)| (day.format("%b %d").to_string(), count))
            .collect(),
    )
}
