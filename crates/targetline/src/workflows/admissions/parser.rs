use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Deserializer};
use std::io::Read;

/// Applicant row from the admissions export.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApplicantRecord {
    pub name: String,
    pub reference: Option<String>,
    pub paid: bool,
}

/// Application row from the payments export.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApplicationRecord {
    pub application_id: String,
    pub university_location: Option<String>,
    pub paid_at: Option<NaiveDateTime>,
}

pub(crate) fn parse_applicants<R: Read>(reader: R) -> Result<Vec<ApplicantRecord>, csv::Error> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);

    csv_reader
        .deserialize::<ApplicantRow>()
        .map(|row| {
            let row = row?;
            Ok(ApplicantRecord {
                name: row.name,
                reference: row.reference,
                paid: row.paid,
            })
        })
        .collect()
}

pub(crate) fn parse_applications<R: Read>(
    reader: R,
) -> Result<Vec<ApplicationRecord>, csv::Error> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);
    let mut records = Vec::new();

    for row in csv_reader.deserialize::<ApplicationRow>() {
        let row = row?;
        let paid_at = row.paid_at.as_deref().and_then(parse_datetime);
        records.push(ApplicationRecord {
            application_id: row.application_id,
            university_location: row.university_location,
            paid_at,
        });
    }

    Ok(records)
}

#[derive(Debug, Deserialize)]
struct ApplicantRow {
    #[serde(rename = "Name")]
    name: String,
    #[serde(rename = "Reference", default, deserialize_with = "empty_string_as_none")]
    reference: Option<String>,
    #[serde(rename = "Paid", default, deserialize_with = "yes_no")]
    paid: bool,
}

#[derive(Debug, Deserialize)]
struct ApplicationRow {
    #[serde(rename = "Application ID")]
    application_id: String,
    #[serde(
        rename = "University Location",
        default,
        deserialize_with = "empty_string_as_none"
    )]
    university_location: Option<String>,
    #[serde(rename = "Paid At", default, deserialize_with = "empty_string_as_none")]
    paid_at: Option<String>,
}

fn empty_string_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let opt = Option::<String>::deserialize(deserializer)?;
    Ok(opt.filter(|value| !value.trim().is_empty()))
}

fn yes_no<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?.unwrap_or_default();
    match raw.trim().to_ascii_lowercase().as_str() {
        "" | "0" | "no" | "false" | "unpaid" => Ok(false),
        "1" | "yes" | "true" | "paid" => Ok(true),
        other => Err(serde::de::Error::custom(format!(
            "expected yes/no for Paid, found '{other}'"
        ))),
    }
}

fn parse_datetime(value: &str) -> Option<NaiveDateTime> {
    let trimmed = value.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(dt.naive_utc());
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%d %H:%M:%S") {
        return Some(dt);
    }
    NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
}
