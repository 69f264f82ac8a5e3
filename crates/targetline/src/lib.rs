//! Target status and submission eligibility for cohort-based courses.
//!
//! Learners (or their teams) work through targets; each target is completed by submitting work
//! for review, visiting a link, answering a quiz or simply marking it done. This crate decides
//! what state a target is in for a learner and whether a new completion may be recorded.

pub mod config;
pub mod error;
pub mod telemetry;
pub mod workflows;
