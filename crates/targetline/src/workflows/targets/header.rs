use serde::Serialize;

use super::domain::{Target, TargetRole, TargetStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HeaderIcon {
    AttendSession,
    PersonalTodo,
    TeamTodo,
}

/// Data behind the collapsible target header on the learner dashboard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TargetHeaderView {
    pub target_id: String,
    pub title: String,
    pub type_description: String,
    pub icon: HeaderIcon,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_line: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub points_earnable: Option<u32>,
    pub status: &'static str,
}

impl TargetHeaderView {
    pub fn new(target: &Target, status: TargetStatus, display_date: bool) -> Self {
        Self {
            target_id: target.id.0.clone(),
            title: target.title.clone(),
            type_description: target.type_description.clone(),
            icon: header_icon(target),
            date_line: date_line(target, display_date),
            points_earnable: target.points_earnable,
            status: status.label(),
        }
    }
}

fn header_icon(target: &Target) -> HeaderIcon {
    match (target.session_at, target.role) {
        (Some(_), _) => HeaderIcon::AttendSession,
        (None, TargetRole::Individual) => HeaderIcon::PersonalTodo,
        (None, TargetRole::Team) => HeaderIcon::TeamTodo,
    }
}

fn date_line(target: &Target, display_date: bool) -> Option<String> {
    if display_date {
        target
            .session_at
            .map(|session_at| format!("Session at: {}", session_at.format("%b %-d, %-I:%M %p")))
    } else {
        target
            .days_to_complete
            .map(|days| format!("Time required: {days} days"))
    }
}
