use chrono::{DateTime, Utc};
use tracing::warn;

use super::domain::{
    Course, LearnerGroup, LearnerGroupId, LockReason, Submission, SubmissionOutcome, Target,
    TargetId, TargetRole, TargetStatus,
};
use super::error::{NotFoundError, RecordKind, TargetServiceError};
use super::repository::{SubmissionStore, TargetCatalog};

/// Everything the acceptance policy and recorders need to know about a target right now.
#[derive(Debug, Clone, PartialEq)]
pub struct Resolution {
    pub status: TargetStatus,
    /// Group the target is tracked against: the team for team targets, otherwise the learner.
    pub group: LearnerGroup,
    pub latest: Option<Submission>,
}

/// Computes target status from persisted facts on every call.
pub struct TargetStatusResolver<'a, C: ?Sized, S: ?Sized> {
    catalog: &'a C,
    store: &'a S,
    now: DateTime<Utc>,
}

impl<'a, C, S> TargetStatusResolver<'a, C, S>
where
    C: TargetCatalog + ?Sized,
    S: SubmissionStore + ?Sized,
{
    pub fn new(catalog: &'a C, store: &'a S, now: DateTime<Utc>) -> Self {
        Self {
            catalog,
            store,
            now,
        }
    }

    pub fn status(
        &self,
        target_id: &TargetId,
        group_id: &LearnerGroupId,
    ) -> Result<TargetStatus, TargetServiceError> {
        let target = self.load_target(target_id)?;
        let group = self.load_group(group_id)?;
        Ok(self.resolve(&target, &group)?.status)
    }

    pub fn load_target(&self, id: &TargetId) -> Result<Target, TargetServiceError> {
        self.catalog
            .target(id)?
            .ok_or_else(|| NotFoundError::new(RecordKind::Target, id.0.clone()).into())
    }

    pub fn load_group(&self, id: &LearnerGroupId) -> Result<LearnerGroup, TargetServiceError> {
        self.catalog
            .learner_group(id)?
            .ok_or_else(|| NotFoundError::new(RecordKind::LearnerGroup, id.0.clone()).into())
    }

    pub fn resolve(
        &self,
        target: &Target,
        group: &LearnerGroup,
    ) -> Result<Resolution, TargetServiceError> {
        let mut trail = Vec::new();
        self.resolve_with_trail(target, group, &mut trail)
    }

    fn resolve_with_trail(
        &self,
        target: &Target,
        group: &LearnerGroup,
        trail: &mut Vec<TargetId>,
    ) -> Result<Resolution, TargetServiceError> {
        if target.course_id != group.course_id {
            return Err(NotFoundError::new(RecordKind::Target, target.id.0.clone()).into());
        }

        let course = self
            .catalog
            .course(&target.course_id)?
            .ok_or_else(|| NotFoundError::new(RecordKind::Course, target.course_id.0.clone()))?;
        let team = match &group.team {
            Some(team_id) => Some(self.load_group(team_id)?),
            None => None,
        };

        let tracked = match (&team, target.role) {
            (Some(team), TargetRole::Team) => team.clone(),
            _ => group.clone(),
        };
        let latest = self.store.latest(&target.id, &tracked.id)?;

        if let Some(reason) = self.access_lock(&course, group, team.as_ref()) {
            return Ok(Resolution {
                status: TargetStatus::Locked(reason),
                group: tracked,
                latest,
            });
        }

        trail.push(target.id.clone());
        let prerequisites_met = self.prerequisites_met(target, group, trail)?;
        trail.pop();

        let status = if !prerequisites_met {
            TargetStatus::Locked(LockReason::PrerequisitesIncomplete)
        } else {
            match latest.as_ref().map(Submission::outcome) {
                Some(SubmissionOutcome::AwaitingReview) => TargetStatus::Submitted,
                Some(SubmissionOutcome::Passed) => TargetStatus::Passed,
                Some(SubmissionOutcome::Failed) => TargetStatus::Failed,
                None => TargetStatus::Pending,
            }
        };

        Ok(Resolution {
            status,
            group: tracked,
            latest,
        })
    }

    fn access_lock(
        &self,
        course: &Course,
        group: &LearnerGroup,
        team: Option<&LearnerGroup>,
    ) -> Option<LockReason> {
        if course.ends_at.is_some_and(|ends_at| ends_at <= self.now) {
            return Some(LockReason::CourseEnded);
        }

        let access_ended = |candidate: &LearnerGroup| {
            candidate
                .access_ends_at
                .is_some_and(|ends_at| ends_at <= self.now)
        };
        if access_ended(group) || team.is_some_and(access_ended) {
            return Some(LockReason::AccessEnded);
        }

        None
    }

    fn prerequisites_met(
        &self,
        target: &Target,
        group: &LearnerGroup,
        trail: &mut Vec<TargetId>,
    ) -> Result<bool, TargetServiceError> {
        for prerequisite_id in &target.prerequisites {
            if trail.contains(prerequisite_id) {
                warn!(
                    target_id = %target.id.0,
                    prerequisite = %prerequisite_id.0,
                    "prerequisite cycle encountered while resolving status"
                );
                return Ok(false);
            }

            let prerequisite = self.load_target(prerequisite_id)?;
            let resolution = self.resolve_with_trail(&prerequisite, group, trail)?;
            if resolution.status != TargetStatus::Passed {
                return Ok(false);
            }
        }

        Ok(true)
    }
}
