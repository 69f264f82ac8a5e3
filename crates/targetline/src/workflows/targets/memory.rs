use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use super::domain::{
    Coach, CoachId, CompletionMethod, Course, CourseId, CriterionId, Evaluation,
    EvaluationCriterion, Feedback, LearnerGroup, LearnerGroupId, Submission, SubmissionId, Target,
    TargetId,
};
use super::error::TargetServiceError;
use super::prerequisites::validate_prerequisites;
use super::repository::{CatalogError, RepositoryError, SubmissionStore, TargetCatalog};

#[derive(Debug, Default)]
struct CatalogRecords {
    courses: HashMap<CourseId, Course>,
    groups: HashMap<LearnerGroupId, LearnerGroup>,
    targets: HashMap<TargetId, Target>,
    criteria: HashMap<CriterionId, EvaluationCriterion>,
    coaches: HashMap<CoachId, Coach>,
}

/// Process-local curriculum registry used by the service binary, demo and tests.
#[derive(Debug, Default, Clone)]
pub struct InMemoryTargetCatalog {
    records: Arc<Mutex<CatalogRecords>>,
}

impl InMemoryTargetCatalog {
    fn lock(&self) -> Result<MutexGuard<'_, CatalogRecords>, RepositoryError> {
        self.records
            .lock()
            .map_err(|_| RepositoryError::Unavailable("catalog mutex poisoned".to_string()))
    }

    pub fn add_course(&self, course: Course) -> Result<(), RepositoryError> {
        self.lock()?.courses.insert(course.id.clone(), course);
        Ok(())
    }

    pub fn add_learner_group(&self, group: LearnerGroup) -> Result<(), RepositoryError> {
        self.lock()?.groups.insert(group.id.clone(), group);
        Ok(())
    }

    pub fn add_criterion(&self, criterion: EvaluationCriterion) -> Result<(), RepositoryError> {
        self.lock()?.criteria.insert(criterion.id.clone(), criterion);
        Ok(())
    }

    pub fn add_coach(&self, coach: Coach) -> Result<(), RepositoryError> {
        self.lock()?.coaches.insert(coach.id.clone(), coach);
        Ok(())
    }

    /// Register or replace a target after checking its course, criteria and prerequisites.
    pub fn add_target(&self, target: Target) -> Result<(), CatalogRegistrationError> {
        let mut records = self.lock()?;

        if !records.courses.contains_key(&target.course_id) {
            return Err(CatalogError::UnknownCourse {
                target: target.id.0.clone(),
                course: target.course_id.0.clone(),
            }
            .into());
        }

        if let CompletionMethod::Evaluated { criteria } = &target.completion {
            if let Some(unknown) = criteria
                .iter()
                .find(|criterion| !records.criteria.contains_key(*criterion))
            {
                return Err(CatalogError::UnknownCriterion {
                    target: target.id.0.clone(),
                    criterion: unknown.0.clone(),
                }
                .into());
            }
        }

        validate_prerequisites(&records.targets, &target)?;
        records.targets.insert(target.id.clone(), target);
        Ok(())
    }
}

/// Failure while registering catalog records.
#[derive(Debug, thiserror::Error)]
pub enum CatalogRegistrationError {
    #[error(transparent)]
    Catalog(#[from] CatalogError),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl TargetCatalog for InMemoryTargetCatalog {
    fn course(&self, id: &CourseId) -> Result<Option<Course>, RepositoryError> {
        Ok(self.lock()?.courses.get(id).cloned())
    }

    fn learner_group(&self, id: &LearnerGroupId) -> Result<Option<LearnerGroup>, RepositoryError> {
        Ok(self.lock()?.groups.get(id).cloned())
    }

    fn target(&self, id: &TargetId) -> Result<Option<Target>, RepositoryError> {
        Ok(self.lock()?.targets.get(id).cloned())
    }

    fn criterion(&self, id: &CriterionId) -> Result<Option<EvaluationCriterion>, RepositoryError> {
        Ok(self.lock()?.criteria.get(id).cloned())
    }

    fn coach(&self, id: &CoachId) -> Result<Option<Coach>, RepositoryError> {
        Ok(self.lock()?.coaches.get(id).cloned())
    }

    fn team_members(&self, team: &LearnerGroupId) -> Result<Vec<LearnerGroup>, RepositoryError> {
        let records = self.lock()?;
        let mut members: Vec<LearnerGroup> = records
            .groups
            .values()
            .filter(|group| group.team.as_ref() == Some(team))
            .cloned()
            .collect();
        members.sort_by(|left, right| left.id.cmp(&right.id));
        Ok(members)
    }
}

/// Submission log kept in insertion order behind a single mutex, which makes the latest-marker
/// swap atomic.
#[derive(Debug, Default, Clone)]
pub struct InMemorySubmissionStore {
    submissions: Arc<Mutex<Vec<Submission>>>,
}

impl InMemorySubmissionStore {
    fn lock(&self) -> Result<MutexGuard<'_, Vec<Submission>>, RepositoryError> {
        self.submissions
            .lock()
            .map_err(|_| RepositoryError::Unavailable("submission mutex poisoned".to_string()))
    }

    /// Snapshot of every stored submission, in insertion order.
    pub fn all(&self) -> Result<Vec<Submission>, RepositoryError> {
        Ok(self.lock()?.clone())
    }
}

fn same_pair(submission: &Submission, target: &TargetId, group: &LearnerGroupId) -> bool {
    &submission.target_id == target && &submission.learner_group_id == group
}

impl SubmissionStore for InMemorySubmissionStore {
    fn latest(
        &self,
        target: &TargetId,
        group: &LearnerGroupId,
    ) -> Result<Option<Submission>, RepositoryError> {
        Ok(self
            .lock()?
            .iter()
            .find(|submission| submission.latest && same_pair(submission, target, group))
            .cloned())
    }

    fn history(
        &self,
        target: &TargetId,
        group: &LearnerGroupId,
    ) -> Result<Vec<Submission>, RepositoryError> {
        Ok(self
            .lock()?
            .iter()
            .filter(|submission| same_pair(submission, target, group))
            .cloned()
            .collect())
    }

    fn fetch(&self, id: &SubmissionId) -> Result<Option<Submission>, RepositoryError> {
        Ok(self
            .lock()?
            .iter()
            .find(|submission| &submission.id == id)
            .cloned())
    }

    fn record_latest(
        &self,
        expected_latest: Option<&SubmissionId>,
        mut submission: Submission,
    ) -> Result<Submission, RepositoryError> {
        let mut submissions = self.lock()?;

        if submissions.iter().any(|existing| existing.id == submission.id) {
            return Err(RepositoryError::Conflict);
        }

        let target = submission.target_id.clone();
        let group = submission.learner_group_id.clone();
        let current = submissions
            .iter_mut()
            .find(|existing| existing.latest && same_pair(existing, &target, &group));

        if current.as_ref().map(|existing| &existing.id) != expected_latest {
            return Err(RepositoryError::Conflict);
        }

        if let Some(previous) = current {
            previous.latest = false;
        }

        submission.latest = true;
        submissions.push(submission.clone());
        Ok(submission)
    }

    fn record_evaluation(
        &self,
        id: &SubmissionId,
        evaluation: Evaluation,
    ) -> Result<Submission, RepositoryError> {
        let mut submissions = self.lock()?;
        let existing = submissions
            .iter_mut()
            .find(|existing| &existing.id == id)
            .ok_or(RepositoryError::NotFound)?;

        if !existing.latest || existing.is_evaluated() {
            return Err(RepositoryError::Conflict);
        }

        existing.apply(evaluation);
        Ok(existing.clone())
    }

    fn append_feedback(
        &self,
        id: &SubmissionId,
        feedback: Feedback,
    ) -> Result<Submission, RepositoryError> {
        let mut submissions = self.lock()?;
        let existing = submissions
            .iter_mut()
            .find(|existing| &existing.id == id)
            .ok_or(RepositoryError::NotFound)?;

        existing.feedback.push(feedback);
        Ok(existing.clone())
    }

    fn remove_latest(&self, id: &SubmissionId) -> Result<Option<Submission>, RepositoryError> {
        let mut submissions = self.lock()?;
        let position = submissions
            .iter()
            .position(|existing| &existing.id == id)
            .ok_or(RepositoryError::NotFound)?;

        if !submissions[position].latest {
            return Err(RepositoryError::Conflict);
        }

        let removed = submissions.remove(position);
        let promoted = submissions
            .iter_mut()
            .rev()
            .find(|existing| same_pair(existing, &removed.target_id, &removed.learner_group_id));

        Ok(promoted.map(|submission| {
            submission.latest = true;
            submission.clone()
        }))
    }
}

impl From<CatalogRegistrationError> for TargetServiceError {
    fn from(err: CatalogRegistrationError) -> Self {
        match err {
            CatalogRegistrationError::Catalog(err) => TargetServiceError::Catalog(err),
            CatalogRegistrationError::Repository(err) => TargetServiceError::Repository(err),
        }
    }
}
