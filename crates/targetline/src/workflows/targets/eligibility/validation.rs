use url::Url;

use super::super::domain::SubmissionDraft;

/// Links and files share one attachment allowance.
pub const MAX_ATTACHMENTS: usize = 3;

/// Rejected learner or coach input. Nothing is written when one of these is raised.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("submission description cannot be blank")]
    EmptyDescription,
    #[error("at most {max} links and files can be attached (found {count})")]
    TooManyAttachments { count: usize, max: usize },
    #[error("'{url}' does not look like a valid URL")]
    MalformedUrl { url: String },
    #[error("attached files must have a name")]
    EmptyFileName,
    #[error("this target is completed with '{expected}'")]
    WrongCompletionMethod { expected: &'static str },
    #[error("quiz has no question '{question}'")]
    UnknownQuestion { question: String },
    #[error("question '{question}' has no answer option '{option}'")]
    UnknownAnswerOption { question: String, option: String },
    #[error("criterion '{criterion}' was not graded")]
    MissingGrade { criterion: String },
    #[error("criterion '{criterion}' is not evaluated on this target")]
    UnexpectedCriterion { criterion: String },
    #[error("grade {grade} for '{criterion}' must be between 1 and {max}")]
    GradeOutOfRange {
        criterion: String,
        grade: u8,
        max: u8,
    },
    #[error("submission has already been evaluated")]
    AlreadyEvaluated,
    #[error("only the latest submission can be changed")]
    NotLatest,
    #[error("submission belongs to another learner group")]
    NotOwner,
    #[error("feedback cannot be blank")]
    EmptyFeedback,
}

/// Shape checks on a draft before any eligibility lookup happens.
pub fn validate_draft(draft: &SubmissionDraft) -> Result<(), ValidationError> {
    if draft.description.trim().is_empty() {
        return Err(ValidationError::EmptyDescription);
    }

    let count = draft.links.len() + draft.files.len();
    if count > MAX_ATTACHMENTS {
        return Err(ValidationError::TooManyAttachments {
            count,
            max: MAX_ATTACHMENTS,
        });
    }

    for link in &draft.links {
        validate_link(link)?;
    }

    if draft
        .files
        .iter()
        .any(|file| file.filename.trim().is_empty())
    {
        return Err(ValidationError::EmptyFileName);
    }

    Ok(())
}

/// Accepts absolute `http`/`https` URLs with a host.
pub fn validate_link(raw: &str) -> Result<(), ValidationError> {
    let malformed = || ValidationError::MalformedUrl {
        url: raw.to_string(),
    };

    let url = Url::parse(raw.trim()).map_err(|_| malformed())?;
    match url.scheme() {
        "http" | "https" if url.host_str().is_some_and(|host| !host.is_empty()) => Ok(()),
        _ => Err(malformed()),
    }
}
