use std::error::Error as StdError;

use thiserror::Error;

use crate::application::articles::ArticleError;
use crate::application::authoring::AuthoringError;
use crate::application::collaborators::{GenerationError, IdentityError, StoreError, UploadError};
use crate::application::engagement::EngagementError;
use crate::application::profiles::ProfileError;
use crate::domain::document::ParseError;
use crate::infra::error::InfraError;

/// A flattened error chain for terminal reporting: the failing call site
/// plus every message down to the root cause.
#[derive(Debug, Clone)]
pub struct ErrorReport {
    pub source: &'static str,
    pub messages: Vec<String>,
}

impl ErrorReport {
    pub fn from_error(source: &'static str, error: &dyn StdError) -> Self {
        let mut messages = Vec::new();
        messages.push(error.to_string());
        let mut current = error.source();
        while let Some(inner) = current {
            messages.push(inner.to_string());
            current = inner.source();
        }
        Self { source, messages }
    }

    pub fn from_message(source: &'static str, message: impl Into<String>) -> Self {
        Self {
            source,
            messages: vec![message.into()],
        }
    }

    /// The chain as one line, outermost first.
    pub fn chain(&self) -> String {
        self.messages.join(": ")
    }
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Article(#[from] ArticleError),
    #[error(transparent)]
    Profile(#[from] ProfileError),
    #[error(transparent)]
    Engagement(#[from] EngagementError),
    #[error(transparent)]
    Authoring(#[from] AuthoringError),
    #[error(transparent)]
    Generation(#[from] GenerationError),
    #[error(transparent)]
    Identity(#[from] IdentityError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Upload(#[from] UploadError),
    #[error(transparent)]
    Content(#[from] ParseError),
    #[error(transparent)]
    Infra(#[from] InfraError),
    #[error("invalid request: {0}")]
    Validation(String),
    #[error("internal error: {0}")]
    Unexpected(String),
}

impl AppError {
    pub fn unexpected(message: impl Into<String>) -> Self {
        Self::Unexpected(message.into())
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// The line shown to the person at the terminal. Detail stays in the
    /// logged [`ErrorReport`].
    pub fn user_message(&self) -> &'static str {
        match self {
            AppError::Article(ArticleError::MissingTitle) => "Please add a title.",
            AppError::Article(ArticleError::EmptyBody) => {
                "Please write some content before publishing."
            }
            AppError::Article(ArticleError::Content(_)) | AppError::Content(_) => {
                "The story content could not be read."
            }
            AppError::Article(ArticleError::Store(err)) | AppError::Store(err) => {
                store_message(err)
            }
            AppError::Profile(ProfileError::NotFound { .. }) => "Profile not found.",
            AppError::Profile(ProfileError::Store(err)) => store_message(err),
            AppError::Profile(ProfileError::Upload(_)) | AppError::Upload(_) => {
                "File upload failed."
            }
            AppError::Profile(ProfileError::Identity(err)) => identity_message(err),
            AppError::Engagement(EngagementError::EmptyComment) => "Comment text is empty.",
            AppError::Engagement(EngagementError::Store(err)) => store_message(err),
            AppError::Authoring(AuthoringError::SessionNotFound { .. }) => {
                "No editor session is open."
            }
            AppError::Generation(_) => "AI generation failed. Please try again.",
            AppError::Identity(err) => identity_message(err),
            AppError::Infra(InfraError::Configuration { .. }) => "The client is misconfigured.",
            AppError::Infra(InfraError::Telemetry(_)) => "Logging could not be started.",
            AppError::Infra(InfraError::Io(_)) => "A local file operation failed.",
            AppError::Infra(InfraError::State { .. }) => "Saved session state could not be used.",
            AppError::Validation(_) => "That request could not be completed.",
            AppError::Unexpected(_) => "Something went wrong on our side.",
        }
    }
}

fn store_message(err: &StoreError) -> &'static str {
    match err {
        StoreError::NotFound => "Nothing was found for that request.",
        _ => "The content service is unreachable. Please try again.",
    }
}

fn identity_message(err: &IdentityError) -> &'static str {
    match err {
        IdentityError::Unauthorized => "You must be logged in.",
        _ => "The sign-in service is unreachable. Please try again.",
    }
}
