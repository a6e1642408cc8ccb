// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use thiserror::Error;

use crate::Entity;

/// Failure surfaced by a repository call, classified by status band.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RepositoryError {
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{message}")]
    Network { status: u16, message: String },
    #[error("{0}")]
    Transport(String),
}

impl RepositoryError {
    pub fn generic(status: u16) -> String {
        format!("request failed with status {status}")
    }

    pub fn from_status(status: u16, message: Option<String>) -> Self {
        let message = message.unwrap_or_else(|| Self::generic(status));
        match status {
            400 | 422 => Self::Validation(message),
            404 => Self::NotFound(message),
            _ => Self::Network { status, message },
        }
    }

    pub fn message(&self) -> &str {
        match self {
            Self::Validation(message)
            | Self::NotFound(message)
            | Self::Transport(message)
            | Self::Network { message, .. } => message,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

/// Typed network access for one entity kind.
pub trait Repository<E: Entity>: Send + Sync {
    fn list(&self) -> Result<Vec<E>, RepositoryError>;

    fn get(&self, id: &E::Key) -> Result<E, RepositoryError>;

    fn create(&self, draft: &E::Draft) -> Result<E, RepositoryError>;

    fn update(&self, id: &E::Key, draft: &E::Draft) -> Result<E, RepositoryError>;

    fn delete(&self, id: &E::Key) -> Result<(), RepositoryError>;
}
