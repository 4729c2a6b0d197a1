//! Publisher collaborator contract.
//!
//! Publishing materializes an entry in an external sink and returns an
//! opaque location token, stored under the `publishedTo` annotation.
//! Concrete sinks live outside the core.

use crate::model::entry::Entry;
use std::error::Error;
use std::fmt::{Display, Formatter};

#[derive(Debug)]
pub enum PublishError {
    /// No sink is configured.
    Disabled,
    Io(std::io::Error),
    /// The sink refused the entry.
    Rejected(String),
}

impl Display for PublishError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Disabled => write!(f, "publishing is disabled"),
            Self::Io(err) => write!(f, "publish io failure: {err}"),
            Self::Rejected(reason) => write!(f, "publish rejected: {reason}"),
        }
    }
}

impl Error for PublishError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            Self::Disabled | Self::Rejected(_) => None,
        }
    }
}

impl From<std::io::Error> for PublishError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

/// External sink for public entries.
pub trait Publisher {
    /// Publishes `entry` and returns its location token.
    fn publish(&self, entry: &Entry) -> Result<String, PublishError>;
    /// Removes the published copy recorded in `entry.annotations.published_to`.
    fn unpublish(&self, entry: &Entry) -> Result<(), PublishError>;
}

impl<P: Publisher + ?Sized> Publisher for &P {
    fn publish(&self, entry: &Entry) -> Result<String, PublishError> {
        (**self).publish(entry)
    }

    fn unpublish(&self, entry: &Entry) -> Result<(), PublishError> {
        (**self).unpublish(entry)
    }
}

/// Publisher used when no sink is configured; every call fails with
/// `PublishError::Disabled`.
#[derive(Debug, Clone, Copy, Default)]
pub struct DisabledPublisher;

impl Publisher for DisabledPublisher {
    fn publish(&self, _entry: &Entry) -> Result<String, PublishError> {
        Err(PublishError::Disabled)
    }

    fn unpublish(&self, _entry: &Entry) -> Result<(), PublishError> {
        Err(PublishError::Disabled)
    }
}
