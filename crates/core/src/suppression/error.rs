//! Suppression error type

use linkguard_domain::LinkGuardError;
use thiserror::Error;

use crate::tracker::TrackerError;

#[derive(Debug, Error)]
pub enum SuppressionError {
    /// The service has no entry in the configured service-type mapping.
    #[error(
        "no service type mapping configured for '{0}'; add it to \
         alert_suppression.suppression_rules.service_type_mapping"
    )]
    UnmappedService(String),

    #[error(transparent)]
    Tracker(#[from] TrackerError),
}

pub type SuppressionResult<T> = Result<T, SuppressionError>;

impl From<SuppressionError> for LinkGuardError {
    fn from(err: SuppressionError) -> Self {
        match err {
            SuppressionError::UnmappedService(_) => Self::Config(err.to_string()),
            SuppressionError::Tracker(inner) => inner.into(),
        }
    }
}
