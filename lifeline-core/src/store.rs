//! Read access to the donor store.
//!
//! The engine never talks to the realtime database directly. Callers supply
//! a [`DonorSource`] that produces a fresh snapshot per search.

use async_trait::async_trait;
use thiserror::Error;

use crate::DonorCandidate;

/// Errors raised while listing donors.
#[derive(Debug, Error)]
pub enum DonorSourceError {
    /// The store could not be reached or read.
    #[error("donor store unavailable: {message}")]
    Unavailable {
        /// Human-readable reason.
        message: String,
        /// Underlying failure, when one exists.
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
    /// The store answered but the payload was not a donor listing.
    #[error("malformed donor listing: {message}")]
    Malformed {
        /// Decoder error text.
        message: String,
    },
}

impl DonorSourceError {
    /// Wrap an underlying error as [`DonorSourceError::Unavailable`].
    pub fn unavailable<E>(message: impl Into<String>, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Unavailable {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }
}

/// Supplies the donor snapshot a search evaluates.
///
/// Every call returns a fresh listing. A failure aborts the search; partial
/// listings must not be returned.
#[async_trait]
pub trait DonorSource: Send + Sync {
    /// List every donor currently in the store.
    async fn list_donors(&self) -> Result<Vec<DonorCandidate>, DonorSourceError>;
}

#[async_trait]
impl<T: DonorSource + ?Sized> DonorSource for Box<T> {
    async fn list_donors(&self) -> Result<Vec<DonorCandidate>, DonorSourceError> {
        (**self).list_donors().await
    }
}

#[async_trait]
impl DonorSource for Vec<DonorCandidate> {
    async fn list_donors(&self) -> Result<Vec<DonorCandidate>, DonorSourceError> {
        Ok(self.clone())
    }
}
