//! Fraud oracle seam
//!
//! The transfer engine consults an external fraud service through the
//! [`FraudOracle`] trait. The engine treats the oracle as slow and
//! unreliable: every call is wrapped in a timeout, and a missing answer
//! parks the transaction instead of failing the transfer.
//!
//! The adapters here are deterministic stand-ins used by the replay tool
//! and the test suite. A production deployment implements the trait over
//! its real scoring service.

use std::fmt;

use async_trait::async_trait;
use rust_decimal::Decimal;
use thiserror::Error;

use crate::types::{FraudCheckRequest, FraudVerdict};

/// Failure reported by an oracle adapter
#[derive(Debug, Clone, PartialEq, Error)]
pub enum OracleError {
    /// The oracle could not be reached or refused the call
    #[error("oracle unavailable: {reason}")]
    Unavailable {
        /// Adapter-specific failure description
        reason: String,
    },

    /// The oracle answered with something that is not a verdict
    #[error("oracle response unusable: {detail}")]
    InvalidResponse {
        /// What was wrong with the response
        detail: String,
    },
}

/// External fraud evaluation service
///
/// Implementations must be cheap to share; the engine holds one behind an
/// `Arc` and calls it concurrently.
#[async_trait]
pub trait FraudOracle: Send + Sync {
    /// Evaluate one transfer
    ///
    /// # Errors
    ///
    /// Returns [`OracleError`] when no verdict could be obtained. The
    /// engine maps this to a parked, re-evaluatable transaction.
    async fn evaluate(&self, request: &FraudCheckRequest) -> Result<FraudVerdict, OracleError>;
}

impl fmt::Debug for dyn FraudOracle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("dyn FraudOracle")
    }
}

/// Oracle returning the same verdict for every request
#[derive(Debug, Clone)]
pub struct StaticOracle {
    verdict: FraudVerdict,
}

impl StaticOracle {
    /// Oracle that clears everything
    pub fn approve_all() -> Self {
        StaticOracle {
            verdict: FraudVerdict::not_fraud(),
        }
    }

    /// Oracle that flags everything with the given reason
    pub fn flag_all(reason: &str) -> Self {
        StaticOracle {
            verdict: FraudVerdict::fraud(reason),
        }
    }
}

#[async_trait]
impl FraudOracle for StaticOracle {
    async fn evaluate(&self, _request: &FraudCheckRequest) -> Result<FraudVerdict, OracleError> {
        Ok(self.verdict.clone())
    }
}

/// Oracle flagging any amount strictly above a threshold
#[derive(Debug, Clone)]
pub struct ThresholdOracle {
    threshold: Decimal,
}

impl ThresholdOracle {
    pub fn new(threshold: Decimal) -> Self {
        ThresholdOracle { threshold }
    }
}

#[async_trait]
impl FraudOracle for ThresholdOracle {
    async fn evaluate(&self, request: &FraudCheckRequest) -> Result<FraudVerdict, OracleError> {
        if request.amount > self.threshold {
            Ok(FraudVerdict::fraud(&format!(
                "amount {} above threshold {}",
                request.amount, self.threshold
            )))
        } else {
            Ok(FraudVerdict::not_fraud())
        }
    }
}

/// Oracle that always fails
#[derive(Debug, Clone, Default)]
pub struct UnreachableOracle;

#[async_trait]
impl FraudOracle for UnreachableOracle {
    async fn evaluate(&self, _request: &FraudCheckRequest) -> Result<FraudVerdict, OracleError> {
        Err(OracleError::Unavailable {
            reason: "connection refused".to_string(),
        })
    }
}

/// Oracle that never answers
///
/// Exercises the engine's timeout path.
#[derive(Debug, Clone, Default)]
pub struct StalledOracle;

#[async_trait]
impl FraudOracle for StalledOracle {
    async fn evaluate(&self, _request: &FraudCheckRequest) -> Result<FraudVerdict, OracleError> {
        futures::future::pending().await
    }
}
