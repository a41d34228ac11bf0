//! KYC registry and workflow
//!
//! Holds one [`Customer`] record per user and walks it through the
//! verification machine:
//!
//! ```text
//! Pending --submit--> InProgress --approve--> Approved (terminal)
//!                 ^       |
//!                 |       +------revert-----> Reverted
//!                 +-------------resubmit----------+
//! ```
//!
//! Resubmitting while a decision is outstanding is an idempotent no-op:
//! the existing submission stands and no second audit entry is written.
//! Admin decisions apply only to `InProgress` records; anything else is
//! refused without a state change.

use std::sync::Arc;

use dashmap::DashMap;
use serde_json::json;
use tracing::info;

use crate::clock::Clock;
use crate::core::audit::AuditSink;
use crate::types::{
    Actor, AuditAction, AuditOutcome, BankError, Customer, KycProfile, KycStatus, Role, UserId,
};

/// Thread-safe registry of customer KYC records
pub struct KycRegistry {
    customers: DashMap<UserId, Customer>,
    audit: Arc<AuditSink>,
    clock: Arc<dyn Clock>,
}

impl KycRegistry {
    /// Create an empty registry
    pub fn new(audit: Arc<AuditSink>, clock: Arc<dyn Clock>) -> Self {
        KycRegistry {
            customers: DashMap::new(),
            audit,
            clock,
        }
    }

    /// Make sure a customer record exists, creating it in `Pending`
    ///
    /// Called on the signup path. Registering an existing customer is a
    /// no-op; opening a second account does not reset the workflow.
    pub fn ensure_registered(&self, user: UserId) {
        self.customers.entry(user).or_insert_with(|| Customer::new(user));
    }

    /// Current KYC status of a user
    ///
    /// # Errors
    ///
    /// `UnknownCustomer` if the user was never registered.
    pub fn status(&self, user: UserId) -> Result<KycStatus, BankError> {
        self.customers
            .get(&user)
            .map(|entry| entry.value().status)
            .ok_or(BankError::UnknownCustomer { user })
    }

    /// Full customer record
    pub fn customer(&self, user: UserId) -> Result<Customer, BankError> {
        self.customers
            .get(&user)
            .map(|entry| entry.value().clone())
            .ok_or(BankError::UnknownCustomer { user })
    }

    /// Submit (or resubmit) identity details
    ///
    /// Moves `Pending` or `Reverted` to `InProgress`. Resubmission while
    /// `InProgress` changes nothing and audits nothing.
    ///
    /// # Errors
    ///
    /// `UnauthorizedRole` for non-customers, `UnknownCustomer` for
    /// unregistered users, `KycAlreadyApproved` once approved.
    pub fn submit(&self, actor: &Actor, profile: KycProfile) -> Result<KycStatus, BankError> {
        actor.require(Role::Customer)?;
        let user = actor.user;

        let attempt = {
            let mut entry = self
                .customers
                .get_mut(&user)
                .ok_or(BankError::UnknownCustomer { user })?;
            let customer = entry.value_mut();
            match customer.status {
                KycStatus::Pending | KycStatus::Reverted => {
                    customer.status = KycStatus::InProgress;
                    customer.profile = Some(profile);
                    customer.submitted_at = Some(self.clock.now());
                    Ok(true)
                }
                KycStatus::InProgress => Ok(false),
                KycStatus::Approved => Err(BankError::KycAlreadyApproved { user }),
            }
        };

        let transitioned = match attempt {
            Ok(transitioned) => transitioned,
            Err(error) => {
                self.audit.append(
                    user,
                    AuditAction::KycSubmitted,
                    AuditOutcome::Failed,
                    Some(user),
                    json!({ "reason": error.to_string() }),
                );
                return Err(error);
            }
        };

        if transitioned {
            info!(user = %user, "kyc details submitted");
            self.audit.append(
                user,
                AuditAction::KycSubmitted,
                AuditOutcome::Succeeded,
                Some(user),
                json!({ "status": KycStatus::InProgress.to_string() }),
            );
        }
        Ok(KycStatus::InProgress)
    }

    /// Decide an in-progress verification
    ///
    /// # Arguments
    ///
    /// * `admin` - Deciding admin; must hold the admin role
    /// * `user` - Customer under review
    /// * `approve` - `true` approves, `false` reverts for resubmission
    ///
    /// # Errors
    ///
    /// `KycNotSubmitted` when nothing is awaiting a decision,
    /// `KycAlreadyApproved` when the customer is already through.
    pub fn decide(&self, admin: &Actor, user: UserId, approve: bool) -> Result<Customer, BankError> {
        admin.require(Role::Admin)?;

        let outcome = {
            let mut entry = self
                .customers
                .get_mut(&user)
                .ok_or(BankError::UnknownCustomer { user })?;
            let customer = entry.value_mut();
            match customer.status {
                KycStatus::InProgress => {
                    customer.status = if approve {
                        KycStatus::Approved
                    } else {
                        KycStatus::Reverted
                    };
                    customer.decided_at = Some(self.clock.now());
                    Ok(customer.clone())
                }
                KycStatus::Pending | KycStatus::Reverted => {
                    Err(BankError::KycNotSubmitted { user })
                }
                KycStatus::Approved => Err(BankError::KycAlreadyApproved { user }),
            }
        };

        match &outcome {
            Ok(customer) => {
                info!(user = %user, status = %customer.status, "kyc decided");
                self.audit.append(
                    admin.user,
                    AuditAction::KycDecided,
                    AuditOutcome::Succeeded,
                    Some(user),
                    json!({ "status": customer.status.to_string() }),
                );
            }
            Err(error) => {
                self.audit.append(
                    admin.user,
                    AuditAction::KycDecided,
                    AuditOutcome::Failed,
                    Some(user),
                    json!({ "reason": error.to_string() }),
                );
            }
        }
        outcome
    }

    /// Customers awaiting a decision, oldest submission first
    pub fn in_review(&self) -> Vec<Customer> {
        let mut waiting: Vec<Customer> = self
            .customers
            .iter()
            .filter(|entry| entry.value().status == KycStatus::InProgress)
            .map(|entry| entry.value().clone())
            .collect();
        waiting.sort_by_key(|customer| (customer.submitted_at, customer.id));
        waiting
    }

    /// Number of registered customers
    pub fn len(&self) -> usize {
        self.customers.len()
    }

    /// Whether no customer is registered
    pub fn is_empty(&self) -> bool {
        self.customers.is_empty()
    }
}
