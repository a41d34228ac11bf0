//! Caller identity types
//!
//! Every operation enters the core with a verified (user id, role) pair
//! produced by an upstream authentication layer. The core trusts the pair
//! and enforces role-based access on it; it never performs authentication
//! itself.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::error::BankError;

/// Authenticated user identifier
///
/// Customers, admins, and auditors all share the same id space.
pub type UserId = Uuid;

/// Role attached to an authenticated caller
///
/// Roles gate operations: customers move their own money and submit
/// applications, admins decide workflows and remediate fraud, auditors
/// read the audit trail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Owns accounts; may transfer from them and apply for loans
    Customer,

    /// Decides KYC, loan, and fraud-review workflows
    Admin,

    /// Read-only access to the audit trail
    Auditor,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Customer => write!(f, "customer"),
            Role::Admin => write!(f, "admin"),
            Role::Auditor => write!(f, "auditor"),
        }
    }
}

/// Verified caller identity passed into every gated operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Actor {
    /// The authenticated user id
    pub user: UserId,

    /// The role the authentication layer attached to this caller
    pub role: Role,
}

impl Actor {
    /// Create a customer-role actor
    pub fn customer(user: UserId) -> Self {
        Actor {
            user,
            role: Role::Customer,
        }
    }

    /// Create an admin-role actor
    pub fn admin(user: UserId) -> Self {
        Actor {
            user,
            role: Role::Admin,
        }
    }

    /// Create an auditor-role actor
    pub fn auditor(user: UserId) -> Self {
        Actor {
            user,
            role: Role::Auditor,
        }
    }

    /// Require a specific role for an operation
    ///
    /// # Errors
    ///
    /// Returns `BankError::UnauthorizedRole` when the caller's role does
    /// not match.
    pub fn require(&self, role: Role) -> Result<(), BankError> {
        if self.role == role {
            Ok(())
        } else {
            Err(BankError::UnauthorizedRole {
                required: role,
                actual: self.role,
            })
        }
    }
}
