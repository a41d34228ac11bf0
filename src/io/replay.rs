//! Scenario replay driver
//!
//! Replays a scenario file against a [`Bank`], mapping the file's
//! free-form user handles onto stable customer identities and routing
//! admin decisions to the right pending item. A step that fails is
//! logged and counted; the replay keeps going, so one bad row never
//! hides the effect of the rest of the script.

use std::collections::HashMap;
use std::io::Write;
use std::path::Path;

use tracing::warn;
use uuid::Uuid;

use crate::bank::Bank;
use crate::io::report::write_balance_report;
use crate::io::scenario::{ScenarioOp, ScenarioReader};
use crate::types::{Actor, KycProfile, LoanApplication, TransferRequest, UserId};

/// Counts of replayed steps
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReplaySummary {
    /// Steps that executed successfully
    pub applied: usize,

    /// Steps that failed to parse or execute
    pub failed: usize,
}

/// Executes scenario steps against a bank
///
/// Customer handles are created on first use. All admin-side steps run
/// as a single synthetic admin; decision steps target the oldest
/// pending item for the named user or account, which matches how the
/// scenario files are written (decisions follow the submission they
/// answer).
pub struct ReplayDriver<'a> {
    bank: &'a Bank,
    users: HashMap<String, UserId>,
    admin: Actor,
}

impl<'a> ReplayDriver<'a> {
    pub fn new(bank: &'a Bank) -> Self {
        ReplayDriver {
            bank,
            users: HashMap::new(),
            admin: Actor::admin(Uuid::new_v4()),
        }
    }

    /// The customer actor for a handle, creating the identity on first use
    fn customer(&mut self, handle: &str) -> Actor {
        let id = *self
            .users
            .entry(handle.to_string())
            .or_insert_with(Uuid::new_v4);
        Actor::customer(id)
    }

    /// The already-created identity behind a handle
    fn known_user(&self, handle: &str) -> Result<UserId, String> {
        self.users
            .get(handle)
            .copied()
            .ok_or_else(|| format!("unknown user '{}'", handle))
    }

    /// Execute one step
    pub async fn apply(&mut self, op: ScenarioOp) -> Result<(), String> {
        match op {
            ScenarioOp::Open {
                user,
                number,
                account_type,
                deposit,
            } => {
                let actor = self.customer(&user);
                self.bank
                    .open_account(&actor, &number, account_type, deposit)
                    .map_err(|e| e.to_string())?;
            }
            ScenarioOp::SubmitKyc { user, full_name } => {
                let actor = self.customer(&user);
                // The scenario format only carries the name; contact
                // details are filled with placeholders.
                let profile = KycProfile::new(&full_name, "n/a", "n/a");
                self.bank
                    .submit_kyc(&actor, profile)
                    .map_err(|e| e.to_string())?;
            }
            ScenarioOp::DecideKyc { user, approve } => {
                let target = self.known_user(&user)?;
                self.bank
                    .decide_kyc(&self.admin, target, approve)
                    .map_err(|e| e.to_string())?;
            }
            ScenarioOp::Transfer {
                user,
                source,
                destination,
                amount,
                description,
            } => {
                let actor = self.customer(&user);
                let request = TransferRequest {
                    source,
                    destination,
                    amount,
                    description,
                };
                self.bank
                    .transfer(&actor, request)
                    .await
                    .map_err(|e| e.to_string())?;
            }
            ScenarioOp::ApplyLoan {
                user,
                loan_type,
                principal,
                tenure_months,
            } => {
                let actor = self.customer(&user);
                let application = LoanApplication::new(&loan_type, principal, tenure_months);
                self.bank
                    .apply_loan(&actor, application)
                    .map_err(|e| e.to_string())?;
            }
            ScenarioOp::DecideLoan { user, approve } => {
                let target = self.known_user(&user)?;
                let loan = self
                    .bank
                    .loans()
                    .pending()
                    .into_iter()
                    .find(|loan| loan.customer == target)
                    .ok_or_else(|| format!("no pending loan for '{}'", user))?;
                self.bank
                    .decide_loan(&self.admin, loan.id, approve)
                    .map_err(|e| e.to_string())?;
            }
            ScenarioOp::ReviewFlag { source, approve } => {
                let source_id = self
                    .bank
                    .ledger()
                    .resolve(&source)
                    .map_err(|e| e.to_string())?;
                let flag = self
                    .bank
                    .flags()
                    .unreviewed()
                    .into_iter()
                    .find(|flag| {
                        self.bank
                            .transactions()
                            .get(flag.transaction)
                            .is_some_and(|tx| tx.source == source_id)
                    })
                    .ok_or_else(|| format!("no unreviewed flag for account '{}'", source))?;
                self.bank
                    .review_flag(&self.admin, flag.transaction, approve)
                    .map_err(|e| e.to_string())?;
            }
            ScenarioOp::Reevaluate => {
                self.bank
                    .reevaluate_pending(&self.admin)
                    .await
                    .map_err(|e| e.to_string())?;
            }
        }
        Ok(())
    }
}

/// Replay a scenario file and write the final balance report
///
/// Parse and execution failures are logged at warn level and counted;
/// only failing to open the input or write the report is fatal.
pub async fn run_scenario(
    bank: &Bank,
    input: &Path,
    output: &mut dyn Write,
) -> Result<ReplaySummary, String> {
    let reader = ScenarioReader::new(input)?;
    let mut driver = ReplayDriver::new(bank);
    let mut summary = ReplaySummary {
        applied: 0,
        failed: 0,
    };

    for item in reader {
        match item {
            Ok(op) => match driver.apply(op).await {
                Ok(()) => summary.applied += 1,
                Err(message) => {
                    warn!(%message, "scenario step failed");
                    summary.failed += 1;
                }
            },
            Err(message) => {
                warn!(%message, "scenario row rejected");
                summary.failed += 1;
            }
        }
    }

    write_balance_report(&bank.ledger().accounts_sorted(), output)?;
    Ok(summary)
}
