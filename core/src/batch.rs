//! # Transactional Batch Provisioning
//!
//! One run walks through:
//!
//! ```text
//! Idle -> Locked -> Executing -> Committing -> Unlocked -> (LoggedOut | Done)
//! ```
//!
//! 1. **Session**: authenticate (see [`crate::session`]). Failure is fatal.
//! 2. **Lock**: take the domain's edit lock through [`Transaction::begin`].
//!    Failure is fatal; nothing was staged, so no commit is owed. A lock
//!    request that timed out gets a best-effort unlock.
//! 3. **Execute**: normalize and create every record in input order. Any
//!    failure is recorded against that record only.
//! 4. **Epilogue**: [`Transaction::close`] commits then unlocks, then the
//!    session is closed. Every step is attempted even if the one before it
//!    failed, and failures end up in [`BatchReport::epilogue_failures`].

use std::fmt;

use addrbatch_common::address::object::AddressObject;
use addrbatch_common::address::record::AddressRecord;
use addrbatch_common::config::ManagerConfig;
use addrbatch_common::{error, info, success, warn};
use thiserror::Error;
use tracing::{Instrument, info_span};

use crate::api::{self, ApiError, ApiResponse, ManagerApi};
use crate::session::{AuthStrategy, Session, SessionError, expect_success};

/// Code reported for records that never got an answer from the manager.
pub const NO_RESPONSE_CODE: i64 = -1;

/// Result of provisioning a single record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchOutcome {
    pub name: String,
    pub subnet: String,
    pub success: bool,
    pub code: i64,
    pub message: String,
}

impl BatchOutcome {
    fn from_response(record: &AddressRecord, response: ApiResponse) -> Self {
        Self {
            name: record.name.clone(),
            subnet: record.subnet.clone(),
            success: response.is_success(),
            code: response.code,
            message: response.message,
        }
    }

    fn local_failure(record: &AddressRecord, message: impl Into<String>) -> Self {
        Self {
            name: record.name.clone(),
            subnet: record.subnet.clone(),
            success: false,
            code: NO_RESPONSE_CODE,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EpilogueStep {
    Commit,
    Unlock,
    Logout,
}

impl fmt::Display for EpilogueStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EpilogueStep::Commit => "commit",
            EpilogueStep::Unlock => "unlock",
            EpilogueStep::Logout => "logout",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepFailure {
    pub step: EpilogueStep,
    pub reason: String,
}

#[derive(Debug, Error)]
pub enum BatchError {
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error("could not lock domain '{domain}'")]
    Lock {
        domain: String,
        #[source]
        source: SessionError,
    },
}

impl BatchError {
    /// The lock request went out but no answer came back, so the manager
    /// may have granted it anyway.
    pub fn lock_state_unknown(&self) -> bool {
        matches!(
            self,
            BatchError::Lock {
                source: SessionError::Transport {
                    source: ApiError::Timeout { .. },
                    ..
                },
                ..
            }
        )
    }
}

/// Everything a completed run has to say.
#[derive(Debug, Clone)]
pub struct BatchReport {
    pub strategy: AuthStrategy,
    pub outcomes: Vec<BatchOutcome>,
    pub epilogue_failures: Vec<StepFailure>,
}

impl BatchReport {
    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|o| o.success).count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.succeeded()
    }

    /// `true` when commit, unlock and logout all went through.
    pub fn epilogue_completed(&self) -> bool {
        self.epilogue_failures.is_empty()
    }
}

/// An acquired domain lock.
///
/// Must be consumed with [`Transaction::close`]. Dropping it while still open
/// (a panic mid-batch, a cancelled future) cannot run the asynchronous
/// commit/unlock, so it is reported loudly instead.
#[must_use = "a locked domain stays locked until the transaction is closed"]
pub struct Transaction<'a> {
    api: &'a dyn ManagerApi,
    domain: &'a str,
    open: bool,
}

impl<'a> Transaction<'a> {
    pub async fn begin(api: &'a dyn ManagerApi, domain: &'a str) -> Result<Self, BatchError> {
        let response = api.lock(domain).await;
        expect_success("lock", response).map_err(|source| BatchError::Lock {
            domain: domain.to_string(),
            source,
        })?;

        success!("Locked domain '{domain}'");
        Ok(Self {
            api,
            domain,
            open: true,
        })
    }

    pub fn domain(&self) -> &str {
        self.domain
    }

    /// Commits then unlocks. Unlock is attempted even when commit fails.
    pub async fn close(mut self) -> Vec<StepFailure> {
        self.open = false;
        let mut failures = Vec::new();

        match expect_success("commit", self.api.commit(self.domain).await) {
            Ok(_) => success!("Committed changes to '{}'", self.domain),
            Err(e) => {
                let reason = describe(&e);
                error!("Commit of '{}' failed: {reason}", self.domain);
                failures.push(StepFailure {
                    step: EpilogueStep::Commit,
                    reason,
                });
            }
        }

        match expect_success("unlock", self.api.unlock(self.domain).await) {
            Ok(_) => success!("Unlocked domain '{}'", self.domain),
            Err(e) => {
                let reason = describe(&e);
                error!("Unlock of '{}' failed: {reason}", self.domain);
                failures.push(StepFailure {
                    step: EpilogueStep::Unlock,
                    reason,
                });
            }
        }

        failures
    }
}

impl Drop for Transaction<'_> {
    fn drop(&mut self) {
        if self.open {
            error!(
                "Domain '{}' was left locked: the run ended before commit and unlock",
                self.domain
            );
        }
    }
}

pub struct BatchExecutor<'a> {
    config: &'a ManagerConfig,
}

impl<'a> BatchExecutor<'a> {
    pub fn new(config: &'a ManagerConfig) -> Self {
        Self { config }
    }

    /// Runs the whole locked batch over `api`, which the run takes ownership of.
    pub async fn run(
        &self,
        api: Box<dyn ManagerApi>,
        records: &[AddressRecord],
    ) -> Result<BatchReport, BatchError> {
        let domain = self.config.domain.as_str();
        let session = Session::establish(api, &self.config.credentials).await?;
        let strategy = session.strategy();

        let locked = match Transaction::begin(session.api(), domain).await {
            Ok(transaction) => {
                info!("Creating {} addresses in domain '{domain}'...", records.len());
                let outcomes = provision(session.api(), domain, records).await;
                Ok((outcomes, transaction.close().await))
            }
            Err(e) => {
                if e.lock_state_unknown() {
                    release_stale_lock(session.api(), domain).await;
                }
                Err(e)
            }
        };

        let logout = session.close().await;
        let (outcomes, mut epilogue_failures) = match locked {
            Ok(run) => run,
            Err(e) => {
                if let Err(logout) = logout {
                    warn!("{}", describe(&logout));
                }
                return Err(e);
            }
        };

        if let Err(e) = logout {
            let reason = describe(&e);
            error!("{reason}");
            epilogue_failures.push(StepFailure {
                step: EpilogueStep::Logout,
                reason,
            });
        }

        Ok(BatchReport {
            strategy,
            outcomes,
            epilogue_failures,
        })
    }
}

/// Best-effort unlock after a lock request that timed out.
async fn release_stale_lock(api: &dyn ManagerApi, domain: &str) {
    warn!("Lock request for '{domain}' timed out; the manager may still hold it, unlocking");
    match expect_success("unlock", api.unlock(domain).await) {
        Ok(_) => info!("Unlocked domain '{domain}'"),
        Err(e) => warn!("Domain '{domain}' may still be locked: {}", describe(&e)),
    }
}

/// `err` and every cause under it, joined with `": "`.
pub fn describe(err: &dyn std::error::Error) -> String {
    let mut text = err.to_string();
    let mut cause = err.source();
    while let Some(inner) = cause {
        text.push_str(": ");
        text.push_str(&inner.to_string());
        cause = inner.source();
    }
    text
}

/// Creates every record in order. Never fails as a whole.
pub async fn provision(
    api: &dyn ManagerApi,
    domain: &str,
    records: &[AddressRecord],
) -> Vec<BatchOutcome> {
    let url = api::address_url(domain);
    let mut outcomes = Vec::with_capacity(records.len());

    for record in records {
        info!("Creating address: {} ({})...", record.name, record.subnet);
        let outcome = provision_one(api, &url, record).await;

        if outcome.success {
            success!("  Success: {} created successfully.", outcome.name);
        } else {
            error!(
                "  Failure: Unable to create {} ({}). Code: {} {}",
                outcome.name, outcome.subnet, outcome.code, outcome.message
            );
        }
        outcomes.push(outcome);
    }

    outcomes
}

async fn provision_one(api: &dyn ManagerApi, url: &str, record: &AddressRecord) -> BatchOutcome {
    let object = match AddressObject::from_record(record) {
        Ok(object) => object,
        Err(e) => return BatchOutcome::local_failure(record, e.to_string()),
    };

    let payload = match serde_json::to_value(&object) {
        Ok(payload) => payload,
        Err(e) => return BatchOutcome::local_failure(record, e.to_string()),
    };

    let span = info_span!("create", name = %object.name, subnet = %object.subnet);
    let response = {
        let _verbose = api.diagnostics().scope();
        api.set(url, &payload).instrument(span).await
    };

    match response {
        Ok(response) => BatchOutcome::from_response(record, response),
        Err(e) => BatchOutcome::local_failure(record, describe(&e)),
    }
}
