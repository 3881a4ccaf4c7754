//! Scenario execution engine
//!
//! Runs parsed feature files against a [`ScenarioContext`]. Preconditions
//! only mutate the ledger when the wanted state does not hold yet, actions run
//! unconditionally and assertions go back to the node. A failed scenario gets
//! its registry and transaction ledger dumped before the context is reset.
//!
//! # Example
//!
//! ```rust,ignore
//! let feature = parse_feature(source)?;
//! let mut runner = ScenarioRunner::new(context)?;
//! let report = runner.run_feature(&feature).await;
//! assert!(report.success());
//! ```

use log::{debug, error, info, warn};
use lto_common::{
    config::{
        ASSOCIATION_FEE, CANCEL_LEASE_FEE, CANCEL_SPONSORSHIP_FEE, DEFAULT_LEASE_AMOUNT,
        LEASE_FEE, REVOKE_ASSOCIATION_FEE, SPONSORSHIP_FEE,
    },
    crypto::{decode_base58, encode_base58, Account, KeyType},
    transaction::RegisteredKey,
    utils::format_lto_amount,
};
use serde::{Deserialize, Serialize};
use std::{path::PathBuf, time::Instant};

use super::{
    artifacts::FailureArtifact,
    parser::{Feature, Scenario},
    steps::{Action, BalanceKind, Step, StepMatcher},
};
use crate::{
    context::{FailureDiagnostics, Party, ScenarioContext, SubmittedTransaction},
    error::{HarnessError, HarnessResult},
};

/// How a precondition step was satisfied
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Precondition {
    AlreadyHeld,
    Established,
}

/// Result of a "tries to" step
#[derive(Debug)]
pub enum Attempt {
    Succeeded(SubmittedTransaction),
    Failed(HarnessError),
}

impl Attempt {
    pub fn succeeded(&self) -> bool {
        matches!(self, Attempt::Succeeded(_))
    }
}

fn check(condition: bool, message: impl FnOnce() -> String) -> HarnessResult<()> {
    if condition {
        Ok(())
    } else {
        Err(HarnessError::Assertion(message()))
    }
}

impl ScenarioContext {
    /// Run an action, propagating its failure
    pub async fn perform(
        &mut self,
        action: &Action,
        version: Option<u8>,
    ) -> HarnessResult<SubmittedTransaction> {
        match action {
            Action::Transfer {
                sender,
                recipient,
                amount,
            } => {
                self.transfer(sender.as_str().into(), recipient.as_str().into(), *amount, version)
                    .await
            }
            Action::Lease {
                sender,
                recipient,
                amount,
            } => {
                self.lease(sender.as_str().into(), recipient.as_str().into(), *amount, version)
                    .await
            }
            Action::CancelLease { sender, recipient } => {
                self.cancel_lease(sender.as_str().into(), recipient.as_str().into(), version)
                    .await
            }
            Action::Sponsor {
                sponsoring,
                sponsored,
            } => {
                self.sponsor(sponsored.as_str().into(), sponsoring.as_str().into(), version)
                    .await
            }
            Action::CancelSponsorship {
                sponsoring,
                sponsored,
            } => {
                self.cancel_sponsorship(
                    sponsored.as_str().into(),
                    sponsoring.as_str().into(),
                    version,
                )
                .await
            }
            Action::MassTransfer { sender, transfers } => {
                let transfers: Vec<(Party<'_>, u64)> = transfers
                    .iter()
                    .map(|(recipient, amount)| (Party::from(recipient.as_str()), *amount))
                    .collect();
                self.mass_transfer(sender.as_str().into(), &transfers, version)
                    .await
            }
            Action::Associate {
                sender,
                recipient,
                association_type,
                anchor,
            } => {
                self.associate(
                    sender.as_str().into(),
                    recipient.as_str().into(),
                    *association_type,
                    anchor.as_deref().map(str::as_bytes),
                    version,
                )
                .await
            }
            Action::RevokeAssociation {
                sender,
                recipient,
                association_type,
                anchor,
            } => {
                self.revoke_association(
                    sender.as_str().into(),
                    recipient.as_str().into(),
                    *association_type,
                    anchor.as_deref().map(str::as_bytes),
                    version,
                )
                .await
            }
            Action::Anchor { sender, hash } => {
                self.anchor(sender.as_str().into(), hash, version).await
            }
            Action::Register {
                sender,
                key_type,
                public_key,
            } => {
                let public_key = match (public_key, key_type) {
                    (Some(public_key), _) => decode_base58(public_key)?,
                    // a fresh ed25519 key when none is given
                    (None, KeyType::Ed25519) => {
                        Account::generate(self.chain_id()).public_key().to_vec()
                    }
                    (None, key_type) => {
                        self.set_last_success(false);
                        return Err(HarnessError::Step(format!(
                            "a {} public key must be given",
                            key_type
                        )));
                    }
                };
                let key = RegisteredKey {
                    key_type: *key_type,
                    public_key,
                };
                self.register(sender.as_str().into(), vec![key], version)
                    .await
            }
        }
    }

    /// Run an action, keeping its failure as a value
    pub async fn attempt(&mut self, action: &Action, version: Option<u8>) -> Attempt {
        match self.perform(action, version).await {
            Ok(submitted) => Attempt::Succeeded(submitted),
            Err(e) => {
                self.set_last_success(false);
                Attempt::Failed(e)
            }
        }
    }

    pub async fn ensure_sponsoring(
        &mut self,
        sponsor: Party<'_>,
        sponsored: Party<'_>,
        wanted: bool,
    ) -> HarnessResult<Precondition> {
        if self.is_sponsoring(sponsor, sponsored).await? == wanted {
            return Ok(Precondition::AlreadyHeld);
        }

        if wanted {
            self.ensure_funds(sponsor, SPONSORSHIP_FEE).await?;
            self.sponsor(sponsored, sponsor, None).await?;
        } else {
            self.ensure_funds(sponsor, CANCEL_SPONSORSHIP_FEE).await?;
            self.cancel_sponsorship(sponsored, sponsor, None).await?;
        }
        Ok(Precondition::Established)
    }

    pub async fn ensure_leasing(
        &mut self,
        sender: Party<'_>,
        recipient: Party<'_>,
        amount: Option<u64>,
        wanted: bool,
    ) -> HarnessResult<Precondition> {
        if wanted {
            if self.is_leasing(sender, recipient, amount).await? {
                return Ok(Precondition::AlreadyHeld);
            }
            let leased = amount.unwrap_or(DEFAULT_LEASE_AMOUNT);
            self.ensure_funds(sender, LEASE_FEE.saturating_add(leased))
                .await?;
            self.lease(sender, recipient, Some(leased), None).await?;
            return Ok(Precondition::Established);
        }

        let mut outcome = Precondition::AlreadyHeld;
        // every confirmed cancel removes one lease
        while self.is_leasing(sender, recipient, amount).await? {
            self.ensure_funds(sender, CANCEL_LEASE_FEE).await?;
            self.cancel_lease_of(sender, recipient, amount, None)
                .await?;
            outcome = Precondition::Established;
        }
        Ok(outcome)
    }

    pub async fn ensure_association(
        &mut self,
        sender: Party<'_>,
        recipient: Party<'_>,
        association_type: u64,
        anchor: Option<&str>,
        wanted: bool,
    ) -> HarnessResult<Precondition> {
        let links: Vec<_> = self
            .is_associated(sender, recipient)
            .await?
            .unwrap_or_default()
            .into_iter()
            .filter(|link| link.association_type == association_type)
            .collect();

        if wanted {
            if !links.is_empty() {
                return Ok(Precondition::AlreadyHeld);
            }
            self.ensure_funds(sender, ASSOCIATION_FEE).await?;
            self.associate(
                sender,
                recipient,
                association_type,
                anchor.map(str::as_bytes),
                None,
            )
            .await?;
            let issued = self
                .is_associated(sender, recipient)
                .await?
                .is_some_and(|links| links.iter().any(|l| l.association_type == association_type));
            check(issued, || {
                format!("failed to issue association from {} to {}", sender, recipient)
            })?;
            return Ok(Precondition::Established);
        }

        if links.is_empty() {
            return Ok(Precondition::AlreadyHeld);
        }
        for link in links {
            let anchor = if link.hash.is_empty() {
                None
            } else {
                Some(decode_base58(&link.hash)?)
            };
            self.ensure_funds(sender, REVOKE_ASSOCIATION_FEE).await?;
            self.revoke_association(
                sender,
                recipient,
                association_type,
                anchor.as_deref(),
                None,
            )
            .await?;
        }
        Ok(Precondition::Established)
    }

    /// Execute one step, returning a short note for the execution log
    pub async fn run_step(&mut self, step: &Step) -> HarnessResult<String> {
        match step {
            Step::EnsureBalance { user, amount } => {
                self.ensure_balance(user.as_str().into(), *amount).await?;
                Ok(format!("{} holds {} LTO", user, format_lto_amount(*amount)))
            }
            Step::EnsureSponsoring {
                sponsor,
                sponsored,
                wanted,
            } => {
                let outcome = self
                    .ensure_sponsoring(sponsor.as_str().into(), sponsored.as_str().into(), *wanted)
                    .await?;
                Ok(format!("{:?}", outcome))
            }
            Step::EnsureLeasing {
                sender,
                recipient,
                amount,
                wanted,
            } => {
                let outcome = self
                    .ensure_leasing(
                        sender.as_str().into(),
                        recipient.as_str().into(),
                        *amount,
                        *wanted,
                    )
                    .await?;
                Ok(format!("{:?}", outcome))
            }
            Step::EnsureAssociation {
                sender,
                recipient,
                association_type,
                anchor,
                wanted,
            } => {
                let outcome = self
                    .ensure_association(
                        sender.as_str().into(),
                        recipient.as_str().into(),
                        *association_type,
                        anchor.as_deref(),
                        *wanted,
                    )
                    .await?;
                Ok(format!("{:?}", outcome))
            }
            Step::Perform {
                action,
                version,
                attempt: false,
            } => {
                let submitted = self.perform(action, *version).await?;
                Ok(format!("{} {} confirmed", submitted.kind, submitted.id))
            }
            Step::Perform {
                action,
                version,
                attempt: true,
            } => match self.attempt(action, *version).await {
                Attempt::Succeeded(submitted) => {
                    Ok(format!("{} {} went through", submitted.kind, submitted.id))
                }
                Attempt::Failed(e) => {
                    if log::log_enabled!(log::Level::Debug) {
                        debug!("Attempt failed as allowed: {}", e);
                    }
                    Ok(format!("failed: {}", e))
                }
            },
            Step::ExpectBalance { user, kind, amount } => {
                let party = Party::from(user.as_str());
                let actual = match kind {
                    BalanceKind::Total => self.balance(party).await?,
                    BalanceKind::Regular => self.balance_details(party).await?.regular,
                    BalanceKind::Available => self.balance_details(party).await?.available,
                    BalanceKind::Effective => self.balance_details(party).await?.effective,
                };
                check(actual == *amount, || {
                    format!(
                        "{} has {} LTO ({:?}), expected {}",
                        user,
                        format_lto_amount(actual),
                        kind,
                        format_lto_amount(*amount)
                    )
                })?;
                Ok(format!("{} LTO", format_lto_amount(actual)))
            }
            Step::ExpectSponsoring {
                sponsor,
                sponsored,
                expected,
            } => {
                let actual = self
                    .is_sponsoring(sponsor.as_str().into(), sponsored.as_str().into())
                    .await?;
                check(actual == *expected, || {
                    format!(
                        "{} sponsoring {} is {}, expected {}",
                        sponsor, sponsored, actual, expected
                    )
                })?;
                Ok("sponsorship checked".into())
            }
            Step::ExpectLeasing {
                sender,
                recipient,
                amount,
                expected,
            } => {
                let actual = self
                    .is_leasing(sender.as_str().into(), recipient.as_str().into(), *amount)
                    .await?;
                check(actual == *expected, || {
                    format!(
                        "{} leasing to {} is {}, expected {}",
                        sender, recipient, actual, expected
                    )
                })?;
                Ok("lease checked".into())
            }
            Step::ExpectAssociated {
                sender,
                recipient,
                expected,
            } => {
                let links = self
                    .is_associated(sender.as_str().into(), recipient.as_str().into())
                    .await?;
                check(links.is_some() == *expected, || {
                    format!(
                        "{} associated with {}: {:?}, expected {}",
                        sender, recipient, links, expected
                    )
                })?;
                Ok(format!("{:?}", links))
            }
            Step::ExpectAssociation {
                sender,
                recipient,
                association_type,
                anchor,
            } => {
                let links = self
                    .is_associated(sender.as_str().into(), recipient.as_str().into())
                    .await?
                    .unwrap_or_default();
                let hash = anchor.as_deref().map(|anchor| encode_base58(anchor.as_bytes()));
                let found = links.iter().any(|link| {
                    link.association_type == *association_type
                        && hash.as_ref().map_or(true, |hash| link.hash == *hash)
                });
                check(found, || {
                    format!(
                        "no association of type {} from {} to {}, found {:?}",
                        association_type, sender, recipient, links
                    )
                })?;
                Ok("association checked".into())
            }
            Step::ExpectOutcome { success } => match self.last_success() {
                Some(actual) => {
                    check(actual == *success, || {
                        format!(
                            "last transaction {}",
                            if actual { "succeeded" } else { "failed" }
                        )
                    })?;
                    Ok("outcome checked".into())
                }
                None => Err(HarnessError::Assertion(
                    "no transaction was submitted in this scenario".into(),
                )),
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScenarioStatus {
    Passed,
    Failed,
    Skipped,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepFailure {
    pub line: usize,
    pub step: String,
    pub error: String,
}

/// Execution report of one scenario
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioReport {
    pub feature: String,
    pub name: String,
    pub status: ScenarioStatus,
    pub steps_executed: usize,
    pub failure: Option<StepFailure>,
    /// Registry and ledger at the time of failure
    pub diagnostics: Option<FailureDiagnostics>,
    pub log: Vec<String>,
    pub duration_ms: u64,
}

impl ScenarioReport {
    pub fn passed(&self) -> bool {
        self.status == ScenarioStatus::Passed
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureReport {
    pub name: String,
    pub scenarios: Vec<ScenarioReport>,
}

impl FeatureReport {
    fn count(&self, status: ScenarioStatus) -> usize {
        self.scenarios.iter().filter(|s| s.status == status).count()
    }

    pub fn passed(&self) -> usize {
        self.count(ScenarioStatus::Passed)
    }

    pub fn failed(&self) -> usize {
        self.count(ScenarioStatus::Failed)
    }

    pub fn skipped(&self) -> usize {
        self.count(ScenarioStatus::Skipped)
    }

    pub fn success(&self) -> bool {
        self.failed() == 0
    }

    /// Print report to stdout
    pub fn print(&self) {
        println!("\nFeature: {}", self.name);
        for scenario in &self.scenarios {
            let mark = match scenario.status {
                ScenarioStatus::Passed => "✓",
                ScenarioStatus::Failed => "✗",
                ScenarioStatus::Skipped => "-",
            };
            println!("  {} {} ({} ms)", mark, scenario.name, scenario.duration_ms);
            if let Some(failure) = &scenario.failure {
                println!("      line {}: {}", failure.line, failure.step);
                println!("      {}", failure.error);
            }
            if let Some(diagnostics) = &scenario.diagnostics {
                for line in diagnostics.to_string().lines() {
                    println!("      {}", line);
                }
            }
        }
        println!(
            "  {} passed, {} failed, {} skipped",
            self.passed(),
            self.failed(),
            self.skipped()
        );
    }
}

/// Runs feature files one scenario at a time
pub struct ScenarioRunner {
    context: ScenarioContext,
    matcher: StepMatcher,
    artifacts_dir: Option<PathBuf>,
}

impl ScenarioRunner {
    pub fn new(context: ScenarioContext) -> HarnessResult<Self> {
        Ok(Self {
            context,
            matcher: StepMatcher::new()?,
            artifacts_dir: None,
        })
    }

    /// Write a JSON artifact for every failed scenario into `dir`
    pub fn with_artifacts_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.artifacts_dir = Some(dir.into());
        self
    }

    pub fn context(&self) -> &ScenarioContext {
        &self.context
    }

    pub fn context_mut(&mut self) -> &mut ScenarioContext {
        &mut self.context
    }

    pub async fn run_feature(&mut self, feature: &Feature) -> FeatureReport {
        info!("Feature: {}", feature.name);
        let mut scenarios = Vec::with_capacity(feature.scenarios.len());
        for scenario in &feature.scenarios {
            scenarios.push(self.run_scenario(feature, scenario).await);
        }

        FeatureReport {
            name: feature.name.clone(),
            scenarios,
        }
    }

    pub async fn run_scenario(&mut self, feature: &Feature, scenario: &Scenario) -> ScenarioReport {
        let mut report = ScenarioReport {
            feature: feature.name.clone(),
            name: scenario.name.clone(),
            status: ScenarioStatus::Skipped,
            steps_executed: 0,
            failure: None,
            diagnostics: None,
            log: Vec::new(),
            duration_ms: 0,
        };

        if scenario.is_skipped() {
            info!("Skipping scenario: {}", scenario.name);
            return report;
        }

        info!("Scenario: {}", scenario.name);
        let start = Instant::now();
        {
            // reset on every exit path
            let mut scope = self.context.scope();

            for line in feature.background.iter().chain(&scenario.steps) {
                report.log.push(format!("{} {}", line.keyword, line.text));

                let result = match self.matcher.parse(line) {
                    Ok(step) => scope.run_step(&step).await,
                    Err(e) => Err(e),
                };

                match result {
                    Ok(note) => {
                        report.steps_executed += 1;
                        report.log.push(format!("  ✓ {}", note));
                    }
                    Err(e) => {
                        report.log.push(format!("  ✗ {}", e));
                        report.failure = Some(StepFailure {
                            line: line.line,
                            step: format!("{} {}", line.keyword, line.text),
                            error: e.to_string(),
                        });
                        break;
                    }
                }
            }

            report.status = if report.failure.is_some() {
                report.diagnostics = Some(scope.dump_failure(&scenario.name));
                ScenarioStatus::Failed
            } else {
                ScenarioStatus::Passed
            };
        }
        report.duration_ms = start.elapsed().as_millis() as u64;

        if let (Some(failure), Some(dir)) = (&report.failure, &self.artifacts_dir) {
            error!(
                "Scenario '{}' failed at line {}: {}",
                scenario.name, failure.line, failure.error
            );
            match FailureArtifact::from_report(&report).save(dir).await {
                Ok(path) => info!("Failure artifact written to {}", path.display()),
                Err(e) => warn!("Could not write failure artifact: {:#}", e),
            }
        }

        report
    }
}
