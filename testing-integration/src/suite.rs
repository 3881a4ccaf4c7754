//! Fixed end-to-end suite.
//!
//! Runs against four identities derived from well known seed phrases. The
//! node under test is expected to fund them at genesis; the validator is the
//! node's own account.

use anyhow::{ensure, Context, Result};
use log::{error, info};
use lto_common::{
    config::{
        CANCEL_SPONSORSHIP_FEE, LEASE_FEE, SPONSORSHIP_FEE, TRANSFER_FEE,
    },
    crypto::{decode_base58, sha256_hex},
    transaction::{mass_transfer_fee, CancelLeasePayload, TransactionPayload},
};
use rand::{distributions::Alphanumeric, Rng};
use serde::Serialize;
use std::time::Instant;
use strum::IntoEnumIterator;

use crate::context::{FailureDiagnostics, Party, ScenarioContext};

pub const VALIDATOR_SEED: &str =
    "cable sniff exchange judge gym rifle prevent traffic picture firm shaft exist cute unusual check";
pub const ALICE_SEED: &str =
    "amazing use view color endless fever dinner corn sight history lobster sniff merit fly evolve";
pub const BOB_SEED: &str =
    "home visit certain universe adjust thing estate pyramid age puzzle update ensure fatal crucial hat";
pub const CHARLIE_SEED: &str =
    "amazing use view color endless fever dinner corn sight history lobster sniff merit fly sight";

/// Labels and seeds of the suite identities
pub const IDENTITIES: [(&str, &str); 4] = [
    ("validator", VALIDATOR_SEED),
    ("alice", ALICE_SEED),
    ("bob", BOB_SEED),
    ("charlie", CHARLIE_SEED),
];

const VALIDATOR: Party<'static> = Party::Account("validator");
const ALICE: Party<'static> = Party::Account("alice");
const BOB: Party<'static> = Party::Account("bob");
const CHARLIE: Party<'static> = Party::Account("charlie");

const LEASE_AMOUNT: u64 = 50_000;
const MASS_TRANSFER_AMOUNT: u64 = 50_000;
const SPONSORED_TRANSFER_AMOUNT: u64 = 10_000;
const ANCHOR_DATA: &str = "e2etests";

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    strum::Display,
    strum::EnumString,
    strum::EnumIter,
    Serialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum SuiteTest {
    Connectivity,
    Association,
    Lease,
    MassTransfer,
    Sponsorship,
    Anchor,
    V3,
}

impl SuiteTest {
    pub fn all() -> Vec<SuiteTest> {
        SuiteTest::iter().collect()
    }

    async fn run(self, ctx: &mut ScenarioContext) -> Result<()> {
        match self {
            SuiteTest::Connectivity => test_connectivity(ctx).await,
            SuiteTest::Association => test_association(ctx).await,
            SuiteTest::Lease => test_lease(ctx).await,
            SuiteTest::MassTransfer => test_mass_transfer(ctx).await,
            SuiteTest::Sponsorship => test_sponsorship(ctx).await,
            SuiteTest::Anchor => test_anchor(ctx).await,
            SuiteTest::V3 => test_v3(ctx).await,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SuiteOutcome {
    pub test: SuiteTest,
    pub error: Option<String>,
    pub diagnostics: Option<FailureDiagnostics>,
    pub duration_ms: u64,
}

impl SuiteOutcome {
    pub fn passed(&self) -> bool {
        self.error.is_none()
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct SuiteReport {
    pub outcomes: Vec<SuiteOutcome>,
}

impl SuiteReport {
    pub fn failed(&self) -> usize {
        self.outcomes.iter().filter(|o| !o.passed()).count()
    }

    pub fn success(&self) -> bool {
        self.failed() == 0
    }

    /// Print report to stdout
    pub fn print(&self) {
        println!("\nEnd-to-end suite");
        for outcome in &self.outcomes {
            match &outcome.error {
                None => println!("  ✓ {} ({} ms)", outcome.test, outcome.duration_ms),
                Some(e) => println!("  ✗ {} ({} ms): {}", outcome.test, outcome.duration_ms, e),
            }
        }
        println!(
            "  {} passed, {} failed",
            self.outcomes.len() - self.failed(),
            self.failed()
        );
    }
}

/// Bind the suite labels to their seed derived accounts
pub fn declare_identities(ctx: &mut ScenarioContext) {
    for (label, seed) in IDENTITIES {
        ctx.registry_mut().declare_identity(label, seed);
    }
}

/// Run `tests` in order, each in a fresh scope
pub async fn run_suite(ctx: &mut ScenarioContext, tests: &[SuiteTest]) -> SuiteReport {
    let mut report = SuiteReport::default();
    for test in tests {
        info!("Running {}", test);
        let start = Instant::now();
        let mut scope = ctx.scope();
        declare_identities(&mut scope);

        let result = test.run(&mut scope).await;
        let (error, diagnostics) = match result {
            Ok(()) => (None, None),
            Err(e) => {
                error!("{} failed: {:#}", test, e);
                (Some(format!("{:#}", e)), Some(scope.dump_failure(&test.to_string())))
            }
        };
        drop(scope);

        report.outcomes.push(SuiteOutcome {
            test: *test,
            error,
            diagnostics,
            duration_ms: start.elapsed().as_millis() as u64,
        });
    }
    report
}

async fn test_connectivity(ctx: &mut ScenarioContext) -> Result<()> {
    ctx.node().ping().await.context("node is not reachable")
}

// Alice associates with Bob, then revokes it
async fn test_association(ctx: &mut ScenarioContext) -> Result<()> {
    let anchor: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(16)
        .map(char::from)
        .collect();
    let alice = ctx.address_of(ALICE);
    let bob = ctx.address_of(BOB);

    let issued = ctx
        .associate(ALICE, BOB, 1, Some(anchor.as_bytes()), None)
        .await?;

    let outgoing = ctx.node().association_status(&alice).await?.outgoing;
    let alice_view = outgoing
        .into_iter()
        .find(|a| a.issue_transaction_id == issued.id)
        .context("association missing from alice's outgoing list")?;
    ensure!(alice_view.association_type == 1, "unexpected type {}", alice_view.association_type);
    ensure!(alice_view.party == bob, "outgoing party is {}", alice_view.party);
    ensure!(
        alice_view.revoke_transaction_id.is_none() && alice_view.revoke_height.is_none(),
        "fresh association carries revoke fields"
    );

    let incoming = ctx.node().association_status(&bob).await?.incoming;
    let bob_view = incoming
        .into_iter()
        .find(|a| a.issue_transaction_id == issued.id)
        .context("association missing from bob's incoming list")?;
    ensure!(bob_view.association_type == 1, "unexpected type {}", bob_view.association_type);
    ensure!(bob_view.party == alice, "incoming party is {}", bob_view.party);
    ensure!(!bob_view.is_revoked(), "fresh association is revoked");

    let revoked = ctx
        .revoke_association(ALICE, BOB, 1, Some(anchor.as_bytes()), None)
        .await?;

    let outgoing = ctx.node().association_status(&alice).await?.outgoing;
    let alice_view = outgoing
        .into_iter()
        .find(|a| a.revoke_transaction_id.as_deref() == Some(revoked.id.as_str()))
        .context("revoked association missing from alice's outgoing list")?;
    ensure!(alice_view.issue_transaction_id == issued.id, "revoked the wrong association");
    ensure!(alice_view.association_type == 1, "unexpected type {}", alice_view.association_type);
    ensure!(alice_view.party == bob, "outgoing party is {}", alice_view.party);
    let revoke_height = alice_view
        .revoke_height
        .context("revoked association has no revoke height")?;
    ensure!(
        revoke_height >= alice_view.issue_height,
        "revoked at {} before issue at {}",
        revoke_height,
        alice_view.issue_height
    );

    let incoming = ctx.node().association_status(&bob).await?.incoming;
    let bob_view = incoming
        .into_iter()
        .find(|a| a.revoke_transaction_id.as_deref() == Some(revoked.id.as_str()))
        .context("revoked association missing from bob's incoming list")?;
    ensure!(bob_view.association_type == 1, "unexpected type {}", bob_view.association_type);
    ensure!(bob_view.party == alice, "incoming party is {}", bob_view.party);
    Ok(())
}

// Alice leases to the validator, cancels and leases again
async fn test_lease(ctx: &mut ScenarioContext) -> Result<()> {
    let lease_id = lease_and_verify(ctx).await?;

    ctx.submit(
        TransactionPayload::CancelLease(CancelLeasePayload {
            lease_id: lease_id.clone(),
        }),
        ALICE,
        None,
    )
    .await?;

    for party in [ALICE, VALIDATOR] {
        let address = ctx.address_of(party);
        let leases = ctx.node().active_leases(&address).await?;
        ensure!(
            leases.iter().all(|lease| lease.id != lease_id),
            "lease {} still active for {}",
            lease_id,
            party
        );
    }

    lease_and_verify(ctx).await?;
    Ok(())
}

async fn lease_and_verify(ctx: &mut ScenarioContext) -> Result<String> {
    let alice = ctx.address_of(ALICE);
    let validator = ctx.address_of(VALIDATOR);
    let before = ctx.balance_details(ALICE).await?;

    let lease = ctx.lease(ALICE, VALIDATOR, Some(LEASE_AMOUNT), None).await?;

    let alice_lease = ctx
        .node()
        .active_leases(&alice)
        .await?
        .into_iter()
        .find(|l| l.id == lease.id)
        .context("lease missing from alice's active leases")?;
    ensure!(alice_lease.amount == LEASE_AMOUNT, "leased {}", alice_lease.amount);
    ensure!(alice_lease.recipient == validator, "leased to {}", alice_lease.recipient);

    let after = ctx.balance_details(ALICE).await?;
    ensure!(
        after.regular == before.regular - LEASE_FEE,
        "regular balance went from {} to {}",
        before.regular,
        after.regular
    );
    ensure!(
        after.available == before.available - LEASE_FEE - LEASE_AMOUNT,
        "available balance went from {} to {}",
        before.available,
        after.available
    );

    let validator_lease = ctx
        .node()
        .active_leases(&validator)
        .await?
        .into_iter()
        .find(|l| l.id == lease.id)
        .context("lease missing from the validator's active leases")?;
    ensure!(validator_lease.amount == LEASE_AMOUNT, "leased {}", validator_lease.amount);
    ensure!(validator_lease.sender == alice, "lease sent by {}", validator_lease.sender);

    Ok(lease.id)
}

// The validator pays alice, bob and charlie in one transaction
async fn test_mass_transfer(ctx: &mut ScenarioContext) -> Result<()> {
    let recipients = [ALICE, BOB, CHARLIE];
    let validator_before = ctx.balance(VALIDATOR).await?;
    let mut before = Vec::with_capacity(recipients.len());
    for recipient in recipients {
        before.push(ctx.balance(recipient).await?);
    }

    let transfers: Vec<(Party<'_>, u64)> = recipients
        .iter()
        .map(|recipient| (*recipient, MASS_TRANSFER_AMOUNT))
        .collect();
    ctx.mass_transfer(VALIDATOR, &transfers, None).await?;

    let debit =
        mass_transfer_fee(recipients.len()) + MASS_TRANSFER_AMOUNT * recipients.len() as u64;
    let validator_after = ctx.balance(VALIDATOR).await?;
    ensure!(
        validator_after == validator_before - debit,
        "validator went from {} to {}, expected a debit of {}",
        validator_before,
        validator_after,
        debit
    );

    for (recipient, balance_before) in recipients.into_iter().zip(before) {
        let balance_after = ctx.balance(recipient).await?;
        ensure!(
            balance_after == balance_before + MASS_TRANSFER_AMOUNT,
            "{} went from {} to {}",
            recipient,
            balance_before,
            balance_after
        );
    }
    Ok(())
}

// Charlie sponsors alice, pays her fee, then stops
async fn test_sponsorship(ctx: &mut ScenarioContext) -> Result<()> {
    let charlie_before = ctx.balance(CHARLIE).await?;
    ctx.sponsor(ALICE, CHARLIE, None).await?;
    ensure!(
        ctx.balance(CHARLIE).await? == charlie_before - SPONSORSHIP_FEE,
        "charlie did not pay the sponsorship fee"
    );

    let (alice, bob, charlie) = (
        ctx.balance(ALICE).await?,
        ctx.balance(BOB).await?,
        ctx.balance(CHARLIE).await?,
    );
    ctx.transfer(ALICE, BOB, SPONSORED_TRANSFER_AMOUNT, None).await?;
    ensure!(
        ctx.balance(ALICE).await? == alice - SPONSORED_TRANSFER_AMOUNT,
        "sponsored alice paid a fee"
    );
    ensure!(
        ctx.balance(BOB).await? == bob + SPONSORED_TRANSFER_AMOUNT,
        "bob did not receive the transfer"
    );
    ensure!(
        ctx.balance(CHARLIE).await? == charlie - TRANSFER_FEE,
        "charlie did not pay alice's fee"
    );

    let charlie_before = ctx.balance(CHARLIE).await?;
    ctx.cancel_sponsorship(ALICE, CHARLIE, None).await?;
    ensure!(
        ctx.balance(CHARLIE).await? == charlie_before - CANCEL_SPONSORSHIP_FEE,
        "charlie did not pay the cancel fee"
    );

    let (alice, bob, charlie) = (
        ctx.balance(ALICE).await?,
        ctx.balance(BOB).await?,
        ctx.balance(CHARLIE).await?,
    );
    ctx.transfer(ALICE, BOB, SPONSORED_TRANSFER_AMOUNT, None).await?;
    ensure!(
        ctx.balance(ALICE).await? == alice - SPONSORED_TRANSFER_AMOUNT - TRANSFER_FEE,
        "alice did not pay her own fee"
    );
    ensure!(
        ctx.balance(BOB).await? == bob + SPONSORED_TRANSFER_AMOUNT,
        "bob did not receive the transfer"
    );
    ensure!(
        ctx.balance(CHARLIE).await? == charlie,
        "charlie still pays for alice"
    );
    Ok(())
}

// The anchored value reads back unchanged from the confirmed record
async fn test_anchor(ctx: &mut ScenarioContext) -> Result<()> {
    let hashed = sha256_hex(ANCHOR_DATA);
    let submitted = ctx.anchor(ALICE, &hashed, None).await?;
    let record = ctx.await_confirmation(&submitted.id).await?;

    let anchors = record
        .get("anchors")
        .and_then(|anchors| anchors.as_array())
        .context("record has no anchors")?;
    ensure!(anchors.len() == 1, "expected one anchor, got {}", anchors.len());

    let encoded = anchors[0].as_str().context("anchor is not a string")?;
    let decoded = String::from_utf8(decode_base58(encoded)?).context("anchor is not UTF-8")?;
    ensure!(decoded == hashed, "anchor reads back as {}", decoded);
    Ok(())
}

// Every kind used by the suite accepts version 3
async fn test_v3(ctx: &mut ScenarioContext) -> Result<()> {
    const V3: Option<u8> = Some(3);

    ctx.anchor(ALICE, &sha256_hex(ANCHOR_DATA), V3).await?;
    ctx.transfer(ALICE, BOB, 1, V3).await?;

    let lease = ctx.lease(ALICE, BOB, Some(1), V3).await?;
    ctx.submit(
        TransactionPayload::CancelLease(CancelLeasePayload { lease_id: lease.id }),
        ALICE,
        V3,
    )
    .await?;

    ctx.sponsor(BOB, ALICE, V3).await?;
    ctx.cancel_sponsorship(BOB, ALICE, V3).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_suite_test_names() {
        assert_eq!(SuiteTest::MassTransfer.to_string(), "mass_transfer");
        assert_eq!(SuiteTest::from_str("v3").unwrap(), SuiteTest::V3);
        assert!(SuiteTest::from_str("atomic_swap").is_err());
        assert_eq!(SuiteTest::all().len(), 7);
        assert_eq!(SuiteTest::all()[0], SuiteTest::Connectivity);
    }
}
