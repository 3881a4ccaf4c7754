//! The fixed suite against a mock node that funds the suite identities at genesis

mod common;

use common::setup;
use lto_common::{
    config::{COIN_VALUE, TESTNET_CHAIN_ID},
    crypto::Account,
};
use lto_testing_integration::{
    run_suite,
    suite::{IDENTITIES, SuiteTest},
};

#[tokio::test]
async fn test_full_suite_passes() {
    let (node, mut ctx) = setup();
    for (_, seed) in IDENTITIES {
        node.fund(Account::from_seed(seed, TESTNET_CHAIN_ID).address(), 100 * COIN_VALUE);
    }

    let report = run_suite(&mut ctx, &SuiteTest::all()).await;
    for outcome in &report.outcomes {
        assert!(outcome.passed(), "{} failed: {:?}", outcome.test, outcome.error);
    }
    assert_eq!(report.outcomes.len(), 7);
    assert!(report.success());
    assert!(ctx.registry().is_empty());
}

#[tokio::test]
async fn test_unfunded_identities_fail_with_diagnostics() {
    let (_node, mut ctx) = setup();

    let report = run_suite(&mut ctx, &[SuiteTest::Connectivity, SuiteTest::Sponsorship]).await;
    assert!(report.outcomes[0].passed());

    let sponsorship = &report.outcomes[1];
    assert!(!sponsorship.passed());
    let diagnostics = sponsorship.diagnostics.as_ref().unwrap();
    assert_eq!(diagnostics.accounts.len(), 4);
    assert_eq!(report.failed(), 1);
}
