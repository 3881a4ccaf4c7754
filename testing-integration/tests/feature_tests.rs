//! Feature files run end to end against the mock node

mod common;

use common::setup;
use lto_testing_integration::{
    scenarios::{parse_feature, FailureArtifact, ScenarioStatus},
    ScenarioRunner,
};

const SPONSORSHIP: &str = r#"
@sponsorship
Feature: Sponsorship
  An account can pay the fees of another one.

  Background:
    Given alice has 10 lto

  Scenario: Successful sponsorship
    Given alice is not sponsoring bob
    When alice sponsors (v3) bob
    Then alice is sponsoring bob
    And alice has 5 lto

  Scenario: Sponsored transfer
    Given bob has 3 lto
    And alice is sponsoring bob
    When bob transfers 2 lto to charlie
    Then bob has 1 lto
    And alice has 4 lto
    And charlie has 2 lto

  Scenario: Unfunded sponsorship
    When carol tries to sponsor bob
    Then the transaction fails
    And carol has 0 lto

  @skip
  Scenario: Not ready yet
    When alice transfers 1000 lto to bob
"#;

const LEDGER: &str = r#"
Feature: Ledger

  Scenario: Lease and cancel
    Given alice has 5 lto
    When alice leases 2 lto to bob
    Then alice has a regular balance of 4 lto
    And alice has an available balance of 2 lto
    And alice is leasing 2 lto to bob
    When alice cancels the lease to bob
    Then alice is not leasing to bob
    And alice has 3 lto

  Scenario: Association with anchor
    Given alice has 5 lto
    And alice does not have an association with bob of type 1
    When alice issues an association with bob of type 1 and anchor abc
    Then alice is associated with bob
    And alice has an association with bob of type 1 and anchor abc
    When alice revokes the association with bob of type 1 and anchor abc
    Then alice is not associated with bob

  Scenario: Mass transfer
    Given alice has 10 lto
    When alice does a mass-transfer to:
      | recipient | amount |
      | bob       | 2      |
      | charlie   | 3      |
    Then alice has 3.8 lto
    And bob has 2 lto
    And charlie has 3 lto

  Scenario: Anchor and register
    Given alice has 1 lto
    When alice anchors "e2etests"
    And alice registers an account
    Then the transaction is successful
    And alice has 0.3 lto
"#;

const BROKEN: &str = r#"
Feature: Broken

  Scenario: Wrong expectation
    Given alice has 5 lto
    When alice transfers 1 lto to bob
    Then bob has 2 lto
    And alice has 3 lto

  Scenario: Unknown phrase
    When alice dances with bob
"#;

#[tokio::test]
async fn test_sponsorship_feature() {
    let (_node, context) = setup();
    let mut runner = ScenarioRunner::new(context).unwrap();
    let feature = parse_feature(SPONSORSHIP).unwrap();

    let report = runner.run_feature(&feature).await;
    for scenario in &report.scenarios {
        assert!(
            scenario.status != ScenarioStatus::Failed,
            "{} failed: {:?}",
            scenario.name,
            scenario.failure
        );
    }
    assert_eq!(report.passed(), 3);
    assert_eq!(report.skipped(), 1);
    assert!(report.success());
    // background runs before every scenario
    assert_eq!(report.scenarios[0].steps_executed, 5);
}

#[tokio::test]
async fn test_ledger_feature() {
    let (_node, context) = setup();
    let mut runner = ScenarioRunner::new(context).unwrap();
    let feature = parse_feature(LEDGER).unwrap();

    let report = runner.run_feature(&feature).await;
    for scenario in &report.scenarios {
        assert!(
            scenario.passed(),
            "{} failed: {:?}\n{}",
            scenario.name,
            scenario.failure,
            scenario.log.join("\n")
        );
    }
    assert_eq!(report.passed(), 4);
}

#[tokio::test]
async fn test_failed_scenario_is_reported_and_saved() {
    let (_node, context) = setup();
    let artifacts = tempfile::tempdir().unwrap();
    let mut runner = ScenarioRunner::new(context)
        .unwrap()
        .with_artifacts_dir(artifacts.path());
    let feature = parse_feature(BROKEN).unwrap();

    let report = runner.run_feature(&feature).await;
    assert_eq!(report.failed(), 2);
    assert!(!report.success());

    let wrong = &report.scenarios[0];
    assert_eq!(wrong.status, ScenarioStatus::Failed);
    assert_eq!(wrong.steps_executed, 2);
    let failure = wrong.failure.as_ref().unwrap();
    assert_eq!(failure.step, "Then bob has 2 lto");
    assert_eq!(failure.line, 7);
    assert!(failure.error.contains("expected 2"), "{}", failure.error);

    let diagnostics = wrong.diagnostics.as_ref().unwrap();
    let labels: Vec<_> = diagnostics.accounts.iter().map(|a| a.label.as_str()).collect();
    assert!(labels.contains(&"alice") && labels.contains(&"bob"));
    // funding transfer and the transfer to bob
    assert_eq!(diagnostics.transactions.len(), 2);

    let unknown = &report.scenarios[1];
    assert_eq!(unknown.steps_executed, 0);
    assert!(unknown.failure.as_ref().unwrap().error.contains("dances"));

    // the context is clean for whatever runs next
    assert!(runner.context().registry().is_empty());
    assert!(runner.context().transactions().is_empty());

    let mut entries = tokio::fs::read_dir(artifacts.path()).await.unwrap();
    let mut saved = Vec::new();
    while let Some(entry) = entries.next_entry().await.unwrap() {
        saved.push(FailureArtifact::load(entry.path()).await.unwrap());
    }
    assert_eq!(saved.len(), 2);
    let wrong_artifact = saved
        .iter()
        .find(|artifact| artifact.metadata.scenario == "Wrong expectation")
        .unwrap();
    assert_eq!(wrong_artifact.diagnostics.transactions.len(), 2);
    assert!(!wrong_artifact.log.is_empty());
}
