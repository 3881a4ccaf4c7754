//! The feature files shipped with the runner, played against the mock node

mod common;

use std::path::PathBuf;

use common::setup;
use lto_testing_integration::{scenarios::load_feature, ScenarioRunner};

fn features_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../e2e/features")
}

#[tokio::test]
async fn test_shipped_features_pass() {
    let mut files: Vec<PathBuf> = std::fs::read_dir(features_dir())
        .unwrap()
        .map(|entry| entry.unwrap().path())
        .filter(|path| path.extension().is_some_and(|ext| ext == "feature"))
        .collect();
    files.sort();
    assert_eq!(files.len(), 7);

    let (_node, context) = setup();
    let mut runner = ScenarioRunner::new(context).unwrap();
    for file in files {
        let feature = load_feature(&file).await.unwrap();
        let report = runner.run_feature(&feature).await;
        for scenario in &report.scenarios {
            assert!(
                scenario.passed(),
                "{} / {} failed: {:?}\n{}",
                report.name,
                scenario.name,
                scenario.failure,
                scenario.log.join("\n")
            );
        }
    }
}
