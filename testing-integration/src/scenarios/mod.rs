//! Behavior driven scenarios
//!
//! Feature files are parsed into steps, each step phrase is matched to a
//! harness operation and the runner records a report per scenario.
//!
//! ## Example Feature
//!
//! ```text
//! Feature: Sponsorship
//!
//!   Background:
//!     Given alice has 10 lto
//!
//!   Scenario: Successful sponsorship
//!     Given alice is not sponsoring bob
//!     When alice sponsors (v3) bob
//!     Then alice is sponsoring bob
//!     And alice has 5 lto
//!
//!   Scenario: Unfunded sponsorship
//!     When carol tries to sponsor bob
//!     Then the transaction fails
//! ```

pub mod artifacts;
pub mod executor;
pub mod parser;
pub mod steps;

pub use artifacts::FailureArtifact;
pub use executor::{
    Attempt, FeatureReport, Precondition, ScenarioReport, ScenarioRunner, ScenarioStatus,
    StepFailure,
};
pub use parser::{load_feature, parse_feature, Feature, Keyword, Scenario, StepLine};
pub use steps::{Action, BalanceKind, Step, StepMatcher};
