//! Feature file parser.
//!
//! Supports the subset the harness needs: `Feature:`, `Background:`,
//! `Scenario:`, `Given`/`When`/`Then` with `And`/`But` continuations, `@tag`
//! lines, `#` comments and pipe delimited data tables attached to the step
//! above them. Free text between a header and its first step is description.

use std::{fmt, path::Path};

use crate::error::{HarnessError, HarnessResult};

/// Tag that makes the runner skip a scenario
pub const SKIP_TAG: &str = "skip";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Keyword {
    Given,
    When,
    Then,
}

impl fmt::Display for Keyword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Keyword::Given => "Given",
            Keyword::When => "When",
            Keyword::Then => "Then",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepLine {
    pub keyword: Keyword,
    pub text: String,
    /// Data table rows, header row included
    pub table: Vec<Vec<String>>,
    pub line: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scenario {
    pub name: String,
    pub tags: Vec<String>,
    pub steps: Vec<StepLine>,
    pub line: usize,
}

impl Scenario {
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }

    pub fn is_skipped(&self) -> bool {
        self.has_tag(SKIP_TAG)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Feature {
    pub name: String,
    pub tags: Vec<String>,
    pub background: Vec<StepLine>,
    pub scenarios: Vec<Scenario>,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Section {
    Header,
    Background,
    Scenario,
}

fn parse_error(line: usize, message: impl fmt::Display) -> HarnessError {
    HarnessError::Step(format!("line {}: {}", line, message))
}

fn split_keyword(line: &str) -> Option<(&str, &str)> {
    ["Given ", "When ", "Then ", "And ", "But "]
        .into_iter()
        .find_map(|keyword| {
            line.strip_prefix(keyword)
                .map(|rest| (keyword.trim_end(), rest.trim()))
        })
}

fn table_row(line: &str) -> Vec<String> {
    let inner = line.trim().trim_start_matches('|').trim_end_matches('|');
    inner.split('|').map(|cell| cell.trim().to_string()).collect()
}

pub fn parse_feature(source: &str) -> HarnessResult<Feature> {
    let mut feature: Option<Feature> = None;
    let mut section = Section::Header;
    let mut pending_tags: Vec<String> = Vec::new();
    let mut last_keyword: Option<Keyword> = None;

    for (index, raw) in source.lines().enumerate() {
        let line_no = index + 1;
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        if line.starts_with('@') {
            pending_tags.extend(
                line.split_whitespace()
                    .map(|tag| tag.trim_start_matches('@').to_string()),
            );
            continue;
        }

        if let Some(name) = line.strip_prefix("Feature:") {
            if feature.is_some() {
                return Err(parse_error(line_no, "only one feature per file"));
            }
            feature = Some(Feature {
                name: name.trim().to_string(),
                tags: std::mem::take(&mut pending_tags),
                ..Default::default()
            });
            continue;
        }

        let current = feature
            .as_mut()
            .ok_or_else(|| parse_error(line_no, "expected 'Feature:' first"))?;

        if line.starts_with("Background:") {
            if !current.scenarios.is_empty() || !current.background.is_empty() {
                return Err(parse_error(line_no, "background must come before scenarios"));
            }
            section = Section::Background;
            last_keyword = None;
        } else if let Some(name) = line.strip_prefix("Scenario:") {
            current.scenarios.push(Scenario {
                name: name.trim().to_string(),
                tags: current
                    .tags
                    .iter()
                    .cloned()
                    .chain(std::mem::take(&mut pending_tags))
                    .collect(),
                steps: Vec::new(),
                line: line_no,
            });
            section = Section::Scenario;
            last_keyword = None;
        } else if line.starts_with("Scenario Outline:") || line.starts_with("Examples:") {
            return Err(parse_error(line_no, "scenario outlines are not supported"));
        } else {
            let steps = match section {
                Section::Header => continue,
                Section::Background => &mut current.background,
                Section::Scenario => match current.scenarios.last_mut() {
                    Some(scenario) => &mut scenario.steps,
                    None => continue,
                },
            };

            if line.starts_with('|') {
                let step = steps
                    .last_mut()
                    .ok_or_else(|| parse_error(line_no, "table without a step"))?;
                step.table.push(table_row(line));
            } else if let Some((word, text)) = split_keyword(line) {
                let keyword = match word {
                    "Given" => Keyword::Given,
                    "When" => Keyword::When,
                    "Then" => Keyword::Then,
                    _ => last_keyword.ok_or_else(|| {
                        parse_error(line_no, format!("'{}' without a preceding step", word))
                    })?,
                };
                last_keyword = Some(keyword);
                steps.push(StepLine {
                    keyword,
                    text: text.to_string(),
                    table: Vec::new(),
                    line: line_no,
                });
            } else if !steps.is_empty() {
                return Err(parse_error(line_no, format!("unexpected line '{}'", line)));
            }
        }
    }

    feature.ok_or_else(|| HarnessError::Step("no 'Feature:' found".into()))
}

/// Read and parse a `.feature` file
pub async fn load_feature(path: impl AsRef<Path>) -> HarnessResult<Feature> {
    let path = path.as_ref();
    let source = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| HarnessError::Config(format!("cannot read {}: {}", path.display(), e)))?;
    parse_feature(&source)
        .map_err(|e| HarnessError::Step(format!("{}: {}", path.display(), e)))
}
