//! Step phrases.
//!
//! A phrase is matched against the patterns of its keyword. `(vN)` may appear
//! anywhere outside quotes in an action phrase to pick the transaction
//! version, amounts are written as `<decimal> lto`.

use lto_common::{crypto::KeyType, utils::parse_lto_amount};
use regex_lite::{Captures, Regex};

use super::parser::{Keyword, StepLine};
use crate::error::{HarnessError, HarnessResult};

const AMOUNT: &str = r"\d+(?:\.\d+)?";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BalanceKind {
    /// Answer of the plain balance endpoint
    Total,
    Regular,
    Available,
    Effective,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Transfer {
        sender: String,
        recipient: String,
        amount: u64,
    },
    Lease {
        sender: String,
        recipient: String,
        amount: Option<u64>,
    },
    CancelLease {
        sender: String,
        recipient: String,
    },
    Sponsor {
        sponsoring: String,
        sponsored: String,
    },
    CancelSponsorship {
        sponsoring: String,
        sponsored: String,
    },
    MassTransfer {
        sender: String,
        transfers: Vec<(String, u64)>,
    },
    Associate {
        sender: String,
        recipient: String,
        association_type: u64,
        anchor: Option<String>,
    },
    RevokeAssociation {
        sender: String,
        recipient: String,
        association_type: u64,
        anchor: Option<String>,
    },
    Anchor {
        sender: String,
        hash: String,
    },
    Register {
        sender: String,
        key_type: KeyType,
        public_key: Option<String>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    EnsureBalance {
        user: String,
        amount: u64,
    },
    EnsureSponsoring {
        sponsor: String,
        sponsored: String,
        wanted: bool,
    },
    EnsureLeasing {
        sender: String,
        recipient: String,
        amount: Option<u64>,
        wanted: bool,
    },
    EnsureAssociation {
        sender: String,
        recipient: String,
        association_type: u64,
        anchor: Option<String>,
        wanted: bool,
    },
    /// `attempt` steps swallow the failure of the action
    Perform {
        action: Action,
        version: Option<u8>,
        attempt: bool,
    },
    ExpectBalance {
        user: String,
        kind: BalanceKind,
        amount: u64,
    },
    ExpectSponsoring {
        sponsor: String,
        sponsored: String,
        expected: bool,
    },
    ExpectLeasing {
        sender: String,
        recipient: String,
        amount: Option<u64>,
        expected: bool,
    },
    ExpectAssociated {
        sender: String,
        recipient: String,
        expected: bool,
    },
    ExpectAssociation {
        sender: String,
        recipient: String,
        association_type: u64,
        anchor: Option<String>,
    },
    ExpectOutcome {
        success: bool,
    },
}

type Builder = fn(&Captures<'_>, &[Vec<String>]) -> HarnessResult<Step>;

struct Pattern {
    keyword: Keyword,
    regex: Regex,
    build: Builder,
}

fn text(caps: &Captures<'_>, name: &str) -> HarnessResult<String> {
    caps.name(name)
        .map(|m| m.as_str().to_string())
        .ok_or_else(|| HarnessError::Step(format!("missing '{}'", name)))
}

fn optional(caps: &Captures<'_>, name: &str) -> Option<String> {
    caps.name(name).map(|m| m.as_str().to_string())
}

fn flag(caps: &Captures<'_>, name: &str) -> bool {
    caps.name(name).is_some()
}

fn amount(caps: &Captures<'_>, name: &str) -> HarnessResult<Option<u64>> {
    caps.name(name)
        .map(|m| parse_lto_amount(m.as_str()))
        .transpose()
        .map_err(HarnessError::from)
}

fn required_amount(caps: &Captures<'_>, name: &str) -> HarnessResult<u64> {
    amount(caps, name)?.ok_or_else(|| HarnessError::Step(format!("missing '{}'", name)))
}

fn number(caps: &Captures<'_>, name: &str) -> HarnessResult<u64> {
    let value = text(caps, name)?;
    value
        .parse()
        .map_err(|_| HarnessError::Step(format!("'{}' is not a number", value)))
}

fn perform(caps: &Captures<'_>, action: Action) -> HarnessResult<Step> {
    Ok(Step::Perform {
        action,
        version: None,
        attempt: flag(caps, "attempt"),
    })
}

// `| recipient | amount |` rows, the header row is optional
fn transfer_rows(table: &[Vec<String>]) -> HarnessResult<Vec<(String, u64)>> {
    let rows = match table.first() {
        Some(header) if header.first().is_some_and(|c| c.eq_ignore_ascii_case("recipient")) => {
            &table[1..]
        }
        _ => table,
    };

    if rows.is_empty() {
        return Err(HarnessError::Step(
            "mass transfer needs a '| recipient | amount |' table".into(),
        ));
    }

    rows.iter()
        .map(|row| match row.as_slice() {
            [recipient, amount] => Ok((recipient.clone(), parse_lto_amount(amount)?)),
            _ => Err(HarnessError::Step(format!(
                "expected two cells per row, got {:?}",
                row
            ))),
        })
        .collect()
}

/// Compiled step patterns
pub struct StepMatcher {
    version: Regex,
    patterns: Vec<Pattern>,
}

impl StepMatcher {
    pub fn new() -> HarnessResult<Self> {
        let mut matcher = Self {
            version: compile(r"\s*\(v(?P<version>\d+)\)")?,
            patterns: Vec::new(),
        };

        // preconditions
        matcher.add(
            Keyword::Given,
            &format!(r"^(?P<user>\w+) has (?P<amount>{AMOUNT}) lto$"),
            |c, _| {
                Ok(Step::EnsureBalance {
                    user: text(c, "user")?,
                    amount: required_amount(c, "amount")?,
                })
            },
        )?;
        matcher.add(
            Keyword::Given,
            r"^(?P<sponsor>\w+) is (?P<not>not )?sponsoring (?P<sponsored>\w+)$",
            |c, _| {
                Ok(Step::EnsureSponsoring {
                    sponsor: text(c, "sponsor")?,
                    sponsored: text(c, "sponsored")?,
                    wanted: !flag(c, "not"),
                })
            },
        )?;
        matcher.add(
            Keyword::Given,
            &format!(r"^(?P<sender>\w+) is (?P<not>not )?leasing (?:(?P<amount>{AMOUNT}) lto )?to (?P<recipient>\w+)$"),
            |c, _| {
                Ok(Step::EnsureLeasing {
                    sender: text(c, "sender")?,
                    recipient: text(c, "recipient")?,
                    amount: amount(c, "amount")?,
                    wanted: !flag(c, "not"),
                })
            },
        )?;
        matcher.add(
            Keyword::Given,
            r"^(?P<sender>\w+) has an association with (?P<recipient>\w+) of type (?P<type>\d+)(?: and anchor (?P<anchor>\S+))?$",
            |c, _| {
                Ok(Step::EnsureAssociation {
                    sender: text(c, "sender")?,
                    recipient: text(c, "recipient")?,
                    association_type: number(c, "type")?,
                    anchor: optional(c, "anchor"),
                    wanted: true,
                })
            },
        )?;
        matcher.add(
            Keyword::Given,
            r"^(?P<sender>\w+) does not have an association with (?P<recipient>\w+) of type (?P<type>\d+)$",
            |c, _| {
                Ok(Step::EnsureAssociation {
                    sender: text(c, "sender")?,
                    recipient: text(c, "recipient")?,
                    association_type: number(c, "type")?,
                    anchor: None,
                    wanted: false,
                })
            },
        )?;

        // actions
        matcher.add(
            Keyword::When,
            &format!(r"^(?P<sender>\w+) (?:(?P<attempt>tries to) transfer|transfers) (?P<amount>{AMOUNT}) lto to (?P<recipient>\w+)$"),
            |c, _| {
                perform(c, Action::Transfer {
                    sender: text(c, "sender")?,
                    recipient: text(c, "recipient")?,
                    amount: required_amount(c, "amount")?,
                })
            },
        )?;
        matcher.add(
            Keyword::When,
            &format!(r"^(?P<sender>\w+) (?:(?P<attempt>tries to) lease|leases) (?:(?P<amount>{AMOUNT}) lto )?to (?P<recipient>\w+)$"),
            |c, _| {
                perform(c, Action::Lease {
                    sender: text(c, "sender")?,
                    recipient: text(c, "recipient")?,
                    amount: amount(c, "amount")?,
                })
            },
        )?;
        matcher.add(
            Keyword::When,
            r"^(?P<sender>\w+) (?:(?P<attempt>tries to) cancel|cancels) the lease to (?P<recipient>\w+)$",
            |c, _| {
                perform(c, Action::CancelLease {
                    sender: text(c, "sender")?,
                    recipient: text(c, "recipient")?,
                })
            },
        )?;
        matcher.add(
            Keyword::When,
            r"^(?P<sponsoring>\w+) (?:(?P<attempt>tries to) sponsor|sponsors) (?P<sponsored>\w+)$",
            |c, _| {
                perform(c, Action::Sponsor {
                    sponsoring: text(c, "sponsoring")?,
                    sponsored: text(c, "sponsored")?,
                })
            },
        )?;
        matcher.add(
            Keyword::When,
            r"^(?P<sponsoring>\w+) (?:(?P<attempt>tries to) cancel|cancels) the sponsorship for (?P<sponsored>\w+)$",
            |c, _| {
                perform(c, Action::CancelSponsorship {
                    sponsoring: text(c, "sponsoring")?,
                    sponsored: text(c, "sponsored")?,
                })
            },
        )?;
        matcher.add(
            Keyword::When,
            r"^(?P<sender>\w+) (?:(?P<attempt>tries to) do|does) a mass-transfer to:?$",
            |c, table| {
                perform(c, Action::MassTransfer {
                    sender: text(c, "sender")?,
                    transfers: transfer_rows(table)?,
                })
            },
        )?;
        matcher.add(
            Keyword::When,
            r"^(?P<sender>\w+) (?:(?P<attempt>tries to) issue|issues) an association with (?P<recipient>\w+) of type (?P<type>\d+)(?: and anchor (?P<anchor>\S+))?$",
            |c, _| {
                perform(c, Action::Associate {
                    sender: text(c, "sender")?,
                    recipient: text(c, "recipient")?,
                    association_type: number(c, "type")?,
                    anchor: optional(c, "anchor"),
                })
            },
        )?;
        matcher.add(
            Keyword::When,
            r"^(?P<sender>\w+) (?:(?P<attempt>tries to) revoke|revokes) (?:an|the) association with (?P<recipient>\w+) of type (?P<type>\d+)(?: and anchor (?P<anchor>\S+))?$",
            |c, _| {
                perform(c, Action::RevokeAssociation {
                    sender: text(c, "sender")?,
                    recipient: text(c, "recipient")?,
                    association_type: number(c, "type")?,
                    anchor: optional(c, "anchor"),
                })
            },
        )?;
        matcher.add(
            Keyword::When,
            r#"^(?P<sender>\w+) (?:(?P<attempt>tries to) anchor|anchors) "(?P<hash>[^"]*)"$"#,
            |c, _| {
                perform(c, Action::Anchor {
                    sender: text(c, "sender")?,
                    hash: text(c, "hash")?,
                })
            },
        )?;
        matcher.add(
            Keyword::When,
            r#"^(?P<sender>\w+) (?:(?P<attempt>tries to) register|registers) an account(?: with (?:(?P<key_type>\w+) )?public key "(?P<public_key>[^"]+)")?$"#,
            |c, _| {
                let key_type = match optional(c, "key_type") {
                    Some(key_type) => key_type.parse()?,
                    None => KeyType::Ed25519,
                };
                perform(c, Action::Register {
                    sender: text(c, "sender")?,
                    key_type,
                    public_key: optional(c, "public_key"),
                })
            },
        )?;

        // assertions
        matcher.add(
            Keyword::Then,
            &format!(r"^(?P<user>\w+) has (?P<amount>{AMOUNT}) lto$"),
            |c, _| {
                Ok(Step::ExpectBalance {
                    user: text(c, "user")?,
                    kind: BalanceKind::Total,
                    amount: required_amount(c, "amount")?,
                })
            },
        )?;
        matcher.add(
            Keyword::Then,
            &format!(r"^(?P<user>\w+) has an? (?P<kind>regular|available|effective) balance of (?P<amount>{AMOUNT}) lto$"),
            |c, _| {
                let kind = match text(c, "kind")?.as_str() {
                    "regular" => BalanceKind::Regular,
                    "available" => BalanceKind::Available,
                    _ => BalanceKind::Effective,
                };
                Ok(Step::ExpectBalance {
                    user: text(c, "user")?,
                    kind,
                    amount: required_amount(c, "amount")?,
                })
            },
        )?;
        matcher.add(
            Keyword::Then,
            r"^(?P<sponsor>\w+) is (?P<not>not )?sponsoring (?P<sponsored>\w+)$",
            |c, _| {
                Ok(Step::ExpectSponsoring {
                    sponsor: text(c, "sponsor")?,
                    sponsored: text(c, "sponsored")?,
                    expected: !flag(c, "not"),
                })
            },
        )?;
        matcher.add(
            Keyword::Then,
            &format!(r"^(?P<sender>\w+) is (?P<not>not )?leasing (?:(?P<amount>{AMOUNT}) lto )?to (?P<recipient>\w+)$"),
            |c, _| {
                Ok(Step::ExpectLeasing {
                    sender: text(c, "sender")?,
                    recipient: text(c, "recipient")?,
                    amount: amount(c, "amount")?,
                    expected: !flag(c, "not"),
                })
            },
        )?;
        matcher.add(
            Keyword::Then,
            r"^(?P<sender>\w+) is (?P<not>not )?associated with (?P<recipient>\w+)$",
            |c, _| {
                Ok(Step::ExpectAssociated {
                    sender: text(c, "sender")?,
                    recipient: text(c, "recipient")?,
                    expected: !flag(c, "not"),
                })
            },
        )?;
        matcher.add(
            Keyword::Then,
            r"^(?P<sender>\w+) has an association with (?P<recipient>\w+) of type (?P<type>\d+)(?: and anchor (?P<anchor>\S+))?$",
            |c, _| {
                Ok(Step::ExpectAssociation {
                    sender: text(c, "sender")?,
                    recipient: text(c, "recipient")?,
                    association_type: number(c, "type")?,
                    anchor: optional(c, "anchor"),
                })
            },
        )?;
        matcher.add(
            Keyword::Then,
            r"^the transaction (?P<outcome>is successful|succeeds|fails)$",
            |c, _| {
                Ok(Step::ExpectOutcome {
                    success: text(c, "outcome")? != "fails",
                })
            },
        )?;

        Ok(matcher)
    }

    fn add(&mut self, keyword: Keyword, pattern: &str, build: Builder) -> HarnessResult<()> {
        self.patterns.push(Pattern {
            keyword,
            regex: compile(pattern)?,
            build,
        });
        Ok(())
    }

    /// Turn a step line into a [`Step`]
    pub fn parse(&self, line: &StepLine) -> HarnessResult<Step> {
        let (phrase, version) = self.split_version(&line.text)?;
        let phrase = phrase.trim();

        let step = self
            .patterns
            .iter()
            .filter(|pattern| pattern.keyword == line.keyword)
            .find_map(|pattern| {
                pattern
                    .regex
                    .captures(phrase)
                    .map(|caps| (pattern.build)(&caps, &line.table))
            })
            .ok_or_else(|| {
                HarnessError::Step(format!(
                    "no {} step matches '{}'",
                    line.keyword, line.text
                ))
            })??;

        match (step, version) {
            (Step::Perform { action, attempt, .. }, version) => Ok(Step::Perform {
                action,
                version,
                attempt,
            }),
            (step, None) => Ok(step),
            (_, Some(_)) => Err(HarnessError::Step(format!(
                "a version only applies to actions: '{}'",
                line.text
            ))),
        }
    }
}

impl StepMatcher {
    // `(vN)` only counts outside double quoted text
    fn split_version(&self, line: &str) -> HarnessResult<(String, Option<u8>)> {
        let mut phrase = String::with_capacity(line.len());
        let mut version = None;
        for (i, part) in line.split('"').enumerate() {
            if i > 0 {
                phrase.push('"');
            }
            if i % 2 == 1 {
                phrase.push_str(part);
                continue;
            }

            if let Some(caps) = self.version.captures(part) {
                let value = text(&caps, "version")?;
                version = Some(value.parse::<u8>().map_err(|_| {
                    HarnessError::Step(format!("invalid version '{}'", value))
                })?);
            }
            phrase.push_str(&self.version.replace_all(part, ""));
        }
        Ok((phrase, version))
    }
}

fn compile(pattern: &str) -> HarnessResult<Regex> {
    Regex::new(pattern)
        .map_err(|e| HarnessError::Step(format!("invalid step pattern {}: {}", pattern, e)))
}
