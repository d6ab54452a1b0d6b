use std::collections::{BTreeMap, HashMap};
use std::net::IpAddr;

use anyhow::{Context, Result};
use regex::Regex;
use tracing::debug;

use crate::models::directive::{DirectiveKey, DirectiveSet};

const PATTERN_PERCENT: &str = r"^(100|[0-9]{1,2})$";
const PATTERN_NUM_RANGE: &str = r"^[0-9]+(-[0-9]+)?$";
const PATTERN_STATUS: &str = r"^(200|400|403|404|500|502|503|504)$";
const PATTERN_HOSTNAME: &str = r"^[a-zA-Z0-9.-]+$";
const PATTERN_AZ: &str = r"^[a-z]{2}-[a-z]+-[1-9][a-d]$";

/// Query parameters grouped by key, values in submission order.
pub type QueryParams = BTreeMap<String, Vec<String>>;

/// Acceptance rule for one directive key.
#[derive(Debug, Clone)]
pub enum Rule {
    Pattern(Regex),
    /// IPv4 or IPv6 literal.
    IpLiteral,
}

impl Rule {
    pub fn accepts(&self, value: &str) -> bool {
        match self {
            Rule::Pattern(re) => re.is_match(value),
            Rule::IpLiteral => value.parse::<IpAddr>().is_ok(),
        }
    }
}

/// Per-key rules, built once at startup and shared read-only.
#[derive(Debug, Clone)]
pub struct ValidatorTable {
    rules: HashMap<DirectiveKey, Rule>,
}

impl ValidatorTable {
    pub fn new() -> Result<Self> {
        let mut rules = HashMap::with_capacity(DirectiveKey::ALL.len());
        for key in DirectiveKey::ALL {
            rules.insert(key, rule_for(key)?);
        }
        Ok(Self { rules })
    }

    pub fn rule(&self, key: DirectiveKey) -> Option<&Rule> {
        self.rules.get(&key)
    }
}

fn rule_for(key: DirectiveKey) -> Result<Rule> {
    let pattern = match key {
        DirectiveKey::Cpu | DirectiveKey::Memory => PATTERN_PERCENT,
        DirectiveKey::Sleep | DirectiveKey::Size => PATTERN_NUM_RANGE,
        DirectiveKey::Status => PATTERN_STATUS,
        DirectiveKey::IfHost => PATTERN_HOSTNAME,
        DirectiveKey::IfAz => PATTERN_AZ,
        DirectiveKey::IfClientIp
        | DirectiveKey::IfProxy1Ip
        | DirectiveKey::IfProxy2Ip
        | DirectiveKey::IfTargetIp
        | DirectiveKey::IfHostIp => return Ok(Rule::IpLiteral),
    };
    let re = Regex::new(pattern).with_context(|| format!("Invalid pattern for directive {}", key))?;
    Ok(Rule::Pattern(re))
}

/// Maps raw query parameters onto a [`DirectiveSet`].
///
/// Unknown keys and values that fail their rule are dropped; neither is an
/// error.
#[derive(Debug, Clone)]
pub struct DirectiveValidator {
    table: ValidatorTable,
}

impl DirectiveValidator {
    pub fn new(table: ValidatorTable) -> Self {
        Self { table }
    }

    pub fn validate<'a, I>(&self, params: I) -> DirectiveSet
    where
        I: IntoIterator<Item = (&'a String, &'a Vec<String>)>,
    {
        let mut set = DirectiveSet::new();
        for (raw_key, values) in params {
            let Some(key) = DirectiveKey::from_key(raw_key) else {
                continue;
            };
            let Some(rule) = self.table.rule(key) else {
                continue;
            };
            let value = values.join(", ");
            if rule.accepts(&value) {
                debug!(key = %key, value = %value, "Directive accepted");
                set.set(key, value);
            } else {
                debug!(key = %key, value = %value, "Directive rejected");
            }
        }
        set
    }
}

/// Decode a raw query string into grouped parameters.
///
/// Undecodable input yields no parameters.
pub fn parse_query(raw: &str) -> QueryParams {
    let pairs: Vec<(String, String)> = serde_urlencoded::from_str(raw).unwrap_or_else(|e| {
        debug!(error = %e, "Undecodable query string");
        Vec::new()
    });
    group_pairs(pairs)
}

pub fn group_pairs(pairs: Vec<(String, String)>) -> QueryParams {
    let mut params = QueryParams::new();
    for (key, value) in pairs {
        params.entry(key).or_default().push(value);
    }
    params
}

/// Canonical re-encoding of grouped parameters: keys sorted, each key's
/// values in submission order.
pub fn encode_query(params: &QueryParams) -> String {
    let pairs: Vec<(&str, &str)> = params
        .iter()
        .flat_map(|(k, vs)| vs.iter().map(move |v| (k.as_str(), v.as_str())))
        .collect();
    serde_urlencoded::to_string(pairs).unwrap_or_default()
}
