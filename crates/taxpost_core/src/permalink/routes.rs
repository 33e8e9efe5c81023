//! Host route rules for hierarchical item URLs.
//!
//! # Responsibility
//! - Derive one `(pattern, query)` rule per registered item type.
//! - Match inbound request paths against a rule list and bind query vars.
//! - Collapse `/`-joined hierarchy query values to their last segment.
//!
//! # Invariants
//! - Generated rules precede pre-existing rules, so they win over generic
//!   catch-alls.
//! - Patterns are matched anchored at the start of the path, with leading and
//!   trailing `/` removed first.

use crate::model::term::HierarchyConfig;
use crate::registry::Registration;
use log::debug;
use regex::Regex;
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Query variable naming the matched item type.
pub const ITEM_TYPE_QUERY_VAR: &str = "item_type";

/// One `(pattern, query template)` pair handed to the host router.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteRule {
    /// Regex matched against the request path, e.g. `shop/(.+?)/product/([^/]+)?$`.
    pub pattern: String,
    /// `&`-joined `key=value` pairs; `$matches[N]` refers to capture `N`.
    pub query: String,
}

impl RouteRule {
    pub fn new(pattern: impl Into<String>, query: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
            query: query.into(),
        }
    }
}

/// Builds rules for every `(registration, hierarchy)` pair and prepends them
/// to `existing`.
pub fn build_routes<'a>(
    sources: impl IntoIterator<Item = (&'a Registration, &'a HierarchyConfig)>,
    existing: Vec<RouteRule>,
) -> Vec<RouteRule> {
    let mut rules: Vec<RouteRule> = sources
        .into_iter()
        .map(|(registration, hierarchy)| {
            let item_type = registration.item_type.as_str();
            RouteRule::new(
                format!(
                    "{}/(.+?)/{}/([^/]+)?$",
                    hierarchy.trimmed_base_slug(),
                    registration.url_separator()
                ),
                format!(
                    "{ITEM_TYPE_QUERY_VAR}={item_type}&{}=$matches[1]&{item_type}=$matches[2]",
                    hierarchy.query_var
                ),
            )
        })
        .collect();
    rules.extend(existing);
    rules
}

/// Route compilation errors.
#[derive(Debug)]
pub enum RouteError {
    InvalidPattern {
        pattern: String,
        source: regex::Error,
    },
}

impl Display for RouteError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidPattern { pattern, source } => {
                write!(f, "route pattern `{pattern}` is invalid: {source}")
            }
        }
    }
}

impl Error for RouteError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::InvalidPattern { source, .. } => Some(source),
        }
    }
}

/// Result of matching one path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteMatch {
    /// Index of the matched rule in table order.
    pub rule_index: usize,
    /// Query variables bound by the rule's template.
    pub query_vars: BTreeMap<String, String>,
}

struct CompiledRule {
    rule: RouteRule,
    regex: Regex,
}

/// Ordered, compiled rule list.
pub struct RouteTable {
    rules: Vec<CompiledRule>,
}

impl RouteTable {
    /// Compiles rules in order.
    pub fn compile(rules: Vec<RouteRule>) -> Result<Self, RouteError> {
        let rules = rules
            .into_iter()
            .map(|rule| -> Result<CompiledRule, RouteError> {
                let regex = Regex::new(&format!("^(?:{})", rule.pattern)).map_err(|source| {
                    RouteError::InvalidPattern {
                        pattern: rule.pattern.clone(),
                        source,
                    }
                })?;
                Ok(CompiledRule { rule, regex })
            })
            .collect::<Result<Vec<_>, RouteError>>()?;
        Ok(Self { rules })
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn rules(&self) -> impl Iterator<Item = &RouteRule> {
        self.rules.iter().map(|compiled| &compiled.rule)
    }

    /// Matches a request path (no host, no query string) against the table.
    pub fn match_path(&self, path: &str) -> Option<RouteMatch> {
        let path = path.trim_matches('/');
        for (rule_index, compiled) in self.rules.iter().enumerate() {
            let Some(captures) = compiled.regex.captures(path) else {
                continue;
            };
            let mut query_vars = BTreeMap::new();
            for pair in compiled.rule.query.split('&') {
                let Some((key, template)) = pair.split_once('=') else {
                    continue;
                };
                let value = bind_matches(template, &captures);
                if !key.is_empty() {
                    query_vars.insert(key.to_string(), value);
                }
            }
            debug!(
                "event=route_match module=routes status=ok rule_index={} pattern={}",
                rule_index, compiled.rule.pattern
            );
            return Some(RouteMatch {
                rule_index,
                query_vars,
            });
        }
        None
    }
}

fn bind_matches(template: &str, captures: &regex::Captures<'_>) -> String {
    let mut bound = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(start) = rest.find("$matches[") {
        bound.push_str(&rest[..start]);
        let after = &rest[start + "$matches[".len()..];
        match after.split_once(']') {
            Some((index, tail)) => {
                if let Ok(index) = index.parse::<usize>() {
                    if let Some(value) = captures.get(index) {
                        bound.push_str(value.as_str());
                    }
                }
                rest = tail;
            }
            None => {
                bound.push_str(&rest[start..]);
                rest = "";
            }
        }
    }
    bound.push_str(rest);
    bound
}

/// Keeps only the last segment of `/`-joined hierarchy values and marks the
/// owning item type, for hosts that query terms by leaf slug.
pub fn split_hierarchy_query<'a>(
    query_vars: &mut BTreeMap<String, String>,
    sources: impl IntoIterator<Item = (&'a Registration, &'a HierarchyConfig)>,
) {
    for (registration, hierarchy) in sources {
        let Some(value) = query_vars.get(hierarchy.query_var.as_str()) else {
            continue;
        };
        let parts: Vec<&str> = value.split('/').collect();
        if parts.len() < 2 {
            continue;
        }
        let leaf = parts[parts.len() - 1].to_string();
        query_vars.insert(
            ITEM_TYPE_QUERY_VAR.to_string(),
            registration.item_type.clone(),
        );
        query_vars.insert(hierarchy.query_var.clone(), leaf);
    }
}
