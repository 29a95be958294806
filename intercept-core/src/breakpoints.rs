//! Breakpoint Condition Sets
//!
//! Rule-based implementation of [`ConditionSet`]. A set is built from
//! serializable [`BreakpointCondition`] definitions (as edited in the UI) and
//! compiled once, so matching on the hot path never re-parses a pattern.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use wildmatch::WildMatch;

use crate::error::InterceptError;
use crate::Result;
use intercept_common::{ConditionSet, RequestContext, ResponseContext};

/// Well-known name of the request breakpoint set
pub const REQUEST_BREAKPOINT_SET: &str = "breakpoints.request";
/// Well-known name of the response breakpoint set
pub const RESPONSE_BREAKPOINT_SET: &str = "breakpoints.response";

/// Breakpoint Condition - What to check
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BreakpointCondition {
    /// HTTP Method matches (e.g., "POST")
    Method { method: String },

    /// URL contains string (e.g., "/admin")
    UrlContains { pattern: String },

    /// URL matches regex
    UrlRegex { regex: String },

    /// Host matches a wildcard pattern (e.g., "*.example.com")
    HostMatches { pattern: String },

    /// Request header exists
    HasHeader { header: String },

    /// Request header value matches regex
    HeaderValueMatch { header: String, regex: String },

    /// Request body matches regex
    BodyRegex { regex: String },

    /// Request port matches
    Port { port: u16 },

    /// Response status code matches
    StatusCode { status: u16 },

    /// Response body matches regex
    ResponseBodyRegex { regex: String },
}

/// How the conditions of a set combine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchMode {
    #[default]
    All,
    Any,
}

/// Serializable definition of a breakpoint set
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BreakpointSetDefinition {
    pub name: String,
    #[serde(default)]
    pub mode: MatchMode,
    #[serde(default)]
    pub conditions: Vec<BreakpointCondition>,
}

enum CompiledCondition {
    Method(String),
    UrlContains(String),
    UrlRegex(Regex),
    HostMatches(WildMatch),
    HasHeader(String),
    HeaderValueMatch { header: String, regex: Regex },
    BodyRegex(Regex),
    Port(u16),
    StatusCode(u16),
    ResponseBodyRegex(Regex),
}

impl CompiledCondition {
    fn compile(condition: &BreakpointCondition) -> Result<Self> {
        Ok(match condition {
            BreakpointCondition::Method { method } => CompiledCondition::Method(method.clone()),
            BreakpointCondition::UrlContains { pattern } => {
                CompiledCondition::UrlContains(pattern.clone())
            }
            BreakpointCondition::UrlRegex { regex } => CompiledCondition::UrlRegex(compile(regex)?),
            BreakpointCondition::HostMatches { pattern } => {
                CompiledCondition::HostMatches(WildMatch::new(pattern))
            }
            BreakpointCondition::HasHeader { header } => CompiledCondition::HasHeader(header.clone()),
            BreakpointCondition::HeaderValueMatch { header, regex } => {
                CompiledCondition::HeaderValueMatch {
                    header: header.clone(),
                    regex: compile(regex)?,
                }
            }
            BreakpointCondition::BodyRegex { regex } => CompiledCondition::BodyRegex(compile(regex)?),
            BreakpointCondition::Port { port } => CompiledCondition::Port(*port),
            BreakpointCondition::StatusCode { status } => CompiledCondition::StatusCode(*status),
            BreakpointCondition::ResponseBodyRegex { regex } => {
                CompiledCondition::ResponseBodyRegex(compile(regex)?)
            }
        })
    }

    fn matches(&self, req: &RequestContext, resp: Option<&ResponseContext>) -> bool {
        match self {
            CompiledCondition::Method(m) => req.method.eq_ignore_ascii_case(m),
            CompiledCondition::UrlContains(s) => req.url.contains(s.as_str()),
            CompiledCondition::UrlRegex(re) => re.is_match(&req.url),
            CompiledCondition::HostMatches(pattern) => {
                req.host().map_or(false, |host| pattern.matches(&host))
            }
            CompiledCondition::HasHeader(key) => header_value(&req.headers, key).is_some(),
            CompiledCondition::HeaderValueMatch { header, regex } => {
                header_value(&req.headers, header).map_or(false, |value| regex.is_match(value))
            }
            CompiledCondition::BodyRegex(re) => re.is_match(&String::from_utf8_lossy(&req.body)),
            CompiledCondition::Port(p) => req.port == *p,
            // Response conditions never match during the request phase
            CompiledCondition::StatusCode(status) => resp.map_or(false, |r| r.status == *status),
            CompiledCondition::ResponseBodyRegex(re) => {
                resp.map_or(false, |r| re.is_match(&String::from_utf8_lossy(&r.body)))
            }
        }
    }
}

fn compile(pattern: &str) -> Result<Regex> {
    Regex::new(pattern)
        .map_err(|e| InterceptError::config("breakpoints", format!("invalid regex '{}': {}", pattern, e)))
}

// Header names are case-insensitive on the wire
fn header_value<'a>(
    headers: &'a std::collections::HashMap<String, String>,
    key: &str,
) -> Option<&'a str> {
    headers
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case(key))
        .map(|(_, v)| v.as_str())
}

/// A compiled, named breakpoint set
pub struct BreakpointSet {
    definition: BreakpointSetDefinition,
    compiled: Vec<CompiledCondition>,
}

impl BreakpointSet {
    pub fn new(definition: BreakpointSetDefinition) -> Result<Self> {
        let compiled = definition
            .conditions
            .iter()
            .map(CompiledCondition::compile)
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { definition, compiled })
    }

    /// Parse a JSON rule definition
    pub fn from_json(json: &str) -> Result<Self> {
        Self::new(serde_json::from_str(json)?)
    }

    pub fn definition(&self) -> &BreakpointSetDefinition {
        &self.definition
    }
}

impl fmt::Debug for BreakpointSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BreakpointSet")
            .field("definition", &self.definition)
            .finish()
    }
}

impl ConditionSet for BreakpointSet {
    fn name(&self) -> &str {
        &self.definition.name
    }

    /// An empty set never matches.
    fn matches(&self, request: &RequestContext, response: Option<&ResponseContext>) -> bool {
        if self.compiled.is_empty() {
            return false;
        }
        match self.definition.mode {
            MatchMode::All => self.compiled.iter().all(|c| c.matches(request, response)),
            MatchMode::Any => self.compiled.iter().any(|c| c.matches(request, response)),
        }
    }
}
