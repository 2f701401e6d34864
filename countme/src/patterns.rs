//! Default extraction patterns for httpd "combined" access logs.
//!
//! Every pattern captures the same named fields (`host`, `identity`, `time`,
//! `method`, `path`, `query`, `protocol`, `status`, `nbytes`, `referrer`,
//! `user_agent`); the variants only narrow what each field may contain.

use crate::types::Result;
use regex::Regex;

/// The libdnf / rpm-ostree User-Agent, e.g.
/// `libdnf/0.48.0 (Fedora 32; workstation; Linux.x86_64)`.
///
/// The parenthesized OS description is optional; bare `libdnf` agents still
/// count, with empty OS fields.
pub const COUNTME_USER_AGENT_PATTERN: &str = concat!(
    r"(?P<product>libdnf|rpm-ostree)(?:/(?P<product_version>\S+))?",
    r"(?: \(",
    r"(?P<os_name>.*) ",
    r"(?P<os_version>[0-9a-z._-]*?); ",
    r"(?P<os_variant>[0-9a-z._-]*); ",
    r"(?P<os_canon>[\w./]+)\.",
    r"(?P<os_arch>\w+)",
    r"\))?",
);

/// Sub-patterns for the fields that vary between matchers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LogPattern<'a> {
    pub method: &'a str,
    pub path: &'a str,
    pub query: &'a str,
    pub status: &'a str,
    pub user_agent: &'a str,
    /// Lines without a `?query` part don't match.
    pub query_required: bool,
}

impl Default for LogPattern<'static> {
    fn default() -> Self {
        Self {
            method: r"[A-Z]+",
            path: r"[^ ?]+",
            query: r"\S*",
            status: r"\d+",
            user_agent: r".*?",
            query_required: false,
        }
    }
}

impl LogPattern<'_> {
    pub fn to_pattern(&self) -> String {
        format!(
            concat!(
                r"^(?P<host>\S+) (?P<identity>\S+) \S+ ",
                r"\[(?P<time>[^\]]+)\] ",
                r#""(?P<method>(?:{method})) (?P<path>(?:{path}))(?:\?(?P<query>(?:{query}))){query_repeat} "#,
                r#"(?P<protocol>HTTP/\d\.\d)" "#,
                r"(?P<status>(?:{status})) (?P<nbytes>\d+|-) ",
                r#""(?P<referrer>[^"]*)" "(?P<user_agent>(?:{user_agent}))"\s*$"#,
            ),
            method = self.method,
            path = self.path,
            query = self.query,
            status = self.status,
            user_agent = self.user_agent,
            query_repeat = if self.query_required { "" } else { "?" },
        )
    }

    pub fn compile(&self) -> Result<Regex> {
        Ok(Regex::new(&self.to_pattern())?)
    }
}

/// Any well-formed access.log line.
pub fn access_log_regex() -> Result<Regex> {
    LogPattern::default().compile()
}

/// mirrorlist/metalink requests, as counted by mirrormanager.
pub fn mirrors_log_regex() -> Result<Regex> {
    LogPattern {
        path: r"/metalink|/mirrorlist",
        ..LogPattern::default()
    }
    .compile()
}

/// Successful libdnf requests carrying a `countme=` query parameter.
pub fn countme_log_regex() -> Result<Regex> {
    LogPattern {
        method: "GET|HEAD",
        query: r"\S*\bcountme\b\S*",
        status: "200|302",
        user_agent: COUNTME_USER_AGENT_PATTERN,
        query_required: true,
        ..LogPattern::default()
    }
    .compile()
}
