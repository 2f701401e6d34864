use crate::base_matcher::{Captures, Extractor, Matcher};
use crate::items::LogItem;
use crate::patterns::access_log_regex;
use crate::types::{CountmeError, Result};
use regex::Regex;

/// Matches any access.log line and keeps every field.
pub struct LogMatcher<E = Regex> {
    extractor: E,
}

impl LogMatcher<Regex> {
    pub fn new() -> Result<Self> {
        Ok(Self { extractor: access_log_regex()? })
    }
}

impl<E: Extractor> LogMatcher<E> {
    pub fn with_extractor(extractor: E) -> Self {
        Self { extractor }
    }
}

pub(crate) fn parse_int(captures: &Captures<'_>, field: &str) -> Result<i64> {
    let text = captures.require(field)?;
    text.parse()
        .map_err(|_| CountmeError::malformed(field, text, "expected an integer"))
}

impl<E: Extractor> Matcher for LogMatcher<E> {
    type Item = LogItem;

    fn name(&self) -> &'static str {
        "log"
    }

    fn extractor(&self) -> &dyn Extractor {
        &self.extractor
    }

    fn make_item(captures: &Captures<'_>) -> Result<LogItem> {
        let nbytes = match captures.get("nbytes") {
            None | Some("-") => None,
            Some(_) => Some(parse_int(captures, "nbytes")?),
        };
        Ok(LogItem {
            host: captures.require("host")?.to_string(),
            identity: captures.require("identity")?.to_string(),
            time: captures.require("time")?.to_string(),
            method: captures.require("method")?.to_string(),
            path: captures.require("path")?.to_string(),
            query: captures.get("query").map(str::to_string),
            protocol: captures.require("protocol")?.to_string(),
            status: parse_int(captures, "status")?,
            nbytes,
            referrer: captures.require("referrer")?.to_string(),
            user_agent: captures.require("user_agent")?.to_string(),
        })
    }
}
