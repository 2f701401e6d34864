use crate::base_matcher::{Captures, Extractor, Matcher};
use crate::items::{parse_querydict, CountmeItem};
use crate::patterns::countme_log_regex;
use crate::timefmt::parse_logtime;
use crate::types::{CountmeError, Result};
use regex::Regex;
use std::collections::HashMap;

/// Matches the libdnf-style "countme" requests.
pub struct CountmeMatcher<E = Regex> {
    extractor: E,
}

impl CountmeMatcher<Regex> {
    pub fn new() -> Result<Self> {
        Ok(Self { extractor: countme_log_regex()? })
    }
}

impl<E: Extractor> CountmeMatcher<E> {
    pub fn with_extractor(extractor: E) -> Self {
        Self { extractor }
    }
}

fn query_param(query: &mut HashMap<String, String>, key: &str) -> Result<String> {
    query
        .remove(key)
        .ok_or_else(|| CountmeError::malformed(key, "", "missing from query"))
}

impl<E: Extractor> Matcher for CountmeMatcher<E> {
    type Item = CountmeItem;

    fn name(&self) -> &'static str {
        "countme"
    }

    fn extractor(&self) -> &dyn Extractor {
        &self.extractor
    }

    fn make_item(captures: &Captures<'_>) -> Result<CountmeItem> {
        let timestamp = parse_logtime(captures.require("time")?)?.timestamp();
        let mut query = parse_querydict(captures.get("query").unwrap_or_default());
        let countme = query_param(&mut query, "countme")?;
        let countme = countme
            .parse::<i64>()
            .map_err(|_| CountmeError::malformed("countme", &countme, "expected an integer"))?;
        // User-Agents without an OS description have nothing to capture here
        let os_field = |name: &str| captures.get(name).unwrap_or_default().to_string();
        Ok(CountmeItem {
            timestamp,
            host: captures.require("host")?.to_string(),
            os_name: os_field("os_name"),
            os_version: os_field("os_version"),
            os_variant: os_field("os_variant"),
            os_arch: os_field("os_arch"),
            countme,
            repo_tag: query_param(&mut query, "repo")?,
            repo_arch: query_param(&mut query, "arch")?,
        })
    }
}
