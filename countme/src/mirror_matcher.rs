use crate::base_matcher::{Captures, Extractor, Matcher};
use crate::items::{parse_querydict, MirrorItem};
use crate::patterns::mirrors_log_regex;
use crate::timefmt::parse_logtime;
use crate::types::Result;
use regex::Regex;

/// Matches all mirrorlist/metalink requests, like mirrorlist.py does.
pub struct MirrorMatcher<E = Regex> {
    extractor: E,
}

impl MirrorMatcher<Regex> {
    pub fn new() -> Result<Self> {
        Ok(Self { extractor: mirrors_log_regex()? })
    }
}

impl<E: Extractor> MirrorMatcher<E> {
    pub fn with_extractor(extractor: E) -> Self {
        Self { extractor }
    }
}

impl<E: Extractor> Matcher for MirrorMatcher<E> {
    type Item = MirrorItem;

    fn name(&self) -> &'static str {
        "mirrors"
    }

    fn extractor(&self) -> &dyn Extractor {
        &self.extractor
    }

    fn make_item(captures: &Captures<'_>) -> Result<MirrorItem> {
        let timestamp = parse_logtime(captures.require("time")?)?.timestamp();
        let mut query = parse_querydict(captures.get("query").unwrap_or_default());
        Ok(MirrorItem {
            timestamp,
            host: captures.require("host")?.to_string(),
            repo_tag: query.remove("repo"),
            repo_arch: query.remove("arch"),
        })
    }
}
