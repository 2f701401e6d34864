use crate::items::Item;
use crate::types::{CountmeError, Result};
use regex::Regex;
use std::borrow::Cow;
use std::io::BufRead;
use tracing::trace;

/// Named fields captured from one log line.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Captures<'a> {
    fields: Vec<(&'a str, &'a str)>,
}

impl<'a> Captures<'a> {
    pub fn get(&self, name: &str) -> Option<&'a str> {
        self.fields.iter().find(|(n, _)| *n == name).map(|(_, v)| *v)
    }

    /// Like [`get`](Self::get), but a missing capture means the pattern and
    /// the item builder disagree about the field set.
    pub fn require(&self, name: &str) -> Result<&'a str> {
        self.get(name)
            .ok_or_else(|| CountmeError::malformed(name, "", "not captured"))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl<'a> FromIterator<(&'a str, &'a str)> for Captures<'a> {
    fn from_iter<I: IntoIterator<Item = (&'a str, &'a str)>>(iter: I) -> Self {
        Captures { fields: iter.into_iter().collect() }
    }
}

/// A pattern engine: decides whether a line matches and pulls out its
/// named fields.
pub trait Extractor: Send + Sync {
    fn extract<'a>(&'a self, line: &'a str) -> Option<Captures<'a>>;
}

impl Extractor for Regex {
    fn extract<'a>(&'a self, line: &'a str) -> Option<Captures<'a>> {
        let caps = self.captures(line)?;
        Some(
            self.capture_names()
                .flatten()
                .filter_map(|name| caps.name(name).map(|m| (name, m.as_str())))
                .collect(),
        )
    }
}

impl<E: Extractor + ?Sized> Extractor for Box<E> {
    fn extract<'a>(&'a self, line: &'a str) -> Option<Captures<'a>> {
        (**self).extract(line)
    }
}

/// Base trait for all log matchers: an extractor bound to the item type it
/// produces.
pub trait Matcher {
    type Item: Item;

    /// Returns the name of this matcher (e.g. "countme", "mirrors")
    fn name(&self) -> &'static str;

    fn extractor(&self) -> &dyn Extractor;

    /// Builds an item from a successful match. Fails if a captured field
    /// cannot be converted to its declared type.
    fn make_item(captures: &Captures<'_>) -> Result<Self::Item>;

    /// `Ok(None)` for lines that don't match; those are not errors.
    fn match_line(&self, line: &str) -> Result<Option<Self::Item>> {
        match self.extractor().extract(line) {
            Some(captures) => Self::make_item(&captures).map(Some),
            None => Ok(None),
        }
    }

    /// Iterates over the matching items in `reader`, skipping everything else.
    fn iter_items<R: BufRead>(&self, reader: R) -> MatchIter<'_, Self, R>
    where
        Self: Sized,
    {
        MatchIter::new(self, reader)
    }
}

/// Single-pass iterator over the items matched in a line source.
///
/// Yields an error for lines that match but can't be turned into an item,
/// and for read failures; after a read failure the iterator is exhausted.
pub struct MatchIter<'m, M, R> {
    matcher: &'m M,
    reader: R,
    buf: Vec<u8>,
    lines_read: u64,
    matched: u64,
    done: bool,
}

impl<'m, M: Matcher, R: BufRead> MatchIter<'m, M, R> {
    pub fn new(matcher: &'m M, reader: R) -> Self {
        Self {
            matcher,
            reader,
            buf: Vec::with_capacity(512),
            lines_read: 0,
            matched: 0,
            done: false,
        }
    }

    pub fn lines_read(&self) -> u64 {
        self.lines_read
    }

    pub fn matched(&self) -> u64 {
        self.matched
    }
}

impl<M: Matcher, R: BufRead> Iterator for MatchIter<'_, M, R> {
    type Item = Result<M::Item>;

    fn next(&mut self) -> Option<Self::Item> {
        while !self.done {
            self.buf.clear();
            match self.reader.read_until(b'\n', &mut self.buf) {
                Ok(0) => self.done = true,
                Ok(_) => {
                    self.lines_read += 1;
                    // access logs aren't guaranteed to be valid UTF-8
                    let line: Cow<'_, str> = String::from_utf8_lossy(&self.buf);
                    let line = line.trim_end_matches(['\r', '\n']);
                    match self.matcher.match_line(line) {
                        Ok(Some(item)) => {
                            self.matched += 1;
                            return Some(Ok(item));
                        }
                        Ok(None) => trace!("line {} did not match", self.lines_read),
                        Err(e) => return Some(Err(e)),
                    }
                }
                Err(e) => {
                    self.done = true;
                    return Some(Err(e.into()));
                }
            }
        }
        None
    }
}
