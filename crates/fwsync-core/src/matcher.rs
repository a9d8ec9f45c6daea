//! Watch-list domain matching
//!
//! A pattern matches an observed domain when the two are equal, or when the
//! observed domain ends with `"." + pattern`. One trailing dot is ignored on
//! both sides, since DNS wire names are dot-terminated and configured
//! patterns usually are not. There is no case folding and no wildcard syntax.
//!
//! ## List format
//!
//! Lists are read line by line:
//!
//! ```text
//! # comment                 ignored
//! example.com               suffix pattern
//! domain:example.org        suffix pattern
//! full:www.example.net      treated as a suffix pattern as well
//! regexp:^ads\.             ignored (unsupported scheme)
//! tracker.com @ads          attributes after " @" are stripped
//! ```

use crate::error::Result;
use crate::traits::DomainListSource;
use tracing::{debug, info};

/// Line prefixes accepted in domain lists
const ALLOWED_PREFIXES: &[&str] = &["domain:", "full:"];

/// Whether `observed` falls under `pattern`
pub fn matches(observed: &str, pattern: &str) -> bool {
    let observed = strip_trailing_dot(observed);
    let pattern = strip_trailing_dot(pattern);

    if pattern.is_empty() {
        return false;
    }
    if observed == pattern {
        return true;
    }

    observed
        .strip_suffix(pattern)
        .is_some_and(|head| head.ends_with('.'))
}

fn strip_trailing_dot(name: &str) -> &str {
    name.strip_suffix('.').unwrap_or(name)
}

/// Parse one list line into a pattern
///
/// Returns `None` for blank lines, comments and lines carrying an
/// unsupported `scheme:` prefix.
pub fn parse_line(line: &str) -> Option<String> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return None;
    }

    if line.contains(':') && !ALLOWED_PREFIXES.iter().any(|p| line.starts_with(p)) {
        return None;
    }

    // Attributes first, then the scheme prefix
    let line = match line.find(" @") {
        Some(idx) => &line[..idx],
        None => line,
    };
    let line = ALLOWED_PREFIXES
        .iter()
        .find_map(|p| line.strip_prefix(p))
        .unwrap_or(line)
        .trim();

    if line.is_empty() {
        None
    } else {
        Some(line.to_string())
    }
}

/// Immutable-after-load set of watch patterns
#[derive(Debug, Clone, Default)]
pub struct DomainMatcher {
    patterns: Vec<String>,
}

impl DomainMatcher {
    /// Create an empty matcher
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a matcher from raw list lines
    pub fn from_lines<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut matcher = Self::new();
        matcher.extend_from_lines(lines);
        matcher
    }

    /// Add every valid pattern found in `lines`
    ///
    /// Invalid lines are skipped silently. Returns the number of patterns added.
    pub fn extend_from_lines<I, S>(&mut self, lines: I) -> usize
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let before = self.patterns.len();
        for line in lines {
            match parse_line(line.as_ref()) {
                Some(pattern) => self.patterns.push(pattern),
                None => debug!("Skipping domain list line: {:?}", line.as_ref()),
            }
        }
        self.patterns.len() - before
    }

    /// Build the watch list from inline patterns plus every list source
    ///
    /// Any source failing to fetch aborts the load.
    pub async fn load<S>(
        static_domains: &[S],
        sources: &[Box<dyn DomainListSource>],
    ) -> Result<Self>
    where
        S: AsRef<str> + Sync,
    {
        let mut matcher = Self::from_lines(static_domains);

        for source in sources {
            let lines = source.fetch_lines().await?;
            let added = matcher.extend_from_lines(&lines);
            info!("Loaded {} domain(s) from {}", added, source.location());
        }

        Ok(matcher)
    }

    /// Whether `observed` matches any loaded pattern
    pub fn contains_any(&self, observed: &str) -> bool {
        self.patterns.iter().any(|p| matches(observed, p))
    }

    /// Loaded patterns, in load order
    pub fn patterns(&self) -> &[String] {
        &self.patterns
    }

    /// Number of loaded patterns
    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    /// Whether no pattern is loaded
    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }
}
