use regex::Regex;

use crate::types::Trace;

/// Compiled admission filter for parsed traces.
///
/// Matching is case-insensitive and purely functional; it runs once per
/// parsed trace, before the trace reaches the batching engine.
#[derive(Clone, Debug)]
pub struct TraceFilter {
    regex: Option<Regex>,
    pattern: String,
}

impl TraceFilter {
    /// Build a filter from an optional pattern. Absent or empty patterns
    /// admit everything. A pattern that is not a valid regex degrades to a
    /// case-insensitive literal substring match instead of failing.
    pub fn new(pattern: Option<&str>) -> Self {
        let pattern = pattern.unwrap_or("").to_string();
        let regex = if pattern.is_empty() {
            None
        } else {
            Regex::new(&format!("(?i){}", pattern))
                .or_else(|_| Regex::new(&format!("(?i){}", regex::escape(&pattern))))
                .ok()
        };

        Self { regex, pattern }
    }

    /// Whether a trace should be admitted into the pipeline
    pub fn admits(&self, trace: &Trace) -> bool {
        match &self.regex {
            Some(re) => re.is_match(&trace.message) || re.is_match(&trace.tag),
            None => true,
        }
    }

    /// Get the original pattern
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// Check if the filter admits everything
    pub fn is_empty(&self) -> bool {
        self.regex.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TraceLevel;

    fn trace(tag: &str, message: &str) -> Trace {
        Trace::new(
            "02-07 17:45:33.014".to_string(),
            TraceLevel::Debug,
            tag.to_string(),
            message.to_string(),
        )
    }

    #[test]
    fn test_absent_pattern_admits_everything() {
        let filter = TraceFilter::new(None);
        assert!(filter.is_empty());
        assert!(filter.admits(&trace("", "anything")));
    }

    #[test]
    fn test_case_insensitive_match() {
        let filter = TraceFilter::new(Some("FiLteR"));
        assert!(filter.admits(&trace("", "any fIltEr trace")));
        assert!(!filter.admits(&trace("", "Any error trace")));
    }

    #[test]
    fn test_matches_against_tag() {
        let filter = TraceFilter::new(Some("wifi"));
        assert!(filter.admits(&trace("WifiService", "scan finished")));
    }

    #[test]
    fn test_regex_pattern() {
        let filter = TraceFilter::new(Some("conn(ect|ection)"));
        assert!(filter.admits(&trace("", "Connection reset")));
        assert!(!filter.admits(&trace("", "conntrack")));
    }

    #[test]
    fn test_invalid_regex_falls_back_to_literal() {
        let filter = TraceFilter::new(Some("fil(ter"));
        assert!(filter.admits(&trace("", "a FIL(TER match")));
        assert!(!filter.admits(&trace("", "filter without paren")));
    }
}
