use std::sync::LazyLock;

use regex::Regex;

use crate::error::MalformedLine;
use crate::types::{Trace, TraceLevel};

/// Recognized line shape (`logcat -v time` style): a `MM-DD HH:MM:SS.mmm`
/// token, a single-letter severity followed by `/`, and a free-text
/// remainder combining tag and message.
static LINE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d{2}-\d{2} \d{2}:\d{2}:\d{2}\.\d{3}) +([A-Za-z])/(.*)$")
        .expect("line grammar regex is valid")
});

/// Parser for raw log lines
pub struct TraceParser;

impl TraceParser {
    /// Parse one raw line into a [`Trace`].
    ///
    /// Failure is reserved for lines that cannot be tokenized at all; an
    /// unknown-but-well-formed severity letter still parses, with
    /// [`TraceLevel::Unknown`].
    pub fn parse(raw: &str) -> Result<Trace, MalformedLine> {
        let caps = LINE_RE.captures(raw.trim_end()).ok_or_else(|| MalformedLine {
            line: raw.to_string(),
        })?;

        let timestamp = caps[1].to_string();
        let level = caps[2]
            .chars()
            .next()
            .map(TraceLevel::from_letter)
            .unwrap_or_default();
        let (tag, message) = Self::split_remainder(&caps[3]);

        Ok(Trace::new(timestamp, level, tag, message))
    }

    /// Split the remainder into tag and message. Text before the first `:`
    /// is the tag, with any trailing `(pid)` suffix stripped; a remainder
    /// with no `:` is all message.
    fn split_remainder(rest: &str) -> (String, String) {
        match rest.split_once(':') {
            Some((tag, message)) => {
                let tag = tag.split('(').next().unwrap_or(tag).trim();
                (tag.to_string(), message.trim().to_string())
            }
            None => (String::new(), rest.trim().to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_plain_debug_line() {
        let trace = TraceParser::parse("02-07 17:45:33.014 D/Any debug trace").unwrap();
        assert_eq!(trace.timestamp, "02-07 17:45:33.014");
        assert_eq!(trace.level, TraceLevel::Debug);
        assert_eq!(trace.tag, "");
        assert_eq!(trace.message, "Any debug trace");
    }

    #[test]
    fn test_parse_tagged_line_with_pid() {
        let trace =
            TraceParser::parse("02-07 17:45:33.014 W/ActivityManager(  425): low memory").unwrap();
        assert_eq!(trace.level, TraceLevel::Warn);
        assert_eq!(trace.tag, "ActivityManager");
        assert_eq!(trace.message, "low memory");
    }

    #[test]
    fn test_wtf_letter_maps_to_assert() {
        let trace = TraceParser::parse("02-07 17:45:33.014 F/Any WTF trace").unwrap();
        assert_eq!(trace.level, TraceLevel::Assert);
    }

    #[test]
    fn test_unknown_severity_letter_still_parses() {
        let trace = TraceParser::parse("02-07 17:45:33.014 Q/strange but well formed").unwrap();
        assert_eq!(trace.level, TraceLevel::Unknown);
        assert_eq!(trace.message, "strange but well formed");
    }

    #[test]
    fn test_untokenizable_lines_fail() {
        for raw in [
            "",
            "--------- beginning of main",
            "not a trace at all",
            "02-07 17:45:33 D/missing millis",
            "02-07 17:45:33.014 DD/two letters",
        ] {
            let err = TraceParser::parse(raw).unwrap_err();
            assert_eq!(err.line, raw);
        }
    }

    #[test]
    fn test_trailing_newline_is_tolerated() {
        let trace = TraceParser::parse("02-07 17:45:33.014 I/ready\n").unwrap();
        assert_eq!(trace.message, "ready");
    }
}
