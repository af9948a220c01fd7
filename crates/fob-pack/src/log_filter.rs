//! Engine log filtering.
//!
//! Filters use the `key:pattern` language: `*` is a wildcard, a leading `!`
//! inverts a condition and `&` joins conditions that must all hold. A log is
//! kept when any filter is satisfied; an empty filter list keeps everything.
//!
//! ```
//! use fob_pack::engine::EngineLog;
//! use fob_pack::log_filter::LogFilter;
//!
//! let filter = LogFilter::new(&["!code:CIRCULAR_DEPENDENCY".to_string()]);
//! assert!(!filter.keep(&EngineLog::warn("CIRCULAR_DEPENDENCY", "a -> b -> a")));
//! assert!(filter.keep(&EngineLog::warn("UNRESOLVED_IMPORT", "'x' is external")));
//! ```

use crate::engine::EngineLog;

/// Filter list applied when the configuration sets none.
pub fn default_log_filter() -> Vec<String> {
    vec!["!code:CIRCULAR_DEPENDENCY".to_string()]
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Condition {
    inverted: bool,
    key: String,
    parts: Vec<String>,
}

/// A compiled filter list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LogFilter {
    filters: Vec<Vec<Condition>>,
}

impl LogFilter {
    pub fn new(filters: &[String]) -> Self {
        let filters = filters
            .iter()
            .map(|filter| filter.split('&').map(parse_condition).collect())
            .collect();
        Self { filters }
    }

    pub fn keep(&self, log: &EngineLog) -> bool {
        if self.filters.is_empty() {
            return true;
        }
        self.filters.iter().any(|conditions| {
            conditions
                .iter()
                .all(|c| test_condition(log, &c.key, &c.parts) != c.inverted)
        })
    }
}

fn parse_condition(raw: &str) -> Condition {
    let (inverted, raw) = match raw.strip_prefix('!') {
        Some(rest) => (true, rest),
        None => (false, raw),
    };
    let (key, pattern) = raw.split_once(':').unwrap_or((raw, ""));
    Condition {
        inverted,
        key: key.to_string(),
        parts: pattern.split('*').map(str::to_string).collect(),
    }
}

fn field<'a>(log: &'a EngineLog, key: &str) -> Option<&'a str> {
    match key {
        "code" => log.code.as_deref(),
        "message" => Some(log.message.as_str()),
        "plugin" => log.plugin.as_deref(),
        "id" => log.id.as_deref(),
        "level" => Some(log.level.as_str()),
        _ => None,
    }
}

fn test_condition(log: &EngineLog, key: &str, parts: &[String]) -> bool {
    let Some(value) = field(log, key) else {
        return false;
    };
    wildcard_match(value, parts)
}

/// Match `value` against a pattern pre-split on `*`.
fn wildcard_match(value: &str, parts: &[String]) -> bool {
    let Some((first, rest)) = parts.split_first() else {
        return value.is_empty();
    };
    let Some((last, middle)) = rest.split_last() else {
        return value == first;
    };
    let Some(mut remaining) = value.strip_prefix(first.as_str()) else {
        return false;
    };
    for part in middle {
        match remaining.find(part.as_str()) {
            Some(pos) => remaining = &remaining[pos + part.len()..],
            None => return false,
        }
    }
    remaining.ends_with(last.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filter(raw: &[&str]) -> LogFilter {
        LogFilter::new(&raw.iter().map(|s| s.to_string()).collect::<Vec<_>>())
    }

    #[test]
    fn test_empty_keeps_everything() {
        assert!(filter(&[]).keep(&EngineLog::warn("ANY", "msg")));
    }

    #[test]
    fn test_default_drops_circular() {
        let f = LogFilter::new(&default_log_filter());
        assert!(!f.keep(&EngineLog::warn("CIRCULAR_DEPENDENCY", "cycle")));
        assert!(f.keep(&EngineLog::warn("EVAL", "eval is bad")));
    }

    #[test]
    fn test_log_without_code_survives_negated_code_filter() {
        let mut log = EngineLog::warn("X", "no code");
        log.code = None;
        assert!(filter(&["!code:CIRCULAR_DEPENDENCY"]).keep(&log));
        assert!(!filter(&["code:CIRCULAR_DEPENDENCY"]).keep(&log));
    }

    #[test]
    fn test_wildcards() {
        let f = filter(&["message:*react*"]);
        assert!(f.keep(&EngineLog::warn("A", "'react' is external")));
        assert!(!f.keep(&EngineLog::warn("A", "'vue' is external")));

        let f = filter(&["code:UNRESOLVED_*"]);
        assert!(f.keep(&EngineLog::warn("UNRESOLVED_IMPORT", "")));
        assert!(!f.keep(&EngineLog::warn("EVAL", "")));
    }

    #[test]
    fn test_conjunction_and_disjunction() {
        let f = filter(&["code:A&plugin:replace", "code:B"]);
        assert!(f.keep(&EngineLog::warn("A", "").with_plugin("replace")));
        assert!(!f.keep(&EngineLog::warn("A", "").with_plugin("json")));
        assert!(f.keep(&EngineLog::warn("B", "")));
        assert!(!f.keep(&EngineLog::warn("C", "")));
    }

    #[test]
    fn test_wildcard_match_edges() {
        let parts = |p: &str| p.split('*').map(str::to_string).collect::<Vec<_>>();
        assert!(wildcard_match("abc", &parts("*")));
        assert!(wildcard_match("abc", &parts("a*c")));
        assert!(!wildcard_match("ab", &parts("ab*b")));
        assert!(wildcard_match("abcb", &parts("ab*b")));
        assert!(wildcard_match("", &parts("")));
    }
}
