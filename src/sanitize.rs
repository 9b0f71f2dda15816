//! Input sanitization for untrusted log content
//!
//! Scrubs dangerous patterns out of producer-supplied text before anything
//! crosses the ingest boundary: control characters, script/HTML tags, common
//! SQL injection fragments, and long runs of special characters. The output
//! is clean of those patterns but is not escaped for any particular
//! downstream interpreter.

use regex::Regex;
use std::sync::OnceLock;

/// Placeholder substituted for script blocks and HTML tags
const TAG_PLACEHOLDER: &str = "[removed]";

/// Placeholder substituted for SQL injection fragments
const SQL_PLACEHOLDER: &str = "[filtered]";

/// Longest run of consecutive special characters preserved in output
const MAX_CONSECUTIVE_SPECIAL: usize = 10;

/// Rewrites can uncover patterns that were split across an earlier match, so
/// the pipeline reruns until the text stops changing. Converges in one or two
/// passes on real input; the cap only guards pathological cases.
const MAX_PASSES: usize = 8;

/// Control characters other than `\n` and `\t`, compiled once and cached
fn control_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"[\x00-\x08\x0B\x0C\x0E-\x1F\x7F]").expect("control pattern compiles")
    })
}

/// Script blocks and bare HTML tags, compiled once and cached
fn script_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(?is)<script[^>]*>.*?</script>|<[^>]+>").expect("script pattern compiles")
    })
}

/// Quoted boolean clauses, comment markers, and chained statements,
/// compiled once and cached
fn sql_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(?i)('\s*(OR|AND)\s*')|(--)|(;\s*(DROP|DELETE|UPDATE|INSERT|ALTER|TRUNCATE))")
            .expect("sql pattern compiles")
    })
}

/// Everything a service name is not allowed to contain, compiled once and cached
fn service_charset_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"[^a-zA-Z0-9._-]").expect("service pattern compiles"))
}

/// Sanitize free-form log text
///
/// Total: every input maps to a cleaned string, never an error. Idempotent:
/// sanitizing already-sanitized text is a no-op.
pub fn sanitize(input: &str) -> String {
    let mut current = sanitize_once(input);
    for _ in 0..MAX_PASSES {
        let next = sanitize_once(&current);
        if next == current {
            break;
        }
        current = next;
    }
    current
}

/// Reduce a service name to `[a-zA-Z0-9._-]` by deleting everything else
pub fn sanitize_service_name(input: &str) -> String {
    service_charset_pattern().replace_all(input, "").into_owned()
}

fn sanitize_once(input: &str) -> String {
    let stripped = control_pattern().replace_all(input, "");
    let no_tags = script_pattern().replace_all(&stripped, TAG_PLACEHOLDER);
    let no_sql = sql_pattern().replace_all(&no_tags, SQL_PLACEHOLDER);
    limit_special_runs(&no_sql)
}

/// Cap runs of consecutive special characters at [`MAX_CONSECUTIVE_SPECIAL`]
fn limit_special_runs(input: &str) -> String {
    let mut output = String::with_capacity(input.len());
    let mut run = 0usize;

    for ch in input.chars() {
        if is_special(ch) {
            run += 1;
            if run <= MAX_CONSECUTIVE_SPECIAL {
                output.push(ch);
            }
        } else {
            run = 0;
            output.push(ch);
        }
    }

    output
}

/// Special means neither alphanumeric nor whitespace
fn is_special(ch: char) -> bool {
    !ch.is_alphanumeric() && !ch.is_whitespace()
}
