//! DSN inspection heuristics
//!
//! Different drivers format connection strings differently: key=value pairs,
//! brace-delimited driver attributes, positional `host:port`. Instead of
//! per-driver parsing, a single permissive alternation over host shapes is
//! matched against the raw DSN text. The design errs toward "unknown" rather
//! than "wrong": an ambiguous or malformed host token yields no port at all,
//! because a wrong port would point the tunnel-liveness probe at the wrong
//! socket.

use once_cell::sync::Lazy;
use regex::Regex;

const LOCALHOST_PATTERN: &str = r"127\.0\.0\.1|\[?::1\]?|localhost";

// Host-shape detection only, not address validation.
const IPV4_PATTERN: &str = r"\d{1,3}(?:\.\d{1,3}){3}";
const IPV6_PATTERN: &str = r"\[?(?:[0-9a-fA-F]{1,4}:){1,7}[0-9a-fA-F]{1,4}\]?";
const DOMAIN_PATTERN: &str = r"(?:[a-zA-Z0-9-]+\.)+[a-zA-Z]{2,63}";

static LOCALHOST_RE: Lazy<Regex> = Lazy::new(|| Regex::new(LOCALHOST_PATTERN).unwrap());

/// Port as an attribute (`port=`, `Port=` or `PORT=`), preceded by `;` or
/// string start.
static PORT_ATTR_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)(?:;|^)port=(\d+)").unwrap());

/// Port as part of a host spec, separated by a colon or a comma and
/// terminated by `;`, `/` or end of string.
static HOST_PORT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r"(?:{LOCALHOST_PATTERN}|{IPV4_PATTERN}|{IPV6_PATTERN}|{DOMAIN_PATTERN})[:,](\d+)(?:;|/|$)"
    ))
    .unwrap()
});

/// Pure string analysis of a driver connection string.
///
/// No state, no I/O; results are best-effort and false-negative-safe.
#[derive(Debug, Clone, Copy)]
pub struct DsnParser<'a> {
    dsn: &'a str,
}

impl<'a> DsnParser<'a> {
    /// Wrap a DSN for inspection
    pub fn new(dsn: &'a str) -> Self {
        Self { dsn }
    }

    /// Whether the DSN targets a loopback host (`127.0.0.1`, `::1` bracketed
    /// or bare, or the literal `localhost`), anywhere in the string.
    pub fn is_local(&self) -> bool {
        LOCALHOST_RE.is_match(self.dsn)
    }

    /// Extract the declared network port, if any.
    ///
    /// An explicit `port=<digits>` attribute wins; otherwise a host-shaped
    /// token immediately followed by `:` or `,` and digits is accepted.
    /// Returns `None` for anything ambiguous or malformed.
    pub fn parse_port(&self) -> Option<u16> {
        if let Some(captures) = PORT_ATTR_RE.captures(self.dsn) {
            return captures[1].parse().ok();
        }

        HOST_PORT_RE
            .captures(self.dsn)
            .and_then(|captures| captures[1].parse().ok())
    }
}
