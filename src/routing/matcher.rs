//! Path-encoded host detection.
//!
//! # Responsibilities
//! - Split `/{segment}/{rest}` into its leading segment and remainder
//! - Decide whether the leading segment looks like a hostname
//!
//! # Design Decisions
//! - Equivalent to `^/([A-Za-z0-9.-]+)(/.*)` without a regex engine
//! - "Looks like a hostname" means: matches the pattern and contains a dot
//! - No percent-decoding or normalization; bytes are taken verbatim

/// A leading path segment that names an upstream host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HostSegment<'a> {
    /// The hostname exactly as it appeared in the path.
    pub host: &'a str,
    /// Everything from the slash following the host, inclusive.
    pub rest: &'a str,
}

/// Extract a hostname segment from a request path, if it has one.
///
/// `/example.com/a/b` yields host `example.com` and rest `/a/b`.
/// `/api/foo` (no dot) and `/example.com` (no trailing slash) yield `None`.
pub fn match_host_segment(path: &str) -> Option<HostSegment<'_>> {
    let tail = path.strip_prefix('/')?;
    let end = tail.find('/')?;
    let (host, rest) = tail.split_at(end);

    if host.is_empty() || !host.bytes().all(is_host_byte) {
        return None;
    }
    if !host.contains('.') {
        return None;
    }

    Some(HostSegment { host, rest })
}

fn is_host_byte(byte: u8) -> bool {
    byte.is_ascii_alphanumeric() || byte == b'.' || byte == b'-'
}
