//! Anchor-splice of the link-rewriting script into HTML documents.

const LINK_REWRITER: &str = include_str!("../../assets/link_rewriter.js");
const PUBLIC_HOSTNAME_SLOT: &str = "__PUBLIC_HOSTNAME__";
const TARGET_HOSTNAME_SLOT: &str = "__TARGET_HOSTNAME__";

/// The script goes immediately before the first occurrence of this marker.
pub const HEAD_CLOSE: &[u8] = b"</head>";

/// Renders the injected `<script>` block for a given upstream.
#[derive(Debug, Clone)]
pub struct ScriptTemplate {
    public_hostname: String,
}

impl ScriptTemplate {
    pub fn new(public_hostname: impl Into<String>) -> Self {
        Self {
            public_hostname: public_hostname.into(),
        }
    }

    /// Produce the script block. Hostnames are substituted verbatim.
    pub fn render(&self, target_hostname: &str) -> String {
        let body = LINK_REWRITER
            .replace(PUBLIC_HOSTNAME_SLOT, &self.public_hostname)
            .replace(TARGET_HOSTNAME_SLOT, target_hostname);
        format!("<script>{}</script>", body)
    }
}

/// Insert `block` before the first case-sensitive `</head>` in `html`.
///
/// Returns `None` when the document has no `</head>`.
pub fn splice_before_head_close(html: &[u8], block: &[u8]) -> Option<Vec<u8>> {
    let at = html
        .windows(HEAD_CLOSE.len())
        .position(|window| window == HEAD_CLOSE)?;

    let mut out = Vec::with_capacity(html.len() + block.len());
    out.extend_from_slice(&html[..at]);
    out.extend_from_slice(block);
    out.extend_from_slice(&html[at..]);
    Some(out)
}
