//! HTML response rewriting.
//!
//! # Data Flow
//! ```text
//! upstream response (Content-Type: text/html)
//!     → transformer.rs (buffer body in arrival order, bounded)
//!     → encoding.rs (decompress per Content-Encoding)
//!     → inject.rs (splice script before the first </head>)
//!     → encoding.rs (recompress with the same coding)
//!     → response with Content-Length removed
//! ```
//!
//! # Design Decisions
//! - Textual anchor-splice on bytes, no DOM and no UTF-8 re-encoding
//! - Documents without `</head>` are served byte-for-byte unmodified
//! - Codec work runs on the blocking pool

pub mod encoding;
pub mod inject;
pub mod transformer;

use axum::body::Bytes;
use axum::http::{header::CONTENT_LENGTH, HeaderMap, StatusCode};
use thiserror::Error;

pub use encoding::ContentEncoding;
pub use inject::ScriptTemplate;
pub use transformer::ResponseTransformer;

use crate::rewrite::inject::splice_before_head_close;

/// Failures while rewriting a buffered HTML body.
#[derive(Debug, Error)]
pub enum TransformError {
    #[error("body is not valid {encoding} data: {source}")]
    Decompression {
        encoding: ContentEncoding,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to re-encode body as {encoding}: {source}")]
    Compression {
        encoding: ContentEncoding,
        #[source]
        source: std::io::Error,
    },

    #[error("HTML body exceeds the {limit} byte buffering limit")]
    BodyTooLarge { limit: usize },

    #[error("rewrite task failed: {0}")]
    Worker(#[from] tokio::task::JoinError),
}

/// An upstream HTML response held in memory until its body is complete.
///
/// Consumed exactly once by [`InterceptedResponse::rewrite`].
#[derive(Debug)]
pub struct InterceptedResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
    pub encoding: ContentEncoding,
}

/// Result of rewriting an [`InterceptedResponse`].
#[derive(Debug)]
pub struct RewrittenResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
    /// False when the document had no `</head>` and was left untouched.
    pub injected: bool,
}

impl InterceptedResponse {
    /// Decompress, splice `script` before `</head>` and recompress.
    pub fn rewrite(self, script: &str) -> Result<RewrittenResponse, TransformError> {
        let Self {
            status,
            mut headers,
            body,
            encoding,
        } = self;

        let html = encoding.decompress(&body)?;
        match splice_before_head_close(&html, script.as_bytes()) {
            Some(spliced) => {
                let body = encoding.compress(&spliced)?;
                headers.remove(CONTENT_LENGTH);
                Ok(RewrittenResponse {
                    status,
                    headers,
                    body: Bytes::from(body),
                    injected: true,
                })
            }
            None => Ok(RewrittenResponse {
                status,
                headers,
                body,
                injected: false,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{header::CONTENT_ENCODING, HeaderValue};

    fn intercepted(body: &[u8], encoding: ContentEncoding) -> InterceptedResponse {
        let mut headers = HeaderMap::new();
        headers.insert("content-type", HeaderValue::from_static("text/html"));
        headers.insert(CONTENT_LENGTH, HeaderValue::from(body.len()));
        headers.insert("x-upstream", HeaderValue::from_static("kept"));
        if encoding != ContentEncoding::Identity {
            headers.insert(CONTENT_ENCODING, HeaderValue::from_str(&encoding.to_string()).unwrap());
        }
        InterceptedResponse {
            status: StatusCode::OK,
            headers,
            body: Bytes::copy_from_slice(body),
            encoding,
        }
    }

    #[test]
    fn gzip_document_is_rewritten_and_reencoded() {
        let html = b"<html><head></head><body>hi</body></html>";
        let packed = ContentEncoding::Gzip.compress(html).unwrap();

        let out = intercepted(&packed, ContentEncoding::Gzip)
            .rewrite("<script>s</script>")
            .unwrap();

        assert!(out.injected);
        assert!(out.headers.get(CONTENT_LENGTH).is_none());
        assert_eq!(out.headers["content-encoding"], "gzip");
        assert_eq!(out.headers["x-upstream"], "kept");
        assert_eq!(
            ContentEncoding::Gzip.decompress(&out.body).unwrap(),
            b"<html><head><script>s</script></head><body>hi</body></html>"
        );
    }

    #[test]
    fn document_without_head_close_is_untouched() {
        let html = b"<p>fragment</p>";
        let packed = ContentEncoding::Deflate.compress(html).unwrap();

        let out = intercepted(&packed, ContentEncoding::Deflate)
            .rewrite("<script>s</script>")
            .unwrap();

        assert!(!out.injected);
        assert_eq!(out.body, Bytes::from(packed.clone()));
        assert_eq!(out.headers[CONTENT_LENGTH], packed.len().to_string().as_str());
    }

    #[test]
    fn corrupt_body_fails_without_partial_output() {
        let err = intercepted(b"\x1f\x8bnot really gzip", ContentEncoding::Gzip)
            .rewrite("<script>s</script>")
            .unwrap_err();
        assert!(matches!(err, TransformError::Decompression { .. }));
    }
}
