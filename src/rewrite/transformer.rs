//! Buffered HTML transformation of upstream responses.

use std::convert::Infallible;

use axum::body::{Body, Bytes};
use axum::http::{header::CONTENT_TYPE, HeaderMap, Method, Response, StatusCode};
use http_body_util::{BodyExt, LengthLimitError, Limited};

use crate::config::LimitsConfig;
use crate::error::ProxyError;
use crate::observability::metrics;
use crate::rewrite::{ContentEncoding, InterceptedResponse, ScriptTemplate, TransformError};
use crate::routing::RoutingDecision;

/// True when the response declares an HTML document.
pub fn is_html(headers: &HeaderMap) -> bool {
    headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.to_ascii_lowercase().contains("text/html"))
        .unwrap_or(false)
}

/// Rewrites HTML responses so root-relative links route back through the
/// proxy.
#[derive(Debug, Clone)]
pub struct ResponseTransformer {
    template: ScriptTemplate,
    max_body_bytes: usize,
}

impl ResponseTransformer {
    pub fn new(public_hostname: impl Into<String>, limits: &LimitsConfig) -> Self {
        Self {
            template: ScriptTemplate::new(public_hostname),
            max_body_bytes: limits.max_html_body_bytes,
        }
    }

    /// Decide whether a response to `method` should be rewritten. Anything
    /// else is streamed through untouched.
    pub fn wants(&self, method: &Method, status: StatusCode, headers: &HeaderMap) -> bool {
        if *method == Method::HEAD
            || status.is_informational()
            || status == StatusCode::NO_CONTENT
            || status == StatusCode::NOT_MODIFIED
        {
            return false;
        }
        if !is_html(headers) {
            return false;
        }
        if ContentEncoding::from_headers(headers).is_none() {
            tracing::debug!(
                content_encoding = ?headers.get("content-encoding"),
                "Unsupported encoding, HTML streamed unmodified"
            );
            return false;
        }
        true
    }

    /// Buffer, rewrite and re-emit an HTML response.
    pub async fn transform(
        &self,
        response: Response<Body>,
        decision: &RoutingDecision,
    ) -> Result<Response<Body>, ProxyError> {
        let (mut parts, body) = response.into_parts();
        let encoding =
            ContentEncoding::from_headers(&parts.headers).unwrap_or(ContentEncoding::Identity);

        let body = match Limited::new(body, self.max_body_bytes).collect().await {
            Ok(collected) => collected.to_bytes(),
            Err(err) if err.downcast_ref::<LengthLimitError>().is_some() => {
                return Err(TransformError::BodyTooLarge {
                    limit: self.max_body_bytes,
                }
                .into());
            }
            Err(err) => return Err(ProxyError::UpstreamBody(err)),
        };

        if body.is_empty() {
            return Ok(Response::from_parts(parts, Body::empty()));
        }

        let intercepted = InterceptedResponse {
            status: parts.status,
            headers: std::mem::take(&mut parts.headers),
            body,
            encoding,
        };
        let script = self.template.render(decision.target_hostname());
        let rewritten = tokio::task::spawn_blocking(move || intercepted.rewrite(&script))
            .await
            .map_err(TransformError::from)??;

        tracing::debug!(
            target_host = %decision.target_hostname(),
            encoding = %encoding,
            injected = rewritten.injected,
            bytes = rewritten.body.len(),
            "HTML response rewritten"
        );
        metrics::record_rewrite(rewritten.injected);

        parts.status = rewritten.status;
        parts.headers = rewritten.headers;
        let body = if rewritten.injected {
            // Unknown length: the transport picks the framing.
            Body::from_stream(futures_util::stream::iter([Ok::<Bytes, Infallible>(
                rewritten.body,
            )]))
        } else {
            Body::from(rewritten.body)
        };
        Ok(Response::from_parts(parts, body))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routing::TargetResolver;
    use axum::http::header::{CONTENT_ENCODING, CONTENT_LENGTH};
    use url::Url;

    fn decision(path: &str) -> RoutingDecision {
        TargetResolver::new(Url::parse("https://origin.example.com").unwrap())
            .resolve(path, false)
            .unwrap()
    }

    fn transformer(limit: usize) -> ResponseTransformer {
        ResponseTransformer::new(
            "proxy.example.net",
            &LimitsConfig {
                max_html_body_bytes: limit,
            },
        )
    }

    fn html_response(body: Vec<u8>, encoding: Option<&'static str>) -> Response<Body> {
        let mut builder = Response::builder()
            .header(CONTENT_TYPE, "text/html; charset=utf-8")
            .header(CONTENT_LENGTH, body.len());
        if let Some(encoding) = encoding {
            builder = builder.header(CONTENT_ENCODING, encoding);
        }
        builder.body(Body::from(body)).unwrap()
    }

    async fn read_body(response: Response<Body>) -> Vec<u8> {
        axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap()
            .to_vec()
    }

    #[test]
    fn test_html_detection() {
        let t = transformer(1024);
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, "Text/HTML; charset=utf-8".parse().unwrap());
        assert!(t.wants(&Method::GET, StatusCode::OK, &headers));
        assert!(!t.wants(&Method::HEAD, StatusCode::OK, &headers));
        assert!(!t.wants(&Method::GET, StatusCode::NOT_MODIFIED, &headers));

        headers.insert(CONTENT_ENCODING, "br".parse().unwrap());
        assert!(!t.wants(&Method::GET, StatusCode::OK, &headers));

        headers.insert(CONTENT_TYPE, "image/png".parse().unwrap());
        headers.remove(CONTENT_ENCODING);
        assert!(!t.wants(&Method::GET, StatusCode::OK, &headers));
    }

    #[tokio::test]
    async fn test_injects_for_explicit_target() {
        let response = html_response(b"<head></head><body>x</body>".to_vec(), None);
        let out = transformer(1024)
            .transform(response, &decision("/news.example.org/index.html"))
            .await
            .unwrap();

        assert!(out.headers().get(CONTENT_LENGTH).is_none());
        let body = String::from_utf8(read_body(out).await).unwrap();
        assert!(body.starts_with("<head><script>"));
        assert!(body.ends_with("</script></head><body>x</body>"));
        assert!(body.contains("\"proxy.example.net\""));
        assert!(body.contains("\"news.example.org\""));
    }

    #[tokio::test]
    async fn test_deflate_round_trip() {
        let packed = ContentEncoding::Deflate.compress(b"<head></head>").unwrap();
        let out = transformer(1024)
            .transform(html_response(packed, Some("deflate")), &decision("/"))
            .await
            .unwrap();

        assert_eq!(out.headers()[CONTENT_ENCODING], "deflate");
        let html = ContentEncoding::Deflate.decompress(&read_body(out).await).unwrap();
        let html = String::from_utf8(html).unwrap();
        assert!(html.contains("\"origin.example.com\""));
        assert!(html.ends_with("</script></head>"));
    }

    #[tokio::test]
    async fn test_missing_head_is_served_as_is() {
        let original = b"<p>partial</p>".to_vec();
        let out = transformer(1024)
            .transform(html_response(original.clone(), None), &decision("/"))
            .await
            .unwrap();

        assert_eq!(out.headers()[CONTENT_LENGTH], original.len().to_string().as_str());
        assert_eq!(read_body(out).await, original);
    }

    #[tokio::test]
    async fn test_oversized_body_is_rejected() {
        let err = transformer(8)
            .transform(html_response(vec![b'a'; 64], None), &decision("/"))
            .await
            .unwrap_err();
        assert!(matches!(err, ProxyError::Transform(TransformError::BodyTooLarge { limit: 8 })));
    }

    #[tokio::test]
    async fn test_invalid_gzip_is_an_internal_error() {
        let err = transformer(1024)
            .transform(html_response(b"plain text".to_vec(), Some("gzip")), &decision("/"))
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
