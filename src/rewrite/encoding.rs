//! Content-Encoding handling for buffered bodies.

use std::fmt;
use std::io::{Read, Write};

use axum::http::{header::CONTENT_ENCODING, HeaderMap};
use flate2::read::{DeflateDecoder, MultiGzDecoder, ZlibDecoder};
use flate2::write::{GzEncoder, ZlibEncoder};
use flate2::Compression;

use crate::rewrite::TransformError;

/// Body codings the transformer can undo and redo.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentEncoding {
    Identity,
    Gzip,
    Deflate,
}

impl ContentEncoding {
    /// Read the coding declared by `Content-Encoding`.
    ///
    /// Returns `None` for codings that cannot be rewritten (`br`, `zstd`,
    /// stacked codings, non-ASCII values).
    pub fn from_headers(headers: &HeaderMap) -> Option<Self> {
        let Some(value) = headers.get(CONTENT_ENCODING) else {
            return Some(Self::Identity);
        };
        let value = value.to_str().ok()?.trim();
        if value.is_empty() || value.eq_ignore_ascii_case("identity") {
            Some(Self::Identity)
        } else if value.eq_ignore_ascii_case("gzip") || value.eq_ignore_ascii_case("x-gzip") {
            Some(Self::Gzip)
        } else if value.eq_ignore_ascii_case("deflate") {
            Some(Self::Deflate)
        } else {
            None
        }
    }

    pub fn decompress(self, input: &[u8]) -> Result<Vec<u8>, TransformError> {
        match self {
            Self::Identity => Ok(input.to_vec()),
            // A gzip body may hold several concatenated members.
            Self::Gzip => read_all(MultiGzDecoder::new(input)).map_err(|source| {
                TransformError::Decompression { encoding: self, source }
            }),
            // "deflate" is zlib-wrapped per RFC 9110, but some servers send a
            // bare deflate stream.
            Self::Deflate => read_all(ZlibDecoder::new(input))
                .or_else(|_| read_all(DeflateDecoder::new(input)))
                .map_err(|source| TransformError::Decompression { encoding: self, source }),
        }
    }

    pub fn compress(self, input: &[u8]) -> Result<Vec<u8>, TransformError> {
        let result = match self {
            Self::Identity => return Ok(input.to_vec()),
            Self::Gzip => {
                let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
                encoder.write_all(input).and_then(|_| encoder.finish())
            }
            Self::Deflate => {
                let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
                encoder.write_all(input).and_then(|_| encoder.finish())
            }
        };
        result.map_err(|source| TransformError::Compression { encoding: self, source })
    }
}

impl fmt::Display for ContentEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Identity => "identity",
            Self::Gzip => "gzip",
            Self::Deflate => "deflate",
        })
    }
}

fn read_all(mut decoder: impl Read) -> std::io::Result<Vec<u8>> {
    let mut output = Vec::new();
    decoder.read_to_end(&mut output)?;
    Ok(output)
}
