//! JSON (de)serialization and gzip response negotiation.
//!
//! Responses are fully buffered, so headers and status are always settled
//! before the first body byte leaves the process. When the request
//! advertised `Accept-Encoding: gzip` the body is compressed and
//! `content-encoding: gzip` is set on the same response.

use std::io::Write;

use bytes::Bytes;
use flate2::Compression;
use flate2::write::GzEncoder;
use http::header::{ACCEPT_ENCODING, CONTENT_ENCODING, CONTENT_TYPE, HeaderValue};
use http::{HeaderMap, StatusCode};
use http_body_util::Full;
use serde::de::DeserializeOwned;

use crate::error::RpcError;
use crate::middleware::HttpResponse;

/// Whether the request asked for a gzip-compressed response.
pub fn accepts_gzip(headers: &HeaderMap) -> bool {
    headers
        .get(ACCEPT_ENCODING)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.contains("gzip"))
}

/// Builds a JSON response from already-serialized `json` bytes.
///
/// `gzip` comes from [`accepts_gzip`] on the inbound request. Compression
/// failures surface as an error so the caller can route them through the
/// error responder.
pub fn encode(gzip: bool, status: StatusCode, json: Vec<u8>) -> Result<HttpResponse, std::io::Error> {
    let body = if gzip {
        let mut enc = GzEncoder::new(Vec::new(), Compression::default());
        enc.write_all(&json)?;
        enc.finish()?
    } else {
        json
    };

    let mut resp = http::Response::new(Full::new(Bytes::from(body)));
    *resp.status_mut() = status;
    resp.headers_mut().insert(
        CONTENT_TYPE,
        HeaderValue::from_static("application/json; charset=utf-8"),
    );
    if gzip {
        resp.headers_mut().insert(CONTENT_ENCODING, HeaderValue::from_static("gzip"));
    }
    Ok(resp)
}

/// Deserializes a JSON request body into the handler's request shape.
///
/// A malformed body yields [`RpcError::Decode`], which stays
/// distinguishable from a validation failure on a well-formed one.
pub fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, RpcError> {
    serde_json::from_slice(bytes).map_err(RpcError::from)
}
