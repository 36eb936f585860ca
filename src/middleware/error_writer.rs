//! Protocol-specific serialization of a rejected call.

use std::collections::BTreeMap;

use bytes::{BufMut, Bytes, BytesMut};
use http::header::CONTENT_TYPE;
use http::{HeaderMap, HeaderValue, Response, StatusCode};
use serde::Serialize;
use tonic::Status;

use super::classify::is_connect_streaming;
use crate::error::{AuthError, ConnectCode};
use crate::infer::infer_protocol;
use crate::request::Protocol;

const GRPC_WEB_DEFAULT: &str = "application/grpc-web+proto";
const CONNECT_UNARY_ERROR: &str = "application/json";
/// Connect envelope flag marking the end-of-stream message.
const END_STREAM_FLAG: u8 = 0b0000_0010;

#[derive(Serialize)]
struct ConnectError<'a> {
    code: &'static str,
    #[serde(skip_serializing_if = "str::is_empty")]
    message: &'a str,
}

#[derive(Serialize)]
struct EndStream<'a> {
    error: ConnectError<'a>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    metadata: BTreeMap<&'a str, Vec<&'a str>>,
}

/// Writes `err` in the form the calling client's protocol expects.
pub(crate) fn write_error<B>(request_headers: &HeaderMap, err: AuthError) -> Response<B>
where
    B: Default + From<Bytes>,
{
    match infer_protocol(request_headers) {
        Protocol::Grpc => Status::from(err).into_http(),
        Protocol::GrpcWeb => {
            let mut response: Response<B> = Status::from(err).into_http();
            let content_type = request_headers
                .get(CONTENT_TYPE)
                .cloned()
                .unwrap_or_else(|| HeaderValue::from_static(GRPC_WEB_DEFAULT));
            response.headers_mut().insert(CONTENT_TYPE, content_type);
            response
        }
        Protocol::Connect if is_connect_streaming(request_headers) => {
            connect_streaming_error(request_headers, &err)
        }
        Protocol::Connect => connect_unary_error(&err),
    }
}

fn connect_error(err: &AuthError) -> ConnectError<'_> {
    ConnectError {
        code: err.code().connect_name(),
        message: err.message(),
    }
}

fn connect_unary_error<B: From<Bytes>>(err: &AuthError) -> Response<B> {
    let body = serde_json::to_vec(&connect_error(err)).unwrap_or_default();
    let mut response = Response::new(B::from(Bytes::from(body)));
    *response.status_mut() = err.code().http_status();
    let headers = response.headers_mut();
    headers.extend(err.meta().clone());
    headers.insert(CONTENT_TYPE, HeaderValue::from_static(CONNECT_UNARY_ERROR));
    response
}

fn connect_streaming_error<B: From<Bytes>>(
    request_headers: &HeaderMap,
    err: &AuthError,
) -> Response<B> {
    let mut metadata: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
    for (name, value) in err.meta() {
        if let Ok(value) = value.to_str() {
            metadata.entry(name.as_str()).or_default().push(value);
        }
    }
    let payload = serde_json::to_vec(&EndStream {
        error: connect_error(err),
        metadata,
    })
    .unwrap_or_default();

    let mut envelope = BytesMut::with_capacity(5 + payload.len());
    envelope.put_u8(END_STREAM_FLAG);
    envelope.put_u32(payload.len() as u32);
    envelope.put_slice(&payload);

    let mut response = Response::new(B::from(envelope.freeze()));
    *response.status_mut() = StatusCode::OK;
    if let Some(content_type) = request_headers.get(CONTENT_TYPE) {
        response
            .headers_mut()
            .insert(CONTENT_TYPE, content_type.clone());
    }
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::header::WWW_AUTHENTICATE;

    fn request(content_type: &'static str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static(content_type));
        headers
    }

    fn challenge() -> AuthError {
        crate::unauthenticated!("expected Bearer authentication scheme")
            .with_meta(WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"))
    }

    #[test]
    fn grpc_is_trailers_only() {
        let response: Response<axum::body::Body> =
            write_error(&request("application/grpc+proto"), challenge());
        assert_eq!(response.status(), StatusCode::OK);
        let headers = response.headers();
        assert_eq!(headers.get("grpc-status").unwrap(), "16");
        assert_eq!(headers.get(WWW_AUTHENTICATE).unwrap(), "Bearer");
        assert!(
            headers
                .get(CONTENT_TYPE)
                .unwrap()
                .to_str()
                .unwrap()
                .starts_with("application/grpc")
        );
    }

    #[test]
    fn grpc_web_echoes_content_type() {
        let response: Response<axum::body::Body> =
            write_error(&request("application/grpc-web-text"), challenge());
        assert_eq!(response.headers().get("grpc-status").unwrap(), "16");
        assert_eq!(
            response.headers().get(CONTENT_TYPE).unwrap(),
            "application/grpc-web-text"
        );
    }

    #[tokio::test]
    async fn connect_unary_is_json_with_http_status() {
        let response: Response<axum::body::Body> =
            write_error(&request("application/json"), challenge());
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(response.headers().get(WWW_AUTHENTICATE).unwrap(), "Bearer");

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["code"], "unauthenticated");
        assert_eq!(json["message"], "expected Bearer authentication scheme");
    }

    #[tokio::test]
    async fn connect_streaming_is_end_stream_envelope() {
        let response: Response<axum::body::Body> =
            write_error(&request("application/connect+json"), challenge());
        assert_eq!(response.status(), StatusCode::OK);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(body[0], END_STREAM_FLAG);
        let len = u32::from_be_bytes([body[1], body[2], body[3], body[4]]) as usize;
        assert_eq!(len, body.len() - 5);

        let json: serde_json::Value = serde_json::from_slice(&body[5..]).unwrap();
        assert_eq!(json["error"]["code"], "unauthenticated");
        assert_eq!(json["metadata"]["www-authenticate"][0], "Bearer");
    }
}
