//! services/client/src/adapters/http.rs
//!
//! This module contains the adapter for the backend's HTTP transport.
//! It implements the `HttpTransport` port from the `core` crate using `reqwest`.

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Method};
use researchmate_core::ports::{
    HttpMethod, HttpRequest, HttpResponse, HttpTransport, PortError, PortResult, RequestBody,
};
use std::time::Duration;
use tracing::debug;

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// An adapter that implements the `HttpTransport` port on top of a `reqwest::Client`.
#[derive(Clone)]
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    /// Creates a transport whose requests give up after `timeout`.
    pub fn new(timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { client })
    }

    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

//=========================================================================================
// `HttpTransport` Trait Implementation
//=========================================================================================

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn send(&self, request: HttpRequest) -> PortResult<HttpResponse> {
        let method = match request.method {
            HttpMethod::Get => Method::GET,
            HttpMethod::Post => Method::POST,
            HttpMethod::Put => Method::PUT,
            HttpMethod::Delete => Method::DELETE,
        };

        let mut builder = self.client.request(method, &request.url);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        builder = match request.body {
            RequestBody::Empty => builder,
            RequestBody::Json(value) => {
                let body = serde_json::to_vec(&value)
                    .map_err(|e| PortError::Unexpected(e.to_string()))?;
                builder.body(body)
            }
            RequestBody::Multipart { field, file } => {
                let part = Part::bytes(file.bytes.to_vec())
                    .file_name(file.filename)
                    .mime_str(&file.media_type)
                    .map_err(|e| PortError::Unexpected(e.to_string()))?;
                builder.multipart(Form::new().part(field, part))
            }
        };

        let response = builder.send().await.map_err(port_error)?;
        let status = response.status().as_u16();
        let body = response.bytes().await.map_err(port_error)?;
        debug!(status, bytes = body.len(), "Received backend response");

        Ok(HttpResponse { status, body })
    }
}

fn port_error(e: reqwest::Error) -> PortError {
    if e.is_timeout() {
        PortError::Timeout(e.to_string())
    } else if e.is_connect() || e.is_request() {
        PortError::Unreachable(e.to_string())
    } else {
        PortError::Unexpected(e.to_string())
    }
}
