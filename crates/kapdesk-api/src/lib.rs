// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

//! Blocking HTTP dispatcher for the console backend.
//!
//! Credentials ride on the client's cookie store; no authorization header
//! is ever attached.

use anyhow::{Context, Result, bail};
use kapdesk_app::{
    ApiRequest, DispatchError, Dispatcher, Envelope, FormPart, Method, PartValue, ProfileUpdate,
    RequestBody, SessionUser, decode_login, login_request, logout_request,
};
use reqwest::StatusCode;
use reqwest::blocking::multipart::{Form, Part};
use reqwest::blocking::{Client as HttpClient, RequestBuilder};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

#[derive(Debug, Clone)]
pub struct Client {
    base_url: String,
    timeout: Duration,
    http: HttpClient,
}

impl Client {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let base_url = base_url.trim().trim_end_matches('/').to_owned();
        if base_url.is_empty() {
            bail!("api.base_url must not be empty");
        }
        let parsed = Url::parse(&base_url)
            .with_context(|| format!("api.base_url {base_url:?} is not a valid URL"))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            bail!(
                "api.base_url must use http or https, got {:?}",
                parsed.scheme()
            );
        }

        let http = HttpClient::builder()
            .timeout(timeout)
            .cookie_store(true)
            .build()
            .context("build HTTP client")?;

        Ok(Self {
            base_url,
            timeout,
            http,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn url_for(&self, request: &ApiRequest) -> Result<Url, DispatchError> {
        let mut url = Url::parse(&format!("{}{}", self.base_url, request.path)).map_err(|error| {
            DispatchError::Unreachable {
                detail: format!("invalid request URL: {error}"),
            }
        })?;
        if !request.query.is_empty() {
            url.query_pairs_mut().extend_pairs(
                request
                    .query
                    .iter()
                    .map(|(key, value)| (key.as_str(), value.as_str())),
            );
        }
        Ok(url)
    }

    pub fn login(&self, username: &str, password: &str) -> Result<SessionUser, DispatchError> {
        let envelope = self.dispatch(&login_request(username, password))?;
        decode_login(&envelope)
    }

    pub fn update_profile(&self, update: &ProfileUpdate) -> Result<Envelope, DispatchError> {
        self.dispatch(&update.request())
    }

    pub fn logout(&self) -> Result<(), DispatchError> {
        self.dispatch(&logout_request()).map(|_| ())
    }

    fn builder(&self, method: Method, url: Url) -> RequestBuilder {
        match method {
            Method::Get => self.http.get(url),
            Method::Post => self.http.post(url),
            Method::Patch => self.http.patch(url),
            Method::Put => self.http.put(url),
            Method::Delete => self.http.delete(url),
        }
    }
}

impl Dispatcher for Client {
    fn dispatch(&self, request: &ApiRequest) -> Result<Envelope, DispatchError> {
        let url = self.url_for(request)?;
        debug!(method = request.method.as_str(), %url, "dispatch");

        let builder = self.builder(request.method, url);
        let builder = match &request.body {
            RequestBody::None => builder,
            RequestBody::Json(body) => builder.json(body),
            RequestBody::Multipart(parts) => builder.multipart(multipart_form(parts)),
        };

        let response = builder
            .send()
            .map_err(|error| connection_error(&self.base_url, error))?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            let error = clean_error_response(status, &body);
            warn!(path = %request.path, status = status.as_u16(), %error, "request failed");
            return Err(error);
        }
        let body = response
            .text()
            .map_err(|error| connection_error(&self.base_url, error))?;
        decode_envelope(&body)
    }
}

fn multipart_form(parts: &[FormPart]) -> Form {
    parts.iter().fold(Form::new(), |form, part| match &part.value {
        PartValue::Text(value) => form.text(part.name.clone(), value.clone()),
        PartValue::File {
            file_name,
            mime_type,
            bytes,
        } => {
            let file = Part::bytes(bytes.clone()).file_name(file_name.clone());
            let file = match file.mime_str(mime_type) {
                Ok(file) => file,
                Err(_) => Part::bytes(bytes.clone()).file_name(file_name.clone()),
            };
            form.part(part.name.clone(), file)
        }
    })
}

/// 2xx bodies: an explicit `success: false` is a rejection; an empty body
/// or one without the flag counts as success.
fn decode_envelope(body: &str) -> Result<Envelope, DispatchError> {
    if body.trim().is_empty() {
        return Ok(Envelope {
            data: Value::Null,
            message: String::new(),
            success: true,
        });
    }
    let raw: Value = serde_json::from_str(body).map_err(|error| DispatchError::Decode {
        message: error.to_string(),
    })?;
    let explicit = raw.get("success").and_then(Value::as_bool);
    let mut envelope: Envelope =
        serde_json::from_value(raw).map_err(|error| DispatchError::Decode {
            message: error.to_string(),
        })?;
    if explicit == Some(false) {
        return Err(DispatchError::Rejected {
            message: envelope.message,
        });
    }
    envelope.success = true;
    Ok(envelope)
}

fn connection_error(base_url: &str, error: reqwest::Error) -> DispatchError {
    DispatchError::Unreachable {
        detail: format!(
            "cannot reach {base_url} -- check api.base_url and that the server is running ({error})"
        ),
    }
}

/// Keeps the server's own `message` when the body is an envelope.
fn clean_error_response(status: StatusCode, body: &str) -> DispatchError {
    let message = serde_json::from_str::<Envelope>(body)
        .map(|envelope| envelope.message)
        .unwrap_or_default();
    DispatchError::Server {
        status: status.as_u16(),
        message,
    }
}
