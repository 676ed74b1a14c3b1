// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

//! Request intents and the dispatcher seam every controller talks through.

use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::fmt;

pub const PROTECTED_PREFIX: &str = "/protected";
pub const UNABLE_TO_CONNECT: &str = "Unable to connect to the server";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Patch,
    Put,
    Delete,
}

impl Method {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Patch => "PATCH",
            Self::Put => "PUT",
            Self::Delete => "DELETE",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PartValue {
    Text(String),
    File {
        file_name: String,
        mime_type: String,
        bytes: Vec<u8>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormPart {
    pub name: String,
    pub value: PartValue,
}

impl FormPart {
    pub fn text(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: PartValue::Text(value.into()),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    None,
    Json(Value),
    Multipart(Vec<FormPart>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub method: Method,
    /// Path below the API root, for example `/protected/sector/4`.
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: RequestBody,
}

impl ApiRequest {
    fn protected(method: Method, endpoint: &str, id: Option<&str>, body: RequestBody) -> Self {
        let endpoint = endpoint.trim_matches('/');
        let path = match id {
            Some(id) => format!("{PROTECTED_PREFIX}/{endpoint}/{id}"),
            None => format!("{PROTECTED_PREFIX}/{endpoint}"),
        };
        Self {
            method,
            path,
            query: Vec::new(),
            body,
        }
    }

    pub fn list(endpoint: &str) -> Self {
        Self::protected(Method::Get, endpoint, None, RequestBody::None)
    }

    pub fn create(endpoint: &str, body: RequestBody) -> Self {
        Self::protected(Method::Post, endpoint, None, body)
    }

    pub fn patch(endpoint: &str, id: impl fmt::Display, body: Value) -> Self {
        Self::protected(
            Method::Patch,
            endpoint,
            Some(&id.to_string()),
            RequestBody::Json(body),
        )
    }

    pub fn put(endpoint: &str, id: impl fmt::Display, parts: Vec<FormPart>) -> Self {
        Self::protected(
            Method::Put,
            endpoint,
            Some(&id.to_string()),
            RequestBody::Multipart(parts),
        )
    }

    pub fn delete(endpoint: &str, id: impl fmt::Display) -> Self {
        Self::protected(
            Method::Delete,
            endpoint,
            Some(&id.to_string()),
            RequestBody::None,
        )
    }

    pub fn auth(method: Method, action: &str, body: RequestBody) -> Self {
        Self {
            method,
            path: format!("/auth/{}", action.trim_matches('/')),
            query: Vec::new(),
            body,
        }
    }

    pub fn with_query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Envelope {
    #[serde(default)]
    pub data: Value,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub success: bool,
}

impl Envelope {
    pub fn decode_data<T: DeserializeOwned>(&self) -> Result<T, DispatchError> {
        serde_json::from_value(self.data.clone()).map_err(|error| DispatchError::Decode {
            message: error.to_string(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DispatchError {
    #[error("unable to connect to the server ({detail})")]
    Unreachable { detail: String },
    #[error("server error ({status}): {message}")]
    Server { status: u16, message: String },
    #[error("request rejected: {message}")]
    Rejected { message: String },
    #[error("decode response: {message}")]
    Decode { message: String },
}

impl DispatchError {
    /// Text suitable for a toast: the server's own message when there is one.
    pub fn user_message(&self) -> String {
        match self {
            Self::Server { message, .. } | Self::Rejected { message } if !message.is_empty() => {
                message.clone()
            }
            _ => UNABLE_TO_CONNECT.to_owned(),
        }
    }
}

pub trait Dispatcher: Sync {
    fn dispatch(&self, request: &ApiRequest) -> Result<Envelope, DispatchError>;
}

impl<D: Dispatcher + ?Sized> Dispatcher for &D {
    fn dispatch(&self, request: &ApiRequest) -> Result<Envelope, DispatchError> {
        (**self).dispatch(request)
    }
}
