//! Request identity.
//!
//! Authentication happens upstream of this server. The identity layer forwards the signed-in customer in the
//! `sf-user-id` and `sf-user-name` headers, and the browser's cart session in `sf-session-id`. Handlers take a
//! [`Customer`] or a [`SessionId`] as an argument to require them.
use actix_web::{dev::Payload, http::header::HeaderMap, FromRequest, HttpRequest};
use futures::future::{ready, Ready};
use log::*;

use crate::errors::ServerError;

pub const USER_ID_HEADER: &str = "sf-user-id";
pub const USER_NAME_HEADER: &str = "sf-user-name";
pub const SESSION_ID_HEADER: &str = "sf-session-id";

/// The signed-in customer making the request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Customer {
    pub user_id: String,
    pub user_name: String,
}

impl Customer {
    fn from_headers(headers: &HeaderMap) -> Option<Self> {
        let user_id = header_value(headers, USER_ID_HEADER)?;
        let user_name = header_value(headers, USER_NAME_HEADER).unwrap_or_else(|| user_id.clone());
        Some(Self { user_id, user_name })
    }
}

impl FromRequest for Customer {
    type Error = ServerError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        let result = Customer::from_headers(req.headers()).ok_or_else(|| {
            debug!("💻️ {} {} was called without a customer identity", req.method(), req.path());
            ServerError::MissingIdentity
        });
        ready(result)
    }
}

/// The opaque id of the session that owns a cart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionId(pub String);

impl SessionId {
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl FromRequest for SessionId {
    type Error = ServerError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        let result = header_value(req.headers(), SESSION_ID_HEADER).map(SessionId).ok_or(ServerError::MissingSession);
        ready(result)
    }
}

fn header_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(String::from)
}
