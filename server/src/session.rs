// SPDX-FileCopyrightText: 2025 Phoenix R&D GmbH <hello@phnx.im>
//
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Signed session tokens.
//!
//! A token is issued on login and sent back either in the `user` cookie or as
//! a bearer token. Its subject is the username.

use std::{sync::Arc, time::Duration};

use axum::{
    extract::{FromRef, FromRequestParts},
    http::{HeaderMap, header, request::Parts},
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use chrono::Utc;
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use ledgerbackend::settings::AuthSettings;
use ledgercommon::messages::SESSION_COOKIE;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::ApiError;

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    sub: String,
    iat: i64,
    exp: i64,
}

#[derive(Clone)]
pub struct SessionKeys {
    inner: Arc<SessionKeysInner>,
}

struct SessionKeysInner {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
}

impl SessionKeys {
    pub fn new(settings: &AuthSettings) -> Self {
        let secret = settings.jwt_secret.as_ref();
        Self {
            inner: Arc::new(SessionKeysInner {
                encoding: EncodingKey::from_secret(secret),
                decoding: DecodingKey::from_secret(secret),
                ttl: settings.session_ttl,
            }),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.inner.ttl
    }

    pub fn issue(&self, username: &str) -> Result<String, jsonwebtoken::errors::Error> {
        let now = Utc::now().timestamp();
        let ttl = i64::try_from(self.inner.ttl.as_secs()).unwrap_or(i64::MAX);
        let claims = Claims {
            sub: username.to_owned(),
            iat: now,
            exp: now.saturating_add(ttl),
        };
        encode(&Header::default(), &claims, &self.inner.encoding)
    }

    /// Returns the username of a valid, unexpired token.
    pub fn verify(&self, token: &str) -> Option<String> {
        match decode::<Claims>(token, &self.inner.decoding, &Validation::default()) {
            Ok(data) => Some(data.claims.sub),
            Err(error) => {
                debug!(%error, "Rejected session token");
                None
            }
        }
    }

    /// HTTP only cookie holding the token for as long as the token is valid.
    pub fn session_cookie(&self, token: String) -> Cookie<'static> {
        let max_age = i64::try_from(self.inner.ttl.as_secs()).unwrap_or(i64::MAX);
        session_cookie_builder(token, time::Duration::seconds(max_age))
    }

    /// Overwrites the session cookie with an empty one that expires at once.
    pub fn expired_cookie() -> Cookie<'static> {
        session_cookie_builder(String::new(), time::Duration::ZERO)
    }
}

fn session_cookie_builder(value: String, max_age: time::Duration) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, value))
        .http_only(true)
        .path("/")
        .same_site(SameSite::Lax)
        .max_age(max_age)
        .build()
}

fn session_token(headers: &HeaderMap) -> Option<String> {
    let bearer = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(|token| token.trim().to_owned());
    bearer.or_else(|| {
        CookieJar::from_headers(headers)
            .get(SESSION_COOKIE)
            .map(|cookie| cookie.value().to_owned())
    })
}

/// Username of the signed in user making the request.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser(pub String);

impl<S> FromRequestParts<S> for AuthenticatedUser
where
    SessionKeys: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let keys = SessionKeys::from_ref(state);
        session_token(&parts.headers)
            .and_then(|token| keys.verify(&token))
            .map(AuthenticatedUser)
            .ok_or_else(ApiError::unauthorized)
    }
}
