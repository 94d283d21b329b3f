//! Session token acquisition and authorization state.
//!
//! A token is fetched once, up front, with HTTP basic credentials. A
//! failed fetch is not fatal: the connection simply holds no token and
//! every later operation short-circuits with a uniform
//! [`GatewayError::NotAuthorized`](super::GatewayError::NotAuthorized)
//! instead of attempting network calls.

use std::sync::OnceLock;

use regex::Regex;
use tracing::warn;

use super::{BotmasterApi, GatewayError};
use crate::credentials::Credentials;

/// A live Botmaster session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessToken {
    /// The session token, sent in the `Token` header.
    pub token: String,
    /// Host that accepts `sendMessage` for this session.
    pub server: String,
    /// Port reported alongside the server (kept for protocol
    /// compatibility, unused by the HTTP transport).
    pub port: u16,
}

/// Authorization state for a push connection.
#[derive(Debug, Clone)]
pub struct BotApiAuthorization {
    token: Option<AccessToken>,
}

impl BotApiAuthorization {
    /// Obtain a token using the `GG_USERNAME` / `GG_PASSWORD` credentials.
    ///
    /// Fetch failures are logged and leave the state unauthorized.
    pub async fn obtain(api: &dyn BotmasterApi, credentials: &Credentials) -> Self {
        let (Some(username), Some(password)) =
            (credentials.get("GG_USERNAME"), credentials.get("GG_PASSWORD"))
        else {
            warn!("GG_USERNAME/GG_PASSWORD not set, staying unauthorized");
            return Self { token: None };
        };

        match api.get_token(username, password).await {
            Ok(token) => Self { token: Some(token) },
            Err(error) => {
                warn!(%error, "token fetch failed, staying unauthorized");
                Self { token: None }
            }
        }
    }

    /// Build an already-authorized state from a token (tests, token
    /// caching).
    pub fn with_token(token: AccessToken) -> Self {
        Self { token: Some(token) }
    }

    /// An unauthorized state.
    pub fn unauthorized() -> Self {
        Self { token: None }
    }

    /// Whether a session token is held.
    pub fn is_authorized(&self) -> bool {
        self.token.is_some()
    }

    /// The held token, if any.
    pub fn access(&self) -> Option<&AccessToken> {
        self.token.as_ref()
    }
}

fn field_regex(cell: &'static OnceLock<Regex>, pattern: &str) -> &'static Regex {
    cell.get_or_init(|| Regex::new(pattern).expect("field pattern is valid"))
}

/// Extract token/server/port from a `getToken` response body.
///
/// The gateway answers with an XML fragment; the fields are pulled out
/// with the same three patterns the service has always been matched with.
///
/// # Errors
///
/// [`GatewayError::TokenParse`] when any field is missing or the port is
/// not a number.
pub fn parse_token_response(body: &str) -> Result<AccessToken, GatewayError> {
    static TOKEN: OnceLock<Regex> = OnceLock::new();
    static SERVER: OnceLock<Regex> = OnceLock::new();
    static PORT: OnceLock<Regex> = OnceLock::new();

    let token = field_regex(&TOKEN, r"<token>(.+?)</token>")
        .captures(body)
        .ok_or(GatewayError::TokenParse)?[1]
        .to_owned();
    let server = field_regex(&SERVER, r"<server>(.+?)</server>")
        .captures(body)
        .ok_or(GatewayError::TokenParse)?[1]
        .to_owned();
    let port = field_regex(&PORT, r"<port>(.+?)</port>")
        .captures(body)
        .ok_or(GatewayError::TokenParse)?[1]
        .parse()
        .map_err(|_| GatewayError::TokenParse)?;

    Ok(AccessToken {
        token,
        server,
        port,
    })
}
