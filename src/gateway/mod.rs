//! Botmaster gateway layer.
//!
//! Defines the [`BotmasterApi`] trait — the raw HTTP operations the
//! Botmaster service exposes — and [`PushConnection`], the orchestration
//! on top of it: token-gated access, dedup-before-upload for image
//! attachments, and strictly sequential delivery with partial-failure
//! reporting.
//!
//! One implementation exists, [`http::HttpBotmaster`]; tests substitute
//! their own.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::message::MessageBuilder;

pub mod auth;
pub mod http;

use auth::{AccessToken, BotApiAuthorization};

/// Protocol version string sent in the `BotApi-Version` header.
pub const BOTAPI_VERSION: &str = "GGBotApi-2.4-Rust";

/// Default Botmaster service base URL.
pub const DEFAULT_BASE_URL: &str = "https://botapi.gadu-gadu.pl/botmaster";

/// Response marker confirming a send or status change.
pub const RESULT_OK: &str = "<result><status>0</status></result>";

/// Response marker confirming an image exists/upload operation.
pub const IMAGE_OK: &str = "<result><status>0</status><hash>";

/// Response marker confirming a number is a bot.
pub const IS_BOT_OK: &str = "<result><status>1</status></result>";

/// Errors from the gateway layer.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// HTTP transport failure.
    #[error("gateway request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// No valid session token; nothing was attempted on the network.
    #[error("not authorized: no valid session token")]
    NotAuthorized,

    /// The token response lacked one of token/server/port.
    #[error("token response missing token, server or port")]
    TokenParse,

    /// An absent image could not be uploaded, making the referencing
    /// message undeliverable.
    #[error("image {hash} could not be uploaded")]
    ImageUpload {
        /// Content hash of the undeliverable image.
        hash: String,
    },

    /// The gateway answered without the expected success marker.
    #[error("gateway rejected {endpoint} request")]
    Rejected {
        /// The endpoint that did not confirm.
        endpoint: &'static str,
    },
}

/// Bot presence status kinds, as understood by the `setStatus` endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusKind {
    /// Back/available.
    Back,
    /// Away.
    Away,
    /// Free for chat.
    FreeForChat,
    /// Do not disturb.
    DoNotDisturb,
    /// Invisible.
    Invisible,
}

/// Numeric status code for a kind plus description; the gateway uses a
/// different code when a non-empty description accompanies the status.
/// `None` clears the status (code 0).
pub fn status_code(kind: Option<StatusKind>, description: &str) -> u8 {
    let with_description = !description.is_empty();
    match kind {
        Some(StatusKind::Away) => {
            if with_description {
                5
            } else {
                3
            }
        }
        Some(StatusKind::FreeForChat) => {
            if with_description {
                24
            } else {
                23
            }
        }
        Some(StatusKind::Back) => {
            if with_description {
                4
            } else {
                2
            }
        }
        Some(StatusKind::DoNotDisturb) => {
            if with_description {
                34
            } else {
                33
            }
        }
        Some(StatusKind::Invisible) => {
            if with_description {
                22
            } else {
                20
            }
        }
        None => 0,
    }
}

/// Raw Botmaster HTTP operations.
///
/// Boolean results mean "the gateway confirmed the operation"; transport
/// and HTTP-level failures surface as [`GatewayError`]. Implementations
/// must be `Send + Sync` so a connection can be shared across tasks.
#[async_trait]
pub trait BotmasterApi: Send + Sync {
    /// Fetch a session token using HTTP basic credentials.
    async fn get_token(
        &self,
        username: &str,
        password: &str,
    ) -> Result<AccessToken, GatewayError>;

    /// POST an assembled message payload to the token's server.
    async fn send_message(
        &self,
        token: &AccessToken,
        recipients: &[u64],
        send_to_offline: bool,
        payload: &[u8],
    ) -> Result<bool, GatewayError>;

    /// Set the bot's presence status.
    async fn set_status(
        &self,
        token: &AccessToken,
        status_code: u8,
        description: &str,
    ) -> Result<bool, GatewayError>;

    /// Whether the remote store already holds an image with this hash.
    async fn image_exists(&self, token: &AccessToken, hash: &str) -> Result<bool, GatewayError>;

    /// Upload image bytes to the remote store.
    async fn upload_image(&self, token: &AccessToken, bytes: &[u8]) -> Result<bool, GatewayError>;

    /// Download an image from the remote store by hash.
    async fn fetch_image(&self, token: &AccessToken, hash: &str) -> Result<Vec<u8>, GatewayError>;

    /// Whether a GG number is registered as a bot.
    async fn is_bot(&self, token: &AccessToken, ggid: u64) -> Result<bool, GatewayError>;
}

/// Per-message failure inside a batch push.
#[derive(Debug)]
pub struct PushFailure {
    /// Index of the failed message within the submitted batch.
    pub index: usize,
    /// Why it failed.
    pub error: GatewayError,
}

/// Outcome of a batch push: how many messages the gateway confirmed, and
/// what went wrong with the rest. Delivered messages are never rolled
/// back by later failures.
#[derive(Debug, Default)]
pub struct PushReport {
    /// Count of messages the gateway confirmed.
    pub delivered: usize,
    /// Failures, in batch order.
    pub failures: Vec<PushFailure>,
}

impl PushReport {
    /// Whether every message in the batch was confirmed.
    pub fn all_delivered(&self) -> bool {
        self.failures.is_empty()
    }
}

/// An authorized push channel to the Botmaster.
pub struct PushConnection {
    api: Arc<dyn BotmasterApi>,
    auth: BotApiAuthorization,
}

impl PushConnection {
    /// Build a connection over an API implementation and an authorization
    /// state (which may be unauthorized; every operation then fails with
    /// [`GatewayError::NotAuthorized`] without touching the network).
    pub fn new(api: Arc<dyn BotmasterApi>, auth: BotApiAuthorization) -> Self {
        Self { api, auth }
    }

    /// Whether a session token is held.
    pub fn is_authorized(&self) -> bool {
        self.auth.is_authorized()
    }

    fn token(&self) -> Result<&AccessToken, GatewayError> {
        self.auth.access().ok_or(GatewayError::NotAuthorized)
    }

    /// Deliver a batch of messages, strictly one after another.
    ///
    /// Each message's images are confirmed present on the remote store
    /// (existence check, then upload when absent) before its payload is
    /// sent; a message whose image cannot be uploaded is undeliverable
    /// and is skipped, the batch continues. The report carries the
    /// delivered count and the per-message failures.
    ///
    /// The existence check and the upload are two separate requests:
    /// independent senders racing on the same hash may both upload. The
    /// race is idempotent (identical content, identical hash) and is left
    /// as is.
    ///
    /// # Errors
    ///
    /// [`GatewayError::NotAuthorized`] when no session token is held;
    /// per-message errors are reported, not returned.
    pub async fn push(&self, messages: &[MessageBuilder]) -> Result<PushReport, GatewayError> {
        let token = self.token()?;

        let mut report = PushReport::default();
        for (index, message) in messages.iter().enumerate() {
            match self.deliver(token, message).await {
                Ok(()) => report.delivered += 1,
                Err(error) => {
                    warn!(index, %error, "message not delivered");
                    report.failures.push(PushFailure { index, error });
                }
            }
        }
        info!(
            delivered = report.delivered,
            failed = report.failures.len(),
            "push finished"
        );
        Ok(report)
    }

    /// Deliver a single message.
    ///
    /// # Errors
    ///
    /// [`GatewayError::NotAuthorized`] without a token, otherwise the
    /// first image or send failure.
    pub async fn push_one(&self, message: &MessageBuilder) -> Result<(), GatewayError> {
        let token = self.token()?;
        self.deliver(token, message).await
    }

    async fn deliver(
        &self,
        token: &AccessToken,
        message: &MessageBuilder,
    ) -> Result<(), GatewayError> {
        for (hash, bytes) in message.images() {
            if self.api.image_exists(token, hash).await? {
                debug!(hash, "image already on remote store");
                continue;
            }
            if !self.api.upload_image(token, bytes).await? {
                return Err(GatewayError::ImageUpload { hash: hash.clone() });
            }
            debug!(hash, len = bytes.len(), "image uploaded");
        }

        let payload = message.protocol_message();
        let confirmed = self
            .api
            .send_message(token, message.recipients(), message.send_to_offline(), &payload)
            .await?;
        if !confirmed {
            return Err(GatewayError::Rejected {
                endpoint: "sendMessage",
            });
        }
        Ok(())
    }

    /// Set the bot's presence status and description.
    ///
    /// # Errors
    ///
    /// [`GatewayError::NotAuthorized`] without a token, transport errors
    /// otherwise; `Ok(false)` when the gateway did not confirm.
    pub async fn set_status(
        &self,
        kind: Option<StatusKind>,
        description: &str,
    ) -> Result<bool, GatewayError> {
        let token = self.token()?;
        self.api
            .set_status(token, status_code(kind, description), description)
            .await
    }

    /// Download an attached image back from the remote store.
    ///
    /// # Errors
    ///
    /// [`GatewayError::NotAuthorized`] without a token, transport errors
    /// otherwise.
    pub async fn fetch_image(&self, hash: &str) -> Result<Vec<u8>, GatewayError> {
        let token = self.token()?;
        self.api.fetch_image(token, hash).await
    }

    /// Whether a GG number is registered as a bot.
    ///
    /// # Errors
    ///
    /// [`GatewayError::NotAuthorized`] without a token, transport errors
    /// otherwise.
    pub async fn is_bot(&self, ggid: u64) -> Result<bool, GatewayError> {
        let token = self.token()?;
        self.api.is_bot(token, ggid).await
    }
}
