//! reqwest implementation of [`BotmasterApi`].
//!
//! All calls are short, form-encoded POSTs (token fetch is the one GET)
//! against the Botmaster service. The binary message payload travels
//! percent-encoded inside the `msg` form field; success is recognized by
//! exact marker fragments in the response body, anything else counts as a
//! rejection.

use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;
use url::form_urlencoded;

use super::auth::{parse_token_response, AccessToken};
use super::{BotmasterApi, GatewayError, IMAGE_OK, IS_BOT_OK, RESULT_OK};

/// HTTP client for the Botmaster service.
#[derive(Debug, Clone)]
pub struct HttpBotmaster {
    client: reqwest::Client,
    bot_number: u64,
    base_url: String,
    api_version: String,
}

impl HttpBotmaster {
    /// Build a client for the given bot number.
    ///
    /// `base_url` is the service root (no trailing slash), normally
    /// [`DEFAULT_BASE_URL`](super::DEFAULT_BASE_URL).
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Request`] when the underlying client
    /// cannot be constructed.
    pub fn new(
        bot_number: u64,
        base_url: impl Into<String>,
        api_version: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, GatewayError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout)
            .build()?;
        Ok(Self {
            client,
            bot_number,
            base_url: base_url.into(),
            api_version: api_version.into(),
        })
    }

    fn endpoint(&self, name: &str) -> String {
        format!("{}/{}/{}", self.base_url, name, self.bot_number)
    }

    /// POST a form body to a service endpoint and return the response
    /// text.
    async fn post(
        &self,
        url: &str,
        token: &AccessToken,
        body: Vec<u8>,
    ) -> Result<String, GatewayError> {
        let response = self
            .client
            .post(url)
            .header("BotApi-Version", &self.api_version)
            .header("Token", &token.token)
            .header("Content-Type", "application/x-www-form-urlencoded")
            .body(body)
            .send()
            .await?
            .error_for_status()?;
        Ok(response.text().await?)
    }
}

/// Percent-encode arbitrary bytes for a form field value.
fn form_encode(bytes: &[u8]) -> String {
    form_urlencoded::byte_serialize(bytes).collect()
}

#[async_trait]
impl BotmasterApi for HttpBotmaster {
    async fn get_token(
        &self,
        username: &str,
        password: &str,
    ) -> Result<AccessToken, GatewayError> {
        let response = self
            .client
            .get(self.endpoint("getToken"))
            .basic_auth(username, Some(password))
            .header("BotApi-Version", &self.api_version)
            .send()
            .await?
            .error_for_status()?;
        let body = response.text().await?;
        let token = parse_token_response(&body)?;
        debug!(server = %token.server, "session token obtained");
        Ok(token)
    }

    async fn send_message(
        &self,
        token: &AccessToken,
        recipients: &[u64],
        send_to_offline: bool,
        payload: &[u8],
    ) -> Result<bool, GatewayError> {
        let to = recipients
            .iter()
            .map(u64::to_string)
            .collect::<Vec<_>>()
            .join(",");
        let body = format!("to={}&msg={}", to, form_encode(payload));

        let url = format!("https://{}/sendMessage/{}", token.server, self.bot_number);
        let response = self
            .client
            .post(&url)
            .header("BotApi-Version", &self.api_version)
            .header("Token", &token.token)
            .header("Send-to-offline", if send_to_offline { "1" } else { "0" })
            .header("Content-Type", "application/x-www-form-urlencoded")
            .body(body)
            .send()
            .await?
            .error_for_status()?;
        Ok(response.text().await?.contains(RESULT_OK))
    }

    async fn set_status(
        &self,
        token: &AccessToken,
        status_code: u8,
        description: &str,
    ) -> Result<bool, GatewayError> {
        let body = format!(
            "status={}&desc={}",
            status_code,
            form_encode(description.as_bytes())
        );
        let text = self
            .post(&self.endpoint("setStatus"), token, body.into_bytes())
            .await?;
        Ok(text.contains(RESULT_OK))
    }

    async fn image_exists(&self, token: &AccessToken, hash: &str) -> Result<bool, GatewayError> {
        let body = format!("hash={hash}");
        let text = self
            .post(&self.endpoint("existsImage"), token, body.into_bytes())
            .await?;
        Ok(text.contains(IMAGE_OK))
    }

    async fn upload_image(&self, token: &AccessToken, bytes: &[u8]) -> Result<bool, GatewayError> {
        let text = self
            .post(&self.endpoint("putImage"), token, bytes.to_vec())
            .await?;
        Ok(text.contains(IMAGE_OK))
    }

    async fn fetch_image(&self, token: &AccessToken, hash: &str) -> Result<Vec<u8>, GatewayError> {
        let body = format!("hash={hash}");
        let response = self
            .client
            .post(self.endpoint("getImage"))
            .header("BotApi-Version", &self.api_version)
            .header("Token", &token.token)
            .header("Content-Type", "application/x-www-form-urlencoded")
            .body(body)
            .send()
            .await?
            .error_for_status()?;
        Ok(response.bytes().await?.to_vec())
    }

    async fn is_bot(&self, token: &AccessToken, ggid: u64) -> Result<bool, GatewayError> {
        let body = format!("check_ggid={ggid}");
        let text = self
            .post(&self.endpoint("isBot"), token, body.into_bytes())
            .await?;
        Ok(text.contains(IS_BOT_OK))
    }
}
