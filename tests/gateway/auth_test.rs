//! Authorization lifecycle: token acquisition outcomes and the
//! response-parsing surface.

use std::collections::BTreeMap;

use async_trait::async_trait;
use gg_botapi::credentials::Credentials;
use gg_botapi::gateway::auth::{parse_token_response, AccessToken, BotApiAuthorization};
use gg_botapi::gateway::{BotmasterApi, GatewayError};

/// Token endpoint double: answers `get_token` with a canned outcome,
/// fails every other operation.
struct TokenEndpoint {
    outcome: Result<AccessToken, ()>,
}

#[async_trait]
impl BotmasterApi for TokenEndpoint {
    async fn get_token(
        &self,
        _username: &str,
        _password: &str,
    ) -> Result<AccessToken, GatewayError> {
        self.outcome.clone().map_err(|()| GatewayError::TokenParse)
    }

    async fn send_message(
        &self,
        _token: &AccessToken,
        _recipients: &[u64],
        _send_to_offline: bool,
        _payload: &[u8],
    ) -> Result<bool, GatewayError> {
        unreachable!("authorization never sends messages")
    }

    async fn set_status(
        &self,
        _token: &AccessToken,
        _status_code: u8,
        _description: &str,
    ) -> Result<bool, GatewayError> {
        unreachable!("authorization never sets status")
    }

    async fn image_exists(
        &self,
        _token: &AccessToken,
        _hash: &str,
    ) -> Result<bool, GatewayError> {
        unreachable!("authorization never checks images")
    }

    async fn upload_image(
        &self,
        _token: &AccessToken,
        _bytes: &[u8],
    ) -> Result<bool, GatewayError> {
        unreachable!("authorization never uploads images")
    }

    async fn fetch_image(
        &self,
        _token: &AccessToken,
        _hash: &str,
    ) -> Result<Vec<u8>, GatewayError> {
        unreachable!("authorization never fetches images")
    }

    async fn is_bot(&self, _token: &AccessToken, _ggid: u64) -> Result<bool, GatewayError> {
        unreachable!("authorization never queries bot registry")
    }
}

fn bot_credentials() -> Credentials {
    let mut vars = BTreeMap::new();
    vars.insert("GG_USERNAME".to_owned(), "bot".to_owned());
    vars.insert("GG_PASSWORD".to_owned(), "s3cret".to_owned());
    Credentials::from_map(vars)
}

#[tokio::test]
async fn successful_fetch_authorizes_the_connection() {
    let endpoint = TokenEndpoint {
        outcome: Ok(AccessToken {
            token: "tok".to_owned(),
            server: "bm.test".to_owned(),
            port: 8090,
        }),
    };
    let auth = BotApiAuthorization::obtain(&endpoint, &bot_credentials()).await;
    assert!(auth.is_authorized());
    assert_eq!(auth.access().expect("authorized").server, "bm.test");
}

#[tokio::test]
async fn failed_fetch_leaves_the_state_unauthorized() {
    let endpoint = TokenEndpoint { outcome: Err(()) };
    let auth = BotApiAuthorization::obtain(&endpoint, &bot_credentials()).await;
    assert!(!auth.is_authorized());
    assert!(auth.access().is_none());
}

#[tokio::test]
async fn missing_credentials_skip_the_token_fetch() {
    // get_token would panic the double; the missing-credentials path must
    // return before reaching it.
    let endpoint = TokenEndpoint { outcome: Err(()) };
    let auth = BotApiAuthorization::obtain(&endpoint, &Credentials::default()).await;
    assert!(!auth.is_authorized());
}

#[test]
fn token_response_fields_are_extracted() {
    let body = "<xml><botmaster><token>77e21fd0</token>\
                <server>botmaster.gadu-gadu.pl</server><port>8090</port>\
                </botmaster></xml>";
    let token = parse_token_response(body).expect("complete response");
    assert_eq!(token.token, "77e21fd0");
    assert_eq!(token.server, "botmaster.gadu-gadu.pl");
    assert_eq!(token.port, 8090);
}

#[test]
fn garbage_response_is_a_token_parse_error() {
    assert!(matches!(
        parse_token_response("<html>502 Bad Gateway</html>"),
        Err(GatewayError::TokenParse)
    ));
}
