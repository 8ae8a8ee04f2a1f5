//! OAuth2 client-credentials grant against Bitbucket's token endpoint.
//!
//! The consumer key and secret are sent with HTTP Basic authentication and
//! exchanged for a short-lived bearer token. There is no user interaction and
//! no refresh: a run lasts far less than the token lifetime.

use base64::Engine;
use serde::Deserialize;

use super::error::{BitbucketError, Result};
use crate::http::{HttpMethod, HttpRequest, HttpTransport};

/// Bitbucket Cloud token endpoint.
pub const DEFAULT_TOKEN_URL: &str = "https://bitbucket.org/site/oauth2/access_token";

/// Response from a successful token exchange.
#[derive(Clone, Deserialize)]
pub struct AccessTokenResponse {
    /// The OAuth access token.
    pub access_token: String,

    /// The token type (usually "bearer").
    #[serde(default)]
    pub token_type: Option<String>,

    /// Lifetime in seconds.
    #[serde(default)]
    pub expires_in: Option<u64>,

    #[serde(default)]
    pub refresh_token: Option<String>,

    /// Space-separated scopes granted to the consumer.
    #[serde(default)]
    pub scopes: Option<String>,
}

impl std::fmt::Debug for AccessTokenResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccessTokenResponse")
            .field("access_token", &"[REDACTED]")
            .field("token_type", &self.token_type)
            .field("expires_in", &self.expires_in)
            .field(
                "refresh_token",
                &self.refresh_token.as_ref().map(|_| "[REDACTED]"),
            )
            .field("scopes", &self.scopes)
            .finish()
    }
}

/// Error response from the token endpoint.
#[derive(Debug, Deserialize)]
struct TokenErrorResponse {
    error: String,
    #[serde(default)]
    error_description: Option<String>,
}

/// Exchange client credentials for an access token.
pub async fn client_credentials(
    transport: &dyn HttpTransport,
    token_url: &str,
    client_id: &str,
    client_secret: &str,
) -> Result<AccessTokenResponse> {
    let basic = base64::engine::general_purpose::STANDARD
        .encode(format!("{client_id}:{client_secret}"));
    let body = url::form_urlencoded::Serializer::new(String::new())
        .append_pair("grant_type", "client_credentials")
        .finish();

    let request = HttpRequest {
        method: HttpMethod::Post,
        url: token_url.to_string(),
        headers: vec![
            ("Accept".to_string(), "application/json".to_string()),
            (
                "Content-Type".to_string(),
                "application/x-www-form-urlencoded".to_string(),
            ),
            ("Authorization".to_string(), format!("Basic {basic}")),
        ],
        body: body.into_bytes(),
    };

    let response = transport.send(request).await?;
    let text = response.body_text();

    if !response.is_success() {
        if let Ok(err) = serde_json::from_str::<TokenErrorResponse>(&text) {
            return Err(BitbucketError::Auth(
                err.error_description.unwrap_or(err.error),
            ));
        }
        return Err(BitbucketError::Auth(format!(
            "Token exchange failed ({}): {}",
            response.status, text
        )));
    }

    serde_json::from_str::<AccessTokenResponse>(&text)
        .map_err(|e| BitbucketError::Auth(format!("Failed to parse token response: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::{HttpResponse, MockTransport};

    const TOKEN_URL: &str = "https://bitbucket.test/site/oauth2/access_token";

    fn respond(transport: &MockTransport, status: u16, body: &str) {
        transport.push_response(
            HttpMethod::Post,
            TOKEN_URL,
            HttpResponse {
                status,
                body: body.as_bytes().to_vec(),
            },
        );
    }

    #[tokio::test]
    async fn sends_basic_auth_and_grant_type() {
        let transport = MockTransport::new();
        respond(
            &transport,
            200,
            r#"{"access_token":"tok","token_type":"bearer","expires_in":7200,"scopes":"repository"}"#,
        );

        let token = client_credentials(&transport, TOKEN_URL, "key", "secret")
            .await
            .unwrap();
        assert_eq!(token.access_token, "tok");
        assert_eq!(token.expires_in, Some(7200));

        let request = &transport.requests()[0];
        assert_eq!(request.method, HttpMethod::Post);
        assert_eq!(request.body, b"grant_type=client_credentials".to_vec());
        // "key:secret"
        assert!(
            request
                .headers
                .contains(&("Authorization".to_string(), "Basic a2V5OnNlY3JldA==".to_string()))
        );
    }

    #[tokio::test]
    async fn surfaces_error_description() {
        let transport = MockTransport::new();
        respond(
            &transport,
            400,
            r#"{"error":"invalid_client","error_description":"Invalid OAuth client credentials"}"#,
        );

        let err = client_credentials(&transport, TOKEN_URL, "key", "bad")
            .await
            .unwrap_err();
        match err {
            BitbucketError::Auth(message) => {
                assert_eq!(message, "Invalid OAuth client credentials")
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn non_json_failure_keeps_status_and_body() {
        let transport = MockTransport::new();
        respond(&transport, 503, "upstream down");

        let err = client_credentials(&transport, TOKEN_URL, "key", "secret")
            .await
            .unwrap_err();
        let message = err.to_string();
        assert!(message.contains("503"), "{message}");
        assert!(message.contains("upstream down"), "{message}");
    }

    #[test]
    fn debug_redacts_tokens() {
        let token = AccessTokenResponse {
            access_token: "super-secret".into(),
            token_type: Some("bearer".into()),
            expires_in: None,
            refresh_token: Some("also-secret".into()),
            scopes: None,
        };
        let debug = format!("{token:?}");
        assert!(!debug.contains("super-secret"));
        assert!(!debug.contains("also-secret"));
    }
}
