use std::{fmt, time::Duration};

use reqwest::{
    Client, Url,
    header::{AUTHORIZATION, HeaderMap, HeaderValue},
};
use tracing::{debug, info, warn};

use crate::{
    dispatcher::{Ack, AttestationPayload, Dispatch},
    error::{ConfigError, DeliveryError},
    normalizer::NormalizedEvent,
};

/// Default total timeout for a single attestation request.
pub const DEFAULT_DISPATCH_TIMEOUT: Duration = Duration::from_secs(10);

/// Connection settings for the oracle attestation API.
#[derive(Clone, PartialEq, Eq)]
pub struct OracleClientConfig {
    pub endpoint: Url,
    pub api_key: String,
    pub timeout: Duration,
}

impl fmt::Debug for OracleClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OracleClientConfig")
            .field("endpoint", &self.endpoint.as_str())
            .field("api_key", &"<redacted>")
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// HTTP client that posts attestations to the oracle.
///
/// Cloning is cheap and clones share the underlying connection pool.
#[derive(Debug, Clone)]
pub struct OracleClient {
    client: Client,
    endpoint: Url,
}

impl OracleClient {
    /// Build a client with the bearer token and timeout baked into every request.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidApiKey`] if the key cannot be sent as a header value, or
    /// [`ConfigError::HttpClient`] if the TLS backend fails to initialize.
    pub fn new(config: OracleClientConfig) -> Result<Self, ConfigError> {
        let mut auth = HeaderValue::from_str(&format!("Bearer {}", config.api_key))
            .map_err(|_| ConfigError::InvalidApiKey)?;
        auth.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, auth);

        let client = Client::builder()
            .default_headers(headers)
            .timeout(config.timeout)
            .build()
            .map_err(|e| ConfigError::HttpClient(e.to_string()))?;

        Ok(Self { client, endpoint: config.endpoint })
    }
}

impl Dispatch for OracleClient {
    async fn dispatch(&self, event: &NormalizedEvent) -> Result<Ack, DeliveryError> {
        let payload = AttestationPayload::from(event);
        debug!(tx_hash = %event.tx_hash, endpoint = %self.endpoint, "Submitting attestation");

        let response = self.client.post(self.endpoint.clone()).json(&payload).send().await?;
        let status = response.status();

        // The status line is the oracle's verdict; an unreadable success body does not undo it.
        if status.is_success() {
            let text = response.text().await;
            if let Err(e) = &text {
                debug!(tx_hash = %event.tx_hash, error = %e, "Could not read oracle response body");
            }
            let text = text.unwrap_or_default();
            let body = serde_json::from_str(&text).ok();
            info!(
                tx_hash = %event.tx_hash,
                nonce = %event.args.nonce,
                status = status.as_u16(),
                response = %text,
                "Attestation accepted by oracle"
            );
            return Ok(Ack { status: status.as_u16(), body });
        }

        let text = response.text().await?;
        warn!(
            tx_hash = %event.tx_hash,
            status = status.as_u16(),
            body = %text,
            "Oracle refused attestation"
        );
        if status.is_server_error() {
            Err(DeliveryError::ServerError { status: status.as_u16(), body: text })
        } else {
            Err(DeliveryError::ClientError { status: status.as_u16(), body: text })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{normalizer::normalize, test_utils::transfer_event};
    use serde_json::json;
    use tokio::{
        io::{AsyncReadExt, AsyncWriteExt},
        net::TcpListener,
    };
    use wiremock::{
        Mock, MockServer, ResponseTemplate,
        matchers::{body_json, header, method, path},
    };

    fn client_for(server: &MockServer, timeout: Duration) -> anyhow::Result<OracleClient> {
        Ok(OracleClient::new(OracleClientConfig {
            endpoint: format!("{}/attest", server.uri()).parse()?,
            api_key: "test-key".into(),
            timeout,
        })?)
    }

    fn event() -> anyhow::Result<NormalizedEvent> {
        Ok(normalize(&transfer_event(11, 1_234))?)
    }

    #[tokio::test]
    async fn posts_payload_with_bearer_token() -> anyhow::Result<()> {
        let server = MockServer::start().await;
        let event = event()?;
        let expected_body = serde_json::to_value(AttestationPayload::from(&event))?;
        Mock::given(method("POST"))
            .and(path("/attest"))
            .and(header("authorization", "Bearer test-key"))
            .and(header("content-type", "application/json"))
            .and(body_json(&expected_body))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": "att-1" })))
            .expect(1)
            .mount(&server)
            .await;

        let ack = client_for(&server, DEFAULT_DISPATCH_TIMEOUT)?.dispatch(&event).await?;

        assert_eq!(ack, Ack { status: 200, body: Some(json!({ "id": "att-1" })) });
        Ok(())
    }

    #[tokio::test]
    async fn non_json_success_body_is_accepted() -> anyhow::Result<()> {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(202).set_body_string("queued"))
            .mount(&server)
            .await;

        let ack = client_for(&server, DEFAULT_DISPATCH_TIMEOUT)?.dispatch(&event()?).await?;

        assert_eq!(ack, Ack { status: 202, body: None });
        Ok(())
    }

    #[tokio::test]
    async fn truncated_success_body_is_still_accepted() -> anyhow::Result<()> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let oracle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await?;
            let mut request = vec![0u8; 64 * 1024];
            let _ = socket.read(&mut request).await?;
            // Promise 100 bytes, send 5, then hang up.
            socket
                .write_all(b"HTTP/1.1 200 OK\r\nContent-Length: 100\r\n\r\nhello")
                .await?;
            socket.shutdown().await?;
            let _ = socket.read_to_end(&mut Vec::new()).await;
            std::io::Result::Ok(())
        });
        let client = OracleClient::new(OracleClientConfig {
            endpoint: format!("http://{addr}/attest").parse()?,
            api_key: "test-key".into(),
            timeout: DEFAULT_DISPATCH_TIMEOUT,
        })?;

        let ack = client.dispatch(&event()?).await?;

        assert_eq!(ack, Ack { status: 200, body: None });
        oracle.await??;
        Ok(())
    }

    #[tokio::test]
    async fn server_error_is_reported() -> anyhow::Result<()> {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&server)
            .await;

        let result = client_for(&server, DEFAULT_DISPATCH_TIMEOUT)?.dispatch(&event()?).await;

        assert_eq!(result, Err(DeliveryError::ServerError { status: 500, body: "boom".into() }));
        Ok(())
    }

    #[tokio::test]
    async fn client_error_is_reported() -> anyhow::Result<()> {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(400).set_body_string("bad nonce"))
            .mount(&server)
            .await;

        let result = client_for(&server, DEFAULT_DISPATCH_TIMEOUT)?.dispatch(&event()?).await;

        assert_eq!(
            result,
            Err(DeliveryError::ClientError { status: 400, body: "bad nonce".into() })
        );
        Ok(())
    }

    #[tokio::test]
    async fn slow_oracle_times_out() -> anyhow::Result<()> {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_millis(500)))
            .mount(&server)
            .await;

        let result = client_for(&server, Duration::from_millis(50))?.dispatch(&event()?).await;

        assert_eq!(result, Err(DeliveryError::Timeout));
        Ok(())
    }

    #[tokio::test]
    async fn unreachable_oracle_is_connection_error() -> anyhow::Result<()> {
        let client = OracleClient::new(OracleClientConfig {
            endpoint: "http://127.0.0.1:1/attest".parse()?,
            api_key: "test-key".into(),
            timeout: DEFAULT_DISPATCH_TIMEOUT,
        })?;

        let result = client.dispatch(&event()?).await;

        assert!(matches!(result, Err(DeliveryError::Connection(_))));
        Ok(())
    }

    #[test]
    fn api_key_with_newline_is_rejected() -> anyhow::Result<()> {
        let result = OracleClient::new(OracleClientConfig {
            endpoint: "http://localhost/attest".parse()?,
            api_key: "bad\nkey".into(),
            timeout: DEFAULT_DISPATCH_TIMEOUT,
        });

        assert!(matches!(result, Err(ConfigError::InvalidApiKey)));
        Ok(())
    }

    #[test]
    fn debug_output_redacts_api_key() -> anyhow::Result<()> {
        let config = OracleClientConfig {
            endpoint: "http://localhost/attest".parse()?,
            api_key: "super-secret".into(),
            timeout: DEFAULT_DISPATCH_TIMEOUT,
        };

        assert!(!format!("{config:?}").contains("super-secret"));
        Ok(())
    }
}
