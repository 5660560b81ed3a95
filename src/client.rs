//! The entry point for talking to Perplexity Labs.
//!
//! A [`Client`] holds the endpoints, HTTP client, cookie jar and TLS profile
//! for one run. [`Client::connect`] negotiates a session and hands back an
//! upgraded [`Connection`].

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use reqwest::Client as ReqwestClient;
use reqwest::cookie::Jar;
use rustls::ClientConfig;
use url::Url;

use crate::client_logger::FrameLogger;
use crate::connection::Connection;
use crate::error::{Error, Result};
use crate::tls;

/// Polling endpoint of the Labs socket.io server.
pub const DEFAULT_API_URL: &str = "https://labs-api.perplexity.ai/socket.io/";

/// WebSocket endpoint of the Labs socket.io server.
pub const DEFAULT_WS_URL: &str = "wss://labs-api.perplexity.ai/socket.io/";

/// User agent presented on every request.
pub const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:123.0) Gecko/20100101 Firefox/123.0";

const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(25);

/// Endpoints and HTTP settings for a [`Client`].
#[derive(Debug, Clone)]
pub struct ClientOptions {
    /// Polling endpoint used for the handshake.
    pub api_url: String,
    /// WebSocket endpoint used after the handshake.
    pub ws_url: String,
    /// User agent for HTTP requests and the WebSocket upgrade.
    pub user_agent: String,
    /// Timeout applied to each handshake request.
    pub http_timeout: Duration,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            ws_url: DEFAULT_WS_URL.to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            http_timeout: DEFAULT_HTTP_TIMEOUT,
        }
    }
}

/// Client for the Perplexity Labs socket.io service.
///
/// A client owns the per-run state the service ties a session to: a random
/// connection tag, the cookie jar filled during negotiation, and the pinned
/// TLS profile. Construct one client per run; reconnecting requires a new one.
#[derive(Clone)]
pub struct Client {
    pub(crate) options: ClientOptions,
    pub(crate) http: ReqwestClient,
    pub(crate) jar: Arc<Jar>,
    pub(crate) tls: Arc<ClientConfig>,
    pub(crate) tag: String,
    pub(crate) logger: Option<Arc<dyn FrameLogger>>,
}

impl Client {
    /// Create a new client for the public Labs endpoint.
    pub fn new() -> Result<Self> {
        Self::with_options(ClientOptions::default())
    }

    /// Create a new client with custom settings.
    pub fn with_options(options: ClientOptions) -> Result<Self> {
        Url::parse(&options.api_url)?;
        Url::parse(&options.ws_url)?;

        let tls = Arc::new(tls::pinned_client_config()?);
        let jar = Arc::new(Jar::default());
        let http = ReqwestClient::builder()
            .use_preconfigured_tls(ClientConfig::clone(&tls))
            .cookie_provider(Arc::clone(&jar))
            .user_agent(options.user_agent.clone())
            .timeout(options.http_timeout)
            .build()
            .map_err(|e| {
                Error::transport(
                    format!("Failed to build HTTP client: {e}"),
                    Some(Box::new(e)),
                )
            })?;

        Ok(Self {
            options,
            http,
            jar,
            tls,
            tag: new_connection_tag(),
            logger: None,
        })
    }

    /// Install a logger that sees every frame on connections opened later.
    pub fn with_frame_logger(mut self, logger: Arc<dyn FrameLogger>) -> Self {
        self.logger = Some(logger);
        self
    }

    /// The random tag identifying this client to the polling endpoint.
    pub fn tag(&self) -> &str {
        &self.tag
    }

    /// The endpoints and settings in use.
    pub fn options(&self) -> &ClientOptions {
        &self.options
    }

    /// Negotiate a session and open an upgraded WebSocket connection.
    pub async fn connect(&self) -> Result<Connection> {
        let sid = self.negotiate().await?;
        Connection::open(self, &sid).await
    }
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("options", &self.options)
            .field("tag", &self.tag)
            .field("logger", &self.logger)
            .finish_non_exhaustive()
    }
}

fn new_connection_tag() -> String {
    format!("{:08x}", rand::random::<u32>())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connection_tag_is_eight_hex_digits() {
        for _ in 0..32 {
            let tag = new_connection_tag();
            assert_eq!(tag.len(), 8);
            assert!(tag.chars().all(|c| c.is_ascii_hexdigit()));
        }
    }

    #[test]
    fn default_options() {
        let options = ClientOptions::default();
        assert_eq!(options.api_url, DEFAULT_API_URL);
        assert_eq!(options.ws_url, DEFAULT_WS_URL);
        assert_eq!(options.http_timeout, Duration::from_secs(25));
        assert!(options.user_agent.contains("Firefox"));
    }

    #[test]
    fn invalid_urls_are_rejected() {
        let options = ClientOptions {
            api_url: "not a url".to_string(),
            ..ClientOptions::default()
        };
        let err = Client::with_options(options).unwrap_err();
        assert!(matches!(err, Error::Url { .. }));
    }
}
