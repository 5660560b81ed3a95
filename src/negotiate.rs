//! The engine.io polling handshake that precedes the WebSocket upgrade.
//!
//! The service only accepts a WebSocket for a session id that was obtained
//! and authenticated over long-polling first:
//!
//! 1. `GET ?EIO=4&transport=polling&t=<tag>` returns `0{"sid": ...}`.
//! 2. `POST ...&sid=<sid>` with the anonymous socket.io connect packet.
//! 3. `GET ...&sid=<sid>` to drain the connect acknowledgement.

use std::time::Instant;

use reqwest::Response;
use serde::Deserialize;
use url::Url;

use crate::client::{Client, ClientOptions};
use crate::error::{Error, Result};
use crate::framing::AUTH_PACKET;
use crate::observability::{HANDSHAKE_DURATION, HANDSHAKE_ERRORS, HANDSHAKES};

const ENGINE_IO_VERSION: &str = "4";

#[derive(Deserialize)]
struct OpenPacket {
    sid: String,
}

impl Client {
    /// Run the polling handshake and return the session id.
    ///
    /// # Errors
    ///
    /// Any HTTP failure, non-success status or undecodable body aborts the
    /// handshake. Nothing is retried.
    pub async fn negotiate(&self) -> Result<String> {
        HANDSHAKES.click();
        let start = Instant::now();
        let result = self.negotiate_inner().await;
        HANDSHAKE_DURATION.add(start.elapsed().as_secs_f64());
        if let Err(err) = &result {
            HANDSHAKE_ERRORS.click();
            tracing::warn!(error = %err, "polling handshake failed");
        }
        result
    }

    async fn negotiate_inner(&self) -> Result<String> {
        let options = &self.options;
        let response = self
            .http
            .get(polling_url(options, &self.tag, None)?)
            .send()
            .await?;
        let body = check_status(response).await?.text().await?;
        let sid = parse_open_packet(&body)?;
        tracing::debug!(sid = %sid, tag = %self.tag, "obtained session id");

        let response = self
            .http
            .post(polling_url(options, &self.tag, Some(&sid))?)
            .body(AUTH_PACKET)
            .send()
            .await?;
        check_status(response).await?;

        let response = self
            .http
            .get(polling_url(options, &self.tag, Some(&sid))?)
            .send()
            .await?;
        check_status(response).await?;

        tracing::info!(sid = %sid, "polling handshake complete");
        Ok(sid)
    }
}

pub(crate) fn polling_url(options: &ClientOptions, tag: &str, sid: Option<&str>) -> Result<Url> {
    let mut url = Url::parse(&options.api_url)?;
    {
        let mut query = url.query_pairs_mut();
        query
            .append_pair("EIO", ENGINE_IO_VERSION)
            .append_pair("transport", "polling")
            .append_pair("t", tag);
        if let Some(sid) = sid {
            query.append_pair("sid", sid);
        }
    }
    Ok(url)
}

pub(crate) fn websocket_url(options: &ClientOptions, sid: &str) -> Result<Url> {
    let mut url = Url::parse(&options.ws_url)?;
    url.query_pairs_mut()
        .append_pair("EIO", ENGINE_IO_VERSION)
        .append_pair("transport", "websocket")
        .append_pair("sid", sid);
    Ok(url)
}

async fn check_status(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let url = response.url().clone();
    let body = response.text().await.unwrap_or_default();
    Err(Error::transport(
        format!("handshake request to {url} failed with {status}: {body}"),
        None,
    ))
}

/// Strip the one-byte engine.io packet type and decode the `open` payload.
pub(crate) fn parse_open_packet(body: &str) -> Result<String> {
    let mut chars = body.chars();
    if chars.next().is_none() {
        return Err(Error::protocol("empty handshake response", None));
    }
    let packet: OpenPacket = serde_json::from_str(chars.as_str()).map_err(|e| {
        Error::serialization(
            format!("Failed to decode handshake response {body}: {e}"),
            Some(Box::new(e)),
        )
    })?;
    Ok(packet.sid)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_packet_strips_prefix() {
        let body = r#"0{"sid":"abc123","upgrades":["websocket"],"pingInterval":25000,"pingTimeout":20000,"maxPayload":1000000}"#;
        assert_eq!(parse_open_packet(body).unwrap(), "abc123");
    }

    #[test]
    fn open_packet_errors() {
        assert!(parse_open_packet("").unwrap_err().is_protocol());
        assert!(parse_open_packet("0").unwrap_err().is_serialization());
        assert!(
            parse_open_packet(r#"{"sid":"abc"}"#)
                .unwrap_err()
                .is_serialization()
        );
        assert!(parse_open_packet(r#"0{"id":"abc"}"#).unwrap_err().is_serialization());
    }

    #[test]
    fn handshake_urls() {
        let options = ClientOptions::default();
        let tag = "0badcafe";

        let url = polling_url(&options, tag, None).unwrap();
        assert_eq!(
            url.as_str(),
            format!("https://labs-api.perplexity.ai/socket.io/?EIO=4&transport=polling&t={tag}")
        );

        let url = polling_url(&options, tag, Some("s1d")).unwrap();
        assert!(url.as_str().ends_with(&format!("t={tag}&sid=s1d")));

        let url = websocket_url(&options, "s1d").unwrap();
        assert_eq!(
            url.as_str(),
            "wss://labs-api.perplexity.ai/socket.io/?EIO=4&transport=websocket&sid=s1d"
        );
    }
}
