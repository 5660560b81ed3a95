//! The upgraded WebSocket connection and its background reader.
//!
//! A [`Connection`] owns the write half of the socket and the receiving end
//! of a single-slot delivery channel. One reader task owns the read half: it
//! answers pings, decodes events, records completed assistant turns in the
//! shared history and hands their text to the foreground one at a time.

use std::fmt;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use futures::stream::{SplitSink, Stream, StreamExt};
use futures::SinkExt;
use reqwest::cookie::CookieStore;
use tokio::net::TcpStream;
use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::http::header::{COOKIE, USER_AGENT};
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::{self, Message};
use tokio_tungstenite::{
    Connector, MaybeTlsStream, WebSocketStream, connect_async_tls_with_config,
};
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::client::Client;
use crate::client_logger::FrameLogger;
use crate::error::{Error, Result};
use crate::framing::{
    InboundFrame, PONG, PROBE, PROBE_REPLY, UPGRADE, UPGRADE_REPLY, decode_frame, encode_event,
};
use crate::history::ConversationHistory;
use crate::negotiate::websocket_url;
use crate::observability::{
    FRAGMENTS_DELIVERED, FRAMES_DISCARDED, FRAMES_RECEIVED, FRAMES_SENT, PINGS, READER_ERRORS,
};
use crate::types::{LabsRequest, Model, Turn};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Inbound text frames, in arrival order.
pub type FrameStream = Pin<Box<dyn Stream<Item = Result<String>> + Send>>;

type SharedSink = Arc<Mutex<Box<dyn FrameSink>>>;
type SharedLogger = Option<Arc<dyn FrameLogger>>;

/// The write half of a socket.
#[async_trait::async_trait]
pub trait FrameSink: Send {
    /// Write one text frame.
    async fn send_text(&mut self, frame: String) -> Result<()>;

    /// Send a close frame and shut the write half down.
    async fn close(&mut self) -> Result<()>;
}

#[async_trait::async_trait]
impl FrameSink for SplitSink<WsStream, Message> {
    async fn send_text(&mut self, frame: String) -> Result<()> {
        self.send(Message::Text(frame.into())).await?;
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        let frame = CloseFrame {
            code: CloseCode::Normal,
            reason: "".into(),
        };
        self.send(Message::Close(Some(frame))).await?;
        match SinkExt::close(self).await {
            Ok(())
            | Err(tungstenite::Error::ConnectionClosed)
            | Err(tungstenite::Error::AlreadyClosed) => Ok(()),
            Err(err) => Err(err.into()),
        }
    }
}

/// An upgraded socket.io connection to the Labs service.
pub struct Connection {
    sink: SharedSink,
    delivery: mpsc::Receiver<String>,
    history: ConversationHistory,
    cancel: CancellationToken,
    reader: Option<JoinHandle<Result<()>>>,
    logger: SharedLogger,
}

impl Connection {
    /// Dial the WebSocket for `sid` and perform the engine.io upgrade.
    ///
    /// The dial reuses the client's TLS profile, user agent and the cookies
    /// collected during negotiation.
    pub async fn open(client: &Client, sid: &str) -> Result<Self> {
        let url = websocket_url(&client.options, sid)?;
        let mut request = url.as_str().into_client_request()?;
        let headers = request.headers_mut();
        let user_agent = HeaderValue::from_str(&client.options.user_agent).map_err(|e| {
            Error::validation(format!("invalid user agent: {e}"), Some("user_agent".into()))
        })?;
        headers.insert(USER_AGENT, user_agent);
        let cookie_url = Url::parse(&client.options.api_url)?;
        if let Some(cookies) = client.jar.cookies(&cookie_url) {
            headers.insert(COOKIE, cookies);
        }

        let connector = Connector::Rustls(Arc::clone(&client.tls));
        let (socket, _) =
            connect_async_tls_with_config(request, None, false, Some(connector)).await?;
        tracing::debug!(sid, "connected to websocket");

        let (sink, stream) = socket.split();
        let mut sink: Box<dyn FrameSink> = Box::new(sink);
        let mut source = text_frames(stream);
        upgrade(&mut source, sink.as_mut(), &client.logger).await?;
        tracing::info!(sid, "websocket upgrade complete");

        Ok(Self::start(
            sink,
            source,
            ConversationHistory::new(),
            client.logger.clone(),
        ))
    }

    /// Spawn the reader over an already-upgraded socket.
    pub(crate) fn start(
        sink: Box<dyn FrameSink>,
        source: FrameStream,
        history: ConversationHistory,
        logger: SharedLogger,
    ) -> Self {
        let sink: SharedSink = Arc::new(Mutex::new(sink));
        let (tx, rx) = mpsc::channel(1);
        let cancel = CancellationToken::new();
        let reader = Reader {
            source,
            sink: Arc::clone(&sink),
            history: history.clone(),
            delivery: tx,
            cancel: cancel.clone(),
            logger: logger.clone(),
        };
        let reader = tokio::spawn(reader.run());
        Self {
            sink,
            delivery: rx,
            history,
            cancel,
            reader: Some(reader),
            logger,
        }
    }

    /// The conversation carried on this connection.
    pub fn history(&self) -> &ConversationHistory {
        &self.history
    }

    /// Append a user turn and send the whole conversation to `model`.
    pub async fn send_turn(&self, text: &str, model: &Model) -> Result<()> {
        let messages = self.history.append_and_snapshot(Turn::user(text));
        let frame = encode_event(&LabsRequest::new(model.clone(), messages))?;
        send_frame(&self.sink, &self.logger, frame).await
    }

    /// Wait up to `timeout` for the next completed assistant answer.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Timeout`] if nothing arrives in time. Once the reader
    /// has stopped, the first call returns the error that stopped it and
    /// later calls return [`Error::ChannelClosed`].
    pub async fn receive(&mut self, timeout: Duration) -> Result<String> {
        match tokio::time::timeout(timeout, self.delivery.recv()).await {
            Ok(Some(fragment)) => Ok(fragment),
            Ok(None) => Err(self.reader_exit().await),
            Err(_) => Err(Error::timeout(
                "timeout waiting for message",
                Some(timeout.as_secs_f64()),
            )),
        }
    }

    /// Remove the last exchange from the conversation.
    pub fn backtrack(&self) -> Result<()> {
        self.history.undo()
    }

    /// Stop the reader, close the delivery channel and close the socket.
    pub async fn close(mut self) -> Result<()> {
        self.cancel.cancel();
        self.delivery.close();
        if let Some(reader) = self.reader.take() {
            match reader.await {
                Ok(Ok(())) => {}
                Ok(Err(err)) => tracing::debug!(error = %err, "reader had already stopped"),
                Err(err) => tracing::warn!(error = %err, "reader task failed"),
            }
        }
        let mut sink = self.sink.lock().await;
        sink.close().await
    }

    async fn reader_exit(&mut self) -> Error {
        let Some(reader) = self.reader.take() else {
            return Error::channel_closed("background reader has stopped");
        };
        match reader.await {
            Ok(Err(err)) => err,
            Ok(Ok(())) => Error::channel_closed("background reader was cancelled"),
            Err(err) => Error::channel_closed(format!("background reader failed: {err}")),
        }
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("history_len", &self.history.len())
            .field("cancelled", &self.cancel.is_cancelled())
            .finish_non_exhaustive()
    }
}

/// The sole reader of a connection's socket.
struct Reader {
    source: FrameStream,
    sink: SharedSink,
    history: ConversationHistory,
    delivery: mpsc::Sender<String>,
    cancel: CancellationToken,
    logger: SharedLogger,
}

impl Reader {
    async fn run(mut self) -> Result<()> {
        let result = self.read_loop().await;
        if let Err(err) = &result {
            READER_ERRORS.click();
            tracing::warn!(error = %err, "background reader stopped");
        }
        result
    }

    async fn read_loop(&mut self) -> Result<()> {
        loop {
            let next = tokio::select! {
                _ = self.cancel.cancelled() => return Ok(()),
                next = self.source.next() => next,
            };
            let frame = match next {
                Some(Ok(frame)) => frame,
                Some(Err(err)) => return Err(err),
                None => return Err(Error::transport("connection closed by server", None)),
            };
            if !self.handle_frame(&frame).await? {
                return Ok(());
            }
        }
    }

    /// Process one frame. Returns false once the consumer has gone away.
    async fn handle_frame(&mut self, frame: &str) -> Result<bool> {
        FRAMES_RECEIVED.click();
        if let Some(logger) = &self.logger {
            logger.log_received(frame);
        }
        match decode_frame(frame)? {
            InboundFrame::Ping => {
                PINGS.click();
                send_frame(&self.sink, &self.logger, PONG.to_string()).await?;
                Ok(true)
            }
            InboundFrame::Event { name, response } => {
                if !response.is_completed() {
                    FRAMES_DISCARDED.click();
                    tracing::trace!(event = %name, status = %response.status, "ignoring partial frame");
                    return Ok(true);
                }
                tracing::debug!(
                    event = %name,
                    elapsed_time = response.elapsed_time,
                    tokens_streamed = response.tokens_streamed,
                    "received completed answer"
                );
                self.history.append(Turn::assistant(response.output.clone()));
                tokio::select! {
                    _ = self.cancel.cancelled() => Ok(false),
                    sent = self.delivery.send(response.output) => {
                        if sent.is_err() {
                            return Ok(false);
                        }
                        FRAGMENTS_DELIVERED.click();
                        Ok(true)
                    }
                }
            }
        }
    }
}

async fn send_frame(sink: &SharedSink, logger: &SharedLogger, frame: String) -> Result<()> {
    if let Some(logger) = logger {
        logger.log_sent(&frame);
    }
    let mut sink = sink.lock().await;
    sink.send_text(frame).await?;
    FRAMES_SENT.click();
    Ok(())
}

/// Adapt the read half of a WebSocket into a stream of text frames.
///
/// Control frames are answered by tungstenite itself and skipped here.
fn text_frames<S>(stream: S) -> FrameStream
where
    S: Stream<Item = std::result::Result<Message, tungstenite::Error>> + Send + 'static,
{
    Box::pin(stream.filter_map(|message| async move {
        match message {
            Ok(Message::Text(text)) => Some(Ok(text.to_string())),
            Ok(Message::Binary(_)) => Some(Err(Error::protocol("unexpected binary frame", None))),
            Ok(Message::Close(frame)) => Some(Err(Error::transport(
                format!("connection closed by server: {frame:?}"),
                None,
            ))),
            Ok(Message::Ping(_) | Message::Pong(_) | Message::Frame(_)) => None,
            Err(err) => Some(Err(err.into())),
        }
    }))
}

/// Confirm the transport upgrade: `2probe`/`3probe`, then `5`/`6`.
pub(crate) async fn upgrade(
    source: &mut FrameStream,
    sink: &mut dyn FrameSink,
    logger: &SharedLogger,
) -> Result<()> {
    exchange(source, sink, logger, PROBE, PROBE_REPLY).await?;
    exchange(source, sink, logger, UPGRADE, UPGRADE_REPLY).await
}

async fn exchange(
    source: &mut FrameStream,
    sink: &mut dyn FrameSink,
    logger: &SharedLogger,
    send: &str,
    expect: &str,
) -> Result<()> {
    if let Some(logger) = logger {
        logger.log_sent(send);
    }
    sink.send_text(send.to_string()).await?;
    match source.next().await {
        Some(Ok(reply)) => {
            if let Some(logger) = logger {
                logger.log_received(&reply);
            }
            if reply == expect {
                Ok(())
            } else {
                Err(Error::protocol(
                    format!("unexpected response to {send}, wanted {expect}"),
                    Some(reply),
                ))
            }
        }
        Some(Err(err)) => Err(err),
        None => Err(Error::transport(
            format!("connection closed while waiting for {expect}"),
            None,
        )),
    }
}
