//! Request loop serving the runner over a line-delimited JSON stream

use crate::client::{BackendClient, ClientError, DataClient};
use crate::executor::CollectDataAction;
use crate::models::{Configuration, PluginDescriptor};
use crate::protocol::{
    Handshake, HandshakeAck, ProtocolError, Request, Response, NOT_IMPLEMENTED,
};
use crate::reporter::StepUpdater;
use crate::services::logging::{log_error, log_request};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader, Lines};
use tokio_util::sync::CancellationToken;
use tracing::Instrument;
use uuid::Uuid;

/// Handshake and shutdown settings of the server
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerOptions {
    pub magic_cookie: String,
    pub protocol_version: u32,
    /// Time an in-flight request gets to finish after shutdown is requested
    pub shutdown_grace: Duration,
}

impl From<&Configuration> for ServerOptions {
    fn from(config: &Configuration) -> Self {
        Self {
            magic_cookie: config.magic_cookie.clone(),
            protocol_version: config.protocol_version,
            shutdown_grace: Duration::from_secs(config.shutdown_grace_seconds),
        }
    }
}

/// How a serve loop ended without error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServeOutcome {
    /// The runner closed the input stream
    InputClosed,
    /// The shutdown token was cancelled
    Shutdown,
}

/// Serves plugin requests one at a time
pub struct PluginServer {
    data_client: Arc<dyn DataClient>,
    updater: Arc<dyn StepUpdater>,
    descriptor: PluginDescriptor,
    options: ServerOptions,
}

impl PluginServer {
    pub fn new(
        data_client: Arc<dyn DataClient>,
        updater: Arc<dyn StepUpdater>,
        options: ServerOptions,
    ) -> Self {
        Self {
            data_client,
            updater,
            descriptor: PluginDescriptor::collect_data(),
            options,
        }
    }

    /// Server talking to the backend described by `config`
    pub fn from_configuration(config: &Configuration) -> Result<Self, ClientError> {
        let backend = Arc::new(BackendClient::from_configuration(config)?);
        Ok(Self::new(backend.clone(), backend, ServerOptions::from(config)))
    }

    /// Handle one validated request
    pub async fn handle(&self, request: Request) -> Response {
        let name = request.name();
        match request {
            Request::Details => {
                log_request(name, None);
                Response::details(self.descriptor.clone())
            }
            Request::Execute(action_request) => {
                log_request(name, Some(&action_request.execution.id));
                let mut action =
                    CollectDataAction::new(self.data_client.clone(), self.updater.clone());
                match action.execute(&action_request).await {
                    Ok(output) => match serde_json::to_value(output) {
                        Ok(data) => Response::data(data),
                        Err(e) => Response::failure(format!("Failed to encode result: {}", e)),
                    },
                    Err(e) => Response::failure(e.to_string()),
                }
            }
            Request::HandlePayload(_) => {
                log_request(name, None);
                tracing::warn!("Payload handler requested but not provided by this plugin");
                Response::failure(NOT_IMPLEMENTED)
            }
        }
    }

    /// Run the handshake and then serve requests until the input closes,
    /// shutdown is requested or a fatal protocol error occurs.
    pub async fn serve<R, W>(
        &self,
        reader: R,
        mut writer: W,
        shutdown: CancellationToken,
    ) -> Result<ServeOutcome, ProtocolError>
    where
        R: AsyncRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut lines = BufReader::new(reader).lines();

        let first = tokio::select! {
            biased;
            _ = shutdown.cancelled() => return Ok(ServeOutcome::Shutdown),
            line = next_non_blank(&mut lines) => line?,
        };
        let first = first.ok_or(ProtocolError::MissingHandshake)?;

        match self.accept_handshake(&first) {
            Ok(ack) => write_line(&mut writer, &ack).await?,
            Err(e) => {
                log_error(&e.to_string(), Some("handshake"));
                write_line(&mut writer, &Response::failure(e.to_string())).await?;
                return Err(e);
            }
        }
        tracing::info!(
            protocol_version = self.options.protocol_version,
            "Handshake accepted"
        );

        loop {
            let line = tokio::select! {
                biased;
                _ = shutdown.cancelled() => return Ok(ServeOutcome::Shutdown),
                line = next_non_blank(&mut lines) => line?,
            };
            let Some(line) = line else {
                tracing::info!("Input closed, stopping");
                return Ok(ServeOutcome::InputClosed);
            };

            let request = match Request::parse(&line) {
                Ok(request) => request,
                Err(e) => {
                    write_line(&mut writer, &Response::failure(e.to_string())).await?;
                    if e.is_fatal() {
                        log_error(&e.to_string(), Some("request"));
                        return Err(e);
                    }
                    tracing::warn!(error = %e, "Rejected request");
                    continue;
                }
            };

            let span = tracing::info_span!(
                "request",
                request_id = %Uuid::new_v4(),
                action = request.name()
            );
            let handled = self.handle(request).instrument(span);
            tokio::pin!(handled);

            let response = tokio::select! {
                response = &mut handled => response,
                _ = shutdown.cancelled() => {
                    tracing::info!(
                        grace_ms = self.options.shutdown_grace.as_millis() as u64,
                        "Shutdown requested while a request is in flight"
                    );
                    match tokio::time::timeout(self.options.shutdown_grace, &mut handled).await {
                        Ok(response) => {
                            write_line(&mut writer, &response).await?;
                        }
                        Err(_) => {
                            tracing::warn!("In-flight request abandoned after grace period");
                        }
                    }
                    return Ok(ServeOutcome::Shutdown);
                }
            };

            write_line(&mut writer, &response).await?;
        }
    }

    fn accept_handshake(&self, line: &str) -> Result<HandshakeAck, ProtocolError> {
        let handshake: Handshake =
            serde_json::from_str(line).map_err(|e| ProtocolError::Malformed(e.to_string()))?;
        handshake.verify(&self.options.magic_cookie, self.options.protocol_version)?;

        Ok(HandshakeAck {
            success: true,
            protocol_version: self.options.protocol_version,
            plugin: self.descriptor.name.clone(),
            version: self.descriptor.version.clone(),
        })
    }
}

async fn next_non_blank<R>(lines: &mut Lines<R>) -> Result<Option<String>, ProtocolError>
where
    R: tokio::io::AsyncBufRead + Unpin,
{
    while let Some(line) = lines.next_line().await? {
        if !line.trim().is_empty() {
            return Ok(Some(line));
        }
    }
    Ok(None)
}

async fn write_line<W, T>(writer: &mut W, message: &T) -> Result<(), ProtocolError>
where
    W: AsyncWrite + Unpin,
    T: Serialize,
{
    let mut encoded = serde_json::to_vec(message)?;
    encoded.push(b'\n');
    writer.write_all(&encoded).await?;
    writer.flush().await?;
    Ok(())
}
