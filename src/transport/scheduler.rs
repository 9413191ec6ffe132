use std::fs;
use std::sync::mpsc::SyncSender;
use std::sync::Arc;
use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, COOKIE};

use crate::agent::config::AgentConfig;
use crate::agent::error::{internal_error, invalid_parameter, AgentResult, ErrorSlot};
use crate::agent::tag::TagGenerator;
use crate::agent::StatusCode;
use crate::platform::runtime;
use crate::transport::buffer::EventBuffer;
use crate::transport::payload::EventBatch;

pub(crate) enum Command {
    /// Send everything currently buffered, regardless of age.
    Flush,
    /// Final forced flush; acknowledged once delivery has been attempted.
    Shutdown(SyncSender<()>),
}

/// Handle to the single background transmission task.
///
/// Delivery is best-effort and fire-and-forget: entries drained from the
/// buffer are never re-enqueued, and a failed send only lands in the
/// last-error slot. Telemetry loss under sustained network failure is
/// acceptable; blocking the application is not.
pub(crate) struct Scheduler {
    commands: async_channel::Sender<Command>,
}

impl Scheduler {
    /// Builds the HTTP client and spawns the scheduling loop.
    pub fn spawn(
        config: AgentConfig,
        buffer: Arc<EventBuffer>,
        errors: ErrorSlot,
        tags: TagGenerator,
    ) -> AgentResult<Scheduler> {
        let client = build_client(&config)?;
        let (commands, receiver) = async_channel::bounded(32);
        let worker = Worker {
            config,
            buffer,
            errors,
            tags,
            client,
            receiver,
        };
        runtime::spawn_detached(async move { worker.run().await });
        Ok(Scheduler { commands })
    }

    /// Requests an asynchronous flush and returns immediately.
    pub fn request_flush(&self) -> bool {
        self.commands.try_send(Command::Flush).is_ok()
    }

    /// Requests a final flush and waits for the acknowledgment, bounded by
    /// `wait`. Closes the command channel so the loop exits afterwards.
    pub fn stop(&self, wait: Duration) {
        let (ack, done) = std::sync::mpsc::sync_channel(1);
        if self.commands.try_send(Command::Shutdown(ack)).is_ok() {
            let _ = done.recv_timeout(wait);
        }
        self.commands.close();
    }
}

struct Worker {
    config: AgentConfig,
    buffer: Arc<EventBuffer>,
    errors: ErrorSlot,
    tags: TagGenerator,
    client: reqwest::Client,
    receiver: async_channel::Receiver<Command>,
}

impl Worker {
    async fn run(self) {
        loop {
            let wake = tokio::time::timeout(self.config.flush_interval(), self.receiver.recv());
            match wake.await {
                Ok(Ok(Command::Flush)) => self.flush("explicit").await,
                Ok(Ok(Command::Shutdown(ack))) => {
                    self.flush("shutdown").await;
                    let _ = ack.try_send(());
                    break;
                }
                // All senders dropped; the agent is gone.
                Ok(Err(_)) => break,
                Err(_elapsed) => {
                    if self.due() {
                        self.flush("scheduled").await;
                    }
                }
            }
        }
    }

    /// A scheduled wake sends only when the oldest entry has exceeded the
    /// staleness ceiling or the buffer is near capacity.
    fn due(&self) -> bool {
        let len = self.buffer.len();
        if len == 0 {
            return false;
        }
        if len >= self.config.high_water_mark() {
            return true;
        }
        self.buffer
            .oldest_age()
            .is_some_and(|age| age >= self.config.max_event_age())
    }

    async fn flush(&self, cause: &str) {
        let entries = self.buffer.drain_all();
        if entries.is_empty() {
            return;
        }
        log::debug!("flushing {} entries ({cause})", entries.len());
        let batch = EventBatch::new(
            self.config.application_name(),
            self.tags.session_hex(),
            &entries,
        );
        match self
            .client
            .post(self.config.server_url())
            .json(&batch)
            .send()
            .await
        {
            Ok(response) if response.status().is_success() => {
                log::debug!("delivered {} entries", entries.len());
            }
            Ok(response) => {
                let message = format!(
                    "collector rejected event batch with status {}",
                    response.status()
                );
                log::debug!("{message}");
                self.errors.record(StatusCode::InternalError, message);
            }
            Err(err) => {
                let message = format!("event batch delivery failed: {err}");
                log::debug!("{message}");
                self.errors.record(StatusCode::InternalError, message);
            }
        }
    }
}

fn build_client(config: &AgentConfig) -> AgentResult<reqwest::Client> {
    let mut builder = reqwest::Client::builder().timeout(config.send_timeout());

    if config.allow_any_cert() {
        builder = builder.danger_accept_invalid_certs(true);
    }
    if let Some(path) = config.certificate_path() {
        let der = fs::read(path).map_err(|err| {
            invalid_parameter(format!("cannot read certificate {}: {err}", path.display()))
        })?;
        let certificate = reqwest::Certificate::from_der(&der)
            .map_err(|err| invalid_parameter(format!("certificate is not valid DER: {err}")))?;
        builder = builder.add_root_certificate(certificate);
    }
    if let Some(cookie) = config.monitor_cookie() {
        let value = HeaderValue::from_str(cookie)
            .map_err(|err| invalid_parameter(format!("monitor cookie is not a valid header value: {err}")))?;
        let mut headers = HeaderMap::new();
        headers.insert(COOKIE, value);
        builder = builder.default_headers(headers);
    }

    builder
        .build()
        .map_err(|err| internal_error(format!("failed to build HTTP client: {err}")))
}
