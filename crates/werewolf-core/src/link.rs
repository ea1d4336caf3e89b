//! Request/response protocol with one agent.
//!
//! An [`AgentLink`] owns the agent's transport and its sticky health state.
//! Every request goes through [`AgentLink::send`]:
//!
//! 1. An errored link fails immediately without touching the transport.
//! 2. The packet is serialized and written. A write failure marks the link
//!    errored.
//! 3. Notices (`INITIALIZE`, `DAILY_*`, `FINISH`) return right after the
//!    write with an empty string.
//! 4. Otherwise the reply is awaited for the action timeout. A closed
//!    connection is terminal. A timeout or a recoverable read failure
//!    triggers a liveness probe: a bare `NAME` request answered within the
//!    response timeout. If the answer is the agent's own label the agent is
//!    just slow, the request fails with [`LinkError::Timeout`] and the link
//!    stays healthy. Any other outcome marks the link errored.
//!
//! Once errored, a link never recovers.

use std::time::Duration;

use tokio::time::timeout;
use tracing::{debug, info, warn};
use werewolf_types::{AgentIdx, Packet, Request};

use crate::transport::{Transport, TransportError};

/// Sticky health of an agent connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkHealth {
    /// Requests are delivered normally.
    Healthy,
    /// The agent failed terminally. No further I/O is attempted.
    Errored,
}

/// Errors returned by [`AgentLink::send`].
#[derive(Debug, thiserror::Error)]
pub enum LinkError {
    /// The link was already errored; nothing was sent.
    #[error("{agent} is errored, request not sent")]
    Errored {
        /// The agent.
        agent: AgentIdx,
    },

    /// The packet could not be encoded.
    #[error("failed to encode packet: {source}")]
    Serialize {
        /// The underlying serde error.
        #[from]
        source: serde_json::Error,
    },

    /// Writing the request failed.
    #[error("failed to send request: {source}")]
    Write {
        /// The underlying transport error.
        source: TransportError,
    },

    /// The agent closed the connection while a reply was pending.
    #[error("connection closed by agent")]
    Closed,

    /// No reply in time, but the agent answered the liveness probe.
    #[error("{agent} did not answer in time but is still alive")]
    Timeout {
        /// The slow agent.
        agent: AgentIdx,
    },

    /// The probe was answered with something other than the agent's label.
    #[error("liveness probe expected {expected:?}, got {got:?}")]
    ProbeMismatch {
        /// The agent's label.
        expected: String,
        /// What came back.
        got: String,
    },

    /// The probe itself timed out.
    #[error("liveness probe timed out")]
    ProbeTimeout,

    /// Sending or reading the probe failed.
    #[error("liveness probe failed: {source}")]
    ProbeFailed {
        /// The underlying transport error.
        source: TransportError,
    },
}

impl LinkError {
    /// Whether the agent is still usable after this error.
    pub const fn is_recoverable(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
}

/// The server's end of one agent connection.
#[derive(Debug)]
pub struct AgentLink<T> {
    idx: AgentIdx,
    transport: T,
    health: LinkHealth,
    action_timeout: Duration,
    response_timeout: Duration,
}

impl<T: Transport> AgentLink<T> {
    /// Wrap a transport for the agent seated at `idx`.
    pub const fn new(
        idx: AgentIdx,
        transport: T,
        action_timeout: Duration,
        response_timeout: Duration,
    ) -> Self {
        Self {
            idx,
            transport,
            health: LinkHealth::Healthy,
            action_timeout,
            response_timeout,
        }
    }

    /// The seat this link serves.
    pub const fn idx(&self) -> AgentIdx {
        self.idx
    }

    /// Current health.
    pub const fn health(&self) -> LinkHealth {
        self.health
    }

    /// Shorthand for `health() == LinkHealth::Errored`.
    pub const fn is_errored(&self) -> bool {
        matches!(self.health, LinkHealth::Errored)
    }

    /// Send one packet and, if the request kind expects it, return the
    /// agent's reply with trailing whitespace removed.
    pub async fn send(&mut self, packet: &Packet) -> Result<String, LinkError> {
        if self.is_errored() {
            debug!(agent = %self.idx, request = %packet.request, "skipping errored agent");
            return Err(LinkError::Errored { agent: self.idx });
        }

        let text = match serde_json::to_string(packet) {
            Ok(text) => text,
            Err(source) => {
                self.mark_errored("packet encoding failed");
                return Err(LinkError::Serialize { source });
            }
        };

        if let Err(source) = self.transport.send_text(text).await {
            self.mark_errored("request write failed");
            return Err(LinkError::Write { source });
        }
        debug!(agent = %self.idx, request = %packet.request, "request sent");

        if !packet.request.requires_response() {
            return Ok(String::new());
        }

        match timeout(self.action_timeout, self.transport.recv_text()).await {
            Ok(Ok(reply)) => {
                debug!(agent = %self.idx, reply = %reply.trim_end(), "reply received");
                Ok(trim_reply(reply))
            }
            Ok(Err(TransportError::Closed)) => {
                self.mark_errored("connection closed");
                Err(LinkError::Closed)
            }
            Ok(Err(error)) => {
                warn!(agent = %self.idx, %error, "read failed, probing agent");
                self.probe().await
            }
            Err(_elapsed) => {
                warn!(
                    agent = %self.idx,
                    timeout = ?self.action_timeout,
                    "reply timed out, probing agent"
                );
                self.probe().await
            }
        }
    }

    /// Close the underlying transport.
    pub async fn close(&mut self) {
        self.transport.close().await;
    }

    async fn probe(&mut self) -> Result<String, LinkError> {
        let probe = serde_json::to_string(&Packet::bare(Request::Name))?;
        if let Err(source) = self.transport.send_text(probe).await {
            self.mark_errored("probe write failed");
            return Err(LinkError::ProbeFailed { source });
        }

        let expected = self.idx.label();
        match timeout(self.response_timeout, self.transport.recv_text()).await {
            Ok(Ok(answer)) if answer.trim_end() == expected => {
                info!(agent = %self.idx, "agent answered probe, treating request as timed out");
                Err(LinkError::Timeout { agent: self.idx })
            }
            Ok(Ok(answer)) => {
                self.mark_errored("probe answer mismatch");
                Err(LinkError::ProbeMismatch {
                    expected,
                    got: answer,
                })
            }
            Ok(Err(source)) => {
                self.mark_errored("probe read failed");
                Err(LinkError::ProbeFailed { source })
            }
            Err(_elapsed) => {
                self.mark_errored("probe timed out");
                Err(LinkError::ProbeTimeout)
            }
        }
    }

    fn mark_errored(&mut self, reason: &'static str) {
        warn!(agent = %self.idx, reason, "agent marked errored");
        self.health = LinkHealth::Errored;
    }
}

fn trim_reply(mut reply: String) -> String {
    let len = reply.trim_end().len();
    reply.truncate(len);
    reply
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use werewolf_types::Request;

    use super::*;
    use crate::transport::scripted::{Reply, Scripted};

    fn link(script: Scripted) -> AgentLink<Scripted> {
        AgentLink::new(
            AgentIdx::new(1),
            script,
            Duration::from_millis(3000),
            Duration::from_millis(6000),
        )
    }

    #[tokio::test]
    async fn reply_is_trimmed() {
        let mut link = link(Scripted::new([Scripted::text("Agent[02] \r\n")]));
        let reply = link.send(&Packet::bare(Request::Vote)).await.unwrap();
        assert_eq!(reply, "Agent[02]");
        assert_eq!(link.health(), LinkHealth::Healthy);
    }

    #[tokio::test]
    async fn notices_do_not_wait() {
        let script = Scripted::new([Reply::Hang]);
        let mut link = link(script.clone());
        let reply = link.send(&Packet::bare(Request::DailyFinish)).await.unwrap();
        assert!(reply.is_empty());
        assert_eq!(script.sent().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn slow_agent_that_answers_probe_stays_healthy() {
        let script = Scripted::new([Reply::Hang, Scripted::text("Agent[01]\n")]);
        let mut link = link(script.clone());
        let err = link.send(&Packet::bare(Request::Talk)).await.unwrap_err();
        assert!(err.is_recoverable());
        assert_eq!(link.health(), LinkHealth::Healthy);

        let sent = script.sent();
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[1], r#"{"request":"NAME"}"#);
    }

    #[tokio::test(start_paused = true)]
    async fn read_error_also_probes() {
        let script = Scripted::new([Reply::ReadError, Scripted::text("Agent[01]")]);
        let mut link = link(script);
        let err = link.send(&Packet::bare(Request::Vote)).await.unwrap_err();
        assert!(matches!(err, LinkError::Timeout { .. }));
        assert!(!link.is_errored());
    }

    #[tokio::test(start_paused = true)]
    async fn silent_agent_becomes_errored_and_gets_no_more_io() {
        let script = Scripted::new([Reply::Hang, Reply::Hang]);
        let mut link = link(script.clone());
        let err = link.send(&Packet::bare(Request::Talk)).await.unwrap_err();
        assert!(matches!(err, LinkError::ProbeTimeout));
        assert!(link.is_errored());

        let err = link.send(&Packet::bare(Request::Talk)).await.unwrap_err();
        assert!(matches!(err, LinkError::Errored { .. }));
        assert_eq!(script.sent().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn wrong_probe_answer_is_terminal() {
        let script = Scripted::new([Reply::Hang, Scripted::text("Agent[07]")]);
        let mut link = link(script);
        let err = link.send(&Packet::bare(Request::Whisper)).await.unwrap_err();
        assert!(matches!(err, LinkError::ProbeMismatch { .. }));
        assert!(!err.is_recoverable());
        assert!(link.is_errored());
    }

    #[tokio::test(start_paused = true)]
    async fn empty_probe_answer_is_terminal() {
        let script = Scripted::new([Reply::Hang, Scripted::text("")]);
        let mut link = link(script);
        link.send(&Packet::bare(Request::Divine)).await.unwrap_err();
        assert!(link.is_errored());
    }

    #[tokio::test]
    async fn closed_connection_is_terminal_without_probe() {
        let script = Scripted::new([Reply::Closed]);
        let mut link = link(script.clone());
        let err = link.send(&Packet::bare(Request::Vote)).await.unwrap_err();
        assert!(matches!(err, LinkError::Closed));
        assert!(link.is_errored());
        assert_eq!(script.sent().len(), 1);
    }

    #[tokio::test]
    async fn write_failure_is_terminal() {
        let mut link = link(Scripted::failing_writes());
        let err = link
            .send(&Packet::bare(Request::Initialize))
            .await
            .unwrap_err();
        assert!(matches!(err, LinkError::Write { .. }));
        assert!(link.is_errored());
    }
}
