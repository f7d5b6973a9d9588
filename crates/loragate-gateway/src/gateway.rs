//! Gateway run loop.
//!
//! One iteration reads a line from the serial transport and pushes it
//! through the pipeline:
//!
//! ```text
//! read_line -> LineDecoder::decode -> DeviceKeyTable::authenticate
//!           -> OutboundRequest::new -> HttpForwarder::forward
//! ```
//!
//! Each stage failure ends the iteration with a [`LineOutcome`]; none of
//! them ends the loop. The loop only stops on cancellation, and the only
//! fatal condition is failing to open the transport.
//!
//! # Example
//!
//! ```no_run
//! use loragate_gateway::{Gateway, GatewayConfig};
//! use loragate_hardware::SerialTransport;
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn example(config: GatewayConfig) -> anyhow::Result<()> {
//! let mut gateway = Gateway::from_config(&config)?;
//! let serial = config.serial_config();
//!
//! let stats = gateway
//!     .run(|| SerialTransport::open(&serial), CancellationToken::new())
//!     .await?;
//! println!("forwarded {} events", stats.forwarded);
//! # Ok(())
//! # }
//! ```

use std::time::Duration;

use loragate_core::constants::{
    DEFAULT_BACKEND_FAILURE_BACKOFF, DEFAULT_OPEN_ATTEMPTS, DEFAULT_OPEN_RETRY_DELAY,
    DEFAULT_READ_ERROR_BACKOFF,
};
use loragate_hardware::{LineTransport, TransportError};
use loragate_network::{HttpForwarder, OutboundRequest};
use loragate_protocol::LineDecoder;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace, warn};

use crate::auth::DeviceKeyTable;
use crate::config::{ConfigError, GatewayConfig};
use crate::error::GatewayError;
use crate::state_machine::{GatewayState, Lifecycle};

/// Run loop timing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunLoopConfig {
    /// Open attempts before the run fails.
    pub open_attempts: u32,

    /// Pause between open attempts.
    pub open_retry_delay: Duration,

    /// Pause after a failed serial read.
    pub read_error_backoff: Duration,

    /// Pause after a request that got no response.
    pub backend_failure_backoff: Duration,
}

impl Default for RunLoopConfig {
    fn default() -> Self {
        Self {
            open_attempts: DEFAULT_OPEN_ATTEMPTS,
            open_retry_delay: Duration::from_millis(DEFAULT_OPEN_RETRY_DELAY),
            read_error_backoff: Duration::from_millis(DEFAULT_READ_ERROR_BACKOFF),
            backend_failure_backoff: Duration::from_millis(DEFAULT_BACKEND_FAILURE_BACKOFF),
        }
    }
}

/// Result of one loop iteration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineOutcome {
    /// Read timed out without a complete line.
    Idle,

    /// Line is not protocol traffic.
    Ignored,

    /// Protocol line missing a field or with a non-numeric id.
    Malformed,

    /// No device key for the node.
    Unauthenticated { node_id: i64 },

    /// Backend answered 2xx.
    Delivered { status: u16 },

    /// Backend answered with any other status.
    Rejected { status: u16 },

    /// No response from the backend.
    BackendUnavailable,

    /// The serial read failed.
    TransportFailed,
}

impl LineOutcome {
    /// Pause to take before the next iteration.
    fn backoff(&self, config: &RunLoopConfig) -> Option<Duration> {
        match self {
            LineOutcome::TransportFailed => Some(config.read_error_backoff),
            LineOutcome::BackendUnavailable => Some(config.backend_failure_backoff),
            _ => None,
        }
    }
}

/// Counters for one run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GatewayStats {
    /// Complete lines received.
    pub lines_read: u64,
    pub foreign_lines: u64,
    pub malformed_lines: u64,
    pub events_decoded: u64,
    pub unauthenticated_events: u64,

    /// Events the backend answered 2xx.
    pub forwarded: u64,
    pub rejected_by_backend: u64,
    pub backend_failures: u64,
    pub transport_errors: u64,
}

impl GatewayStats {
    pub fn record(&mut self, outcome: &LineOutcome) {
        match outcome {
            LineOutcome::Idle => return,
            LineOutcome::TransportFailed => {
                self.transport_errors += 1;
                return;
            }
            _ => self.lines_read += 1,
        }

        match outcome {
            LineOutcome::Ignored => self.foreign_lines += 1,
            LineOutcome::Malformed => self.malformed_lines += 1,
            LineOutcome::Unauthenticated { .. } => {
                self.events_decoded += 1;
                self.unauthenticated_events += 1;
            }
            LineOutcome::Delivered { .. } => {
                self.events_decoded += 1;
                self.forwarded += 1;
            }
            LineOutcome::Rejected { .. } => {
                self.events_decoded += 1;
                self.rejected_by_backend += 1;
            }
            LineOutcome::BackendUnavailable => {
                self.events_decoded += 1;
                self.backend_failures += 1;
            }
            LineOutcome::Idle | LineOutcome::TransportFailed => {}
        }
    }

    /// Events handed to the forwarder, answered or not.
    pub fn forward_attempts(&self) -> u64 {
        self.forwarded + self.rejected_by_backend + self.backend_failures
    }
}

/// LoRa to HTTP gateway.
#[derive(Debug)]
pub struct Gateway {
    keys: DeviceKeyTable,
    forwarder: HttpForwarder,
    config: RunLoopConfig,
    lifecycle: Lifecycle,
    stats_tx: watch::Sender<GatewayStats>,
}

impl Gateway {
    pub fn new(keys: DeviceKeyTable, forwarder: HttpForwarder, config: RunLoopConfig) -> Self {
        let (stats_tx, _) = watch::channel(GatewayStats::default());
        Self {
            keys,
            forwarder,
            config,
            lifecycle: Lifecycle::new(),
            stats_tx,
        }
    }

    /// Build a gateway from a validated configuration.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Config`] for duplicate device entries or an
    /// unusable backend URL.
    pub fn from_config(config: &GatewayConfig) -> Result<Self, GatewayError> {
        let keys = config.key_table()?;
        let forwarder = HttpForwarder::new(config.forwarder_config())
            .map_err(|e| ConfigError::Validation(e.to_string()))?;
        Ok(Self::new(keys, forwarder, config.run_loop_config()))
    }

    pub fn state(&self) -> GatewayState {
        self.lifecycle.current_state()
    }

    pub fn lifecycle(&self) -> &Lifecycle {
        &self.lifecycle
    }

    pub fn keys(&self) -> &DeviceKeyTable {
        &self.keys
    }

    pub fn stats(&self) -> GatewayStats {
        *self.stats_tx.borrow()
    }

    /// Watch the counters while the gateway runs.
    pub fn subscribe_stats(&self) -> watch::Receiver<GatewayStats> {
        self.stats_tx.subscribe()
    }

    /// Run until `cancel` fires.
    ///
    /// `open` is called to acquire the transport, up to
    /// [`RunLoopConfig::open_attempts`] times. The transport is closed
    /// exactly once on the way out.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::StartupFatal`] if the transport could not be
    /// opened, and [`GatewayError::Lifecycle`] if the gateway was already
    /// run.
    pub async fn run<T, F>(
        &mut self,
        open: F,
        cancel: CancellationToken,
    ) -> Result<GatewayStats, GatewayError>
    where
        T: LineTransport,
        F: FnMut() -> loragate_hardware::Result<T>,
    {
        if self.state() != GatewayState::Starting {
            return Err(loragate_core::Error::InvalidStateTransition {
                from: self.state().to_string(),
                to: GatewayState::Starting.to_string(),
            }
            .into());
        }

        let Some(mut transport) = self.acquire(open, &cancel).await? else {
            info!("Cancelled before the serial transport opened");
            self.lifecycle.transition_to(GatewayState::Stopping)?;
            self.lifecycle.transition_to(GatewayState::Stopped)?;
            return Ok(self.stats());
        };

        self.lifecycle.transition_to(GatewayState::Running)?;
        info!(
            transport = transport.name(),
            backend = %self.forwarder.url(),
            devices = self.keys.len(),
            "Gateway running"
        );

        loop {
            if cancel.is_cancelled() {
                break;
            }

            let read = tokio::select! {
                biased;
                () = cancel.cancelled() => break,
                read = transport.read_line() => read,
            };

            let outcome = match read {
                Ok(Some(line)) => self.process_line(&line).await,
                Ok(None) => LineOutcome::Idle,
                Err(e) => {
                    error!(transport = transport.name(), error = %e, "Serial read failed");
                    LineOutcome::TransportFailed
                }
            };

            trace!(?outcome, "Line processed");
            self.stats_tx.send_modify(|stats| stats.record(&outcome));

            if let Some(backoff) = outcome.backoff(&self.config)
                && !pause(backoff, &cancel).await
            {
                break;
            }
        }

        self.lifecycle.transition_to(GatewayState::Stopping)?;
        info!("Stopping gateway");

        if let Err(e) = transport.close().await {
            warn!(transport = transport.name(), error = %e, "Failed to close serial transport");
        }

        self.lifecycle.transition_to(GatewayState::Stopped)?;

        let stats = self.stats();
        info!(
            lines = stats.lines_read,
            forwarded = stats.forwarded,
            rejected = stats.rejected_by_backend,
            backend_failures = stats.backend_failures,
            "Gateway stopped"
        );
        Ok(stats)
    }

    /// Push one received line through decode, authenticate and forward.
    pub async fn process_line(&self, line: &str) -> LineOutcome {
        info!("RX {line}");

        let event = match LineDecoder::decode(line) {
            Ok(Some(event)) => event,
            Ok(None) => return LineOutcome::Ignored,
            Err(e) => {
                warn!(error = %e, line, "Dropping malformed line");
                return LineOutcome::Malformed;
            }
        };

        let key = match self.keys.authenticate(&event) {
            Ok(key) => key,
            Err(e) => {
                warn!(error = %e, "Dropping event from unknown node");
                return LineOutcome::Unauthenticated {
                    node_id: event.node_id(),
                };
            }
        };

        let request = OutboundRequest::new(&event, key);
        debug!(%event, "Forwarding event");

        match self.forwarder.forward(&request).await {
            Ok(report) if report.is_success() => {
                info!(status = report.status, body = %report.body, "Backend response");
                LineOutcome::Delivered {
                    status: report.status,
                }
            }
            Ok(report) => {
                warn!(status = report.status, body = %report.body, "Backend rejected event");
                LineOutcome::Rejected {
                    status: report.status,
                }
            }
            Err(e) => {
                error!(error = %e, node_id = event.node_id(), seq = event.seq(), "Failed to send event");
                LineOutcome::BackendUnavailable
            }
        }
    }

    /// Open the transport, retrying as configured.
    ///
    /// `Ok(None)` means cancellation arrived first.
    async fn acquire<T, F>(
        &mut self,
        mut open: F,
        cancel: &CancellationToken,
    ) -> Result<Option<T>, GatewayError>
    where
        T: LineTransport,
        F: FnMut() -> loragate_hardware::Result<T>,
    {
        let attempts = self.config.open_attempts.max(1);
        let mut last_error = None;

        for attempt in 1..=attempts {
            if cancel.is_cancelled() {
                return Ok(None);
            }

            match open() {
                Ok(transport) => {
                    info!(transport = transport.name(), attempt, "Serial transport open");
                    return Ok(Some(transport));
                }
                Err(e) => {
                    warn!(attempt, attempts, error = %e, "Failed to open serial transport");
                    last_error = Some(e);
                }
            }

            if attempt < attempts && !pause(self.config.open_retry_delay, cancel).await {
                return Ok(None);
            }
        }

        self.lifecycle.transition_to(GatewayState::Failed)?;

        let source =
            last_error.unwrap_or_else(|| TransportError::other("no open attempt was made"));
        error!(attempts, error = %source, "Giving up on serial transport");
        Err(GatewayError::StartupFatal { attempts, source })
    }
}

/// Sleep unless cancelled first; `false` means cancelled.
async fn pause(duration: Duration, cancel: &CancellationToken) -> bool {
    tokio::select! {
        biased;
        () = cancel.cancelled() => false,
        () = tokio::time::sleep(duration) => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(LineOutcome::Idle, GatewayStats::default())]
    #[case(LineOutcome::Ignored, GatewayStats { lines_read: 1, foreign_lines: 1, ..Default::default() })]
    #[case(LineOutcome::Malformed, GatewayStats { lines_read: 1, malformed_lines: 1, ..Default::default() })]
    #[case(
        LineOutcome::Unauthenticated { node_id: 9 },
        GatewayStats { lines_read: 1, events_decoded: 1, unauthenticated_events: 1, ..Default::default() }
    )]
    #[case(
        LineOutcome::Delivered { status: 200 },
        GatewayStats { lines_read: 1, events_decoded: 1, forwarded: 1, ..Default::default() }
    )]
    #[case(
        LineOutcome::Rejected { status: 500 },
        GatewayStats { lines_read: 1, events_decoded: 1, rejected_by_backend: 1, ..Default::default() }
    )]
    #[case(
        LineOutcome::BackendUnavailable,
        GatewayStats { lines_read: 1, events_decoded: 1, backend_failures: 1, ..Default::default() }
    )]
    #[case(LineOutcome::TransportFailed, GatewayStats { transport_errors: 1, ..Default::default() })]
    fn test_stats_record(#[case] outcome: LineOutcome, #[case] expected: GatewayStats) {
        let mut stats = GatewayStats::default();
        stats.record(&outcome);
        assert_eq!(stats, expected);
    }

    #[test]
    fn test_forward_attempts() {
        let mut stats = GatewayStats::default();
        stats.record(&LineOutcome::Delivered { status: 201 });
        stats.record(&LineOutcome::Rejected { status: 401 });
        stats.record(&LineOutcome::BackendUnavailable);
        stats.record(&LineOutcome::Unauthenticated { node_id: 4 });
        assert_eq!(stats.forward_attempts(), 3);
    }

    #[test]
    fn test_backoff_selection() {
        let config = RunLoopConfig {
            read_error_backoff: Duration::from_millis(10),
            backend_failure_backoff: Duration::from_millis(20),
            ..RunLoopConfig::default()
        };

        assert_eq!(
            LineOutcome::TransportFailed.backoff(&config),
            Some(Duration::from_millis(10))
        );
        assert_eq!(
            LineOutcome::BackendUnavailable.backoff(&config),
            Some(Duration::from_millis(20))
        );
        assert_eq!(LineOutcome::Malformed.backoff(&config), None);
        assert_eq!(LineOutcome::Rejected { status: 500 }.backoff(&config), None);
        assert_eq!(LineOutcome::Idle.backoff(&config), None);
    }

    #[test]
    fn test_default_run_loop_config() {
        let config = RunLoopConfig::default();
        assert_eq!(config.open_attempts, 1);
        assert_eq!(config.read_error_backoff, Duration::from_secs(1));
        assert_eq!(config.backend_failure_backoff, Duration::from_secs(1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_pause_cancelled() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        assert!(!pause(Duration::from_secs(60), &cancel).await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_pause_elapses() {
        let cancel = CancellationToken::new();
        assert!(pause(Duration::from_secs(1), &cancel).await);
    }
}
