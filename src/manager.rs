use std::io;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context as _;
use log::{debug, error, info, warn};
use tokio::io::{AsyncBufRead, AsyncBufReadExt as _};
use tokio::task::JoinSet;

use crate::bridge::Bridge;
use crate::config::BridgeConfig;
use crate::messages::BridgeCall;

pub struct Manager {
    bridge: Arc<Bridge>,
    default_method: String,
    idle_interval: Duration,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    pub dispatched: usize,
    pub malformed: usize,
}

impl Manager {
    pub fn new(bridge: Bridge, config: &BridgeConfig) -> Self {
        Manager {
            bridge: Arc::new(bridge),
            default_method: config.handler_name(),
            idle_interval: config.idle_interval(),
        }
    }

    /// Reads bridge calls line by line from `input` until it closes or
    /// `shutdown` resolves, then waits for in-flight calls to finish.
    /// In-flight calls are also drained before a read failure is returned.
    ///
    /// Every call runs on its own task so a slow webhook never holds up the
    /// reader or the idle tick.
    pub async fn run_loop<R, S>(self, input: R, shutdown: S) -> anyhow::Result<RunSummary>
    where
        R: AsyncBufRead + Unpin,
        S: Future<Output = ()>,
    {
        let mut lines = input.lines();
        let mut idle = tokio::time::interval(self.idle_interval);
        let mut in_flight = JoinSet::new();
        let mut summary = RunSummary::default();
        let mut read_error = None;
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                line = lines.next_line() => {
                    match line {
                        Ok(Some(line)) => self.handle_line(&line, &mut in_flight, &mut summary),
                        Ok(None) => {
                            info!("Bridge input closed");
                            break;
                        }
                        // The offending line has been consumed, carry on with the next one.
                        Err(err) if err.kind() == io::ErrorKind::InvalidData => {
                            summary.malformed += 1;
                            warn!("Ignoring unreadable bridge input: {}", err);
                        }
                        Err(err) => {
                            error!("Bridge input failed: {}", err);
                            read_error = Some(err);
                            break;
                        }
                    }
                }
                Some(joined) = in_flight.join_next(), if !in_flight.is_empty() => {
                    log_join(joined);
                }
                _ = idle.tick() => {
                    debug!("Idle, {} call(s) in flight", in_flight.len());
                }
                _ = &mut shutdown => {
                    info!("Shutdown requested");
                    break;
                }
            }
        }

        if !in_flight.is_empty() {
            info!("Waiting for {} in-flight call(s)", in_flight.len());
        }
        while let Some(joined) = in_flight.join_next().await {
            log_join(joined);
        }
        info!("Exiting manager event loop");

        match read_error {
            Some(err) => Err(err).context("reading bridge input"),
            None => Ok(summary),
        }
    }

    fn handle_line(&self, line: &str, in_flight: &mut JoinSet<()>, summary: &mut RunSummary) {
        let line = line.trim();
        if line.is_empty() {
            return;
        }

        match BridgeCall::parse(line, &self.default_method) {
            Ok(call) => {
                debug!("Dispatching bridge call {:?}", call);
                summary.dispatched += 1;
                let bridge = self.bridge.clone();
                in_flight.spawn(async move { bridge.dispatch_logged(call).await });
            }
            Err(err) => {
                summary.malformed += 1;
                warn!("Ignoring malformed bridge input {:?}: {}", line, err);
            }
        }
    }
}

fn log_join(joined: Result<(), tokio::task::JoinError>) {
    if let Err(err) = joined {
        error!("Bridge handler task failed: {:?}", err);
    }
}
