//! Update server selection
//!
//! Every configured endpoint is probed on its own thread by reading at most
//! the configured byte budget of the speed test file. Results come back over
//! a channel; an endpoint that has not answered when its deadline passes is
//! treated as unreachable and the selection proceeds without it.

use std::io::{self, Read};
use std::sync::Arc;
use std::sync::mpsc;
use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};
use url::Url;

use crate::config::EngineConfig;
use crate::error::{Result, TriquetraError};
use crate::remote::{self, Transport};

/// Result of probing one endpoint
#[derive(Debug, Clone, PartialEq)]
pub enum ProbeOutcome {
    Reachable { bytes: u64, elapsed: Duration },
    Unreachable { reason: String },
}

impl ProbeOutcome {
    /// Bytes per second; `None` when unreachable or nothing was read
    pub fn throughput(&self) -> Option<f64> {
        match self {
            ProbeOutcome::Reachable { bytes: 0, .. } => None,
            ProbeOutcome::Reachable { bytes, elapsed } => {
                let secs = elapsed.as_secs_f64().max(1e-6);
                #[allow(clippy::cast_precision_loss)]
                Some(*bytes as f64 / secs)
            }
            ProbeOutcome::Unreachable { .. } => None,
        }
    }
}

/// Probe report for one endpoint, in declared priority order
#[derive(Debug, Clone, PartialEq)]
pub struct EndpointProbe {
    pub endpoint: Url,
    pub outcome: ProbeOutcome,
}

/// The endpoint the rest of the run talks to
#[derive(Debug, Clone, PartialEq)]
pub struct SelectedEndpoint {
    pub url: Url,
    /// Measured throughput in bytes per second; `None` when not probed
    pub throughput: Option<f64>,
    pub probes: Vec<EndpointProbe>,
}

/// Pick the endpoint to use for this run
pub fn select_endpoint(
    transport: &Arc<dyn Transport>,
    config: &EngineConfig,
) -> Result<SelectedEndpoint> {
    if config.failsafe {
        info!(endpoint = %config.failsafe_endpoint, "failsafe mode, skipping mirror tests");
        return Ok(SelectedEndpoint {
            url: config.failsafe_endpoint.clone(),
            throughput: None,
            probes: Vec::new(),
        });
    }

    let endpoints = config.endpoints();
    let probes = probe_endpoints(
        transport,
        &endpoints,
        &config.probe.test_file,
        config.probe.max_bytes,
        config.probe.timeout,
    );
    choose(probes)
}

/// Probe all endpoints concurrently, each bounded by `timeout`
pub fn probe_endpoints(
    transport: &Arc<dyn Transport>,
    endpoints: &[Url],
    test_file: &str,
    max_bytes: u64,
    timeout: Duration,
) -> Vec<EndpointProbe> {
    let (tx, rx) = mpsc::channel::<(usize, ProbeOutcome)>();
    let started = Instant::now();

    for (index, endpoint) in endpoints.iter().enumerate() {
        let tx = tx.clone();
        let transport = Arc::clone(transport);
        let endpoint = endpoint.clone();
        let test_file = test_file.to_string();
        thread::spawn(move || {
            let outcome = probe_one(transport.as_ref(), &endpoint, &test_file, max_bytes, timeout);
            // The receiver is gone once the deadline has passed
            let _ = tx.send((index, outcome));
        });
    }
    drop(tx);

    let mut outcomes: Vec<Option<ProbeOutcome>> = vec![None; endpoints.len()];
    let deadline = started + timeout;
    let mut pending = endpoints.len();
    while pending > 0 {
        let remaining = deadline.saturating_duration_since(Instant::now());
        match rx.recv_timeout(remaining) {
            Ok((index, outcome)) => {
                outcomes[index] = Some(outcome);
                pending -= 1;
            }
            Err(_) => break,
        }
    }

    endpoints
        .iter()
        .zip(outcomes)
        .map(|(endpoint, outcome)| {
            let outcome = outcome.unwrap_or_else(|| ProbeOutcome::Unreachable {
                reason: format!("no answer within {}s", timeout.as_secs_f32()),
            });
            match &outcome {
                ProbeOutcome::Reachable { bytes, elapsed } => {
                    debug!(%endpoint, bytes, ?elapsed, "endpoint probe finished");
                }
                ProbeOutcome::Unreachable { reason } => {
                    warn!(%endpoint, %reason, "endpoint unreachable");
                }
            }
            EndpointProbe {
                endpoint: endpoint.clone(),
                outcome,
            }
        })
        .collect()
}

fn probe_one(
    transport: &dyn Transport,
    endpoint: &Url,
    test_file: &str,
    max_bytes: u64,
    timeout: Duration,
) -> ProbeOutcome {
    let started = Instant::now();
    let result = remote::join(endpoint, test_file)
        .and_then(|url| transport.open(&url, Some(timeout)))
        .and_then(|body| {
            io::copy(&mut body.reader.take(max_bytes), &mut io::sink())
                .map_err(|e| crate::error::network::http(endpoint, e))
        });

    let elapsed = started.elapsed();
    match result {
        Ok(_) if elapsed > timeout => ProbeOutcome::Unreachable {
            reason: "speed test exceeded the timeout".to_string(),
        },
        Ok(bytes) => ProbeOutcome::Reachable { bytes, elapsed },
        Err(e) => ProbeOutcome::Unreachable {
            reason: e.to_string(),
        },
    }
}

/// Best throughput wins; ties keep the earlier (higher priority) endpoint
fn choose(probes: Vec<EndpointProbe>) -> Result<SelectedEndpoint> {
    let mut best: Option<(usize, f64)> = None;
    for (index, probe) in probes.iter().enumerate() {
        if let Some(throughput) = probe.outcome.throughput() {
            if best.is_none_or(|(_, current)| throughput > current) {
                best = Some((index, throughput));
            }
        }
    }

    let Some((index, throughput)) = best else {
        let tried = probes
            .iter()
            .map(|p| p.endpoint.to_string())
            .collect::<Vec<_>>()
            .join(", ");
        return Err(TriquetraError::NoEndpointAvailable { tried });
    };

    let url = probes[index].endpoint.clone();
    info!(endpoint = %url, throughput_kib = throughput / 1024.0, "selected update server");
    Ok(SelectedEndpoint {
        url,
        throughput: Some(throughput),
        probes,
    })
}
