//! Bounded-retry reachability check gating the configure step.
//!
//! Configuration assumes all target hosts are simultaneously reachable, so
//! an attempt only counts as successful when every host connects. Partial
//! readiness is treated as not ready.

use std::net::SocketAddr;
use std::time::Duration;

use tokio::net::TcpStream;
use tokio::time::{sleep, timeout};

#[derive(Clone, Debug)]
pub struct ProbeConfig {
    pub max_attempts: u32,
    pub connect_timeout: Duration,
    pub backoff: Duration,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        ProbeConfig {
            max_attempts: 10,
            connect_timeout: Duration::from_secs(5),
            backoff: Duration::from_secs(10),
        }
    }
}

/// Poll every host's control-plane port until one attempt sees zero
/// failures, or `max_attempts` attempts have failed.
///
/// Hosts are probed sequentially within an attempt; each failed attempt
/// sleeps `backoff` before the next. Connectivity errors are never surfaced
/// past this function, only the overall boolean.
pub async fn wait_ready(hosts: &[SocketAddr], config: &ProbeConfig) -> bool {
    for attempt in 0..config.max_attempts {
        let mut all_reachable = true;

        for host in hosts {
            tracing::info!("Trying connection to [{host}: {attempt}]");

            match timeout(config.connect_timeout, TcpStream::connect(host)).await {
                Ok(Ok(_)) => {
                    tracing::info!("Connection success: [{host}: {attempt}]");
                }
                Ok(Err(e)) => {
                    tracing::warn!("Connection to {host} failed: {e}");
                    all_reachable = false;
                }
                Err(_) => {
                    tracing::warn!(
                        "Connection to {host} timed out after {:?}",
                        config.connect_timeout
                    );
                    all_reachable = false;
                }
            }
        }

        if all_reachable {
            return true;
        }

        sleep(config.backoff).await;
    }

    false
}
