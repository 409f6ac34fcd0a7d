use std::net::{IpAddr, SocketAddr};

use async_trait::async_trait;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::timeout;

use super::structure::{ProbeConfig, ProbeResult};
use crate::errors::ProbeError;

#[async_trait]
pub trait Probe: Send + Sync {
    /// Banner text for `address`, or `Error: <description>` when the
    /// exchange fails. Never panics on network errors.
    async fn probe(&self, address: &str) -> String;

    async fn probe_result(&self, address: &str) -> ProbeResult {
        ProbeResult::new(address, self.probe(address).await)
    }
}

/// Raw-socket HTTP banner grabber.
///
/// Sends `GET /` with the address itself as the `Host` header and keeps
/// whatever a single read returns.
#[derive(Debug, Clone, Default)]
pub struct BannerProber {
    config: ProbeConfig,
}

impl BannerProber {
    pub fn new(config: ProbeConfig) -> Self {
        Self { config }
    }

    async fn grab_http_banner(&self, address: &str) -> Result<String, ProbeError> {
        let ip: IpAddr = address.parse()?;
        let socket_addr = SocketAddr::new(ip, self.config.port);

        let mut stream = timeout(self.config.timeout, TcpStream::connect(socket_addr))
            .await
            .map_err(|_| ProbeError::TimedOut)??;

        stream.write_all(&http_request(address)).await?;

        let mut buffer = vec![0; self.config.read_size];
        let n = timeout(self.config.timeout, stream.read(&mut buffer))
            .await
            .map_err(|_| ProbeError::TimedOut)??;

        Ok(String::from_utf8_lossy(&buffer[..n]).to_string())
    }
}

/// Request line sent to every address. The Host header carries the IP
/// literal, so name-based virtual hosts answer with their default site.
pub fn http_request(host: &str) -> Vec<u8> {
    format!("GET / HTTP/1.1\r\nHost: {}\r\n\r\n", host).into_bytes()
}

#[async_trait]
impl Probe for BannerProber {
    async fn probe(&self, address: &str) -> String {
        match self.grab_http_banner(address).await {
            Ok(banner) => banner,
            Err(e) => {
                tracing::debug!(address, port = self.config.port, error = %e, "banner grab failed");
                format!("Error: {}", e)
            }
        }
    }
}
