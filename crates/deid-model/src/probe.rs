use async_trait::async_trait;
use std::time::Duration;
use tokio::net::TcpStream;
use tracing::debug;

use crate::error::{ModelError, Result};

/// Cheap reachability check run before committing to a long transfer.
#[async_trait]
pub trait ConnectivityProbe: Send + Sync {
    async fn probe(&self, host: &str, port: u16, limit: Duration) -> Result<()>;
}

/// Opens (and immediately drops) a bare TCP connection.
#[derive(Debug, Clone, Copy, Default)]
pub struct TcpProbe;

#[async_trait]
impl ConnectivityProbe for TcpProbe {
    async fn probe(&self, host: &str, port: u16, limit: Duration) -> Result<()> {
        debug!("Probing {}:{} (limit {:?})", host, port, limit);
        match tokio::time::timeout(limit, TcpStream::connect((host, port))).await {
            Ok(Ok(_stream)) => Ok(()),
            Ok(Err(e)) => Err(ModelError::Connectivity {
                host: host.to_string(),
                port,
                reason: e.to_string(),
            }),
            Err(_) => Err(ModelError::Connectivity {
                host: host.to_string(),
                port,
                reason: format!("no answer within {:?}", limit),
            }),
        }
    }
}
