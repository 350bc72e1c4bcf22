use std::future::Future;
use std::path::PathBuf;
use std::time::Duration;

use crate::error::{Error, Result};

mod ssh;

pub use ssh::{SshAuth, SshTransport};

/// Runs one CLI command on a switch and returns its raw text output
pub trait Transport: Send + Sync {
    fn execute(&self, device_id: &str, command: &str, timeout: Duration) -> impl Future<Output = Result<String>> + Send;
}

/// Replays CLI output captured earlier, one file per command
///
/// `show ip igmp groups` is read from `<root>/show_ip_igmp_groups.txt`.
#[derive(Debug, Clone)]
pub struct CaptureTransport {
    pub root: PathBuf,
}

impl CaptureTransport {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn path_for(&self, command: &str) -> PathBuf {
        let name: String = command
            .split_whitespace()
            .collect::<Vec<_>>()
            .join("_")
            .chars()
            .filter(|c| c.is_ascii_alphanumeric() || *c == '_' || *c == '-')
            .collect();
        self.root.join(format!("{name}.txt"))
    }
}

impl Transport for CaptureTransport {
    async fn execute(&self, device_id: &str, command: &str, _timeout: Duration) -> Result<String> {
        let path = self.path_for(command);
        tokio::fs::read_to_string(&path)
            .await
            .map_err(|e| Error::transport(device_id, command, format!("{}: {e}", path.display())))
    }
}
