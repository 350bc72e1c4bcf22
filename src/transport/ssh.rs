//! Interactive SSH shell sessions
//!
//! Switch CLIs are driven the way an operator would: log in, open a shell
//! with a pty, turn paging off, then write one command at a time and read
//! until the prompt comes back. Many FASTPATH builds refuse exec requests,
//! so no exec channel is used. One shell is kept per transport and reused
//! across commands; any failure drops it and the next command reconnects.

use std::path::PathBuf;
use std::sync::{Arc, LazyLock};
use std::time::Duration;

use async_trait::async_trait;
use regex::Regex;
use russh::client::{self, Handle, Msg};
use russh::{Channel, ChannelMsg, Disconnect};
use russh_keys::key::PublicKey;
use tokio::sync::Mutex;

use super::Transport;
use crate::config::SshSettings;
use crate::constants::{DEFAULT_SSH_PORT, PAGER_OFF_COMMAND};
use crate::error::{Error, Result};

static PROMPT: LazyLock<Regex> = LazyLock::new(|| {
    // `Switch#`, `sw1(config)#`, `(M4300-52G) #`, `(GS724T) >`
    Regex::new(r"^(?:\([^()\r\n]{1,64}\)|[\w.\-@/:]{1,64}(?:\([\w.\-]+\))?)\s?[>#]$").unwrap()
});
static PAGER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"(?i)--\s*more\s*--(?:\s*or\s*\(q\)uit)?",
        r"|more:\s*<space>,\s*quit:\s*q(?:\s*or\s*ctrl\+z)?(?:,\s*one line:\s*<return>)?",
        r"|press any key to continue",
    ))
    .unwrap()
});
static ANSI: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\x1b\[[0-9;?]*[A-Za-z]").unwrap());

/// How the transport proves who it is
#[derive(Clone)]
pub enum SshAuth {
    Password(String),
    KeyFile { path: PathBuf, passphrase: Option<String> },
}

impl std::fmt::Debug for SshAuth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SshAuth::Password(_) => f.write_str("Password(..)"),
            SshAuth::KeyFile { path, .. } => f.debug_struct("KeyFile").field("path", path).finish_non_exhaustive(),
        }
    }
}

/// Runs commands in an interactive shell over SSH
pub struct SshTransport {
    user: String,
    port: u16,
    auth: SshAuth,
    /// Expected `SHA256:` fingerprint; any key is accepted (and logged) when unset
    host_key: Option<String>,
    shell: Mutex<Option<Shell>>,
}

impl SshTransport {
    pub fn new(user: impl Into<String>, port: u16, auth: SshAuth) -> Self {
        Self {
            user: user.into(),
            port,
            auth,
            host_key: None,
            shell: Mutex::new(None),
        }
    }

    pub fn with_host_key(mut self, fingerprint: impl Into<String>) -> Self {
        self.host_key = Some(fingerprint.into());
        self
    }

    /// Build from configured login details plus secrets read from the environment
    ///
    /// A key file wins over a password when both are available.
    pub fn from_settings(settings: &SshSettings, password: Option<String>, passphrase: Option<String>) -> Result<Self> {
        let Some(user) = settings.username.clone().filter(|u| !u.trim().is_empty()) else {
            return Err(Error::InvalidConfig("SSH polling needs a username".into()));
        };
        let auth = match (&settings.key_file, password) {
            (Some(path), _) => SshAuth::KeyFile {
                path: path.clone(),
                passphrase,
            },
            (None, Some(password)) if !password.is_empty() => SshAuth::Password(password),
            _ => {
                return Err(Error::InvalidConfig(
                    "SSH polling needs a key file or a password in the environment".into(),
                ));
            }
        };
        let transport = Self::new(user, settings.port.unwrap_or(DEFAULT_SSH_PORT), auth);
        Ok(match &settings.host_key {
            Some(fingerprint) => transport.with_host_key(fingerprint.clone()),
            None => transport,
        })
    }

    async fn open(&self, device_id: &str) -> std::result::Result<Shell, String> {
        let config = Arc::new(client::Config {
            inactivity_timeout: Some(Duration::from_secs(300)),
            ..Default::default()
        });
        let check = HostKeyCheck {
            device_id: device_id.to_string(),
            expected: self.host_key.clone(),
        };
        let mut handle = client::connect(config, (device_id, self.port), check)
            .await
            .map_err(|e| format!("connect: {e}"))?;

        let accepted = match &self.auth {
            SshAuth::Password(password) => handle.authenticate_password(self.user.as_str(), password.as_str()).await,
            SshAuth::KeyFile { path, passphrase } => {
                let key = russh_keys::load_secret_key(path, passphrase.as_deref())
                    .map_err(|e| format!("{}: {e}", path.display()))?;
                handle.authenticate_publickey(self.user.as_str(), Arc::new(key)).await
            }
        }
        .map_err(|e| format!("authentication: {e}"))?;
        if !accepted {
            return Err(format!("authentication rejected for user `{}`", self.user));
        }

        let channel = handle.channel_open_session().await.map_err(|e| e.to_string())?;
        channel
            .request_pty(false, "vt100", 200, 0, 0, 0, &[])
            .await
            .map_err(|e| format!("pty: {e}"))?;
        channel.request_shell(false).await.map_err(|e| format!("shell: {e}"))?;

        let mut shell = Shell { handle, channel };
        shell.read_until_prompt().await?;
        // best effort; pager prompts are answered anyway
        shell.run(PAGER_OFF_COMMAND).await?;
        tracing::debug!(device_id, user = %self.user, port = self.port, "ssh shell ready");
        Ok(shell)
    }

    async fn run_in_session(
        &self,
        slot: &mut Option<Shell>,
        device_id: &str,
        command: &str,
    ) -> std::result::Result<String, String> {
        if slot.is_none() {
            *slot = Some(self.open(device_id).await?);
        }
        let shell = slot.as_mut().ok_or("shell unavailable")?;
        shell.run(command).await
    }
}

impl Transport for SshTransport {
    async fn execute(&self, device_id: &str, command: &str, timeout: Duration) -> Result<String> {
        let mut slot = self.shell.lock().await;
        let outcome = tokio::time::timeout(timeout, self.run_in_session(&mut slot, device_id, command)).await;
        let reason = match outcome {
            Ok(Ok(text)) => return Ok(text),
            Ok(Err(reason)) => reason,
            Err(_) => format!("timed out after {}s", timeout.as_secs()),
        };
        // a half-read shell is out of step with the prompt; start over next time
        if let Some(shell) = slot.take() {
            shell.close().await;
        }
        Err(Error::transport(device_id, command, reason))
    }
}

struct Shell {
    handle: Handle<HostKeyCheck>,
    channel: Channel<Msg>,
}

impl Shell {
    async fn run(&mut self, command: &str) -> std::result::Result<String, String> {
        self.channel
            .data(format!("{command}\n").as_bytes())
            .await
            .map_err(|e| format!("write: {e}"))?;
        let raw = self.read_until_prompt().await?;
        Ok(clean_output(&raw, command))
    }

    async fn read_until_prompt(&mut self) -> std::result::Result<String, String> {
        let mut buf = String::new();
        let mut answered = 0;
        loop {
            match self.channel.wait().await {
                Some(ChannelMsg::Data { data }) => {
                    buf.push_str(&String::from_utf8_lossy(&data));
                    if pager_pending(&buf[answered..]) {
                        self.channel.data(&b" "[..]).await.map_err(|e| format!("write: {e}"))?;
                        answered = buf.len();
                        continue;
                    }
                    if ends_with_prompt(&buf) {
                        return Ok(buf);
                    }
                }
                Some(ChannelMsg::Eof | ChannelMsg::Close) | None => return Err("device closed the shell".into()),
                Some(_) => {}
            }
        }
    }

    async fn close(self) {
        let _ = self.handle.disconnect(Disconnect::ByApplication, "", "English").await;
    }
}

struct HostKeyCheck {
    device_id: String,
    expected: Option<String>,
}

#[async_trait]
impl client::Handler for HostKeyCheck {
    type Error = russh::Error;

    async fn check_server_key(&mut self, server_public_key: &PublicKey) -> std::result::Result<bool, Self::Error> {
        let fingerprint = server_public_key.fingerprint();
        match &self.expected {
            Some(expected) => {
                let matches = expected.trim_start_matches("SHA256:") == fingerprint;
                if !matches {
                    tracing::warn!(device_id = %self.device_id, %fingerprint, "host key does not match the configured fingerprint");
                }
                Ok(matches)
            }
            None => {
                tracing::info!(device_id = %self.device_id, %fingerprint, "accepting unverified host key");
                Ok(true)
            }
        }
    }
}

fn last_line(buf: &str) -> &str {
    buf.rsplit(['\n', '\r']).next().unwrap_or_default()
}

/// The shell is waiting for input at a CLI prompt
pub(crate) fn ends_with_prompt(buf: &str) -> bool {
    let tail = ANSI.replace_all(last_line(buf), "");
    PROMPT.is_match(tail.trim())
}

/// The device paused output behind a pager
pub(crate) fn pager_pending(buf: &str) -> bool {
    PAGER.is_match(last_line(buf))
}

/// Command output without the echoed command, the trailing prompt or terminal noise
pub(crate) fn clean_output(raw: &str, command: &str) -> String {
    let text = ANSI.replace_all(raw, "");
    let mut lines: Vec<String> = text
        .split('\n')
        .map(|line| {
            // backspaces erase the pager prompt on most CLIs
            let kept: String = line.chars().filter(|c| *c != '\r' && *c != '\u{8}').collect();
            let kept = match PAGER.find(&kept) {
                Some(pager) => kept[pager.end()..].trim_start().to_string(),
                None => kept,
            };
            kept.trim_end().to_string()
        })
        .collect();

    if lines.last().is_some_and(|l| l.is_empty() || PROMPT.is_match(l.trim())) {
        lines.pop();
    }
    if let Some(first) = lines.iter().position(|l| !l.trim().is_empty()) {
        if lines[first].contains(command.trim()) {
            lines.drain(..=first);
        }
    }

    let mut out = lines.join("\n");
    if !out.is_empty() {
        out.push('\n');
    }
    out
}
