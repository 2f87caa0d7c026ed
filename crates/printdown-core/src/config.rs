// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Application configuration.
//
// Settings are layered: built-in defaults, then an optional JSON file, then
// environment variables.  The binary applies command-line flags on top.

use std::net::{IpAddr, Ipv4Addr};
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{PrintdownError, Result};

/// Environment variable overriding the IPP port.
pub const ENV_IPP_PORT: &str = "IPP_PORT";

/// Environment variable overriding the raw text port.
pub const ENV_TEXT_PORT: &str = "TEXT_PORT";

/// Environment variable overriding the raw image port.
pub const ENV_IMAGE_PORT: &str = "IMAGE_PORT";

/// Environment variable overriding the printer device path.
pub const ENV_DEVICE: &str = "PRINTDOWN_DEVICE";

/// Persistent application settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Address all three listeners bind to.
    pub bind_address: IpAddr,
    /// Raw text listener port (default 9100).
    pub text_port: u16,
    /// Raw image listener port (default 9101).
    pub image_port: u16,
    /// IPP listener port.  Defaults to 6310 so no root privileges are needed.
    pub ipp_port: u16,
    /// Name returned in `printer-name` and advertised via mDNS.
    pub printer_name: String,
    /// Character device the printer is attached to (e.g. `/dev/usb/lp0`).
    pub device_path: PathBuf,
    /// Register the services via mDNS-SD on start.
    pub advertise: bool,
    /// A raw connection that stays silent this long is considered complete.
    pub idle_timeout_ms: u64,
    /// Upper bound on the bytes accepted from a single connection.
    pub max_request_bytes: usize,
    /// Character that, repeated three or more times on its own line, cuts the paper.
    pub paper_cut_delimiter: char,
    /// Blank lines fed before a paper cut.
    pub cut_feed_lines: u8,
    /// Pause between jobs to let the mechanism settle.
    pub settle_delay_ms: u64,
    /// Printable width in dots; images are scaled down to fit.
    pub print_width_dots: u32,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bind_address: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            text_port: 9100,
            image_port: 9101,
            ipp_port: 6310,
            printer_name: "PrintDown".into(),
            device_path: PathBuf::from("/dev/usb/lp0"),
            advertise: true,
            idle_timeout_ms: 200,
            max_request_bytes: 64 * 1024 * 1024,
            paper_cut_delimiter: '>',
            cut_feed_lines: 3,
            settle_delay_ms: 100,
            print_width_dots: 512,
        }
    }
}

impl AppConfig {
    /// Load settings from a JSON file.  Missing fields take their defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&raw)?;
        info!(path = %path.display(), "configuration loaded");
        Ok(config)
    }

    /// Apply overrides from the process environment.
    pub fn apply_env(&mut self) -> Result<()> {
        self.apply_env_with(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary variable lookup.
    pub fn apply_env_with<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(port) = lookup(ENV_IPP_PORT) {
            self.ipp_port = parse_port(ENV_IPP_PORT, &port)?;
        }
        if let Some(port) = lookup(ENV_TEXT_PORT) {
            self.text_port = parse_port(ENV_TEXT_PORT, &port)?;
        }
        if let Some(port) = lookup(ENV_IMAGE_PORT) {
            self.image_port = parse_port(ENV_IMAGE_PORT, &port)?;
        }
        if let Some(device) = lookup(ENV_DEVICE) {
            debug!(device = %device, "device path overridden from environment");
            self.device_path = PathBuf::from(device);
        }
        Ok(())
    }

    /// Reject settings the server cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.paper_cut_delimiter.is_whitespace() {
            return Err(PrintdownError::Config(
                "paper_cut_delimiter must not be whitespace".into(),
            ));
        }
        let ports = [self.text_port, self.image_port, self.ipp_port];
        let clash = ports
            .iter()
            .enumerate()
            .any(|(i, p)| *p != 0 && ports[i + 1..].contains(p));
        if clash {
            return Err(PrintdownError::Config(format!(
                "listener ports must differ (text {}, image {}, ipp {})",
                self.text_port, self.image_port, self.ipp_port
            )));
        }
        if self.print_width_dots < 8 {
            return Err(PrintdownError::Config(format!(
                "print_width_dots too small: {}",
                self.print_width_dots
            )));
        }
        if self.ipp_port != 0 && self.ipp_port < 1024 {
            warn!(port = self.ipp_port, "IPP port below 1024 usually requires root");
        }
        Ok(())
    }

    pub fn idle_timeout(&self) -> Duration {
        Duration::from_millis(self.idle_timeout_ms)
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }
}

fn parse_port(key: &str, value: &str) -> Result<u16> {
    value
        .trim()
        .parse::<u16>()
        .map_err(|e| PrintdownError::Config(format!("{key}={value:?}: {e}")))
}
