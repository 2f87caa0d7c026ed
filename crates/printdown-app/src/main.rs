// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// PrintDown: network print server for ESC/POS thermal printers.
//
// Entry point. Initialises logging, resolves configuration (file, then
// environment, then command line), starts the services, and waits for
// Ctrl-C.

mod config_dir;
mod services;

use std::net::IpAddr;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::Parser;
use tracing::{error, info};

use printdown_core::config::AppConfig;
use printdown_core::error::Result;

use services::PrintServices;

#[derive(Debug, Parser)]
#[command(name = "printdown", version, about = "Network print server for ESC/POS thermal printers")]
struct Cli {
    /// JSON configuration file.  Defaults to $XDG_CONFIG_HOME/printdown/config.json
    /// when that file exists.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Printer device path, e.g. /dev/usb/lp0
    #[arg(short, long)]
    device: Option<PathBuf>,

    /// Address all listeners bind to
    #[arg(long)]
    bind: Option<IpAddr>,

    #[arg(long)]
    ipp_port: Option<u16>,

    #[arg(long)]
    text_port: Option<u16>,

    #[arg(long)]
    image_port: Option<u16>,

    /// Name reported over IPP and mDNS
    #[arg(long)]
    name: Option<String>,

    /// Character that marks a paper cut when it fills a whole line
    #[arg(long)]
    cut_delimiter: Option<char>,

    /// Do not advertise the services over mDNS
    #[arg(long)]
    no_advertise: bool,
}

impl Cli {
    fn apply(&self, config: &mut AppConfig) {
        if let Some(device) = &self.device {
            config.device_path = device.clone();
        }
        if let Some(bind) = self.bind {
            config.bind_address = bind;
        }
        if let Some(port) = self.ipp_port {
            config.ipp_port = port;
        }
        if let Some(port) = self.text_port {
            config.text_port = port;
        }
        if let Some(port) = self.image_port {
            config.image_port = port;
        }
        if let Some(name) = &self.name {
            config.printer_name = name.clone();
        }
        if let Some(delimiter) = self.cut_delimiter {
            config.paper_cut_delimiter = delimiter;
        }
        if self.no_advertise {
            config.advertise = false;
        }
    }
}

/// Build the effective configuration.  An explicit `--config` must exist;
/// the default location is used only when present.
fn resolve_config(cli: &Cli, default_path: Option<&Path>) -> Result<AppConfig> {
    let mut config = match (&cli.config, default_path) {
        (Some(path), _) => AppConfig::load(path)?,
        (None, Some(path)) if path.is_file() => AppConfig::load(path)?,
        _ => AppConfig::default(),
    };
    config.apply_env()?;
    cli.apply(&mut config);
    config.validate()?;
    Ok(config)
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let default_path = config_dir::default_config_path();
    let config = match resolve_config(&cli, default_path.as_deref()) {
        Ok(c) => c,
        Err(e) => {
            error!(error = %e, "configuration rejected");
            return ExitCode::FAILURE;
        }
    };

    info!(version = env!("CARGO_PKG_VERSION"), "PrintDown starting");

    let services = match PrintServices::start(&config).await {
        Ok(s) => s,
        Err(e) => {
            error!(error = %e, "failed to start print server");
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "cannot listen for Ctrl-C; shutting down");
    }
    services.shutdown().await;
    ExitCode::SUCCESS
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cli(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("printdown").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn flags_override_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{ "printer_name": "Kitchen", "text_port": 9200 }"#).unwrap();

        let args = cli(&[
            "--config",
            path.to_str().unwrap(),
            "--text-port",
            "9300",
            "--device",
            "/dev/usb/lp1",
            "--no-advertise",
        ]);
        let config = resolve_config(&args, None).unwrap();

        assert_eq!(config.printer_name, "Kitchen");
        assert_eq!(config.text_port, 9300);
        assert_eq!(config.device_path, PathBuf::from("/dev/usb/lp1"));
        assert!(!config.advertise);
    }

    #[test]
    fn absent_default_file_means_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = resolve_config(&cli(&[]), Some(&dir.path().join("none.json"))).unwrap();
        assert_eq!(config.printer_name, AppConfig::default().printer_name);
    }

    #[test]
    fn explicit_missing_file_is_an_error() {
        let args = cli(&["--config", "/nonexistent/printdown.json"]);
        assert!(resolve_config(&args, None).is_err());
    }

    #[test]
    fn whitespace_cut_delimiter_is_rejected() {
        let args = cli(&["--cut-delimiter", " "]);
        assert!(resolve_config(&args, None).is_err());
    }
}
