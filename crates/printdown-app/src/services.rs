// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Service wiring: one queue, one executor thread owning the device, three
// listeners feeding the queue, and the mDNS advertiser.

use std::net::SocketAddr;
use std::sync::Arc;

use tracing::{error, info, warn};

use printdown_core::config::AppConfig;
use printdown_core::error::Result;
use printdown_document::convert::TextExtractor;
use printdown_print::{
    Advertiser, DeviceDriver, DeviceFile, EscPosDriver, Executor, ExecutorHandle,
    ExecutorSettings, ExecutorStats, IppServer, JobQueue, RawServer, ServicePorts,
};

/// Everything the running print server owns.
pub struct PrintServices {
    executor: ExecutorHandle,
    text: RawServer,
    image: RawServer,
    ipp: IppServer,
    advertiser: Option<Advertiser>,
}

impl PrintServices {
    /// Start against the ESC/POS device named in `config`.
    pub async fn start(config: &AppConfig) -> Result<Self> {
        let driver = EscPosDriver::new(
            DeviceFile::new(&config.device_path),
            config.print_width_dots,
        );
        info!(device = %config.device_path.display(), "using ESC/POS device");
        Self::start_with_driver(config, driver).await
    }

    /// Start with an arbitrary driver.  Listeners are bound in the order
    /// text, image, IPP; if any bind fails the ones already running are
    /// stopped before the error is returned.
    pub async fn start_with_driver<D>(config: &AppConfig, driver: D) -> Result<Self>
    where
        D: DeviceDriver + 'static,
    {
        let queue = JobQueue::new();
        let executor = Executor::spawn(queue.clone(), driver, ExecutorSettings::from(config))?;

        let mut text = RawServer::text(config);
        let mut image = RawServer::image(config);
        let mut ipp = IppServer::from_config(config);

        if let Err(e) = text.start(queue.clone()).await {
            abort(executor).await;
            return Err(e);
        }
        if let Err(e) = image.start(queue.clone()).await {
            stop_quietly(text.stop().await);
            abort(executor).await;
            return Err(e);
        }
        if let Err(e) = ipp.start(queue.clone(), Arc::new(TextExtractor)).await {
            stop_quietly(text.stop().await);
            stop_quietly(image.stop().await);
            abort(executor).await;
            return Err(e);
        }

        let advertiser = if config.advertise {
            let ports = ServicePorts {
                ipp: bound_port(ipp.local_addr(), config.ipp_port),
                text: bound_port(text.local_addr(), config.text_port),
                image: bound_port(image.local_addr(), config.image_port),
            };
            let mut advertiser = Advertiser::new(&config.printer_name, ports);
            advertiser.start();
            if !advertiser.is_running() {
                warn!("no mDNS services registered; clients must use the address directly");
            }
            Some(advertiser)
        } else {
            info!("mDNS advertisement disabled");
            None
        };

        info!(printer = %config.printer_name, "print server ready");
        Ok(Self {
            executor,
            text,
            image,
            ipp,
            advertiser,
        })
    }

    pub fn text_addr(&self) -> Option<SocketAddr> {
        self.text.local_addr()
    }

    pub fn image_addr(&self) -> Option<SocketAddr> {
        self.image.local_addr()
    }

    pub fn ipp_addr(&self) -> Option<SocketAddr> {
        self.ipp.local_addr()
    }

    pub fn stats(&self) -> ExecutorStats {
        self.executor.stats()
    }

    /// Stop intake, withdraw the advertisement, then let the executor finish
    /// every job it has already accepted.
    pub async fn shutdown(mut self) -> ExecutorStats {
        info!("shutting down");
        stop_quietly(self.ipp.stop().await);
        stop_quietly(self.text.stop().await);
        stop_quietly(self.image.stop().await);
        if let Some(mut advertiser) = self.advertiser.take() {
            advertiser.stop();
        }

        let pending = self.executor.queue().len();
        if pending > 0 {
            info!(pending, "waiting for queued jobs to print");
        }
        let executor = self.executor;
        let stats = match tokio::task::spawn_blocking(move || executor.shutdown()).await {
            Ok(stats) => stats,
            Err(e) => {
                error!(error = %e, "executor shutdown task failed");
                ExecutorStats::default()
            }
        };
        info!(completed = stats.completed, failed = stats.failed, "print server stopped");
        stats
    }
}

fn bound_port(addr: Option<SocketAddr>, configured: u16) -> u16 {
    addr.map_or(configured, |a| a.port())
}

fn stop_quietly(result: Result<()>) {
    if let Err(e) = result {
        warn!(error = %e, "listener did not stop cleanly");
    }
}

async fn abort(executor: ExecutorHandle) {
    if let Err(e) = tokio::task::spawn_blocking(move || executor.shutdown()).await {
        error!(error = %e, "executor shutdown task failed");
    }
}
