// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// PrintDown Print -- network front-ends (IPP, raw text, raw image), the job
// queue and executor that serialise jobs onto the printer, the ESC/POS
// device driver, and mDNS-SD advertisement.

pub mod device;
pub mod discovery;
pub mod executor;
pub mod http;
pub mod ipp;
pub mod ipp_server;
mod listener;
pub mod queue;
pub mod raw_server;

pub use device::{DeviceDriver, DeviceFile, EscPosDriver, TextStyle};
pub use discovery::{Advertiser, ServicePorts};
pub use executor::{Executor, ExecutorHandle, ExecutorSettings, ExecutorStats};
pub use ipp_server::IppServer;
pub use queue::JobQueue;
pub use raw_server::RawServer;
