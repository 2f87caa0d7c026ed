// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// mDNS-SD advertisement of the three print services.
//
// `_ipp._tcp.local.` lets desktop and mobile systems add the printer
// without configuration; the two `_pdl-datastream._tcp.local.` services
// announce the raw text and image sockets.  Advertisement is best-effort:
// every failure is logged and the printer keeps working by direct address.

use mdns_sd::{ServiceDaemon, ServiceInfo};
use tracing::{debug, info, warn};

use printdown_core::error::{PrintdownError, Result};

use crate::ipp_server::PRINTER_PATH;

/// Service type for IPP printers.
pub const IPP_SERVICE_TYPE: &str = "_ipp._tcp.local.";

/// Service type for raw socket printing.
pub const RAW_SERVICE_TYPE: &str = "_pdl-datastream._tcp.local.";

/// Ports the services are reachable on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServicePorts {
    pub ipp: u16,
    pub text: u16,
    pub image: u16,
}

/// One service registration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceSpec {
    pub service_type: &'static str,
    pub instance_name: String,
    pub port: u16,
    pub properties: Vec<(&'static str, String)>,
}

/// Registers and unregisters the printer's services.
pub struct Advertiser {
    printer_name: String,
    hostname: String,
    ports: ServicePorts,
    daemon: Option<ServiceDaemon>,
    registered: Vec<String>,
}

impl Advertiser {
    pub fn new(printer_name: impl Into<String>, ports: ServicePorts) -> Self {
        let hostname = std::env::var("HOSTNAME").unwrap_or_else(|_| "printdown".into());
        Self {
            printer_name: printer_name.into(),
            hostname,
            ports,
            daemon: None,
            registered: Vec::new(),
        }
    }

    /// Whether at least one service is currently registered.
    pub fn is_running(&self) -> bool {
        !self.registered.is_empty()
    }

    /// Full names of the registered services.
    pub fn registered(&self) -> &[String] {
        &self.registered
    }

    /// The registrations `start` performs.
    pub fn services(&self) -> Vec<ServiceSpec> {
        let rp = PRINTER_PATH.trim_start_matches('/');
        vec![
            ServiceSpec {
                service_type: IPP_SERVICE_TYPE,
                instance_name: self.printer_name.clone(),
                port: self.ports.ipp,
                properties: vec![
                    ("txtvers", "1".into()),
                    ("qtotal", "1".into()),
                    ("rp", rp.into()),
                    ("ty", self.printer_name.clone()),
                    ("pdl", "application/pdf,text/plain".into()),
                ],
            },
            ServiceSpec {
                service_type: RAW_SERVICE_TYPE,
                instance_name: format!("{} Text", self.printer_name),
                port: self.ports.text,
                properties: vec![("ty", format!("{} Text", self.printer_name))],
            },
            ServiceSpec {
                service_type: RAW_SERVICE_TYPE,
                instance_name: format!("{} Image", self.printer_name),
                port: self.ports.image,
                properties: vec![("ty", format!("{} Image", self.printer_name))],
            },
        ]
    }

    /// Register all services.  Never fails; problems are logged.
    pub fn start(&mut self) {
        if self.daemon.is_some() {
            debug!("advertiser already running");
            return;
        }

        let daemon = match create_daemon() {
            Ok(d) => d,
            Err(e) => {
                warn!(error = %e, "advertisement disabled");
                return;
            }
        };

        let host = format!("{}.local.", self.hostname);
        for spec in self.services() {
            let properties: Vec<(&str, &str)> = spec
                .properties
                .iter()
                .map(|(k, v)| (*k, v.as_str()))
                .collect();

            let info = match ServiceInfo::new(
                spec.service_type,
                &spec.instance_name,
                &host,
                "", // no fixed address
                spec.port,
                &properties[..],
            ) {
                Ok(info) => info.enable_addr_auto(),
                Err(e) => {
                    warn!(service = %spec.instance_name, error = %e, "failed to build mDNS service info");
                    continue;
                }
            };

            let fullname = info.get_fullname().to_owned();
            match daemon.register(info) {
                Ok(()) => {
                    info!(
                        service_type = spec.service_type,
                        name = %spec.instance_name,
                        port = spec.port,
                        "mDNS service registered"
                    );
                    self.registered.push(fullname);
                }
                Err(e) => warn!(service = %spec.instance_name, error = %e, "failed to register mDNS service"),
            }
        }

        self.daemon = Some(daemon);
    }

    /// Unregister everything and shut the daemon down.
    pub fn stop(&mut self) {
        let Some(daemon) = self.daemon.take() else {
            return;
        };
        for fullname in self.registered.drain(..) {
            match daemon.unregister(&fullname) {
                Ok(_) => info!(name = %fullname, "mDNS service unregistered"),
                Err(e) => warn!(name = %fullname, error = %e, "failed to unregister mDNS service"),
            }
        }
        if let Err(e) = daemon.shutdown() {
            warn!(error = %e, "failed to shut down mDNS daemon");
        }
    }
}

fn create_daemon() -> Result<ServiceDaemon> {
    ServiceDaemon::new()
        .map_err(|e| PrintdownError::Discovery(format!("cannot create mDNS daemon: {e}")))
}

impl Drop for Advertiser {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn advertiser() -> Advertiser {
        Advertiser::new(
            "PrintDown",
            ServicePorts {
                ipp: 6310,
                text: 9100,
                image: 9101,
            },
        )
    }

    #[test]
    fn three_services_are_advertised() {
        let services = advertiser().services();
        assert_eq!(services.len(), 3);

        let ipp = &services[0];
        assert_eq!(ipp.service_type, "_ipp._tcp.local.");
        assert_eq!(ipp.port, 6310);
        assert!(ipp.properties.contains(&("rp", "ipp/print".to_string())));
        assert!(ipp.properties.contains(&("ty", "PrintDown".to_string())));

        let raw: Vec<(&str, u16)> = services[1..]
            .iter()
            .map(|s| (s.instance_name.as_str(), s.port))
            .collect();
        assert_eq!(raw, vec![("PrintDown Text", 9100), ("PrintDown Image", 9101)]);
        assert!(services[1..].iter().all(|s| s.service_type == RAW_SERVICE_TYPE));
    }

    #[test]
    fn start_and_stop_never_fail() {
        // Hosts without multicast yield no registrations rather than an error.
        let mut a = advertiser();
        a.start();
        assert!(a.registered().len() <= 3);
        a.stop();
        assert!(!a.is_running());
        assert!(a.registered().is_empty());
    }

    #[test]
    fn stop_without_start_is_harmless() {
        let mut a = advertiser();
        a.stop();
        assert!(!a.is_running());
    }
}
