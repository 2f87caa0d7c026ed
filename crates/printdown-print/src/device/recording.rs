// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Test double that records every driver call.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use printdown_core::directive::Alignment;
use printdown_core::error::DeviceError;

use super::{DeviceDriver, TextStyle};

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Call {
    Begin,
    Text(String),
    Style(TextStyle),
    Reset,
    Align(Alignment),
    Cut,
    Image(usize),
    End,
}

/// Records calls into a shared log.  Text containing `fail_on` fails with an
/// I/O error, and every `apply_text` sleeps for `delay`.
#[derive(Debug, Clone, Default)]
pub(crate) struct RecordingDriver {
    pub calls: Arc<Mutex<Vec<Call>>>,
    pub fail_on: Option<String>,
    pub delay: Duration,
}

impl RecordingDriver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_on(marker: &str) -> Self {
        Self {
            fail_on: Some(marker.to_owned()),
            ..Self::default()
        }
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    /// Text printed per job, in order.
    pub fn jobs(&self) -> Vec<String> {
        let mut jobs = Vec::new();
        let mut current = None;
        for call in self.calls() {
            match call {
                Call::Begin => current = Some(String::new()),
                Call::Text(t) => {
                    if let Some(job) = current.as_mut() {
                        job.push_str(&t);
                    }
                }
                Call::End => jobs.extend(current.take()),
                _ => {}
            }
        }
        jobs
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }
}

impl DeviceDriver for RecordingDriver {
    fn begin_job(&mut self) -> Result<(), DeviceError> {
        self.record(Call::Begin);
        Ok(())
    }

    fn apply_text(&mut self, text: &str) -> Result<(), DeviceError> {
        if !self.delay.is_zero() {
            std::thread::sleep(self.delay);
        }
        if let Some(marker) = &self.fail_on {
            if text.contains(marker.as_str()) {
                return Err(DeviceError::Io(std::io::Error::other("paper jam")));
            }
        }
        self.record(Call::Text(text.to_owned()));
        Ok(())
    }

    fn set_style(&mut self, style: TextStyle) -> Result<(), DeviceError> {
        self.record(Call::Style(style));
        Ok(())
    }

    fn reset_style(&mut self) -> Result<(), DeviceError> {
        self.record(Call::Reset);
        Ok(())
    }

    fn set_alignment(&mut self, alignment: Alignment) -> Result<(), DeviceError> {
        self.record(Call::Align(alignment));
        Ok(())
    }

    fn cut_paper(&mut self) -> Result<(), DeviceError> {
        self.record(Call::Cut);
        Ok(())
    }

    fn render_image(&mut self, image: &[u8]) -> Result<(), DeviceError> {
        self.record(Call::Image(image.len()));
        Ok(())
    }

    fn end_job(&mut self) -> Result<(), DeviceError> {
        self.record(Call::End);
        Ok(())
    }
}
