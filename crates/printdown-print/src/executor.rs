// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Job executor -- the only code that touches the printer.
//
// A dedicated OS thread owns the `DeviceDriver` and drains the `JobQueue`
// one job at a time.  The driver is borrowed mutably for the whole of a job,
// so directives from two jobs can never interleave on the paper.  A failing
// job is logged and counted; the thread moves on to the next one.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use tracing::{debug, error, info, warn};

use printdown_core::config::AppConfig;
use printdown_core::directive::{Alignment, Directive};
use printdown_core::error::{DeviceError, PrintdownError, Result};
use printdown_core::types::{JobPayload, JobStatus, PrintJob};
use printdown_document::markup::MarkupCompiler;

use crate::device::{DeviceDriver, TextStyle};
use crate::queue::{JobQueue, Next};

/// Tunables for the executor thread.
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutorSettings {
    /// Paper-cut delimiter handed to the markup compiler.
    pub cut_delimiter: char,
    /// Line feeds emitted before every cut.
    pub cut_feed_lines: u8,
    /// Pause after each job.
    pub settle_delay: Duration,
    /// Longest wait for a job before re-checking for shutdown.
    pub poll_interval: Duration,
}

impl Default for ExecutorSettings {
    fn default() -> Self {
        Self {
            cut_delimiter: '>',
            cut_feed_lines: 3,
            settle_delay: Duration::from_millis(100),
            poll_interval: Duration::from_millis(100),
        }
    }
}

impl From<&AppConfig> for ExecutorSettings {
    fn from(config: &AppConfig) -> Self {
        Self {
            cut_delimiter: config.paper_cut_delimiter,
            cut_feed_lines: config.cut_feed_lines,
            settle_delay: config.settle_delay(),
            ..Self::default()
        }
    }
}

/// Snapshot of executor counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExecutorStats {
    pub completed: u64,
    pub failed: u64,
}

#[derive(Debug, Default)]
struct Counters {
    completed: AtomicU64,
    failed: AtomicU64,
}

impl Counters {
    fn snapshot(&self) -> ExecutorStats {
        ExecutorStats {
            completed: self.completed.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
        }
    }
}

/// Entry point for starting the executor thread.
pub struct Executor;

impl Executor {
    /// Start the executor thread.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the OS refuses to create the thread.
    pub fn spawn<D>(queue: JobQueue, driver: D, settings: ExecutorSettings) -> Result<ExecutorHandle>
    where
        D: DeviceDriver + 'static,
    {
        let counters = Arc::new(Counters::default());
        let worker = Worker {
            queue: queue.clone(),
            driver,
            compiler: MarkupCompiler::new(settings.cut_delimiter),
            settings,
            counters: Arc::clone(&counters),
        };

        let thread = thread::Builder::new()
            .name("printdown-executor".into())
            .spawn(move || worker.run())
            .map_err(PrintdownError::Io)?;

        Ok(ExecutorHandle {
            queue,
            thread: Some(thread),
            counters,
        })
    }
}

/// Owner's handle to the running executor.
pub struct ExecutorHandle {
    queue: JobQueue,
    thread: Option<JoinHandle<()>>,
    counters: Arc<Counters>,
}

impl ExecutorHandle {
    /// The queue this executor drains.
    pub fn queue(&self) -> &JobQueue {
        &self.queue
    }

    pub fn stats(&self) -> ExecutorStats {
        self.counters.snapshot()
    }

    /// Close the queue, wait for every accepted job to finish, and join the
    /// thread.  Blocks; call from `spawn_blocking` in async code.
    pub fn shutdown(mut self) -> ExecutorStats {
        self.stop();
        self.counters.snapshot()
    }

    fn stop(&mut self) {
        self.queue.close();
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                error!("executor thread panicked");
            }
        }
    }
}

impl Drop for ExecutorHandle {
    fn drop(&mut self) {
        self.stop();
    }
}

struct Worker<D> {
    queue: JobQueue,
    driver: D,
    compiler: MarkupCompiler,
    settings: ExecutorSettings,
    counters: Arc<Counters>,
}

impl<D: DeviceDriver> Worker<D> {
    fn run(mut self) {
        info!("executor started");
        loop {
            match self.queue.next_job(self.settings.poll_interval) {
                Next::Job(job) => {
                    self.process(&job);
                    if !self.settings.settle_delay.is_zero() {
                        thread::sleep(self.settings.settle_delay);
                    }
                }
                Next::Empty => {}
                Next::Closed => break,
            }
        }
        let stats = self.counters.snapshot();
        info!(completed = stats.completed, failed = stats.failed, "executor stopped");
    }

    fn process(&mut self, job: &PrintJob) {
        let started = Instant::now();
        debug!(
            job_id = %job.id(),
            kind = %job.kind(),
            submitted_at = %job.submitted_at(),
            status = ?JobStatus::Executing,
            "executing job"
        );

        match self.execute(job) {
            Ok(()) => {
                self.counters.completed.fetch_add(1, Ordering::Relaxed);
                info!(
                    job_id = %job.id(),
                    kind = %job.kind(),
                    origin = job.origin(),
                    status = ?JobStatus::Completed,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "job printed"
                );
            }
            Err(e) => {
                self.counters.failed.fetch_add(1, Ordering::Relaxed);
                error!(
                    job_id = %job.id(),
                    kind = %job.kind(),
                    origin = job.origin(),
                    status = ?JobStatus::Failed,
                    error = %e,
                    "job failed"
                );
            }
        }
    }

    fn execute(&mut self, job: &PrintJob) -> std::result::Result<(), DeviceError> {
        self.driver.begin_job()?;

        let applied = match job.payload() {
            JobPayload::Text(text) => {
                let directives = self.compiler.compile(text);
                debug!(job_id = %job.id(), directives = directives.len(), "markup compiled");
                directives
                    .iter()
                    .try_for_each(|d| apply_directive(&mut self.driver, d, &self.settings))
            }
            JobPayload::Image(bytes) => self.driver.render_image(bytes),
        };

        // Always try to leave the printer in its default state and release
        // it, but report the first failure.
        let reset = self.driver.reset_style();
        let finished = self.driver.end_job();
        if let (Err(e), Ok(())) = (&reset, &applied) {
            warn!(error = %e, "style reset at job end failed");
        }
        applied.and(reset).and(finished)
    }
}

/// Apply one directive to the driver.
///
/// Styled directives leave the driver in its default style afterwards, and
/// aligned ones leave it left-aligned.
pub fn apply_directive<D>(
    driver: &mut D,
    directive: &Directive,
    settings: &ExecutorSettings,
) -> std::result::Result<(), DeviceError>
where
    D: DeviceDriver + ?Sized,
{
    match directive {
        Directive::Text(text) => driver.apply_text(text),
        Directive::Style(kind, text) => styled(driver, TextStyle::from(*kind), text),
        Directive::CustomSize {
            width,
            height,
            text,
        } => styled(driver, TextStyle::NORMAL.size(*width, *height), text),
        Directive::Header(level, text) => {
            let (style, alignment) = header_format(*level);
            driver.set_style(style)?;
            driver.set_alignment(alignment)?;
            driver.apply_text(text)?;
            driver.reset_style()?;
            driver.set_alignment(Alignment::Left)
        }
        Directive::Align(alignment, text) => {
            driver.set_alignment(*alignment)?;
            driver.apply_text(text)?;
            driver.set_alignment(Alignment::Left)
        }
        Directive::PaperCut => {
            if settings.cut_feed_lines > 0 {
                driver.apply_text(&"\n".repeat(usize::from(settings.cut_feed_lines)))?;
            }
            driver.cut_paper()
        }
    }
}

fn styled<D>(driver: &mut D, style: TextStyle, text: &str) -> std::result::Result<(), DeviceError>
where
    D: DeviceDriver + ?Sized,
{
    driver.set_style(style)?;
    driver.apply_text(text)?;
    driver.reset_style()
}

/// Style and alignment for a header level.
fn header_format(level: u8) -> (TextStyle, Alignment) {
    match level {
        0 | 1 => (TextStyle::NORMAL.size(2, 2).bold(), Alignment::Center),
        2 => (TextStyle::NORMAL.size(1, 2).bold(), Alignment::Center),
        3 => (TextStyle::NORMAL.size(2, 1).bold(), Alignment::Left),
        _ => (TextStyle::NORMAL.bold().underline(), Alignment::Left),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
