use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use anyhow::Context;
use log::{error, info, warn};
use rstkill_common::{classify, synthesize, CapturedFrame, Error, SynthesizedRst};

use crate::{
    capture::{FrameSink, FrameSource, LiveCapture},
    cmd::Cmd,
    config::KillConfig,
    metrics::Metrics,
    report::Reporter,
    util,
};

/// The pump: captured frames in, forged RST segments out.
///
/// The handle is owned exclusively for the lifetime of the pump, so capture and
/// injection never need locking.
pub struct Application<H> {
    handle: H,
    reporter: Reporter,
    metrics: Metrics,
    budget: Option<u64>,
}

impl<H> Application<H>
where
    H: FrameSource + FrameSink,
{
    pub fn new(handle: H, metrics: Metrics, budget: Option<u64>) -> Self {
        Self {
            handle,
            reporter: Reporter::new(),
            metrics,
            budget,
        }
    }

    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    /// Run until the capture ends, the RST budget is spent or a fatal error
    /// occurs. Returns the number of RST packets written.
    pub fn run(&mut self) -> Result<u64, Error> {
        let mut sent = 0;
        while let Some(frame) = self.handle.next_frame()? {
            match self.process(&frame) {
                Ok(rst) => {
                    self.reporter.injected(&rst);
                    self.metrics.inc_injected();
                    sent += 1;

                    if self.budget.is_some_and(|budget| sent >= budget) {
                        info!("sent {} rst packets, stopping", sent);
                        break;
                    }
                }
                Err(e) if !e.is_fatal() => {
                    self.reporter.skipped(&frame, &e);
                    self.metrics.inc_skipped(e.kind());
                }
                // no retry: a late rst is worse than none
                Err(e) => return Err(e),
            }
        }

        Ok(sent)
    }

    fn process(&mut self, frame: &CapturedFrame) -> Result<SynthesizedRst, Error> {
        let classified = classify(frame)?;
        let rst = synthesize(&classified)?;
        self.handle.transmit(rst.bytes())?;

        Ok(rst)
    }
}

pub async fn run(cmd: Cmd) -> anyhow::Result<()> {
    if cmd.list {
        util::list_interfaces()?;
        return Ok(());
    }

    let config = KillConfig::from_cmd(&cmd)?;
    info!(
        "start rstkill on {}, kernel: {}",
        config.iface,
        util::uname().map(|u| u.release).unwrap_or_default()
    );
    if !util::is_root() {
        warn!("not running as root, opening the capture will likely fail");
    }

    let shutdown = Arc::new(AtomicBool::new(false));
    let capture = LiveCapture::open(&config, shutdown.clone())?;
    let metrics = Metrics::new().context("failed to register metrics")?;
    let mut app = Application::new(capture, metrics, config.count);

    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("interrupted, waiting for the capture to close");
                shutdown.store(true, Ordering::Relaxed);
            }
            Err(e) => error!("failed to listen for ctrl-c: {}", e),
        }
    });

    let (app, result) = tokio::task::spawn_blocking(move || {
        let result = app.run();
        (app, result)
    })
    .await
    .context("capture task panicked")?;

    if config.metrics {
        print!("{}", app.metrics().export().context("failed to export metrics")?);
    }

    let sent = result?;
    info!("capture closed, {} rst packets sent", sent);

    Ok(())
}

/// The single diagnostic printed when `run` fails, with the full context chain.
pub fn fatal_line(e: &anyhow::Error) -> String {
    format!("rstkill: {:#}", e)
}
