use std::fmt::Display;

use chrono::Local;
use colored::Colorize;
use log::{debug, log_enabled, warn, Level};
use rstkill_common::{CapturedFrame, Error, SynthesizedRst};

/// One stdout line per forged packet, one log line per skipped frame.
#[derive(Debug, Default)]
pub struct Reporter;

impl Reporter {
    pub fn new() -> Self {
        Self
    }

    pub fn injected(&self, rst: &SynthesizedRst) {
        println!("{}", RstLine(rst).to_string().bright_red());
        if log_enabled!(Level::Debug) {
            debug!("sent {} bytes: {}", rst.bytes().len(), hex(rst.bytes()));
        }
    }

    pub fn skipped(&self, frame: &CapturedFrame, err: &Error) {
        warn!("skip {} byte frame: {}", frame.data.len(), err);
    }
}

struct RstLine<'a>(&'a SynthesizedRst);

impl Display for RstLine<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "* {:<22}RST    {}",
            Local::now().format("[%Y-%m-%d %H:%M:%S]").to_string(),
            self.0.packet(),
        )
    }
}

fn hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}
