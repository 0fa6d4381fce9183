use anyhow::Result;
use rstkill_common::{effective_filter, Error};

use crate::{cmd::Cmd, util};

/// Validated runtime settings, built once at startup from the command line.
#[derive(Debug, Clone)]
pub struct KillConfig {
    pub iface: String,
    /// Effective BPF filter, control segments already excluded.
    pub filter: String,
    pub snaplen: i32,
    pub promisc: bool,
    pub count: Option<u64>,
    pub metrics: bool,
}

impl KillConfig {
    pub fn from_cmd(cmd: &Cmd) -> Result<Self> {
        let config = Self::build(cmd)?;
        util::lookup_interface(&config.iface)?;

        Ok(config)
    }

    /// Everything that can be checked without touching the system.
    fn build(cmd: &Cmd) -> Result<Self, Error> {
        let iface = match cmd.iface.as_deref().map(str::trim) {
            Some(iface) if !iface.is_empty() => iface.to_string(),
            _ => return Err(Error::Configuration("an interface is required".to_string())),
        };

        if cmd.snaplen <= 0 {
            return Err(Error::Configuration(format!(
                "snapshot length must be positive, got {}",
                cmd.snaplen
            )));
        }

        if cmd.count == Some(0) {
            return Err(Error::Configuration(
                "count must be at least 1 when given".to_string(),
            ));
        }

        Ok(Self {
            iface,
            filter: effective_filter(cmd.filter_expr().as_deref()),
            snaplen: cmd.snaplen,
            promisc: !cmd.no_promisc,
            count: cmd.count,
            metrics: cmd.metrics,
        })
    }
}
