use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use log::{debug, info};
use pcap::{Active, Capture};
use rstkill_common::{CapturedFrame, Error, LinkType, Result};

use crate::config::KillConfig;

/// How long a single libpcap read may block before the shutdown flag is
/// checked again.
const READ_TIMEOUT_MS: i32 = 250;

/// Blocking stream of captured frames.
pub trait FrameSource {
    /// Wait for the next frame. `Ok(None)` means the capture ended.
    fn next_frame(&mut self) -> Result<Option<CapturedFrame>>;
}

/// Raw transmission onto the wire.
pub trait FrameSink {
    fn transmit(&mut self, bytes: &[u8]) -> Result<()>;
}

/// A live libpcap handle used both to capture and to inject.
pub struct LiveCapture {
    cap: Capture<Active>,
    link_type: LinkType,
    shutdown: Arc<AtomicBool>,
}

impl LiveCapture {
    /// Open `config.iface` and install the effective filter.
    ///
    /// Setting `shutdown` makes the next read report the end of the capture.
    pub fn open(config: &KillConfig, shutdown: Arc<AtomicBool>) -> Result<Self> {
        let mut cap = Capture::from_device(config.iface.as_str())
            .map_err(|e| {
                Error::Configuration(format!("failed to use interface '{}': {}", config.iface, e))
            })?
            .snaplen(config.snaplen)
            .promisc(config.promisc)
            .immediate_mode(true)
            .timeout(READ_TIMEOUT_MS)
            .open()
            .map_err(|e| {
                Error::Configuration(format!("failed to open interface '{}': {}", config.iface, e))
            })?;

        cap.filter(&config.filter, true).map_err(|e| {
            Error::Configuration(format!("failed to set filter '{}': {}", config.filter, e))
        })?;

        let datalink = cap.get_datalink();
        let link_type = supported_link_type(datalink.0)?;
        info!(
            "listening on {}, link type {:?} ({}), filter: {}",
            config.iface, link_type, datalink.0, config.filter
        );

        Ok(Self {
            cap,
            link_type,
            shutdown,
        })
    }
}

/// Map a libpcap data-link type onto one the classifier can decode.
fn supported_link_type(dlt: i32) -> Result<LinkType> {
    match LinkType::from_dlt(dlt) {
        LinkType::Unsupported(dlt) => Err(Error::Configuration(format!(
            "unsupported data link type {}, capture on a specific interface instead",
            dlt
        ))),
        link_type => Ok(link_type),
    }
}

impl FrameSource for LiveCapture {
    fn next_frame(&mut self) -> Result<Option<CapturedFrame>> {
        loop {
            if self.shutdown.load(Ordering::Relaxed) {
                debug!("shutdown requested, closing capture");
                return Ok(None);
            }

            match self.cap.next_packet() {
                Ok(packet) => {
                    return Ok(Some(CapturedFrame::new(packet.data.to_vec(), self.link_type)))
                }
                Err(pcap::Error::TimeoutExpired) => continue,
                Err(pcap::Error::NoMorePackets) => return Ok(None),
                Err(e) => return Err(Error::Capture(e.to_string())),
            }
        }
    }
}

impl FrameSink for LiveCapture {
    fn transmit(&mut self, bytes: &[u8]) -> Result<()> {
        self.cap
            .sendpacket(bytes)
            .map_err(|e| Error::Transmission(e.to_string()))
    }
}
