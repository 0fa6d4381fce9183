//! Capture-independent core of rstkill: decoding captured frames into
//! TCP/IP layers and forging the RST segment that tears the connection down.

pub mod classify;
pub mod error;
pub mod filter;
pub mod layer;
pub mod synth;

pub use classify::classify;
pub use error::{Error, Result};
pub use filter::effective_filter;
pub use layer::{CapturedFrame, Classified, LinkLayer, LinkType, NetworkLayer, TcpLayer};
pub use synth::{synthesize, SynthesizedRst};
