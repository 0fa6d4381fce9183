use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// Bad interface name, open failure or a filter the capture library rejects.
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("not an ipv4 or ipv6 packet: {0}")]
    NotInternetProtocol(String),

    #[error("not a tcp packet: {0}")]
    NotTcp(String),

    #[error("failed to build rst packet: {0}")]
    Serialization(String),

    #[error("failed to write rst packet: {0}")]
    Transmission(String),

    #[error("failed to read from capture: {0}")]
    Capture(String),
}

impl Error {
    /// Protocol mismatches are expected for filtered traffic and only skip the
    /// current frame. Everything else means packets can no longer be injected
    /// reliably.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Error::NotInternetProtocol(_) | Error::NotTcp(_))
    }

    /// Short label used for metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            Error::Configuration(_) => "configuration",
            Error::NotInternetProtocol(_) => "not_ip",
            Error::NotTcp(_) => "not_tcp",
            Error::Serialization(_) => "serialization",
            Error::Transmission(_) => "transmission",
            Error::Capture(_) => "capture",
        }
    }
}

#[cfg(test)]
mod test {
    use super::Error;

    #[test]
    fn test_fatal_policy() {
        assert!(!Error::NotInternetProtocol("arp".into()).is_fatal());
        assert!(!Error::NotTcp("udp".into()).is_fatal());
        assert!(Error::Serialization("too big".into()).is_fatal());
        assert!(Error::Transmission("down".into()).is_fatal());
        assert!(Error::Configuration("no such device".into()).is_fatal());
        assert!(Error::Capture("gone".into()).is_fatal());
    }
}
