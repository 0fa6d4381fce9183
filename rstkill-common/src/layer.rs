use std::{
    fmt::Display,
    net::{IpAddr, Ipv4Addr, Ipv6Addr},
};

use etherparse::{Ethernet2Header, Ipv4Header, Ipv6Header, SingleVlanHeader, TcpHeader};

use crate::error::{Error, Result};

/// Data-link type of a capture, as reported by libpcap (`pcap_datalink`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkType {
    /// DLT_EN10MB
    Ethernet,
    /// BSD loopback, 4-byte address family in host byte order.
    Null,
    /// OpenBSD loopback, 4-byte address family in network byte order.
    Loop,
    /// Bare IP, version taken from the first nibble.
    Raw,
    Ipv4,
    Ipv6,
    Unsupported(i32),
}

impl LinkType {
    pub fn from_dlt(dlt: i32) -> Self {
        match dlt {
            0 => LinkType::Null,
            1 => LinkType::Ethernet,
            // DLT_RAW is 12 on most platforms, 14 on OpenBSD, 101 as LINKTYPE_RAW
            12 | 14 | 101 => LinkType::Raw,
            108 => LinkType::Loop,
            228 => LinkType::Ipv4,
            229 => LinkType::Ipv6,
            other => LinkType::Unsupported(other),
        }
    }
}

/// A raw frame as delivered by the capture source.
#[derive(Debug, Clone)]
pub struct CapturedFrame {
    pub data: Vec<u8>,
    pub link_type: LinkType,
}

impl CapturedFrame {
    pub fn new(data: Vec<u8>, link_type: LinkType) -> Self {
        Self { data, link_type }
    }
}

#[derive(Debug, Clone)]
pub enum LinkLayer {
    Ethernet {
        header: Ethernet2Header,
        vlan: Option<SingleVlanHeader>,
    },
    /// Loopback pseudo header. Carries no hardware addresses.
    Loopback { family: [u8; 4] },
}

impl LinkLayer {
    /// (source, destination) hardware addresses, if the link carries any.
    pub fn hardware_addresses(&self) -> Option<([u8; 6], [u8; 6])> {
        match self {
            LinkLayer::Ethernet { header, .. } => Some((header.source, header.destination)),
            LinkLayer::Loopback { .. } => None,
        }
    }

    pub fn swap_addresses(&mut self) {
        if let LinkLayer::Ethernet { header, .. } = self {
            std::mem::swap(&mut header.source, &mut header.destination);
        }
    }

    pub fn write_to(&self, out: &mut Vec<u8>) -> Result<()> {
        match self {
            LinkLayer::Ethernet { header, vlan } => {
                header.write(out).map_err(serialization)?;
                if let Some(vlan) = vlan {
                    vlan.write(out).map_err(serialization)?;
                }
            }
            LinkLayer::Loopback { family } => out.extend_from_slice(family),
        }
        Ok(())
    }
}

/// What the synthesizer needs from a network layer: its addresses and the
/// pseudo-header the transport checksum is computed over.
pub trait NetworkEndpoint {
    fn source_addr(&self) -> IpAddr;

    fn destination_addr(&self) -> IpAddr;

    fn swap_addresses(&mut self);

    /// Fix up the length fields for a transport segment of `len` bytes.
    fn set_transport_len(&mut self, len: usize) -> Result<()>;

    fn tcp_checksum(&self, tcp: &TcpHeader, payload: &[u8]) -> Result<u16>;

    fn write_to(&self, out: &mut Vec<u8>) -> Result<()>;
}

impl NetworkEndpoint for Ipv4Header {
    fn source_addr(&self) -> IpAddr {
        IpAddr::V4(Ipv4Addr::from(self.source))
    }

    fn destination_addr(&self) -> IpAddr {
        IpAddr::V4(Ipv4Addr::from(self.destination))
    }

    fn swap_addresses(&mut self) {
        std::mem::swap(&mut self.source, &mut self.destination);
    }

    fn set_transport_len(&mut self, len: usize) -> Result<()> {
        self.set_payload_len(len).map_err(serialization)?;
        self.header_checksum = self.calc_header_checksum();
        Ok(())
    }

    fn tcp_checksum(&self, tcp: &TcpHeader, payload: &[u8]) -> Result<u16> {
        tcp.calc_checksum_ipv4(self, payload).map_err(serialization)
    }

    fn write_to(&self, out: &mut Vec<u8>) -> Result<()> {
        self.write(out).map_err(serialization)
    }
}

impl NetworkEndpoint for Ipv6Header {
    fn source_addr(&self) -> IpAddr {
        IpAddr::V6(Ipv6Addr::from(self.source))
    }

    fn destination_addr(&self) -> IpAddr {
        IpAddr::V6(Ipv6Addr::from(self.destination))
    }

    fn swap_addresses(&mut self) {
        std::mem::swap(&mut self.source, &mut self.destination);
    }

    fn set_transport_len(&mut self, len: usize) -> Result<()> {
        self.set_payload_length(len).map_err(serialization)
    }

    fn tcp_checksum(&self, tcp: &TcpHeader, payload: &[u8]) -> Result<u16> {
        tcp.calc_checksum_ipv6(self, payload).map_err(serialization)
    }

    fn write_to(&self, out: &mut Vec<u8>) -> Result<()> {
        self.write(out).map_err(serialization)
    }
}

#[derive(Debug, Clone)]
pub enum NetworkLayer {
    Ipv4(Ipv4Header),
    /// IPv6 header with any extension headers already stripped, so its next
    /// header is always TCP.
    Ipv6(Ipv6Header),
}

impl NetworkLayer {
    pub fn endpoint(&self) -> &dyn NetworkEndpoint {
        match self {
            NetworkLayer::Ipv4(header) => header,
            NetworkLayer::Ipv6(header) => header,
        }
    }

    pub fn endpoint_mut(&mut self) -> &mut dyn NetworkEndpoint {
        match self {
            NetworkLayer::Ipv4(header) => header,
            NetworkLayer::Ipv6(header) => header,
        }
    }

    pub fn source(&self) -> IpAddr {
        self.endpoint().source_addr()
    }

    pub fn destination(&self) -> IpAddr {
        self.endpoint().destination_addr()
    }

    fn name(&self) -> &'static str {
        match self {
            NetworkLayer::Ipv4(_) => "IPv4",
            NetworkLayer::Ipv6(_) => "IPv6",
        }
    }
}

#[derive(Debug, Clone)]
pub struct TcpLayer {
    pub header: TcpHeader,
    /// Payload length declared by the network layer, independent of how many
    /// bytes the snapshot length let through.
    pub payload_len: usize,
}

impl TcpLayer {
    pub fn flag_names(&self) -> Vec<&'static str> {
        let h = &self.header;
        [
            (h.syn, "SYN"),
            (h.fin, "FIN"),
            (h.rst, "RST"),
            (h.psh, "PSH"),
            (h.ack, "ACK"),
            (h.urg, "URG"),
            (h.ece, "ECE"),
            (h.cwr, "CWR"),
            (h.ns, "NS"),
        ]
        .into_iter()
        .filter_map(|(set, name)| set.then_some(name))
        .collect()
    }
}

/// A frame decoded into exactly one network layer and one TCP layer.
#[derive(Debug, Clone)]
pub struct Classified {
    pub link_type: LinkType,
    pub link: Option<LinkLayer>,
    pub network: NetworkLayer,
    pub transport: TcpLayer,
}

impl Display for Classified {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.link {
            Some(LinkLayer::Ethernet { header, vlan }) => {
                write!(f, "Ethernet {} > {}", mac(&header.source), mac(&header.destination))?;
                if vlan.is_some() {
                    write!(f, " (802.1Q)")?;
                }
                write!(f, ", ")?;
            }
            Some(LinkLayer::Loopback { .. }) => write!(f, "Loopback, ")?,
            None => {}
        }

        let tcp = &self.transport;
        write!(
            f,
            "{} {} > {}, TCP {} > {} [{}] seq {} ack {} win {} len {}",
            self.network.name(),
            self.network.source(),
            self.network.destination(),
            tcp.header.source_port,
            tcp.header.destination_port,
            tcp.flag_names().join(", "),
            tcp.header.sequence_number,
            tcp.header.acknowledgment_number,
            tcp.header.window_size,
            tcp.payload_len,
        )
    }
}

pub(crate) fn serialization<E: Display>(e: E) -> Error {
    Error::Serialization(e.to_string())
}

fn mac(addr: &[u8; 6]) -> String {
    addr.iter()
        .map(|b| format!("{:02x}", b))
        .collect::<Vec<_>>()
        .join(":")
}
