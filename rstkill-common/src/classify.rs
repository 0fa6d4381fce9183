use etherparse::{
    EtherType, Ethernet2Header, IpNumber, Ipv4Header, Ipv6Extensions, Ipv6Header,
    SingleVlanHeader, TcpHeader,
};

use crate::{
    error::{Error, Result},
    layer::{CapturedFrame, Classified, LinkLayer, LinkType, NetworkLayer, TcpLayer},
};

const LOOPBACK_HDR_LEN: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum IpVersion {
    V4,
    V6,
}

/// Decode a captured frame into its link, network and TCP layers.
///
/// Frames that are not IP yield [`Error::NotInternetProtocol`], IP frames that
/// do not carry a (complete, unfragmented) TCP segment yield [`Error::NotTcp`].
pub fn classify(frame: &CapturedFrame) -> Result<Classified> {
    let (link, version, ip_bytes) = decode_link(frame)?;
    let (network, ip_payload, declared_len) = decode_network(version, ip_bytes)?;
    let transport = decode_transport(ip_payload, declared_len)?;

    Ok(Classified {
        link_type: frame.link_type,
        link,
        network,
        transport,
    })
}

fn decode_link(frame: &CapturedFrame) -> Result<(Option<LinkLayer>, IpVersion, &[u8])> {
    let data = frame.data.as_slice();
    match frame.link_type {
        LinkType::Ethernet => {
            let (header, rest) = Ethernet2Header::from_slice(data)
                .map_err(|e| Error::NotInternetProtocol(format!("ethernet header: {}", e)))?;

            let (vlan, ether_type, rest) = if header.ether_type == EtherType::VLAN_TAGGED_FRAME {
                let (vlan, rest) = SingleVlanHeader::from_slice(rest)
                    .map_err(|e| Error::NotInternetProtocol(format!("vlan header: {}", e)))?;
                let ether_type = vlan.ether_type;
                (Some(vlan), ether_type, rest)
            } else {
                (None, header.ether_type, rest)
            };

            let version = match ether_type {
                EtherType::IPV4 => IpVersion::V4,
                EtherType::IPV6 => IpVersion::V6,
                other => {
                    return Err(Error::NotInternetProtocol(format!(
                        "ether type 0x{:04x}",
                        other.0
                    )))
                }
            };
            Ok((Some(LinkLayer::Ethernet { header, vlan }), version, rest))
        }
        LinkType::Null | LinkType::Loop => {
            if data.len() < LOOPBACK_HDR_LEN {
                return Err(Error::NotInternetProtocol(format!(
                    "loopback frame of {} bytes",
                    data.len()
                )));
            }
            let (family, rest) = data.split_at(LOOPBACK_HDR_LEN);
            // address family values differ between platforms, the version
            // nibble is authoritative
            let version = version_nibble(rest)?;
            let mut header = [0u8; LOOPBACK_HDR_LEN];
            header.copy_from_slice(family);
            Ok((Some(LinkLayer::Loopback { family: header }), version, rest))
        }
        LinkType::Raw => Ok((None, version_nibble(data)?, data)),
        LinkType::Ipv4 => Ok((None, IpVersion::V4, data)),
        LinkType::Ipv6 => Ok((None, IpVersion::V6, data)),
        LinkType::Unsupported(dlt) => Err(Error::NotInternetProtocol(format!(
            "unsupported data link type {}",
            dlt
        ))),
    }
}

fn version_nibble(data: &[u8]) -> Result<IpVersion> {
    match data.first().map(|b| b >> 4) {
        Some(4) => Ok(IpVersion::V4),
        Some(6) => Ok(IpVersion::V6),
        Some(v) => Err(Error::NotInternetProtocol(format!("ip version {}", v))),
        None => Err(Error::NotInternetProtocol("empty frame".to_string())),
    }
}

/// Returns the network layer, the bytes following it and the transport length
/// the network layer declares.
fn decode_network(version: IpVersion, data: &[u8]) -> Result<(NetworkLayer, &[u8], usize)> {
    match version {
        IpVersion::V4 => {
            let (header, rest) = Ipv4Header::from_slice(data)
                .map_err(|e| Error::NotInternetProtocol(format!("ipv4 header: {}", e)))?;
            if header.protocol != IpNumber::TCP {
                return Err(Error::NotTcp(format!("ip protocol {}", header.protocol.0)));
            }
            if header.is_fragmenting_payload() {
                return Err(Error::NotTcp("fragmented ipv4 packet".to_string()));
            }
            // zero total length comes from segmentation offload, trust the capture
            let declared = match header.total_len {
                0 => rest.len(),
                len => usize::from(len).checked_sub(header.header_len()).ok_or_else(|| {
                    Error::NotInternetProtocol(format!(
                        "ipv4 total length {} shorter than its header",
                        len
                    ))
                })?,
            };
            Ok((NetworkLayer::Ipv4(header), rest, declared))
        }
        IpVersion::V6 => {
            let (mut header, rest) = Ipv6Header::from_slice(data)
                .map_err(|e| Error::NotInternetProtocol(format!("ipv6 header: {}", e)))?;
            // zero payload length means a jumbogram, trust the capture
            let mut declared = match header.payload_length {
                0 => rest.len(),
                len => usize::from(len),
            };

            if header.next_header == IpNumber::TCP {
                return Ok((NetworkLayer::Ipv6(header), rest, declared));
            }

            let (exts, next, rest) = Ipv6Extensions::from_slice(header.next_header, rest)
                .map_err(|e| Error::NotTcp(format!("ipv6 extension headers: {}", e)))?;
            if exts.fragment.is_some() {
                return Err(Error::NotTcp("fragmented ipv6 packet".to_string()));
            }
            if next != IpNumber::TCP {
                return Err(Error::NotTcp(format!("ipv6 next header {}", next.0)));
            }
            declared = declared.checked_sub(exts.header_len()).ok_or_else(|| {
                Error::NotTcp("ipv6 extension headers exceed payload length".to_string())
            })?;
            header.next_header = IpNumber::TCP;
            Ok((NetworkLayer::Ipv6(header), rest, declared))
        }
    }
}

fn decode_transport(data: &[u8], declared_len: usize) -> Result<TcpLayer> {
    let (header, _payload) =
        TcpHeader::from_slice(data).map_err(|e| Error::NotTcp(format!("tcp header: {}", e)))?;
    let payload_len = declared_len
        .checked_sub(header.header_len())
        .ok_or_else(|| Error::NotTcp("tcp header exceeds ip payload length".to_string()))?;

    Ok(TcpLayer {
        header,
        payload_len,
    })
}
