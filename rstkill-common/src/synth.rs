use crate::{
    classify::classify,
    error::{Error, Result},
    layer::{CapturedFrame, Classified, NetworkLayer, TcpLayer},
};

/// A forged RST, serialized and verified by decoding it again.
#[derive(Debug, Clone)]
pub struct SynthesizedRst {
    bytes: Vec<u8>,
    packet: Classified,
}

impl SynthesizedRst {
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// The re-decoded view of [`SynthesizedRst::bytes`].
    pub fn packet(&self) -> &Classified {
        &self.packet
    }
}

/// Forge the RST that the peer of the captured segment's sender will accept.
///
/// The captured segment travels A -> B carrying `seq`, `ack` and `len` bytes of
/// payload. The forged segment travels B -> A with `seq = ack`, which is the
/// next sequence number A expects from B and so falls inside A's receive
/// window, and `ack = seq + len`.
pub fn synthesize(original: &Classified) -> Result<SynthesizedRst> {
    let mut link = original.link.clone();
    let mut network = original.network.clone();
    let mut tcp = original.transport.header.clone();

    if let Some(link) = link.as_mut() {
        link.swap_addresses();
    }

    network.endpoint_mut().swap_addresses();

    // bind the checksum to the swapped addresses
    let endpoint = network.endpoint_mut();

    tcp.rst = true;
    std::mem::swap(&mut tcp.source_port, &mut tcp.destination_port);

    let next_ack = tcp
        .sequence_number
        .wrapping_add(original.transport.payload_len as u32);
    tcp.sequence_number = tcp.acknowledgment_number;
    tcp.acknowledgment_number = next_ack;

    // a RST carries no payload
    endpoint.set_transport_len(tcp.header_len())?;
    tcp.checksum = endpoint.tcp_checksum(&tcp, &[])?;

    let mut bytes = Vec::with_capacity(original_len_hint(original));
    if let Some(link) = link.as_ref() {
        link.write_to(&mut bytes)?;
    }
    network.endpoint().write_to(&mut bytes)?;
    tcp.write(&mut bytes)
        .map_err(|e| Error::Serialization(e.to_string()))?;

    let packet = verify(CapturedFrame::new(bytes.clone(), original.link_type))?;
    Ok(SynthesizedRst { bytes, packet })
}

/// Decode the serialized RST with the same classifier used for captured frames
/// and check its checksums, so nothing is transmitted that did not round-trip.
fn verify(frame: CapturedFrame) -> Result<Classified> {
    let packet = classify(&frame)
        .map_err(|e| Error::Serialization(format!("forged packet does not decode: {}", e)))?;

    let TcpLayer {
        header,
        payload_len,
    } = &packet.transport;
    if *payload_len != 0 || !header.rst {
        return Err(Error::Serialization(
            "forged packet is not a bare rst segment".to_string(),
        ));
    }
    if let NetworkLayer::Ipv4(ip) = &packet.network {
        if ip.calc_header_checksum() != ip.header_checksum {
            return Err(Error::Serialization("bad ipv4 header checksum".to_string()));
        }
    }
    if packet.network.endpoint().tcp_checksum(header, &[])? != header.checksum {
        return Err(Error::Serialization("bad tcp checksum".to_string()));
    }

    Ok(packet)
}

fn original_len_hint(original: &Classified) -> usize {
    // ethernet + vlan + ipv6 + tcp with options
    14 + 4 + 40 + original.transport.header.header_len()
}

#[cfg(test)]
mod test {
    use etherparse::PacketBuilder;

    use super::synthesize;
    use crate::{
        classify::classify,
        layer::{CapturedFrame, Classified, LinkType, NetworkLayer},
    };

    const CLIENT_MAC: [u8; 6] = [0x02, 0, 0, 0, 0, 0x01];
    const SERVER_MAC: [u8; 6] = [0x02, 0, 0, 0, 0, 0x02];
    const CLIENT_V6: [u8; 16] = [0x20, 0x01, 0x0d, 0xb8, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 1];
    const SERVER_V6: [u8; 16] = [0x20, 0x01, 0x0d, 0xb8, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 2];

    fn capture_v4(seq: u32, ack: u32, payload_len: usize) -> Classified {
        let builder = PacketBuilder::ethernet2(CLIENT_MAC, SERVER_MAC)
            .ipv4([10, 0, 0, 1], [10, 0, 0, 2], 64)
            .tcp(5000, 80, seq, 4096)
            .ack(ack)
            .psh();
        let payload = vec![0x42u8; payload_len];
        let mut data = Vec::new();
        builder.write(&mut data, &payload).unwrap();
        classify(&CapturedFrame::new(data, LinkType::Ethernet)).unwrap()
    }

    fn capture_v6(seq: u32, ack: u32, payload_len: usize) -> Classified {
        let builder = PacketBuilder::ipv6(CLIENT_V6, SERVER_V6, 64)
            .tcp(40000, 443, seq, 1024)
            .ack(ack);
        let payload = vec![0x42u8; payload_len];
        let mut data = Vec::new();
        builder.write(&mut data, &payload).unwrap();
        classify(&CapturedFrame::new(data, LinkType::Raw)).unwrap()
    }

    #[test]
    fn test_ipv4_scenario() {
        let rst = synthesize(&capture_v4(1000, 2000, 50)).unwrap();
        let packet = rst.packet();

        assert_eq!(packet.network.source().to_string(), "10.0.0.2");
        assert_eq!(packet.network.destination().to_string(), "10.0.0.1");
        assert_eq!(packet.transport.header.source_port, 80);
        assert_eq!(packet.transport.header.destination_port, 5000);
        assert_eq!(packet.transport.header.sequence_number, 2000);
        assert_eq!(packet.transport.header.acknowledgment_number, 1050);
        assert!(packet.transport.header.rst);
        assert_eq!(packet.transport.payload_len, 0);
    }

    #[test]
    fn test_zero_payload_keeps_sequence() {
        let rst = synthesize(&capture_v4(1000, 2000, 0)).unwrap();
        let tcp = &rst.packet().transport.header;
        assert_eq!(tcp.sequence_number, 2000);
        assert_eq!(tcp.acknowledgment_number, 1000);
    }

    #[test]
    fn test_sequence_law() {
        for (seq, ack, len) in [
            (0u32, 0u32, 0usize),
            (1, u32::MAX, 1),
            (123_456, 654_321, 1460),
            (u32::MAX - 9, 77, 20),
        ] {
            let rst = synthesize(&capture_v4(seq, ack, len)).unwrap();
            let tcp = &rst.packet().transport.header;
            assert_eq!(tcp.sequence_number, ack);
            assert_eq!(tcp.acknowledgment_number, seq.wrapping_add(len as u32));
        }
    }

    #[test]
    fn test_link_layer_reversed() {
        let rst = synthesize(&capture_v4(1, 1, 1)).unwrap();
        let link = rst.packet().link.as_ref().unwrap();
        assert_eq!(link.hardware_addresses(), Some((SERVER_MAC, CLIENT_MAC)));
    }

    #[test]
    fn test_flags() {
        let rst = synthesize(&capture_v4(1, 1, 10)).unwrap();
        let tcp = &rst.packet().transport.header;
        assert!(tcp.rst);
        assert!(tcp.ack);
        assert!(!tcp.syn);
        assert!(!tcp.fin);
    }

    #[test]
    fn test_ipv6_reversed() {
        let rst = synthesize(&capture_v6(10, 20, 5)).unwrap();
        let packet = rst.packet();

        assert!(matches!(packet.network, NetworkLayer::Ipv6(_)));
        assert!(packet.link.is_none());
        assert_eq!(packet.network.source().to_string(), "2001:db8::2");
        assert_eq!(packet.network.destination().to_string(), "2001:db8::1");
        assert_eq!(packet.transport.header.source_port, 443);
        assert_eq!(packet.transport.header.destination_port, 40000);
        assert_eq!(packet.transport.header.sequence_number, 20);
        assert_eq!(packet.transport.header.acknowledgment_number, 15);
    }

    #[test]
    fn test_round_trip_lengths() {
        let rst = synthesize(&capture_v4(1000, 2000, 50)).unwrap();
        // ethernet + ipv4 + tcp, no payload
        assert_eq!(rst.bytes().len(), 14 + 20 + 20);
        match &rst.packet().network {
            NetworkLayer::Ipv4(ip) => {
                assert_eq!(ip.total_len, 40);
                assert_eq!(ip.calc_header_checksum(), ip.header_checksum);
            }
            other => panic!("unexpected network layer {:?}", other),
        }

        let again = classify(&CapturedFrame::new(rst.bytes().to_vec(), LinkType::Ethernet))
            .unwrap();
        assert_eq!(again.transport.header, rst.packet().transport.header);

        let rst = synthesize(&capture_v6(1, 2, 3)).unwrap();
        assert_eq!(rst.bytes().len(), 40 + 20);
        match &rst.packet().network {
            NetworkLayer::Ipv6(ip) => assert_eq!(ip.payload_length, 20),
            other => panic!("unexpected network layer {:?}", other),
        }
    }

    #[test]
    fn test_original_left_untouched() {
        let original = capture_v4(1000, 2000, 50);
        let _ = synthesize(&original).unwrap();
        assert_eq!(original.network.source().to_string(), "10.0.0.1");
        assert_eq!(original.transport.header.sequence_number, 1000);
        assert!(!original.transport.header.rst);
    }

    #[test]
    fn test_loopback_header_preserved() {
        let builder = PacketBuilder::ipv4([127, 0, 0, 1], [127, 0, 0, 2], 64)
            .tcp(6000, 6001, 5, 512)
            .ack(6);
        let mut data = vec![2, 0, 0, 0];
        builder.write(&mut data, &[]).unwrap();
        let original = classify(&CapturedFrame::new(data, LinkType::Null)).unwrap();

        let rst = synthesize(&original).unwrap();
        assert_eq!(&rst.bytes()[..4], &[2, 0, 0, 0]);
        assert_eq!(rst.packet().network.destination().to_string(), "127.0.0.1");
    }
}
