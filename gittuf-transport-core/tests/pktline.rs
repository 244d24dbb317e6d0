use gittuf_transport_core::pktline::{self, FrameReader};

#[test]
fn split_concat_roundtrips_a_mixed_stream() {
    let mut stream = Vec::new();
    stream.extend_from_slice(&pktline::encode(b"version 2\n").unwrap());
    stream.extend_from_slice(pktline::DELIM_PKT);
    stream.extend_from_slice(&pktline::encode(b"want cafebabe\n").unwrap());
    stream.extend_from_slice(pktline::FLUSH_PKT);
    stream.extend_from_slice(&pktline::encode(b"").unwrap());
    stream.extend_from_slice(pktline::RESPONSE_END_PKT);

    let mut reader = FrameReader::new(stream.as_slice());
    let mut frames = Vec::new();
    while let Some(frame) = reader.read_frame().unwrap() {
        frames.push(frame);
    }
    assert!(pktline::is_delim(&frames[1]));
    assert!(pktline::is_flush(&frames[3]));
    assert!(pktline::is_response_end(&frames[5]));

    let rejoined: Vec<u8> = frames.concat();
    assert_eq!(rejoined, stream);
}

#[test]
fn split_of_encode_is_the_single_frame() {
    for payload in [&b"ref-prefix refs/gittuf/\n"[..], b"", b"a", &[0u8, 255, 10][..]] {
        let frame = pktline::encode(payload).unwrap();
        let mut reader = FrameReader::new(frame.as_slice());
        assert_eq!(reader.read_frame().unwrap().unwrap(), frame);
        assert_eq!(reader.read_frame().unwrap(), None);
    }
}

#[test]
fn largest_payload_roundtrips() {
    let payload = vec![b'g'; pktline::MAX_PAYLOAD_LEN];
    let frame = pktline::encode(&payload).unwrap();
    assert_eq!(&frame[..4], b"ffff");

    let mut reader = FrameReader::new(frame.as_slice());
    let read = reader.read_frame().unwrap().unwrap();
    assert_eq!(read.len(), 0xFFFF);
    assert_eq!(pktline::payload(&read).unwrap(), payload.as_slice());
}

#[test]
fn uppercase_hex_lengths_are_accepted() {
    let mut stream: &[u8] = b"000Ahello\n";
    let frame = pktline::read_frame(&mut stream).unwrap().unwrap();
    assert_eq!(pktline::payload(&frame).unwrap(), b"hello\n");
}
