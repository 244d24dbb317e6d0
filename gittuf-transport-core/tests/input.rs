use gittuf_transport_core::input::{CommandReader, Mode};
use gittuf_transport_core::pktline;

#[test]
fn mode_switch_is_one_way_and_mid_stream() {
    // A helper conversation: one text command, then pkt-line frames.
    let mut stream = b"stateless-connect git-upload-pack\n".to_vec();
    stream.extend_from_slice(&pktline::encode(b"command=ls-refs\n").unwrap());
    stream.extend_from_slice(pktline::FLUSH_PKT);

    let mut reader = CommandReader::new(stream.as_slice());
    assert_eq!(reader.mode(), Mode::Text);
    assert_eq!(
        reader.next_token().unwrap().unwrap(),
        b"stateless-connect git-upload-pack\n"
    );

    reader.enter_packet_mode();
    assert_eq!(reader.mode(), Mode::Packet);
    let frame = reader.next_token().unwrap().unwrap();
    assert_eq!(pktline::payload(&frame).unwrap(), b"command=ls-refs\n");
    assert!(pktline::is_flush(&reader.next_token().unwrap().unwrap()));
    assert_eq!(reader.next_token().unwrap(), None);
}

#[test]
fn pushback_token_survives_in_packet_mode() {
    let tail = pktline::encode(b"want cafebabe\n").unwrap();
    let mut reader = CommandReader::new(tail.as_slice());
    reader.enter_packet_mode();

    let first = reader.next_token().unwrap().unwrap();
    reader.unread(first.clone());
    assert_eq!(reader.next_token().unwrap().unwrap(), first);
    assert_eq!(reader.next_token().unwrap(), None);
}

#[test]
fn truncated_frame_surfaces_as_error() {
    let mut reader = CommandReader::new(&b"00ffonly-a-little"[..]);
    reader.enter_packet_mode();
    assert!(matches!(
        reader.next_token(),
        Err(pktline::Error::TruncatedFrame)
    ));
}
