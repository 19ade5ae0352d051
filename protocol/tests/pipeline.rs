use protocol::cipher::{CipherBinding, Direction};
use protocol::codec::{CodecLimits, FrameCodec};
use protocol::packets::ConnectionInfoRequest;
use protocol::{packet_code, packet_sub_code};

/// A classic client encrypts a request, the stream fragments it, and the
/// gateway-side pipeline still recovers the exact packet.
#[test]
fn fragmented_encrypted_request_survives_the_pipeline() {
    let binding = CipherBinding::classic();
    let encryptor = binding.create_encryptor(Direction::ClientToServer);
    let decryptor = binding.create_decryptor(Direction::ClientToServer);
    let codec = FrameCodec::new(CodecLimits::default());

    let plain = vec![0xC1, 0x06, 0xF4, 0x03, 0x07, 0x00];
    let encrypted = encryptor.encrypt(&plain);

    let mut buffer = Vec::new();
    for (i, byte) in encrypted.iter().enumerate() {
        buffer.push(*byte);
        let status = codec.try_frame_len(&buffer).expect("well-formed header");
        if i + 1 < encrypted.len() {
            assert_eq!(status, None, "frame must not complete early");
        } else {
            assert_eq!(status, Some(encrypted.len()));
        }
    }

    let decrypted = decryptor.decrypt(&buffer).expect("decryptable frame");
    assert_eq!(decrypted, plain);
    assert_eq!(packet_code(&decrypted), Some(0xF4));
    assert_eq!(packet_sub_code(&decrypted), Some(0x03));

    let request = ConnectionInfoRequest::parse(&decrypted).expect("valid request");
    assert_eq!(request.server_id, 7);
}

/// Two frames glued back to back split at the right boundary.
#[test]
fn back_to_back_frames_split_cleanly() {
    let codec = FrameCodec::new(CodecLimits::default());

    let first = vec![0xC1, 0x06, 0x05, 0x01, 0x00, 0x03];
    let second = vec![0xC1, 0x04, 0xF4, 0x06];

    let mut buffer = first.clone();
    buffer.extend_from_slice(&second);

    let len = codec.try_frame_len(&buffer).unwrap().unwrap();
    assert_eq!(buffer[..len], first[..]);

    let rest = &buffer[len..];
    let len = codec.try_frame_len(rest).unwrap().unwrap();
    assert_eq!(rest[..len], second[..]);
}
