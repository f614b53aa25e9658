#![no_main]

use avrolink_core::wire::{decode, encode, encode_into};
use avrolink_core::{Error, HEADER_LEN};
use bytes::BytesMut;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Decoding arbitrary bytes must never panic: short input is an error,
    // anything else splits cleanly into header and payload.
    match decode(data) {
        Err(Error::MalformedFrame { len }) => {
            assert!(data.len() < HEADER_LEN);
            assert_eq!(len, data.len());
        }
        Ok(frame) => {
            assert_eq!(frame.magic, data[0]);
            assert_eq!(frame.payload.len(), data.len() - HEADER_LEN);

            // Re-framing a current-format frame reproduces the input exactly
            if frame.is_current_format() {
                assert_eq!(&encode(frame.schema_id, frame.payload)[..], data);
            }
        }
    }

    // Framing arbitrary payloads under an id taken from the input
    if data.len() >= 4 {
        let id = u32::from_be_bytes([data[0], data[1], data[2], data[3]]);
        let mut buf = BytesMut::new();
        encode_into(&mut buf, id, &data[4..]);

        let frame = decode(&buf).unwrap();
        assert_eq!(frame.schema_id, id);
        assert_eq!(frame.payload, &data[4..]);
    }
});
