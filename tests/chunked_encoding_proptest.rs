use httpfromtcp::{Headers, ResponseWriter};
use proptest::prelude::*;

/// Decode a chunked body, returning the payload and whatever follows the
/// zero-length chunk line.
fn decode_chunked(mut data: &[u8]) -> Result<(Vec<u8>, Vec<u8>), String> {
    let mut payload = Vec::new();
    loop {
        let line_end = data
            .windows(2)
            .position(|w| w == b"\r\n")
            .ok_or("missing chunk size line")?;
        let size_text = std::str::from_utf8(&data[..line_end]).map_err(|e| e.to_string())?;
        let size = usize::from_str_radix(size_text, 16).map_err(|e| e.to_string())?;
        data = &data[line_end + 2..];
        if size == 0 {
            return Ok((payload, data.to_vec()));
        }
        if data.len() < size + 2 || &data[size..size + 2] != b"\r\n" {
            return Err(format!("chunk of {size} bytes is not CRLF-terminated"));
        }
        payload.extend_from_slice(&data[..size]);
        data = &data[size + 2..];
    }
}

fn chunked_writer(announce: Option<&str>) -> ResponseWriter {
    let mut w = ResponseWriter::new();
    let mut headers = Headers::new();
    headers.set("transfer-encoding", "chunked");
    if let Some(names) = announce {
        headers.set("trailer", names);
    }
    w.write_headers(headers).expect("headers before body");
    w.delete_header("content-length");
    w
}

fn body_of(raw: &[u8]) -> &[u8] {
    let split = raw
        .windows(4)
        .position(|w| w == b"\r\n\r\n")
        .expect("header terminator");
    &raw[split + 4..]
}

proptest! {
    #[test]
    fn chunked_payload_decodes_byte_for_byte(
        pieces in proptest::collection::vec(proptest::collection::vec(any::<u8>(), 0..80), 0..12),
    ) {
        let mut w = chunked_writer(None);
        for piece in &pieces {
            w.write_chunked_body(piece).expect("chunk after headers");
        }
        w.write_chunked_body_done().expect("terminator");

        let raw = w.serialize();
        let (payload, rest) = decode_chunked(body_of(&raw)).map_err(TestCaseError::fail)?;
        prop_assert_eq!(payload, pieces.concat());
        prop_assert_eq!(rest, b"\r\n".to_vec());
    }

    #[test]
    fn announced_trailers_follow_terminator(
        payload in proptest::collection::vec(any::<u8>(), 1..200),
        chunk_size in 1_usize..40,
    ) {
        let mut w = chunked_writer(Some("X-Content-Length"));
        for piece in payload.chunks(chunk_size) {
            w.write_chunked_body(piece).expect("chunk after headers");
        }
        w.write_chunked_body_done().expect("terminator");
        let trailers: Headers = [("X-Content-Length", payload.len().to_string().as_str())]
            .into_iter()
            .collect();
        w.write_trailers(trailers).expect("announced trailer");

        let raw = w.serialize();
        let (decoded, rest) = decode_chunked(body_of(&raw)).map_err(TestCaseError::fail)?;
        prop_assert_eq!(decoded, payload.clone());
        prop_assert_eq!(
            rest,
            format!("x-content-length: {}\r\n\r\n", payload.len()).into_bytes()
        );
    }
}
