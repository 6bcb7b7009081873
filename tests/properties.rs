//! Byte-accounting properties from the spec: no emitted body or header value
//! contains a delimiter substring, and the parts plus delimiters reconstruct
//! the original input minus prelude/epilogue.

use bytes::Bytes;
use futures_util::stream;
use multipart_stream::{Config, Multipart};

async fn parse_all(body: &[u8]) -> Vec<(Vec<(String, String)>, Vec<u8>)> {
    let source = stream::iter(vec![Ok::<_, std::io::Error>(Bytes::copy_from_slice(body))]);
    let mut mp = Multipart::new(source, "B", Config::default());
    let mut out = Vec::new();
    while let Some(mut field) = mp.next_field().await.unwrap() {
        let headers = field.headers().iter().map(|h| (h.name.clone(), h.value.clone())).collect();
        let body = field.bytes().await.unwrap().to_vec();
        out.push((headers, body));
    }
    out
}

#[tokio::test]
async fn no_delimiter_leaks_into_bodies_or_headers() {
    let body: &[u8] = b"preamble\r\n--B\r\nContent-Disposition: form-data; name=\"a\"\r\n\r\nhello world\r\n--B\r\nX: y\r\n\r\nsecond part body, quite normal\r\n--B--\r\nepilogue";
    let parts = parse_all(body).await;

    for (headers, bytes) in &parts {
        let text = String::from_utf8_lossy(bytes);
        assert!(!text.contains("\r\n--B"), "body leaked the inter-part delimiter: {text:?}");
        assert!(!text.contains("\r\n\r\n"), "body leaked the header terminator: {text:?}");
        for (_, value) in headers {
            assert!(!value.contains("\r\n--B"));
        }
    }
}

#[tokio::test]
async fn bytes_reconstruct_input_minus_prelude_and_epilogue() {
    let body: &[u8] = b"--B\r\nX: 1\r\n\r\nhello\r\n--B\r\nX: 2\r\n\r\nworld\r\n--B--\r\n";
    let parts = parse_all(body).await;

    let mut reconstructed = Vec::new();
    for (i, (headers, bytes)) in parts.iter().enumerate() {
        reconstructed.extend_from_slice(if i == 0 { b"--B\r\n" } else { b"\r\n--B\r\n" });
        for (name, value) in headers {
            reconstructed.extend_from_slice(format!("{name}: {value}\r\n").as_bytes());
        }
        reconstructed.extend_from_slice(b"\r\n");
        reconstructed.extend_from_slice(bytes);
    }
    reconstructed.extend_from_slice(b"\r\n--B--\r\n");

    assert_eq!(reconstructed, body);
}
