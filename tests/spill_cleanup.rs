//! End-to-end spill-threshold scenario (S5): a body past the threshold
//! spills to exactly one temp file, and that file is gone once its part's
//! body has been fully consumed.

use bytes::Bytes;
use futures_util::stream;
use multipart_stream::{PartBody, SpillConfig, SpillingMultipart};

#[tokio::test]
async fn oversized_part_spills_once_and_is_deleted_after_consumption() {
    let big_body = vec![b'z'; 10 * 1024];
    let mut raw = b"--B\r\nContent-Disposition: form-data; name=\"f\"\r\n\r\n".to_vec();
    raw.extend_from_slice(&big_body);
    raw.extend_from_slice(b"\r\n--B--\r\n");

    let source = stream::iter(vec![Ok::<_, std::io::Error>(Bytes::from(raw))]);
    let spill = SpillConfig::default().with_max_before_write(2 * 1024);
    let mut mp = SpillingMultipart::new(source, "B", 1024, spill);

    let part = mp.next_part().await.unwrap().expect("one part");
    let path = match &part.body {
        PartBody::Spilled(file) => {
            assert_eq!(file.size(), big_body.len() as u64);
            let on_disk = tokio::fs::read(file.path()).await.unwrap();
            assert_eq!(on_disk, big_body);
            file.path().to_path_buf()
        }
        PartBody::Memory(_) => panic!("expected this body to spill"),
    };

    assert!(mp.next_part().await.unwrap().is_none());

    drop(part);
    tokio::time::sleep(std::time::Duration::from_millis(50)).await;
    assert!(tokio::fs::metadata(&path).await.is_err(), "spill file should be deleted after drop");
}

#[tokio::test]
async fn multiple_spilled_parts_each_clean_up_independently() {
    let mut raw = Vec::new();
    for i in 0..3 {
        raw.extend_from_slice(format!("--B\r\nX: {i}\r\n\r\n").as_bytes());
        raw.extend(std::iter::repeat(b'a' + i as u8).take(4096));
        raw.extend_from_slice(b"\r\n");
    }
    raw.extend_from_slice(b"--B--\r\n");

    let source = stream::iter(vec![Ok::<_, std::io::Error>(Bytes::from(raw))]);
    let spill = SpillConfig::default().with_max_before_write(1024).with_max_parts(10);
    let mut mp = SpillingMultipart::new(source, "B", 1024, spill);

    let mut paths = Vec::new();
    while let Some(part) = mp.next_part().await.unwrap() {
        if let PartBody::Spilled(file) = &part.body {
            paths.push(file.path().to_path_buf());
        }
        drop(part);
    }

    assert_eq!(paths.len(), 3);
    tokio::time::sleep(std::time::Duration::from_millis(50)).await;
    for path in paths {
        assert!(tokio::fs::metadata(&path).await.is_err(), "every spill file should be cleaned up");
    }
}
