mod common;
use common::*;
use std::fs::File;
use std::io::Write;

#[test]
fn test_gzip_input() {
    use flate2::write::GzEncoder;
    use flate2::Compression;

    let ws = Workspace::new();
    let path = ws.file("import_data.csv.gz");

    let gz_file = File::create(&path).unwrap();
    let mut encoder = GzEncoder::new(gz_file, Compression::default());
    encoder.write_all(postcode_sample().as_bytes()).unwrap();
    encoder.finish().unwrap();

    let (_stdout, stderr, exit_code) = ws.run(&[path.to_str().unwrap()]);
    assert_eq!(exit_code, 0, "Should read gzip input. stderr: {}", stderr);
    assert_eq!(ids(&ws.read(ACCEPTED).unwrap()), vec![1, 4]);
    assert_eq!(ids(&ws.read(REJECTED).unwrap()), vec![2, 3, 5]);
}

#[test]
fn test_zstd_input() {
    use zstd::stream::write::Encoder;

    let ws = Workspace::new();
    let path = ws.file("import_data.csv.zst");

    let zst_file = File::create(&path).unwrap();
    let mut encoder = Encoder::new(zst_file, 0).unwrap();
    encoder.write_all(postcode_sample().as_bytes()).unwrap();
    encoder.finish().unwrap();

    let (_stdout, stderr, exit_code) = ws.run(&[path.to_str().unwrap()]);
    assert_eq!(exit_code, 0, "Should read zstd input. stderr: {}", stderr);
    assert_eq!(ids(&ws.read(ACCEPTED).unwrap()), vec![1, 4]);
}

#[test]
fn test_compression_detected_by_content_not_name() {
    use flate2::write::GzEncoder;
    use flate2::Compression;

    let ws = Workspace::new();
    let path = ws.file("looks_plain.csv");

    let gz_file = File::create(&path).unwrap();
    let mut encoder = GzEncoder::new(gz_file, Compression::fast());
    encoder.write_all(postcode_sample().as_bytes()).unwrap();
    encoder.finish().unwrap();

    let (_stdout, stderr, exit_code) = ws.run(&[path.to_str().unwrap()]);
    assert_eq!(exit_code, 0, "stderr: {}", stderr);
    assert_eq!(ws.read(ACCEPTED).unwrap(), "row_id,postcode\n1,EC1A 1BB\n4,GIR 0AA\n");
}

#[test]
fn test_gzip_on_stdin() {
    use flate2::write::GzEncoder;
    use flate2::Compression;

    let ws = Workspace::new();
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(postcode_sample().as_bytes()).unwrap();
    let compressed = encoder.finish().unwrap();

    let mut child = ws.spawn(&["-"]);
    child.stdin.take().unwrap().write_all(&compressed).unwrap();
    let output = child.wait_with_output().unwrap();

    assert_eq!(output.status.code(), Some(0));
    assert_eq!(ids(&ws.read(REJECTED).unwrap()), vec![2, 3, 5]);
}

#[test]
fn test_corrupt_gzip_fails_without_output() {
    let ws = Workspace::new();
    // Complete gzip header, then a deflate block with the reserved block type
    let path = ws.write(
        "broken.csv.gz",
        [0x1f, 0x8b, 0x08, 0x00, 0, 0, 0, 0, 0x00, 0xff, 0xff, 0xff, 0xff, 0xff],
    );

    let (_stdout, stderr, exit_code) = ws.run(&[&path]);
    assert_eq!(exit_code, 1);
    assert!(!stderr.is_empty());
    assert!(!ws.exists(ACCEPTED));
}
