//! Transparent gzip/zstd decoding for record input.
//!
//! Compression is detected from magic bytes, never from the file name, so a
//! gzipped export that kept its `.csv` name still reads correctly.

use anyhow::{anyhow, Context, Result};
use flate2::read::MultiGzDecoder;
use std::fs::File;
use std::io::{BufReader, Chain, Cursor, Read};
use std::path::Path;

const GZIP_MAGIC: [u8; 3] = [0x1F, 0x8B, 0x08];
const ZSTD_MAGIC: [u8; 4] = [0x28, 0xB5, 0x2F, 0xFD];

/// Compression detected at the start of an input stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compression {
    None,
    Gzip,
    Zstd,
}

impl Compression {
    fn detect(head: &[u8]) -> Self {
        if head.len() >= GZIP_MAGIC.len() && head[..GZIP_MAGIC.len()] == GZIP_MAGIC {
            Compression::Gzip
        } else if head.len() >= ZSTD_MAGIC.len() && head[..ZSTD_MAGIC.len()] == ZSTD_MAGIC {
            Compression::Zstd
        } else {
            Compression::None
        }
    }
}

/// Peek at the first bytes of `reader` and wrap it in the matching decoder.
/// The peeked bytes are put back in front of the stream.
pub fn maybe_decompress<R: Read + Send + 'static>(
    mut reader: R,
) -> std::io::Result<(Box<dyn Read + Send>, Compression)> {
    let mut head = [0u8; 4];
    let n = read_up_to(&mut reader, &mut head)?;

    let compression = Compression::detect(&head[..n]);
    let chained: Chain<Cursor<Vec<u8>>, R> = Cursor::new(head[..n].to_vec()).chain(reader);

    let decoded: Box<dyn Read + Send> = match compression {
        Compression::Gzip => Box::new(MultiGzDecoder::new(chained)),
        Compression::Zstd => Box::new(zstd::Decoder::new(chained)?),
        Compression::None => Box::new(chained),
    };
    Ok((decoded, compression))
}

/// Open an input file (or stdin for `-`) without reading from it. Pass the
/// result through [`maybe_decompress`] to decode it.
pub fn open_input(path: &str) -> Result<Box<dyn Read + Send>> {
    if path == "-" {
        return Ok(Box::new(std::io::stdin()));
    }

    let path_ref = Path::new(path);
    if let Some(extension) = path_ref.extension().and_then(|ext| ext.to_str()) {
        if extension.eq_ignore_ascii_case("zip") {
            return Err(anyhow!(
                "ZIP archives are not supported as input. Only gzip and zstd streams are decoded. Extract the archive first: unzip {}",
                path_ref.display()
            ));
        }
    }

    let file = File::open(path_ref)
        .with_context(|| format!("Failed to open input file '{}'", path_ref.display()))?;
    Ok(Box::new(BufReader::new(file)))
}

/// `read` may return short counts; keep going until `buf` is full or EOF.
fn read_up_to<R: Read>(reader: &mut R, buf: &mut [u8]) -> std::io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}
