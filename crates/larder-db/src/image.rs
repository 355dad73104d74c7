//! Recipe image codec.
//!
//! Images are deflate-compressed and base64-encoded before they hit the
//! `recipe` table, so rows stay printable and small. Decoding is total:
//! a blob that fails either stage decodes to an empty image rather than
//! failing the read that carried it.

use std::io::{Read, Write};

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use flate2::Compression;
use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use tracing::warn;

/// Compress raw image bytes into the stored representation.
pub fn compress_image(bytes: &[u8]) -> String {
    if bytes.is_empty() {
        return String::new();
    }
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    let compressed = encoder
        .write_all(bytes)
        .and_then(|()| encoder.finish())
        .unwrap_or_else(|err| {
            warn!(error = %err, "image compression failed, storing empty image");
            Vec::new()
        });
    STANDARD.encode(compressed)
}

/// Decode a stored image blob back into raw bytes.
///
/// Corrupt blobs yield an empty image.
pub fn decompress_image(encoded: &str) -> Vec<u8> {
    if encoded.is_empty() {
        return Vec::new();
    }
    let compressed = match STANDARD.decode(encoded) {
        Ok(bytes) => bytes,
        Err(err) => {
            warn!(error = %err, "stored image is not valid base64, returning empty image");
            return Vec::new();
        }
    };
    let mut decoder = ZlibDecoder::new(compressed.as_slice());
    let mut bytes = Vec::new();
    match decoder.read_to_end(&mut bytes) {
        Ok(_) => bytes,
        Err(err) => {
            warn!(error = %err, "stored image failed to decompress, returning empty image");
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_arbitrary_bytes() {
        let original: Vec<u8> = (0u16..4096).map(|i| (i % 251) as u8).collect();
        let stored = compress_image(&original);
        assert_eq!(decompress_image(&stored), original);
    }

    #[test]
    fn empty_image_round_trips_to_empty() {
        assert_eq!(compress_image(&[]), "");
        assert!(decompress_image("").is_empty());
    }

    #[test]
    fn invalid_base64_decodes_to_empty() {
        assert!(decompress_image("not base64 at all!").is_empty());
    }

    #[test]
    fn valid_base64_of_garbage_decodes_to_empty() {
        let garbage = STANDARD.encode(b"definitely not zlib");
        assert!(decompress_image(&garbage).is_empty());
    }

    #[test]
    fn compression_shrinks_repetitive_data() {
        let original = vec![42u8; 10_000];
        let stored = compress_image(&original);
        assert!(stored.len() < original.len());
    }
}
