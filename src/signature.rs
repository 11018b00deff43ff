//! Literal byte-pattern search.
//!
//! Patterns are at most a few bytes long and buffers are tens of
//! megabytes, so a plain windowed scan is enough.

/// Bitmap file header signature.
pub const BMP_MAGIC: &[u8] = b"BM";

/// JPEG start-of-image followed by an APP0 (JFIF) marker.
pub const JPEG_JFIF_MAGIC: &[u8] = &[0xFF, 0xD8, 0xFF, 0xE0];

/// JPEG start-of-image followed by an APP1 (EXIF) marker.
pub const JPEG_EXIF_MAGIC: &[u8] = &[0xFF, 0xD8, 0xFF, 0xE1];

/// Both accepted JPEG starts.
pub const JPEG_MAGICS: &[&[u8]] = &[JPEG_JFIF_MAGIC, JPEG_EXIF_MAGIC];

/// Offset of the first occurrence of `pattern` at or after `start`.
///
/// Unaligned matches are found. An empty pattern never matches.
pub fn find(buffer: &[u8], pattern: &[u8], start: usize) -> Option<usize> {
    if pattern.is_empty() || start >= buffer.len() {
        return None;
    }
    buffer[start..]
        .windows(pattern.len())
        .position(|window| window == pattern)
        .map(|pos| start + pos)
}

/// Earliest occurrence of any of `patterns` at or after `start`, with the
/// pattern that matched.
pub fn find_any<'p>(
    buffer: &[u8],
    patterns: &[&'p [u8]],
    start: usize,
) -> Option<(usize, &'p [u8])> {
    patterns
        .iter()
        .filter_map(|&p| find(buffer, p, start).map(|off| (off, p)))
        .min_by_key(|&(off, _)| off)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_unaligned_matches() {
        let buf = b"xBMyyBM";
        assert_eq!(find(buf, BMP_MAGIC, 0), Some(1));
        assert_eq!(find(buf, BMP_MAGIC, 1), Some(1));
        assert_eq!(find(buf, BMP_MAGIC, 2), Some(5));
        assert_eq!(find(buf, BMP_MAGIC, 6), None);
        assert_eq!(find(buf, BMP_MAGIC, 100), None);
        assert_eq!(find(buf, b"", 0), None);
    }

    #[test]
    fn pattern_longer_than_rest() {
        let buf = [0xFF, 0xD8, 0xFF];
        assert_eq!(find(&buf, JPEG_JFIF_MAGIC, 0), None);
    }

    #[test]
    fn earliest_jpeg_variant_wins() {
        let mut buf = vec![0u8; 16];
        buf[10..14].copy_from_slice(JPEG_JFIF_MAGIC);
        buf[3..7].copy_from_slice(JPEG_EXIF_MAGIC);
        assert_eq!(find_any(&buf, JPEG_MAGICS, 0), Some((3, JPEG_EXIF_MAGIC)));
        assert_eq!(find_any(&buf, JPEG_MAGICS, 4), Some((10, JPEG_JFIF_MAGIC)));
        assert_eq!(find_any(&buf, JPEG_MAGICS, 11), None);
    }
}
