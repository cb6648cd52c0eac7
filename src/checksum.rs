// Per-chunk integrity checksum. Adler-32, matching the original
// implementation's use of `zlib.adler32`.

use adler::Adler32;

/// Adler-32 checksum of `data`.
pub fn adler32(data: &[u8]) -> u32 {
    let mut hasher = Adler32::new();
    hasher.write_slice(data);
    hasher.checksum()
}
