// The per-block metadata record: a fixed, little-endian byte layout shared
// across producer and consumer processes through shared memory. Packed and
// unpacked explicitly (never cast through a `#[repr(C)]` struct) since the
// layout is a wire contract between independently-compiled processes, not an
// in-process memory representation.

/// Bytes of metadata at the start of every block, before the chunk payload.
pub const META_BLOCK_SIZE: usize = 36;

/// Hard ceiling on `chunk_size`, matching the construction parameter's clamp.
pub const MAX_CHUNK_SIZE: usize = 512 * 1024 * 1024;

/// `chunk_id` sentinel meaning "reserved but not yet committed" (producer) or
/// "claimed, gather in progress" (consumer).
pub const RESERVED_CHUNK_ID: u32 = 0xFFFF;

/// Width of the opaque message-id field.
pub const MSG_ID_LEN: usize = 12;

/// A message id: 12 ASCII hex digits, never all-zero (that's the free sentinel).
pub type MsgId = [u8; MSG_ID_LEN];

/// `msg_id` value meaning "this block is FREE".
pub const FREE_MSG_ID: MsgId = [0u8; MSG_ID_LEN];

const OFF_MSG_ID: usize = 0;
const OFF_MSG_SIZE: usize = 12;
const OFF_CHUNK_ID: usize = 16;
const OFF_TOTAL_CHUNKS: usize = 20;
const OFF_TOTAL_MSG_SIZE: usize = 24;
const OFF_CHECKSUM: usize = 28;
const OFF_SRC_PID: usize = 32;

/// In-memory view of a block's metadata record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockMeta {
    pub msg_id: MsgId,
    pub msg_size: u32,
    pub chunk_id: u32,
    pub total_chunks: u32,
    pub total_msg_size: u32,
    pub checksum: u32,
    pub src_pid: u32,
}

impl BlockMeta {
    /// The all-zero metadata record: a FREE block with no payload written.
    pub const fn free() -> Self {
        Self {
            msg_id: FREE_MSG_ID,
            msg_size: 0,
            chunk_id: 0,
            total_chunks: 0,
            total_msg_size: 0,
            checksum: 0,
            src_pid: 0,
        }
    }

    pub fn is_free(&self) -> bool {
        self.msg_id == FREE_MSG_ID
    }

    pub fn is_reserved(&self) -> bool {
        !self.is_free() && self.chunk_id == RESERVED_CHUNK_ID
    }

    pub fn is_head(&self) -> bool {
        !self.is_free() && self.chunk_id == 1
    }

    /// Unpack a metadata record from the first `META_BLOCK_SIZE` bytes of `buf`.
    pub fn read(buf: &[u8]) -> Self {
        debug_assert!(buf.len() >= META_BLOCK_SIZE);
        let mut msg_id = [0u8; MSG_ID_LEN];
        msg_id.copy_from_slice(&buf[OFF_MSG_ID..OFF_MSG_ID + MSG_ID_LEN]);
        Self {
            msg_id,
            msg_size: u32::from_le_bytes(buf[OFF_MSG_SIZE..OFF_MSG_SIZE + 4].try_into().unwrap()),
            chunk_id: u32::from_le_bytes(buf[OFF_CHUNK_ID..OFF_CHUNK_ID + 4].try_into().unwrap()),
            total_chunks: u32::from_le_bytes(
                buf[OFF_TOTAL_CHUNKS..OFF_TOTAL_CHUNKS + 4].try_into().unwrap(),
            ),
            total_msg_size: u32::from_le_bytes(
                buf[OFF_TOTAL_MSG_SIZE..OFF_TOTAL_MSG_SIZE + 4].try_into().unwrap(),
            ),
            checksum: u32::from_le_bytes(buf[OFF_CHECKSUM..OFF_CHECKSUM + 4].try_into().unwrap()),
            src_pid: u32::from_le_bytes(buf[OFF_SRC_PID..OFF_SRC_PID + 4].try_into().unwrap()),
        }
    }

    /// Pack this record into the first `META_BLOCK_SIZE` bytes of `buf`.
    pub fn write(&self, buf: &mut [u8]) {
        debug_assert!(buf.len() >= META_BLOCK_SIZE);
        buf[OFF_MSG_ID..OFF_MSG_ID + MSG_ID_LEN].copy_from_slice(&self.msg_id);
        buf[OFF_MSG_SIZE..OFF_MSG_SIZE + 4].copy_from_slice(&self.msg_size.to_le_bytes());
        buf[OFF_CHUNK_ID..OFF_CHUNK_ID + 4].copy_from_slice(&self.chunk_id.to_le_bytes());
        buf[OFF_TOTAL_CHUNKS..OFF_TOTAL_CHUNKS + 4]
            .copy_from_slice(&self.total_chunks.to_le_bytes());
        buf[OFF_TOTAL_MSG_SIZE..OFF_TOTAL_MSG_SIZE + 4]
            .copy_from_slice(&self.total_msg_size.to_le_bytes());
        buf[OFF_CHECKSUM..OFF_CHECKSUM + 4].copy_from_slice(&self.checksum.to_le_bytes());
        buf[OFF_SRC_PID..OFF_SRC_PID + 4].copy_from_slice(&self.src_pid.to_le_bytes());
    }
}

/// `total_chunks = ceil(len / chunk_size)`, with a zero-length payload still
/// producing exactly one chunk.
pub fn chunk_count(len: usize, chunk_size: usize) -> usize {
    if len == 0 {
        1
    } else {
        (len + chunk_size - 1) / chunk_size
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn free_meta_is_free() {
        assert!(BlockMeta::free().is_free());
    }

    #[test]
    fn roundtrip_pack_unpack() {
        let meta = BlockMeta {
            msg_id: *b"0123456789ab",
            msg_size: 42,
            chunk_id: 3,
            total_chunks: 7,
            total_msg_size: 1000,
            checksum: 0xdead_beef,
            src_pid: 4321,
        };
        let mut buf = [0u8; META_BLOCK_SIZE];
        meta.write(&mut buf);
        let back = BlockMeta::read(&buf);
        assert_eq!(meta, back);
    }

    #[test]
    fn reserved_sentinel_is_not_head() {
        let meta = BlockMeta {
            msg_id: *b"0123456789ab",
            chunk_id: RESERVED_CHUNK_ID,
            ..BlockMeta::free()
        };
        assert!(meta.is_reserved());
        assert!(!meta.is_head());
        assert!(!meta.is_free());
    }

    #[test]
    fn chunk_count_boundaries() {
        assert_eq!(chunk_count(0, 16), 1);
        assert_eq!(chunk_count(16, 16), 1);
        assert_eq!(chunk_count(17, 16), 2);
        assert_eq!(chunk_count(32, 16), 2);
        assert_eq!(chunk_count(33, 16), 3);
    }

    #[test]
    fn free_sentinel_is_not_a_hex_string() {
        // The free sentinel is 12 zero *bytes*, distinct from the ASCII
        // string "000000000000" (which is 12 bytes of 0x30).
        assert_ne!(FREE_MSG_ID, *b"000000000000");
    }

    proptest::proptest! {
        #[test]
        fn meta_roundtrips_for_any_field_values(
            msg_id in proptest::array::uniform12(proptest::prelude::any::<u8>()),
            msg_size in proptest::prelude::any::<u32>(),
            chunk_id in proptest::prelude::any::<u32>(),
            total_chunks in proptest::prelude::any::<u32>(),
            total_msg_size in proptest::prelude::any::<u32>(),
            checksum in proptest::prelude::any::<u32>(),
            src_pid in proptest::prelude::any::<u32>(),
        ) {
            let meta = BlockMeta {
                msg_id,
                msg_size,
                chunk_id,
                total_chunks,
                total_msg_size,
                checksum,
                src_pid,
            };
            let mut buf = [0u8; META_BLOCK_SIZE];
            meta.write(&mut buf);
            prop_assert_eq!(BlockMeta::read(&buf), meta);
        }

        #[test]
        fn chunk_count_covers_the_payload_without_an_idle_chunk(
            len in 0usize..(1 << 20),
            chunk_size in 1usize..(1 << 16),
        ) {
            let n = chunk_count(len, chunk_size);
            // Every byte fits within n chunks...
            prop_assert!(n * chunk_size >= len);
            // ...and n is minimal: one fewer chunk would not suffice (except
            // for the zero-length special case, which always reports 1).
            if len > 0 {
                prop_assert!((n - 1) * chunk_size < len);
            } else {
                prop_assert_eq!(n, 1);
            }
        }
    }
}
