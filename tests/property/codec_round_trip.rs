//! Property-based tests for the container codec

use proptest::prelude::*;
use sordello::codec::{compress, decompress};

proptest! {
    /// Any payload survives compress then decompress
    #[test]
    fn test_compress_decompress_identity(data in proptest::collection::vec(any::<u8>(), 1..4096)) {
        let container = compress(&data).unwrap();
        prop_assert_eq!(decompress(&container).unwrap(), data);
    }

    /// Flipping a byte of the trailer CRC is always caught
    #[test]
    fn test_corrupt_crc_is_rejected(
        data in proptest::collection::vec(any::<u8>(), 1..512),
        offset in 5usize..=8,
        mask in 1u8..=255,
    ) {
        let mut container = compress(&data).unwrap();
        let index = container.len() - offset;
        container[index] ^= mask;
        prop_assert!(decompress(&container).is_err());
    }
}

/// Compression is deterministic for the same input
#[test]
fn test_compress_is_deterministic() {
    let mut runner = proptest::test_runner::TestRunner::default();

    runner
        .run(&any::<Vec<u8>>(), |data| {
            prop_assume!(!data.is_empty());
            assert_eq!(compress(&data).unwrap(), compress(&data).unwrap());
            Ok(())
        })
        .unwrap();
}
