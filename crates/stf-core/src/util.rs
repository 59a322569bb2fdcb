//! Small bit-twiddling helpers shared by the codec and by object
//! implementations that pack several fields into one byte.

/// Mask selecting the lowest `bits` bits.
pub const fn mask_bits(bits: u32) -> u128 {
    if bits >= u128::BITS {
        u128::MAX
    } else {
        (1u128 << bits) - 1
    }
}

/// Pack two values below 16 into one byte, `high` in the upper nibble.
///
/// Bits above the low nibble of either argument are discarded.
pub const fn pack_nibbles(high: u8, low: u8) -> u8 {
    ((high & 0x0F) << 4) | (low & 0x0F)
}

/// Inverse of [`pack_nibbles`]: returns `(high, low)`.
pub const fn unpack_nibbles(byte: u8) -> (u8, u8) {
    ((byte & 0xF0) >> 4, byte & 0x0F)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mask_widths() {
        assert_eq!(mask_bits(0), 0);
        assert_eq!(mask_bits(8), 0xFF);
        assert_eq!(mask_bits(64), u64::MAX as u128);
        assert_eq!(mask_bits(128), u128::MAX);
    }

    #[test]
    fn nibbles_roundtrip() {
        for high in 0..16u8 {
            for low in 0..16u8 {
                assert_eq!(unpack_nibbles(pack_nibbles(high, low)), (high, low));
            }
        }
    }

    #[test]
    fn nibbles_discard_overflow() {
        assert_eq!(pack_nibbles(0x13, 0x2F), 0x3F);
    }
}
