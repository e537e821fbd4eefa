//! TEA: 64-bit block, 32 cycles, 128-bit key.

use cipher::consts::{U16, U8};
use zeroize::{Zeroize, ZeroizeOnDrop};

use super::{load_be, store_be, BlockPrimitive};

const DELTA: u32 = 0x9E37_79B9;
const CYCLES: u32 = 32;

/// TEA block cipher with a 16-byte key.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct Tea {
    k: [u32; 4],
}

impl Tea {
    fn from_key(key: &[u8]) -> Self {
        let mut k = [0u32; 4];
        load_be(key, &mut k);
        Self { k }
    }
}

impl BlockPrimitive for Tea {
    fn forward_block(&self, block: &mut [u8]) {
        let k = &self.k;
        let mut v = [0u32; 2];
        load_be(block, &mut v);
        let [mut v0, mut v1] = v;

        let mut sum = 0u32;
        for _ in 0..CYCLES {
            sum = sum.wrapping_add(DELTA);
            v0 = v0.wrapping_add(
                (v1 << 4).wrapping_add(k[0]) ^ v1.wrapping_add(sum) ^ (v1 >> 5).wrapping_add(k[1]),
            );
            v1 = v1.wrapping_add(
                (v0 << 4).wrapping_add(k[2]) ^ v0.wrapping_add(sum) ^ (v0 >> 5).wrapping_add(k[3]),
            );
        }

        store_be(block, &[v0, v1]);
    }

    fn inverse_block(&self, block: &mut [u8]) {
        let k = &self.k;
        let mut v = [0u32; 2];
        load_be(block, &mut v);
        let [mut v0, mut v1] = v;

        let mut sum = DELTA.wrapping_mul(CYCLES);
        for _ in 0..CYCLES {
            v1 = v1.wrapping_sub(
                (v0 << 4).wrapping_add(k[2]) ^ v0.wrapping_add(sum) ^ (v0 >> 5).wrapping_add(k[3]),
            );
            v0 = v0.wrapping_sub(
                (v1 << 4).wrapping_add(k[0]) ^ v1.wrapping_add(sum) ^ (v1 >> 5).wrapping_add(k[1]),
            );
            sum = sum.wrapping_sub(DELTA);
        }

        store_be(block, &[v0, v1]);
    }
}

impl_block_cipher!(Tea, U8, U16, "TEA");

#[cfg(test)]
mod tests {
    use super::super::test_util::{check_kat, hex};
    use super::*;

    #[test]
    fn zero_key_zero_block() {
        check_kat::<Tea>(&[0u8; 16], &[0u8; 8], &hex("41ea3a0a94baa940"));
    }

    #[test]
    fn delta_sum_wraps_to_reference_constant() {
        assert_eq!(DELTA.wrapping_mul(CYCLES), 0xC6EF_3720);
    }
}
