//! XTEA: 64-bit block, 32 cycles, 128-bit key.

use cipher::consts::{U16, U8};
use zeroize::{Zeroize, ZeroizeOnDrop};

use super::{load_be, store_be, BlockPrimitive};

const DELTA: u32 = 0x9E37_79B9;
const CYCLES: u32 = 32;

/// XTEA block cipher with a 16-byte key.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct Xtea {
    k: [u32; 4],
}

impl Xtea {
    fn from_key(key: &[u8]) -> Self {
        let mut k = [0u32; 4];
        load_be(key, &mut k);
        Self { k }
    }

    fn mix(v: u32) -> u32 {
        ((v << 4) ^ (v >> 5)).wrapping_add(v)
    }

    fn subkey(&self, sum: u32, shift: u32) -> u32 {
        sum.wrapping_add(self.k[((sum >> shift) & 3) as usize])
    }
}

impl BlockPrimitive for Xtea {
    fn forward_block(&self, block: &mut [u8]) {
        let mut v = [0u32; 2];
        load_be(block, &mut v);
        let [mut v0, mut v1] = v;

        let mut sum = 0u32;
        for _ in 0..CYCLES {
            v0 = v0.wrapping_add(Self::mix(v1) ^ self.subkey(sum, 0));
            sum = sum.wrapping_add(DELTA);
            v1 = v1.wrapping_add(Self::mix(v0) ^ self.subkey(sum, 11));
        }

        store_be(block, &[v0, v1]);
    }

    fn inverse_block(&self, block: &mut [u8]) {
        let mut v = [0u32; 2];
        load_be(block, &mut v);
        let [mut v0, mut v1] = v;

        let mut sum = DELTA.wrapping_mul(CYCLES);
        for _ in 0..CYCLES {
            v1 = v1.wrapping_sub(Self::mix(v0) ^ self.subkey(sum, 11));
            sum = sum.wrapping_sub(DELTA);
            v0 = v0.wrapping_sub(Self::mix(v1) ^ self.subkey(sum, 0));
        }

        store_be(block, &[v0, v1]);
    }
}

impl_block_cipher!(Xtea, U8, U16, "XTEA");
