//! RC6-32/20/32: 128-bit block, 20 rounds, 256-bit key.

use cipher::consts::{U16, U32};
use zeroize::{Zeroize, ZeroizeOnDrop};

use super::BlockPrimitive;

const ROUNDS: usize = 20;
const SCHEDULE_LEN: usize = 2 * ROUNDS + 4;
const KEY_WORDS: usize = 8;

const P32: u32 = 0xB7E1_5163;
const Q32: u32 = 0x9E37_79B9;

/// RC6 block cipher with a 32-byte key.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct Rc6 {
    s: [u32; SCHEDULE_LEN],
}

impl Rc6 {
    fn from_key(key: &[u8]) -> Self {
        let mut l = [0u32; KEY_WORDS];
        for (word, chunk) in l.iter_mut().zip(key.chunks_exact(4)) {
            *word = u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
        }
        let c = (key.len() / 4).clamp(1, KEY_WORDS);

        let mut s = [0u32; SCHEDULE_LEN];
        s[0] = P32;
        for i in 1..SCHEDULE_LEN {
            s[i] = s[i - 1].wrapping_add(Q32);
        }

        let (mut a, mut b) = (0u32, 0u32);
        let (mut i, mut j) = (0usize, 0usize);
        for _ in 0..3 * SCHEDULE_LEN.max(c) {
            a = s[i].wrapping_add(a).wrapping_add(b).rotate_left(3);
            s[i] = a;
            b = l[j].wrapping_add(a).wrapping_add(b).rotate_left(a.wrapping_add(b));
            l[j] = b;
            i = (i + 1) % SCHEDULE_LEN;
            j = (j + 1) % c;
        }
        l.zeroize();

        Self { s }
    }
}

fn mix(x: u32) -> u32 {
    x.wrapping_mul(x.wrapping_mul(2).wrapping_add(1)).rotate_left(5)
}

fn load_le(block: &[u8]) -> [u32; 4] {
    let mut w = [0u32; 4];
    for (word, chunk) in w.iter_mut().zip(block.chunks_exact(4)) {
        *word = u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
    }
    w
}

fn store_le(block: &mut [u8], words: [u32; 4]) {
    for (chunk, word) in block.chunks_exact_mut(4).zip(words) {
        chunk.copy_from_slice(&word.to_le_bytes());
    }
}

impl BlockPrimitive for Rc6 {
    fn forward_block(&self, block: &mut [u8]) {
        let s = &self.s;
        let [mut a, mut b, mut c, mut d] = load_le(block);

        b = b.wrapping_add(s[0]);
        d = d.wrapping_add(s[1]);
        for i in 1..=ROUNDS {
            let t = mix(b);
            let u = mix(d);
            a = (a ^ t).rotate_left(u).wrapping_add(s[2 * i]);
            c = (c ^ u).rotate_left(t).wrapping_add(s[2 * i + 1]);
            (a, b, c, d) = (b, c, d, a);
        }
        a = a.wrapping_add(s[2 * ROUNDS + 2]);
        c = c.wrapping_add(s[2 * ROUNDS + 3]);

        store_le(block, [a, b, c, d]);
    }

    fn inverse_block(&self, block: &mut [u8]) {
        let s = &self.s;
        let [mut a, mut b, mut c, mut d] = load_le(block);

        c = c.wrapping_sub(s[2 * ROUNDS + 3]);
        a = a.wrapping_sub(s[2 * ROUNDS + 2]);
        for i in (1..=ROUNDS).rev() {
            (a, b, c, d) = (d, a, b, c);
            let u = mix(d);
            let t = mix(b);
            c = c.wrapping_sub(s[2 * i + 1]).rotate_right(t) ^ u;
            a = a.wrapping_sub(s[2 * i]).rotate_right(u) ^ t;
        }
        d = d.wrapping_sub(s[1]);
        b = b.wrapping_sub(s[0]);

        store_le(block, [a, b, c, d]);
    }
}

impl_block_cipher!(Rc6, U16, U32, "RC6");
