//! Block ciphers with no registry crate, built on the `cipher` traits.
//!
//! Each primitive implements `KeyInit`, `BlockEncrypt` and `BlockDecrypt`
//! so it drops into `cbc::Encryptor` / `cbc::Decryptor` exactly like the
//! RustCrypto ciphers used for the other chain layers.

use cipher::consts::U1;
use cipher::inout::InOut;
use cipher::{Block, BlockBackend, BlockSizeUser, ParBlocksSizeUser};

/// Single-block transform a primitive provides; the trait glue below
/// turns it into a full `cipher` block cipher.
pub(crate) trait BlockPrimitive: BlockSizeUser {
    fn forward_block(&self, block: &mut [u8]);
    fn inverse_block(&self, block: &mut [u8]);
}

pub(crate) struct EncBackend<'a, C>(pub(crate) &'a C);

pub(crate) struct DecBackend<'a, C>(pub(crate) &'a C);

impl<C: BlockPrimitive> BlockSizeUser for EncBackend<'_, C> {
    type BlockSize = C::BlockSize;
}

impl<C: BlockPrimitive> ParBlocksSizeUser for EncBackend<'_, C> {
    type ParBlocksSize = U1;
}

impl<C: BlockPrimitive> BlockBackend for EncBackend<'_, C> {
    fn proc_block(&mut self, mut block: InOut<'_, '_, Block<Self>>) {
        let mut buf = block.clone_in();
        self.0.forward_block(&mut buf);
        *block.get_out() = buf;
    }
}

impl<C: BlockPrimitive> BlockSizeUser for DecBackend<'_, C> {
    type BlockSize = C::BlockSize;
}

impl<C: BlockPrimitive> ParBlocksSizeUser for DecBackend<'_, C> {
    type ParBlocksSize = U1;
}

impl<C: BlockPrimitive> BlockBackend for DecBackend<'_, C> {
    fn proc_block(&mut self, mut block: InOut<'_, '_, Block<Self>>) {
        let mut buf = block.clone_in();
        self.0.inverse_block(&mut buf);
        *block.get_out() = buf;
    }
}

/// Wire a `BlockPrimitive` with an inherent `from_key(&[u8])` into the
/// `cipher` block-cipher traits.
macro_rules! impl_block_cipher {
    ($cipher:ident, $block:ty, $key:ty, $name:literal) => {
        impl ::cipher::KeySizeUser for $cipher {
            type KeySize = $key;
        }

        impl ::cipher::BlockSizeUser for $cipher {
            type BlockSize = $block;
        }

        impl ::cipher::BlockCipher for $cipher {}

        impl ::cipher::KeyInit for $cipher {
            fn new(key: &::cipher::Key<Self>) -> Self {
                Self::from_key(key.as_slice())
            }
        }

        impl ::cipher::AlgorithmName for $cipher {
            fn write_alg_name(f: &mut ::core::fmt::Formatter<'_>) -> ::core::fmt::Result {
                f.write_str($name)
            }
        }

        impl ::cipher::BlockEncrypt for $cipher {
            fn encrypt_with_backend(
                &self,
                f: impl ::cipher::BlockClosure<BlockSize = Self::BlockSize>,
            ) {
                f.call(&mut $crate::crypto::primitives::EncBackend(self))
            }
        }

        impl ::cipher::BlockDecrypt for $cipher {
            fn decrypt_with_backend(
                &self,
                f: impl ::cipher::BlockClosure<BlockSize = Self::BlockSize>,
            ) {
                f.call(&mut $crate::crypto::primitives::DecBackend(self))
            }
        }

        impl ::core::fmt::Debug for $cipher {
            fn fmt(&self, f: &mut ::core::fmt::Formatter<'_>) -> ::core::fmt::Result {
                f.write_str(concat!($name, " { .. }"))
            }
        }
    };
}

mod rc6;
mod seed;
mod tea;
mod xtea;

pub use rc6::Rc6;
pub use seed::Seed;
pub use tea::Tea;
pub use xtea::Xtea;

/// Read big-endian 32-bit words from `bytes` into `words`.
fn load_be(bytes: &[u8], words: &mut [u32]) {
    for (word, chunk) in words.iter_mut().zip(bytes.chunks_exact(4)) {
        *word = u32::from_be_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
    }
}

/// Write `words` into `bytes` as big-endian 32-bit words.
fn store_be(bytes: &mut [u8], words: &[u32]) {
    for (chunk, word) in bytes.chunks_exact_mut(4).zip(words) {
        chunk.copy_from_slice(&word.to_be_bytes());
    }
}
