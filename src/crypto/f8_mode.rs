use aes::cipher::consts::U16;
use aes::cipher::generic_array::GenericArray;
use aes::cipher::{BlockEncrypt, BlockSizeUser, KeyInit};
use byteorder::{BigEndian, ByteOrder};
use zeroize::Zeroize;

use super::PayloadCipher;
use crate::error::{Error, Result};

/// Byte used to pad the session salt up to the key length when building the
/// IV-masking key `m = k_s || 0x55..` (RFC 3711 section 4.1.3).
const SALT_PAD: u8 = 0x55;

/// F8 feedback mode over a 128-bit block cipher (RFC 3711 section 4.1.3).
///
/// The per-packet IV is first masked through `E(k_e XOR m, IV)`; keystream
/// block j is then `S(j) = E(k_e, IV' XOR j XOR S(j-1))` with `S(-1) = 0`
/// and j spread big-endian over the block's trailing octets.
pub(crate) struct F8Mode<C> {
    cipher: C,
    iv_cipher: C,
}

impl<C> F8Mode<C>
where
    C: BlockSizeUser<BlockSize = U16> + BlockEncrypt + KeyInit,
{
    pub(crate) fn new(session_key: &[u8], session_salt: &[u8]) -> Result<Self> {
        let reject = |len: usize| {
            Error::Other(format!("session key of {len} bytes rejected by block cipher"))
        };

        let mut masked_key = vec![SALT_PAD; session_key.len()];
        let salt_len = session_salt.len().min(session_key.len());
        masked_key[..salt_len].copy_from_slice(&session_salt[..salt_len]);
        for (m, k) in masked_key.iter_mut().zip(session_key.iter()) {
            *m ^= k;
        }

        let cipher = C::new_from_slice(session_key).map_err(|_| reject(session_key.len()))?;
        let iv_cipher = C::new_from_slice(&masked_key).map_err(|_| reject(masked_key.len()))?;
        masked_key.zeroize();

        Ok(F8Mode { cipher, iv_cipher })
    }
}

impl<C> PayloadCipher for F8Mode<C>
where
    C: BlockSizeUser<BlockSize = U16> + BlockEncrypt + Send,
{
    fn process(&mut self, iv: &[u8; 16], buf: &mut [u8]) -> Result<()> {
        let mut masked_iv = *iv;
        self.iv_cipher
            .encrypt_block(GenericArray::from_mut_slice(&mut masked_iv));

        let mut feedback = [0u8; 16];
        for (j, chunk) in buf.chunks_mut(16).enumerate() {
            let mut block = masked_iv;
            for (b, f) in block.iter_mut().zip(feedback.iter()) {
                *b ^= f;
            }

            let mut counter = [0u8; 8];
            BigEndian::write_u64(&mut counter, j as u64);
            for (b, c) in block[8..].iter_mut().zip(counter.iter()) {
                *b ^= c;
            }

            self.cipher
                .encrypt_block(GenericArray::from_mut_slice(&mut block));
            feedback = block;

            for (p, k) in chunk.iter_mut().zip(feedback.iter()) {
                *p ^= k;
            }
        }

        Ok(())
    }
}
