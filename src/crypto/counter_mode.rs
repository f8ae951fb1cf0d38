use ctr::cipher::inout::InOutBuf;
use ctr::cipher::{BlockCipher, BlockEncrypt, InnerIvInit, KeyInit, StreamCipherCore};
use ctr::flavors::{Ctr128BE, CtrFlavor};
use ctr::CtrCore;

use super::PayloadCipher;
use crate::error::{Error, Result};

/// Counter mode over a 128-bit block cipher (RFC 3711 section 4.1.1).
///
/// The block cipher is keyed once per derivation; each packet spins up a
/// fresh 128-bit big-endian counter over a clone of it. Going through the
/// keyed instance rather than `KeyIvInit` lets Twofish accept its 128-bit
/// SRTP keys, which are shorter than the crate-level `KeySize`.
pub(crate) struct CounterMode<C> {
    cipher: C,
}

impl<C> CounterMode<C>
where
    C: BlockCipher + BlockEncrypt + KeyInit,
{
    pub(crate) fn new(session_key: &[u8]) -> Result<Self> {
        let cipher = C::new_from_slice(session_key).map_err(|_| {
            Error::Other(format!(
                "session key of {} bytes rejected by block cipher",
                session_key.len()
            ))
        })?;
        Ok(CounterMode { cipher })
    }
}

impl<C> PayloadCipher for CounterMode<C>
where
    C: BlockCipher + BlockEncrypt + Clone + Send,
    Ctr128BE: CtrFlavor<C::BlockSize>,
{
    fn process(&mut self, iv: &[u8; 16], buf: &mut [u8]) -> Result<()> {
        let core = CtrCore::<C, Ctr128BE>::inner_iv_slice_init(self.cipher.clone(), iv)
            .map_err(|_| Error::Other("counter iv rejected by block cipher".to_owned()))?;
        core.apply_keystream_partial(InOutBuf::from(buf));
        Ok(())
    }
}
