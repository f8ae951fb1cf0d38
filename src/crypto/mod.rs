
pub(crate) mod auth;
pub(crate) mod counter_mode;
pub(crate) mod f8_mode;

use aes::Aes128;
use twofish::Twofish;

use crate::error::Result;
use crate::policy::{AuthKind, EncryptionKind};

use auth::{HmacSha1Auth, SkeinAuth};
use counter_mode::CounterMode;
use f8_mode::F8Mode;

/// Keystream engine keyed with a session encryption key. One call processes
/// one packet's payload in place; encrypting and decrypting are the same
/// operation.
pub(crate) trait PayloadCipher: Send {
    fn process(&mut self, iv: &[u8; 16], buf: &mut [u8]) -> Result<()>;
}

/// Keyed MAC engine. The key is bound at derivation time; each packet clones
/// the keyed state, feeds it the authenticated chunks and writes the
/// full-length tag into the caller's scratch, returning its length. Callers
/// truncate to the negotiated tag length.
pub(crate) trait SessionAuth: Send {
    fn output_len(&self) -> usize;
    fn tag(&self, chunks: &[&[u8]], out: &mut [u8; 32]) -> usize;
}

pub(crate) fn new_payload_cipher(
    kind: EncryptionKind,
    session_key: &[u8],
    session_salt: &[u8],
) -> Result<Option<Box<dyn PayloadCipher>>> {
    Ok(match kind {
        EncryptionKind::None => None,
        EncryptionKind::AesCm => Some(Box::new(CounterMode::<Aes128>::new(session_key)?)),
        EncryptionKind::TwofishCm => Some(Box::new(CounterMode::<Twofish>::new(session_key)?)),
        EncryptionKind::AesF8 => Some(Box::new(F8Mode::<Aes128>::new(session_key, session_salt)?)),
        EncryptionKind::TwofishF8 => {
            Some(Box::new(F8Mode::<Twofish>::new(session_key, session_salt)?))
        }
    })
}

pub(crate) fn new_session_auth(
    kind: AuthKind,
    session_auth_key: &[u8],
) -> Result<Option<Box<dyn SessionAuth>>> {
    Ok(match kind {
        AuthKind::None => None,
        AuthKind::HmacSha1 => Some(Box::new(HmacSha1Auth::new(session_auth_key)?)),
        AuthKind::Skein => Some(Box::new(SkeinAuth::new(session_auth_key)?)),
    })
}
