use hmac::digest::consts::U32;
use hmac::{Hmac, Mac, SimpleHmac};
use sha1::Sha1;
use skein::Skein512;

use super::SessionAuth;
use crate::error::{Error, Result};

type HmacSha1 = Hmac<Sha1>;
type HmacSkein512 = SimpleHmac<Skein512<U32>>;

/// HMAC-SHA1, the predefined SRTP auth transform (RFC 3711 section 4.2).
pub(crate) struct HmacSha1Auth {
    mac: HmacSha1,
}

impl HmacSha1Auth {
    pub(crate) fn new(session_auth_key: &[u8]) -> Result<Self> {
        let mac = HmacSha1::new_from_slice(session_auth_key)
            .map_err(|e| Error::Other(e.to_string()))?;
        Ok(HmacSha1Auth { mac })
    }
}

impl SessionAuth for HmacSha1Auth {
    fn output_len(&self) -> usize {
        20
    }

    fn tag(&self, chunks: &[&[u8]], out: &mut [u8; 32]) -> usize {
        let mut signer = self.mac.clone();
        for chunk in chunks {
            signer.update(chunk);
        }
        let tag = signer.finalize().into_bytes();
        out[..tag.len()].copy_from_slice(&tag);
        tag.len()
    }
}

/// Skein-512/256 keyed through the HMAC construction. The RustCrypto `skein`
/// crate exposes Skein only as a hash, not in its native keyed mode, so the
/// key goes through `SimpleHmac` instead.
pub(crate) struct SkeinAuth {
    mac: HmacSkein512,
}

impl SkeinAuth {
    pub(crate) fn new(session_auth_key: &[u8]) -> Result<Self> {
        let mac = HmacSkein512::new_from_slice(session_auth_key)
            .map_err(|e| Error::Other(e.to_string()))?;
        Ok(SkeinAuth { mac })
    }
}

impl SessionAuth for SkeinAuth {
    fn output_len(&self) -> usize {
        32
    }

    fn tag(&self, chunks: &[&[u8]], out: &mut [u8; 32]) -> usize {
        let mut signer = self.mac.clone();
        for chunk in chunks {
            signer.update(chunk);
        }
        let tag = signer.finalize().into_bytes();
        out[..tag.len()].copy_from_slice(&tag);
        tag.len()
    }
}
