use crate::error::{Error, Result};

/// Payload transform negotiated for a stream.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum EncryptionKind {
    /// NULL cipher, the payload is forwarded as-is.
    None,
    #[default]
    AesCm,
    AesF8,
    TwofishCm,
    TwofishF8,
}

/// Message authentication negotiated for a stream.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum AuthKind {
    None,
    #[default]
    HmacSha1,
    Skein,
}

/// Policy specifies the cipher suite of a stream: which transforms run and
/// how long the session keys and tags are, similar to a TLS cipher suite.
///
/// Session key lengths are in bytes; `auth_tag_len` is the truncated tag
/// appended to SRTP packets, `rtcp_auth_tag_len` the one appended to SRTCP
/// packets (RFC 5764 keeps an 80-bit SRTCP tag even for the 32-bit profile).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Policy {
    pub encryption: EncryptionKind,
    pub auth: AuthKind,
    pub enc_key_len: usize,
    pub auth_key_len: usize,
    pub salt_key_len: usize,
    pub auth_tag_len: usize,
    pub rtcp_auth_tag_len: usize,
}

impl Default for Policy {
    fn default() -> Self {
        Policy::aes_cm_hmac_sha1_80()
    }
}

impl Policy {
    pub fn aes_cm_hmac_sha1_80() -> Self {
        Policy {
            encryption: EncryptionKind::AesCm,
            auth: AuthKind::HmacSha1,
            enc_key_len: 16,
            auth_key_len: 20,
            salt_key_len: 14,
            auth_tag_len: 10,
            rtcp_auth_tag_len: 10,
        }
    }

    pub fn aes_cm_hmac_sha1_32() -> Self {
        Policy {
            auth_tag_len: 4,
            ..Policy::aes_cm_hmac_sha1_80()
        }
    }

    pub fn aes_f8_hmac_sha1_80() -> Self {
        Policy {
            encryption: EncryptionKind::AesF8,
            ..Policy::aes_cm_hmac_sha1_80()
        }
    }

    pub fn twofish_cm_hmac_sha1_80() -> Self {
        Policy {
            encryption: EncryptionKind::TwofishCm,
            ..Policy::aes_cm_hmac_sha1_80()
        }
    }

    pub fn twofish_f8_hmac_sha1_80() -> Self {
        Policy {
            encryption: EncryptionKind::TwofishF8,
            ..Policy::aes_cm_hmac_sha1_80()
        }
    }

    pub fn aes_cm_skein() -> Self {
        Policy {
            auth: AuthKind::Skein,
            auth_key_len: 32,
            ..Policy::aes_cm_hmac_sha1_80()
        }
    }

    /// No encryption, no authentication. Useful for tests and for streams
    /// whose confidentiality is handled elsewhere.
    pub fn null_cipher() -> Self {
        Policy {
            encryption: EncryptionKind::None,
            auth: AuthKind::None,
            enc_key_len: 16,
            auth_key_len: 0,
            salt_key_len: 14,
            auth_tag_len: 0,
            rtcp_auth_tag_len: 0,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.auth == AuthKind::None && (self.auth_tag_len != 0 || self.rtcp_auth_tag_len != 0) {
            return Err(Error::InvalidPolicy(
                "auth tag declared without an auth algorithm".to_owned(),
            ));
        }
        if self.auth != AuthKind::None && self.auth_key_len == 0 {
            return Err(Error::InvalidPolicy(
                "auth algorithm declared with an empty auth key".to_owned(),
            ));
        }
        if self.encryption != EncryptionKind::None && self.enc_key_len == 0 {
            return Err(Error::InvalidPolicy(
                "cipher declared with an empty encryption key".to_owned(),
            ));
        }
        Ok(())
    }
}

/// ProtectionProfile is the 16-bit identifier negotiated through the
/// DTLS-SRTP extension (RFC 5764 section 4.1.2).
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
#[repr(u16)]
pub enum ProtectionProfile {
    #[default]
    Aes128CmHmacSha1_80 = 0x0001,
    Aes128CmHmacSha1_32 = 0x0002,
}

impl ProtectionProfile {
    pub fn from_id(id: u16) -> Result<Self> {
        match id {
            0x0001 => Ok(ProtectionProfile::Aes128CmHmacSha1_80),
            0x0002 => Ok(ProtectionProfile::Aes128CmHmacSha1_32),
            _ => Err(Error::NoSuchProtectionProfile(id)),
        }
    }

    pub fn id(&self) -> u16 {
        *self as u16
    }

    pub fn policy(&self) -> Policy {
        match self {
            ProtectionProfile::Aes128CmHmacSha1_80 => Policy::aes_cm_hmac_sha1_80(),
            ProtectionProfile::Aes128CmHmacSha1_32 => Policy::aes_cm_hmac_sha1_32(),
        }
    }

    pub fn key_len(&self) -> usize {
        self.policy().enc_key_len
    }

    pub fn salt_len(&self) -> usize {
        self.policy().salt_key_len
    }

    pub fn rtp_auth_tag_len(&self) -> usize {
        self.policy().auth_tag_len
    }
}
