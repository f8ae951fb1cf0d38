#[cfg(test)]
mod srtcp_test;

pub mod srtcp;
pub mod srtp;

use zeroize::{Zeroize, Zeroizing};

use crate::crypto::{new_payload_cipher, new_session_auth, PayloadCipher, SessionAuth};
use crate::error::{Error, Result};
use crate::key_derivation::{
    aes_cm_key_derivation, LABEL_SRTCP_AUTHENTICATION_TAG, LABEL_SRTCP_ENCRYPTION,
    LABEL_SRTCP_SALT, LABEL_SRTP_AUTHENTICATION_TAG, LABEL_SRTP_ENCRYPTION, LABEL_SRTP_SALT,
};
use crate::policy::Policy;

pub use srtcp::RtcpContext;
pub use srtp::RtpContext;

/// Long-lived half shared by both context kinds: the negotiated policy, the
/// master material it was keyed with, and the engines derived from it.
///
/// Session keys are derived lazily on the first packet. When a key
/// derivation rate is in effect the derivation re-runs whenever the
/// `index / kdr` quotient moves; without one the master material is wiped as
/// soon as the only derivation it will ever feed has happened.
pub(crate) struct BaseContext {
    pub(crate) policy: Policy,
    for_rtcp: bool,
    master_key: Zeroizing<Vec<u8>>,
    master_salt: Zeroizing<Vec<u8>>,
    pub(crate) session_salt: Zeroizing<Vec<u8>>,
    pub(crate) cipher: Option<Box<dyn PayloadCipher>>,
    pub(crate) auth: Option<Box<dyn SessionAuth>>,
    pub(crate) derived_for: Option<u64>,
    pub(crate) tag_scratch: [u8; 32],
}

impl BaseContext {
    pub(crate) fn new(
        policy: Policy,
        master_key: &[u8],
        master_salt: &[u8],
        for_rtcp: bool,
    ) -> Result<Self> {
        policy.validate()?;
        if master_key.len() != policy.enc_key_len {
            return Err(Error::SrtpMasterKeyLength(
                policy.enc_key_len,
                master_key.len(),
            ));
        }
        if master_salt.len() != policy.salt_key_len {
            return Err(Error::SrtpSaltLength(policy.salt_key_len, master_salt.len()));
        }

        Ok(BaseContext {
            policy,
            for_rtcp,
            master_key: Zeroizing::new(master_key.to_vec()),
            master_salt: Zeroizing::new(master_salt.to_vec()),
            session_salt: Zeroizing::new(Vec::new()),
            cipher: None,
            auth: None,
            derived_for: None,
            tag_scratch: [0u8; 32],
        })
    }

    /// Make sure the session keys backing the engines match `index`.
    pub(crate) fn ensure_derived(&mut self, index: u64, key_derivation_rate: u64) -> Result<()> {
        let quotient = if key_derivation_rate == 0 {
            0
        } else {
            index / key_derivation_rate
        };
        if self.derived_for == Some(quotient) {
            return Ok(());
        }
        self.derive(quotient, key_derivation_rate != 0)
    }

    fn derive(&mut self, quotient: u64, retain_master: bool) -> Result<()> {
        if self.master_key.len() != self.policy.enc_key_len {
            // The master key was wiped after a rate-less derivation; being
            // asked to derive again is an invariant breach.
            return Err(Error::KeyNotDerived);
        }

        let (enc_label, auth_label, salt_label) = if self.for_rtcp {
            (
                LABEL_SRTCP_ENCRYPTION,
                LABEL_SRTCP_AUTHENTICATION_TAG,
                LABEL_SRTCP_SALT,
            )
        } else {
            (
                LABEL_SRTP_ENCRYPTION,
                LABEL_SRTP_AUTHENTICATION_TAG,
                LABEL_SRTP_SALT,
            )
        };

        let session_key = Zeroizing::new(aes_cm_key_derivation(
            enc_label,
            &self.master_key,
            &self.master_salt,
            quotient,
            self.policy.enc_key_len,
        )?);
        let session_auth_key = Zeroizing::new(aes_cm_key_derivation(
            auth_label,
            &self.master_key,
            &self.master_salt,
            quotient,
            self.policy.auth_key_len,
        )?);
        let session_salt = Zeroizing::new(aes_cm_key_derivation(
            salt_label,
            &self.master_key,
            &self.master_salt,
            quotient,
            self.policy.salt_key_len,
        )?);

        self.cipher = new_payload_cipher(self.policy.encryption, &session_key, &session_salt)?;
        self.auth = new_session_auth(self.policy.auth, &session_auth_key)?;
        self.session_salt = session_salt;
        self.derived_for = Some(quotient);

        if !retain_master {
            self.master_key.zeroize();
            self.master_salt.zeroize();
        }

        log::trace!(
            "derived {} session keys, quotient={quotient}",
            if self.for_rtcp { "srtcp" } else { "srtp" }
        );
        Ok(())
    }
}

impl Drop for BaseContext {
    fn drop(&mut self) {
        self.tag_scratch.zeroize();
    }
}
