use byteorder::{BigEndian, ByteOrder};
use bytes::{BufMut, Bytes, BytesMut};
use rtcp::header::{HEADER_LENGTH, SSRC_LENGTH};
use subtle::ConstantTimeEq;
use util::marshal::*;
use zeroize::Zeroize;

use super::BaseContext;
use crate::error::{Error, Result};
use crate::key_derivation::generate_counter;
use crate::policy::{AuthKind, EncryptionKind, Policy};
use crate::replay_window::{ReplayWindow, REPLAY_WINDOW_SIZE};

pub(crate) const SRTCP_INDEX_SIZE: usize = 4;
/// Largest 31-bit SRTCP index; going past it requires new master keys.
pub(crate) const MAX_SRTCP_INDEX: u32 = 0x7FFF_FFFF;

/// Per-SSRC SRTCP state machine.
///
/// Unlike SRTP there is no index guessing: every packet carries its 31-bit
/// index explicitly in the `E || index` word between the payload and the
/// auth tag, and the replay window runs over that explicit index.
/// Encryption covers everything after the first two header words;
/// authentication covers everything up to and including the index word.
pub struct RtcpContext {
    pub(crate) ssrc: u32,
    pub(crate) is_sender: bool,
    /// Sender: last index used. Receiver: highest index accepted.
    pub(crate) index: u32,
    pub(crate) replay_window: ReplayWindow,
    pub(crate) replay_protection: bool,
    pub(crate) key_derivation_rate: u64,
    pub(crate) base: BaseContext,
}

impl RtcpContext {
    pub fn new(
        ssrc: u32,
        is_sender: bool,
        policy: Policy,
        master_key: &[u8],
        master_salt: &[u8],
        replay_protection: bool,
        key_derivation_rate: u64,
    ) -> Result<Self> {
        Ok(RtcpContext {
            ssrc,
            is_sender,
            index: 0,
            replay_window: ReplayWindow::default(),
            replay_protection,
            key_derivation_rate,
            base: BaseContext::new(policy, master_key, master_salt, true)?,
        })
    }

    pub fn ssrc(&self) -> u32 {
        self.ssrc
    }

    pub fn is_sender(&self) -> bool {
        self.is_sender
    }

    pub fn index(&self) -> u32 {
        self.index
    }

    /// Protect turns a plain RTCP packet into an SRTCP packet.
    pub fn protect(&mut self, plaintext: &[u8]) -> Result<Bytes> {
        let mut buf = plaintext;
        rtcp::header::Header::unmarshal(&mut buf)?;
        if plaintext.len() < HEADER_LENGTH + SSRC_LENGTH {
            return Err(Error::SrtcpTooSmall(
                plaintext.len(),
                HEADER_LENGTH + SSRC_LENGTH,
            ));
        }

        if self.index >= MAX_SRTCP_INDEX {
            // The index never wraps: 2^31 packets exhaust this master key
            // (RFC 3711 section 9.2) and the stream must be re-keyed.
            return Err(Error::ExceededMaxPackets);
        }
        let index = self.index + 1;

        self.base
            .ensure_derived(u64::from(index), self.key_derivation_rate)?;

        let encrypted = self.base.policy.encryption != EncryptionKind::None;
        let mut writer = BytesMut::with_capacity(
            plaintext.len() + SRTCP_INDEX_SIZE + self.base.policy.rtcp_auth_tag_len,
        );
        writer.extend_from_slice(plaintext);
        if encrypted {
            self.process_payload(index, &mut writer)?;
        }
        writer.put_u32(index | (u32::from(encrypted) << 31));

        if self.base.policy.auth != AuthKind::None {
            let tag_len = self.base.policy.rtcp_auth_tag_len;
            let auth = self.base.auth.as_deref().ok_or(Error::KeyNotDerived)?;
            debug_assert!(tag_len <= auth.output_len());
            auth.tag(&[&writer[..]], &mut self.base.tag_scratch);
            writer.extend_from_slice(&self.base.tag_scratch[..tag_len]);
        }

        self.index = index;
        Ok(writer.freeze())
    }

    /// Unprotect reverses an SRTCP packet into plain RTCP. A packet with the
    /// E flag clear is authenticated and passed through undecrypted.
    pub fn unprotect(&mut self, encrypted: &[u8]) -> Result<Bytes> {
        let mut buf = encrypted;
        rtcp::header::Header::unmarshal(&mut buf)?;

        let tag_len = self.base.policy.rtcp_auth_tag_len;
        let min_len = HEADER_LENGTH + SSRC_LENGTH + SRTCP_INDEX_SIZE + tag_len;
        if encrypted.len() < min_len {
            return Err(Error::SrtcpTooSmall(encrypted.len(), min_len));
        }

        let tail_offset = encrypted.len() - (tag_len + SRTCP_INDEX_SIZE);
        let index_word = BigEndian::read_u32(&encrypted[tail_offset..tail_offset + 4]);
        let is_encrypted = index_word >> 31 == 1;
        let index = index_word & MAX_SRTCP_INDEX;

        if is_encrypted && self.base.policy.encryption == EncryptionKind::None {
            return Err(Error::SrtcpEFlagMismatch);
        }

        self.replay_check(index)?;

        self.base
            .ensure_derived(u64::from(index), self.key_derivation_rate)?;

        if self.base.policy.auth != AuthKind::None {
            let cipher_end = encrypted.len() - tag_len;
            let actual_tag = &encrypted[cipher_end..];
            {
                let auth = self.base.auth.as_deref().ok_or(Error::KeyNotDerived)?;
                auth.tag(&[&encrypted[..cipher_end]], &mut self.base.tag_scratch);
            }
            let tags_match = self.base.tag_scratch[..tag_len].ct_eq(actual_tag).unwrap_u8() == 1;
            self.base.tag_scratch.zeroize();

            if !tags_match {
                log::warn!("srtcp ssrc={}: auth tag mismatch", self.ssrc);
                return Err(Error::RtcpFailedToVerifyAuthTag);
            }
        }

        let mut writer = BytesMut::with_capacity(tail_offset);
        writer.extend_from_slice(&encrypted[..tail_offset]);
        if is_encrypted {
            self.process_payload(index, &mut writer)?;
        }

        self.update(index);
        Ok(writer.freeze())
    }

    fn replay_check(&self, index: u32) -> Result<()> {
        if !self.replay_protection {
            return Ok(());
        }

        let delta = i64::from(index) - i64::from(self.index);
        if delta > 0 {
            return Ok(());
        }
        if -delta >= REPLAY_WINDOW_SIZE as i64 {
            return Err(Error::SrtcpSsrcTooOld(self.ssrc, index));
        }
        if self.replay_window.contains((-delta) as u64) {
            return Err(Error::SrtcpSsrcDuplicated(self.ssrc, index));
        }
        Ok(())
    }

    fn update(&mut self, index: u32) {
        let delta = i64::from(index) - i64::from(self.index);
        if delta > 0 {
            self.replay_window.advance(delta as u64);
            self.index = index;
        } else {
            self.replay_window.mark((-delta) as u64);
        }
    }

    fn process_payload(&mut self, index: u32, packet: &mut [u8]) -> Result<()> {
        match self.base.policy.encryption {
            EncryptionKind::None => Ok(()),
            EncryptionKind::AesCm | EncryptionKind::TwofishCm => {
                // The 31-bit index stands in for the packet index in the
                // counter (RFC 3711 section 4.1.1 applied per section 3.4).
                let iv = generate_counter(
                    (index & 0xFFFF) as u16,
                    index >> 16,
                    self.ssrc,
                    &self.base.session_salt,
                );
                let cipher = self.base.cipher.as_deref_mut().ok_or(Error::KeyNotDerived)?;
                cipher.process(&iv, &mut packet[HEADER_LENGTH + SSRC_LENGTH..])
            }
            EncryptionKind::AesF8 | EncryptionKind::TwofishF8 => {
                // RFC 3711 section 4.1.3.3: four zero octets, E and the
                // index, then the first two words of the packet.
                let mut iv = [0u8; 16];
                BigEndian::write_u32(&mut iv[4..8], index | (1 << 31));
                iv[8..16].copy_from_slice(&packet[..8]);
                let cipher = self.base.cipher.as_deref_mut().ok_or(Error::KeyNotDerived)?;
                cipher.process(&iv, &mut packet[HEADER_LENGTH + SSRC_LENGTH..])
            }
        }
    }
}
