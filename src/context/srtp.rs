use bytes::{Bytes, BytesMut};
use subtle::ConstantTimeEq;
use util::marshal::*;
use zeroize::Zeroize;

use super::BaseContext;
use crate::error::{Error, Result};
use crate::key_derivation::generate_counter;
use crate::policy::{AuthKind, EncryptionKind, Policy};
use crate::replay_window::{ReplayWindow, REPLAY_WINDOW_SIZE};

const MAX_ROC: u32 = u32::MAX;
const SEQ_NUM_MEDIAN: u16 = 1 << 15;

/// Per-SSRC SRTP state machine (RFC 3711 section 3.3).
///
/// A context is one-way: it either protects outbound RTP or unprotects
/// inbound SRTP, never both. It must not be entered concurrently; distinct
/// SSRCs are independent and may run in parallel.
pub struct RtpContext {
    pub(crate) ssrc: u32,
    pub(crate) is_sender: bool,
    /// Rollover counter, the high 32 bits of the 48-bit packet index.
    pub(crate) roc: u32,
    /// Highest authenticated sequence number.
    pub(crate) s_l: u16,
    pub(crate) seq_initialized: bool,
    pub(crate) replay_window: ReplayWindow,
    pub(crate) replay_protection: bool,
    pub(crate) key_derivation_rate: u64,
    /// ROC assumed by the index estimate; only valid within one call.
    pub(crate) guessed_roc: u32,
    pub(crate) base: BaseContext,
}

impl RtpContext {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        ssrc: u32,
        is_sender: bool,
        initial_roc: u32,
        policy: Policy,
        master_key: &[u8],
        master_salt: &[u8],
        replay_protection: bool,
        key_derivation_rate: u64,
    ) -> Result<Self> {
        Ok(RtpContext {
            ssrc,
            is_sender,
            roc: initial_roc,
            s_l: 0,
            seq_initialized: false,
            replay_window: ReplayWindow::default(),
            replay_protection,
            key_derivation_rate,
            guessed_roc: 0,
            base: BaseContext::new(policy, master_key, master_salt, false)?,
        })
    }

    pub fn ssrc(&self) -> u32 {
        self.ssrc
    }

    pub fn roc(&self) -> u32 {
        self.roc
    }

    pub fn is_sender(&self) -> bool {
        self.is_sender
    }

    /// Protect turns a plain RTP packet into an SRTP packet: the payload is
    /// encrypted in place behind the untouched header, the truncated auth
    /// tag is appended and the packet index is committed.
    pub fn protect(&mut self, plaintext: &[u8]) -> Result<Bytes> {
        let mut buf = plaintext;
        let header = rtp::header::Header::unmarshal(&mut buf)?;
        let header_len = header.marshal_size();
        let seq = header.sequence_number;

        if !self.seq_initialized {
            self.s_l = seq;
            self.seq_initialized = true;
        }

        let guessed_index = self.guess_index(seq);
        if self.guessed_roc == 0 && self.roc == MAX_ROC {
            // 2^48 packets under one master key; RFC 3711 section 9.2
            // requires new keys before the index may wrap.
            return Err(Error::ExceededMaxPackets);
        }

        // An outbound index repeat means the caller reused a sequence
        // number; surfacing it beats sending two packets under one
        // keystream.
        self.replay_check(guessed_index)?;

        self.base
            .ensure_derived(guessed_index, self.key_derivation_rate)?;

        let mut writer = BytesMut::with_capacity(plaintext.len() + self.base.policy.auth_tag_len);
        writer.extend_from_slice(plaintext);
        self.process_payload(seq, header_len, &mut writer)?;

        if self.base.policy.auth != AuthKind::None {
            let tag_len = self.base.policy.auth_tag_len;
            let roc_bytes = self.guessed_roc.to_be_bytes();
            let auth = self.base.auth.as_deref().ok_or(Error::KeyNotDerived)?;
            debug_assert!(tag_len <= auth.output_len());
            auth.tag(&[&writer[..], &roc_bytes], &mut self.base.tag_scratch);
            writer.extend_from_slice(&self.base.tag_scratch[..tag_len]);
        }

        self.update(seq, guessed_index);
        Ok(writer.freeze())
    }

    /// Unprotect reverses an SRTP packet into plain RTP.
    ///
    /// Rejections leave committed state untouched, so feeding the same bad
    /// packet twice fails twice identically. The one deliberate exception:
    /// when the very first packet a context sees fails authentication, the
    /// sequence bootstrap it performed is rolled back so the next packet
    /// re-initializes cleanly.
    pub fn unprotect(&mut self, encrypted: &[u8]) -> Result<Bytes> {
        let mut buf = encrypted;
        let header = rtp::header::Header::unmarshal(&mut buf)?;
        let header_len = header.marshal_size();
        let tag_len = self.base.policy.auth_tag_len;
        if encrypted.len() < header_len + tag_len {
            return Err(Error::SrtpTooSmall(encrypted.len(), header_len + tag_len));
        }
        let seq = header.sequence_number;

        let mut was_just_initialized = false;
        if !self.seq_initialized {
            self.s_l = seq;
            self.seq_initialized = true;
            was_just_initialized = true;
        }

        let guessed_index = self.guess_index(seq);
        self.replay_check(guessed_index)?;

        self.base
            .ensure_derived(guessed_index, self.key_derivation_rate)?;

        let cipher_end = encrypted.len() - tag_len;
        if self.base.policy.auth != AuthKind::None {
            let actual_tag = &encrypted[cipher_end..];
            let roc_bytes = self.guessed_roc.to_be_bytes();
            {
                let auth = self.base.auth.as_deref().ok_or(Error::KeyNotDerived)?;
                auth.tag(
                    &[&encrypted[..cipher_end], &roc_bytes],
                    &mut self.base.tag_scratch,
                );
            }
            let tags_match = self.base.tag_scratch[..tag_len].ct_eq(actual_tag).unwrap_u8() == 1;
            self.base.tag_scratch.zeroize();

            if !tags_match {
                if was_just_initialized {
                    self.seq_initialized = false;
                    self.s_l = 0;
                }
                log::warn!("srtp ssrc={}: auth tag mismatch", self.ssrc);
                return Err(Error::RtpFailedToVerifyAuthTag);
            }
        }

        let mut writer = BytesMut::with_capacity(cipher_end);
        writer.extend_from_slice(&encrypted[..cipher_end]);
        self.process_payload(seq, header_len, &mut writer)?;

        self.update(seq, guessed_index);
        Ok(writer.freeze())
    }

    /// RFC 3711 section 3.3.1: estimate the 48-bit index of `seq` relative
    /// to the local `roc`/`s_l`, recording which ROC the estimate assumed.
    /// A `roc - 1` guess stands for a late arrival from before the last
    /// wrap and is never committed.
    fn guess_index(&mut self, seq: u16) -> u64 {
        self.guessed_roc = if self.s_l < SEQ_NUM_MEDIAN {
            if i32::from(seq) - i32::from(self.s_l) > i32::from(SEQ_NUM_MEDIAN) {
                self.roc.wrapping_sub(1)
            } else {
                self.roc
            }
        } else if u32::from(self.s_l) - u32::from(SEQ_NUM_MEDIAN) > u32::from(seq) {
            self.roc.wrapping_add(1)
        } else {
            self.roc
        };

        (u64::from(self.guessed_roc) << 16) | u64::from(seq)
    }

    fn replay_check(&self, guessed_index: u64) -> Result<()> {
        if !self.replay_protection {
            return Ok(());
        }

        let local_index = (u64::from(self.roc) << 16) | u64::from(self.s_l);
        let delta = guessed_index as i64 - local_index as i64;
        if delta > 0 {
            return Ok(());
        }
        if -delta >= REPLAY_WINDOW_SIZE as i64 {
            return Err(Error::SrtpSsrcTooOld(self.ssrc, guessed_index));
        }
        if self.replay_window.contains((-delta) as u64) {
            return Err(Error::SrtpSsrcDuplicated(self.ssrc, guessed_index));
        }
        Ok(())
    }

    /// Commit an authenticated index: slide or mark the replay window and
    /// advance `s_l`/`roc` per RFC 3711 section 3.3.1.
    fn update(&mut self, seq: u16, guessed_index: u64) {
        let local_index = (u64::from(self.roc) << 16) | u64::from(self.s_l);
        let delta = guessed_index as i64 - local_index as i64;

        if delta > 0 {
            self.replay_window.advance(delta as u64);
        } else {
            self.replay_window.mark((-delta) as u64);
        }

        if self.guessed_roc == self.roc {
            if seq > self.s_l {
                self.s_l = seq;
            }
        } else if self.guessed_roc == self.roc.wrapping_add(1) {
            self.s_l = seq;
            self.roc = self.guessed_roc;
        }
        // guessed_roc == roc - 1: late packet, neither s_l nor roc moves.
    }

    fn process_payload(&mut self, seq: u16, header_len: usize, packet: &mut [u8]) -> Result<()> {
        match self.base.policy.encryption {
            EncryptionKind::None => Ok(()),
            EncryptionKind::AesCm | EncryptionKind::TwofishCm => {
                let iv = generate_counter(
                    seq,
                    self.guessed_roc,
                    self.ssrc,
                    &self.base.session_salt,
                );
                let cipher = self.base.cipher.as_deref_mut().ok_or(Error::KeyNotDerived)?;
                cipher.process(&iv, &mut packet[header_len..])
            }
            EncryptionKind::AesF8 | EncryptionKind::TwofishF8 => {
                // RFC 3711 section 4.1.3.2: M, PT, SEQ, TS and SSRC straight
                // off the wire, leading octet zeroed, ROC in the tail.
                let mut iv = [0u8; 16];
                iv[1..12].copy_from_slice(&packet[1..12]);
                iv[12..16].copy_from_slice(&self.guessed_roc.to_be_bytes());
                let cipher = self.base.cipher.as_deref_mut().ok_or(Error::KeyNotDerived)?;
                cipher.process(&iv, &mut packet[header_len..])
            }
        }
    }
}
