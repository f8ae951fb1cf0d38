
use std::collections::hash_map::Entry;
use std::collections::HashMap;

use byteorder::{BigEndian, ByteOrder};
use bytes::Bytes;

use crate::config::Config;
use crate::context::srtcp::RtcpContext;
use crate::context::srtp::RtpContext;
use crate::error::{Error, Result};

/// SrtpManager owns every per-SSRC context of one keyed session and routes
/// raw packets to them by SSRC and direction.
///
/// Contexts are created lazily when an SSRC is first seen: outbound ones
/// from the local master material, inbound ones from the remote material.
/// Distinct SSRCs are independent; a manager itself must be driven from one
/// thread at a time or behind a lock.
pub struct SrtpManager {
    config: Config,
    send_rtp: HashMap<u32, RtpContext>,
    recv_rtp: HashMap<u32, RtpContext>,
    send_rtcp: HashMap<u32, RtcpContext>,
    recv_rtcp: HashMap<u32, RtcpContext>,
}

impl SrtpManager {
    pub fn new(config: Config) -> Result<Self> {
        let policy = config.profile.policy();
        policy.validate()?;
        for keys in [&config.local_keys, &config.remote_keys] {
            if keys.master_key.len() != policy.enc_key_len {
                return Err(Error::SrtpMasterKeyLength(
                    policy.enc_key_len,
                    keys.master_key.len(),
                ));
            }
            if keys.master_salt.len() != policy.salt_key_len {
                return Err(Error::SrtpSaltLength(
                    policy.salt_key_len,
                    keys.master_salt.len(),
                ));
            }
        }

        Ok(SrtpManager {
            config,
            send_rtp: HashMap::new(),
            recv_rtp: HashMap::new(),
            send_rtcp: HashMap::new(),
            recv_rtcp: HashMap::new(),
        })
    }

    /// Protect an outbound RTP packet.
    pub fn protect_rtp(&mut self, plaintext: &[u8]) -> Result<Bytes> {
        let ssrc = rtp_ssrc(plaintext)?;
        let ctx = match self.send_rtp.entry(ssrc) {
            Entry::Occupied(e) => e.into_mut(),
            Entry::Vacant(e) => {
                log::debug!("creating outbound srtp context for ssrc={ssrc}");
                e.insert(build_rtp_context(
                    &self.config,
                    ssrc,
                    0,
                    self.config.key_derivation_rate,
                    true,
                )?)
            }
        };
        ctx.protect(plaintext)
    }

    /// Unprotect an inbound SRTP packet.
    pub fn unprotect_rtp(&mut self, encrypted: &[u8]) -> Result<Bytes> {
        let ssrc = rtp_ssrc(encrypted)?;
        let ctx = match self.recv_rtp.entry(ssrc) {
            Entry::Occupied(e) => e.into_mut(),
            Entry::Vacant(e) => {
                log::debug!("creating inbound srtp context for ssrc={ssrc}");
                e.insert(build_rtp_context(
                    &self.config,
                    ssrc,
                    0,
                    self.config.key_derivation_rate,
                    false,
                )?)
            }
        };
        ctx.unprotect(encrypted)
    }

    /// Protect an outbound RTCP packet.
    pub fn protect_rtcp(&mut self, plaintext: &[u8]) -> Result<Bytes> {
        let ssrc = rtcp_ssrc(plaintext)?;
        let ctx = match self.send_rtcp.entry(ssrc) {
            Entry::Occupied(e) => e.into_mut(),
            Entry::Vacant(e) => {
                log::debug!("creating outbound srtcp context for ssrc={ssrc}");
                e.insert(build_rtcp_context(
                    &self.config,
                    ssrc,
                    self.config.key_derivation_rate,
                    true,
                )?)
            }
        };
        ctx.protect(plaintext)
    }

    /// Unprotect an inbound SRTCP packet.
    pub fn unprotect_rtcp(&mut self, encrypted: &[u8]) -> Result<Bytes> {
        let ssrc = rtcp_ssrc(encrypted)?;
        let ctx = match self.recv_rtcp.entry(ssrc) {
            Entry::Occupied(e) => e.into_mut(),
            Entry::Vacant(e) => {
                log::debug!("creating inbound srtcp context for ssrc={ssrc}");
                e.insert(build_rtcp_context(
                    &self.config,
                    ssrc,
                    self.config.key_derivation_rate,
                    false,
                )?)
            }
        };
        ctx.unprotect(encrypted)
    }

    /// Mint a standalone RTP context sharing this session's cipher suite and
    /// keying material, for a stream the caller drives itself.
    pub fn derive_context(
        &self,
        ssrc: u32,
        initial_roc: u32,
        key_derivation_rate: u64,
        is_sender: bool,
    ) -> Result<RtpContext> {
        build_rtp_context(&self.config, ssrc, initial_roc, key_derivation_rate, is_sender)
    }

    /// SRTCP counterpart of [`SrtpManager::derive_context`].
    pub fn derive_rtcp_context(
        &self,
        ssrc: u32,
        key_derivation_rate: u64,
        is_sender: bool,
    ) -> Result<RtcpContext> {
        build_rtcp_context(&self.config, ssrc, key_derivation_rate, is_sender)
    }

    /// Rollover counter of an outbound stream, if one exists for `ssrc`.
    pub fn send_roc(&self, ssrc: u32) -> Option<u32> {
        self.send_rtp.get(&ssrc).map(|ctx| ctx.roc())
    }

    /// Drop every context of a torn-down stream; their key material is
    /// wiped as they go.
    pub fn remove_stream(&mut self, ssrc: u32) {
        self.send_rtp.remove(&ssrc);
        self.recv_rtp.remove(&ssrc);
        self.send_rtcp.remove(&ssrc);
        self.recv_rtcp.remove(&ssrc);
    }
}

fn build_rtp_context(
    config: &Config,
    ssrc: u32,
    initial_roc: u32,
    key_derivation_rate: u64,
    is_sender: bool,
) -> Result<RtpContext> {
    let keys = if is_sender {
        &config.local_keys
    } else {
        &config.remote_keys
    };
    RtpContext::new(
        ssrc,
        is_sender,
        initial_roc,
        config.profile.policy(),
        &keys.master_key,
        &keys.master_salt,
        config.replay_protection,
        key_derivation_rate,
    )
}

fn build_rtcp_context(
    config: &Config,
    ssrc: u32,
    key_derivation_rate: u64,
    is_sender: bool,
) -> Result<RtcpContext> {
    let keys = if is_sender {
        &config.local_keys
    } else {
        &config.remote_keys
    };
    RtcpContext::new(
        ssrc,
        is_sender,
        config.profile.policy(),
        &keys.master_key,
        &keys.master_salt,
        config.replay_protection,
        key_derivation_rate,
    )
}

fn rtp_ssrc(buf: &[u8]) -> Result<u32> {
    if buf.len() < 12 {
        return Err(Error::SrtpTooSmall(buf.len(), 12));
    }
    Ok(BigEndian::read_u32(&buf[8..12]))
}

fn rtcp_ssrc(buf: &[u8]) -> Result<u32> {
    if buf.len() < 8 {
        return Err(Error::SrtcpTooSmall(buf.len(), 8));
    }
    Ok(BigEndian::read_u32(&buf[4..8]))
}
