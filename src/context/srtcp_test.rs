use bytes::Bytes;
use lazy_static::lazy_static;

use super::srtcp::{RtcpContext, MAX_SRTCP_INDEX};
use crate::error::{Error, Result};
use crate::policy::{AuthKind, EncryptionKind, Policy};

const TEST_SSRC: u32 = 0xCAFE_BABE;

lazy_static! {
    static ref MASTER_KEY: Bytes = Bytes::from_static(&[
        0xE1, 0xF9, 0x7A, 0x0D, 0x3E, 0x01, 0x8B, 0xE0, 0xD6, 0x4F, 0xA3, 0x2C, 0x06, 0xDE,
        0x41, 0x39,
    ]);
    static ref MASTER_SALT: Bytes = Bytes::from_static(&[
        0x0E, 0xC6, 0x75, 0xAD, 0x49, 0x8A, 0xFE, 0xEB, 0xB6, 0x96, 0x0B, 0x3A, 0xAB, 0xE6,
    ]);
}

fn build_context(policy: Policy, is_sender: bool) -> RtcpContext {
    RtcpContext::new(
        TEST_SSRC,
        is_sender,
        policy,
        &MASTER_KEY,
        &MASTER_SALT,
        true,
        0,
    )
    .unwrap()
}

/// A sender report with zeroed sender info: 8 header bytes plus 20 bytes of
/// encrypted region.
fn rtcp_sr_raw(ssrc: u32) -> Vec<u8> {
    let mut pkt = vec![0x80, 0xC8, 0x00, 0x06];
    pkt.extend_from_slice(&ssrc.to_be_bytes());
    pkt.extend_from_slice(&[0u8; 20]);
    pkt
}

#[test]
fn test_protect_unprotect_round_trip() -> Result<()> {
    let policies = [
        Policy::aes_cm_hmac_sha1_80(),
        Policy::aes_cm_hmac_sha1_32(),
        Policy::aes_f8_hmac_sha1_80(),
        Policy::twofish_cm_hmac_sha1_80(),
        Policy::twofish_f8_hmac_sha1_80(),
        Policy::aes_cm_skein(),
    ];

    for policy in policies {
        let mut sender = build_context(policy.clone(), true);
        let mut receiver = build_context(policy.clone(), false);

        let raw = rtcp_sr_raw(TEST_SSRC);
        let protected = sender.protect(&raw)?;
        assert_eq!(
            protected.len(),
            raw.len() + 4 + policy.rtcp_auth_tag_len,
            "{policy:?}"
        );
        assert_eq!(&protected[..8], &raw[..8], "header words must stay clear");
        assert_ne!(&protected[8..raw.len()], &raw[8..], "{policy:?}");

        let unprotected = receiver.unprotect(&protected)?;
        assert_eq!(&unprotected[..], &raw[..], "{policy:?}");
        assert_eq!(receiver.index, 1);
    }
    Ok(())
}

#[test]
fn test_e_flag_and_index_word() -> Result<()> {
    let mut sender = build_context(Policy::aes_cm_hmac_sha1_80(), true);

    let raw = rtcp_sr_raw(TEST_SSRC);
    let protected = sender.protect(&raw)?;

    let word_offset = protected.len() - 10 - 4;
    let index_word = u32::from_be_bytes([
        protected[word_offset],
        protected[word_offset + 1],
        protected[word_offset + 2],
        protected[word_offset + 3],
    ]);
    assert_eq!(index_word >> 31, 1, "cipher policies set the E flag");
    assert_eq!(index_word & MAX_SRTCP_INDEX, 1, "first index is 1");
    assert_eq!(sender.index, 1);
    Ok(())
}

#[test]
fn test_index_is_monotonic() -> Result<()> {
    let mut sender = build_context(Policy::aes_cm_hmac_sha1_80(), true);
    let mut receiver = build_context(Policy::aes_cm_hmac_sha1_80(), false);

    let raw = rtcp_sr_raw(TEST_SSRC);
    let first = sender.protect(&raw)?;
    let second = sender.protect(&raw)?;
    let third = sender.protect(&raw)?;
    assert_eq!(sender.index, 3);

    // Reordered delivery is fine; each index is accepted once.
    receiver.unprotect(&third)?;
    receiver.unprotect(&first)?;
    assert_eq!(receiver.index, 3);
    assert_eq!(
        receiver.unprotect(&first),
        Err(Error::SrtcpSsrcDuplicated(TEST_SSRC, 1))
    );
    receiver.unprotect(&second)?;
    Ok(())
}

#[test]
fn test_replayed_packet_is_rejected() -> Result<()> {
    let mut sender = build_context(Policy::aes_cm_hmac_sha1_80(), true);
    let mut receiver = build_context(Policy::aes_cm_hmac_sha1_80(), false);

    let protected = sender.protect(&rtcp_sr_raw(TEST_SSRC))?;
    receiver.unprotect(&protected)?;
    assert_eq!(
        receiver.unprotect(&protected),
        Err(Error::SrtcpSsrcDuplicated(TEST_SSRC, 1))
    );
    Ok(())
}

#[test]
fn test_tampered_packet_leaves_state_untouched() -> Result<()> {
    let mut sender = build_context(Policy::aes_cm_hmac_sha1_80(), true);
    let mut receiver = build_context(Policy::aes_cm_hmac_sha1_80(), false);

    let mut forged = sender.protect(&rtcp_sr_raw(TEST_SSRC))?.to_vec();
    forged[10] ^= 0x01;

    for _ in 0..2 {
        assert_eq!(
            receiver.unprotect(&forged),
            Err(Error::RtcpFailedToVerifyAuthTag)
        );
        assert_eq!(receiver.index, 0);
        assert!(!receiver.replay_window.contains(0));
    }
    Ok(())
}

#[test]
fn test_index_exhaustion_is_fatal() -> Result<()> {
    let mut sender = build_context(Policy::aes_cm_hmac_sha1_80(), true);
    sender.index = MAX_SRTCP_INDEX;

    assert_eq!(
        sender.protect(&rtcp_sr_raw(TEST_SSRC)),
        Err(Error::ExceededMaxPackets)
    );
    assert_eq!(sender.index, MAX_SRTCP_INDEX, "the index never wraps");
    Ok(())
}

#[test]
fn test_unencrypted_srtcp_is_still_authenticated() -> Result<()> {
    // NULL cipher with HMAC: the E flag stays clear but the tag is
    // appended and verified.
    let policy = Policy {
        encryption: EncryptionKind::None,
        ..Policy::aes_cm_hmac_sha1_80()
    };
    let mut sender = build_context(policy.clone(), true);
    let mut receiver = build_context(policy, false);

    let raw = rtcp_sr_raw(TEST_SSRC);
    let protected = sender.protect(&raw)?;

    let word_offset = protected.len() - 10 - 4;
    assert_eq!(protected[word_offset] >> 7, 0, "null cipher clears E");
    assert_eq!(&protected[..raw.len()], &raw[..], "payload goes out clear");

    let unprotected = receiver.unprotect(&protected)?;
    assert_eq!(&unprotected[..], &raw[..]);

    let mut forged = protected.to_vec();
    let last = forged.len() - 1;
    forged[last] ^= 0xFF;
    assert_eq!(
        receiver.unprotect(&forged),
        Err(Error::RtcpFailedToVerifyAuthTag)
    );
    Ok(())
}

#[test]
fn test_e_flag_with_null_cipher_is_rejected() -> Result<()> {
    let mut sender = build_context(Policy::aes_cm_hmac_sha1_80(), true);
    let protected = sender.protect(&rtcp_sr_raw(TEST_SSRC))?;

    let null_policy = Policy {
        encryption: EncryptionKind::None,
        ..Policy::aes_cm_hmac_sha1_80()
    };
    let mut receiver = build_context(null_policy, false);
    assert_eq!(
        receiver.unprotect(&protected),
        Err(Error::SrtcpEFlagMismatch)
    );
    Ok(())
}

#[test]
fn test_unprotect_rejects_short_packet() {
    let mut receiver = build_context(Policy::aes_cm_hmac_sha1_80(), false);
    let mut raw = vec![0x80, 0xC9, 0x00, 0x01];
    raw.extend_from_slice(&TEST_SSRC.to_be_bytes());
    assert_eq!(
        receiver.unprotect(&raw),
        Err(Error::SrtcpTooSmall(8, 8 + 4 + 10))
    );
}

#[test]
fn test_null_auth_policy_round_trip() -> Result<()> {
    let policy = Policy {
        auth: AuthKind::None,
        auth_key_len: 0,
        auth_tag_len: 0,
        rtcp_auth_tag_len: 0,
        ..Policy::aes_cm_hmac_sha1_80()
    };
    let mut sender = build_context(policy.clone(), true);
    let mut receiver = build_context(policy, false);

    let raw = rtcp_sr_raw(TEST_SSRC);
    let protected = sender.protect(&raw)?;
    assert_eq!(protected.len(), raw.len() + 4);

    let unprotected = receiver.unprotect(&protected)?;
    assert_eq!(&unprotected[..], &raw[..]);
    Ok(())
}
