
use aes::cipher::generic_array::GenericArray;
use aes::cipher::{BlockEncrypt, KeyInit};
use aes::Aes128;
use byteorder::{BigEndian, ByteOrder};

use crate::error::{Error, Result};

pub(crate) const LABEL_SRTP_ENCRYPTION: u8 = 0x00;
pub(crate) const LABEL_SRTP_AUTHENTICATION_TAG: u8 = 0x01;
pub(crate) const LABEL_SRTP_SALT: u8 = 0x02;
pub(crate) const LABEL_SRTCP_ENCRYPTION: u8 = 0x03;
pub(crate) const LABEL_SRTCP_AUTHENTICATION_TAG: u8 = 0x04;
pub(crate) const LABEL_SRTCP_SALT: u8 = 0x05;

/// Session-key PRF of RFC 3711 section 4.3.1.
///
/// The input block is the master salt with the key label XORed at byte 7 and
/// the 48-bit `index DIV key_derivation_rate` quotient XORed big-endian at
/// bytes 8..14; the two trailing bytes count AES blocks. The PRF cipher is
/// always AES-128, independent of the session cipher the keys feed.
pub(crate) fn aes_cm_key_derivation(
    label: u8,
    master_key: &[u8],
    master_salt: &[u8],
    index_over_kdr: u64,
    out_len: usize,
) -> Result<Vec<u8>> {
    let block = Aes128::new_from_slice(master_key)
        .map_err(|_| Error::SrtpMasterKeyLength(16, master_key.len()))?;

    let mut prf_in = [0u8; 16];
    prf_in[..master_salt.len()].copy_from_slice(master_salt);

    prf_in[7] ^= label;
    let mut quotient = [0u8; 6];
    BigEndian::write_uint(&mut quotient, index_over_kdr, 6);
    for (b, q) in prf_in[8..14].iter_mut().zip(quotient.iter()) {
        *b ^= q;
    }

    let mut out = vec![0u8; out_len];
    for (i, chunk) in out.chunks_mut(16).enumerate() {
        prf_in[14] = (i >> 8) as u8;
        prf_in[15] = i as u8;

        let mut ks = prf_in;
        block.encrypt_block(GenericArray::from_mut_slice(&mut ks));
        chunk.copy_from_slice(&ks[..chunk.len()]);
    }

    Ok(out)
}

/// Counter-mode IV of RFC 3711 section 4.1.1: the session salt XORed with
/// the SSRC at bytes 4..8 and the 48-bit packet index at bytes 8..14, with a
/// zeroed 16-bit block counter in the tail.
pub(crate) fn generate_counter(
    sequence_number: u16,
    rollover_counter: u32,
    ssrc: u32,
    session_salt: &[u8],
) -> [u8; 16] {
    debug_assert!(session_salt.len() <= 16);

    let mut counter = [0u8; 16];
    BigEndian::write_u32(&mut counter[4..8], ssrc);
    BigEndian::write_u32(&mut counter[8..12], rollover_counter);
    BigEndian::write_u32(&mut counter[12..16], u32::from(sequence_number) << 16);

    for (c, s) in counter.iter_mut().zip(session_salt.iter()) {
        *c ^= s;
    }

    counter
}
