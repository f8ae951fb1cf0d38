use zeroize::Zeroizing;

use crate::error::{Error, Result};
use crate::policy::ProtectionProfile;

/// Master keying material for one direction of a session. Wiped on drop.
#[derive(Clone)]
pub struct SessionKeys {
    pub master_key: Zeroizing<Vec<u8>>,
    pub master_salt: Zeroizing<Vec<u8>>,
}

impl SessionKeys {
    pub fn new(master_key: Vec<u8>, master_salt: Vec<u8>) -> Self {
        SessionKeys {
            master_key: Zeroizing::new(master_key),
            master_salt: Zeroizing::new(master_salt),
        }
    }
}

/// Config wires a negotiated protection profile and DTLS-SRTP keying
/// material into a manager. Local material protects outbound packets,
/// remote material unprotects inbound ones. After a Config is handed to a
/// manager it must not be modified.
#[derive(Clone)]
pub struct Config {
    pub profile: ProtectionProfile,
    pub local_keys: SessionKeys,
    pub remote_keys: SessionKeys,
    /// Resolved at construction; when off, replay checks pass
    /// unconditionally but the window bookkeeping still runs.
    pub replay_protection: bool,
    /// 0 disables re-derivation; otherwise session keys are re-derived
    /// every `key_derivation_rate` packets.
    pub key_derivation_rate: u64,
}

impl Config {
    pub fn new(profile: ProtectionProfile, local_keys: SessionKeys, remote_keys: SessionKeys) -> Self {
        Config {
            profile,
            local_keys,
            remote_keys,
            replay_protection: true,
            key_derivation_rate: 0,
        }
    }

    /// Partition an RFC 5764 exporter blob,
    /// `client_write_key || server_write_key || client_write_salt || server_write_salt`,
    /// assigning the halves by handshake role.
    pub fn from_keying_material(
        profile: ProtectionProfile,
        keying_material: &[u8],
        is_client: bool,
    ) -> Result<Self> {
        let key_len = profile.key_len();
        let salt_len = profile.salt_len();
        let expected = 2 * (key_len + salt_len);
        if keying_material.len() != expected {
            return Err(Error::KeyingMaterialLength(
                expected,
                keying_material.len(),
            ));
        }

        let mut offset = 0;
        let client_write_key = keying_material[offset..offset + key_len].to_vec();
        offset += key_len;
        let server_write_key = keying_material[offset..offset + key_len].to_vec();
        offset += key_len;
        let client_write_salt = keying_material[offset..offset + salt_len].to_vec();
        offset += salt_len;
        let server_write_salt = keying_material[offset..].to_vec();

        let client = SessionKeys::new(client_write_key, client_write_salt);
        let server = SessionKeys::new(server_write_key, server_write_salt);

        let (local_keys, remote_keys) = if is_client {
            (client, server)
        } else {
            (server, client)
        };

        Ok(Config::new(profile, local_keys, remote_keys))
    }
}
