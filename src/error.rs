use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug, PartialEq)]
#[non_exhaustive]
pub enum Error {
    #[error("srtp ssrc={0} index={1}: duplicated")]
    SrtpSsrcDuplicated(u32, u64),
    #[error("srtcp ssrc={0} index={1}: duplicated")]
    SrtcpSsrcDuplicated(u32, u32),
    #[error("srtp ssrc={0} index={1}: behind the replay window")]
    SrtpSsrcTooOld(u32, u64),
    #[error("srtcp ssrc={0} index={1}: behind the replay window")]
    SrtcpSsrcTooOld(u32, u32),
    #[error("failed to verify rtp auth tag")]
    RtpFailedToVerifyAuthTag,
    #[error("failed to verify rtcp auth tag")]
    RtcpFailedToVerifyAuthTag,
    #[error("too short SRTP packet: only {0} bytes, expected > {1} bytes")]
    SrtpTooSmall(usize, usize),
    #[error("too short SRTCP packet: only {0} bytes, expected > {1} bytes")]
    SrtcpTooSmall(usize, usize),
    #[error("session keys have not been derived")]
    KeyNotDerived,
    #[error("exceeded the maximum number of packets, re-key required")]
    ExceededMaxPackets,
    #[error("SRTP master key must be len {0}, got {1}")]
    SrtpMasterKeyLength(usize, usize),
    #[error("SRTP master salt must be len {0}, got {1}")]
    SrtpSaltLength(usize, usize),
    #[error("no such SRTP protection profile: {0:#06x}")]
    NoSuchProtectionProfile(u16),
    #[error("DTLS keying material must be len {0}, got {1}")]
    KeyingMaterialLength(usize, usize),
    #[error("invalid policy: {0}")]
    InvalidPolicy(String),
    #[error("srtcp e-flag set but the negotiated policy has no cipher")]
    SrtcpEFlagMismatch,

    #[error("{0}")]
    Util(#[from] util::Error),
    #[error("{0}")]
    Rtcp(#[from] rtcp::Error),

    #[error("{0}")]
    Other(String),
}
