//! Vendor and brand identification (leaf 0 and leaves `0x8000_0002..=0x8000_0004`).

use std::fmt;

/// CPU vendor, classified from the leaf 0 signature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CpuVendor {
    #[default]
    Unknown,
    /// "AuthenticAMD"
    Amd,
    /// "GenuineIntel"
    Intel,
    /// "GenuineTMx86"
    Transmeta,
    /// "Virtual CPU " (Microsoft x86-to-ARM emulation, Connectix Virtual PC)
    VirtualCpu,
}

impl CpuVendor {
    pub fn classify(signature: &[u8; 12]) -> Self {
        match signature {
            b"AuthenticAMD" => Self::Amd,
            b"GenuineIntel" => Self::Intel,
            b"GenuineTMx86" => Self::Transmeta,
            b"Virtual CPU " => Self::VirtualCpu,
            _ => Self::Unknown,
        }
    }
}

impl fmt::Display for CpuVendor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unknown => f.write_str("Unknown"),
            Self::Amd => f.write_str("AMD"),
            Self::Intel => f.write_str("Intel"),
            Self::Transmeta => f.write_str("Transmeta"),
            Self::VirtualCpu => f.write_str("Virtual CPU"),
        }
    }
}

/// Leaf 0 signature, packed from EBX, EDX, ECX in that order.
pub fn signature_from_regs(ebx: u32, edx: u32, ecx: u32) -> [u8; 12] {
    let mut out = [0u8; 12];
    out[0..4].copy_from_slice(&ebx.to_le_bytes());
    out[4..8].copy_from_slice(&edx.to_le_bytes());
    out[8..12].copy_from_slice(&ecx.to_le_bytes());
    out
}

/// Inverse of [`signature_from_regs`]: returns `(ebx, edx, ecx)`.
pub fn signature_regs(signature: &[u8; 12]) -> (u32, u32, u32) {
    let word = |o: usize| {
        u32::from_le_bytes([
            signature[o],
            signature[o + 1],
            signature[o + 2],
            signature[o + 3],
        ])
    };
    (word(0), word(4), word(8))
}

/// Text of a fixed-size ASCII buffer up to the first NUL, lossily decoded.
pub fn ascii_until_nul(bytes: &[u8]) -> String {
    let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
    String::from_utf8_lossy(&bytes[..end]).into_owned()
}
