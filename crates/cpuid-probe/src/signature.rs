//! Processor signature (CPUID.1:EAX) and miscellaneous info (CPUID.1:EBX).

use crate::features::extract_bits;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ProcessorSignature {
    /// Raw CPUID.1:EAX.
    pub raw: u32,
    pub family: u32,
    /// Family plus the extended family field.
    pub ext_family: u32,
    pub model: u32,
    /// Model plus the extended model field shifted into the high nibble.
    pub ext_model: u32,
    pub stepping: u32,
}

impl ProcessorSignature {
    pub fn from_eax(eax: u32) -> Self {
        let family = extract_bits(eax, 8, 4);
        let model = extract_bits(eax, 4, 4);
        Self {
            raw: eax,
            family,
            ext_family: extract_bits(eax, 20, 8) + family,
            model,
            ext_model: ((eax >> 12) & 0xF0) + model,
            stepping: extract_bits(eax, 0, 4),
        }
    }
}

/// Fields of CPUID.1:EBX.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AdditionalInfo {
    pub brand_index: u32,
    /// `CLFLUSH` line size in bytes (the raw field counts 8-byte units).
    pub clflush_line_size: u32,
    /// Maximum number of addressable logical processor IDs in the package.
    pub max_logical_ids: u32,
}

impl AdditionalInfo {
    pub fn from_ebx(ebx: u32) -> Self {
        Self {
            brand_index: extract_bits(ebx, 0, 8),
            clflush_line_size: extract_bits(ebx, 8, 8) * 8,
            max_logical_ids: extract_bits(ebx, 16, 8),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_a_coffee_lake_signature() {
        let sig = ProcessorSignature::from_eax(0x0009_06EA);
        assert_eq!(sig.family, 6);
        assert_eq!(sig.ext_family, 6);
        assert_eq!(sig.model, 0xE);
        assert_eq!(sig.ext_model, 0x9E);
        assert_eq!(sig.stepping, 0xA);
    }

    #[test]
    fn decodes_a_zen_signature() {
        // Family 0xF + ext family 0x8 = 0x17 (Zen 2).
        let sig = ProcessorSignature::from_eax(0x0087_0F10);
        assert_eq!(sig.family, 0xF);
        assert_eq!(sig.ext_family, 0x17);
        assert_eq!(sig.ext_model, 0x71);
        assert_eq!(sig.stepping, 0);
    }

    #[test]
    fn decodes_leaf1_ebx() {
        let info = AdditionalInfo::from_ebx(0x0410_0800);
        assert_eq!(info.brand_index, 0);
        assert_eq!(info.clflush_line_size, 64);
        assert_eq!(info.max_logical_ids, 16);
    }
}
