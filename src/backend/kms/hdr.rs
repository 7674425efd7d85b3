//! Static HDR metadata sent to the sink through the `HDR_OUTPUT_METADATA` connector property.
//!
//! The layout mirrors the kernel's `struct hdr_output_metadata` (32 bytes).

use bytemuck::{Pod, Zeroable};

/// `HDMI_STATIC_METADATA_TYPE1`.
const HDMI_STATIC_METADATA_TYPE1: u8 = 0;
/// `HDMI_EOTF_SMPTE_ST2084`.
const HDMI_EOTF_SMPTE_ST2084: u8 = 2;

/// CIE 1931 chromaticity in units of 0.00002.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Pod, Zeroable)]
pub struct Chromaticity {
    pub x: u16,
    pub y: u16,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Pod, Zeroable)]
pub struct HdrMetadataInfoframe {
    pub eotf: u8,
    pub metadata_type: u8,
    pub display_primaries: [Chromaticity; 3],
    pub white_point: Chromaticity,
    /// In cd/m².
    pub max_display_mastering_luminance: u16,
    /// In 0.0001 cd/m².
    pub min_display_mastering_luminance: u16,
    pub max_cll: u16,
    pub max_fall: u16,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Pod, Zeroable)]
pub struct HdrOutputMetadata {
    pub metadata_type: u32,
    pub hdmi_metadata_type1: HdrMetadataInfoframe,
    // Trailing padding of the C struct, spelled out for `Pod`.
    _pad: [u8; 2],
}

impl HdrOutputMetadata {
    /// Metadata of a representative 1000-nit PQ reference display.
    pub fn pq_reference_display() -> Self {
        Self {
            metadata_type: u32::from(HDMI_STATIC_METADATA_TYPE1),
            hdmi_metadata_type1: HdrMetadataInfoframe {
                eotf: HDMI_EOTF_SMPTE_ST2084,
                metadata_type: HDMI_STATIC_METADATA_TYPE1,
                display_primaries: [
                    Chromaticity { x: 15000, y: 35000 },
                    Chromaticity { x: 7500, y: 3000 },
                    Chromaticity { x: 34000, y: 16000 },
                ],
                white_point: Chromaticity { x: 15635, y: 16450 },
                max_display_mastering_luminance: 1000,
                min_display_mastering_luminance: 1,
                max_cll: 1000,
                max_fall: 400,
            },
            _pad: [0; 2],
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::bytes_of(self)
    }
}

#[cfg(test)]
mod tests {
    use std::mem::{offset_of, size_of};

    use super::*;

    #[test]
    fn matches_kernel_layout() {
        assert_eq!(size_of::<HdrOutputMetadata>(), 32);
        assert_eq!(size_of::<HdrMetadataInfoframe>(), 26);
        assert_eq!(offset_of!(HdrOutputMetadata, hdmi_metadata_type1), 4);
        assert_eq!(offset_of!(HdrMetadataInfoframe, display_primaries), 2);
        assert_eq!(offset_of!(HdrMetadataInfoframe, max_fall), 24);
    }

    #[test]
    fn reference_display_values() {
        let metadata = HdrOutputMetadata::pq_reference_display();
        let frame = metadata.hdmi_metadata_type1;
        assert_eq!(frame.eotf, HDMI_EOTF_SMPTE_ST2084);
        assert_eq!(frame.max_display_mastering_luminance, 1000);
        assert_eq!(frame.min_display_mastering_luminance, 1);
        assert_eq!(frame.max_cll, 1000);
        assert_eq!(frame.max_fall, 400);

        let bytes = metadata.as_bytes();
        assert_eq!(bytes.len(), 32);
        // EOTF byte right after the u32 metadata type.
        assert_eq!(bytes[4], 2);
    }
}
