//! Type definitions for the KMS backend.
//!
//! This module contains the plain data that flows between the configuration stages: display
//! objects, resolved properties, the selected output and what the kernel reports about it.

use std::fmt;

use drm::control::Mode;

// =============================================================================
// Constants
// =============================================================================

/// Value of the plane `type` property for primary planes.
pub(super) const DRM_PLANE_TYPE_PRIMARY: u64 = 1;

/// `Colorspace` connector enum value for BT.2020 YCC.
pub(super) const DRM_MODE_COLORIMETRY_BT2020_YCC: u64 = 10;

/// Enum entry of the NVIDIA regamma transfer function property that selects PQ.
pub(super) const PQ_TRANSFER_FUNCTION: &str = "PQ (Perceptual Quantizer)";

/// The dumb buffer is XRGB8888: 32 bits per pixel, 24 of which carry colour.
pub(super) const FRAMEBUFFER_BPP: u32 = 32;
pub(super) const FRAMEBUFFER_DEPTH: u32 = 24;

// =============================================================================
// Display Objects
// =============================================================================

/// Kind of a kernel mode-setting object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObjectKind {
    Connector,
    Crtc,
    Plane,
}

/// A connector, CRTC or plane, identified by its kernel-assigned ID.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DisplayObject {
    pub id: u32,
    pub kind: ObjectKind,
}

impl DisplayObject {
    pub fn connector(id: u32) -> Self {
        Self {
            id,
            kind: ObjectKind::Connector,
        }
    }

    pub fn crtc(id: u32) -> Self {
        Self {
            id,
            kind: ObjectKind::Crtc,
        }
    }

    pub fn plane(id: u32) -> Self {
        Self {
            id,
            kind: ObjectKind::Plane,
        }
    }
}

impl fmt::Display for DisplayObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self.kind {
            ObjectKind::Connector => "connector",
            ObjectKind::Crtc => "crtc",
            ObjectKind::Plane => "plane",
        };
        write!(f, "{kind} {}", self.id)
    }
}

/// A property resolved on one specific object.
///
/// The handle is only meaningful together with the object it was resolved on, which is why the
/// owner travels with it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Property {
    pub id: u32,
    pub object: DisplayObject,
}

// =============================================================================
// Kernel Reports
// =============================================================================

/// Client capabilities the configuration flow depends on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    UniversalPlanes,
    Atomic,
}

/// Top-level mode-setting resources, in kernel order.
#[derive(Debug, Clone, Default)]
pub struct Resources {
    pub connectors: Vec<u32>,
    /// CRTC IDs; the position of an ID is the CRTC index used by possible-CRTC bitmasks.
    pub crtcs: Vec<u32>,
}

#[derive(Debug, Clone)]
pub struct ConnectorInfo {
    pub id: u32,
    /// Interface name, e.g. `HDMI-A-1`.
    pub name: String,
    pub connected: bool,
    /// Modes as reported by the kernel; the first one is the preferred mode.
    pub modes: Vec<Mode>,
    pub encoders: Vec<u32>,
}

#[derive(Debug, Clone, Copy)]
pub struct EncoderInfo {
    pub id: u32,
    pub possible_crtcs: u32,
}

#[derive(Debug, Clone, Copy)]
pub struct PlaneInfo {
    pub id: u32,
    pub possible_crtcs: u32,
}

#[derive(Debug, Clone)]
pub struct PropertyInfo {
    pub id: u32,
    pub name: String,
    /// Enum entries as `(name, value)`; empty for non-enum properties.
    pub enums: Vec<(String, u64)>,
}

// =============================================================================
// Selection
// =============================================================================

/// Resolution and refresh rate requested by the user. `None` means "no preference".
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ModeRequest {
    pub size: Option<(u32, u32)>,
    pub refresh: Option<u32>,
}

impl ModeRequest {
    /// Builds a request from raw numbers where 0 stands for "unspecified".
    ///
    /// A nonzero width asks for a specific mode even when the height is 0. Such a size never
    /// matches and ends up as a fallback.
    pub fn new(width: u32, height: u32, refresh: u32) -> Self {
        let size = (width > 0).then_some((width, height));
        let refresh = (refresh > 0).then_some(refresh);
        Self { size, refresh }
    }
}

impl fmt::Display for ModeRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.size, self.refresh) {
            (Some((w, h)), Some(r)) => write!(f, "{w}x{h} @ {r}Hz"),
            (Some((w, h)), None) => write!(f, "{w}x{h}"),
            (None, _) => f.write_str("preferred mode"),
        }
    }
}

/// The mode picked for a connector.
#[derive(Debug, Clone, Copy)]
pub struct ModeChoice {
    /// Position of the mode in the connector's mode list.
    pub index: usize,
    pub mode: Mode,
    /// A specific mode was requested but not found exactly.
    pub fallback: bool,
}

/// The resolved output configuration.
///
/// The connector's encoder lists `crtc` among its possible CRTCs, and `plane`'s possible-CRTC mask
/// contains `crtc_index`.
#[derive(Debug, Clone, Copy)]
pub struct OutputConfig {
    pub connector: u32,
    pub crtc: u32,
    pub crtc_index: usize,
    pub plane: u32,
    pub mode: Mode,
    pub width: u16,
    pub height: u16,
}

impl OutputConfig {
    pub fn connector_object(&self) -> DisplayObject {
        DisplayObject::connector(self.connector)
    }

    pub fn crtc_object(&self) -> DisplayObject {
        DisplayObject::crtc(self.crtc)
    }

    pub fn plane_object(&self) -> DisplayObject {
        DisplayObject::plane(self.plane)
    }
}

// =============================================================================
// Resolved Properties
// =============================================================================

#[derive(Debug, Clone, Copy)]
pub struct CrtcProps {
    pub mode_id: Property,
    pub active: Property,
    /// NVIDIA-specific regamma transfer function.
    pub eotf: Option<Property>,
}

#[derive(Debug, Clone, Copy)]
pub struct ConnectorProps {
    pub crtc_id: Property,
    pub colorspace: Option<Property>,
    pub hdr_output_metadata: Option<Property>,
}

#[derive(Debug, Clone, Copy)]
pub struct PlaneProps {
    pub fb_id: Property,
    pub crtc_id: Property,
    pub src_x: Property,
    pub src_y: Property,
    pub src_w: Property,
    pub src_h: Property,
    pub crtc_x: Property,
    pub crtc_y: Property,
    pub crtc_w: Property,
    pub crtc_h: Property,
}

/// Every property one configuration pass writes, scoped to that pass.
#[derive(Debug, Clone, Copy)]
pub struct PropertyIds {
    pub crtc: CrtcProps,
    pub connector: ConnectorProps,
    pub plane: PlaneProps,
}

// =============================================================================
// Provisioned Resources
// =============================================================================

/// A registered framebuffer backed by a mapped dumb buffer.
///
/// Never destroyed: it lives as long as the display session.
#[derive(Debug)]
pub struct Framebuffer<B> {
    pub id: u32,
    pub buffer: B,
    pub width: u32,
    pub height: u32,
    pub pitch: u32,
}

/// Handoff to the rendering side after a successful commit.
#[derive(Debug)]
pub struct ModesetOutput<B> {
    pub plane: u32,
    pub width: u16,
    pub height: u16,
    pub mode: Mode,
    pub framebuffer: Framebuffer<B>,
}
