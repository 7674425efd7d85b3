//! Atomic request building and committing.

use bitflags::bitflags;
use tracing::{debug, warn};

use super::device::KmsDevice;
use super::error::{ErrorKind, KernelContext, KmsResult};
use super::hdr::HdrOutputMetadata;
use super::props::{enum_value, NV_CRTC_REGAMMA_TF};
use super::types::{
    OutputConfig, Property, PropertyIds, DRM_MODE_COLORIMETRY_BT2020_YCC, PQ_TRANSFER_FUNCTION,
};

bitflags! {
    /// Flags of an atomic commit.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct CommitFlags: u32 {
        /// Return before the commit is applied.
        const NONBLOCK = 1 << 0;
        /// Allow a full mode-set instead of a plane update only.
        const ALLOW_MODESET = 1 << 1;
    }
}

/// One property write of an atomic transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PropertyWrite {
    pub property: Property,
    pub value: u64,
}

/// An ordered batch of property writes applied by the kernel in one step.
#[derive(Debug, Default)]
pub struct AtomicTransaction {
    writes: Vec<PropertyWrite>,
}

impl AtomicTransaction {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a write to the object that owns `property`.
    pub fn add(&mut self, property: Property, value: u64) {
        self.writes.push(PropertyWrite { property, value });
    }

    pub fn writes(&self) -> &[PropertyWrite] {
        &self.writes
    }

    pub fn len(&self) -> usize {
        self.writes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.writes.is_empty()
    }

    /// Submits the transaction. A transaction is submitted at most once.
    pub fn commit(self, device: &impl KmsDevice, flags: CommitFlags) -> KmsResult<()> {
        let _span = tracy_client::span!("AtomicTransaction::commit");

        debug!("committing {} property writes with {flags:?}", self.len());
        device
            .commit(flags, &self)
            .kernel_context(ErrorKind::CommitFailure, || "failed to set mode".to_owned())
    }
}

/// Builds the transaction that lights up `config` with framebuffer `fb` and mode blob `mode_blob`.
///
/// HDR writes are only added when `hdr` is set; each missing piece is skipped with a warning.
pub fn build_request(
    device: &impl KmsDevice,
    config: &OutputConfig,
    props: &PropertyIds,
    mode_blob: u64,
    fb: u32,
    hdr: bool,
) -> AtomicTransaction {
    let _span = tracy_client::span!("build_request");

    let mut req = AtomicTransaction::new();
    let width = u64::from(config.width);
    let height = u64::from(config.height);
    let crtc = u64::from(config.crtc);

    let plane = &props.plane;
    // Source coordinates are 16.16 fixed point.
    req.add(plane.src_x, 0);
    req.add(plane.src_y, 0);
    req.add(plane.src_w, width << 16);
    req.add(plane.src_h, height << 16);
    req.add(plane.crtc_x, 0);
    req.add(plane.crtc_y, 0);
    req.add(plane.crtc_w, width);
    req.add(plane.crtc_h, height);

    req.add(props.crtc.mode_id, mode_blob);
    req.add(props.crtc.active, 1);
    req.add(props.connector.crtc_id, crtc);
    req.add(plane.fb_id, u64::from(fb));
    req.add(plane.crtc_id, crtc);

    if hdr {
        add_hdr_properties(device, props, &mut req);
    }

    req
}

fn add_hdr_properties(device: &impl KmsDevice, props: &PropertyIds, req: &mut AtomicTransaction) {
    match props.crtc.eotf {
        Some(eotf) => match enum_value(device, eotf, PQ_TRANSFER_FUNCTION) {
            Some(pq) => req.add(eotf, pq),
            None => warn!("could not find '{PQ_TRANSFER_FUNCTION}' enum for {NV_CRTC_REGAMMA_TF}"),
        },
        None => warn!("EOTF property ({NV_CRTC_REGAMMA_TF}) not found"),
    }

    match props.connector.colorspace {
        Some(colorspace) => req.add(colorspace, DRM_MODE_COLORIMETRY_BT2020_YCC),
        None => warn!("Colorspace property not found"),
    }

    match props.connector.hdr_output_metadata {
        Some(prop) => {
            let metadata = HdrOutputMetadata::pq_reference_display();
            match device.create_hdr_blob(&metadata) {
                Ok(blob) => req.add(prop, blob),
                Err(err) => warn!("failed to create HDR metadata blob: {err:?}"),
            }
        }
        None => warn!("HDR_OUTPUT_METADATA property not found"),
    }
}
