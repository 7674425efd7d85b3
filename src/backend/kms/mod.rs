//! Atomic KMS output configuration.
//!
//! Stages, each in its own module:
//! - `topology` - connector, mode, CRTC and primary plane selection
//! - `props` - property name to ID resolution
//! - `framebuffer` - dumb buffer provisioning
//! - `atomic` - the atomic transaction and its commit
//!
//! [`set_mode`] runs them in order and hands the result to the renderer. Every stage talks to the
//! kernel through [`KmsDevice`].

mod atomic;
mod device;
mod error;
mod framebuffer;
mod hdr;
mod props;
mod topology;
mod types;


use tracing::info;

pub use atomic::{build_request, AtomicTransaction, CommitFlags, PropertyWrite};
pub use device::{primary_node_candidates, Card, KmsDevice};
pub use error::{ErrorKind, KmsError, KmsResult};
pub use framebuffer::create_framebuffer;
pub use hdr::HdrOutputMetadata;
pub use props::{enum_value, resolve_property_ids, PropertyScan};
pub use topology::{
    pick_config, pick_connector, pick_mode, pick_plane, refresh_interval, ConnectorChoice,
};
pub use types::{
    Capability, ConnectorInfo, DisplayObject, EncoderInfo, Framebuffer, ModeChoice, ModeRequest,
    ModesetOutput, ObjectKind, OutputConfig, PlaneInfo, Property, PropertyIds, PropertyInfo,
    Resources,
};

use error::KernelContext;

/// Options of one mode-set.
#[derive(Debug, Clone, Copy, Default)]
pub struct SetModeOptions {
    pub request: ModeRequest,
    pub hdr: bool,
    /// Submit with `NONBLOCK`.
    pub nonblocking: bool,
}

impl SetModeOptions {
    pub fn commit_flags(&self) -> CommitFlags {
        let mut flags = CommitFlags::ALLOW_MODESET;
        flags.set(CommitFlags::NONBLOCK, self.nonblocking);
        flags
    }
}

/// Configures an output and lights it up with a blank framebuffer.
///
/// Nothing acquired on the way is released on failure.
pub fn set_mode<D: KmsDevice>(
    device: &D,
    options: SetModeOptions,
) -> KmsResult<ModesetOutput<D::Buffer>> {
    let _span = tracy_client::span!("set_mode");

    let config = pick_config(device, options.request)?;
    let props = resolve_property_ids(device, &config)?;

    let mode_blob = device
        .create_mode_blob(&config.mode)
        .kernel_context(ErrorKind::AllocationFailure, || {
            "failed to create mode blob".to_owned()
        })?;

    let framebuffer =
        create_framebuffer(device, u32::from(config.width), u32::from(config.height))?;

    let req = build_request(
        device,
        &config,
        &props,
        mode_blob,
        framebuffer.id,
        options.hdr,
    );
    req.commit(device, options.commit_flags())?;

    info!(
        "mode set to {}x{} @ {}Hz",
        config.width,
        config.height,
        config.mode.vrefresh()
    );

    Ok(ModesetOutput {
        plane: config.plane,
        width: config.width,
        height: config.height,
        mode: config.mode,
        framebuffer,
    })
}
