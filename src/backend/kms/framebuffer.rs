//! Scan-out framebuffer provisioning.

use tracing::debug;

use super::device::KmsDevice;
use super::error::{ErrorKind, KernelContext, KmsResult};
use super::types::{Framebuffer, FRAMEBUFFER_BPP, FRAMEBUFFER_DEPTH};

/// Allocates a zero-filled XRGB8888 dumb buffer of `width`x`height` and registers it as a
/// framebuffer.
pub fn create_framebuffer<D: KmsDevice>(
    device: &D,
    width: u32,
    height: u32,
) -> KmsResult<Framebuffer<D::Buffer>> {
    let _span = tracy_client::span!("create_framebuffer");

    let mut buffer = device
        .allocate_dumb_buffer(width, height, FRAMEBUFFER_BPP)
        .kernel_context(ErrorKind::AllocationFailure, || {
            format!("error creating {width}x{height} dumb buffer")
        })?;

    let id = device
        .register_framebuffer(&buffer, FRAMEBUFFER_DEPTH, FRAMEBUFFER_BPP)
        .kernel_context(ErrorKind::AllocationFailure, || {
            "error creating framebuffer".to_owned()
        })?;

    let pitch = device.buffer_pitch(&buffer);

    {
        let mut mapping = device
            .map_buffer(&mut buffer)
            .kernel_context(ErrorKind::AllocationFailure, || {
                "error mapping dumb buffer".to_owned()
            })?;
        mapping.fill(0);
    }

    debug!("created framebuffer {id}: {width}x{height}, pitch {pitch}");

    Ok(Framebuffer {
        id,
        buffer,
        width,
        height,
        pitch,
    })
}
