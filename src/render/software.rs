//! CPU presentation into the scan-out dumb buffer.

use std::thread;
use std::time::{Duration, Instant};

use anyhow::Context;
use tracing::{debug, info};

use super::{ContextSetup, Frame, Presentable};
use crate::backend::kms::{refresh_interval, Framebuffer, KmsDevice, ModesetOutput};

/// Presents by copying a CPU back buffer into the mapped framebuffer.
#[derive(Debug, Default)]
pub struct SoftwareContext;

pub struct SoftwareSurface<'d, D: KmsDevice> {
    device: &'d D,
    framebuffer: Framebuffer<D::Buffer>,
    back: Vec<u32>,
    width: u32,
    height: u32,
    interval: Duration,
    last_present: Option<Instant>,
}

impl<D: KmsDevice> ContextSetup<D> for SoftwareContext {
    type Surface<'d>
        = SoftwareSurface<'d, D>
    where
        D: 'd;

    fn setup<'d>(
        &self,
        device: &'d D,
        output: ModesetOutput<D::Buffer>,
        hdr: bool,
    ) -> anyhow::Result<SoftwareSurface<'d, D>> {
        let width = u32::from(output.width);
        let height = u32::from(output.height);
        let fb = &output.framebuffer;

        anyhow::ensure!(
            fb.width >= width && fb.height >= height && fb.pitch >= width * 4,
            "framebuffer {}x{} (pitch {}) is smaller than the output {width}x{height}",
            fb.width,
            fb.height,
            fb.pitch,
        );

        if hdr {
            // Pixels stay 8-bit XRGB, the sink interprets them as PQ-encoded.
            info!("HDR enabled, presenting 8-bit content");
        }

        let interval = refresh_interval(output.mode);
        debug!(
            "software surface on plane {}: {width}x{height}, refresh interval {interval:?}",
            output.plane
        );

        Ok(SoftwareSurface {
            device,
            framebuffer: output.framebuffer,
            back: vec![0; (width * height) as usize],
            width,
            height,
            interval,
            last_present: None,
        })
    }
}

impl<D: KmsDevice> Presentable for SoftwareSurface<'_, D> {
    fn frame(&mut self) -> Frame<'_> {
        Frame {
            pixels: &mut self.back,
            width: self.width,
            height: self.height,
        }
    }

    fn present(&mut self) -> anyhow::Result<()> {
        let _span = tracy_client::span!("SoftwareSurface::present");

        if let Some(last) = self.last_present {
            let wait = next_wait(last.elapsed(), self.interval);
            if !wait.is_zero() {
                thread::sleep(wait);
            }
        }

        let pitch = self.framebuffer.pitch as usize;
        let mut mapping = self
            .device
            .map_buffer(&mut self.framebuffer.buffer)
            .context("error mapping framebuffer")?;
        copy_rows(&mut mapping, pitch, &self.back, self.width as usize);

        self.last_present = Some(Instant::now());
        Ok(())
    }
}

/// How long to wait until one refresh interval has passed since the previous present.
fn next_wait(since_last: Duration, interval: Duration) -> Duration {
    interval.saturating_sub(since_last)
}

/// Copies tightly packed `src` rows of `width` pixels into `dst` rows of `pitch` bytes.
fn copy_rows(dst: &mut [u8], pitch: usize, src: &[u32], width: usize) {
    if width == 0 || pitch == 0 {
        return;
    }

    for (dst_row, src_row) in dst.chunks_mut(pitch).zip(src.chunks_exact(width)) {
        let bytes: &[u8] = bytemuck::cast_slice(src_row);
        let len = bytes.len().min(dst_row.len());
        dst_row[..len].copy_from_slice(&bytes[..len]);
    }
}
