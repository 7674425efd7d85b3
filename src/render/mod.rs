//! Rendering side of the handoff: a presentable surface on top of the lit-up output and an
//! animation that draws into it.

mod bars;
mod software;

pub use bars::Bars;
pub use software::{SoftwareContext, SoftwareSurface};

use crate::backend::kms::{KmsDevice, ModesetOutput};

/// A CPU frame in XRGB8888, tightly packed.
#[derive(Debug)]
pub struct Frame<'a> {
    pub pixels: &'a mut [u32],
    pub width: u32,
    pub height: u32,
}

impl Frame<'_> {
    pub fn row_mut(&mut self, y: u32) -> &mut [u32] {
        let width = self.width as usize;
        let start = y as usize * width;
        &mut self.pixels[start..start + width]
    }
}

/// A surface that can be drawn into and shown.
pub trait Presentable {
    /// The frame that the next [`present`](Presentable::present) shows.
    fn frame(&mut self) -> Frame<'_>;
    fn present(&mut self) -> anyhow::Result<()>;
}

/// Turns a freshly configured output into a presentable surface.
pub trait ContextSetup<D: KmsDevice> {
    type Surface<'d>: Presentable
    where
        D: 'd;

    fn setup<'d>(
        &self,
        device: &'d D,
        output: ModesetOutput<D::Buffer>,
        hdr: bool,
    ) -> anyhow::Result<Self::Surface<'d>>;
}

/// A client that produces one frame per loop iteration.
pub trait Animation {
    fn init(&mut self, width: u32, height: u32);
    fn draw(&mut self, frame: &mut Frame<'_>);
}

/// Draws and presents frames forever.
pub fn run(surface: &mut impl Presentable, animation: &mut impl Animation) -> anyhow::Result<()> {
    loop {
        let _span = tracy_client::span!("frame");

        animation.draw(&mut surface.frame());
        surface.present()?;
    }
}
