use super::{Animation, Frame};

/// 75% SMPTE colour bars in XRGB8888.
const COLORS: [u32; 7] = [
    0x00c0c0c0, 0x00c0c000, 0x0000c0c0, 0x0000c000, 0x00c000c0, 0x00c00000, 0x000000c0,
];

/// Colour bars scrolling to the left.
#[derive(Debug)]
pub struct Bars {
    width: u32,
    height: u32,
    /// Pixels scrolled per frame.
    speed: u32,
    frame: u64,
}

impl Bars {
    pub fn new(speed: u32) -> Self {
        Self {
            width: 0,
            height: 0,
            speed,
            frame: 0,
        }
    }

    fn color_at(&self, x: u32) -> u32 {
        let width = u64::from(self.width.max(1));
        let offset = self.frame * u64::from(self.speed) % width;
        let x = (u64::from(x) + offset) % width;
        COLORS[(x * COLORS.len() as u64 / width) as usize]
    }
}

impl Default for Bars {
    fn default() -> Self {
        Self::new(4)
    }
}

impl Animation for Bars {
    fn init(&mut self, width: u32, height: u32) {
        self.width = width;
        self.height = height;
        self.frame = 0;
    }

    fn draw(&mut self, frame: &mut Frame<'_>) {
        let width = self.width.min(frame.width);
        let height = self.height.min(frame.height);
        if width == 0 || height == 0 {
            return;
        }

        let row: Vec<u32> = (0..width).map(|x| self.color_at(x)).collect();
        for y in 0..height {
            frame.row_mut(y)[..width as usize].copy_from_slice(&row);
        }

        self.frame += 1;
    }
}
