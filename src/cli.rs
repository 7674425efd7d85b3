use clap::Parser;

use crate::backend::kms::ModeRequest;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
#[command(override_usage = "kms-present [--hdr] [width height [refresh_rate]]")]
pub struct Cli {
    /// Enable HDR output (PQ transfer function, BT.2020 colorimetry, static metadata).
    #[arg(long)]
    pub hdr: bool,
    /// Desired mode: width and height, optionally followed by the refresh rate in Hz.
    #[arg(value_name = "MODE")]
    pub mode: Vec<u32>,
}

impl Cli {
    /// The requested mode, or `None` if the positional count is not 0, 2 or 3.
    pub fn mode_request(&self) -> Option<ModeRequest> {
        match *self.mode.as_slice() {
            [] => Some(ModeRequest::default()),
            [width, height] => Some(ModeRequest::new(width, height, 0)),
            [width, height, refresh] => Some(ModeRequest::new(width, height, refresh)),
            _ => None,
        }
    }
}
