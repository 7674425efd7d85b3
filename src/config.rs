//! Session configuration, resolved from the command line and the environment.

use std::env;
use std::ffi::OsString;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use tracing::debug;

use crate::backend::kms::{primary_node_candidates, ModeRequest, SetModeOptions};
use crate::cli::Cli;

/// Overrides the DRM primary node.
pub const DEVICE_ENV: &str = "KMS_PRESENT_DEVICE";
/// Makes the mode-set commit blocking when set to `1` or `true`.
pub const BLOCKING_COMMIT_ENV: &str = "KMS_PRESENT_BLOCKING_COMMIT";

const DRI_DIR: &str = "/dev/dri";

#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub device: PathBuf,
    pub mode: SetModeOptions,
}

impl SessionConfig {
    /// Resolves the configuration from the process environment.
    ///
    /// Returns `Ok(None)` if the positional arguments do not form a mode request.
    pub fn load(cli: &Cli) -> anyhow::Result<Option<Self>> {
        let Some(request) = cli.mode_request() else {
            return Ok(None);
        };
        Self::resolve(request, cli.hdr, |key| env::var_os(key), Path::new(DRI_DIR)).map(Some)
    }

    pub fn resolve(
        request: ModeRequest,
        hdr: bool,
        var: impl Fn(&str) -> Option<OsString>,
        dri: &Path,
    ) -> anyhow::Result<Self> {
        let device = match var(DEVICE_ENV) {
            Some(path) if !path.is_empty() => {
                debug!("using DRM device from {DEVICE_ENV}: {path:?}");
                PathBuf::from(path)
            }
            _ => {
                let candidates = primary_node_candidates(dri);
                let Some(first) = candidates.into_iter().next() else {
                    bail!("no DRM primary node found in {dri:?}");
                };
                first
            }
        };

        let blocking = match var(BLOCKING_COMMIT_ENV) {
            Some(value) => {
                let value = value
                    .into_string()
                    .ok()
                    .with_context(|| format!("{BLOCKING_COMMIT_ENV} is not valid UTF-8"))?;
                is_truthy(&value)
            }
            None => false,
        };

        Ok(Self {
            device,
            mode: SetModeOptions {
                request,
                hdr,
                nonblocking: !blocking,
            },
        })
    }
}

fn is_truthy(value: &str) -> bool {
    value == "1" || value.eq_ignore_ascii_case("true")
}
