//! Output selection: connector, mode, CRTC and primary plane.

use std::time::Duration;

use drm::control::{Mode, ModeFlags};
use tracing::{debug, info, warn};

use super::device::KmsDevice;
use super::error::{ErrorKind, KernelContext, KmsError, KmsResult};
use super::props::PropertyScan;
use super::types::{
    Capability, ConnectorInfo, DisplayObject, ModeChoice, ModeRequest, OutputConfig, Resources,
    DRM_PLANE_TYPE_PRIMARY,
};

// =============================================================================
// Mode Picking
// =============================================================================

/// Pick the best mode for a connector based on the request.
///
/// An exact size and refresh match wins, then a size-only match, then the connector's first
/// (preferred) mode. Returns `None` only for an empty mode list.
pub fn pick_mode(modes: &[Mode], target: ModeRequest) -> Option<ModeChoice> {
    if modes.is_empty() {
        return None;
    }

    let make = |index: usize, fallback: bool| ModeChoice {
        index,
        mode: modes[index],
        fallback,
    };

    let Some((width, height)) = target.size else {
        return Some(make(0, false));
    };

    let size_matches =
        |m: &Mode| (u32::from(m.size().0), u32::from(m.size().1)) == (width, height);

    if let Some(refresh) = target.refresh {
        if let Some(idx) = modes
            .iter()
            .position(|m| size_matches(m) && m.vrefresh() == refresh)
        {
            return Some(make(idx, false));
        }
    }

    let choice = match modes.iter().position(size_matches) {
        // Without a refresh rate any size match is what was asked for.
        Some(idx) => make(idx, target.refresh.is_some()),
        None => make(0, true),
    };

    if choice.fallback {
        let (w, h) = choice.mode.size();
        warn!(
            "desired mode ({target}) not found, using {w}x{h} @ {}Hz",
            choice.mode.vrefresh()
        );
    }

    Some(choice)
}

/// Calculate the refresh interval from a DRM mode.
pub fn refresh_interval(mode: Mode) -> Duration {
    let clock = mode.clock() as u64;
    let htotal = mode.hsync().2 as u64;
    let vtotal = mode.vsync().2 as u64;

    if clock == 0 {
        return Duration::ZERO;
    }

    let mut numerator = htotal * vtotal * 1_000_000;
    let mut denominator = clock;

    if mode.flags().contains(ModeFlags::INTERLACE) {
        denominator *= 2;
    }

    if mode.flags().contains(ModeFlags::DBLSCAN) {
        numerator *= 2;
    }

    if mode.vscan() > 1 {
        numerator *= mode.vscan() as u64;
    }

    let refresh_interval = (numerator + denominator / 2) / denominator;
    Duration::from_nanos(refresh_interval)
}

// =============================================================================
// Connector and CRTC
// =============================================================================

/// A connector with a chosen mode and a CRTC its encoder can drive.
#[derive(Debug, Clone)]
pub struct ConnectorChoice {
    pub connector: ConnectorInfo,
    pub mode: ModeChoice,
    pub crtc: u32,
    pub crtc_index: usize,
}

/// First CRTC, by index, that the connector's first encoder can drive.
fn pick_crtc(
    device: &impl KmsDevice,
    res: &Resources,
    connector: &ConnectorInfo,
) -> KmsResult<Option<(u32, usize)>> {
    let Some(&encoder) = connector.encoders.first() else {
        debug!("connector {} has no encoders", connector.name);
        return Ok(None);
    };

    let encoder = device
        .encoder(encoder)
        .kernel_context(ErrorKind::EnumerationFailure, || {
            format!("error getting encoder {encoder}")
        })?;

    Ok(res
        .crtcs
        .iter()
        .enumerate()
        .take(u32::BITS as usize)
        .find(|(idx, _)| encoder.possible_crtcs & (1 << idx) != 0)
        .map(|(idx, &crtc)| (crtc, idx)))
}

/// Picks the first connected connector with modes and a reachable CRTC.
pub fn pick_connector(
    device: &impl KmsDevice,
    res: &Resources,
    target: ModeRequest,
) -> KmsResult<ConnectorChoice> {
    for &id in &res.connectors {
        let connector = device
            .connector(id)
            .kernel_context(ErrorKind::EnumerationFailure, || {
                format!("error getting connector {id}")
            })?;

        if !connector.connected {
            debug!("skipping disconnected connector {}", connector.name);
            continue;
        }

        let Some(mode) = pick_mode(&connector.modes, target) else {
            debug!("skipping connector {} without modes", connector.name);
            continue;
        };

        let Some((crtc, crtc_index)) = pick_crtc(device, res, &connector)? else {
            debug!("skipping connector {}: no usable crtc", connector.name);
            continue;
        };

        return Ok(ConnectorChoice {
            connector,
            mode,
            crtc,
            crtc_index,
        });
    }

    Err(KmsError::new(
        ErrorKind::SelectionFailure,
        "could not find a suitable connector",
    ))
}

// =============================================================================
// Plane
// =============================================================================

/// Picks the primary plane that can be attached to the CRTC at `crtc_index`.
pub fn pick_plane(device: &impl KmsDevice, crtc_index: usize) -> KmsResult<u32> {
    let planes = device
        .planes()
        .kernel_context(ErrorKind::EnumerationFailure, || {
            "unable to query plane resources".to_owned()
        })?;

    for id in planes {
        let plane = device
            .plane(id)
            .kernel_context(ErrorKind::EnumerationFailure, || {
                format!("unable to query plane {id}")
            })?;

        if crtc_index >= u32::BITS as usize || plane.possible_crtcs & (1 << crtc_index) == 0 {
            continue;
        }

        let props = PropertyScan::new(device, DisplayObject::plane(id))?;
        if props.value("type") == Some(DRM_PLANE_TYPE_PRIMARY) {
            return Ok(id);
        }
    }

    Err(KmsError::new(
        ErrorKind::SelectionFailure,
        format!("could not find a primary plane for crtc index {crtc_index}"),
    ))
}

// =============================================================================
// Whole Selection
// =============================================================================

/// Enables the required capabilities and selects connector, mode, CRTC and plane.
pub fn pick_config(device: &impl KmsDevice, target: ModeRequest) -> KmsResult<OutputConfig> {
    let _span = tracy_client::span!("pick_config");

    device
        .enable_capability(Capability::UniversalPlanes)
        .kernel_context(ErrorKind::CapabilityUnavailable, || {
            "DRM_CLIENT_CAP_UNIVERSAL_PLANES not available".to_owned()
        })?;
    device
        .enable_capability(Capability::Atomic)
        .kernel_context(ErrorKind::CapabilityUnavailable, || {
            "DRM_CLIENT_CAP_ATOMIC not available".to_owned()
        })?;

    let res = device
        .resources()
        .kernel_context(ErrorKind::EnumerationFailure, || {
            "unable to query DRM-KMS resources".to_owned()
        })?;

    let choice = pick_connector(device, &res, target)?;
    let plane = pick_plane(device, choice.crtc_index)?;

    let mode = choice.mode.mode;
    let (width, height) = mode.size();
    info!(
        "using connector {} with crtc {} (index {}) and plane {plane}: {width}x{height} @ {}Hz",
        choice.connector.name,
        choice.crtc,
        choice.crtc_index,
        mode.vrefresh()
    );

    Ok(OutputConfig {
        connector: choice.connector.id,
        crtc: choice.crtc,
        crtc_index: choice.crtc_index,
        plane,
        mode,
        width,
        height,
    })
}
