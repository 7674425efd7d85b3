//! Property resolution for the KMS backend.
//!
//! Property IDs are assigned by the kernel and looked up by name. One [`PropertyScan`] lists an
//! object's properties once, after which any number of names can be resolved against it.

use std::collections::HashMap;

use tracing::{trace, warn};

use super::device::KmsDevice;
use super::error::{ErrorKind, KernelContext, KmsError, KmsResult};
use super::types::{
    ConnectorProps, CrtcProps, DisplayObject, OutputConfig, PlaneProps, Property, PropertyIds,
};

/// Name of the NVIDIA transfer function property on CRTCs.
pub(super) const NV_CRTC_REGAMMA_TF: &str = "NV_CRTC_REGAMMA_TF";

/// The named properties of one object, with their current values.
#[derive(Debug)]
pub struct PropertyScan {
    object: DisplayObject,
    by_name: HashMap<String, (Property, u64)>,
}

impl PropertyScan {
    /// Lists every property of `object` in one pass.
    pub fn new(device: &impl KmsDevice, object: DisplayObject) -> KmsResult<Self> {
        let props = device
            .object_properties(object)
            .kernel_context(ErrorKind::EnumerationFailure, || {
                format!("error getting properties of {object}")
            })?;

        let mut by_name = HashMap::with_capacity(props.len());
        for (id, value) in props {
            let info = device
                .property_info(id)
                .kernel_context(ErrorKind::EnumerationFailure, || {
                    format!("error querying property {id} of {object}")
                })?;

            trace!("{object}: property {} = {id}", info.name);
            // The first occurrence wins, like a linear scan would.
            by_name
                .entry(info.name)
                .or_insert((Property { id, object }, value));
        }

        Ok(Self { object, by_name })
    }

    /// Looks up an optional property.
    pub fn find(&self, name: &str) -> Option<Property> {
        self.by_name.get(name).map(|(prop, _)| *prop)
    }

    /// Current value of a property, if the object has it.
    pub fn value(&self, name: &str) -> Option<u64> {
        self.by_name.get(name).map(|(_, value)| *value)
    }

    /// Resolves a table of mandatory properties, failing if any of them is missing.
    pub fn required<const N: usize>(&self, names: [&str; N]) -> KmsResult<[Property; N]> {
        let resolved: Vec<Property> = names.iter().filter_map(|name| self.find(name)).collect();

        resolved.try_into().map_err(|_| {
            let missing: Vec<&str> = names
                .iter()
                .copied()
                .filter(|name| self.find(name).is_none())
                .collect();
            KmsError::new(
                ErrorKind::ResolutionFailure,
                format!(
                    "{} is missing required properties: {}",
                    self.object,
                    missing.join(", ")
                ),
            )
        })
    }
}

/// Looks up the value of a named enum entry of an enum property.
pub fn enum_value(device: &impl KmsDevice, prop: Property, entry: &str) -> Option<u64> {
    let info = match device.property_info(prop.id) {
        Ok(info) => info,
        Err(err) => {
            warn!("error querying property {}: {err:?}", prop.id);
            return None;
        }
    };

    info.enums
        .into_iter()
        .find_map(|(name, value)| (name == entry).then_some(value))
}

/// Resolves every property the atomic request writes for `config`.
///
/// Each object's property list is read once.
pub fn resolve_property_ids(
    device: &impl KmsDevice,
    config: &OutputConfig,
) -> KmsResult<PropertyIds> {
    let _span = tracy_client::span!("resolve_property_ids");

    let crtc = PropertyScan::new(device, config.crtc_object())?;
    let [mode_id, active] = crtc.required(["MODE_ID", "ACTIVE"])?;

    let plane = PropertyScan::new(device, config.plane_object())?;
    let [fb_id, crtc_id, src_x, src_y, src_w, src_h, crtc_x, crtc_y, crtc_w, crtc_h] = plane
        .required([
            "FB_ID", "CRTC_ID", "SRC_X", "SRC_Y", "SRC_W", "SRC_H", "CRTC_X", "CRTC_Y", "CRTC_W",
            "CRTC_H",
        ])?;

    let connector = PropertyScan::new(device, config.connector_object())?;
    let [connector_crtc_id] = connector.required(["CRTC_ID"])?;

    Ok(PropertyIds {
        crtc: CrtcProps {
            mode_id,
            active,
            eotf: crtc.find(NV_CRTC_REGAMMA_TF),
        },
        connector: ConnectorProps {
            crtc_id: connector_crtc_id,
            colorspace: connector.find("Colorspace"),
            hdr_output_metadata: connector.find("HDR_OUTPUT_METADATA"),
        },
        plane: PlaneProps {
            fb_id,
            crtc_id,
            src_x,
            src_y,
            src_w,
            src_h,
            crtc_x,
            crtc_y,
            crtc_w,
            crtc_h,
        },
    })
}
