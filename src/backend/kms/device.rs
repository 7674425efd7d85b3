//! Kernel access for the KMS backend.
//!
//! This module contains:
//! - `KmsDevice` - the seam every configuration stage talks to the kernel through
//! - `Card` - the implementation on top of an opened DRM primary node

use std::fs::{File, OpenOptions};
use std::io;
use std::ops::DerefMut;
use std::os::fd::{AsFd, BorrowedFd};
use std::path::{Path, PathBuf};

use drm::buffer::{Buffer as _, DrmFourcc};
use drm::control::atomic::AtomicModeReq;
use drm::control::dumbbuffer::{DumbBuffer, DumbMapping};
use drm::control::{
    self, connector, crtc, plane, property, AtomicCommitFlags, CrtcListFilter, Device as _, Mode,
    ResourceHandles,
};
use drm::{ClientCapability, Device as _};
use tracing::{debug, warn};

use super::atomic::{AtomicTransaction, CommitFlags};
use super::hdr::HdrOutputMetadata;
use super::types::{
    Capability, ConnectorInfo, DisplayObject, EncoderInfo, ObjectKind, PlaneInfo, PropertyInfo,
    Resources,
};

/// Everything the configuration flow needs from the kernel.
///
/// All calls are blocking and are made from a single thread.
pub trait KmsDevice {
    /// Kernel dumb buffer.
    type Buffer;
    /// CPU mapping of a dumb buffer.
    type Mapping<'a>: DerefMut<Target = [u8]>
    where
        Self: 'a;

    fn enable_capability(&self, cap: Capability) -> io::Result<()>;

    fn resources(&self) -> io::Result<Resources>;
    fn connector(&self, id: u32) -> io::Result<ConnectorInfo>;
    /// The returned bitmask is indexed by CRTC position in [`Resources::crtcs`].
    fn encoder(&self, id: u32) -> io::Result<EncoderInfo>;
    fn planes(&self) -> io::Result<Vec<u32>>;
    fn plane(&self, id: u32) -> io::Result<PlaneInfo>;

    /// Property IDs of an object along with their current values.
    fn object_properties(&self, object: DisplayObject) -> io::Result<Vec<(u32, u64)>>;
    fn property_info(&self, id: u32) -> io::Result<PropertyInfo>;

    fn create_mode_blob(&self, mode: &Mode) -> io::Result<u64>;
    fn create_hdr_blob(&self, metadata: &HdrOutputMetadata) -> io::Result<u64>;

    fn allocate_dumb_buffer(&self, width: u32, height: u32, bpp: u32) -> io::Result<Self::Buffer>;
    fn buffer_pitch(&self, buffer: &Self::Buffer) -> u32;
    fn register_framebuffer(&self, buffer: &Self::Buffer, depth: u32, bpp: u32)
        -> io::Result<u32>;
    fn map_buffer<'a>(&'a self, buffer: &'a mut Self::Buffer) -> io::Result<Self::Mapping<'a>>;

    fn commit(&self, flags: CommitFlags, transaction: &AtomicTransaction) -> io::Result<()>;
}

// =============================================================================
// Card
// =============================================================================

/// An opened DRM primary node.
#[derive(Debug)]
pub struct Card {
    file: File,
    path: PathBuf,
}

impl AsFd for Card {
    fn as_fd(&self) -> BorrowedFd<'_> {
        self.file.as_fd()
    }
}

impl drm::Device for Card {}
impl control::Device for Card {}

impl Card {
    pub fn open(path: &Path) -> io::Result<Self> {
        let file = OpenOptions::new().read(true).write(true).open(path)?;
        debug!("opened DRM device {path:?}");
        Ok(Self {
            file,
            path: path.to_owned(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn crtc_mask(res: &ResourceHandles, filter: CrtcListFilter) -> u32 {
        let allowed = res.filter_crtcs(filter);
        res.crtcs()
            .iter()
            .enumerate()
            .filter(|(_, crtc)| allowed.contains(crtc))
            .fold(0, |mask, (idx, _)| mask | (1 << idx))
    }
}

/// Lists DRM primary nodes (`/dev/dri/card*`) in lexical order.
pub fn primary_node_candidates(dri: &Path) -> Vec<PathBuf> {
    let entries = match dri.read_dir() {
        Ok(entries) => entries,
        Err(err) => {
            warn!("error reading {dri:?}: {err:?}");
            return Vec::new();
        }
    };

    let mut nodes: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok())
        .filter(|entry| {
            entry
                .file_name()
                .to_str()
                .is_some_and(|name| name.starts_with("card"))
        })
        .map(|entry| entry.path())
        .collect();
    nodes.sort();
    nodes
}

fn handle<T: From<control::RawResourceHandle>>(id: u32) -> io::Result<T> {
    control::from_u32(id).ok_or_else(|| {
        io::Error::new(io::ErrorKind::InvalidInput, "object ID must be non-zero")
    })
}

fn blob_id(value: property::Value<'static>) -> io::Result<u64> {
    match value {
        property::Value::Blob(id) => Ok(id),
        other => Err(io::Error::other(format!(
            "kernel returned a non-blob value: {other:?}"
        ))),
    }
}

impl KmsDevice for Card {
    type Buffer = DumbBuffer;
    type Mapping<'a>
        = DumbMapping<'a>
    where
        Self: 'a;

    fn enable_capability(&self, cap: Capability) -> io::Result<()> {
        let cap = match cap {
            Capability::UniversalPlanes => ClientCapability::UniversalPlanes,
            Capability::Atomic => ClientCapability::Atomic,
        };
        self.set_client_capability(cap, true)
    }

    fn resources(&self) -> io::Result<Resources> {
        let res = self.resource_handles()?;
        Ok(Resources {
            connectors: res.connectors().iter().map(|&c| u32::from(c)).collect(),
            crtcs: res.crtcs().iter().map(|&c| u32::from(c)).collect(),
        })
    }

    fn connector(&self, id: u32) -> io::Result<ConnectorInfo> {
        let info = self.get_connector(handle::<connector::Handle>(id)?, true)?;
        Ok(ConnectorInfo {
            id,
            name: format!("{}-{}", info.interface().as_str(), info.interface_id()),
            connected: info.state() == connector::State::Connected,
            modes: info.modes().to_vec(),
            encoders: info.encoders().iter().map(|&e| u32::from(e)).collect(),
        })
    }

    fn encoder(&self, id: u32) -> io::Result<EncoderInfo> {
        let res = self.resource_handles()?;
        let info = self.get_encoder(handle(id)?)?;
        Ok(EncoderInfo {
            id,
            possible_crtcs: Self::crtc_mask(&res, info.possible_crtcs()),
        })
    }

    fn planes(&self) -> io::Result<Vec<u32>> {
        let planes = self.plane_handles()?;
        Ok(planes.into_iter().map(u32::from).collect())
    }

    fn plane(&self, id: u32) -> io::Result<PlaneInfo> {
        let res = self.resource_handles()?;
        let info = self.get_plane(handle::<plane::Handle>(id)?)?;
        Ok(PlaneInfo {
            id,
            possible_crtcs: Self::crtc_mask(&res, info.possible_crtcs()),
        })
    }

    fn object_properties(&self, object: DisplayObject) -> io::Result<Vec<(u32, u64)>> {
        let props = match object.kind {
            ObjectKind::Connector => self.get_properties(handle::<connector::Handle>(object.id)?)?,
            ObjectKind::Crtc => self.get_properties(handle::<crtc::Handle>(object.id)?)?,
            ObjectKind::Plane => self.get_properties(handle::<plane::Handle>(object.id)?)?,
        };

        let (ids, values) = props.as_props_and_values();
        Ok(ids
            .iter()
            .zip(values)
            .map(|(&id, &value)| (u32::from(id), value))
            .collect())
    }

    fn property_info(&self, id: u32) -> io::Result<PropertyInfo> {
        let info = self.get_property(handle::<property::Handle>(id)?)?;
        let name = info.name().to_string_lossy().into_owned();

        let enums = match info.value_type() {
            property::ValueType::Enum(values) => {
                let (_, entries) = values.values();
                entries
                    .iter()
                    .map(|e| (e.name().to_string_lossy().into_owned(), e.value()))
                    .collect()
            }
            _ => Vec::new(),
        };

        Ok(PropertyInfo { id, name, enums })
    }

    fn create_mode_blob(&self, mode: &Mode) -> io::Result<u64> {
        blob_id(self.create_property_blob(mode)?)
    }

    fn create_hdr_blob(&self, metadata: &HdrOutputMetadata) -> io::Result<u64> {
        blob_id(self.create_property_blob(metadata)?)
    }

    fn allocate_dumb_buffer(&self, width: u32, height: u32, bpp: u32) -> io::Result<DumbBuffer> {
        self.create_dumb_buffer((width, height), DrmFourcc::Xrgb8888, bpp)
    }

    fn buffer_pitch(&self, buffer: &DumbBuffer) -> u32 {
        buffer.pitch()
    }

    fn register_framebuffer(&self, buffer: &DumbBuffer, depth: u32, bpp: u32) -> io::Result<u32> {
        let fb = self.add_framebuffer(buffer, depth, bpp)?;
        Ok(u32::from(fb))
    }

    fn map_buffer<'a>(&'a self, buffer: &'a mut DumbBuffer) -> io::Result<DumbMapping<'a>> {
        self.map_dumb_buffer(buffer)
    }

    fn commit(&self, flags: CommitFlags, transaction: &AtomicTransaction) -> io::Result<()> {
        let mut req = AtomicModeReq::new();

        for write in transaction.writes() {
            let prop = handle::<property::Handle>(write.property.id)?;
            let value = property::Value::Unknown(write.value);
            let object = write.property.object;
            match object.kind {
                ObjectKind::Connector => {
                    req.add_property(handle::<connector::Handle>(object.id)?, prop, value)
                }
                ObjectKind::Crtc => req.add_property(handle::<crtc::Handle>(object.id)?, prop, value),
                ObjectKind::Plane => {
                    req.add_property(handle::<plane::Handle>(object.id)?, prop, value)
                }
            }
        }

        let mut drm_flags = AtomicCommitFlags::empty();
        if flags.contains(CommitFlags::ALLOW_MODESET) {
            drm_flags |= AtomicCommitFlags::ALLOW_MODESET;
        }
        if flags.contains(CommitFlags::NONBLOCK) {
            drm_flags |= AtomicCommitFlags::NONBLOCK;
        }

        self.atomic_commit(drm_flags, req)
    }
}
