//! Zero-copy multi-plane buffer descriptor.
//!
//! This is the one externally-visible structured payload of the crate:
//! its shape (per-plane fd/offset/stride/modifier up to a fixed plane
//! count, plus fourcc and orientation flags) must stay stable for
//! interoperability with the buffer-sharing transport that fills it in.

use std::os::unix::io::RawFd;

/// Maximum number of planes in a zero-copy buffer.
pub const DMABUF_MAX_PLANES: usize = 4;

/// Modifier value meaning "no explicit modifier was negotiated".
pub const MODIFIER_INVALID: u64 = 0x00ff_ffff_ffff_ffff;

bitflags::bitflags! {
    /// Orientation/layout bits carried by the descriptor.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct DmabufFlags: u32 {
        /// Rows are stored bottom-to-top relative to the compositor's
        /// convention.
        const Y_INVERT = 1 << 0;
        const INTERLACED = 1 << 1;
        const BOTTOM_FIRST = 1 << 2;
    }
}

/// Kernel-level buffer descriptor: one file descriptor, offset, stride,
/// and modifier per plane. The transport that produced the descriptor
/// keeps ownership of the file descriptors.
#[derive(Debug, Clone)]
pub struct DmabufAttributes {
    pub width: u32,
    pub height: u32,
    /// Raw DRM fourcc of the buffer contents.
    pub format: u32,
    pub flags: DmabufFlags,
    pub n_planes: usize,
    pub fds: [RawFd; DMABUF_MAX_PLANES],
    pub offsets: [u32; DMABUF_MAX_PLANES],
    pub strides: [u32; DMABUF_MAX_PLANES],
    pub modifiers: [u64; DMABUF_MAX_PLANES],
}

/// One plane of a [`DmabufAttributes`] descriptor.
#[derive(Debug, Clone, Copy)]
pub struct DmabufPlane {
    pub fd: RawFd,
    pub offset: u32,
    pub stride: u32,
    pub modifier: u64,
}

impl DmabufAttributes {
    /// Iterate over the populated planes.
    pub fn planes(&self) -> impl Iterator<Item = DmabufPlane> + '_ {
        (0..self.n_planes.min(DMABUF_MAX_PLANES)).map(|i| DmabufPlane {
            fd: self.fds[i],
            offset: self.offsets[i],
            stride: self.strides[i],
            modifier: self.modifiers[i],
        })
    }
}

impl Default for DmabufAttributes {
    fn default() -> Self {
        Self {
            width: 0,
            height: 0,
            format: 0,
            flags: DmabufFlags::empty(),
            n_planes: 0,
            fds: [-1; DMABUF_MAX_PLANES],
            offsets: [0; DMABUF_MAX_PLANES],
            strides: [0; DMABUF_MAX_PLANES],
            modifiers: [MODIFIER_INVALID; DMABUF_MAX_PLANES],
        }
    }
}
