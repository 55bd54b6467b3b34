//! The three texture import entry points.
//!
//! Every entry point follows the same shape: validate what can be
//! validated up front, acquire the context guard, create GPU resources
//! inside a debug scope, and hand back an owning [`GlesTexture`]. Any
//! failure after partial allocation cleans up everything allocated so
//! far before the guard restores the caller's context.

use std::rc::Rc;

use drm_fourcc::DrmFourcc;
use tracing::{debug, error};

use crate::context::{ContextGuard, DebugScope};
use crate::dmabuf::{DmabufAttributes, DmabufFlags};
use crate::driver::{
    self, Capabilities, DmabufImage, Driver, SharedBufferImage, SharedBufferRef,
};
use crate::error::GlesError;
use crate::format::gles_format_from_drm;
use crate::texture::{check_stride, GlesTexture, TextureTarget};

/// Texture importer bound to one driver context.
pub struct GlesRenderer {
    driver: Rc<dyn Driver>,
}

impl GlesRenderer {
    /// Wrap a live, initialized driver. The driver's context must not be
    /// current when entry points are called; they bind and unbind it
    /// themselves.
    pub fn new(driver: Rc<dyn Driver>) -> Self {
        Self { driver }
    }

    /// Optional import paths supported by the underlying driver.
    pub fn capabilities(&self) -> Capabilities {
        self.driver.capabilities()
    }

    /// Copy caller-supplied CPU memory into a newly allocated, mutable
    /// 2D texture. `stride` is in bytes and may exceed the packed row
    /// size; the upload honors it independently of `width`.
    pub fn texture_from_pixels(
        &self,
        format: DrmFourcc,
        stride: u32,
        width: u32,
        height: u32,
        data: &[u8],
    ) -> Result<GlesTexture, GlesError> {
        let fmt = gles_format_from_drm(format).ok_or_else(|| {
            error!("unsupported pixel format {:?}", format);
            GlesError::UnsupportedFormat(format)
        })?;
        check_stride(fmt, stride, width)?;

        let _ctx = ContextGuard::new(&*self.driver);
        let _debug = DebugScope::new(&*self.driver, "texture_from_pixels");

        let tex = self
            .driver
            .gen_texture()
            .map_err(|err| GlesError::AllocationFailed(err.0))?;
        self.driver
            .tex_image_2d(tex, fmt, width, height, stride / fmt.bpp, data);

        Ok(GlesTexture {
            driver: self.driver.clone(),
            tex,
            target: TextureTarget::TwoD,
            width,
            height,
            drm_format: Some(format),
            has_alpha: fmt.has_alpha,
            inverted_y: false,
            image: None,
        })
    }

    /// Wrap a client-visible shared buffer handle by creating a driver
    /// image from it and binding that to a texture. Format, size, and
    /// orientation are discovered from the driver, not the caller.
    ///
    /// Returns `Ok(None)` when the driver lacks the required extensions;
    /// this path is optional per-driver.
    pub fn texture_from_shared_buffer(
        &self,
        buffer: SharedBufferRef,
    ) -> Result<Option<GlesTexture>, GlesError> {
        let caps = self.driver.capabilities();
        if !caps.contains(Capabilities::EXTERNAL_SAMPLING | Capabilities::SHARED_BUFFER_IMPORT) {
            debug!("shared-buffer import unavailable: {:?}", caps);
            return Ok(None);
        }

        let _ctx = ContextGuard::new(&*self.driver);

        let SharedBufferImage {
            image,
            format,
            width,
            height,
            inverted_y,
        } = self
            .driver
            .create_image_from_shared_buffer(buffer)
            .map_err(|err| {
                error!("failed to create driver image from shared buffer: {err}");
                GlesError::ImportFailed(err.0)
            })?;

        // An unclassifiable discovered format is a driver/client contract
        // violation, not a capability gap.
        let (target, has_alpha) = match format {
            driver::TEXTURE_RGB => (TextureTarget::TwoD, false),
            driver::TEXTURE_RGBA | driver::TEXTURE_EXTERNAL_WL => (TextureTarget::External, true),
            other => {
                error!("invalid or unsupported shared-buffer format {other:#x}");
                self.driver.destroy_image(image);
                return Err(GlesError::InvalidBufferFormat(other));
            }
        };

        let tex = match self.driver.gen_texture() {
            Ok(tex) => tex,
            Err(err) => {
                self.driver.destroy_image(image);
                return Err(GlesError::AllocationFailed(err.0));
            }
        };

        let _debug = DebugScope::new(&*self.driver, "texture_from_shared_buffer");
        self.driver.bind_image(tex, target, &image);

        Ok(Some(GlesTexture {
            driver: self.driver.clone(),
            tex,
            target,
            width,
            height,
            // Externally sourced; re-upload is never supported.
            drm_format: None,
            has_alpha,
            inverted_y,
            image: Some(image),
        }))
    }

    /// Wrap a zero-copy multi-plane buffer descriptor by creating a
    /// driver image directly from it.
    ///
    /// Returns `Ok(None)` when the driver lacks zero-copy import or
    /// external-image binding.
    pub fn texture_from_dmabuf(
        &self,
        attributes: &DmabufAttributes,
    ) -> Result<Option<GlesTexture>, GlesError> {
        let caps = self.driver.capabilities();
        if !caps.contains(Capabilities::EXTERNAL_SAMPLING | Capabilities::DMABUF_IMPORT) {
            debug!("dmabuf import unavailable: {:?}", caps);
            return Ok(None);
        }

        let _ctx = ContextGuard::new(&*self.driver);

        let DmabufImage {
            image,
            external_only,
        } = self
            .driver
            .create_image_from_dmabuf(attributes)
            .map_err(|err| {
                error!("failed to create driver image from dmabuf: {err}");
                GlesError::ImportFailed(err.0)
            })?;

        let target = if external_only {
            TextureTarget::External
        } else {
            TextureTarget::TwoD
        };

        let tex = match self.driver.gen_texture() {
            Ok(tex) => tex,
            Err(err) => {
                self.driver.destroy_image(image);
                return Err(GlesError::AllocationFailed(err.0));
            }
        };

        let _debug = DebugScope::new(&*self.driver, "texture_from_dmabuf");
        self.driver.bind_image(tex, target, &image);

        Ok(Some(GlesTexture {
            driver: self.driver.clone(),
            tex,
            target,
            width: attributes.width,
            height: attributes.height,
            drm_format: None,
            // The format's own alpha channel, if any, is left to the
            // sampler; zero-copy imports are treated as blended.
            has_alpha: true,
            inverted_y: attributes.flags.contains(DmabufFlags::Y_INVERT),
            image: Some(image),
        }))
    }
}
