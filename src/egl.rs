//! Production [`Driver`] binding over EGL + GLES2.
//!
//! Wraps an already-initialized EGL display/context pair handed in by
//! the display backend. EGL entry points come from `khronos-egl`
//! (dynamically loaded libEGL); the extension entry points the import
//! paths need are resolved individually through `eglGetProcAddress`,
//! and the capability flags fall out of which of them resolved.

use std::ffi::{c_char, c_void, CString};
use std::mem;
use std::ptr;

use gl::types::{GLenum, GLint, GLsizei, GLuint};
use khronos_egl as egl;
use tracing::{debug, error};

use crate::dmabuf::{DmabufAttributes, MODIFIER_INVALID};
use crate::driver::{
    Capabilities, DmabufImage, Driver, DriverError, DriverImage, SavedContext, SharedBufferImage,
    SharedBufferRef, WriteRegion,
};
use crate::format::GlesPixelFormat;
use crate::texture::TextureTarget;

type Instance = egl::DynamicInstance<egl::EGL1_4>;

// EGL extension tokens not exposed by khronos-egl.
const LINUX_DMA_BUF_EXT: GLenum = 0x3270;
const LINUX_DRM_FOURCC_EXT: i32 = 0x3271;
const DMA_BUF_PLANE_FD_EXT: [i32; 4] = [0x3272, 0x3275, 0x3278, 0x3440];
const DMA_BUF_PLANE_OFFSET_EXT: [i32; 4] = [0x3273, 0x3276, 0x3279, 0x3441];
const DMA_BUF_PLANE_PITCH_EXT: [i32; 4] = [0x3274, 0x3277, 0x327A, 0x3442];
const DMA_BUF_PLANE_MODIFIER_LO_EXT: [i32; 4] = [0x3443, 0x3445, 0x3447, 0x3449];
const DMA_BUF_PLANE_MODIFIER_HI_EXT: [i32; 4] = [0x3444, 0x3446, 0x3448, 0x344A];
const WAYLAND_BUFFER_WL: GLenum = 0x31D5;
const EGL_TEXTURE_FORMAT: i32 = 0x3080;
const WAYLAND_Y_INVERTED_WL: i32 = 0x31DB;

type EglCreateImageKhr = unsafe extern "system" fn(
    display: *mut c_void,
    context: *mut c_void,
    target: GLenum,
    buffer: *mut c_void,
    attrib_list: *const i32,
) -> *mut c_void;
type EglDestroyImageKhr = unsafe extern "system" fn(*mut c_void, *mut c_void) -> u32;
type EglQueryWaylandBufferWl =
    unsafe extern "system" fn(*mut c_void, *mut c_void, i32, *mut i32) -> u32;
type EglQueryDmabufModifiersExt =
    unsafe extern "system" fn(*mut c_void, i32, i32, *mut u64, *mut u32, *mut i32) -> u32;
type GlEglImageTargetTexture2dOes = unsafe extern "system" fn(GLenum, *mut c_void);
type GlPushDebugGroupKhr =
    unsafe extern "system" fn(GLenum, GLuint, GLsizei, *const c_char);
type GlPopDebugGroupKhr = unsafe extern "system" fn();

/// EGL/GLES2 driver bound to one display/context pair.
pub struct EglDriver {
    egl: Instance,
    display: egl::Display,
    context: egl::Context,
    caps: Capabilities,
    create_image: Option<EglCreateImageKhr>,
    destroy_image: Option<EglDestroyImageKhr>,
    query_wayland_buffer: Option<EglQueryWaylandBufferWl>,
    query_dmabuf_modifiers: Option<EglQueryDmabufModifiersExt>,
    image_target_texture: Option<GlEglImageTargetTexture2dOes>,
    push_debug_group: Option<GlPushDebugGroupKhr>,
    pop_debug_group: Option<GlPopDebugGroupKhr>,
}

impl EglDriver {
    /// Wrap a live EGL display and GLES2-compatible context.
    ///
    /// Loads libEGL, resolves the extension entry points, and loads the
    /// GL symbols through `eglGetProcAddress`.
    ///
    /// # Safety
    ///
    /// `display` must be an initialized `EGLDisplay` and `context` a
    /// GLES2 context created on it, both outliving the driver.
    pub unsafe fn from_handles(
        display: *mut c_void,
        context: *mut c_void,
    ) -> Result<Self, DriverError> {
        let egl = Instance::load_required()
            .map_err(|err| DriverError(format!("failed to load libEGL: {err}")))?;
        let display = egl::Display::from_ptr(display);
        let context = egl::Context::from_ptr(context);

        gl::load_with(|name| match egl.get_proc_address(name) {
            Some(addr) => addr as *const c_void,
            None => ptr::null(),
        });

        let extensions = egl
            .query_string(Some(display), egl::EXTENSIONS)
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        debug!("EGL extensions: {extensions}");
        let has_ext = |name: &str| extensions.split(' ').any(|ext| ext == name);

        let create_image = egl
            .get_proc_address("eglCreateImageKHR")
            .map(|f| mem::transmute::<extern "system" fn(), EglCreateImageKhr>(f));
        let destroy_image = egl
            .get_proc_address("eglDestroyImageKHR")
            .map(|f| mem::transmute::<extern "system" fn(), EglDestroyImageKhr>(f));
        let query_wayland_buffer = egl
            .get_proc_address("eglQueryWaylandBufferWL")
            .map(|f| mem::transmute::<extern "system" fn(), EglQueryWaylandBufferWl>(f));
        let query_dmabuf_modifiers = if has_ext("EGL_EXT_image_dma_buf_import_modifiers") {
            egl.get_proc_address("eglQueryDmaBufModifiersEXT")
                .map(|f| mem::transmute::<extern "system" fn(), EglQueryDmabufModifiersExt>(f))
        } else {
            None
        };
        let image_target_texture = egl
            .get_proc_address("glEGLImageTargetTexture2DOES")
            .map(|f| mem::transmute::<extern "system" fn(), GlEglImageTargetTexture2dOes>(f));
        let push_debug_group = egl
            .get_proc_address("glPushDebugGroupKHR")
            .map(|f| mem::transmute::<extern "system" fn(), GlPushDebugGroupKhr>(f));
        let pop_debug_group = egl
            .get_proc_address("glPopDebugGroupKHR")
            .map(|f| mem::transmute::<extern "system" fn(), GlPopDebugGroupKhr>(f));

        let mut caps = Capabilities::empty();
        if image_target_texture.is_some() {
            caps |= Capabilities::EXTERNAL_SAMPLING;
        }
        if create_image.is_some()
            && destroy_image.is_some()
            && has_ext("EGL_EXT_image_dma_buf_import")
        {
            caps |= Capabilities::DMABUF_IMPORT;
        }
        if create_image.is_some()
            && query_wayland_buffer.is_some()
            && has_ext("EGL_WL_bind_wayland_display")
        {
            caps |= Capabilities::SHARED_BUFFER_IMPORT;
        }
        debug!("driver capabilities: {caps:?}");

        Ok(Self {
            egl,
            display,
            context,
            caps,
            create_image,
            destroy_image,
            query_wayland_buffer,
            query_dmabuf_modifiers,
            image_target_texture,
            push_debug_group,
            pop_debug_group,
        })
    }

    /// Whether images created for (`format`, `modifier`) are restricted
    /// to external-only sampling. Conservatively true when the driver
    /// cannot be queried.
    fn dmabuf_external_only(&self, format: u32, modifier: u64) -> bool {
        let Some(query) = self.query_dmabuf_modifiers else {
            return true;
        };
        let dpy = self.display.as_ptr();
        let mut num: i32 = 0;
        let ok = unsafe {
            query(
                dpy,
                format as i32,
                0,
                ptr::null_mut(),
                ptr::null_mut(),
                &mut num,
            )
        };
        if ok == 0 || num <= 0 {
            return true;
        }
        let count = num as usize;
        let mut modifiers = vec![0u64; count];
        let mut external = vec![0u32; count];
        let ok = unsafe {
            query(
                dpy,
                format as i32,
                num,
                modifiers.as_mut_ptr(),
                external.as_mut_ptr(),
                &mut num,
            )
        };
        if ok == 0 {
            return true;
        }
        modifiers
            .iter()
            .zip(&external)
            .find(|(m, _)| **m == modifier)
            .map_or(true, |(_, ext)| *ext != 0)
    }
}

impl Driver for EglDriver {
    fn capabilities(&self) -> Capabilities {
        self.caps
    }

    fn save_context(&self) -> SavedContext {
        SavedContext {
            display: self
                .egl
                .get_current_display()
                .map_or(ptr::null_mut(), |d| d.as_ptr()),
            draw_surface: self
                .egl
                .get_current_surface(egl::DRAW)
                .map_or(ptr::null_mut(), |s| s.as_ptr()),
            read_surface: self
                .egl
                .get_current_surface(egl::READ)
                .map_or(ptr::null_mut(), |s| s.as_ptr()),
            context: self
                .egl
                .get_current_context()
                .map_or(ptr::null_mut(), |c| c.as_ptr()),
        }
    }

    fn make_current(&self) {
        // Surfaceless bind; imports never draw to a surface.
        if let Err(err) = self
            .egl
            .make_current(self.display, None, None, Some(self.context))
        {
            error!("eglMakeCurrent failed: {err}");
        }
    }

    fn restore_context(&self, saved: SavedContext) {
        if saved.display.is_null() {
            // Nothing was current before; release ours.
            if let Err(err) = self.egl.make_current(self.display, None, None, None) {
                error!("failed to release context: {err}");
            }
            return;
        }
        unsafe {
            let display = egl::Display::from_ptr(saved.display);
            let draw = (!saved.draw_surface.is_null())
                .then(|| egl::Surface::from_ptr(saved.draw_surface));
            let read = (!saved.read_surface.is_null())
                .then(|| egl::Surface::from_ptr(saved.read_surface));
            let context =
                (!saved.context.is_null()).then(|| egl::Context::from_ptr(saved.context));
            if let Err(err) = self.egl.make_current(display, draw, read, context) {
                error!("failed to restore caller context: {err}");
            }
        }
    }

    fn push_debug(&self, label: &str) {
        let Some(push) = self.push_debug_group else {
            return;
        };
        let Ok(msg) = CString::new(label) else {
            return;
        };
        unsafe { push(gl::DEBUG_SOURCE_APPLICATION, 1, -1, msg.as_ptr()) };
    }

    fn pop_debug(&self) {
        if let Some(pop) = self.pop_debug_group {
            unsafe { pop() };
        }
    }

    fn gen_texture(&self) -> Result<GLuint, DriverError> {
        let mut tex: GLuint = 0;
        unsafe { gl::GenTextures(1, &mut tex) };
        if tex == 0 {
            return Err(DriverError("glGenTextures returned no name".into()));
        }
        Ok(tex)
    }

    fn delete_texture(&self, tex: GLuint) {
        if tex != 0 {
            unsafe { gl::DeleteTextures(1, &tex) };
        }
    }

    fn tex_image_2d(
        &self,
        tex: GLuint,
        fmt: &GlesPixelFormat,
        width: u32,
        height: u32,
        row_length: u32,
        data: &[u8],
    ) {
        unsafe {
            gl::BindTexture(gl::TEXTURE_2D, tex);
            gl::TexParameteri(gl::TEXTURE_2D, gl::TEXTURE_WRAP_S, gl::CLAMP_TO_EDGE as GLint);
            gl::TexParameteri(gl::TEXTURE_2D, gl::TEXTURE_WRAP_T, gl::CLAMP_TO_EDGE as GLint);
            gl::PixelStorei(gl::UNPACK_ROW_LENGTH, row_length as GLint);
            gl::TexImage2D(
                gl::TEXTURE_2D,
                0,
                fmt.gl_format as GLint,
                width as GLint,
                height as GLint,
                0,
                fmt.gl_format,
                fmt.gl_type,
                data.as_ptr() as *const c_void,
            );
            gl::PixelStorei(gl::UNPACK_ROW_LENGTH, 0);
            gl::BindTexture(gl::TEXTURE_2D, 0);
        }
    }

    fn tex_sub_image_2d(
        &self,
        tex: GLuint,
        fmt: &GlesPixelFormat,
        region: &WriteRegion,
        data: &[u8],
    ) {
        unsafe {
            gl::BindTexture(gl::TEXTURE_2D, tex);
            gl::PixelStorei(gl::UNPACK_ROW_LENGTH, region.row_length as GLint);
            gl::PixelStorei(gl::UNPACK_SKIP_PIXELS, region.src_x as GLint);
            gl::PixelStorei(gl::UNPACK_SKIP_ROWS, region.src_y as GLint);
            gl::TexSubImage2D(
                gl::TEXTURE_2D,
                0,
                region.dst_x as GLint,
                region.dst_y as GLint,
                region.width as GLint,
                region.height as GLint,
                fmt.gl_format,
                fmt.gl_type,
                data.as_ptr() as *const c_void,
            );
            gl::PixelStorei(gl::UNPACK_ROW_LENGTH, 0);
            gl::PixelStorei(gl::UNPACK_SKIP_PIXELS, 0);
            gl::PixelStorei(gl::UNPACK_SKIP_ROWS, 0);
            gl::BindTexture(gl::TEXTURE_2D, 0);
        }
    }

    fn bind_image(&self, tex: GLuint, target: TextureTarget, image: &DriverImage) {
        let Some(image_target_texture) = self.image_target_texture else {
            return;
        };
        let gl_target = target.gl_target();
        unsafe {
            gl::BindTexture(gl_target, tex);
            gl::TexParameteri(gl_target, gl::TEXTURE_WRAP_S, gl::CLAMP_TO_EDGE as GLint);
            gl::TexParameteri(gl_target, gl::TEXTURE_WRAP_T, gl::CLAMP_TO_EDGE as GLint);
            image_target_texture(gl_target, image.0);
            gl::BindTexture(gl_target, 0);
        }
    }

    fn create_image_from_shared_buffer(
        &self,
        buffer: SharedBufferRef,
    ) -> Result<SharedBufferImage, DriverError> {
        let (Some(create_image), Some(query_buffer)) =
            (self.create_image, self.query_wayland_buffer)
        else {
            return Err(DriverError(
                "EGL_WL_bind_wayland_display not available".into(),
            ));
        };
        let dpy = self.display.as_ptr();

        let mut format: i32 = 0;
        if unsafe { query_buffer(dpy, buffer.0, EGL_TEXTURE_FORMAT, &mut format) } == 0 {
            return Err(DriverError("buffer is not an EGL wayland buffer".into()));
        }
        let mut width: i32 = 0;
        let mut height: i32 = 0;
        unsafe {
            query_buffer(dpy, buffer.0, egl::WIDTH, &mut width);
            query_buffer(dpy, buffer.0, egl::HEIGHT, &mut height);
        }
        // Not queryable on all drivers; bottom-to-top is the protocol
        // default.
        let mut y_inverted: i32 = 1;
        let inverted_y =
            unsafe { query_buffer(dpy, buffer.0, WAYLAND_Y_INVERTED_WL, &mut y_inverted) } == 0
                || y_inverted != 0;

        let attribs: [i32; 1] = [egl::NONE];
        let image = unsafe {
            create_image(
                dpy,
                self.context.as_ptr(),
                WAYLAND_BUFFER_WL,
                buffer.0,
                attribs.as_ptr(),
            )
        };
        if image.is_null() {
            return Err(DriverError(
                "eglCreateImageKHR failed for wayland buffer".into(),
            ));
        }

        Ok(SharedBufferImage {
            image: DriverImage(image),
            format: format as u32,
            width: width as u32,
            height: height as u32,
            inverted_y,
        })
    }

    fn create_image_from_dmabuf(
        &self,
        attributes: &DmabufAttributes,
    ) -> Result<DmabufImage, DriverError> {
        let Some(create_image) = self.create_image else {
            return Err(DriverError("EGL_KHR_image_base not available".into()));
        };
        if attributes.n_planes == 0 {
            return Err(DriverError("dmabuf descriptor has no planes".into()));
        }

        let mut attribs: Vec<i32> = vec![
            egl::WIDTH,
            attributes.width as i32,
            egl::HEIGHT,
            attributes.height as i32,
            LINUX_DRM_FOURCC_EXT,
            attributes.format as i32,
        ];
        for (i, plane) in attributes.planes().enumerate() {
            attribs.extend_from_slice(&[
                DMA_BUF_PLANE_FD_EXT[i],
                plane.fd,
                DMA_BUF_PLANE_OFFSET_EXT[i],
                plane.offset as i32,
                DMA_BUF_PLANE_PITCH_EXT[i],
                plane.stride as i32,
            ]);
            if self.query_dmabuf_modifiers.is_some() && plane.modifier != MODIFIER_INVALID {
                attribs.extend_from_slice(&[
                    DMA_BUF_PLANE_MODIFIER_LO_EXT[i],
                    (plane.modifier & 0xFFFF_FFFF) as i32,
                    DMA_BUF_PLANE_MODIFIER_HI_EXT[i],
                    (plane.modifier >> 32) as i32,
                ]);
            }
        }
        attribs.push(egl::NONE);

        // Per EGL_EXT_image_dma_buf_import the context must be
        // EGL_NO_CONTEXT and the client buffer NULL.
        let image = unsafe {
            create_image(
                self.display.as_ptr(),
                ptr::null_mut(),
                LINUX_DMA_BUF_EXT,
                ptr::null_mut(),
                attribs.as_ptr(),
            )
        };
        if image.is_null() {
            return Err(DriverError("eglCreateImageKHR failed for dmabuf".into()));
        }

        let external_only =
            self.dmabuf_external_only(attributes.format, attributes.modifiers[0]);

        Ok(DmabufImage {
            image: DriverImage(image),
            external_only,
        })
    }

    fn destroy_image(&self, image: DriverImage) {
        if image.0.is_null() {
            return;
        }
        if let Some(destroy) = self.destroy_image {
            unsafe { destroy(self.display.as_ptr(), image.0) };
        }
    }
}
