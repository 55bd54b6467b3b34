//! Bookkeeping stub driver for integration tests.
//!
//! Tracks live GPU resources, the currently bound context, and debug
//! scope depth so tests can assert the renderer's context and cleanup
//! protocol. Every GPU-facing method asserts that the stub's own
//! context is current, which catches any operation issued outside a
//! context guard.

#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::ffi::c_void;
use std::rc::Rc;

use gl::types::GLuint;
use gles_interop::{
    Capabilities, DmabufAttributes, DmabufImage, Driver, DriverError, DriverImage,
    GlesPixelFormat, SavedContext, SharedBufferImage, SharedBufferRef, TextureTarget, WriteRegion,
};

/// Context token representing the stub driver's own context.
pub const STUB_CONTEXT: usize = 0xE61;
/// Context token representing the embedding caller's context.
pub const CALLER_CONTEXT: usize = 0xCA11;

/// One recorded upload (full or sub-rectangle).
#[derive(Debug, Clone)]
pub struct Upload {
    pub tex: GLuint,
    pub row_length: u32,
    pub width: u32,
    pub height: u32,
    pub src_x: u32,
    pub src_y: u32,
    pub dst_x: u32,
    pub dst_y: u32,
    pub bytes: usize,
}

pub struct StubDriver {
    pub caps: Cell<Capabilities>,
    /// Ambient context token; mutated by make_current/restore_context.
    pub current: Cell<usize>,
    pub saves: Cell<u32>,
    pub restores: Cell<u32>,
    pub debug_depth: Cell<i32>,
    pub textures_alive: Cell<u32>,
    pub images_alive: Cell<u32>,
    pub images_destroyed: Cell<u32>,
    pub textures_deleted: Cell<u32>,
    next_tex: Cell<GLuint>,
    next_image: Cell<usize>,
    pub fail_gen_texture: Cell<bool>,
    pub fail_image_create: Cell<bool>,
    /// EGL format token reported for shared-buffer images.
    pub shared_buffer_format: Cell<u32>,
    pub shared_buffer_inverted_y: Cell<bool>,
    pub dmabuf_external_only: Cell<bool>,
    pub uploads: RefCell<Vec<Upload>>,
    pub bound_images: RefCell<Vec<(GLuint, TextureTarget)>>,
}

/// Route library tracing through the test harness. Safe to call from
/// every test; only the first call installs the subscriber.
fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

impl StubDriver {
    pub fn new() -> Rc<Self> {
        Self::with_caps(Capabilities::all())
    }

    pub fn with_caps(caps: Capabilities) -> Rc<Self> {
        init_tracing();
        Rc::new(Self {
            caps: Cell::new(caps),
            current: Cell::new(CALLER_CONTEXT),
            saves: Cell::new(0),
            restores: Cell::new(0),
            debug_depth: Cell::new(0),
            textures_alive: Cell::new(0),
            images_alive: Cell::new(0),
            images_destroyed: Cell::new(0),
            textures_deleted: Cell::new(0),
            next_tex: Cell::new(1),
            next_image: Cell::new(0x1000),
            fail_gen_texture: Cell::new(false),
            fail_image_create: Cell::new(false),
            shared_buffer_format: Cell::new(gles_interop::driver::TEXTURE_RGBA),
            shared_buffer_inverted_y: Cell::new(false),
            dmabuf_external_only: Cell::new(false),
            uploads: RefCell::new(Vec::new()),
            bound_images: RefCell::new(Vec::new()),
        })
    }

    fn assert_own_context(&self, what: &str) {
        assert_eq!(
            self.current.get(),
            STUB_CONTEXT,
            "{what} issued without the driver context current"
        );
    }

    fn alloc_image(&self) -> DriverImage {
        let token = self.next_image.get();
        self.next_image.set(token + 1);
        self.images_alive.set(self.images_alive.get() + 1);
        DriverImage(token as *mut c_void)
    }
}

impl Driver for StubDriver {
    fn capabilities(&self) -> Capabilities {
        self.caps.get()
    }

    fn save_context(&self) -> SavedContext {
        self.saves.set(self.saves.get() + 1);
        SavedContext {
            display: self.current.get() as *mut c_void,
            draw_surface: std::ptr::null_mut(),
            read_surface: std::ptr::null_mut(),
            context: self.current.get() as *mut c_void,
        }
    }

    fn make_current(&self) {
        self.current.set(STUB_CONTEXT);
    }

    fn restore_context(&self, saved: SavedContext) {
        self.restores.set(self.restores.get() + 1);
        self.current.set(saved.context as usize);
    }

    fn push_debug(&self, _label: &str) {
        self.debug_depth.set(self.debug_depth.get() + 1);
    }

    fn pop_debug(&self) {
        let depth = self.debug_depth.get() - 1;
        assert!(depth >= 0, "debug scope pop without matching push");
        self.debug_depth.set(depth);
    }

    fn gen_texture(&self) -> Result<GLuint, DriverError> {
        self.assert_own_context("gen_texture");
        if self.fail_gen_texture.get() {
            return Err(DriverError("stub: out of texture names".into()));
        }
        let tex = self.next_tex.get();
        self.next_tex.set(tex + 1);
        self.textures_alive.set(self.textures_alive.get() + 1);
        Ok(tex)
    }

    fn delete_texture(&self, tex: GLuint) {
        self.assert_own_context("delete_texture");
        if tex == 0 {
            return;
        }
        assert!(
            self.textures_alive.get() > 0,
            "delete_texture on already-freed name"
        );
        self.textures_alive.set(self.textures_alive.get() - 1);
        self.textures_deleted.set(self.textures_deleted.get() + 1);
    }

    fn tex_image_2d(
        &self,
        tex: GLuint,
        _fmt: &GlesPixelFormat,
        width: u32,
        height: u32,
        row_length: u32,
        data: &[u8],
    ) {
        self.assert_own_context("tex_image_2d");
        self.uploads.borrow_mut().push(Upload {
            tex,
            row_length,
            width,
            height,
            src_x: 0,
            src_y: 0,
            dst_x: 0,
            dst_y: 0,
            bytes: data.len(),
        });
    }

    fn tex_sub_image_2d(
        &self,
        tex: GLuint,
        _fmt: &GlesPixelFormat,
        region: &WriteRegion,
        data: &[u8],
    ) {
        self.assert_own_context("tex_sub_image_2d");
        self.uploads.borrow_mut().push(Upload {
            tex,
            row_length: region.row_length,
            width: region.width,
            height: region.height,
            src_x: region.src_x,
            src_y: region.src_y,
            dst_x: region.dst_x,
            dst_y: region.dst_y,
            bytes: data.len(),
        });
    }

    fn bind_image(&self, tex: GLuint, target: TextureTarget, _image: &DriverImage) {
        self.assert_own_context("bind_image");
        self.bound_images.borrow_mut().push((tex, target));
    }

    fn create_image_from_shared_buffer(
        &self,
        _buffer: SharedBufferRef,
    ) -> Result<SharedBufferImage, DriverError> {
        self.assert_own_context("create_image_from_shared_buffer");
        if self.fail_image_create.get() {
            return Err(DriverError("stub: image creation failed".into()));
        }
        Ok(SharedBufferImage {
            image: self.alloc_image(),
            format: self.shared_buffer_format.get(),
            width: 64,
            height: 32,
            inverted_y: self.shared_buffer_inverted_y.get(),
        })
    }

    fn create_image_from_dmabuf(
        &self,
        _attributes: &DmabufAttributes,
    ) -> Result<DmabufImage, DriverError> {
        self.assert_own_context("create_image_from_dmabuf");
        if self.fail_image_create.get() {
            return Err(DriverError("stub: image creation failed".into()));
        }
        Ok(DmabufImage {
            image: self.alloc_image(),
            external_only: self.dmabuf_external_only.get(),
        })
    }

    fn destroy_image(&self, image: DriverImage) {
        self.assert_own_context("destroy_image");
        assert!(!image.0.is_null(), "destroy_image on null image");
        assert!(
            self.images_alive.get() > 0,
            "destroy_image on already-freed image"
        );
        self.images_alive.set(self.images_alive.get() - 1);
        self.images_destroyed.set(self.images_destroyed.get() + 1);
    }
}

/// Run `f` with the caller's context bound and assert the renderer put
/// it back, with balanced debug scopes, regardless of outcome.
pub fn with_caller_context<R>(stub: &StubDriver, f: impl FnOnce() -> R) -> R {
    stub.current.set(CALLER_CONTEXT);
    let result = f();
    assert_eq!(
        stub.current.get(),
        CALLER_CONTEXT,
        "caller context not restored"
    );
    assert_eq!(stub.debug_depth.get(), 0, "unbalanced debug scopes");
    result
}

/// A dmabuf descriptor that looks like a single-plane linear buffer.
pub fn linear_dmabuf(width: u32, height: u32) -> DmabufAttributes {
    let mut attributes = DmabufAttributes {
        width,
        height,
        format: drm_fourcc::DrmFourcc::Argb8888 as u32,
        n_planes: 1,
        ..Default::default()
    };
    attributes.fds[0] = 5;
    attributes.strides[0] = width * 4;
    attributes.modifiers[0] = 0; // linear
    attributes
}
