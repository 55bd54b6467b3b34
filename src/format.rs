//! Static pixel format table.
//!
//! Maps a DRM fourcc to the native GL upload parameters used by the
//! CPU-pixel import path. Lookups on an unknown fourcc fail explicitly;
//! nothing in this module defaults.

use drm_fourcc::DrmFourcc;
use gl::types::GLenum;

/// Upload parameters for one supported pixel format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GlesPixelFormat {
    pub drm_format: DrmFourcc,
    /// Bytes per pixel. All table entries are single-plane packed formats.
    pub bpp: u32,
    /// GL format passed as both internal format and transfer format,
    /// GLES2-style.
    pub gl_format: GLenum,
    /// GL transfer type.
    pub gl_type: GLenum,
    /// Whether the format carries a usable alpha channel. Controls the
    /// compositor's opaque-surface shortcut downstream.
    pub has_alpha: bool,
}

const FORMATS: &[GlesPixelFormat] = &[
    GlesPixelFormat {
        drm_format: DrmFourcc::Argb8888,
        bpp: 4,
        gl_format: gl::BGRA,
        gl_type: gl::UNSIGNED_BYTE,
        has_alpha: true,
    },
    GlesPixelFormat {
        drm_format: DrmFourcc::Xrgb8888,
        bpp: 4,
        gl_format: gl::BGRA,
        gl_type: gl::UNSIGNED_BYTE,
        has_alpha: false,
    },
    GlesPixelFormat {
        drm_format: DrmFourcc::Abgr8888,
        bpp: 4,
        gl_format: gl::RGBA,
        gl_type: gl::UNSIGNED_BYTE,
        has_alpha: true,
    },
    GlesPixelFormat {
        drm_format: DrmFourcc::Xbgr8888,
        bpp: 4,
        gl_format: gl::RGBA,
        gl_type: gl::UNSIGNED_BYTE,
        has_alpha: false,
    },
    GlesPixelFormat {
        drm_format: DrmFourcc::Rgba8888,
        bpp: 4,
        gl_format: gl::RGBA,
        gl_type: gl::UNSIGNED_INT_8_8_8_8,
        has_alpha: true,
    },
    GlesPixelFormat {
        drm_format: DrmFourcc::Rgbx8888,
        bpp: 4,
        gl_format: gl::RGBA,
        gl_type: gl::UNSIGNED_INT_8_8_8_8,
        has_alpha: false,
    },
    GlesPixelFormat {
        drm_format: DrmFourcc::Bgra8888,
        bpp: 4,
        gl_format: gl::BGRA,
        gl_type: gl::UNSIGNED_INT_8_8_8_8,
        has_alpha: true,
    },
    GlesPixelFormat {
        drm_format: DrmFourcc::Bgrx8888,
        bpp: 4,
        gl_format: gl::BGRA,
        gl_type: gl::UNSIGNED_INT_8_8_8_8,
        has_alpha: false,
    },
];

/// Look up the upload parameters for `format`, or `None` if the format
/// is not supported by the pixel upload path.
pub fn gles_format_from_drm(format: DrmFourcc) -> Option<&'static GlesPixelFormat> {
    FORMATS.iter().find(|fmt| fmt.drm_format == format)
}

/// All formats accepted by [`gles_format_from_drm`].
pub fn supported_formats() -> impl Iterator<Item = DrmFourcc> {
    FORMATS.iter().map(|fmt| fmt.drm_format)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_formats_resolve() {
        for fourcc in [
            DrmFourcc::Argb8888,
            DrmFourcc::Xrgb8888,
            DrmFourcc::Abgr8888,
            DrmFourcc::Xbgr8888,
            DrmFourcc::Rgba8888,
        ] {
            let fmt = gles_format_from_drm(fourcc).unwrap();
            assert_eq!(fmt.drm_format, fourcc);
            assert_eq!(fmt.bpp, 4);
        }
    }

    #[test]
    fn unknown_format_fails_lookup() {
        assert!(gles_format_from_drm(DrmFourcc::Nv12).is_none());
        assert!(gles_format_from_drm(DrmFourcc::Yuyv).is_none());
    }

    #[test]
    fn alpha_matches_fourcc_layout() {
        assert!(gles_format_from_drm(DrmFourcc::Argb8888).unwrap().has_alpha);
        assert!(!gles_format_from_drm(DrmFourcc::Xrgb8888).unwrap().has_alpha);
        assert!(gles_format_from_drm(DrmFourcc::Bgra8888).unwrap().has_alpha);
        assert!(!gles_format_from_drm(DrmFourcc::Rgbx8888).unwrap().has_alpha);
    }

    #[test]
    fn advertised_formats_all_resolve() {
        let mut count = 0;
        for fourcc in supported_formats() {
            let fmt = gles_format_from_drm(fourcc).unwrap();
            assert_eq!(fmt.drm_format, fourcc);
            count += 1;
        }
        assert_eq!(count, FORMATS.len());
    }

    #[test]
    fn every_format_id_is_unique() {
        for (i, a) in FORMATS.iter().enumerate() {
            for b in &FORMATS[i + 1..] {
                assert_ne!(a.drm_format, b.drm_format);
            }
        }
    }
}
