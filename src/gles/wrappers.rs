/*
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */
//! Wrappers for desktop entry points whose semantics differ on ES.
//!
//! Most of these fall into one of three patterns:
//! - State the ES driver can't hold for us (polygon mode, provoking vertex,
//!   clip control, depth clamp) is shadowed here and answered from the
//!   shadow in `glGetIntegerv`.
//! - Tokens that are meaningless or always-on in ES are filtered out of
//!   `glEnable`/`glDisable` before the driver sees them.
//! - Entry points ES lacks outright (`glGetTexImage`, `glTexImage1D`,
//!   `glDrawBuffer`, the desktop query targets) are rebuilt from ES
//!   primitives.
//!
//! The fixed-function matrix stack and client-array entry points are
//! accepted and ignored; callers are expected to drive vertex data via
//! buffers.

use super::gl46_raw as gl46; // constants only
use super::gles32_raw as gles32;
use super::gles32_raw::types::*;
use lazy_static::lazy_static;
use std::ffi::{c_void, CStr, CString};
use std::os::raw::c_double;
use std::sync::Mutex;

/// Desktop-only state the ES driver can't hold for us. Process-global, like
/// the GL state machine itself.
struct StateShadow {
    polygon_mode: GLenum,
    provoking_vertex: GLenum,
    clip_origin: GLenum,
    clip_depth: GLenum,
    depth_clamp: bool,
    resolution_scale: f32,
    fps_history: [f32; 60],
    fps_history_index: usize,
}

lazy_static! {
    static ref SHADOW: Mutex<StateShadow> = Mutex::new(StateShadow {
        polygon_mode: gl46::FILL,
        provoking_vertex: gl46::LAST_VERTEX_CONVENTION,
        clip_origin: gl46::LOWER_LEFT,
        clip_depth: gl46::NEGATIVE_ONE_TO_ONE,
        depth_clamp: false,
        resolution_scale: 1.0,
        fps_history: [0.0; 60],
        fps_history_index: 0,
    });
}

// Strings handed back to the hosted application. Tests and real callers
// alike compare these byte-for-byte.
static VERSION_STRING: &[u8] = b"4.6.0 PrismGL\0";
static GLSL_VERSION_STRING: &[u8] = b"4.60 PrismGL\0";
static VENDOR_STRING: &[u8] = b"PrismGL\0";
static EMPTY_STRING: &[u8] = b"\0";
/// Desktop extensions this layer emulates or that are native in ES 3.2.
static EXTENSIONS_STRING: &[u8] = b"GL_ARB_vertex_buffer_object \
GL_ARB_vertex_array_object \
GL_ARB_framebuffer_object \
GL_ARB_texture_non_power_of_two \
GL_ARB_shader_objects \
GL_ARB_vertex_shader \
GL_ARB_fragment_shader \
GL_ARB_uniform_buffer_object \
GL_ARB_explicit_attrib_location \
GL_ARB_texture_storage \
GL_ARB_instanced_arrays \
GL_ARB_draw_instanced \
GL_ARB_map_buffer_range \
GL_ARB_copy_buffer \
GL_ARB_sampler_objects \
GL_ARB_blend_func_extended \
GL_ARB_get_program_binary \
GL_ARB_separate_shader_objects \
GL_ARB_timer_query \
GL_ARB_occlusion_query \
GL_ARB_texture_float \
GL_ARB_depth_texture \
GL_ARB_shadow \
GL_EXT_texture_filter_anisotropic \
GL_EXT_framebuffer_blit \
GL_ARB_depth_clamp \
GL_ARB_seamless_cube_map \
GL_ARB_clip_control \
GL_ARB_conservative_depth \
GL_ARB_shader_texture_lod \
GL_ARB_texture_gather \
GL_ARB_gpu_shader5 \
GL_ARB_texture_swizzle\0";

lazy_static! {
    // Rebuilt on every GL_RENDERER query, like the C static buffer this
    // replaces; the pointer stays valid until the next query.
    static ref RENDERER_STRING: Mutex<CString> = Mutex::new(CString::default());
}

// ===== State management =====

pub unsafe extern "C" fn glPolygonMode(_face: GLenum, mode: GLenum) {
    SHADOW.lock().unwrap().polygon_mode = mode;
    if mode == gl46::LINE {
        log!("GL_LINE polygon mode requested - wireframe not natively supported in ES");
    }
}

pub unsafe extern "C" fn glClipControl(origin: GLenum, depth: GLenum) {
    let mut shadow = SHADOW.lock().unwrap();
    shadow.clip_origin = origin;
    shadow.clip_depth = depth;
    log_dbg!(
        "ClipControl({:#x}, {:#x}) - state stored for shader modification",
        origin,
        depth
    );
}

pub unsafe extern "C" fn glProvokingVertex(mode: GLenum) {
    SHADOW.lock().unwrap().provoking_vertex = mode;
    if mode == gl46::FIRST_VERTEX_CONVENTION {
        log!("FIRST_VERTEX_CONVENTION not supported in ES, using LAST");
    }
}

pub unsafe extern "C" fn glShadeModel(_mode: GLenum) {}

pub unsafe extern "C" fn glAlphaFunc(_func: GLenum, _ref: GLclampf) {}

pub unsafe extern "C" fn glEnable(cap: GLenum) {
    match cap {
        gl46::DEPTH_CLAMP => {
            SHADOW.lock().unwrap().depth_clamp = true;
            log_dbg!("Depth clamp enabled (emulated)");
        }
        // Always seamless in ES 3.2
        gl46::TEXTURE_CUBE_MAP_SEAMLESS => {}
        // Always on in ES
        gl46::PROGRAM_POINT_SIZE | gl46::POINT_SPRITE => {}
        // Not supported on all ES devices, silently ignore
        gl46::CLIP_DISTANCE0 | gl46::CLIP_DISTANCE1 | gl46::CLIP_DISTANCE2
        | gl46::CLIP_DISTANCE3 => {}
        // No 1D textures in ES
        gl46::TEXTURE_1D => {}
        _ => gles32::Enable(cap),
    }
}

pub unsafe extern "C" fn glDisable(cap: GLenum) {
    match cap {
        gl46::DEPTH_CLAMP => {
            SHADOW.lock().unwrap().depth_clamp = false;
        }
        gl46::TEXTURE_CUBE_MAP_SEAMLESS
        | gl46::PROGRAM_POINT_SIZE
        | gl46::POINT_SPRITE
        | gl46::CLIP_DISTANCE0
        | gl46::CLIP_DISTANCE1
        | gl46::CLIP_DISTANCE2
        | gl46::CLIP_DISTANCE3
        | gl46::TEXTURE_1D => {}
        _ => gles32::Disable(cap),
    }
}

pub unsafe extern "C" fn glGetIntegerv(pname: GLenum, params: *mut GLint) {
    if params.is_null() {
        return;
    }
    match pname {
        gl46::MAX_CLIP_DISTANCES => *params = 8,
        gl46::POLYGON_MODE => *params = SHADOW.lock().unwrap().polygon_mode as GLint,
        gl46::PROVOKING_VERTEX => *params = SHADOW.lock().unwrap().provoking_vertex as GLint,
        _ => gles32::GetIntegerv(pname, params),
    }
}

pub unsafe extern "C" fn glGetFloatv(pname: GLenum, params: *mut GLfloat) {
    if params.is_null() {
        return;
    }
    gles32::GetFloatv(pname, params)
}

pub unsafe extern "C" fn glGetString(name: GLenum) -> *const GLubyte {
    match name {
        gles32::VERSION => VERSION_STRING.as_ptr(),
        gles32::SHADING_LANGUAGE_VERSION => GLSL_VERSION_STRING.as_ptr(),
        gles32::VENDOR => VENDOR_STRING.as_ptr(),
        gles32::EXTENSIONS => EXTENSIONS_STRING.as_ptr(),
        gles32::RENDERER => {
            let driver_renderer = gles32::GetString(gles32::RENDERER);
            let combined = if driver_renderer.is_null() {
                "PrismGL".to_string()
            } else {
                format!(
                    "PrismGL ({})",
                    CStr::from_ptr(driver_renderer as *const _).to_string_lossy()
                )
            };
            let mut buffer = RENDERER_STRING.lock().unwrap();
            *buffer = CString::new(combined).unwrap_or_default();
            buffer.as_ptr() as *const GLubyte
        }
        _ => gles32::GetString(name),
    }
}

/// Indexed extension queries get an empty string for every index; callers
/// should use the flat `glGetString(GL_EXTENSIONS)` list.
pub unsafe extern "C" fn glGetStringi(_name: GLenum, _index: GLuint) -> *const GLubyte {
    EMPTY_STRING.as_ptr()
}

// ===== Textures =====

pub unsafe extern "C" fn glTexImage1D(
    _target: GLenum,
    level: GLint,
    internalformat: GLint,
    width: GLsizei,
    border: GLint,
    format: GLenum,
    type_: GLenum,
    pixels: *const c_void,
) {
    gles32::TexImage2D(
        gles32::TEXTURE_2D,
        level,
        internalformat,
        width,
        1,
        border,
        format,
        type_,
        pixels,
    );
}

/// `glGetTexImage` does not exist in ES: attach the texture level to a
/// scratch framebuffer and read it back with `glReadPixels`.
///
/// The read dimensions come from the current viewport rather than the
/// texture's mip-level size, which is a known fidelity gap; querying the
/// level parameters would be more correct.
pub unsafe extern "C" fn glGetTexImage(
    target: GLenum,
    level: GLint,
    format: GLenum,
    type_: GLenum,
    pixels: *mut c_void,
) {
    if pixels.is_null() {
        return;
    }

    let binding = match target {
        gles32::TEXTURE_2D => gles32::TEXTURE_BINDING_2D,
        gles32::TEXTURE_CUBE_MAP_POSITIVE_X
        | gles32::TEXTURE_CUBE_MAP_NEGATIVE_X
        | gles32::TEXTURE_CUBE_MAP_POSITIVE_Y
        | gles32::TEXTURE_CUBE_MAP_NEGATIVE_Y
        | gles32::TEXTURE_CUBE_MAP_POSITIVE_Z
        | gles32::TEXTURE_CUBE_MAP_NEGATIVE_Z => gles32::TEXTURE_BINDING_CUBE_MAP,
        _ => {
            log!("glGetTexImage: unsupported target {:#x}", target);
            return;
        }
    };

    let mut texture: GLint = 0;
    gles32::GetIntegerv(binding, &mut texture);
    if texture == 0 {
        log!("glGetTexImage: no texture bound");
        return;
    }

    let mut previous_framebuffer: GLint = 0;
    gles32::GetIntegerv(gles32::FRAMEBUFFER_BINDING, &mut previous_framebuffer);

    let mut framebuffer: GLuint = 0;
    gles32::GenFramebuffers(1, &mut framebuffer);
    gles32::BindFramebuffer(gles32::FRAMEBUFFER, framebuffer);
    let attachment_target = if target == gles32::TEXTURE_2D {
        gles32::TEXTURE_2D
    } else {
        target
    };
    gles32::FramebufferTexture2D(
        gles32::FRAMEBUFFER,
        gles32::COLOR_ATTACHMENT0,
        attachment_target,
        texture as GLuint,
        level,
    );

    let status = gles32::CheckFramebufferStatus(gles32::FRAMEBUFFER);
    if status == gles32::FRAMEBUFFER_COMPLETE {
        let mut viewport: [GLint; 4] = [0; 4];
        gles32::GetIntegerv(gles32::VIEWPORT, viewport.as_mut_ptr());
        gles32::ReadPixels(0, 0, viewport[2], viewport[3], format, type_, pixels);
    } else {
        log!("glGetTexImage: FBO incomplete ({:#x})", status);
    }

    gles32::BindFramebuffer(gles32::FRAMEBUFFER, previous_framebuffer as GLuint);
    gles32::DeleteFramebuffers(1, &framebuffer);
}

// ===== Framebuffer =====

fn default_framebuffer_buf(buf: GLenum) -> GLenum {
    match buf {
        gl46::FRONT | gl46::FRONT_LEFT | gl46::BACK_LEFT => gl46::BACK,
        _ => buf,
    }
}

pub unsafe extern "C" fn glDrawBuffer(buf: GLenum) {
    let bufs = [default_framebuffer_buf(buf)];
    gles32::DrawBuffers(1, bufs.as_ptr());
}

pub unsafe extern "C" fn glReadBuffer(buf: GLenum) {
    gles32::ReadBuffer(default_framebuffer_buf(buf));
}

// ===== Fixed-function matrix stack (no-ops) =====

pub unsafe extern "C" fn glPushMatrix() {}
pub unsafe extern "C" fn glPopMatrix() {}
pub unsafe extern "C" fn glLoadIdentity() {}
pub unsafe extern "C" fn glMatrixMode(_mode: GLenum) {}
pub unsafe extern "C" fn glOrtho(
    _left: c_double,
    _right: c_double,
    _bottom: c_double,
    _top: c_double,
    _near: c_double,
    _far: c_double,
) {
}
pub unsafe extern "C" fn glFrustum(
    _left: c_double,
    _right: c_double,
    _bottom: c_double,
    _top: c_double,
    _near: c_double,
    _far: c_double,
) {
}
pub unsafe extern "C" fn glTranslatef(_x: GLfloat, _y: GLfloat, _z: GLfloat) {}
pub unsafe extern "C" fn glRotatef(_angle: GLfloat, _x: GLfloat, _y: GLfloat, _z: GLfloat) {}
pub unsafe extern "C" fn glScalef(_x: GLfloat, _y: GLfloat, _z: GLfloat) {}
pub unsafe extern "C" fn glMultMatrixf(_m: *const GLfloat) {}
pub unsafe extern "C" fn glLoadMatrixf(_m: *const GLfloat) {}

// ===== Client state (no-ops) =====

pub unsafe extern "C" fn glEnableClientState(_array: GLenum) {}
pub unsafe extern "C" fn glDisableClientState(_array: GLenum) {}
pub unsafe extern "C" fn glVertexPointer(
    _size: GLint,
    _type: GLenum,
    _stride: GLsizei,
    _pointer: *const c_void,
) {
}
pub unsafe extern "C" fn glColorPointer(
    _size: GLint,
    _type: GLenum,
    _stride: GLsizei,
    _pointer: *const c_void,
) {
}
pub unsafe extern "C" fn glTexCoordPointer(
    _size: GLint,
    _type: GLenum,
    _stride: GLsizei,
    _pointer: *const c_void,
) {
}
pub unsafe extern "C" fn glNormalPointer(_type: GLenum, _stride: GLsizei, _pointer: *const c_void) {
}

// ===== Query objects =====

pub unsafe extern "C" fn glGenQueries(n: GLsizei, ids: *mut GLuint) {
    gles32::GenQueries(n, ids)
}

pub unsafe extern "C" fn glDeleteQueries(n: GLsizei, ids: *const GLuint) {
    gles32::DeleteQueries(n, ids)
}

pub unsafe extern "C" fn glBeginQuery(target: GLenum, id: GLuint) {
    let target = match target {
        gl46::SAMPLES_PASSED => gles32::ANY_SAMPLES_PASSED,
        gl46::PRIMITIVES_GENERATED => {
            // Semantically wrong (a count versus an any-hit flag), but the
            // nearest target ES offers.
            log!("GL_PRIMITIVES_GENERATED not supported, using ANY_SAMPLES_PASSED");
            gles32::ANY_SAMPLES_PASSED
        }
        gl46::TIME_ELAPSED => {
            log!("GL_TIME_ELAPSED query - may not be supported");
            target
        }
        _ => target,
    };
    gles32::BeginQuery(target, id)
}

pub unsafe extern "C" fn glEndQuery(target: GLenum) {
    let target = match target {
        gl46::SAMPLES_PASSED | gl46::PRIMITIVES_GENERATED => gles32::ANY_SAMPLES_PASSED,
        _ => target,
    };
    gles32::EndQuery(target)
}

pub unsafe extern "C" fn glGetQueryObjectuiv(id: GLuint, pname: GLenum, params: *mut GLuint) {
    if pname == gl46::QUERY_RESULT_NO_WAIT {
        // ES has no NO_WAIT; poll availability and answer zero when the
        // result isn't in yet.
        let mut available: GLuint = 0;
        gles32::GetQueryObjectuiv(id, gles32::QUERY_RESULT_AVAILABLE, &mut available);
        if available != 0 {
            gles32::GetQueryObjectuiv(id, gles32::QUERY_RESULT, params);
        } else {
            *params = 0;
        }
        return;
    }
    gles32::GetQueryObjectuiv(id, pname, params)
}

pub unsafe extern "C" fn glGetQueryObjecti64v(id: GLuint, pname: GLenum, params: *mut GLint64) {
    if params.is_null() {
        return;
    }
    let pname = if pname == gl46::QUERY_RESULT_NO_WAIT {
        gles32::QUERY_RESULT
    } else {
        pname
    };
    let mut value: GLuint = 0;
    gles32::GetQueryObjectuiv(id, pname, &mut value);
    *params = value as GLint64;
}

pub unsafe extern "C" fn glGetQueryObjectui64v(id: GLuint, pname: GLenum, params: *mut GLuint64) {
    if params.is_null() {
        return;
    }
    let pname = if pname == gl46::QUERY_RESULT_NO_WAIT {
        gles32::QUERY_RESULT
    } else {
        pname
    };
    let mut value: GLuint = 0;
    gles32::GetQueryObjectuiv(id, pname, &mut value);
    *params = value as GLuint64;
}

pub unsafe extern "C" fn glQueryCounter(_id: GLuint, _target: GLenum) {
    log!("glQueryCounter (GL_TIMESTAMP) not supported in ES");
}

// ===== Shadow introspection =====

pub fn depth_clamp_enabled() -> bool {
    SHADOW.lock().unwrap().depth_clamp
}

pub fn clip_control() -> (GLenum, GLenum) {
    let shadow = SHADOW.lock().unwrap();
    (shadow.clip_origin, shadow.clip_depth)
}

// ===== Adaptive resolution =====

pub fn set_resolution_scale(scale: f32) {
    SHADOW.lock().unwrap().resolution_scale = scale.clamp(0.25, 1.0);
}

pub fn resolution_scale() -> f32 {
    SHADOW.lock().unwrap().resolution_scale
}

/// Feed one frame's FPS sample into the history ring and step the
/// resolution scale toward the target frame rate.
pub fn update_adaptive_resolution(current_fps: f32, target_fps: f32) {
    let mut shadow = SHADOW.lock().unwrap();
    let index = shadow.fps_history_index;
    shadow.fps_history[index] = current_fps;
    shadow.fps_history_index = (index + 1) % shadow.fps_history.len();

    let average: f32 = shadow.fps_history.iter().sum::<f32>() / shadow.fps_history.len() as f32;
    if average < target_fps * 0.85 {
        shadow.resolution_scale = (shadow.resolution_scale - 0.02).max(0.25);
    } else if average > target_fps * 1.1 && shadow.resolution_scale < 1.0 {
        shadow.resolution_scale = (shadow.resolution_scale + 0.01).min(1.0);
    }
}

#[no_mangle]
pub extern "C" fn prismgl_set_resolution_scale(scale: f32) {
    set_resolution_scale(scale);
}

#[no_mangle]
pub extern "C" fn prismgl_get_resolution_scale() -> f32 {
    resolution_scale()
}

#[no_mangle]
pub extern "C" fn prismgl_update_adaptive_resolution(current_fps: f32, target_fps: f32) {
    update_adaptive_resolution(current_fps, target_fps);
}
