/*
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */
//! PrismGL is a translation layer that lets an application compiled against
//! desktop OpenGL (1.x through 4.6) run on top of an OpenGL ES 3.2 driver.
//!
//! The hosted application links nothing special: it asks
//! [prismgl_get_proc_address] for each GL entry point, exactly as it would
//! ask `wglGetProcAddress` or `glXGetProcAddress` on a desktop system, and
//! thereafter calls straight through the pointers it received. Behind that
//! lookup, each name is either:
//!
//! - forwarded to the native ES driver, when the desktop and ES semantics
//!   agree;
//! - redirected to an emulation routine in [gles] that reproduces the
//!   desktop behavior on top of ES (immediate mode, quads, desktop-only
//!   state, `glGetTexImage`, query targets, ...);
//! - or absorbed by a no-op stub, when the call is meaningless on ES
//!   (matrix stack, client arrays, `glPushAttrib`, ...).
//!
//! Desktop GLSL is rewritten to GLSL ES 3.20 by [shader::translator], and
//! linked programs are persisted across runs by [shader::cache].
//!
//! Threading: GL calls must come from the thread owning the GL context, as
//! the ES driver demands. Only the shader cache tolerates other threads,
//! and only for its own bookkeeping. Window-system integration (EGL
//! surfaces and contexts) belongs to the embedder, not this library.

#![allow(non_snake_case)]

#[macro_use]
mod log;
pub mod gles;
pub mod options;
pub mod shader;

use std::ffi::{c_char, c_void, CStr};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};

use gles::{driver, resolver};
use shader::cache;

static INITIALIZED: AtomicBool = AtomicBool::new(false);

/// Initialize the translation layer: open the driver libraries, load the ES
/// function pointers, and bring up the shader cache under `cache_dir`.
/// Idempotent. A cache failure disables caching but does not fail init.
///
/// # Safety
/// `cache_dir` must be a valid C string or null (null disables the cache).
#[no_mangle]
pub unsafe extern "C" fn prismgl_init(cache_dir: *const c_char) -> bool {
    if INITIALIZED.load(Ordering::SeqCst) {
        log!("PrismGL already initialized");
        return true;
    }

    driver::load_gl_functions(driver::driver());

    if options::current().shader_cache_enabled && !cache_dir.is_null() {
        let dir = CStr::from_ptr(cache_dir).to_string_lossy().into_owned();
        if !cache::init_global(Path::new(&dir)) {
            log!("Shader cache initialization failed, continuing without cache");
            let mut updated = options::current();
            updated.shader_cache_enabled = false;
            options::replace(updated);
        }
    }

    INITIALIZED.store(true, Ordering::SeqCst);
    log_dbg!("PrismGL initialized");
    true
}

/// Shut the layer down. GL programs stay with the context; only the cache
/// index is released.
#[no_mangle]
pub extern "C" fn prismgl_shutdown() {
    if !INITIALIZED.load(Ordering::SeqCst) {
        return;
    }
    cache::shutdown_global();
    INITIALIZED.store(false, Ordering::SeqCst);
    log_dbg!("PrismGL shutdown complete");
}

/// Update the user-configurable options.
#[no_mangle]
pub extern "C" fn prismgl_set_config(
    shader_cache_enabled: bool,
    draw_call_batching: bool,
    adaptive_resolution: bool,
    async_texture_loading: bool,
    vulkan_backend: bool,
    resolution_scale: f32,
) {
    let mut updated = options::current();
    updated.shader_cache_enabled = shader_cache_enabled;
    updated.draw_call_batching = draw_call_batching;
    updated.adaptive_resolution = adaptive_resolution;
    updated.async_texture_loading = async_texture_loading;
    updated.vulkan_backend = vulkan_backend;
    updated.resolution_scale = resolution_scale;
    options::replace(updated);
}

/// The hosted application's single lookup for GL entry points. Returns null
/// (after one warning) for names with no implementation; unknown names are
/// never fabricated.
///
/// # Safety
/// `name` must be a valid C string or null.
#[no_mangle]
pub unsafe extern "C" fn prismgl_get_proc_address(name: *const c_char) -> *const c_void {
    if name.is_null() {
        return std::ptr::null();
    }
    let Ok(name) = CStr::from_ptr(name).to_str() else {
        return std::ptr::null();
    };
    resolver::resolve(name, driver::driver())
}
