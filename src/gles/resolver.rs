/*
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */
//! Mapping of GL entry-point names to implementations.
//!
//! The hosted application obtains every GL function through a single
//! name-to-address lookup. Resolution order is strict:
//!
//! 1. The static override table below. These are the entry points whose
//!    desktop semantics we must reproduce ourselves.
//! 2. `eglGetProcAddress`.
//! 3. Direct symbol lookup in the ES 3 library, then the ES 2 library.
//! 4. Retry with an `OES` suffix appended, then `EXT`; then, if the name
//!    carries a vendor suffix (`EXT`/`ARB`/`NV`/`AMD`/`OES`), retry the base
//!    name through the driver channels.
//! 5. Give up: one warning, null pointer. Unknown names are never
//!    fabricated.

use super::driver::SymbolSource;
use super::gles32_raw::types::{GLfloat, GLint};
use super::{immediate, wrappers};
use std::ffi::c_void;

/// A GL entry point with some C ABI; the caller transmutes it to the
/// prototype it expects for the name. The wrapper type exists so the
/// override table can live in a `static`.
#[derive(Copy, Clone)]
pub struct GLFnPtr(pub *const c_void);
unsafe impl Sync for GLFnPtr {}

// No-op stubs for desktop entry points we intentionally absorb.
unsafe extern "C" fn stub_noop() {}
unsafe extern "C" fn stub_noop_1i(_a: GLint) {}
unsafe extern "C" fn stub_noop_1f(_a: GLfloat) {}

macro_rules! override_entry {
    ($name:literal, $func:path) => {
        ($name, GLFnPtr($func as *const c_void))
    };
}

/// Table of overridden GL entry points. Static, never mutated, searched by
/// linear scan (it is small and hot-cached).
static OVERRIDES: &[(&str, GLFnPtr)] = &[
    // Immediate mode
    override_entry!("glBegin", immediate::glBegin),
    override_entry!("glEnd", immediate::glEnd),
    override_entry!("glVertex2f", immediate::glVertex2f),
    override_entry!("glVertex3f", immediate::glVertex3f),
    override_entry!("glVertex2d", immediate::glVertex2d),
    override_entry!("glVertex3d", immediate::glVertex3d),
    override_entry!("glTexCoord2f", immediate::glTexCoord2f),
    override_entry!("glTexCoord2d", immediate::glTexCoord2d),
    override_entry!("glColor3f", immediate::glColor3f),
    override_entry!("glColor3d", immediate::glColor3d),
    override_entry!("glColor4f", immediate::glColor4f),
    override_entry!("glColor4d", immediate::glColor4d),
    override_entry!("glColor3ub", immediate::glColor3ub),
    override_entry!("glColor4ub", immediate::glColor4ub),
    override_entry!("glNormal3f", immediate::glNormal3f),
    // State management
    override_entry!("glPolygonMode", wrappers::glPolygonMode),
    override_entry!("glClipControl", wrappers::glClipControl),
    override_entry!("glProvokingVertex", wrappers::glProvokingVertex),
    override_entry!("glShadeModel", wrappers::glShadeModel),
    override_entry!("glAlphaFunc", wrappers::glAlphaFunc),
    override_entry!("glEnable", wrappers::glEnable),
    override_entry!("glDisable", wrappers::glDisable),
    override_entry!("glGetIntegerv", wrappers::glGetIntegerv),
    override_entry!("glGetFloatv", wrappers::glGetFloatv),
    override_entry!("glGetString", wrappers::glGetString),
    override_entry!("glGetStringi", wrappers::glGetStringi),
    // Textures
    override_entry!("glTexImage1D", wrappers::glTexImage1D),
    override_entry!("glGetTexImage", wrappers::glGetTexImage),
    // Framebuffer
    override_entry!("glDrawBuffer", wrappers::glDrawBuffer),
    override_entry!("glReadBuffer", wrappers::glReadBuffer),
    // Fixed-function matrix stack (no-ops; callers drive vertex data via
    // buffers and shaders)
    override_entry!("glPushMatrix", wrappers::glPushMatrix),
    override_entry!("glPopMatrix", wrappers::glPopMatrix),
    override_entry!("glLoadIdentity", wrappers::glLoadIdentity),
    override_entry!("glMatrixMode", wrappers::glMatrixMode),
    override_entry!("glOrtho", wrappers::glOrtho),
    override_entry!("glFrustum", wrappers::glFrustum),
    override_entry!("glTranslatef", wrappers::glTranslatef),
    override_entry!("glRotatef", wrappers::glRotatef),
    override_entry!("glScalef", wrappers::glScalef),
    override_entry!("glMultMatrixf", wrappers::glMultMatrixf),
    override_entry!("glLoadMatrixf", wrappers::glLoadMatrixf),
    // Client state (no-ops)
    override_entry!("glEnableClientState", wrappers::glEnableClientState),
    override_entry!("glDisableClientState", wrappers::glDisableClientState),
    override_entry!("glVertexPointer", wrappers::glVertexPointer),
    override_entry!("glColorPointer", wrappers::glColorPointer),
    override_entry!("glTexCoordPointer", wrappers::glTexCoordPointer),
    override_entry!("glNormalPointer", wrappers::glNormalPointer),
    // Query objects
    override_entry!("glGenQueries", wrappers::glGenQueries),
    override_entry!("glDeleteQueries", wrappers::glDeleteQueries),
    override_entry!("glBeginQuery", wrappers::glBeginQuery),
    override_entry!("glEndQuery", wrappers::glEndQuery),
    override_entry!("glGetQueryObjectuiv", wrappers::glGetQueryObjectuiv),
    override_entry!("glGetQueryObjecti64v", wrappers::glGetQueryObjecti64v),
    override_entry!("glGetQueryObjectui64v", wrappers::glGetQueryObjectui64v),
    override_entry!("glQueryCounter", wrappers::glQueryCounter),
    // No-op stubs for unsupported desktop GL
    override_entry!("glPushAttrib", stub_noop_1i),
    override_entry!("glPopAttrib", stub_noop),
    override_entry!("glPushClientAttrib", stub_noop_1i),
    override_entry!("glPopClientAttrib", stub_noop),
    override_entry!("glLineWidth", stub_noop_1f),
    override_entry!("glPointSize", stub_noop_1f),
    override_entry!("glLogicOp", stub_noop_1i),
    override_entry!("glClampColor", stub_noop),
];

/// The override table, for introspection.
pub fn override_entries() -> &'static [(&'static str, GLFnPtr)] {
    OVERRIDES
}

/// Look up an override for a name.
pub fn override_for(name: &str) -> Option<*const c_void> {
    OVERRIDES
        .iter()
        .find(|&&(entry_name, _)| entry_name == name)
        .map(|&(_, func)| func.0)
}

/// Vendor suffixes tried (in this order) when stripping a name back to its
/// base form.
const STRIP_SUFFIXES: &[&str] = &["EXT", "ARB", "NV", "AMD", "OES"];

fn lookup_egl_gles3(source: &dyn SymbolSource, name: &str) -> *const c_void {
    let ptr = source.egl_get_proc_address(name);
    if !ptr.is_null() {
        return ptr;
    }
    source.gles3_symbol(name)
}

fn lookup_all(source: &dyn SymbolSource, name: &str) -> *const c_void {
    let ptr = lookup_egl_gles3(source, name);
    if !ptr.is_null() {
        return ptr;
    }
    source.gles2_symbol(name)
}

/// Resolve a GL entry-point name to an address, or null if no implementation
/// exists.
pub fn resolve(name: &str, source: &dyn SymbolSource) -> *const c_void {
    if let Some(func) = override_for(name) {
        return func;
    }

    let ptr = lookup_all(source, name);
    if !ptr.is_null() {
        return ptr;
    }

    // Some functions are only exported under their extension name in ES.
    for suffix in ["OES", "EXT"] {
        let ptr = lookup_egl_gles3(source, &format!("{}{}", name, suffix));
        if !ptr.is_null() {
            return ptr;
        }
    }

    // Conversely, a desktop extension name may exist in ES core.
    for suffix in STRIP_SUFFIXES {
        if let Some(position) = name.find(suffix) {
            let ptr = lookup_all(source, &name[..position]);
            if !ptr.is_null() {
                return ptr;
            }
            break;
        }
    }

    log!("Function not found: {} (returning null)", name);
    std::ptr::null()
}
