/*
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */
//! Access to the native OpenGL ES driver.
//!
//! The driver is reached through three channels, in the order the resolver
//! consults them: `eglGetProcAddress`, direct symbol lookup in the ES 3
//! library, then the ES 2 library. [SymbolSource] abstracts over the
//! channels so the resolution policy in [super::resolver] can be exercised
//! against a synthetic driver in tests; [DriverLibraries] is the real
//! implementation backed by the system's shared objects.

use super::gles32_raw as gles32;
use lazy_static::lazy_static;
use libloading::Library;
use std::ffi::{c_char, c_void, CString};

/// `eglGetProcAddress`.
pub type GetProcAddressProc = unsafe extern "C" fn(name: *const c_char) -> *const c_void;

/// The symbol-lookup channels of a native ES driver. Each returns a null
/// pointer when the name is not known to that channel.
pub trait SymbolSource {
    fn egl_get_proc_address(&self, name: &str) -> *const c_void;
    fn gles3_symbol(&self, name: &str) -> *const c_void;
    fn gles2_symbol(&self, name: &str) -> *const c_void;
}

/// The native driver libraries. Any of them can be missing; lookups through
/// a missing library simply return null and resolution moves on.
pub struct DriverLibraries {
    gles3: Option<Library>,
    gles2: Option<Library>,
    egl_get_proc_address: Option<GetProcAddressProc>,
    /// Keeps `eglGetProcAddress` valid for the process lifetime.
    _egl: Option<Library>,
}

fn open_library(name: &str) -> Option<Library> {
    match unsafe { Library::new(name) } {
        Ok(lib) => Some(lib),
        Err(e) => {
            log!("Couldn't open {}: {}", name, e);
            None
        }
    }
}

fn library_symbol(lib: Option<&Library>, name: &str) -> *const c_void {
    let Some(lib) = lib else {
        return std::ptr::null();
    };
    let Ok(name) = CString::new(name) else {
        return std::ptr::null();
    };
    match unsafe { lib.get::<unsafe extern "C" fn()>(name.as_bytes_with_nul()) } {
        Ok(symbol) => *symbol as *const c_void,
        Err(_) => std::ptr::null(),
    }
}

impl DriverLibraries {
    pub fn open() -> DriverLibraries {
        let gles3 = open_library("libGLESv3.so");
        let gles2 = open_library("libGLESv2.so");
        let egl = open_library("libEGL.so");
        let egl_get_proc_address = egl.as_ref().and_then(|lib| unsafe {
            lib.get::<GetProcAddressProc>(b"eglGetProcAddress\0")
                .ok()
                .map(|symbol| *symbol)
        });
        DriverLibraries {
            gles3,
            gles2,
            egl_get_proc_address,
            _egl: egl,
        }
    }
}

impl SymbolSource for DriverLibraries {
    fn egl_get_proc_address(&self, name: &str) -> *const c_void {
        let Some(get_proc_address) = self.egl_get_proc_address else {
            return std::ptr::null();
        };
        let Ok(name) = CString::new(name) else {
            return std::ptr::null();
        };
        unsafe { get_proc_address(name.as_ptr()) }
    }
    fn gles3_symbol(&self, name: &str) -> *const c_void {
        library_symbol(self.gles3.as_ref(), name)
    }
    fn gles2_symbol(&self, name: &str) -> *const c_void {
        library_symbol(self.gles2.as_ref(), name)
    }
}

lazy_static! {
    static ref DRIVER: DriverLibraries = DriverLibraries::open();
}

/// The process-wide driver handle.
pub fn driver() -> &'static DriverLibraries {
    &DRIVER
}

/// Resolve a symbol through the raw driver channels only, with no overrides
/// and no suffix retries. The `gles32` bindings must be loaded this way:
/// routing them through the override table would make the emulation call
/// back into itself.
pub fn raw_symbol(source: &dyn SymbolSource, name: &str) -> *const c_void {
    let ptr = source.egl_get_proc_address(name);
    if !ptr.is_null() {
        return ptr;
    }
    let ptr = source.gles3_symbol(name);
    if !ptr.is_null() {
        return ptr;
    }
    source.gles2_symbol(name)
}

/// Load the `gles32` global function pointers from a driver.
pub fn load_gl_functions(source: &dyn SymbolSource) {
    gles32::load_with(|name| raw_symbol(source, name));
}
