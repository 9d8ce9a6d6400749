/*
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */
//! Desktop OpenGL on OpenGL ES 3.2.
//!
//! The hosted application was written against desktop OpenGL (anything from
//! 1.x up to 4.6), but the only driver available is OpenGL ES 3.2. This
//! module contains the layers that bridge the two:
//!
//! - [resolver] maps GL entry-point names to implementations. Each name is
//!   either overridden by one of our wrappers, passed through to the native
//!   driver, retried under ES naming conventions, or absorbed by a stub.
//! - [driver] owns the native driver libraries and the symbol-lookup
//!   channels the resolver consults.
//! - [immediate] reproduces `glBegin`/`glEnd` vertex submission on top of
//!   buffer objects.
//! - [wrappers] shadows desktop-only state and reimplements the desktop
//!   entry points whose semantics differ on ES.
//! - [batch] merges adjacent same-mode `glDrawArrays` ranges.
//! - [gles32_raw] provides raw bindings for OpenGL ES 3.2 generated from the
//!   Khronos API headers. **The function bindings are only for use within
//!   this module.** The constants and types can be used outside it, however.
//!   - [gl46_raw] is the same thing for desktop OpenGL 4.6 compatibility
//!     profile, used for its constants only.
//!
//! Useful resources for OpenGL ES 3.2:
//! - [Reference pages](https://registry.khronos.org/OpenGL-Refpages/es3/)
//! - [Specification](https://registry.khronos.org/OpenGL/specs/es/3.2/es_spec_3.2.pdf)
//!
//! Useful resources for desktop OpenGL:
//! - [Reference pages](https://registry.khronos.org/OpenGL-Refpages/gl4/)
//! - [Compatibility profile specification](https://registry.khronos.org/OpenGL/specs/gl/glspec46.compatibility.pdf)

pub mod batch;
pub mod driver;
pub mod immediate;
pub mod resolver;
#[cfg(test)]
pub mod test_driver;
pub mod wrappers;

pub use prismgl_gl_bindings::gl46compat as gl46_raw;
pub use prismgl_gl_bindings::gles32 as gles32_raw;
