/*
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */
use gl_generator::{Api, Fallbacks, GlobalGenerator, Profile, Registry};
use std::fs::File;
use std::path::PathBuf;

fn main() {
    let out_dir = PathBuf::from(std::env::var("OUT_DIR").unwrap());

    // OpenGL ES 3.2 core: the API we actually call into. The function
    // pointers are loaded at runtime from the native driver libraries.
    let mut file = File::create(out_dir.join("gles32.rs")).unwrap();
    Registry::new(
        Api::Gles2,
        (3, 2),
        Profile::Core,
        Fallbacks::None,
        [
            "GL_EXT_texture_filter_anisotropic",
            "GL_EXT_disjoint_timer_query",
        ],
    )
    .write_bindings(GlobalGenerator, &mut file)
    .unwrap();

    // Desktop OpenGL 4.6 compatibility profile. Only the constants are used
    // (GL_QUADS, GL_POLYGON_MODE, the fixed-function enums and so on); the
    // function pointers are never loaded.
    let mut file = File::create(out_dir.join("gl46compat.rs")).unwrap();
    Registry::new(Api::Gl, (4, 6), Profile::Compatibility, Fallbacks::None, [])
        .write_bindings(GlobalGenerator, &mut file)
        .unwrap();
}
