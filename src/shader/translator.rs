/*
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */
//! Translation of desktop GLSL (110–460) to GLSL ES 3.20.
//!
//! The rewrite is purely textual: version directive, extension pragmas,
//! precision qualifiers, sampler types, legacy builtins, double-precision
//! types and pre-130 `attribute`/`varying` declarations. This is knowingly
//! approximate — a `#define texture2D` or an identifier containing one of
//! the substituted substrings would be mishandled — but it avoids a full
//! GLSL parser and holds up for the shaders real workloads emit.
//!
//! The translator is pure: no I/O, input is never mutated.

use crate::gles::gles32_raw as gles32;
use crate::gles::gles32_raw::types::GLenum;
use lazy_static::lazy_static;
use regex::Regex;
use std::ffi::{c_char, CStr, CString};

/// Sources above this size are rejected.
pub const MAX_SHADER_SIZE: usize = 256 * 1024;
/// Everything translates to this GLSL ES version.
pub const TARGET_VERSION: i32 = 320;

const MAX_ERROR_LEN: usize = 512;

#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum ShaderStage {
    Vertex,
    Fragment,
}

/// Result of one translation.
#[derive(Debug)]
pub struct ShaderTranslation {
    pub translated_source: String,
    pub success: bool,
    pub error_msg: String,
    pub original_version: i32,
    pub target_version: i32,
}

impl ShaderTranslation {
    fn failure(message: &str, original_version: i32) -> ShaderTranslation {
        let mut error_msg = message.to_string();
        error_msg.truncate(MAX_ERROR_LEN);
        ShaderTranslation {
            translated_source: String::new(),
            success: false,
            error_msg,
            original_version,
            target_version: TARGET_VERSION,
        }
    }

    fn success(source: String, original_version: i32) -> ShaderTranslation {
        ShaderTranslation {
            translated_source: source,
            success: true,
            error_msg: String::new(),
            original_version,
            target_version: TARGET_VERSION,
        }
    }
}

lazy_static! {
    static ref VERSION_DIRECTIVE: Regex = Regex::new(r"#version\s+(\d+)").unwrap();
}

/// Detect the GLSL version of a source string. A source with no `#version`
/// directive is GLSL 110 by definition; a malformed directive yields 0.
pub fn detect_version(source: &str) -> i32 {
    if !source.contains("#version") {
        return 110;
    }
    VERSION_DIRECTIVE
        .captures(source)
        .and_then(|captures| captures[1].parse().ok())
        .unwrap_or(0)
}

/// Desktop extension pragmas and what they become in ES. Extensions with a
/// direct ES counterpart are renamed; the rest are native (or absent) in
/// ES 3.x and their pragma becomes a comment. Unknown pragmas are left
/// untouched.
const EXTENSION_REWRITES: &[(&str, &str)] = &[
    (
        "#extension GL_ARB_explicit_attrib_location : enable",
        "/* ARB_explicit_attrib_location: native in ES 3.x */",
    ),
    (
        "#extension GL_ARB_explicit_attrib_location : require",
        "/* ARB_explicit_attrib_location: native in ES 3.x */",
    ),
    (
        "#extension GL_ARB_explicit_uniform_location : enable",
        "/* ARB_explicit_uniform_location: emulated */",
    ),
    (
        "#extension GL_ARB_explicit_uniform_location : require",
        "/* ARB_explicit_uniform_location: emulated */",
    ),
    (
        "#extension GL_ARB_shader_texture_lod : enable",
        "/* ARB_shader_texture_lod: use textureLod in ES */",
    ),
    (
        "#extension GL_ARB_conservative_depth : enable",
        "/* ARB_conservative_depth: not available in ES */",
    ),
    (
        "#extension GL_ARB_texture_gather : enable",
        "#extension GL_EXT_texture_gather : enable",
    ),
    (
        "#extension GL_ARB_gpu_shader5 : enable",
        "/* GL_ARB_gpu_shader5: partially emulated */",
    ),
    (
        "#extension GL_ARB_gpu_shader5 : require",
        "/* GL_ARB_gpu_shader5: partially emulated */",
    ),
    (
        "#extension GL_ARB_uniform_buffer_object : enable",
        "/* ARB_uniform_buffer_object: native in ES 3.x */",
    ),
    (
        "#extension GL_ARB_separate_shader_objects : enable",
        "/* ARB_separate_shader_objects: native in ES 3.1+ */",
    ),
    (
        "#extension GL_ARB_shading_language_420pack : enable",
        "/* ARB_shading_language_420pack: native in ES 3.x */",
    ),
    (
        "#extension GL_ARB_shading_language_420pack : require",
        "/* ARB_shading_language_420pack: native in ES 3.x */",
    ),
    (
        "#extension GL_ARB_enhanced_layouts : enable",
        "/* ARB_enhanced_layouts: partially emulated */",
    ),
    (
        "#extension GL_ARB_shader_image_load_store : enable",
        "/* ARB_shader_image_load_store: native in ES 3.1+ */",
    ),
    (
        "#extension GL_ARB_shader_storage_buffer_object : enable",
        "/* ARB_shader_storage_buffer_object: native in ES 3.1+ */",
    ),
    (
        "#extension GL_ARB_compute_shader : enable",
        "/* ARB_compute_shader: native in ES 3.1+ */",
    ),
    (
        "#extension GL_ARB_tessellation_shader : enable",
        "#extension GL_EXT_tessellation_shader : enable",
    ),
    (
        "#extension GL_ARB_geometry_shader4 : enable",
        "#extension GL_EXT_geometry_shader : enable",
    ),
    (
        "#extension GL_ARB_draw_instanced : enable",
        "/* ARB_draw_instanced: native in ES 3.0+ */",
    ),
    (
        "#extension GL_ARB_depth_clamp : enable",
        "/* ARB_depth_clamp: emulated */",
    ),
    (
        "#extension GL_ARB_clip_control : enable",
        "/* ARB_clip_control: emulated */",
    ),
    (
        "#extension GL_ARB_seamless_cube_map : enable",
        "/* ARB_seamless_cube_map: always on in ES */",
    ),
];

/// Legacy texturing builtins and their modern names.
const BUILTIN_REWRITES: &[(&str, &str)] = &[
    ("texture2D(", "texture("),
    ("texture3D(", "texture("),
    ("textureCube(", "texture("),
    ("texture2DProj(", "textureProj("),
    ("texture2DLod(", "textureLod("),
    ("texture3DLod(", "textureLod("),
    ("textureCubeLod(", "textureLod("),
    ("shadow2D(", "texture("),
    ("shadow2DProj(", "textureProj("),
    ("texture2DGrad(", "textureGrad("),
];

/// Double-precision types have no ES equivalent; demote to single
/// precision. The square `dmatN` entries run first, so `dmat2x2` and
/// friends come out as `mat2x2` (same type as `mat2`).
const DOUBLE_TYPE_REWRITES: &[(&str, &str)] = &[
    ("dvec2", "vec2"),
    ("dvec3", "vec3"),
    ("dvec4", "vec4"),
    ("dmat2", "mat2"),
    ("dmat3", "mat3"),
    ("dmat4", "mat4"),
    ("dmat2x3", "mat2x3"),
    ("dmat2x4", "mat2x4"),
    ("dmat3x2", "mat3x2"),
    ("dmat3x4", "mat3x4"),
    ("dmat4x2", "mat4x2"),
    ("dmat4x3", "mat4x3"),
];

const VERTEX_PRECISION_PRELUDE: &str = "precision highp float;\n\
precision highp int;\n";

const FRAGMENT_PRECISION_PRELUDE: &str = "precision highp float;\n\
precision highp int;\n\
precision highp sampler2D;\n\
precision highp sampler3D;\n\
precision highp samplerCube;\n\
precision highp sampler2DArray;\n\
precision highp sampler2DShadow;\n\
precision highp samplerCubeShadow;\n\
precision highp sampler2DArrayShadow;\n\
precision highp isampler2D;\n\
precision highp isampler3D;\n\
precision highp isamplerCube;\n\
precision highp usampler2D;\n\
precision highp usampler3D;\n\
precision highp usamplerCube;\n\
precision highp image2D;\n\
precision highp iimage2D;\n\
precision highp uimage2D;\n";

fn insert_precision_prelude(source: &str, stage: ShaderStage) -> String {
    let prelude = match stage {
        ShaderStage::Vertex => VERTEX_PRECISION_PRELUDE,
        ShaderStage::Fragment => FRAGMENT_PRECISION_PRELUDE,
    };
    if source.starts_with("#version") {
        if let Some(line_end) = source.find('\n') {
            let (version_line, rest) = source.split_at(line_end + 1);
            return format!("{}{}{}", version_line, prelude, rest);
        }
    }
    format!("{}{}", prelude, source)
}

/// Insert the `gl_FragColor` replacement's output declaration after the
/// precision block.
fn insert_frag_output_decl(source: &str) -> String {
    let declaration = "out vec4 prismgl_FragColor;\n";
    let Some(block_start) = source.find("precision highp") else {
        return source.to_string();
    };
    let mut block_end = block_start;
    for line in source[block_start..].split_inclusive('\n') {
        if line.starts_with("precision") {
            block_end += line.len();
        } else {
            break;
        }
    }
    format!(
        "{}{}{}",
        &source[..block_end],
        declaration,
        &source[block_end..]
    )
}

/// Translate a desktop GLSL source string to GLSL ES 3.20.
pub fn translate(source: &str, stage: ShaderStage) -> ShaderTranslation {
    if source.is_empty() {
        return ShaderTranslation::failure("Empty shader source", 0);
    }
    if source.len() > MAX_SHADER_SIZE {
        return ShaderTranslation::failure("Shader too large", 0);
    }

    let original_version = detect_version(source);

    // Already ES: pass through unchanged.
    if source.contains("#version 320 es")
        || source.contains("#version 310 es")
        || source.contains("#version 300 es")
    {
        return ShaderTranslation::success(source.to_string(), original_version);
    }

    log_dbg!(
        "Translating shader from GLSL {} to GLSL ES {}",
        original_version,
        TARGET_VERSION
    );

    // Step 1: replace the version directive (or prepend one).
    let version_core = format!("#version {} core", original_version);
    let version_compat = format!("#version {} compatibility", original_version);
    let version_plain = format!("#version {}", original_version);
    let mut working = if source.contains(&version_core) {
        source.replace(&version_core, "#version 320 es")
    } else if source.contains(&version_compat) {
        source.replace(&version_compat, "#version 320 es")
    } else if source.contains(&version_plain) {
        source.replace(&version_plain, "#version 320 es")
    } else {
        format!("#version 320 es\n{}", source)
    };

    // Step 2: extension pragmas.
    for &(find, replace) in EXTENSION_REWRITES {
        working = working.replace(find, replace);
    }

    // Step 3: precision qualifiers.
    working = insert_precision_prelude(&working, stage);

    // Step 4: sampler types (1D textures are emulated as 2D).
    working = working.replace("sampler1D", "sampler2D");
    working = working.replace("isampler1D", "isampler2D");
    working = working.replace("usampler1D", "usampler2D");

    // Step 5: legacy builtins and the noperspective qualifier.
    for &(find, replace) in BUILTIN_REWRITES {
        working = working.replace(find, replace);
    }
    working = working.replace("noperspective ", "/* noperspective */ ");
    working = working.replace("noperspective\n", "/* noperspective */\n");

    // Step 6: double-precision types.
    for &(find, replace) in DOUBLE_TYPE_REWRITES {
        working = working.replace(find, replace);
    }

    // Step 7: pre-130 IO declarations.
    if original_version <= 120 {
        match stage {
            ShaderStage::Fragment => {
                if working.contains("gl_FragColor") && !working.contains("out vec4") {
                    working = working.replace("gl_FragColor", "prismgl_FragColor");
                    working = insert_frag_output_decl(&working);
                }
                working = working.replace("varying ", "in ");
            }
            ShaderStage::Vertex => {
                working = working.replace("attribute ", "in ");
                working = working.replace("varying ", "out ");
            }
        }
    }

    ShaderTranslation::success(working, original_version)
}

/// C entry point: translate a shader, returning a heap-allocated C string
/// the caller owns, or null on failure.
///
/// # Safety
/// `source` must be a valid C string or null.
#[no_mangle]
pub unsafe extern "C" fn prismgl_translate_shader(
    source: *const c_char,
    shader_type: GLenum,
) -> *const c_char {
    if source.is_null() {
        return std::ptr::null();
    }
    let Ok(source) = CStr::from_ptr(source).to_str() else {
        return std::ptr::null();
    };
    let stage = if shader_type == gles32::FRAGMENT_SHADER {
        ShaderStage::Fragment
    } else {
        ShaderStage::Vertex
    };
    let result = translate(source, stage);
    if !result.success {
        log!("Shader translation failed: {}", result.error_msg);
        return std::ptr::null();
    }
    match CString::new(result.translated_source) {
        Ok(translated) => translated.into_raw(),
        Err(_) => std::ptr::null(),
    }
}
