/*
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */
//! Recording OpenGL ES driver for tests.
//!
//! [install] points the `gles32` global function pointers at stubs that
//! journal each call, so tests can assert exactly what would have reached a
//! real driver. The journal captures buffer uploads by value, which is how
//! index patterns and vertex data get checked.
//!
//! The function pointers and the emulation singletons are process-global,
//! so every test that touches GL must hold the guard returned by [install]
//! for its whole duration; the guard serializes those tests.

use super::gles32_raw as gles32;
use super::gles32_raw::types::*;
use lazy_static::lazy_static;
use std::ffi::c_void;
use std::sync::{Mutex, MutexGuard};

/// One journaled GL call. Only the calls the tests care about are recorded;
/// queries answered from stub state (`glGetIntegerv` and friends) are not.
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Enable(GLenum),
    Disable(GLenum),
    BindVertexArray(GLuint),
    BindBuffer(GLenum, GLuint),
    BufferData { target: GLenum, data: Vec<u8> },
    DrawArrays { mode: GLenum, first: GLint, count: GLsizei },
    DrawElements { mode: GLenum, count: GLsizei, type_: GLenum },
    DrawBuffers(Vec<GLenum>),
    ReadBuffer(GLenum),
    TexImage2D { target: GLenum, level: GLint, width: GLsizei, height: GLsizei },
    BindFramebuffer(GLenum, GLuint),
    FramebufferTexture2D { attachment_target: GLenum, texture: GLuint, level: GLint },
    ReadPixels { x: GLint, y: GLint, width: GLsizei, height: GLsizei },
    BeginQuery { target: GLenum, id: GLuint },
    EndQuery(GLenum),
    ProgramBinary { program: GLuint, format: GLenum, data: Vec<u8> },
    DeleteProgram(GLuint),
}

struct DriverState {
    calls: Vec<Call>,
    next_name: GLuint,
    link_status: GLint,
    program_binary: Vec<u8>,
    program_binary_format: GLenum,
    query_available: GLuint,
    query_result: GLuint,
    bound_framebuffer: GLint,
    texture_binding_2d: GLint,
    viewport: [GLint; 4],
}

impl DriverState {
    fn reset(&mut self) {
        self.calls.clear();
        self.next_name = 1;
        self.link_status = 1;
        self.program_binary.clear();
        self.program_binary_format = 0;
        self.query_available = 1;
        self.query_result = 0;
        self.bound_framebuffer = 0;
        self.texture_binding_2d = 0;
        self.viewport = [0, 0, 0, 0];
    }
}

lazy_static! {
    static ref STATE: Mutex<DriverState> = Mutex::new(DriverState {
        calls: Vec::new(),
        next_name: 1,
        link_status: 1,
        program_binary: Vec::new(),
        program_binary_format: 0,
        query_available: 1,
        query_result: 0,
        bound_framebuffer: 0,
        texture_binding_2d: 0,
        viewport: [0, 0, 0, 0],
    });
    static ref GL_TEST_LOCK: Mutex<()> = Mutex::new(());
}

pub struct DriverGuard {
    _lock: MutexGuard<'static, ()>,
}

/// Install the recording driver and take the GL test lock.
pub fn install() -> DriverGuard {
    let lock = GL_TEST_LOCK
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    STATE
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
        .reset();
    gles32::load_with(lookup);
    DriverGuard { _lock: lock }
}

/// Everything journaled since [install] (or [clear_calls]).
pub fn calls() -> Vec<Call> {
    state().calls.clone()
}

pub fn clear_calls() {
    state().calls.clear();
}

pub fn set_link_status(ok: bool) {
    state().link_status = if ok { 1 } else { 0 };
}

pub fn set_program_binary(format: GLenum, data: &[u8]) {
    let mut state = state();
    state.program_binary_format = format;
    state.program_binary = data.to_vec();
}

pub fn set_query_result(available: GLuint, result: GLuint) {
    let mut state = state();
    state.query_available = available;
    state.query_result = result;
}

pub fn set_bound_framebuffer(framebuffer: GLint) {
    state().bound_framebuffer = framebuffer;
}

pub fn set_texture_binding_2d(texture: GLint) {
    state().texture_binding_2d = texture;
}

pub fn set_viewport(viewport: [GLint; 4]) {
    state().viewport = viewport;
}

fn state() -> MutexGuard<'static, DriverState> {
    STATE
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn record(call: Call) {
    state().calls.push(call);
}

fn fresh_names(n: GLsizei, out: *mut GLuint) {
    let mut state = state();
    for i in 0..n as usize {
        unsafe { *out.add(i) = state.next_name };
        state.next_name += 1;
    }
}

// ===== Recording stubs =====
//
// Signatures must match what the gl_generator bindings expect; the loader
// transmutes these addresses to the generated function-pointer types.

extern "system" fn gl_enable(cap: GLenum) {
    record(Call::Enable(cap));
}
extern "system" fn gl_disable(cap: GLenum) {
    record(Call::Disable(cap));
}
extern "system" fn gl_gen_vertex_arrays(n: GLsizei, arrays: *mut GLuint) {
    fresh_names(n, arrays);
}
extern "system" fn gl_gen_buffers(n: GLsizei, buffers: *mut GLuint) {
    fresh_names(n, buffers);
}
extern "system" fn gl_gen_framebuffers(n: GLsizei, framebuffers: *mut GLuint) {
    fresh_names(n, framebuffers);
}
extern "system" fn gl_gen_queries(n: GLsizei, ids: *mut GLuint) {
    fresh_names(n, ids);
}
extern "system" fn gl_delete_queries(_n: GLsizei, _ids: *const GLuint) {}
extern "system" fn gl_delete_framebuffers(_n: GLsizei, _framebuffers: *const GLuint) {}
extern "system" fn gl_bind_vertex_array(array: GLuint) {
    record(Call::BindVertexArray(array));
}
extern "system" fn gl_bind_buffer(target: GLenum, buffer: GLuint) {
    record(Call::BindBuffer(target, buffer));
}
extern "system" fn gl_buffer_data(
    target: GLenum,
    size: GLsizeiptr,
    data: *const c_void,
    _usage: GLenum,
) {
    let data = if data.is_null() {
        Vec::new()
    } else {
        unsafe { std::slice::from_raw_parts(data as *const u8, size as usize) }.to_vec()
    };
    record(Call::BufferData { target, data });
}
extern "system" fn gl_enable_vertex_attrib_array(_index: GLuint) {}
extern "system" fn gl_disable_vertex_attrib_array(_index: GLuint) {}
extern "system" fn gl_vertex_attrib_pointer(
    _index: GLuint,
    _size: GLint,
    _type: GLenum,
    _normalized: GLboolean,
    _stride: GLsizei,
    _pointer: *const c_void,
) {
}
extern "system" fn gl_draw_arrays(mode: GLenum, first: GLint, count: GLsizei) {
    record(Call::DrawArrays { mode, first, count });
}
extern "system" fn gl_draw_elements(
    mode: GLenum,
    count: GLsizei,
    type_: GLenum,
    _indices: *const c_void,
) {
    record(Call::DrawElements { mode, count, type_ });
}
extern "system" fn gl_draw_buffers(n: GLsizei, bufs: *const GLenum) {
    let bufs = unsafe { std::slice::from_raw_parts(bufs, n as usize) }.to_vec();
    record(Call::DrawBuffers(bufs));
}
extern "system" fn gl_read_buffer(src: GLenum) {
    record(Call::ReadBuffer(src));
}
extern "system" fn gl_get_string(name: GLenum) -> *const GLubyte {
    match name {
        gles32::RENDERER => b"FakeGPU 9000\0".as_ptr(),
        gles32::VERSION => b"OpenGL ES 3.2 Fake\0".as_ptr(),
        gles32::VENDOR => b"Fake Vendor\0".as_ptr(),
        _ => std::ptr::null(),
    }
}
extern "system" fn gl_get_integerv(pname: GLenum, params: *mut GLint) {
    let state = state();
    let answer: &[GLint] = match pname {
        gles32::FRAMEBUFFER_BINDING => &[state.bound_framebuffer],
        gles32::TEXTURE_BINDING_2D => &[state.texture_binding_2d],
        gles32::TEXTURE_BINDING_CUBE_MAP => &[0],
        gles32::VIEWPORT => &state.viewport,
        _ => &[0],
    };
    for (i, &value) in answer.iter().enumerate() {
        unsafe { *params.add(i) = value };
    }
}
extern "system" fn gl_get_floatv(_pname: GLenum, params: *mut GLfloat) {
    unsafe { *params = 0.0 };
}
#[allow(clippy::too_many_arguments)]
extern "system" fn gl_tex_image_2d(
    target: GLenum,
    level: GLint,
    _internalformat: GLint,
    width: GLsizei,
    height: GLsizei,
    _border: GLint,
    _format: GLenum,
    _type: GLenum,
    _pixels: *const c_void,
) {
    record(Call::TexImage2D {
        target,
        level,
        width,
        height,
    });
}
extern "system" fn gl_bind_framebuffer(target: GLenum, framebuffer: GLuint) {
    record(Call::BindFramebuffer(target, framebuffer));
}
extern "system" fn gl_framebuffer_texture_2d(
    _target: GLenum,
    _attachment: GLenum,
    textarget: GLenum,
    texture: GLuint,
    level: GLint,
) {
    record(Call::FramebufferTexture2D {
        attachment_target: textarget,
        texture,
        level,
    });
}
extern "system" fn gl_check_framebuffer_status(_target: GLenum) -> GLenum {
    gles32::FRAMEBUFFER_COMPLETE
}
#[allow(clippy::too_many_arguments)]
extern "system" fn gl_read_pixels(
    x: GLint,
    y: GLint,
    width: GLsizei,
    height: GLsizei,
    _format: GLenum,
    _type: GLenum,
    _pixels: *mut c_void,
) {
    record(Call::ReadPixels {
        x,
        y,
        width,
        height,
    });
}
extern "system" fn gl_begin_query(target: GLenum, id: GLuint) {
    record(Call::BeginQuery { target, id });
}
extern "system" fn gl_end_query(target: GLenum) {
    record(Call::EndQuery(target));
}
extern "system" fn gl_get_query_objectuiv(_id: GLuint, pname: GLenum, params: *mut GLuint) {
    let state = state();
    let value = match pname {
        gles32::QUERY_RESULT_AVAILABLE => state.query_available,
        gles32::QUERY_RESULT => state.query_result,
        _ => 0,
    };
    unsafe { *params = value };
}
extern "system" fn gl_create_program() -> GLuint {
    let mut state = state();
    let name = state.next_name;
    state.next_name += 1;
    name
}
extern "system" fn gl_delete_program(program: GLuint) {
    record(Call::DeleteProgram(program));
}
extern "system" fn gl_program_binary(
    program: GLuint,
    format: GLenum,
    binary: *const c_void,
    length: GLsizei,
) {
    let data = if binary.is_null() {
        Vec::new()
    } else {
        unsafe { std::slice::from_raw_parts(binary as *const u8, length as usize) }.to_vec()
    };
    record(Call::ProgramBinary {
        program,
        format,
        data,
    });
}
extern "system" fn gl_get_programiv(_program: GLuint, pname: GLenum, params: *mut GLint) {
    let state = state();
    let value = match pname {
        gles32::LINK_STATUS => state.link_status,
        gles32::PROGRAM_BINARY_LENGTH => state.program_binary.len() as GLint,
        _ => 0,
    };
    unsafe { *params = value };
}
extern "system" fn gl_get_program_binary(
    _program: GLuint,
    buf_size: GLsizei,
    length: *mut GLsizei,
    binary_format: *mut GLenum,
    binary: *mut c_void,
) {
    let state = state();
    let n = state.program_binary.len().min(buf_size as usize);
    unsafe {
        std::ptr::copy_nonoverlapping(state.program_binary.as_ptr(), binary as *mut u8, n);
        *length = n as GLsizei;
        *binary_format = state.program_binary_format;
    }
}

fn lookup(name: &str) -> *const c_void {
    match name {
        "glEnable" => gl_enable as *const c_void,
        "glDisable" => gl_disable as *const c_void,
        "glGenVertexArrays" => gl_gen_vertex_arrays as *const c_void,
        "glGenBuffers" => gl_gen_buffers as *const c_void,
        "glGenFramebuffers" => gl_gen_framebuffers as *const c_void,
        "glGenQueries" => gl_gen_queries as *const c_void,
        "glDeleteQueries" => gl_delete_queries as *const c_void,
        "glDeleteFramebuffers" => gl_delete_framebuffers as *const c_void,
        "glBindVertexArray" => gl_bind_vertex_array as *const c_void,
        "glBindBuffer" => gl_bind_buffer as *const c_void,
        "glBufferData" => gl_buffer_data as *const c_void,
        "glEnableVertexAttribArray" => gl_enable_vertex_attrib_array as *const c_void,
        "glDisableVertexAttribArray" => gl_disable_vertex_attrib_array as *const c_void,
        "glVertexAttribPointer" => gl_vertex_attrib_pointer as *const c_void,
        "glDrawArrays" => gl_draw_arrays as *const c_void,
        "glDrawElements" => gl_draw_elements as *const c_void,
        "glDrawBuffers" => gl_draw_buffers as *const c_void,
        "glReadBuffer" => gl_read_buffer as *const c_void,
        "glGetString" => gl_get_string as *const c_void,
        "glGetIntegerv" => gl_get_integerv as *const c_void,
        "glGetFloatv" => gl_get_floatv as *const c_void,
        "glTexImage2D" => gl_tex_image_2d as *const c_void,
        "glBindFramebuffer" => gl_bind_framebuffer as *const c_void,
        "glFramebufferTexture2D" => gl_framebuffer_texture_2d as *const c_void,
        "glCheckFramebufferStatus" => gl_check_framebuffer_status as *const c_void,
        "glReadPixels" => gl_read_pixels as *const c_void,
        "glBeginQuery" => gl_begin_query as *const c_void,
        "glEndQuery" => gl_end_query as *const c_void,
        "glGetQueryObjectuiv" => gl_get_query_objectuiv as *const c_void,
        "glCreateProgram" => gl_create_program as *const c_void,
        "glDeleteProgram" => gl_delete_program as *const c_void,
        "glProgramBinary" => gl_program_binary as *const c_void,
        "glGetProgramiv" => gl_get_programiv as *const c_void,
        "glGetProgramBinary" => gl_get_program_binary as *const c_void,
        _ => std::ptr::null(),
    }
}
