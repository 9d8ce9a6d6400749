/*
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */
//! Immediate-mode vertex submission (`glBegin`/`glEnd`) on top of buffer
//! objects.
//!
//! ES has no immediate mode, so vertices are accumulated on the CPU and
//! turned into one buffered draw at `glEnd`. `GL_QUADS` needs an index
//! buffer (two triangles per quad); `GL_QUAD_STRIP` is a triangle strip
//! under a different name; everything else maps to `glDrawArrays` directly.
//!
//! GL makes the "current" color, texture co-ordinates and normal sticky
//! across vertex emissions, so those live here too.

use super::gl46_raw as gl46; // constants only
use super::gles32_raw as gles32;
use super::gles32_raw::types::*;
use lazy_static::lazy_static;
use std::ffi::c_void;
use std::mem;
use std::os::raw::c_double;
use std::sync::Mutex;

/// Vertices past this cap are silently dropped rather than reallocating.
pub const MAX_IMMEDIATE_VERTICES: usize = 65536;

/// One accumulated vertex. Attribute locations are fixed: position = 0,
/// color = 1, texture co-ordinates = 2, normal = 3.
#[repr(C)]
#[derive(Copy, Clone)]
struct ImmediateVertex {
    x: GLfloat,
    y: GLfloat,
    z: GLfloat,
    r: GLfloat,
    g: GLfloat,
    b: GLfloat,
    a: GLfloat,
    s: GLfloat,
    t: GLfloat,
    nx: GLfloat,
    ny: GLfloat,
    nz: GLfloat,
}

const VERTEX_STRIDE: GLsizei = mem::size_of::<ImmediateVertex>() as GLsizei;
const FLOAT_SIZE: usize = mem::size_of::<GLfloat>();

struct ImmediateState {
    vertices: Vec<ImmediateVertex>,
    mode: GLenum,
    current_color: [GLfloat; 4],
    current_texcoord: [GLfloat; 2],
    current_normal: [GLfloat; 3],
    active: bool,
    vao: GLuint,
    vbo: GLuint,
    ibo: GLuint,
    buffers_created: bool,
}

impl ImmediateState {
    fn push_vertex(&mut self, x: GLfloat, y: GLfloat, z: GLfloat) {
        if !self.active || self.vertices.len() >= MAX_IMMEDIATE_VERTICES {
            return;
        }
        self.vertices.push(ImmediateVertex {
            x,
            y,
            z,
            r: self.current_color[0],
            g: self.current_color[1],
            b: self.current_color[2],
            a: self.current_color[3],
            s: self.current_texcoord[0],
            t: self.current_texcoord[1],
            nx: self.current_normal[0],
            ny: self.current_normal[1],
            nz: self.current_normal[2],
        });
    }

    /// The VAO/VBO/IBO are created on the first vertex-carrying `glEnd` and
    /// retained for the process lifetime.
    unsafe fn ensure_buffers(&mut self) {
        if self.buffers_created {
            return;
        }
        gles32::GenVertexArrays(1, &mut self.vao);
        gles32::GenBuffers(1, &mut self.vbo);
        gles32::GenBuffers(1, &mut self.ibo);
        self.buffers_created = true;
    }
}

lazy_static! {
    static ref IMMEDIATE: Mutex<ImmediateState> = Mutex::new(ImmediateState {
        vertices: Vec::with_capacity(MAX_IMMEDIATE_VERTICES),
        mode: 0,
        current_color: [1.0, 1.0, 1.0, 1.0],
        current_texcoord: [0.0, 0.0],
        current_normal: [0.0, 0.0, 1.0],
        active: false,
        vao: 0,
        vbo: 0,
        ibo: 0,
        buffers_created: false,
    });
}

pub unsafe extern "C" fn glBegin(mode: GLenum) {
    let mut state = IMMEDIATE.lock().unwrap();
    state.mode = mode;
    state.vertices.clear();
    state.active = true;
}

pub unsafe extern "C" fn glEnd() {
    let mut state = IMMEDIATE.lock().unwrap();
    if !state.active || state.vertices.is_empty() {
        state.active = false;
        return;
    }

    state.ensure_buffers();
    gles32::BindVertexArray(state.vao);
    gles32::BindBuffer(gles32::ARRAY_BUFFER, state.vbo);
    gles32::BufferData(
        gles32::ARRAY_BUFFER,
        (state.vertices.len() * mem::size_of::<ImmediateVertex>()) as GLsizeiptr,
        state.vertices.as_ptr() as *const c_void,
        gles32::DYNAMIC_DRAW,
    );

    // (location, components, offset in floats)
    const ATTRIBUTES: [(GLuint, GLint, usize); 4] = [
        (0, 3, 0), // position
        (1, 4, 3), // color
        (2, 2, 7), // texture co-ordinates
        (3, 3, 9), // normal
    ];
    for (location, components, offset) in ATTRIBUTES {
        gles32::EnableVertexAttribArray(location);
        gles32::VertexAttribPointer(
            location,
            components,
            gles32::FLOAT,
            gles32::FALSE,
            VERTEX_STRIDE,
            (offset * FLOAT_SIZE) as *const c_void,
        );
    }

    let vertex_count = state.vertices.len();
    match state.mode {
        gl46::QUADS => {
            let quad_count = vertex_count / 4;
            let mut indices: Vec<GLushort> = Vec::with_capacity(quad_count * 6);
            for quad in 0..quad_count {
                let base = (quad * 4) as GLushort;
                indices.extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
            }
            gles32::BindBuffer(gles32::ELEMENT_ARRAY_BUFFER, state.ibo);
            gles32::BufferData(
                gles32::ELEMENT_ARRAY_BUFFER,
                (indices.len() * mem::size_of::<GLushort>()) as GLsizeiptr,
                indices.as_ptr() as *const c_void,
                gles32::DYNAMIC_DRAW,
            );
            if !indices.is_empty() {
                gles32::DrawElements(
                    gles32::TRIANGLES,
                    indices.len() as GLsizei,
                    gles32::UNSIGNED_SHORT,
                    std::ptr::null(),
                );
            }
            gles32::BindBuffer(gles32::ELEMENT_ARRAY_BUFFER, 0);
        }
        gl46::QUAD_STRIP => {
            gles32::DrawArrays(gles32::TRIANGLE_STRIP, 0, vertex_count as GLsizei);
        }
        mode => {
            gles32::DrawArrays(mode, 0, vertex_count as GLsizei);
        }
    }

    for (location, _, _) in ATTRIBUTES {
        gles32::DisableVertexAttribArray(location);
    }
    gles32::BindVertexArray(0);
    state.active = false;
}

pub unsafe extern "C" fn glVertex3f(x: GLfloat, y: GLfloat, z: GLfloat) {
    IMMEDIATE.lock().unwrap().push_vertex(x, y, z);
}

pub unsafe extern "C" fn glVertex2f(x: GLfloat, y: GLfloat) {
    glVertex3f(x, y, 0.0);
}

pub unsafe extern "C" fn glVertex3d(x: c_double, y: c_double, z: c_double) {
    glVertex3f(x as GLfloat, y as GLfloat, z as GLfloat);
}

pub unsafe extern "C" fn glVertex2d(x: c_double, y: c_double) {
    glVertex3f(x as GLfloat, y as GLfloat, 0.0);
}

pub unsafe extern "C" fn glTexCoord2f(s: GLfloat, t: GLfloat) {
    IMMEDIATE.lock().unwrap().current_texcoord = [s, t];
}

pub unsafe extern "C" fn glTexCoord2d(s: c_double, t: c_double) {
    glTexCoord2f(s as GLfloat, t as GLfloat);
}

pub unsafe extern "C" fn glColor4f(r: GLfloat, g: GLfloat, b: GLfloat, a: GLfloat) {
    IMMEDIATE.lock().unwrap().current_color = [r, g, b, a];
}

pub unsafe extern "C" fn glColor3f(r: GLfloat, g: GLfloat, b: GLfloat) {
    glColor4f(r, g, b, 1.0);
}

pub unsafe extern "C" fn glColor3d(r: c_double, g: c_double, b: c_double) {
    glColor4f(r as GLfloat, g as GLfloat, b as GLfloat, 1.0);
}

pub unsafe extern "C" fn glColor4d(r: c_double, g: c_double, b: c_double, a: c_double) {
    glColor4f(r as GLfloat, g as GLfloat, b as GLfloat, a as GLfloat);
}

pub unsafe extern "C" fn glColor3ub(r: GLubyte, g: GLubyte, b: GLubyte) {
    glColor4f(
        r as GLfloat / 255.0,
        g as GLfloat / 255.0,
        b as GLfloat / 255.0,
        1.0,
    );
}

pub unsafe extern "C" fn glColor4ub(r: GLubyte, g: GLubyte, b: GLubyte, a: GLubyte) {
    glColor4f(
        r as GLfloat / 255.0,
        g as GLfloat / 255.0,
        b as GLfloat / 255.0,
        a as GLfloat / 255.0,
    );
}

pub unsafe extern "C" fn glNormal3f(nx: GLfloat, ny: GLfloat, nz: GLfloat) {
    IMMEDIATE.lock().unwrap().current_normal = [nx, ny, nz];
}
