/*
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */
//! Draw-call batching.
//!
//! Callers that issue many small `glDrawArrays` ranges can route them
//! through here instead; adjacent submissions with the same mode and
//! contiguous vertex ranges are merged into a single draw at flush time.
//! Submission order is preserved: runs are dispatched left to right.

use super::gles32_raw as gles32;
use super::gles32_raw::types::*;
use lazy_static::lazy_static;
use std::sync::Mutex;

/// Submissions past this cap force a flush.
pub const MAX_BATCH_DRAWS: usize = 256;

#[derive(Copy, Clone)]
struct BatchDraw {
    mode: GLenum,
    first: GLint,
    count: GLsizei,
}

struct BatchQueue {
    draws: Vec<BatchDraw>,
    active: bool,
}

lazy_static! {
    static ref BATCH: Mutex<BatchQueue> = Mutex::new(BatchQueue {
        draws: Vec::with_capacity(MAX_BATCH_DRAWS),
        active: false,
    });
}

unsafe fn flush_queue(batch: &mut BatchQueue) {
    if !batch.active || batch.draws.is_empty() {
        batch.draws.clear();
        batch.active = false;
        return;
    }

    let mut i = 0;
    while i < batch.draws.len() {
        let mode = batch.draws[i].mode;
        let first = batch.draws[i].first;
        let mut total_count = batch.draws[i].count;

        // Extend the run while the next entry continues this one.
        let mut j = i + 1;
        while j < batch.draws.len()
            && batch.draws[j].mode == mode
            && batch.draws[j].first == first + total_count
        {
            total_count += batch.draws[j].count;
            j += 1;
        }

        gles32::DrawArrays(mode, first, total_count);
        i = j;
    }

    batch.draws.clear();
    batch.active = false;
}

/// Start collecting submissions.
pub fn begin() {
    let mut batch = BATCH.lock().unwrap();
    batch.draws.clear();
    batch.active = true;
}

/// Dispatch everything collected so far and deactivate the queue.
pub unsafe fn flush() {
    let mut batch = BATCH.lock().unwrap();
    flush_queue(&mut batch);
}

/// Submit one `glDrawArrays` range. When the queue is inactive or full, the
/// range is dispatched immediately (after flushing whatever is queued).
pub unsafe fn draw(mode: GLenum, first: GLint, count: GLsizei) {
    let mut batch = BATCH.lock().unwrap();
    if !batch.active || batch.draws.len() >= MAX_BATCH_DRAWS {
        if batch.active {
            flush_queue(&mut batch);
        }
        gles32::DrawArrays(mode, first, count);
        return;
    }
    batch.draws.push(BatchDraw { mode, first, count });
}

#[no_mangle]
pub extern "C" fn prismgl_batch_begin() {
    begin();
}

#[no_mangle]
pub unsafe extern "C" fn prismgl_batch_flush() {
    flush();
}

#[no_mangle]
pub unsafe extern "C" fn prismgl_batch_draw(mode: GLenum, first: GLint, count: GLsizei) {
    draw(mode, first, count);
}
