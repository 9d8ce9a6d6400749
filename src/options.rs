/*
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */
//! Management of user-configurable options.
//!
//! The hosted application (or the shell embedding this library) can adjust
//! these through the configuration entry point in [crate]. Most of them gate
//! optional subsystems; translation correctness never depends on them.

use lazy_static::lazy_static;
use std::sync::Mutex;

/// Struct containing all user-configurable options.
#[derive(Copy, Clone)]
pub struct Options {
    pub shader_cache_enabled: bool,
    pub draw_call_batching: bool,
    pub adaptive_resolution: bool,
    pub async_texture_loading: bool,
    /// Use a Vulkan-backed ES implementation if the surface provider offers
    /// one. Stored for the embedder; nothing in the core consults it.
    pub vulkan_backend: bool,
    /// Render-target scale in [0.25, 1.0].
    pub resolution_scale: f32,
    pub max_cached_shaders: usize,
}

impl Default for Options {
    fn default() -> Self {
        Options {
            shader_cache_enabled: true,
            draw_call_batching: true,
            adaptive_resolution: true,
            async_texture_loading: true,
            vulkan_backend: false,
            resolution_scale: 1.0,
            max_cached_shaders: 1024,
        }
    }
}

lazy_static! {
    static ref OPTIONS: Mutex<Options> = Mutex::new(Options::default());
}

/// Get a copy of the current options.
pub fn current() -> Options {
    *OPTIONS.lock().unwrap()
}

/// Replace the current options.
pub fn replace(options: Options) {
    *OPTIONS.lock().unwrap() = options;
}
