/*
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */
//! On-disk cache of linked program binaries.
//!
//! Compiling and linking translated shaders is the most expensive part of a
//! cold start, so linked programs are persisted with
//! `glGetProgramBinary`/`glProgramBinary` and keyed by an FNV-1a hash of
//! the source pair. One file per program under `<cacheDir>/shaders/`, named
//! `<hash as 16 lowercase hex digits>.pglbin`: a 4-byte binary-format enum
//! followed by the driver's opaque payload.
//!
//! Program binaries are driver-specific; a driver update invalidates them.
//! A binary the driver rejects (or a file we can't read) is evicted from
//! memory and disk, and the caller recompiles as if it were a miss.
//!
//! All public operations hold one mutex across their disk I/O, so the index
//! may be inspected from other threads; the GL calls themselves still
//! belong to the context-owner thread.

use crate::gles::gles32_raw as gles32;
use crate::gles::gles32_raw::types::{GLenum, GLint, GLsizei, GLuint};
use lazy_static::lazy_static;
use std::ffi::{c_char, c_void, CStr};
use std::fs;
use std::mem;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Most entries the in-memory index will hold.
pub const MAX_CACHE_ENTRIES: usize = 2048;
pub const CACHE_FILE_EXT: &str = ".pglbin";

const FNV_OFFSET_BASIS: u64 = 14695981039346656037;
const FNV_PRIME: u64 = 1099511628211;

/// 64-bit FNV-1a over `vertex_source || 0xFF || fragment_source`. The
/// separator byte keeps ("ab", "c") and ("a", "bc") distinct.
pub fn hash_shader_source(vertex_src: &str, fragment_src: &str) -> u64 {
    let mut hash = FNV_OFFSET_BASIS;
    for &byte in vertex_src.as_bytes() {
        hash ^= byte as u64;
        hash = hash.wrapping_mul(FNV_PRIME);
    }
    hash ^= 0xFF;
    hash = hash.wrapping_mul(FNV_PRIME);
    for &byte in fragment_src.as_bytes() {
        hash ^= byte as u64;
        hash = hash.wrapping_mul(FNV_PRIME);
    }
    hash
}

struct CacheEntry {
    hash: u64,
    /// 0 until the binary has been materialized into a GL program.
    program: GLuint,
    path: PathBuf,
    loaded: bool,
}

pub struct ShaderCache {
    entries: Vec<CacheEntry>,
    /// `<cacheDir>/shaders`.
    dir: PathBuf,
}

impl ShaderCache {
    /// Open (creating if necessary) the cache under `cache_dir` and index
    /// the binaries already on disk. Nothing is loaded into GL yet.
    pub fn init(cache_dir: &Path) -> Result<ShaderCache, String> {
        let dir = cache_dir.join("shaders");
        fs::create_dir_all(&dir).map_err(|e| {
            format!(
                "Failed to create shader cache directory {}: {}",
                dir.display(),
                e
            )
        })?;

        let mut entries = Vec::new();
        if let Ok(listing) = fs::read_dir(&dir) {
            for file in listing.flatten() {
                if entries.len() >= MAX_CACHE_ENTRIES {
                    break;
                }
                let name = file.file_name();
                let name = name.to_string_lossy();
                let Some(stem) = name.strip_suffix(CACHE_FILE_EXT) else {
                    continue;
                };
                let Ok(hash) = u64::from_str_radix(stem, 16) else {
                    continue;
                };
                entries.push(CacheEntry {
                    hash,
                    program: 0,
                    path: dir.join(name.as_ref()),
                    loaded: false,
                });
            }
        }

        log_dbg!(
            "Shader cache initialized with {} entries at {}",
            entries.len(),
            dir.display()
        );
        Ok(ShaderCache { entries, dir })
    }

    /// The on-disk path for a hash.
    pub fn file_path(&self, hash: u64) -> PathBuf {
        self.dir.join(format!("{:016x}{}", hash, CACHE_FILE_EXT))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Fetch the program for a hash, materializing it from disk on first
    /// use. Returns 0 on a miss, and on an invalid binary (which is evicted
    /// so the caller's recompile can replace it).
    ///
    /// # Safety
    /// Must be called from the GL context-owner thread.
    pub unsafe fn get(&mut self, hash: u64) -> GLuint {
        let Some(index) = self.entries.iter().position(|entry| entry.hash == hash) else {
            return 0;
        };
        if self.entries[index].loaded {
            return self.entries[index].program;
        }

        match load_program_binary(&self.entries[index].path) {
            Ok(program) => {
                self.entries[index].program = program;
                self.entries[index].loaded = true;
                log_dbg!("Loaded cached shader: {:016x}", hash);
                program
            }
            Err(reason) => {
                log!("Cached shader binary invalid ({}), removing", reason);
                let entry = self.entries.swap_remove(index);
                let _ = fs::remove_file(&entry.path);
                0
            }
        }
    }

    /// Persist a linked program. No-op if the hash is already present, the
    /// index is full, or the driver has no binary representation for the
    /// program.
    ///
    /// # Safety
    /// Must be called from the GL context-owner thread, with `program` a
    /// linked program of the current context.
    pub unsafe fn put(&mut self, hash: u64, program: GLuint) {
        if self.entries.iter().any(|entry| entry.hash == hash) {
            return;
        }
        if self.entries.len() >= MAX_CACHE_ENTRIES {
            log!("Shader cache full ({} entries)", self.entries.len());
            return;
        }

        let mut binary_length: GLint = 0;
        gles32::GetProgramiv(program, gles32::PROGRAM_BINARY_LENGTH, &mut binary_length);
        if binary_length <= 0 {
            log!("Program has no binary representation");
            return;
        }

        let mut binary = vec![0u8; binary_length as usize];
        let mut actual_length: GLsizei = 0;
        let mut format: GLenum = 0;
        gles32::GetProgramBinary(
            program,
            binary_length,
            &mut actual_length,
            &mut format,
            binary.as_mut_ptr() as *mut c_void,
        );
        let actual_length = (actual_length.max(0) as usize).min(binary.len());
        binary.truncate(actual_length);

        let path = self.file_path(hash);
        let mut file_data = Vec::with_capacity(mem::size_of::<GLenum>() + binary.len());
        file_data.extend_from_slice(&format.to_ne_bytes());
        file_data.extend_from_slice(&binary);
        match fs::write(&path, &file_data) {
            Ok(()) => {
                self.entries.push(CacheEntry {
                    hash,
                    program,
                    path,
                    loaded: true,
                });
                log_dbg!("Cached shader: {:016x} ({} bytes)", hash, actual_length);
            }
            Err(e) => {
                log!("Failed to write shader cache file {}: {}", path.display(), e);
            }
        }
    }

    /// Drop the in-memory index. The GL programs belong to the context and
    /// are not deleted here; the files stay for the next run.
    pub fn shutdown(&mut self) {
        self.entries.clear();
        log_dbg!("Shader cache shutdown");
    }
}

/// Read `(format || payload)` from disk and hand it to the driver.
unsafe fn load_program_binary(path: &Path) -> Result<GLuint, String> {
    let bytes = fs::read(path).map_err(|e| format!("read failed: {}", e))?;
    if bytes.len() <= mem::size_of::<GLenum>() {
        return Err("file truncated".to_string());
    }
    let format = GLenum::from_ne_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
    let payload = &bytes[mem::size_of::<GLenum>()..];

    let program = gles32::CreateProgram();
    gles32::ProgramBinary(
        program,
        format,
        payload.as_ptr() as *const c_void,
        payload.len() as GLsizei,
    );
    let mut link_status: GLint = 0;
    gles32::GetProgramiv(program, gles32::LINK_STATUS, &mut link_status);
    if link_status != gles32::TRUE as GLint {
        gles32::DeleteProgram(program);
        return Err("driver update?".to_string());
    }
    Ok(program)
}

lazy_static! {
    static ref SHADER_CACHE: Mutex<Option<ShaderCache>> = Mutex::new(None);
}

/// Initialize the process-wide cache instance. Idempotent.
pub fn init_global(cache_dir: &Path) -> bool {
    let mut cache = SHADER_CACHE.lock().unwrap();
    if cache.is_some() {
        return true;
    }
    match ShaderCache::init(cache_dir) {
        Ok(initialized) => {
            *cache = Some(initialized);
            true
        }
        Err(message) => {
            log!("{}", message);
            false
        }
    }
}

/// Release the process-wide cache index.
pub fn shutdown_global() {
    let mut cache = SHADER_CACHE.lock().unwrap();
    if let Some(cache) = cache.as_mut() {
        cache.shutdown();
    }
    *cache = None;
}

// ===== C entry points =====

/// # Safety
/// `cache_dir` must be a valid C string or null.
#[no_mangle]
pub unsafe extern "C" fn prismgl_shader_cache_init(cache_dir: *const c_char) -> bool {
    if cache_dir.is_null() {
        return false;
    }
    let dir = CStr::from_ptr(cache_dir).to_string_lossy().into_owned();
    init_global(Path::new(&dir))
}

#[no_mangle]
pub extern "C" fn prismgl_shader_cache_shutdown() {
    shutdown_global();
}

/// # Safety
/// Must be called from the GL context-owner thread.
#[no_mangle]
pub unsafe extern "C" fn prismgl_shader_cache_get(hash: u64) -> GLuint {
    let mut cache = SHADER_CACHE.lock().unwrap();
    match cache.as_mut() {
        Some(cache) => cache.get(hash),
        None => 0,
    }
}

/// # Safety
/// Must be called from the GL context-owner thread.
#[no_mangle]
pub unsafe extern "C" fn prismgl_shader_cache_put(hash: u64, program: GLuint) {
    let mut cache = SHADER_CACHE.lock().unwrap();
    if let Some(cache) = cache.as_mut() {
        cache.put(hash, program);
    }
}

/// # Safety
/// The sources must be valid C strings; null is treated as empty.
#[no_mangle]
pub unsafe extern "C" fn prismgl_hash_shader_source(
    vertex_src: *const c_char,
    fragment_src: *const c_char,
) -> u64 {
    let vertex = if vertex_src.is_null() {
        ""
    } else {
        c_str_or_empty(CStr::from_ptr(vertex_src))
    };
    let fragment = if fragment_src.is_null() {
        ""
    } else {
        c_str_or_empty(CStr::from_ptr(fragment_src))
    };
    hash_shader_source(vertex, fragment)
}

fn c_str_or_empty(s: &CStr) -> &str {
    s.to_str().unwrap_or("")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gles::test_driver::{self, Call};

    fn temp_cache_dir(tag: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "prismgl-cache-test-{}-{}",
            std::process::id(),
            tag
        ));
        let _ = fs::remove_dir_all(&dir);
        dir
    }

    #[test]
    fn fnv1a_matches_the_canonical_fold() {
        // Fold the bytes 0x41, 0xFF, 0x42 by hand through the canonical
        // constants; hashing ("A", "B") must agree.
        let mut expected: u64 = 14695981039346656037;
        for byte in [0x41u64, 0xFF, 0x42] {
            expected ^= byte;
            expected = expected.wrapping_mul(1099511628211);
        }
        assert_eq!(hash_shader_source("A", "B"), expected);
    }

    #[test]
    fn hash_separator_keeps_the_pair_boundary() {
        assert_ne!(
            hash_shader_source("ab", "c"),
            hash_shader_source("a", "bc")
        );
    }

    #[test]
    fn file_paths_are_sixteen_hex_digits() {
        let dir = temp_cache_dir("paths");
        let cache = ShaderCache::init(&dir).unwrap();
        assert_eq!(
            cache.file_path(0x0123456789ABCDEF),
            dir.join("shaders").join("0123456789abcdef.pglbin")
        );
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn get_on_an_unknown_hash_is_a_miss() {
        let _driver = test_driver::install();
        let dir = temp_cache_dir("miss");
        let mut cache = ShaderCache::init(&dir).unwrap();
        assert_eq!(unsafe { cache.get(0xDEAD) }, 0);
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn put_writes_format_then_payload() {
        let _driver = test_driver::install();
        test_driver::set_program_binary(0xBEEF, b"binary-payload");
        let dir = temp_cache_dir("put");
        let mut cache = ShaderCache::init(&dir).unwrap();
        let hash = hash_shader_source("vertex", "fragment");
        unsafe { cache.put(hash, 42) };

        let file = fs::read(cache.file_path(hash)).unwrap();
        assert_eq!(&file[..4], &0xBEEFu32.to_ne_bytes());
        assert_eq!(&file[4..], b"binary-payload");
        // Already materialized: no disk read needed.
        assert_eq!(unsafe { cache.get(hash) }, 42);
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn round_trip_restores_through_program_binary() {
        let _driver = test_driver::install();
        test_driver::set_program_binary(0x1234, b"opaque-driver-blob");
        let dir = temp_cache_dir("roundtrip");
        let hash = hash_shader_source("void main() {}", "void main() {}");
        {
            let mut cache = ShaderCache::init(&dir).unwrap();
            unsafe { cache.put(hash, 42) };
        }

        // A fresh index, as after a process restart.
        let mut cache = ShaderCache::init(&dir).unwrap();
        assert_eq!(cache.len(), 1);
        test_driver::clear_calls();
        let program = unsafe { cache.get(hash) };
        assert_ne!(program, 0);
        assert_ne!(program, 42);
        let calls = test_driver::calls();
        assert!(calls.contains(&Call::ProgramBinary {
            program,
            format: 0x1234,
            data: b"opaque-driver-blob".to_vec(),
        }));
        // Second get returns the materialized program without driver work.
        test_driver::clear_calls();
        assert_eq!(unsafe { cache.get(hash) }, program);
        assert!(test_driver::calls().is_empty());
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn truncated_file_is_evicted() {
        let _driver = test_driver::install();
        test_driver::set_program_binary(0x1234, b"opaque-driver-blob");
        let dir = temp_cache_dir("truncated");
        let hash = hash_shader_source("v", "f");
        {
            let mut cache = ShaderCache::init(&dir).unwrap();
            unsafe { cache.put(hash, 7) };
        }

        let mut cache = ShaderCache::init(&dir).unwrap();
        let path = cache.file_path(hash);
        fs::write(&path, b"\x01\x02").unwrap();
        assert_eq!(unsafe { cache.get(hash) }, 0);
        assert!(cache.is_empty());
        assert!(!path.exists());
        // The entry is gone, so this is now an ordinary miss.
        assert_eq!(unsafe { cache.get(hash) }, 0);
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn driver_rejected_binary_is_evicted() {
        let _driver = test_driver::install();
        test_driver::set_program_binary(0x1234, b"stale-blob");
        let dir = temp_cache_dir("rejected");
        let hash = hash_shader_source("v", "f");
        {
            let mut cache = ShaderCache::init(&dir).unwrap();
            unsafe { cache.put(hash, 7) };
        }

        test_driver::set_link_status(false);
        let mut cache = ShaderCache::init(&dir).unwrap();
        let path = cache.file_path(hash);
        test_driver::clear_calls();
        assert_eq!(unsafe { cache.get(hash) }, 0);
        assert!(!path.exists());
        assert!(cache.is_empty());
        // The failed program was deleted, not leaked.
        assert!(test_driver::calls()
            .iter()
            .any(|call| matches!(call, Call::DeleteProgram(_))));
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn put_is_a_no_op_for_duplicate_hashes() {
        let _driver = test_driver::install();
        test_driver::set_program_binary(0x1234, b"blob");
        let dir = temp_cache_dir("dup");
        let mut cache = ShaderCache::init(&dir).unwrap();
        let hash = hash_shader_source("v", "f");
        unsafe {
            cache.put(hash, 7);
            cache.put(hash, 8);
        }
        assert_eq!(cache.len(), 1);
        assert_eq!(unsafe { cache.get(hash) }, 7);
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn put_without_a_binary_representation_writes_nothing() {
        let _driver = test_driver::install();
        test_driver::set_program_binary(0, b"");
        let dir = temp_cache_dir("nobinary");
        let mut cache = ShaderCache::init(&dir).unwrap();
        let hash = hash_shader_source("v", "f");
        unsafe { cache.put(hash, 7) };
        assert!(cache.is_empty());
        assert!(!cache.file_path(hash).exists());
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn shutdown_clears_the_index_but_keeps_files() {
        let _driver = test_driver::install();
        test_driver::set_program_binary(0x1234, b"blob");
        let dir = temp_cache_dir("shutdown");
        let mut cache = ShaderCache::init(&dir).unwrap();
        let hash = hash_shader_source("v", "f");
        unsafe { cache.put(hash, 7) };
        let path = cache.file_path(hash);
        cache.shutdown();
        assert!(cache.is_empty());
        assert!(path.exists());
        // No DeleteProgram: the context owns the programs.
        assert!(!test_driver::calls()
            .iter()
            .any(|call| matches!(call, Call::DeleteProgram(_))));
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn init_skips_files_with_unparsable_names() {
        let _driver = test_driver::install();
        let dir = temp_cache_dir("junk");
        fs::create_dir_all(dir.join("shaders")).unwrap();
        fs::write(dir.join("shaders").join("not-a-hash.pglbin"), b"junk").unwrap();
        fs::write(dir.join("shaders").join("README.txt"), b"hi").unwrap();
        fs::write(
            dir.join("shaders").join("00000000000000ff.pglbin"),
            b"\x00\x00\x00\x00payload",
        )
        .unwrap();
        let cache = ShaderCache::init(&dir).unwrap();
        assert_eq!(cache.len(), 1);
        let _ = fs::remove_dir_all(&dir);
    }
}
