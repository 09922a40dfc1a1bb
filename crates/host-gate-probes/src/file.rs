// crates/host-gate-probes/src/file.rs
// ============================================================================
// Module: File Probe
// Description: Filesystem metadata, ownership, and content queries.
// Purpose: Report existence, type, ownership, mode, size, and content of a path.
// Dependencies: host-gate-core
// ============================================================================

//! ## Overview
//! The file probe inspects one path. Existence and type come from the entry
//! itself (symlinks are reported as `symlink`); every other field follows the
//! link. Owner and group names are resolved through the `passwd` and `group`
//! databases under the configured etc root, falling back to the numeric id.
//! Content reads are bounded by `max_file_bytes`.
//!
//! Invariants:
//! - A missing path is observed as `exists = false`; any field that needs the
//!   file's metadata or content then fails with `not_found`.
//! - Content beyond the byte limit fails the probe rather than being truncated.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs;
use std::fs::File;
use std::fs::Metadata;
use std::io::Read;
use std::path::Path;
use std::path::PathBuf;

use host_gate_core::DEFAULT_HASH_ALGORITHM;
use host_gate_core::Observation;
use host_gate_core::ProbeError;
use host_gate_core::ProbeErrorKind;
use host_gate_core::ProbeRequest;
use host_gate_core::Prober;
use host_gate_core::hash_bytes;
use host_gate_core::render_mode;

// ============================================================================
// SECTION: Configuration
// ============================================================================

/// Configuration for the file probe.
///
/// # Invariants
/// - `max_file_bytes` is non-zero.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileProbeConfig {
    /// Root of the configuration tree holding `passwd` and `group`.
    pub etc_root: PathBuf,
    /// Maximum bytes read for `content` and `sha256`.
    pub max_file_bytes: usize,
}

impl Default for FileProbeConfig {
    fn default() -> Self {
        Self {
            etc_root: PathBuf::from("/etc"),
            max_file_bytes: 4 * 1024 * 1024,
        }
    }
}

// ============================================================================
// SECTION: Probe Implementation
// ============================================================================

/// Probe for filesystem paths.
pub struct FileProbe {
    /// Probe configuration.
    config: FileProbeConfig,
}

impl FileProbe {
    /// Creates a file probe.
    #[must_use]
    pub const fn new(config: FileProbeConfig) -> Self {
        Self {
            config,
        }
    }

    /// Resolves a numeric id to a name through a colon-separated database.
    fn resolve_name(&self, database: &str, id: u32) -> String {
        let path = self.config.etc_root.join(database);
        let Ok(content) = fs::read_to_string(path) else {
            return id.to_string();
        };
        let wanted = id.to_string();
        content
            .lines()
            .filter(|line| !line.starts_with('#'))
            .find_map(|line| {
                let mut parts = line.split(':');
                let name = parts.next()?;
                let entry_id = parts.nth(1)?;
                (entry_id == wanted).then(|| name.to_string())
            })
            .unwrap_or(wanted)
    }

    /// Reads the file content within the configured limit.
    fn read_limited(&self, path: &Path) -> Result<Vec<u8>, ProbeError> {
        let context = path.display().to_string();
        let file = File::open(path).map_err(|err| ProbeError::from_io(&context, &err))?;
        let max_bytes = self.config.max_file_bytes;
        let limit = u64::try_from(max_bytes.saturating_add(1)).map_err(|_| {
            ProbeError::new(ProbeErrorKind::InvalidParams, "file size limit exceeds u64")
        })?;
        let mut buf = Vec::new();
        file.take(limit).read_to_end(&mut buf).map_err(|err| ProbeError::from_io(&context, &err))?;
        if buf.len() > max_bytes {
            return Err(ProbeError::new(
                ProbeErrorKind::OutputTooLarge,
                format!("{context} exceeds {max_bytes} bytes"),
            ));
        }
        Ok(buf)
    }
}

impl Prober for FileProbe {
    fn probe(&self, request: &ProbeRequest) -> Result<Observation, ProbeError> {
        let path = Path::new(request.subject.identifier.as_str());
        let context = path.display().to_string();
        let mut observation = Observation::new();

        let entry = match fs::symlink_metadata(path) {
            Ok(entry) => entry,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                if request.wants_any_except(&["exists"]) {
                    return Err(ProbeError::new(
                        ProbeErrorKind::NotFound,
                        format!("file not found: {context}"),
                    ));
                }
                observation.insert("exists", false);
                return Ok(observation);
            }
            Err(err) => return Err(ProbeError::from_io(&context, &err)),
        };

        if request.wants("exists") {
            observation.insert("exists", true);
        }
        if request.wants("type") {
            observation.insert("type", entry_type(&entry));
        }
        if !request.wants_any_except(&["exists", "type"]) {
            return Ok(observation);
        }

        let target = fs::metadata(path).map_err(|err| ProbeError::from_io(&context, &err))?;
        if request.wants("owner") || request.wants("group") || request.wants("mode") {
            let Some(ids) = ownership(&target) else {
                return Err(ProbeError::new(
                    ProbeErrorKind::Unsupported,
                    "file ownership is not available on this platform",
                ));
            };
            if request.wants("owner") {
                observation.insert("owner", self.resolve_name("passwd", ids.uid));
            }
            if request.wants("group") {
                observation.insert("group", self.resolve_name("group", ids.gid));
            }
            if request.wants("mode") {
                observation.insert("mode", render_mode(ids.mode));
            }
        }
        if request.wants("size") {
            observation.insert("size", target.len());
        }
        if request.wants("content") || request.wants("sha256") {
            if !target.is_file() {
                return Err(ProbeError::new(
                    ProbeErrorKind::Unsupported,
                    format!("not a regular file: {context}"),
                ));
            }
            let bytes = self.read_limited(path)?;
            if request.wants("sha256") {
                observation.insert("sha256", hash_bytes(DEFAULT_HASH_ALGORITHM, &bytes).value);
            }
            if request.wants("content") {
                observation.insert("content", String::from_utf8_lossy(&bytes).into_owned());
            }
        }
        Ok(observation)
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Numeric ownership and permission bits of a file.
struct Ownership {
    /// Owning user id.
    uid: u32,
    /// Owning group id.
    gid: u32,
    /// Raw mode bits.
    mode: u32,
}

/// Classifies a directory entry without following links.
fn entry_type(entry: &Metadata) -> &'static str {
    let file_type = entry.file_type();
    if file_type.is_symlink() {
        "symlink"
    } else if file_type.is_dir() {
        "directory"
    } else if file_type.is_file() {
        "file"
    } else {
        "other"
    }
}

/// Returns ownership and mode bits.
#[cfg(unix)]
fn ownership(metadata: &Metadata) -> Option<Ownership> {
    use std::os::unix::fs::MetadataExt;
    Some(Ownership {
        uid: metadata.uid(),
        gid: metadata.gid(),
        mode: metadata.mode(),
    })
}

/// Returns ownership and mode bits.
#[cfg(not(unix))]
const fn ownership(_metadata: &Metadata) -> Option<Ownership> {
    None
}
