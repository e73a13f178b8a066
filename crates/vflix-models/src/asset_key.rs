//! Storage key derivation.
//!
//! All derived artifacts are namespaced under the `base` of the uploaded
//! source: the original filename stem. Source uploads get a timestamp and a
//! random 7-character suffix so repeated uploads of the same file never
//! collide; every other key is derived deterministically from `base` so
//! re-running a stage overwrites the same objects.
//!
//! Layout:
//!
//! ```text
//! videos/{base}_{unix_ts}_{rand7}.{ext}
//! thumbnails/{base}.jpg
//! hls/{base}/{base}_{H}p.m3u8
//! hls/{base}/{base}_{H}p_NNN.ts
//! hls/{base}/{base}_master.m3u8
//! exports/{entity}_{yyyy-mm-dd_hh-mm-ss}_{rand8}.json
//! ```

use chrono::{DateTime, Utc};
use rand::Rng;

/// Generate a random lowercase alphanumeric id of the given length.
fn random_id(len: usize) -> String {
    const CHARS: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";
    let mut rng = rand::rng();
    (0..len)
        .map(|_| CHARS[rng.random_range(0..CHARS.len())] as char)
        .collect()
}

/// Split a filename into (stem, extension-with-dot).
fn split_ext(filename: &str) -> (&str, &str) {
    match filename.rfind('.') {
        Some(idx) if idx > 0 => (&filename[..idx], &filename[idx..]),
        _ => (filename, ""),
    }
}

/// Generate the storage key for a freshly uploaded source file.
pub fn source_key(filename: &str, uploaded_at: DateTime<Utc>) -> String {
    let (stem, ext) = split_ext(filename);
    format!(
        "videos/{}_{}_{}{}",
        stem,
        uploaded_at.timestamp(),
        random_id(7),
        ext
    )
}

/// Extract the namespace base from an uploaded filename.
pub fn base_from_filename(filename: &str) -> String {
    split_ext(filename).0.to_string()
}

/// Extract the namespace base from a source storage key.
///
/// Strips the `_{ts}_{rand7}` suffix added at upload time; keys that do not
/// carry the suffix fall back to the plain filename stem.
pub fn base_from_key(key: &str) -> String {
    let filename = key.rsplit('/').next().unwrap_or(key);
    let stem = split_ext(filename).0;

    let mut parts = stem.rsplitn(3, '_');
    let rand = parts.next().unwrap_or_default();
    let ts = parts.next().unwrap_or_default();
    let rest = parts.next();

    let rand_ok = rand.len() == 7
        && rand
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit());
    let ts_ok = !ts.is_empty() && ts.chars().all(|c| c.is_ascii_digit());

    match (rest, rand_ok && ts_ok) {
        (Some(base), true) if !base.is_empty() => base.to_string(),
        _ => stem.to_string(),
    }
}

/// Storage key of the poster thumbnail.
pub fn thumbnail_key(base: &str) -> String {
    format!("thumbnails/{base}.jpg")
}

/// Prefix under which all HLS artifacts for a video live.
pub fn hls_prefix(base: &str) -> String {
    format!("hls/{base}/")
}

/// Recover the HLS prefix from a master playlist key.
pub fn hls_prefix_of_master(master_key: &str) -> String {
    match master_key.rsplit_once('/') {
        Some((dir, _)) => format!("{dir}/"),
        None => master_key.to_string(),
    }
}

/// Filename of the variant playlist for one rendition height.
pub fn variant_playlist_name(base: &str, height: u32) -> String {
    format!("{base}_{height}p.m3u8")
}

/// Filename of one TS segment.
pub fn segment_name(base: &str, height: u32, index: u32) -> String {
    format!("{base}_{height}p_{index:03}.ts")
}

/// Storage key of an HLS file (segment or playlist) by its local filename.
pub fn hls_segment_key(base: &str, filename: &str) -> String {
    format!("hls/{base}/{filename}")
}

/// Storage key of the master playlist.
pub fn hls_master_key(base: &str) -> String {
    format!("hls/{base}/{base}_master.m3u8")
}

/// Generate a timestamped export key for an entity snapshot.
pub fn export_key(entity_name: &str, at: DateTime<Utc>) -> String {
    format!(
        "exports/{}_{}_{}.json",
        entity_name,
        at.format("%Y-%m-%d_%H-%M-%S"),
        random_id(8)
    )
}
