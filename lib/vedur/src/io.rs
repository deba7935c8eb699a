use anyhow::{Context, Result};
use serde::Serialize;
use std::collections::hash_map::DefaultHasher;
use std::fs::{self, File};
use std::hash::Hasher;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

pub fn ensure_dir(path: impl AsRef<Path>) -> Result<()> {
    fs::create_dir_all(path.as_ref())
        .with_context(|| format!("create_dir_all {}", path.as_ref().display()))
}

pub fn list_files_recursive(path: impl AsRef<Path>) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in walkdir::WalkDir::new(path) {
        let entry = entry?;
        if entry.file_type().is_file() {
            files.push(entry.path().to_path_buf());
        }
    }
    files.sort();
    Ok(files)
}

pub fn read_lines(path: impl AsRef<Path>) -> Result<impl Iterator<Item = Result<String>>> {
    let file = File::open(path.as_ref())
        .with_context(|| format!("open {}", path.as_ref().display()))?;
    let reader = BufReader::new(file);
    Ok(reader.lines().map(|l| l.map_err(anyhow::Error::from)))
}

pub fn hash_to_partition<K: Serialize>(key: &K, num_partitions: usize) -> usize {
    let mut hasher = DefaultHasher::new();
    let bytes = serde_json::to_vec(key).expect("serialize key");
    hasher.write(&bytes);
    (hasher.finish() as usize) % num_partitions
}

/// Append one framed shuffle record: [klen][vlen][key][value], lengths as u32 LE.
pub fn write_bin(buf: &mut Vec<u8>, key: &[u8], value: &[u8]) {
    let klen = key.len() as u32;
    let vlen = value.len() as u32;
    buf.extend_from_slice(&klen.to_le_bytes());
    buf.extend_from_slice(&vlen.to_le_bytes());
    buf.extend_from_slice(key);
    buf.extend_from_slice(value);
}

/// Read one framed record at `off`; returns (key, value, next_offset).
/// Returns None at end of input or on a truncated frame.
pub fn read_bin_line(bytes: &[u8], off: usize) -> Option<(&[u8], &[u8], usize)> {
    if off + 8 > bytes.len() {
        return None;
    }
    let klen = u32::from_le_bytes(bytes[off..off + 4].try_into().ok()?) as usize;
    let vlen = u32::from_le_bytes(bytes[off + 4..off + 8].try_into().ok()?) as usize;
    let key_start = off + 8;
    let val_start = key_start + klen;
    let end = val_start + vlen;
    if end > bytes.len() {
        return None;
    }
    Some((&bytes[key_start..val_start], &bytes[val_start..end], end))
}

/// One emitted output line per group: serialized key, a tab, serialized statistics.
pub fn write_stats_line<K, V>(writer: &mut BufWriter<File>, key: &K, value: &V) -> Result<()>
where
    K: Serialize,
    V: Serialize,
{
    let key_str = serde_json::to_string(key)?;
    let value_str = serde_json::to_string(value)?;
    writeln!(writer, "{}\t{}", key_str, value_str)?;
    Ok(())
}

pub fn open_writer(path: impl AsRef<Path>) -> Result<BufWriter<File>> {
    if let Some(parent) = path.as_ref().parent() {
        ensure_dir(parent)?;
    }
    let file = File::create(path.as_ref())
        .with_context(|| format!("create {}", path.as_ref().display()))?;
    Ok(BufWriter::new(file))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn framed_records_round_trip() {
        let mut buf = Vec::new();
        write_bin(&mut buf, b"zone", b"acc-bytes");
        write_bin(&mut buf, b"k2", b"");
        let (k, v, next) = read_bin_line(&buf, 0).unwrap();
        assert_eq!(k, b"zone");
        assert_eq!(v, b"acc-bytes");
        let (k2, v2, end) = read_bin_line(&buf, next).unwrap();
        assert_eq!(k2, b"k2");
        assert!(v2.is_empty());
        assert_eq!(end, buf.len());
        assert!(read_bin_line(&buf, end).is_none());
    }

    #[test]
    fn truncated_frame_is_rejected() {
        let mut buf = Vec::new();
        write_bin(&mut buf, b"key", b"value");
        assert!(read_bin_line(&buf[..buf.len() - 1], 0).is_none());
    }

    #[test]
    fn partitioning_is_stable() {
        let a = hash_to_partition(&"Colombia".to_string(), 8);
        let b = hash_to_partition(&"Colombia".to_string(), 8);
        assert_eq!(a, b);
        assert!(a < 8);
    }
}
