use crate::io::read_bin_line;
use anyhow::Result;
use memmap2::Mmap;
use rayon::prelude::*;
use std::io::Write;
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tracing::error;

#[derive(Clone, Debug)]
pub struct SortOutcome {
    pub lines_in: u64,
    pub bytes_in: u64,
    pub sort_only_ms: u64,
    pub io_read_ms: u64,
    pub io_write_ms: u64,
}

// Given one reducer's partition files, produce a single file at out_path with
// records ordered by raw key bytes, so equal keys become adjacent for the
// streaming group pass. Record format is [klen][vlen][k][v].
pub fn external_sort_by_key(input_paths: &[PathBuf], out_path: &str) -> Result<SortOutcome> {
    // Mmap each input file and build record index: (file_idx, start, key_end, end)
    let mut file_maps: Vec<Mmap> = Vec::new();
    let mut all_lines: Vec<(usize, usize, usize, usize)> = Vec::new();
    let mut bytes_in: u64 = 0;
    let mut lines_in: u64 = 0;
    let mut io_read = Duration::from_nanos(0);

    for p in input_paths {
        match std::fs::File::open(p) {
            Ok(file) => {
                let meta_len = file.metadata().ok().map(|m| m.len()).unwrap_or(0);
                bytes_in += meta_len;
                // A partition with no records leaves a zero-length file; mmap
                // rejects those.
                if meta_len == 0 {
                    continue;
                }
                let read_start = Instant::now();
                match unsafe { Mmap::map(&file) } {
                    Ok(map) => {
                        let file_idx = file_maps.len();
                        let bytes = &map[..];
                        let mut off = 0usize;
                        while let Some((k, _v, next)) = read_bin_line(bytes, off) {
                            let key_start = off + 8; // after 2 u32 lengths
                            let key_end = key_start + k.len();
                            all_lines.push((file_idx, off, key_end, next));
                            lines_in += 1;
                            off = next;
                        }
                        file_maps.push(map);
                    }
                    Err(e) => error!("mmap {}: {}", p.display(), e),
                }
                io_read += read_start.elapsed();
            }
            Err(e) => error!("open {}: {}", p.display(), e),
        }
    }

    let sort_only_start = Instant::now();
    all_lines.par_sort_by(|a, b| {
        let (fia, sa, ka, _ea) = *a;
        let (fib, sb, kb, _eb) = *b;
        // Keys are at [s+8..key_end] because [s..s+8) holds the lengths
        file_maps[fia][(sa + 8)..ka].cmp(&file_maps[fib][(sb + 8)..kb])
    });
    let sort_only_ms = sort_only_start.elapsed().as_millis() as u64;

    let io_write_start = Instant::now();
    match std::fs::File::create(out_path) {
        Ok(file) => {
            let mut w = std::io::BufWriter::with_capacity(8 * 1024 * 1024, file);
            for &(fi, s, _k, e) in &all_lines {
                if let Err(e2) = w.write_all(&file_maps[fi][s..e]) {
                    error!("write {}: {}", out_path, e2);
                    break;
                }
            }
            if let Err(e) = w.flush() {
                error!("flush {}: {}", out_path, e);
            }
        }
        Err(e) => error!("create {}: {}", out_path, e),
    }
    let io_write_ms = io_write_start.elapsed().as_millis() as u64;

    Ok(SortOutcome {
        lines_in,
        bytes_in,
        sort_only_ms,
        io_read_ms: io_read.as_millis() as u64,
        io_write_ms,
    })
}
