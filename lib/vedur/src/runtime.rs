use crate::api::{Accumulator, Job};
use crate::constants::*;
use crate::io::{
    ensure_dir, hash_to_partition, list_files_recursive, open_writer, read_bin_line, read_lines,
    write_bin, write_stats_line,
};
use crate::record::WeatherRecord;
use crate::sort::external_sort_by_key;
use crate::stats::{JobSummary, MapPhaseStats, ReducePhaseStats, SortPhaseStats};
use crate::utils::{env_u64, env_usize, env_var_truthy, local_run_id};
use crate::writer::WriterPool;
use anyhow::{Context, Result};
use memmap2::Mmap;
use rayon::prelude::*;
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing::{debug, error, info};

#[derive(Clone, Debug, Default)]
struct MapTaskStats {
    num_files: u64,
    records_in: u64,
    records_dropped: u64,
    partials_out: u64,
    bytes_out: u64,
    flushes: u64,
    wall_ms: u64,
}

#[derive(Clone, Debug)]
struct ReduceTaskStats {
    partials_in: u64,
    groups: u64,
    groups_emitted: u64,
    wall_ms: u64,
}

/// Local execution of one analysis job: parallel classification and local
/// aggregation per input chunk, hash-partitioned shuffle of partial
/// accumulators, byte-sort per reducer, then the global merge and finalize.
pub struct JobRuntime {
    inputs: Vec<String>,
    output: Option<String>,
}

impl JobRuntime {
    pub fn new() -> Self {
        Self { inputs: vec![], output: None }
    }

    pub fn add_input(&mut self, input_path: impl Into<String>) {
        self.inputs.push(input_path.into());
    }

    pub fn set_output(&mut self, output_path: impl Into<String>) {
        self.output = Some(output_path.into());
    }

    pub fn run<J: Job>(&mut self, job: J) -> Result<JobSummary> {
        let output_dir = self.output.clone().context("output not set")?;
        let keep_intermediates = env_var_truthy(ENV_KEEP_INTERMEDIATES);

        // Configure Rayon threads from the environment before the first pool use.
        if std::env::var("RAYON_NUM_THREADS").is_err() {
            if let Some(n) = env_usize(ENV_RAYON_THREADS) {
                if n > 0 {
                    std::env::set_var("RAYON_NUM_THREADS", n.to_string());
                }
            }
        }

        let launch_root = format!("{}/{}", RUNS_ROOT, local_run_id());
        let map_out_dir = format!("{}/map_out", launch_root);
        let sort_out_dir = format!("{}/sort_out", launch_root);
        ensure_dir(&map_out_dir)?;
        ensure_dir(&sort_out_dir)?;

        // Output directory is cleaned before the run; one file per reducer.
        let _ = fs::remove_dir_all(&output_dir);
        ensure_dir(&output_dir)?;

        let mut all_files = Vec::new();
        for inp in &self.inputs {
            let mut files = list_files_recursive(inp)?;
            all_files.append(&mut files);
        }

        let local_tasks = env_usize(ENV_LOCAL_TASKS)
            .unwrap_or_else(num_cpus::get)
            .max(1);
        let num_tasks = local_tasks.min(all_files.len().max(1));
        let num_reducers = env_usize(ENV_NUM_REDUCERS)
            .unwrap_or(num_tasks)
            .clamp(1, num_tasks);

        // Partition input files among the map tasks.
        let chunks: Vec<Vec<PathBuf>> = (0..num_tasks)
            .map(|i| {
                all_files
                    .iter()
                    .enumerate()
                    .filter(|(idx, _)| idx % num_tasks == i)
                    .map(|(_, p)| p.clone())
                    .collect()
            })
            .collect();

        info!(
            input_files = all_files.len(),
            tasks = num_tasks,
            reducers = num_reducers,
            output = %output_dir,
            "Vedur starting map phase"
        );

        let flush_bytes = env_usize(ENV_FLUSH_BYTES).unwrap_or(DEFAULT_FLUSH_BYTES);
        let flush_interval_ms = env_u64(ENV_FLUSH_INTERVAL_MS).unwrap_or(DEFAULT_FLUSH_INTERVAL_MS);
        let queue_cap = env_usize(ENV_WRITER_QUEUE_CAP).unwrap_or(DEFAULT_WRITER_QUEUE_CAP);
        let local_batch_bytes = env_usize(ENV_LOCAL_BATCH_BYTES).unwrap_or(DEFAULT_LOCAL_BATCH_BYTES);
        let (pool_inner, pool_joiner) = WriterPool::new(
            map_out_dir.clone(),
            num_reducers,
            flush_bytes,
            Duration::from_millis(flush_interval_ms),
            queue_cap,
        )?;
        let writer_pool = Arc::new(pool_inner);
        let mut writer_joiner = pool_joiner;

        // ===== Map + local aggregation =====
        let job = Arc::new(job);
        let map_stats: Arc<Mutex<Vec<MapTaskStats>>> = Arc::new(Mutex::new(Vec::new()));
        let map_phase_start = Instant::now();
        let run_map_for = |task_id: usize| {
            let task_start = Instant::now();
            let files = &chunks[task_id];
            debug!(task_id, num_files = files.len(), "map task starting");
            let mut stats = MapTaskStats { num_files: files.len() as u64, ..Default::default() };

            // Local aggregator: every classified value is lifted to an
            // accumulator at the source, so folding here and merging globally
            // later run the identical operation.
            let mut groups: HashMap<J::Key, J::Acc> = HashMap::new();
            for file in files {
                let lines = match read_lines(file) {
                    Ok(it) => it,
                    Err(e) => {
                        error!("read_lines {}: {}", file.display(), e);
                        continue;
                    }
                };
                for line in lines.filter_map(|r| r.ok()) {
                    stats.records_in += 1;
                    let record = match WeatherRecord::from_json_line(&line) {
                        Some(r) => r,
                        None => {
                            stats.records_dropped += 1;
                            debug!(file = %file.display(), "dropped malformed record");
                            continue;
                        }
                    };
                    job.classify(&record, &mut |key, acc| {
                        match groups.entry(key) {
                            Entry::Occupied(mut e) => e.get_mut().merge(acc),
                            Entry::Vacant(e) => {
                                e.insert(acc);
                            }
                        }
                    });
                }
            }

            // Emit one partial accumulator per key, hash-partitioned by key.
            let mut thread_writer = writer_pool.make_thread_writer(num_reducers, local_batch_bytes);
            for (key, acc) in &groups {
                let part = hash_to_partition(key, num_reducers);
                let key_bytes = match bincode::serialize(key) {
                    Ok(b) => b,
                    Err(e) => {
                        error!("bincode key: {}", e);
                        continue;
                    }
                };
                let acc_bytes = match bincode::serialize(acc) {
                    Ok(b) => b,
                    Err(e) => {
                        error!("bincode acc: {}", e);
                        continue;
                    }
                };
                let mut record_buf = Vec::with_capacity(key_bytes.len() + acc_bytes.len() + 8);
                write_bin(&mut record_buf, &key_bytes, &acc_bytes);
                thread_writer.emit_record(part, &record_buf);
                stats.partials_out += 1;
            }
            thread_writer.flush_all();
            let (flushes, bytes_sent) = thread_writer.stats();
            stats.flushes = flushes;
            stats.bytes_out = bytes_sent;
            stats.wall_ms = task_start.elapsed().as_millis() as u64;

            let mut guard = map_stats.lock().unwrap();
            guard.push(stats);
        };

        (0..num_tasks).into_par_iter().for_each(run_map_for);

        // All map output must reach disk before the sort reads it back.
        writer_pool.close_all();
        writer_joiner.join_all();

        let map_phase_ms = map_phase_start.elapsed().as_millis() as u64;
        let map_stats_vec = map_stats.lock().unwrap().clone();
        let map_summary = MapPhaseStats {
            tasks: map_stats_vec.len(),
            records_in: map_stats_vec.iter().map(|s| s.records_in).sum(),
            records_dropped: map_stats_vec.iter().map(|s| s.records_dropped).sum(),
            partials_out: map_stats_vec.iter().map(|s| s.partials_out).sum(),
            total_bytes_out: map_stats_vec.iter().map(|s| s.bytes_out).sum(),
            total_flushes: map_stats_vec.iter().map(|s| s.flushes).sum(),
            min_task_ms: map_stats_vec.iter().map(|s| s.wall_ms).min().unwrap_or(0),
            max_task_ms: map_stats_vec.iter().map(|s| s.wall_ms).max().unwrap_or(0),
            wall_ms: map_phase_ms,
        };
        info!(
            phase = "map",
            tasks = map_summary.tasks,
            records_in = map_summary.records_in,
            records_dropped = map_summary.records_dropped,
            partials_out = map_summary.partials_out,
            total_bytes_out = map_summary.total_bytes_out,
            wall_ms = map_summary.wall_ms,
            "Map phase complete"
        );

        // ===== Sort/shuffle =====
        let sort_stats: Arc<Mutex<Vec<crate::sort::SortOutcome>>> = Arc::new(Mutex::new(Vec::new()));
        let sort_phase_start = Instant::now();
        let run_sort_for = |r: usize| {
            let pattern = format!("{}/part{}.bin", map_out_dir, r);
            let mut paths = match glob::glob(&pattern) {
                Ok(g) => g.flatten().collect::<Vec<_>>(),
                Err(e) => {
                    error!("glob error: {}", e);
                    Vec::new()
                }
            };
            paths.sort();
            let out_path = format!("{}/reduce_in_part{}.bin", sort_out_dir, r);
            match external_sort_by_key(&paths, &out_path) {
                Ok(outcome) => sort_stats.lock().unwrap().push(outcome),
                Err(e) => error!("sort partition {}: {}", r, e),
            }
        };
        (0..num_reducers).into_par_iter().for_each(run_sort_for);

        let sort_phase_ms = sort_phase_start.elapsed().as_millis() as u64;
        let sort_stats_vec = sort_stats.lock().unwrap().clone();
        let sort_summary = SortPhaseStats {
            reducers: sort_stats_vec.len(),
            total_lines: sort_stats_vec.iter().map(|s| s.lines_in).sum(),
            total_bytes: sort_stats_vec.iter().map(|s| s.bytes_in).sum(),
            min_reducer_ms: sort_stats_vec.iter().map(|s| s.sort_only_ms).min().unwrap_or(0),
            max_reducer_ms: sort_stats_vec.iter().map(|s| s.sort_only_ms).max().unwrap_or(0),
            wall_ms: sort_phase_ms,
        };
        info!(
            phase = "sort",
            reducers = sort_summary.reducers,
            total_lines = sort_summary.total_lines,
            total_bytes = sort_summary.total_bytes,
            wall_ms = sort_summary.wall_ms,
            "Sort phase complete"
        );

        // ===== Global reduce =====
        let reduce_stats: Arc<Mutex<Vec<ReduceTaskStats>>> = Arc::new(Mutex::new(Vec::new()));
        let reduce_phase_start = Instant::now();
        let run_reduce_for = |r: usize| {
            let reducer_start = Instant::now();
            let in_path = format!("{}/reduce_in_part{}.bin", sort_out_dir, r);
            let file = match std::fs::File::open(&in_path) {
                Ok(f) => f,
                Err(e) => {
                    error!("open {}: {}", in_path, e);
                    return;
                }
            };
            let in_len = file.metadata().map(|m| m.len()).unwrap_or(0);
            let map;
            // Zero-length partitions cannot be mmapped; treat them as empty.
            let bytes: &[u8] = if in_len == 0 {
                &[]
            } else {
                map = match unsafe { Mmap::map(&file) } {
                    Ok(m) => m,
                    Err(e) => {
                        error!("mmap {}: {}", in_path, e);
                        return;
                    }
                };
                &map[..]
            };

            let mut out_writer =
                match open_writer(format!("{}/part-{:05}.jsonl", output_dir, r)) {
                    Ok(w) => w,
                    Err(e) => {
                        error!("open_writer output: {}", e);
                        return;
                    }
                };

            let mut stats = ReduceTaskStats { partials_in: 0, groups: 0, groups_emitted: 0, wall_ms: 0 };
            let mut current: Option<(J::Key, J::Acc)> = None;

            let flush_group = |key: J::Key,
                                   acc: J::Acc,
                                   stats: &mut ReduceTaskStats,
                                   out_writer: &mut std::io::BufWriter<std::fs::File>| {
                stats.groups += 1;
                if let Some(emitted) = job.finalize(&key, acc) {
                    stats.groups_emitted += 1;
                    if let Err(e) = write_stats_line(out_writer, &key, &emitted) {
                        error!("write output line: {}", e);
                    }
                }
            };

            let mut off = 0usize;
            while let Some((k, v, next)) = read_bin_line(bytes, off) {
                let key: J::Key = match bincode::deserialize(k) {
                    Ok(v) => v,
                    Err(e) => {
                        error!("bad key bin: {}", e);
                        break;
                    }
                };
                let acc: J::Acc = match bincode::deserialize(v) {
                    Ok(v) => v,
                    Err(e) => {
                        error!("bad acc bin: {}", e);
                        break;
                    }
                };
                stats.partials_in += 1;
                current = match current.take() {
                    None => Some((key, acc)),
                    Some((cur_key, mut cur_acc)) if cur_key == key => {
                        cur_acc.merge(acc);
                        Some((cur_key, cur_acc))
                    }
                    Some((cur_key, cur_acc)) => {
                        flush_group(cur_key, cur_acc, &mut stats, &mut out_writer);
                        Some((key, acc))
                    }
                };
                off = next;
            }
            if let Some((cur_key, cur_acc)) = current.take() {
                flush_group(cur_key, cur_acc, &mut stats, &mut out_writer);
            }
            stats.wall_ms = reducer_start.elapsed().as_millis() as u64;
            reduce_stats.lock().unwrap().push(stats);
        };
        (0..num_reducers).into_par_iter().for_each(run_reduce_for);

        if !keep_intermediates {
            let _ = fs::remove_dir_all(&launch_root);
        }

        let reduce_phase_ms = reduce_phase_start.elapsed().as_millis() as u64;
        let reduce_stats_vec = reduce_stats.lock().unwrap().clone();
        let reduce_summary = ReducePhaseStats {
            reducers: reduce_stats_vec.len(),
            partials_in: reduce_stats_vec.iter().map(|s| s.partials_in).sum(),
            groups: reduce_stats_vec.iter().map(|s| s.groups).sum(),
            groups_emitted: reduce_stats_vec.iter().map(|s| s.groups_emitted).sum(),
            min_reducer_ms: reduce_stats_vec.iter().map(|s| s.wall_ms).min().unwrap_or(0),
            max_reducer_ms: reduce_stats_vec.iter().map(|s| s.wall_ms).max().unwrap_or(0),
            wall_ms: reduce_phase_ms,
        };
        info!(
            phase = "reduce",
            reducers = reduce_summary.reducers,
            partials_in = reduce_summary.partials_in,
            groups = reduce_summary.groups,
            groups_emitted = reduce_summary.groups_emitted,
            wall_ms = reduce_summary.wall_ms,
            "Reduce phase complete"
        );

        Ok(JobSummary { map: map_summary, sort: sort_summary, reduce: reduce_summary })
    }
}

impl Default for JobRuntime {
    fn default() -> Self {
        Self::new()
    }
}
