//! Centralized environment variable names and default values for Vedur runtime tuning.

// Environment variable names
pub const ENV_KEEP_INTERMEDIATES: &str = "VEDUR_KEEP_INTERMEDIATES";
pub const ENV_RAYON_THREADS: &str = "VEDUR_RAYON_THREADS";
pub const ENV_NUM_REDUCERS: &str = "VEDUR_NUM_REDUCERS";
pub const ENV_FLUSH_BYTES: &str = "VEDUR_FLUSH_BYTES";
pub const ENV_FLUSH_INTERVAL_MS: &str = "VEDUR_FLUSH_INTERVAL_MS";
pub const ENV_WRITER_QUEUE_CAP: &str = "VEDUR_WRITER_QUEUE_CAP";
pub const ENV_LOCAL_BATCH_BYTES: &str = "VEDUR_LOCAL_BATCH_BYTES";
pub const ENV_LOCAL_TASKS: &str = "VEDUR_LOCAL_TASKS";

/// Scratch directory for intermediate shuffle files, one subdirectory per run.
pub const RUNS_ROOT: &str = ".vedur_runs";

// Defaults. Partial accumulators are far fewer than raw emits, so the local
// batch can stay modest without a syscall penalty.
pub const DEFAULT_LOCAL_BATCH_BYTES: usize = 256 * 1024;
pub const DEFAULT_WRITER_QUEUE_CAP: usize = 1024;
pub const DEFAULT_FLUSH_INTERVAL_MS: u64 = 200;
pub const DEFAULT_FLUSH_BYTES: usize = 16 * 1024 * 1024; // 16 MiB
