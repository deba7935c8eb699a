use serde::Serialize;

#[derive(Default, Clone, Debug, Serialize)]
pub struct MapPhaseStats {
    pub tasks: usize,
    pub records_in: u64,
    pub records_dropped: u64,
    pub partials_out: u64,
    pub total_bytes_out: u64,
    pub total_flushes: u64,
    pub min_task_ms: u64,
    pub max_task_ms: u64,
    pub wall_ms: u64,
}

#[derive(Default, Clone, Debug, Serialize)]
pub struct SortPhaseStats {
    pub reducers: usize,
    pub total_lines: u64,
    pub total_bytes: u64,
    pub min_reducer_ms: u64,
    pub max_reducer_ms: u64,
    pub wall_ms: u64,
}

#[derive(Default, Clone, Debug, Serialize)]
pub struct ReducePhaseStats {
    pub reducers: usize,
    pub partials_in: u64,
    pub groups: u64,
    pub groups_emitted: u64,
    pub min_reducer_ms: u64,
    pub max_reducer_ms: u64,
    pub wall_ms: u64,
}

/// Aggregated per-run counters, returned to the caller after the reduce phase.
/// `records_in - records_dropped` is the number of valid records, which tests
/// reconcile against the emitted per-group counts.
#[derive(Default, Clone, Debug, Serialize)]
pub struct JobSummary {
    pub map: MapPhaseStats,
    pub sort: SortPhaseStats,
    pub reduce: ReducePhaseStats,
}

impl JobSummary {
    pub fn valid_records(&self) -> u64 {
        self.map.records_in - self.map.records_dropped
    }
}
