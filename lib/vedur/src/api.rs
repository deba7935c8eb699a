use serde::{de::DeserializeOwned, Serialize};
use std::hash::Hash;

use crate::record::WeatherRecord;

// ========== Core aggregation traits ==========

/// A mergeable partial result. `Default::default()` is the monoid identity.
///
/// `merge` must be associative and commutative: any partitioning of a fixed
/// input set into local-aggregation batches, followed by any grouping of the
/// partial accumulators into the global reduction, must fold to the same value.
/// Classification lifts every record into a single-observation accumulator, so
/// the local and global stages run the identical operation and partial results
/// need no runtime tagging.
pub trait Accumulator: Default + Send {
    fn merge(&mut self, other: Self);
}

/// One analysis pipeline: key shape, accumulator schema and finalize logic.
/// Everything pipeline-specific lives in `classify` and `finalize`; the
/// runtime stages in between are generic.
pub trait Job: Send + Sync {
    type Key: Send + Serialize + DeserializeOwned + Hash + Eq + Clone + 'static;
    type Acc: Accumulator + Serialize + DeserializeOwned + Clone + 'static;
    type Stats: Serialize + 'static;

    /// Classify one valid record into zero or more (key, lifted accumulator)
    /// pairs. Invalid records never reach this point; the runtime drops them
    /// at the parse boundary.
    fn classify<F>(&self, record: &WeatherRecord, emit: &mut F)
    where
        F: FnMut(Self::Key, Self::Acc);

    /// Terminal computation turning a fully merged accumulator into emitted
    /// statistics. Returning `None` suppresses the group; a key absent from
    /// the output is the canonical insufficient-data signal.
    fn finalize(&self, key: &Self::Key, acc: Self::Acc) -> Option<Self::Stats>;
}
