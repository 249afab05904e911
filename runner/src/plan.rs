pub mod walltime;


use itertools::Itertools;
use std::fmt;
use thiserror::Error;
use tracing::debug;

pub use walltime::Walltime;

pub const MIN_MEMORY_GB: u64 = 1;
pub const MAX_MEMORY_GB: u64 = 180;
/// memory handed to every processor when no explicit amount is requested
pub const MEMORY_PER_PROCESSOR_GB: u64 = 4;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PlanError {
    #[error("No raw files specified")]
    EmptyInput,
    #[error("Number of jobs must be at least 1")]
    InvalidBatchCount,
    #[error("Number of processors per job must be at least 1")]
    InvalidProcessorCount,
    #[error(
        "{0} is an invalid amount of job memory, expected {min} to {max} gb",
        min = MIN_MEMORY_GB,
        max = MAX_MEMORY_GB
    )]
    InvalidResource(u64),
    #[error("'{0}' is not a valid walltime, expected hh:mm:ss")]
    InvalidWalltime(String),
}

/// Split `items` into at most `batches` contiguous runs of `ceil(len / batches)` items.
/// Only the last run may be shorter, trailing empty runs are never produced.
pub fn partition<T: Clone>(items: &[T], batches: usize) -> Result<Vec<Vec<T>>, PlanError> {
    if items.is_empty() {
        return Err(PlanError::EmptyInput);
    }

    if batches == 0 {
        return Err(PlanError::InvalidBatchCount);
    }

    let per_batch = items.len().div_ceil(batches);

    Ok(items.chunks(per_batch).map(<[T]>::to_vec).collect_vec())
}

/// memory per job, defaulting to `MEMORY_PER_PROCESSOR_GB` for each requested processor
pub fn effective_memory(processors: usize, memory: Option<u64>) -> Result<u64, PlanError> {
    let memory = memory
        .unwrap_or_else(|| (processors as u64).saturating_mul(MEMORY_PER_PROCESSOR_GB));

    if (MIN_MEMORY_GB..=MAX_MEMORY_GB).contains(&memory) {
        Ok(memory)
    } else {
        Err(PlanError::InvalidResource(memory))
    }
}

fn plural(count: usize) -> &'static str {
    if count > 1 {
        "s"
    } else {
        ""
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// resource footprint shared by every job of a plan
pub struct Resources {
    pub processors: usize,
    pub memory: u64,
    pub walltime: Walltime,
}

impl Resources {
    /// Validate the requested memory and cap the processor count at the size of the largest
    /// batch, there is no point in starting more workers than there are files.
    pub fn allocate(
        processors: usize,
        memory: Option<u64>,
        walltime: Walltime,
        largest_batch: usize,
    ) -> Result<Self, PlanError> {
        if processors == 0 {
            return Err(PlanError::InvalidProcessorCount);
        }

        let memory = effective_memory(processors, memory)?;

        Ok(Self {
            processors: processors.min(largest_batch).max(1),
            memory,
            walltime,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// everything the user asked for, before any capping happened
pub struct PlanRequest {
    pub jobs: usize,
    pub processors: usize,
    pub memory: Option<u64>,
    pub walltime: Walltime,
}

impl Default for PlanRequest {
    fn default() -> Self {
        Self {
            jobs: 1,
            processors: 4,
            memory: None,
            walltime: Walltime::default(),
        }
    }
}

impl fmt::Display for PlanRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let memory = self.memory.unwrap_or_else(|| {
            (self.processors as u64).saturating_mul(MEMORY_PER_PROCESSOR_GB)
        });

        write!(
            f,
            "Requested {} job{} with {} processor{} and {} gb memory each...",
            self.jobs,
            plural(self.jobs),
            self.processors,
            plural(self.processors),
            memory
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// files assigned to a single job, already split into one list per worker slot
pub struct Batch {
    pub index: usize,
    pub items: Vec<String>,
    pub slots: Vec<Vec<String>>,
    pub resources: Resources,
}

#[derive(Debug, Clone)]
pub struct JobPlan {
    pub batches: Vec<Batch>,
    pub resources: Resources,
    total_items: usize,
}

impl JobPlan {
    /// Partition `items` into jobs and every job into worker slots.
    /// Memory is checked before anything is partitioned so an invalid request never yields
    /// a partial plan.
    pub fn build(items: &[String], request: PlanRequest) -> Result<Self, PlanError> {
        if request.processors == 0 {
            return Err(PlanError::InvalidProcessorCount);
        }
        effective_memory(request.processors, request.memory)?;

        let partitions = partition(items, request.jobs)?;
        let largest_batch = partitions.iter().map(Vec::len).max().unwrap_or_default();
        let resources = Resources::allocate(
            request.processors,
            request.memory,
            request.walltime,
            largest_batch,
        )?;

        debug!(
            jobs = partitions.len(),
            largest_batch,
            processors = resources.processors,
            memory = resources.memory,
            walltime_secs = resources.walltime.as_secs(),
            "Partitioned input files"
        );

        let batches = partitions
            .into_iter()
            .enumerate()
            .map(|(index, items)| {
                let slots = partition(&items, resources.processors)?;

                Ok::<_, PlanError>(Batch {
                    index,
                    items,
                    slots,
                    resources: resources.clone(),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            batches,
            resources,
            total_items: items.len(),
        })
    }

    pub fn len(&self) -> usize {
        self.batches.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Batch> {
        self.batches.iter()
    }

    pub fn total_items(&self) -> usize {
        self.total_items
    }

    pub fn largest_batch(&self) -> usize {
        self.batches
            .iter()
            .map(|batch| batch.items.len())
            .max()
            .unwrap_or_default()
    }

    /// files each worker slot of the largest batch has to work through
    pub fn items_per_slot(&self) -> usize {
        self.largest_batch().div_ceil(self.resources.processors.max(1))
    }
}

impl fmt::Display for JobPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let per_job = self.largest_batch();
        let per_slot = self.items_per_slot();

        writeln!(f, "\t{} raw file{}", self.total_items, plural(self.total_items))?;
        writeln!(f, "\t{} job{} needed", self.len(), plural(self.len()))?;
        writeln!(f, "\t{} file{} per job", per_job, plural(per_job))?;
        writeln!(
            f,
            "\t{} processor{} per job",
            self.resources.processors,
            plural(self.resources.processors)
        )?;
        write!(f, "\t{} file{} per process", per_slot, plural(per_slot))
    }
}
