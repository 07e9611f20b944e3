//! # Batch Invocation
//!
//! Runs one invocation per settings value on a bounded `rayon` pool.
//!
//! [`Combinations`] builds the settings list as a cartesian product of option choices.
//! [`run_batch`] executes it with up to `degree_of_parallelism` concurrent invocations
//! and returns the results in input order. By default the first failure aborts the batch:
//! invocations that have not started yet are skipped, while the ones already running are
//! allowed to finish. With `complete_on_failure` every combination runs and all failures
//! are reported together.

use crate::{core::settings::Settings, models::OptionValue};
use rayon::prelude::*;
use std::{
    error::Error as StdError,
    fmt,
    sync::atomic::{AtomicBool, AtomicUsize, Ordering},
};
use thiserror::Error;

/// A base settings value plus a list of option axes to vary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Combinations {
    base: Settings,
    axes: Vec<(String, Vec<OptionValue>)>,
}

impl Combinations {
    /// Starts from `base` with no axes: a single combination.
    pub fn new(base: impl Into<Settings>) -> Self {
        Self {
            base: base.into(),
            axes: Vec::new(),
        }
    }

    /// Adds an axis: every combination is repeated once per value of `option`.
    ///
    /// Declaring the same option again replaces its values but keeps its position.
    #[must_use]
    pub fn combine_with<I, V>(&self, option: &str, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<OptionValue>,
    {
        let values: Vec<OptionValue> = values.into_iter().map(Into::into).collect();
        let mut next = self.clone();
        match next.axes.iter_mut().find(|(name, _)| name == option) {
            Some((_, existing)) => *existing = values,
            None => next.axes.push((option.to_string(), values)),
        }
        next
    }

    /// Settings shared by every combination.
    pub fn base(&self) -> &Settings {
        &self.base
    }

    /// Number of combinations. An axis without values yields none.
    pub fn len(&self) -> usize {
        self.axes.iter().map(|(_, values)| values.len()).product()
    }

    /// Whether some axis has no values.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Expands the product. The first declared axis varies slowest.
    pub fn expand(&self) -> Vec<Settings> {
        let mut expanded = vec![self.base.clone()];
        for (option, values) in &self.axes {
            expanded = expanded
                .iter()
                .flat_map(|settings| {
                    values
                        .iter()
                        .map(move |value| settings.set(option, value.clone()))
                })
                .collect();
        }
        expanded
    }
}

/// How a batch is scheduled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchOptions {
    /// Maximum number of concurrent invocations. Zero is treated as one.
    pub degree_of_parallelism: usize,
    /// Run every combination even after a failure, then report all failures.
    pub complete_on_failure: bool,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            degree_of_parallelism: 1,
            complete_on_failure: false,
        }
    }
}

/// Why a batch did not produce one successful result per combination.
#[derive(Error, Debug)]
pub enum BatchError<T: fmt::Debug, E: StdError + 'static> {
    /// The worker pool could not be created; nothing ran.
    #[error("Failed to build the batch thread pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),

    #[error(
        "Batch aborted: invocation #{index} failed ({completed} completed, {skipped} skipped): {error}"
    )]
    /// The first failure stopped the batch (the default mode).
    Aborted {
        /// Input position of the failure that aborted the batch.
        index: usize,
        /// Settings of the failed invocation.
        settings: Box<Settings>,
        /// The failure itself.
        #[source]
        error: E,
        /// Invocations that ran to completion, including failures that lost the race.
        completed: usize,
        /// Invocations that never started.
        skipped: usize,
    },

    #[error("{failed} of {} batch invocations failed.", .outcomes.len())]
    /// Every invocation ran and at least one failed (`complete_on_failure`).
    Failures {
        /// One outcome per combination, in input order.
        outcomes: Vec<Result<T, E>>,
        /// Number of failed outcomes.
        failed: usize,
    },
}

impl<T: fmt::Debug, E: StdError + 'static> BatchError<T, E> {
    /// The failures with their input positions.
    pub fn failures(&self) -> Vec<(usize, &E)> {
        match self {
            Self::ThreadPool(_) => Vec::new(),
            Self::Aborted { index, error, .. } => vec![(*index, error)],
            Self::Failures { outcomes, .. } => outcomes
                .iter()
                .enumerate()
                .filter_map(|(i, outcome)| outcome.as_ref().err().map(|e| (i, e)))
                .collect(),
        }
    }
}

enum Outcome<T, E> {
    Done(T),
    /// The failure and its rank in completion order.
    Failed(E, usize),
    Skipped,
}

/// Runs `invoke` once per settings value.
///
/// Returns every result in input order when all invocations succeed.
pub fn run_batch<T, E, F>(
    items: &[Settings],
    options: &BatchOptions,
    invoke: F,
) -> Result<Vec<T>, BatchError<T, E>>
where
    T: Send + fmt::Debug,
    E: StdError + Send + 'static,
    F: Fn(&Settings) -> Result<T, E> + Sync,
{
    if items.is_empty() {
        return Ok(Vec::new());
    }

    let threads = options.degree_of_parallelism.max(1);
    log::debug!(
        "Running batch of {} invocations on {} thread(s), complete_on_failure={}",
        items.len(),
        threads,
        options.complete_on_failure
    );
    let pool = rayon::ThreadPoolBuilder::new().num_threads(threads).build()?;

    let aborted = AtomicBool::new(false);
    let failure_rank = AtomicUsize::new(0);

    let outcomes: Vec<Outcome<T, E>> = pool.install(|| {
        items
            .par_iter()
            .enumerate()
            .map(|(index, settings)| {
                if aborted.load(Ordering::SeqCst) {
                    log::trace!("Skipping batch invocation #{}", index);
                    return Outcome::Skipped;
                }
                match invoke(settings) {
                    Ok(value) => Outcome::Done(value),
                    Err(error) => {
                        log::trace!("Batch invocation #{} failed: {}", index, error);
                        if !options.complete_on_failure {
                            aborted.store(true, Ordering::SeqCst);
                        }
                        Outcome::Failed(error, failure_rank.fetch_add(1, Ordering::SeqCst))
                    }
                }
            })
            .collect()
    });

    if options.complete_on_failure {
        let failed = outcomes
            .iter()
            .filter(|o| matches!(o, Outcome::Failed(..)))
            .count();
        let results: Vec<Result<T, E>> = outcomes
            .into_iter()
            .filter_map(|outcome| match outcome {
                Outcome::Done(value) => Some(Ok(value)),
                Outcome::Failed(error, _) => Some(Err(error)),
                Outcome::Skipped => None,
            })
            .collect();
        if failed == 0 {
            return Ok(results.into_iter().filter_map(Result::ok).collect());
        }
        return Err(BatchError::Failures {
            outcomes: results,
            failed,
        });
    }

    let mut completed = 0;
    let mut skipped = 0;
    let mut first: Option<(usize, &Settings, usize, E)> = None;
    let mut results = Vec::with_capacity(items.len());
    for (index, (settings, outcome)) in items.iter().zip(outcomes).enumerate() {
        match outcome {
            Outcome::Done(value) => {
                completed += 1;
                results.push(value);
            }
            Outcome::Skipped => skipped += 1,
            Outcome::Failed(error, rank) => {
                // Failures that lost the race still count as completed work.
                match &first {
                    Some((_, _, best, _)) if *best < rank => completed += 1,
                    Some(_) => {
                        completed += 1;
                        first = Some((index, settings, rank, error));
                    }
                    None => first = Some((index, settings, rank, error)),
                }
            }
        }
    }

    match first {
        None => Ok(results),
        Some((index, settings, _, error)) => {
            log::debug!(
                "Batch aborted at #{}: {} completed, {} skipped",
                index,
                completed,
                skipped
            );
            Err(BatchError::Aborted {
                index,
                settings: Box::new(settings.clone()),
                error,
                completed,
                skipped,
            })
        }
    }
}
