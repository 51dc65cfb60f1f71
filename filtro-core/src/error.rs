//! Error types for the filtro core library.
//!
//! Each enum exposes a stable machine-readable code so the CLI and log
//! pipelines can classify failures without matching on message text.

use std::{fmt, sync::Arc};

use thiserror::Error;

use crate::controller::Policy;

macro_rules! define_error_codes {
    (
        $(#[$enum_meta:meta])*
        enum $CodeTy:ident for $ErrTy:ident {
            $(
                $(#[$variant_meta:meta])*
                $CodeVariant:ident => $ErrVariant:ident $( { $($pattern:tt)* } )? => $code:expr
            ),+ $(,)?
        }
    ) => {
        $(#[$enum_meta])*
        #[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
        #[non_exhaustive]
        pub enum $CodeTy {
            $(
                $(#[$variant_meta])*
                $CodeVariant,
            )+
        }

        impl $CodeTy {
            /// Return the stable machine-readable representation of this error code.
            #[must_use]
            pub const fn as_str(self) -> &'static str {
                match self {
                    $(Self::$CodeVariant => $code,)+
                }
            }
        }

        impl fmt::Display for $CodeTy {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl $ErrTy {
            #[doc = concat!(
                "Retrieve the stable [`",
                stringify!($CodeTy),
                "`] for this error."
            )]
            #[must_use]
            pub const fn code(&self) -> $CodeTy {
                match self {
                    $(Self::$ErrVariant $( { $($pattern)* } )? => $CodeTy::$CodeVariant,)+
                }
            }
        }
    };
}

/// A single input line that could not be decoded.
///
/// Malformed lines are skipped and counted; they never abort a run.
#[non_exhaustive]
#[derive(Clone, Debug, Eq, Error, PartialEq)]
pub enum ParseError {
    /// The line did not contain the expected number of fields.
    #[error("expected {expected} fields but found {found}")]
    FieldCount {
        /// Human-readable description of the accepted field counts.
        expected: &'static str,
        /// Number of fields found on the line.
        found: usize,
    },
    /// The weight field was not a number.
    #[error("weight `{raw}` is not a number")]
    InvalidWeight {
        /// Raw weight token.
        raw: Arc<str>,
    },
    /// The weight field parsed to NaN or an infinity.
    #[error("weight `{raw}` is not finite")]
    NonFiniteWeight {
        /// Raw weight token.
        raw: Arc<str>,
    },
    /// A vertex token was empty.
    #[error("vertex identifier is empty")]
    EmptyVertex,
    /// A vertex token contained whitespace or a comma.
    #[error("vertex identifier `{raw}` contains a separator")]
    InvalidVertex {
        /// Raw vertex token.
        raw: Arc<str>,
    },
}

define_error_codes! {
    /// Stable codes describing [`ParseError`] variants.
    enum ParseErrorCode for ParseError {
        /// The line did not contain the expected number of fields.
        FieldCount => FieldCount { .. } => "PARSE_FIELD_COUNT",
        /// The weight field was not a number.
        InvalidWeight => InvalidWeight { .. } => "PARSE_INVALID_WEIGHT",
        /// The weight field parsed to NaN or an infinity.
        NonFiniteWeight => NonFiniteWeight { .. } => "PARSE_NON_FINITE_WEIGHT",
        /// A vertex token was empty.
        EmptyVertex => EmptyVertex => "PARSE_EMPTY_VERTEX",
        /// A vertex token contained whitespace or a comma.
        InvalidVertex => InvalidVertex { .. } => "PARSE_INVALID_VERTEX",
    }
}

/// Failure raised by one local-reducer invocation.
#[non_exhaustive]
#[derive(Clone, Debug, Eq, Error, PartialEq)]
pub enum ReduceError {
    /// An internal invariant was violated, indicating a logic error.
    #[error("reducer invariant violated: {invariant}")]
    InvariantViolation {
        /// Name of the violated invariant.
        invariant: &'static str,
    },
    /// A broadcast input required by the reducer was never published.
    #[error("broadcast `{channel}` is missing for round {round}")]
    MissingBroadcast {
        /// Round whose broadcast was requested.
        round: usize,
        /// Name of the side channel.
        channel: &'static str,
    },
    /// The task failed for a transient reason and may be retried.
    #[error("task failed: {reason}")]
    Task {
        /// Description of the failure.
        reason: Arc<str>,
    },
}

impl ReduceError {
    /// Returns `true` when re-running the task could succeed.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Task { .. })
    }
}

define_error_codes! {
    /// Stable codes describing [`ReduceError`] variants.
    enum ReduceErrorCode for ReduceError {
        /// An internal invariant was violated.
        InvariantViolation => InvariantViolation { .. } => "REDUCE_INVARIANT_VIOLATION",
        /// A broadcast input required by the reducer was never published.
        MissingBroadcast => MissingBroadcast { .. } => "REDUCE_MISSING_BROADCAST",
        /// The task failed for a transient reason.
        Task => Task { .. } => "REDUCE_TASK_FAILED",
    }
}

/// Failure reported by a [`crate::Substrate`] for one grouping/reduction stage.
#[non_exhaustive]
#[derive(Clone, Debug, Eq, Error, PartialEq)]
pub enum SubstrateError {
    /// A task kept failing until every attempt was used.
    #[error("stage `{stage}` task for key `{key}` failed after {attempts} attempts: {error}")]
    RetriesExhausted {
        /// Stage that was executing.
        stage: &'static str,
        /// Rendered partition key of the failing task.
        key: Arc<str>,
        /// Number of attempts performed.
        attempts: usize,
        /// Error returned by the final attempt.
        #[source]
        error: ReduceError,
    },
    /// A task failed with an error that retrying cannot fix.
    #[error("stage `{stage}` task for key `{key}` failed: {error}")]
    Fatal {
        /// Stage that was executing.
        stage: &'static str,
        /// Rendered partition key of the failing task.
        key: Arc<str>,
        /// Error returned by the task.
        #[source]
        error: ReduceError,
    },
}

impl SubstrateError {
    /// Returns the reducer error that caused the stage to fail.
    #[must_use]
    pub const fn reduce_error(&self) -> &ReduceError {
        match self {
            Self::RetriesExhausted { error, .. } | Self::Fatal { error, .. } => error,
        }
    }
}

define_error_codes! {
    /// Stable codes describing [`SubstrateError`] variants.
    enum SubstrateErrorCode for SubstrateError {
        /// A task kept failing until every attempt was used.
        RetriesExhausted => RetriesExhausted { .. } => "SUBSTRATE_RETRIES_EXHAUSTED",
        /// A task failed with an error that retrying cannot fix.
        Fatal => Fatal { .. } => "SUBSTRATE_FATAL",
    }
}

/// Error type produced when configuring or running [`crate::Engine`].
#[non_exhaustive]
#[derive(Clone, Debug, Eq, Error, PartialEq)]
pub enum EngineError {
    /// The partition count must be at least one.
    #[error("partitions must be at least 1 (got {got})")]
    InvalidPartitions {
        /// The invalid partition count supplied by the caller.
        got: usize,
    },
    /// The round cap must be at least one.
    #[error("max_rounds must be at least 1 (got {got})")]
    InvalidMaxRounds {
        /// The invalid round cap supplied by the caller.
        got: usize,
    },
    /// The sampling memory threshold must be at least one edge.
    #[error("memory_threshold must be at least 1 (got {got})")]
    InvalidMemoryThreshold {
        /// The invalid threshold supplied by the caller.
        got: u64,
    },
    /// Substrate tasks need at least one attempt.
    #[error("attempts must be at least 1 (got {got})")]
    InvalidAttempts {
        /// The invalid attempt count supplied by the caller.
        got: usize,
    },
    /// The termination condition was not met within the round cap.
    #[error("{policy} policy did not converge within {rounds} rounds")]
    NonConvergence {
        /// Policy that was driving the run.
        policy: Policy,
        /// Number of rounds executed before giving up.
        rounds: usize,
    },
    /// A round failed inside the substrate and could not be recovered.
    #[error("round {round} failed under the {policy} policy: {error}")]
    RoundFailed {
        /// Round that failed.
        round: usize,
        /// Policy that was driving the run.
        policy: Policy,
        /// Underlying substrate failure.
        #[source]
        error: SubstrateError,
    },
    /// A broadcast input required by the round was not available.
    #[error("broadcast `{channel}` is missing for round {round}")]
    MissingBroadcast {
        /// Round whose broadcast was requested.
        round: usize,
        /// Name of the side channel.
        channel: &'static str,
    },
}

define_error_codes! {
    /// Stable codes describing [`EngineError`] variants.
    enum EngineErrorCode for EngineError {
        /// The partition count must be at least one.
        InvalidPartitions => InvalidPartitions { .. } => "ENGINE_INVALID_PARTITIONS",
        /// The round cap must be at least one.
        InvalidMaxRounds => InvalidMaxRounds { .. } => "ENGINE_INVALID_MAX_ROUNDS",
        /// The sampling memory threshold must be at least one edge.
        InvalidMemoryThreshold => InvalidMemoryThreshold { .. } =>
            "ENGINE_INVALID_MEMORY_THRESHOLD",
        /// Substrate tasks need at least one attempt.
        InvalidAttempts => InvalidAttempts { .. } => "ENGINE_INVALID_ATTEMPTS",
        /// The termination condition was not met within the round cap.
        NonConvergence => NonConvergence { .. } => "ENGINE_NON_CONVERGENCE",
        /// A round failed inside the substrate.
        RoundFailed => RoundFailed { .. } => "ENGINE_ROUND_FAILED",
        /// A broadcast input required by the round was not available.
        MissingBroadcast => MissingBroadcast { .. } => "ENGINE_MISSING_BROADCAST",
    }
}

impl EngineError {
    /// Converts a substrate failure observed in `round` into an engine error.
    ///
    /// Missing broadcast inputs are reported directly rather than as a
    /// generic round failure.
    #[must_use]
    pub fn from_round(round: usize, policy: Policy, error: SubstrateError) -> Self {
        match error.reduce_error() {
            ReduceError::MissingBroadcast { round, channel } => Self::MissingBroadcast {
                round: *round,
                channel: *channel,
            },
            _ => Self::RoundFailed {
                round,
                policy,
                error,
            },
        }
    }

    /// Retrieve the inner [`SubstrateErrorCode`] when the error came from a
    /// round failure.
    #[must_use]
    pub const fn substrate_code(&self) -> Option<SubstrateErrorCode> {
        match self {
            Self::RoundFailed { error, .. } => Some(error.code()),
            _ => None,
        }
    }
}

/// Convenient alias for results returned by the engine API.
pub type Result<T> = core::result::Result<T, EngineError>;
