//! Sampler trait - metric capability plugin
//!
//! A sampler owns one namespace and produces a single numeric value per call.

use thiserror::Error;

use crate::Namespace;

/// Sampler failure
///
/// Raised during a poll and caught at the worker boundary; it never
/// propagates past the worker that ran the sample.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum SamplerError {
    /// No sampler registered for the namespace
    #[error("no sampler registered for namespace '{namespace}'")]
    UnknownNamespace { namespace: Namespace },

    /// Sampler does not know the metric
    #[error("unknown metric '{metric}' for namespace '{namespace}'")]
    UnknownMetric { namespace: Namespace, metric: String },

    /// Metric requires an argument and none was given
    #[error("metric '{namespace}.{metric}' requires an argument")]
    MissingArgument { namespace: Namespace, metric: String },

    /// Backing device or service is not available right now
    #[error("sampler '{namespace}' unavailable: {message}")]
    Unavailable { namespace: Namespace, message: String },

    /// Transient I/O failure
    #[error("io error in sampler '{namespace}': {message}")]
    Io { namespace: Namespace, message: String },

    /// Sampler produced output it could not interpret
    #[error("sampler '{namespace}' could not parse output: {message}")]
    Parse { namespace: Namespace, message: String },
}

impl SamplerError {
    pub fn unknown_metric(namespace: Namespace, metric: impl Into<String>) -> Self {
        Self::UnknownMetric {
            namespace,
            metric: metric.into(),
        }
    }

    pub fn missing_argument(namespace: Namespace, metric: impl Into<String>) -> Self {
        Self::MissingArgument {
            namespace,
            metric: metric.into(),
        }
    }

    pub fn unavailable(namespace: Namespace, message: impl Into<String>) -> Self {
        Self::Unavailable {
            namespace,
            message: message.into(),
        }
    }

    pub fn io(namespace: Namespace, err: &std::io::Error) -> Self {
        Self::Io {
            namespace,
            message: err.to_string(),
        }
    }

    pub fn parse(namespace: Namespace, message: impl Into<String>) -> Self {
        Self::Parse {
            namespace,
            message: message.into(),
        }
    }

    /// Short label for metrics
    pub fn kind(&self) -> &'static str {
        match self {
            Self::UnknownNamespace { .. } => "unknown_namespace",
            Self::UnknownMetric { .. } => "unknown_metric",
            Self::MissingArgument { .. } => "missing_argument",
            Self::Unavailable { .. } => "unavailable",
            Self::Io { .. } => "io",
            Self::Parse { .. } => "parse",
        }
    }
}

/// Metric capability for one namespace
///
/// Calls are synchronous and may block (a network probe can take up to its own
/// timeout); the worker pool runs them off the scheduler task.
///
/// # Example
///
/// ```ignore
/// struct Constant(f64);
///
/// impl Sampler for Constant {
///     fn namespace(&self) -> Namespace { Namespace::Mock }
///     fn sample(&self, _metric: &str, _arg: Option<&str>) -> Result<f64, SamplerError> {
///         Ok(self.0)
///     }
/// }
/// ```
pub trait Sampler: Send + Sync {
    /// Namespace this sampler serves
    fn namespace(&self) -> Namespace;

    /// Produce one value for `metric`, qualified by the optional `arg`
    fn sample(&self, metric: &str, arg: Option<&str>) -> Result<f64, SamplerError>;
}
