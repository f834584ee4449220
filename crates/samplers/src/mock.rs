//! Mock sampler implementation
//!
//! Deterministic values without any hardware, used for demos and tests.
//!
//! | metric     | arg            | value                                   |
//! |------------|----------------|-----------------------------------------|
//! | `constant` | number         | the parsed arg                          |
//! | `counter`  | any (optional) | 0, 1, 2, ... per arg                    |
//! | `sequence` | sequence name  | next preset value, then `Unavailable`   |
//! | `fail`     | -              | always `Unavailable`                    |

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use contracts::{Namespace, Sampler, SamplerError};
use tracing::trace;

/// Mock sampler serving the `mock` namespace
#[derive(Debug, Default)]
pub struct MockSampler {
    counters: Mutex<HashMap<String, u64>>,
    sequences: Mutex<HashMap<String, VecDeque<f64>>>,
    delay: Option<Duration>,
    calls: AtomicU64,
}

impl MockSampler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Preload values returned by `mock.sequence` for `arg == name`
    pub fn with_sequence(self, name: impl Into<String>, values: impl IntoIterator<Item = f64>) -> Self {
        self.sequences
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(name.into(), values.into_iter().collect());
        self
    }

    /// Block every call for `delay`, imitating a slow probe
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Total number of sample calls served
    pub fn call_count(&self) -> u64 {
        self.calls.load(Ordering::Relaxed)
    }

    fn next_counter(&self, arg: Option<&str>) -> f64 {
        let mut counters = self.counters.lock().unwrap_or_else(|e| e.into_inner());
        let slot = counters.entry(arg.unwrap_or_default().to_string()).or_insert(0);
        let value = *slot;
        *slot += 1;
        value as f64
    }

    fn next_in_sequence(&self, name: &str) -> Result<f64, SamplerError> {
        let mut sequences = self.sequences.lock().unwrap_or_else(|e| e.into_inner());
        sequences
            .get_mut(name)
            .and_then(VecDeque::pop_front)
            .ok_or_else(|| SamplerError::unavailable(Namespace::Mock, format!("sequence '{name}' exhausted")))
    }
}

impl Sampler for MockSampler {
    fn namespace(&self) -> Namespace {
        Namespace::Mock
    }

    fn sample(&self, metric: &str, arg: Option<&str>) -> Result<f64, SamplerError> {
        self.calls.fetch_add(1, Ordering::Relaxed);
        if let Some(delay) = self.delay {
            std::thread::sleep(delay);
        }

        let value = match metric {
            "constant" => {
                let raw = arg.ok_or_else(|| SamplerError::missing_argument(Namespace::Mock, metric))?;
                raw.trim()
                    .parse::<f64>()
                    .map_err(|e| SamplerError::parse(Namespace::Mock, format!("'{raw}': {e}")))?
            }
            "counter" => self.next_counter(arg),
            "sequence" => {
                let name = arg.ok_or_else(|| SamplerError::missing_argument(Namespace::Mock, metric))?;
                self.next_in_sequence(name)?
            }
            "fail" => {
                return Err(SamplerError::unavailable(Namespace::Mock, "configured to fail"));
            }
            other => return Err(SamplerError::unknown_metric(Namespace::Mock, other)),
        };

        trace!(metric, arg = ?arg, value, "mock sample");
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constant() {
        let sampler = MockSampler::new();
        assert_eq!(sampler.sample("constant", Some("2.5")), Ok(2.5));
        assert!(matches!(
            sampler.sample("constant", None),
            Err(SamplerError::MissingArgument { .. })
        ));
        assert!(matches!(
            sampler.sample("constant", Some("abc")),
            Err(SamplerError::Parse { .. })
        ));
    }

    #[test]
    fn test_counters_are_per_arg() {
        let sampler = MockSampler::new();
        assert_eq!(sampler.sample("counter", Some("a")), Ok(0.0));
        assert_eq!(sampler.sample("counter", Some("a")), Ok(1.0));
        assert_eq!(sampler.sample("counter", Some("b")), Ok(0.0));
        assert_eq!(sampler.sample("counter", None), Ok(0.0));
        assert_eq!(sampler.call_count(), 4);
    }

    #[test]
    fn test_sequence_then_exhausted() {
        let sampler = MockSampler::new().with_sequence("temps", [20.0, 21.5]);
        assert_eq!(sampler.sample("sequence", Some("temps")), Ok(20.0));
        assert_eq!(sampler.sample("sequence", Some("temps")), Ok(21.5));
        assert!(matches!(
            sampler.sample("sequence", Some("temps")),
            Err(SamplerError::Unavailable { .. })
        ));
    }

    #[test]
    fn test_fail_and_unknown() {
        let sampler = MockSampler::new();
        assert!(matches!(
            sampler.sample("fail", None),
            Err(SamplerError::Unavailable { .. })
        ));
        assert!(matches!(
            sampler.sample("pressure", None),
            Err(SamplerError::UnknownMetric { .. })
        ));
    }
}
