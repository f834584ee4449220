//! SamplerRegistry - namespace -> sampler dispatch
//!
//! Pure dispatch, no state beyond the registration table. Built once, then
//! shared read-only by every worker.

use std::collections::HashMap;
use std::fmt;

use contracts::{Namespace, Sampler, SamplerError, SamplerKey};
use tracing::{debug, instrument, trace};

use crate::{MockSampler, NetSampler, SystemSampler};

/// Dispatches sample requests to the sampler registered for their namespace
pub struct SamplerRegistry {
    samplers: HashMap<Namespace, Box<dyn Sampler>>,
}

impl SamplerRegistry {
    /// Start an empty registration
    pub fn builder() -> SamplerRegistryBuilder {
        SamplerRegistryBuilder::default()
    }

    /// Registry with the built-in `system`, `net` and `mock` samplers
    pub fn with_defaults() -> Self {
        Self::builder()
            .register(SystemSampler::new())
            .register(NetSampler::new())
            .register(MockSampler::new())
            .build()
    }

    /// Forward `(metric, arg)` to the sampler registered for the key's namespace
    ///
    /// # Errors
    /// `UnknownNamespace` if nothing is registered, otherwise the sampler's own
    /// failure unchanged.
    pub fn sample(&self, key: &SamplerKey, arg: Option<&str>) -> Result<f64, SamplerError> {
        let namespace = key.namespace();
        let sampler = self
            .samplers
            .get(&namespace)
            .ok_or(SamplerError::UnknownNamespace { namespace })?;

        let value = sampler.sample(key.metric(), arg)?;
        trace!(key = %key, arg = ?arg, value, "sampled");
        Ok(value)
    }

    /// Whether a sampler serves `namespace`
    pub fn supports(&self, namespace: Namespace) -> bool {
        self.samplers.contains_key(&namespace)
    }

    /// Registered namespaces, sorted
    pub fn namespaces(&self) -> Vec<Namespace> {
        let mut namespaces: Vec<_> = self.samplers.keys().copied().collect();
        namespaces.sort();
        namespaces
    }
}

impl fmt::Debug for SamplerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SamplerRegistry")
            .field("namespaces", &self.namespaces())
            .finish()
    }
}

/// Builder for `SamplerRegistry`
#[derive(Default)]
pub struct SamplerRegistryBuilder {
    samplers: HashMap<Namespace, Box<dyn Sampler>>,
}

impl SamplerRegistryBuilder {
    /// Register a sampler under its own namespace, replacing any earlier one
    #[instrument(name = "sampler_registry_register", skip(self, sampler), fields(namespace = %sampler.namespace()))]
    pub fn register<S: Sampler + 'static>(mut self, sampler: S) -> Self {
        let namespace = sampler.namespace();
        if self.samplers.insert(namespace, Box::new(sampler)).is_some() {
            debug!(namespace = %namespace, "replaced previously registered sampler");
        }
        self
    }

    pub fn build(self) -> SamplerRegistry {
        debug!(count = self.samplers.len(), "sampler registry built");
        SamplerRegistry {
            samplers: self.samplers,
        }
    }
}
