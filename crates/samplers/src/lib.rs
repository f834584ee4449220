//! # Samplers
//!
//! Metric capability plugins and the namespace dispatch in front of them.
//!
//! Responsibilities:
//! - Map a `Namespace` to the `Sampler` serving it (`SamplerRegistry`)
//! - Built-in plugins: `system` (load average), `net` (ping), `mock` (fakes)
//!
//! ## Usage Example
//!
//! ```ignore
//! use samplers::{SamplerRegistry, SystemSampler, NetSampler};
//! use contracts::SamplerKey;
//!
//! let registry = SamplerRegistry::builder()
//!     .register(SystemSampler::new())
//!     .register(NetSampler::new())
//!     .build();
//!
//! let key = SamplerKey::parse("system.loadavg1")?;
//! let value = registry.sample(&key, None)?;
//! ```

mod mock;
mod net;
mod registry;
mod system;

pub use contracts::{Sampler, SamplerError, SamplerKey};
pub use mock::MockSampler;
pub use net::{parse_ping_output, NetSampler, PingConfig};
pub use registry::{SamplerRegistry, SamplerRegistryBuilder};
pub use system::SystemSampler;
