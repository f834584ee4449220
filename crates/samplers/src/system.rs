//! System sampler - host load average
//!
//! Reads `/proc/loadavg`: `0.52 0.58 0.59 1/203 2095`.

use std::path::PathBuf;

use contracts::{Namespace, Sampler, SamplerError};

const DEFAULT_LOADAVG_PATH: &str = "/proc/loadavg";

/// Serves `system.loadavg1`, `system.loadavg5`, `system.loadavg15`
#[derive(Debug, Clone)]
pub struct SystemSampler {
    loadavg_path: PathBuf,
}

impl SystemSampler {
    pub fn new() -> Self {
        Self::with_loadavg_path(DEFAULT_LOADAVG_PATH)
    }

    /// Read load averages from a different file (tests, containers)
    pub fn with_loadavg_path(path: impl Into<PathBuf>) -> Self {
        Self {
            loadavg_path: path.into(),
        }
    }

    fn loadavg(&self, column: usize) -> Result<f64, SamplerError> {
        let content = std::fs::read_to_string(&self.loadavg_path)
            .map_err(|e| SamplerError::io(Namespace::System, &e))?;

        let field = content.split_whitespace().nth(column).ok_or_else(|| {
            SamplerError::parse(
                Namespace::System,
                format!("{} has fewer than {} fields", self.loadavg_path.display(), column + 1),
            )
        })?;

        field
            .parse::<f64>()
            .map_err(|e| SamplerError::parse(Namespace::System, format!("'{field}': {e}")))
    }
}

impl Default for SystemSampler {
    fn default() -> Self {
        Self::new()
    }
}

impl Sampler for SystemSampler {
    fn namespace(&self) -> Namespace {
        Namespace::System
    }

    fn sample(&self, metric: &str, _arg: Option<&str>) -> Result<f64, SamplerError> {
        match metric {
            "loadavg1" => self.loadavg(0),
            "loadavg5" => self.loadavg(1),
            "loadavg15" => self.loadavg(2),
            other => Err(SamplerError::unknown_metric(Namespace::System, other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn fake_loadavg(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_reads_all_three_columns() {
        let file = fake_loadavg("0.52 0.58 0.59 1/203 2095\n");
        let sampler = SystemSampler::with_loadavg_path(file.path());

        assert_eq!(sampler.sample("loadavg1", None), Ok(0.52));
        assert_eq!(sampler.sample("loadavg5", None), Ok(0.58));
        assert_eq!(sampler.sample("loadavg15", None), Ok(0.59));
    }

    #[test]
    fn test_unknown_metric() {
        let file = fake_loadavg("0.1 0.2 0.3 1/1 1\n");
        let sampler = SystemSampler::with_loadavg_path(file.path());
        assert!(matches!(
            sampler.sample("uptime", None),
            Err(SamplerError::UnknownMetric { .. })
        ));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let sampler = SystemSampler::with_loadavg_path("/definitely/not/here/loadavg");
        assert!(matches!(
            sampler.sample("loadavg1", None),
            Err(SamplerError::Io { .. })
        ));
    }

    #[test]
    fn test_truncated_file_is_parse_error() {
        let file = fake_loadavg("0.1\n");
        let sampler = SystemSampler::with_loadavg_path(file.path());
        assert!(matches!(
            sampler.sample("loadavg15", None),
            Err(SamplerError::Parse { .. })
        ));
    }
}
