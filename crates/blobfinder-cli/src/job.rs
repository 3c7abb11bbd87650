use blobfinder_core::pattern::Pattern;
use blobfinder_core::pipeline::config::CorrelationConfig;
use serde::{Deserialize, Serialize};

/// Everything needed to correlate a set of frames, as stored in a job file.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct JobConfig {
    /// Expected (row, col) peak positions, rounded to whole pixels.
    pub peaks: Vec<[f64; 2]>,
    /// Global (row, col) offset added to every peak.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zero_shift: Option<[f64; 2]>,
    pub pattern: Pattern,
    #[serde(default)]
    pub correlation: CorrelationConfig,
}

impl Default for JobConfig {
    fn default() -> Self {
        Self {
            peaks: vec![[32.0, 32.0], [32.0, 64.0], [64.0, 32.0], [64.0, 64.0]],
            zero_shift: None,
            pattern: Pattern::default(),
            correlation: CorrelationConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use blobfinder_core::pipeline::config::{Strategy, Upsample};

    use super::*;

    #[test]
    fn test_job_file_round_trip() {
        let mut job = JobConfig::default();
        job.zero_shift = Some([1.5, -2.0]);
        job.correlation.strategy = Strategy::Sparse { steps: 2 };
        job.correlation.upsample = Upsample::Default;

        let text = toml::to_string_pretty(&job).unwrap();
        let parsed: JobConfig = toml::from_str(&text).unwrap();
        assert_eq!(parsed, job);
    }

    #[test]
    fn test_minimal_job_file() {
        let text = r#"
peaks = [[10.0, 12.0]]

[pattern]
kind = "gaussian"
sigma = 1.5
"#;
        let job: JobConfig = toml::from_str(text).unwrap();
        assert_eq!(job.peaks, vec![[10.0, 12.0]]);
        assert_eq!(job.pattern, Pattern::gaussian(1.5));
        assert_eq!(job.correlation, CorrelationConfig::default());
    }
}
