//! GPU telemetry sampling, per spec.md §4.8 / §6.
//!
//! The pack carries no GPU-query crate (no `nvml-wrapper` in any teacher
//! dependency table), so this follows the same external-process pattern the
//! Audio Acquirer uses for `yt-dlp`/`ffmpeg`/`ffprobe`: `nvidia-smi` is
//! invoked as a subprocess and its CSV output parsed, behind a `GpuSampler`
//! trait so tests don't shell out.
use std::time::Duration;

use async_trait::async_trait;
use ingest_acquirer::subprocess;

const NVIDIA_SMI_TIMEOUT: Duration = Duration::from_secs(5);
const LOW_UTILISATION_THRESHOLD: f64 = 90.0;

#[derive(Debug, Clone, Copy, Default)]
pub struct GpuSample {
    pub utilization_gpu_pct: f64,
    pub memory_used_mib: f64,
    pub memory_free_mib: f64,
    pub temperature_c: f64,
    pub power_draw_w: f64,
}

#[derive(Debug, thiserror::Error)]
pub enum TelemetryError {
    #[error("nvidia-smi probe failed: {0}")]
    ProbeFailed(String),
    #[error("could not parse nvidia-smi output: {0:?}")]
    Unparseable(String),
}

#[async_trait]
pub trait GpuSampler: Send + Sync {
    async fn sample(&self) -> Result<GpuSample, TelemetryError>;
}

/// Queries `nvidia-smi --query-gpu=... --format=csv,noheader,nounits`, per
/// spec.md §6's stable subprocess surface.
pub struct NvidiaSmiSampler {
    bin: String,
}

impl Default for NvidiaSmiSampler {
    fn default() -> Self {
        Self { bin: "nvidia-smi".to_string() }
    }
}

#[async_trait]
impl GpuSampler for NvidiaSmiSampler {
    async fn sample(&self) -> Result<GpuSample, TelemetryError> {
        let args = [
            "--query-gpu=utilization.gpu,memory.used,memory.free,temperature.gpu,power.draw",
            "--format=csv,noheader,nounits",
        ];
        let out = subprocess::run_with_timeout(&self.bin, &args, NVIDIA_SMI_TIMEOUT)
            .await
            .map_err(|e| TelemetryError::ProbeFailed(e.to_string()))?;
        if !out.success {
            return Err(TelemetryError::ProbeFailed(out.stderr));
        }
        parse_csv_line(out.stdout.lines().next().unwrap_or_default())
    }
}

fn parse_csv_line(line: &str) -> Result<GpuSample, TelemetryError> {
    let values: Vec<&str> = line.split(',').map(str::trim).collect();
    if values.len() < 5 {
        return Err(TelemetryError::Unparseable(line.to_string()));
    }
    let parse = |s: &str| s.parse::<f64>().map_err(|_| TelemetryError::Unparseable(line.to_string()));
    Ok(GpuSample {
        utilization_gpu_pct: parse(values[0])?,
        memory_used_mib: parse(values[1])?,
        memory_free_mib: parse(values[2])?,
        temperature_c: parse(values[3])?,
        power_draw_w: parse(values[4])?,
    })
}

/// `true` when the sample's SM utilisation is low enough to warrant the
/// "sub-optimal utilisation" warning log line.
#[must_use]
pub fn is_low_utilisation(sample: &GpuSample) -> bool {
    sample.utilization_gpu_pct < LOW_UTILISATION_THRESHOLD
}

pub fn log_sample(sample: &GpuSample, q1_depth: usize, q2_depth: usize) {
    if is_low_utilisation(sample) {
        tracing::warn!(
            sm_pct = sample.utilization_gpu_pct,
            vram_used_mib = sample.memory_used_mib,
            vram_free_mib = sample.memory_free_mib,
            temp_c = sample.temperature_c,
            power_w = sample.power_draw_w,
            q1_depth,
            q2_depth,
            "GPU utilisation below target"
        );
    } else {
        tracing::info!(
            sm_pct = sample.utilization_gpu_pct,
            vram_used_mib = sample.memory_used_mib,
            vram_free_mib = sample.memory_free_mib,
            temp_c = sample.temperature_c,
            power_w = sample.power_draw_w,
            q1_depth,
            q2_depth,
            "gpu telemetry sample"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_well_formed_csv_line() {
        let sample = parse_csv_line("97, 8192, 8192, 62, 210.5").unwrap();
        assert_eq!(sample.utilization_gpu_pct, 97.0);
        assert_eq!(sample.memory_used_mib, 8192.0);
        assert_eq!(sample.power_draw_w, 210.5);
    }

    #[test]
    fn rejects_short_line() {
        assert!(parse_csv_line("97, 8192").is_err());
    }

    #[test]
    fn low_utilisation_flagged_under_threshold() {
        let sample = GpuSample { utilization_gpu_pct: 70.0, ..Default::default() };
        assert!(is_low_utilisation(&sample));
    }

    #[test]
    fn high_utilisation_not_flagged() {
        let sample = GpuSample { utilization_gpu_pct: 95.0, ..Default::default() };
        assert!(!is_low_utilisation(&sample));
    }

    struct FakeSampler(GpuSample);

    #[async_trait]
    impl GpuSampler for FakeSampler {
        async fn sample(&self) -> Result<GpuSample, TelemetryError> {
            Ok(self.0)
        }
    }

    #[tokio::test]
    async fn fake_sampler_roundtrips() {
        let sampler = FakeSampler(GpuSample { utilization_gpu_pct: 88.0, ..Default::default() });
        let sample = sampler.sample().await.unwrap();
        assert_eq!(sample.utilization_gpu_pct, 88.0);
    }
}
