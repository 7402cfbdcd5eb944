//! Pure mapping from backend representations to local shapes.
//!
//! Every function here is total: any well-formed response maps to a
//! local entry, whatever its status token or task type.

use imgbench_client::wire::{AlgorithmOut, DatasetOut, JsonMap, PresetOut, RunOut};
use imgbench_core::display::{format_elapsed, format_unix_seconds};
use imgbench_core::metric_names::{METRIC_NIQE, METRIC_PSNR, METRIC_SSIM};
use imgbench_core::models::{Algorithm, Dataset, Preset, Run};
use imgbench_core::params::strip_deprecated_params;
use imgbench_core::status::normalize_status;
use imgbench_core::task_type;

/// Map a backend run into the run-table shape.
pub fn map_run(out: RunOut) -> Run {
    let mut raw = to_raw(&out);
    strip_deprecated_params(&mut raw);

    Run {
        task: task_type::to_label(&out.task_type),
        status: normalize_status(&out.status),
        created_at: format_unix_seconds(out.created_at),
        psnr: extract_metric(&out.metrics, METRIC_PSNR),
        ssim: extract_metric(&out.metrics, METRIC_SSIM),
        niqe: extract_metric(&out.metrics, METRIC_NIQE),
        elapsed: format_elapsed(out.elapsed),
        error: out.error,
        id: out.run_id,
        task_type: out.task_type,
        dataset_id: out.dataset_id,
        algorithm_id: out.algorithm_id,
        raw,
    }
}

pub fn map_dataset(out: DatasetOut) -> Dataset {
    let raw = to_raw(&out);
    Dataset {
        id: out.dataset_id,
        name: out.name,
        kind: out.kind,
        size: out.size,
        created_at: format_unix_seconds(out.created_at),
        raw,
    }
}

/// Map a backend algorithm. The wire task type becomes a display label.
pub fn map_algorithm(out: AlgorithmOut) -> Algorithm {
    let raw = to_raw(&out);
    Algorithm {
        id: out.algorithm_id,
        task: task_type::to_label(&out.task),
        name: out.name,
        implementation: out.implementation,
        version: out.version,
        created_at: format_unix_seconds(out.created_at),
        default_params: out.default_params,
        raw,
    }
}

pub fn map_preset(out: PresetOut) -> Preset {
    let raw = to_raw(&out);
    Preset {
        id: out.preset_id,
        name: out.name,
        task: task_type::to_label(&out.task_type),
        task_type: out.task_type,
        dataset_id: out.dataset_id,
        algorithm_id: out.algorithm_id,
        metrics: out.metrics,
        params: out.params,
        created_at: format_unix_seconds(out.created_at),
        updated_at: format_unix_seconds(out.updated_at),
        raw,
    }
}

/// Look up a numeric metric regardless of key case.
///
/// An exact key match wins over a case-insensitive one. Numeric strings
/// are accepted; anything else is treated as absent.
pub fn extract_metric(metrics: &JsonMap, name: &str) -> Option<f64> {
    let value = metrics.get(name).or_else(|| {
        metrics
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value)
    })?;

    match value {
        serde_json::Value::Number(n) => n.as_f64(),
        serde_json::Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn to_raw<T: serde::Serialize>(out: &T) -> serde_json::Value {
    // Wire types are plain JSON maps, serializing them cannot fail.
    serde_json::to_value(out).unwrap_or(serde_json::Value::Null)
}
