//! Built-in catalog entries.
//!
//! Every task type has one baseline algorithm that must exist in the
//! local catalog no matter what the backend returns, so the run form
//! always has something to pick. The demo dataset is only used to repair
//! corrupted caches.

use crate::display::PLACEHOLDER;
use crate::models::{Algorithm, Dataset};
use crate::task_type::{
    self, TASK_DEBLUR, TASK_DEHAZE, TASK_DENOISE, TASK_LOWLIGHT, TASK_SR, TASK_VIDEO_DENOISE,
    TASK_VIDEO_SR,
};

/// Baseline denoising algorithm id.
pub const ALG_DN_CNN: &str = "alg_dn_cnn";

/// Baseline dehazing algorithm id.
pub const ALG_DEHAZE_DCP: &str = "alg_dehaze_dcp";

/// Built-in demo dataset id.
pub const DS_DEMO: &str = "ds_demo";

/// Version string given to every baseline algorithm.
const BASELINE_VERSION: &str = "v1";

/// `(id, task type, name, impl)` for each baseline algorithm.
const BASELINE_ALGORITHMS: &[(&str, &str, &str, &str)] = &[
    (ALG_DN_CNN, TASK_DENOISE, "DnCNN (example)", "PyTorch"),
    ("alg_deblur_unsharp", TASK_DEBLUR, "Unsharp Mask", "OpenCV"),
    (ALG_DEHAZE_DCP, TASK_DEHAZE, "DCP Dark Channel Prior", "OpenCV"),
    ("alg_sr_bicubic", TASK_SR, "Bicubic Upscaling", "OpenCV"),
    ("alg_lowlight_gamma", TASK_LOWLIGHT, "Gamma Correction", "OpenCV"),
    ("alg_video_denoise_nlm", TASK_VIDEO_DENOISE, "FastNLMeans (per frame)", "OpenCV"),
    ("alg_video_sr_bicubic", TASK_VIDEO_SR, "Bicubic (per frame)", "OpenCV"),
];

/// Name prefix that identifies the baseline denoiser even when its id was
/// lost.
pub const BASELINE_NAME_PREFIX_DN_CNN: &str = "DnCNN";

/// Name prefix that identifies the demo dataset even when its id was lost.
pub const DEMO_DATASET_NAME_PREFIX: &str = "Demo";

/// Ids of every baseline algorithm.
pub fn baseline_algorithm_ids() -> impl Iterator<Item = &'static str> {
    BASELINE_ALGORITHMS.iter().map(|(id, ..)| *id)
}

/// `true` if `id` names a baseline algorithm.
pub fn is_baseline_algorithm(id: &str) -> bool {
    baseline_algorithm_ids().any(|b| b == id)
}

/// Canonical entry for a baseline algorithm id.
pub fn baseline_algorithm(id: &str) -> Option<Algorithm> {
    BASELINE_ALGORITHMS
        .iter()
        .find(|(bid, ..)| *bid == id)
        .map(|&(id, task, name, implementation)| Algorithm {
            id: id.to_string(),
            task: task_type::to_label(task),
            name: name.to_string(),
            implementation: implementation.to_string(),
            version: BASELINE_VERSION.to_string(),
            created_at: PLACEHOLDER.to_string(),
            ..Default::default()
        })
}

/// Canonical entries for every baseline algorithm.
pub fn baseline_algorithms() -> Vec<Algorithm> {
    baseline_algorithm_ids()
        .filter_map(baseline_algorithm)
        .collect()
}

/// Canonical demo dataset.
pub fn demo_dataset() -> Dataset {
    Dataset {
        id: DS_DEMO.to_string(),
        name: "Demo sample dataset".to_string(),
        kind: "image".to_string(),
        size: "10 images".to_string(),
        ..Default::default()
    }
}

/// Append any missing baseline algorithm to `algorithms`.
///
/// Entries already present are left exactly as they are, including user
/// edits to a baseline. Returns the number of entries inserted.
pub fn ensure_baseline_algorithms(algorithms: &mut Vec<Algorithm>) -> usize {
    let missing: Vec<Algorithm> = baseline_algorithm_ids()
        .filter(|id| !algorithms.iter().any(|a| a.id == *id))
        .filter_map(baseline_algorithm)
        .collect();
    let inserted = missing.len();
    algorithms.extend(missing);
    inserted
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn one_baseline_per_task_type() {
        let baselines = baseline_algorithms();
        for entry in task_type::all() {
            assert!(
                baselines.iter().any(|a| a.task == entry.label),
                "no baseline for {}",
                entry.task_type
            );
        }
    }

    #[test]
    fn ensure_fills_an_empty_list() {
        let mut list = Vec::new();
        let inserted = ensure_baseline_algorithms(&mut list);
        assert_eq!(inserted, BASELINE_ALGORITHMS.len());
        for id in baseline_algorithm_ids() {
            assert!(list.iter().any(|a| a.id == id));
        }
    }

    #[test]
    fn ensure_keeps_user_edits_to_baselines() {
        let mut edited = baseline_algorithm(ALG_DN_CNN).unwrap();
        edited.name = "My tuned DnCNN".into();
        let mut list = vec![edited.clone()];

        ensure_baseline_algorithms(&mut list);

        assert_eq!(list[0], edited);
        assert_eq!(list.iter().filter(|a| a.id == ALG_DN_CNN).count(), 1);
    }

    #[test]
    fn ensure_is_a_noop_when_complete() {
        let mut list = baseline_algorithms();
        assert_eq!(ensure_baseline_algorithms(&mut list), 0);
    }

    #[test]
    fn unknown_id_has_no_baseline() {
        assert!(baseline_algorithm("alg_custom").is_none());
        assert!(!is_baseline_algorithm("alg_custom"));
        assert!(is_baseline_algorithm(ALG_DEHAZE_DCP));
    }
}
