//! Repair pipeline applied to every snapshot read from storage.
//!
//! Each rule is a pure `Snapshot -> Repaired<Snapshot>` function that
//! reports whether it changed anything. [`repair_snapshot`] runs them in
//! order. Rules never drop entries: unreadable text is replaced with a
//! placeholder the user can edit.

use imgbench_core::builtin::{
    self, ALG_DN_CNN, BASELINE_NAME_PREFIX_DN_CNN, DEMO_DATASET_NAME_PREFIX, DS_DEMO,
};
use imgbench_core::models::{Algorithm, Dataset, Preset};
use imgbench_core::params::strip_deprecated_params;

use crate::snapshot::{Snapshot, SNAPSHOT_VERSION};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Character inserted by lossy UTF-8 decoding.
pub const REPLACEMENT_CHAR: char = '\u{FFFD}';

/// A run of question marks this long marks text mangled by a lossy
/// charset conversion.
pub const QUESTION_MARK_RUN: &str = "???";

pub const PLACEHOLDER_NAME: &str = "name unreadable, please edit";
pub const PLACEHOLDER_TYPE: &str = "type unreadable, please edit";
pub const PLACEHOLDER_SIZE: &str = "size unreadable, please edit";
pub const PLACEHOLDER_TASK: &str = "task unreadable, please edit";
pub const PLACEHOLDER_IMPL: &str = "implementation unreadable, please edit";
pub const PLACEHOLDER_VERSION: &str = "version unreadable, please edit";
pub const PLACEHOLDER_TIMESTAMP: &str = "-";

// ---------------------------------------------------------------------------
// Pipeline
// ---------------------------------------------------------------------------

/// The result of a repair step.
#[derive(Debug, Clone, PartialEq)]
pub struct Repaired<T> {
    pub value: T,
    pub changed: bool,
}

impl<T> Repaired<T> {
    pub fn unchanged(value: T) -> Self {
        Self {
            value,
            changed: false,
        }
    }
}

/// A single repair rule.
pub type RepairRule = fn(Snapshot) -> Repaired<Snapshot>;

/// Rules in the order they run.
pub const PIPELINE: &[(&str, RepairRule)] = &[
    ("restore_builtin_entries", restore_builtin_entries),
    ("placeholder_corrupted_fields", placeholder_corrupted_fields),
    ("strip_deprecated_run_params", strip_deprecated_run_params),
    ("stamp_version", stamp_version),
];

/// Run every rule of [`PIPELINE`] over `snapshot`.
pub fn repair_snapshot(snapshot: Snapshot) -> Repaired<Snapshot> {
    PIPELINE
        .iter()
        .fold(Repaired::unchanged(snapshot), |acc, (name, rule)| {
            let step = rule(acc.value);
            if step.changed {
                tracing::info!(rule = name, "Repaired cached snapshot");
            }
            Repaired {
                value: step.value,
                changed: acc.changed || step.changed,
            }
        })
}

/// `true` if `text` shows signs of a lossy decode.
pub fn is_corrupted_text(text: &str) -> bool {
    text.contains(REPLACEMENT_CHAR) || text.contains(QUESTION_MARK_RUN)
}

// ---------------------------------------------------------------------------
// Rules
// ---------------------------------------------------------------------------

/// Restore corrupted built-in entries to their canonical text.
///
/// Built-ins are recognized by id, or by name prefix when the id itself
/// was rewritten. Non-text fields (id, timestamps, params, raw payload)
/// are kept.
pub fn restore_builtin_entries(mut snapshot: Snapshot) -> Repaired<Snapshot> {
    let mut changed = false;

    for alg in &mut snapshot.algorithms {
        if !algorithm_is_corrupted(alg) {
            continue;
        }
        let canonical_id = if builtin::is_baseline_algorithm(&alg.id) {
            alg.id.clone()
        } else if alg.name.starts_with(BASELINE_NAME_PREFIX_DN_CNN) {
            ALG_DN_CNN.to_string()
        } else {
            continue;
        };
        if let Some(canonical) = builtin::baseline_algorithm(&canonical_id) {
            alg.task = canonical.task;
            alg.name = canonical.name;
            alg.implementation = canonical.implementation;
            alg.version = canonical.version;
            changed = true;
        }
    }

    for ds in &mut snapshot.datasets {
        let is_demo = ds.id == DS_DEMO || ds.name.starts_with(DEMO_DATASET_NAME_PREFIX);
        if is_demo && dataset_is_corrupted(ds) {
            let canonical = builtin::demo_dataset();
            ds.name = canonical.name;
            ds.kind = canonical.kind;
            ds.size = canonical.size;
            changed = true;
        }
    }

    Repaired {
        value: snapshot,
        changed,
    }
}

/// Replace any remaining corrupted text field with a placeholder.
pub fn placeholder_corrupted_fields(mut snapshot: Snapshot) -> Repaired<Snapshot> {
    let mut changed = false;

    for ds in &mut snapshot.datasets {
        changed |= replace_if_corrupted(&mut ds.name, PLACEHOLDER_NAME);
        changed |= replace_if_corrupted(&mut ds.kind, PLACEHOLDER_TYPE);
        changed |= replace_if_corrupted(&mut ds.size, PLACEHOLDER_SIZE);
        changed |= replace_if_corrupted(&mut ds.created_at, PLACEHOLDER_TIMESTAMP);
    }

    for alg in &mut snapshot.algorithms {
        changed |= replace_if_corrupted(&mut alg.name, PLACEHOLDER_NAME);
        changed |= replace_if_corrupted(&mut alg.task, PLACEHOLDER_TASK);
        changed |= replace_if_corrupted(&mut alg.implementation, PLACEHOLDER_IMPL);
        changed |= replace_if_corrupted(&mut alg.version, PLACEHOLDER_VERSION);
        changed |= replace_if_corrupted(&mut alg.created_at, PLACEHOLDER_TIMESTAMP);
    }

    for preset in &mut snapshot.presets {
        changed |= repair_preset(preset);
    }

    Repaired {
        value: snapshot,
        changed,
    }
}

/// Drop deprecated parameter keys from every run's retained payload.
pub fn strip_deprecated_run_params(mut snapshot: Snapshot) -> Repaired<Snapshot> {
    let mut changed = false;
    for run in &mut snapshot.runs {
        changed |= strip_deprecated_params(&mut run.raw);
    }
    Repaired {
        value: snapshot,
        changed,
    }
}

/// Bring older snapshots up to [`SNAPSHOT_VERSION`].
pub fn stamp_version(mut snapshot: Snapshot) -> Repaired<Snapshot> {
    if snapshot.version >= SNAPSHOT_VERSION {
        return Repaired::unchanged(snapshot);
    }
    snapshot.version = SNAPSHOT_VERSION;
    Repaired {
        value: snapshot,
        changed: true,
    }
}

// ---- private helpers ----

fn algorithm_is_corrupted(alg: &Algorithm) -> bool {
    [&alg.name, &alg.task, &alg.implementation, &alg.version]
        .into_iter()
        .any(|field| is_corrupted_text(field))
}

fn dataset_is_corrupted(ds: &Dataset) -> bool {
    [&ds.name, &ds.kind, &ds.size]
        .into_iter()
        .any(|field| is_corrupted_text(field))
}

fn repair_preset(preset: &mut Preset) -> bool {
    replace_if_corrupted(&mut preset.name, PLACEHOLDER_NAME)
        | replace_if_corrupted(&mut preset.task, PLACEHOLDER_TASK)
}

fn replace_if_corrupted(field: &mut String, placeholder: &str) -> bool {
    if is_corrupted_text(field) {
        *field = placeholder.to_string();
        true
    } else {
        false
    }
}

#[cfg(test)]
mod tests {
    use imgbench_core::models::Run;
    use serde_json::json;

    use super::*;

    fn corrupted_baseline() -> Algorithm {
        let mut alg = builtin::baseline_algorithm(ALG_DN_CNN).unwrap();
        alg.name = "DnCNN(\u{FFFD}\u{FFFD})".into();
        alg.default_params.insert("sigma".into(), json!(25));
        alg
    }

    #[test]
    fn detects_replacement_char_and_question_runs() {
        assert!(is_corrupted_text("Demo-\u{FFFD}"));
        assert!(is_corrupted_text("DCP???(real)"));
        assert!(!is_corrupted_text("What?? Fine"));
        assert!(!is_corrupted_text("Kodak24"));
    }

    #[test]
    fn restores_baseline_by_id_and_keeps_params() {
        let snapshot = Snapshot {
            algorithms: vec![corrupted_baseline()],
            ..Default::default()
        };

        let out = restore_builtin_entries(snapshot);

        assert!(out.changed);
        let alg = &out.value.algorithms[0];
        assert_eq!(alg.name, "DnCNN (example)");
        assert_eq!(alg.default_params["sigma"], json!(25));
    }

    #[test]
    fn restores_baseline_by_name_prefix() {
        let snapshot = Snapshot {
            algorithms: vec![Algorithm {
                id: "alg_legacy".into(),
                name: "DnCNN ???".into(),
                ..Default::default()
            }],
            ..Default::default()
        };

        let out = restore_builtin_entries(snapshot);

        assert!(out.changed);
        assert_eq!(out.value.algorithms[0].id, "alg_legacy");
        assert_eq!(out.value.algorithms[0].name, "DnCNN (example)");
    }

    #[test]
    fn restores_demo_dataset() {
        let mut ds = builtin::demo_dataset();
        ds.kind = "???".into();
        let snapshot = Snapshot {
            datasets: vec![ds],
            ..Default::default()
        };

        let out = restore_builtin_entries(snapshot);

        assert!(out.changed);
        assert_eq!(out.value.datasets[0], builtin::demo_dataset());
    }

    #[test]
    fn arbitrary_entries_get_placeholders_not_dropped() {
        let snapshot = Snapshot {
            datasets: vec![Dataset {
                id: "ds_user".into(),
                name: "My ??? set".into(),
                kind: "image".into(),
                size: "\u{FFFD}".into(),
                ..Default::default()
            }],
            algorithms: vec![Algorithm {
                id: "alg_user".into(),
                name: "Custom".into(),
                task: "\u{FFFD}\u{FFFD}".into(),
                ..Default::default()
            }],
            ..Default::default()
        };

        let out = placeholder_corrupted_fields(snapshot);

        assert!(out.changed);
        let ds = &out.value.datasets[0];
        assert_eq!(ds.id, "ds_user");
        assert_eq!(ds.name, PLACEHOLDER_NAME);
        assert_eq!(ds.kind, "image");
        assert_eq!(ds.size, PLACEHOLDER_SIZE);
        assert_eq!(out.value.algorithms[0].task, PLACEHOLDER_TASK);
        assert_eq!(out.value.algorithms[0].name, "Custom");
    }

    #[test]
    fn strips_deprecated_params_from_runs_only() {
        let snapshot = Snapshot {
            runs: vec![Run {
                id: "r1".into(),
                raw: json!({"params": {"strict_validate": true, "metrics": ["PSNR"]}}),
                ..Default::default()
            }],
            ..Default::default()
        };

        let out = strip_deprecated_run_params(snapshot);

        assert!(out.changed);
        assert_eq!(out.value.runs[0].raw, json!({"params": {"metrics": ["PSNR"]}}));
        assert_eq!(out.value.runs[0].id, "r1");
    }

    #[test]
    fn pipeline_is_idempotent() {
        let snapshot = Snapshot {
            version: 1,
            algorithms: vec![corrupted_baseline()],
            ..Default::default()
        };

        let first = repair_snapshot(snapshot);
        assert!(first.changed);
        assert_eq!(first.value.version, SNAPSHOT_VERSION);

        let second = repair_snapshot(first.value.clone());
        assert!(!second.changed);
        assert_eq!(second.value, first.value);
    }
}
