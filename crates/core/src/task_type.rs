//! Task-type table: wire identifiers and their display labels.
//!
//! This is the only place the mapping lives. Run creation, run display,
//! algorithm payloads and filtering all go through [`to_label`] and
//! [`to_type`].

/// Wire identifier for image denoising.
pub const TASK_DENOISE: &str = "denoise";

/// Wire identifier for image deblurring.
pub const TASK_DEBLUR: &str = "deblur";

/// Wire identifier for haze removal.
pub const TASK_DEHAZE: &str = "dehaze";

/// Wire identifier for single-image super-resolution.
pub const TASK_SR: &str = "sr";

/// Wire identifier for low-light enhancement.
pub const TASK_LOWLIGHT: &str = "lowlight";

/// Wire identifier for video denoising.
pub const TASK_VIDEO_DENOISE: &str = "video_denoise";

/// Wire identifier for video super-resolution.
pub const TASK_VIDEO_SR: &str = "video_sr";

/// `(wire type, label)` pairs in display order.
const TASK_TABLE: &[(&str, &str)] = &[
    (TASK_DENOISE, "Denoise"),
    (TASK_DEBLUR, "Deblur"),
    (TASK_DEHAZE, "Dehaze"),
    (TASK_SR, "Super-Resolution"),
    (TASK_LOWLIGHT, "Low-Light Enhancement"),
    (TASK_VIDEO_DENOISE, "Video Denoise"),
    (TASK_VIDEO_SR, "Video Super-Resolution"),
];

/// A row of the task table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaskEntry {
    pub task_type: &'static str,
    pub label: &'static str,
}

/// Every known task, in display order.
pub fn all() -> impl Iterator<Item = TaskEntry> {
    TASK_TABLE
        .iter()
        .map(|&(task_type, label)| TaskEntry { task_type, label })
}

/// Display label for a wire task type.
///
/// Lookup ignores ASCII case. Unknown types are returned unchanged so a
/// task the table does not know yet still shows up.
pub fn to_label(task_type: &str) -> String {
    TASK_TABLE
        .iter()
        .find(|(ty, _)| ty.eq_ignore_ascii_case(task_type))
        .map(|(_, label)| (*label).to_string())
        .unwrap_or_else(|| task_type.to_string())
}

/// Wire task type for a display label. Unknown labels are returned
/// unchanged.
pub fn to_type(label: &str) -> String {
    TASK_TABLE
        .iter()
        .find(|(_, l)| *l == label)
        .map(|(ty, _)| (*ty).to_string())
        .unwrap_or_else(|| label.to_string())
}

/// `true` if `task_type` is one of the known wire identifiers.
pub fn is_known_type(task_type: &str) -> bool {
    TASK_TABLE
        .iter()
        .any(|(ty, _)| ty.eq_ignore_ascii_case(task_type))
}
