//! Run parameter hygiene.

/// Parameter keys the backend no longer accepts or only used internally.
///
/// They are dropped from retained run payloads both when a run is mapped
/// from a fresh response and when an old cache is loaded.
pub const DEPRECATED_PARAM_KEYS: &[&str] = &["strict_validate"];

/// Remove deprecated keys from a run payload, at the top level and inside
/// its `params` object. Returns `true` if anything was removed.
pub fn strip_deprecated_params(raw: &mut serde_json::Value) -> bool {
    let Some(obj) = raw.as_object_mut() else {
        return false;
    };

    let mut changed = false;
    for key in DEPRECATED_PARAM_KEYS {
        changed |= obj.remove(*key).is_some();
    }
    if let Some(params) = obj.get_mut("params").and_then(|p| p.as_object_mut()) {
        for key in DEPRECATED_PARAM_KEYS {
            changed |= params.remove(*key).is_some();
        }
    }
    changed
}
