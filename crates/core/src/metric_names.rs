//! Well-known quality metric names.
//!
//! The backend reports metrics in a free-form map. These are the keys the
//! run table flattens into dedicated columns; lookups ignore case since
//! both `PSNR` and `psnr` appear in the wild.

/// Peak signal-to-noise ratio (dB, higher is better).
pub const METRIC_PSNR: &str = "PSNR";

/// Structural similarity index (0-1, higher is better).
pub const METRIC_SSIM: &str = "SSIM";

/// Natural image quality evaluator (no-reference, lower is better).
pub const METRIC_NIQE: &str = "NIQE";

/// Metrics requested when a caller does not pick any.
pub const DEFAULT_METRICS: &[&str] = &[METRIC_PSNR, METRIC_SSIM, METRIC_NIQE];
