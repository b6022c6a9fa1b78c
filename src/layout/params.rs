//! Layout parameters.
//!
//! ## Float Normalization for Deterministic Hashing
//!
//! Floats are quantized with [`crate::canonical::quantize`] before hashing,
//! so two parameter sets that differ only by float noise share a hash.

use serde::{Deserialize, Serialize};

use crate::canonical::{canonical_hash_hex, quantize};
use crate::DEFAULT_LAYOUT_VERSION;

/// Geometry constants for the radial layout.
///
/// ## Parameters
///
/// - `min_size`: Floor applied to both container dimensions
/// - `orbit_divisor`: Orbit radius is `min(width, height) / orbit_divisor`
/// - `root_radius_divisor` / `root_radius_min`: Root radius is
///   `max(root_radius_min, min(width, height) / root_radius_divisor)`
/// - `child_radius`: Fixed child marker radius
/// - `label_gap`: Extra distance between a child marker and its label
/// - `anchor_threshold`: `|cos(angle)|` below which labels are centered
/// - `max_chars_per_line` / `line_height_em`: Label wrapping
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayoutParams {
    /// Layout version identifier.
    pub version: String,
    /// Minimum container width and height.
    pub min_size: f64,
    /// Divisor producing the orbit radius.
    pub orbit_divisor: f64,
    /// Divisor producing the root radius.
    pub root_radius_divisor: f64,
    /// Smallest root radius.
    pub root_radius_min: f64,
    /// Child marker radius.
    pub child_radius: f64,
    /// Gap between child marker and label.
    pub label_gap: f64,
    /// Horizontal dead zone for text anchoring.
    pub anchor_threshold: f64,
    /// Character budget per label line.
    pub max_chars_per_line: usize,
    /// Line height in em units.
    pub line_height_em: f64,
}

impl LayoutParams {
    /// Get the layout version.
    pub fn layout_id(&self) -> &str {
        &self.version
    }

    /// Compute a stable hash of the parameters.
    pub fn params_hash(&self) -> String {
        canonical_hash_hex(&self.to_quantized())
    }

    fn to_quantized(&self) -> QuantizedLayoutParams {
        QuantizedLayoutParams {
            version: self.version.clone(),
            min_size: quantize(self.min_size),
            orbit_divisor: quantize(self.orbit_divisor),
            root_radius_divisor: quantize(self.root_radius_divisor),
            root_radius_min: quantize(self.root_radius_min),
            child_radius: quantize(self.child_radius),
            label_gap: quantize(self.label_gap),
            anchor_threshold: quantize(self.anchor_threshold),
            max_chars_per_line: self.max_chars_per_line,
            line_height_em: quantize(self.line_height_em),
        }
    }
}

impl Default for LayoutParams {
    fn default() -> Self {
        Self {
            version: DEFAULT_LAYOUT_VERSION.to_string(),
            min_size: 300.0,
            orbit_divisor: 3.0,
            root_radius_divisor: 8.0,
            root_radius_min: 40.0,
            child_radius: 10.0,
            label_gap: 25.0,
            anchor_threshold: 0.1,
            max_chars_per_line: 20,
            line_height_em: 1.1,
        }
    }
}

#[derive(Serialize)]
struct QuantizedLayoutParams {
    version: String,
    min_size: i64,
    orbit_divisor: i64,
    root_radius_divisor: i64,
    root_radius_min: i64,
    child_radius: i64,
    label_gap: i64,
    anchor_threshold: i64,
    max_chars_per_line: usize,
    line_height_em: i64,
}
