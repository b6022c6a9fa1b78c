//! Radial layout engine.
//!
//! A pure function from (container size, root, children) to positioned
//! nodes. The root sits at the center; children sit evenly spaced on one
//! orbit, index 0 at 12 o'clock and proceeding clockwise in screen
//! coordinates (y grows downward).
//!
//! ```text
//!                 child 0
//!                    |
//!   child n-1 -- [ root ] -- child 1
//!                    |
//!                   ...
//! ```
//!
//! ## Determinism Guarantees
//!
//! - Same params + same dimensions + same node list → identical output
//! - No state is kept between calls; every call builds a fresh snapshot
//! - Snapshots carry a fingerprint over quantized coordinates

pub mod label;
pub mod params;

use std::f64::consts::{FRAC_PI_2, TAU};

use serde::{Deserialize, Serialize};

use crate::canonical::{canonical_hash_hex, quantize};
use crate::types::Node;

pub use label::{label_lines, wrap_label, LabelLine};
pub use params::LayoutParams;

/// Horizontal alignment of a label relative to its anchor point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextAnchor {
    /// Text extends to the right (label on the right half of the orbit).
    Start,
    /// Text is centered (top and bottom of the orbit, and the root).
    Middle,
    /// Text extends to the left (label on the left half of the orbit).
    End,
}

impl TextAnchor {
    /// Choose an anchor from the horizontal component of the angle.
    pub fn for_angle(angle: f64, threshold: f64) -> Self {
        let cos = angle.cos();
        if cos > threshold {
            Self::Start
        } else if cos < -threshold {
            Self::End
        } else {
            Self::Middle
        }
    }
}

/// Whether a positioned node is the root or on the orbit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    /// Center node.
    Root,
    /// Orbit node.
    Child,
}

/// A node with its computed geometry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayoutNode {
    /// The node being positioned.
    pub node: Node,
    /// Root or child.
    pub kind: NodeKind,
    /// Marker center x.
    pub x: f64,
    /// Marker center y.
    pub y: f64,
    /// Marker radius.
    pub radius: f64,
    /// Orbit angle in radians (children only).
    pub angle: Option<f64>,
    /// Label anchor x (children only; the root label is centered on the marker).
    pub text_x: Option<f64>,
    /// Label anchor y (children only).
    pub text_y: Option<f64>,
    /// Label alignment.
    pub text_anchor: TextAnchor,
    /// Wrapped label lines.
    pub label: Vec<LabelLine>,
}

/// Measured container size.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Dimensions {
    /// Width in layout units.
    pub width: f64,
    /// Height in layout units.
    pub height: f64,
}

impl Dimensions {
    /// Create dimensions.
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    /// Apply the minimum size floor. Non-finite values count as unmeasured.
    pub fn floored(self, min_size: f64) -> Self {
        let floor = |v: f64| if v.is_finite() { v.max(min_size) } else { min_size };
        Self {
            width: floor(self.width),
            height: floor(self.height),
        }
    }

    /// The smaller side.
    pub fn min_side(&self) -> f64 {
        self.width.min(self.height)
    }
}

/// A complete layout for one (dimensions, node set) pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayoutSnapshot {
    /// Version of the parameters that produced this layout.
    pub layout_id: String,
    /// [`LayoutParams::params_hash`] of those parameters.
    pub params_hash: String,
    /// Dimensions after the minimum-size floor.
    pub dimensions: Dimensions,
    /// Orbit radius.
    pub orbit_radius: f64,
    /// Root marker radius.
    pub root_radius: f64,
    /// Root first, then children in input order.
    pub nodes: Vec<LayoutNode>,
}

impl LayoutSnapshot {
    /// The positioned root.
    pub fn root(&self) -> Option<&LayoutNode> {
        self.nodes.first()
    }

    /// The positioned children, in input order.
    pub fn children(&self) -> &[LayoutNode] {
        self.nodes.get(1..).unwrap_or(&[])
    }

    /// Find a positioned node by id.
    pub fn find(&self, id: &str) -> Option<&LayoutNode> {
        self.nodes.iter().find(|n| n.node.id == id)
    }

    /// Stable fingerprint over the params hash, ids and quantized coordinates.
    ///
    /// Two layouts with identical geometry but different parameters (label
    /// wrapping, version) fingerprint differently.
    pub fn fingerprint(&self) -> String {
        let positions: Vec<QuantizedPosition<'_>> = self
            .nodes
            .iter()
            .map(|n| QuantizedPosition {
                id: &n.node.id,
                x: quantize(n.x),
                y: quantize(n.y),
                radius: quantize(n.radius),
                text_x: n.text_x.map(quantize),
                text_y: n.text_y.map(quantize),
                anchor: n.text_anchor,
            })
            .collect();
        canonical_hash_hex(&FingerprintInput {
            params_hash: &self.params_hash,
            positions,
        })
    }
}

#[derive(Serialize)]
struct FingerprintInput<'a> {
    params_hash: &'a str,
    positions: Vec<QuantizedPosition<'a>>,
}

#[derive(Serialize)]
struct QuantizedPosition<'a> {
    id: &'a str,
    x: i64,
    y: i64,
    radius: i64,
    text_x: Option<i64>,
    text_y: Option<i64>,
    anchor: TextAnchor,
}

/// Lay out `root` and `children` with default parameters.
///
/// Returns `children.len() + 1` nodes, root first.
pub fn layout(width: f64, height: f64, root: &Node, children: &[Node]) -> Vec<LayoutNode> {
    compute(&LayoutParams::default(), Dimensions::new(width, height), root, children).nodes
}

/// Lay out `root` and `children` into a full snapshot.
pub fn compute(
    params: &LayoutParams,
    dimensions: Dimensions,
    root: &Node,
    children: &[Node],
) -> LayoutSnapshot {
    let dimensions = dimensions.floored(params.min_size);
    let center_x = dimensions.width / 2.0;
    let center_y = dimensions.height / 2.0;
    let min_side = dimensions.min_side();

    let orbit_radius = min_side / params.orbit_divisor;
    let root_radius = (min_side / params.root_radius_divisor).max(params.root_radius_min);
    let label_radius = orbit_radius + params.child_radius + params.label_gap;

    let mut nodes = Vec::with_capacity(children.len() + 1);
    nodes.push(LayoutNode {
        node: root.clone(),
        kind: NodeKind::Root,
        x: center_x,
        y: center_y,
        radius: root_radius,
        angle: None,
        text_x: None,
        text_y: None,
        text_anchor: TextAnchor::Middle,
        label: label_lines(&root.label, params.max_chars_per_line, params.line_height_em),
    });

    let n = children.len();
    for (i, child) in children.iter().enumerate() {
        let angle = child_angle(i, n);
        let (sin, cos) = angle.sin_cos();
        nodes.push(LayoutNode {
            node: child.clone(),
            kind: NodeKind::Child,
            x: center_x + orbit_radius * cos,
            y: center_y + orbit_radius * sin,
            radius: params.child_radius,
            angle: Some(angle),
            text_x: Some(center_x + label_radius * cos),
            text_y: Some(center_y + label_radius * sin),
            text_anchor: TextAnchor::for_angle(angle, params.anchor_threshold),
            label: label_lines(&child.label, params.max_chars_per_line, params.line_height_em),
        });
    }

    LayoutSnapshot {
        layout_id: params.layout_id().to_string(),
        params_hash: params.params_hash(),
        dimensions,
        orbit_radius,
        root_radius,
        nodes,
    }
}

/// Angle of child `index` out of `count`: index 0 at 12 o'clock, clockwise.
pub fn child_angle(index: usize, count: usize) -> f64 {
    (index as f64 / count as f64) * TAU - FRAC_PI_2
}
