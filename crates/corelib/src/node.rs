//! Physical node abstractions for the consistent hash ring.
//!
//! Physical nodes are the servers that own ring positions through their
//! virtual nodes. They are identified by a human-readable `NodeId` such as
//! `"Node A"` and carry an opaque display colour.

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Display colours handed out to the first nodes, in order.
pub const PALETTE: [&str; 6] = [
    "#00f0ff", "#ff2a6d", "#05ffa1", "#f9f002", "#b967ff", "#ff8c00",
];

/// Human-readable identifier of a physical node.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub String);

impl NodeId {
    pub fn new(id: impl Into<String>) -> Self {
        NodeId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Id for the node at `index` in naming order: `Node A` .. `Node Z`,
    /// then `Node AA`, `Node AB`, ...
    pub fn from_ordinal(index: usize) -> Self {
        let mut letters = Vec::new();
        let mut n = index + 1;
        while n > 0 {
            let rem = (n - 1) % 26;
            letters.push((b'A' + rem as u8) as char);
            n = (n - 1) / 26;
        }
        let suffix: String = letters.into_iter().rev().collect();
        NodeId(format!("Node {suffix}"))
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(&self.0)
    }
}

impl From<&str> for NodeId {
    fn from(value: &str) -> Self {
        NodeId(value.to_string())
    }
}

impl From<String> for NodeId {
    fn from(value: String) -> Self {
        NodeId(value)
    }
}

/// Opaque display colour. The ring never interprets it.
#[derive(Clone, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Color(pub String);

impl Color {
    /// Palette colour for `index`, or a random bright HSL colour once the
    /// palette is exhausted.
    pub fn for_ordinal(index: usize) -> Self {
        match PALETTE.get(index) {
            Some(hex) => Color((*hex).to_string()),
            None => Color::random(),
        }
    }

    pub fn random() -> Self {
        let mut rng = rand::rng();
        let hue = rng.random_range(0..360);
        let saturation = 70 + rng.random_range(0..30);
        let lightness = 50 + rng.random_range(0..15);
        Color(format!("hsl({hue}, {saturation}%, {lightness}%)"))
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Physical node participating in the ring.
///
/// Keep this struct small and cheap to clone; the ring copies the owner id
/// and colour into every virtual node.
#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct Node {
    pub id: NodeId,
    pub color: Color,
}

impl Node {
    pub fn new(id: impl Into<NodeId>, color: Color) -> Self {
        Self {
            id: id.into(),
            color,
        }
    }

    /// The node named and coloured for position `index` in naming order.
    pub fn from_ordinal(index: usize) -> Self {
        Self {
            id: NodeId::from_ordinal(index),
            color: Color::for_ordinal(index),
        }
    }
}
