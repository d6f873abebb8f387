//! Positional paths addressing one node of an AST

use crate::error::{Result, RuleEngineError};
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};
use smallvec::SmallVec;
use std::fmt;
use std::str::FromStr;

/// One step down the tree
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Branch {
    Left,
    Right,
}

impl Branch {
    /// The other child of the same parent
    #[inline]
    pub fn sibling(self) -> Branch {
        match self {
            Branch::Left => Branch::Right,
            Branch::Right => Branch::Left,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Branch::Left => "left",
            Branch::Right => "right",
        }
    }
}

impl FromStr for Branch {
    type Err = RuleEngineError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "left" => Ok(Branch::Left),
            "right" => Ok(Branch::Right),
            other => Err(RuleEngineError::InvalidPath(format!(
                "unknown path segment '{}'",
                other
            ))),
        }
    }
}

/// Sequence of branch selectors from the root; empty means the root itself.
///
/// Serializes as `["left", "right"]` and deserializes from that form or
/// from the dotted form `"left.right"`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize)]
pub struct NodePath(SmallVec<[Branch; 8]>);

impl NodePath {
    pub fn root() -> Self {
        Self::default()
    }

    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn steps(&self) -> &[Branch] {
        &self.0
    }

    pub fn iter(&self) -> impl Iterator<Item = Branch> + '_ {
        self.0.iter().copied()
    }

    /// Extend the path by one step
    pub fn child(&self, branch: Branch) -> NodePath {
        let mut steps = self.0.clone();
        steps.push(branch);
        NodePath(steps)
    }

    /// Parent path and last step, or `None` at the root
    pub fn split_last(&self) -> Option<(NodePath, Branch)> {
        let (last, parent) = self.0.split_last()?;
        Some((NodePath(parent.iter().copied().collect()), *last))
    }

    /// Build from already tokenized segments such as `["left", "right"]`
    pub fn from_segments<I, S>(segments: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        segments
            .into_iter()
            .map(|s| s.as_ref().parse::<Branch>())
            .collect::<Result<SmallVec<_>>>()
            .map(NodePath)
    }
}

impl From<Vec<Branch>> for NodePath {
    fn from(steps: Vec<Branch>) -> Self {
        NodePath(SmallVec::from_vec(steps))
    }
}

impl<const N: usize> From<[Branch; N]> for NodePath {
    fn from(steps: [Branch; N]) -> Self {
        NodePath(steps.into_iter().collect())
    }
}

impl FromStr for NodePath {
    type Err = RuleEngineError;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        if s.is_empty() {
            return Ok(NodePath::root());
        }
        NodePath::from_segments(s.split('.'))
    }
}

impl fmt::Display for NodePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, branch) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(".")?;
            }
            f.write_str(branch.as_str())?;
        }
        Ok(())
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum PathRepr {
    Dotted(String),
    Segments(Vec<String>),
}

impl<'de> Deserialize<'de> for NodePath {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        match PathRepr::deserialize(deserializer)? {
            PathRepr::Dotted(s) => s.parse().map_err(D::Error::custom),
            PathRepr::Segments(segments) => {
                NodePath::from_segments(segments).map_err(D::Error::custom)
            }
        }
    }
}
