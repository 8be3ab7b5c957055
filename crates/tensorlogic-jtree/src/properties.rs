//! Junction tree configuration.
//!
//! [`JTreeProperties`] is fixed when an engine is constructed. It also has a
//! string form, a [`PropertySet`], shared with other inference engines.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use tracing::warn;

use crate::elimination::EliminationHeuristic;
use crate::error::{PgmError, Result};
use crate::node::{NodeId, NodeSet};

/// String key/value configuration.
pub type PropertySet = BTreeMap<String, String>;

/// Message-passing schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum UpdateType {
    /// Collect/distribute with separator beliefs
    #[default]
    #[serde(rename = "HUGIN")]
    Hugin,
    /// Explicit messages stored per outer region and separator
    #[serde(rename = "SHSH")]
    ShaferShenoy,
}

/// Marginalization used while passing messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum InferenceType {
    /// Sum-product: marginals and the partition sum
    #[default]
    #[serde(rename = "SUMPROD")]
    SumProduct,
    /// Max-product: max-marginals for MAP assignments
    #[serde(rename = "MAXPROD")]
    MaxProduct,
}

impl UpdateType {
    /// Upper-case name used in property strings.
    pub fn as_str(self) -> &'static str {
        match self {
            UpdateType::Hugin => "HUGIN",
            UpdateType::ShaferShenoy => "SHSH",
        }
    }
}

impl InferenceType {
    /// Upper-case name used in property strings.
    pub fn as_str(self) -> &'static str {
        match self {
            InferenceType::SumProduct => "SUMPROD",
            InferenceType::MaxProduct => "MAXPROD",
        }
    }
}

impl fmt::Display for UpdateType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl fmt::Display for InferenceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for UpdateType {
    type Err = PgmError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "HUGIN" => Ok(UpdateType::Hugin),
            "SHSH" => Ok(UpdateType::ShaferShenoy),
            _ => Err(PgmError::InvalidArgument(format!(
                "unknown update type '{}'",
                s
            ))),
        }
    }
}

impl FromStr for InferenceType {
    type Err = PgmError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "SUMPROD" => Ok(InferenceType::SumProduct),
            "MAXPROD" => Ok(InferenceType::MaxProduct),
            _ => Err(PgmError::InvalidArgument(format!(
                "unknown inference type '{}'",
                s
            ))),
        }
    }
}

/// Configuration of a junction tree engine.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct JTreeProperties {
    /// Message-passing schedule
    pub updates: UpdateType,
    /// Sum-product or max-product
    pub inference: InferenceType,
    /// Elimination heuristic used to find the cliques
    pub heuristic: EliminationHeuristic,
    /// Memory cap in bytes for clique tables, 0 for unlimited
    pub max_mem: usize,
    /// Variables the root clique must contain
    pub root: Option<NodeSet>,
}

impl JTreeProperties {
    /// Default configuration with the given schedule.
    pub fn new(updates: UpdateType) -> Self {
        Self {
            updates,
            ..Self::default()
        }
    }

    /// Set the inference type.
    pub fn with_inference(mut self, inference: InferenceType) -> Self {
        self.inference = inference;
        self
    }

    /// Set the elimination heuristic.
    pub fn with_heuristic(mut self, heuristic: EliminationHeuristic) -> Self {
        self.heuristic = heuristic;
        self
    }

    /// Set the memory cap in bytes.
    pub fn with_max_mem(mut self, max_mem: usize) -> Self {
        self.max_mem = max_mem;
        self
    }

    /// Force the root clique to contain `root`.
    pub fn with_root(mut self, root: NodeSet) -> Self {
        self.root = Some(root);
        self
    }

    /// Number of `f64` table entries the memory cap allows, 0 for unlimited.
    pub fn max_entries(&self) -> usize {
        self.max_mem / std::mem::size_of::<f64>()
    }

    /// Parse the string form. Missing keys keep their defaults.
    pub fn from_property_set(opts: &PropertySet) -> Result<Self> {
        let mut props = Self::default();
        for (key, value) in opts {
            match key.as_str() {
                "updates" => props.updates = value.parse()?,
                "inference" => props.inference = value.parse()?,
                "heuristic" => props.heuristic = value.parse()?,
                "maxmem" => {
                    props.max_mem = value.trim().parse().map_err(|_| {
                        PgmError::InvalidArgument(format!("invalid maxmem '{}'", value))
                    })?
                }
                "root" => props.root = Some(parse_node_set(value)?),
                _ => warn!(key = %key, "ignoring unknown junction tree property"),
            }
        }
        Ok(props)
    }

    /// String form of the configuration.
    pub fn to_property_set(&self) -> PropertySet {
        let mut opts = PropertySet::new();
        opts.insert("updates".into(), self.updates.to_string());
        opts.insert("inference".into(), self.inference.to_string());
        opts.insert("heuristic".into(), self.heuristic.to_string());
        opts.insert("maxmem".into(), self.max_mem.to_string());
        if let Some(root) = &self.root {
            let ids: Vec<String> = root.iter().map(|v| v.0.to_string()).collect();
            opts.insert("root".into(), ids.join(","));
        }
        opts
    }
}

impl fmt::Display for JTreeProperties {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[updates={},inference={},heuristic={},maxmem={}]",
            self.updates, self.inference, self.heuristic, self.max_mem
        )
    }
}

fn parse_node_set(value: &str) -> Result<NodeSet> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<u32>()
                .map(NodeId)
                .map_err(|_| PgmError::InvalidArgument(format!("invalid node id '{}'", s)))
        })
        .collect()
}
