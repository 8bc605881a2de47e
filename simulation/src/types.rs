//! Core types for attack simulations
//!
//! Models the attack-type registry and the time series an attack run
//! produces: a [`RobustnessCurve`] per run, collected into a [`ResultStore`]
//! keyed by attack type and snapshot timestamp.

use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use fracture_core::{Measurement, ParseKindError};

use crate::error::SimError;

/// Node removal policy
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttackType {
    /// Uniformly random node
    Random,
    /// Highest-scoring node under the metric
    Targeted,
    /// Random walk over former neighbors of the previous target
    RandomPath,
    /// Walk to the highest-scoring former neighbor of the previous target
    TargetedPath,
}

impl AttackType {
    /// Every attack type, in registry order
    pub const ALL: [AttackType; 4] = [
        AttackType::Random,
        AttackType::Targeted,
        AttackType::RandomPath,
        AttackType::TargetedPath,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AttackType::Random => "random",
            AttackType::Targeted => "targeted",
            AttackType::RandomPath => "random_path",
            AttackType::TargetedPath => "targeted_path",
        }
    }

    /// Position in [`AttackType::ALL`]
    pub fn index(&self) -> usize {
        *self as usize
    }
}

impl fmt::Display for AttackType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AttackType {
    type Err = ParseKindError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        AttackType::ALL
            .into_iter()
            .find(|attack| attack.as_str() == s)
            .ok_or_else(|| ParseKindError {
                kind: "attack type",
                name: s.to_string(),
            })
    }
}

/// Format a removal fraction as a result key, e.g. `0.001`
pub fn fraction_key(fraction: f64, precision: usize) -> String {
    format!("{:.*}", precision, fraction)
}

/// Measurements of one attack run, keyed by removal fraction
///
/// Keys share one precision and fractions never exceed one, so the
/// lexicographic key order is the numeric order. Entries are write-once.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RobustnessCurve {
    points: BTreeMap<String, Measurement>,
}

impl RobustnessCurve {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a measurement at a strictly larger fraction than any recorded
    pub fn record(&mut self, key: String, measurement: Measurement) -> Result<(), SimError> {
        if self.points.contains_key(&key) {
            return Err(SimError::DuplicateKey(key));
        }
        if let Some((last, _)) = self.points.last_key_value()
            && *last > key
        {
            return Err(SimError::OutOfOrder {
                key,
                last: last.clone(),
            });
        }
        self.points.insert(key, measurement);
        Ok(())
    }

    pub fn get(&self, key: &str) -> Option<&Measurement> {
        self.points.get(key)
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Iterate in increasing fraction order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Measurement)> {
        self.points.iter().map(|(key, m)| (key.as_str(), m))
    }

    /// The most damaged state recorded so far
    pub fn last(&self) -> Option<(&str, &Measurement)> {
        self.points
            .last_key_value()
            .map(|(key, m)| (key.as_str(), m))
    }
}

/// Robustness curves of every run: `attack type -> timestamp -> curve`
///
/// Slots are allocated per snapshot before its runs start and each slot is
/// written exactly once, so parallel runs never touch the same entry.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResultStore {
    runs: BTreeMap<AttackType, BTreeMap<String, Option<RobustnessCurve>>>,
}

impl ResultStore {
    /// Create a store with one sub-mapping per attack type
    pub fn new(attack_types: impl IntoIterator<Item = AttackType>) -> Self {
        Self {
            runs: attack_types
                .into_iter()
                .map(|attack| (attack, BTreeMap::new()))
                .collect(),
        }
    }

    /// Reserve an empty slot for every attack type at `timestamp`
    pub fn allocate(&mut self, timestamp: &str) {
        for slots in self.runs.values_mut() {
            slots.entry(timestamp.to_string()).or_insert(None);
        }
    }

    /// Whether any attack type has a slot at `timestamp`
    pub fn contains(&self, timestamp: &str) -> bool {
        self.runs.values().any(|slots| slots.contains_key(timestamp))
    }

    /// Fill a previously allocated slot
    pub fn insert(
        &mut self,
        attack: AttackType,
        timestamp: &str,
        curve: RobustnessCurve,
    ) -> Result<(), SimError> {
        let slot = self
            .runs
            .get_mut(&attack)
            .and_then(|slots| slots.get_mut(timestamp))
            .ok_or_else(|| SimError::MissingSlot {
                attack,
                timestamp: timestamp.to_string(),
            })?;

        if slot.is_some() {
            return Err(SimError::SlotFilled {
                attack,
                timestamp: timestamp.to_string(),
            });
        }
        *slot = Some(curve);
        Ok(())
    }

    pub fn get(&self, attack: AttackType, timestamp: &str) -> Option<&RobustnessCurve> {
        self.runs.get(&attack)?.get(timestamp)?.as_ref()
    }

    /// Attack types this store tracks
    pub fn attack_types(&self) -> impl Iterator<Item = AttackType> + '_ {
        self.runs.keys().copied()
    }

    /// Timestamps with allocated slots for an attack type
    pub fn timestamps(&self, attack: AttackType) -> Vec<&str> {
        self.runs
            .get(&attack)
            .map(|slots| slots.keys().map(String::as_str).collect())
            .unwrap_or_default()
    }

    /// Serialize and write this store to a JSON file.
    pub fn save(&self, path: &Path) -> Result<(), SimError> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }

    /// Read a store previously written by [`save`](Self::save)
    pub fn load(path: &Path) -> Result<Self, SimError> {
        let json = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&json)?)
    }
}
