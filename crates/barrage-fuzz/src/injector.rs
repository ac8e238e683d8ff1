//! Anomaly injection.
//!
//! Produces derivative submissions from a template: one derivative per
//! mapping key (the key itself replaced by the anomaly) and one per
//! scalar leaf (the leaf replaced). Derivatives are shallow copies —
//! every subtree the walk did not descend into is shared with the
//! template via `Rc`.

use std::rc::Rc;

use barrage_core::{Node, Value};
use indexmap::IndexMap;

use crate::mutator::FuzzSets;

/// The anomaly selection for one injection round: key-specific entries
/// plus a wildcard used wherever no key-specific anomaly exists.
#[derive(Debug, Clone)]
pub struct AnomalyMap {
    pub by_key: IndexMap<Vec<u8>, Node>,
    pub wildcard: Node,
}

impl AnomalyMap {
    /// Static mode: a single catalogue entry injected everywhere.
    pub fn from_catalogue_entry(entry: &Value) -> AnomalyMap {
        AnomalyMap {
            by_key: IndexMap::new(),
            wildcard: Rc::new(entry.clone()),
        }
    }

    /// Fuzz mode: the i-th output of each per-key fuzz stream.
    ///
    /// Callers guarantee `round < cases` used to build the sets.
    pub fn from_fuzz_round(sets: &FuzzSets, round: usize) -> AnomalyMap {
        let by_key = sets
            .by_key
            .iter()
            .map(|(key, cases)| {
                (key.clone(), Rc::new(Value::Bytes(cases[round].clone())))
            })
            .collect();
        AnomalyMap {
            by_key,
            wildcard: Rc::new(Value::Bytes(sets.wildcard[round].clone())),
        }
    }

    /// The anomaly for a position under `key`; key-specific when one
    /// exists, the wildcard otherwise.
    pub fn anomaly_for(&self, key: Option<&[u8]>) -> &Node {
        key.and_then(|k| self.by_key.get(k)).unwrap_or(&self.wildcard)
    }

    /// The byte form of the wildcard anomaly used when renaming mapping
    /// keys. An anomaly whose bytes are not representable as text is
    /// substituted with the literal bytes `0xFF 0xFF`.
    pub fn rename_key_bytes(&self) -> Vec<u8> {
        match &*self.wildcard {
            Value::Bytes(b) if std::str::from_utf8(b).is_err() => vec![0xff, 0xff],
            other => other.stringify(),
        }
    }
}

/// Emit every single-position derivative of `template` for one anomaly
/// map: `mapping key count + leaf count` submissions, in deterministic
/// walk order. The template is never mutated.
pub fn derive(template: &Node, anomalies: &AnomalyMap) -> Vec<Node> {
    walk(template, anomalies, None)
}

fn walk(node: &Node, anomalies: &AnomalyMap, key: Option<&[u8]>) -> Vec<Node> {
    match &**node {
        Value::Map(entries) => {
            let mut derivatives = Vec::new();

            // One derivative per key: the key renamed, value unchanged.
            // A rename that collides with an existing key overwrites
            // that entry, shrinking the mapping.
            let new_key = anomalies.rename_key_bytes();
            for target in entries.keys() {
                let mut copy = entries.clone();
                if let Some(value) = copy.shift_remove(target) {
                    copy.insert(new_key.clone(), value);
                }
                derivatives.push(Rc::new(Value::Map(copy)));
            }

            // One family per entry: the value replaced by each of its
            // own derivatives, siblings shared.
            for (k, v) in entries {
                for sub in walk(v, anomalies, Some(k)) {
                    let mut copy = entries.clone();
                    copy.insert(k.clone(), sub);
                    derivatives.push(Rc::new(Value::Map(copy)));
                }
            }
            derivatives
        }
        Value::Seq(items) => {
            let mut derivatives = Vec::new();
            for (index, item) in items.iter().enumerate() {
                for sub in walk(item, anomalies, key) {
                    let mut copy = items.clone();
                    copy[index] = sub;
                    derivatives.push(Rc::new(Value::Seq(copy)));
                }
            }
            derivatives
        }
        _ => vec![Node::clone(anomalies.anomaly_for(key))],
    }
}
