//! Leaf collection.
//!
//! Walks template submissions and groups their scalar leaves by the
//! nearest enclosing mapping key. Every leaf additionally lands in the
//! catch-all bucket, which doubles as the fallback sample set for keys
//! that carry no direct leaves of their own (say, a key whose value is
//! a nested mapping).

use barrage_core::{Node, Value};
use indexmap::IndexMap;

/// Valid leaf values grouped by key.
#[derive(Debug, Default)]
pub struct ValueBuckets {
    /// Leaves under each key, in walk order. A key whose value holds no
    /// direct leaves still gets an (empty) bucket, so the mutator knows
    /// the key exists and falls back to `all` for it.
    pub by_key: IndexMap<Vec<u8>, Vec<Node>>,
    /// Union of every leaf in every submission.
    pub all: Vec<Node>,
}

impl ValueBuckets {
    pub fn new() -> ValueBuckets {
        ValueBuckets::default()
    }

    /// Fold one submission into the buckets.
    pub fn collect(&mut self, submission: &Node) {
        self.walk(submission, None);
    }

    /// Samples for a key, falling back to the catch-all bucket when the
    /// key has none of its own.
    pub fn samples_for(&self, key: &[u8]) -> &[Node] {
        match self.by_key.get(key) {
            Some(bucket) if !bucket.is_empty() => bucket,
            _ => &self.all,
        }
    }

    fn walk(&mut self, node: &Node, key: Option<&[u8]>) {
        if let Some(key) = key {
            self.by_key.entry(key.to_vec()).or_default();
        }
        match &**node {
            Value::Map(entries) => {
                for (k, v) in entries {
                    self.walk(v, Some(k));
                }
            }
            Value::Seq(items) => {
                for item in items {
                    self.walk(item, key);
                }
            }
            _ => {
                if let Some(key) = key {
                    self.by_key
                        .entry(key.to_vec())
                        .or_default()
                        .push(Node::clone(node));
                }
                self.all.push(Node::clone(node));
            }
        }
    }
}

/// Collect the leaves of several valid submissions into one bucket set.
pub fn collect_values(submissions: &[Node]) -> ValueBuckets {
    let mut buckets = ValueBuckets::new();
    for submission in submissions {
        buckets.collect(submission);
    }
    buckets
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::rc::Rc;

    #[test]
    fn leaves_group_under_nearest_key() {
        let submission = Rc::new(Value::map([
            ("a", Value::text("x")),
            ("b", Value::seq([Value::text("y"), Value::text("z")])),
        ]));
        let buckets = collect_values(&[submission]);

        assert_eq!(buckets.by_key[b"a".as_slice()].len(), 1);
        // Sequence elements keep the enclosing key.
        assert_eq!(buckets.by_key[b"b".as_slice()].len(), 2);
        assert_eq!(buckets.all.len(), 3);
    }

    #[test]
    fn nested_mapping_key_gets_empty_bucket_and_falls_back() {
        let submission = Rc::new(Value::map([(
            "outer",
            Value::map([("inner", Value::Int(1))]),
        )]));
        let buckets = collect_values(&[submission]);

        assert!(buckets.by_key[b"outer".as_slice()].is_empty());
        assert_eq!(buckets.by_key[b"inner".as_slice()].len(), 1);
        // Fallback: the outer key borrows the union bucket.
        assert_eq!(buckets.samples_for(b"outer").len(), 1);
        assert_eq!(buckets.samples_for(b"nonexistent").len(), 1);
    }

    #[test]
    fn multiple_submissions_accumulate() {
        let first = Rc::new(Value::map([("n", Value::Int(1))]));
        let second = Rc::new(Value::map([("n", Value::Int(2))]));
        let buckets = collect_values(&[first, second]);
        assert_eq!(buckets.by_key[b"n".as_slice()].len(), 2);
        assert_eq!(buckets.all.len(), 2);
    }
}
