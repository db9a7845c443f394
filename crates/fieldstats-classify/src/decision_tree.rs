//! Binary decision tree trained by Gini impurity
//!
//! Each internal node asks `value[channel] >= threshold`. Training tries
//! every channel and every distinct value in the node's partition as a
//! threshold and keeps the split with the highest information gain. A
//! node becomes a leaf when no split has positive gain; there is no depth
//! or leaf-size limit, so noisy data can grow deep trees.

use fieldstats_project::{ClassId, TrainingSamples};
use tracing::debug;

use crate::check_training_set;
use crate::error::ClassifyResult;

/// Best split of a partition
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Split {
    /// Channel tested
    pub channel: usize,
    /// Samples with `value >= threshold` go to the true branch
    pub threshold: f64,
    /// Information gain of the split
    pub gain: f64,
}

/// Node of a [`DecisionTree`]
#[derive(Debug, Clone, PartialEq)]
pub enum TreeNode {
    /// Terminal node
    Leaf {
        /// Predicted class
        label: ClassId,
    },
    /// Internal node
    Split {
        /// Channel tested
        channel: usize,
        /// Threshold tested with `>=`
        threshold: f64,
        /// Index of the node for `value >= threshold`
        when_true: usize,
        /// Index of the node for `value < threshold`
        when_false: usize,
    },
}

/// Trained binary decision tree
///
/// Nodes live in one vector and refer to their children by index; the root
/// is node 0.
#[derive(Debug, Clone, PartialEq)]
pub struct DecisionTree {
    nodes: Vec<TreeNode>,
    channel_count: usize,
}

/// Gini impurity of the labels of `rows`.
///
/// `1 - sum(p_k^2)` over the label proportions; zero for a pure set.
pub fn gini(labels: &[ClassId], rows: &[usize]) -> f64 {
    if rows.is_empty() {
        return 0.0;
    }
    let n = rows.len() as f64;
    label_counts(labels, rows)
        .iter()
        .fold(1.0, |impurity, &(_, count)| {
            let p = count as f64 / n;
            impurity - p * p
        })
}

/// Information gain of splitting a set with impurity `parent` into
/// `when_true` and `when_false`.
pub fn info_gain(labels: &[ClassId], when_true: &[usize], when_false: &[usize], parent: f64) -> f64 {
    let p = when_true.len() as f64 / (when_true.len() + when_false.len()) as f64;
    parent - p * gini(labels, when_true) - (1.0 - p) * gini(labels, when_false)
}

/// Label counts in order of first appearance.
fn label_counts(labels: &[ClassId], rows: &[usize]) -> Vec<(ClassId, usize)> {
    let mut counts: Vec<(ClassId, usize)> = Vec::new();
    for &r in rows {
        match counts.iter_mut().find(|(l, _)| *l == labels[r]) {
            Some((_, c)) => *c += 1,
            None => counts.push((labels[r], 1)),
        }
    }
    counts
}

/// Most frequent label; the first seen wins a tie.
fn majority_label(labels: &[ClassId], rows: &[usize]) -> ClassId {
    let mut best = (labels[rows[0]], 0);
    for (label, count) in label_counts(labels, rows) {
        if count > best.1 {
            best = (label, count);
        }
    }
    best.0
}

fn partition(samples: &[Vec<f64>], rows: &[usize], channel: usize, threshold: f64) -> (Vec<usize>, Vec<usize>) {
    rows.iter().copied().partition(|&r| samples[r][channel] >= threshold)
}

/// Best split of `rows`
///
/// Channels are scanned in order and candidate thresholds in ascending
/// order. A candidate replaces the current best when its gain is greater
/// than *or equal to* the best so far, so among equal gains the last one
/// scanned is kept. Candidates that leave one side empty are skipped.
///
/// # Returns
///
/// `None` when no candidate has positive gain.
pub fn find_best_split(
    samples: &[Vec<f64>],
    labels: &[ClassId],
    rows: &[usize],
    channel_count: usize,
) -> Option<Split> {
    let parent = gini(labels, rows);
    let mut best: Option<Split> = None;
    let mut best_gain = 0.0;

    for channel in 0..channel_count {
        let mut values: Vec<f64> = rows.iter().map(|&r| samples[r][channel]).collect();
        values.sort_by(f64::total_cmp);
        values.dedup();

        for threshold in values {
            let (when_true, when_false) = partition(samples, rows, channel, threshold);
            if when_true.is_empty() || when_false.is_empty() {
                continue;
            }
            let gain = info_gain(labels, &when_true, &when_false, parent);
            if gain >= best_gain {
                best_gain = gain;
                best = Some(Split {
                    channel,
                    threshold,
                    gain,
                });
            }
        }
    }
    best.filter(|s| s.gain > 0.0)
}

impl DecisionTree {
    /// Train a tree on labelled samples
    ///
    /// # Arguments
    ///
    /// * `samples` - One channel vector per sample, all the same length
    /// * `labels` - Class of each sample
    ///
    /// # Errors
    ///
    /// Returns an error for an empty training set, mismatched sample and
    /// label counts, or ragged sample vectors.
    pub fn train(samples: &[Vec<f64>], labels: &[ClassId]) -> ClassifyResult<Self> {
        let channel_count = check_training_set(samples, labels.len())?;
        let mut nodes = Vec::new();
        // Pending nodes: (slot, rows)
        let mut pending = vec![(0usize, (0..samples.len()).collect::<Vec<_>>())];
        nodes.push(TreeNode::Leaf { label: labels[0] });

        while let Some((slot, rows)) = pending.pop() {
            match find_best_split(samples, labels, &rows, channel_count) {
                None => {
                    nodes[slot] = TreeNode::Leaf {
                        label: majority_label(labels, &rows),
                    };
                }
                Some(split) => {
                    let (when_true, when_false) = partition(samples, &rows, split.channel, split.threshold);
                    let true_slot = nodes.len();
                    let false_slot = true_slot + 1;
                    nodes.push(TreeNode::Leaf { label: labels[when_true[0]] });
                    nodes.push(TreeNode::Leaf { label: labels[when_false[0]] });
                    nodes[slot] = TreeNode::Split {
                        channel: split.channel,
                        threshold: split.threshold,
                        when_true: true_slot,
                        when_false: false_slot,
                    };
                    pending.push((false_slot, when_false));
                    pending.push((true_slot, when_true));
                }
            }
        }

        let tree = Self {
            nodes,
            channel_count,
        };
        debug!(
            samples = samples.len(),
            nodes = tree.node_count(),
            leaves = tree.leaf_count(),
            "decision tree trained"
        );
        Ok(tree)
    }

    /// Train on samples collected from a project.
    pub fn train_from(samples: &TrainingSamples) -> ClassifyResult<Self> {
        Self::train(&samples.samples, &samples.labels)
    }

    /// Class predicted for a channel vector.
    ///
    /// # Panics
    ///
    /// Panics if `values` is shorter than the channel count the tree was
    /// trained with.
    pub fn predict(&self, values: &[f64]) -> ClassId {
        let mut index = 0;
        loop {
            match &self.nodes[index] {
                TreeNode::Leaf { label } => return *label,
                TreeNode::Split {
                    channel,
                    threshold,
                    when_true,
                    when_false,
                } => {
                    index = if values[*channel] >= *threshold {
                        *when_true
                    } else {
                        *when_false
                    };
                }
            }
        }
    }

    /// Root node.
    pub fn root(&self) -> &TreeNode {
        &self.nodes[0]
    }

    /// All nodes; children are referenced by index into this slice.
    pub fn nodes(&self) -> &[TreeNode] {
        &self.nodes
    }

    /// Number of nodes.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Number of leaves.
    pub fn leaf_count(&self) -> usize {
        self.nodes
            .iter()
            .filter(|n| matches!(n, TreeNode::Leaf { .. }))
            .count()
    }

    /// Number of channels the tree was trained on.
    pub fn channel_count(&self) -> usize {
        self.channel_count
    }
}
