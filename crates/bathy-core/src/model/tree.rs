use ndarray::{Array2, ArrayView1};
use rand::Rng;

use super::forest::OutputMode;

/// Minimum impurity decrease for a split to be kept.
const MIN_GAIN: f64 = 1e-12;

#[derive(Clone, Debug)]
enum Node {
    Leaf {
        value: f64,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
}

#[derive(Clone, Debug)]
pub(crate) struct TreeParams {
    pub mode: OutputMode,
    pub n_classes: usize,
    pub variables_per_split: usize,
    pub min_leaf_population: usize,
    pub max_nodes: Option<usize>,
}

/// CART tree. In classification mode targets are class indices (0..n_classes)
/// and leaves hold the majority class index.
#[derive(Clone, Debug)]
pub(crate) struct DecisionTree {
    nodes: Vec<Node>,
}

struct Split {
    feature: usize,
    threshold: f64,
    impurity: f64,
}

impl DecisionTree {
    /// Grow a tree on the rows of `x` listed in `sample` (duplicates allowed).
    pub fn fit<R: Rng>(
        x: &Array2<f64>,
        y: &[f64],
        sample: Vec<usize>,
        params: &TreeParams,
        rng: &mut R,
    ) -> Self {
        let mut tree = Self {
            nodes: vec![Node::Leaf {
                value: leaf_value(y, &sample, params),
            }],
        };

        let mut pending = vec![(0usize, sample)];
        while let Some((node_id, idx)) = pending.pop() {
            if let Some(max) = params.max_nodes {
                if tree.nodes.len() + 2 > max {
                    continue;
                }
            }
            let Some(split) = best_split(x, y, &idx, params, rng) else {
                continue;
            };

            let (left, right): (Vec<usize>, Vec<usize>) = idx
                .iter()
                .partition(|&&i| x[[i, split.feature]] <= split.threshold);
            // Midpoints of adjacent floats can round onto one side.
            if left.is_empty() || right.is_empty() {
                continue;
            }

            let left_id = tree.nodes.len();
            tree.nodes.push(Node::Leaf {
                value: leaf_value(y, &left, params),
            });
            let right_id = tree.nodes.len();
            tree.nodes.push(Node::Leaf {
                value: leaf_value(y, &right, params),
            });
            tree.nodes[node_id] = Node::Split {
                feature: split.feature,
                threshold: split.threshold,
                left: left_id,
                right: right_id,
            };
            pending.push((left_id, left));
            pending.push((right_id, right));
        }

        tree
    }

    pub fn predict(&self, row: ArrayView1<'_, f64>) -> f64 {
        let mut node = 0;
        loop {
            match self.nodes[node] {
                Node::Leaf { value } => return value,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    node = if row[feature] <= threshold { left } else { right };
                }
            }
        }
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }
}

fn leaf_value(y: &[f64], idx: &[usize], params: &TreeParams) -> f64 {
    if idx.is_empty() {
        return 0.0;
    }
    match params.mode {
        OutputMode::Regression => idx.iter().map(|&i| y[i]).sum::<f64>() / idx.len() as f64,
        OutputMode::Classification => {
            let counts = class_counts(y, idx, params.n_classes);
            majority(&counts) as f64
        }
    }
}

fn class_counts(y: &[f64], idx: &[usize], n_classes: usize) -> Vec<usize> {
    let mut counts = vec![0usize; n_classes];
    for &i in idx {
        counts[y[i] as usize] += 1;
    }
    counts
}

/// Index of the largest count; the lowest index wins ties.
pub(crate) fn majority(counts: &[usize]) -> usize {
    let mut best = 0;
    for (i, &c) in counts.iter().enumerate() {
        if c > counts[best] {
            best = i;
        }
    }
    best
}

fn gini_weighted(counts: &[usize], n: usize) -> f64 {
    if n == 0 {
        return 0.0;
    }
    let nf = n as f64;
    let sum_sq: f64 = counts.iter().map(|&c| (c as f64 / nf).powi(2)).sum();
    nf * (1.0 - sum_sq)
}

fn sse(sum: f64, sum_sq: f64, n: usize) -> f64 {
    if n == 0 {
        return 0.0;
    }
    (sum_sq - sum * sum / n as f64).max(0.0)
}

fn node_impurity(y: &[f64], idx: &[usize], params: &TreeParams) -> f64 {
    match params.mode {
        OutputMode::Regression => {
            let sum: f64 = idx.iter().map(|&i| y[i]).sum();
            let sum_sq: f64 = idx.iter().map(|&i| y[i] * y[i]).sum();
            sse(sum, sum_sq, idx.len())
        }
        OutputMode::Classification => {
            gini_weighted(&class_counts(y, idx, params.n_classes), idx.len())
        }
    }
}

fn best_split<R: Rng>(
    x: &Array2<f64>,
    y: &[f64],
    idx: &[usize],
    params: &TreeParams,
    rng: &mut R,
) -> Option<Split> {
    let min_leaf = params.min_leaf_population.max(1);
    if idx.len() < 2 * min_leaf {
        return None;
    }
    let parent = node_impurity(y, idx, params);
    if parent <= MIN_GAIN {
        return None;
    }

    let n_features = x.ncols();
    let k = params.variables_per_split.clamp(1, n_features);
    let candidates = rand::seq::index::sample(rng, n_features, k).into_vec();

    let mut best: Option<Split> = None;
    let mut order = idx.to_vec();
    for feature in candidates {
        order.sort_by(|&a, &b| x[[a, feature]].total_cmp(&x[[b, feature]]));
        let Some(split) = sweep_feature(x, y, &order, feature, min_leaf, params) else {
            continue;
        };
        if split.impurity < parent - MIN_GAIN
            && best.as_ref().map_or(true, |b| split.impurity < b.impurity)
        {
            best = Some(split);
        }
    }
    best
}

/// Scan the rows sorted by `feature` for the lowest-impurity threshold.
fn sweep_feature(
    x: &Array2<f64>,
    y: &[f64],
    order: &[usize],
    feature: usize,
    min_leaf: usize,
    params: &TreeParams,
) -> Option<Split> {
    let n = order.len();
    let mut best: Option<Split> = None;

    match params.mode {
        OutputMode::Regression => {
            let total: f64 = order.iter().map(|&i| y[i]).sum();
            let total_sq: f64 = order.iter().map(|&i| y[i] * y[i]).sum();
            let (mut left_sum, mut left_sq) = (0.0, 0.0);
            for pos in 0..n - 1 {
                let yi = y[order[pos]];
                left_sum += yi;
                left_sq += yi * yi;
                let n_left = pos + 1;
                let n_right = n - n_left;
                if n_left < min_leaf || n_right < min_leaf {
                    continue;
                }
                let here = x[[order[pos], feature]];
                let next = x[[order[pos + 1], feature]];
                if here == next {
                    continue;
                }
                let impurity = sse(left_sum, left_sq, n_left)
                    + sse(total - left_sum, total_sq - left_sq, n_right);
                if best.as_ref().map_or(true, |b| impurity < b.impurity) {
                    best = Some(Split {
                        feature,
                        threshold: 0.5 * (here + next),
                        impurity,
                    });
                }
            }
        }
        OutputMode::Classification => {
            let mut right = class_counts(y, order, params.n_classes);
            let mut left = vec![0usize; params.n_classes];
            for pos in 0..n - 1 {
                let class = y[order[pos]] as usize;
                left[class] += 1;
                right[class] -= 1;
                let n_left = pos + 1;
                let n_right = n - n_left;
                if n_left < min_leaf || n_right < min_leaf {
                    continue;
                }
                let here = x[[order[pos], feature]];
                let next = x[[order[pos + 1], feature]];
                if here == next {
                    continue;
                }
                let impurity = gini_weighted(&left, n_left) + gini_weighted(&right, n_right);
                if best.as_ref().map_or(true, |b| impurity < b.impurity) {
                    best = Some(Split {
                        feature,
                        threshold: 0.5 * (here + next),
                        impurity,
                    });
                }
            }
        }
    }
    best
}
