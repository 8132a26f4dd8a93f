use core::cmp;

/// Prefix sums over row heights with `O(log n)` point updates and offset lookups.
#[derive(Clone, Debug, Default)]
pub(crate) struct Fenwick {
    tree: Vec<f64>, // 1-indexed
    total: f64,
    max_bit: usize,
}

impl Fenwick {
    pub(crate) fn from_heights(heights: &[f32]) -> Self {
        let n = heights.len();
        let mut tree = vec![0f64; n + 1];
        let mut total = 0f64;
        for i in 1..=n {
            let v = heights[i - 1] as f64;
            total += v;
            tree[i] += v;
            let j = i + lsb(i);
            if j <= n {
                tree[j] += tree[i];
            }
        }
        Self {
            tree,
            total,
            max_bit: highest_power_of_two_leq(n),
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.tree.len().saturating_sub(1)
    }

    pub(crate) fn truncate(&mut self, new_len: usize) {
        if new_len >= self.len() {
            return;
        }
        self.total = self.prefix_sum(new_len);
        self.tree.truncate(new_len + 1);
        self.max_bit = highest_power_of_two_leq(new_len);
    }

    /// Appends a value in `O(log n)`.
    pub(crate) fn push(&mut self, value: f64) {
        let new_len = self.len() + 1;
        self.tree.push(0.0);
        self.total += value;

        // tree[i] holds the sum of the last lsb(i) values ending at i.
        let start_exclusive = new_len - lsb(new_len);
        let before = self.prefix_sum(new_len - 1) - self.prefix_sum(start_exclusive);
        self.tree[new_len] = before + value;

        self.max_bit = highest_power_of_two_leq(new_len);
    }

    pub(crate) fn add(&mut self, index: usize, delta: f64) {
        let n = self.len();
        if index >= n || delta == 0.0 {
            return;
        }
        self.total += delta;
        let mut i = index + 1;
        while i <= n {
            self.tree[i] += delta;
            i += lsb(i);
        }
    }

    /// Sum of the first `count` values.
    pub(crate) fn prefix_sum(&self, count: usize) -> f64 {
        let mut i = cmp::min(count, self.len());
        let mut sum = 0f64;
        while i > 0 {
            sum += self.tree[i];
            i &= i - 1;
        }
        sum
    }

    pub(crate) fn total(&self) -> f64 {
        self.total
    }

    /// Returns the number of values whose prefix sum is <= `target`.
    ///
    /// With row heights as values this is the index of the row containing `target`.
    pub(crate) fn lower_bound(&self, mut target: f64) -> usize {
        let n = self.len();
        let mut idx = 0usize;
        let mut bit = self.max_bit;
        while bit != 0 {
            let next = idx + bit;
            if next <= n && self.tree[next] <= target {
                target -= self.tree[next];
                idx = next;
            }
            bit >>= 1;
        }
        idx
    }
}

fn lsb(i: usize) -> usize {
    i & i.wrapping_neg()
}

fn highest_power_of_two_leq(n: usize) -> usize {
    if n == 0 {
        return 0;
    }
    let mut p = 1usize;
    while p <= n / 2 {
        p <<= 1;
    }
    p
}
