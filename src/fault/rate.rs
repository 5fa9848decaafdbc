//! Fault rate bookkeeping and the weak-cell inherent-error model (spec §4.E).

use std::collections::HashMap;

/// Named multi-bit error patterns the inherent model can be queried for,
/// mirroring the original `InherentErrorPattern` enum's small-k entries plus
/// its chipkill-oriented multi-device patterns.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum InherentPattern {
    K(usize),
    DoubleSingle9,
    DoubleDouble18,
    SingleSingle18,
}

impl InherentPattern {
    /// Equivalent flat bit-error count used to evaluate the binomial model.
    /// The named multi-device patterns are approximated by their total
    /// simultaneous bit count across the chips involved (see DESIGN.md).
    fn k(&self) -> usize {
        match self {
            InherentPattern::K(k) => *k,
            InherentPattern::DoubleSingle9 => 3,
            InherentPattern::DoubleDouble18 => 4,
            InherentPattern::SingleSingle18 => 2,
        }
    }
}

fn choose(n: usize, k: usize) -> f64 {
    if k > n {
        return 0.0;
    }
    let k = k.min(n - k);
    let mut result = 1.0f64;
    for i in 0..k {
        result *= (n - i) as f64 / (i + 1) as f64;
    }
    result
}

/// `binomial_like(n, p, k)`: probability of exactly `k` independent
/// activations among `n` trials with per-trial probability `p`.
pub fn binomial_like(n: usize, p: f64, k: usize) -> f64 {
    if !(0.0..=1.0).contains(&p) || k > n {
        return 0.0;
    }
    choose(n, k) * p.powi(k as i32) * (1.0 - p).powi((n - k) as i32)
}

/// Weak-cell scaling model (spec §4.E): a DRAM part accumulates permanent
/// and frequently-flipping weak cells as it scales/retains; this tracks the
/// resulting per-codeword k-bit-error probability.
#[derive(Clone, Copy, Debug)]
pub struct InherentRate {
    pub permanent_weak_ratio: f64,
    pub permanent_weak_activation: f64,
    pub frequent_weak_ratio: f64,
    pub frequent_weak_activation: f64,
}

impl InherentRate {
    pub fn new(
        permanent_weak_ratio: f64,
        permanent_weak_activation: f64,
        frequent_weak_ratio: f64,
        frequent_weak_activation: f64,
    ) -> Self {
        InherentRate {
            permanent_weak_ratio,
            permanent_weak_activation,
            frequent_weak_ratio,
            frequent_weak_activation,
        }
    }

    /// Per-cell probability that a given cell is both weak and currently
    /// expressing its weakness as a bit flip.
    pub fn per_cell_probability(&self) -> f64 {
        self.permanent_weak_ratio * self.permanent_weak_activation
            + self.frequent_weak_ratio * self.frequent_weak_activation
    }

    /// Probability of exactly `pattern`'s bit count erroring within a
    /// `num_cells`-bit codeword.
    pub fn prob_pattern(&self, num_cells: usize, pattern: InherentPattern) -> f64 {
        binomial_like(num_cells, self.per_cell_probability(), pattern.k())
    }

    /// Scales a per-codeword probability to a FIT-like per-access rate,
    /// assuming `accesses_per_hour` memory accesses per hour.
    pub fn fit_rate(&self, num_cells: usize, pattern: InherentPattern, accesses_per_hour: f64) -> f64 {
        self.prob_pattern(num_cells, pattern) * accesses_per_hour * 1.0e9
    }
}

impl Default for InherentRate {
    fn default() -> Self {
        InherentRate::new(0.0, 0.0, 0.0, 0.0)
    }
}

/// Ordered `(fault-kind-name, FIT-rate)` list with weighted random draw
/// (spec §4.E). Kind names are free-form strings so the file-driven Module D
/// profile (`input_FIT.conf`) and the three hard-coded profiles can share one
/// representation.
#[derive(Clone, Debug, Default)]
pub struct FaultRateInfo {
    entries: Vec<(String, f64)>,
    total_rate: f64,
    pub inherent: InherentRate,
}

/// Representative cache-line footprint counts per fault kind, used by
/// `overlap_prob` (spec §4.E: "128 for SROW, 128·128·1024 for SBANK").
/// These are fixed illustrative figures rather than geometry-derived ones,
/// keeping this module independent of a concrete `DramGeometry`.
fn footprint(name: &str) -> f64 {
    match name {
        "SBIT" | "SWORD" => 1.0,
        "SCOL" => 128.0,
        "SROW" => 128.0,
        "SBANK" => 128.0 * 128.0 * 1024.0,
        "MBANK" => 128.0 * 128.0 * 1024.0 * 8.0,
        "MRANK" => 128.0 * 128.0 * 1024.0 * 8.0 * 2.0,
        "Channel" => f64::INFINITY,
        _ => 128.0,
    }
}

impl FaultRateInfo {
    pub fn new(inherent: InherentRate) -> Self {
        FaultRateInfo {
            entries: Vec::new(),
            total_rate: 0.0,
            inherent,
        }
    }

    pub fn add_rate(&mut self, name: &str, rate: f64) {
        self.entries.push((name.to_string(), rate));
        self.total_rate += rate;
    }

    pub fn remove_last(&mut self) {
        if let Some((_, rate)) = self.entries.pop() {
            self.total_rate -= rate;
        }
    }

    pub fn total_rate(&self) -> f64 {
        self.total_rate
    }

    pub fn entries(&self) -> &[(String, f64)] {
        &self.entries
    }

    /// Weighted random selection: given `r` drawn uniformly from `[0, 1)`,
    /// walks the list accumulating rate and returns the first kind whose
    /// cumulative share exceeds `r`. Returns `None` for an empty or
    /// zero-total table (caller should treat this as "inherent only").
    pub fn weighted_draw(&self, r: f64) -> Option<&str> {
        if self.total_rate <= 0.0 || self.entries.is_empty() {
            return None;
        }
        let target = r * self.total_rate;
        let mut cumulative = 0.0;
        for (name, rate) in &self.entries {
            cumulative += rate;
            if cumulative > target {
                return Some(name.as_str());
            }
        }
        self.entries.last().map(|(name, _)| name.as_str())
    }

    /// `1 - (1 - p_word)^A`: probability the inherent model's baseline
    /// per-cell error rate hits at least one of the `A` cache-line positions
    /// `name`'s fault kind can occupy.
    pub fn overlap_prob(&self, name: &str) -> f64 {
        let p_word = self.inherent.per_cell_probability();
        let a = footprint(name);
        if a.is_infinite() {
            return 1.0;
        }
        1.0 - (1.0 - p_word).powf(a)
    }
}

pub struct ModuleProfiles;

impl ModuleProfiles {
    /// Module A/B/C: three hard-coded default fault-rate tables (spec §4.E).
    /// Figures are representative FIT rates per fault kind for a
    /// conventional, a mobile, and a high-bandwidth DRAM profile.
    pub fn module(letter: char) -> Vec<(&'static str, f64)> {
        match letter {
            'A' => vec![
                ("SBIT", 500.0),
                ("SWORD", 50.0),
                ("SCOL", 20.0),
                ("SROW", 15.0),
                ("SBANK", 8.0),
                ("MBANK", 3.0),
                ("MRANK", 1.0),
                ("Channel", 0.2),
            ],
            'B' => vec![
                ("SBIT", 800.0),
                ("SWORD", 90.0),
                ("SCOL", 35.0),
                ("SROW", 22.0),
                ("SBANK", 12.0),
                ("MBANK", 4.0),
                ("MRANK", 1.5),
                ("Channel", 0.3),
            ],
            'C' => vec![
                ("SBIT", 300.0),
                ("SWORD", 30.0),
                ("SCOL", 12.0),
                ("SROW", 9.0),
                ("SBANK", 5.0),
                ("MBANK", 2.0),
                ("MRANK", 0.7),
                ("Channel", 0.1),
            ],
            _ => Vec::new(),
        }
    }

    pub fn geometry_multiplier(num_banks: usize, cdec_per_chip: usize, csl_per_chip: usize, bits_per_chip: usize) -> HashMap<&'static str, f64> {
        let mut m = HashMap::new();
        m.insert("SBIT", bits_per_chip as f64 / (1u64 << 30) as f64);
        m.insert("SCOL", csl_per_chip as f64 / 256.0);
        m.insert("SROW", cdec_per_chip as f64 / 4.0);
        m.insert("SBANK", num_banks as f64 / 16.0);
        m.insert("MBANK", num_banks as f64 / 16.0);
        m
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn weighted_draw_picks_proportionally_to_rate() {
        let mut fri = FaultRateInfo::new(InherentRate::default());
        fri.add_rate("SBIT", 1.0);
        fri.add_rate("SROW", 9.0);
        assert_eq!(fri.weighted_draw(0.05), Some("SBIT"));
        assert_eq!(fri.weighted_draw(0.5), Some("SROW"));
    }

    #[test]
    fn empty_table_draws_nothing() {
        let fri = FaultRateInfo::new(InherentRate::default());
        assert_eq!(fri.weighted_draw(0.3), None);
    }

    #[test]
    fn binomial_like_sums_to_one_over_k() {
        let p = 0.1;
        let n = 5;
        let total: f64 = (0..=n).map(|k| binomial_like(n, p, k)).sum();
        assert!((total - 1.0).abs() < 1e-9);
    }

    #[test]
    fn overlap_prob_increases_with_footprint() {
        let fri = FaultRateInfo::new(InherentRate::new(1e-9, 0.5, 0.0, 0.0));
        assert!(fri.overlap_prob("SBANK") >= fri.overlap_prob("SBIT"));
    }
}
