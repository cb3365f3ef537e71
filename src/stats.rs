//! Ruleset bookkeeping: coverage statistics and description lengths.
//!
//! For every rule of a ruleset this tracks a 6-tuple of weights computed
//! against the residual data chain (covered, uncovered, true positive,
//! true negative, false positive, false negative) plus the covered class
//! distribution. On top of those the MDL machinery is built: theory and
//! data description lengths, the relative DL of a single rule, and the
//! DL-guided deletion pass that shrinks a finished ruleset.

use rand::seq::SliceRandom;
use rand::Rng;
use tracing::debug;

use crate::dataset::{Dataset, Instance};
use crate::rule::Rule;
use crate::util::{self, log2};

/// Half the theory bits are charged, assuming half the antecedents of a
/// grown rule are redundant.
const REDUNDANCY_FACTOR: f64 = 0.5;
/// Relative weight of theory bits against data bits.
const MDL_THEORY_WEIGHT: f64 = 1.0;

/// Per-ruleset statistics over one training subset.
#[derive(Debug, Clone)]
pub struct RuleStats {
    data: Dataset,
    ruleset: Vec<Rule>,
    /// Per rule: covered, uncovered, tp, tn, fp, fn weights against the
    /// residual chain.
    simple_stats: Vec<[f64; 6]>,
    /// Per rule: the (covered, uncovered) split of its residual input.
    filtered: Vec<(Dataset, Dataset)>,
    /// Per rule: class-weight distribution of the covered bag.
    distributions: Vec<Vec<f64>>,
    num_all_conds: f64,
}

impl RuleStats {
    /// Fresh statistics over `data` with no rules yet.
    pub fn new(data: Dataset) -> Self {
        Self {
            data,
            ruleset: Vec::new(),
            simple_stats: Vec::new(),
            filtered: Vec::new(),
            distributions: Vec::new(),
            num_all_conds: 0.0,
        }
    }

    /// Statistics over `data` for an existing (uncounted) ruleset.
    pub fn with_ruleset(data: Dataset, ruleset: Vec<Rule>) -> Self {
        Self {
            ruleset,
            ..Self::new(data)
        }
    }

    /// Set the attribute-condition total used by the theory length.
    pub fn set_num_all_conds(&mut self, total: f64) {
        self.num_all_conds = total;
    }

    /// The rules in induction order.
    pub fn ruleset(&self) -> &[Rule] {
        &self.ruleset
    }

    /// Number of rules currently tracked.
    pub fn ruleset_size(&self) -> usize {
        self.ruleset.len()
    }

    /// The 6-tuple of rule `index`.
    pub fn simple_stats(&self, index: usize) -> [f64; 6] {
        self.simple_stats[index]
    }

    /// All 6-tuples in rule order.
    pub fn all_simple_stats(&self) -> &[[f64; 6]] {
        &self.simple_stats
    }

    /// Class distribution covered by rule `index`.
    pub fn distribution(&self, index: usize) -> &[f64] {
        &self.distributions[index]
    }

    /// The residual data left uncovered after rule `index`.
    pub fn uncovered(&self, index: usize) -> &Dataset {
        &self.filtered[index].1
    }

    /// Decompose into rules, 6-tuples and covered distributions.
    pub fn into_parts(self) -> (Vec<Rule>, Vec<[f64; 6]>, Vec<Vec<f64>>) {
        (self.ruleset, self.simple_stats, self.distributions)
    }

    /// Append `rule` and count it against the residual of the last rule.
    pub fn add_and_update(&mut self, rule: Rule) {
        let base = match self.filtered.last() {
            Some((_, uncovered)) => uncovered.clone(),
            None => self.data.clone(),
        };
        let num_classes = self.data.num_classes();
        let (stats, covered, uncovered, dist) =
            compute_simple_stats(&rule, &base, num_classes);
        self.ruleset.push(rule);
        self.simple_stats.push(stats);
        self.filtered.push((covered, uncovered));
        self.distributions.push(dist);
    }

    /// Drop the last rule and its bookkeeping.
    pub fn remove_last(&mut self) {
        self.ruleset.pop();
        self.simple_stats.pop();
        self.filtered.pop();
        if self.distributions.len() > self.ruleset.len() {
            self.distributions.pop();
        }
    }

    /// Count an existing ruleset, reusing the first `index` 6-tuples and
    /// recounting from `uncovered`, the residual bag in front of rule
    /// `index`. Used to evaluate candidate rulesets during optimization.
    pub fn count_data_resumed(
        &mut self,
        index: usize,
        uncovered: Dataset,
        prev_stats: &[[f64; 6]],
    ) {
        if !self.simple_stats.is_empty() {
            return;
        }
        let empty = self.data.empty_like();
        for (i, stats) in prev_stats.iter().enumerate().take(index) {
            self.simple_stats.push(*stats);
            if i + 1 == index {
                self.filtered.push((empty.clone(), uncovered.clone()));
            } else {
                self.filtered.push((empty.clone(), empty.clone()));
            }
        }

        let num_classes = self.data.num_classes();
        let mut data = uncovered;
        for j in index..self.ruleset.len() {
            let (stats, covered, unc, _dist) =
                compute_simple_stats(&self.ruleset[j], &data, num_classes);
            self.simple_stats.push(stats);
            data = unc.clone();
            self.filtered.push((covered, unc));
        }
    }

    fn recount_all(&mut self) {
        let num_classes = self.data.num_classes();
        let mut data = self.data.clone();
        for i in 0..self.ruleset.len() {
            let (stats, covered, uncovered, dist) =
                compute_simple_stats(&self.ruleset[i], &data, num_classes);
            data = uncovered.clone();
            self.simple_stats.push(stats);
            self.filtered.push((covered, uncovered));
            self.distributions.push(dist);
        }
    }

    /// Theory description length of rule `index`.
    pub fn theory_dl(&self, index: usize) -> f64 {
        let k = self.ruleset[index].size() as f64;
        if k == 0.0 {
            return 0.0;
        }
        let mut tdl = log2(k);
        if k > 1.0 {
            tdl += 2.0 * log2(tdl); // of log2 star
        }
        tdl += subset_dl(self.num_all_conds, k, k / self.num_all_conds);
        MDL_THEORY_WEIGHT * REDUNDANCY_FACTOR * tdl
    }

    /// The DL change attributed to rule `index`: the minimal data DL of
    /// the ruleset with the rule (plus its theory bits) minus the minimal
    /// data DL without it.
    pub fn relative_dl(&self, index: usize, exp_fp_rate: f64) -> f64 {
        self.min_data_dl_if_exists(exp_fp_rate) + self.theory_dl(index)
            - self.min_data_dl_if_deleted(index, exp_fp_rate)
    }

    fn min_data_dl_if_exists(&self, exp_fp_rate: f64) -> f64 {
        let mut s = [0.0; 6];
        let last = self.simple_stats.len().wrapping_sub(1);
        for (j, stats) in self.simple_stats.iter().enumerate() {
            s[0] += stats[0];
            s[2] += stats[2];
            s[4] += stats[4];
            if j == last {
                s[1] = stats[1];
                s[3] = stats[3];
                s[5] = stats[5];
            }
        }
        data_dl(exp_fp_rate, s[0], s[1], s[4], s[5])
    }

    fn min_data_dl_if_deleted(&self, index: usize, exp_fp_rate: f64) -> f64 {
        let mut s = [0.0; 6];
        let more = self.ruleset.len() - 1 - index;

        // Stats of the rules in front are cumulative and stay valid.
        for j in 0..index {
            s[0] += self.simple_stats[j][0];
            s[2] += self.simple_stats[j][2];
            s[4] += self.simple_stats[j][4];
        }

        // Recount the rules behind on the bag the deleted rule received.
        let mut index_plus: Vec<[f64; 6]> = Vec::new();
        let mut data = if index == 0 {
            self.data.clone()
        } else {
            self.filtered[index - 1].1.clone()
        };
        let num_classes = self.data.num_classes();
        for j in (index + 1)..self.ruleset.len() {
            let (stats, _covered, uncovered, _dist) =
                compute_simple_stats(&self.ruleset[j], &data, num_classes);
            s[0] += stats[0];
            s[2] += stats[2];
            s[4] += stats[4];
            index_plus.push(stats);
            data = uncovered;
        }

        if more > 0 {
            if let Some(last) = index_plus.last() {
                s[1] = last[1];
                s[3] = last[3];
                s[5] = last[5];
            }
        } else if index > 0 {
            s[1] = self.simple_stats[index - 1][1];
            s[3] = self.simple_stats[index - 1][3];
            s[5] = self.simple_stats[index - 1][5];
        } else {
            // Deleting the only rule: everything becomes uncovered.
            s[1] = self.simple_stats[0][0] + self.simple_stats[0][1];
            s[3] = self.simple_stats[0][3] + self.simple_stats[0][4];
            s[5] = self.simple_stats[0][2] + self.simple_stats[0][5];
        }
        data_dl(exp_fp_rate, s[0], s[1], s[4], s[5])
    }

    /// DL saved by deleting rule `index` given the whole-ruleset stats,
    /// or `None` if the deletion costs bits and the rule's error rate is
    /// acceptable. On deletion the whole-ruleset stats are updated.
    fn potential(
        &self,
        index: usize,
        exp_fp_rate: f64,
        ruleset_stat: &mut [f64; 6],
        rule_stat: &[f64; 6],
        check_err: bool,
    ) -> Option<f64> {
        let pcov = ruleset_stat[0] - rule_stat[0];
        let puncov = ruleset_stat[1] + rule_stat[0];
        let pfp = ruleset_stat[4] - rule_stat[4];
        let pfn = ruleset_stat[5] + rule_stat[2];

        let data_dl_with = data_dl(
            exp_fp_rate,
            ruleset_stat[0],
            ruleset_stat[1],
            ruleset_stat[4],
            ruleset_stat[5],
        );
        let theory_dl_with = self.theory_dl(index);
        let data_dl_without = data_dl(exp_fp_rate, pcov, puncov, pfp, pfn);

        let potential = data_dl_with + theory_dl_with - data_dl_without;
        let err = rule_stat[4] / rule_stat[0];
        let over_err = check_err && util::gr_or_eq(err, 0.5);

        if util::gr_or_eq(potential, 0.0) || over_err {
            ruleset_stat[0] = pcov;
            ruleset_stat[1] = puncov;
            ruleset_stat[4] = pfp;
            ruleset_stat[5] = pfn;
            Some(potential)
        } else {
            None
        }
    }

    /// Walk the ruleset from the tail and delete every rule whose removal
    /// does not increase the total description length (or whose error
    /// rate is at least 0.5 when `check_err`).
    pub fn reduce_dl(&mut self, exp_fp_rate: f64, check_err: bool) {
        let mut need_update = false;
        let mut ruleset_stat = [0.0; 6];
        let last = self.simple_stats.len().wrapping_sub(1);
        for (j, stats) in self.simple_stats.iter().enumerate() {
            ruleset_stat[0] += stats[0];
            ruleset_stat[2] += stats[2];
            ruleset_stat[4] += stats[4];
            if j == last {
                ruleset_stat[1] = stats[1];
                ruleset_stat[3] = stats[3];
                ruleset_stat[5] = stats[5];
            }
        }

        for k in (0..self.simple_stats.len()).rev() {
            let rule_stat = self.simple_stats[k];
            let deleted =
                self.potential(k, exp_fp_rate, &mut ruleset_stat, &rule_stat, check_err);
            if let Some(saved) = deleted {
                debug!(rule = k, saved, "rule deleted by DL reduction");
                if k == self.simple_stats.len() - 1 {
                    self.remove_last();
                } else {
                    self.ruleset.remove(k);
                    need_update = true;
                }
            }
        }

        if need_update {
            self.simple_stats.clear();
            self.filtered.clear();
            self.distributions.clear();
            self.recount_all();
        }
    }
}

/// Subset description length: bits to send `k` elements of a known set
/// of `t`, each with prior probability `p`.
pub fn subset_dl(t: f64, k: f64, p: f64) -> f64 {
    let mut rt = if util::gr(p, 0.0) { -k * log2(p) } else { 0.0 };
    rt -= (t - k) * log2(1.0 - p);
    rt
}

/// Data description length of a ruleset's coverage summary. The side with
/// more instances codes its errors against the expected rate `exp_fp_rate`,
/// the other against its observed rate.
pub fn data_dl(exp_fp_rate: f64, cover: f64, uncover: f64, fp: f64, fnr: f64) -> f64 {
    let total_bits = log2(cover + uncover + 1.0);
    let (cover_bits, uncover_bits);
    if util::gr(cover, uncover) {
        let exp_err = exp_fp_rate * (fp + fnr);
        cover_bits = subset_dl(cover, fp, exp_err / cover);
        uncover_bits = if util::gr(uncover, 0.0) {
            subset_dl(uncover, fnr, fnr / uncover)
        } else {
            0.0
        };
    } else {
        let exp_err = (1.0 - exp_fp_rate) * (fp + fnr);
        cover_bits = if util::gr(cover, 0.0) {
            subset_dl(cover, fp, fp / cover)
        } else {
            0.0
        };
        uncover_bits = subset_dl(uncover, fnr, exp_err / uncover);
    }
    total_bits + cover_bits + uncover_bits
}

/// Total number of possible antecedent conditions: each nominal attribute
/// contributes its value count, each numeric one twice its distinct
/// non-missing values. The class attribute contributes nothing.
pub fn num_all_conditions(data: &Dataset) -> f64 {
    let mut total = 0.0;
    for (i, attr) in data.schema().attributes().iter().enumerate() {
        if i == data.class_index() {
            continue;
        }
        total += if attr.is_nominal() {
            attr.num_values() as f64
        } else {
            2.0 * data.distinct_value_count(i) as f64
        };
    }
    total
}

/// Group instances by class, shuffle each group with `rng` and interleave
/// them round-robin across `folds` so every contiguous fold is class
/// balanced.
pub fn stratify<R: Rng>(data: &Dataset, folds: usize, rng: &mut R) -> Dataset {
    if data.schema().class_attribute().is_numeric() {
        return data.clone();
    }

    let mut bags: Vec<Vec<&Instance>> = (0..data.num_classes()).map(|_| Vec::new()).collect();
    for inst in data.instances() {
        if let Some(class) = data.class_of(inst) {
            bags[class].push(inst);
        }
    }
    for bag in &mut bags {
        bag.shuffle(rng);
    }

    let mut result = data.empty_like();
    for k in 0..folds {
        let mut offset = k;
        let mut bag = 0;
        'one_fold: loop {
            while offset >= bags[bag].len() {
                offset -= bags[bag].len();
                bag += 1;
                if bag >= bags.len() {
                    break 'one_fold;
                }
            }
            result.push(bags[bag][offset].clone());
            offset += folds;
        }
    }
    result
}

/// Cut the first `(folds - 1) / folds` of the instances as the growing
/// set and the remainder as the pruning set.
pub fn partition(data: &Dataset, folds: usize) -> (Dataset, Dataset) {
    let splits = data.len() * (folds - 1) / folds;
    (data.range(0, splits), data.range(splits, data.len()))
}

/// Instances of `data` not covered by any rule after `index`.
pub fn rm_covered_by_successives(data: &Dataset, rules: &[Rule], index: usize) -> Dataset {
    let mut rt = data.empty_like();
    for inst in data.instances() {
        let covered = rules.iter().skip(index + 1).any(|rule| rule.covers(inst));
        if !covered {
            rt.push(inst.clone());
        }
    }
    rt
}

/// Coverage 6-tuple, covered/uncovered bags and covered class weights of
/// one rule over `data`.
fn compute_simple_stats(
    rule: &Rule,
    data: &Dataset,
    num_classes: usize,
) -> ([f64; 6], Dataset, Dataset, Vec<f64>) {
    let mut stats = [0.0; 6];
    let mut dist = vec![0.0; num_classes];
    let mut covered = data.empty_like();
    let mut uncovered = data.empty_like();
    for inst in data.instances() {
        let w = inst.weight();
        if rule.covers(inst) {
            covered.push(inst.clone());
            stats[0] += w;
            if data.class_of(inst) == Some(rule.consequent()) {
                stats[2] += w;
            } else {
                stats[4] += w;
            }
            if let Some(class) = data.class_of(inst) {
                dist[class] += w;
            }
        } else {
            uncovered.push(inst.clone());
            stats[1] += w;
            if data.class_of(inst) == Some(rule.consequent()) {
                stats[5] += w;
            } else {
                stats[3] += w;
            }
        }
    }
    (stats, covered, uncovered, dist)
}
