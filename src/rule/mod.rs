//! Rules: conjunctions of antecedents predicting one class.
//!
//! A rule is grown by information gain on a growing set, pruned by
//! reduced-error pruning on a held-out set, and finally post-processed:
//! numeric antecedents are widened into trapezoids by purity
//! maximization, and every antecedent prefix receives an m-estimate
//! confidence.

mod antecedent;

pub use antecedent::{AntdStats, AntdTest, Antecedent, NumericTest, Side};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::dataset::{Dataset, Instance, Schema};
use crate::options::TNorm;
use crate::util;

/// A conjunction of antecedents with a class consequent. Antecedents
/// appear in growth order; pruning and stretching truncate the tail.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rule {
    consequent: usize,
    antds: Vec<Antecedent>,
}

impl Rule {
    /// An empty rule predicting `consequent`.
    pub fn new(consequent: usize) -> Self {
        Self {
            consequent,
            antds: Vec::new(),
        }
    }

    /// The predicted class index.
    pub fn consequent(&self) -> usize {
        self.consequent
    }

    /// Antecedents in growth order.
    pub fn antds(&self) -> &[Antecedent] {
        &self.antds
    }

    pub(crate) fn antds_mut(&mut self) -> &mut Vec<Antecedent> {
        &mut self.antds
    }

    /// Whether the rule has any antecedent.
    pub fn has_antds(&self) -> bool {
        !self.antds.is_empty()
    }

    /// Number of antecedents.
    pub fn size(&self) -> usize {
        self.antds.len()
    }

    /// Degree to which `inst` is covered, aggregated with `t_norm`.
    pub fn membership(&self, inst: &Instance, t_norm: TNorm) -> f64 {
        let mut coverage = 1.0;
        for antd in &self.antds {
            let m = antd.membership(inst);
            coverage = match t_norm {
                TNorm::Product => coverage * m,
                TNorm::Minimum => coverage.min(m),
            };
        }
        coverage
    }

    /// Whether `inst` has non-zero membership. Product and minimum
    /// T-norms agree on this boundary, so no norm is needed here.
    pub fn covers(&self, inst: &Instance) -> bool {
        self.antds.iter().all(|antd| antd.membership(inst) > 0.0)
    }

    /// Confidence of the full rule: the confidence stored on its last
    /// antecedent. NaN for a rule with no antecedents (it never votes).
    pub fn confidence(&self) -> f64 {
        self.antds.last().map_or(f64::NAN, |antd| antd.confidence)
    }

    /// Weight of instances of this rule's class in `data`.
    pub(crate) fn compute_def_accu(&self, data: &Dataset) -> f64 {
        data.instances()
            .iter()
            .filter(|inst| data.class_of(inst) == Some(self.consequent))
            .map(Instance::weight)
            .sum()
    }

    /// Grow this rule on `data`: repeatedly append the antecedent with
    /// the best information gain until the data is pure, no attribute is
    /// left, or the best split covers less than `min_no` accurate weight.
    /// Numeric attributes may be tested more than once.
    pub fn grow(&mut self, data: &Dataset, min_no: f64) {
        let mut grow_data = data.clone();
        let sum_of_weights = grow_data.sum_of_weights();
        if !util::gr(sum_of_weights, 0.0) {
            return;
        }

        let def_accu = self.compute_def_accu(&grow_data);
        let mut def_acc_rate = (def_accu + 1.0) / (sum_of_weights + 1.0);

        let schema = data.schema_handle();
        let class_index = schema.class_index();
        let mut used = vec![false; schema.num_attributes()];
        let mut num_unused = schema.num_attributes() - 1;
        for antd in &self.antds {
            if !schema.attribute(antd.attr).is_numeric() && !used[antd.attr] {
                used[antd.attr] = true;
                num_unused -= 1;
            }
        }

        while !grow_data.is_empty() && num_unused > 0 && util::sm(def_acc_rate, 1.0) {
            let mut max_info_gain = 0.0;
            let mut best: Option<(Antecedent, Dataset)> = None;

            for attr in 0..schema.num_attributes() {
                if attr == class_index || used[attr] {
                    continue;
                }
                let mut antd = if schema.attribute(attr).is_numeric() {
                    Antecedent::numeric(attr)
                } else {
                    Antecedent::nominal(attr)
                };
                if let Some(mut bags) = antd.split_data(&grow_data, def_acc_rate, self.consequent)
                {
                    let gain = antd.stats.max_info_gain;
                    if gain > max_info_gain {
                        let covered = bags.swap_remove(antd.bag_value());
                        max_info_gain = gain;
                        best = Some((antd, covered));
                    }
                }
            }

            let Some((one_antd, cover_data)) = best else {
                break; // no antecedent with positive gain
            };
            if util::sm(one_antd.stats.accu, min_no) {
                break; // too low coverage
            }

            debug!(
                attr = one_antd.attr,
                gain = one_antd.stats.max_info_gain,
                accuracy = one_antd.stats.accu_rate,
                "antecedent appended"
            );

            if !schema.attribute(one_antd.attr).is_numeric() {
                used[one_antd.attr] = true;
                num_unused -= 1;
            }
            def_acc_rate = one_antd.stats.accu_rate;
            self.antds.push(one_antd);
            grow_data = cover_data;
        }
    }

    /// Reduced-error pruning: score every antecedent prefix on the
    /// pruning data and truncate after the best strictly-improving one.
    /// With `use_whole` the worth is `(tp + tn) / total` over the whole
    /// pruning set; otherwise the Laplace-smoothed accuracy of the
    /// covered part. Ties prefer the shorter prefix.
    pub fn prune(&mut self, prune_data: &Dataset, use_whole: bool) {
        let total = prune_data.sum_of_weights();
        if !util::gr(total, 0.0) {
            return;
        }

        let def_accu = self.compute_def_accu(prune_data);
        let size = self.antds.len();
        if size == 0 {
            return;
        }

        let mut worth_rt = vec![0.0; size];
        let mut coverage = vec![0.0; size];
        let mut worth_value = vec![0.0; size];

        let mut reached: Vec<&Instance> = prune_data.instances().iter().collect();
        let mut tn = 0.0;
        for x in 0..size {
            let antd = &self.antds[x];
            let mut covered = Vec::with_capacity(reached.len());
            for inst in reached {
                if antd.membership(inst) > 0.0 {
                    coverage[x] += inst.weight();
                    if prune_data.class_of(inst) == Some(self.consequent) {
                        worth_value[x] += inst.weight();
                    }
                    covered.push(inst);
                } else if use_whole && prune_data.class_of(inst) != Some(self.consequent) {
                    tn += inst.weight();
                }
            }
            reached = covered;

            if use_whole {
                worth_value[x] += tn;
                worth_rt[x] = worth_value[x] / total;
            } else {
                worth_rt[x] = (worth_value[x] + 1.0) / (coverage[x] + 2.0);
            }
        }

        let mut max_value = (def_accu + 1.0) / (total + 2.0);
        let mut max_index = None;
        for i in 0..size {
            if worth_rt[i] > max_value {
                max_value = worth_rt[i];
                max_index = Some(i);
            }
        }

        if let Some(idx) = max_index {
            self.antds.truncate(idx + 1);
        }
    }

    /// Greedy fuzzification: repeatedly commit the not-yet-finalized
    /// numeric antecedent whose best trapezoid widening yields the
    /// highest rule purity on the training data. Nominal antecedents
    /// finalize immediately. With unit weights a branch-and-bound cutoff
    /// skips candidates that cannot beat the running best.
    pub fn fuzzify(&mut self, data: &Dataset, all_weights_one: bool) {
        if !self.antds.iter().any(Antecedent::is_numeric) {
            return;
        }

        let size = self.antds.len();
        let mut max_purity = f64::NEG_INFINITY;
        let mut finished = vec![false; size];
        let mut num_finished = 0;

        while num_finished < size {
            let mut best_purity_all = f64::NEG_INFINITY;
            let mut best_index = None;
            let mut best_support_all = f64::NAN;

            for j in 0..size {
                if finished[j] {
                    continue;
                }

                // Only instances covered by all *other* antecedents are
                // relevant for widening this one.
                let mut relevant = data.clone();
                relevant.retain(|inst| {
                    (0..size)
                        .filter(|&k| k != j)
                        .all(|k| self.antds[k].membership(inst) > 0.0)
                });

                if !self.antds[j].is_numeric() || relevant.is_empty() {
                    finished[j] = true;
                    num_finished += 1;
                    continue;
                }

                let mut current = self.antds[j].clone();
                let attr = current.attr;
                relevant.delete_with_missing(attr);
                if !util::gr(relevant.sum_of_weights(), 0.0) {
                    return;
                }
                relevant.sort_by_attribute(attr);

                let (side, split_point) = match current.as_numeric() {
                    Some(num) => (num.side, num.split_point),
                    None => continue,
                };
                if let Some(num) = current.as_numeric_mut() {
                    num.fuzzy = true;
                }

                let n = relevant.len();
                let value_at =
                    |i: usize| relevant.instance(i).value(attr).unwrap_or(f64::NAN);
                let mut best_purity_here = 0.0;
                let mut best_support_here = f64::NAN;
                let mut last_accu = 0.0;
                let mut last_cover = 0.0;

                let candidates: Vec<(usize, f64)> = match side {
                    Side::Low => (1..n).map(|k| (k, (n - k - 1) as f64)).collect(),
                    Side::High => (0..n.saturating_sub(1))
                        .rev()
                        .map(|k| (k, k as f64))
                        .collect(),
                };

                for (k, remaining) in candidates {
                    if all_weights_one
                        && (last_accu + remaining) / (last_cover + remaining) < best_purity_here
                    {
                        break;
                    }

                    let vk = value_at(k);
                    let neighbor = match side {
                        Side::Low => value_at(k - 1),
                        Side::High => value_at(k + 1),
                    };
                    let outward = match side {
                        Side::Low => split_point < vk,
                        Side::High => split_point > vk,
                    };
                    if !outward || vk == neighbor {
                        continue;
                    }

                    if let Some(num) = current.as_numeric_mut() {
                        num.support_bound = vk;
                    }
                    let (accu_sum, cover_sum) =
                        purity_sums(&current, &relevant, self.consequent);
                    let purity = accu_sum / cover_sum;
                    if purity >= best_purity_here {
                        best_purity_here = purity;
                        best_support_here = vk;
                    }
                    last_accu = accu_sum;
                    last_cover = cover_sum;
                }

                if best_purity_here > best_purity_all {
                    best_index = Some(j);
                    best_support_all = best_support_here;
                    best_purity_all = best_purity_here;
                }
            }

            let Some(bj) = best_index else {
                break; // every remaining antecedent was finalized above
            };

            if max_purity <= best_purity_all {
                if let Some(num) = self.antds[bj].as_numeric_mut() {
                    if best_support_all.is_nan() {
                        num.support_bound = num.split_point;
                    } else {
                        num.support_bound = best_support_all;
                        num.fuzzy = true;
                    }
                }
                max_purity = best_purity_all;
            }
            finished[bj] = true;
            num_finished += 1;
        }
    }

    /// Compute the m-estimate confidence of every antecedent prefix on
    /// the training data (m = 2, prior = the class share of the apriori
    /// distribution). The prefix of length `k` stores its confidence on
    /// antecedent `k - 1`.
    pub fn calculate_confidences(&mut self, data: &Dataset, apriori: &[f64], t_norm: TNorm) {
        let apriori_sum: f64 = apriori.iter().sum();
        let prior = apriori[self.consequent] / apriori_sum;
        const M: f64 = 2.0;

        let mut temp = self.clone();
        while temp.has_antds() {
            let mut acc = 0.0;
            let mut cov = 0.0;
            for inst in data.instances() {
                let m = temp.membership(inst, t_norm) * inst.weight();
                cov += m;
                if data.class_of(inst) == Some(self.consequent) {
                    acc += m;
                }
            }
            self.antds[temp.size() - 1].confidence = (acc + M * prior) / (cov + M);
            temp.antds.pop();
        }
    }

    /// Render the rule against `schema`:
    /// `(antd) and (antd) => class=value`.
    pub fn describe(&self, schema: &Schema) -> String {
        let mut text = String::new();
        for (i, antd) in self.antds.iter().enumerate() {
            if i > 0 {
                text.push_str(" and ");
            }
            text.push('(');
            text.push_str(&antd.describe(schema));
            text.push(')');
        }
        let class_attr = schema.class_attribute();
        text.push_str(&format!(
            " => {}={}",
            class_attr.name,
            class_attr.value_name(self.consequent)
        ));
        text
    }
}

/// Membership-weighted accurate and covered sums of `antd` over `data`.
fn purity_sums(antd: &Antecedent, data: &Dataset, consequent: usize) -> (f64, f64) {
    let mut accu = 0.0;
    let mut cover = 0.0;
    for inst in data.instances() {
        let m = antd.membership(inst) * inst.weight();
        cover += m;
        if data.class_of(inst) == Some(consequent) {
            accu += m;
        }
    }
    (accu, cover)
}

#[cfg(test)]
#[path = "rule_tests.rs"]
mod tests;
