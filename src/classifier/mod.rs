//! The fuzzy unordered rule induction classifier.
//!
//! Training runs a RIPPER-style separate-and-conquer loop per class value:
//! grow rules on the residual data until the description length degrades,
//! then revisit every rule over several optimization passes (keep it,
//! regrow a replacement, or revise it, whichever costs the fewest bits)
//! and delete rules the MDL criterion no longer justifies. The crisp
//! ruleset is then post-processed: numeric antecedents are fuzzified into
//! trapezoids and every rule receives an m-estimate confidence.
//!
//! Prediction aggregates antecedent memberships with the configured
//! T-norm and sums `membership * confidence` per class; instances no rule
//! covers fall back to rule stretching, the apriori distribution, or
//! rejection.

use std::fmt;
use std::sync::Arc;

use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::dataset::{Dataset, Instance, Schema};
use crate::error::{BorrosoError, Result};
use crate::options::{Options, TNorm, UncovAction};
use crate::rule::{Rule, Side};
use crate::stats::{self, RuleStats};
use crate::util;

/// Stop growing a class's ruleset once its DL exceeds the best seen by
/// this many bits.
const MAX_DL_SURPLUS: f64 = 64.0;

/// Frozen per-class statistics kept on a trained model: one coverage
/// 6-tuple and one covered-class distribution per rule, in induction
/// order against the class's residual chain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassRuleStats {
    /// The class these rules predict.
    pub class: usize,
    /// Covered, uncovered, tp, tn, fp, fn weights per rule.
    pub simple_stats: Vec<[f64; 6]>,
    /// Normalized class distribution of each rule's covered bag.
    pub distributions: Vec<Vec<f64>>,
}

impl ClassRuleStats {
    /// Number of rules learned for this class.
    pub fn num_rules(&self) -> usize {
        self.simple_stats.len()
    }
}

/// Fuzzy unordered rule induction classifier.
///
/// # Example
///
/// ```
/// use borroso::prelude::*;
///
/// let schema = Schema::new(
///     vec![
///         Attribute::numeric("x"),
///         Attribute::nominal("class", vec!["low", "high"]),
///     ],
///     1,
/// )
/// .unwrap();
/// let mut data = Dataset::new(schema);
/// for i in 0..20 {
///     let x = i as f64 / 20.0;
///     let class = if x <= 0.5 { 0.0 } else { 1.0 };
///     data.push(Instance::new(vec![Some(x), Some(class)]));
/// }
///
/// let mut model = Furia::new();
/// model.fit(&data).unwrap();
/// let dist = model.predict_distribution(&Instance::new(vec![Some(0.1), None]));
/// assert!(dist[0] > dist[1]);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Furia {
    options: Options,
    schema: Option<Arc<Schema>>,
    ruleset: Vec<Rule>,
    ruleset_stats: Vec<ClassRuleStats>,
    distributions: Vec<Vec<f64>>,
    apriori: Vec<f64>,
}

impl Default for Furia {
    fn default() -> Self {
        Self::new()
    }
}

impl Furia {
    /// A classifier with default options.
    pub fn new() -> Self {
        Self::with_options(Options::default())
    }

    /// A classifier with explicit options.
    pub fn with_options(options: Options) -> Self {
        Self {
            options,
            schema: None,
            ruleset: Vec::new(),
            ruleset_stats: Vec::new(),
            distributions: Vec::new(),
            apriori: Vec::new(),
        }
    }

    /// Sets the number of folds for reduced-error pruning.
    pub fn with_folds(mut self, folds: usize) -> Self {
        self.options.folds = folds;
        self
    }

    /// Sets the minimum covered-positive weight of a split.
    pub fn with_min_no(mut self, min_no: f64) -> Self {
        self.options.min_no = min_no;
        self
    }

    /// Sets the number of optimization runs.
    pub fn with_optimizations(mut self, optimizations: usize) -> Self {
        self.options.optimizations = optimizations;
        self
    }

    /// Sets the randomization seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.options.seed = seed;
        self
    }

    /// Sets whether the error rate >= 0.5 test is part of the stop
    /// criterion.
    pub fn with_check_error_rate(mut self, check: bool) -> Self {
        self.options.check_error_rate = check;
        self
    }

    /// Sets the action for uncovered instances.
    pub fn with_uncov_action(mut self, action: UncovAction) -> Self {
        self.options.uncov_action = action;
        self
    }

    /// Sets the fuzzy AND-operator.
    pub fn with_t_norm(mut self, t_norm: TNorm) -> Self {
        self.options.t_norm = t_norm;
        self
    }

    /// Sets debug tracing.
    pub fn with_debug(mut self, debug: bool) -> Self {
        self.options.debug = debug;
        self
    }

    /// The active options.
    pub fn options(&self) -> &Options {
        &self.options
    }

    /// The learned rules across all classes, in induction order.
    pub fn ruleset(&self) -> &[Rule] {
        &self.ruleset
    }

    /// Number of learned rules.
    pub fn num_rules(&self) -> usize {
        self.ruleset.len()
    }

    /// Statistics of the `pos`-th learned class.
    pub fn rule_stats(&self, pos: usize) -> &ClassRuleStats {
        &self.ruleset_stats[pos]
    }

    /// Per-class statistics in learning order.
    pub fn ruleset_stats(&self) -> &[ClassRuleStats] {
        &self.ruleset_stats
    }

    /// Normalized covered-class distribution per rule, for reporting.
    pub fn distributions(&self) -> &[Vec<f64>] {
        &self.distributions
    }

    /// Training class-weight totals.
    pub fn apriori(&self) -> &[f64] {
        &self.apriori
    }

    /// Learn a ruleset from `instances`.
    ///
    /// # Errors
    ///
    /// Rejects data whose class attribute is not nominal or that holds
    /// fewer instances than pruning folds; fails hard if a description
    /// length degenerates to NaN or infinity.
    pub fn fit(&mut self, instances: &Dataset) -> Result<()> {
        if !instances.schema().class_attribute().is_nominal() {
            return Err(BorrosoError::capability(
                "class attribute must be nominal",
            ));
        }
        if instances.len() < self.options.folds {
            return Err(BorrosoError::capability(format!(
                "{} training instances but {} folds required",
                instances.len(),
                self.options.folds
            )));
        }

        let mut data = instances.clone();
        data.delete_with_missing_class();

        self.schema = Some(data.schema_handle());
        self.ruleset.clear();
        self.ruleset_stats.clear();
        self.distributions.clear();

        self.apriori = data.class_weights();
        let apriori_sum: f64 = self.apriori.iter().sum();
        let all_weights_one = data.instances().iter().all(|inst| inst.weight() == 1.0);

        let mut rng = StdRng::seed_from_u64(self.options.seed);
        let num_all_conds = stats::num_all_conditions(&data);
        if self.options.debug {
            debug!(num_all_conds, "number of all possible conditions");
        }

        for class in 0..data.num_classes() {
            if util::eq(self.apriori[class], 0.0) {
                continue;
            }

            let exp_fp_rate = self.apriori[class] / apriori_sum;

            let mut class_weight = 0.0;
            let mut total_weight = 0.0;
            for inst in data.instances() {
                total_weight += inst.weight();
                if data.class_of(inst) == Some(class) {
                    class_weight += inst.weight();
                }
            }
            if class_weight <= 0.0 {
                continue;
            }

            let def_dl = stats::data_dl(exp_fp_rate, 0.0, total_weight, 0.0, class_weight);
            if !def_dl.is_finite() {
                return Err(BorrosoError::dl("default DL"));
            }
            if self.options.debug {
                debug!(class, def_dl, "learning ruleset for class");
            }

            self.ruleset_for_one_class(
                &data,
                class,
                exp_fp_rate,
                def_dl,
                num_all_conds,
                &mut rng,
            )?;
        }

        self.remove_redundant_antds();
        self.fuzzify_all(&data, all_weights_one);
        self.trivial_fuzzification(&data);

        let apriori = self.apriori.clone();
        for rule in &mut self.ruleset {
            rule.calculate_confidences(&data, &apriori, self.options.t_norm);
        }

        Ok(())
    }

    /// Same-attribute same-value antecedents within a rule collapse to
    /// the later occurrence.
    fn remove_redundant_antds(&mut self) {
        for rule in &mut self.ruleset {
            let antds = rule.antds_mut();
            let mut j = 0;
            while j < antds.len() {
                let mut k = j + 1;
                while k < antds.len() {
                    if antds[j].attr == antds[k].attr
                        && antds[j].bag_value() == antds[k].bag_value()
                    {
                        antds[j] = antds[k].clone();
                        antds.remove(k);
                    } else {
                        k += 1;
                    }
                }
                j += 1;
            }
        }
    }

    /// Fuzzify every rule and record its normalized covered-class
    /// distribution.
    fn fuzzify_all(&mut self, data: &Dataset, all_weights_one: bool) {
        let mut flat = 0;
        for class_stats in &mut self.ruleset_stats {
            for r in 0..class_stats.num_rules() {
                self.ruleset[flat].fuzzify(data, all_weights_one);

                let mut dist = class_stats.distributions[r].clone();
                util::normalize(&mut dist);
                class_stats.distributions[r] = dist.clone();
                self.distributions.push(dist);
                flat += 1;
            }
        }
    }

    /// A numeric antecedent the greedy pass left crisp takes the nearest
    /// training value strictly on its uncovered side as support bound.
    fn trivial_fuzzification(&mut self, data: &Dataset) {
        for rule in &mut self.ruleset {
            for antd in rule.antds_mut() {
                let attr = antd.attr;
                let Some(num) = antd.as_numeric_mut() else {
                    continue;
                };
                if num.fuzzy {
                    continue;
                }
                for inst in data.instances() {
                    let Some(v) = inst.value(attr) else {
                        continue;
                    };
                    let outward = match num.side {
                        Side::Low => num.split_point < v,
                        Side::High => num.split_point > v,
                    };
                    let closer = match num.side {
                        Side::Low => num.support_bound > v,
                        Side::High => num.support_bound < v,
                    };
                    if outward && (closer || !num.fuzzy) {
                        num.support_bound = v;
                        num.fuzzy = true;
                    }
                }
            }
        }
    }

    /// The separate-and-conquer loop for one class: the building stage
    /// followed by the optimization runs. Appends the class's rules and
    /// frozen statistics to the model.
    fn ruleset_for_one_class(
        &mut self,
        data: &Dataset,
        class: usize,
        exp_fp_rate: f64,
        def_dl: f64,
        num_all_conds: f64,
        rng: &mut StdRng,
    ) -> Result<()> {
        let mut ruleset: Vec<Rule> = Vec::new();
        let mut new_data = data.clone();
        let mut dl = def_dl;
        let mut min_dl = def_dl;
        let mut stop = false;
        let mut has_positive = true;

        let mut rstats = RuleStats::new(new_data.clone());
        rstats.set_num_all_conds(num_all_conds);

        // Building stage: add rules until the stop criterion trips.
        while !stop && has_positive {
            let mut one_rule = Rule::new(class);
            one_rule.grow(&new_data, self.options.min_no);

            rstats.add_and_update(one_rule.clone());
            let last = rstats.ruleset_size() - 1;
            dl += rstats.relative_dl(last, exp_fp_rate);
            if !dl.is_finite() {
                return Err(BorrosoError::dl("building-stage DL"));
            }
            if dl < min_dl {
                min_dl = dl;
            }

            let rst = rstats.simple_stats(last);
            stop = self.check_stop(&rst, min_dl, dl);
            if !stop {
                ruleset.push(one_rule);
                new_data = rstats.uncovered(last).clone();
                has_positive = util::gr(rst[5], 0.0);
            } else {
                rstats.remove_last();
            }
        }

        // Optimization runs: revisit every rule position, then grow
        // residual rules, then shrink by DL.
        for run in 0..self.options.optimizations {
            if self.options.debug {
                debug!(class, run, "optimization run");
            }
            let mut new_data = data.clone();
            let mut frs = RuleStats::new(new_data.clone());
            frs.set_num_all_conds(num_all_conds);

            let mut position = 0;
            let mut stop = false;
            let mut has_positive = true;
            let mut dl = def_dl;
            let mut min_dl = def_dl;

            while !stop && has_positive {
                let is_residual = position >= ruleset.len();

                new_data = stats::stratify(&new_data, self.options.folds, rng);
                let (grow_data, prune_data) = stats::partition(&new_data, self.options.folds);

                let final_rule = if is_residual {
                    let mut new_rule = Rule::new(class);
                    new_rule.grow(&new_data, self.options.min_no);
                    new_rule
                } else {
                    let old_rule = ruleset[position].clone();
                    let covers_any = new_data
                        .instances()
                        .iter()
                        .any(|inst| old_rule.covers(inst));
                    if !covers_any {
                        // No variant can be generated from empty coverage.
                        frs.add_and_update(old_rule);
                        position += 1;
                        continue;
                    }

                    let prune_data =
                        stats::rm_covered_by_successives(&prune_data, &ruleset, position);

                    let mut replace = Rule::new(class);
                    replace.grow(&grow_data, self.options.min_no);
                    replace.prune(&prune_data, true);

                    let mut revision = old_rule.clone();
                    let mut revision_grow = grow_data.empty_like();
                    for inst in grow_data.instances() {
                        if revision.covers(inst) {
                            revision_grow.push(inst.clone());
                        }
                    }
                    revision.grow(&revision_grow, self.options.min_no);
                    revision.prune(&prune_data, true);

                    let prev_stats: Vec<[f64; 6]> =
                        (0..position).map(|c| frs.simple_stats(c)).collect();

                    let mut temp_rules = ruleset.clone();
                    temp_rules[position] = replace.clone();
                    let rep_dl = self.candidate_dl(
                        data,
                        temp_rules.clone(),
                        position,
                        &new_data,
                        &prev_stats,
                        exp_fp_rate,
                        num_all_conds,
                        "replacement DL",
                    )?;

                    temp_rules[position] = revision.clone();
                    let rev_dl = self.candidate_dl(
                        data,
                        temp_rules,
                        position,
                        &new_data,
                        &prev_stats,
                        exp_fp_rate,
                        num_all_conds,
                        "revision DL",
                    )?;

                    let old_dl = self.candidate_dl(
                        data,
                        ruleset.clone(),
                        position,
                        &new_data,
                        &prev_stats,
                        exp_fp_rate,
                        num_all_conds,
                        "original-rule DL",
                    )?;

                    if self.options.debug {
                        debug!(position, old_dl, rev_dl, rep_dl, "variant DLs");
                    }

                    if old_dl <= rev_dl && old_dl <= rep_dl {
                        old_rule
                    } else if rev_dl <= rep_dl {
                        revision
                    } else {
                        replace
                    }
                };

                frs.add_and_update(final_rule.clone());
                let rst = frs.simple_stats(position);

                if is_residual {
                    dl += frs.relative_dl(position, exp_fp_rate);
                    if !dl.is_finite() {
                        return Err(BorrosoError::dl("optimization-stage DL"));
                    }
                    if dl < min_dl {
                        min_dl = dl;
                    }
                    stop = self.check_stop(&rst, min_dl, dl);
                    if !stop {
                        ruleset.push(final_rule);
                    } else {
                        frs.remove_last();
                    }
                } else {
                    ruleset[position] = final_rule;
                }

                if frs.ruleset_size() > 0 {
                    new_data = frs.uncovered(frs.ruleset_size() - 1).clone();
                }
                has_positive = util::gr(rst[5], 0.0);
                if !stop {
                    position += 1;
                }
            }

            // Old rules past the last processed position are carried over
            // unmodified.
            if ruleset.len() > position + 1 {
                for k in (position + 1)..ruleset.len() {
                    frs.add_and_update(ruleset[k].clone());
                }
            }

            frs.reduce_dl(exp_fp_rate, self.options.check_error_rate);
            ruleset = frs.ruleset().to_vec();
            rstats = frs;
        }

        self.ruleset.extend(ruleset);
        let (_rules, simple_stats, distributions) = rstats.into_parts();
        self.ruleset_stats.push(ClassRuleStats {
            class,
            simple_stats,
            distributions,
        });
        Ok(())
    }

    /// Relative DL of the rule at `position` inside a candidate ruleset,
    /// counted against the residual data.
    #[allow(clippy::too_many_arguments)]
    fn candidate_dl(
        &self,
        data: &Dataset,
        rules: Vec<Rule>,
        position: usize,
        residual: &Dataset,
        prev_stats: &[[f64; 6]],
        exp_fp_rate: f64,
        num_all_conds: f64,
        context: &str,
    ) -> Result<f64> {
        let mut stat = RuleStats::with_ruleset(data.clone(), rules);
        stat.set_num_all_conds(num_all_conds);
        stat.count_data_resumed(position, residual.clone(), prev_stats);
        let dl = stat.relative_dl(position, exp_fp_rate);
        if !dl.is_finite() {
            return Err(BorrosoError::dl(context));
        }
        Ok(dl)
    }

    /// The ruleset stop criterion: DL surplus over the best, no covered
    /// positives left, or (optionally) an error rate of at least one half.
    fn check_stop(&self, rst: &[f64; 6], min_dl: f64, dl: f64) -> bool {
        if dl > min_dl + MAX_DL_SURPLUS {
            true
        } else if !util::gr(rst[2], 0.0) {
            true
        } else if rst[4] / rst[0] >= 0.5 {
            self.options.check_error_rate
        } else {
            false
        }
    }

    /// Class distribution for one instance. The vector sums to one,
    /// except under [`UncovAction::Reject`] where an uncovered instance
    /// yields all zeros.
    pub fn predict_distribution(&self, inst: &Instance) -> Vec<f64> {
        let num_classes = self.apriori.len();
        let mut votes = vec![0.0; num_classes];
        if num_classes == 0 {
            return votes;
        }

        for rule in &self.ruleset {
            // A rule without antecedents never votes.
            if !rule.has_antds() {
                continue;
            }
            if rule.covers(inst) {
                votes[rule.consequent()] +=
                    rule.membership(inst, self.options.t_norm) * rule.confidence();
            }
        }

        if votes.iter().sum::<f64>() == 0.0 {
            match self.options.uncov_action {
                UncovAction::Apriori => {
                    let mut apriori = self.apriori.clone();
                    util::normalize(&mut apriori);
                    return apriori;
                }
                UncovAction::Reject => return votes,
                UncovAction::Stretch => self.stretch_votes(inst, &mut votes),
            }
        }

        // Conflict resolution: break exact ties away from classes whose
        // apriori weight does not match the tied score.
        let tied: Vec<bool> = {
            let max = votes[util::max_index(&votes)];
            votes.iter().map(|&v| v == max && v > 0.0).collect()
        };
        if tied.iter().any(|&t| t) {
            for i in 0..num_classes {
                if tied[i] && self.apriori[i] != votes[util::max_index(&votes)] {
                    votes[i] -= 1e-5;
                }
            }
        }

        if votes.iter().sum::<f64>() == 0.0 {
            votes = self.apriori.clone();
        }
        util::normalize(&mut votes);
        votes
    }

    /// Rule stretching on scratch clones: drop each rule's tail from its
    /// first non-covering antecedent, weight the surviving prefix by
    /// `(kept + 1) / (before + 2)` times its stored prefix confidence,
    /// and take the maximum per class. The model itself is not touched.
    fn stretch_votes(&self, inst: &Instance, votes: &mut [f64]) {
        for rule in &self.ruleset {
            let mut stretched = rule.clone();
            let before = stretched.size() as f64;

            let antds = stretched.antds_mut();
            if let Some(first_fail) = (0..antds.len())
                .find(|&j| antds[j].membership(inst) == 0.0)
            {
                antds.truncate(first_fail);
            }
            if !stretched.has_antds() {
                continue;
            }

            let after = stretched.size() as f64;
            let weight = (after + 1.0) / (before + 2.0);
            let vote =
                stretched.confidence() * weight * stretched.membership(inst, self.options.t_norm);
            if vote >= votes[stretched.consequent()] {
                votes[stretched.consequent()] = vote;
            }
        }
    }
}

impl fmt::Display for Furia {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Some(schema) = &self.schema else {
            return write!(f, "FURIA: No model built yet.");
        };

        writeln!(f, "FURIA rules:")?;
        writeln!(f, "===========")?;
        writeln!(f)?;
        let mut flat = 0;
        for class_stats in &self.ruleset_stats {
            for _ in 0..class_stats.num_rules() {
                let rule = &self.ruleset[flat];
                let cf = (rule.confidence() * 100.0).round() / 100.0;
                writeln!(f, "{} (CF = {cf})", rule.describe(schema))?;
                flat += 1;
            }
        }
        writeln!(f)?;
        writeln!(f, "Number of Rules : {}", self.ruleset.len())
    }
}

#[cfg(test)]
#[path = "classifier_tests.rs"]
mod tests;
