//! Antecedents: single-attribute tests with fuzzy membership.

use serde::{Deserialize, Serialize};

use crate::dataset::{Dataset, Instance, Schema};
use crate::util::log2;

/// Which bag of the numeric split the antecedent keeps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Side {
    /// Keep values at or below the split point (first bag).
    Low,
    /// Keep values at or above the split point (second bag).
    High,
}

/// Numeric half-space test, optionally widened into a trapezoid.
///
/// Crisp: membership is the indicator of the half-space. Fuzzy: membership
/// falls linearly from 1 at `split_point` to 0 at `support_bound`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NumericTest {
    /// Which side of the split is kept.
    pub side: Side,
    /// Boundary of the membership-1 core.
    pub split_point: f64,
    /// Outer edge of the fuzzy support; equals `split_point` when crisp.
    pub support_bound: f64,
    /// Whether a meaningful support bound was assigned.
    pub fuzzy: bool,
}

impl NumericTest {
    fn membership(&self, v: f64) -> f64 {
        match self.side {
            Side::Low => {
                if v <= self.split_point {
                    1.0
                } else if self.fuzzy && v < self.support_bound {
                    1.0 - (v - self.split_point) / (self.support_bound - self.split_point)
                } else {
                    0.0
                }
            }
            Side::High => {
                if v >= self.split_point {
                    1.0
                } else if self.fuzzy && v > self.support_bound {
                    1.0 - (self.split_point - v) / (self.split_point - self.support_bound)
                } else {
                    0.0
                }
            }
        }
    }
}

/// The attribute test carried by an antecedent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AntdTest {
    /// Equality against one nominal value.
    Nominal {
        /// Index of the matched value.
        value: usize,
    },
    /// Numeric half-space / trapezoid.
    Numeric(NumericTest),
}

/// Statistics recorded while an antecedent candidate is grown.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct AntdStats {
    /// Best information gain achieved on the growing data.
    pub max_info_gain: f64,
    /// Laplace-smoothed accuracy rate of the winning bag.
    pub accu_rate: f64,
    /// Accurate weight in the winning bag.
    pub accu: f64,
    /// Covered weight of the winning bag.
    pub cover: f64,
}

/// One test in a rule, on one attribute.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Antecedent {
    /// Index of the tested attribute.
    pub attr: usize,
    /// Nominal or numeric test.
    pub test: AntdTest,
    /// Grow-time statistics of this antecedent.
    pub stats: AntdStats,
    /// Confidence of the rule prefix ending at this antecedent.
    pub confidence: f64,
}

impl Antecedent {
    /// A fresh numeric antecedent for `attr`; the split is found by
    /// [`Antecedent::split_data`].
    pub fn numeric(attr: usize) -> Self {
        Self {
            attr,
            test: AntdTest::Numeric(NumericTest {
                side: Side::Low,
                split_point: f64::NAN,
                support_bound: f64::NAN,
                fuzzy: false,
            }),
            stats: AntdStats::default(),
            confidence: 0.0,
        }
    }

    /// A fresh nominal antecedent for `attr`.
    pub fn nominal(attr: usize) -> Self {
        Self {
            attr,
            test: AntdTest::Nominal { value: 0 },
            stats: AntdStats::default(),
            confidence: 0.0,
        }
    }

    /// Whether the test is numeric.
    pub fn is_numeric(&self) -> bool {
        matches!(self.test, AntdTest::Numeric(_))
    }

    /// The numeric test, if any.
    pub fn as_numeric(&self) -> Option<&NumericTest> {
        match &self.test {
            AntdTest::Numeric(num) => Some(num),
            AntdTest::Nominal { .. } => None,
        }
    }

    /// Mutable access to the numeric test, if any.
    pub fn as_numeric_mut(&mut self) -> Option<&mut NumericTest> {
        match &mut self.test {
            AntdTest::Numeric(num) => Some(num),
            AntdTest::Nominal { .. } => None,
        }
    }

    /// Index of the bag this antecedent keeps: the split side for numeric
    /// tests, the matched value for nominal ones. Doubles as the value key
    /// for redundant-antecedent removal.
    pub fn bag_value(&self) -> usize {
        match &self.test {
            AntdTest::Nominal { value } => *value,
            AntdTest::Numeric(num) => match num.side {
                Side::Low => 0,
                Side::High => 1,
            },
        }
    }

    /// Membership of `inst` in this antecedent, in `[0, 1]`. Missing
    /// values have membership 0.
    pub fn membership(&self, inst: &Instance) -> f64 {
        let Some(v) = inst.value(self.attr) else {
            return 0.0;
        };
        match &self.test {
            AntdTest::Nominal { value } => {
                if v as usize == *value {
                    1.0
                } else {
                    0.0
                }
            }
            AntdTest::Numeric(num) => num.membership(v),
        }
    }

    /// Split `data` into bags, recording the best-gain statistics for this
    /// antecedent. Returns `None` when a numeric attribute is missing on
    /// every instance. The bag this antecedent keeps is `bag_value()`.
    pub fn split_data(
        &mut self,
        data: &Dataset,
        def_acc_rate: f64,
        class: usize,
    ) -> Option<Vec<Dataset>> {
        let attr = self.attr;
        match &mut self.test {
            AntdTest::Numeric(num) => {
                split_numeric(attr, num, &mut self.stats, data, def_acc_rate, class)
            }
            AntdTest::Nominal { value } => Some(split_nominal(
                attr,
                value,
                &mut self.stats,
                data,
                def_acc_rate,
                class,
            )),
        }
    }

    /// Render this antecedent against `schema`, trapezoid intervals for
    /// fuzzy numeric tests.
    pub fn describe(&self, schema: &Schema) -> String {
        let name = &schema.attribute(self.attr).name;
        match &self.test {
            AntdTest::Nominal { value } => {
                format!("{name} = {}", schema.attribute(self.attr).value_name(*value))
            }
            AntdTest::Numeric(num) => match num.side {
                Side::Low => {
                    if num.fuzzy {
                        format!(
                            "{name} in [-inf, -inf, {}, {}]",
                            fmt_num(num.split_point),
                            fmt_num(num.support_bound)
                        )
                    } else {
                        format!("{name} in [-inf, {}]", fmt_num(num.split_point))
                    }
                }
                Side::High => {
                    if num.fuzzy {
                        format!(
                            "{name} in [{}, {}, inf, inf]",
                            fmt_num(num.support_bound),
                            fmt_num(num.split_point)
                        )
                    } else {
                        format!("{name} in [{}, inf]", fmt_num(num.split_point))
                    }
                }
            },
        }
    }
}

/// Format a number with up to six decimals, trailing zeros trimmed.
pub(crate) fn fmt_num(x: f64) -> String {
    let mut s = format!("{x:.6}");
    if s.contains('.') {
        while s.ends_with('0') {
            s.pop();
        }
        if s.ends_with('.') {
            s.pop();
        }
    }
    s
}

/// Scan the sorted attribute values for the binary split with the best
/// Laplace-smoothed information gain. Instances missing the attribute are
/// shunted past the end and belong to neither bag.
fn split_numeric(
    attr: usize,
    num: &mut NumericTest,
    stats: &mut AntdStats,
    data: &Dataset,
    def_acc_rate: f64,
    class: usize,
) -> Option<Vec<Dataset>> {
    let mut sorted = data.clone();
    sorted.sort_by_attribute(attr);

    let mut total = sorted.len();
    let mut snd_cover = 0.0;
    let mut snd_accu = 0.0;
    for (i, inst) in sorted.instances().iter().enumerate() {
        if inst.is_missing(attr) {
            total = i;
            break;
        }
        snd_cover += inst.weight();
        if sorted.class_of(inst) == Some(class) {
            snd_accu += inst.weight();
        }
    }
    if total == 0 {
        return None;
    }

    let vals: Vec<f64> = sorted.instances()[..total]
        .iter()
        .map(|inst| inst.value(attr).unwrap_or(f64::NAN))
        .collect();

    *stats = AntdStats::default();
    num.side = Side::Low;
    num.split_point = vals[total - 1];

    let mut final_split = 1;
    let mut fst_cover = 0.0;
    let mut fst_accu = 0.0;
    let mut prev = 0;

    for split in 1..=total {
        if split < total && vals[split] <= vals[prev] {
            continue; // cannot split within a run of equal values
        }

        for y in prev..split {
            let inst = sorted.instance(y);
            fst_cover += inst.weight();
            if sorted.class_of(inst) == Some(class) {
                fst_accu += inst.weight();
            }
        }

        let fst_rate = (fst_accu + 1.0) / (fst_cover + 1.0);
        let snd_rate = (snd_accu + 1.0) / (snd_cover + 1.0);
        let fst_gain = fst_accu * (log2(fst_rate) - log2(def_acc_rate));
        let snd_gain = snd_accu * (log2(snd_rate) - log2(def_acc_rate));

        let (is_first, gain, rate, accu, cover) = if fst_gain > snd_gain {
            (true, fst_gain, fst_rate, fst_accu, fst_cover)
        } else {
            (false, snd_gain, snd_rate, snd_accu, snd_cover)
        };

        if gain > stats.max_info_gain {
            num.split_point = vals[prev];
            num.side = if is_first { Side::Low } else { Side::High };
            stats.max_info_gain = gain;
            stats.accu_rate = rate;
            stats.accu = accu;
            stats.cover = cover;
            final_split = if is_first { split } else { prev };
        }

        for y in prev..split {
            let inst = sorted.instance(y);
            snd_cover -= inst.weight();
            if sorted.class_of(inst) == Some(class) {
                snd_accu -= inst.weight();
            }
        }
        prev = split;
    }

    Some(vec![
        sorted.range(0, final_split),
        sorted.range(final_split, total),
    ])
}

/// Bucket the data per nominal value; instances missing the attribute are
/// dropped from every bag.
fn split_nominal(
    attr: usize,
    value: &mut usize,
    stats: &mut AntdStats,
    data: &Dataset,
    def_acc_rate: f64,
    class: usize,
) -> Vec<Dataset> {
    let num_bags = data.schema().attribute(attr).num_values();
    let mut bags: Vec<Dataset> = (0..num_bags).map(|_| data.empty_like()).collect();
    let mut accurate = vec![0.0; num_bags];
    let mut coverage = vec![0.0; num_bags];

    for inst in data.instances() {
        if let Some(v) = inst.value(attr) {
            let v = v as usize;
            bags[v].push(inst.clone());
            coverage[v] += inst.weight();
            if data.class_of(inst) == Some(class) {
                accurate[v] += inst.weight();
            }
        }
    }

    *stats = AntdStats::default();
    for x in 0..num_bags {
        let t = coverage[x] + 1.0;
        let p = accurate[x] + 1.0;
        let gain = accurate[x] * (log2(p / t) - log2(def_acc_rate));
        if gain > stats.max_info_gain {
            stats.max_info_gain = gain;
            stats.cover = coverage[x];
            stats.accu = accurate[x];
            stats.accu_rate = p / t;
            *value = x;
        }
    }

    bags
}
