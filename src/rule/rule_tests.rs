use super::*;
use crate::dataset::{Attribute, Dataset, Instance, Schema};

fn one_numeric_schema() -> Schema {
    Schema::new(
        vec![
            Attribute::numeric("x"),
            Attribute::nominal("class", vec!["a", "b"]),
        ],
        1,
    )
    .expect("valid schema")
}

fn points(data: &mut Dataset, xs: &[(f64, usize)]) {
    for &(x, c) in xs {
        data.push(Instance::new(vec![Some(x), Some(c as f64)]));
    }
}

fn xor_schema() -> Schema {
    Schema::new(
        vec![
            Attribute::nominal("a", vec!["0", "1"]),
            Attribute::nominal("b", vec!["0", "1"]),
            Attribute::nominal("class", vec!["0", "1"]),
        ],
        2,
    )
    .expect("valid schema")
}

#[test]
fn test_grow_separable_single_antecedent() {
    let mut data = Dataset::new(one_numeric_schema());
    points(
        &mut data,
        &[
            (0.1, 0),
            (0.2, 0),
            (0.3, 0),
            (0.4, 0),
            (0.6, 1),
            (0.7, 1),
            (0.8, 1),
            (0.9, 1),
        ],
    );

    let mut rule = Rule::new(0);
    rule.grow(&data, 2.0);
    assert_eq!(rule.size(), 1);
    let num = rule.antds()[0].as_numeric().expect("numeric antecedent");
    assert_eq!(num.side, Side::Low);
    assert_eq!(num.split_point, 0.4);
    // A perfectly pure split stops further growth.
    for inst in data.instances() {
        let covered = rule.covers(inst);
        let is_a = data.class_of(inst) == Some(0);
        assert_eq!(covered, is_a);
    }
}

#[test]
fn test_grow_respects_min_no() {
    let mut data = Dataset::new(one_numeric_schema());
    // Only a single positive instance: any split covering it accurately
    // stays below a min weight of 2.
    points(&mut data, &[(0.1, 0), (0.6, 1), (0.7, 1), (0.8, 1)]);

    let mut rule = Rule::new(0);
    rule.grow(&data, 2.0);
    assert_eq!(rule.size(), 0);

    let mut rule = Rule::new(0);
    rule.grow(&data, 1.0);
    assert_eq!(rule.size(), 1);
}

#[test]
fn test_grow_xor_uses_both_attributes() {
    let mut data = Dataset::new(xor_schema());
    for _ in 0..5 {
        for (a, b) in [(0.0, 0.0), (0.0, 1.0), (1.0, 0.0), (1.0, 1.0)] {
            let class = if a != b { 1.0 } else { 0.0 };
            data.push(Instance::new(vec![Some(a), Some(b), Some(class)]));
        }
    }

    let mut rule = Rule::new(1);
    rule.grow(&data, 2.0);
    assert_eq!(rule.size(), 2);
    // Both nominal attributes are tested, each at most once.
    let attrs: Vec<usize> = rule.antds().iter().map(|antd| antd.attr).collect();
    assert!(attrs.contains(&0) && attrs.contains(&1));
    for inst in data.instances() {
        if rule.covers(inst) {
            assert_eq!(data.class_of(inst), Some(1));
        }
    }
}

#[test]
fn test_prune_truncates_harmful_tail() {
    let mut data = Dataset::new(one_numeric_schema());
    points(
        &mut data,
        &[(0.1, 0), (0.2, 0), (0.3, 0), (0.4, 0), (0.7, 1), (0.8, 1)],
    );

    // Hand-built rule: a good first antecedent and a tail that covers
    // almost nothing on the pruning data.
    let mut rule = Rule::new(0);
    rule.antds_mut().push(Antecedent {
        attr: 0,
        test: AntdTest::Numeric(NumericTest {
            side: Side::Low,
            split_point: 0.4,
            support_bound: 0.4,
            fuzzy: false,
        }),
        stats: AntdStats::default(),
        confidence: 0.0,
    });
    rule.antds_mut().push(Antecedent {
        attr: 0,
        test: AntdTest::Numeric(NumericTest {
            side: Side::Low,
            split_point: 0.1,
            support_bound: 0.1,
            fuzzy: false,
        }),
        stats: AntdStats::default(),
        confidence: 0.0,
    });

    rule.prune(&data, false);
    assert_eq!(rule.size(), 1);
    assert_eq!(rule.antds()[0].as_numeric().expect("numeric").split_point, 0.4);
}

#[test]
fn test_prune_keeps_rule_when_no_prefix_improves() {
    let mut data = Dataset::new(one_numeric_schema());
    // Pruning data where the rule is useless: baseline wins everywhere.
    points(&mut data, &[(0.1, 1), (0.2, 1), (0.3, 1), (0.4, 1)]);

    let mut rule = Rule::new(0);
    rule.antds_mut().push(Antecedent {
        attr: 0,
        test: AntdTest::Numeric(NumericTest {
            side: Side::Low,
            split_point: 0.3,
            support_bound: 0.3,
            fuzzy: false,
        }),
        stats: AntdStats::default(),
        confidence: 0.0,
    });

    rule.prune(&data, false);
    assert_eq!(rule.size(), 1);
}

#[test]
fn test_fuzzify_widens_towards_other_class() {
    let mut data = Dataset::new(one_numeric_schema());
    points(
        &mut data,
        &[
            (0.1, 0),
            (0.2, 0),
            (0.3, 0),
            (0.5, 0),
            (0.55, 0),
            (0.6, 1),
            (0.7, 1),
            (0.8, 1),
        ],
    );

    let mut rule = Rule::new(0);
    rule.antds_mut().push(Antecedent {
        attr: 0,
        test: AntdTest::Numeric(NumericTest {
            side: Side::Low,
            split_point: 0.5,
            support_bound: 0.5,
            fuzzy: false,
        }),
        stats: AntdStats::default(),
        confidence: 0.0,
    });

    rule.fuzzify(&data, true);
    let num = rule.antds()[0].as_numeric().expect("numeric");
    assert!(num.fuzzy);
    assert!(num.support_bound > 0.5);
    // The trapezoid must stay monotone: membership falls moving outward.
    let m_in = rule.membership(&Instance::new(vec![Some(0.5), None]), TNorm::Product);
    let m_mid = rule.membership(&Instance::new(vec![Some(0.52), None]), TNorm::Product);
    let m_out = rule.membership(&Instance::new(vec![Some(0.9), None]), TNorm::Product);
    assert_eq!(m_in, 1.0);
    assert!(m_mid < 1.0 && m_mid > 0.0);
    assert_eq!(m_out, 0.0);
}

#[test]
fn test_confidences_per_prefix() {
    let mut data = Dataset::new(one_numeric_schema());
    points(
        &mut data,
        &[(0.1, 0), (0.2, 0), (0.3, 0), (0.6, 1), (0.7, 1), (0.8, 1)],
    );
    let apriori = data.class_weights();

    let mut rule = Rule::new(0);
    rule.antds_mut().push(Antecedent {
        attr: 0,
        test: AntdTest::Numeric(NumericTest {
            side: Side::Low,
            split_point: 0.3,
            support_bound: 0.3,
            fuzzy: false,
        }),
        stats: AntdStats::default(),
        confidence: 0.0,
    });

    rule.calculate_confidences(&data, &apriori, TNorm::Product);
    // m-estimate with acc = cov = 3, prior = 0.5, m = 2:
    // (3 + 2 * 0.5) / (3 + 2) = 0.8.
    assert!((rule.confidence() - 0.8).abs() < 1e-12);
}

#[test]
fn test_confidence_grows_along_well_separated_antecedents() {
    // Class a occupies the lower-left quadrant. The one-antecedent
    // prefix still covers upper-left b instances, so each further
    // antecedent can only sharpen the m-estimate.
    let schema = Schema::new(
        vec![
            Attribute::numeric("x"),
            Attribute::numeric("y"),
            Attribute::nominal("class", vec!["a", "b"]),
        ],
        2,
    )
    .expect("valid schema");
    let mut data = Dataset::new(schema);
    for i in 0..8 {
        for j in 0..8 {
            let x = i as f64 / 8.0;
            let y = j as f64 / 8.0;
            let class = if x <= 0.5 && y <= 0.5 { 0.0 } else { 1.0 };
            data.push(Instance::new(vec![Some(x), Some(y), Some(class)]));
        }
    }
    let apriori = data.class_weights();

    let mut rule = Rule::new(0);
    rule.grow(&data, 2.0);
    assert!(rule.size() >= 2);
    rule.calculate_confidences(&data, &apriori, TNorm::Product);

    let confidences: Vec<f64> =
        rule.antds().iter().map(|antd| antd.confidence).collect();
    for pair in confidences.windows(2) {
        assert!(
            pair[1] >= pair[0],
            "confidence dropped along growth order: {confidences:?}"
        );
    }
}

#[test]
fn test_empty_rule_confidence_is_nan() {
    let rule = Rule::new(0);
    assert!(rule.confidence().is_nan());
    // An empty conjunction covers everything.
    assert!(rule.covers(&Instance::new(vec![Some(1.0), None])));
}

#[test]
fn test_membership_product_vs_min() {
    let mut rule = Rule::new(0);
    for split in [0.5, 0.6] {
        rule.antds_mut().push(Antecedent {
            attr: 0,
            test: AntdTest::Numeric(NumericTest {
                side: Side::Low,
                split_point: split,
                support_bound: split + 0.4,
                fuzzy: true,
            }),
            stats: AntdStats::default(),
            confidence: 0.0,
        });
    }

    let inst = Instance::new(vec![Some(0.7), None]);
    let prod = rule.membership(&inst, TNorm::Product);
    let min = rule.membership(&inst, TNorm::Minimum);
    assert!(prod > 0.0 && min > 0.0);
    assert!(prod <= min);
    // Both agree with the boolean coverage on the zero boundary.
    assert_eq!(prod > 0.0, rule.covers(&inst));

    let outside = Instance::new(vec![Some(2.0), None]);
    assert_eq!(rule.membership(&outside, TNorm::Product), 0.0);
    assert_eq!(rule.membership(&outside, TNorm::Minimum), 0.0);
    assert!(!rule.covers(&outside));
}

#[test]
fn test_describe_formats() {
    let schema = one_numeric_schema();
    let mut rule = Rule::new(1);
    rule.antds_mut().push(Antecedent {
        attr: 0,
        test: AntdTest::Numeric(NumericTest {
            side: Side::High,
            split_point: 0.5,
            support_bound: 0.5,
            fuzzy: false,
        }),
        stats: AntdStats::default(),
        confidence: 0.0,
    });
    assert_eq!(rule.describe(&schema), "(x in [0.5, inf]) => class=b");

    let empty = Rule::new(0);
    assert_eq!(empty.describe(&schema), " => class=a");
}
