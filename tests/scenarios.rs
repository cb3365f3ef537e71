//! End-to-end behavior of the rule learner on small synthetic datasets.

use borroso::prelude::*;

fn binary_numeric_schema() -> Schema {
    Schema::new(
        vec![
            Attribute::numeric("x"),
            Attribute::nominal("class", vec!["a", "b"]),
        ],
        1,
    )
    .expect("valid schema")
}

fn probe(x: f64) -> Instance {
    Instance::new(vec![Some(x), None])
}

#[test]
fn scenario_trivial_binary_axis_aligned() {
    // 100 points on a grid, class a exactly when x <= 0.5.
    let mut data = Dataset::new(binary_numeric_schema());
    for i in 0..100 {
        let x = i as f64 / 100.0;
        let class = if x <= 0.5 { 0.0 } else { 1.0 };
        data.push(Instance::new(vec![Some(x), Some(class)]));
    }

    let mut model = Furia::new();
    model.fit(&data).expect("fit succeeds");

    // Exactly one single-antecedent rule per class.
    assert_eq!(model.num_rules(), 2);
    let consequents: Vec<usize> = model.ruleset().iter().map(Rule::consequent).collect();
    assert_eq!(consequents, vec![0, 1]);
    for rule in model.ruleset() {
        assert_eq!(rule.size(), 1);
    }

    let rule_a = &model.ruleset()[0].antds()[0];
    let num_a = rule_a.as_numeric().expect("numeric antecedent");
    assert_eq!(num_a.side, Side::Low);
    assert_eq!(num_a.split_point, 0.5);

    let rule_b = &model.ruleset()[1].antds()[0];
    let num_b = rule_b.as_numeric().expect("numeric antecedent");
    assert_eq!(num_b.side, Side::High);
    assert!(num_b.split_point > 0.5);

    // Every training point has full membership in its class's rule.
    for inst in data.instances() {
        let class = if inst.value(0).unwrap() <= 0.5 { 0 } else { 1 };
        assert_eq!(model.ruleset()[class].membership(inst, TNorm::Product), 1.0);
    }

    // The boundary point belongs fully to class a.
    assert_eq!(model.predict_distribution(&probe(0.5)), vec![1.0, 0.0]);
    // Just below the boundary nothing changes.
    assert_eq!(model.predict_distribution(&probe(0.4999)), vec![1.0, 0.0]);
    // Just above, mass starts moving to class b.
    let above = model.predict_distribution(&probe(0.5001));
    assert!(above[1] > 0.0);
    assert!(above[0] < 1.0);
}

#[test]
fn scenario_pure_nominal_xor() {
    let schema = Schema::new(
        vec![
            Attribute::nominal("a", vec!["0", "1"]),
            Attribute::nominal("b", vec!["0", "1"]),
            Attribute::nominal("class", vec!["0", "1"]),
        ],
        2,
    )
    .expect("valid schema");
    let mut data = Dataset::new(schema);
    for _ in 0..25 {
        for (a, b) in [(0.0, 0.0), (0.0, 1.0), (1.0, 0.0), (1.0, 1.0)] {
            let class = if a != b { 1.0 } else { 0.0 };
            data.push(Instance::new(vec![Some(a), Some(b), Some(class)]));
        }
    }

    let mut model = Furia::new();
    model.fit(&data).expect("fit succeeds");

    // Each class needs at least one rule testing both attributes.
    for class in 0..2 {
        let full_rules = model
            .ruleset()
            .iter()
            .filter(|r| r.consequent() == class && r.size() == 2)
            .count();
        assert!(full_rules >= 1, "class {class} lacks a two-antecedent rule");
    }

    // 100% training accuracy.
    for (a, b) in [(0.0, 0.0), (0.0, 1.0), (1.0, 0.0), (1.0, 1.0)] {
        let expected = usize::from(a != b);
        let dist =
            model.predict_distribution(&Instance::new(vec![Some(a), Some(b), None]));
        let predicted = (0..2).max_by(|&i, &j| dist[i].total_cmp(&dist[j])).unwrap();
        assert_eq!(predicted, expected, "wrong class for ({a}, {b})");
    }
}

#[test]
fn scenario_fuzzification_under_boundary_noise() {
    // Class a at or below 0.5, class b above, with ~10% of the labels
    // near the boundary flipped.
    let mut data = Dataset::new(binary_numeric_schema());
    for i in 0..100 {
        let x = i as f64 / 100.0;
        let mut class = if x <= 0.5 { 0.0 } else { 1.0 };
        // Noise band around the boundary: every other label flipped.
        if (42..=58).contains(&i) && i % 2 == 0 {
            class = 1.0 - class;
        }
        data.push(Instance::new(vec![Some(x), Some(class)]));
    }

    let mut model = Furia::new();
    model.fit(&data).expect("fit succeeds");

    // The class-a rule carries a fuzzified upper bound strictly past its
    // crisp split.
    let (split, support) = model
        .ruleset()
        .iter()
        .filter(|r| r.consequent() == 0)
        .flat_map(|r| r.antds())
        .filter_map(|antd| antd.as_numeric())
        .find(|num| num.side == Side::Low)
        .map(|num| (num.split_point, num.support_bound))
        .expect("class a keeps a low-side numeric antecedent");
    assert!(support > split, "fuzzification must widen past the split");

    // Somewhere around the boundary the model hedges: overlapping
    // trapezoids (or the apriori fallback on an uncovered gap) leave
    // both classes with mass.
    let hedged = (0..=1000).map(|i| i as f64 / 1000.0).any(|x| {
        let dist = model.predict_distribution(&probe(x));
        dist[0] > 0.0 && dist[0] < 1.0 && dist[1] > 0.0 && dist[1] < 1.0
    });
    assert!(hedged, "no probe yielded a non-degenerate distribution");

    // Every probe stays a distribution.
    let dist = model.predict_distribution(&probe(0.55));
    let sum: f64 = dist.iter().sum();
    assert!((sum - 1.0).abs() < 1e-9);
}

#[test]
fn scenario_empty_class_never_predicted() {
    let schema = Schema::new(
        vec![
            Attribute::numeric("x"),
            Attribute::nominal("class", vec!["a", "b", "c"]),
        ],
        1,
    )
    .expect("valid schema");
    let mut data = Dataset::new(schema);
    for i in 0..30 {
        let x = i as f64 / 30.0;
        let class = if x <= 0.5 { 0.0 } else { 1.0 };
        data.push(Instance::new(vec![Some(x), Some(class)]));
    }

    let mut model = Furia::new();
    model.fit(&data).expect("fit succeeds");

    assert_eq!(model.apriori()[2], 0.0);
    assert!(model.ruleset().iter().all(|r| r.consequent() != 2));
    for x in [0.0, 0.25, 0.5, 0.75, 1.0, 10.0] {
        let dist = model.predict_distribution(&probe(x));
        assert_eq!(dist[2], 0.0, "class c must never receive mass");
    }
}

#[test]
fn scenario_identical_runs_are_identical() {
    let mut data = Dataset::new(binary_numeric_schema());
    for i in 0..60 {
        let x = i as f64 / 60.0;
        let class = if x * x > 0.2 { 1.0 } else { 0.0 };
        data.push(Instance::new(vec![Some(x), Some(class)]));
    }

    let run = |seed: u64| {
        let mut model = Furia::new().with_seed(seed);
        model.fit(&data).expect("fit succeeds");
        let predictions: Vec<Vec<f64>> = (0..100)
            .map(|i| model.predict_distribution(&probe(i as f64 / 100.0)))
            .collect();
        (model.to_string(), predictions)
    };

    assert_eq!(run(1), run(1));
    assert_eq!(run(42), run(42));
}

#[test]
fn scenario_options_roundtrip_through_flags() {
    let options =
        Options::parse_slice(&["-F", "4", "-O", "1", "-S", "9", "-p", "1"]).expect("parse");
    let mut data = Dataset::new(binary_numeric_schema());
    for i in 0..40 {
        let x = i as f64 / 40.0;
        let class = if x <= 0.5 { 0.0 } else { 1.0 };
        data.push(Instance::new(vec![Some(x), Some(class)]));
    }

    let mut model = Furia::with_options(options);
    model.fit(&data).expect("fit succeeds");
    assert!(model.num_rules() > 0);
    let dist = model.predict_distribution(&probe(0.1));
    assert!(dist[0] > dist[1]);
}
