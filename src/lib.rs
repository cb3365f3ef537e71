//! Borroso: fuzzy unordered rule induction in pure Rust.
//!
//! Borroso learns an unordered set of IF-THEN rules from labeled tabular
//! data with a RIPPER-style separate-and-conquer loop, widens numeric
//! antecedents into trapezoidal fuzzy sets by purity maximization, and
//! predicts class distributions with T-norm aggregation. Instances no
//! rule covers are handled by rule stretching, an apriori vote, or
//! rejection.
//!
//! # Quick Start
//!
//! ```
//! use borroso::prelude::*;
//!
//! // One numeric attribute, class a at or below 0.5, b above.
//! let schema = Schema::new(
//!     vec![
//!         Attribute::numeric("x"),
//!         Attribute::nominal("class", vec!["a", "b"]),
//!     ],
//!     1,
//! )
//! .unwrap();
//! let mut data = Dataset::new(schema);
//! for i in 0..40 {
//!     let x = i as f64 / 40.0;
//!     let class = if x <= 0.5 { 0.0 } else { 1.0 };
//!     data.push(Instance::new(vec![Some(x), Some(class)]));
//! }
//!
//! // Train and predict.
//! let mut model = Furia::new();
//! model.fit(&data).unwrap();
//! let dist = model.predict_distribution(&Instance::new(vec![Some(0.2), None]));
//! assert!(dist[0] > dist[1]);
//! ```
//!
//! # Modules
//!
//! - [`dataset`]: attributes, instances and datasets
//! - [`rule`]: rules and their antecedents
//! - [`stats`]: ruleset coverage statistics and description lengths
//! - [`classifier`]: the [`classifier::Furia`] learner
//! - [`options`]: configuration and the flag surface

pub mod classifier;
pub mod dataset;
pub mod error;
pub mod options;
pub mod prelude;
pub mod rule;
pub mod stats;

mod util;

pub use classifier::{ClassRuleStats, Furia};
pub use error::{BorrosoError, Result};
pub use options::{Options, TNorm, UncovAction};
