//! Learner configuration and the command-line option surface.
//!
//! The recognized flags mirror the classic rule-learner option table:
//! `-F` folds, `-N` minimum weight, `-O` optimization runs, `-S` seed,
//! `-E` (do NOT check the error rate in the stop test), `-s` uncovered
//! action, `-p` T-norm, `-D` debug.

use clap::Parser;
use serde::{Deserialize, Serialize};

use crate::error::{BorrosoError, Result};

/// Fuzzy AND-operator used to aggregate antecedent memberships.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TNorm {
    /// Product T-norm (standard).
    #[default]
    Product,
    /// Minimum T-norm.
    Minimum,
}

impl TNorm {
    fn from_flag(v: u8) -> Result<Self> {
        match v {
            0 => Ok(Self::Product),
            1 => Ok(Self::Minimum),
            other => Err(BorrosoError::InvalidOptions(format!(
                "unknown T-norm {other} (expected 0 or 1)"
            ))),
        }
    }
}

/// What to do with an instance no rule covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum UncovAction {
    /// Apply rule stretching (standard).
    #[default]
    Stretch,
    /// Vote for the most frequent class.
    Apriori,
    /// Reject the decision and abstain.
    Reject,
}

impl UncovAction {
    fn from_flag(v: u8) -> Result<Self> {
        match v {
            0 => Ok(Self::Stretch),
            1 => Ok(Self::Apriori),
            2 => Ok(Self::Reject),
            other => Err(BorrosoError::InvalidOptions(format!(
                "unknown uncovered action {other} (expected 0, 1 or 2)"
            ))),
        }
    }
}

/// All tunables of the learner, with their defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Options {
    /// Folds for reduced-error pruning; one fold prunes, the rest grow.
    pub folds: usize,
    /// Minimum total weight of the instances covered by a split.
    pub min_no: f64,
    /// Number of optimization runs.
    pub optimizations: usize,
    /// Seed for stratification and shuffling.
    pub seed: u64,
    /// Whether the error rate >= 0.5 test is part of the stop criterion.
    pub check_error_rate: bool,
    /// Action for uncovered instances.
    pub uncov_action: UncovAction,
    /// Fuzzy AND-operator.
    pub t_norm: TNorm,
    /// Emit diagnostic trace events while training.
    pub debug: bool,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            folds: 3,
            min_no: 2.0,
            optimizations: 2,
            seed: 1,
            check_error_rate: true,
            uncov_action: UncovAction::default(),
            t_norm: TNorm::default(),
            debug: false,
        }
    }
}

/// Raw flag surface; values are translated into [`Options`] after parsing.
#[derive(Parser, Debug)]
#[command(name = "borroso", disable_help_flag = true, no_binary_name = true)]
struct RawOptions {
    /// Number of folds for REP; one fold is used as pruning set.
    #[arg(short = 'F', default_value_t = 3)]
    folds: usize,

    /// Minimal weight of instances within a split.
    #[arg(short = 'N', default_value_t = 2.0)]
    min_no: f64,

    /// Number of optimization runs.
    #[arg(short = 'O', default_value_t = 2)]
    optimizations: usize,

    /// Seed of randomization.
    #[arg(short = 'S', default_value_t = 1)]
    seed: u64,

    /// Do NOT check the error rate >= 0.5 in the stopping criterion.
    #[arg(short = 'E')]
    no_check_error_rate: bool,

    /// Action performed for uncovered instances (0 stretch, 1 apriori, 2 reject).
    #[arg(short = 's', default_value_t = 0)]
    uncov_action: u8,

    /// T-norm used as fuzzy AND-operator (0 product, 1 min).
    #[arg(short = 'p', default_value_t = 0)]
    t_norm: u8,

    /// Turn on debug output.
    #[arg(short = 'D')]
    debug: bool,
}

impl Options {
    /// Parse the single-character flag surface, e.g.
    /// `["-F", "4", "-N", "1.5", "-E"]`. Unknown flags and unparseable
    /// values are rejected before any training happens.
    pub fn parse_slice<S: AsRef<str>>(args: &[S]) -> Result<Self> {
        let raw = RawOptions::try_parse_from(args.iter().map(AsRef::as_ref))
            .map_err(|e| BorrosoError::InvalidOptions(e.to_string()))?;
        if raw.folds == 0 {
            return Err(BorrosoError::InvalidOptions(
                "folds must be at least 1".to_string(),
            ));
        }
        Ok(Self {
            folds: raw.folds,
            min_no: raw.min_no,
            optimizations: raw.optimizations,
            seed: raw.seed,
            check_error_rate: !raw.no_check_error_rate,
            uncov_action: UncovAction::from_flag(raw.uncov_action)?,
            t_norm: TNorm::from_flag(raw.t_norm)?,
            debug: raw.debug,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let opts = Options::default();
        assert_eq!(opts.folds, 3);
        assert_eq!(opts.min_no, 2.0);
        assert_eq!(opts.optimizations, 2);
        assert_eq!(opts.seed, 1);
        assert!(opts.check_error_rate);
        assert_eq!(opts.uncov_action, UncovAction::Stretch);
        assert_eq!(opts.t_norm, TNorm::Product);
        assert!(!opts.debug);
    }

    #[test]
    fn test_parse_empty_is_defaults() {
        let opts = Options::parse_slice::<&str>(&[]).unwrap();
        assert_eq!(opts, Options::default());
    }

    #[test]
    fn test_parse_all_flags() {
        let opts =
            Options::parse_slice(&["-F", "4", "-N", "1.5", "-O", "3", "-S", "7", "-E", "-s", "2",
                "-p", "1", "-D"])
            .unwrap();
        assert_eq!(opts.folds, 4);
        assert_eq!(opts.min_no, 1.5);
        assert_eq!(opts.optimizations, 3);
        assert_eq!(opts.seed, 7);
        assert!(!opts.check_error_rate);
        assert_eq!(opts.uncov_action, UncovAction::Reject);
        assert_eq!(opts.t_norm, TNorm::Minimum);
        assert!(opts.debug);
    }

    #[test]
    fn test_parse_rejects_unknown_flag() {
        assert!(matches!(
            Options::parse_slice(&["-X", "1"]),
            Err(BorrosoError::InvalidOptions(_))
        ));
    }

    #[test]
    fn test_parse_rejects_bad_value() {
        assert!(matches!(
            Options::parse_slice(&["-F", "three"]),
            Err(BorrosoError::InvalidOptions(_))
        ));
        assert!(matches!(
            Options::parse_slice(&["-p", "5"]),
            Err(BorrosoError::InvalidOptions(_))
        ));
        assert!(matches!(
            Options::parse_slice(&["-F", "0"]),
            Err(BorrosoError::InvalidOptions(_))
        ));
    }

    #[test]
    fn test_case_sensitive_short_flags() {
        // -s (uncovered action) and -S (seed) are distinct flags.
        let opts = Options::parse_slice(&["-s", "1", "-S", "42"]).unwrap();
        assert_eq!(opts.uncov_action, UncovAction::Apriori);
        assert_eq!(opts.seed, 42);
    }
}
