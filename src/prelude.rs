//! Convenience re-exports for common usage.
//!
//! # Usage
//!
//! ```
//! use borroso::prelude::*;
//! ```

pub use crate::classifier::{ClassRuleStats, Furia};
pub use crate::dataset::{Attribute, AttributeKind, Dataset, Instance, Schema};
pub use crate::error::{BorrosoError, Result};
pub use crate::options::{Options, TNorm, UncovAction};
pub use crate::rule::{Antecedent, Rule, Side};
