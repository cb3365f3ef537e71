//! Tabular data: attributes, instances and the dataset they live in.
//!
//! The learner only needs a thin contract from its data: iterate weighted
//! instances, sort stably by one attribute, drop rows with a missing
//! value, split by index range and count per-class weight. Nominal values
//! are stored as the index into the attribute's value list; a missing
//! value is `None`.

use std::cmp::Ordering;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::{BorrosoError, Result};

/// Kind of a tabular attribute.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AttributeKind {
    /// Real-valued (dates are represented as numeric timestamps).
    Numeric,
    /// Finite ordered value set, referenced by index.
    Nominal(Vec<String>),
}

/// One column of the schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attribute {
    /// Column name, used for reporting.
    pub name: String,
    /// Numeric or nominal.
    pub kind: AttributeKind,
}

impl Attribute {
    /// A numeric attribute.
    pub fn numeric(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: AttributeKind::Numeric,
        }
    }

    /// A nominal attribute with the given value names.
    pub fn nominal<S: Into<String>>(name: impl Into<String>, values: Vec<S>) -> Self {
        Self {
            name: name.into(),
            kind: AttributeKind::Nominal(values.into_iter().map(Into::into).collect()),
        }
    }

    /// Whether this attribute is numeric.
    pub fn is_numeric(&self) -> bool {
        matches!(self.kind, AttributeKind::Numeric)
    }

    /// Whether this attribute is nominal.
    pub fn is_nominal(&self) -> bool {
        !self.is_numeric()
    }

    /// Number of nominal values; 0 for numeric attributes.
    pub fn num_values(&self) -> usize {
        match &self.kind {
            AttributeKind::Numeric => 0,
            AttributeKind::Nominal(values) => values.len(),
        }
    }

    /// Name of the `index`-th nominal value.
    pub fn value_name(&self, index: usize) -> &str {
        match &self.kind {
            AttributeKind::Numeric => "",
            AttributeKind::Nominal(values) => &values[index],
        }
    }
}

/// Column layout shared by every instance of a dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Schema {
    attributes: Vec<Attribute>,
    class_index: usize,
}

impl Schema {
    /// Create a schema; `class_index` designates the class attribute.
    pub fn new(attributes: Vec<Attribute>, class_index: usize) -> Result<Self> {
        if class_index >= attributes.len() {
            return Err(BorrosoError::capability(format!(
                "class index {class_index} out of range for {} attributes",
                attributes.len()
            )));
        }
        Ok(Self {
            attributes,
            class_index,
        })
    }

    /// All attributes, class included.
    pub fn attributes(&self) -> &[Attribute] {
        &self.attributes
    }

    /// The attribute at `index`.
    pub fn attribute(&self, index: usize) -> &Attribute {
        &self.attributes[index]
    }

    /// Index of the class attribute.
    pub fn class_index(&self) -> usize {
        self.class_index
    }

    /// The class attribute.
    pub fn class_attribute(&self) -> &Attribute {
        &self.attributes[self.class_index]
    }

    /// Number of class values; 0 when the class attribute is numeric.
    pub fn num_classes(&self) -> usize {
        self.class_attribute().num_values()
    }

    /// Number of attributes, class included.
    pub fn num_attributes(&self) -> usize {
        self.attributes.len()
    }
}

/// One weighted row. Values are positional per the schema; `None` marks
/// a missing value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Instance {
    values: Vec<Option<f64>>,
    weight: f64,
}

impl Instance {
    /// An instance with unit weight.
    pub fn new(values: Vec<Option<f64>>) -> Self {
        Self {
            values,
            weight: 1.0,
        }
    }

    /// An instance with an explicit non-negative weight.
    pub fn with_weight(values: Vec<Option<f64>>, weight: f64) -> Self {
        Self { values, weight }
    }

    /// Value of attribute `index`, `None` when missing.
    pub fn value(&self, index: usize) -> Option<f64> {
        self.values[index]
    }

    /// Whether attribute `index` is missing.
    pub fn is_missing(&self, index: usize) -> bool {
        self.values[index].is_none()
    }

    /// Instance weight.
    pub fn weight(&self) -> f64 {
        self.weight
    }

    /// Number of stored values.
    pub fn num_values(&self) -> usize {
        self.values.len()
    }
}

/// A schema plus its weighted instances. Structural copies share the
/// schema; the induction loop re-partitions by copy and never aliases
/// instance storage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    schema: Arc<Schema>,
    instances: Vec<Instance>,
}

impl Dataset {
    /// An empty dataset over `schema`.
    pub fn new(schema: Schema) -> Self {
        Self {
            schema: Arc::new(schema),
            instances: Vec::new(),
        }
    }

    /// An empty dataset sharing this dataset's schema.
    pub fn empty_like(&self) -> Self {
        Self {
            schema: Arc::clone(&self.schema),
            instances: Vec::new(),
        }
    }

    /// Append an instance. The value count must match the schema.
    pub fn push(&mut self, instance: Instance) {
        debug_assert_eq!(instance.num_values(), self.schema.num_attributes());
        self.instances.push(instance);
    }

    /// The shared schema.
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// A handle to the shared schema.
    pub fn schema_handle(&self) -> Arc<Schema> {
        Arc::clone(&self.schema)
    }

    /// Number of instances.
    pub fn len(&self) -> usize {
        self.instances.len()
    }

    /// Whether the dataset holds no instances.
    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }

    /// All instances in order.
    pub fn instances(&self) -> &[Instance] {
        &self.instances
    }

    /// The `index`-th instance.
    pub fn instance(&self, index: usize) -> &Instance {
        &self.instances[index]
    }

    /// Index of the class attribute.
    pub fn class_index(&self) -> usize {
        self.schema.class_index()
    }

    /// Number of class values.
    pub fn num_classes(&self) -> usize {
        self.schema.num_classes()
    }

    /// Class value of `instance` as an index, `None` when missing.
    pub fn class_of(&self, instance: &Instance) -> Option<usize> {
        instance.value(self.schema.class_index()).map(|v| v as usize)
    }

    /// Total instance weight.
    pub fn sum_of_weights(&self) -> f64 {
        self.instances.iter().map(Instance::weight).sum()
    }

    /// Per-class weight totals over instances with a known class.
    pub fn class_weights(&self) -> Vec<f64> {
        let mut weights = vec![0.0; self.num_classes()];
        for inst in &self.instances {
            if let Some(class) = self.class_of(inst) {
                weights[class] += inst.weight();
            }
        }
        weights
    }

    /// Stable ascending sort by attribute `attr`; missing values go last.
    pub fn sort_by_attribute(&mut self, attr: usize) {
        self.instances
            .sort_by(|a, b| match (a.value(attr), b.value(attr)) {
                (Some(x), Some(y)) => x.partial_cmp(&y).unwrap_or(Ordering::Equal),
                (Some(_), None) => Ordering::Less,
                (None, Some(_)) => Ordering::Greater,
                (None, None) => Ordering::Equal,
            });
    }

    /// Drop instances missing attribute `attr`.
    pub fn delete_with_missing(&mut self, attr: usize) {
        self.instances.retain(|inst| !inst.is_missing(attr));
    }

    /// Drop instances with a missing class value.
    pub fn delete_with_missing_class(&mut self) {
        let class = self.schema.class_index();
        self.instances.retain(|inst| !inst.is_missing(class));
    }

    /// Keep only instances satisfying `pred`.
    pub fn retain<F: FnMut(&Instance) -> bool>(&mut self, pred: F) {
        self.instances.retain(pred);
    }

    /// Copy of the instances in `[from, to)` over the shared schema.
    pub fn range(&self, from: usize, to: usize) -> Self {
        Self {
            schema: Arc::clone(&self.schema),
            instances: self.instances[from..to].to_vec(),
        }
    }

    /// Number of distinct non-missing values of attribute `attr`.
    pub fn distinct_value_count(&self, attr: usize) -> usize {
        let mut values: Vec<f64> = self
            .instances
            .iter()
            .filter_map(|inst| inst.value(attr))
            .collect();
        values.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));
        let mut count = 0;
        let mut prev = f64::NAN;
        for v in values {
            if count == 0 || v > prev {
                prev = v;
                count += 1;
            }
        }
        count
    }
}
