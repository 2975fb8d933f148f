//! Metric descriptors and samples exchanged between collectors and a
//! pull-based registry.
//!
//! A [`Desc`] is static: name, help, kind, constant labels, and the names of
//! the variable labels. A [`Sample`] is one value for one label set, emitted
//! during a collection cycle.

use std::fmt;

use crate::error::RegistryError;

/// How a registry should interpret a sample's value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetricKind {
    /// Monotonic total.
    Counter,
    /// Point-in-time value that may go up or down.
    Gauge,
}

impl MetricKind {
    pub fn as_str(self) -> &'static str {
        match self {
            MetricKind::Counter => "counter",
            MetricKind::Gauge => "gauge",
        }
    }
}

impl fmt::Display for MetricKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Static description of a metric a collector can emit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Desc {
    name: String,
    help: String,
    kind: MetricKind,
    const_labels: Vec<(String, String)>,
    variable_labels: Vec<String>,
}

impl Desc {
    pub fn new(name: impl Into<String>, help: impl Into<String>, kind: MetricKind) -> Self {
        Self {
            name: name.into(),
            help: help.into(),
            kind,
            const_labels: Vec::new(),
            variable_labels: Vec::new(),
        }
    }

    /// Adds a label whose value is fixed for every sample of this metric.
    pub fn const_label(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.const_labels.push((name.into(), value.into()));
        self.const_labels.sort();
        self
    }

    /// Declares the labels whose values are supplied per sample, in order.
    pub fn variable_labels(mut self, names: &[&str]) -> Self {
        self.variable_labels = names.iter().map(|s| (*s).to_string()).collect();
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn help(&self) -> &str {
        &self.help
    }

    pub fn kind(&self) -> MetricKind {
        self.kind
    }

    pub fn const_labels(&self) -> &[(String, String)] {
        &self.const_labels
    }

    /// Sorted names of every label (constant and variable) this metric carries.
    pub fn label_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self
            .const_labels
            .iter()
            .map(|(k, _)| k.as_str())
            .chain(self.variable_labels.iter().map(String::as_str))
            .collect();
        names.sort_unstable();
        names
    }

    /// Checks metric and label names against the exposition grammar and
    /// rejects duplicate label names.
    pub fn validate(&self) -> Result<(), RegistryError> {
        if !is_valid_metric_name(&self.name) {
            return Err(RegistryError::InvalidDescriptor(format!(
                "invalid metric name {:?}",
                self.name
            )));
        }
        let names = self.label_names();
        for name in &names {
            if !is_valid_label_name(name) {
                return Err(RegistryError::InvalidDescriptor(format!(
                    "invalid label name {:?} on {}",
                    name, self.name
                )));
            }
        }
        if names.windows(2).any(|w| w[0] == w[1]) {
            return Err(RegistryError::InvalidDescriptor(format!(
                "duplicate label name on {}",
                self.name
            )));
        }
        Ok(())
    }
}

/// One measured value for one label set.
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    name: String,
    kind: MetricKind,
    labels: Vec<(String, String)>,
    value: f64,
}

impl Sample {
    /// Builds a sample of `desc` with `label_values` matched positionally to
    /// the descriptor's variable labels.
    ///
    /// # Errors
    ///
    /// [`RegistryError::LabelCountMismatch`] unless there is exactly one
    /// value per variable label.
    pub fn new(desc: &Desc, value: f64, label_values: &[&str]) -> Result<Self, RegistryError> {
        if desc.variable_labels.len() != label_values.len() {
            return Err(RegistryError::LabelCountMismatch {
                name: desc.name.clone(),
                expected: desc.variable_labels.len(),
                got: label_values.len(),
            });
        }
        let mut labels: Vec<(String, String)> = desc
            .const_labels
            .iter()
            .cloned()
            .chain(
                desc.variable_labels
                    .iter()
                    .zip(label_values)
                    .map(|(k, v)| (k.clone(), (*v).to_string())),
            )
            .collect();
        labels.sort();
        Ok(Self {
            name: desc.name.clone(),
            kind: desc.kind,
            labels,
            value,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> MetricKind {
        self.kind
    }

    /// Labels sorted by name.
    pub fn labels(&self) -> &[(String, String)] {
        &self.labels
    }

    pub fn label(&self, name: &str) -> Option<&str> {
        self.labels
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn value(&self) -> f64 {
        self.value
    }
}

pub(crate) fn is_valid_metric_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' || c == ':' => {},
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == ':')
}

pub(crate) fn is_valid_label_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {},
        _ => return false,
    }
    !name.starts_with("__") && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sample_merges_and_sorts_labels() {
        let desc = Desc::new("bpf_map_key_size", "Key size for BPF map", MetricKind::Gauge)
            .const_label("node", "a")
            .variable_labels(&["map"]);
        let sample = Sample::new(&desc, 4.0, &["stack_traces"]).unwrap();
        assert_eq!(
            sample.labels(),
            &[
                ("map".to_string(), "stack_traces".to_string()),
                ("node".to_string(), "a".to_string()),
            ]
        );
        assert_eq!(sample.label("map"), Some("stack_traces"));
        assert_eq!(sample.kind(), MetricKind::Gauge);
        assert_eq!(sample.value(), 4.0);
    }

    #[test]
    fn sample_rejects_wrong_label_value_count() {
        let desc = Desc::new("m", "h", MetricKind::Gauge).variable_labels(&["map", "cpu"]);
        assert_eq!(
            Sample::new(&desc, 1.0, &["only_one"]),
            Err(RegistryError::LabelCountMismatch {
                name: "m".into(),
                expected: 2,
                got: 1,
            })
        );
        assert!(Sample::new(&desc, 1.0, &["a", "0", "extra"]).is_err());

        let sample = Sample::new(&desc, 1.0, &["a", "0"]).unwrap();
        assert_eq!(sample.label("cpu"), Some("0"));
        assert_eq!(sample.label("map"), Some("a"));
    }

    #[test]
    fn validate_accepts_well_formed_desc() {
        let desc = Desc::new("cache_hits_total", "hits", MetricKind::Counter)
            .const_label("cache", "symbols");
        assert!(desc.validate().is_ok());
    }

    #[test]
    fn validate_rejects_bad_names() {
        let bad_metric = Desc::new("1cache", "x", MetricKind::Counter);
        assert!(matches!(
            bad_metric.validate(),
            Err(RegistryError::InvalidDescriptor(_))
        ));

        let bad_label = Desc::new("ok", "x", MetricKind::Counter).variable_labels(&["has-dash"]);
        assert!(bad_label.validate().is_err());

        let reserved = Desc::new("ok", "x", MetricKind::Counter).variable_labels(&["__name"]);
        assert!(reserved.validate().is_err());
    }

    #[test]
    fn validate_rejects_duplicate_label_names() {
        let desc = Desc::new("ok", "x", MetricKind::Gauge)
            .const_label("map", "a")
            .variable_labels(&["map"]);
        assert!(desc.validate().is_err());
    }

    #[test]
    fn metric_name_grammar() {
        assert!(is_valid_metric_name("parca_agent:bpf_map_memlock"));
        assert!(is_valid_metric_name("_x"));
        assert!(!is_valid_metric_name(""));
        assert!(!is_valid_metric_name("a b"));
    }
}
