//! Semantic type classification.

use crate::config::ProfilerThresholds;
use crate::types::SemanticType;
use crate::utils::{parse_datetime_string, parse_numeric_string};
use std::collections::HashSet;

/// Coercion evidence gathered from one column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub(crate) struct ColumnEvidence {
    pub row_count: usize,
    pub non_null: usize,
    pub distinct: usize,
    pub numeric_hits: usize,
    pub temporal_hits: usize,
}

impl ColumnEvidence {
    /// Evidence from string cells.
    pub(crate) fn from_strings(values: &[Option<String>]) -> Self {
        let mut evidence = Self {
            row_count: values.len(),
            ..Self::default()
        };
        let mut seen = HashSet::new();
        for value in values.iter().flatten() {
            evidence.non_null += 1;
            seen.insert(value.as_str());
            if parse_numeric_string(value).is_some() {
                evidence.numeric_hits += 1;
            } else if parse_datetime_string(value).is_some() {
                evidence.temporal_hits += 1;
            }
        }
        evidence.distinct = seen.len();
        evidence
    }

    fn ratio(&self, hits: usize) -> f64 {
        if self.non_null == 0 {
            0.0
        } else {
            hits as f64 / self.non_null as f64
        }
    }
}

/// Classify a column: numeric, then temporal, then categorical, else text.
pub(crate) fn classify(evidence: &ColumnEvidence, thresholds: &ProfilerThresholds) -> SemanticType {
    if evidence.non_null == 0 {
        return SemanticType::Text;
    }
    if evidence.ratio(evidence.numeric_hits) >= thresholds.numeric_ratio {
        return SemanticType::Numeric;
    }
    if evidence.ratio(evidence.temporal_hits) >= thresholds.temporal_ratio {
        return SemanticType::Temporal;
    }
    let distinct_ratio = evidence.distinct as f64 / evidence.row_count as f64;
    if distinct_ratio < thresholds.categorical_ratio {
        SemanticType::Categorical
    } else {
        SemanticType::Text
    }
}

/// Non-null values that do not coerce to `semantic_type`.
pub(crate) fn coercion_failures(evidence: &ColumnEvidence, semantic_type: SemanticType) -> usize {
    match semantic_type {
        SemanticType::Numeric => evidence.non_null - evidence.numeric_hits,
        SemanticType::Temporal => evidence.non_null - evidence.temporal_hits,
        SemanticType::Categorical | SemanticType::Text => 0,
    }
}
