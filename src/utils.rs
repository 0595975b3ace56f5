use std::collections::BTreeMap;

use crate::config::LinkConfig;

/// Test whether two copy number values are equal within either an absolute or relative margin
///
pub fn copy_numbers_equal(cn1: f64, cn2: f64, config: &LinkConfig) -> bool {
    let diff = (cn1 - cn2).abs();
    if diff <= config.copy_number_abs_margin {
        return true;
    }
    let max_cn = cn1.abs().max(cn2.abs());
    max_cn > 0.0 && diff / max_cn <= config.copy_number_rel_margin
}

/// Summarize counts of text labels as 'LABEL=count' entries joined by ';'
///
pub fn format_label_counts<'a>(labels: impl IntoIterator<Item = &'a str>) -> String {
    let mut counts = BTreeMap::new();
    for label in labels {
        *counts.entry(label).or_insert(0usize) += 1;
    }
    counts
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join(";")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_copy_numbers_equal() {
        let config = LinkConfig::default();
        assert!(copy_numbers_equal(2.0, 2.4, &config));
        assert!(!copy_numbers_equal(2.0, 2.6, &config));
        assert!(copy_numbers_equal(10.0, 10.9, &config));
        assert!(!copy_numbers_equal(10.0, 11.5, &config));
        assert!(copy_numbers_equal(0.0, 0.0, &config));
    }

    #[test]
    fn test_format_label_counts() {
        assert_eq!(format_label_counts(["INV", "DUP", "INV"]), "DUP=1;INV=2");
        assert_eq!(format_label_counts(std::iter::empty()), "");
    }
}
