use crate::models::{Code, DatasetMetadata, Scalar, VariableMetadata};

/// Keep-mask over `rows` rows: `false` where any listed variable holds a
/// user-missing value. Variables without metadata never exclude a row.
pub fn user_missing_mask(
    metadata: &DatasetMetadata,
    rows: usize,
    columns: &[(&str, &[Scalar])],
) -> Vec<bool> {
    let mut keep = vec![true; rows];

    for (name, values) in columns {
        let Some(meta) = metadata.variable(name).filter(|m| m.has_user_missing()) else {
            continue;
        };
        for (slot, value) in keep.iter_mut().zip(values.iter()) {
            if *slot && is_user_missing(meta, value) {
                *slot = false;
            }
        }
    }

    keep
}

pub fn is_user_missing(meta: &VariableMetadata, value: &Scalar) -> bool {
    if value.is_missing() {
        return false;
    }

    let number = value.as_number();
    let discrete = meta.missing_values.iter().any(|code| match code {
        Code::Number(missing) => number == Some(*missing),
        Code::Text(missing) => value.as_text().as_deref() == Some(missing.as_str()),
    });
    if discrete {
        return true;
    }

    // Values that do not coerce to a number never fall inside a range.
    match number {
        Some(n) => meta.missing_ranges.iter().any(|range| range.contains(n)),
        None => false,
    }
}
