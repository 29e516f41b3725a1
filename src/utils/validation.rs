use crate::error::{CfError, Result};
use nalgebra::DVector;

/// Checks one exported latent vector and converts it back to its in-memory form.
pub fn validate_latent(id: &str, values: &[f64], dimension: usize) -> Result<DVector<f64>> {
    if values.len() != dimension {
        return Err(CfError::DimensionMismatch {
            expected: dimension,
            actual: values.len(),
        });
    }

    if values.iter().any(|v| !v.is_finite()) {
        return Err(CfError::MalformedSnapshot(format!(
            "latent vector of `{}` contains NaN or infinite values",
            id
        )));
    }

    Ok(DVector::from_column_slice(values))
}

/// Parses an index-keyed snapshot entry and checks it against the interner size.
pub fn validate_index(key: &str, len: usize) -> Result<usize> {
    let idx: usize = key.parse().map_err(|_| {
        CfError::MalformedSnapshot(format!("`{}` is not a valid index", key))
    })?;

    if idx >= len {
        return Err(CfError::MalformedSnapshot(format!(
            "index {} has no identifier in a table of {}",
            idx, len
        )));
    }

    Ok(idx)
}

/// Every slot of an index-keyed table must have been filled exactly once.
pub fn collect_slots(side: &str, slots: Vec<Option<DVector<f64>>>) -> Result<Vec<DVector<f64>>> {
    slots
        .into_iter()
        .enumerate()
        .map(|(idx, slot)| {
            slot.ok_or_else(|| {
                CfError::MalformedSnapshot(format!("{} index {} has no latent vector", side, idx))
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_latent() {
        let v = validate_latent("alice", &[0.5, 1.5], 2).unwrap();
        assert_eq!(v.as_slice(), &[0.5, 1.5]);

        assert_eq!(
            validate_latent("alice", &[0.5], 2),
            Err(CfError::DimensionMismatch {
                expected: 2,
                actual: 1
            })
        );
        assert!(matches!(
            validate_latent("alice", &[0.5, f64::NAN], 2),
            Err(CfError::MalformedSnapshot(_))
        ));
    }

    #[test]
    fn test_validate_index() {
        assert_eq!(validate_index("3", 4).unwrap(), 3);
        assert!(validate_index("4", 4).is_err());
        assert!(validate_index("-1", 4).is_err());
        assert!(validate_index("alice", 4).is_err());
    }

    #[test]
    fn test_collect_slots_reports_gaps() {
        let slots = vec![Some(DVector::from_vec(vec![1.0])), None];
        assert!(matches!(
            collect_slots("user", slots),
            Err(CfError::MalformedSnapshot(_))
        ));
    }
}
