//! The closed set of Lp distances the VP-tree can be built over.

use crate::error::{Error, Result};

/// A metric over fixed-length feature vectors. Closed variant set: no
/// trait-object extensibility point, matching the VP-tree's own design.
#[derive(Debug, Clone, PartialEq)]
pub enum LpDistance {
    L1,
    L2,
    /// Skips any dimension where either operand is NaN.
    L2DistanceNan,
    /// Skips any dimension where the carried mask is NaN at that index.
    /// The mask is recorded once at tree-build time (the query's NaN
    /// pattern); rebuild the tree whenever that pattern changes.
    L2DistanceNanIndexed { mask: Vec<f32> },
}

impl LpDistance {
    pub fn distance(&self, a: &[f32], b: &[f32]) -> Result<f32> {
        if a.len() != b.len() {
            return Err(Error::different_sizes(format!(
                "operand lengths disagree: {} vs {}",
                a.len(),
                b.len()
            )));
        }
        match self {
            LpDistance::L1 => Ok(a.iter().zip(b).map(|(x, y)| (x - y).abs()).sum()),
            LpDistance::L2 => Ok(a
                .iter()
                .zip(b)
                .map(|(x, y)| (x - y) * (x - y))
                .sum::<f32>()
                .sqrt()),
            LpDistance::L2DistanceNan => Ok(a
                .iter()
                .zip(b)
                .filter(|(x, y)| !x.is_nan() && !y.is_nan())
                .map(|(x, y)| (x - y) * (x - y))
                .sum::<f32>()
                .sqrt()),
            LpDistance::L2DistanceNanIndexed { mask } => {
                if mask.len() != a.len() {
                    return Err(Error::different_sizes(format!(
                        "mask length {} disagrees with operand length {}",
                        mask.len(),
                        a.len()
                    )));
                }
                Ok(a.iter()
                    .zip(b)
                    .zip(mask)
                    .filter(|(_, m)| !m.is_nan())
                    .map(|((x, y), _)| (x - y) * (x - y))
                    .sum::<f32>()
                    .sqrt())
            }
        }
    }

    /// Whether `other`'s NaN pattern (used as a candidate mask) matches
    /// this distance's currently-carried mask, for `L2DistanceNanIndexed`.
    /// Any other variant is trivially stable (it carries no mask), so
    /// this always returns `true` for them.
    pub fn mask_matches(&self, candidate_mask: &[f32]) -> bool {
        match self {
            LpDistance::L2DistanceNanIndexed { mask } => {
                mask.len() == candidate_mask.len()
                    && mask
                        .iter()
                        .zip(candidate_mask)
                        .all(|(a, b)| a.is_nan() == b.is_nan())
            }
            _ => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn l1_and_l2_basic() {
        assert_eq!(LpDistance::L1.distance(&[0.0, 0.0], &[3.0, 4.0]).unwrap(), 7.0);
        assert_eq!(LpDistance::L2.distance(&[0.0, 0.0], &[3.0, 4.0]).unwrap(), 5.0);
    }

    #[test]
    fn different_sizes_is_fatal() {
        assert!(matches!(
            LpDistance::L1.distance(&[0.0], &[0.0, 1.0]),
            Err(Error::DifferentSizes(_))
        ));
    }

    #[test]
    fn nan_skips_dimension() {
        let d = LpDistance::L2DistanceNan
            .distance(&[1.0, f32::NAN, 3.0], &[1.0, 5.0, 3.0])
            .unwrap();
        assert_eq!(d, 0.0);
    }

    #[test]
    fn nan_indexed_uses_fixed_mask_not_operand_nans() {
        let dist = LpDistance::L2DistanceNanIndexed {
            mask: vec![0.0, f32::NAN, 0.0],
        };
        // dimension 1 is skipped regardless of the operands' own values there
        let d = dist.distance(&[1.0, 100.0, 3.0], &[1.0, -100.0, 3.0]).unwrap();
        assert_eq!(d, 0.0);
    }

    #[test]
    fn mask_matches_compares_nan_pattern() {
        let dist = LpDistance::L2DistanceNanIndexed {
            mask: vec![0.0, f32::NAN],
        };
        assert!(dist.mask_matches(&[5.0, f32::NAN]));
        assert!(!dist.mask_matches(&[5.0, 5.0]));
    }
}
