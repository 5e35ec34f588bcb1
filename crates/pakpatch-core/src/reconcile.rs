//! Fitting a recompressed payload into the slot of the original

use std::fmt;

/// Change applied by [`reconcile`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[cfg_attr(feature = "serde", serde(tag = "kind", rename_all = "snake_case"))]
pub enum SizeAdjustment {
    /// Lengths already matched
    Exact,
    /// Zero bytes appended
    Padded {
        /// Number of zero bytes appended
        bytes: usize,
    },
    /// Trailing bytes dropped; the compressed stream is likely damaged
    Truncated {
        /// Number of bytes dropped
        bytes: usize,
    },
}

impl SizeAdjustment {
    /// Adjustment that turns `actual` bytes into `target` bytes
    pub const fn between(actual: usize, target: usize) -> Self {
        if actual > target {
            Self::Truncated {
                bytes: actual - target,
            }
        } else if actual < target {
            Self::Padded {
                bytes: target - actual,
            }
        } else {
            Self::Exact
        }
    }

    /// Whether data was lost
    pub const fn is_lossy(self) -> bool {
        matches!(self, Self::Truncated { .. })
    }
}

impl fmt::Display for SizeAdjustment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exact => f.write_str("exact"),
            Self::Padded { bytes } => write!(f, "padded +{bytes}"),
            Self::Truncated { bytes } => write!(f, "truncated -{bytes}"),
        }
    }
}

/// Resize `recompressed` to exactly `target_len` bytes.
///
/// Longer input is cut, shorter input is padded with zeros. Use
/// [`SizeAdjustment::between`] to learn which happened.
pub fn reconcile(mut recompressed: Vec<u8>, target_len: usize) -> Vec<u8> {
    recompressed.resize(target_len, 0);
    recompressed
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_pad_short_input() {
        let input: Vec<u8> = (1..=97).collect();
        let result = reconcile(input.clone(), 100);

        assert_eq!(result.len(), 100);
        assert_eq!(&result[..97], &input[..]);
        assert_eq!(&result[97..], &[0, 0, 0]);
        assert_eq!(
            SizeAdjustment::between(97, 100),
            SizeAdjustment::Padded { bytes: 3 }
        );
    }

    #[test]
    fn test_truncate_long_input() {
        let input: Vec<u8> = (0..103).collect();
        let result = reconcile(input.clone(), 100);

        assert_eq!(result, &input[..100]);
        let adjustment = SizeAdjustment::between(103, 100);
        assert_eq!(adjustment, SizeAdjustment::Truncated { bytes: 3 });
        assert!(adjustment.is_lossy());
    }

    #[test]
    fn test_exact_input_unchanged() {
        let input = vec![7u8; 100];
        assert_eq!(reconcile(input.clone(), 100), input);
        assert_eq!(SizeAdjustment::between(100, 100), SizeAdjustment::Exact);
        assert!(!SizeAdjustment::Exact.is_lossy());
    }

    #[test]
    fn test_display() {
        assert_eq!(SizeAdjustment::Exact.to_string(), "exact");
        assert_eq!(SizeAdjustment::Padded { bytes: 2 }.to_string(), "padded +2");
        assert_eq!(
            SizeAdjustment::Truncated { bytes: 5 }.to_string(),
            "truncated -5"
        );
    }

    proptest! {
        /// Result always has the target length and reconciling twice changes nothing
        #[test]
        fn reconcile_is_idempotent(
            data in prop::collection::vec(any::<u8>(), 0..512),
            target in 0usize..512
        ) {
            let once = reconcile(data.clone(), target);
            prop_assert_eq!(once.len(), target);

            let twice = reconcile(once.clone(), target);
            prop_assert_eq!(twice, once);
        }
    }
}
