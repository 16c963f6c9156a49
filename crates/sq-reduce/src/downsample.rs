use serde::{Deserialize, Serialize};

use crate::error::{ReduceError, ReduceResult};

/// Which trajectory samples to reduce. The final sample is always kept.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Downsample {
    #[default]
    All,
    /// Every n-th sample starting from the first.
    Stride(usize),
    /// `n` samples spread evenly from first to last.
    Count(usize),
}

impl Downsample {
    /// Sample indices, ascending and unique, for a trajectory of `len`.
    pub fn indices(self, len: usize) -> ReduceResult<Vec<usize>> {
        if len == 0 {
            return Err(ReduceError::InsufficientSamples {
                available: 0,
                requested: 1,
            });
        }
        let last = len - 1;
        match self {
            Downsample::All => Ok((0..len).collect()),
            Downsample::Stride(0) | Downsample::Count(0) => Err(ReduceError::InvalidOption {
                what: "downsample size must be positive".to_string(),
            }),
            Downsample::Stride(n) => {
                if n > len {
                    return Err(ReduceError::InsufficientSamples {
                        available: len,
                        requested: n,
                    });
                }
                let mut idx: Vec<usize> = (0..len).step_by(n).collect();
                if idx.last() != Some(&last) {
                    idx.push(last);
                }
                Ok(idx)
            }
            Downsample::Count(n) => {
                if n > len {
                    return Err(ReduceError::InsufficientSamples {
                        available: len,
                        requested: n,
                    });
                }
                if n == 1 {
                    return Ok(vec![last]);
                }
                Ok((0..n).map(|i| i * last / (n - 1)).collect())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stride_keeps_last() {
        assert_eq!(Downsample::Stride(3).indices(8).unwrap(), vec![0, 3, 6, 7]);
        assert_eq!(Downsample::Stride(2).indices(5).unwrap(), vec![0, 2, 4]);
    }

    #[test]
    fn count_spreads_evenly() {
        assert_eq!(Downsample::Count(3).indices(5).unwrap(), vec![0, 2, 4]);
        assert_eq!(Downsample::Count(4).indices(4).unwrap(), vec![0, 1, 2, 3]);
        assert_eq!(Downsample::Count(1).indices(9).unwrap(), vec![8]);
    }

    #[test]
    fn oversized_requests_are_insufficient() {
        assert_eq!(
            Downsample::Stride(10).indices(4),
            Err(ReduceError::InsufficientSamples {
                available: 4,
                requested: 10
            })
        );
        assert!(matches!(
            Downsample::Count(5).indices(2),
            Err(ReduceError::InsufficientSamples { .. })
        ));
        assert!(matches!(
            Downsample::All.indices(0),
            Err(ReduceError::InsufficientSamples { available: 0, .. })
        ));
    }

    #[test]
    fn zero_size_is_invalid() {
        assert!(matches!(
            Downsample::Stride(0).indices(4),
            Err(ReduceError::InvalidOption { .. })
        ));
    }
}
