//! Volume cap: a single fill never exceeds the day's traded volume.

/// Outcome of applying the cap to a requested share count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VolumeCap {
    pub shares: u64,
    pub capped: bool,
}

/// Constrain `requested` to `day_volume`.
pub fn constrain(requested: u64, day_volume: u64) -> VolumeCap {
    if requested > day_volume {
        VolumeCap {
            shares: day_volume,
            capped: true,
        }
    } else {
        VolumeCap {
            shares: requested,
            capped: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_constraint_binds() {
        assert_eq!(
            constrain(100, 10_000),
            VolumeCap {
                shares: 100,
                capped: false
            }
        );
    }

    #[test]
    fn volume_limits_fill() {
        assert_eq!(
            constrain(10, 5),
            VolumeCap {
                shares: 5,
                capped: true
            }
        );
    }

    #[test]
    fn exact_volume_is_not_capped() {
        assert!(!constrain(1_000, 1_000).capped);
    }
}
