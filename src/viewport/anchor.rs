/// Scroll adjustment owed after a head expansion.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnchorCorrection {
    pub delta: f64,
}

impl AnchorCorrection {
    /// `unit_height` is measured on the previously-first row before the
    /// prepend displaces it. Unmeasured or zero heights yield no correction.
    pub fn measure(unit_height: Option<f64>, batch: usize) -> Option<Self> {
        let height = unit_height.filter(|h| h.is_finite() && *h > 0.0)?;
        if batch == 0 {
            return None;
        }
        Some(Self {
            delta: height * batch as f64,
        })
    }

    pub fn apply(&self, scroll_offset: f64) -> f64 {
        scroll_offset + self.delta
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn correction_is_unit_height_times_batch() {
        let correction = AnchorCorrection::measure(Some(112.0), 30).expect("measured");
        assert_eq!(correction.delta, 3360.0);
        assert_eq!(correction.apply(150.0), 3510.0);
    }

    #[test]
    fn missing_measurement_skips_correction() {
        assert!(AnchorCorrection::measure(None, 30).is_none());
        assert!(AnchorCorrection::measure(Some(0.0), 30).is_none());
        assert!(AnchorCorrection::measure(Some(2.0), 0).is_none());
    }
}
