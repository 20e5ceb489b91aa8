/// Folds per-container exit codes into the helper's exit status.
///
/// Starts at 0. A non-zero observation always replaces the current value,
/// a zero never does, so the result is the last non-zero code seen.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExitCodeAggregate {
    code: i64,
}

impl ExitCodeAggregate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn observe(&mut self, code: i64) {
        if code != 0 {
            self.code = code;
        }
    }

    pub fn code(&self) -> i64 {
        self.code
    }
}

impl FromIterator<i64> for ExitCodeAggregate {
    fn from_iter<I: IntoIterator<Item = i64>>(iter: I) -> Self {
        let mut aggregate = Self::new();
        for code in iter {
            aggregate.observe(code);
        }
        aggregate
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fold(codes: &[i64]) -> i64 {
        codes.iter().copied().collect::<ExitCodeAggregate>().code()
    }

    #[test]
    fn test_all_zero_is_zero() {
        assert_eq!(fold(&[0, 0, 0]), 0);
        assert_eq!(fold(&[]), 0);
    }

    #[test]
    fn test_zero_never_clears_failure() {
        assert_eq!(fold(&[0, 2, 0]), 2);
        assert_eq!(fold(&[7, 0, 0]), 7);
    }

    #[test]
    fn test_last_non_zero_wins() {
        assert_eq!(fold(&[3, 0, 5]), 5);
        assert_eq!(fold(&[5, 0, 3]), 3);
        assert_eq!(fold(&[-1, 137]), 137);
    }
}
