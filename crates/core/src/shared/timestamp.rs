use std::time::Duration;

use num_rational::Rational64;

const NANOS_PER_SEC: i64 = 1_000_000_000;

/// Caller-supplied presentation time of a frame handed to a writer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Timestamp {
    /// Integer ticks of the writer's time base.
    GridUnits(i64),
    /// Seconds since stream start.
    Seconds(Rational64),
    /// Let the writer derive the time from its nominal frame rate.
    Unspecified,
}

impl Timestamp {
    pub fn seconds(numer: i64, denom: i64) -> Self {
        Self::Seconds(Rational64::new(numer, denom))
    }

    /// Rounds to the nearest nanosecond. Returns `None` for NaN or infinity.
    pub fn from_secs_f64(seconds: f64) -> Option<Self> {
        if !seconds.is_finite() {
            return None;
        }
        let nanos = (seconds * NANOS_PER_SEC as f64).round();
        if nanos.abs() >= i64::MAX as f64 {
            return None;
        }
        Some(Self::from_nanos(nanos as i64))
    }

    pub fn from_nanos(nanos: i64) -> Self {
        Self::Seconds(Rational64::new(nanos, NANOS_PER_SEC))
    }

    pub fn from_duration(elapsed: Duration) -> Self {
        Self::from_nanos(elapsed.as_nanos().min(i64::MAX as u128) as i64)
    }
}

impl From<Duration> for Timestamp {
    fn from(elapsed: Duration) -> Self {
        Self::from_duration(elapsed)
    }
}

impl From<Rational64> for Timestamp {
    fn from(seconds: Rational64) -> Self {
        Self::Seconds(seconds)
    }
}

impl From<Option<Rational64>> for Timestamp {
    fn from(seconds: Option<Rational64>) -> Self {
        seconds.map_or(Self::Unspecified, Self::Seconds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_secs_f64_rounds_to_nanos() {
        let ts = Timestamp::from_secs_f64(0.5).unwrap();
        assert_eq!(ts, Timestamp::seconds(1, 2));
        let ts = Timestamp::from_secs_f64(1.0 / 3.0).unwrap();
        assert_eq!(ts, Timestamp::seconds(333_333_333, 1_000_000_000));
    }

    #[test]
    fn test_from_secs_f64_rejects_non_finite() {
        assert!(Timestamp::from_secs_f64(f64::NAN).is_none());
        assert!(Timestamp::from_secs_f64(f64::INFINITY).is_none());
    }

    #[test]
    fn test_from_duration() {
        let ts: Timestamp = Duration::from_millis(250).into();
        assert_eq!(ts, Timestamp::seconds(1, 4));
    }

    #[test]
    fn test_from_optional_seconds() {
        assert_eq!(Timestamp::from(None), Timestamp::Unspecified);
        assert_eq!(
            Timestamp::from(Some(Rational64::new(2, 1))),
            Timestamp::seconds(2, 1)
        );
    }
}
