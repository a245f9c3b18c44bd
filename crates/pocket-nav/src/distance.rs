use tracing::info;

use crate::geo::{distance_m, Waypoint};
use crate::nmea::Fix;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DistanceState {
    NoPoints,
    HasA,
    HasBoth,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ConfirmOutcome {
    PointASet(Waypoint),
    Measured { a: Waypoint, b: Waypoint, distance_m: f64 },
    Reset,
    /// No valid fix; nothing recorded.
    NoFix,
}

#[derive(Debug, Clone, Default)]
pub struct DistanceCalculator {
    point_a: Option<Waypoint>,
    point_b: Option<Waypoint>,
}

impl DistanceCalculator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> DistanceState {
        match (self.point_a, self.point_b) {
            (None, _) => DistanceState::NoPoints,
            (Some(_), None) => DistanceState::HasA,
            (Some(_), Some(_)) => DistanceState::HasBoth,
        }
    }

    pub fn point_a(&self) -> Option<Waypoint> {
        self.point_a
    }

    pub fn point_b(&self) -> Option<Waypoint> {
        self.point_b
    }

    pub fn distance_m(&self) -> Option<f64> {
        Some(distance_m(self.point_a?, self.point_b?))
    }

    pub fn confirm(&mut self, fix: &Fix) -> ConfirmOutcome {
        if self.state() == DistanceState::HasBoth {
            self.point_a = None;
            self.point_b = None;
            info!("distance points reset");
            return ConfirmOutcome::Reset;
        }
        if !fix.is_valid() {
            return ConfirmOutcome::NoFix;
        }

        let here = fix.position();
        match self.point_a {
            None => {
                self.point_a = Some(here);
                info!(lat = here.lat, lon = here.lon, "point A set");
                ConfirmOutcome::PointASet(here)
            }
            Some(a) => {
                self.point_b = Some(here);
                let d = distance_m(a, here);
                info!(distance_m = d, "point B set");
                ConfirmOutcome::Measured { a, b: here, distance_m: d }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nmea::FixStatus;

    fn fix_at(lat: f64, lon: f64, status: FixStatus) -> Fix {
        Fix { status, lat, lon, ..Default::default() }
    }

    #[test]
    fn three_confirms_cycle_back_to_empty() {
        let mut d = DistanceCalculator::new();
        assert_eq!(d.state(), DistanceState::NoPoints);

        d.confirm(&fix_at(0.0, 0.0, FixStatus::Valid));
        assert_eq!(d.state(), DistanceState::HasA);

        let out = d.confirm(&fix_at(0.0, 1.0, FixStatus::Valid));
        assert_eq!(d.state(), DistanceState::HasBoth);
        match out {
            ConfirmOutcome::Measured { distance_m, .. } => {
                assert!((distance_m - 111_195.0).abs() < 1_112.0)
            }
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(d.distance_m(), Some(out_distance(&out)));

        assert_eq!(d.confirm(&fix_at(0.0, 2.0, FixStatus::Valid)), ConfirmOutcome::Reset);
        assert_eq!(d.state(), DistanceState::NoPoints);
        assert_eq!(d.point_a(), None);
        assert_eq!(d.point_b(), None);
    }

    fn out_distance(o: &ConfirmOutcome) -> f64 {
        match o {
            ConfirmOutcome::Measured { distance_m, .. } => *distance_m,
            _ => f64::NAN,
        }
    }

    #[test]
    fn invalid_fix_does_not_advance() {
        let mut d = DistanceCalculator::new();
        assert_eq!(d.confirm(&fix_at(1.0, 1.0, FixStatus::Partial)), ConfirmOutcome::NoFix);
        assert_eq!(d.state(), DistanceState::NoPoints);

        d.confirm(&fix_at(1.0, 1.0, FixStatus::Valid));
        assert_eq!(d.confirm(&fix_at(1.0, 1.0, FixStatus::NoFix)), ConfirmOutcome::NoFix);
        assert_eq!(d.state(), DistanceState::HasA);
    }

    #[test]
    fn reset_from_has_both_needs_no_fix() {
        let mut d = DistanceCalculator::new();
        d.confirm(&fix_at(1.0, 1.0, FixStatus::Valid));
        d.confirm(&fix_at(1.0, 1.0, FixStatus::Valid));
        assert_eq!(d.confirm(&Fix::default()), ConfirmOutcome::Reset);
    }
}
