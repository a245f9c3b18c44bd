use pocket_hal::leds::{Led, StatusLeds};
use pocket_nav::nmea::{Fix, FixStatus};

/// Reflect fix quality on the status LEDs. The error LED needs an explicit
/// invalid RMC; before the first RMC a bare `NoFix` leaves everything dark.
pub fn indicate_fix(leds: &mut dyn StatusLeds, fix: &Fix) {
    let (success, warning, error) = match fix.status {
        FixStatus::Valid => (true, false, false),
        FixStatus::Partial => (false, true, false),
        FixStatus::NoFix => (false, false, fix.rmc_valid == Some(false)),
    };
    leds.set(Led::Success, success);
    leds.set(Led::Warning, warning);
    leds.set(Led::Error, error);
}

#[cfg(test)]
mod tests {
    use super::*;
    use pocket_hal::leds::LedBank;

    fn lit(leds: &LedBank) -> [bool; 3] {
        [leds.get(Led::Success), leds.get(Led::Warning), leds.get(Led::Error)]
    }

    #[test]
    fn one_indicator_per_status() {
        let mut leds = LedBank::new(true);
        indicate_fix(&mut leds, &Fix { status: FixStatus::Valid, ..Default::default() });
        assert_eq!(lit(&leds), [true, false, false]);
        indicate_fix(&mut leds, &Fix { status: FixStatus::Partial, ..Default::default() });
        assert_eq!(lit(&leds), [false, true, false]);
        indicate_fix(&mut leds, &Fix { rmc_valid: Some(false), ..Default::default() });
        assert_eq!(lit(&leds), [false, false, true]);
    }

    #[test]
    fn cold_no_fix_stays_dark() {
        let mut leds = LedBank::new(true);
        indicate_fix(&mut leds, &Fix::default());
        assert_eq!(lit(&leds), [false, false, false]);
    }
}
