use std::{
    fmt::{Debug, Display, Formatter},
    ops::{Div, Mul},
};

use chrono::TimeDelta;

use crate::quantity::{Quantity, cost::Cost, power::Kilowatts, rate::KilowattHourRate};

pub type KilowattHours = Quantity<f64, 1, 1, 0>;

impl KilowattHours {
    /// The monitor reports cumulative counters in watt-hours.
    pub fn from_watt_hours(watt_hours: f64) -> Self {
        Self(watt_hours * 0.001)
    }
}

impl Default for KilowattHours {
    fn default() -> Self {
        Self::ZERO
    }
}

impl Display for KilowattHours {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.2} kWh", self.0)
    }
}

impl Debug for KilowattHours {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.2}kWh", self.0)
    }
}

impl Mul<KilowattHourRate> for KilowattHours {
    type Output = Cost;

    fn mul(self, rhs: KilowattHourRate) -> Self::Output {
        Quantity(self.0 * rhs.0)
    }
}

impl Div<TimeDelta> for KilowattHours {
    type Output = Kilowatts;

    fn div(self, rhs: TimeDelta) -> Self::Output {
        let hours = rhs.as_seconds_f64() / 3600.0;
        Quantity(self.0 / hours)
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;

    use super::*;

    #[test]
    fn test_from_watt_hours() {
        assert_abs_diff_eq!(KilowattHours::from_watt_hours(2500.0).0, 2.5, epsilon = 1e-9);
    }

    /// Grid totals of 100.0 kWh and 106.48 kWh one hour apart average out
    /// to 6.48 kW of import over that hour.
    #[test]
    fn test_average_power_over_an_hour() {
        let delta = KilowattHours::from(106.48) - KilowattHours::from(100.0);
        let power = delta / TimeDelta::seconds(3600);
        assert_abs_diff_eq!(power.0, 6.48, epsilon = 1e-6);
        assert_eq!(power.to_string(), "6480 W");
    }
}
