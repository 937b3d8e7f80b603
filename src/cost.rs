//! Cost estimation: pure arithmetic over energy and per-kWh rates.

use crate::quantity::{cost::Cost, energy::KilowattHours, rate::KilowattHourRate};

#[derive(Copy, Clone, Debug)]
pub struct Rates {
    pub import: KilowattHourRate,
    pub export: KilowattHourRate,
}

#[must_use]
#[derive(Copy, Clone, Debug)]
pub struct CostBreakdown {
    pub import_cost: Cost,

    /// Only present when the device actually tracks an export register;
    /// never estimated from production.
    pub export_revenue: Option<Cost>,
}

impl CostBreakdown {
    pub fn net(&self) -> Cost {
        self.import_cost - self.export_revenue.unwrap_or(Cost::ZERO)
    }
}

pub fn estimate(
    grid_import: KilowattHours,
    solar_export: Option<KilowattHours>,
    rates: Rates,
) -> CostBreakdown {
    CostBreakdown {
        import_cost: grid_import * rates.import,
        export_revenue: solar_export.map(|export| export * rates.export),
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;

    use super::*;

    const RATES: Rates = Rates {
        import: crate::quantity::Quantity(0.166),
        export: crate::quantity::Quantity(0.08),
    };

    /// A monthly grid import of 2158.16 kWh at $0.166/kWh comes to $358.25.
    #[test]
    fn test_monthly_import_cost() {
        let breakdown = estimate(KilowattHours::from(2158.16), None, RATES);
        assert_abs_diff_eq!(breakdown.import_cost.round_to_cents().0, 358.25);
        assert!(breakdown.export_revenue.is_none());
        assert_abs_diff_eq!(breakdown.net().round_to_cents().0, 358.25);
    }

    #[test]
    fn test_export_revenue_offsets_the_net() {
        let breakdown = estimate(KilowattHours::from(100.0), Some(KilowattHours::from(50.0)), RATES);
        assert_abs_diff_eq!(breakdown.import_cost.0, 16.6, epsilon = 1e-6);
        assert_abs_diff_eq!(breakdown.export_revenue.unwrap().0, 4.0, epsilon = 1e-6);
        assert_abs_diff_eq!(breakdown.net().0, 12.6, epsilon = 1e-6);
    }
}
