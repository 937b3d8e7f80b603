//! Turns decoded cumulative counter series into the summary schema consumed
//! by the console tables and the chart dashboard.

use std::collections::BTreeMap;

use chrono::{DateTime, Datelike, NaiveDate, TimeDelta, Utc};
use itertools::Itertools;

use crate::{
    cost::{CostBreakdown, Rates, estimate},
    monitor::xml::StoredSeries,
    prelude::*,
    quantity::{cost::Cost, energy::KilowattHours, power::Kilowatts},
    series::{
        Deltas, Series,
        bucket::{Bucket, BucketStats},
    },
};

/// Candidate register names, signed convention first, plain totals second.
pub const GRID_IMPORT: &[&str] = &["Grid_Incoming", "Grid"];
pub const GRID_EXPORT: &[&str] = &["Grid_Outgoing", "Grid+"];
pub const SOLAR: &[&str] = &["Solar", "Solar+"];

#[must_use]
pub struct History {
    pub monthly: StoredSeries,
    pub daily: StoredSeries,
    pub hourly: StoredSeries,
}

#[must_use]
pub struct Report {
    pub generated_at: DateTime<Utc>,
    pub rates: Rates,

    /// Calendar month → energy buckets, keyed by the first day of the month.
    pub monthly: BTreeMap<NaiveDate, MonthlyEnergy>,

    /// Calendar day → grid import and solar production buckets.
    pub daily: BTreeMap<NaiveDate, DailyEnergy>,

    /// Hour-of-day profiles across the hourly window.
    pub hourly: HourlyProfile,

    /// Month → the day with the highest grid import in that month.
    pub peak_demand: BTreeMap<NaiveDate, (NaiveDate, KilowattHours)>,

    /// Weekday (Monday first) × hour-of-day grid import buckets.
    pub grid_heatmap: [[Option<BucketStats>; 24]; 7],
}

/// One calendar month. Each register is independently optional: a bucket
/// with no samples for a register is absent, never zero, and derived
/// figures are only defined where their inputs are.
#[must_use]
#[derive(Copy, Clone)]
pub struct MonthlyEnergy {
    pub grid_import: Option<BucketStats>,
    pub solar: Option<BucketStats>,
    pub export: Option<BucketStats>,
}

impl MonthlyEnergy {
    /// Solar production minus grid import; negative means net import.
    pub fn net_balance(&self) -> Option<KilowattHours> {
        match (self.solar, self.grid_import) {
            (Some(solar), Some(grid)) => Some(solar.sum - grid.sum),
            _ => None,
        }
    }

    pub fn cost(&self, rates: Rates) -> Option<CostBreakdown> {
        self.grid_import
            .map(|grid| estimate(grid.sum, self.export.map(|export| export.sum), rates))
    }
}

#[must_use]
#[derive(Copy, Clone)]
pub struct DailyEnergy {
    pub grid_import: Option<BucketStats>,
    pub solar: Option<BucketStats>,
}

#[must_use]
pub struct HourlyProfile {
    pub grid: [Option<BucketStats>; 24],
    pub solar: [Option<BucketStats>; 24],
}

impl HourlyProfile {
    /// Mean power over an hour-of-day bucket: the buckets hold hourly energy
    /// deltas, so dividing by one hour recovers the average power.
    pub fn mean_power(stats: &BucketStats) -> Kilowatts {
        stats.mean() / TimeDelta::hours(1)
    }

    /// Hour with the highest mean; ties resolve to the earliest hour.
    #[must_use]
    pub fn peak_hour(profile: &[Option<BucketStats>; 24]) -> Option<(u32, Kilowatts)> {
        Self::extreme_hour(profile, |candidate, best| candidate > best)
    }

    #[must_use]
    pub fn lowest_hour(profile: &[Option<BucketStats>; 24]) -> Option<(u32, Kilowatts)> {
        Self::extreme_hour(profile, |candidate, best| candidate < best)
    }

    fn extreme_hour(
        profile: &[Option<BucketStats>; 24],
        replaces: impl Fn(Kilowatts, Kilowatts) -> bool,
    ) -> Option<(u32, Kilowatts)> {
        let mut extreme = None;
        for (hour, stats) in profile.iter().enumerate() {
            let Some(stats) = stats else { continue };
            let power = Self::mean_power(stats);
            if extreme.is_none_or(|(_, best)| replaces(power, best)) {
                #[expect(clippy::cast_possible_truncation)]
                let hour = hour as u32;
                extreme = Some((hour, power));
            }
        }
        extreme
    }
}

impl Report {
    pub fn total_grid_import(&self) -> Option<KilowattHours> {
        sum_defined(self.monthly.values().map(|month| month.grid_import))
    }

    pub fn total_solar(&self) -> Option<KilowattHours> {
        sum_defined(self.monthly.values().map(|month| month.solar))
    }

    pub fn total_export(&self) -> Option<KilowattHours> {
        sum_defined(self.monthly.values().map(|month| month.export))
    }

    /// Share of total usage covered by solar production.
    pub fn solar_offset_percent(&self) -> Option<f64> {
        let grid = self.total_grid_import()?;
        let solar = self.total_solar()?;
        Some(solar.0 / (grid.0 + solar.0) * 100.0)
    }

    pub fn total_cost(&self) -> Option<CostBreakdown> {
        let grid = self.total_grid_import()?;
        Some(estimate(grid, self.total_export(), self.rates))
    }

    /// What the solar production would have cost at the import rate.
    pub fn solar_value(&self) -> Option<Cost> {
        self.total_solar().map(|solar| solar * self.rates.import)
    }

    /// Mean monthly net cost scaled to twelve months.
    #[expect(clippy::cast_precision_loss)]
    pub fn annual_cost_projection(&self) -> Option<Cost> {
        let costs: Vec<Cost> = self
            .monthly
            .values()
            .filter_map(|month| month.cost(self.rates))
            .map(|breakdown| breakdown.net())
            .collect();
        if costs.is_empty() {
            return None;
        }
        let total: Cost = costs.iter().copied().sum();
        Some(total / costs.len() as f64 * 12.0)
    }
}

/// Descriptive statistics over per-day energy sums.
#[must_use]
#[derive(Copy, Clone)]
pub struct DayRange {
    pub n_days: usize,
    pub mean: KilowattHours,
    pub peak: (NaiveDate, KilowattHours),
    pub min: (NaiveDate, KilowattHours),
    pub std_dev: Option<KilowattHours>,
}

impl Report {
    pub fn daily_grid_range(&self) -> Option<DayRange> {
        day_range(self.daily.iter().filter_map(|(day, energy)| {
            energy.grid_import.map(|stats| (*day, stats.sum))
        }))
    }

    pub fn daily_solar_range(&self) -> Option<DayRange> {
        day_range(
            self.daily
                .iter()
                .filter_map(|(day, energy)| energy.solar.map(|stats| (*day, stats.sum))),
        )
    }
}

#[expect(clippy::cast_precision_loss)]
fn day_range(days: impl Iterator<Item = (NaiveDate, KilowattHours)>) -> Option<DayRange> {
    let mut n_days = 0_usize;
    let mut sum = KilowattHours::ZERO;
    let mut sum_of_squares = 0.0;
    let mut peak: Option<(NaiveDate, KilowattHours)> = None;
    let mut min: Option<(NaiveDate, KilowattHours)> = None;
    for (day, energy) in days {
        n_days += 1;
        sum += energy;
        sum_of_squares += energy.0 * energy.0;
        if peak.is_none_or(|(_, best)| energy > best) {
            peak = Some((day, energy));
        }
        if min.is_none_or(|(_, best)| energy < best) {
            min = Some((day, energy));
        }
    }
    let count = n_days as f64;
    let std_dev = (n_days >= 2).then(|| {
        let variance = (sum_of_squares - sum.0 * sum.0 / count) / (count - 1.0);
        KilowattHours::from(variance.max(0.0).sqrt())
    });
    Some(DayRange { n_days, mean: sum / count, peak: peak?, min: min?, std_dev })
}

fn sum_defined(
    buckets: impl Iterator<Item = Option<BucketStats>>,
) -> Option<KilowattHours> {
    let mut total = None;
    for stats in buckets.flatten() {
        total = Some(total.unwrap_or(KilowattHours::ZERO) + stats.sum);
    }
    total
}

/// Differentiate a cumulative counter series into per-interval energy.
///
/// Deltas are keyed by the interval start, not its end: the energy consumed
/// between the 09:00 and 10:00 counters lands in the 09:00 bucket. Tools
/// that difference with end-of-interval attribution will show hour-of-day
/// profiles shifted by one bucket relative to this one.
fn consumption(
    series: &Series<DateTime<Utc>, KilowattHours>,
) -> Result<Series<DateTime<Utc>, KilowattHours>> {
    Ok(series
        .iter()
        .copied()
        .try_deltas()?
        .into_iter()
        .map(|(interval, delta)| (interval.start, delta))
        .collect())
}

fn optional_consumption(
    series: Option<&Series<DateTime<Utc>, KilowattHours>>,
) -> Result<Option<Series<DateTime<Utc>, KilowattHours>>> {
    series.map(consumption).transpose()
}

#[instrument(skip_all)]
pub fn analyze(history: &History, rates: Rates) -> Result<Report> {
    let monthly_grid = consumption(history.monthly.require(GRID_IMPORT)?)
        .context("monthly grid import counters")?;
    let monthly_solar =
        consumption(history.monthly.require(SOLAR)?).context("monthly solar counters")?;
    let monthly_export = optional_consumption(history.monthly.get(GRID_EXPORT))
        .context("monthly grid export counters")?;

    let daily_grid =
        consumption(history.daily.require(GRID_IMPORT)?).context("daily grid import counters")?;
    let daily_solar =
        consumption(history.daily.require(SOLAR)?).context("daily solar counters")?;

    let hourly_grid = consumption(history.hourly.require(GRID_IMPORT)?)
        .context("hourly grid import counters")?;
    let hourly_solar =
        consumption(history.hourly.require(SOLAR)?).context("hourly solar counters")?;

    let monthly = align_monthly(
        monthly_grid.into_iter().bucket_monthly(),
        monthly_solar.into_iter().bucket_monthly(),
        monthly_export.map(|series| series.into_iter().bucket_monthly()),
    );
    let daily_grid_buckets = daily_grid.into_iter().bucket_daily();
    let peak_demand = peak_demand_days(&daily_grid_buckets);
    let daily = align_daily(daily_grid_buckets, daily_solar.into_iter().bucket_daily());
    let grid_heatmap = hourly_grid.iter().copied().bucket_weekday_hour();
    let hourly = HourlyProfile {
        grid: hourly_grid.into_iter().bucket_hour_of_day(),
        solar: hourly_solar.into_iter().bucket_hour_of_day(),
    };

    info!(
        n_months = monthly.len(),
        n_days = daily.len(),
        "aggregated",
    );
    Ok(Report { generated_at: Utc::now(), rates, monthly, daily, hourly, peak_demand, grid_heatmap })
}

fn align_monthly(
    grid: BTreeMap<NaiveDate, BucketStats>,
    solar: BTreeMap<NaiveDate, BucketStats>,
    export: Option<BTreeMap<NaiveDate, BucketStats>>,
) -> BTreeMap<NaiveDate, MonthlyEnergy> {
    let months: Vec<NaiveDate> =
        grid.keys().chain(solar.keys()).copied().sorted().dedup().collect();
    months
        .into_iter()
        .map(|month| {
            let energy = MonthlyEnergy {
                grid_import: grid.get(&month).copied(),
                solar: solar.get(&month).copied(),
                export: export.as_ref().and_then(|buckets| buckets.get(&month)).copied(),
            };
            (month, energy)
        })
        .collect()
}

fn align_daily(
    grid: BTreeMap<NaiveDate, BucketStats>,
    solar: BTreeMap<NaiveDate, BucketStats>,
) -> BTreeMap<NaiveDate, DailyEnergy> {
    let days: Vec<NaiveDate> = grid.keys().chain(solar.keys()).copied().sorted().dedup().collect();
    days.into_iter()
        .map(|day| {
            let energy = DailyEnergy {
                grid_import: grid.get(&day).copied(),
                solar: solar.get(&day).copied(),
            };
            (day, energy)
        })
        .collect()
}

/// For every month, the day with the highest grid import. Ties resolve to
/// the earliest day because the map iterates in ascending date order.
fn peak_demand_days(
    daily_grid: &BTreeMap<NaiveDate, BucketStats>,
) -> BTreeMap<NaiveDate, (NaiveDate, KilowattHours)> {
    let mut peaks: BTreeMap<NaiveDate, (NaiveDate, KilowattHours)> = BTreeMap::new();
    for (day, stats) in daily_grid {
        let month = day.with_day(1).unwrap_or(*day);
        match peaks.get_mut(&month) {
            Some((_, peak)) if stats.sum <= *peak => {}
            Some(entry) => *entry = (*day, stats.sum),
            None => {
                peaks.insert(month, (*day, stats.sum));
            }
        }
    }
    peaks
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;
    use chrono::TimeZone;

    use super::*;

    const RATES: Rates =
        Rates {
            import: crate::quantity::Quantity(0.166),
            export: crate::quantity::Quantity(0.08),
        };

    fn hourly_counters(
        start: DateTime<Utc>,
        values: &[f64],
    ) -> Series<DateTime<Utc>, KilowattHours> {
        values
            .iter()
            .enumerate()
            .map(|(index, value)| {
                (start + TimeDelta::hours(index as i64), KilowattHours::from(*value))
            })
            .collect()
    }

    fn stored(payload: &str) -> StoredSeries {
        StoredSeries::parse(payload).unwrap()
    }

    /// Two stored rows per register spanning two months, enough to exercise
    /// the full pipeline end to end.
    fn history() -> History {
        // Counters in watt-hours, newest row first, 30-day months:
        let monthly = r#"
            <group>
                <data time_stamp="0x68b18880" time_delta="2592000">
                    <cname did="0">Grid</cname>
                    <cname did="1">Solar</cname>
                    <r><c>5000000</c><c>4200000</c></r>
                    <r><c>3000000</c><c>3300000</c></r>
                    <r><c>1000000</c><c>3000000</c></r>
                </data>
            </group>"#;
        let daily = r#"
            <group>
                <data time_stamp="0x68b18880" time_delta="86400">
                    <cname did="0">Grid</cname>
                    <cname did="1">Solar</cname>
                    <r><c>5000000</c><c>4200000</c></r>
                    <r><c>4970000</c><c>4180000</c></r>
                    <r><c>4930000</c><c>4150000</c></r>
                </data>
            </group>"#;
        let hourly = r#"
            <group>
                <data time_stamp="0x68b18880" time_delta="3600">
                    <cname did="0">Grid</cname>
                    <cname did="1">Solar</cname>
                    <r><c>5000000</c><c>4200000</c></r>
                    <r><c>4995000</c><c>4198000</c></r>
                    <r><c>4991000</c><c>4195000</c></r>
                </data>
            </group>"#;
        History { monthly: stored(monthly), daily: stored(daily), hourly: stored(hourly) }
    }

    #[test]
    fn test_analyze_net_balance_and_cost() -> Result {
        let report = analyze(&history(), RATES)?;

        // Two month-deltas: grid 2000 then 2000 kWh, solar 300 then 900 kWh.
        assert_eq!(report.monthly.len(), 2);
        let (_, first) = report.monthly.iter().next().unwrap();
        assert_abs_diff_eq!(first.grid_import.unwrap().sum.0, 2000.0, epsilon = 1e-6);
        assert_abs_diff_eq!(first.solar.unwrap().sum.0, 300.0, epsilon = 1e-6);
        assert_abs_diff_eq!(first.net_balance().unwrap().0, -1700.0, epsilon = 1e-6);

        // No export register: revenue is absent and the net cost is the
        // import cost alone.
        let cost = first.cost(RATES).unwrap();
        assert!(cost.export_revenue.is_none());
        assert_abs_diff_eq!(cost.net().0, 2000.0 * 0.166, epsilon = 1e-6);

        // Both months cost the same, so the projection is twelve times one.
        let projection = report.annual_cost_projection().unwrap();
        assert_abs_diff_eq!(projection.0, 2000.0 * 0.166 * 12.0, epsilon = 1e-6);
        Ok(())
    }

    #[test]
    fn test_analyze_hourly_profile() -> Result {
        let report = analyze(&history(), RATES)?;

        // Two hour-deltas: 4 kWh then 5 kWh of grid import.
        let defined = report.hourly.grid.iter().flatten().count();
        assert_eq!(defined, 2);
        let (_, peak) = HourlyProfile::peak_hour(&report.hourly.grid).unwrap();
        assert_abs_diff_eq!(peak.0, 5.0, epsilon = 1e-6);
        Ok(())
    }

    #[test]
    fn test_analyze_requires_solar_register() {
        let monthly = r#"
            <group>
                <data time_stamp="0x68b18880" time_delta="2592000">
                    <cname did="0">Grid</cname>
                    <r><c>5000000</c></r>
                    <r><c>3000000</c></r>
                </data>
            </group>"#;
        let history =
            History { monthly: stored(monthly), daily: stored(monthly), hourly: stored(monthly) };
        assert!(analyze(&history, RATES).is_err());
    }

    #[test]
    fn test_peak_demand_picks_the_heaviest_day() {
        let start = Utc.with_ymd_and_hms(2025, 6, 1, 0, 0, 0).unwrap();
        let series = hourly_counters(start, &[1.0, 2.0, 3.0]);
        let consumption = consumption(&series).unwrap();
        let buckets = consumption.into_iter().bucket_daily();
        let peaks = peak_demand_days(&buckets);
        let (month, (day, energy)) = peaks.iter().next().unwrap();
        assert_eq!(*month, NaiveDate::from_ymd_opt(2025, 6, 1).unwrap());
        assert_eq!(*day, NaiveDate::from_ymd_opt(2025, 6, 1).unwrap());
        assert_abs_diff_eq!(energy.0, 2.0, epsilon = 1e-6);
    }
}
