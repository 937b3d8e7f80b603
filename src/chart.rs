//! The chart dashboard: one PNG per run with every panel the console tables
//! summarize, drawn side by side.

use std::{
    collections::{BTreeMap, BTreeSet},
    error::Error,
    path::{Path, PathBuf},
};

use chrono::{DateTime, Datelike, Days, NaiveDate, Utc};
use plotters::{
    coord::{Shift, cartesian::Cartesian2d, types::RangedCoordf64},
    prelude::*,
};

use crate::{
    prelude::*,
    report::{DailyEnergy, HourlyProfile, Report},
    series::bucket::BucketStats,
};

const GRID_COLOR: RGBColor = RGBColor(211, 47, 47);
const SOLAR_COLOR: RGBColor = RGBColor(255, 160, 0);
const SURPLUS_COLOR: RGBColor = RGBColor(56, 142, 60);
const COST_COLOR: RGBColor = RGBColor(25, 118, 210);

const CAPTION_FONT: (&str, i32) = ("sans-serif", 18);
const LABEL_FONT: (&str, i32) = ("sans-serif", 12);

/// File name for this run: the prefix plus the generation timestamp, so
/// consecutive runs never overwrite each other.
#[must_use]
pub fn output_path(prefix: &str, at: DateTime<Utc>) -> PathBuf {
    PathBuf::from(format!("{prefix}_{}.png", at.format("%Y%m%d_%H%M%S")))
}

pub fn render_dashboard(report: &Report, path: &Path) -> Result {
    draw(report, path).map_err(|error| anyhow!("failed to render the dashboard: {error}"))
}

fn draw(report: &Report, path: &Path) -> Result<(), Box<dyn Error>> {
    let root = BitMapBackend::new(path, (1600, 1600)).into_drawing_area();
    root.fill(&WHITE)?;
    let panels = root.split_evenly((4, 2));

    draw_monthly_energy(&panels[0], report)?;
    draw_daily_energy(&panels[1], report)?;
    draw_hourly_profile(&panels[2], report)?;
    draw_weekday_heatmap(&panels[3], report)?;
    draw_weekly_energy(&panels[4], report)?;
    draw_daily_scatter(&panels[5], report)?;
    draw_monthly_balance(&panels[6], report)?;
    draw_monthly_cost(&panels[7], report)?;

    root.present()?;
    Ok(())
}

/// Paired bars per month: grid import next to solar production. A register
/// with no samples in a month simply has no bar.
fn draw_monthly_energy(
    area: &DrawingArea<BitMapBackend<'_>, Shift>,
    report: &Report,
) -> Result<(), Box<dyn Error>> {
    let months: Vec<NaiveDate> = report.monthly.keys().copied().collect();
    if months.is_empty() {
        return Ok(());
    }
    let peak = report
        .monthly
        .values()
        .flat_map(|month| [month.grid_import, month.solar])
        .flatten()
        .map(|stats| stats.sum.0)
        .fold(0.0_f64, f64::max);

    let mut chart = ChartBuilder::on(area)
        .caption("Monthly energy", CAPTION_FONT)
        .margin(10)
        .x_label_area_size(30)
        .y_label_area_size(50)
        .build_cartesian_2d(-0.5..index_limit(months.len()), 0.0..axis_limit(peak))?;
    chart
        .configure_mesh()
        .disable_x_mesh()
        .y_desc("kWh")
        .x_labels(months.len())
        .x_label_formatter(&|x| month_label(&months, *x))
        .label_style(LABEL_FONT)
        .draw()?;

    for (index, energy) in report.monthly.values().enumerate() {
        if let Some(grid) = energy.grid_import {
            chart.draw_series(bar(index, -0.35, 0.0, grid.sum.0, GRID_COLOR))?;
        }
        if let Some(solar) = energy.solar {
            chart.draw_series(bar(index, 0.0, 0.35, solar.sum.0, SOLAR_COLOR))?;
        }
    }
    legend(&mut chart)?;
    Ok(())
}

/// Daily grid and solar lines over the last thirty days.
fn draw_daily_energy(
    area: &DrawingArea<BitMapBackend<'_>, Shift>,
    report: &Report,
) -> Result<(), Box<dyn Error>> {
    let days: Vec<NaiveDate> = report.daily.keys().rev().take(30).rev().copied().collect();
    if days.is_empty() {
        return Ok(());
    }
    let window: Vec<_> = days.iter().map(|day| (*day, report.daily[day])).collect();
    let peak = window
        .iter()
        .flat_map(|(_, energy)| [energy.grid_import, energy.solar])
        .flatten()
        .map(|stats| stats.sum.0)
        .fold(0.0_f64, f64::max);

    let mut chart = ChartBuilder::on(area)
        .caption("Daily energy, last 30 days", CAPTION_FONT)
        .margin(10)
        .x_label_area_size(30)
        .y_label_area_size(50)
        .build_cartesian_2d(-0.5..index_limit(days.len()), 0.0..axis_limit(peak))?;
    chart
        .configure_mesh()
        .disable_x_mesh()
        .y_desc("kWh")
        .x_labels(6)
        .x_label_formatter(&|x| day_label(&days, *x))
        .label_style(LABEL_FONT)
        .draw()?;

    chart
        .draw_series(LineSeries::new(daily_points(&window, |energy| energy.grid_import), &GRID_COLOR))?
        .label("Grid import")
        .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 16, y)], GRID_COLOR));
    chart
        .draw_series(LineSeries::new(daily_points(&window, |energy| energy.solar), &SOLAR_COLOR))?
        .label("Solar")
        .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 16, y)], SOLAR_COLOR));
    chart
        .configure_series_labels()
        .border_style(BLACK)
        .background_style(WHITE.mix(0.8))
        .label_font(LABEL_FONT)
        .draw()?;
    Ok(())
}

/// Mean power by hour of day across the hourly window.
fn draw_hourly_profile(
    area: &DrawingArea<BitMapBackend<'_>, Shift>,
    report: &Report,
) -> Result<(), Box<dyn Error>> {
    let grid = profile_points(&report.hourly.grid);
    let solar = profile_points(&report.hourly.solar);
    if grid.is_empty() && solar.is_empty() {
        return Ok(());
    }
    let peak = grid
        .iter()
        .chain(&solar)
        .map(|(_, power)| *power)
        .fold(0.0_f64, f64::max);

    let mut chart = ChartBuilder::on(area)
        .caption("Hour-of-day profile", CAPTION_FONT)
        .margin(10)
        .x_label_area_size(30)
        .y_label_area_size(50)
        .build_cartesian_2d(0.0..24.0, 0.0..axis_limit(peak))?;
    chart
        .configure_mesh()
        .disable_x_mesh()
        .y_desc("kW")
        .x_labels(12)
        .x_label_formatter(&|hour| format!("{hour:02.0}:00"))
        .label_style(LABEL_FONT)
        .draw()?;

    chart
        .draw_series(LineSeries::new(grid, &GRID_COLOR))?
        .label("Grid import")
        .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 16, y)], GRID_COLOR));
    chart
        .draw_series(LineSeries::new(solar, &SOLAR_COLOR))?
        .label("Solar")
        .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 16, y)], SOLAR_COLOR));
    chart
        .configure_series_labels()
        .border_style(BLACK)
        .background_style(WHITE.mix(0.8))
        .label_font(LABEL_FONT)
        .draw()?;
    Ok(())
}

/// Weekday × hour heatmap of mean grid import, Monday at the top.
fn draw_weekday_heatmap(
    area: &DrawingArea<BitMapBackend<'_>, Shift>,
    report: &Report,
) -> Result<(), Box<dyn Error>> {
    const WEEKDAYS: [&str; 7] = ["Mon", "Tue", "Wed", "Thu", "Fri", "Sat", "Sun"];

    let peak = report
        .grid_heatmap
        .iter()
        .flatten()
        .flatten()
        .map(|stats| stats.mean().0)
        .fold(0.0_f64, f64::max);
    if peak <= 0.0 {
        return Ok(());
    }

    // The y range runs backwards so that row 0 lands at the top.
    let mut chart = ChartBuilder::on(area)
        .caption("Grid import heatmap", CAPTION_FONT)
        .margin(10)
        .x_label_area_size(30)
        .y_label_area_size(50)
        .build_cartesian_2d(0.0..24.0, 7.0..0.0)?;
    chart
        .configure_mesh()
        .disable_mesh()
        .x_labels(12)
        .x_label_formatter(&|hour| format!("{hour:02.0}:00"))
        .y_labels(7)
        .y_label_formatter(&|row: &f64| {
            #[expect(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            let index = row.floor().max(0.0) as usize;
            WEEKDAYS.get(index).unwrap_or(&"").to_string()
        })
        .label_style(LABEL_FONT)
        .draw()?;

    #[expect(clippy::cast_precision_loss)]
    for (row, hours) in report.grid_heatmap.iter().enumerate() {
        for (hour, stats) in hours.iter().enumerate() {
            let Some(stats) = stats else { continue };
            let cell = Rectangle::new(
                [
                    (hour as f64, row as f64),
                    (hour as f64 + 1.0, row as f64 + 1.0),
                ],
                heat_color(stats.mean().0 / peak).filled(),
            );
            chart.draw_series(std::iter::once(cell))?;
        }
    }
    Ok(())
}

/// Paired bars of grid and solar totals per calendar week (Monday start),
/// summed from the daily buckets.
fn draw_weekly_energy(
    area: &DrawingArea<BitMapBackend<'_>, Shift>,
    report: &Report,
) -> Result<(), Box<dyn Error>> {
    let grid = weekly_sums(&report.daily, |energy| energy.grid_import);
    let solar = weekly_sums(&report.daily, |energy| energy.solar);
    let weeks: Vec<NaiveDate> = grid
        .keys()
        .chain(solar.keys())
        .copied()
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();
    if weeks.is_empty() {
        return Ok(());
    }
    let peak = grid.values().chain(solar.values()).copied().fold(0.0_f64, f64::max);

    let mut chart = ChartBuilder::on(area)
        .caption("Weekly energy", CAPTION_FONT)
        .margin(10)
        .x_label_area_size(30)
        .y_label_area_size(50)
        .build_cartesian_2d(-0.5..index_limit(weeks.len()), 0.0..axis_limit(peak))?;
    chart
        .configure_mesh()
        .disable_x_mesh()
        .y_desc("kWh")
        .x_labels(weeks.len().min(8))
        .x_label_formatter(&|x| day_label(&weeks, *x))
        .label_style(LABEL_FONT)
        .draw()?;

    for (index, week) in weeks.iter().enumerate() {
        if let Some(total) = grid.get(week) {
            chart.draw_series(bar(index, -0.35, 0.0, *total, GRID_COLOR))?;
        }
        if let Some(total) = solar.get(week) {
            chart.draw_series(bar(index, 0.0, 0.35, *total, SOLAR_COLOR))?;
        }
    }
    legend(&mut chart)?;
    Ok(())
}

/// Scatter of daily solar production against daily grid import; only days
/// where both registers have samples contribute a point.
fn draw_daily_scatter(
    area: &DrawingArea<BitMapBackend<'_>, Shift>,
    report: &Report,
) -> Result<(), Box<dyn Error>> {
    let points: Vec<(f64, f64)> = report
        .daily
        .values()
        .filter_map(|energy| match (energy.solar, energy.grid_import) {
            (Some(solar), Some(grid)) => Some((solar.sum.0, grid.sum.0)),
            _ => None,
        })
        .collect();
    if points.is_empty() {
        return Ok(());
    }
    let solar_peak = points.iter().map(|(solar, _)| *solar).fold(0.0_f64, f64::max);
    let grid_peak = points.iter().map(|(_, grid)| *grid).fold(0.0_f64, f64::max);

    let mut chart = ChartBuilder::on(area)
        .caption("Solar vs grid, daily", CAPTION_FONT)
        .margin(10)
        .x_label_area_size(30)
        .y_label_area_size(50)
        .build_cartesian_2d(0.0..axis_limit(solar_peak), 0.0..axis_limit(grid_peak))?;
    chart
        .configure_mesh()
        .x_desc("Solar, kWh")
        .y_desc("Grid import, kWh")
        .label_style(LABEL_FONT)
        .draw()?;

    chart.draw_series(
        points
            .into_iter()
            .map(|point| Circle::new(point, 3, COST_COLOR.mix(0.6).filled())),
    )?;
    Ok(())
}

/// Net monthly balance: solar minus grid, green above zero and red below.
fn draw_monthly_balance(
    area: &DrawingArea<BitMapBackend<'_>, Shift>,
    report: &Report,
) -> Result<(), Box<dyn Error>> {
    let months: Vec<NaiveDate> = report.monthly.keys().copied().collect();
    let balances: Vec<Option<f64>> = report
        .monthly
        .values()
        .map(|month| month.net_balance().map(|energy| energy.0))
        .collect();
    let Some(span) = value_span(balances.iter().flatten().copied()) else {
        return Ok(());
    };

    let mut chart = ChartBuilder::on(area)
        .caption("Monthly net balance", CAPTION_FONT)
        .margin(10)
        .x_label_area_size(30)
        .y_label_area_size(50)
        .build_cartesian_2d(-0.5..index_limit(months.len()), span)?;
    chart
        .configure_mesh()
        .disable_x_mesh()
        .y_desc("kWh")
        .x_labels(months.len())
        .x_label_formatter(&|x| month_label(&months, *x))
        .label_style(LABEL_FONT)
        .draw()?;

    for (index, balance) in balances.iter().enumerate() {
        let Some(balance) = balance else { continue };
        let color = if *balance >= 0.0 { SURPLUS_COLOR } else { GRID_COLOR };
        chart.draw_series(bar(index, -0.35, 0.35, *balance, color))?;
    }
    Ok(())
}

/// Estimated net cost per month at the configured rates.
fn draw_monthly_cost(
    area: &DrawingArea<BitMapBackend<'_>, Shift>,
    report: &Report,
) -> Result<(), Box<dyn Error>> {
    let months: Vec<NaiveDate> = report.monthly.keys().copied().collect();
    let costs: Vec<Option<f64>> = report
        .monthly
        .values()
        .map(|month| month.cost(report.rates).map(|cost| cost.net().0))
        .collect();
    let Some(span) = value_span(costs.iter().flatten().copied()) else {
        return Ok(());
    };

    let mut chart = ChartBuilder::on(area)
        .caption("Monthly net cost", CAPTION_FONT)
        .margin(10)
        .x_label_area_size(30)
        .y_label_area_size(50)
        .build_cartesian_2d(-0.5..index_limit(months.len()), span)?;
    chart
        .configure_mesh()
        .disable_x_mesh()
        .y_desc("$")
        .x_labels(months.len())
        .x_label_formatter(&|x| month_label(&months, *x))
        .label_style(LABEL_FONT)
        .draw()?;

    for (index, cost) in costs.iter().enumerate() {
        let Some(cost) = cost else { continue };
        chart.draw_series(bar(index, -0.35, 0.35, *cost, COST_COLOR))?;
    }
    Ok(())
}

fn legend<'a, 'b>(
    chart: &mut ChartContext<'a, BitMapBackend<'b>, Cartesian2d<RangedCoordf64, RangedCoordf64>>,
) -> Result<(), Box<dyn Error>>
where
    'b: 'a,
{
    chart
        .draw_series(std::iter::empty::<Rectangle<(f64, f64)>>())?
        .label("Grid import")
        .legend(|(x, y)| Rectangle::new([(x, y - 5), (x + 10, y + 5)], GRID_COLOR.filled()));
    chart
        .draw_series(std::iter::empty::<Rectangle<(f64, f64)>>())?
        .label("Solar")
        .legend(|(x, y)| Rectangle::new([(x, y - 5), (x + 10, y + 5)], SOLAR_COLOR.filled()));
    chart
        .configure_series_labels()
        .border_style(BLACK)
        .background_style(WHITE.mix(0.8))
        .label_font(LABEL_FONT)
        .draw()?;
    Ok(())
}

/// The Monday opening the calendar week of the given day.
fn week_start(date: NaiveDate) -> NaiveDate {
    date - Days::new(u64::from(date.weekday().num_days_from_monday()))
}

fn weekly_sums(
    daily: &BTreeMap<NaiveDate, DailyEnergy>,
    per_day: impl Fn(&DailyEnergy) -> Option<BucketStats>,
) -> BTreeMap<NaiveDate, f64> {
    let mut weeks = BTreeMap::new();
    for (day, energy) in daily {
        if let Some(stats) = per_day(energy) {
            *weeks.entry(week_start(*day)).or_insert(0.0) += stats.sum.0;
        }
    }
    weeks
}

#[expect(clippy::cast_precision_loss)]
fn daily_points(
    window: &[(NaiveDate, DailyEnergy)],
    per_day: impl Fn(&DailyEnergy) -> Option<BucketStats>,
) -> Vec<(f64, f64)> {
    window
        .iter()
        .enumerate()
        .filter_map(|(index, (_, energy))| per_day(energy).map(|stats| (index as f64, stats.sum.0)))
        .collect()
}

/// Points at half-hour centers, skipping hours with no samples.
#[expect(clippy::cast_precision_loss)]
fn profile_points(profile: &[Option<BucketStats>; 24]) -> Vec<(f64, f64)> {
    profile
        .iter()
        .enumerate()
        .filter_map(|(hour, stats)| {
            stats.as_ref().map(|stats| (hour as f64 + 0.5, HourlyProfile::mean_power(stats).0))
        })
        .collect()
}

#[expect(clippy::cast_precision_loss)]
fn bar(
    index: usize,
    from: f64,
    to: f64,
    value: f64,
    color: RGBColor,
) -> std::iter::Once<Rectangle<(f64, f64)>> {
    let center = index as f64;
    std::iter::once(Rectangle::new(
        [(center + from, 0.0), (center + to, value)],
        color.filled(),
    ))
}

#[expect(clippy::cast_precision_loss)]
fn index_limit(len: usize) -> f64 {
    len as f64 - 0.5
}

/// Pads the top of an axis; a flat-zero series still gets a visible range.
fn axis_limit(peak: f64) -> f64 {
    if peak > 0.0 { peak * 1.1 } else { 1.0 }
}

/// A y range with padding covering zero, for series that may go negative.
fn value_span(values: impl Iterator<Item = f64>) -> Option<std::ops::Range<f64>> {
    let mut min = f64::INFINITY;
    let mut max = f64::NEG_INFINITY;
    let mut any = false;
    for value in values {
        any = true;
        min = min.min(value);
        max = max.max(value);
    }
    if !any {
        return None;
    }
    let padding = ((max - min).abs()).max(1.0) * 0.1;
    Some((min.min(0.0) - padding)..(max.max(0.0) + padding))
}

fn month_label(months: &[NaiveDate], x: f64) -> String {
    index_label(months.len(), x)
        .map_or_else(String::new, |index| months[index].format("%b %y").to_string())
}

fn day_label(days: &[NaiveDate], x: f64) -> String {
    index_label(days.len(), x)
        .map_or_else(String::new, |index| days[index].format("%m-%d").to_string())
}

#[expect(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn index_label(len: usize, x: f64) -> Option<usize> {
    if x < -0.25 {
        return None;
    }
    let index = x.round().max(0.0) as usize;
    (index < len && (x - index as f64).abs() < 0.25).then_some(index)
}

/// White at zero load ramping to the grid color at the busiest cell.
#[expect(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn heat_color(intensity: f64) -> RGBColor {
    let intensity = intensity.clamp(0.0, 1.0);
    let channel = |target: u8| {
        let target = f64::from(target);
        (255.0 + (target - 255.0) * intensity).round() as u8
    };
    RGBColor(channel(GRID_COLOR.0), channel(GRID_COLOR.1), channel(GRID_COLOR.2))
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;
    use crate::{quantity::energy::KilowattHours, series::bucket::Bucket};

    #[test]
    fn test_output_path_embeds_the_timestamp() {
        let at = Utc.with_ymd_and_hms(2025, 8, 29, 14, 30, 5).unwrap();
        assert_eq!(output_path("gridwatch", at), PathBuf::from("gridwatch_20250829_143005.png"));
    }

    #[test]
    fn test_heat_color_span() {
        assert_eq!(heat_color(0.0), RGBColor(255, 255, 255));
        assert_eq!(heat_color(1.0), GRID_COLOR);
    }

    #[test]
    fn test_weekly_sums_group_by_monday() {
        // June 1st 2025 is a Sunday; June 2nd opens the next week and
        // June 8th still belongs to it.
        let day = |d| NaiveDate::from_ymd_opt(2025, 6, d).unwrap();
        let energy = |date: NaiveDate, kwh| DailyEnergy {
            grid_import: vec![(date.and_hms_opt(0, 0, 0).unwrap().and_utc(), KilowattHours::from(kwh))]
                .into_iter()
                .bucket_daily()
                .into_values()
                .next(),
            solar: None,
        };
        let daily: BTreeMap<NaiveDate, DailyEnergy> = [
            (day(1), energy(day(1), 2.0)),
            (day(2), energy(day(2), 3.0)),
            (day(8), energy(day(8), 4.0)),
        ]
        .into_iter()
        .collect();

        let weeks = weekly_sums(&daily, |energy| energy.grid_import);
        assert_eq!(weeks.len(), 2);
        assert!((weeks[&NaiveDate::from_ymd_opt(2025, 5, 26).unwrap()] - 2.0).abs() < 1e-9);
        assert!((weeks[&day(2)] - 7.0).abs() < 1e-9);
        assert_eq!(week_start(day(8)), day(2));
    }

    #[test]
    fn test_index_labels_only_on_whole_indices() {
        let months = vec![
            NaiveDate::from_ymd_opt(2025, 6, 1).unwrap(),
            NaiveDate::from_ymd_opt(2025, 7, 1).unwrap(),
        ];
        assert_eq!(month_label(&months, 0.0), "Jun 25");
        assert_eq!(month_label(&months, 1.1), "Jul 25");
        assert_eq!(month_label(&months, 0.5), "");
        assert_eq!(month_label(&months, 2.0), "");
        assert_eq!(month_label(&months, -1.0), "");
    }
}
