//! Console summary tables.

use comfy_table::{Cell, CellAlignment, Color, Table, modifiers, presets};

use crate::{
    monitor::xml::InstantReading,
    quantity::{cost::Cost, energy::KilowattHours},
    report::{HourlyProfile, Report},
};

const ABSENT: &str = "n/a";

fn new_table(header: Vec<&str>) -> Table {
    let mut table = Table::new();
    table.load_preset(presets::UTF8_FULL_CONDENSED).apply_modifier(modifiers::UTF8_ROUND_CORNERS);
    table.enforce_styling();
    table.set_header(header);
    table
}

fn energy_cell(value: Option<KilowattHours>) -> Cell {
    match value {
        Some(value) => Cell::new(value).set_alignment(CellAlignment::Right),
        None => Cell::new(ABSENT).set_alignment(CellAlignment::Right).fg(Color::DarkGrey),
    }
}

pub fn build_status_table(readings: &[InstantReading]) -> Table {
    let mut table = new_table(vec!["Register", "Power", "Total"]);
    for reading in readings {
        let power_cell = match reading.power {
            Some(power) => Cell::new(power).set_alignment(CellAlignment::Right).fg(
                if power.0 < 0.0 { Color::Green } else { Color::Red },
            ),
            None => Cell::new(ABSENT).set_alignment(CellAlignment::Right).fg(Color::DarkGrey),
        };
        table.add_row(vec![
            Cell::new(&reading.register),
            power_cell,
            energy_cell(reading.total),
        ]);
    }
    table
}

pub fn build_totals_table(readings: &[InstantReading]) -> Table {
    let mut table = new_table(vec!["Register", "Total"]);
    for reading in readings {
        table.add_row(vec![Cell::new(&reading.register), energy_cell(reading.total)]);
    }
    table
}

pub fn build_monthly_table(report: &Report) -> Table {
    let mut table = new_table(vec!["Month", "Grid import", "Solar", "Net", "Cost"]);
    for (month, energy) in &report.monthly {
        let net_cell = match energy.net_balance() {
            Some(net) => Cell::new(net).set_alignment(CellAlignment::Right).fg(
                if net.0 >= 0.0 { Color::Green } else { Color::Red },
            ),
            None => Cell::new(ABSENT).set_alignment(CellAlignment::Right).fg(Color::DarkGrey),
        };
        let cost_cell = match energy.cost(report.rates) {
            Some(cost) => {
                Cell::new(cost.net().round_to_cents()).set_alignment(CellAlignment::Right)
            }
            None => Cell::new(ABSENT).set_alignment(CellAlignment::Right).fg(Color::DarkGrey),
        };
        table.add_row(vec![
            Cell::new(month.format("%b %Y")),
            energy_cell(energy.grid_import.map(|stats| stats.sum)),
            energy_cell(energy.solar.map(|stats| stats.sum)),
            net_cell,
            cost_cell,
        ]);
    }
    table
}

pub fn build_daily_table(report: &Report) -> Table {
    let mut table =
        new_table(vec!["", "Average/day", "Peak day", "Minimum day", "Std dev"]);
    for (label, range) in [
        ("Grid import", report.daily_grid_range()),
        ("Solar", report.daily_solar_range()),
    ] {
        let Some(range) = range else {
            table.add_row(vec![Cell::new(label), Cell::new(ABSENT).fg(Color::DarkGrey)]);
            continue;
        };
        table.add_row(vec![
            Cell::new(label),
            Cell::new(range.mean).set_alignment(CellAlignment::Right),
            Cell::new(format!("{} ({})", range.peak.1, range.peak.0))
                .set_alignment(CellAlignment::Right),
            Cell::new(format!("{} ({})", range.min.1, range.min.0))
                .set_alignment(CellAlignment::Right),
            match range.std_dev {
                Some(std_dev) => Cell::new(std_dev).set_alignment(CellAlignment::Right),
                None => Cell::new(ABSENT).set_alignment(CellAlignment::Right).fg(Color::DarkGrey),
            },
        ]);
    }
    table
}

pub fn build_peak_demand_table(report: &Report) -> Table {
    let mut table = new_table(vec!["Month", "Peak demand day", "Grid import"]);
    for (month, (day, energy)) in &report.peak_demand {
        table.add_row(vec![
            Cell::new(month.format("%b %Y")),
            Cell::new(day.format("%Y-%m-%d")),
            Cell::new(energy).set_alignment(CellAlignment::Right),
        ]);
    }
    table
}

pub fn build_hourly_table(report: &Report) -> Table {
    let mut table = new_table(vec!["Pattern", "Hour", "Average power"]);
    let rows = [
        ("Peak grid hour", HourlyProfile::peak_hour(&report.hourly.grid)),
        ("Lowest grid hour", HourlyProfile::lowest_hour(&report.hourly.grid)),
        ("Peak solar hour", HourlyProfile::peak_hour(&report.hourly.solar)),
    ];
    for (label, extreme) in rows {
        match extreme {
            Some((hour, power)) => {
                table.add_row(vec![
                    Cell::new(label),
                    Cell::new(format!("{hour:02}:00")),
                    Cell::new(power).set_alignment(CellAlignment::Right),
                ]);
            }
            None => {
                table.add_row(vec![
                    Cell::new(label),
                    Cell::new(ABSENT).fg(Color::DarkGrey),
                    Cell::new(ABSENT).fg(Color::DarkGrey),
                ]);
            }
        }
    }
    table
}

pub fn build_cost_table(report: &Report) -> Table {
    let mut table = new_table(vec!["Estimate", "Amount"]);
    let cost_cell = |cost: Option<Cost>| match cost {
        Some(cost) => Cell::new(cost.round_to_cents()).set_alignment(CellAlignment::Right),
        None => Cell::new(ABSENT).set_alignment(CellAlignment::Right).fg(Color::DarkGrey),
    };
    let breakdown = report.total_cost();
    table.add_row(vec![
        Cell::new(format!("Grid import ({})", report.rates.import)),
        cost_cell(breakdown.map(|cost| cost.import_cost)),
    ]);
    table.add_row(vec![
        Cell::new(format!("Export revenue ({})", report.rates.export)),
        cost_cell(breakdown.and_then(|cost| cost.export_revenue)),
    ]);
    table.add_row(vec![
        Cell::new(format!("Solar value ({})", report.rates.import)),
        cost_cell(report.solar_value()),
    ]);
    table.add_row(vec![
        Cell::new("Net cost"),
        cost_cell(breakdown.map(|cost| cost.net())),
    ]);
    table.add_row(vec![
        Cell::new("Projected annual cost"),
        cost_cell(report.annual_cost_projection()),
    ]);
    if let Some(offset) = report.solar_offset_percent() {
        table.add_row(vec![
            Cell::new("Solar offset"),
            Cell::new(format!("{offset:.1} %")).set_alignment(CellAlignment::Right),
        ]);
    }
    table
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use chrono::{NaiveDate, Utc};

    use super::*;
    use crate::{
        cost::Rates,
        quantity::{power::Kilowatts, rate::KilowattHourRate},
    };

    fn empty_report() -> Report {
        Report {
            generated_at: Utc::now(),
            rates: Rates { import: KilowattHourRate::from(0.15), export: KilowattHourRate::from(0.08) },
            monthly: BTreeMap::new(),
            daily: BTreeMap::new(),
            hourly: HourlyProfile { grid: [None; 24], solar: [None; 24] },
            peak_demand: BTreeMap::new(),
            grid_heatmap: [[None; 24]; 7],
        }
    }

    #[test]
    fn test_peak_demand_table_lists_the_heaviest_days() {
        let mut report = empty_report();
        report.peak_demand.insert(
            NaiveDate::from_ymd_opt(2025, 6, 1).unwrap(),
            (NaiveDate::from_ymd_opt(2025, 6, 17).unwrap(), KilowattHours::from(42.5)),
        );
        let rendered = build_peak_demand_table(&report).to_string();
        assert!(rendered.contains("Jun 2025"));
        assert!(rendered.contains("2025-06-17"));
        assert!(rendered.contains("42.50 kWh"));
    }

    #[test]
    fn test_status_table_keeps_absent_values_absent() {
        let readings = vec![
            InstantReading {
                register: "Grid".to_string(),
                power: Some(Kilowatts::from(1.2)),
                total: Some(KilowattHours::from(10.0)),
            },
            InstantReading { register: "Solar".to_string(), power: None, total: None },
        ];
        let rendered = build_status_table(&readings).to_string();
        assert!(rendered.contains("1200 W"));
        assert_eq!(rendered.matches(ABSENT).count(), 2);
    }
}
