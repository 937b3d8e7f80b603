//! Payload models for the device's two XML shapes.
//!
//! The instantaneous and totals endpoints return one `<r>` element per
//! register with `<v>` (cumulative watt-hours) and `<i>` (rate in watts)
//! children. The stored-history endpoint returns a columnar matrix: `<cname>`
//! elements label the columns and each `<r>` row holds one cumulative
//! watt-hour cell per column, walking backwards in time from `time_stamp` in
//! steps of `time_delta` seconds.

use std::collections::BTreeMap;

use chrono::{DateTime, TimeZone, Utc};
use serde::Deserialize;

use crate::{
    monitor::MonitorError,
    quantity::{energy::KilowattHours, power::Kilowatts},
    series::Series,
};

#[must_use]
#[derive(Deserialize)]
pub struct InstantData {
    #[serde(rename = "ts", default)]
    pub timestamp: Option<i64>,

    #[serde(rename = "r", default)]
    pub registers: Vec<InstantRegister>,
}

#[must_use]
#[derive(Deserialize)]
pub struct InstantRegister {
    #[serde(rename = "@n")]
    pub name: String,

    /// Cumulative counter in watt-hours.
    #[serde(rename = "v", default)]
    pub value: Option<f64>,

    /// Instantaneous rate in watts.
    #[serde(rename = "i", default)]
    pub rate: Option<f64>,
}

/// One decoded register reading. Power and total are independently optional:
/// the totals endpoint omits rates, and a register may legitimately lack
/// either field. Absence stays absence, it is never coerced to zero.
#[must_use]
pub struct InstantReading {
    pub register: String,
    pub power: Option<Kilowatts>,
    pub total: Option<KilowattHours>,
}

impl InstantData {
    pub fn parse(payload: &str) -> Result<Self, MonitorError> {
        quick_xml::de::from_str(payload).map_err(|error| MonitorError::Decode(error.to_string()))
    }

    /// The device clock at the moment the payload was produced.
    #[must_use]
    pub fn taken_at(&self) -> Option<DateTime<Utc>> {
        self.timestamp.and_then(|seconds| Utc.timestamp_opt(seconds, 0).single())
    }

    pub fn into_readings(self) -> Vec<InstantReading> {
        self.registers
            .into_iter()
            .map(|register| InstantReading {
                register: register.name,
                power: register.rate.map(Kilowatts::from_watts),
                total: register.value.map(KilowattHours::from_watt_hours),
            })
            .collect()
    }
}

#[must_use]
#[derive(Deserialize)]
pub struct StoredGroup {
    #[serde(rename = "data", default)]
    pub sections: Vec<StoredData>,
}

#[must_use]
#[derive(Deserialize)]
pub struct StoredData {
    /// Timestamp of the first row as a hex literal, for example `0x65130e10`.
    #[serde(rename = "@time_stamp", default)]
    pub time_stamp: Option<String>,

    /// Seconds between consecutive rows.
    #[serde(rename = "@time_delta", default)]
    pub time_delta: Option<i64>,

    #[serde(rename = "cname", default)]
    pub columns: Vec<ColumnName>,

    #[serde(rename = "r", default)]
    pub rows: Vec<StoredRow>,
}

#[must_use]
#[derive(Deserialize)]
pub struct ColumnName {
    #[serde(rename = "@did", default)]
    pub index: Option<usize>,

    #[serde(rename = "$text", default)]
    pub name: Option<String>,
}

#[must_use]
#[derive(Deserialize)]
pub struct StoredRow {
    #[serde(rename = "c", default)]
    pub cells: Vec<StoredCell>,
}

#[must_use]
#[derive(Deserialize)]
pub struct StoredCell {
    #[serde(rename = "$text", default)]
    pub value: Option<f64>,
}

/// Per-register cumulative counter series decoded from a stored-history
/// response, each sorted ascending by timestamp.
#[must_use]
#[derive(Debug)]
pub struct StoredSeries {
    registers: BTreeMap<String, Series<DateTime<Utc>, KilowattHours>>,
}

impl StoredSeries {
    pub fn parse(payload: &str) -> Result<Self, MonitorError> {
        let group: StoredGroup = quick_xml::de::from_str(payload)
            .map_err(|error| MonitorError::Decode(error.to_string()))?;
        Self::decode(group)
    }

    pub fn decode(group: StoredGroup) -> Result<Self, MonitorError> {
        let mut registers: BTreeMap<String, Series<DateTime<Utc>, KilowattHours>> =
            BTreeMap::new();
        for section in group.sections {
            let start_at = parse_hex_timestamp(section.time_stamp.as_deref().ok_or_else(
                || MonitorError::Decode("missing `time_stamp` attribute".to_string()),
            )?)?;
            let time_delta = section
                .time_delta
                .ok_or_else(|| MonitorError::Decode("missing `time_delta` attribute".to_string()))?;
            if time_delta <= 0 {
                return Err(MonitorError::Decode(format!(
                    "non-positive `time_delta` of {time_delta} seconds"
                )));
            }

            let mut names = BTreeMap::new();
            for column in section.columns {
                let index = column.index.ok_or_else(|| {
                    MonitorError::Decode("column name without a `did` attribute".to_string())
                })?;
                let name = column.name.ok_or_else(|| {
                    MonitorError::Decode(format!("column {index} has an empty name"))
                })?;
                names.insert(index, name);
            }

            // Rows walk backwards in time; collect and reverse into
            // ascending order per register.
            for (row_index, row) in section.rows.into_iter().enumerate() {
                let at = start_at - chrono::TimeDelta::seconds(time_delta * row_index as i64);
                for (cell_index, cell) in row.cells.into_iter().enumerate() {
                    let Some(name) = names.get(&cell_index) else {
                        continue;
                    };
                    let value = cell.value.ok_or_else(|| {
                        MonitorError::Decode(format!(
                            "empty cell for register `{name}` at {at}"
                        ))
                    })?;
                    registers
                        .entry(name.clone())
                        .or_default()
                        .push((at, KilowattHours::from_watt_hours(value)));
                }
            }
        }
        for series in registers.values_mut() {
            series.reverse();
        }
        Ok(Self { registers })
    }

    #[must_use]
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.registers.keys().map(String::as_str)
    }

    /// The first register matching any of the candidate names. The device
    /// exposes either plain total counters (`Grid`) or signed import/export
    /// pairs (`Grid_Incoming`), so lookups carry both conventions.
    #[must_use]
    pub fn get(&self, candidates: &[&str]) -> Option<&Series<DateTime<Utc>, KilowattHours>> {
        candidates.iter().find_map(|name| self.registers.get(*name))
    }

    pub fn require(
        &self,
        candidates: &[&str],
    ) -> Result<&Series<DateTime<Utc>, KilowattHours>, MonitorError> {
        self.get(candidates).ok_or_else(|| {
            MonitorError::Decode(format!(
                "none of the expected registers {candidates:?} is present in the payload"
            ))
        })
    }
}

fn parse_hex_timestamp(literal: &str) -> Result<DateTime<Utc>, MonitorError> {
    let seconds = i64::from_str_radix(literal.trim_start_matches("0x"), 16)
        .map_err(|error| MonitorError::Decode(format!("bad timestamp `{literal}`: {error}")))?;
    Utc.timestamp_opt(seconds, 0)
        .single()
        .ok_or_else(|| MonitorError::Decode(format!("timestamp `{literal}` is out of range")))
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;

    use super::*;

    const INSTANT_PAYLOAD: &str = r#"<?xml version="1.0" encoding="UTF-8" ?>
        <data serial="0x51f67fdd">
            <ts>1695405406</ts>
            <r t="P" n="Grid"><v>123456789</v><i>1234</i></r>
            <r t="P" n="Solar"><v>23456789</v><i>-567</i></r>
            <r t="P" n="Grid_Incoming"><v>98765432</v></r>
        </data>"#;

    const STORED_PAYLOAD: &str = r#"<?xml version="1.0" encoding="UTF-8" ?>
        <group serial="0x51f67fdd">
            <data columns="2" time_stamp="0x65130e10" time_delta="3600" epoch="0x648c2d80">
                <cname t="P" did="0">Grid</cname>
                <cname t="P" did="1">Solar</cname>
                <r><c>300000</c><c>150000</c></r>
                <r><c>200000</c><c>140000</c></r>
                <r><c>100000</c><c>130000</c></r>
            </data>
        </group>"#;

    #[test]
    fn test_parse_instantaneous() {
        let data = InstantData::parse(INSTANT_PAYLOAD).unwrap();
        assert_eq!(data.taken_at(), Utc.timestamp_opt(1_695_405_406, 0).single());

        let readings = data.into_readings();
        assert_eq!(readings.len(), 3);

        assert_eq!(readings[0].register, "Grid");
        assert_abs_diff_eq!(readings[0].power.unwrap().0, 1.234, epsilon = 1e-9);
        assert_abs_diff_eq!(readings[0].total.unwrap().0, 123_456.789, epsilon = 1e-6);

        assert_abs_diff_eq!(readings[1].power.unwrap().0, -0.567, epsilon = 1e-9);

        // No `<i>` element: the rate is absent, not zero.
        assert!(readings[2].power.is_none());
        assert!(readings[2].total.is_some());
    }

    #[test]
    fn test_parse_stored_is_ascending() {
        let series = StoredSeries::parse(STORED_PAYLOAD).unwrap();
        let grid = series.require(&["Grid"]).unwrap();

        assert_eq!(grid.len(), 3);
        assert!(grid.windows(2).all(|pair| pair[0].0 < pair[1].0));
        assert_abs_diff_eq!(grid[0].1.0, 100.0, epsilon = 1e-9);
        assert_abs_diff_eq!(grid[2].1.0, 300.0, epsilon = 1e-9);
        assert_eq!(grid[2].0, Utc.timestamp_opt(0x6513_0e10, 0).unwrap());
        assert_eq!(grid[1].0, Utc.timestamp_opt(0x6513_0e10 - 3600, 0).unwrap());
    }

    #[test]
    fn test_missing_register_is_a_decode_error() {
        let series = StoredSeries::parse(STORED_PAYLOAD).unwrap();
        let error = series.require(&["Grid_Incoming"]).unwrap_err();
        assert!(matches!(error, MonitorError::Decode(_)));
    }

    #[test]
    fn test_empty_cell_is_a_decode_error() {
        let payload = r#"
            <group>
                <data time_stamp="0x65130e10" time_delta="3600">
                    <cname did="0">Grid</cname>
                    <r><c></c></r>
                </data>
            </group>"#;
        assert!(matches!(StoredSeries::parse(payload), Err(MonitorError::Decode(_))));
    }

    #[test]
    fn test_missing_time_stamp_is_a_decode_error() {
        let payload = r#"
            <group>
                <data time_delta="3600"><cname did="0">Grid</cname></data>
            </group>"#;
        assert!(matches!(StoredSeries::parse(payload), Err(MonitorError::Decode(_))));
    }
}
