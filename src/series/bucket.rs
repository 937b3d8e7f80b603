//! Calendar bucketing of energy series.
//!
//! Bucket boundaries are UTC calendar boundaries: the device reports plain
//! Unix timestamps, and truncating in UTC keeps buckets stable across
//! daylight-saving transitions.

use std::collections::BTreeMap;

use chrono::{DateTime, Datelike, NaiveDate, Timelike, Utc};

use crate::quantity::energy::KilowattHours;

#[must_use]
#[derive(Copy, Clone, Debug)]
pub struct BucketStats {
    pub count: usize,
    pub sum: KilowattHours,
    pub min: KilowattHours,
    pub max: KilowattHours,
    pub first_at: DateTime<Utc>,
    sum_of_squares: f64,
}

impl BucketStats {
    fn new(at: DateTime<Utc>, value: KilowattHours) -> Self {
        Self {
            count: 1,
            sum: value,
            min: value,
            max: value,
            first_at: at,
            sum_of_squares: value.0 * value.0,
        }
    }

    fn push(&mut self, at: DateTime<Utc>, value: KilowattHours) {
        self.count += 1;
        self.sum += value;
        self.min = self.min.min(value);
        self.max = self.max.max(value);
        self.first_at = self.first_at.min(at);
        self.sum_of_squares += value.0 * value.0;
    }

    /// Always defined: a bucket only exists when at least one sample
    /// contributed to it.
    #[expect(clippy::cast_precision_loss)]
    pub fn mean(&self) -> KilowattHours {
        self.sum / self.count as f64
    }

    /// Sample standard deviation, [`None`] for fewer than two samples.
    #[expect(clippy::cast_precision_loss)]
    pub fn std_dev(&self) -> Option<KilowattHours> {
        if self.count < 2 {
            return None;
        }
        let count = self.count as f64;
        let variance = (self.sum_of_squares - self.sum.0 * self.sum.0 / count) / (count - 1.0);
        Some(KilowattHours::from(variance.max(0.0).sqrt()))
    }
}

impl<T> Bucket for T where T: ?Sized {}

pub trait Bucket {
    /// Group the samples by a derived calendar key. A key with no samples
    /// simply never appears in the map: an empty bucket is absent, not zero.
    fn bucket_by<K>(self, key: impl Fn(DateTime<Utc>) -> K) -> BTreeMap<K, BucketStats>
    where
        Self: Sized + Iterator<Item = (DateTime<Utc>, KilowattHours)>,
        K: Ord,
    {
        let mut buckets = BTreeMap::new();
        for (at, value) in self {
            buckets
                .entry(key(at))
                .and_modify(|stats: &mut BucketStats| stats.push(at, value))
                .or_insert_with(|| BucketStats::new(at, value));
        }
        buckets
    }

    #[must_use]
    fn bucket_daily(self) -> BTreeMap<NaiveDate, BucketStats>
    where
        Self: Sized + Iterator<Item = (DateTime<Utc>, KilowattHours)>,
    {
        self.bucket_by(|at| at.date_naive())
    }

    #[must_use]
    fn bucket_monthly(self) -> BTreeMap<NaiveDate, BucketStats>
    where
        Self: Sized + Iterator<Item = (DateTime<Utc>, KilowattHours)>,
    {
        self.bucket_by(|at| {
            let date = at.date_naive();
            date.with_day(1).unwrap_or(date)
        })
    }

    /// Hour-of-day profile across all days in the series.
    #[must_use]
    fn bucket_hour_of_day(self) -> [Option<BucketStats>; 24]
    where
        Self: Sized + Iterator<Item = (DateTime<Utc>, KilowattHours)>,
    {
        let mut profile: [Option<BucketStats>; 24] = [None; 24];
        for (at, value) in self {
            match &mut profile[at.hour() as usize] {
                Some(stats) => stats.push(at, value),
                slot @ None => *slot = Some(BucketStats::new(at, value)),
            }
        }
        profile
    }

    /// Weekday × hour-of-day grid, Monday first.
    #[must_use]
    fn bucket_weekday_hour(self) -> [[Option<BucketStats>; 24]; 7]
    where
        Self: Sized + Iterator<Item = (DateTime<Utc>, KilowattHours)>,
    {
        let mut grid: [[Option<BucketStats>; 24]; 7] = [[None; 24]; 7];
        for (at, value) in self {
            let slot = &mut grid[at.weekday().num_days_from_monday() as usize][at.hour() as usize];
            match slot {
                Some(stats) => stats.push(at, value),
                None => *slot = Some(BucketStats::new(at, value)),
            }
        }
        grid
    }
}

/// The bucket with the maximum statistic. Iteration is in ascending key
/// order and only a strictly greater value replaces the candidate, so ties
/// resolve to the earliest bucket.
pub fn peak_by<K: Ord>(
    buckets: &BTreeMap<K, BucketStats>,
    stat: impl Fn(&BucketStats) -> KilowattHours,
) -> Option<(&K, &BucketStats)> {
    let mut best: Option<(&K, &BucketStats)> = None;
    for (key, stats) in buckets {
        if best.is_none_or(|(_, candidate)| stat(stats) > stat(candidate)) {
            best = Some((key, stats));
        }
    }
    best
}
