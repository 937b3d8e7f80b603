pub mod bucket;

use std::{
    fmt::Debug,
    ops::{Range, Sub},
};

use itertools::Itertools;

use crate::prelude::*;

pub type Point<K, V> = (K, V);
pub type Series<K, V> = Vec<Point<K, V>>;

impl<T> Deltas for T where T: ?Sized {}

pub trait Deltas {
    /// Subtract the pairwise windows and return the iterator over `(Range<K>, ΔV)`.
    fn deltas<K, V>(self) -> impl Iterator<Item = (Range<K>, <V as Sub>::Output)>
    where
        Self: Iterator<Item = (K, V)> + Sized,
        K: Copy,
        V: Copy + Sub,
    {
        self.tuple_windows().map(|((from_key, from_value), (to_key, to_value))| {
            (from_key..to_key, to_value - from_value)
        })
    }

    /// Like [`Deltas::deltas`], but for cumulative counters: a decreasing
    /// value means the counter was reset or rolled over, and the whole
    /// series is rejected rather than yielding a negative delta.
    fn try_deltas<K, V>(self) -> Result<Series<Range<K>, <V as Sub>::Output>>
    where
        Self: Iterator<Item = (K, V)> + Sized,
        K: Copy + Debug,
        V: Copy + PartialOrd + Sub,
    {
        self.tuple_windows()
            .map(|((from_key, from_value), (to_key, to_value))| {
                ensure!(
                    to_value >= from_value,
                    "cumulative counter decreased between {from_key:?} and {to_key:?} (reset or rollover)",
                );
                Ok((from_key..to_key, to_value - from_value))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deltas() {
        let series = vec![(2, 100), (3, 200), (5, 600)];
        let diff: Vec<_> = series.into_iter().deltas().collect();
        assert_eq!(diff, vec![(2..3, 100), (3..5, 400)]);
    }

    #[test]
    fn test_try_deltas_ok() -> Result {
        let series = vec![(2, 100), (3, 200)];
        let diff = series.into_iter().try_deltas()?;
        assert_eq!(diff, vec![(2..3, 100)]);
        Ok(())
    }

    #[test]
    fn test_try_deltas_rejects_counter_reset() {
        let series = vec![(2, 100), (3, 50)];
        assert!(series.into_iter().try_deltas().is_err());
    }
}
