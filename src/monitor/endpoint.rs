use std::fmt::{Display, Formatter};

/// Stored-history granularity, mapped onto the device's one-letter query
/// selectors.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Granularity {
    Hourly,
    Daily,
    Monthly,
}

impl Granularity {
    pub const fn selector(self) -> char {
        match self {
            Self::Hourly => 'h',
            Self::Daily => 'd',
            Self::Monthly => 'm',
        }
    }
}

impl Display for Granularity {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Hourly => write!(f, "hourly"),
            Self::Daily => write!(f, "daily"),
            Self::Monthly => write!(f, "monthly"),
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Endpoint {
    /// Current register rates: `/cgi-bin/egauge?inst`.
    Instantaneous,

    /// Cumulative counters: `/cgi-bin/egauge?tot`.
    Totals,

    /// Stored history rows: `/cgi-bin/egauge-show?h|d|m&n=N`.
    Stored { granularity: Granularity, rows: u32 },
}

impl Endpoint {
    pub fn path_and_query(self) -> String {
        match self {
            Self::Instantaneous => "cgi-bin/egauge?inst".to_string(),
            Self::Totals => "cgi-bin/egauge?tot".to_string(),
            Self::Stored { granularity, rows } => {
                format!("cgi-bin/egauge-show?{}&n={rows}", granularity.selector())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_path_and_query() {
        assert_eq!(Endpoint::Instantaneous.path_and_query(), "cgi-bin/egauge?inst");
        assert_eq!(
            Endpoint::Stored { granularity: Granularity::Monthly, rows: 12 }.path_and_query(),
            "cgi-bin/egauge-show?m&n=12",
        );
    }
}
