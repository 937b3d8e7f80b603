use clap::Parser;

use crate::{
    chart,
    cli::{MonitorArgs, RateArgs},
    monitor::endpoint::Granularity,
    prelude::*,
    report::{History, analyze},
    tables::{
        build_cost_table,
        build_daily_table,
        build_hourly_table,
        build_monthly_table,
        build_peak_demand_table,
        build_status_table,
    },
};

#[must_use]
#[derive(Parser)]
pub struct ReportArgs {
    #[clap(flatten)]
    pub monitor: MonitorArgs,

    #[clap(flatten)]
    pub rates: RateArgs,

    /// How many months of stored history to request.
    #[clap(long, default_value_t = 12, value_parser = clap::value_parser!(u32).range(1..))]
    pub months: u32,

    /// How many days of stored history to request.
    #[clap(long, default_value_t = 365, value_parser = clap::value_parser!(u32).range(1..))]
    pub days: u32,

    /// How many hours of stored history to request.
    #[clap(long, default_value_t = 168, value_parser = clap::value_parser!(u32).range(1..))]
    pub hours: u32,

    /// Dashboard file name prefix; the timestamp and extension are appended.
    #[clap(long, default_value = "gridwatch")]
    pub output_prefix: String,
}

impl ReportArgs {
    pub async fn run(self) -> Result {
        let monitor = self.monitor.connect()?;

        // The device is a small embedded meter: one request at a time.
        let monthly = monitor.stored(Granularity::Monthly, self.months).await?;
        let daily = monitor.stored(Granularity::Daily, self.days).await?;
        let hourly = monitor.stored(Granularity::Hourly, self.hours).await?;
        let readings = monitor.instantaneous().await?;

        let history = History { monthly, daily, hourly };
        let report = analyze(&history, self.rates.rates())?;

        println!("{}", build_status_table(&readings));
        println!("{}", build_monthly_table(&report));
        println!("{}", build_daily_table(&report));
        println!("{}", build_peak_demand_table(&report));
        println!("{}", build_hourly_table(&report));
        println!("{}", build_cost_table(&report));

        let path = chart::output_path(&self.output_prefix, report.generated_at);
        chart::render_dashboard(&report, &path)?;
        info!(path = %path.display(), "rendered the dashboard");
        Ok(())
    }
}
