mod monitor;
mod rates;
mod report;
mod status;
mod totals;

use clap::{Parser, Subcommand};

pub use self::{
    monitor::MonitorArgs,
    rates::RateArgs,
    report::ReportArgs,
    status::StatusArgs,
    totals::TotalsArgs,
};

#[derive(Parser)]
#[command(author, version, about, propagate_version = true)]
#[must_use]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Main command: fetch the history, aggregate it, print the summary
    /// tables, and render the chart dashboard.
    Report(Box<ReportArgs>),

    /// Current power per register.
    Status(StatusArgs),

    /// Lifetime cumulative totals per register.
    Totals(TotalsArgs),
}
