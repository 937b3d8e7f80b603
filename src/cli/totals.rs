use clap::Parser;

use crate::{cli::MonitorArgs, prelude::*, tables::build_totals_table};

#[must_use]
#[derive(Parser)]
pub struct TotalsArgs {
    #[clap(flatten)]
    pub monitor: MonitorArgs,
}

impl TotalsArgs {
    pub async fn run(self) -> Result {
        let readings = self.monitor.connect()?.totals().await?;
        println!("{}", build_totals_table(&readings));
        Ok(())
    }
}
