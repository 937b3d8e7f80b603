use clap::Parser;

use crate::{cli::MonitorArgs, prelude::*, tables::build_status_table};

#[must_use]
#[derive(Parser)]
pub struct StatusArgs {
    #[clap(flatten)]
    pub monitor: MonitorArgs,
}

impl StatusArgs {
    pub async fn run(self) -> Result {
        let readings = self.monitor.connect()?.instantaneous().await?;
        println!("{}", build_status_table(&readings));
        Ok(())
    }
}
