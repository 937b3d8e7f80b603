#![allow(clippy::doc_markdown)]
#![doc = include_str!("../README.md")]

mod chart;
mod cli;
mod cost;
mod monitor;
mod prelude;
mod quantity;
mod report;
mod series;
mod tables;

use clap::{Parser, crate_version};

use crate::{
    cli::{Args, Command},
    prelude::*,
};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result {
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt().without_time().compact().init();
    info!(version = crate_version!(), "starting…");

    let args = Args::parse();
    match args.command {
        Command::Report(args) => args.run().await?,
        Command::Status(args) => args.run().await?,
        Command::Totals(args) => args.run().await?,
    }

    info!("done!");
    Ok(())
}
