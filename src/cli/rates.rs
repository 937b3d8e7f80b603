use clap::Parser;

use crate::{cost::Rates, quantity::rate::KilowattHourRate};

#[must_use]
#[derive(Parser)]
pub struct RateArgs {
    /// Price paid per imported kilowatt-hour.
    #[clap(long, env = "IMPORT_RATE", default_value = "0.15")]
    pub import_rate: KilowattHourRate,

    /// Feed-in compensation per exported kilowatt-hour.
    #[clap(long, env = "EXPORT_RATE", default_value = "0.08")]
    pub export_rate: KilowattHourRate,
}

impl RateArgs {
    pub const fn rates(&self) -> Rates {
        Rates { import: self.import_rate, export: self.export_rate }
    }
}
