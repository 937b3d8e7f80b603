use clap::Parser;
use reqwest::Url;

use crate::{
    monitor::{Monitor, digest::Credentials},
    prelude::*,
};

#[must_use]
#[derive(Parser)]
pub struct MonitorArgs {
    /// Base URL of the meter, for example: `http://egauge12345.local`.
    #[clap(long = "url", env = "EGAUGE_URL")]
    pub url: Url,

    /// Only needed when the device is password-protected.
    #[clap(long, env = "EGAUGE_USERNAME", requires = "password")]
    pub username: Option<String>,

    #[clap(long, env = "EGAUGE_PASSWORD", hide_env_values = true, requires = "username")]
    pub password: Option<String>,
}

impl MonitorArgs {
    pub fn connect(&self) -> Result<Monitor> {
        let credentials = match (&self.username, &self.password) {
            (Some(username), Some(password)) => Some(Credentials {
                username: username.clone(),
                password: password.clone(),
            }),
            _ => None,
        };
        Ok(Monitor::new(self.url.clone(), credentials)?)
    }
}
