// Show the effective configuration

use tether_config::TetherConfig;

use super::Command;
use crate::error::CliResult;

/// Print the merged file/environment configuration as TOML
pub struct ConfigCommand {
    config: TetherConfig,
}

impl ConfigCommand {
    pub fn new(config: TetherConfig) -> Self {
        Self { config }
    }
}

#[async_trait::async_trait]
impl Command for ConfigCommand {
    async fn execute(&self) -> CliResult<i32> {
        print!("{}", self.config.to_toml()?);
        Ok(0)
    }
}
