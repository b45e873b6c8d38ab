//! Configuration inspection.

use crate::cli::{ConfigAction, Output};
use crate::config::Settings;
use crate::error::{LaerError, Result};

/// Run the config command.
pub fn run_config(action: &ConfigAction, settings: Settings) -> Result<()> {
    match action {
        ConfigAction::Show => {
            let rendered = toml::to_string_pretty(&settings)
                .map_err(|e| LaerError::Config(e.to_string()))?;
            Output::header("Active configuration");
            println!("{}", rendered);
        }
        ConfigAction::Path => {
            println!("{}", Settings::default_config_path().display());
        }
    }
    Ok(())
}
