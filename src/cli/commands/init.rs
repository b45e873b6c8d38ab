//! Initialize configuration and data directories.

use crate::cli::Output;
use crate::config::Settings;
use crate::error::Result;

/// Run the init command.
pub fn run_init(settings: &Settings) -> Result<()> {
    Output::header("Laer Setup");

    let data_dir = settings.data_dir();
    std::fs::create_dir_all(&data_dir)?;
    Output::success(&format!("Data directory ready at {:?}", data_dir));

    let config_path = Settings::default_config_path();
    if config_path.exists() {
        Output::info(&format!("Configuration already exists at {:?}", config_path));
    } else {
        settings.save_to(&config_path)?;
        Output::success(&format!("Wrote default configuration to {:?}", config_path));
    }

    println!();
    Output::info("Set OPENAI_API_KEY, then try: laer chat");
    Ok(())
}
