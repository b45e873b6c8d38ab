//! Diagnostics for configuration and environment.

use crate::artifact::open_store;
use crate::cli::Output;
use crate::config::Settings;
use crate::error::Result;

/// Run the doctor command.
pub fn run_doctor(settings: &Settings) -> Result<()> {
    Output::header("Laer Doctor");
    println!();

    let mut problems = 0;

    match std::env::var("OPENAI_API_KEY") {
        Ok(key) if !key.is_empty() => Output::success("OPENAI_API_KEY is set"),
        _ => {
            Output::error("OPENAI_API_KEY is not set");
            problems += 1;
        }
    }

    match open_store(settings) {
        Ok(_) => Output::success(&format!(
            "Artifact store ({}) opens cleanly",
            settings.artifacts.provider
        )),
        Err(e) => {
            Output::error(&format!("Artifact store failed to open: {}", e));
            problems += 1;
        }
    }

    println!();
    Output::header("Configuration");
    Output::kv("Config file", &format!("{:?}", Settings::default_config_path()));
    Output::kv("Data directory", &format!("{:?}", settings.data_dir()));
    Output::kv("Chat model", &settings.chat.model);
    Output::kv("Step budget", &settings.chat.step_budget.to_string());
    Output::kv(
        "Artifact store",
        &format!(
            "{} ({:?})",
            settings.artifacts.provider,
            settings.artifacts_db_path()
        ),
    );
    if !settings.capabilities.disabled.is_empty() {
        Output::kv("Disabled capabilities", &settings.capabilities.disabled.join(", "));
    }

    println!();
    if problems == 0 {
        Output::success("Everything looks good.");
    } else {
        Output::warning(&format!("{} problem(s) found.", problems));
    }

    Ok(())
}
