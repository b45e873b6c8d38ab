//! Configuration module for Laer.
//!
//! Handles loading and managing application settings and prompt templates.

mod prompts;
mod settings;

pub use prompts::{
    AnalystPrompts, ChatPrompts, PlannerPrompts, Prompts, QuizPrompts, TutorPrompts, UpdatePrompts,
};
pub use settings::{
    ArtifactSettings, ArtifactStoreProvider, CapabilitySettings, ChatSettings, GeneralSettings,
    PromptSettings, Settings, WeatherSettings,
};
