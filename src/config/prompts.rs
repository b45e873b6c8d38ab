//! Prompt templates for Laer.
//!
//! Prompts can be customized by placing TOML files in the custom prompts directory.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Collection of all prompt templates.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct Prompts {
    pub chat: ChatPrompts,
    pub tutor: TutorPrompts,
    pub analyst: AnalystPrompts,
    pub quiz: QuizPrompts,
    pub planner: PlannerPrompts,
    pub update: UpdatePrompts,
    /// Custom variables from config, available in all prompts.
    #[serde(skip)]
    pub variables: std::collections::HashMap<String, String>,
}

/// System prompt for the orchestrating chat model.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatPrompts {
    pub system: String,
}

impl Default for ChatPrompts {
    fn default() -> Self {
        Self {
            system: r#"You are a friendly study assistant. You help the user learn by answering questions and by using your capabilities when they fit the request.

Guidelines:
- Use 'get_weather' when the user asks about weather conditions
- Use 'explain_topic' when the user wants a topic taught or explained in depth
- Use 'analyze_progress' when the user pastes notes or results and wants feedback
- Use 'generate_quiz' when the user asks to be quizzed or tested on a topic
- Use 'generate_study_plan' when the user wants a multi-week learning plan
- Use 'update_artifact' when the user wants to change a quiz or plan you already created

When a capability creates a quiz or study plan, it is shown to the user in a side panel. Acknowledge it briefly instead of repeating its full content.
Answer directly, without capabilities, whenever the request is conversational."#
                .to_string(),
        }
    }
}

/// Prompts for the tutor (topic explanation) capability.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TutorPrompts {
    pub system: String,
    pub user: String,
}

impl Default for TutorPrompts {
    fn default() -> Self {
        Self {
            system: r#"You are a patient tutor. Explain topics clearly, building from what a learner at the stated level already knows.

Guidelines:
- Open with a one-sentence summary of the topic
- Develop the explanation step by step with concrete examples
- Define jargon the first time it appears
- Close with two or three questions the learner can use to check understanding"#
                .to_string(),

            user: r#"Explain the following topic to a learner at the {{level}} level.

Topic: {{topic}}"#
                .to_string(),
        }
    }
}

/// Prompts for the study analyst capability.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalystPrompts {
    pub system: String,
    pub user: String,
}

impl Default for AnalystPrompts {
    fn default() -> Self {
        Self {
            system: r#"You are a study analyst. You review a learner's notes, quiz results, or self-assessments and report what they show.

Guidelines:
- Identify strengths and weak spots, citing the material you were given
- Be specific: name the concepts, not just "some areas"
- Suggest at most three concrete next steps
- If the material is too thin to analyze, say so rather than guessing"#
                .to_string(),

            user: r#"{{question}}

Material to analyze:
{{notes}}"#
                .to_string(),
        }
    }
}

/// Prompts for quiz generation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QuizPrompts {
    pub system: String,
    pub user: String,
}

impl Default for QuizPrompts {
    fn default() -> Self {
        Self {
            system: r#"You are a quiz author. You produce multiple-choice quizzes as a single JSON object and nothing else.

Output format:
{
  "title": "Quiz title",
  "questions": [
    {
      "question": "The question text",
      "options": ["option A", "option B", "option C", "option D"],
      "correctAnswer": 0,
      "explanation": "Why the correct option is right"
    }
  ]
}

Rules:
- Every question has exactly 4 options
- "correctAnswer" is the 0-based index of the correct option
- Wrong options must be plausible, not obviously silly
- Vary which index holds the correct answer
- Output only the JSON object, no prose and no code fences"#
                .to_string(),

            user: r#"Write a quiz with {{question_count}} questions on: {{topic}}
{{source_section}}"#
                .to_string(),
        }
    }
}

/// Prompts for study plan generation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlannerPrompts {
    pub system: String,
    pub user: String,
}

impl Default for PlannerPrompts {
    fn default() -> Self {
        Self {
            system: r#"You are a study planner. You produce week-by-week learning plans as a single JSON object and nothing else.

Output format:
{
  "title": "Plan title",
  "weeks": [
    {
      "title": "Week 1: ...",
      "goals": ["goal", "goal"],
      "tasks": [
        { "description": "what to do", "duration": "2 hours", "done": false }
      ],
      "resources": ["book, course or article"]
    }
  ]
}

Rules:
- One entry per week, in order
- Tasks are concrete actions with realistic durations
- "done" is always false in a new plan
- Respect the learner's stated weekly time budget
- Output only the JSON object, no prose and no code fences"#
                .to_string(),

            user: r#"Create a {{weeks}}-week study plan for this goal: {{goal}}

The learner can spend about {{hours_per_week}} hours per week."#
                .to_string(),
        }
    }
}

/// Prompts for the artifact update capability.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UpdatePrompts {
    pub system: String,
    pub user: String,
}

impl Default for UpdatePrompts {
    fn default() -> Self {
        Self {
            system: r#"You revise an existing JSON document according to an instruction.

Rules:
- Keep exactly the same JSON structure and field names as the current document
- Apply only the requested change; leave everything else as it is
- Output the complete revised JSON object, no prose and no code fences"#
                .to_string(),

            user: r#"Current document (kind: {{kind}}):
{{content}}

Instruction: {{instruction}}"#
                .to_string(),
        }
    }
}

impl Prompts {
    /// Load prompts from the default location, with optional custom directory and variables.
    pub fn load(
        custom_dir: Option<&str>,
        custom_variables: Option<&std::collections::HashMap<String, String>>,
    ) -> crate::error::Result<Self> {
        let mut prompts = Prompts::default();

        if let Some(vars) = custom_variables {
            prompts.variables = vars.clone();
        }

        if let Some(dir) = custom_dir {
            let custom_path = PathBuf::from(shellexpand::tilde(dir).to_string());

            let chat_path = custom_path.join("chat.toml");
            if chat_path.exists() {
                let content = std::fs::read_to_string(&chat_path)?;
                prompts.chat = toml::from_str(&content)?;
            }

            let tutor_path = custom_path.join("tutor.toml");
            if tutor_path.exists() {
                let content = std::fs::read_to_string(&tutor_path)?;
                prompts.tutor = toml::from_str(&content)?;
            }

            let analyst_path = custom_path.join("analyst.toml");
            if analyst_path.exists() {
                let content = std::fs::read_to_string(&analyst_path)?;
                prompts.analyst = toml::from_str(&content)?;
            }

            let quiz_path = custom_path.join("quiz.toml");
            if quiz_path.exists() {
                let content = std::fs::read_to_string(&quiz_path)?;
                prompts.quiz = toml::from_str(&content)?;
            }

            let planner_path = custom_path.join("planner.toml");
            if planner_path.exists() {
                let content = std::fs::read_to_string(&planner_path)?;
                prompts.planner = toml::from_str(&content)?;
            }

            let update_path = custom_path.join("update.toml");
            if update_path.exists() {
                let content = std::fs::read_to_string(&update_path)?;
                prompts.update = toml::from_str(&content)?;
            }
        }

        Ok(prompts)
    }

    /// Render a prompt template with the given variables.
    pub fn render(template: &str, vars: &std::collections::HashMap<String, String>) -> String {
        let mut result = template.to_string();
        for (key, value) in vars {
            result = result.replace(&format!("{{{{{}}}}}", key), value);
        }
        result
    }

    /// Render a prompt template with both provided variables and custom config variables.
    /// Provided variables take precedence over custom config variables.
    pub fn render_with_custom(
        &self,
        template: &str,
        vars: &std::collections::HashMap<String, String>,
    ) -> String {
        let mut merged = self.variables.clone();
        for (key, value) in vars {
            merged.insert(key.clone(), value.clone());
        }
        Self::render(template, &merged)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_prompts() {
        let prompts = Prompts::default();
        assert!(!prompts.chat.system.is_empty());
        assert!(!prompts.quiz.system.is_empty());
        assert!(prompts.quiz.system.contains("correctAnswer"));
    }

    #[test]
    fn test_render_template() {
        let template = "Explain {{topic}} at the {{level}} level.";
        let mut vars = std::collections::HashMap::new();
        vars.insert("topic".to_string(), "ownership".to_string());
        vars.insert("level".to_string(), "intro".to_string());

        let result = Prompts::render(template, &vars);
        assert_eq!(result, "Explain ownership at the intro level.");
    }

    #[test]
    fn test_custom_variables_merge() {
        let mut prompts = Prompts::default();
        prompts
            .variables
            .insert("level".to_string(), "advanced".to_string());

        let mut vars = std::collections::HashMap::new();
        vars.insert("topic".to_string(), "lifetimes".to_string());

        let result = prompts.render_with_custom("{{topic}} / {{level}}", &vars);
        assert_eq!(result, "lifetimes / advanced");
    }
}
