//! Static persona configuration bound to each agent at construction.

use serde::{Deserialize, Serialize};

/// Role, goal and backstory of an agent. Never mutated after construction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersonaConfig {
    pub role: String,
    pub goal: String,
    pub backstory: String,
}

impl PersonaConfig {
    pub fn new(
        role: impl Into<String>,
        goal: impl Into<String>,
        backstory: impl Into<String>,
    ) -> Self {
        Self {
            role: role.into(),
            goal: goal.into(),
            backstory: normalize_whitespace(&backstory.into()),
        }
    }

    /// System prompt used when the persona talks to a language model.
    pub fn system_prompt(&self) -> String {
        format!(
            "You are {}. {}\nYour personal goal is: {}",
            self.role, self.backstory, self.goal
        )
    }
}

fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
