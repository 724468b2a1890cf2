//! Fixed system/user instructions for the code-generation request.

use crate::llm::{ChatMessage, Role};

pub const SYSTEM_PROMPT: &str = "You are a Python data scientist. Generate simple code that:
1. Uses numpy to generate 5 random numbers
2. Prints only the mean and standard deviation in a clean format
Example output format:
Mean: 5.2
Std Dev: 1.8";

pub const USER_PROMPT: &str = "Generate 20 random whole numbers between 1 and 100, print those numbers, and show their mean and standard deviation";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptPair {
    pub system_instruction: String,
    pub user_instruction: String,
}

impl Default for PromptPair {
    fn default() -> Self {
        Self::new(SYSTEM_PROMPT, USER_PROMPT)
    }
}

impl PromptPair {
    pub fn new(system: impl Into<String>, user: impl Into<String>) -> Self {
        Self { system_instruction: system.into(), user_instruction: user.into() }
    }

    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system_instruction = system.into();
        self
    }

    pub fn with_user(mut self, user: impl Into<String>) -> Self {
        self.user_instruction = user.into();
        self
    }

    /// The conversation sent to the completion service: system, then user.
    pub fn messages(&self) -> Vec<ChatMessage> {
        vec![
            ChatMessage::new(Role::System, self.system_instruction.clone()),
            ChatMessage::new(Role::User, self.user_instruction.clone()),
        ]
    }
}
