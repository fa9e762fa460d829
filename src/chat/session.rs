use anyhow::Error;

use crate::ai::agent::BookingAgent;
use crate::core::BookingError;
use crate::openai::{Message, Role};

pub const GREETING: &str = "Hello! How can I help you schedule an appointment today?";

const AUTH_REQUIRED_REPLY: &str = "I can't reach your calendar because it isn't authorized. Run `booker auth` to connect it, then try again.";
const GAVE_UP_REPLY: &str =
    "Sorry, I wasn't able to finish that request. Please try again or rephrase it.";

#[derive(Clone, Debug, PartialEq)]
pub struct Turn {
    pub role: Role,
    pub content: String,
}

impl Turn {
    fn user(content: &str) -> Self {
        Self {
            role: Role::User,
            content: content.to_string(),
        }
    }

    fn assistant(content: &str) -> Self {
        Self {
            role: Role::Assistant,
            content: content.to_string(),
        }
    }
}

impl From<&Turn> for Message {
    fn from(turn: &Turn) -> Self {
        Message::new(turn.role.clone(), &turn.content)
    }
}

/// Map a failed turn to something the user can read. Nothing that
/// goes wrong in the agent is allowed to end the session.
pub fn render_error(err: &Error) -> String {
    match err.downcast_ref::<BookingError>() {
        Some(BookingError::AuthenticationRequired(_)) => AUTH_REQUIRED_REPLY.to_string(),
        Some(BookingError::AgentLoopDivergence(_)) | Some(BookingError::AgentTimeout(_)) => {
            GAVE_UP_REPLY.to_string()
        }
        _ => format!("An unexpected error occurred: {}", err),
    }
}

/// One interactive conversation. History only ever grows and holds
/// the user and assistant turns; tool traffic stays inside the agent.
pub struct ChatSession {
    agent: BookingAgent,
    history: Vec<Turn>,
}

impl ChatSession {
    pub fn new(agent: BookingAgent) -> Self {
        Self {
            agent,
            history: vec![Turn::assistant(GREETING)],
        }
    }

    pub fn history(&self) -> &[Turn] {
        &self.history
    }

    /// Append the user's message, run the agent to completion and
    /// append its reply (or a rendered error). Returns the new
    /// assistant turn.
    pub async fn send(&mut self, text: &str) -> &Turn {
        self.history.push(Turn::user(text));
        let messages: Vec<Message> = self.history.iter().map(Message::from).collect();

        let reply = match self.agent.run(&messages).await {
            Ok(turn) => {
                tracing::debug!("Turn finished after {} model calls", turn.generate_steps);
                turn.reply
            }
            Err(e) => {
                tracing::error!("Turn failed: {:#}", e);
                render_error(&e)
            }
        };
        self.history.push(Turn::assistant(&reply));
        &self.history[self.history.len() - 1]
    }
}
