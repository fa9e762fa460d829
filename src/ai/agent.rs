//! Bounded Generate/Act loop that drives the model and the calendar
//! tools for a single chat turn.
//!
//! Generate sends the system prompt and the full history to the model.
//! If the model asks for tools the loop moves to Act, runs them and
//! goes back to Generate with the results appended. The turn ends on
//! the first response without tool calls. The number of Generate steps
//! and the total wall-clock time are both capped so a model that never
//! settles can't hang the session.

use std::time::Duration;

use anyhow::{Context, Error, Result, bail};
use futures_util::future::try_join_all;

use crate::ai::prompt::{BookingAssistantContext, render_booking_prompt};
use crate::calendar::LocalZone;
use crate::core::{AppConfig, BookingError};
use crate::openai::{BoxedToolCall, FunctionCall, Message, Role, completion};

enum Step {
    Generate,
    Act(Vec<FunctionCall>),
}

/// Result of one completed turn.
#[derive(Debug)]
pub struct AgentTurn {
    pub reply: String,
    /// Tool requests, tool results and the final reply, in order
    pub messages: Vec<Message>,
    pub generate_steps: usize,
}

pub struct BookingAgent {
    api_hostname: String,
    api_key: String,
    model: String,
    tools: Vec<BoxedToolCall>,
    zone: LocalZone,
    max_steps: usize,
    timeout: Duration,
}

impl BookingAgent {
    pub fn new(config: &AppConfig, tools: Vec<BoxedToolCall>, zone: LocalZone) -> Self {
        Self {
            api_hostname: config.openai_api_hostname.clone(),
            api_key: config.openai_api_key.clone(),
            model: config.openai_model.clone(),
            tools,
            zone,
            max_steps: config.max_agent_steps.max(1),
            timeout: config.agent_timeout,
        }
    }

    pub fn system_prompt(&self) -> Result<String> {
        let timezone = match self.zone.name() {
            Some(name) => name,
            None => format!("local (UTC{})", self.zone.now().offset()),
        };
        render_booking_prompt(&BookingAssistantContext {
            current_date: self.zone.now().date_naive().to_string(),
            timezone: &timezone,
        })
    }

    /// Run the agent over `history` until the model replies with text.
    ///
    /// Fails with `BookingError::AgentLoopDivergence` when the model is
    /// still asking for tools on Generate step `max_steps` (those calls
    /// are not run) and with
    /// `BookingError::AgentTimeout` when the turn takes too long.
    pub async fn run(&self, history: &[Message]) -> Result<AgentTurn, Error> {
        match tokio::time::timeout(self.timeout, self.run_steps(history)).await {
            Ok(result) => result,
            Err(_) => {
                tracing::warn!("Agent turn exceeded {:?}", self.timeout);
                Err(BookingError::AgentTimeout(self.timeout).into())
            }
        }
    }

    async fn run_steps(&self, history: &[Message]) -> Result<AgentTurn, Error> {
        let mut transcript = Vec::with_capacity(history.len() + 1);
        transcript.push(Message::new(Role::System, &self.system_prompt()?));
        transcript.extend_from_slice(history);

        let mut messages = Vec::new();
        let mut generate_steps = 0;
        let mut step = Step::Generate;

        loop {
            step = match step {
                Step::Generate => {
                    generate_steps += 1;

                    let resp = completion(
                        &transcript,
                        &self.tools,
                        &self.api_hostname,
                        &self.api_key,
                        &self.model,
                    )
                    .await?;
                    let msg = resp.message()?;

                    match &msg.tool_calls {
                        Some(calls) if !calls.is_empty() => {
                            // Tools requested on the last allowed step are not run
                            if generate_steps >= self.max_steps {
                                tracing::warn!(
                                    "Agent still calling tools after {} steps, dropping {} call(s)",
                                    generate_steps,
                                    calls.len()
                                );
                                return Err(BookingError::AgentLoopDivergence(self.max_steps).into());
                            }
                            let request = Message::new_tool_call_request(calls.clone());
                            transcript.push(request.clone());
                            messages.push(request);
                            Step::Act(calls.clone())
                        }
                        _ => {
                            let Some(reply) = msg.content.as_deref().filter(|c| !c.trim().is_empty())
                            else {
                                bail!("Model returned neither a reply nor tool calls");
                            };
                            messages.push(Message::new(Role::Assistant, reply));
                            return Ok(AgentTurn {
                                reply: reply.to_string(),
                                messages,
                                generate_steps,
                            });
                        }
                    }
                }
                Step::Act(calls) => {
                    for result in handle_tool_calls(&self.tools, &calls).await? {
                        transcript.push(result.clone());
                        messages.push(result);
                    }
                    Step::Generate
                }
            };
        }
    }
}

async fn handle_tool_call(tools: &[BoxedToolCall], tool_call: &FunctionCall) -> Result<Message, Error> {
    let name = &tool_call.function.name;
    let args = &tool_call.function.arguments;
    tracing::debug!("\nTool call: {}\nargs: {}", name, args);

    let Some(tool) = tools.iter().find(|t| t.function_name() == *name) else {
        // Let the model see its mistake and try again
        tracing::warn!("Received tool call that doesn't exist: {}", name);
        let available: Vec<String> = tools.iter().map(|t| t.function_name()).collect();
        let content = format!(
            "Error: there is no tool named '{}'. Available tools: {}.",
            name,
            available.join(", ")
        );
        return Ok(Message::new_tool_call_response(&content, &tool_call.id));
    };

    let result = tool
        .call(args)
        .await
        .with_context(|| format!("Tool {} failed", name))?;
    Ok(Message::new_tool_call_response(&result, &tool_call.id))
}

async fn handle_tool_calls(
    tools: &[BoxedToolCall],
    tool_calls: &[FunctionCall],
) -> Result<Vec<Message>, Error> {
    // Run each tool call concurrently and return them in the order
    // they were requested.
    let futures = tool_calls.iter().map(|call| handle_tool_call(tools, call));
    try_join_all(futures).await
}
