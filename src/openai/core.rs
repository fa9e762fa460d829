use std::time::Duration;

use anyhow::{Error, Result, anyhow};
use async_trait::async_trait;
use erased_serde;
use serde::{Deserialize, Serialize};
use serde_json::json;

const REQUEST_TIMEOUT_SECS: u64 = 60;

#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
pub enum Role {
    #[serde(rename = "system")]
    System,
    #[serde(rename = "assistant")]
    Assistant,
    #[serde(rename = "user")]
    User,
    #[serde(rename = "tool")]
    Tool,
}

// Object {
//     "content": Null,
//     "role": String("assistant"),
//     "tool_calls": Array [
//         Object {
//             "function": Object {
//                 "arguments": String("{\"start_time\":\"2025-03-10T09:00:00\",...}"),
//                 "name": String("check_availability")
//             },
//             "id": String("call_KCg5V0N5E7hHHrUwdefHBfgL"),
//             "type": String("function")
//         }
//     ]
// }
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
pub struct FunctionCallFn {
    pub arguments: String,
    pub name: String,
}

fn function_type() -> String {
    String::from("function")
}

#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
pub struct FunctionCall {
    pub function: FunctionCallFn,
    pub id: String,
    // Some OpenAI compatible servers leave this out
    #[serde(default = "function_type")]
    pub r#type: String,
}

#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
pub struct Message {
    role: Role,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_call_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_calls: Option<Vec<FunctionCall>>,
}

impl Message {
    pub fn new(role: Role, content: &str) -> Self {
        Message {
            role,
            content: Some(content.to_string()),
            tool_call_id: None,
            tool_calls: None,
        }
    }
    pub fn new_tool_call_request(tool_calls: Vec<FunctionCall>) -> Self {
        Message {
            role: Role::Assistant,
            content: None,
            tool_call_id: None,
            tool_calls: Some(tool_calls),
        }
    }
    pub fn new_tool_call_response(content: &str, tool_call_id: &str) -> Self {
        Message {
            role: Role::Tool,
            content: Some(content.to_string()),
            tool_call_id: Some(tool_call_id.to_string()),
            tool_calls: None,
        }
    }

    pub fn role(&self) -> &Role {
        &self.role
    }

    pub fn tool_calls(&self) -> &[FunctionCall] {
        self.tool_calls.as_deref().unwrap_or_default()
    }
}

#[derive(Serialize)]
pub struct Property {
    pub r#type: String,
    pub description: String,
}

#[derive(Serialize)]
pub struct Parameters<Props: Serialize> {
    pub r#type: String,
    pub properties: Props,
    pub required: Vec<String>,
    #[serde(rename = "additionalProperties")]
    pub additional_properties: bool,
}

#[derive(Serialize)]
pub struct Function<Props: Serialize> {
    pub name: String,
    pub description: String,
    pub parameters: Parameters<Props>,
    pub strict: bool,
}

#[derive(Serialize)]
pub enum ToolType {
    #[serde(rename = "function")]
    Function,
}

// Tools are passed around as trait objects but still need to be
// serialized into the request payload as their function schema.
// `serde::Serialize` isn't object safe so the trait is built on
// `erased_serde` instead.
#[async_trait]
pub trait ToolCall: erased_serde::Serialize {
    async fn call(&self, args: &str) -> Result<String, Error>;
    fn function_name(&self) -> String;
}
erased_serde::serialize_trait_object!(ToolCall);

pub type BoxedToolCall = Box<dyn ToolCall + Send + Sync + 'static>;

#[derive(Debug, Deserialize)]
pub struct CompletionMessage {
    pub content: Option<String>,
    pub tool_calls: Option<Vec<FunctionCall>>,
}

#[derive(Debug, Deserialize)]
pub struct CompletionChoice {
    pub message: CompletionMessage,
    pub finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Completion {
    pub choices: Vec<CompletionChoice>,
}

impl Completion {
    /// The first choice's message, which is the only one requested.
    pub fn message(&self) -> Result<&CompletionMessage, Error> {
        self.choices
            .first()
            .map(|choice| &choice.message)
            .ok_or(anyhow!("Completion has no choices"))
    }
}

pub async fn completion(
    messages: &[Message],
    tools: &[BoxedToolCall],
    api_hostname: &str,
    api_key: &str,
    model: &str,
) -> Result<Completion, Error> {
    let mut payload = json!({
        "model": model,
        "messages": messages,
        "temperature": 0,
    });
    if !tools.is_empty() {
        payload["tools"] = json!(tools);
    }
    let url = format!("{}/v1/chat/completions", api_hostname.trim_end_matches("/"));
    let response = reqwest::Client::new()
        .post(url)
        .bearer_auth(api_key)
        .header("Content-Type", "application/json")
        .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
        .json(&payload)
        .send()
        .await?;

    let status = response.status();
    let text = response.text().await?;
    if !status.is_success() {
        tracing::error!("Completion request failed {}: {}", status, text);
        anyhow::bail!("Completion request failed with status {}", status);
    }

    serde_json::from_str::<Completion>(&text).map_err(|e| {
        tracing::error!("Parsing completion failed for {}\nError:{}", text, e);
        anyhow!("Invalid completion response: {}", e)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_serialization() {
        assert_eq!(serde_json::to_string(&Role::System).unwrap(), r#""system""#);
        assert_eq!(
            serde_json::to_string(&Role::Assistant).unwrap(),
            r#""assistant""#
        );
        assert_eq!(serde_json::to_string(&Role::User).unwrap(), r#""user""#);
        assert_eq!(serde_json::to_string(&Role::Tool).unwrap(), r#""tool""#);
    }

    #[test]
    fn test_message_new() {
        let msg = Message::new(Role::User, "Book me a dentist appointment");
        assert_eq!(
            serde_json::to_string(&msg).unwrap(),
            r#"{"role":"user","content":"Book me a dentist appointment"}"#
        );
    }

    #[test]
    fn test_message_new_tool_call_request() {
        let tool_calls = vec![FunctionCall {
            function: FunctionCallFn {
                arguments: r#"{"start_time":"2025-03-10T09:00:00"}"#.to_string(),
                name: "check_availability".to_string(),
            },
            id: "call_test123".to_string(),
            r#type: "function".to_string(),
        }];

        let msg = Message::new_tool_call_request(tool_calls);
        assert_eq!(
            serde_json::to_string(&msg).unwrap(),
            r#"{"role":"assistant","tool_calls":[{"function":{"arguments":"{\"start_time\":\"2025-03-10T09:00:00\"}","name":"check_availability"},"id":"call_test123","type":"function"}]}"#
        );
        assert_eq!(msg.tool_calls().len(), 1);
    }

    #[test]
    fn test_message_new_tool_call_response() {
        let msg = Message::new_tool_call_response("No 1-hour slots", "call_test123");
        assert_eq!(
            serde_json::to_string(&msg).unwrap(),
            r#"{"role":"tool","content":"No 1-hour slots","tool_call_id":"call_test123"}"#
        );
        assert!(msg.tool_calls().is_empty());
    }

    #[test]
    fn test_function_call_defaults_type() {
        let json = r#"{"function":{"arguments":"{}","name":"book_appointment"},"id":"call_1"}"#;
        let fc: FunctionCall = serde_json::from_str(json).unwrap();
        assert_eq!(fc.r#type, "function");
    }

    #[test]
    fn test_parameters_serialization() {
        let props = serde_json::json!({"start_time": {"type": "string", "description": "Start"}});
        let params = Parameters {
            r#type: "object".to_string(),
            properties: props,
            required: vec!["start_time".to_string()],
            additional_properties: false,
        };
        let json = serde_json::to_value(&params).unwrap();
        assert_eq!(json["type"], "object");
        assert_eq!(json["required"][0], "start_time");
        assert_eq!(json["additionalProperties"], false);
    }

    #[tokio::test]
    async fn test_completion_basic() {
        let mut server = mockito::Server::new_async().await;

        let response_body = r#"{
            "id": "chatcmpl-123",
            "object": "chat.completion",
            "created": 1694268190,
            "model": "gpt-4",
            "choices": [{
                "index": 0,
                "message": {
                    "role": "assistant",
                    "content": "Hello!"
                },
                "finish_reason": "stop"
            }]
        }"#;

        let mock = server
            .mock("POST", "/v1/chat/completions")
            .match_header("authorization", "Bearer test-key")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(response_body)
            .create();

        let messages = vec![Message::new(Role::User, "Hi")];
        let result = completion(&messages, &[], server.url().as_str(), "test-key", "gpt-4").await;

        mock.assert();
        let completion = result.unwrap();
        let msg = completion.message().unwrap();
        assert_eq!(msg.content.as_deref(), Some("Hello!"));
        assert!(msg.tool_calls.is_none());
    }

    #[tokio::test]
    async fn test_completion_with_tools() {
        let mut server = mockito::Server::new_async().await;

        let response_body = r#"{
            "id": "chatcmpl-123",
            "object": "chat.completion",
            "created": 1694268190,
            "model": "gpt-4",
            "choices": [{
                "index": 0,
                "message": {
                    "role": "assistant",
                    "content": null,
                    "tool_calls": [{
                        "id": "call_abc123",
                        "type": "function",
                        "function": {
                            "name": "check_availability",
                            "arguments": "{\"start_time\":\"2025-03-10T09:00:00\",\"end_time\":\"2025-03-10T12:00:00\"}"
                        }
                    }]
                },
                "finish_reason": "tool_calls"
            }]
        }"#;

        // The tool schema must be part of the request
        let mock = server
            .mock("POST", "/v1/chat/completions")
            .match_body(mockito::Matcher::PartialJson(serde_json::json!({
                "tools": [{"type": "function", "function": {"name": "check_availability"}}]
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(response_body)
            .create();

        #[derive(Serialize)]
        struct MockTool {
            r#type: ToolType,
            function: serde_json::Value,
        }
        #[async_trait]
        impl ToolCall for MockTool {
            async fn call(&self, _args: &str) -> Result<String, Error> {
                Ok("mock result".to_string())
            }
            fn function_name(&self) -> String {
                "check_availability".to_string()
            }
        }

        let tools = vec![Box::new(MockTool {
            r#type: ToolType::Function,
            function: serde_json::json!({"name": "check_availability"}),
        }) as BoxedToolCall];
        let messages = vec![Message::new(Role::User, "Am I free tomorrow morning?")];

        let result = completion(&messages, &tools, server.url().as_str(), "test-key", "gpt-4").await;

        mock.assert();
        let completion = result.unwrap();
        let calls = completion.message().unwrap().tool_calls.clone().unwrap();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].function.name, "check_availability");
        assert_eq!(completion.choices[0].finish_reason.as_deref(), Some("tool_calls"));
    }

    #[tokio::test]
    async fn test_completion_error_status() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/v1/chat/completions")
            .with_status(429)
            .with_body(r#"{"error": {"message": "Rate limit reached"}}"#)
            .create();

        let messages = vec![Message::new(Role::User, "Hi")];
        let result = completion(&messages, &[], server.url().as_str(), "test-key", "gpt-4").await;
        assert!(result.is_err());
    }
}
