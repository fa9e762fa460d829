//! Test utilities for integration tests
use std::fs;
use std::time::Duration;

use serde_json::json;
use tempfile::TempDir;

use booker::core::AppConfig;

/// Config pointing every external service at `server_url` with the
/// credential files written to a fresh temp directory. Keep the
/// returned `TempDir` alive for the duration of the test.
pub fn test_config(server_url: &str, token: serde_json::Value) -> (AppConfig, TempDir) {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let token_path = dir.path().join("token.json");
    let credentials_path = dir.path().join("credentials.json");

    fs::write(&token_path, token.to_string()).expect("Failed to write token");
    fs::write(
        &credentials_path,
        json!({
            "installed": {
                "client_id": "client-123",
                "client_secret": "secret-456",
                "auth_uri": format!("{}/auth", server_url),
                "token_uri": format!("{}/token", server_url),
                "redirect_uris": ["http://localhost"]
            }
        })
        .to_string(),
    )
    .expect("Failed to write credentials");

    let config = AppConfig {
        openai_api_hostname: server_url.to_string(),
        openai_api_key: String::from("test-key"),
        openai_model: String::from("gpt-test"),
        credentials_path: credentials_path.display().to_string(),
        token_path: token_path.display().to_string(),
        calendar_id: String::from("primary"),
        google_api_base_url: server_url.to_string(),
        timezone: Some(String::from("America/New_York")),
        max_agent_steps: 4,
        agent_timeout: Duration::from_secs(30),
    };
    (config, dir)
}

pub fn text_response(content: &str) -> String {
    json!({
        "id": "chatcmpl-text",
        "object": "chat.completion",
        "choices": [{
            "index": 0,
            "message": {"role": "assistant", "content": content},
            "finish_reason": "stop"
        }]
    })
    .to_string()
}

pub fn tool_call_response(id: &str, name: &str, arguments: serde_json::Value) -> String {
    json!({
        "id": "chatcmpl-tool",
        "object": "chat.completion",
        "choices": [{
            "index": 0,
            "message": {
                "role": "assistant",
                "content": null,
                "tool_calls": [{
                    "id": id,
                    "type": "function",
                    "function": {"name": name, "arguments": arguments.to_string()}
                }]
            },
            "finish_reason": "tool_calls"
        }]
    })
    .to_string()
}
