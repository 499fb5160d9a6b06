use log::warn;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};

use common::{
    env_config::TutorConfig,
    error::{AppError, Res},
};
use gate::history::ChatTurn;

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<WireMessage<'a>>,
}

#[derive(Debug, Serialize)]
struct WireMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    content: String,
}

/// Client for an OpenAI-compatible chat-completions endpoint. Invoked
/// only after the gate has approved a request; its failures are surfaced
/// to the caller, not handled here.
pub struct TutorClient {
    client: Client,
    api_url: String,
    api_key: String,
    model: String,
    system_prompt: String,
}

impl TutorClient {
    pub fn new(config: &TutorConfig) -> Self {
        TutorClient {
            client: Client::new(),
            api_url: config.api_url.clone(),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            system_prompt: config.system_prompt.clone(),
        }
    }

    /// Sends the system prompt plus the bounded conversation window and
    /// returns the assistant's reply.
    pub async fn complete(&self, turns: &[ChatTurn]) -> Res<String> {
        let mut messages = Vec::with_capacity(turns.len() + 1);
        messages.push(WireMessage {
            role: "system",
            content: &self.system_prompt,
        });
        for turn in turns {
            messages.push(WireMessage {
                role: turn.role.as_str(),
                content: &turn.content,
            });
        }

        let request = ChatCompletionRequest {
            model: &self.model,
            messages,
        };

        let response = self
            .client
            .post(&self.api_url)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;

        if response.status() != StatusCode::OK {
            let status = response.status();
            let body = response
                .json::<serde_json::Value>()
                .await
                .unwrap_or_else(|_| serde_json::json!({ "error": "unreadable response" }));
            warn!("tutor provider returned {}: {}", status, body);
            return Err(AppError::Internal(format!(
                "tutor provider returned {}",
                status
            )));
        }

        let completion = response.json::<ChatCompletionResponse>().await?;
        completion
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or_else(|| AppError::Internal("tutor provider returned no choices".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gate::history::ChatRole;

    #[test]
    fn request_serializes_in_wire_order() {
        let request = ChatCompletionRequest {
            model: "test-model",
            messages: vec![
                WireMessage {
                    role: "system",
                    content: "be helpful",
                },
                WireMessage {
                    role: ChatRole::User.as_str(),
                    content: "hi",
                },
            ],
        };

        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["model"], "test-model");
        assert_eq!(json["messages"][0]["role"], "system");
        assert_eq!(json["messages"][1]["role"], "user");
        assert_eq!(json["messages"][1]["content"], "hi");
    }

    #[test]
    fn response_parses_first_choice() {
        let body = serde_json::json!({
            "choices": [
                { "message": { "role": "assistant", "content": "the answer" } }
            ]
        });

        let parsed: ChatCompletionResponse = serde_json::from_value(body).unwrap();
        assert_eq!(parsed.choices[0].message.content, "the answer");
    }
}
