use serde::{Deserialize, Serialize};

use gate::history::ChatTurn;

#[derive(Debug, Deserialize)]
pub struct AskRequest {
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct AskResponse {
    pub reply: String,
}

#[derive(Debug, Serialize)]
pub struct HistoryResponse {
    pub turns: Vec<ChatTurn>,
}
