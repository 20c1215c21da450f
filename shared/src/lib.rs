use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

pub const OPTIONS_PER_QUESTION: usize = 4;
pub const MAX_ANSWER_POINTS: u32 = 100;
pub const MIN_ANSWER_POINTS: u32 = 1;
pub const LATENCY_PENALTY_PER_SECOND: u32 = 10;
pub const QUESTION_TIMEOUT_SECS: u64 = 30;
pub const ANSWER_POLL_INTERVAL_MS: u64 = 500;
pub const INTER_ROUND_PAUSE_SECS: u64 = 3;

/// A quiz item as stored in the question bank. The `answer` token ("1".."4")
/// never leaves the server; clients only ever see a [`QuestionView`].
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Question {
    pub text: String,
    pub options: Vec<String>,
    pub answer: String,
}

impl Question {
    pub fn view(&self) -> QuestionView {
        QuestionView {
            text: self.text.clone(),
            options: self.options.clone(),
        }
    }

    pub fn is_correct(&self, token: &str) -> bool {
        self.answer.eq_ignore_ascii_case(token.trim())
    }
}

/// The part of a question that is broadcast to players.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct QuestionView {
    pub text: String,
    pub options: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum Request {
    Register {
        name: String,
    },
    CreateRoom {
        mode: usize,
        question_count: usize,
    },
    JoinRoom {
        room_id: String,
    },
    SubmitAnswer {
        room_id: String,
        answer: String,
        timestamp: f64,
    },
    ListRankings,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Response {
    Ok {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        message: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        room_id: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        rankings: Option<Vec<(String, u32)>>,
    },
    Error {
        message: String,
    },
    Question {
        question: QuestionView,
        round_index: usize,
        round_total: usize,
    },
    Correct {
        player: String,
        points: u32,
        scoreboard: HashMap<String, u32>,
    },
    Timeout,
    GameOver {
        final_scoreboard: HashMap<String, u32>,
        winner: String,
        winner_score: u32,
    },
}

impl Response {
    pub fn ok(message: impl Into<String>) -> Self {
        Response::Ok {
            message: Some(message.into()),
            room_id: None,
            rankings: None,
        }
    }

    pub fn ok_room(message: impl Into<String>, room_id: impl Into<String>) -> Self {
        Response::Ok {
            message: Some(message.into()),
            room_id: Some(room_id.into()),
            rankings: None,
        }
    }

    pub fn ok_rankings(rankings: Vec<(String, u32)>) -> Self {
        Response::Ok {
            message: None,
            room_id: None,
            rankings: Some(rankings),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Response::Error {
            message: message.into(),
        }
    }

    pub fn room_id(&self) -> Option<&str> {
        match self {
            Response::Ok { room_id, .. } => room_id.as_deref(),
            _ => None,
        }
    }
}

/// Points awarded to the first correct answer: 100 minus 10 per elapsed
/// second (floored), never less than 1.
pub fn answer_points(latency: Duration) -> u32 {
    let penalty = (latency.as_secs_f64() * LATENCY_PENALTY_PER_SECOND as f64).floor() as u64;
    let points = (MAX_ANSWER_POINTS as u64).saturating_sub(penalty);
    points.max(MIN_ANSWER_POINTS as u64) as u32
}

// Current wall-clock time in seconds, as clients stamp their submissions
pub fn current_timestamp() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or(Duration::from_secs(0))
        .as_secs_f64()
}
