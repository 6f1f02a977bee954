use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::coordinate::Coordinate;

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct GuessInput {
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

impl From<Coordinate> for GuessInput {
    fn from(coordinate: Coordinate) -> Self {
        Self {
            latitude: Some(coordinate.latitude),
            longitude: Some(coordinate.longitude),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Difficulty {
    Easy,
    #[default]
    Normal,
    Hard,
    Extreme,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoundSubmission {
    pub guess: GuessInput,
    pub actual: Coordinate,
    #[serde(default)]
    pub time_left_seconds: Option<u32>,
    #[serde(default)]
    pub difficulty: Option<Difficulty>,
    #[serde(default)]
    pub photo_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoundResult {
    pub id: Uuid,
    pub guess: Coordinate,
    pub actual: Coordinate,
    pub distance_meters: f64,
    pub distance_km: f64,
    pub score: u32,
    pub time_used_seconds: u32,
    pub difficulty: Difficulty,
    pub photo_url: Option<String>,
    pub scored_at: DateTime<Utc>,
}
