use std::fmt;
use std::str::FromStr;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;
use uuid::Uuid;

use crate::geo::haversine_meters;
use crate::models::coordinate::Coordinate;
use crate::models::round::{GuessInput, RoundResult, RoundSubmission};

pub const MAX_SCORE: u32 = 5_000;
pub const PERFECT_DISTANCE_METERS: f64 = 10.0;
pub const DEFAULT_ROUND_SECONDS: u32 = 180;

const DECAY_PER_KM: f64 = 0.15;

type Fields = (&'static str, &'static str);

const GUESS_FIELDS: Fields = ("guess.latitude", "guess.longitude");
const ACTUAL_FIELDS: Fields = ("actual.latitude", "actual.longitude");

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CoordinatePolicy {
    #[default]
    DefaultZero,
    Reject,
}

impl FromStr for CoordinatePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "default-zero" | "default_zero" | "zero" => Ok(Self::DefaultZero),
            "reject" => Ok(Self::Reject),
            other => Err(format!(
                "unknown coordinate policy: {other}, expected default-zero/reject"
            )),
        }
    }
}

impl fmt::Display for CoordinatePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DefaultZero => f.write_str("default-zero"),
            Self::Reject => f.write_str("reject"),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ScoringSettings {
    pub round_seconds: u32,
    pub policy: CoordinatePolicy,
}

impl Default for ScoringSettings {
    fn default() -> Self {
        Self {
            round_seconds: DEFAULT_ROUND_SECONDS,
            policy: CoordinatePolicy::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ScoringError {
    #[error("{0} is required")]
    MissingField(&'static str),

    #[error("{field} is out of range: {value}")]
    OutOfRange { field: &'static str, value: f64 },
}

pub fn compute_score(guess: &Coordinate, actual: &Coordinate) -> u32 {
    score_for_distance(haversine_meters(guess, actual))
}

pub fn score_for_distance(distance_meters: f64) -> u32 {
    if !distance_meters.is_finite() {
        return 0;
    }
    if distance_meters <= PERFECT_DISTANCE_METERS {
        return MAX_SCORE;
    }

    let distance_km = distance_meters / 1_000.0;
    let raw = (f64::from(MAX_SCORE) * (-DECAY_PER_KM * distance_km).exp()).round();

    raw.clamp(0.0, f64::from(MAX_SCORE)) as u32
}

// A missing clock reading counts as no time used.
pub fn time_used(round_seconds: u32, time_left_seconds: Option<u32>) -> u32 {
    round_seconds.saturating_sub(time_left_seconds.unwrap_or(round_seconds))
}

pub fn resolve_guess(
    guess: &GuessInput,
    policy: CoordinatePolicy,
) -> Result<Coordinate, ScoringError> {
    match policy {
        CoordinatePolicy::DefaultZero => Ok(Coordinate::new(
            finite_or_zero(guess.latitude),
            finite_or_zero(guess.longitude),
        )),
        CoordinatePolicy::Reject => {
            let latitude = guess
                .latitude
                .ok_or(ScoringError::MissingField("guess.latitude"))?;
            let longitude = guess
                .longitude
                .ok_or(ScoringError::MissingField("guess.longitude"))?;
            let coordinate = Coordinate::new(latitude, longitude);
            check_range(&coordinate, GUESS_FIELDS)?;
            Ok(coordinate)
        }
    }
}

pub fn score_round(
    submission: &RoundSubmission,
    settings: &ScoringSettings,
) -> Result<RoundResult, ScoringError> {
    let guess = resolve_guess(&submission.guess, settings.policy)?;
    let actual = submission.actual;

    match settings.policy {
        CoordinatePolicy::Reject => check_range(&actual, ACTUAL_FIELDS)?,
        CoordinatePolicy::DefaultZero => check_finite(&actual, ACTUAL_FIELDS)?,
    }

    let distance_meters = haversine_meters(&guess, &actual);
    let score = score_for_distance(distance_meters);

    debug!(
        guess_lat = guess.latitude,
        guess_lng = guess.longitude,
        actual_lat = actual.latitude,
        actual_lng = actual.longitude,
        distance_meters,
        score,
        "round scored"
    );

    Ok(RoundResult {
        id: Uuid::new_v4(),
        guess,
        actual,
        distance_meters,
        distance_km: distance_meters / 1_000.0,
        score,
        time_used_seconds: time_used(settings.round_seconds, submission.time_left_seconds),
        difficulty: submission.difficulty.unwrap_or_default(),
        photo_url: submission.photo_url.clone(),
        scored_at: Utc::now(),
    })
}

fn finite_or_zero(value: Option<f64>) -> f64 {
    value.filter(|v| v.is_finite()).unwrap_or(0.0)
}

fn check_finite(coordinate: &Coordinate, fields: Fields) -> Result<(), ScoringError> {
    check_axis(coordinate.latitude, fields.0, f64::is_finite)?;
    check_axis(coordinate.longitude, fields.1, f64::is_finite)
}

fn check_range(coordinate: &Coordinate, fields: Fields) -> Result<(), ScoringError> {
    check_axis(coordinate.latitude, fields.0, |v| (-90.0..=90.0).contains(&v))?;
    check_axis(coordinate.longitude, fields.1, |v| (-180.0..=180.0).contains(&v))
}

fn check_axis(
    value: f64,
    field: &'static str,
    accept: impl Fn(f64) -> bool,
) -> Result<(), ScoringError> {
    if accept(value) {
        Ok(())
    } else {
        Err(ScoringError::OutOfRange { field, value })
    }
}
