use chrono::{DateTime, TimeZone};
use rand::seq::SliceRandom;
use rand::Rng;
use serde::Serialize;

use crate::detect::Detection;
use crate::location::Coordinates;
use crate::roi::RoiRect;

pub const DEFAULT_ID_LENGTH: usize = 16;

/// `[A-Za-z0-9]`
pub const ALPHANUMERIC: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.3f";

/// Fixed-length random identifiers.
///
/// Uniqueness is probabilistic: with 16 characters from 62 symbols a collision
/// is possible but not worth guarding against.
#[derive(Clone, Debug)]
pub struct IdGenerator {
    length: usize,
    alphabet: Vec<u8>,
}

impl IdGenerator {
    pub fn new(length: usize) -> Self {
        Self::with_alphabet(length, ALPHANUMERIC)
    }

    /// Custom alphabet. An empty alphabet falls back to `ALPHANUMERIC`.
    pub fn with_alphabet(length: usize, alphabet: &[u8]) -> Self {
        let alphabet = if alphabet.is_empty() {
            ALPHANUMERIC.to_vec()
        } else {
            alphabet.to_vec()
        };
        Self { length, alphabet }
    }

    pub fn length(&self) -> usize {
        self.length
    }

    pub fn alphabet(&self) -> &[u8] {
        &self.alphabet
    }

    pub fn generate(&self) -> String {
        self.generate_with(&mut rand::thread_rng())
    }

    pub fn generate_with<R: Rng + ?Sized>(&self, rng: &mut R) -> String {
        (0..self.length)
            .filter_map(|_| self.alphabet.choose(rng).map(|&b| b as char))
            .collect()
    }
}

impl Default for IdGenerator {
    fn default() -> Self {
        Self::new(DEFAULT_ID_LENGTH)
    }
}

/// `YYYY-MM-DD HH:MM:SS.mmm`
pub fn format_timestamp<Tz: TimeZone>(now: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    now.format(TIMESTAMP_FORMAT).to_string()
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct DetectionPayload {
    pub object: String,
    pub confidence: f32,
    pub bbox: [i32; 4],
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct LocationPayload {
    pub roi: [u32; 4],
    pub camera_id: String,
    pub coordinates: Option<[f64; 2]>,
}

/// One notification per emitted episode. Immutable once built.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Notification {
    pub id: String,
    pub timestamp: String,
    pub detection: DetectionPayload,
    pub location: LocationPayload,
}

impl Notification {
    pub fn build<Tz: TimeZone>(
        id: String,
        detection: &Detection,
        roi: RoiRect,
        camera_id: &str,
        coordinates: Option<Coordinates>,
        now: &DateTime<Tz>,
    ) -> Self
    where
        Tz::Offset: std::fmt::Display,
    {
        Self {
            id,
            timestamp: format_timestamp(now),
            detection: DetectionPayload {
                object: detection.label.clone(),
                confidence: detection.confidence,
                bbox: detection.bbox.to_array(),
            },
            location: LocationPayload {
                roi: roi.to_array(),
                camera_id: camera_id.to_string(),
                coordinates: coordinates.map(Coordinates::to_array),
            },
        }
    }
}
