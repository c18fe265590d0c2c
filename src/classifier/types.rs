//! Labels and the response contract of the remote classifier.
//!
//! The service answers with a JSON object. The label is taken from the
//! first string-valued key among [`LABEL_KEYS`]; failing that, from a
//! `predictions` object mapping label to score (highest score wins).
//! A probability, when present, comes from [`PROBABILITY_KEYS`] or from the
//! winning score.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const LABEL_KEYS: [&str; 3] = ["prediccion", "classification", "label"];
pub const PROBABILITY_KEYS: [&str; 3] = ["probability", "probabilidad", "confidence"];
pub const PREDICTIONS_KEY: &str = "predictions";

/// Diagnostic labels the classifier is trained on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Label {
    Normal,
    /// Acute otitis media.
    #[serde(rename = "AOM")]
    Aom,
    /// Chronic otitis media.
    #[serde(rename = "COM")]
    Com,
    /// Otitis media with effusion.
    #[serde(rename = "OME")]
    Ome,
    Earwax,
    OtitisExterna,
}

impl Label {
    pub const ALL: [Label; 6] = [
        Label::Normal,
        Label::Aom,
        Label::Com,
        Label::Ome,
        Label::Earwax,
        Label::OtitisExterna,
    ];

    /// Short code as returned by the service.
    pub fn code(&self) -> &'static str {
        match self {
            Label::Normal => "Normal",
            Label::Aom => "AOM",
            Label::Com => "COM",
            Label::Ome => "OME",
            Label::Earwax => "Earwax",
            Label::OtitisExterna => "OtitisExterna",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Label::Normal => "Normal",
            Label::Aom => "Acute otitis media",
            Label::Com => "Chronic otitis media",
            Label::Ome => "Otitis media with effusion",
            Label::Earwax => "Earwax",
            Label::OtitisExterna => "Otitis externa",
        }
    }

    pub fn is_healthy(&self) -> bool {
        matches!(self, Label::Normal)
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Label {
    type Err = String;

    /// Case-insensitive; spaces, dashes and underscores are ignored so both
    /// codes and long names match.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key: String = s
            .chars()
            .filter(|c| !matches!(c, ' ' | '-' | '_'))
            .flat_map(|c| c.to_lowercase())
            .collect();
        match key.as_str() {
            "normal" | "healthy" => Ok(Label::Normal),
            "aom" | "acuteotitismedia" => Ok(Label::Aom),
            "com" | "chronicotitismedia" | "chronicsuppurativeotitismedia" | "csom" => {
                Ok(Label::Com)
            }
            "ome" | "otitismediawitheffusion" | "effusion" => Ok(Label::Ome),
            "earwax" | "cerumen" | "earwaxplug" => Ok(Label::Earwax),
            "otitisexterna" => Ok(Label::OtitisExterna),
            _ => Err(format!("unrecognized label '{}'", s)),
        }
    }
}

/// Decoded service answer, before label recognition.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassificationResponse {
    pub label: String,
    pub probability: Option<f64>,
}

impl ClassificationResponse {
    /// Decode a response body under the contract described at module level.
    pub fn from_json(body: &str) -> Result<Self, String> {
        let value: Value = serde_json::from_str(body).map_err(|e| {
            let truncated: String = body.chars().take(200).collect();
            format!("response is not JSON ({}): {}", e, truncated)
        })?;
        Self::from_value(&value)
    }

    pub fn from_value(value: &Value) -> Result<Self, String> {
        let object = value
            .as_object()
            .ok_or_else(|| "response is not a JSON object".to_string())?;

        if let Some(label) = LABEL_KEYS
            .iter()
            .find_map(|k| object.get(*k).and_then(|v| v.as_str()))
        {
            let probability = PROBABILITY_KEYS
                .iter()
                .find_map(|k| object.get(*k).and_then(|v| v.as_f64()));
            return Ok(Self {
                label: label.to_string(),
                probability,
            });
        }

        if let Some(predictions) = object.get(PREDICTIONS_KEY).and_then(|v| v.as_object()) {
            let best = predictions
                .iter()
                .filter_map(|(label, score)| score.as_f64().map(|s| (label, s)))
                .max_by(|a, b| a.1.total_cmp(&b.1));
            return match best {
                Some((label, score)) => Ok(Self {
                    label: label.clone(),
                    probability: Some(score),
                }),
                None => Err("'predictions' has no numeric scores".to_string()),
            };
        }

        Err(format!(
            "no label field (expected one of {}, or '{}')",
            LABEL_KEYS.join(", "),
            PREDICTIONS_KEY
        ))
    }

    pub fn recognize(&self) -> Result<Label, String> {
        self.label.parse()
    }
}

/// A recognized result, ready for presentation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    pub label: Label,
    pub confidence: Option<f64>,
    /// Attempts used, including the successful one.
    pub attempts: u32,
    pub classified_at: DateTime<Utc>,
}
