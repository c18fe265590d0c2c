//! Static display content for each diagnostic label.

use serde::Serialize;

use crate::classifier::{Classification, Label};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusColor {
    Green,
    Orange,
    Red,
}

impl StatusColor {
    /// ANSI foreground escape for terminal output.
    pub fn ansi(&self) -> &'static str {
        match self {
            StatusColor::Green => "\x1b[32m",
            StatusColor::Orange => "\x1b[33m",
            StatusColor::Red => "\x1b[31m",
        }
    }
}

/// One reference picture in the comparison gallery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExampleImage {
    pub label: Label,
    pub caption: &'static str,
    pub asset_path: &'static str,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Presentation {
    pub label: Label,
    pub title: &'static str,
    /// Upper-cased label code shown in the status pill.
    pub headline: String,
    pub description: &'static str,
    pub color: StatusColor,
    pub confidence_text: Option<String>,
    pub example: ExampleImage,
}

pub fn color_for(label: Label) -> StatusColor {
    match label {
        Label::Normal => StatusColor::Green,
        Label::Aom | Label::Com => StatusColor::Red,
        Label::Ome | Label::Earwax | Label::OtitisExterna => StatusColor::Orange,
    }
}

pub fn description_for(label: Label) -> &'static str {
    match label {
        Label::Normal => "Tympanic membrane with normal appearance: translucent, pearly grey, with a visible light reflex.",
        Label::Aom => "Findings compatible with acute otitis media: bulging, erythematous membrane. Clinical evaluation recommended.",
        Label::Com => "Findings compatible with chronic otitis media: perforation or retraction of the membrane. Specialist follow-up recommended.",
        Label::Ome => "Findings compatible with middle ear effusion: dull membrane, possible air-fluid level or bubbles.",
        Label::Earwax => "Cerumen obstructs the ear canal; the membrane may not be fully visible.",
        Label::OtitisExterna => "Findings compatible with otitis externa: inflamed, swollen ear canal.",
    }
}

pub fn example_for(label: Label) -> ExampleImage {
    let asset_path = match label {
        Label::Normal => "assets/examples/normal.jpg",
        Label::Aom => "assets/examples/aom.jpg",
        Label::Com => "assets/examples/com.jpg",
        Label::Ome => "assets/examples/ome.jpg",
        Label::Earwax => "assets/examples/earwax.jpg",
        Label::OtitisExterna => "assets/examples/otitis_externa.jpg",
    };
    ExampleImage {
        label,
        caption: label.display_name(),
        asset_path,
    }
}

/// Gallery of every label, in display order.
pub fn examples() -> Vec<ExampleImage> {
    Label::ALL.iter().copied().map(example_for).collect()
}

pub fn present(classification: &Classification) -> Presentation {
    let label = classification.label;
    Presentation {
        label,
        title: if label.is_healthy() {
            "Diagnosis confirmed"
        } else {
            "Result"
        },
        headline: label.code().to_uppercase(),
        description: description_for(label),
        color: color_for(label),
        confidence_text: classification
            .confidence
            .map(|c| format!("{:.1}%", (c * 100.0).clamp(0.0, 100.0))),
        example: example_for(label),
    }
}
