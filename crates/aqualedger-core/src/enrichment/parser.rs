//! Offline parser for free-text catch entries such as `"20kg Tuna"`.

use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

const POUND_IN_KG: f64 = 0.453_592_37;
const CLEAN_CONFIDENCE: f64 = 0.8;
const DRAFT_CONFIDENCE: f64 = 0.3;

/// Structured reading of a free-text entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParsedCatch {
    pub species: String,
    /// Kilograms, rounded to two decimals
    pub weight: Option<f64>,
    /// Unit as written, normalized (`kg`, `g`, `lb`)
    pub unit: Option<String>,
    pub confidence: f64,
}

impl ParsedCatch {
    /// Entries without a weight are drafts the user has to complete.
    pub const fn is_draft(&self) -> bool {
        self.weight.is_none()
    }
}

fn weight_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(?i)(\d+(?:\.\d+)?)\s*(kilograms?|kilos?|kgs?|grams?|g|lbs?|pounds?)\b")
            .expect("Invalid regex")
    })
}

/// Parse `text` into species and weight.
///
/// The first `<number><unit>` is taken as the weight and converted to kg; the
/// remaining words, title-cased, are the species.
pub fn parse_catch_text(text: &str) -> ParsedCatch {
    let matched = weight_pattern()
        .captures(text)
        .and_then(|captures| Some((captures.get(0)?, captures.get(1)?, captures.get(2)?)));
    let Some((whole, amount, unit)) = matched else {
        return ParsedCatch {
            species: species_from(text),
            weight: None,
            unit: None,
            confidence: DRAFT_CONFIDENCE,
        };
    };

    let unit = normalize_unit(unit.as_str());
    let weight = amount
        .as_str()
        .parse::<f64>()
        .ok()
        .map(|amount| round_kg(to_kg(amount, unit)));

    let remainder = format!("{} {}", &text[..whole.start()], &text[whole.end()..]);
    ParsedCatch {
        species: species_from(&remainder),
        weight,
        unit: Some(unit.to_string()),
        confidence: if weight.is_some() {
            CLEAN_CONFIDENCE
        } else {
            DRAFT_CONFIDENCE
        },
    }
}

fn normalize_unit(raw: &str) -> &'static str {
    let raw = raw.to_ascii_lowercase();
    if raw.starts_with("kg") || raw.starts_with("kilo") {
        "kg"
    } else if raw.starts_with('g') {
        "g"
    } else {
        "lb"
    }
}

fn to_kg(amount: f64, unit: &str) -> f64 {
    match unit {
        "g" => amount / 1000.0,
        "lb" => amount * POUND_IN_KG,
        _ => amount,
    }
}

fn round_kg(kg: f64) -> f64 {
    (kg * 100.0).round() / 100.0
}

fn species_from(text: &str) -> String {
    let mut words: Vec<&str> = text.split_whitespace().collect();
    // "20 kilos of Salmon" leaves a dangling connector
    if words.first().is_some_and(|word| word.eq_ignore_ascii_case("of")) {
        words.remove(0);
    }
    if words.last().is_some_and(|word| word.eq_ignore_ascii_case("of")) {
        words.pop();
    }

    if words.is_empty() {
        return "Unknown".to_string();
    }
    words
        .into_iter()
        .map(title_case)
        .collect::<Vec<_>>()
        .join(" ")
}

fn title_case(word: &str) -> String {
    let mut chars = word.chars();
    chars.next().map_or_else(String::new, |first| {
        first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect()
    })
}
