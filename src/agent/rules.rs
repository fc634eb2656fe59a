//! Deterministic utterance classifier
//!
//! The keyword tables from the system prompt, hand-implemented. Used when
//! no hosted endpoint is configured, and as the testable reference for the
//! classification policy the prompt describes.

use chrono::{Days, NaiveDate};

use crate::db::repositories::transaction::{Category, Kind, NewTransaction};

const ASSET_CUES: &[&str] = &[
    "received", "salary", "earned", "earnings", "sold", "paycheck", "per diem", "bonus",
];

const LIABILITY_CUES: &[&str] = &["spent", "bought", "paid", "purchased", "expense"];

const CATEGORY_KEYWORDS: &[(Category, &[&str])] = &[
    (
        Category::Food,
        &[
            "restaurant", "groceries", "grocery", "supermarket", "delivery", "lunch", "dinner",
            "breakfast", "snack", "coffee", "food", "market",
        ],
    ),
    (
        Category::Transport,
        &[
            "fuel", "gas", "uber", "taxi", "rideshare", "bus", "train", "parking", "transport",
            "car maintenance",
        ],
    ),
    (
        Category::Health,
        &[
            "doctor", "appointment", "medicine", "medication", "pharmacy", "therapy", "therapist",
            "dentist", "health",
        ],
    ),
    (
        Category::Home,
        &[
            "internet", "rent", "utility", "utilities", "electricity", "water bill", "pet food",
            "cleaning", "furniture", "bills",
        ],
    ),
    (
        Category::Shopping,
        &[
            "clothes", "shirt", "shoes", "electronics", "razor", "phone", "headphones",
            "accessories",
        ],
    ),
    (
        Category::Entertainment,
        &[
            "streaming", "netflix", "spotify", "cinema", "movie", "concert", "game", "games",
        ],
    ),
    (
        Category::Education,
        &["book", "books", "course", "tuition", "class", "supplies", "workshop"],
    ),
];

/// Map an utterance to a ledger row, or None if it does not read as an
/// expense/income statement (questions and chatter fall through).
pub fn classify(text: &str, today: NaiveDate) -> Option<NewTransaction> {
    let lower = text.to_lowercase();

    // Asset cues take priority: "got paid my salary" mentions a liability
    // verb but is income.
    let kind = if contains_any(&lower, ASSET_CUES) {
        Kind::Asset
    } else if contains_any(&lower, LIABILITY_CUES) {
        Kind::Liability
    } else {
        return None;
    };

    let amount = extract_amount(&lower)?;

    let category = match kind {
        Kind::Asset => Category::Income,
        Kind::Liability => match_category(&lower).unwrap_or(Category::Shopping),
    };

    let date = if lower.contains("yesterday") {
        today.checked_sub_days(Days::new(1))
    } else {
        None
    };

    Some(NewTransaction {
        date,
        description: derive_description(&lower, kind),
        amount,
        category,
        kind,
    })
}

fn contains_any(text: &str, cues: &[&str]) -> bool {
    cues.iter().any(|cue| text.contains(cue))
}

fn match_category(text: &str) -> Option<Category> {
    for (category, keywords) in CATEGORY_KEYWORDS {
        if keywords.iter().any(|kw| text.contains(kw)) {
            return Some(*category);
        }
    }
    None
}

/// First positive number in the utterance, with currency markers stripped.
fn extract_amount(text: &str) -> Option<f64> {
    text.split_whitespace()
        .map(|token| {
            token
                .trim_start_matches(['$', '€', '£'])
                .trim_end_matches([',', '.', '!', '?', ';'])
                .replace(',', "")
        })
        .filter_map(|token| token.parse::<f64>().ok())
        .find(|value| *value > 0.0)
}

/// Best-effort description: the matched keyword, or the words after a
/// linking preposition, or a generic label.
fn derive_description(text: &str, kind: Kind) -> String {
    for (_, keywords) in CATEGORY_KEYWORDS {
        for kw in *keywords {
            if text.contains(kw) {
                return capitalize(kw);
            }
        }
    }

    for prep in ["on ", "for ", "with ", "from "] {
        if let Some(pos) = text.find(prep) {
            let tail: Vec<&str> = text[pos + prep.len()..]
                .split_whitespace()
                .filter(|token| {
                    token
                        .trim_start_matches(['$', '€', '£'])
                        .parse::<f64>()
                        .is_err()
                })
                .filter(|token| !matches!(*token, "dollars" | "bucks" | "the" | "a" | "an" | "my"))
                .take(4)
                .collect();
            if !tail.is_empty() {
                return capitalize(&tail.join(" "));
            }
        }
    }

    match kind {
        Kind::Asset => "Income".to_string(),
        Kind::Liability => "Expense".to_string(),
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}
