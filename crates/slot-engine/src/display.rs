//! Human-readable slot labels.

use chrono::NaiveDate;

use crate::event::FreeSlot;

/// Marker put in front of slots on highlighted days.
pub const HIGHLIGHT_MARK: &str = "⭐";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Language {
    #[default]
    German,
    English,
}

impl Language {
    /// Accepts `de`/`deutsch`/`german` and `en`/`english`, case-insensitively.
    pub fn from_code(code: &str) -> Option<Self> {
        match code.trim().to_ascii_lowercase().as_str() {
            "de" | "deutsch" | "german" => Some(Language::German),
            "en" | "english" | "englisch" => Some(Language::English),
            _ => None,
        }
    }

    /// Message shown when no slot was found.
    pub fn no_availability(&self) -> &'static str {
        match self {
            Language::German => "Keine freien Termine gefunden",
            Language::English => "No availability found",
        }
    }
}

/// Format one slot start, e.g. `06.01.2025 um 09:00 Uhr` or
/// `Jan 06, 2025 at 09:00 AM`.
pub fn format_slot(slot: &FreeSlot, language: Language, highlighted: bool) -> String {
    let star = if highlighted { HIGHLIGHT_MARK } else { "" };
    let when = match language {
        Language::German => slot.start.format("%d.%m.%Y um %H:%M Uhr"),
        Language::English => slot.start.format("%b %d, %Y at %I:%M %p"),
    };
    format!("{}{}", star, when)
}

/// Format every slot, marking those whose local date is in `highlights`.
pub fn format_slots(slots: &[FreeSlot], language: Language, highlights: &[NaiveDate]) -> Vec<String> {
    slots
        .iter()
        .map(|slot| {
            let highlighted = highlights.contains(&slot.start.date_naive());
            format_slot(slot, language, highlighted)
        })
        .collect()
}
