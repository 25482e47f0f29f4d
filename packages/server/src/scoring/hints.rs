//! Rule-based practice hints.
//!
//! Each category carries three tiers, from a general nudge to a concrete technique.
//! Hints never depend on the flag, so they are safe to serve to anyone once the event
//! has ended.

use chrono::{DateTime, Utc};
use common::Category;
use sea_orm::*;

use crate::entity::{challenge, event};
use crate::error::AppError;
use crate::scoring::window;

pub const MAX_TIER: u8 = 3;

const WEB: [&str; 3] = [
    "Check input handling and server-side validation.",
    "Try adjusting payload encoding or headers.",
    "Inspect how the app builds queries or templates.",
];
const CRYPTO: [&str; 3] = [
    "Identify the cipher or scheme used.",
    "Look for padding, mode, or encoding issues.",
    "Consider known-plaintext or key-space constraints.",
];
const FORENSICS: [&str; 3] = [
    "Extract and inspect embedded metadata.",
    "Try common file carving or timeline analysis.",
    "Focus on hidden content or alternate data streams.",
];
const REVERSING: [&str; 3] = [
    "Trace the control flow and critical functions.",
    "Inspect string references and I/O routines.",
    "Patch or hook to observe checks dynamically.",
];
const PWN: [&str; 3] = [
    "Locate user-controlled buffers and boundaries.",
    "Check protections (NX, PIE, ASLR) and format strings.",
    "Craft an exploit using the discovered primitive.",
];
const OSINT: [&str; 3] = [
    "Expand queries with alternative spellings.",
    "Pivot across platforms and reverse image search.",
    "Correlate timestamps, locations, and identities.",
];
const MISC: [&str; 3] = [
    "Break the task into smaller steps.",
    "Try different encodings or data formats.",
    "Look for non-obvious transformations.",
];
const STEGO: [&str; 3] = [
    "Inspect color channels and LSB patterns.",
    "Try common steg tools for images or audio.",
    "Compare original vs modified artifacts.",
];

fn bank(category: Category) -> &'static [&'static str; 3] {
    match category {
        Category::WebExploitation => &WEB,
        Category::Cryptography => &CRYPTO,
        Category::Forensics => &FORENSICS,
        Category::ReverseEngineering => &REVERSING,
        Category::Pwn => &PWN,
        Category::Osint => &OSINT,
        Category::Misc => &MISC,
        Category::Steganography => &STEGO,
    }
}

/// `1..=MAX_TIER`.
pub fn validate_tier(tier: u8) -> Result<(), AppError> {
    if tier == 0 || tier > MAX_TIER {
        return Err(AppError::Validation(format!(
            "Tier must be between 1 and {MAX_TIER}"
        )));
    }
    Ok(())
}

/// Hint text for `tier` of `category`. `tier` must already be validated.
pub fn rule_hint(category: Category, tier: u8) -> &'static str {
    let hints = bank(category);
    let idx = usize::from(tier.clamp(1, MAX_TIER)) - 1;
    hints[idx]
}

/// Hint for a challenge whose event has ended.
pub async fn practice_hint<C: ConnectionTrait>(
    db: &C,
    challenge_id: i32,
    tier: u8,
    now: DateTime<Utc>,
) -> Result<&'static str, AppError> {
    validate_tier(tier)?;

    let challenge = challenge::Entity::find_by_id(challenge_id)
        .one(db)
        .await?
        .ok_or_else(|| AppError::NotFound("Challenge not found".into()))?;
    let event = event::Entity::find_by_id(challenge.event_id)
        .one(db)
        .await?
        .ok_or_else(|| AppError::NotFound("Challenge not found".into()))?;

    if !window::has_ended(&event, now) {
        return Err(AppError::Forbidden(
            "Hints are available after the event ends".into(),
        ));
    }

    Ok(rule_hint(challenge.category, tier))
}
