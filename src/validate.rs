//! Input normalization for the CLI.
//!
//! Task status, quadrant, and energy accept natural words as well as the
//! canonical values. Resolution runs in three tiers: exact match, then
//! synonym lookup, then an error carrying the closest suggestion.

use std::collections::{HashMap, HashSet};
use std::sync::LazyLock;

use crate::model::{Quadrant, TaskStatus};

/// Rejected input plus an optional suggestion.
pub type Rejection = (String, Option<String>);

// ── Valid value sets ─────────────────────────────────────────

pub static VALID_STATUSES: LazyLock<HashSet<&str>> =
    LazyLock::new(|| ["pending", "completed", "missed"].into_iter().collect());

pub static VALID_QUADRANTS: LazyLock<HashSet<&str>> = LazyLock::new(|| {
    Quadrant::ALL.iter().map(Quadrant::as_str).collect()
});

// ── Synonym maps ─────────────────────────────────────────────

pub static STATUS_SYNONYMS: LazyLock<HashMap<&str, &str>> = LazyLock::new(|| {
    [
        ("done", "completed"),
        ("complete", "completed"),
        ("finished", "completed"),
        ("closed", "completed"),
        ("todo", "pending"),
        ("open", "pending"),
        ("new", "pending"),
        ("active", "pending"),
        ("overdue", "missed"),
        ("late", "missed"),
        ("skipped", "missed"),
    ]
    .into_iter()
    .collect()
});

pub static QUADRANT_SYNONYMS: LazyLock<HashMap<&str, &str>> = LazyLock::new(|| {
    [
        ("q1", "Q1_DO"),
        ("do", "Q1_DO"),
        ("urgent", "Q1_DO"),
        ("now", "Q1_DO"),
        ("q2", "Q2_SCHEDULE"),
        ("schedule", "Q2_SCHEDULE"),
        ("plan", "Q2_SCHEDULE"),
        ("important", "Q2_SCHEDULE"),
        ("q3", "Q3_DELEGATE"),
        ("delegate", "Q3_DELEGATE"),
        ("handoff", "Q3_DELEGATE"),
        ("q4", "Q4_ELIMINATE"),
        ("eliminate", "Q4_ELIMINATE"),
        ("drop", "Q4_ELIMINATE"),
        ("later", "Q4_ELIMINATE"),
    ]
    .into_iter()
    .collect()
});

/// Energy names map to string digits, 1=drained through 5=peak.
pub static ENERGY_SYNONYMS: LazyLock<HashMap<&str, &str>> = LazyLock::new(|| {
    [
        ("drained", "1"),
        ("exhausted", "1"),
        ("tired", "1"),
        ("low", "2"),
        ("light", "2"),
        ("steady", "3"),
        ("medium", "3"),
        ("normal", "3"),
        ("high", "4"),
        ("focused", "4"),
        ("peak", "5"),
        ("max", "5"),
        ("deep", "5"),
    ]
    .into_iter()
    .collect()
});

/// Normalize a task status via exact match or synonym lookup.
///
/// # Errors
///
/// Returns the original input and the closest known value, if any.
pub fn normalize_status(input: &str) -> Result<TaskStatus, Rejection> {
    let lower = input.to_lowercase();

    // Tier 1: exact match
    // Tier 2: synonym lookup
    let canonical = if VALID_STATUSES.contains(lower.as_str()) {
        Some(lower.as_str())
    } else {
        STATUS_SYNONYMS.get(lower.as_str()).copied()
    };

    // Tier 3: closest suggestion
    canonical
        .and_then(TaskStatus::from_canonical)
        .ok_or_else(|| {
            let suggestion = find_closest_match(&lower, &VALID_STATUSES, &STATUS_SYNONYMS);
            (input.to_string(), suggestion)
        })
}

/// Normalize a quadrant from `Q1_DO`, `q1`, `do`, `urgent`, ...
///
/// # Errors
///
/// Returns the original input and the closest known value, if any.
pub fn normalize_quadrant(input: &str) -> Result<Quadrant, Rejection> {
    if let Some(q) = Quadrant::from_canonical(&input.to_uppercase()) {
        return Ok(q);
    }

    let lower = input.to_lowercase();
    QUADRANT_SYNONYMS
        .get(lower.as_str())
        .and_then(|c| Quadrant::from_canonical(c))
        .ok_or_else(|| {
            let suggestion = find_closest_match(&lower, &VALID_QUADRANTS, &QUADRANT_SYNONYMS);
            (input.to_string(), suggestion)
        })
}

/// Normalize an energy level from `1`-`5` or a name.
///
/// # Errors
///
/// Returns the original input with a usage hint.
pub fn normalize_energy(input: &str) -> Result<u8, Rejection> {
    let lower = input.to_lowercase();

    if let Ok(n) = lower.parse::<u8>() {
        if (1..=5).contains(&n) {
            return Ok(n);
        }
        return Err((
            input.to_string(),
            Some("Energy must be 1-5 (1=drained, 5=peak)".to_string()),
        ));
    }

    ENERGY_SYNONYMS
        .get(lower.as_str())
        .and_then(|digit| digit.parse().ok())
        .ok_or_else(|| {
            (
                input.to_string(),
                Some("Use 1-5 or: drained, low, steady, high, peak".to_string()),
            )
        })
}

/// Find the closest matching value across valid set and synonyms.
fn find_closest_match(
    input: &str,
    valid: &HashSet<&str>,
    synonyms: &HashMap<&str, &str>,
) -> Option<String> {
    let mut best: Option<(&str, usize)> = None;

    for &v in valid.iter().chain(synonyms.keys()) {
        let dist = levenshtein_distance(input, v);
        if dist > 3 || best.is_some_and(|(_, d)| d <= dist) {
            continue;
        }
        // Synonyms suggest what they map to
        let shown = synonyms.get(v).copied().unwrap_or(v);
        best = Some((shown, dist));
    }

    best.map(|(v, _)| v.to_string())
}

// ── Levenshtein distance ─────────────────────────────────────

/// Compute the Levenshtein edit distance between two strings.
#[must_use]
pub fn levenshtein_distance(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();

    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }

    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut curr = vec![0; b.len() + 1];

    for (i, ca) in a.iter().enumerate() {
        curr[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let cost = usize::from(ca != cb);
            curr[j + 1] = (prev[j + 1] + 1).min(curr[j] + 1).min(prev[j] + cost);
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[b.len()]
}

// ── Record id resolution ─────────────────────────────────────

/// Outcome of matching a typed id against known ids.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdMatch {
    /// Exactly one id matched, in full or by prefix.
    Found(String),
    /// Several ids share the prefix.
    Ambiguous(Vec<String>),
    /// Nothing matched; carries near misses.
    Missing(Vec<String>),
}

/// Resolve a full id or a unique prefix of one.
///
/// UUIDs are long to type, so the CLI accepts any unambiguous prefix.
#[must_use]
pub fn resolve_id(input: &str, existing: &[String]) -> IdMatch {
    if existing.iter().any(|id| id == input) {
        return IdMatch::Found(input.to_string());
    }

    let matches: Vec<String> = existing
        .iter()
        .filter(|id| id.starts_with(input))
        .cloned()
        .collect();

    match matches.len() {
        0 => IdMatch::Missing(find_similar_ids(input, existing, 3)),
        1 => IdMatch::Found(matches.into_iter().next().unwrap_or_default()),
        _ => IdMatch::Ambiguous(matches),
    }
}

/// Find existing IDs similar to the searched ID.
///
/// Compares against prefixes of the same length, so a mistyped short id
/// still finds its full UUID. Returns up to `max` suggestions with edit
/// distance ≤ 2, sorted by distance then alphabetically.
#[must_use]
pub fn find_similar_ids(searched: &str, existing: &[String], max: usize) -> Vec<String> {
    let width = searched.chars().count();
    let mut candidates: Vec<(usize, &str)> = existing
        .iter()
        .map(|id| {
            let head: String = id.chars().take(width).collect();
            (levenshtein_distance(searched, &head), id.as_str())
        })
        .filter(|(dist, _)| *dist <= 2)
        .collect();

    candidates.sort_by(|a, b| a.0.cmp(&b.0).then_with(|| a.1.cmp(b.1)));

    candidates
        .into_iter()
        .take(max)
        .map(|(_, id)| id.to_string())
        .collect()
}
