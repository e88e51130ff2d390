//! Anonymized peer ranking: labels, parsing and aggregation.

use std::collections::{BTreeMap, HashMap};
use std::sync::LazyLock;

use regex::Regex;

use crate::conversation::{AggregateRanking, Stage1Response, Stage2Ranking};

/// Marker that starts the machine-readable part of a ranking reply.
pub const FINAL_RANKING_MARKER: &str = "FINAL RANKING:";

static NUMBERED_LABEL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\d+\.\s*(Response [A-Z])").expect("numbered label pattern is valid")
});

static BARE_LABEL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Response [A-Z]").expect("label pattern is valid"));

/// Largest council whose responses all get a distinct single-letter label.
pub const MAX_COUNCIL_MODELS: usize = 26;

/// Label for the response at `index` in stage 1 order: `Response A`, `Response B`, ...
///
/// Configuration caps the council at [`MAX_COUNCIL_MODELS`], so indices stay within `A..=Z`.
#[must_use]
pub fn label_for(index: usize) -> String {
    let letter = char::from(b'A' + u8::try_from(index % 26).unwrap_or(0));
    format!("Response {letter}")
}

/// Map every anonymous label to the model that produced it.
#[must_use]
pub fn label_map(stage1: &[Stage1Response]) -> BTreeMap<String, String> {
    stage1
        .iter()
        .enumerate()
        .map(|(i, r)| (label_for(i), r.model.clone()))
        .collect()
}

/// Extract the ordered list of labels from a ranking reply.
///
/// Prefers the numbered list after [`FINAL_RANKING_MARKER`]; falls back to
/// bare label mentions in that section, then in the whole text.
#[must_use]
pub fn parse_ranking_from_text(text: &str) -> Vec<String> {
    if let Some((_, section)) = text.split_once(FINAL_RANKING_MARKER) {
        let numbered: Vec<String> = NUMBERED_LABEL
            .captures_iter(section)
            .map(|c| c[1].to_string())
            .collect();
        if !numbered.is_empty() {
            return numbered;
        }
        return bare_labels(section);
    }

    bare_labels(text)
}

fn bare_labels(text: &str) -> Vec<String> {
    BARE_LABEL
        .find_iter(text)
        .map(|m| m.as_str().to_string())
        .collect()
}

/// Average position of every model across all parsed rankings.
///
/// Sorted best first (lowest average). Labels missing from `label_to_model`
/// are ignored; averages are rounded to two decimals.
#[must_use]
pub fn calculate_aggregate_rankings(
    stage2: &[Stage2Ranking],
    label_to_model: &BTreeMap<String, String>,
) -> Vec<AggregateRanking> {
    let mut positions: HashMap<&str, Vec<usize>> = HashMap::new();

    for ranking in stage2 {
        for (idx, label) in ranking.parsed_ranking.iter().enumerate() {
            if let Some(model) = label_to_model.get(label) {
                positions.entry(model.as_str()).or_default().push(idx + 1);
            }
        }
    }

    let mut aggregate: Vec<AggregateRanking> = positions
        .into_iter()
        .map(|(model, ranks)| {
            #[allow(clippy::cast_precision_loss)]
            let avg = ranks.iter().sum::<usize>() as f64 / ranks.len() as f64;
            AggregateRanking {
                model: model.to_string(),
                average_rank: (avg * 100.0).round() / 100.0,
                rankings_count: ranks.len(),
            }
        })
        .collect();

    aggregate.sort_by(|a, b| {
        a.average_rank
            .total_cmp(&b.average_rank)
            .then_with(|| a.model.cmp(&b.model))
    });
    aggregate
}

/// Replace anonymous labels in ranking text with bold short model names.
#[must_use]
pub fn deanonymize(text: &str, label_to_model: &BTreeMap<String, String>) -> String {
    BARE_LABEL
        .replace_all(text, |caps: &regex::Captures<'_>| {
            let label = &caps[0];
            label_to_model.get(label).map_or_else(
                || label.to_string(),
                |model| format!("**{}**", crate::conversation::short_model_name(model)),
            )
        })
        .into_owned()
}
