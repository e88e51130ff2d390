//! Collapsible stage panels of an assistant message.
//!
//! Each panel is a native `<details>` element. Tab switches re-fetch the
//! panel from `/ui/conversations/{id}/messages/{index}/stageN?tab=` and
//! swap it in place, already expanded.

use std::collections::BTreeMap;

use leptos::prelude::*;

use crate::conversation::{
    AggregateRanking, ResearchResult, Stage1Response, Stage2Ranking, Stage3Result,
    short_model_name,
};
use crate::council::ranking::deanonymize;
use crate::ui::components::{Badge, BadgeVariant, Button, ButtonVariant};
use crate::ui::markdown::markdown_to_html;

/// Clamp a requested tab index to `0..len` (0 when empty).
#[must_use]
pub fn clamp_tab(requested: usize, len: usize) -> usize {
    requested.min(len.saturating_sub(1))
}

fn stage_url(conversation_id: &str, message_index: usize, stage: u8, tab: usize) -> String {
    format!("/ui/conversations/{conversation_id}/messages/{message_index}/stage{stage}?tab={tab}")
}

/// Deep research findings. Renders nothing without content.
#[component]
pub fn ResearchStage(research: Option<ResearchResult>) -> impl IntoView {
    let Some(research) = research.filter(|r| !r.content.is_empty()) else {
        return None;
    };
    let html = markdown_to_html(&research.content);
    let meta = format!("({})", short_model_name(&research.model));
    let by = format!("Research conducted by: {}", research.model);

    Some(view! {
        <details class="stage research-stage collapsible">
            <summary class="stage-summary">
                <span class="stage-icon">"🔬"</span>
                <span class="stage-title">"Deep Research"</span>
                <span class="stage-meta">{meta}</span>
            </summary>
            <div class="stage-content">
                <div class="research-model">{by}</div>
                <div class="research-content markdown-content" inner_html=html></div>
            </div>
        </details>
    })
}

/// Stage 1: one tab per council model, one visible response.
#[component]
pub fn Stage1Panel(
    #[prop(into)] conversation_id: String,
    message_index: usize,
    responses: Vec<Stage1Response>,
    #[prop(default = 0)] active_tab: usize,
    #[prop(default = false)] open: bool,
) -> impl IntoView {
    if responses.is_empty() {
        return None;
    }
    let active = clamp_tab(active_tab, responses.len());
    let meta = format!("({} models)", responses.len());

    let tabs = responses
        .iter()
        .enumerate()
        .map(|(i, resp)| {
            let label = short_model_name(&resp.model).to_string();
            view! {
                <Button
                    variant=ButtonVariant::tab(i == active)
                    hx_get=stage_url(&conversation_id, message_index, 1, i)
                    hx_target="closest details"
                >
                    {label}
                </Button>
            }
        })
        .collect_view();

    let current = &responses[active];
    let model = current.model.clone();
    let html = markdown_to_html(&current.response);

    Some(view! {
        <details class="stage stage1 collapsible" open=open>
            <summary class="stage-summary">
                <span class="stage-title">"Stage 1: Individual Responses"</span>
                <span class="stage-meta">{meta}</span>
            </summary>
            <div class="stage-content">
                <div class="tabs">{tabs}</div>
                <div class="tab-content">
                    <div class="model-name">{model}</div>
                    <div class="response-text markdown-content" inner_html=html></div>
                </div>
            </div>
        </details>
    })
}

/// Stage 2: each model's evaluation, de-anonymized for reading, plus the
/// aggregate ranking.
#[component]
pub fn Stage2Panel(
    #[prop(into)] conversation_id: String,
    message_index: usize,
    rankings: Vec<Stage2Ranking>,
    label_to_model: BTreeMap<String, String>,
    aggregate: Vec<AggregateRanking>,
    #[prop(default = 0)] active_tab: usize,
    #[prop(default = false)] open: bool,
) -> impl IntoView {
    if rankings.is_empty() {
        return None;
    }
    let active = clamp_tab(active_tab, rankings.len());

    let tabs = rankings
        .iter()
        .enumerate()
        .map(|(i, r)| {
            let label = short_model_name(&r.model).to_string();
            view! {
                <Button
                    variant=ButtonVariant::tab(i == active)
                    hx_get=stage_url(&conversation_id, message_index, 2, i)
                    hx_target="closest details"
                >
                    {label}
                </Button>
            }
        })
        .collect_view();

    let current = &rankings[active];
    let model = current.model.clone();
    let html = markdown_to_html(&deanonymize(&current.ranking, &label_to_model));
    let parsed = (!current.parsed_ranking.is_empty()).then(|| {
        let items = current
            .parsed_ranking
            .iter()
            .map(|label| {
                let name = label_to_model
                    .get(label)
                    .map_or(label.as_str(), |m| short_model_name(m))
                    .to_string();
                view! { <li>{name}</li> }
            })
            .collect_view();
        view! {
            <div class="parsed-ranking">
                <strong>"Extracted Ranking:"</strong>
                <ol>{items}</ol>
            </div>
        }
    });

    let aggregate = (!aggregate.is_empty()).then(|| {
        let rows = aggregate
            .into_iter()
            .enumerate()
            .map(|(i, agg)| {
                let variant = if i == 0 { BadgeVariant::Success } else { BadgeVariant::Outline };
                let position = format!("#{}", i + 1);
                let name = short_model_name(&agg.model).to_string();
                let score = format!("Avg: {:.2}", agg.average_rank);
                let votes = format!("({} votes)", agg.rankings_count);
                view! {
                    <li class="aggregate-item">
                        <Badge variant=variant>{position}</Badge>
                        <span class="rank-model">{name}</span>
                        <span class="rank-score">{score}</span>
                        <span class="rank-count">{votes}</span>
                    </li>
                }
            })
            .collect_view();
        view! {
            <div class="aggregate-rankings">
                <h4>"Aggregate Rankings (Street Cred)"</h4>
                <p class="stage-description">
                    "Combined results across all peer evaluations (lower score is better):"
                </p>
                <ul class="aggregate-list">{rows}</ul>
            </div>
        }
    });

    Some(view! {
        <details class="stage stage2 collapsible" open=open>
            <summary class="stage-summary">
                <span class="stage-title">"Stage 2: Peer Rankings"</span>
            </summary>
            <div class="stage-content">
                <p class="stage-description">
                    "Each model evaluated all responses (anonymized as Response A, B, C, etc.) and \
                     provided rankings. Model names are shown in bold for readability; the \
                     original evaluation used anonymous labels."
                </p>
                <div class="tabs">{tabs}</div>
                <div class="tab-content">
                    <div class="model-name">{model}</div>
                    <div class="ranking-content markdown-content" inner_html=html></div>
                    {parsed}
                </div>
                {aggregate}
            </div>
        </details>
    })
}

/// Stage 3: the chairman's final answer, expanded by default.
#[component]
pub fn Stage3Panel(result: Stage3Result) -> impl IntoView {
    let chairman = format!("Chairman: {}", short_model_name(&result.model));
    let html = markdown_to_html(&result.response);

    view! {
        <details class="stage stage3 collapsible" open=true>
            <summary class="stage-summary">
                <span class="stage-title">"Stage 3: Final Council Answer"</span>
            </summary>
            <div class="stage-content">
                <div class="chairman-label">{chairman}</div>
                <div class="final-text markdown-content" inner_html=html></div>
            </div>
        </details>
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ui::render;

    /// The opening `<details ...>` tag of the panel with class `stage <class>`.
    fn details_tag<'a>(html: &'a str, class: &str) -> &'a str {
        let marker = format!("stage {class} collapsible");
        html.match_indices("<details")
            .map(|(start, _)| {
                let end = html[start..].find('>').map_or(html.len(), |e| start + e + 1);
                &html[start..end]
            })
            .find(|tag| tag.contains(&marker))
            .unwrap_or("")
    }

    fn responses(n: usize) -> Vec<Stage1Response> {
        (0..n)
            .map(|i| Stage1Response {
                model: format!("vendor/model-{i}"),
                response: format!("**answer {i}**"),
            })
            .collect()
    }

    #[test]
    fn test_clamp_tab() {
        assert_eq!(clamp_tab(0, 0), 0);
        assert_eq!(clamp_tab(7, 3), 2);
        assert_eq!(clamp_tab(1, 3), 1);
    }

    #[test]
    fn test_research_stage_hidden_without_content() {
        let html = render(|| view! { <ResearchStage research=None /> });
        assert!(!html.contains("<details"));
        let empty = ResearchResult {
            model: "openai/o3-deep-research".to_string(),
            content: String::new(),
            reasoning_details: None,
        };
        let html = render(move || view! { <ResearchStage research=Some(empty) /> });
        assert!(!html.contains("Deep Research"));
    }

    #[test]
    fn test_research_stage_renders() {
        let research = ResearchResult {
            model: "openai/o3-deep-research".to_string(),
            content: "# Findings".to_string(),
            reasoning_details: None,
        };
        let html = render(move || view! { <ResearchStage research=Some(research) /> });
        assert!(html.contains("(o3-deep-research)"));
        assert!(html.contains("Research conducted by: openai/o3-deep-research"));
        assert!(html.contains("<h1>Findings</h1>"));
    }

    #[test]
    fn test_stage1_one_tab_per_response_one_body() {
        let html = render(|| {
            view! {
                <Stage1Panel conversation_id="c1" message_index=1 responses=responses(3) active_tab=1 />
            }
        });
        assert!(html.contains("Stage 1: Individual Responses"));
        assert!(html.contains("(3 models)"));
        assert_eq!(html.matches("class=\"tab\"").count(), 2);
        assert_eq!(html.matches("class=\"tab active\"").count(), 1);
        assert_eq!(html.matches("class=\"response-text").count(), 1);
        assert!(html.contains("<strong>answer 1</strong>"));
        assert!(!html.contains("answer 0"));
        assert!(html.contains("/ui/conversations/c1/messages/1/stage1?tab=2"));
    }

    #[test]
    fn test_stage1_clamps_out_of_range_tab() {
        let html = render(|| {
            view! {
                <Stage1Panel conversation_id="c1" message_index=1 responses=responses(2) active_tab=9 open=true />
            }
        });
        assert!(html.contains("<strong>answer 1</strong>"));
        let tag = details_tag(&html, "stage1");
        assert!(tag.contains(" open"), "{tag}");
        assert!(tag.contains("class=\"stage stage1 collapsible\""), "{tag}");
    }

    #[test]
    fn test_stage1_closed_has_no_open_attribute() {
        let html = render(|| {
            view! {
                <Stage1Panel conversation_id="c1" message_index=1 responses=responses(2) active_tab=0 open=false />
            }
        });
        assert!(!details_tag(&html, "stage1").contains(" open"));
    }

    #[test]
    fn test_stage1_empty_renders_nothing() {
        let html = render(|| {
            view! { <Stage1Panel conversation_id="c1" message_index=1 responses=vec![] /> }
        });
        assert!(!html.contains("Stage 1"));
    }

    #[test]
    fn test_stage2_deanonymizes_and_aggregates() {
        let stage1 = responses(2);
        let label_to_model = crate::council::ranking::label_map(&stage1);
        let rankings = vec![Stage2Ranking {
            model: "vendor/model-0".to_string(),
            ranking: "Response B is best.\n\nFINAL RANKING:\n1. Response B\n2. Response A".to_string(),
            parsed_ranking: vec!["Response B".to_string(), "Response A".to_string()],
        }];
        let aggregate = vec![
            AggregateRanking {
                model: "vendor/model-1".to_string(),
                average_rank: 1.0,
                rankings_count: 1,
            },
            AggregateRanking {
                model: "vendor/model-0".to_string(),
                average_rank: 2.0,
                rankings_count: 1,
            },
        ];
        let html = render(move || {
            view! {
                <Stage2Panel
                    conversation_id="c1"
                    message_index=1
                    rankings=rankings
                    label_to_model=label_to_model
                    aggregate=aggregate
                />
            }
        });
        assert!(html.contains("Stage 2: Peer Rankings"));
        assert!(html.contains("<strong>model-1</strong> is best."));
        assert!(html.contains("Extracted Ranking:"));
        assert!(html.contains("Avg: 1.00"));
        assert!(html.contains("(1 votes)"));
        assert!(html.contains("badge badge-success"));
    }

    #[test]
    fn test_stage3_shows_chairman() {
        let result = Stage3Result {
            model: "google/gemini-3-pro-preview".to_string(),
            response: "Final *answer*".to_string(),
        };
        let html = render(move || view! { <Stage3Panel result=result /> });
        assert!(html.contains("Chairman: gemini-3-pro-preview"));
        assert!(html.contains("<em>answer</em>"));
    }
}
