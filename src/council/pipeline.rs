//! Mode-aware council run over a stored conversation.
//!
//! [`drive`] does the work and reports progress on a channel. The streaming
//! endpoint turns that channel into a [`CouncilEvent`] stream; the blocking
//! endpoint ignores the progress and keeps the returned outcome.

use std::sync::Arc;

use futures::Stream;
use tokio::sync::mpsc;

use super::ranking::calculate_aggregate_rankings;
use super::research::{format_research_context, run_deep_research};
use super::{ALL_MODELS_FAILED, Council, CouncilOutcome, RankingMetadata};
use crate::conversation::{AssistantMessage, Conversation, PLACEHOLDER_TITLE, Stage3Result};
use crate::events::{CouncilEvent, ModeInfo, TitleInfo};
use crate::modes::{ModeFlow, get_mode};
use crate::storage::{ConversationStore, StorageError};

const EVENT_BUFFER: usize = 16;

/// Run the council for `content` and stream progress events.
///
/// The run happens on its own task, so a client that disconnects mid-stream
/// does not lose the persisted answer. The stream always ends with
/// [`CouncilEvent::Complete`] or a single [`CouncilEvent::Error`].
pub fn stream_council(
    council: Arc<Council>,
    store: Arc<dyn ConversationStore>,
    conversation: Conversation,
    content: String,
) -> impl Stream<Item = CouncilEvent> + Send + 'static {
    let (tx, mut rx) = mpsc::channel(EVENT_BUFFER);

    tokio::spawn(async move {
        let conversation_id = conversation.id.clone();
        if let Err(e) = drive(council, store, conversation, content, &tx).await {
            tracing::error!(conversation_id = %conversation_id, error = %e, "Council run failed");
            let _ = tx
                .send(CouncilEvent::Error {
                    message: e.to_string(),
                })
                .await;
        }
    });

    async_stream::stream! {
        while let Some(event) = rx.recv().await {
            let terminal = event.is_terminal();
            yield event;
            if terminal {
                break;
            }
        }
    }
}

/// Failure of a blocking council run.
#[derive(Debug, thiserror::Error)]
pub enum RunError {
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// The run task panicked or was cancelled.
    #[error("Council run aborted: {0}")]
    Aborted(#[from] tokio::task::JoinError),
}

/// Run the council for `content` and return the outcome once persisted.
///
/// Like [`stream_council`], the run lives on its own task: dropping the
/// returned future (client gone, route timeout) leaves it running to
/// completion.
pub async fn run_message(
    council: Arc<Council>,
    store: Arc<dyn ConversationStore>,
    conversation: Conversation,
    content: String,
) -> Result<CouncilOutcome, RunError> {
    let handle = tokio::spawn(async move {
        // Nobody listens; sends fail silently.
        let (tx, _) = mpsc::channel(1);
        drive(council, store, conversation, content, &tx).await
    });
    Ok(handle.await??)
}

/// Execute the mode's flow, persisting the exchange and emitting events.
pub async fn drive(
    council: Arc<Council>,
    store: Arc<dyn ConversationStore>,
    conversation: Conversation,
    content: String,
    tx: &mpsc::Sender<CouncilEvent>,
) -> Result<CouncilOutcome, StorageError> {
    let emit = move |event: CouncilEvent| async move {
        // A closed channel means the client went away; keep working.
        let _ = tx.send(event).await;
    };

    let mode = get_mode(&conversation.mode);
    let first_message = conversation.is_empty();

    store.add_user_message(&conversation.id, &content).await?;

    let title_task = first_message.then(|| {
        let council = Arc::clone(&council);
        let query = content.clone();
        tokio::spawn(async move { council.generate_conversation_title(&query).await })
    });

    emit(CouncilEvent::ModeInfo {
        data: ModeInfo {
            mode: mode.id.to_string(),
            config: mode.clone(),
        },
    })
    .await;

    let mut research = None;
    if mode.flow == ModeFlow::ResearchFirst {
        emit(CouncilEvent::ResearchStart).await;
        let model = mode
            .deep_research_model
            .unwrap_or(crate::modes::DEFAULT_DEEP_RESEARCH_MODEL);
        research = run_deep_research(
            council.client(),
            &content,
            model,
            council.settings().deep_research_timeout,
        )
        .await;
        emit(CouncilEvent::ResearchComplete {
            data: research.clone(),
        })
        .await;
    }
    let context = format_research_context(research.as_ref());
    let context = (!context.is_empty()).then_some(context.as_str());
    let temperature = Some(mode.temperature);

    emit(CouncilEvent::Stage1Start).await;
    let stage1 = council
        .stage1_collect_responses(&content, temperature, context)
        .await;
    emit(CouncilEvent::Stage1Complete {
        data: stage1.clone(),
    })
    .await;

    emit(CouncilEvent::Stage2Start).await;
    let (stage2, label_to_model) = if stage1.is_empty() {
        (Vec::new(), Default::default())
    } else {
        council
            .stage2_collect_rankings(&content, &stage1, temperature)
            .await
    };
    let metadata = RankingMetadata {
        aggregate_rankings: calculate_aggregate_rankings(&stage2, &label_to_model),
        label_to_model,
    };
    emit(CouncilEvent::Stage2Complete {
        data: stage2.clone(),
        metadata: metadata.clone(),
    })
    .await;

    emit(CouncilEvent::Stage3Start).await;
    let stage3 = if stage1.is_empty() {
        tracing::warn!(conversation_id = %conversation.id, "No council model answered");
        Stage3Result {
            model: "error".to_string(),
            response: ALL_MODELS_FAILED.to_string(),
        }
    } else {
        let chairman = mode
            .chairman_model
            .unwrap_or(council.settings().chairman_model.as_str());
        council
            .stage3_synthesize_final(
                &content,
                &stage1,
                &stage2,
                Some(chairman),
                council.chairman_timeout(chairman),
            )
            .await
    };
    emit(CouncilEvent::Stage3Complete {
        data: stage3.clone(),
    })
    .await;

    if let Some(task) = title_task {
        let title = task.await.unwrap_or_else(|e| {
            tracing::warn!(error = %e, "Title task failed");
            PLACEHOLDER_TITLE.to_string()
        });
        store.update_title(&conversation.id, &title).await?;
        emit(CouncilEvent::TitleComplete {
            data: TitleInfo { title },
        })
        .await;
    }

    store
        .add_assistant_message(
            &conversation.id,
            AssistantMessage {
                stage1: stage1.clone(),
                stage2: stage2.clone(),
                stage3: stage3.clone(),
                research,
            },
        )
        .await?;

    metrics::counter!("council_runs_total", "mode" => mode.id).increment(1);
    tracing::info!(
        name: "council.completed",
        conversation_id = %conversation.id,
        mode = %mode.id,
        responses = stage1.len(),
        rankings = stage2.len(),
        "Council run complete"
    );
    emit(CouncilEvent::Complete).await;

    Ok(CouncilOutcome {
        stage1,
        stage2,
        stage3,
        metadata: Some(metadata),
    })
}

#[cfg(test)]
mod tests {
    use futures::StreamExt;

    use super::*;
    use crate::conversation::ConversationMessage;
    use crate::council::CouncilSettings;
    use crate::llm::{LlmClient, ScriptedDriver};
    use crate::storage::MemoryStore;

    fn council(driver: ScriptedDriver) -> Arc<Council> {
        let settings = CouncilSettings {
            models: vec!["x/a".to_string(), "x/b".to_string()],
            chairman_model: "x/chair".to_string(),
            title_model: "x/title".to_string(),
            ..CouncilSettings::default()
        };
        Arc::new(Council::new(LlmClient::new(Arc::new(driver)), settings))
    }

    fn driver() -> ScriptedDriver {
        ScriptedDriver::new(|req| {
            let prompt = &req.messages[0].content;
            if prompt.starts_with("You are the Chairman") {
                Some("synthesis".to_string())
            } else if prompt.starts_with("You are evaluating") {
                Some("FINAL RANKING:\n1. Response B\n2. Response A".to_string())
            } else if prompt.starts_with("Generate a very short title") {
                Some("Tides".to_string())
            } else if prompt.contains("Research topic:") {
                Some("Research notes.".to_string())
            } else {
                Some(format!("answer from {}", req.model))
            }
        })
        .recording()
    }

    async fn run(
        mode: &str,
        driver: ScriptedDriver,
    ) -> (Vec<CouncilEvent>, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        let conv = store.create("c1", mode).await.unwrap();
        let events: Vec<_> = stream_council(
            council(driver),
            store.clone(),
            conv,
            "why tides?".to_string(),
        )
        .collect()
        .await;
        (events, store)
    }

    /// Wait until `id` holds `count` messages, or give up after two seconds.
    async fn wait_for_messages(store: &MemoryStore, id: &str, count: usize) -> Conversation {
        for _ in 0..200 {
            let conv = store.get(id).await.unwrap().unwrap();
            if conv.messages.len() >= count {
                return conv;
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
        store.get(id).await.unwrap().unwrap()
    }

    fn names(events: &[CouncilEvent]) -> Vec<&'static str> {
        events.iter().map(CouncilEvent::name).collect()
    }

    #[tokio::test]
    async fn test_standard_event_order() {
        let (events, store) = run("standard", driver()).await;
        assert_eq!(
            names(&events),
            [
                "mode_info",
                "stage1_start",
                "stage1_complete",
                "stage2_start",
                "stage2_complete",
                "stage3_start",
                "stage3_complete",
                "title_complete",
                "complete",
            ]
        );

        let conv = store.get("c1").await.unwrap().unwrap();
        assert_eq!(conv.title, "Tides");
        assert_eq!(conv.messages.len(), 2);
        let ConversationMessage::Assistant(answer) = &conv.messages[1] else {
            panic!("expected assistant message");
        };
        assert!(answer.research.is_none());
        // Standard mode names its own chairman.
        assert_eq!(answer.stage3.model, "google/gemini-3-pro-preview");
    }

    #[tokio::test]
    async fn test_research_first_event_order() {
        let d = driver();
        let (events, store) = run("research", d.clone()).await;
        assert_eq!(
            &names(&events)[..4],
            ["mode_info", "research_start", "research_complete", "stage1_start"]
        );
        let CouncilEvent::ResearchComplete { data: Some(research) } = &events[2] else {
            panic!("expected research result");
        };
        assert_eq!(research.content, "Research notes.");

        let stage1_prompts: Vec<_> = d
            .requests()
            .into_iter()
            .filter(|r| r.model == "x/a" || r.model == "x/b")
            .map(|r| r.messages[0].content.clone())
            .filter(|p| p.contains("User question:"))
            .collect();
        assert_eq!(stage1_prompts.len(), 2);
        assert!(stage1_prompts.iter().all(|p| p.starts_with("=== DEEP RESEARCH CONTEXT ===")));

        let conv = store.get("c1").await.unwrap().unwrap();
        let ConversationMessage::Assistant(answer) = &conv.messages[1] else {
            panic!("expected assistant message");
        };
        assert_eq!(answer.research.as_ref().unwrap().model, "openai/o3-deep-research");
    }

    #[tokio::test]
    async fn test_creative_uses_mode_temperature_and_chairman() {
        let d = driver();
        let (events, _) = run("creative", d.clone()).await;
        assert!(!names(&events).contains(&"research_start"));

        let stage3 = events.iter().find_map(|e| match e {
            CouncilEvent::Stage3Complete { data } => Some(data.clone()),
            _ => None,
        });
        assert_eq!(stage3.unwrap().model, "openai/o3-deep-research");
        assert!(
            d.requests()
                .iter()
                .filter(|r| r.model == "x/a")
                .all(|r| r.temperature == Some(1.0))
        );
    }

    #[tokio::test]
    async fn test_second_message_has_no_title_event() {
        let store = Arc::new(MemoryStore::new());
        store.create("c1", "standard").await.unwrap();
        store.add_user_message("c1", "earlier").await.unwrap();
        let conv = store.get("c1").await.unwrap().unwrap();

        let events: Vec<_> = stream_council(council(driver()), store.clone(), conv, "more".to_string())
            .collect()
            .await;
        assert!(!names(&events).contains(&"title_complete"));
        assert_eq!(events.last(), Some(&CouncilEvent::Complete));
    }

    #[tokio::test]
    async fn test_all_models_failed() {
        let (events, _) = run("standard", ScriptedDriver::new(|_| None)).await;
        let stage3 = events.iter().find_map(|e| match e {
            CouncilEvent::Stage3Complete { data } => Some(data.clone()),
            _ => None,
        });
        assert_eq!(stage3.unwrap().response, ALL_MODELS_FAILED);
        assert_eq!(events.last(), Some(&CouncilEvent::Complete));
    }

    #[tokio::test]
    async fn test_missing_conversation_yields_single_error() {
        let store = Arc::new(MemoryStore::new());
        let ghost = Conversation::new("ghost", "standard");
        let events: Vec<_> = stream_council(council(driver()), store, ghost, "q".to_string())
            .collect()
            .await;
        assert_eq!(events.len(), 1);
        assert!(matches!(&events[0], CouncilEvent::Error { message } if message.contains("ghost")));
    }

    #[tokio::test]
    async fn test_run_message_returns_outcome() {
        let store = Arc::new(MemoryStore::new());
        let conv = store.create("c1", "standard").await.unwrap();
        let outcome = run_message(council(driver()), store.clone(), conv, "q".to_string())
            .await
            .unwrap();
        assert_eq!(outcome.stage1.len(), 2);
        assert_eq!(outcome.stage3.response, "synthesis");
        let meta = outcome.metadata.unwrap();
        assert_eq!(meta.aggregate_rankings[0].model, "x/b");
        assert_eq!(store.get("c1").await.unwrap().unwrap().title, "Tides");
    }

    #[tokio::test]
    async fn test_dropped_stream_still_persists_answer() {
        let store = Arc::new(MemoryStore::new());
        let conv = store.create("c1", "standard").await.unwrap();
        let slow = driver().with_delay(std::time::Duration::from_millis(50));

        let mut events = Box::pin(stream_council(
            council(slow),
            store.clone(),
            conv,
            "why tides?".to_string(),
        ));
        let first = events.next().await.unwrap();
        assert_eq!(first.name(), "mode_info");
        drop(events);

        let conv = wait_for_messages(&store, "c1", 2).await;
        assert_eq!(conv.messages.len(), 2);
        assert_eq!(conv.title, "Tides");
    }

    #[tokio::test]
    async fn test_cancelled_run_message_still_completes() {
        let store = Arc::new(MemoryStore::new());
        let conv = store.create("c1", "standard").await.unwrap();
        let slow = driver().with_delay(std::time::Duration::from_millis(100));

        let cancelled = tokio::time::timeout(
            std::time::Duration::from_millis(20),
            run_message(council(slow), store.clone(), conv, "q".to_string()),
        )
        .await;
        assert!(cancelled.is_err());

        let conv = wait_for_messages(&store, "c1", 2).await;
        assert_eq!(conv.messages.len(), 2);
        assert_eq!(conv.title, "Tides");
        let ConversationMessage::Assistant(answer) = &conv.messages[1] else {
            panic!("expected assistant message");
        };
        assert_eq!(answer.stage3.response, "synthesis");
    }

    #[tokio::test]
    async fn test_run_message_missing_conversation() {
        let store = Arc::new(MemoryStore::new());
        let ghost = Conversation::new("ghost", "standard");
        let err = run_message(council(driver()), store, ghost, "q".to_string())
            .await
            .unwrap_err();
        assert!(matches!(err, RunError::Storage(StorageError::NotFound(_))));
    }
}
