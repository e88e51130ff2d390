//! Prompt templates for every council stage.

use std::fmt::Write as _;

use crate::conversation::{Stage1Response, Stage2Ranking};

use super::ranking::{FINAL_RANKING_MARKER, label_for};

/// Stage 1 prompt: the user query, optionally preceded by research context.
#[must_use]
pub fn stage1_prompt(query: &str, research_context: Option<&str>) -> String {
    match research_context.filter(|c| !c.is_empty()) {
        Some(context) => format!("{context}\n\nUser question: {query}"),
        None => query.to_string(),
    }
}

/// Stage 2 prompt asking a council member to rank the anonymized answers.
#[must_use]
pub fn ranking_prompt(query: &str, stage1: &[Stage1Response]) -> String {
    let mut responses = String::new();
    for (i, r) in stage1.iter().enumerate() {
        if i > 0 {
            responses.push_str("\n\n");
        }
        let _ = write!(responses, "{}:\n{}", label_for(i), r.response);
    }

    format!(
        "You are evaluating different responses to the following question:

Question: {query}

Here are the responses from different models (anonymized):

{responses}

Your task:
1. First, evaluate each response individually. For each response, explain what it does well and what it does poorly.
2. Then, at the very end of your response, provide a final ranking.

IMPORTANT: Your final ranking MUST be formatted EXACTLY as follows:
- Start with the line \"{FINAL_RANKING_MARKER}\" (all caps, with colon)
- Then list the responses from best to worst as a numbered list
- Each line should be: number, period, space, then ONLY the response label (e.g., \"1. Response A\")
- Do not add any other text or explanations in the ranking section

Example of the correct format for your ENTIRE response:

Response A provides good detail on X but misses Y...
Response B is accurate but lacks depth on Z...
Response C offers the most comprehensive answer...

{FINAL_RANKING_MARKER}
1. Response C
2. Response A
3. Response B

Now provide your evaluation and ranking:"
    )
}

/// Stage 3 prompt for the chairman.
#[must_use]
pub fn chairman_prompt(query: &str, stage1: &[Stage1Response], stage2: &[Stage2Ranking]) -> String {
    let stage1_text = stage1
        .iter()
        .map(|r| format!("Model: {}\nResponse: {}", r.model, r.response))
        .collect::<Vec<_>>()
        .join("\n\n");
    let stage2_text = stage2
        .iter()
        .map(|r| format!("Model: {}\nRanking: {}", r.model, r.ranking))
        .collect::<Vec<_>>()
        .join("\n\n");

    format!(
        "You are the Chairman of an LLM Council. Multiple AI models have provided responses to a user's question, and then ranked each other's responses.

Original Question: {query}

STAGE 1 - Individual Responses:
{stage1_text}

STAGE 2 - Peer Rankings:
{stage2_text}

Your task as Chairman is to synthesize all of this information into a single, comprehensive, accurate answer to the user's original question. Consider:
- The individual responses and their insights
- The peer rankings and what they reveal about response quality
- Any patterns of agreement or disagreement

Provide a clear, well-reasoned final answer that represents the council's collective wisdom:"
    )
}

/// Prompt for a short conversation title.
#[must_use]
pub fn title_prompt(query: &str) -> String {
    format!(
        "Generate a very short title (3-5 words maximum) that summarizes the following question.
The title should be concise and descriptive. Do not use quotes or punctuation in the title.

Question: {query}

Title:"
    )
}

/// Prompt sent to a deep research model.
#[must_use]
pub fn research_prompt(query: &str) -> String {
    format!(
        "Please conduct comprehensive research on the following topic.
Provide detailed, well-sourced information including:
- Key facts and current state of knowledge
- Multiple perspectives where applicable
- Recent developments or updates
- Relevant context and background

Research topic: {query}

Provide your research findings in a clear, structured format."
    )
}
