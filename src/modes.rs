//! Council mode definitions.
//!
//! A mode is a named behavior profile attached to a conversation when it is
//! created. It decides the pipeline flow, the sampling temperature and which
//! model chairs the final synthesis.

use serde::Serialize;

/// Mode used when none is requested or the requested id is unknown.
pub const DEFAULT_MODE: &str = "standard";

/// Default deep research model.
pub const DEFAULT_DEEP_RESEARCH_MODEL: &str = "openai/o3-deep-research";

/// Pipeline shape of a mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ModeFlow {
    /// Stage 1 → Stage 2 → Stage 3.
    Council,
    /// Deep research, then the three council stages seeded with it.
    ResearchFirst,
    /// Three stages at high temperature with a deep research chairman.
    CreativeChairman,
}

/// A council mode descriptor.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CouncilMode {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub icon: &'static str,
    pub flow: ModeFlow,
    pub temperature: f32,
    pub chairman_model: Option<&'static str>,
    pub deep_research_model: Option<&'static str>,
}

static MODES: [CouncilMode; 3] = [
    CouncilMode {
        id: "standard",
        name: "Standard",
        description: "Balanced deliberation for general questions",
        icon: "⚖️",
        flow: ModeFlow::Council,
        temperature: 0.7,
        chairman_model: Some("google/gemini-3-pro-preview"),
        deep_research_model: None,
    },
    CouncilMode {
        id: "research",
        name: "Research",
        description: "Deep research before council deliberation",
        icon: "🔬",
        flow: ModeFlow::ResearchFirst,
        temperature: 0.7,
        chairman_model: Some("google/gemini-3-pro-preview"),
        deep_research_model: Some(DEFAULT_DEEP_RESEARCH_MODEL),
    },
    CouncilMode {
        id: "creative",
        name: "Creative",
        description: "High-creativity brainstorming with grounded synthesis",
        icon: "🎨",
        flow: ModeFlow::CreativeChairman,
        temperature: 1.0,
        chairman_model: Some("openai/o3-deep-research"),
        deep_research_model: None,
    },
];

/// All available modes, in display order.
#[must_use]
pub fn list_modes() -> &'static [CouncilMode] {
    &MODES
}

/// Look up a mode by id, falling back to [`DEFAULT_MODE`].
#[must_use]
pub fn get_mode(mode_id: &str) -> &'static CouncilMode {
    find_mode(mode_id).unwrap_or_else(default_mode)
}

/// Look up a mode by id without falling back.
#[must_use]
pub fn find_mode(mode_id: &str) -> Option<&'static CouncilMode> {
    MODES.iter().find(|m| m.id == mode_id)
}

fn default_mode() -> &'static CouncilMode {
    &MODES[0]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_mode_is_first() {
        assert_eq!(default_mode().id, DEFAULT_MODE);
    }

    #[test]
    fn test_unknown_mode_falls_back() {
        assert_eq!(get_mode("does-not-exist").id, "standard");
        assert!(find_mode("does-not-exist").is_none());
    }

    #[test]
    fn test_mode_flows() {
        assert_eq!(get_mode("research").flow, ModeFlow::ResearchFirst);
        assert_eq!(
            get_mode("research").deep_research_model,
            Some("openai/o3-deep-research")
        );
        assert_eq!(get_mode("creative").flow, ModeFlow::CreativeChairman);
        assert!((get_mode("creative").temperature - 1.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_mode_serializes_snake_case_flow() {
        let json = serde_json::to_value(get_mode("creative")).unwrap();
        assert_eq!(json["flow"], "creative_chairman");
        assert_eq!(json["icon"], "🎨");
        assert!(json["deep_research_model"].is_null());
    }

    #[test]
    fn test_list_order() {
        let ids: Vec<_> = list_modes().iter().map(|m| m.id).collect();
        assert_eq!(ids, ["standard", "research", "creative"]);
    }
}
