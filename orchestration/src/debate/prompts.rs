//! Role prompts.
//!
//! The proposer prompt changes shape when the topic carries folded-in history:
//! the service is shown the earlier rounds and asked for a new, stronger
//! proposal that avoids weaknesses already challenged.

use serde::{Deserialize, Serialize};

use super::history::TopicHistory;
use super::state::DebateRole;
use crate::speaker::SpeakerContext;

const PROPOSER_SYSTEM: &str = r#"You are an inventive proposer. Given a subject, put forward one detailed proposal.

Requirements:
1. The proposal must be genuinely innovative
2. Include concrete implementation steps
3. Address feasibility"#;

const CHALLENGER_SYSTEM: &str = r#"You are a rigorous reviewer. Challenge the proposal you are given.

Requirements:
1. Identify at least three potential problems
2. Offer improvement suggestions
3. Stay professional and objective"#;

const ARBITRATOR_SYSTEM: &str = r#"You are an impartial arbitrator. Weigh the proposal against the challenge.

Requirements:
1. Analyse both positions
2. Deliver a final verdict
3. Explain the reasons for the verdict"#;

/// Rendered messages for one speaker call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RolePrompt {
    pub system: String,
    pub user: String,
    pub temperature: f32,
}

/// Sampling temperature per role; the arbitrator runs cooler for steadier verdicts.
pub fn default_temperature(role: DebateRole) -> f32 {
    match role {
        DebateRole::Proposer | DebateRole::Challenger => 0.7,
        DebateRole::Arbitrator => 0.5,
    }
}

/// Build the prompt for a speaker context.
pub fn render(context: &SpeakerContext) -> RolePrompt {
    let role = context.role();
    let (system, user) = match context {
        SpeakerContext::Proposal { topic } => (
            PROPOSER_SYSTEM,
            match &topic.history {
                TopicHistory::None => {
                    format!("Put forward an innovative proposal for '{}'.", topic.base)
                }
                TopicHistory::Rendered(history) => format!(
                    "Put forward an innovative proposal for '{}'.\n\n\
                     Take note of the earlier debate rounds below:\n{}\n\n\
                     Building on those rounds, produce a new and more convincing proposal. It should:\n\
                     1. Learn from the earlier rounds\n\
                     2. Avoid the weaknesses that were challenged before\n\
                     3. Bring a genuinely new angle\n\
                     Begin your proposal:",
                    topic.base, history
                ),
            },
        ),
        SpeakerContext::Challenge { proposal } => (
            CHALLENGER_SYSTEM,
            format!("Proposal:\n{}\n\nChallenge this proposal.", proposal),
        ),
        SpeakerContext::Judgement {
            proposal,
            challenge,
        } => (
            ARBITRATOR_SYSTEM,
            format!(
                "Proposal:\n{}\n\nChallenge:\n{}\n\nDeliver your final ruling.",
                proposal, challenge
            ),
        ),
    };

    RolePrompt {
        system: system.to_string(),
        user,
        temperature: default_temperature(role),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::debate::{HistoryLedger, RoundRecord};

    #[test]
    fn test_plain_proposal_prompt() {
        let prompt = render(&SpeakerContext::proposal("renewable energy storage"));
        assert_eq!(
            prompt.user,
            "Put forward an innovative proposal for 'renewable energy storage'."
        );
        assert!(prompt.system.contains("proposer"));
        assert!((prompt.temperature - 0.7).abs() < f32::EPSILON);
    }

    #[test]
    fn test_history_enriched_proposal_prompt() {
        let mut ledger = HistoryLedger::new();
        ledger.append(RoundRecord::new(1, "Use flywheels.", "Cost is high.", "Pilot."));
        let topic = ledger.fold_into_topic("renewable energy storage");

        let prompt = render(&SpeakerContext::proposal(&topic));
        assert!(prompt
            .user
            .starts_with("Put forward an innovative proposal for 'renewable energy storage'."));
        assert!(prompt.user.contains("Challenge: Cost is high."));
        assert!(prompt.user.contains("Avoid the weaknesses that were challenged before"));
        // The subject is quoted without the history tail.
        assert!(!prompt.user.contains("storage\n[Round 1]'"));
    }

    #[test]
    fn test_challenge_prompt_embeds_full_proposal() {
        let prompt = render(&SpeakerContext::Challenge {
            proposal: "Use flywheels.".into(),
        });
        assert!(prompt.user.contains("Use flywheels."));
        assert!(prompt.system.contains("at least three"));
    }

    #[test]
    fn test_judgement_prompt() {
        let prompt = render(&SpeakerContext::Judgement {
            proposal: "Use flywheels.".into(),
            challenge: "Cost is high.".into(),
        });
        assert!(prompt.user.contains("Use flywheels."));
        assert!(prompt.user.contains("Cost is high."));
        assert!((prompt.temperature - 0.5).abs() < f32::EPSILON);
    }
}
