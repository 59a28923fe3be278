use std::collections::HashSet;
use std::sync::Arc;

use orchestrator_models::{AgentCategory, AgentCatalog, CacheBundle, Principal};
use tokio::sync::Mutex;
use tracing::instrument;

use crate::services::audit_log::AuditLog;
use crate::services::cache_store::CacheStore;
use crate::services::llm_classifier::LlmClassifier;

const BALANCE_KEYWORDS: &[&str] = &["balance", "how much", "available funds"];
const RECENT_TRANSACTIONS_KEYWORDS: &[&str] =
    &["recent transactions", "last transactions", "latest transactions"];
const LIMITS_KEYWORDS: &[&str] = &["limit", "daily limit", "per-transaction limit"];
const ACCOUNT_DETAILS_KEYWORDS: &[&str] = &["account details", "account info", "my account"];

const WRITE_INTENT_KEYWORDS: &[&str] =
    &["transfer", "pay ", "payment", "send money", "wire transfer", "pay bill"];

/// Weighted keyword sets scored for the closed-enum classifier (C5 step 3).
fn category_keywords(category: AgentCategory) -> &'static [&'static str] {
    match category {
        AgentCategory::Account => &["account", "balance", "statement", "account number", "holder"],
        AgentCategory::Transaction => {
            &["transaction", "transactions", "spending", "purchase", "payment history"]
        }
        AgentCategory::Payment => &["transfer", "pay", "payment", "send money", "wire", "beneficiary"],
        AgentCategory::ProductInfo => {
            &["loan", "credit card", "interest rate", "product", "apply for", "open an account"]
        }
        AgentCategory::MoneyCoach => {
            &["budget", "save", "savings goal", "financial advice", "spending habits", "money coach"]
        }
        AgentCategory::Escalation => {
            &["complaint", "speak to a human", "escalate", "frustrated", "unhappy", "agent please"]
        }
        AgentCategory::Unknown => &[],
    }
}

const SCORED_CATEGORIES: &[AgentCategory] = &[
    AgentCategory::Account,
    AgentCategory::Transaction,
    AgentCategory::Payment,
    AgentCategory::ProductInfo,
    AgentCategory::MoneyCoach,
    AgentCategory::Escalation,
];

/// Fixed sentinels that start/resolve an escalation pin (§4.5 step 1,
/// §9 open question: the spec leaves the pin's lifecycle to
/// configuration; this core treats it symmetrically with the write
/// sentinel table in the dispatcher).
pub const ESCALATION_STARTED_SENTINEL: &str = "ESCALATION STARTED";
pub const ESCALATION_RESOLVED_SENTINEL: &str = "ESCALATION RESOLVED";

/// Tracks which customers have an unresolved escalation pin (§4.5
/// step 1). A pin, once set, takes priority over every other routing
/// signal until an agent response resolves it.
#[derive(Clone, Default)]
pub struct EscalationPinStore {
    pinned: Arc<Mutex<HashSet<String>>>,
}

impl EscalationPinStore {
    pub async fn set(&self, customer_id: &str) {
        self.pinned.lock().await.insert(customer_id.to_string());
    }

    pub async fn clear(&self, customer_id: &str) {
        self.pinned.lock().await.remove(customer_id);
    }

    pub async fn is_pinned(&self, customer_id: &str) -> bool {
        self.pinned.lock().await.contains(customer_id)
    }

    /// Inspects an agent response for the start/resolve sentinels and
    /// updates the pin accordingly.
    pub async fn observe_response(&self, customer_id: &str, response_text: &str) {
        if response_text.contains(ESCALATION_RESOLVED_SENTINEL) {
            self.clear(customer_id).await;
        } else if response_text.contains(ESCALATION_STARTED_SENTINEL) {
            self.set(customer_id).await;
        }
    }
}

/// What the Supervisor Router decided for one message (§4.5 contract).
#[derive(Debug)]
pub enum RouterOutcome {
    CacheServe { response_text: String },
    Dispatch { agent_name: String, agent_endpoint: String, rewritten_message: String },
}

pub struct SupervisorRouter {
    catalog: AgentCatalog,
    cache: Arc<CacheStore>,
    escalation_pins: EscalationPinStore,
    llm_classifier: LlmClassifier,
    audit: AuditLog,
}

impl SupervisorRouter {
    pub fn new(
        catalog: AgentCatalog,
        cache: Arc<CacheStore>,
        escalation_pins: EscalationPinStore,
        llm_classifier: LlmClassifier,
        audit: AuditLog,
    ) -> Self {
        Self { catalog, cache, escalation_pins, llm_classifier, audit }
    }

    #[instrument(skip(self, principal), fields(customer_id = %principal.customer_id))]
    pub async fn route(&self, last_user_message: &str, principal: &Principal) -> RouterOutcome {
        let customer_id = &principal.customer_id;

        if self.escalation_pins.is_pinned(customer_id).await {
            if let Some(agent) = self.catalog.escalation_agent() {
                self.audit_decision(customer_id, "escalation_pin", "escalation", &[]);
                return RouterOutcome::Dispatch {
                    agent_name: agent.name.clone(),
                    agent_endpoint: agent.base_url.clone(),
                    rewritten_message: last_user_message.to_string(),
                };
            }
        }

        let lower_message = last_user_message.to_lowercase();

        if !matches_any(&lower_message, WRITE_INTENT_KEYWORDS) {
            if let Some(response_text) = self.try_cache_short_circuit(customer_id, &lower_message).await {
                self.audit_decision(customer_id, "cache_short_circuit", "cache", &[]);
                return RouterOutcome::CacheServe { response_text };
            }
        }

        if let Some((category, scores)) = classify_by_keywords(&lower_message) {
            self.audit_decision(customer_id, "keyword_classifier", category_label(category), &scores);
            return self.dispatch_outcome(category, last_user_message, principal);
        }

        let classified = self.llm_classifier.classify(last_user_message).await;
        let (category, reason) = match classified {
            Some(category) => (category, format!("llm_{}", category_label(category))),
            None => (AgentCategory::Account, "llm_default".to_string()),
        };
        self.audit_decision(customer_id, &reason, category_label(category), &[]);
        self.dispatch_outcome(category, last_user_message, principal)
    }

    async fn try_cache_short_circuit(&self, customer_id: &str, lower_message: &str) -> Option<String> {
        let bundle = match self.cache.get(customer_id).await {
            Some(bundle) => {
                self.audit_cache_event(customer_id, orchestrator_models::EventType::CacheHit);
                bundle
            }
            None => {
                self.audit_cache_event(customer_id, orchestrator_models::EventType::CacheMiss);
                return None;
            }
        };

        if matches_any(lower_message, BALANCE_KEYWORDS) {
            return synthesize_balance(&bundle);
        }
        if matches_any(lower_message, RECENT_TRANSACTIONS_KEYWORDS) {
            return Some(synthesize_recent_transactions(&bundle));
        }
        if matches_any(lower_message, LIMITS_KEYWORDS) {
            return synthesize_limits(&bundle);
        }
        if matches_any(lower_message, ACCOUNT_DETAILS_KEYWORDS) {
            return Some(synthesize_account_details(&bundle));
        }
        None
    }

    fn dispatch_outcome(&self, category: AgentCategory, message: &str, principal: &Principal) -> RouterOutcome {
        let agent = self.catalog.for_category(category).or_else(|| self.catalog.for_category(AgentCategory::Account));

        let Some(agent) = agent else {
            return RouterOutcome::Dispatch {
                agent_name: "account".to_string(),
                agent_endpoint: String::new(),
                rewritten_message: message.to_string(),
            };
        };

        let rewritten_message = if category == AgentCategory::Payment {
            format!("my username is {}, {}", principal.email, message)
        } else {
            message.to_string()
        };

        RouterOutcome::Dispatch {
            agent_name: agent.name.clone(),
            agent_endpoint: agent.base_url.clone(),
            rewritten_message,
        }
    }

    fn audit_cache_event(&self, customer_id: &str, event_type: orchestrator_models::EventType) {
        self.audit.record(orchestrator_models::AuditRecord::new(customer_id, "", event_type, serde_json::json!({})));
    }

    fn audit_decision(&self, customer_id: &str, reason: &str, category: &str, runner_up_scores: &[(AgentCategory, u32)]) {
        let runner_ups: Vec<_> = runner_up_scores
            .iter()
            .map(|(category, score)| serde_json::json!({ "category": category_label(*category), "score": score }))
            .collect();

        self.audit.record(orchestrator_models::AuditRecord::new(
            customer_id,
            "",
            orchestrator_models::EventType::RoutingDecision,
            serde_json::json!({ "reason": reason, "category": category, "runner_ups": runner_ups }),
        ));
    }
}

impl SupervisorRouter {
    pub fn agent_name_for_endpoint(&self, endpoint: &str) -> Option<String> {
        self.catalog.name_for_base_url(endpoint).map(str::to_string)
    }
}

fn matches_any(lower_message: &str, keywords: &[&str]) -> bool {
    keywords.iter().any(|keyword| lower_message.contains(keyword))
}

fn category_label(category: AgentCategory) -> &'static str {
    match category {
        AgentCategory::Account => "account",
        AgentCategory::Transaction => "transaction",
        AgentCategory::Payment => "payment",
        AgentCategory::ProductInfo => "product_info",
        AgentCategory::MoneyCoach => "money_coach",
        AgentCategory::Escalation => "escalation",
        AgentCategory::Unknown => "unknown",
    }
}

/// Scores every category by summing keyword occurrences; classifies
/// only if the winner scores >= 2 and strictly beats the runner-up
/// (§4.5 step 3). Returns the full score table for audit detail.
fn classify_by_keywords(lower_message: &str) -> Option<(AgentCategory, Vec<(AgentCategory, u32)>)> {
    let mut scores: Vec<(AgentCategory, u32)> = SCORED_CATEGORIES
        .iter()
        .map(|&category| (category, score_category(lower_message, category)))
        .collect();
    scores.sort_by(|a, b| b.1.cmp(&a.1));

    let (top_category, top_score) = scores[0];
    let runner_up_score = scores.get(1).map(|(_, score)| *score).unwrap_or(0);

    if top_score >= 2 && top_score > runner_up_score {
        Some((top_category, scores))
    } else {
        None
    }
}

fn score_category(lower_message: &str, category: AgentCategory) -> u32 {
    category_keywords(category)
        .iter()
        .map(|keyword| lower_message.matches(keyword).count() as u32)
        .sum()
}

fn synthesize_balance(bundle: &CacheBundle) -> Option<String> {
    let balance = bundle.data.primary_balance.as_ref()?;
    Some(format!("Your current balance is {}.", balance.format_grouped()))
}

fn synthesize_recent_transactions(bundle: &CacheBundle) -> String {
    if bundle.data.last_n_transactions.is_empty() {
        return "You have no recent transactions on file.".to_string();
    }
    let lines: Vec<String> = bundle
        .data
        .last_n_transactions
        .iter()
        .map(|transaction| format!("- {} ({})", transaction.description, transaction.amount.format_grouped()))
        .collect();
    format!("Here are your recent transactions:\n{}", lines.join("\n"))
}

fn synthesize_limits(bundle: &CacheBundle) -> Option<String> {
    let limits = bundle.data.limits.as_ref()?;
    Some(format!(
        "Your per-transaction limit is {}, your daily limit is {}, and you have {} remaining today.",
        limits.per_transaction.format_grouped(),
        limits.daily.format_grouped(),
        limits.remaining_today.format_grouped()
    ))
}

fn synthesize_account_details(bundle: &CacheBundle) -> String {
    let accounts: Vec<String> = bundle
        .data
        .accounts
        .iter()
        .map(|account| format!("- {} ({}), balance {}", account.holder_name, account.number, account.balance.format_grouped()))
        .collect();
    format!("Here are your accounts:\n{}", accounts.join("\n"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keyword_classifier_requires_clear_winner() {
        let (category, _) = classify_by_keywords("i want to check my account balance and account number").unwrap();
        assert_eq!(category, AgentCategory::Account);
    }

    #[test]
    fn ambiguous_messages_fall_through() {
        assert!(classify_by_keywords("please help with my money situation").is_none());
    }

    #[test]
    fn write_intent_keywords_detected() {
        assert!(matches_any("please transfer 300 to somchai", WRITE_INTENT_KEYWORDS));
    }
}
