use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Closed set of specialist categories the Supervisor Router can
/// dispatch to. Implemented as a tagged union rather than a
/// string-keyed lookup so an unrecognized label collapses to a single,
/// explicit `Unknown` variant instead of silently falling through
/// string comparisons scattered across the router (§9 Dynamic dispatch).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentCategory {
    Account,
    Transaction,
    Payment,
    ProductInfo,
    MoneyCoach,
    Escalation,
    Unknown,
}

impl AgentCategory {
    pub fn from_label(label: &str) -> Self {
        match label.trim().to_lowercase().as_str() {
            "account" => Self::Account,
            "transaction" => Self::Transaction,
            "payment" => Self::Payment,
            "product_info" | "product-info" => Self::ProductInfo,
            "money_coach" | "money-coach" => Self::MoneyCoach,
            "escalation" => Self::Escalation,
            _ => Self::Unknown,
        }
    }
}

/// Static per-agent configuration loaded at startup (§3 AgentCatalog).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentDefinition {
    pub name: String,
    pub base_url: String,
    pub category: AgentCategory,
    pub may_use_cache: bool,
}

/// One entry of `<root>/config/agents.json` before the key (the agent
/// name) is folded in (§6.2: "mapping `agent_name -> { base_url,
/// category, may_use_cache }`").
#[derive(Debug, Clone, Deserialize)]
struct AgentDefinitionBody {
    base_url: String,
    category: AgentCategory,
    may_use_cache: bool,
}

/// Raw shape of `agents.json`: `agent_name -> definition`.
#[derive(Debug, Clone, Deserialize)]
#[serde(transparent)]
pub struct AgentCatalogFile {
    agents: HashMap<String, AgentDefinitionBody>,
}

impl AgentCatalogFile {
    pub fn into_definitions(self) -> Vec<AgentDefinition> {
        self.agents
            .into_iter()
            .map(|(name, body)| AgentDefinition {
                name,
                base_url: body.base_url,
                category: body.category,
                may_use_cache: body.may_use_cache,
            })
            .collect()
    }
}

/// Read-only mapping of logical agent name to its configuration.
#[derive(Debug, Clone, Default)]
pub struct AgentCatalog {
    by_name: HashMap<String, AgentDefinition>,
    by_category: HashMap<AgentCategory, String>,
}

impl AgentCatalog {
    pub fn from_definitions(definitions: Vec<AgentDefinition>) -> Self {
        let mut by_name = HashMap::with_capacity(definitions.len());
        let mut by_category = HashMap::with_capacity(definitions.len());
        for definition in definitions {
            by_category.insert(definition.category, definition.name.clone());
            by_name.insert(definition.name.clone(), definition);
        }
        Self { by_name, by_category }
    }

    pub fn get(&self, name: &str) -> Option<&AgentDefinition> {
        self.by_name.get(name)
    }

    pub fn for_category(&self, category: AgentCategory) -> Option<&AgentDefinition> {
        self.by_category
            .get(&category)
            .and_then(|name| self.by_name.get(name))
    }

    pub fn escalation_agent(&self) -> Option<&AgentDefinition> {
        self.for_category(AgentCategory::Escalation)
    }

    pub fn name_for_base_url(&self, base_url: &str) -> Option<&str> {
        self.by_name
            .values()
            .find(|definition| definition.base_url == base_url)
            .map(|definition| definition.name.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog() -> AgentCatalog {
        AgentCatalog::from_definitions(vec![
            AgentDefinition {
                name: "payment".to_string(),
                base_url: "http://payment:9000".to_string(),
                category: AgentCategory::Payment,
                may_use_cache: false,
            },
            AgentDefinition {
                name: "account".to_string(),
                base_url: "http://account:9001".to_string(),
                category: AgentCategory::Account,
                may_use_cache: true,
            },
        ])
    }

    #[test]
    fn resolves_agent_by_category_and_endpoint() {
        let catalog = catalog();
        assert_eq!(catalog.for_category(AgentCategory::Payment).unwrap().name, "payment");
        assert_eq!(catalog.name_for_base_url("http://account:9001"), Some("account"));
        assert!(catalog.for_category(AgentCategory::Escalation).is_none());
    }

    #[test]
    fn unrecognized_label_maps_to_unknown() {
        assert_eq!(AgentCategory::from_label("not_a_category"), AgentCategory::Unknown);
        assert_eq!(AgentCategory::from_label("Money_Coach"), AgentCategory::MoneyCoach);
    }
}
