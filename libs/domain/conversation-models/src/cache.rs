use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Money {
    pub amount: f64,
    pub currency: String,
}

impl Money {
    /// Renders as `113,400.00 THB` — the format the Supervisor Router's
    /// cache-synthesized balance replies embed (§8 scenario 1).
    pub fn format_grouped(&self) -> String {
        let integer_part = self.amount.trunc().abs() as i64;
        let fractional = (self.amount.fract().abs() * 100.0).round() as i64;

        let digits = integer_part.to_string();
        let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
        for (i, ch) in digits.chars().rev().enumerate() {
            if i != 0 && i % 3 == 0 {
                grouped.push(',');
            }
            grouped.push(ch);
        }
        let grouped: String = grouped.chars().rev().collect();

        let sign = if self.amount < 0.0 { "-" } else { "" };
        format!("{sign}{grouped}.{fractional:02} {}", self.currency)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    pub id: String,
    pub number: String,
    pub balance: Money,
    pub holder_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    pub description: String,
    pub amount: Money,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Beneficiary {
    pub id: String,
    pub name: String,
    pub account_number: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LimitInfo {
    pub per_transaction: Money,
    pub daily: Money,
    pub remaining_today: Money,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CacheData {
    pub accounts: Vec<Account>,
    pub primary_balance: Option<Money>,
    pub last_n_transactions: Vec<Transaction>,
    pub beneficiaries: Vec<Beneficiary>,
    pub limits: Option<LimitInfo>,
}

/// Per-customer cache payload, owned exclusively by the cache store
/// (§3 CacheBundle). A bundle on disk is always fully populated —
/// partial bundles are never written or returned to readers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheBundle {
    pub customer_id: String,
    pub created_at: DateTime<Utc>,
    pub ttl_seconds: i64,
    pub data: CacheData,
}

impl CacheBundle {
    pub fn expires_at(&self) -> DateTime<Utc> {
        self.created_at + chrono::Duration::seconds(self.ttl_seconds)
    }

    pub fn is_valid(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn money_formats_with_grouping_separators() {
        let money = Money { amount: 113_400.0, currency: "THB".to_string() };
        assert_eq!(money.format_grouped(), "113,400.00 THB");
    }

    #[test]
    fn money_formats_small_amounts_without_separators() {
        let money = Money { amount: 42.5, currency: "USD".to_string() };
        assert_eq!(money.format_grouped(), "42.50 USD");
    }

    #[test]
    fn money_formats_negative_amounts() {
        let money = Money { amount: -12.0, currency: "USD".to_string() };
        assert_eq!(money.format_grouped(), "-12.00 USD");
    }

    #[test]
    fn bundle_is_valid_before_expiry_and_invalid_after() {
        let created_at = Utc::now() - chrono::Duration::seconds(100);
        let bundle = CacheBundle {
            customer_id: "C001".to_string(),
            created_at,
            ttl_seconds: 300,
            data: CacheData::default(),
        };

        assert!(bundle.is_valid(Utc::now()));
        assert!(!bundle.is_valid(created_at + chrono::Duration::seconds(301)));
    }

    #[test]
    fn bundle_round_trips_through_json() {
        let bundle = CacheBundle {
            customer_id: "C001".to_string(),
            created_at: Utc::now(),
            ttl_seconds: 300,
            data: CacheData {
                accounts: vec![Account {
                    id: "A1".to_string(),
                    number: "1234".to_string(),
                    balance: Money { amount: 100.0, currency: "THB".to_string() },
                    holder_name: "Alice".to_string(),
                }],
                primary_balance: Some(Money { amount: 100.0, currency: "THB".to_string() }),
                last_n_transactions: Vec::new(),
                beneficiaries: Vec::new(),
                limits: None,
            },
        };

        let json = serde_json::to_string(&bundle).expect("serializes");
        let restored: CacheBundle = serde_json::from_str(&json).expect("deserializes");
        assert_eq!(restored.customer_id, bundle.customer_id);
        assert_eq!(restored.data.accounts[0].number, "1234");
    }
}
