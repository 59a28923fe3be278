use std::collections::HashMap;

use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct CustomerRecord {
    pub customer_id: String,
    pub display_name: String,
}

/// Static `email -> customer_id` mapping loaded at startup from
/// `<root>/config/customers.json` (§3 Customer directory, §6.2).
/// Read-only: the core never mutates it, only refreshes it wholesale.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(transparent)]
pub struct CustomerDirectory {
    by_email: HashMap<String, CustomerRecord>,
}

impl CustomerDirectory {
    pub fn lookup(&self, email: &str) -> Option<&CustomerRecord> {
        self.by_email.get(email)
    }

    pub fn len(&self) -> usize {
        self.by_email.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_email.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn looks_up_known_email() {
        let json = r#"{ "alice@ex": { "customer_id": "C001", "display_name": "Alice" } }"#;
        let directory: CustomerDirectory = serde_json::from_str(json).expect("valid directory");

        let record = directory.lookup("alice@ex").expect("present");
        assert_eq!(record.customer_id, "C001");
        assert_eq!(directory.len(), 1);
    }

    #[test]
    fn unknown_email_returns_none() {
        let directory = CustomerDirectory::default();
        assert!(directory.lookup("nobody@ex").is_none());
        assert!(directory.is_empty());
    }
}
