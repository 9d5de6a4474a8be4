//! Production groups: items manufactured together in lockstep.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use prodplan_core::{ItemBatchQuantity, ItemId, ProductionGroupId, TenantId, UserId};

use super::DailySummary;

/// A stored production group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductionGroup {
    pub id: ProductionGroupId,
    pub tenant_id: TenantId,
    pub name: String,
    pub description: Option<String>,
    /// Members in planner-defined order.
    pub items: Vec<ItemId>,
    /// Consolidated batch size at the last membership validation.
    pub qty_per_batch: Decimal,
    pub created_by: UserId,
    pub updated_by: UserId,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Planner-supplied group definition for create and update.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupInput {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub items: Vec<ItemId>,
}

impl GroupInput {
    /// Trimmed name, or `None` when blank.
    #[must_use]
    pub fn trimmed_name(&self) -> Option<&str> {
        let name = self.name.trim();
        (!name.is_empty()).then_some(name)
    }

    /// Trimmed description, with blank treated as absent.
    #[must_use]
    pub fn trimmed_description(&self) -> Option<&str> {
        self.description
            .as_deref()
            .map(str::trim)
            .filter(|d| !d.is_empty())
    }
}

/// A validated group ready to be stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewProductionGroup {
    pub name: String,
    pub description: Option<String>,
    pub items: Vec<ItemId>,
    pub qty_per_batch: Decimal,
    pub acting_user: UserId,
}

/// One group on the consolidated sheet for a day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupView {
    /// `None` for the ungrouped view.
    pub group_id: Option<ProductionGroupId>,
    pub name: String,
    pub items: Vec<ItemId>,
    /// Maximum qty/batch across members; `None` when members now disagree.
    pub qty_per_batch: Option<Decimal>,
    /// Non-empty only when members report differing non-zero qty/batch.
    pub conflicts: Vec<ItemBatchQuantity>,
    /// Member summaries present for the day, in member order.
    pub summaries: Vec<DailySummary>,
}

/// Grouped production sheet for a day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductionGroupSheet {
    pub date: NaiveDate,
    pub groups: Vec<GroupView>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_group_input_trims() {
        let input: GroupInput = serde_json::from_str(
            r#"{"name": "  Moulds A ", "description": "   ", "items": ["I1", " I2 "]}"#,
        )
        .unwrap();
        assert_eq!(input.trimmed_name(), Some("Moulds A"));
        assert_eq!(input.trimmed_description(), None);
        assert_eq!(input.items[1].as_str(), "I2");
    }

    #[test]
    fn test_blank_name_is_none() {
        let input: GroupInput = serde_json::from_str(r#"{"items": ["I1"]}"#).unwrap();
        assert_eq!(input.trimmed_name(), None);
    }
}
