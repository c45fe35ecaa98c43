//! Query-state model shared by the clause editors, the preview generator and
//! the validator.

pub mod clauses;
mod generator;
mod validate;

pub use generator::{generate_preview, generate_preview_with, GeneratorOptions, MODEL_PROMPT};
pub use validate::validate_query;

use crate::catalog::{self, AssetModel};
use serde::{Deserialize, Serialize};
use std::fmt;

pub const DEFAULT_TIMEZONE: &str = "UTC";
pub const DEFAULT_STATE_LIMIT: i64 = 1000;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum LogicalOperator {
    #[default]
    #[serde(rename = "AND")]
    And,
    #[serde(rename = "OR")]
    Or,
}

impl LogicalOperator {
    pub fn as_str(self) -> &'static str {
        match self {
            LogicalOperator::And => "AND",
            LogicalOperator::Or => "OR",
        }
    }
}

impl fmt::Display for LogicalOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderDirection {
    #[default]
    #[serde(rename = "ASC")]
    Asc,
    #[serde(rename = "DESC")]
    Desc,
}

impl OrderDirection {
    pub fn as_str(self) -> &'static str {
        match self {
            OrderDirection::Asc => "ASC",
            OrderDirection::Desc => "DESC",
        }
    }
}

/// One output column of the SELECT clause.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectField {
    #[serde(default)]
    pub column: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aggregation: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub function_arg: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub function_arg_value: Option<String>,
}

impl SelectField {
    pub fn blank() -> Self {
        Self {
            column: String::new(),
            aggregation: Some(String::new()),
            alias: Some(String::new()),
            function_arg: None,
            function_arg_value: None,
        }
    }

    pub fn column(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WhereCondition {
    #[serde(default)]
    pub column: String,
    #[serde(default)]
    pub operator: String,
    #[serde(default)]
    pub value: String,
    /// Upper bound for `BETWEEN`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value2: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logical_operator: Option<LogicalOperator>,
    /// Keyword between the two `BETWEEN` bounds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operator2: Option<String>,
}

impl WhereCondition {
    pub fn blank() -> Self {
        Self {
            logical_operator: Some(LogicalOperator::And),
            ..Self::default()
        }
    }

    pub fn new(column: impl Into<String>, operator: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            operator: operator.into(),
            value: value.into(),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HavingCondition {
    #[serde(default)]
    pub aggregation: String,
    #[serde(default)]
    pub column: String,
    #[serde(default)]
    pub operator: String,
    #[serde(default)]
    pub value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logical_operator: Option<LogicalOperator>,
}

impl HavingCondition {
    /// Row appended by the HAVING editor's add button.
    pub fn blank() -> Self {
        Self {
            aggregation: "SUM".to_string(),
            column: String::new(),
            operator: ">".to_string(),
            value: String::new(),
            logical_operator: Some(LogicalOperator::And),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderByField {
    #[serde(default)]
    pub column: String,
    #[serde(default)]
    pub direction: OrderDirection,
}

impl OrderByField {
    pub fn blank() -> Self {
        Self::default()
    }
}

/// Structured, editable form of a not-yet-rendered query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryState {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selected_asset_model: Option<String>,
    #[serde(default)]
    pub selected_assets: Vec<String>,
    #[serde(default)]
    pub select_fields: Vec<SelectField>,
    #[serde(default)]
    pub where_conditions: Vec<WhereCondition>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_by_time: Option<String>,
    #[serde(default)]
    pub group_by_tags: Vec<String>,
    #[serde(default)]
    pub having_conditions: Vec<HavingCondition>,
    #[serde(default)]
    pub order_by_fields: Vec<OrderByField>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<i64>,
    #[serde(default = "default_timezone")]
    pub timezone: String,
    #[serde(default, rename = "rawSQL")]
    pub raw_sql: String,
}

fn default_timezone() -> String {
    DEFAULT_TIMEZONE.to_string()
}

impl Default for QueryState {
    fn default() -> Self {
        Self {
            selected_asset_model: Some(String::new()),
            selected_assets: Vec::new(),
            select_fields: vec![SelectField::blank()],
            where_conditions: vec![WhereCondition::blank()],
            group_by_time: Some(String::new()),
            group_by_tags: Vec::new(),
            having_conditions: Vec::new(),
            order_by_fields: vec![OrderByField::blank()],
            limit: Some(DEFAULT_STATE_LIMIT),
            timezone: default_timezone(),
            raw_sql: String::new(),
        }
    }
}

impl QueryState {
    /// Selected model id, ignoring the empty placeholder.
    pub fn model_id(&self) -> Option<&str> {
        self.selected_asset_model
            .as_deref()
            .filter(|id| !id.is_empty())
    }

    pub fn selected_model(&self) -> Option<&'static AssetModel> {
        self.model_id().and_then(catalog::find_model)
    }

    /// Non-empty time bucket.
    pub fn time_bucket(&self) -> Option<&str> {
        self.group_by_time
            .as_deref()
            .filter(|interval| !interval.is_empty())
    }

    /// Replaces every field present in `patch`, leaving the rest untouched.
    pub fn merge(&mut self, patch: QueryPatch) {
        let QueryPatch {
            selected_asset_model,
            selected_assets,
            select_fields,
            where_conditions,
            group_by_time,
            group_by_tags,
            having_conditions,
            order_by_fields,
            limit,
            timezone,
            raw_sql,
        } = patch;

        if let Some(value) = selected_asset_model {
            self.selected_asset_model = value;
        }
        if let Some(value) = selected_assets {
            self.selected_assets = value;
        }
        if let Some(value) = select_fields {
            self.select_fields = value;
        }
        if let Some(value) = where_conditions {
            self.where_conditions = value;
        }
        if let Some(value) = group_by_time {
            self.group_by_time = value;
        }
        if let Some(value) = group_by_tags {
            self.group_by_tags = value;
        }
        if let Some(value) = having_conditions {
            self.having_conditions = value;
        }
        if let Some(value) = order_by_fields {
            self.order_by_fields = value;
        }
        if let Some(value) = limit {
            self.limit = value;
        }
        if let Some(value) = timezone {
            self.timezone = value;
        }
        if let Some(value) = raw_sql {
            self.raw_sql = value;
        }
    }
}

/// Partial update of a [`QueryState`]. Nullable state fields use a double
/// option so `null` clears the value while an absent key keeps it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryPatch {
    #[serde(
        default,
        with = "::serde_with::rust::double_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub selected_asset_model: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selected_assets: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub select_fields: Option<Vec<SelectField>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub where_conditions: Option<Vec<WhereCondition>>,
    #[serde(
        default,
        with = "::serde_with::rust::double_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub group_by_time: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_by_tags: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub having_conditions: Option<Vec<HavingCondition>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order_by_fields: Option<Vec<OrderByField>>,
    #[serde(
        default,
        with = "::serde_with::rust::double_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub limit: Option<Option<i64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timezone: Option<String>,
    #[serde(default, rename = "rawSQL", skip_serializing_if = "Option::is_none")]
    pub raw_sql: Option<String>,
}

impl QueryPatch {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Preview text plus advisory validation messages for one state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreviewResponse {
    pub preview: String,
    pub errors: Vec<String>,
}

impl PreviewResponse {
    pub fn for_state(state: &QueryState, options: &GeneratorOptions) -> Self {
        Self {
            preview: generate_preview_with(state, options),
            errors: validate_query(state),
        }
    }
}
