//! Clause editor operations. Each action reads the slice of state it owns and
//! returns the partial update the editor forwards to the session.

use super::{
    HavingCondition, LogicalOperator, OrderByField, OrderDirection, QueryPatch, QueryState,
    SelectField, WhereCondition,
};
use crate::catalog::{AssetProperty, TIME_INTERVAL_PROPERTY, TIME_INTERVAL_TAG};
use serde::{Deserialize, Serialize};

/// Option shape emitted by a select control: `{ label, value }`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectOption {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

impl SelectOption {
    pub fn value(value: impl Into<String>) -> Self {
        Self {
            label: None,
            value: Some(value.into()),
        }
    }
}

/// GROUP BY multi-select payload: one option or a list of them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum GroupBySelection {
    Many(Vec<SelectOption>),
    One(SelectOption),
}

/// Normalizes a GROUP BY selection to the list of non-empty values.
pub fn extract_group_by_tags(selection: Option<&GroupBySelection>) -> Vec<String> {
    match selection {
        Some(GroupBySelection::Many(options)) => options
            .iter()
            .filter_map(|opt| opt.value.clone())
            .filter(|value| !value.is_empty())
            .collect(),
        Some(GroupBySelection::One(option)) => option
            .value
            .clone()
            .filter(|value| !value.is_empty())
            .into_iter()
            .collect(),
        None => Vec::new(),
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectFieldUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub column: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aggregation: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub function_arg: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub function_arg_value: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WhereConditionUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub column: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operator: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value2: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logical_operator: Option<LogicalOperator>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operator2: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HavingConditionUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aggregation: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub column: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operator: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logical_operator: Option<LogicalOperator>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderByFieldUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub column: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub direction: Option<OrderDirection>,
}

/// A user interaction with one of the clause editors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum ClauseAction {
    SelectModel {
        #[serde(default)]
        model: Option<String>,
    },
    AddSelectField,
    RemoveSelectField {
        index: usize,
    },
    UpdateSelectField {
        index: usize,
        update: SelectFieldUpdate,
    },
    AddWhereCondition,
    RemoveWhereCondition {
        index: usize,
    },
    UpdateWhereCondition {
        index: usize,
        update: WhereConditionUpdate,
    },
    SetGroupByTags {
        #[serde(default)]
        selection: Option<GroupBySelection>,
    },
    SetGroupByTime {
        #[serde(default)]
        interval: Option<String>,
    },
    AddHavingCondition,
    RemoveHavingCondition {
        index: usize,
    },
    UpdateHavingCondition {
        index: usize,
        update: HavingConditionUpdate,
    },
    AddOrderByField,
    RemoveOrderByField {
        index: usize,
    },
    UpdateOrderByField {
        index: usize,
        update: OrderByFieldUpdate,
    },
    SetLimit {
        input: String,
    },
    SetTimezone {
        timezone: String,
    },
}

impl ClauseAction {
    /// Computes the partial update for this action. Actions that change
    /// nothing (out-of-range rows, removing the last row, unparseable limit)
    /// yield an empty patch.
    pub fn into_patch(self, state: &QueryState) -> QueryPatch {
        match self {
            ClauseAction::SelectModel { model } => QueryPatch {
                selected_asset_model: Some(Some(model.unwrap_or_default())),
                select_fields: Some(vec![SelectField::blank()]),
                where_conditions: Some(vec![WhereCondition::blank()]),
                order_by_fields: Some(vec![OrderByField::blank()]),
                ..QueryPatch::default()
            },
            ClauseAction::AddSelectField => QueryPatch {
                select_fields: Some(append_row(&state.select_fields, SelectField::blank())),
                ..QueryPatch::default()
            },
            ClauseAction::RemoveSelectField { index } => QueryPatch {
                select_fields: remove_row(&state.select_fields, index),
                ..QueryPatch::default()
            },
            ClauseAction::UpdateSelectField { index, update } => QueryPatch {
                select_fields: update_row(&state.select_fields, index, |field| {
                    apply_select_update(field, update)
                }),
                ..QueryPatch::default()
            },
            ClauseAction::AddWhereCondition => QueryPatch {
                where_conditions: Some(append_row(
                    &state.where_conditions,
                    WhereCondition::blank(),
                )),
                ..QueryPatch::default()
            },
            ClauseAction::RemoveWhereCondition { index } => QueryPatch {
                where_conditions: remove_row(&state.where_conditions, index),
                ..QueryPatch::default()
            },
            ClauseAction::UpdateWhereCondition { index, update } => QueryPatch {
                where_conditions: update_row(&state.where_conditions, index, |condition| {
                    apply_where_update(condition, update)
                }),
                ..QueryPatch::default()
            },
            ClauseAction::SetGroupByTags { selection } => {
                let tags = extract_group_by_tags(selection.as_ref());
                let group_by_time = if tags.iter().any(|tag| tag == TIME_INTERVAL_TAG) {
                    None
                } else {
                    Some(Some(String::new()))
                };
                QueryPatch {
                    group_by_tags: Some(tags),
                    group_by_time,
                    ..QueryPatch::default()
                }
            }
            ClauseAction::SetGroupByTime { interval } => QueryPatch {
                group_by_time: Some(Some(interval.unwrap_or_default())),
                ..QueryPatch::default()
            },
            ClauseAction::AddHavingCondition => QueryPatch {
                having_conditions: Some(append_row(
                    &state.having_conditions,
                    HavingCondition::blank(),
                )),
                ..QueryPatch::default()
            },
            ClauseAction::RemoveHavingCondition { index } => QueryPatch {
                having_conditions: remove_row(&state.having_conditions, index),
                ..QueryPatch::default()
            },
            ClauseAction::UpdateHavingCondition { index, update } => QueryPatch {
                having_conditions: update_row(&state.having_conditions, index, |condition| {
                    apply_having_update(condition, update)
                }),
                ..QueryPatch::default()
            },
            ClauseAction::AddOrderByField => QueryPatch {
                order_by_fields: Some(append_row(&state.order_by_fields, OrderByField::blank())),
                ..QueryPatch::default()
            },
            ClauseAction::RemoveOrderByField { index } => QueryPatch {
                order_by_fields: remove_row(&state.order_by_fields, index),
                ..QueryPatch::default()
            },
            ClauseAction::UpdateOrderByField { index, update } => QueryPatch {
                order_by_fields: update_row(&state.order_by_fields, index, |field| {
                    if let Some(column) = update.column {
                        field.column = column;
                    }
                    if let Some(direction) = update.direction {
                        field.direction = direction;
                    }
                }),
                ..QueryPatch::default()
            },
            ClauseAction::SetLimit { input } => QueryPatch {
                limit: parse_limit_input(&input),
                ..QueryPatch::default()
            },
            ClauseAction::SetTimezone { timezone } => QueryPatch {
                timezone: Some(timezone),
                ..QueryPatch::default()
            },
        }
    }
}

fn append_row<T: Clone>(rows: &[T], row: T) -> Vec<T> {
    let mut next = rows.to_vec();
    next.push(row);
    next
}

/// Removing is refused when only one row is left.
fn remove_row<T: Clone>(rows: &[T], index: usize) -> Option<Vec<T>> {
    if rows.len() <= 1 || index >= rows.len() {
        return None;
    }
    let mut next = rows.to_vec();
    next.remove(index);
    Some(next)
}

fn update_row<T: Clone>(rows: &[T], index: usize, edit: impl FnOnce(&mut T)) -> Option<Vec<T>> {
    let mut next = rows.to_vec();
    edit(next.get_mut(index)?);
    Some(next)
}

fn apply_select_update(field: &mut SelectField, update: SelectFieldUpdate) {
    if let Some(column) = update.column {
        field.column = column;
    }
    if let Some(aggregation) = update.aggregation {
        field.aggregation = Some(aggregation);
        // arguments belong to the previous function
        field.function_arg = Some(String::new());
        field.function_arg_value = Some(String::new());
    }
    if let Some(alias) = update.alias {
        field.alias = Some(alias);
    }
    if let Some(arg) = update.function_arg {
        field.function_arg = Some(arg);
    }
    if let Some(value) = update.function_arg_value {
        field.function_arg_value = Some(value);
    }
}

fn apply_where_update(condition: &mut WhereCondition, update: WhereConditionUpdate) {
    if let Some(column) = update.column {
        condition.column = column;
    }
    if let Some(operator) = update.operator {
        condition.operator = operator;
    }
    if let Some(value) = update.value {
        condition.value = value;
    }
    if let Some(value2) = update.value2 {
        condition.value2 = Some(value2);
    }
    if let Some(logical) = update.logical_operator {
        condition.logical_operator = Some(logical);
    }
    if let Some(operator2) = update.operator2 {
        condition.operator2 = Some(operator2);
    }
}

fn apply_having_update(condition: &mut HavingCondition, update: HavingConditionUpdate) {
    if let Some(aggregation) = update.aggregation {
        condition.aggregation = aggregation;
    }
    if let Some(column) = update.column {
        condition.column = column;
    }
    if let Some(operator) = update.operator {
        condition.operator = operator;
    }
    if let Some(value) = update.value {
        condition.value = value;
    }
    if let Some(logical) = update.logical_operator {
        condition.logical_operator = Some(logical);
    }
}

/// Reads the LIMIT input box. Blank clears the limit so the default applies;
/// otherwise the leading integer wins (`"12abc"` is 12). `None` means the
/// input is not a number and the state stays as it is.
pub fn parse_limit_input(input: &str) -> Option<Option<i64>> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Some(None);
    }

    let (sign, rest) = match trimmed.as_bytes()[0] {
        b'-' => (-1, &trimmed[1..]),
        b'+' => (1, &trimmed[1..]),
        _ => (1, trimmed),
    };
    let digits_end = rest
        .find(|ch: char| !ch.is_ascii_digit())
        .unwrap_or(rest.len());
    let digits = &rest[..digits_end];
    if digits.is_empty() {
        return None;
    }

    digits
        .parse::<i64>()
        .ok()
        .map(|value| Some(sign * value))
}

/// Columns of the selected model; empty when no known model is selected.
pub fn available_properties(state: &QueryState) -> &'static [AssetProperty] {
    state
        .selected_model()
        .map(|model| model.properties.as_slice())
        .unwrap_or_default()
}

/// GROUP BY candidates: selected output columns plus the time pseudo column.
pub fn grouping_properties(state: &QueryState) -> Vec<AssetProperty> {
    let mut properties: Vec<AssetProperty> = available_properties(state)
        .iter()
        .filter(|prop| {
            state
                .select_fields
                .iter()
                .any(|field| field.column == prop.name)
        })
        .cloned()
        .collect();
    properties.push(TIME_INTERVAL_PROPERTY.clone());
    properties
}
