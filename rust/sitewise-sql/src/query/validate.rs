//! Advisory checks surfaced next to the preview. Nothing here blocks
//! generation; an empty list means the state looks complete.

use super::{generator::BETWEEN, QueryState, SelectField};
use crate::{
    catalog::{AssetModel, FunctionKind, TIME_INTERVAL_TAG},
    time::parse_interval,
};

pub fn validate_query(state: &QueryState) -> Vec<String> {
    let mut errors = Vec::new();

    let Some(model_id) = state.model_id() else {
        errors.push("Select an asset model.".to_string());
        return errors;
    };

    let model = state.selected_model();
    if model.is_none() {
        errors.push(format!("Unknown asset model '{model_id}'."));
    }

    check_select_fields(&state.select_fields, model, &mut errors);

    for (idx, condition) in state.where_conditions.iter().enumerate() {
        if condition.column.is_empty() {
            continue;
        }
        let position = idx + 1;
        if condition.operator.trim().is_empty() {
            errors.push(format!(
                "WHERE condition {position} is missing an operator."
            ));
        } else if condition.operator == BETWEEN
            && condition.value2.as_deref().map_or(true, str::is_empty)
        {
            errors.push(format!(
                "WHERE condition {position} uses BETWEEN but has no upper bound."
            ));
        }
    }

    for (idx, condition) in state.having_conditions.iter().enumerate() {
        if condition.column.trim().is_empty() {
            continue;
        }
        if condition.aggregation.trim().is_empty() || condition.operator.trim().is_empty() {
            errors.push(format!("HAVING condition {} is incomplete.", idx + 1));
        }
    }

    match state.time_bucket() {
        Some(interval) => {
            if parse_interval(interval).is_err() {
                errors.push(format!("Unsupported time interval '{interval}'."));
            }
        }
        None => {
            if state.group_by_tags.iter().any(|tag| tag == TIME_INTERVAL_TAG) {
                errors.push("Select a time interval to group by time.".to_string());
            }
        }
    }

    if state.limit.is_some_and(|limit| limit < 1) {
        errors.push("LIMIT must be a positive integer.".to_string());
    }

    errors
}

fn check_select_fields(
    fields: &[SelectField],
    model: Option<&AssetModel>,
    errors: &mut Vec<String>,
) {
    let selected: Vec<&SelectField> = fields.iter().filter(|f| !f.column.is_empty()).collect();
    if selected.is_empty() {
        errors.push("Select at least one column.".to_string());
        return;
    }

    for field in selected {
        let column = field.column.as_str();
        if let Some(model) = model {
            if !model.has_column(column) {
                errors.push(format!(
                    "Column '{column}' does not exist on asset model '{}'.",
                    model.id
                ));
            }
        }

        let function = field.aggregation.as_deref();
        match FunctionKind::of(function) {
            FunctionKind::Cast if field.function_arg.as_deref().map_or(true, str::is_empty) => {
                errors.push(format!("CAST on '{column}' requires a target type."));
            }
            FunctionKind::Date => {
                let offset = field.function_arg_value.as_deref().unwrap_or_default().trim();
                if !offset.is_empty() && offset.parse::<i64>().is_err() {
                    errors.push(format!(
                        "{} on '{column}' requires a numeric interval value.",
                        function.unwrap_or_default().trim()
                    ));
                }
            }
            _ => {}
        }
    }
}
