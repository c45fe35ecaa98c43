//! Renders a [`QueryState`] into the SQL preview shown under the builder.
//!
//! Generation never fails: rows that are missing required pieces are skipped
//! and the remaining clauses are emitted in the fixed order
//! SELECT, FROM, WHERE, GROUP BY, HAVING, ORDER BY, LIMIT.

use super::{
    HavingCondition, LogicalOperator, OrderByField, QueryState, SelectField, WhereCondition,
};
use crate::catalog::{AssetProperty, FunctionKind, TIME_INTERVAL_TAG};

pub const MODEL_PROMPT: &str = "Select an asset model to build your query";

const DEFAULT_DATE_INTERVAL: &str = "1d";
const DEFAULT_DATE_OFFSET: &str = "0";
const VARIABLE_PREFIX: char = '$';
pub(super) const BETWEEN: &str = "BETWEEN";

#[derive(Debug, Clone)]
pub struct GeneratorOptions {
    /// Row limit rendered when the state carries none.
    pub default_limit: i64,
}

impl Default for GeneratorOptions {
    fn default() -> Self {
        Self { default_limit: 100 }
    }
}

pub fn generate_preview(state: &QueryState) -> String {
    generate_preview_with(state, &GeneratorOptions::default())
}

pub fn generate_preview_with(state: &QueryState, options: &GeneratorOptions) -> String {
    let Some(model_id) = state.model_id() else {
        return MODEL_PROMPT.to_string();
    };

    let properties = state
        .selected_model()
        .map(|model| model.properties.as_slice())
        .unwrap_or_default();

    let clauses = [
        Some(select_clause(&state.select_fields, properties)),
        Some(format!("FROM {model_id}")),
        where_clause(&state.where_conditions),
        group_by_clause(&state.group_by_tags, state.time_bucket()),
        having_clause(&state.having_conditions),
        order_by_clause(&state.order_by_fields),
        Some(limit_clause(state.limit, options)),
    ];

    clauses.into_iter().flatten().collect::<Vec<_>>().join("\n")
}

/// Single-quotes a literal unless it references a dashboard variable.
fn quote(value: &str) -> String {
    if value.starts_with(VARIABLE_PREFIX) {
        value.to_string()
    } else {
        format!("'{value}'")
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}

fn select_clause(fields: &[SelectField], properties: &[AssetProperty]) -> String {
    let parts: Vec<String> = fields
        .iter()
        .filter(|field| !field.column.is_empty())
        .map(|field| select_expr(field, properties))
        .collect();

    if parts.is_empty() {
        "SELECT *".to_string()
    } else {
        format!("SELECT {}", parts.join(", "))
    }
}

fn select_expr(field: &SelectField, properties: &[AssetProperty]) -> String {
    let base = properties
        .iter()
        .find(|prop| prop.id == field.column)
        .map(|prop| prop.name.as_str())
        .filter(|name| !name.is_empty())
        .unwrap_or(field.column.as_str());

    let function = non_empty(field.aggregation.as_deref());
    let arg = non_empty(field.function_arg.as_deref());

    let mut expr = match (FunctionKind::of(function), function, arg) {
        (FunctionKind::Date, Some(name), _) => {
            let interval = arg.unwrap_or(DEFAULT_DATE_INTERVAL);
            let offset =
                non_empty(field.function_arg_value.as_deref()).unwrap_or(DEFAULT_DATE_OFFSET);
            format!("{name}({interval}, {offset}, {base})")
        }
        (FunctionKind::Cast, _, Some(target)) => format!("CAST({base} AS {target})"),
        (FunctionKind::Now, _, _) => "NOW()".to_string(),
        (_, Some(name), _) => format!("{name}({base})"),
        (_, None, _) => base.to_string(),
    };

    if let Some(alias) = non_empty(field.alias.as_deref()) {
        expr.push_str(&format!(" AS \"{alias}\""));
    }

    expr
}

fn where_clause(conditions: &[WhereCondition]) -> Option<String> {
    let rows: Vec<&WhereCondition> = conditions
        .iter()
        .filter(|c| !c.column.is_empty() && !c.operator.trim().is_empty())
        .collect();

    if rows.is_empty() {
        return None;
    }

    let mut sql = String::from("WHERE ");
    for (idx, condition) in rows.iter().enumerate() {
        sql.push_str(&where_predicate(condition));
        if idx + 1 < rows.len() {
            sql.push(' ');
            sql.push_str(condition.logical_operator.unwrap_or_default().as_str());
            sql.push(' ');
        }
    }
    Some(sql)
}

fn where_predicate(condition: &WhereCondition) -> String {
    let column = &condition.column;
    let operator = &condition.operator;
    let lower = quote(&condition.value);

    match non_empty(condition.value2.as_deref()) {
        Some(upper) if operator == BETWEEN => {
            let joiner = non_empty(condition.operator2.as_deref())
                .unwrap_or(LogicalOperator::And.as_str());
            format!("{column} {operator} {lower} {joiner} {}", quote(upper))
        }
        _ => format!("{column} {operator} {lower}"),
    }
}

fn group_by_clause(tags: &[String], time_bucket: Option<&str>) -> Option<String> {
    let mut parts: Vec<String> = tags
        .iter()
        // timeInterval only switches time grouping on; the bucket renders as time(..)
        .filter(|tag| !tag.is_empty() && tag.as_str() != TIME_INTERVAL_TAG)
        .cloned()
        .collect();

    if let Some(interval) = time_bucket {
        parts.push(format!("time({interval})"));
    }

    if parts.is_empty() {
        None
    } else {
        Some(format!("GROUP BY {}", parts.join(", ")))
    }
}

fn having_clause(conditions: &[HavingCondition]) -> Option<String> {
    let rows: Vec<&HavingCondition> = conditions
        .iter()
        .filter(|c| {
            !c.column.trim().is_empty()
                && !c.aggregation.trim().is_empty()
                && !c.operator.trim().is_empty()
        })
        .collect();

    if rows.is_empty() {
        return None;
    }

    let mut sql = String::from("HAVING ");
    for (idx, condition) in rows.iter().enumerate() {
        if idx > 0 {
            let connector = rows[idx - 1].logical_operator.unwrap_or_default();
            sql.push(' ');
            sql.push_str(connector.as_str());
            sql.push(' ');
        }
        sql.push_str(&format!(
            "{}({}) {} {}",
            condition.aggregation,
            condition.column,
            condition.operator,
            quote(&condition.value)
        ));
    }
    Some(sql)
}

fn order_by_clause(fields: &[OrderByField]) -> Option<String> {
    let parts: Vec<String> = fields
        .iter()
        .filter(|field| !field.column.is_empty())
        .map(|field| format!("{} {}", field.column, field.direction.as_str()))
        .collect();

    if parts.is_empty() {
        None
    } else {
        Some(format!("ORDER BY {}", parts.join(", ")))
    }
}

fn limit_clause(limit: Option<i64>, options: &GeneratorOptions) -> String {
    format!("LIMIT {}", limit.unwrap_or(options.default_limit))
}
