//! Embedded catalog of the SiteWise views the builder can query, plus the
//! option lists the clause editors offer.

use once_cell::sync::Lazy;
use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DataType {
    String,
    Integer,
    Double,
    Boolean,
    Timestamp,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetProperty {
    pub id: String,
    pub name: String,
    pub data_type: DataType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AssetModel {
    pub id: String,
    pub name: String,
    pub properties: Vec<AssetProperty>,
}

impl AssetModel {
    pub fn property(&self, id: &str) -> Option<&AssetProperty> {
        self.properties.iter().find(|prop| prop.id == id)
    }

    pub fn has_column(&self, column: &str) -> bool {
        self.properties
            .iter()
            .any(|prop| prop.id == column || prop.name == column)
    }
}

/// Group-by pseudo column that stands for `time(<interval>)`.
pub const TIME_INTERVAL_TAG: &str = "timeInterval";

pub static TIME_INTERVAL_PROPERTY: Lazy<AssetProperty> = Lazy::new(|| AssetProperty {
    id: TIME_INTERVAL_TAG.to_string(),
    name: "Time Interval".to_string(),
    data_type: DataType::String,
    alias: None,
});

static ASSET_MODELS: Lazy<Vec<AssetModel>> = Lazy::new(|| {
    use DataType::*;

    vec![
        model(
            "asset",
            &[
                ("asset_id", Double),
                ("asset_name", String),
                ("asset_description", String),
                ("asset_model_id", String),
                ("parent_asset_id", String),
                ("asset_external_id", String),
                ("asset_model_external_id", String),
            ],
        ),
        model(
            "asset_property",
            &[
                ("asset_id", String),
                ("property_id", String),
                ("property_name", String),
                ("property_alias", String),
                ("property_external_id", String),
                ("asset_composite_model_id", String),
                ("property_type", String),
                ("property_data_type", String),
                ("int_attribute_value", Integer),
                ("double_attribute_value", Double),
                ("boolean_attribute_value", Boolean),
                ("string_attribute_value", String),
            ],
        ),
        model("raw_time_series", TIME_SERIES_COLUMNS),
        model("latest_value_time_series", TIME_SERIES_COLUMNS),
        model(
            "precomputed_aggregates",
            &[
                ("asset_id", String),
                ("property_id", String),
                ("property_alias", String),
                ("event_timestamp", Timestamp),
                ("quality", String),
                ("resolution", String),
                ("sum_value", Double),
                ("count_value", Integer),
                ("average_value", Double),
                ("maximum_value", Double),
                ("minimum_value", Double),
                ("stdev_value", Double),
            ],
        ),
    ]
});

const TIME_SERIES_COLUMNS: &[(&str, DataType)] = &[
    ("property_id", DataType::String),
    ("asset_id", DataType::String),
    ("property_alias", DataType::String),
    ("event_timestamp", DataType::Timestamp),
    ("quality", DataType::String),
    ("boolean_value", DataType::Boolean),
    ("int_value", DataType::Integer),
    ("double_value", DataType::Double),
    ("string_value", DataType::String),
];

fn model(id: &str, columns: &[(&str, DataType)]) -> AssetModel {
    AssetModel {
        id: id.to_string(),
        name: id.to_string(),
        properties: columns
            .iter()
            .map(|(name, data_type)| AssetProperty {
                id: name.to_string(),
                name: name.to_string(),
                data_type: *data_type,
                alias: None,
            })
            .collect(),
    }
}

pub fn asset_models() -> &'static [AssetModel] {
    &ASSET_MODELS
}

pub fn find_model(id: &str) -> Option<&'static AssetModel> {
    ASSET_MODELS.iter().find(|model| model.id == id)
}

pub const WHERE_OPERATORS: &[&str] = &[">", "<", ">=", "<=", "=", "!=", "LIKE", "IN", "BETWEEN"];

pub const HAVING_OPERATORS: &[&str] = &["=", "!=", ">", "<", ">=", "<="];

pub const HAVING_AGGREGATIONS: &[&str] = &["COUNT", "SUM", "AVG", "MAX", "MIN"];

pub const TIME_INTERVALS: &[&str] = &["1s", "10s", "1m", "5m", "10m", "15m", "1h"];

pub const DATE_FUNCTIONS: &[&str] = &["DATE_ADD", "DATE_SUB", "TIMESTAMP_ADD", "TIMESTAMP_SUB"];

const DATE_FUNCTION_ARGS: &[&str] = &["DAY", "MONTH", "YEAR"];

const CAST_FUNCTION_ARGS: &[&str] = &["BOOLEAN", "INTEGER", "INT", "TIMESTAMP"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum FunctionGroup {
    Aggregate,
    String,
    Math,
    DateTime,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct FunctionOption {
    pub group: FunctionGroup,
    pub label: &'static str,
    pub value: &'static str,
}

const fn func(group: FunctionGroup, label: &'static str, value: &'static str) -> FunctionOption {
    FunctionOption {
        group,
        label,
        value,
    }
}

pub const FUNCTIONS: &[FunctionOption] = &[
    func(FunctionGroup::Aggregate, "Raw Values", ""),
    func(FunctionGroup::Aggregate, "AVG", "AVG"),
    func(FunctionGroup::Aggregate, "SUM", "SUM"),
    func(FunctionGroup::Aggregate, "COUNT", "COUNT"),
    func(FunctionGroup::Aggregate, "MAX", "MAX"),
    func(FunctionGroup::Aggregate, "MIN", "MIN"),
    func(FunctionGroup::Aggregate, "STDDEV", "STDDEV"),
    func(FunctionGroup::String, "LENGTH", "LENGTH"),
    func(FunctionGroup::String, "SUBSTR", "SUBSTR"),
    func(FunctionGroup::String, "UPPER", "UPPER"),
    func(FunctionGroup::String, "LOWER", "LOWER"),
    func(FunctionGroup::String, "TRIM", "TRIM"),
    func(FunctionGroup::String, "LTRIM", "LTRIM"),
    func(FunctionGroup::String, "RTRIM", "RTRIM"),
    func(FunctionGroup::Math, "POWER", "POWER"),
    func(FunctionGroup::Math, "ROUND", "ROUND"),
    func(FunctionGroup::Math, "FLOOR", "FLOOR"),
    func(FunctionGroup::DateTime, "NOW", "NOW"),
    func(FunctionGroup::DateTime, "DATE_ADD", "DATE_ADD"),
    func(FunctionGroup::DateTime, "DATE_SUB", "DATE_SUB"),
    func(FunctionGroup::DateTime, "TIMESTAMP_ADD", "TIMESTAMP_ADD"),
    func(FunctionGroup::DateTime, "TIMESTAMP_SUB", "TIMESTAMP_SUB"),
    func(FunctionGroup::DateTime, "CAST", "CAST"),
    func(FunctionGroup::DateTime, "TO_DATE", "TO_DATE"),
    func(FunctionGroup::DateTime, "TO_TIMESTAMP", "TO_TIMESTAMP"),
    func(FunctionGroup::DateTime, "TO_TIME", "TO_TIME"),
];

/// How a select-field function shapes its SQL expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FunctionKind {
    None,
    Date,
    Cast,
    Now,
    Other,
}

impl FunctionKind {
    pub fn of(name: Option<&str>) -> Self {
        match name.map(str::trim) {
            None | Some("") => FunctionKind::None,
            Some("CAST") => FunctionKind::Cast,
            Some("NOW") => FunctionKind::Now,
            Some(other) if DATE_FUNCTIONS.contains(&other) => FunctionKind::Date,
            Some(_) => FunctionKind::Other,
        }
    }
}

/// Argument choices the SELECT editor offers for a function.
pub fn function_args(kind: FunctionKind) -> &'static [&'static str] {
    match kind {
        FunctionKind::Date => DATE_FUNCTION_ARGS,
        FunctionKind::Cast => CAST_FUNCTION_ARGS,
        _ => &[],
    }
}

const TOOLTIP_CLAUSES: &[&str] = &["FROM", "SELECT", "WHERE", "GROUP BY", "ORDER BY", "LIMIT"];

pub fn tooltip(clause: &str) -> Option<&'static str> {
    match clause {
        "FROM" => Some("Select the view to query data from."),
        "SELECT" => Some("Choose the fields or columns you want to retrieve in the result."),
        "WHERE" => Some("Filter rows based on specific conditions."),
        "GROUP BY" => Some("Select one or more columns to group your query by"),
        "ORDER BY" => Some("Sort the result set by one or more columns."),
        "LIMIT" => Some("Restrict the number of records returned by the query."),
        _ => None,
    }
}

/// Everything a client needs to render the clause editors.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogSnapshot {
    pub asset_models: &'static [AssetModel],
    pub where_operators: &'static [&'static str],
    pub having_operators: &'static [&'static str],
    pub having_aggregations: &'static [&'static str],
    pub time_intervals: &'static [&'static str],
    pub functions: &'static [FunctionOption],
    pub date_function_args: &'static [&'static str],
    pub cast_function_args: &'static [&'static str],
    pub tooltips: BTreeMap<&'static str, &'static str>,
}

pub fn snapshot() -> CatalogSnapshot {
    CatalogSnapshot {
        asset_models: asset_models(),
        where_operators: WHERE_OPERATORS,
        having_operators: HAVING_OPERATORS,
        having_aggregations: HAVING_AGGREGATIONS,
        time_intervals: TIME_INTERVALS,
        functions: FUNCTIONS,
        date_function_args: function_args(FunctionKind::Date),
        cast_function_args: function_args(FunctionKind::Cast),
        tooltips: TOOLTIP_CLAUSES
            .iter()
            .filter_map(|clause| tooltip(clause).map(|text| (*clause, text)))
            .collect(),
    }
}
