use serde_json::Value;
use std::cmp::Ordering;

/// Column filter, rendered as a PostgREST operator (`col=eq.value`)
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    Eq(String, String),
    Neq(String, String),
    Gt(String, String),
    Lt(String, String),
    In(String, Vec<String>),
}

impl Filter {
    pub fn eq(column: impl Into<String>, value: impl ToString) -> Self {
        Self::Eq(column.into(), value.to_string())
    }

    pub fn neq(column: impl Into<String>, value: impl ToString) -> Self {
        Self::Neq(column.into(), value.to_string())
    }

    pub fn gt(column: impl Into<String>, value: impl ToString) -> Self {
        Self::Gt(column.into(), value.to_string())
    }

    pub fn lt(column: impl Into<String>, value: impl ToString) -> Self {
        Self::Lt(column.into(), value.to_string())
    }

    pub fn in_list<I, S>(column: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: ToString,
    {
        Self::In(column.into(), values.into_iter().map(|v| v.to_string()).collect())
    }

    pub fn column(&self) -> &str {
        match self {
            Self::Eq(c, _) | Self::Neq(c, _) | Self::Gt(c, _) | Self::Lt(c, _) | Self::In(c, _) => c,
        }
    }

    /// Query-string value, e.g. `eq.general` or `in.(a,b)`
    pub fn operand(&self) -> String {
        match self {
            Self::Eq(_, v) => format!("eq.{}", v),
            Self::Neq(_, v) => format!("neq.{}", v),
            Self::Gt(_, v) => format!("gt.{}", v),
            Self::Lt(_, v) => format!("lt.{}", v),
            Self::In(_, vs) => format!("in.({})", vs.join(",")),
        }
    }

    /// Evaluate the filter against a JSON row
    pub fn matches(&self, row: &Value) -> bool {
        let actual = row.get(self.column()).map(scalar_text);
        let actual = match actual {
            Some(a) => a,
            None => return false,
        };
        match self {
            Self::Eq(_, v) => &actual == v,
            Self::Neq(_, v) => &actual != v,
            Self::Gt(_, v) => compare_text(&actual, v) == Ordering::Greater,
            Self::Lt(_, v) => compare_text(&actual, v) == Ordering::Less,
            Self::In(_, vs) => vs.iter().any(|v| v == &actual),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Order {
    pub column: String,
    pub ascending: bool,
}

/// Read query against one table
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    pub columns: String,
    pub filters: Vec<Filter>,
    pub order: Option<Order>,
    pub limit: Option<usize>,
}

impl Default for Query {
    fn default() -> Self {
        Self {
            columns: "*".to_string(),
            filters: Vec::new(),
            order: None,
            limit: None,
        }
    }
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn columns(mut self, columns: impl Into<String>) -> Self {
        self.columns = columns.into();
        self
    }

    pub fn filter(mut self, filter: Filter) -> Self {
        self.filters.push(filter);
        self
    }

    pub fn eq(self, column: impl Into<String>, value: impl ToString) -> Self {
        self.filter(Filter::eq(column, value))
    }

    pub fn in_list<I, S>(self, column: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: ToString,
    {
        self.filter(Filter::in_list(column, values))
    }

    pub fn order_asc(mut self, column: impl Into<String>) -> Self {
        self.order = Some(Order {
            column: column.into(),
            ascending: true,
        });
        self
    }

    pub fn order_desc(mut self, column: impl Into<String>) -> Self {
        self.order = Some(Order {
            column: column.into(),
            ascending: false,
        });
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// PostgREST query-string pairs
    pub fn to_params(&self) -> Vec<(String, String)> {
        let mut params = vec![("select".to_string(), self.columns.clone())];
        params.extend(filter_params(&self.filters));
        if let Some(order) = &self.order {
            let direction = if order.ascending { "asc" } else { "desc" };
            params.push(("order".to_string(), format!("{}.{}", order.column, direction)));
        }
        if let Some(limit) = self.limit {
            params.push(("limit".to_string(), limit.to_string()));
        }
        params
    }

    /// Apply filters, order and limit to in-memory rows
    pub fn apply(&self, rows: impl IntoIterator<Item = Value>) -> Vec<Value> {
        let mut selected: Vec<Value> = rows
            .into_iter()
            .filter(|row| self.filters.iter().all(|f| f.matches(row)))
            .collect();

        if let Some(order) = &self.order {
            selected.sort_by(|a, b| {
                let ordering = compare_values(a.get(&order.column), b.get(&order.column));
                if order.ascending {
                    ordering
                } else {
                    ordering.reverse()
                }
            });
        }
        if let Some(limit) = self.limit {
            selected.truncate(limit);
        }
        selected
    }
}

pub(crate) fn filter_params(filters: &[Filter]) -> Vec<(String, String)> {
    filters
        .iter()
        .map(|f| (f.column().to_string(), f.operand()))
        .collect()
}

/// Text form of a scalar column, matching how filter values are written
pub(crate) fn scalar_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => "null".to_string(),
        other => other.to_string(),
    }
}

fn compare_text(a: &str, b: &str) -> Ordering {
    match (a.parse::<f64>(), b.parse::<f64>()) {
        (Ok(x), Ok(y)) => x.partial_cmp(&y).unwrap_or(Ordering::Equal),
        _ => a.cmp(b),
    }
}

fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(Value::Bool(x)), Some(Value::Bool(y))) => x.cmp(y),
        (Some(x), Some(y)) => compare_text(&scalar_text(x), &scalar_text(y)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_params() {
        let query = Query::new()
            .eq("channel_id", "c1")
            .order_asc("created_at")
            .limit(10);
        assert_eq!(
            query.to_params(),
            vec![
                ("select".to_string(), "*".to_string()),
                ("channel_id".to_string(), "eq.c1".to_string()),
                ("order".to_string(), "created_at.asc".to_string()),
                ("limit".to_string(), "10".to_string()),
            ]
        );
        assert_eq!(Filter::in_list("id", ["a", "b"]).operand(), "in.(a,b)");
    }

    #[test]
    fn test_apply_filters_and_orders() {
        let rows = vec![
            json!({"id": 1, "type": "direct", "rank": 3}),
            json!({"id": 2, "type": "group", "rank": 10}),
            json!({"id": 3, "type": "group", "rank": 2}),
        ];
        let result = Query::new().eq("type", "group").order_desc("rank").apply(rows);
        let ids: Vec<i64> = result.iter().map(|r| r["id"].as_i64().unwrap()).collect();
        assert_eq!(ids, vec![2, 3]);
    }

    #[test]
    fn test_bool_and_number_filters() {
        let row = json!({"is_admin": true, "id": 7});
        assert!(Filter::eq("is_admin", true).matches(&row));
        assert!(Filter::eq("id", 7).matches(&row));
        assert!(Filter::gt("id", 5).matches(&row));
        assert!(!Filter::eq("missing", "x").matches(&row));
    }
}
