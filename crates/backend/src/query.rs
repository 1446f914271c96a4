//! Row filters in the REST query-string dialect (`col=eq.v`, `order=col.desc`).

/// Direction of an `order` clause.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Order {
    Asc,
    Desc,
}

impl Order {
    fn as_str(self) -> &'static str {
        match self {
            Self::Asc => "asc",
            Self::Desc => "desc",
        }
    }
}

/// A select/update/delete target: one table plus optional filters, ordering
/// and limit.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Query {
    table: String,
    filters: Vec<(String, String)>,
    order: Option<(String, Order)>,
    limit: Option<usize>,
}

impl Query {
    pub fn table(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            filters: Vec::new(),
            order: None,
            limit: None,
        }
    }

    pub fn eq(self, column: &str, value: impl ToString) -> Self {
        self.filter(column, "eq", value)
    }

    pub fn gte(self, column: &str, value: impl ToString) -> Self {
        self.filter(column, "gte", value)
    }

    pub fn lte(self, column: &str, value: impl ToString) -> Self {
        self.filter(column, "lte", value)
    }

    pub fn order(mut self, column: &str, order: Order) -> Self {
        self.order = Some((column.to_string(), order));
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    fn filter(mut self, column: &str, op: &str, value: impl ToString) -> Self {
        self.filters
            .push((column.to_string(), format!("{op}.{}", value.to_string())));
        self
    }

    pub fn table_name(&self) -> &str {
        &self.table
    }

    /// `true` when the query has no filter, i.e. it targets the whole table.
    pub fn is_unfiltered(&self) -> bool {
        self.filters.is_empty()
    }

    /// Query-string pairs, filters first, in insertion order.
    pub fn params(&self) -> Vec<(String, String)> {
        let mut params = self.filters.clone();
        if let Some((column, order)) = &self.order {
            params.push(("order".to_string(), format!("{column}.{}", order.as_str())));
        }
        if let Some(limit) = self.limit {
            params.push(("limit".to_string(), limit.to_string()));
        }
        params
    }
}
