//! Relational query builder.
//!
//! A [`Select`] names a root collection, the columns to project (optionally
//! renamed), nested relations, equality filters and a row limit. It renders
//! to a single PostgreSQL statement that yields one JSON object per root
//! row, with nested relations embedded as arrays (to-many) or objects
//! (to-one).
//!
//! ```ignore
//! let select = Select::from("world_calendars")
//!     .column("id")
//!     .relation(Relation::many("months", "calendar_months", "calendar_id"))
//!     .eq("world_id", 1)
//!     .limit(1);
//! ```

/// A value bound to an equality filter.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterValue {
    Int(i64),
    Text(String),
    Bool(bool),
}

impl From<i64> for FilterValue {
    fn from(value: i64) -> Self {
        FilterValue::Int(value)
    }
}

impl From<i32> for FilterValue {
    fn from(value: i32) -> Self {
        FilterValue::Int(i64::from(value))
    }
}

impl From<&str> for FilterValue {
    fn from(value: &str) -> Self {
        FilterValue::Text(value.to_string())
    }
}

impl From<String> for FilterValue {
    fn from(value: String) -> Self {
        FilterValue::Text(value)
    }
}

impl From<bool> for FilterValue {
    fn from(value: bool) -> Self {
        FilterValue::Bool(value)
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Field {
    Column { alias: String, column: String },
    Relation(Relation),
}

#[derive(Debug, Clone, Default, PartialEq)]
struct Projection {
    all_columns: bool,
    fields: Vec<Field>,
}

impl Projection {
    fn has_columns(&self) -> bool {
        self.fields
            .iter()
            .any(|f| matches!(f, Field::Column { .. }))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Cardinality {
    Many,
    One,
}

/// A nested collection embedded in its parent's object.
#[derive(Debug, Clone, PartialEq)]
pub struct Relation {
    alias: String,
    table: String,
    foreign_key: String,
    key: String,
    cardinality: Cardinality,
    projection: Projection,
}

impl Relation {
    /// Rows of `table` whose `foreign_key` points at the parent, as an array.
    pub fn many(alias: &str, table: &str, foreign_key: &str) -> Self {
        Self::new(alias, table, foreign_key, Cardinality::Many)
    }

    /// The row of `table` the parent's `foreign_key` points at, or null.
    pub fn one(alias: &str, table: &str, foreign_key: &str) -> Self {
        Self::new(alias, table, foreign_key, Cardinality::One)
    }

    fn new(alias: &str, table: &str, foreign_key: &str, cardinality: Cardinality) -> Self {
        Self {
            alias: alias.to_string(),
            table: table.to_string(),
            foreign_key: foreign_key.to_string(),
            key: "id".to_string(),
            cardinality,
            projection: Projection::default(),
        }
    }

    /// Key column the foreign key refers to (defaults to `id`).
    pub fn references(mut self, key: &str) -> Self {
        self.key = key.to_string();
        self
    }

    pub fn column(self, column: &str) -> Self {
        self.column_as(column, column)
    }

    pub fn column_as(mut self, alias: &str, column: &str) -> Self {
        self.projection.fields.push(Field::Column {
            alias: alias.to_string(),
            column: column.to_string(),
        });
        self
    }

    pub fn all_columns(mut self) -> Self {
        self.projection.all_columns = true;
        self
    }

    pub fn relation(mut self, relation: Relation) -> Self {
        self.projection.fields.push(Field::Relation(relation));
        self
    }
}

/// A rendered statement and its bind parameters, in `$n` order.
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub sql: String,
    pub params: Vec<FilterValue>,
}

/// A read against one root collection.
#[derive(Debug, Clone, PartialEq)]
pub struct Select {
    table: String,
    projection: Projection,
    filters: Vec<(String, FilterValue)>,
    limit: Option<u64>,
}

impl Select {
    pub fn from(table: &str) -> Self {
        Self {
            table: table.to_string(),
            projection: Projection::default(),
            filters: Vec::new(),
            limit: None,
        }
    }

    pub fn column(self, column: &str) -> Self {
        self.column_as(column, column)
    }

    pub fn column_as(mut self, alias: &str, column: &str) -> Self {
        self.projection.fields.push(Field::Column {
            alias: alias.to_string(),
            column: column.to_string(),
        });
        self
    }

    pub fn all_columns(mut self) -> Self {
        self.projection.all_columns = true;
        self
    }

    pub fn relation(mut self, relation: Relation) -> Self {
        self.projection.fields.push(Field::Relation(relation));
        self
    }

    /// Keep only rows where `column` equals `value`.
    pub fn eq(mut self, column: &str, value: impl Into<FilterValue>) -> Self {
        self.filters.push((column.to_string(), value.into()));
        self
    }

    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn filters(&self) -> &[(String, FilterValue)] {
        &self.filters
    }

    /// Value of the first equality filter on `column`.
    pub fn filter(&self, column: &str) -> Option<&FilterValue> {
        self.filters
            .iter()
            .find(|(c, _)| c == column)
            .map(|(_, v)| v)
    }

    pub fn row_limit(&self) -> Option<u64> {
        self.limit
    }

    pub fn to_statement(&self) -> Statement {
        let mut renderer = Renderer::default();
        let root = renderer.next_alias();
        let object = renderer.object(&self.projection, &root);

        let mut sql = format!(
            "SELECT {} AS \"row\" FROM {} {}",
            object,
            quote_ident(&self.table),
            root
        );

        let mut params = Vec::with_capacity(self.filters.len());
        for (i, (column, value)) in self.filters.iter().enumerate() {
            sql.push_str(if i == 0 { " WHERE " } else { " AND " });
            params.push(value.clone());
            sql.push_str(&format!(
                "{}.{} = ${}",
                root,
                quote_ident(column),
                params.len()
            ));
        }

        if let Some(limit) = self.limit {
            sql.push_str(&format!(" LIMIT {}", limit));
        }

        Statement { sql, params }
    }
}

#[derive(Default)]
struct Renderer {
    aliases: usize,
}

impl Renderer {
    fn next_alias(&mut self) -> String {
        let alias = format!("t{}", self.aliases);
        self.aliases += 1;
        alias
    }

    /// JSON object expression for one row of `alias`.
    fn object(&mut self, projection: &Projection, alias: &str) -> String {
        let whole_row = projection.all_columns || !projection.has_columns();

        let mut pairs = Vec::new();
        for field in &projection.fields {
            match field {
                Field::Column { alias: key, column } if !whole_row => pairs.push(format!(
                    "{}, {}.{}",
                    quote_literal(key),
                    alias,
                    quote_ident(column)
                )),
                Field::Column { .. } => {}
                Field::Relation(relation) => {
                    let nested = self.relation(relation, alias);
                    pairs.push(format!("{}, {}", quote_literal(&relation.alias), nested));
                }
            }
        }

        match (whole_row, pairs.is_empty()) {
            (true, true) => format!("to_json({})", alias),
            (true, false) => format!(
                "(to_jsonb({}) || jsonb_build_object({}))::json",
                alias,
                pairs.join(", ")
            ),
            (false, _) => format!("json_build_object({})", pairs.join(", ")),
        }
    }

    fn relation(&mut self, relation: &Relation, parent: &str) -> String {
        let alias = self.next_alias();
        let object = self.object(&relation.projection, &alias);
        let table = quote_ident(&relation.table);

        match relation.cardinality {
            Cardinality::Many => format!(
                "COALESCE((SELECT json_agg({}) FROM {} {} WHERE {}.{} = {}.{}), '[]'::json)",
                object,
                table,
                alias,
                alias,
                quote_ident(&relation.foreign_key),
                parent,
                quote_ident(&relation.key)
            ),
            Cardinality::One => format!(
                "(SELECT {} FROM {} {} WHERE {}.{} = {}.{} LIMIT 1)",
                object,
                table,
                alias,
                alias,
                quote_ident(&relation.key),
                parent,
                quote_ident(&relation.foreign_key)
            ),
        }
    }
}

fn quote_ident(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}

fn quote_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_root_with_many_relation() {
        let statement = Select::from("world_calendars")
            .column("id")
            .relation(Relation::many("months", "calendar_months", "calendar_id"))
            .eq("world_id", 7)
            .limit(1)
            .to_statement();

        assert_eq!(
            statement.sql,
            "SELECT json_build_object('id', t0.\"id\", 'months', \
             COALESCE((SELECT json_agg(to_json(t1)) FROM \"calendar_months\" t1 \
             WHERE t1.\"calendar_id\" = t0.\"id\"), '[]'::json)) AS \"row\" \
             FROM \"world_calendars\" t0 WHERE t0.\"world_id\" = $1 LIMIT 1"
        );
        assert_eq!(statement.params, vec![FilterValue::Int(7)]);
    }

    #[test]
    fn test_one_relation_joins_on_parent_foreign_key() {
        let statement = Select::from("calendar_events")
            .column_as("startDate", "start_date")
            .relation(Relation::one("category", "calendar_events_category", "category_id"))
            .to_statement();

        assert_eq!(
            statement.sql,
            "SELECT json_build_object('startDate', t0.\"start_date\", 'category', \
             (SELECT to_json(t1) FROM \"calendar_events_category\" t1 \
             WHERE t1.\"id\" = t0.\"category_id\" LIMIT 1)) AS \"row\" \
             FROM \"calendar_events\" t0"
        );
        assert!(statement.params.is_empty());
    }

    #[test]
    fn test_all_columns_with_relation_merges_objects() {
        let statement = Select::from("worlds")
            .all_columns()
            .relation(Relation::many("calendars", "world_calendars", "world_id"))
            .to_statement();

        assert!(statement
            .sql
            .starts_with("SELECT (to_jsonb(t0) || jsonb_build_object('calendars', "));
    }

    #[test]
    fn test_filters_are_bound_in_order() {
        let statement = Select::from("calendar_events")
            .eq("calendar_id", 3)
            .eq("hidden", false)
            .eq("title", "Harvest Moon")
            .to_statement();

        assert!(statement
            .sql
            .ends_with("WHERE t0.\"calendar_id\" = $1 AND t0.\"hidden\" = $2 AND t0.\"title\" = $3"));
        assert_eq!(
            statement.params,
            vec![
                FilterValue::Int(3),
                FilterValue::Bool(false),
                FilterValue::Text("Harvest Moon".to_string()),
            ]
        );
    }

    #[test]
    fn test_identifiers_and_keys_are_escaped() {
        let statement = Select::from("odd\"table")
            .column_as("it's", "col")
            .to_statement();

        assert!(statement.sql.contains("FROM \"odd\"\"table\" t0"));
        assert!(statement.sql.contains("'it''s', t0.\"col\""));
    }

    #[test]
    fn test_filter_lookup() {
        let select = Select::from("world_calendars").eq("world_id", 42).limit(1);
        assert_eq!(select.filter("world_id"), Some(&FilterValue::Int(42)));
        assert_eq!(select.filter("id"), None);
        assert_eq!(select.row_limit(), Some(1));
        assert_eq!(select.table(), "world_calendars");
    }
}
