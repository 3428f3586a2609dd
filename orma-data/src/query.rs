use std::marker::PhantomData;

use crate::database::Database;
use crate::dialect::Dialect;
use crate::entity::Entity;
use crate::error::DataError;
use crate::page::{Page, Pager};
use crate::params::Params;
use crate::value::{ToValue, Value};

/// A fluent query builder bound to one base entity.
///
/// Clauses render in the order
/// `SELECT <fields> FROM <table> <joins> <wheres> <groupbys> [ORDER BY] [LIMIT]`,
/// each clause keeping call order.
///
/// # Example
///
/// ```ignore
/// let mut q = QueryBuilder::<Widget>::select()
///     .join::<Gadget>()
///     .filter_eq("mess", "x")
///     .filter("`a_date` > ?")
///     .bind(1_700_000_000i64)
///     .order_by("`a_date` DESC")
///     .pager(Pager::new(0, 20))?;
/// let widgets = q.fetch_all(&mut db).await?;
/// ```
pub struct QueryBuilder<E> {
    kind: QueryKind,
    joins: Vec<Join>,
    conditions: Vec<Condition>,
    values: Vec<Value>,
    order: Vec<String>,
    group: Vec<String>,
    fields: Option<String>,
    limit_val: Option<u64>,
    pager: Option<Pager>,
    _entity: PhantomData<fn() -> E>,
}

/// Statement type a builder produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryKind {
    Select,
    Delete,
}

#[derive(Debug, Clone)]
struct Join {
    table: &'static str,
    other_column: String,
    base_column: String,
}

#[derive(Debug, Clone)]
enum Condition {
    Raw(String),
    Eq(String),
    NotEq(String),
    Like(String),
    Gt(String),
    Lt(String),
    In(String, usize),
    IsNull(String),
    IsNotNull(String),
}

fn qualify(dialect: Dialect, table: &str, column: &str) -> String {
    if column.contains('.') {
        dialect.quote(column)
    } else {
        format!("{}.{}", dialect.quote(table), dialect.quote(column))
    }
}

impl<E: Entity + Default> QueryBuilder<E> {
    fn with_kind(kind: QueryKind) -> Self {
        Self {
            kind,
            joins: Vec::new(),
            conditions: Vec::new(),
            values: Vec::new(),
            order: Vec::new(),
            group: Vec::new(),
            fields: None,
            limit_val: None,
            pager: None,
            _entity: PhantomData,
        }
    }

    pub fn select() -> Self {
        Self::with_kind(QueryKind::Select)
    }

    pub fn delete() -> Self {
        Self::with_kind(QueryKind::Delete)
    }

    pub fn kind(&self) -> QueryKind {
        self.kind
    }

    /// `INNER JOIN` equating `O`'s key with the base entity's key.
    pub fn join<O: Entity>(self) -> Self {
        let key = O::schema().key;
        self.join_on::<O>(key, E::schema().key)
    }

    /// `INNER JOIN` equating `O.other_column` with `base.base_column`.
    /// Columns containing a `.` are taken as already qualified.
    pub fn join_on<O: Entity>(mut self, other_column: &str, base_column: &str) -> Self {
        self.joins.push(Join {
            table: O::schema().table,
            other_column: other_column.to_string(),
            base_column: base_column.to_string(),
        });
        self
    }

    /// Raw condition fragment, ANDed with the others. Use `?` for values
    /// and supply them with [`QueryBuilder::bind`] in the same order.
    pub fn filter(mut self, fragment: &str) -> Self {
        self.conditions.push(Condition::Raw(fragment.to_string()));
        self
    }

    /// Bind the next positional value.
    pub fn bind(mut self, value: impl ToValue) -> Self {
        self.values.push(value.to_value());
        self
    }

    pub fn filter_eq(mut self, column: &str, value: impl ToValue) -> Self {
        self.conditions.push(Condition::Eq(column.to_string()));
        self.values.push(value.to_value());
        self
    }

    pub fn filter_not_eq(mut self, column: &str, value: impl ToValue) -> Self {
        self.conditions.push(Condition::NotEq(column.to_string()));
        self.values.push(value.to_value());
        self
    }

    pub fn filter_like(mut self, column: &str, pattern: &str) -> Self {
        self.conditions.push(Condition::Like(column.to_string()));
        self.values.push(Value::Text(pattern.to_string()));
        self
    }

    pub fn filter_gt(mut self, column: &str, value: impl ToValue) -> Self {
        self.conditions.push(Condition::Gt(column.to_string()));
        self.values.push(value.to_value());
        self
    }

    pub fn filter_lt(mut self, column: &str, value: impl ToValue) -> Self {
        self.conditions.push(Condition::Lt(column.to_string()));
        self.values.push(value.to_value());
        self
    }

    pub fn filter_in<V: ToValue>(mut self, column: &str, values: &[V]) -> Self {
        self.conditions
            .push(Condition::In(column.to_string(), values.len()));
        self.values.extend(values.iter().map(ToValue::to_value));
        self
    }

    pub fn filter_null(mut self, column: &str) -> Self {
        self.conditions.push(Condition::IsNull(column.to_string()));
        self
    }

    pub fn filter_not_null(mut self, column: &str) -> Self {
        self.conditions
            .push(Condition::IsNotNull(column.to_string()));
        self
    }

    pub fn order_by(mut self, field: &str) -> Self {
        self.order.push(field.to_string());
        self
    }

    pub fn group_by(mut self, field: &str) -> Self {
        self.group.push(field.to_string());
        self
    }

    /// Override the default projection.
    pub fn fields(mut self, sql: &str) -> Result<Self, DataError> {
        if self.kind != QueryKind::Select {
            return Err(DataError::InvalidArgument(
                "fields can only be set on a SELECT query".into(),
            ));
        }
        if self.pager.is_some() {
            return Err(DataError::InvalidArgument(
                "fields cannot be combined with a pager".into(),
            ));
        }
        self.fields = Some(sql.to_string());
        Ok(self)
    }

    pub fn limit(mut self, limit: u64) -> Result<Self, DataError> {
        if self.pager.is_some() {
            return Err(DataError::InvalidArgument(
                "limit cannot be combined with a pager".into(),
            ));
        }
        self.limit_val = Some(limit);
        Ok(self)
    }

    /// Attach a pager. The total is counted on first stringification unless
    /// the pager already carries one.
    pub fn pager(mut self, pager: Pager) -> Result<Self, DataError> {
        if self.kind != QueryKind::Select {
            return Err(DataError::InvalidArgument(
                "a pager can only be attached to a SELECT query".into(),
            ));
        }
        if self.limit_val.is_some() {
            return Err(DataError::InvalidArgument(
                "a pager cannot be combined with an explicit limit".into(),
            ));
        }
        if self.fields.is_some() {
            return Err(DataError::InvalidArgument(
                "a pager cannot be combined with custom fields".into(),
            ));
        }
        self.pager = Some(pager);
        Ok(self)
    }

    pub fn pager_state(&self) -> Option<&Pager> {
        self.pager.as_ref()
    }

    /// Positional values in the order their markers appear.
    pub fn params(&self) -> Params {
        if self.values.is_empty() {
            Params::None
        } else {
            Params::Positional(self.values.clone())
        }
    }

    /// Render the statement, counting the pager total first if unknown.
    pub async fn to_sql(&mut self, db: &mut Database) -> Result<String, DataError> {
        if self.pager.as_ref().is_some_and(|p| p.total().is_none()) {
            let total = self.count(db).await?;
            if let Some(pager) = self.pager.as_mut() {
                pager.set_total(total);
            }
        }
        let descriptor = db.descriptor::<E>().await?;
        let schema = E::schema();
        self.render(db.dialect(), || {
            let key = qualify(descriptor.dialect(), schema.table, schema.key);
            let read = descriptor.read_columns();
            if read.is_empty() {
                key
            } else {
                format!(
                    "{key}, {}",
                    descriptor.columns_sql(Some(&read), Some(schema.table), ", ")
                )
            }
        })
    }

    fn render(
        &self,
        dialect: Dialect,
        default_fields: impl FnOnce() -> String,
    ) -> Result<String, DataError> {
        let table = E::schema().table;
        let mut sql = match self.kind {
            QueryKind::Select => {
                let fields = match &self.fields {
                    Some(f) => f.clone(),
                    None => default_fields(),
                };
                format!("SELECT {fields} FROM {}", dialect.quote(table))
            }
            QueryKind::Delete if self.joins.is_empty() => {
                format!("DELETE FROM {}", dialect.quote(table))
            }
            QueryKind::Delete => match dialect {
                Dialect::MySql => {
                    format!("DELETE {0} FROM {0}", dialect.quote(table))
                }
                Dialect::Sqlite => {
                    return Err(DataError::InvalidArgument(
                        "SQLite cannot DELETE with joins".into(),
                    ))
                }
            },
        };
        self.append_body(&mut sql, dialect);
        if !self.order.is_empty() {
            sql.push_str(" ORDER BY ");
            sql.push_str(&self.order.join(", "));
        }
        if let Some(pager) = &self.pager {
            sql.push_str(&pager.limit_sql());
        } else if let Some(limit) = self.limit_val {
            sql.push_str(&dialect.limit_sql(limit, 0));
        }
        Ok(sql)
    }

    /// Joins, conditions and grouping: everything shared with the count query.
    fn append_body(&self, sql: &mut String, dialect: Dialect) {
        let table = E::schema().table;
        for join in &self.joins {
            sql.push_str(&format!(
                " INNER JOIN {} ON {} = {}",
                dialect.quote(join.table),
                qualify(dialect, join.table, &join.other_column),
                qualify(dialect, table, &join.base_column),
            ));
        }
        for (idx, cond) in self.conditions.iter().enumerate() {
            sql.push_str(if idx == 0 { " WHERE " } else { " AND " });
            let clause = match cond {
                Condition::Raw(fragment) => fragment.clone(),
                Condition::Eq(col) => format!("{} = ?", dialect.quote(col)),
                Condition::NotEq(col) => format!("{} != ?", dialect.quote(col)),
                Condition::Like(col) => format!("{} LIKE ?", dialect.quote(col)),
                Condition::Gt(col) => format!("{} > ?", dialect.quote(col)),
                Condition::Lt(col) => format!("{} < ?", dialect.quote(col)),
                Condition::In(col, 0) => format!("{} IN (NULL)", dialect.quote(col)),
                Condition::In(col, n) => {
                    format!("{} IN ({})", dialect.quote(col), vec!["?"; *n].join(", "))
                }
                Condition::IsNull(col) => format!("{} IS NULL", dialect.quote(col)),
                Condition::IsNotNull(col) => format!("{} IS NOT NULL", dialect.quote(col)),
            };
            sql.push_str(&clause);
        }
        if !self.group.is_empty() {
            sql.push_str(" GROUP BY ");
            sql.push_str(&self.group.join(", "));
        }
    }

    fn render_count(&self, dialect: Dialect) -> String {
        let table = dialect.quote(E::schema().table);
        if self.group.is_empty() {
            let mut sql = format!("SELECT COUNT(*) FROM {table}");
            self.append_body(&mut sql, dialect);
            sql
        } else {
            let mut inner = format!("SELECT 1 FROM {table}");
            self.append_body(&mut inner, dialect);
            format!("SELECT COUNT(*) FROM ({inner}) AS counted")
        }
    }

    /// Rows matched by the joins, conditions and grouping, ignoring limits.
    pub async fn count(&self, db: &mut Database) -> Result<u64, DataError> {
        let sql = self.render_count(db.dialect());
        let label = format!("{}::count", E::schema().table);
        db.query_with(&sql, self.params(), &label)
            .await?
            .scalar()
            .and_then(|v| v.as_i64())
            .and_then(|n| u64::try_from(n).ok())
            .ok_or_else(|| DataError::conversion(label.as_str(), "row count"))
    }

    /// Run the SELECT and hydrate every row.
    pub async fn fetch_all(&mut self, db: &mut Database) -> Result<Vec<E>, DataError> {
        let sql = self.to_sql(db).await?;
        let label = format!("{}::query", E::schema().table);
        let mut cursor = db.query_with(&sql, self.params(), &label).await?;
        let mut out = Vec::with_capacity(cursor.remaining());
        while let Some(entity) = cursor.next_object::<E>()? {
            out.push(entity);
        }
        Ok(out)
    }

    /// Run the paged SELECT and wrap the results with pager metadata.
    pub async fn fetch_page(&mut self, db: &mut Database) -> Result<Page<E>, DataError> {
        let content = self.fetch_all(db).await?;
        let pager = self.pager.clone().unwrap_or_else(|| {
            let mut whole = Pager::new(0, content.len() as u64);
            whole.set_total(content.len() as u64);
            whole
        });
        Ok(pager.page_of(content))
    }

    /// Run a DELETE and return the affected row count.
    pub async fn execute(&mut self, db: &mut Database) -> Result<u64, DataError> {
        if self.kind != QueryKind::Delete {
            return Err(DataError::InvalidArgument(
                "execute runs DELETE queries; use fetch_all for SELECT".into(),
            ));
        }
        let sql = self.to_sql(db).await?;
        let label = format!("{}::delete", E::schema().table);
        let cursor = db.query_with(&sql, self.params(), &label).await?;
        Ok(cursor.rows_affected())
    }
}

impl<E> std::fmt::Debug for QueryBuilder<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryBuilder")
            .field("kind", &self.kind)
            .field("joins", &self.joins)
            .field("conditions", &self.conditions)
            .field("values", &self.values)
            .field("pager", &self.pager)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::EntitySchema;

    #[derive(Default)]
    struct User {
        id: i64,
    }

    #[derive(Default)]
    struct Profile {
        id: i64,
    }

    static USER: EntitySchema = EntitySchema {
        table: "user",
        key: "user_id",
        properties: &["name"],
        manual: &[],
        queries: &[],
    };

    static PROFILE: EntitySchema = EntitySchema {
        table: "profile",
        key: "profile_id",
        properties: &[],
        manual: &[],
        queries: &[],
    };

    macro_rules! keyed_entity {
        ($ty:ty, $schema:ident) => {
            impl Entity for $ty {
                fn schema() -> &'static EntitySchema {
                    &$schema
                }
                fn id(&self) -> i64 {
                    self.id
                }
                fn set_id(&mut self, id: i64) {
                    self.id = id;
                }
                fn property(&self, _name: &str) -> Option<Value> {
                    None
                }
                fn set_property(&mut self, _name: &str, _value: Value) -> Result<(), DataError> {
                    Ok(())
                }
            }
        };
    }

    keyed_entity!(User, USER);
    keyed_entity!(Profile, PROFILE);

    fn star() -> String {
        "*".to_string()
    }

    #[test]
    fn test_simple_select() {
        let sql = QueryBuilder::<User>::select()
            .render(Dialect::MySql, star)
            .unwrap();
        assert_eq!(sql, "SELECT * FROM `user`");
    }

    #[test]
    fn test_clause_order() {
        let q = QueryBuilder::<User>::select()
            .order_by("`name`")
            .filter_eq("name", "alice")
            .group_by("`name`")
            .join::<Profile>()
            .filter("`age` > ?")
            .bind(30i64)
            .order_by("`user_id` DESC");
        let sql = q.render(Dialect::MySql, star).unwrap();
        assert_eq!(
            sql,
            "SELECT * FROM `user` INNER JOIN `profile` ON `profile`.`profile_id` = `user`.`user_id` \
             WHERE `name` = ? AND `age` > ? GROUP BY `name` ORDER BY `name`, `user_id` DESC"
        );
        assert_eq!(
            q.params(),
            Params::Positional(vec![Value::Text("alice".into()), Value::Int(30)])
        );
    }

    #[test]
    fn test_explicit_join_columns() {
        let sql = QueryBuilder::<User>::select()
            .join_on::<Profile>("owner_id", "user_id")
            .render(Dialect::MySql, star)
            .unwrap();
        assert_eq!(
            sql,
            "SELECT * FROM `user` INNER JOIN `profile` ON `profile`.`owner_id` = `user`.`user_id`"
        );
    }

    #[test]
    fn test_fields_and_limit() {
        let sql = QueryBuilder::<User>::select()
            .fields("COUNT(*) AS n")
            .unwrap()
            .limit(5)
            .unwrap()
            .render(Dialect::MySql, star)
            .unwrap();
        assert_eq!(sql, "SELECT COUNT(*) AS n FROM `user` LIMIT 5");
    }

    #[test]
    fn test_illegal_combinations() {
        assert!(matches!(
            QueryBuilder::<User>::delete().fields("x"),
            Err(DataError::InvalidArgument(_))
        ));
        assert!(matches!(
            QueryBuilder::<User>::delete().pager(Pager::new(0, 10)),
            Err(DataError::InvalidArgument(_))
        ));
        assert!(matches!(
            QueryBuilder::<User>::select()
                .limit(3)
                .unwrap()
                .pager(Pager::new(0, 10)),
            Err(DataError::InvalidArgument(_))
        ));
        assert!(matches!(
            QueryBuilder::<User>::select()
                .pager(Pager::new(0, 10))
                .unwrap()
                .limit(3),
            Err(DataError::InvalidArgument(_))
        ));
        assert!(matches!(
            QueryBuilder::<User>::select()
                .pager(Pager::new(0, 10))
                .unwrap()
                .fields("x"),
            Err(DataError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_pager_limit_clause() {
        let mut pager = Pager::new(2, 10);
        pager.set_total(95);
        let sql = QueryBuilder::<User>::select()
            .pager(pager)
            .unwrap()
            .render(Dialect::MySql, star)
            .unwrap();
        assert_eq!(sql, "SELECT * FROM `user` LIMIT 10 OFFSET 20");
    }

    #[test]
    fn test_count_query() {
        let q = QueryBuilder::<User>::select().filter_in("role", &["admin", "user"]);
        assert_eq!(
            q.render_count(Dialect::MySql),
            "SELECT COUNT(*) FROM `user` WHERE `role` IN (?, ?)"
        );
        let grouped = q.group_by("`role`");
        assert_eq!(
            grouped.render_count(Dialect::MySql),
            "SELECT COUNT(*) FROM (SELECT 1 FROM `user` WHERE `role` IN (?, ?) GROUP BY `role`) AS counted"
        );
    }

    #[test]
    fn test_delete() {
        let sql = QueryBuilder::<User>::delete()
            .filter_null("name")
            .render(Dialect::Sqlite, star)
            .unwrap();
        assert_eq!(sql, "DELETE FROM `user` WHERE `name` IS NULL");

        let joined = QueryBuilder::<User>::delete().join::<Profile>();
        assert_eq!(
            joined.render(Dialect::MySql, star).unwrap(),
            "DELETE `user` FROM `user` INNER JOIN `profile` ON `profile`.`profile_id` = `user`.`user_id`"
        );
        assert!(joined.render(Dialect::Sqlite, star).is_err());
    }
}
