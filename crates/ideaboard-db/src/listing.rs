//! Aggregated list queries for entities that carry tags.
//!
//! Every read of an idea, user, or group goes through [`ListQueryBuilder`]:
//! a left join from the entity through its junction table to `tags`, grouped
//! by every entity column, with tag names folded into one array. Entities
//! without tags aggregate to an empty array rather than `{NULL}`.
//!
//! Only `&'static str` fragments are ever interpolated into the SQL text.
//! Caller-supplied values (ids, tag names, access scopes) travel as
//! [`QueryParam`]s bound to positional placeholders.

use ideaboard_core::{AccessFilter, SortKey, SortOrder};

/// Type-safe parameter binding for SQL queries.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryParam {
    Int(i64),
    String(String),
}

/// Static description of an entity table that tags link to.
#[derive(Debug)]
pub struct TaggedTable {
    pub table: &'static str,
    pub alias: &'static str,
    /// Scalar columns, in the order row decoders expect them.
    pub columns: &'static [&'static str],
    pub junction: &'static str,
    /// Column in the junction table referencing this entity's `id`.
    pub junction_fk: &'static str,
}

pub const IDEAS: TaggedTable = TaggedTable {
    table: "ideas",
    alias: "i",
    columns: &[
        "id",
        "title",
        "content",
        "user_id",
        "files_url",
        "access",
        "upvotes",
        "downvotes",
        "created_at",
    ],
    junction: "ideas_tags",
    junction_fk: "idea_id",
};

pub const USERS: TaggedTable = TaggedTable {
    table: "users",
    alias: "u",
    columns: &["id", "name", "email", "role", "image_url"],
    junction: "users_tags",
    junction_fk: "user_id",
};

pub const GROUPS: TaggedTable = TaggedTable {
    table: "groups",
    alias: "g",
    columns: &["id", "title", "description", "user_ids", "likes"],
    junction: "groups_tags",
    junction_fk: "group_id",
};

/// Builds `SELECT <entity>, <tags[]>` queries with optional filters.
#[derive(Debug)]
pub struct ListQueryBuilder {
    table: &'static TaggedTable,
    conditions: Vec<String>,
    params: Vec<QueryParam>,
    order: Option<(&'static str, SortOrder)>,
}

impl ListQueryBuilder {
    pub fn new(table: &'static TaggedTable) -> Self {
        Self {
            table,
            conditions: Vec::new(),
            params: Vec::new(),
            order: None,
        }
    }

    fn push_param(&mut self, param: QueryParam) -> String {
        self.params.push(param);
        format!("${}", self.params.len())
    }

    /// Restrict to the row with this primary key.
    pub fn with_id(self, id: QueryParam) -> Self {
        self.with_equals("id", id)
    }

    /// Restrict to rows where `column` equals the bound value.
    pub fn with_equals(mut self, column: &'static str, value: QueryParam) -> Self {
        let placeholder = self.push_param(value);
        self.conditions
            .push(format!("{}.{} = {}", self.table.alias, column, placeholder));
        self
    }

    /// Restrict to entities linked to the named tag.
    ///
    /// Uses `EXISTS` so the aggregated list still holds every tag of the
    /// matching entity, not only the filtered one.
    pub fn with_tag(mut self, name: Option<String>) -> Self {
        if let Some(name) = name {
            let placeholder = self.push_param(QueryParam::String(name));
            self.conditions.push(format!(
                "EXISTS (SELECT 1 FROM {junction} ft JOIN tags ftn ON ftn.id = ft.tag_id \
                 WHERE ft.{fk} = {alias}.id AND ftn.name = {placeholder})",
                junction = self.table.junction,
                fk = self.table.junction_fk,
                alias = self.table.alias,
                placeholder = placeholder,
            ));
        }
        self
    }

    /// Restrict to rows visible to the scope, plus public rows.
    pub fn with_access(mut self, filter: AccessFilter) -> Self {
        if let AccessFilter::VisibleTo(access) = filter {
            let placeholder = self.push_param(QueryParam::String(access.to_string()));
            self.conditions.push(format!(
                "({alias}.access = {placeholder} OR {alias}.access = 'public')",
                alias = self.table.alias,
                placeholder = placeholder,
            ));
        }
        self
    }

    pub fn order_by<K: SortKey>(mut self, sort: Option<K>, order: Option<SortOrder>) -> Self {
        if let Some(key) = sort {
            self.order = Some((key.column(), order.unwrap_or_else(|| key.default_order())));
        }
        self
    }

    /// Build the SQL text and the parameters in placeholder order.
    pub fn build(self) -> (String, Vec<QueryParam>) {
        let alias = self.table.alias;
        let qualified: Vec<String> = self
            .table
            .columns
            .iter()
            .map(|c| format!("{}.{}", alias, c))
            .collect();
        let column_list = qualified.join(", ");

        let mut sql = format!(
            "SELECT {columns}, \
             COALESCE(array_agg(t.name ORDER BY t.name) FILTER (WHERE t.name IS NOT NULL), '{{}}') AS tags \
             FROM {table} {alias} \
             LEFT JOIN {junction} jt ON jt.{fk} = {alias}.id \
             LEFT JOIN tags t ON t.id = jt.tag_id",
            columns = column_list,
            table = self.table.table,
            alias = alias,
            junction = self.table.junction,
            fk = self.table.junction_fk,
        );

        if !self.conditions.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&self.conditions.join(" AND "));
        }

        sql.push_str(" GROUP BY ");
        sql.push_str(&column_list);

        match self.order {
            Some((column, order)) => sql.push_str(&format!(
                " ORDER BY {alias}.{column} {dir}, {alias}.id",
                alias = alias,
                column = column,
                dir = order.as_sql(),
            )),
            None => sql.push_str(&format!(" ORDER BY {}.id", alias)),
        }

        (sql, self.params)
    }
}

/// Bind [`QueryParam`]s onto a runtime query in order.
pub(crate) fn bind_params<'q>(
    mut query: sqlx::query::Query<'q, sqlx::Postgres, sqlx::postgres::PgArguments>,
    params: Vec<QueryParam>,
) -> sqlx::query::Query<'q, sqlx::Postgres, sqlx::postgres::PgArguments> {
    for param in params {
        query = match param {
            QueryParam::Int(v) => query.bind(v),
            QueryParam::String(v) => query.bind(v),
        };
    }
    query
}

#[cfg(test)]
mod tests {
    use super::*;
    use ideaboard_core::{Access, IdeaSort, UserSort};

    #[test]
    fn test_unfiltered_idea_listing() {
        let (sql, params) = ListQueryBuilder::new(&IDEAS).build();

        assert!(params.is_empty());
        assert!(sql.starts_with("SELECT i.id, i.title, i.content, i.user_id"));
        assert!(sql.contains("FROM ideas i LEFT JOIN ideas_tags jt ON jt.idea_id = i.id"));
        assert!(sql.contains("LEFT JOIN tags t ON t.id = jt.tag_id"));
        assert!(!sql.contains(" WHERE "));
        assert!(sql.contains("LEFT JOIN tags t ON t.id = jt.tag_id GROUP BY "));
        assert!(sql.ends_with(" ORDER BY i.id"));
    }

    #[test]
    fn test_empty_tags_aggregate_to_empty_array() {
        let (sql, _) = ListQueryBuilder::new(&USERS).build();
        assert!(sql.contains(
            "COALESCE(array_agg(t.name ORDER BY t.name) FILTER (WHERE t.name IS NOT NULL), '{}') AS tags"
        ));
    }

    #[test]
    fn test_groups_by_every_scalar_column() {
        let (sql, _) = ListQueryBuilder::new(&GROUPS).build();
        assert!(sql.contains("GROUP BY g.id, g.title, g.description, g.user_ids, g.likes"));
    }

    #[test]
    fn test_with_id_binds_parameter() {
        let (sql, params) = ListQueryBuilder::new(&IDEAS)
            .with_id(QueryParam::Int(7))
            .build();

        assert!(sql.contains("WHERE i.id = $1"));
        assert_eq!(params, vec![QueryParam::Int(7)]);
    }

    #[test]
    fn test_tag_filter_uses_exists() {
        let (sql, params) = ListQueryBuilder::new(&IDEAS)
            .with_tag(Some("rust".to_string()))
            .build();

        assert!(sql.contains(
            "EXISTS (SELECT 1 FROM ideas_tags ft JOIN tags ftn ON ftn.id = ft.tag_id WHERE ft.idea_id = i.id AND ftn.name = $1)"
        ));
        assert_eq!(params, vec![QueryParam::String("rust".to_string())]);
    }

    #[test]
    fn test_access_filter_includes_public() {
        let (sql, params) = ListQueryBuilder::new(&IDEAS)
            .with_access(AccessFilter::VisibleTo(Access::Private("42".into())))
            .build();

        assert!(sql.contains("WHERE (i.access = $1 OR i.access = 'public')"));
        assert_eq!(params, vec![QueryParam::String("private:42".to_string())]);
    }

    #[test]
    fn test_unfiltered_access_adds_nothing() {
        let (sql, params) = ListQueryBuilder::new(&IDEAS)
            .with_access(AccessFilter::Unfiltered)
            .build();
        assert!(!sql.contains("access ="));
        assert!(params.is_empty());
    }

    #[test]
    fn test_placeholders_number_in_order() {
        let (sql, params) = ListQueryBuilder::new(&IDEAS)
            .with_equals("user_id", QueryParam::String("u1".into()))
            .with_tag(Some("x".into()))
            .with_access(AccessFilter::VisibleTo(Access::Group("3".into())))
            .build();

        assert!(sql.contains("i.user_id = $1 AND EXISTS"));
        assert!(sql.contains("ftn.name = $2)"));
        assert!(sql.contains("(i.access = $3 OR i.access = 'public')"));
        assert_eq!(
            params,
            vec![
                QueryParam::String("u1".into()),
                QueryParam::String("x".into()),
                QueryParam::String("group:3".into()),
            ]
        );
    }

    #[test]
    fn test_order_by_uses_allow_listed_column() {
        let (sql, _) = ListQueryBuilder::new(&IDEAS)
            .order_by(Some(IdeaSort::Upvotes), None)
            .build();
        assert!(sql.ends_with(" ORDER BY i.upvotes DESC, i.id"));

        let (sql, _) = ListQueryBuilder::new(&USERS)
            .order_by(Some(UserSort::Name), Some(SortOrder::Desc))
            .build();
        assert!(sql.ends_with(" ORDER BY u.name DESC, u.id"));
    }

    #[test]
    fn test_order_without_key_ignores_direction() {
        let (sql, _) = ListQueryBuilder::new(&IDEAS)
            .order_by::<IdeaSort>(None, Some(SortOrder::Asc))
            .build();
        assert!(sql.ends_with(" ORDER BY i.id"));
    }
}
