//! SQL generation
//!
//! Compiles predicate trees, ordering directives and projections into parameterized
//! Postgres SQL. The root table is always aliased `t0`; every relation hop gets the
//! next alias. Relation predicates become `EXISTS` sub-queries, nested ordering
//! becomes a correlated scalar sub-query, and rows come back as `jsonb`.
//!
//! A value compared against a column with a declared type is sent as text and cast to
//! that type in the statement (`$1::text`). Pattern and case-insensitive operands are
//! always text.

use super::schema::{PgModel, PgRelation, PgSchema, RelationKind};
use crate::errors::StoreError;
use crate::query_builder::{
    Condition, FieldFilter, Filter, OrderBy, Projection, QueryMode, QueryOperator, Window,
};
use crate::validation::quote_identifier;
use serde_json::Value;

pub const ROOT_ALIAS: &str = "t0";

type SqlResult = Result<String, StoreError>;

/// A bound value and how it is sent
#[derive(Debug, Clone, PartialEq)]
pub enum Param {
    /// Bound type picked from the value; strings holding timestamps or UUIDs bind typed
    Inferred(Value),
    /// Bound as text
    Text(String),
}

pub struct SqlGenerator<'a> {
    schema: &'a PgSchema,
    params: Vec<Param>,
    aliases: usize,
}

impl<'a> SqlGenerator<'a> {
    pub fn new(schema: &'a PgSchema) -> Self {
        Self {
            schema,
            params: Vec::new(),
            aliases: 0,
        }
    }

    /// Bound values in placeholder order
    pub fn into_params(self) -> Vec<Param> {
        self.params
    }

    fn push(&mut self, param: Param) -> String {
        self.params.push(param);
        format!("${}", self.params.len())
    }

    /// Register a bound value and return its placeholder
    pub fn param(&mut self, value: Value) -> String {
        self.push(Param::Inferred(value))
    }

    pub fn text_param(&mut self, text: String) -> String {
        self.push(Param::Text(text))
    }

    /// Placeholder for a value compared against `column` of `model`
    pub fn column_param(&mut self, model: &PgModel, column: &str, value: Value) -> String {
        match (model.get_column_type(column), value) {
            (Some(sql_type), Value::String(text)) => {
                format!("{}::{}", self.text_param(text), sql_type)
            }
            (Some(sql_type), value) => format!("{}::{}", self.param(value), sql_type),
            (None, value) => self.param(value),
        }
    }

    fn next_alias(&mut self) -> String {
        self.aliases += 1;
        format!("t{}", self.aliases)
    }

    /// `WHERE ...`, or an empty string for an empty filter
    pub fn where_clause(&mut self, model: &PgModel, filter: &Filter) -> SqlResult {
        let conditions = self.filter_sql(model, ROOT_ALIAS, filter)?;
        if conditions.is_empty() {
            Ok(String::new())
        } else {
            Ok(format!(" WHERE {}", conditions))
        }
    }

    fn filter_sql(&mut self, model: &PgModel, alias: &str, filter: &Filter) -> SqlResult {
        let mut parts = Vec::new();

        for (field, constraint) in filter.fields() {
            match constraint {
                FieldFilter::Condition(condition) => {
                    parts.push(self.condition_sql(model, alias, field, condition)?);
                }
                FieldFilter::Relation(inner) => {
                    let relation = model.get_relation(field)?;
                    let target = self.schema.model(&relation.target)?;
                    let sub = self.next_alias();
                    let join = join_condition(relation, alias, &sub);
                    let inner_sql = self.filter_sql(target, &sub, inner)?;
                    let conditions = if inner_sql.is_empty() {
                        join
                    } else {
                        format!("{} AND {}", join, inner_sql)
                    };
                    parts.push(format!(
                        "EXISTS (SELECT 1 FROM {} {} WHERE {})",
                        target.table.quoted(),
                        sub,
                        conditions
                    ));
                }
            }
        }

        if let Some(alternatives) = filter.or_branch() {
            if alternatives.is_empty() {
                parts.push("FALSE".to_string());
            } else {
                let mut branches = Vec::with_capacity(alternatives.len());
                for alternative in alternatives {
                    let sql = self.filter_sql(model, alias, alternative)?;
                    branches.push(if sql.is_empty() {
                        "TRUE".to_string()
                    } else {
                        format!("({})", sql)
                    });
                }
                parts.push(format!("({})", branches.join(" OR ")));
            }
        }

        Ok(parts.join(" AND "))
    }

    fn condition_sql(
        &mut self,
        model: &PgModel,
        alias: &str,
        field: &str,
        condition: &Condition,
    ) -> SqlResult {
        let column = &format!("{}.{}", alias, quote_identifier(field)?);
        let value = &condition.value;
        let sql = match condition.operator {
            QueryOperator::Equals if value.is_null() => format!("{} IS NULL", column),
            QueryOperator::Not if value.is_null() => format!("{} IS NOT NULL", column),
            QueryOperator::Equals => self.comparison(model, field, column, "=", condition),
            QueryOperator::Not => self.comparison(model, field, column, "<>", condition),
            QueryOperator::Lt => self.comparison(model, field, column, "<", condition),
            QueryOperator::Lte => self.comparison(model, field, column, "<=", condition),
            QueryOperator::Gt => self.comparison(model, field, column, ">", condition),
            QueryOperator::Gte => self.comparison(model, field, column, ">=", condition),
            QueryOperator::In | QueryOperator::NotIn => {
                let candidates = value.as_array().ok_or_else(|| {
                    StoreError::Validation(format!(
                        "'{}' expects an array, got {}",
                        condition.operator.key(),
                        value
                    ))
                })?;
                let negated = condition.operator == QueryOperator::NotIn;
                if candidates.is_empty() {
                    return Ok(if negated { "TRUE" } else { "FALSE" }.to_string());
                }
                let placeholders = candidates
                    .iter()
                    .map(|candidate| self.column_param(model, field, candidate.clone()))
                    .collect::<Vec<_>>()
                    .join(", ");
                format!(
                    "{} {} ({})",
                    column,
                    if negated { "NOT IN" } else { "IN" },
                    placeholders
                )
            }
            QueryOperator::Contains | QueryOperator::StartsWith | QueryOperator::EndsWith => {
                let text = value.as_str().ok_or_else(|| {
                    StoreError::Validation(format!(
                        "'{}' expects a string, got {}",
                        condition.operator.key(),
                        value
                    ))
                })?;
                let escaped = escape_like(text);
                let pattern = match condition.operator {
                    QueryOperator::StartsWith => format!("{}%", escaped),
                    QueryOperator::EndsWith => format!("%{}", escaped),
                    _ => format!("%{}%", escaped),
                };
                let operator = match condition.mode {
                    QueryMode::Insensitive => "ILIKE",
                    QueryMode::Default => "LIKE",
                };
                let placeholder = self.text_param(pattern);
                format!("{}::text {} {}", column, operator, placeholder)
            }
        };
        Ok(sql)
    }

    fn comparison(
        &mut self,
        model: &PgModel,
        field: &str,
        column: &str,
        operator: &str,
        condition: &Condition,
    ) -> String {
        match (&condition.mode, &condition.value) {
            (QueryMode::Insensitive, Value::String(text)) => {
                let placeholder = self.text_param(text.clone());
                format!("LOWER({}::text) {} LOWER({})", column, operator, placeholder)
            }
            _ => {
                let placeholder = self.column_param(model, field, condition.value.clone());
                format!("{} {} {}", column, operator, placeholder)
            }
        }
    }

    /// ` ORDER BY ...`, or an empty string
    pub fn order_clause(&mut self, model: &PgModel, order_by: &[OrderBy]) -> SqlResult {
        if order_by.is_empty() {
            return Ok(String::new());
        }
        let mut parts = Vec::with_capacity(order_by.len());
        for directive in order_by {
            let direction = directive.direction.to_sql().ok_or_else(|| {
                StoreError::Validation(format!(
                    "unsupported sort direction '{}'",
                    directive.direction.as_str()
                ))
            })?;
            let expression = self.path_expression(model, ROOT_ALIAS, &directive.path)?;
            parts.push(format!("{} {}", expression, direction));
        }
        Ok(format!(" ORDER BY {}", parts.join(", ")))
    }

    fn path_expression(&mut self, model: &PgModel, alias: &str, path: &[String]) -> SqlResult {
        match path {
            [] => Err(StoreError::Validation("empty order path".to_string())),
            [field] => Ok(format!("{}.{}", alias, quote_identifier(field)?)),
            [relation_name, rest @ ..] => {
                let relation = model.get_relation(relation_name)?;
                let target = self.schema.model(&relation.target)?;
                let sub = self.next_alias();
                let inner = self.path_expression(target, &sub, rest)?;
                Ok(format!(
                    "(SELECT {} FROM {} {} WHERE {} LIMIT 1)",
                    inner,
                    target.table.quoted(),
                    sub,
                    join_condition(relation, alias, &sub)
                ))
            }
        }
    }

    /// The `jsonb` expression each returned row is built from
    pub fn projection(&mut self, model: &PgModel, projection: &Projection) -> SqlResult {
        match projection {
            Projection::Full => Ok(format!("to_jsonb({})", ROOT_ALIAS)),
            Projection::Select(fields) => {
                let mut pairs = Vec::with_capacity(fields.len());
                for field in fields {
                    let column = quote_identifier(field)?;
                    pairs.push(format!("'{}', {}.{}", field, ROOT_ALIAS, column));
                }
                Ok(format!("jsonb_build_object({})", pairs.join(", ")))
            }
            Projection::Include(relations) if relations.is_empty() => {
                Ok(format!("to_jsonb({})", ROOT_ALIAS))
            }
            Projection::Include(relations) => {
                let mut pairs = Vec::with_capacity(relations.len());
                for name in relations {
                    quote_identifier(name)?;
                    let relation = model.get_relation(name)?;
                    let target = self.schema.model(&relation.target)?;
                    let sub = self.next_alias();
                    let join = join_condition(relation, ROOT_ALIAS, &sub);
                    let expression = match relation.kind {
                        RelationKind::One => format!(
                            "(SELECT to_jsonb({sub}) FROM {} {sub} WHERE {} LIMIT 1)",
                            target.table.quoted(),
                            join
                        ),
                        RelationKind::Many => format!(
                            "(SELECT COALESCE(jsonb_agg(to_jsonb({sub})), '[]'::jsonb) FROM {} {sub} WHERE {})",
                            target.table.quoted(),
                            join
                        ),
                    };
                    pairs.push(format!("'{}', {}", name, expression));
                }
                Ok(format!(
                    "to_jsonb({}) || jsonb_build_object({})",
                    ROOT_ALIAS,
                    pairs.join(", ")
                ))
            }
        }
    }

    /// `SELECT` over the model's table
    pub fn select(
        &mut self,
        model: &PgModel,
        filter: &Filter,
        order_by: &[OrderBy],
        projection: &Projection,
        window: Option<Window>,
    ) -> SqlResult {
        let projection = self.projection(model, projection)?;
        let where_clause = self.where_clause(model, filter)?;
        let order_clause = self.order_clause(model, order_by)?;
        let mut sql = format!(
            "SELECT {} FROM {} {}{}{}",
            projection,
            model.table.quoted(),
            ROOT_ALIAS,
            where_clause,
            order_clause
        );
        if let Some(Window { skip, take }) = window {
            sql.push_str(&format!(" LIMIT {} OFFSET {}", take, skip));
        }
        Ok(sql)
    }
}

fn join_condition(relation: &PgRelation, alias: &str, sub: &str) -> String {
    format!(
        "{}.{} = {}.{}",
        sub,
        relation.foreign_key.quoted(),
        alias,
        relation.local_key.quoted()
    )
}

/// Escape LIKE wildcards so user search text matches literally
pub fn escape_like(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}
