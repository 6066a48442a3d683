//! Condition tree and fluent filter API.
//!
//! A [`Builder`] is an ordered list of [`Where`] nodes plus the projection,
//! limit and offset of a single directory search. Nodes are only ever
//! appended; compilation reads the tree without changing it.

use std::sync::Arc;

use super::{
    compiled::CompiledQuery,
    error::{QueryError, QueryResult},
    grammar::{Grammar, ScimGrammar},
    operator::{Connector, Operator},
    value::FilterValue,
};

/// Number of entries requested when no limit is given.
pub const DEFAULT_LIMIT: u32 = 100;

/// Projection that requests every attribute.
pub const ALL_ATTRIBUTES: &str = "*";

/// One node of a condition tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Where {
    /// `attribute operator value`
    Basic {
        attribute: String,
        operator: Operator,
        value: FilterValue,
        connector: Connector,
        negate: bool,
    },
    /// `attribute pr`
    Present {
        attribute: String,
        connector: Connector,
        negate: bool,
    },
    /// Set membership. Expanded at compile time into a group of `eq` clauses
    /// joined by `or`, or by `and` when negated.
    In {
        attribute: String,
        values: Vec<FilterValue>,
        connector: Connector,
        negate: bool,
    },
    /// Inserted verbatim.
    Raw {
        expression: String,
        connector: Connector,
    },
    /// A child condition list compiled on its own and wrapped in parentheses.
    Nested {
        wheres: Vec<Where>,
        connector: Connector,
        negate: bool,
    },
}

impl Where {
    pub fn connector(&self) -> Connector {
        match self {
            Where::Basic { connector, .. }
            | Where::Present { connector, .. }
            | Where::In { connector, .. }
            | Where::Raw { connector, .. }
            | Where::Nested { connector, .. } => *connector,
        }
    }
}

/// One attribute name or a list of them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Attributes(Vec<String>);

impl Attributes {
    pub fn into_vec(self) -> Vec<String> {
        self.0
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }
}

impl From<&str> for Attributes {
    fn from(attribute: &str) -> Self {
        Attributes(vec![attribute.to_string()])
    }
}

impl From<String> for Attributes {
    fn from(attribute: String) -> Self {
        Attributes(vec![attribute])
    }
}

impl From<Vec<String>> for Attributes {
    fn from(attributes: Vec<String>) -> Self {
        Attributes(attributes)
    }
}

impl From<Vec<&str>> for Attributes {
    fn from(attributes: Vec<&str>) -> Self {
        Attributes(attributes.into_iter().map(str::to_string).collect())
    }
}

impl From<&[&str]> for Attributes {
    fn from(attributes: &[&str]) -> Self {
        Attributes(attributes.iter().map(|a| a.to_string()).collect())
    }
}

impl<const N: usize> From<[&str; N]> for Attributes {
    fn from(attributes: [&str; N]) -> Self {
        Attributes(attributes.iter().map(|a| a.to_string()).collect())
    }
}

/// A positional entry of [`ArrayOfWheres::List`].
#[derive(Debug, Clone, PartialEq)]
pub enum WhereTuple {
    /// `(attribute, value)`, compared with `eq`.
    Value(String, FilterValue),
    /// `(attribute, operator, value)`, following the same operator rules as
    /// [`Builder::where_op`].
    Operator(String, String, FilterValue),
}

impl<A, V> From<(A, V)> for WhereTuple
where
    A: Into<String>,
    V: Into<FilterValue>,
{
    fn from((attribute, value): (A, V)) -> Self {
        WhereTuple::Value(attribute.into(), value.into())
    }
}

impl<A, O, V> From<(A, O, V)> for WhereTuple
where
    A: Into<String>,
    O: Into<String>,
    V: Into<FilterValue>,
{
    fn from((attribute, operator, value): (A, O, V)) -> Self {
        WhereTuple::Operator(attribute.into(), operator.into(), value.into())
    }
}

/// A batch of conditions added as one nested group.
#[derive(Debug, Clone, PartialEq)]
pub enum ArrayOfWheres {
    /// `attribute => value` pairs compared with `eq` and joined by the
    /// group's connector.
    Map(Vec<(String, FilterValue)>),
    /// Positional tuples, each joined with `and`.
    List(Vec<WhereTuple>),
}

impl ArrayOfWheres {
    pub fn map<I, K, V>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<FilterValue>,
    {
        ArrayOfWheres::Map(
            entries
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }

    pub fn list<I, T>(tuples: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<WhereTuple>,
    {
        ArrayOfWheres::List(tuples.into_iter().map(Into::into).collect())
    }
}

/// A directory search under construction.
///
/// Conditions are added through the fluent methods, which return `&mut Self`
/// so calls can be chained. The grammar decides how the tree is turned into a
/// filter string and query object; trees created with [`Builder::new_query`]
/// share it.
#[derive(Debug, Clone)]
pub struct Builder {
    wheres: Vec<Where>,
    attributes: Vec<String>,
    limit: u32,
    offset: u32,
    grammar: Arc<dyn Grammar>,
}

impl Default for Builder {
    fn default() -> Self {
        Self::new()
    }
}

impl Builder {
    /// A builder compiled with the standard SCIM grammar.
    pub fn new() -> Self {
        Self::with_grammar(Arc::new(ScimGrammar))
    }

    pub fn with_grammar(grammar: Arc<dyn Grammar>) -> Self {
        Self {
            wheres: Vec::new(),
            attributes: vec![ALL_ATTRIBUTES.to_string()],
            limit: DEFAULT_LIMIT,
            offset: 0,
            grammar,
        }
    }

    /// A fresh builder sharing this one's grammar, with no conditions.
    pub fn new_query(&self) -> Builder {
        Builder::with_grammar(Arc::clone(&self.grammar))
    }

    /// The child builder handed to nested-condition callbacks.
    pub fn for_nested_where(&self) -> Builder {
        self.new_query()
    }

    pub fn wheres(&self) -> &[Where] {
        &self.wheres
    }

    pub fn attributes(&self) -> &[String] {
        &self.attributes
    }

    pub fn limit_value(&self) -> u32 {
        self.limit
    }

    pub fn offset_value(&self) -> u32 {
        self.offset
    }

    pub fn grammar(&self) -> &Arc<dyn Grammar> {
        &self.grammar
    }

    fn push(&mut self, node: Where) -> &mut Self {
        if let Where::Nested { wheres, .. } = &node
            && wheres.is_empty()
        {
            return self;
        }
        self.wheres.push(node);
        self
    }

    fn push_basic(
        &mut self,
        attribute: String,
        operator: Operator,
        value: FilterValue,
        connector: Connector,
        negate: bool,
    ) -> &mut Self {
        self.push(Where::Basic {
            attribute,
            operator,
            value,
            connector,
            negate,
        })
    }

    // ========================================================================
    // Dynamic operator API
    // ========================================================================

    /// Adds a condition from a possibly-unknown operator keyword.
    ///
    /// `operator: None` is the two-argument form: the value is compared with
    /// `eq`. An operator keyword outside the ten known ones is taken to be the
    /// value itself, compared with `eq`. A value that resolves to `None`
    /// degrades to a `not (attribute pr)` clause.
    ///
    /// # Errors
    ///
    /// [`QueryError::InvalidArgument`] when a known operator other than `pr`
    /// is given without a value.
    pub fn add_where(
        &mut self,
        attribute: impl Into<String>,
        operator: Option<&str>,
        value: Option<FilterValue>,
        connector: Connector,
        negate: bool,
    ) -> QueryResult<&mut Self> {
        let attribute = attribute.into();
        let (value, operator) = Self::prepare_value_and_operator(value, operator)?;
        match value {
            Some(value) => Ok(self.push_operator(attribute, &operator, value, connector, negate)),
            None if Self::invalid_operator(&operator) => Ok(self.push_operator(
                attribute,
                "eq",
                FilterValue::String(operator),
                connector,
                negate,
            )),
            None => Ok(self.add_present(attribute, connector, true)),
        }
    }

    fn push_operator(
        &mut self,
        attribute: String,
        operator: &str,
        value: FilterValue,
        connector: Connector,
        negate: bool,
    ) -> &mut Self {
        match Operator::parse(operator) {
            Some(op) => self.push_basic(attribute, op, value, connector, negate),
            None => self.push_basic(
                attribute,
                Operator::Eq,
                FilterValue::String(operator.to_string()),
                connector,
                negate,
            ),
        }
    }

    /// `attribute operator value`, joined with `and`.
    ///
    /// An unknown operator keyword becomes the value: `where_op("name",
    /// "Joe", "ignored")` compiles to `name eq "Joe"`.
    pub fn where_op(
        &mut self,
        attribute: impl Into<String>,
        operator: &str,
        value: impl Into<FilterValue>,
    ) -> &mut Self {
        self.push_operator(attribute.into(), operator, value.into(), Connector::And, false)
    }

    pub fn or_where_op(
        &mut self,
        attribute: impl Into<String>,
        operator: &str,
        value: impl Into<FilterValue>,
    ) -> &mut Self {
        self.push_operator(attribute.into(), operator, value.into(), Connector::Or, false)
    }

    pub fn where_not_op(
        &mut self,
        attribute: impl Into<String>,
        operator: &str,
        value: impl Into<FilterValue>,
    ) -> &mut Self {
        self.push_operator(attribute.into(), operator, value.into(), Connector::And, true)
    }

    pub fn or_where_not_op(
        &mut self,
        attribute: impl Into<String>,
        operator: &str,
        value: impl Into<FilterValue>,
    ) -> &mut Self {
        self.push_operator(attribute.into(), operator, value.into(), Connector::Or, true)
    }

    /// Resolves the operator and value of a dynamic condition.
    ///
    /// Without an operator the value is compared with `eq`.
    pub fn prepare_value_and_operator(
        value: Option<FilterValue>,
        operator: Option<&str>,
    ) -> QueryResult<(Option<FilterValue>, String)> {
        let Some(operator) = operator else {
            return Ok((value, Operator::Eq.as_str().to_string()));
        };
        if Self::invalid_operator_and_value(operator, value.as_ref()) {
            return Err(QueryError::illegal_operator_and_value());
        }
        Ok((value, operator.to_string()))
    }

    /// A known operator other than `pr` needs a value.
    pub fn invalid_operator_and_value(operator: &str, value: Option<&FilterValue>) -> bool {
        value.is_none() && matches!(Operator::parse(operator), Some(op) if op != Operator::Pr)
    }

    /// True when `operator` is not one of the ten keywords (case-insensitive).
    pub fn invalid_operator(operator: &str) -> bool {
        Operator::parse(operator).is_none()
    }

    // ========================================================================
    // Presence
    // ========================================================================

    /// Adds one `attribute pr` clause per attribute.
    pub fn add_present(
        &mut self,
        attributes: impl Into<Attributes>,
        connector: Connector,
        negate: bool,
    ) -> &mut Self {
        for attribute in attributes.into().into_vec() {
            self.push(Where::Present {
                attribute,
                connector,
                negate,
            });
        }
        self
    }

    pub fn where_present(&mut self, attributes: impl Into<Attributes>) -> &mut Self {
        self.add_present(attributes, Connector::And, false)
    }

    pub fn or_where_present(&mut self, attributes: impl Into<Attributes>) -> &mut Self {
        self.add_present(attributes, Connector::Or, false)
    }

    pub fn where_not_present(&mut self, attributes: impl Into<Attributes>) -> &mut Self {
        self.add_present(attributes, Connector::And, true)
    }

    pub fn or_where_not_present(&mut self, attributes: impl Into<Attributes>) -> &mut Self {
        self.add_present(attributes, Connector::Or, true)
    }

    // ========================================================================
    // Set membership
    // ========================================================================

    pub fn add_in<I, V>(
        &mut self,
        attribute: impl Into<String>,
        values: I,
        connector: Connector,
        negate: bool,
    ) -> &mut Self
    where
        I: IntoIterator<Item = V>,
        V: Into<FilterValue>,
    {
        self.push(Where::In {
            attribute: attribute.into(),
            values: values.into_iter().map(Into::into).collect(),
            connector,
            negate,
        })
    }

    pub fn where_in<I, V>(&mut self, attribute: impl Into<String>, values: I) -> &mut Self
    where
        I: IntoIterator<Item = V>,
        V: Into<FilterValue>,
    {
        self.add_in(attribute, values, Connector::And, false)
    }

    pub fn or_where_in<I, V>(&mut self, attribute: impl Into<String>, values: I) -> &mut Self
    where
        I: IntoIterator<Item = V>,
        V: Into<FilterValue>,
    {
        self.add_in(attribute, values, Connector::Or, false)
    }

    pub fn where_not_in<I, V>(&mut self, attribute: impl Into<String>, values: I) -> &mut Self
    where
        I: IntoIterator<Item = V>,
        V: Into<FilterValue>,
    {
        self.add_in(attribute, values, Connector::And, true)
    }

    pub fn or_where_not_in<I, V>(&mut self, attribute: impl Into<String>, values: I) -> &mut Self
    where
        I: IntoIterator<Item = V>,
        V: Into<FilterValue>,
    {
        self.add_in(attribute, values, Connector::Or, true)
    }

    // ========================================================================
    // Raw and nested
    // ========================================================================

    pub fn where_raw(&mut self, expression: impl Into<String>) -> &mut Self {
        self.add_raw(expression, Connector::And)
    }

    pub fn or_where_raw(&mut self, expression: impl Into<String>) -> &mut Self {
        self.add_raw(expression, Connector::Or)
    }

    pub fn add_raw(&mut self, expression: impl Into<String>, connector: Connector) -> &mut Self {
        self.push(Where::Raw {
            expression: expression.into(),
            connector,
        })
    }

    /// Builds a parenthesized group in a fresh child builder.
    ///
    /// Nothing is added when the callback leaves the child empty.
    pub fn add_nested<F>(&mut self, callback: F, connector: Connector, negate: bool) -> &mut Self
    where
        F: FnOnce(&mut Builder) -> &mut Builder,
    {
        let mut query = self.for_nested_where();
        callback(&mut query);
        self.add_nested_where_query(query, connector, negate)
    }

    /// Appends the conditions of an already-built child as one group.
    pub fn add_nested_where_query(
        &mut self,
        query: Builder,
        connector: Connector,
        negate: bool,
    ) -> &mut Self {
        self.push(Where::Nested {
            wheres: query.wheres,
            connector,
            negate,
        })
    }

    pub fn where_nested<F>(&mut self, callback: F) -> &mut Self
    where
        F: FnOnce(&mut Builder) -> &mut Builder,
    {
        self.add_nested(callback, Connector::And, false)
    }

    pub fn or_where_nested<F>(&mut self, callback: F) -> &mut Self
    where
        F: FnOnce(&mut Builder) -> &mut Builder,
    {
        self.add_nested(callback, Connector::Or, false)
    }

    pub fn where_not_nested<F>(&mut self, callback: F) -> &mut Self
    where
        F: FnOnce(&mut Builder) -> &mut Builder,
    {
        self.add_nested(callback, Connector::And, true)
    }

    pub fn or_where_not_nested<F>(&mut self, callback: F) -> &mut Self
    where
        F: FnOnce(&mut Builder) -> &mut Builder,
    {
        self.add_nested(callback, Connector::Or, true)
    }

    /// Adds a batch of conditions as one nested group.
    pub fn add_array_of_wheres(
        &mut self,
        wheres: ArrayOfWheres,
        connector: Connector,
        negate: bool,
    ) -> &mut Self {
        self.add_nested(
            |query| {
                match wheres {
                    ArrayOfWheres::Map(entries) => {
                        for (attribute, value) in entries {
                            query.push_basic(attribute, Operator::Eq, value, connector, false);
                        }
                    }
                    ArrayOfWheres::List(tuples) => {
                        for tuple in tuples {
                            match tuple {
                                WhereTuple::Value(attribute, value) => {
                                    query.where_equals(attribute, value);
                                }
                                WhereTuple::Operator(attribute, operator, value) => {
                                    query.where_op(attribute, &operator, value);
                                }
                            }
                        }
                    }
                }
                query
            },
            connector,
            negate,
        )
    }

    /// `and`-joined group of `attribute eq value` pairs.
    pub fn where_map<I, K, V>(&mut self, entries: I) -> &mut Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<FilterValue>,
    {
        self.add_array_of_wheres(ArrayOfWheres::map(entries), Connector::And, false)
    }

    /// Group of positional condition tuples.
    pub fn where_all<I, T>(&mut self, tuples: I) -> &mut Self
    where
        I: IntoIterator<Item = T>,
        T: Into<WhereTuple>,
    {
        self.add_array_of_wheres(ArrayOfWheres::list(tuples), Connector::And, false)
    }

    /// Adds a node produced by a caller-supplied constructor.
    ///
    /// This is the hook for provider-specific predicates that don't map onto
    /// the fluent methods.
    pub fn where_with<F>(
        &mut self,
        attribute: &str,
        value: impl Into<FilterValue>,
        build: F,
    ) -> &mut Self
    where
        F: Fn(&str, FilterValue) -> Where,
    {
        let node = build(attribute, value.into());
        self.push(node)
    }

    // ========================================================================
    // Projection and paging
    // ========================================================================

    pub fn select(&mut self, attributes: impl Into<Attributes>) -> &mut Self {
        self.attributes = attributes.into().into_vec();
        self
    }

    pub fn limit(&mut self, limit: u32) -> &mut Self {
        self.limit = limit;
        self
    }

    /// Alias for [`Builder::limit`].
    pub fn take(&mut self, limit: u32) -> &mut Self {
        self.limit(limit)
    }

    pub fn offset(&mut self, offset: u32) -> &mut Self {
        self.offset = offset;
        self
    }

    /// Alias for [`Builder::offset`].
    pub fn skip(&mut self, offset: u32) -> &mut Self {
        self.offset(offset)
    }

    // ========================================================================
    // Compilation
    // ========================================================================

    /// The filter expression for the current conditions.
    pub fn to_scim_filter(&self) -> String {
        self.grammar.compile_wheres(&self.wheres)
    }

    /// The query object sent to the directory.
    pub fn to_scim(&self) -> CompiledQuery {
        self.grammar.compile(self)
    }
}

macro_rules! operator_shorthands {
    ($($operator:ident, $keyword:literal: $where_:ident, $or_where:ident, $where_not:ident, $or_where_not:ident;)*) => {
        impl Builder {
            $(
                #[doc = concat!("`attribute ", $keyword, " value`, joined with `and`.")]
                pub fn $where_(
                    &mut self,
                    attribute: impl Into<String>,
                    value: impl Into<FilterValue>,
                ) -> &mut Self {
                    self.push_basic(attribute.into(), Operator::$operator, value.into(), Connector::And, false)
                }

                #[doc = concat!("`attribute ", $keyword, " value`, joined with `or`.")]
                pub fn $or_where(
                    &mut self,
                    attribute: impl Into<String>,
                    value: impl Into<FilterValue>,
                ) -> &mut Self {
                    self.push_basic(attribute.into(), Operator::$operator, value.into(), Connector::Or, false)
                }

                #[doc = concat!("`not (attribute ", $keyword, " value)`, joined with `and`.")]
                pub fn $where_not(
                    &mut self,
                    attribute: impl Into<String>,
                    value: impl Into<FilterValue>,
                ) -> &mut Self {
                    self.push_basic(attribute.into(), Operator::$operator, value.into(), Connector::And, true)
                }

                #[doc = concat!("`not (attribute ", $keyword, " value)`, joined with `or`.")]
                pub fn $or_where_not(
                    &mut self,
                    attribute: impl Into<String>,
                    value: impl Into<FilterValue>,
                ) -> &mut Self {
                    self.push_basic(attribute.into(), Operator::$operator, value.into(), Connector::Or, true)
                }
            )*
        }
    };
}

operator_shorthands! {
    Eq, "eq": where_equals, or_where_equals, where_not_equals, or_where_not_equals;
    Co, "co": where_contains, or_where_contains, where_not_contains, or_where_not_contains;
    Sw, "sw": where_starts_with, or_where_starts_with, where_not_starts_with, or_where_not_starts_with;
    Ew, "ew": where_ends_with, or_where_ends_with, where_not_ends_with, or_where_not_ends_with;
    Gt, "gt": where_greater_than, or_where_greater_than, where_not_greater_than, or_where_not_greater_than;
    Ge, "ge": where_greater_than_or_equal_to, or_where_greater_than_or_equal_to,
        where_not_greater_than_or_equal_to, or_where_not_greater_than_or_equal_to;
    Lt, "lt": where_less_than, or_where_less_than, where_not_less_than, or_where_not_less_than;
    Le, "le": where_less_than_or_equal_to, or_where_less_than_or_equal_to,
        where_not_less_than_or_equal_to, or_where_not_less_than_or_equal_to;
}
