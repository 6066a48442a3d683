//! Compiles condition trees into filter expressions and query objects.
//!
//! The filter dialect is the RFC 7644 Section 3.4.2.2 subset the directory
//! understands:
//!
//! ```text
//! name eq "Joe" and (age gt 21 or not (mail pr))
//! ```

use std::fmt;

use super::{
    builder::{Builder, Where},
    compiled::{CompiledQuery, SEARCH_SCOPE_WHOLE_SUBTREE},
    operator::{Connector, Operator},
    value::FilterValue,
};

/// Turns a [`Builder`] into the strings a directory understands.
///
/// Every method has a default; provider grammars override only what differs.
pub trait Grammar: fmt::Debug + Send + Sync {
    /// The full query object for `query`.
    fn compile(&self, query: &Builder) -> CompiledQuery {
        compile_query(self, query)
    }

    /// The filter expression for a list of conditions.
    fn compile_wheres(&self, wheres: &[Where]) -> String {
        if wheres.is_empty() {
            return String::new();
        }

        let clauses: Vec<String> = wheres
            .iter()
            .map(|node| format!("{} {}", node.connector(), self.compile_where(node)))
            .collect();
        let joined = clauses.join(" ");
        let filter = remove_leading_connector(&joined);

        // A lone positive set-membership group is the only clause whose
        // parentheses were added by expansion rather than asked for.
        match wheres {
            [Where::In { negate: false, .. }] => trim_redundant_parentheses(filter).to_string(),
            _ => filter.to_string(),
        }
    }

    /// The clause for one node, without its connector.
    fn compile_where(&self, node: &Where) -> String {
        match node {
            Where::Basic {
                attribute,
                operator,
                value,
                negate,
                ..
            } => self.where_basic(attribute, *operator, value, *negate),
            Where::Present {
                attribute, negate, ..
            } => self.where_present(attribute, *negate),
            Where::In {
                attribute,
                values,
                negate,
                ..
            } => self.where_in(attribute, values, *negate),
            Where::Raw { expression, .. } => expression.clone(),
            Where::Nested { wheres, negate, .. } => self.where_nested(wheres, *negate),
        }
    }

    fn where_basic(
        &self,
        attribute: &str,
        operator: Operator,
        value: &FilterValue,
        negate: bool,
    ) -> String {
        wrap_expression(
            &format!("{} {} {}", attribute, operator, value),
            negate,
            false,
        )
    }

    fn where_present(&self, attribute: &str, negate: bool) -> String {
        wrap_expression(&format!("{} pr", attribute), negate, false)
    }

    /// Expands set membership into `eq` clauses joined by `or` (by `and` when
    /// negated). An empty set becomes a group that never matches.
    fn where_in(&self, attribute: &str, values: &[FilterValue], negate: bool) -> String {
        let inner = if values.is_empty() {
            format!("{attribute} pr and not ({attribute} pr)")
        } else {
            let connector = if negate { Connector::And } else { Connector::Or };
            let expanded: Vec<Where> = values
                .iter()
                .map(|value| Where::Basic {
                    attribute: attribute.to_string(),
                    operator: Operator::Eq,
                    value: value.clone(),
                    connector,
                    negate: false,
                })
                .collect();
            self.compile_wheres(&expanded)
        };
        wrap_expression(&inner, negate, true)
    }

    fn where_nested(&self, wheres: &[Where], negate: bool) -> String {
        wrap_expression(&self.compile_wheres(wheres), negate, true)
    }

    /// The comma-separated projection list.
    fn compile_attributes(&self, attributes: &[String]) -> String {
        attributes.join(",")
    }
}

/// The offset-based query object shared by grammars that only change the
/// filter dialect.
pub fn compile_query<G: Grammar + ?Sized>(grammar: &G, query: &Builder) -> CompiledQuery {
    CompiledQuery {
        filter: grammar.compile_wheres(query.wheres()),
        include_attributes: grammar.compile_attributes(query.attributes()),
        limit: Some(query.limit_value()),
        offset: Some(query.offset_value()),
        search_scope: None,
        cursor: None,
    }
}

/// `not (expression)` when negated, `(expression)` when wrapped.
pub fn wrap_expression(expression: &str, negate: bool, wrap: bool) -> String {
    if negate {
        format!("not ({})", expression)
    } else if wrap {
        format!("({})", expression)
    } else {
        expression.to_string()
    }
}

fn remove_leading_connector(filter: &str) -> &str {
    for connector in [Connector::And, Connector::Or] {
        let keyword = connector.as_str();
        if let Some(prefix) = filter.get(..keyword.len() + 1)
            && prefix[..keyword.len()].eq_ignore_ascii_case(keyword)
            && prefix.ends_with(' ')
        {
            return &filter[keyword.len() + 1..];
        }
    }
    filter
}

fn trim_redundant_parentheses(filter: &str) -> &str {
    filter
        .strip_prefix('(')
        .and_then(|rest| rest.strip_suffix(')'))
        .unwrap_or(filter)
}

/// The standard SCIM dialect: offset paging, every attribute by default.
#[derive(Debug, Clone, Copy, Default)]
pub struct ScimGrammar;

impl Grammar for ScimGrammar {}

/// PingDirectory's REST API: no offsets, searches span the whole subtree.
#[derive(Debug, Clone, Copy, Default)]
pub struct PingDirectoryGrammar;

impl Grammar for PingDirectoryGrammar {
    fn compile(&self, query: &Builder) -> CompiledQuery {
        CompiledQuery {
            offset: None,
            search_scope: Some(SEARCH_SCOPE_WHOLE_SUBTREE.to_string()),
            ..compile_query(self, query)
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
