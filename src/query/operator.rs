//! Filter operators and logical connectors.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

/// Attribute operators per RFC 7644 Section 3.4.2.2.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operator {
    /// Equal
    Eq,
    /// Not equal
    Ne,
    /// Contains
    Co,
    /// Starts with
    Sw,
    /// Ends with
    Ew,
    /// Present (has value)
    Pr,
    /// Greater than
    Gt,
    /// Greater than or equal
    Ge,
    /// Less than
    Lt,
    /// Less than or equal
    Le,
}

impl Operator {
    /// Every operator the directory understands, in keyword order.
    pub const ALL: [Operator; 10] = [
        Operator::Eq,
        Operator::Ne,
        Operator::Co,
        Operator::Sw,
        Operator::Ew,
        Operator::Pr,
        Operator::Gt,
        Operator::Ge,
        Operator::Lt,
        Operator::Le,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Operator::Eq => "eq",
            Operator::Ne => "ne",
            Operator::Co => "co",
            Operator::Sw => "sw",
            Operator::Ew => "ew",
            Operator::Pr => "pr",
            Operator::Gt => "gt",
            Operator::Ge => "ge",
            Operator::Lt => "lt",
            Operator::Le => "le",
        }
    }

    /// Case-insensitive keyword lookup.
    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|op| op.as_str().eq_ignore_ascii_case(s))
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown operator or connector keyword.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown keyword: '{0}'")]
pub struct UnknownKeyword(pub String);

impl FromStr for Operator {
    type Err = UnknownKeyword;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| UnknownKeyword(s.to_string()))
    }
}

/// Logical connector joining a clause to the one before it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Connector {
    #[default]
    And,
    Or,
}

impl Connector {
    pub fn as_str(&self) -> &'static str {
        match self {
            Connector::And => "and",
            Connector::Or => "or",
        }
    }
}

impl fmt::Display for Connector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Connector {
    type Err = UnknownKeyword;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("and") {
            Ok(Connector::And)
        } else if s.eq_ignore_ascii_case("or") {
            Ok(Connector::Or)
        } else {
            Err(UnknownKeyword(s.to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case("eq", Operator::Eq)]
    #[case("NE", Operator::Ne)]
    #[case("Co", Operator::Co)]
    #[case("sw", Operator::Sw)]
    #[case("ew", Operator::Ew)]
    #[case("pr", Operator::Pr)]
    #[case("gt", Operator::Gt)]
    #[case("GE", Operator::Ge)]
    #[case("lt", Operator::Lt)]
    #[case("le", Operator::Le)]
    fn test_parse_operator_case_insensitive(#[case] input: &str, #[case] expected: Operator) {
        assert_eq!(Operator::parse(input), Some(expected));
        assert_eq!(input.parse::<Operator>().unwrap(), expected);
    }

    #[test]
    fn test_parse_unknown_operator() {
        assert_eq!(Operator::parse("xx"), None);
        assert_eq!(Operator::parse("="), None);
        assert_eq!(Operator::parse(""), None);
        let err = "like".parse::<Operator>().unwrap_err();
        assert_eq!(err.to_string(), "unknown keyword: 'like'");
    }

    #[test]
    fn test_operator_display_round_trips_keyword() {
        for op in Operator::ALL {
            assert_eq!(Operator::parse(&op.to_string()), Some(op));
        }
    }

    #[test]
    fn test_connector_parse_and_display() {
        assert_eq!("AND".parse::<Connector>().unwrap(), Connector::And);
        assert_eq!("or".parse::<Connector>().unwrap(), Connector::Or);
        assert!("xor".parse::<Connector>().is_err());
        assert_eq!(Connector::default().to_string(), "and");
        assert_eq!(Connector::Or.to_string(), "or");
    }
}
