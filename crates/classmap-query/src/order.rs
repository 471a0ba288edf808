//! Order-by parsing and in-memory result ordering.

use std::cmp::Ordering;

use classmap_core::{Error, Result, Row, Value};

/// One ordering term: a property name and a direction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderTerm {
    /// Property (or column) name to order on.
    pub property: String,
    /// Whether this term sorts descending.
    pub descending: bool,
}

/// A parsed order-by clause such as `"Name DESC, Age"`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct OrderClause {
    terms: Vec<OrderTerm>,
}

impl OrderClause {
    /// Parse a comma-separated clause. Each term is a property name followed
    /// by an optional `ASC` or `DESC` (case-insensitive).
    pub fn parse(source: &str) -> Result<Self> {
        let mut terms = Vec::new();
        for part in source.split(',') {
            let part = part.trim();
            if part.is_empty() {
                return Err(Error::Expression(format!(
                    "empty term in order clause '{source}'"
                )));
            }
            let mut words = part.split_whitespace();
            let property = words
                .next()
                .ok_or_else(|| {
                    Error::Expression(format!("empty term in order clause '{source}'"))
                })?
                .to_string();
            let descending = match words.next() {
                None => false,
                Some(word) if word.eq_ignore_ascii_case("ASC") => false,
                Some(word) if word.eq_ignore_ascii_case("DESC") => true,
                Some(word) => {
                    return Err(Error::Expression(format!(
                        "unexpected '{word}' in order clause '{source}'"
                    )))
                }
            };
            if words.next().is_some() {
                return Err(Error::Expression(format!(
                    "trailing words in order clause '{source}'"
                )));
            }
            terms.push(OrderTerm {
                property,
                descending,
            });
        }
        if terms.is_empty() {
            return Err(Error::Expression("empty order clause".to_string()));
        }
        Ok(Self { terms })
    }

    /// The ordering terms, first term most significant.
    #[must_use]
    pub fn terms(&self) -> &[OrderTerm] {
        &self.terms
    }

    /// Compare two items through a value accessor, applying each term in
    /// turn. NULL orders before any non-null value.
    pub fn compare_with<T, F>(&self, a: &T, b: &T, get: F) -> Ordering
    where
        F: Fn(&T, &str) -> Value,
    {
        for term in &self.terms {
            let ordering = get(a, &term.property).compare(&get(b, &term.property));
            let ordering = if term.descending {
                ordering.reverse()
            } else {
                ordering
            };
            if ordering != Ordering::Equal {
                return ordering;
            }
        }
        Ordering::Equal
    }

    /// Sort rows in place by this clause. A missing column reads as NULL.
    pub fn sort_rows(&self, rows: &mut [Row]) {
        rows.sort_by(|a, b| {
            self.compare_with(a, b, |row, name| {
                row.get(name).cloned().unwrap_or(Value::Null)
            })
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(name: &str, age: Value) -> Row {
        Row::from_pairs(vec![
            ("Name".to_string(), Value::Text(name.to_string())),
            ("Age".to_string(), age),
        ])
    }

    #[test]
    fn test_parse_directions() {
        let clause = OrderClause::parse("Name DESC, Age").unwrap();
        assert_eq!(
            clause.terms(),
            &[
                OrderTerm {
                    property: "Name".to_string(),
                    descending: true
                },
                OrderTerm {
                    property: "Age".to_string(),
                    descending: false
                },
            ]
        );
        assert!(OrderClause::parse("Name SIDEWAYS").is_err());
        assert!(OrderClause::parse("").is_err());
        assert!(OrderClause::parse("Name,, Age").is_err());
    }

    #[test]
    fn test_sort_rows_ascending_then_secondary() {
        let mut rows = vec![
            row("Bob", Value::Int(40)),
            row("Alice", Value::Int(30)),
            row("Bob", Value::Int(20)),
        ];
        OrderClause::parse("Name, Age").unwrap().sort_rows(&mut rows);
        let ages: Vec<_> = rows.iter().map(|r| r.get("Age").cloned()).collect();
        assert_eq!(
            ages,
            vec![
                Some(Value::Int(30)),
                Some(Value::Int(20)),
                Some(Value::Int(40))
            ]
        );
    }

    #[test]
    fn test_sort_rows_descending() {
        let mut rows = vec![
            row("Alice", Value::Int(30)),
            row("Carol", Value::Int(50)),
            row("Bob", Value::Int(40)),
        ];
        OrderClause::parse("Name DESC").unwrap().sort_rows(&mut rows);
        let names: Vec<_> = rows
            .iter()
            .map(|r| r.get("Name").and_then(|v| v.as_str().map(String::from)))
            .collect();
        assert_eq!(
            names,
            vec![
                Some("Carol".to_string()),
                Some("Bob".to_string()),
                Some("Alice".to_string())
            ]
        );
    }

    #[test]
    fn test_null_sorts_low() {
        let mut rows = vec![row("Bob", Value::Int(40)), row("Nell", Value::Null)];
        OrderClause::parse("Age").unwrap().sort_rows(&mut rows);
        assert_eq!(rows[0].get("Age"), Some(&Value::Null));
    }
}
