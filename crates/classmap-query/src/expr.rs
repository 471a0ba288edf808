//! Criteria expressions: a small tree of comparisons combined with AND/OR,
//! parsed from strings such as `"Name = 'Bob' AND Age >= 21"` and rendered
//! into parameterized SQL against a class definition.

use std::fmt;

use classmap_core::{
    ClassDefinition, Error, MetadataRegistry, ParameterNameGenerator, Result, SqlStatement, Value,
};

/// Comparison operators understood by the criteria parser.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Equal,
    NotEqual,
    LessThan,
    LessOrEqual,
    GreaterThan,
    GreaterOrEqual,
    Like,
    NotLike,
    In,
    NotIn,
}

impl Operator {
    /// The SQL spelling of the operator.
    #[must_use]
    pub fn sql(self) -> &'static str {
        match self {
            Operator::Equal => "=",
            Operator::NotEqual => "<>",
            Operator::LessThan => "<",
            Operator::LessOrEqual => "<=",
            Operator::GreaterThan => ">",
            Operator::GreaterOrEqual => ">=",
            Operator::Like => "LIKE",
            Operator::NotLike => "NOT LIKE",
            Operator::In => "IN",
            Operator::NotIn => "NOT IN",
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.sql())
    }
}

/// One node of a criteria tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    /// Compare a property (possibly a dotted relationship path) to a value.
    Compare {
        property: String,
        op: Operator,
        value: Value,
    },
    /// Membership test against a literal list.
    CompareSet {
        property: String,
        negated: bool,
        values: Vec<Value>,
    },
    /// Both sides must hold.
    And(Box<Expression>, Box<Expression>),
    /// Either side must hold.
    Or(Box<Expression>, Box<Expression>),
    /// A raw SQL fragment spliced in verbatim.
    Raw(String),
}

impl Expression {
    /// Convenience constructor for an equality comparison.
    #[must_use]
    pub fn eq(property: impl Into<String>, value: Value) -> Self {
        Expression::Compare {
            property: property.into(),
            op: Operator::Equal,
            value,
        }
    }

    /// Combine with another expression using AND.
    #[must_use]
    pub fn and(self, other: Expression) -> Self {
        Expression::And(Box::new(self), Box::new(other))
    }

    /// Combine with another expression using OR.
    #[must_use]
    pub fn or(self, other: Expression) -> Self {
        Expression::Or(Box::new(self), Box::new(other))
    }

    /// Render this expression as a parameterized WHERE fragment against
    /// `class`, mapping property names to delimited database fields.
    ///
    /// NULL comparison values render as `IS NULL` / `IS NOT NULL` instead of
    /// a parameter.
    pub fn render(
        &self,
        class: &ClassDefinition,
        registry: &MetadataRegistry,
        generator: &mut ParameterNameGenerator,
    ) -> Result<SqlStatement> {
        let mut statement = SqlStatement::new();
        self.render_into(class, registry, generator, &mut statement)?;
        Ok(statement)
    }

    fn render_into(
        &self,
        class: &ClassDefinition,
        registry: &MetadataRegistry,
        generator: &mut ParameterNameGenerator,
        statement: &mut SqlStatement,
    ) -> Result<()> {
        match self {
            Expression::Compare {
                property,
                op,
                value,
            } => {
                let def = class.resolve_property_path(registry, property)?;
                let field = format!("\"{}\"", def.field());
                if value.is_null() {
                    match op {
                        Operator::Equal => statement.push(&format!("{field} IS NULL")),
                        Operator::NotEqual => statement.push(&format!("{field} IS NOT NULL")),
                        _ => {
                            return Err(Error::Expression(format!(
                                "operator '{op}' cannot compare against NULL"
                            )))
                        }
                    }
                    return Ok(());
                }
                statement.push(&format!("{field} {op} "));
                statement.push_parameter(generator, value.clone());
            }
            Expression::CompareSet {
                property,
                negated,
                values,
            } => {
                if values.is_empty() {
                    return Err(Error::Expression(
                        "IN requires at least one value".to_string(),
                    ));
                }
                let def = class.resolve_property_path(registry, property)?;
                let keyword = if *negated { "NOT IN" } else { "IN" };
                statement.push(&format!("\"{}\" {keyword} (", def.field()));
                for (i, value) in values.iter().enumerate() {
                    if i > 0 {
                        statement.push(", ");
                    }
                    statement.push_parameter(generator, value.clone());
                }
                statement.push(")");
            }
            Expression::And(left, right) => {
                statement.push("(");
                left.render_into(class, registry, generator, statement)?;
                statement.push(" AND ");
                right.render_into(class, registry, generator, statement)?;
                statement.push(")");
            }
            Expression::Or(left, right) => {
                statement.push("(");
                left.render_into(class, registry, generator, statement)?;
                statement.push(" OR ");
                right.render_into(class, registry, generator, statement)?;
                statement.push(")");
            }
            Expression::Raw(sql) => statement.push(sql),
        }
        Ok(())
    }
}

// ----------------------------------------------------------------------
// Parsing
// ----------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Ident(String),
    Literal(Value),
    Symbol(&'static str),
}

struct Tokenizer<'a> {
    chars: std::iter::Peekable<std::str::Chars<'a>>,
}

impl<'a> Tokenizer<'a> {
    fn new(source: &'a str) -> Self {
        Self {
            chars: source.chars().peekable(),
        }
    }

    fn tokenize(mut self) -> Result<Vec<Token>> {
        let mut tokens = Vec::new();
        while let Some(&c) = self.chars.peek() {
            match c {
                c if c.is_whitespace() => {
                    self.chars.next();
                }
                '\'' => tokens.push(self.string_literal()?),
                '(' => {
                    self.chars.next();
                    tokens.push(Token::Symbol("("));
                }
                ')' => {
                    self.chars.next();
                    tokens.push(Token::Symbol(")"));
                }
                ',' => {
                    self.chars.next();
                    tokens.push(Token::Symbol(","));
                }
                '=' => {
                    self.chars.next();
                    tokens.push(Token::Symbol("="));
                }
                '<' => {
                    self.chars.next();
                    match self.chars.peek() {
                        Some('=') => {
                            self.chars.next();
                            tokens.push(Token::Symbol("<="));
                        }
                        Some('>') => {
                            self.chars.next();
                            tokens.push(Token::Symbol("<>"));
                        }
                        _ => tokens.push(Token::Symbol("<")),
                    }
                }
                '>' => {
                    self.chars.next();
                    if self.chars.peek() == Some(&'=') {
                        self.chars.next();
                        tokens.push(Token::Symbol(">="));
                    } else {
                        tokens.push(Token::Symbol(">"));
                    }
                }
                '!' => {
                    self.chars.next();
                    if self.chars.peek() == Some(&'=') {
                        self.chars.next();
                        tokens.push(Token::Symbol("<>"));
                    } else {
                        return Err(Error::Expression(
                            "unexpected '!' in criteria".to_string(),
                        ));
                    }
                }
                c if c.is_ascii_digit() || c == '-' => tokens.push(self.number_literal()?),
                c if c.is_alphanumeric() || c == '_' => tokens.push(self.word()),
                other => {
                    return Err(Error::Expression(format!(
                        "unexpected character '{other}' in criteria"
                    )))
                }
            }
        }
        Ok(tokens)
    }

    // A quoted string; '' escapes a single quote.
    fn string_literal(&mut self) -> Result<Token> {
        self.chars.next();
        let mut text = String::new();
        loop {
            match self.chars.next() {
                Some('\'') => {
                    if self.chars.peek() == Some(&'\'') {
                        self.chars.next();
                        text.push('\'');
                    } else {
                        return Ok(Token::Literal(Value::Text(text)));
                    }
                }
                Some(c) => text.push(c),
                None => {
                    return Err(Error::Expression(
                        "unterminated string literal in criteria".to_string(),
                    ))
                }
            }
        }
    }

    fn number_literal(&mut self) -> Result<Token> {
        let mut text = String::new();
        if self.chars.peek() == Some(&'-') {
            text.push('-');
            self.chars.next();
        }
        while let Some(&c) = self.chars.peek() {
            if c.is_ascii_digit() || c == '.' {
                text.push(c);
                self.chars.next();
            } else {
                break;
            }
        }
        if text.contains('.') {
            Ok(Token::Literal(Value::Decimal(text)))
        } else {
            let i = text
                .parse::<i64>()
                .map_err(|_| Error::Expression(format!("invalid number '{text}' in criteria")))?;
            Ok(Token::Literal(Value::Int(i)))
        }
    }

    fn word(&mut self) -> Token {
        let mut text = String::new();
        while let Some(&c) = self.chars.peek() {
            if c.is_alphanumeric() || c == '_' || c == '.' {
                text.push(c);
                self.chars.next();
            } else {
                break;
            }
        }
        match text.to_ascii_uppercase().as_str() {
            "NULL" => Token::Literal(Value::Null),
            "TRUE" => Token::Literal(Value::Bool(true)),
            "FALSE" => Token::Literal(Value::Bool(false)),
            _ => Token::Ident(text),
        }
    }
}

struct Parser {
    tokens: Vec<Token>,
    position: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.position)
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.position).cloned();
        if token.is_some() {
            self.position += 1;
        }
        token
    }

    fn keyword(&self, word: &str) -> bool {
        matches!(self.peek(), Some(Token::Ident(w)) if w.eq_ignore_ascii_case(word))
    }

    // OR binds loosest.
    fn parse_or(&mut self) -> Result<Expression> {
        let mut left = self.parse_and()?;
        while self.keyword("OR") {
            self.next();
            let right = self.parse_and()?;
            left = left.or(right);
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> Result<Expression> {
        let mut left = self.parse_primary()?;
        while self.keyword("AND") {
            self.next();
            let right = self.parse_primary()?;
            left = left.and(right);
        }
        Ok(left)
    }

    fn parse_primary(&mut self) -> Result<Expression> {
        if self.peek() == Some(&Token::Symbol("(")) {
            self.next();
            let inner = self.parse_or()?;
            if self.next() != Some(Token::Symbol(")")) {
                return Err(Error::Expression(
                    "expected ')' in criteria".to_string(),
                ));
            }
            return Ok(inner);
        }
        self.parse_comparison()
    }

    fn parse_comparison(&mut self) -> Result<Expression> {
        let property = match self.next() {
            Some(Token::Ident(name)) => name,
            other => {
                return Err(Error::Expression(format!(
                    "expected a property name in criteria, found {other:?}"
                )))
            }
        };
        let (op, negated_set) = self.parse_operator()?;
        match op {
            None => self.parse_set(property, negated_set),
            Some(op) => {
                let value = match self.next() {
                    Some(Token::Literal(value)) => value,
                    other => {
                        return Err(Error::Expression(format!(
                            "expected a literal value in criteria, found {other:?}"
                        )))
                    }
                };
                Ok(Expression::Compare {
                    property,
                    op,
                    value,
                })
            }
        }
    }

    // Returns Some(op) for a scalar comparison, None for IN / NOT IN with
    // the negation flag.
    fn parse_operator(&mut self) -> Result<(Option<Operator>, bool)> {
        match self.next() {
            Some(Token::Symbol("=")) => Ok((Some(Operator::Equal), false)),
            Some(Token::Symbol("<>")) => Ok((Some(Operator::NotEqual), false)),
            Some(Token::Symbol("<")) => Ok((Some(Operator::LessThan), false)),
            Some(Token::Symbol("<=")) => Ok((Some(Operator::LessOrEqual), false)),
            Some(Token::Symbol(">")) => Ok((Some(Operator::GreaterThan), false)),
            Some(Token::Symbol(">=")) => Ok((Some(Operator::GreaterOrEqual), false)),
            Some(Token::Ident(word)) if word.eq_ignore_ascii_case("LIKE") => {
                Ok((Some(Operator::Like), false))
            }
            Some(Token::Ident(word)) if word.eq_ignore_ascii_case("IS") => {
                if self.keyword("NOT") {
                    self.next();
                    Ok((Some(Operator::NotEqual), false))
                } else {
                    Ok((Some(Operator::Equal), false))
                }
            }
            Some(Token::Ident(word)) if word.eq_ignore_ascii_case("IN") => Ok((None, false)),
            Some(Token::Ident(word)) if word.eq_ignore_ascii_case("NOT") => {
                match self.next() {
                    Some(Token::Ident(w)) if w.eq_ignore_ascii_case("LIKE") => {
                        Ok((Some(Operator::NotLike), false))
                    }
                    Some(Token::Ident(w)) if w.eq_ignore_ascii_case("IN") => Ok((None, true)),
                    other => Err(Error::Expression(format!(
                        "expected LIKE or IN after NOT, found {other:?}"
                    ))),
                }
            }
            other => Err(Error::Expression(format!(
                "expected a comparison operator in criteria, found {other:?}"
            ))),
        }
    }

    fn parse_set(&mut self, property: String, negated: bool) -> Result<Expression> {
        if self.next() != Some(Token::Symbol("(")) {
            return Err(Error::Expression(
                "expected '(' after IN in criteria".to_string(),
            ));
        }
        let mut values = Vec::new();
        loop {
            match self.next() {
                Some(Token::Literal(value)) => values.push(value),
                other => {
                    return Err(Error::Expression(format!(
                        "expected a literal value in IN list, found {other:?}"
                    )))
                }
            }
            match self.next() {
                Some(Token::Symbol(",")) => continue,
                Some(Token::Symbol(")")) => break,
                other => {
                    return Err(Error::Expression(format!(
                        "expected ',' or ')' in IN list, found {other:?}"
                    )))
                }
            }
        }
        Ok(Expression::CompareSet {
            property,
            negated,
            values,
        })
    }
}

/// Parse a criteria string such as `"Name = 'Bob' AND Age >= 21"` into an
/// expression tree. AND binds tighter than OR; parentheses group.
pub fn parse_criteria(source: &str) -> Result<Expression> {
    let tokens = Tokenizer::new(source).tokenize()?;
    if tokens.is_empty() {
        return Err(Error::Expression("empty criteria string".to_string()));
    }
    let mut parser = Parser {
        tokens,
        position: 0,
    };
    let expression = parser.parse_or()?;
    if parser.peek().is_some() {
        return Err(Error::Expression(format!(
            "trailing tokens after criteria: {:?}",
            &parser.tokens[parser.position..]
        )));
    }
    Ok(expression)
}
