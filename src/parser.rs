use std::mem;

use crate::{
    ast::{
        CompareOp, Expr, Field, FieldPath, Keyword, Literal, Query, QueryType, SortDirection,
        SortKey, Source, SpannedToken, Token,
    },
    error::SyntaxError,
    lexer::Lexer,
};

pub struct Parser {
    lexer: Lexer,
    current: SpannedToken,
}

/// Parses a complete query from source text.
///
/// # Examples
///
/// ```
/// use noteql::ast::QueryType;
///
/// let query = noteql::parse_query("LIST FROM #project SORT file.name").unwrap();
/// assert_eq!(query.query_type, QueryType::List);
/// assert_eq!(query.sort.len(), 1);
/// ```
pub fn parse_query(source: &str) -> Result<Query, SyntaxError> {
    Parser::new(Lexer::new(source))?.parse_query()
}

impl Parser {
    pub fn new(mut lexer: Lexer) -> Result<Self, SyntaxError> {
        let current = lexer.next_spanned()?;
        Ok(Parser { lexer, current })
    }

    fn advance(&mut self) -> Result<(), SyntaxError> {
        self.current = self.lexer.next_spanned()?;
        Ok(())
    }

    fn check(&self, token: &Token) -> bool {
        mem::discriminant(&self.current.token) == mem::discriminant(token)
    }

    fn check_keyword(&self, keyword: Keyword) -> bool {
        self.current.token == Token::Keyword(keyword)
    }

    fn error_expected(&self, expected: &[&str]) -> SyntaxError {
        SyntaxError::expected(expected, self.current.token.describe(), self.current.position)
    }

    fn expect(&mut self, expected: Token, name: &str) -> Result<(), SyntaxError> {
        if !self.check(&expected) {
            return Err(self.error_expected(&[name]));
        }
        self.advance()
    }

    /// True when the current token ends a field list: a clause keyword or the end.
    fn at_clause_boundary(&self) -> bool {
        matches!(
            self.current.token,
            Token::Eof
                | Token::Keyword(Keyword::From | Keyword::Where | Keyword::Sort | Keyword::Limit)
        )
    }

    /// Parse a complete query
    pub fn parse_query(&mut self) -> Result<Query, SyntaxError> {
        let query_type = match &self.current.token {
            Token::Keyword(Keyword::Table) => QueryType::Table,
            Token::Keyword(Keyword::List) => QueryType::List,
            Token::Keyword(Keyword::Task) => QueryType::Task,
            Token::Keyword(Keyword::Calendar) => {
                let mut err =
                    SyntaxError::new("CALENDAR queries are not supported", self.current.position);
                err.expected = vec!["TABLE".into(), "LIST".into(), "TASK".into()];
                err.found = Some("CALENDAR".into());
                return Err(err);
            }
            _ => return Err(self.error_expected(&["TABLE", "LIST", "TASK"])),
        };
        self.advance()?;

        let fields = match query_type {
            QueryType::Table if !self.at_clause_boundary() => self.parse_field_list()?,
            QueryType::Table => Vec::new(),
            _ if !self.at_clause_boundary() => {
                let mut err = SyntaxError::new(
                    format!("{} queries do not accept a field list", query_type),
                    self.current.position,
                );
                err.expected = vec!["FROM".into(), "WHERE".into(), "SORT".into(), "LIMIT".into()];
                err.found = Some(self.current.token.describe());
                return Err(err);
            }
            _ => Vec::new(),
        };

        let from = if self.check_keyword(Keyword::From) {
            self.advance()?;
            Some(self.parse_source_or()?)
        } else {
            None
        };

        let filter = if self.check_keyword(Keyword::Where) {
            self.advance()?;
            Some(self.parse_expression()?)
        } else {
            None
        };

        let sort = if self.check_keyword(Keyword::Sort) {
            self.advance()?;
            self.parse_sort_keys()?
        } else {
            Vec::new()
        };

        let limit = if self.check_keyword(Keyword::Limit) {
            self.advance()?;
            Some(self.parse_limit()?)
        } else {
            None
        };

        if !self.check(&Token::Eof) {
            return Err(self.error_expected(&["end of query"]));
        }

        Ok(Query {
            query_type,
            fields,
            from,
            filter,
            sort,
            limit,
        })
    }

    fn parse_field_list(&mut self) -> Result<Vec<Field>, SyntaxError> {
        let mut fields = vec![];
        loop {
            let expr = self.parse_expression()?;
            let alias = if self.check_keyword(Keyword::As) {
                self.advance()?;
                match mem::replace(&mut self.current.token, Token::Eof) {
                    Token::Identifier(name) | Token::String(name) => {
                        self.advance()?;
                        Some(name)
                    }
                    other => {
                        self.current.token = other;
                        return Err(self.error_expected(&["alias"]));
                    }
                }
            } else {
                None
            };
            fields.push(Field { expr, alias });

            if self.check(&Token::Comma) {
                self.advance()?;
            } else {
                return Ok(fields);
            }
        }
    }

    fn parse_sort_keys(&mut self) -> Result<Vec<SortKey>, SyntaxError> {
        let mut keys = vec![];
        loop {
            let expr = self.parse_expression()?;
            let direction = if self.check_keyword(Keyword::Asc) {
                self.advance()?;
                SortDirection::Asc
            } else if self.check_keyword(Keyword::Desc) {
                self.advance()?;
                SortDirection::Desc
            } else {
                SortDirection::Asc
            };
            keys.push(SortKey { expr, direction });

            if self.check(&Token::Comma) {
                self.advance()?;
            } else {
                return Ok(keys);
            }
        }
    }

    fn parse_limit(&mut self) -> Result<usize, SyntaxError> {
        match self.current.token {
            Token::Integer(n) if n > 0 => {
                self.advance()?;
                usize::try_from(n).map_err(|_| self.error_expected(&["positive integer"]))
            }
            _ => Err(self.error_expected(&["positive integer"])),
        }
    }

    // FROM sources: OR < AND < negation < primary

    fn parse_source_or(&mut self) -> Result<Source, SyntaxError> {
        let mut left = self.parse_source_and()?;

        while self.check_keyword(Keyword::Or) {
            self.advance()?;
            let right = self.parse_source_and()?;
            left = Source::Or(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_source_and(&mut self) -> Result<Source, SyntaxError> {
        let mut left = self.parse_source_unary()?;

        while self.check_keyword(Keyword::And) {
            self.advance()?;
            let right = self.parse_source_unary()?;
            left = Source::And(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_source_unary(&mut self) -> Result<Source, SyntaxError> {
        if self.check(&Token::Minus) || self.check_keyword(Keyword::Not) {
            self.advance()?;
            let inner = self.parse_source_unary()?;
            return Ok(Source::Not(Box::new(inner)));
        }

        match mem::replace(&mut self.current.token, Token::Eof) {
            Token::String(path) => {
                self.advance()?;
                Ok(Source::Folder(path.trim_end_matches('/').to_string()))
            }
            Token::Tag(tag) => {
                self.advance()?;
                Ok(Source::Tag(tag))
            }
            Token::Link(target) => {
                self.advance()?;
                Ok(Source::Link(target))
            }
            Token::LParen => {
                self.advance()?;
                let source = self.parse_source_or()?;
                self.expect(Token::RParen, "')'")?;
                Ok(source)
            }
            other => {
                self.current.token = other;
                Err(self.error_expected(&["folder string", "#tag", "[[link]]"]))
            }
        }
    }

    // Expressions: OR < AND < NOT < comparison < atoms

    pub fn parse_expression(&mut self) -> Result<Expr, SyntaxError> {
        self.parse_or()
    }

    /// Parses a standalone expression that must span the whole input.
    pub fn parse(&mut self) -> Result<Expr, SyntaxError> {
        let expr = self.parse_expression()?;
        self.expect(Token::Eof, "end of expression")?;
        Ok(expr)
    }

    fn parse_or(&mut self) -> Result<Expr, SyntaxError> {
        let mut left = self.parse_and()?;

        while self.check_keyword(Keyword::Or) {
            self.advance()?;
            let right = self.parse_and()?;
            left = Expr::or(left, right);
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> Result<Expr, SyntaxError> {
        let mut left = self.parse_not()?;

        while self.check_keyword(Keyword::And) {
            self.advance()?;
            let right = self.parse_not()?;
            left = Expr::and(left, right);
        }
        Ok(left)
    }

    fn parse_not(&mut self) -> Result<Expr, SyntaxError> {
        if self.check_keyword(Keyword::Not) || self.check(&Token::Bang) {
            self.advance()?;
            let operand = self.parse_not()?;
            return Ok(Expr::not(operand));
        }
        self.parse_comparison()
    }

    fn parse_comparison(&mut self) -> Result<Expr, SyntaxError> {
        let left = self.parse_primary()?;

        let op = match &self.current.token {
            Token::Eq => CompareOp::Equal,
            Token::NotEq => CompareOp::NotEqual,
            Token::Lt => CompareOp::LessThan,
            Token::Gt => CompareOp::GreaterThan,
            Token::LtEq => CompareOp::LessEqual,
            Token::GtEq => CompareOp::GreaterEqual,
            _ => return Ok(left),
        };
        self.advance()?;
        let right = self.parse_primary()?;

        Ok(Expr::compare(op, left, right))
    }

    /// Parse primary expressions (atoms): literals, field paths, calls, '(' expr ')'
    fn parse_primary(&mut self) -> Result<Expr, SyntaxError> {
        match mem::replace(&mut self.current.token, Token::Eof) {
            Token::Float(n) => {
                self.advance()?;
                Ok(Expr::Literal(Literal::Float(n)))
            }
            Token::Integer(n) => {
                self.advance()?;
                Ok(Expr::Literal(Literal::Integer(n)))
            }
            Token::String(s) => {
                self.advance()?;
                Ok(Expr::Literal(Literal::String(s)))
            }
            Token::Boolean(b) => {
                self.advance()?;
                Ok(Expr::Literal(Literal::Boolean(b)))
            }
            Token::Null => {
                self.advance()?;
                Ok(Expr::Literal(Literal::Null))
            }
            // Tags and links compare against `file.tags` / `file.link` text
            Token::Tag(tag) => {
                self.advance()?;
                Ok(Expr::Literal(Literal::String(format!("#{}", tag))))
            }
            Token::Link(target) => {
                self.advance()?;
                Ok(Expr::Literal(Literal::String(format!("[[{}]]", target))))
            }
            Token::LParen => {
                self.advance()?;
                let expr = self.parse_expression()?;
                self.expect(Token::RParen, "')'")?;
                Ok(expr)
            }
            Token::Identifier(name) => {
                self.advance()?;
                if self.check(&Token::LParen) {
                    self.advance()?;
                    let args = self.parse_arguments()?;
                    return Ok(Expr::Call { name, args });
                }
                self.parse_field_path(name)
            }
            other => {
                self.current.token = other;
                Err(self.error_expected(&["expression"]))
            }
        }
    }

    fn parse_field_path(&mut self, head: String) -> Result<Expr, SyntaxError> {
        let mut segments = vec![head];

        while self.check(&Token::Dot) {
            self.advance()?;
            match mem::replace(&mut self.current.token, Token::Eof) {
                Token::Identifier(name) => {
                    segments.push(name);
                    self.advance()?;
                }
                other => {
                    self.current.token = other;
                    return Err(self.error_expected(&["field name after '.'"]));
                }
            }
        }

        if self.check(&Token::LParen) {
            let mut err = SyntaxError::new(
                format!(
                    "Only plain function names can be called, found '{}'",
                    segments.join(".")
                ),
                self.current.position,
            );
            err.found = Some("'('".into());
            return Err(err);
        }

        Ok(Expr::Field(FieldPath::new(segments)))
    }

    /// Arguments after the opening parenthesis, through the closing one.
    fn parse_arguments(&mut self) -> Result<Vec<Expr>, SyntaxError> {
        let mut args = vec![];

        if self.check(&Token::RParen) {
            self.advance()?;
            return Ok(args);
        }

        loop {
            args.push(self.parse_expression()?);
            if self.check(&Token::Comma) {
                self.advance()?;
            } else {
                self.expect(Token::RParen, "')'")?;
                return Ok(args);
            }
        }
    }
}
