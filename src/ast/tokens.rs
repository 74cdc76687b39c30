use std::fmt;

/// Reserved words of the query language.
///
/// Keywords are matched case-insensitively, so `table`, `Table` and `TABLE`
/// all produce [`Keyword::Table`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Keyword {
    Table,
    List,
    Task,
    /// Reserved for calendar views; rejected by the parser.
    Calendar,
    From,
    Where,
    Sort,
    Limit,
    And,
    Or,
    Not,
    Asc,
    Desc,
    As,
}

impl Keyword {
    /// Looks up a keyword from an identifier, ignoring case.
    pub fn lookup(ident: &str) -> Option<Keyword> {
        let keyword = match ident.to_ascii_uppercase().as_str() {
            "TABLE" => Keyword::Table,
            "LIST" => Keyword::List,
            "TASK" => Keyword::Task,
            "CALENDAR" => Keyword::Calendar,
            "FROM" => Keyword::From,
            "WHERE" => Keyword::Where,
            "SORT" => Keyword::Sort,
            "LIMIT" => Keyword::Limit,
            "AND" => Keyword::And,
            "OR" => Keyword::Or,
            "NOT" => Keyword::Not,
            "ASC" | "ASCENDING" => Keyword::Asc,
            "DESC" | "DESCENDING" => Keyword::Desc,
            "AS" => Keyword::As,
            _ => return None,
        };
        Some(keyword)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Keyword::Table => "TABLE",
            Keyword::List => "LIST",
            Keyword::Task => "TASK",
            Keyword::Calendar => "CALENDAR",
            Keyword::From => "FROM",
            Keyword::Where => "WHERE",
            Keyword::Sort => "SORT",
            Keyword::Limit => "LIMIT",
            Keyword::And => "AND",
            Keyword::Or => "OR",
            Keyword::Not => "NOT",
            Keyword::Asc => "ASC",
            Keyword::Desc => "DESC",
            Keyword::As => "AS",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    // Literals
    /// Floating-point number
    ///
    /// # Examples
    /// ```text
    /// 3.14
    /// -0.5
    /// ```
    Float(f64),

    /// Integer
    ///
    /// # Examples
    /// ```text
    /// 42
    /// -10
    /// ```
    Integer(i64),

    /// String literal enclosed in double (or single) quotes
    ///
    /// # Examples
    /// ```text
    /// "projects"
    /// "say \"hi\""
    /// ```
    String(String),

    /// Boolean values (`true`, `false`, any case)
    Boolean(bool),

    /// Null value
    Null,

    /// Tag literal, stored without the leading `#`
    ///
    /// # Examples
    /// ```text
    /// #project
    /// #area/health
    /// ```
    Tag(String),

    /// Wiki link literal, stored without the brackets
    ///
    /// # Examples
    /// ```text
    /// [[Weekly Review]]
    /// ```
    Link(String),

    // Identifiers and keywords
    /// Field or function name
    ///
    /// Must start with a letter or underscore, followed by letters, digits,
    /// underscores or hyphens. Dotted paths such as `file.name` are lexed as
    /// `Identifier`, `Dot`, `Identifier` and joined by the parser.
    Identifier(String),

    /// Reserved word
    Keyword(Keyword),

    // Comparison
    /// Equality operator (`=` or `==`)
    Eq,

    /// Inequality operator (`!=`)
    NotEq,

    /// Less than
    Lt,

    /// Greater than
    Gt,

    /// Less than or equal
    LtEq,

    /// Greater than or equal
    GtEq,

    /// Prefix negation (`!`), same meaning as `NOT`
    Bang,

    /// Negation marker for FROM sources (`-#tag`)
    Minus,

    // Delimiters
    /// Left parenthesis for grouping or function calls
    LParen,

    /// Right parenthesis
    RParen,

    /// Dot separating field path segments
    Dot,

    /// Comma separating fields, sort keys and arguments
    Comma,

    /// End of input
    Eof,
}

impl Token {
    /// Short human-readable description used in syntax errors.
    pub fn describe(&self) -> String {
        match self {
            Token::Float(n) => format!("number {}", n),
            Token::Integer(n) => format!("integer {}", n),
            Token::String(s) => format!("string \"{}\"", s),
            Token::Boolean(b) => format!("boolean {}", b),
            Token::Null => "null".to_string(),
            Token::Tag(t) => format!("tag #{}", t),
            Token::Link(l) => format!("link [[{}]]", l),
            Token::Identifier(name) => format!("identifier '{}'", name),
            Token::Keyword(k) => format!("keyword {}", k.as_str()),
            Token::Eof => "end of query".to_string(),
            other => format!("'{}'", other),
        }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Float(n) => write!(f, "{}", n),
            Token::Integer(n) => write!(f, "{}", n),
            Token::String(s) => write!(f, "\"{}\"", s),
            Token::Boolean(b) => write!(f, "{}", b),
            Token::Null => f.write_str("null"),
            Token::Tag(t) => write!(f, "#{}", t),
            Token::Link(l) => write!(f, "[[{}]]", l),
            Token::Identifier(name) => f.write_str(name),
            Token::Keyword(k) => f.write_str(k.as_str()),
            Token::Eq => f.write_str("="),
            Token::NotEq => f.write_str("!="),
            Token::Lt => f.write_str("<"),
            Token::Gt => f.write_str(">"),
            Token::LtEq => f.write_str("<="),
            Token::GtEq => f.write_str(">="),
            Token::Bang => f.write_str("!"),
            Token::Minus => f.write_str("-"),
            Token::LParen => f.write_str("("),
            Token::RParen => f.write_str(")"),
            Token::Dot => f.write_str("."),
            Token::Comma => f.write_str(","),
            Token::Eof => f.write_str("<eof>"),
        }
    }
}

/// Location of a token in the query source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Position {
    /// Character offset from the start of the query, zero-based
    pub offset: usize,
    /// Line number, one-based
    pub line: usize,
    /// Column number, one-based
    pub column: usize,
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}, column {}", self.line, self.column)
    }
}

/// A token together with the raw source text it was read from and its position.
#[derive(Debug, Clone, PartialEq)]
pub struct SpannedToken {
    pub token: Token,
    pub text: String,
    pub position: Position,
}
