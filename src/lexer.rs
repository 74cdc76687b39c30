use crate::ast::{Keyword, Position, SpannedToken, Token};
use crate::error::SyntaxError;

pub struct Lexer {
    input: Vec<char>,
    position: usize,
    line: usize,
    column: usize,
}

impl Lexer {
    pub fn new(input: &str) -> Self {
        Lexer {
            input: input.chars().collect(),
            position: 0,
            line: 1,
            column: 1,
        }
    }

    fn current_char(&self) -> Option<char> {
        self.input.get(self.position).copied()
    }

    fn peek_char(&self, offset: usize) -> Option<char> {
        self.input.get(self.position + offset).copied()
    }

    fn advance(&mut self) {
        if let Some(ch) = self.current_char() {
            if ch == '\n' {
                self.line += 1;
                self.column = 1;
            } else {
                self.column += 1;
            }
            self.position += 1;
        }
    }

    fn here(&self) -> Position {
        Position {
            offset: self.position,
            line: self.line,
            column: self.column,
        }
    }

    fn skip_whitespace(&mut self) {
        while let Some(ch) = self.current_char() {
            if ch.is_whitespace() {
                self.advance();
            } else {
                break;
            }
        }
    }

    fn read_identifier(&mut self) -> String {
        let mut result = String::new();
        while let Some(ch) = self.current_char() {
            if ch.is_alphanumeric() || ch == '_' || (ch == '-' && !result.is_empty()) {
                result.push(ch);
                self.advance();
            } else {
                break;
            }
        }
        result
    }

    fn read_string(&mut self, quote: char) -> Result<String, SyntaxError> {
        let start = self.here();
        let mut result = String::new();
        self.advance(); // opening quote

        while let Some(ch) = self.current_char() {
            match ch {
                c if c == quote => {
                    self.advance();
                    return Ok(result);
                }
                '\\' => {
                    let escape_at = self.here();
                    self.advance();
                    match self.current_char() {
                        Some('n') => result.push('\n'),
                        Some('t') => result.push('\t'),
                        Some('r') => result.push('\r'),
                        Some('"') => result.push('"'),
                        Some('\'') => result.push('\''),
                        Some('\\') => result.push('\\'),
                        Some(ch) => {
                            let mut err = SyntaxError::new(
                                format!("Invalid escape sequence: \\{}", ch),
                                escape_at,
                            );
                            err.found = Some(format!("\\{}", ch));
                            return Err(err);
                        }
                        None => break,
                    }
                    self.advance();
                }
                _ => {
                    result.push(ch);
                    self.advance();
                }
            }
        }

        Err(SyntaxError::new(
            "Unterminated string: missing closing quote",
            start,
        ))
    }

    fn read_number(&mut self, start: Position) -> Result<Token, SyntaxError> {
        let mut number = String::new();
        let mut is_float = false;

        if self.current_char() == Some('-') {
            number.push('-');
            self.advance();
        }

        while let Some(ch) = self.current_char() {
            if ch.is_ascii_digit() {
                number.push(ch);
                self.advance();
            } else if ch == '.'
                && !is_float
                && self.peek_char(1).is_some_and(|c| c.is_ascii_digit())
            {
                is_float = true;
                number.push(ch);
                self.advance();
            } else {
                break;
            }
        }

        let invalid = || SyntaxError::new(format!("Invalid number literal '{}'", number), start);
        if is_float {
            number.parse::<f64>().map(Token::Float).map_err(|_| invalid())
        } else {
            number.parse::<i64>().map(Token::Integer).map_err(|_| invalid())
        }
    }

    fn read_tag(&mut self) -> String {
        self.advance(); // '#'
        let mut result = String::new();
        while let Some(ch) = self.current_char() {
            if ch.is_alphanumeric() || matches!(ch, '_' | '-' | '/') {
                result.push(ch);
                self.advance();
            } else {
                break;
            }
        }
        result
    }

    fn read_link(&mut self) -> Result<String, SyntaxError> {
        let start = self.here();
        self.advance();
        self.advance(); // '[['
        let mut result = String::new();
        while let Some(ch) = self.current_char() {
            if ch == ']' && self.peek_char(1) == Some(']') {
                self.advance();
                self.advance();
                return Ok(result.trim().to_string());
            }
            if ch == '\n' {
                break;
            }
            result.push(ch);
            self.advance();
        }
        Err(SyntaxError::new("Unterminated link: missing ']]'", start))
    }

    fn single(&mut self, token: Token) -> Token {
        self.advance();
        token
    }

    fn double(&mut self, token: Token) -> Token {
        self.advance();
        self.advance();
        token
    }

    /// Reads the next token with its source text and position.
    pub fn next_spanned(&mut self) -> Result<SpannedToken, SyntaxError> {
        self.skip_whitespace();
        let start = self.here();

        let token = match self.current_char() {
            None => Token::Eof,
            Some(',') => self.single(Token::Comma),
            Some('.') => self.single(Token::Dot),
            Some('(') => self.single(Token::LParen),
            Some(')') => self.single(Token::RParen),
            Some('=') => {
                if self.peek_char(1) == Some('=') {
                    self.double(Token::Eq)
                } else {
                    self.single(Token::Eq)
                }
            }
            Some('!') => {
                if self.peek_char(1) == Some('=') {
                    self.double(Token::NotEq)
                } else {
                    self.single(Token::Bang)
                }
            }
            Some('<') => {
                if self.peek_char(1) == Some('=') {
                    self.double(Token::LtEq)
                } else {
                    self.single(Token::Lt)
                }
            }
            Some('>') => {
                if self.peek_char(1) == Some('=') {
                    self.double(Token::GtEq)
                } else {
                    self.single(Token::Gt)
                }
            }
            Some('-') => {
                if self.peek_char(1).is_some_and(|c| c.is_ascii_digit()) {
                    self.read_number(start)?
                } else {
                    self.single(Token::Minus)
                }
            }
            Some('"') => Token::String(self.read_string('"')?),
            Some('\'') => Token::String(self.read_string('\'')?),
            Some('#') => {
                if self
                    .peek_char(1)
                    .is_some_and(|c| c.is_alphanumeric() || c == '_')
                {
                    Token::Tag(self.read_tag())
                } else {
                    return Err(self.unexpected('#', start));
                }
            }
            Some('[') => {
                if self.peek_char(1) == Some('[') {
                    Token::Link(self.read_link()?)
                } else {
                    return Err(self.unexpected('[', start));
                }
            }
            Some(ch) if ch.is_alphabetic() || ch == '_' => {
                let ident = self.read_identifier();

                match ident.to_ascii_lowercase().as_str() {
                    "true" => Token::Boolean(true),
                    "false" => Token::Boolean(false),
                    "null" => Token::Null,
                    _ => match Keyword::lookup(&ident) {
                        Some(keyword) => Token::Keyword(keyword),
                        None => Token::Identifier(ident),
                    },
                }
            }
            Some(ch) if ch.is_ascii_digit() => self.read_number(start)?,
            Some(ch) => return Err(self.unexpected(ch, start)),
        };

        let text: String = self.input[start.offset..self.position].iter().collect();
        Ok(SpannedToken {
            token,
            text,
            position: start,
        })
    }

    /// Reads the next token, discarding its span.
    pub fn next_token(&mut self) -> Result<Token, SyntaxError> {
        self.next_spanned().map(|spanned| spanned.token)
    }

    /// Lexes the whole input. The last token is always [`Token::Eof`].
    pub fn tokenize(mut self) -> Result<Vec<SpannedToken>, SyntaxError> {
        let mut tokens = Vec::new();
        loop {
            let spanned = self.next_spanned()?;
            let done = spanned.token == Token::Eof;
            tokens.push(spanned);
            if done {
                return Ok(tokens);
            }
        }
    }

    fn unexpected(&self, ch: char, position: Position) -> SyntaxError {
        let mut err = SyntaxError::new(
            format!(
                "Unexpected character '{}' at offset {}",
                ch, position.offset
            ),
            position,
        );
        err.found = Some(ch.to_string());
        err
    }
}

#[test]
fn test_keywords_any_case() {
    let mut lexer = Lexer::new("table List TASK where");
    assert_eq!(lexer.next_token().unwrap(), Token::Keyword(Keyword::Table));
    assert_eq!(lexer.next_token().unwrap(), Token::Keyword(Keyword::List));
    assert_eq!(lexer.next_token().unwrap(), Token::Keyword(Keyword::Task));
    assert_eq!(lexer.next_token().unwrap(), Token::Keyword(Keyword::Where));
    assert_eq!(lexer.next_token().unwrap(), Token::Eof);
}

#[test]
fn test_dotted_path() {
    let mut lexer = Lexer::new("file.name >= 3");
    assert_eq!(lexer.next_token().unwrap(), Token::Identifier("file".to_string()));
    assert_eq!(lexer.next_token().unwrap(), Token::Dot);
    assert_eq!(lexer.next_token().unwrap(), Token::Identifier("name".to_string()));
    assert_eq!(lexer.next_token().unwrap(), Token::GtEq);
    assert_eq!(lexer.next_token().unwrap(), Token::Integer(3));
}
