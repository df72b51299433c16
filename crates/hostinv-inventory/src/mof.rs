//! Parser for management-interface instance text
//!
//! Instance text is the MOF rendering of one object:
//!
//! ```text
//! instance of Win32_Processor
//! {
//!     DeviceID = "CPU0";
//!     NumberOfCores = 2;
//!     PowerManagementSupported = FALSE;
//!     Characteristics = {4, 128};
//! };
//! ```
//!
//! The tokenizer is quote-aware: `;`, `,` and braces inside a quoted string
//! are data, never separators. Lists nest one level only.

use thiserror::Error;

use crate::types::{ParsedRecord, ValueLiteral};

/// Malformed instance text
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// No `{` in the input, so there is no record body
    #[error("no record body found")]
    MissingBody,

    /// `{` and `}` outside strings do not pair up
    #[error("unbalanced braces")]
    UnbalancedBraces,

    /// A `"` with no closing quote
    #[error("unterminated string starting at byte {offset}")]
    UnterminatedString {
        /// Byte offset of the opening quote
        offset: usize,
    },

    /// A bare token outside {TRUE, FALSE, NULL, integer}
    #[error("cannot classify token `{token}`")]
    UnclassifiableToken {
        /// The offending token
        token: String,
    },

    /// A list inside a list
    #[error("nested list in field `{field}`")]
    NestedList {
        /// Field holding the list
        field: String,
    },

    /// Structural token out of place
    #[error("expected {expected}, found {found}")]
    ExpectedToken {
        /// What the grammar wanted
        expected: &'static str,
        /// What was there instead
        found: String,
    },

    /// The same property appears twice
    #[error("duplicate field `{field}`")]
    DuplicateField {
        /// Property name
        field: String,
    },
}

/// A parsed instance: optional class name plus its fields
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Instance {
    /// Class from the `instance of <ClassName>` header, if present
    pub class_name: Option<String>,
    /// Property values
    pub fields: ParsedRecord,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    Word(String),
    Str(String),
    LBrace,
    RBrace,
    Equals,
    Semicolon,
    Comma,
}

impl Token {
    fn describe(&self) -> String {
        match self {
            Token::Word(w) => format!("`{w}`"),
            Token::Str(s) => format!("string \"{s}\""),
            Token::LBrace => "`{`".to_string(),
            Token::RBrace => "`}`".to_string(),
            Token::Equals => "`=`".to_string(),
            Token::Semicolon => "`;`".to_string(),
            Token::Comma => "`,`".to_string(),
        }
    }
}

fn describe(token: Option<&Token>) -> String {
    token.map_or_else(|| "end of input".to_string(), Token::describe)
}

fn is_delimiter(c: char) -> bool {
    c.is_whitespace() || matches!(c, '{' | '}' | '=' | ';' | ',' | '"')
}

fn tokenize(text: &str) -> Result<Vec<Token>, ParseError> {
    let mut tokens = Vec::new();
    let mut depth = 0usize;
    let mut chars = text.char_indices().peekable();

    while let Some(&(offset, c)) = chars.peek() {
        match c {
            c if c.is_whitespace() => {
                chars.next();
            }
            '{' => {
                chars.next();
                depth += 1;
                tokens.push(Token::LBrace);
            }
            '}' => {
                chars.next();
                depth = depth.checked_sub(1).ok_or(ParseError::UnbalancedBraces)?;
                tokens.push(Token::RBrace);
            }
            '=' => {
                chars.next();
                tokens.push(Token::Equals);
            }
            ';' => {
                chars.next();
                tokens.push(Token::Semicolon);
            }
            ',' => {
                chars.next();
                tokens.push(Token::Comma);
            }
            '"' => {
                chars.next();
                let mut value = String::new();
                let mut closed = false;

                while let Some((_, c)) = chars.next() {
                    match c {
                        '"' => {
                            closed = true;
                            break;
                        }
                        '\\' => match chars.next() {
                            Some((_, 'n')) => value.push('\n'),
                            Some((_, 't')) => value.push('\t'),
                            Some((_, 'r')) => value.push('\r'),
                            Some((_, escaped)) => value.push(escaped),
                            None => break,
                        },
                        other => value.push(other),
                    }
                }

                if !closed {
                    return Err(ParseError::UnterminatedString { offset });
                }
                tokens.push(Token::Str(value));
            }
            _ => {
                let mut word = String::new();
                while let Some(&(_, c)) = chars.peek() {
                    if is_delimiter(c) {
                        break;
                    }
                    word.push(c);
                    chars.next();
                }
                tokens.push(Token::Word(word));
            }
        }
    }

    if depth != 0 {
        return Err(ParseError::UnbalancedBraces);
    }

    Ok(tokens)
}

/// Classify a bare token into the literal domain
fn classify(word: &str) -> Result<ValueLiteral, ParseError> {
    match word.to_ascii_uppercase().as_str() {
        "TRUE" => Ok(ValueLiteral::Boolean(true)),
        "FALSE" => Ok(ValueLiteral::Boolean(false)),
        "NULL" => Ok(ValueLiteral::Null),
        _ => word
            .parse::<i64>()
            .map(ValueLiteral::Integer)
            .map_err(|_| ParseError::UnclassifiableToken {
                token: word.to_string(),
            }),
    }
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn new(tokens: Vec<Token>) -> Self {
        Self { tokens, pos: 0 }
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn expect(&mut self, want: &Token, expected: &'static str) -> Result<(), ParseError> {
        match self.next() {
            Some(ref token) if token == want => Ok(()),
            other => Err(ParseError::ExpectedToken {
                expected,
                found: describe(other.as_ref()),
            }),
        }
    }

    /// Words before the body; `instance of X` yields `X`
    fn header(&mut self) -> Option<String> {
        let mut words = Vec::new();
        while let Some(Token::Word(w)) = self.peek() {
            words.push(w.clone());
            self.pos += 1;
        }

        match words.as_slice() {
            [instance, of, class, ..]
                if instance.eq_ignore_ascii_case("instance") && of.eq_ignore_ascii_case("of") =>
            {
                Some(class.clone())
            }
            _ => None,
        }
    }

    fn fields(&mut self) -> Result<ParsedRecord, ParseError> {
        let mut fields = ParsedRecord::new();

        while !matches!(self.peek(), Some(Token::RBrace) | None) {
            let name = match self.next() {
                Some(Token::Word(w)) => w.trim().to_string(),
                other => {
                    return Err(ParseError::ExpectedToken {
                        expected: "field name",
                        found: describe(other.as_ref()),
                    });
                }
            };

            self.expect(&Token::Equals, "`=`")?;
            let value = self.value(&name)?;

            match self.peek() {
                Some(Token::Semicolon | Token::Comma) => {
                    self.pos += 1;
                }
                Some(Token::RBrace) => {}
                other => {
                    return Err(ParseError::ExpectedToken {
                        expected: "`;`",
                        found: describe(other),
                    });
                }
            }

            if fields.contains_key(&name) {
                return Err(ParseError::DuplicateField { field: name });
            }
            fields.insert(name, value);
        }

        Ok(fields)
    }

    fn value(&mut self, field: &str) -> Result<ValueLiteral, ParseError> {
        match self.next() {
            Some(Token::Str(s)) => Ok(ValueLiteral::String(s.trim().to_string())),
            Some(Token::Word(w)) => classify(&w),
            Some(Token::LBrace) => self.list(field),
            other => Err(ParseError::ExpectedToken {
                expected: "value",
                found: describe(other.as_ref()),
            }),
        }
    }

    fn list(&mut self, field: &str) -> Result<ValueLiteral, ParseError> {
        let mut items = Vec::new();

        loop {
            match self.next() {
                Some(Token::RBrace) => break,
                Some(Token::Str(s)) => items.push(ValueLiteral::String(s)),
                Some(Token::Word(w)) => items.push(classify(&w)?),
                Some(Token::LBrace) => {
                    return Err(ParseError::NestedList {
                        field: field.to_string(),
                    });
                }
                None => return Err(ParseError::UnbalancedBraces),
                Some(other) => {
                    return Err(ParseError::ExpectedToken {
                        expected: "list element",
                        found: other.describe(),
                    });
                }
            }

            match self.peek() {
                Some(Token::Comma | Token::Semicolon) => {
                    self.pos += 1;
                }
                Some(Token::RBrace) => {}
                other => {
                    return Err(ParseError::ExpectedToken {
                        expected: "`,` or `}`",
                        found: describe(other),
                    });
                }
            }
        }

        Ok(ValueLiteral::List(items))
    }
}

/// Parse one instance-text block, keeping the class name
///
/// # Errors
/// Returns a [`ParseError`] for unbalanced braces, unterminated strings,
/// tokens outside the literal domain, or misplaced structure.
pub fn parse_instance(text: &str) -> Result<Instance, ParseError> {
    let tokens = tokenize(text)?;
    if !tokens.contains(&Token::LBrace) {
        return Err(ParseError::MissingBody);
    }

    let mut parser = Parser::new(tokens);
    let class_name = parser.header();

    parser.expect(&Token::LBrace, "`{`")?;
    let fields = parser.fields()?;
    parser.expect(&Token::RBrace, "`}`")?;

    if parser.peek() == Some(&Token::Semicolon) {
        parser.pos += 1;
    }
    if let Some(extra) = parser.next() {
        return Err(ParseError::ExpectedToken {
            expected: "end of input",
            found: extra.describe(),
        });
    }

    Ok(Instance { class_name, fields })
}

/// Parse one instance-text block into its field mapping
///
/// # Errors
/// See [`parse_instance`].
pub fn parse(text: &str) -> Result<ParsedRecord, ParseError> {
    parse_instance(text).map(|instance| instance.fields)
}

/// Render a record back into instance text
#[must_use]
pub fn render_instance(class_name: &str, record: &ParsedRecord) -> String {
    let mut text = format!("instance of {class_name}\n{{\n");
    for (key, value) in record {
        text.push_str(&format!("\t{key} = {value};\n"));
    }
    text.push_str("};\n");
    text
}
