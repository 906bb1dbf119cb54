//! Expression tokenizer
//!
//! Splits a source expression into tokens for the constant parser. The
//! tokenizer only knows the subset the parser accepts; anything else is
//! a syntax error, which the caller reads as "not constant".

use super::EvalError;

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    Number(f64),
    Str(String),
    Ident(String),
    Punct(&'static str),
}

/// Longest operators first so that `===` wins over `==` and `=`.
const PUNCTUATORS: &[&str] = &[
    "===", "!==", "==", "!=", "<=", ">=", "&&", "||", "+", "-", "*", "/", "%", "<", ">", "!", "?",
    ":", ",", ".", "(", ")", "[", "]", "{", "}",
];

/// The tokenizer that converts an expression to tokens
pub struct Lexer<'a> {
    src: &'a str,
    pos: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(src: &'a str) -> Self {
        Lexer { src, pos: 0 }
    }

    fn rest(&self) -> &'a str {
        &self.src[self.pos..]
    }

    fn peek_char(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn next_char(&mut self) -> Option<char> {
        let c = self.peek_char()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn skip_whitespace(&mut self) {
        while let Some(c) = self.peek_char() {
            if c.is_whitespace() {
                self.next_char();
            } else {
                break;
            }
        }
    }

    fn read_number(&mut self) -> Result<Token, EvalError> {
        let rest = self.rest();
        if rest.starts_with("0x") || rest.starts_with("0X") {
            let digits: String = rest[2..]
                .chars()
                .take_while(|c| c.is_ascii_hexdigit())
                .collect();
            if digits.is_empty() {
                return Err(EvalError::syntax("malformed hex literal"));
            }
            self.pos += 2 + digits.len();
            let value = u64::from_str_radix(&digits, 16)
                .map_err(|_| EvalError::syntax("hex literal out of range"))?;
            return Ok(Token::Number(value as f64));
        }

        let start = self.pos;
        let mut seen_exp = false;
        let mut prev = '\0';
        while let Some(c) = self.peek_char() {
            let accept = c.is_ascii_digit()
                || c == '.'
                || (!seen_exp && (c == 'e' || c == 'E'))
                || ((c == '+' || c == '-') && (prev == 'e' || prev == 'E'));
            if !accept {
                break;
            }
            if c == 'e' || c == 'E' {
                seen_exp = true;
            }
            prev = c;
            self.next_char();
        }
        let text = &self.src[start..self.pos];
        if text.len() > 1 && text.starts_with('0') && text[1..].starts_with(|c: char| c.is_ascii_digit()) {
            return legacy_octal(text);
        }
        text.parse::<f64>()
            .map(Token::Number)
            .map_err(|_| EvalError::syntax(format!("malformed number '{}'", text)))
    }

    fn read_string(&mut self, quote: char) -> Result<Token, EvalError> {
        let mut out = String::new();
        loop {
            let c = self
                .next_char()
                .ok_or_else(|| EvalError::syntax("unterminated string"))?;
            if c == quote {
                return Ok(Token::Str(out));
            }
            if c == '\n' {
                return Err(EvalError::syntax("newline in string literal"));
            }
            if c != '\\' {
                out.push(c);
                continue;
            }
            let esc = self
                .next_char()
                .ok_or_else(|| EvalError::syntax("unterminated escape"))?;
            match esc {
                'n' => out.push('\n'),
                't' => out.push('\t'),
                'r' => out.push('\r'),
                'b' => out.push('\u{8}'),
                'f' => out.push('\u{c}'),
                'v' => out.push('\u{b}'),
                '0' => out.push('\0'),
                'x' => out.push(self.read_hex_escape(2)?),
                'u' => out.push(self.read_hex_escape(4)?),
                '\n' => {}
                other => out.push(other),
            }
        }
    }

    fn read_hex_escape(&mut self, len: usize) -> Result<char, EvalError> {
        let digits: String = self.rest().chars().take(len).collect();
        if digits.len() != len || !digits.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(EvalError::syntax("malformed escape sequence"));
        }
        self.pos += len;
        u32::from_str_radix(&digits, 16)
            .ok()
            .and_then(char::from_u32)
            .ok_or_else(|| EvalError::syntax("invalid code point"))
    }

    fn read_ident(&mut self) -> Token {
        let start = self.pos;
        while let Some(c) = self.peek_char() {
            if is_ident_char(c) {
                self.next_char();
            } else {
                break;
            }
        }
        Token::Ident(self.src[start..self.pos].to_string())
    }

    /// Read the next token
    fn next_token(&mut self) -> Option<Result<Token, EvalError>> {
        self.skip_whitespace();
        let c = self.peek_char()?;

        if c.is_ascii_digit()
            || (c == '.'
                && self.rest()[1..]
                    .chars()
                    .next()
                    .is_some_and(|d| d.is_ascii_digit()))
        {
            return Some(self.read_number());
        }
        if c == '"' || c == '\'' {
            self.next_char();
            return Some(self.read_string(c));
        }
        if is_ident_start(c) {
            return Some(Ok(self.read_ident()));
        }
        for punct in PUNCTUATORS {
            if self.rest().starts_with(punct) {
                self.pos += punct.len();
                return Some(Ok(Token::Punct(punct)));
            }
        }
        Some(Err(EvalError::syntax(format!("unexpected character '{}'", c))))
    }

    /// Tokenize the whole input
    pub fn tokenize(mut self) -> Result<Vec<Token>, EvalError> {
        let mut tokens = Vec::new();
        while let Some(token) = self.next_token() {
            tokens.push(token?);
        }
        Ok(tokens)
    }
}

fn is_ident_start(c: char) -> bool {
    c.is_alphabetic() || c == '_' || c == '$'
}

fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '$'
}

/// Convenience function to tokenize an expression
pub fn tokenize(src: &str) -> Result<Vec<Token>, EvalError> {
    Lexer::new(src).tokenize()
}

/// Leading-zero integers are octal when every digit allows it. The
/// decimal fallback (`089`) and fractions (`07.5`) are left to the runtime.
fn legacy_octal(text: &str) -> Result<Token, EvalError> {
    if !text.chars().all(|c| ('0'..='7').contains(&c)) {
        return Err(EvalError::unsupported(format!("leading-zero literal '{}'", text)));
    }
    u64::from_str_radix(text, 8)
        .map(|value| Token::Number(value as f64))
        .map_err(|_| EvalError::syntax("octal literal out of range"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokenize_mixed() {
        let tokens = tokenize("a.b === 'x\\'y' + 1.5e3").unwrap();
        assert_eq!(
            tokens,
            vec![
                Token::Ident("a".into()),
                Token::Punct("."),
                Token::Ident("b".into()),
                Token::Punct("==="),
                Token::Str("x'y".into()),
                Token::Punct("+"),
                Token::Number(1500.0),
            ]
        );
    }

    #[test]
    fn test_dollar_is_an_identifier() {
        assert_eq!(
            tokenize("$(x)").unwrap()[0],
            Token::Ident("$".to_string())
        );
    }

    #[test]
    fn test_leading_zero_literals() {
        assert_eq!(tokenize("010").unwrap(), vec![Token::Number(8.0)]);
        assert_eq!(tokenize("0.5").unwrap(), vec![Token::Number(0.5)]);
        assert_eq!(tokenize("00").unwrap(), vec![Token::Number(0.0)]);
        assert!(matches!(tokenize("089"), Err(EvalError::Unsupported(_))));
    }

    #[test]
    fn test_rejects_unknown_operators() {
        assert!(tokenize("a = 1").is_err());
        assert!(tokenize("a & b").is_err());
        assert!(tokenize("'open").is_err());
    }
}
