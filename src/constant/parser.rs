//! Recursive-descent parser for constant candidates.

use super::lexer::{tokenize, Token};
use super::EvalError;

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Number(f64),
    Str(String),
    Ident(String),
    Array(Vec<Expr>),
    Object(Vec<(String, Expr)>),
    Unary(&'static str, Box<Expr>),
    Binary(&'static str, Box<Expr>, Box<Expr>),
    Logical(&'static str, Box<Expr>, Box<Expr>),
    Conditional(Box<Expr>, Box<Expr>, Box<Expr>),
    Member(Box<Expr>, Box<Expr>),
    Call(Box<Expr>, Vec<Expr>),
}

impl Expr {
    /// Collect identifiers that are read from the environment. Property
    /// names after `.` and object keys are not variable reads.
    pub fn free_variables<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            Expr::Number(_) | Expr::Str(_) => {}
            Expr::Ident(name) => out.push(name),
            Expr::Array(items) => items.iter().for_each(|item| item.free_variables(out)),
            Expr::Object(props) => props.iter().for_each(|(_, v)| v.free_variables(out)),
            Expr::Unary(_, e) => e.free_variables(out),
            Expr::Binary(_, a, b) | Expr::Logical(_, a, b) | Expr::Member(a, b) => {
                a.free_variables(out);
                b.free_variables(out);
            }
            Expr::Conditional(c, a, b) => {
                c.free_variables(out);
                a.free_variables(out);
                b.free_variables(out);
            }
            Expr::Call(callee, args) => {
                callee.free_variables(out);
                args.iter().for_each(|arg| arg.free_variables(out));
            }
        }
    }
}

/// Words that may not be used as plain identifiers.
const RESERVED: &[&str] = &[
    "var", "let", "const", "function", "return", "new", "delete", "void", "in", "instanceof",
    "this", "if", "else", "for", "while", "do", "switch", "case", "class", "throw", "try",
    "catch", "yield", "await",
];

/// Deepest nesting accepted; deeper expressions are left to the runtime.
const MAX_DEPTH: usize = 256;

pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    depth: usize,
}

impl Parser {
    pub fn new(tokens: Vec<Token>) -> Self {
        Parser {
            tokens,
            pos: 0,
            depth: 0,
        }
    }

    fn descend(&mut self) -> Result<(), EvalError> {
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            return Err(EvalError::unsupported("nesting too deep"));
        }
        Ok(())
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn advance(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        self.pos += 1;
        token
    }

    fn eat(&mut self, punct: &str) -> bool {
        if matches!(self.peek(), Some(Token::Punct(p)) if *p == punct) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, punct: &str) -> Result<(), EvalError> {
        if self.eat(punct) {
            Ok(())
        } else {
            Err(EvalError::syntax(format!("expected '{}'", punct)))
        }
    }

    fn eat_any(&mut self, ops: &[&'static str]) -> Option<&'static str> {
        let current: &'static str = match self.peek() {
            Some(Token::Punct(p)) => *p,
            _ => return None,
        };
        let op = ops.iter().copied().find(|op| *op == current)?;
        self.pos += 1;
        Some(op)
    }

    pub fn parse_complete(mut self) -> Result<Expr, EvalError> {
        let expr = self.parse_expr()?;
        if self.pos < self.tokens.len() {
            return Err(EvalError::syntax("unexpected trailing tokens"));
        }
        Ok(expr)
    }

    fn parse_expr(&mut self) -> Result<Expr, EvalError> {
        self.descend()?;
        let expr = self.parse_conditional();
        self.depth -= 1;
        expr
    }

    fn parse_conditional(&mut self) -> Result<Expr, EvalError> {
        let cond = self.parse_binary(0)?;
        if !self.eat("?") {
            return Ok(cond);
        }
        let then = self.parse_expr()?;
        self.expect(":")?;
        let otherwise = self.parse_expr()?;
        Ok(Expr::Conditional(
            Box::new(cond),
            Box::new(then),
            Box::new(otherwise),
        ))
    }

    /// Binary levels, loosest first.
    const LEVELS: &'static [&'static [&'static str]] = &[
        &["||"],
        &["&&"],
        &["===", "!==", "==", "!="],
        &["<=", ">=", "<", ">"],
        &["+", "-"],
        &["*", "/", "%"],
    ];

    fn parse_binary(&mut self, level: usize) -> Result<Expr, EvalError> {
        if level == Self::LEVELS.len() {
            return self.parse_unary();
        }
        let mut lhs = self.parse_binary(level + 1)?;
        // Each chained operator nests the left operand one level deeper
        let entry = self.depth;
        while let Some(op) = self.eat_any(Self::LEVELS[level]) {
            self.descend()?;
            let rhs = self.parse_binary(level + 1)?;
            lhs = if op == "&&" || op == "||" {
                Expr::Logical(op, Box::new(lhs), Box::new(rhs))
            } else {
                Expr::Binary(op, Box::new(lhs), Box::new(rhs))
            };
        }
        self.depth = entry;
        Ok(lhs)
    }

    fn parse_unary(&mut self) -> Result<Expr, EvalError> {
        let op = match self.eat_any(&["!", "-", "+"]) {
            Some(op) => op,
            None if matches!(self.peek(), Some(Token::Ident(word)) if word == "typeof") => {
                self.pos += 1;
                "typeof"
            }
            None => return self.parse_postfix(),
        };
        self.descend()?;
        let operand = self.parse_unary()?;
        self.depth -= 1;
        Ok(Expr::Unary(op, Box::new(operand)))
    }

    fn parse_postfix(&mut self) -> Result<Expr, EvalError> {
        let mut expr = self.parse_primary()?;
        let entry = self.depth;
        loop {
            if matches!(self.peek(), Some(Token::Punct("." | "[" | "("))) {
                self.descend()?;
            }
            if self.eat(".") {
                match self.advance() {
                    Some(Token::Ident(name)) => {
                        expr = Expr::Member(Box::new(expr), Box::new(Expr::Str(name)));
                    }
                    _ => return Err(EvalError::syntax("expected property name")),
                }
            } else if self.eat("[") {
                let index = self.parse_expr()?;
                self.expect("]")?;
                expr = Expr::Member(Box::new(expr), Box::new(index));
            } else if self.eat("(") {
                let args = self.parse_list(")")?;
                expr = Expr::Call(Box::new(expr), args);
            } else {
                self.depth = entry;
                return Ok(expr);
            }
        }
    }

    fn parse_list(&mut self, close: &str) -> Result<Vec<Expr>, EvalError> {
        let mut items = Vec::new();
        while !self.eat(close) {
            items.push(self.parse_expr()?);
            if !self.eat(",") {
                self.expect(close)?;
                break;
            }
        }
        Ok(items)
    }

    fn parse_primary(&mut self) -> Result<Expr, EvalError> {
        match self.advance() {
            Some(Token::Number(n)) => Ok(Expr::Number(n)),
            Some(Token::Str(s)) => Ok(Expr::Str(s)),
            Some(Token::Ident(name)) => {
                if RESERVED.contains(&name.as_str()) {
                    return Err(EvalError::unsupported(format!("'{}'", name)));
                }
                Ok(Expr::Ident(name))
            }
            Some(Token::Punct("(")) => {
                let inner = self.parse_expr()?;
                self.expect(")")?;
                Ok(inner)
            }
            Some(Token::Punct("[")) => Ok(Expr::Array(self.parse_list("]")?)),
            Some(Token::Punct("{")) => self.parse_object(),
            _ => Err(EvalError::syntax("expected expression")),
        }
    }

    fn parse_object(&mut self) -> Result<Expr, EvalError> {
        let mut props = Vec::new();
        while !self.eat("}") {
            let key = match self.advance() {
                Some(Token::Ident(name)) | Some(Token::Str(name)) => name,
                Some(Token::Number(n)) => super::value::format_number(n),
                _ => return Err(EvalError::syntax("expected property key")),
            };
            self.expect(":")?;
            props.push((key, self.parse_expr()?));
            if !self.eat(",") {
                self.expect("}")?;
                break;
            }
        }
        Ok(Expr::Object(props))
    }
}

/// Parse a full expression; trailing input is an error.
pub fn parse(src: &str) -> Result<Expr, EvalError> {
    Parser::new(tokenize(src)?).parse_complete()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_precedence() {
        let expr = parse("1 + 2 * 3").unwrap();
        assert_eq!(
            expr,
            Expr::Binary(
                "+",
                Box::new(Expr::Number(1.0)),
                Box::new(Expr::Binary(
                    "*",
                    Box::new(Expr::Number(2.0)),
                    Box::new(Expr::Number(3.0))
                ))
            )
        );
    }

    #[test]
    fn test_free_variables_skip_property_names() {
        let expr = parse("jade.escape(user.name)").unwrap();
        let mut vars = Vec::new();
        expr.free_variables(&mut vars);
        assert_eq!(vars, vec!["jade", "user"]);
    }

    #[test]
    fn test_object_and_array_literals() {
        assert!(parse("{a: 1, 'b': [1, 2,], c: {}}").is_ok());
        assert!(parse("[1, 2").is_err());
        assert!(parse("new Date()").is_err());
    }

    #[test]
    fn test_deep_nesting_is_rejected() {
        let nested = format!("{}1{}", "(".repeat(1000), ")".repeat(1000));
        assert!(matches!(parse(&nested), Err(EvalError::Unsupported(_))));

        let negations = format!("{}1", "!".repeat(1000));
        assert!(matches!(parse(&negations), Err(EvalError::Unsupported(_))));

        let chain = vec!["1"; 1000].join(" + ");
        assert!(matches!(parse(&chain), Err(EvalError::Unsupported(_))));

        let shallow = format!("{}1{}", "(".repeat(50), ")".repeat(50));
        assert_eq!(parse(&shallow), Ok(Expr::Number(1.0)));
    }
}
