//! Integer evaluation of addressing expressions such as `$ebp-0x10+$eax*4`.
//!
//! Backends that do not embed a debugger expression engine can use
//! [`evaluate`] with their own register lookup. Arithmetic wraps at 64 bits.

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum EvalError {
    #[error("empty expression")]
    Empty,

    #[error("unknown register `${0}`")]
    UnknownRegister(String),

    #[error("unexpected `{token}` at offset {offset}")]
    UnexpectedToken { token: String, offset: usize },

    #[error("unexpected end of expression")]
    UnexpectedEnd,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    Number(u64),
    Register(String),
    Plus,
    Minus,
    Star,
    Open,
    Close,
}

fn tokenize(expression: &str) -> Result<Vec<(usize, Token)>, EvalError> {
    let bytes = expression.as_bytes();
    let mut tokens = Vec::new();
    let mut pos = 0;

    while pos < bytes.len() {
        let start = pos;
        let token = match bytes[pos] {
            b' ' | b'\t' => {
                pos += 1;
                continue;
            }
            b'+' => Token::Plus,
            b'-' => Token::Minus,
            b'*' => Token::Star,
            b'(' => Token::Open,
            b')' => Token::Close,
            b'$' => {
                pos += 1;
                while pos < bytes.len() && (bytes[pos].is_ascii_alphanumeric() || bytes[pos] == b'_')
                {
                    pos += 1;
                }
                tokens.push((start, Token::Register(expression[start + 1..pos].to_owned())));
                continue;
            }
            b'0'..=b'9' => {
                let (value, len) = number(&expression[pos..]).ok_or_else(|| {
                    EvalError::UnexpectedToken {
                        token: expression[pos..].to_owned(),
                        offset: pos,
                    }
                })?;
                pos += len;
                tokens.push((start, Token::Number(value)));
                continue;
            }
            _ => {
                return Err(EvalError::UnexpectedToken {
                    token: expression[pos..].chars().take(1).collect(),
                    offset: pos,
                })
            }
        };
        tokens.push((start, token));
        pos += 1;
    }

    Ok(tokens)
}

/// Parse a leading hexadecimal (`0x`) or decimal literal, returning its value
/// and the number of bytes consumed.
pub fn number(text: &str) -> Option<(u64, usize)> {
    if let Some(hex) = text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        let len = hex.bytes().take_while(u8::is_ascii_hexdigit).count();
        if len == 0 {
            return None;
        }
        u64::from_str_radix(&hex[..len], 16)
            .ok()
            .map(|value| (value, len + 2))
    } else {
        let len = text.bytes().take_while(u8::is_ascii_digit).count();
        if len == 0 {
            return None;
        }
        text[..len].parse().ok().map(|value| (value, len))
    }
}

struct Parser<'a, F> {
    tokens: &'a [(usize, Token)],
    pos: usize,
    registers: F,
}

impl<'a, F> Parser<'a, F>
where
    F: FnMut(&str) -> Option<u64>,
{
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos).map(|(_, t)| t)
    }

    fn sum(&mut self) -> Result<u64, EvalError> {
        let mut value = self.product()?;
        loop {
            match self.peek() {
                Some(Token::Plus) => {
                    self.pos += 1;
                    value = value.wrapping_add(self.product()?);
                }
                Some(Token::Minus) => {
                    self.pos += 1;
                    value = value.wrapping_sub(self.product()?);
                }
                _ => return Ok(value),
            }
        }
    }

    fn product(&mut self) -> Result<u64, EvalError> {
        let mut value = self.unary()?;
        while let Some(Token::Star) = self.peek() {
            self.pos += 1;
            value = value.wrapping_mul(self.unary()?);
        }
        Ok(value)
    }

    fn unary(&mut self) -> Result<u64, EvalError> {
        match self.peek() {
            Some(Token::Minus) => {
                self.pos += 1;
                Ok(self.unary()?.wrapping_neg())
            }
            Some(Token::Plus) => {
                self.pos += 1;
                self.unary()
            }
            _ => self.atom(),
        }
    }

    fn atom(&mut self) -> Result<u64, EvalError> {
        let (offset, token) = self.tokens.get(self.pos).ok_or(EvalError::UnexpectedEnd)?;
        self.pos += 1;
        match token {
            Token::Number(value) => Ok(*value),
            Token::Register(name) => {
                (self.registers)(name).ok_or_else(|| EvalError::UnknownRegister(name.clone()))
            }
            Token::Open => {
                let value = self.sum()?;
                match self.tokens.get(self.pos) {
                    Some((_, Token::Close)) => {
                        self.pos += 1;
                        Ok(value)
                    }
                    Some((offset, token)) => Err(unexpected(*offset, token)),
                    None => Err(EvalError::UnexpectedEnd),
                }
            }
            token => Err(unexpected(*offset, token)),
        }
    }
}

fn unexpected(offset: usize, token: &Token) -> EvalError {
    let token = match token {
        Token::Number(v) => format!("{v:#x}"),
        Token::Register(name) => format!("${name}"),
        Token::Plus => "+".into(),
        Token::Minus => "-".into(),
        Token::Star => "*".into(),
        Token::Open => "(".into(),
        Token::Close => ")".into(),
    };
    EvalError::UnexpectedToken { token, offset }
}

/// Evaluate `expression`, resolving `$name` through `registers`.
pub fn evaluate<F>(expression: &str, registers: F) -> Result<u64, EvalError>
where
    F: FnMut(&str) -> Option<u64>,
{
    let tokens = tokenize(expression)?;
    if tokens.is_empty() {
        return Err(EvalError::Empty);
    }

    let mut parser = Parser {
        tokens: &tokens,
        pos: 0,
        registers,
    };
    let value = parser.sum()?;
    match parser.tokens.get(parser.pos) {
        None => Ok(value),
        Some((offset, token)) => Err(unexpected(*offset, token)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn regs(name: &str) -> Option<u64> {
        match name {
            "ebp" => Some(0xbfff_f000),
            "eax" => Some(3),
            _ => None,
        }
    }

    #[test]
    fn addressing_forms() {
        assert_eq!(evaluate("$ebp-0x10", regs), Ok(0xbfff_eff0));
        assert_eq!(evaluate("$ebp+$eax*4+0x8", regs), Ok(0xbfff_f014));
        assert_eq!(evaluate("0x804a000", regs), Ok(0x804a000));
        assert_eq!(evaluate("0+$eax*1", regs), Ok(3));
        assert_eq!(evaluate("($eax+1)*2", regs), Ok(8));
    }

    #[test]
    fn negative_results_wrap() {
        assert_eq!(evaluate("-1", regs), Ok(u64::MAX));
        assert_eq!(evaluate("$eax-4", regs), Ok(u64::MAX));
    }

    #[test]
    fn errors() {
        assert_eq!(evaluate("", regs), Err(EvalError::Empty));
        assert_eq!(
            evaluate("$zzz+1", regs),
            Err(EvalError::UnknownRegister("zzz".into()))
        );
        assert_eq!(evaluate("$eax+", regs), Err(EvalError::UnexpectedEnd));
        assert!(matches!(
            evaluate("$eax ? 1", regs),
            Err(EvalError::UnexpectedToken { offset: 5, .. })
        ));
    }

    #[test]
    fn number_prefixes() {
        assert_eq!(number("0x1f]"), Some((0x1f, 4)));
        assert_eq!(number("42*"), Some((42, 2)));
        assert_eq!(number("0x"), None);
        assert_eq!(number("eax"), None);
    }
}
