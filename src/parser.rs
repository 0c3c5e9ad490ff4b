//! Token stream → S-expression AST.
//!
//! Recursive-descent over the token list. `parse_expr` handles one form at a
//! time; `parse_program` repeats it until the token stream is exhausted,
//! returning the sequence of top-level forms the import resolver and
//! expander operate on.

use crate::ast::{FileId, Literal, Position, SExp};
use crate::error::{ErrorKind, HqlError, SourceContext};
use crate::lexer::{Lexer, PosToken, Token};

pub fn parse_program(file: FileId, source: &str) -> Result<Vec<SExp>, HqlError> {
    let tokens = Lexer::new(file, source).tokenize()?;
    let ctx = SourceContext::new(format!("file#{}", file.0), source.to_string());
    let mut parser = Parser { tokens, idx: 0, ctx };
    let mut forms = Vec::new();
    while !parser.at_end() {
        forms.push(parser.parse_expr()?);
    }
    Ok(forms)
}

struct Parser {
    tokens: Vec<PosToken>,
    idx: usize,
    ctx: SourceContext,
}

impl Parser {
    fn at_end(&self) -> bool {
        self.idx >= self.tokens.len()
    }

    fn peek(&self) -> Option<&PosToken> {
        self.tokens.get(self.idx)
    }

    fn advance(&mut self) -> Option<PosToken> {
        let t = self.tokens.get(self.idx).cloned();
        if t.is_some() {
            self.idx += 1;
        }
        t
    }

    fn parse_expr(&mut self) -> Result<SExp, HqlError> {
        let Some(tok) = self.advance() else {
            return Err(self.err_at_eof("unexpected end of input"));
        };
        match tok.token {
            Token::LParen => self.parse_list(tok.pos, Token::RParen, "')'"),
            Token::RParen => Err(self.err(tok.pos, "unexpected ')'")),
            Token::LBracket => self.parse_list(tok.pos, Token::RBracket, "']'"),
            Token::RBracket => Err(self.err(tok.pos, "unexpected ']'")),
            Token::String(s) => Ok(SExp::literal(Literal::Str(s), tok.pos)),
            Token::Number(text) => {
                let n: f64 = text.parse().map_err(|_| self.err(tok.pos, &format!("invalid number '{text}'")))?;
                Ok(SExp::literal(Literal::Num(n), tok.pos))
            }
            Token::True => Ok(SExp::literal(Literal::Bool(true), tok.pos)),
            Token::False => Ok(SExp::literal(Literal::Bool(false), tok.pos)),
            Token::Nil => Ok(SExp::literal(Literal::Nil, tok.pos)),
            Token::Symbol(name) => Ok(SExp::symbol(name, tok.pos)),
            Token::Quote => self.parse_reader_macro("quote", tok.pos),
            Token::Quasiquote => self.parse_reader_macro("quasiquote", tok.pos),
            Token::Unquote => self.parse_reader_macro("unquote", tok.pos),
            Token::UnquoteSplicing => self.parse_reader_macro("unquote-splicing", tok.pos),
        }
    }

    /// `'x`, `` `x ``, `~x`, `~@x` each desugar to `(quote x)` / `(quasiquote
    /// x)` / `(unquote x)` / `(unquote-splicing x)` so the rest of the
    /// pipeline only ever deals with ordinary list forms.
    fn parse_reader_macro(&mut self, head: &str, pos: Position) -> Result<SExp, HqlError> {
        let inner = self.parse_expr()?;
        Ok(SExp::list(vec![SExp::symbol(head, pos), inner], pos))
    }

    /// Parses a sequence of forms up to (and consuming) `closing`; shared by
    /// `(...)` and the `[...]` selective-import specifier list, which parse
    /// to the same `SExp::List` shape.
    fn parse_list(&mut self, open_pos: Position, closing: Token, closing_desc: &str) -> Result<SExp, HqlError> {
        let mut items = Vec::new();
        loop {
            match self.peek() {
                None => return Err(self.err(open_pos, &format!("unclosed list: missing {closing_desc}"))),
                Some(t) if t.token == closing => {
                    self.advance();
                    break;
                }
                _ => items.push(self.parse_expr()?),
            }
        }
        Ok(SExp::list(items, open_pos))
    }

    fn err(&self, pos: Position, reason: &str) -> HqlError {
        HqlError::new(ErrorKind::ParseError { reason: reason.to_string() }, &self.ctx, pos)
    }

    fn err_at_eof(&self, reason: &str) -> HqlError {
        let pos = self.tokens.last().map(|t| t.pos).unwrap_or_default();
        self.err(pos, reason)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(src: &str) -> Vec<SExp> {
        parse_program(FileId(0), src).expect("should parse")
    }

    #[test]
    fn parses_flat_list() {
        let forms = parse("(def x 1)");
        assert_eq!(forms.len(), 1);
        let items = forms[0].as_list().unwrap();
        assert_eq!(items[0].as_symbol(), Some("def"));
        assert_eq!(items[1].as_symbol(), Some("x"));
    }

    #[test]
    fn parses_nested_lists() {
        let forms = parse("(a (b c) d)");
        let items = forms[0].as_list().unwrap();
        assert_eq!(items.len(), 3);
        assert!(items[1].as_list().is_some());
    }

    #[test]
    fn empty_list_is_not_nil() {
        let forms = parse("()");
        assert!(forms[0].is_empty_list());
    }

    #[test]
    fn unclosed_list_is_an_error() {
        assert!(parse_program(FileId(0), "(a (b)").is_err());
    }

    #[test]
    fn unexpected_close_paren_is_an_error() {
        assert!(parse_program(FileId(0), ")").is_err());
    }

    #[test]
    fn quote_family_desugars_to_lists() {
        let forms = parse("'x `y ~z ~@w");
        assert_eq!(forms[0].as_call().unwrap().0, "quote");
        assert_eq!(forms[1].as_call().unwrap().0, "quasiquote");
        assert_eq!(forms[2].as_call().unwrap().0, "unquote");
        assert_eq!(forms[3].as_call().unwrap().0, "unquote-splicing");
    }

    #[test]
    fn multiple_top_level_forms() {
        let forms = parse("(def a 1) (def b 2)");
        assert_eq!(forms.len(), 2);
    }

    #[test]
    fn bracket_list_parses_like_parens() {
        let forms = parse("(import [greet as hi from \"./m.hql\"])");
        let items = forms[0].as_list().unwrap();
        assert_eq!(items[0].as_symbol(), Some("import"));
        let bracket = items[1].as_list().unwrap();
        assert_eq!(bracket.len(), 4);
        assert_eq!(bracket[0].as_symbol(), Some("greet"));
    }
}
