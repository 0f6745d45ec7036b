//! Parser for the subset of HCL used by Terraform configurations
//!
//! Understands attributes, labelled blocks, strings (with escapes and `${}`
//! interpolation kept verbatim), heredocs, object and tuple literals, and all
//! three comment styles. Anything else on the right-hand side of an attribute
//! (function calls, references, operators, `for` expressions) is kept as raw
//! source text.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HclError {
    #[error("line {line}: {message}")]
    Syntax { line: usize, message: String },
}

/// Attribute values
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expr {
    String(String),
    Object(Vec<(String, Expr)>),
    Tuple(Vec<Expr>),
    /// Verbatim source text of an expression the parser does not model
    Raw(String),
}

impl Expr {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Expr::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&[(String, Expr)]> {
        match self {
            Expr::Object(entries) => Some(entries),
            _ => None,
        }
    }

    /// Looks up a key in an object literal
    pub fn get(&self, key: &str) -> Option<&Expr> {
        self.as_object()?
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    pub name: String,
    pub expr: Expr,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Body {
    pub attributes: Vec<Attribute>,
    pub blocks: Vec<Block>,
}

impl Body {
    pub fn attribute(&self, name: &str) -> Option<&Expr> {
        self.attributes
            .iter()
            .find(|a| a.name == name)
            .map(|a| &a.expr)
    }

    pub fn blocks_of<'a>(&'a self, kind: &'a str) -> impl Iterator<Item = &'a Block> + 'a {
        self.blocks.iter().filter(move |b| b.kind == kind)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    pub kind: String,
    pub labels: Vec<String>,
    pub body: Body,
}

impl Block {
    pub fn label(&self, index: usize) -> Option<&str> {
        self.labels.get(index).map(String::as_str)
    }
}

/// Parses a whole configuration file
pub fn parse(source: &str) -> Result<Body, HclError> {
    let tokens = Lexer::new(source).tokenize()?;
    let mut parser = Parser {
        source,
        tokens,
        pos: 0,
    };
    parser.body(false)
}

#[derive(Debug, Clone, PartialEq)]
enum Tok {
    Ident(String),
    Str(String),
    Number,
    LBrace,
    RBrace,
    LBracket,
    RBracket,
    LParen,
    RParen,
    Assign,
    Comma,
    Colon,
    Newline,
    Op,
}

#[derive(Debug, Clone)]
struct Token {
    tok: Tok,
    line: usize,
    start: usize,
    end: usize,
}

struct Lexer<'a> {
    src: &'a str,
    chars: Vec<(usize, char)>,
    pos: usize,
    line: usize,
}

impl<'a> Lexer<'a> {
    fn new(src: &'a str) -> Self {
        Self {
            src,
            chars: src.char_indices().collect(),
            pos: 0,
            line: 1,
        }
    }

    fn peek(&self, ahead: usize) -> Option<char> {
        self.chars.get(self.pos + ahead).map(|(_, c)| *c)
    }

    fn offset(&self) -> usize {
        self.chars
            .get(self.pos)
            .map(|(i, _)| *i)
            .unwrap_or(self.src.len())
    }

    fn error(&self, message: impl Into<String>) -> HclError {
        HclError::Syntax {
            line: self.line,
            message: message.into(),
        }
    }

    fn tokenize(mut self) -> Result<Vec<Token>, HclError> {
        let mut tokens = Vec::new();

        while let Some(c) = self.peek(0) {
            let start = self.offset();
            let line = self.line;

            let tok = match c {
                ' ' | '\t' | '\r' => {
                    self.pos += 1;
                    continue;
                }
                '\n' => {
                    self.pos += 1;
                    self.line += 1;
                    Tok::Newline
                }
                '#' => {
                    self.skip_line_comment();
                    continue;
                }
                '/' if self.peek(1) == Some('/') => {
                    self.skip_line_comment();
                    continue;
                }
                '/' if self.peek(1) == Some('*') => {
                    self.skip_block_comment()?;
                    continue;
                }
                '"' => Tok::Str(self.string()?),
                '<' if self.peek(1) == Some('<') && self.heredoc_ahead() => {
                    Tok::Str(self.heredoc()?)
                }
                '{' => self.single(Tok::LBrace),
                '}' => self.single(Tok::RBrace),
                '[' => self.single(Tok::LBracket),
                ']' => self.single(Tok::RBracket),
                '(' => self.single(Tok::LParen),
                ')' => self.single(Tok::RParen),
                ',' => self.single(Tok::Comma),
                ':' => self.single(Tok::Colon),
                '=' => {
                    self.pos += 1;
                    match self.peek(0) {
                        Some('=') | Some('>') => {
                            self.pos += 1;
                            Tok::Op
                        }
                        _ => Tok::Assign,
                    }
                }
                c if c.is_ascii_digit() => {
                    while matches!(self.peek(0), Some(d) if d.is_ascii_digit() || d == '.') {
                        self.pos += 1;
                    }
                    Tok::Number
                }
                c if c.is_alphabetic() || c == '_' => {
                    let mut ident = String::new();
                    while let Some(d) = self.peek(0) {
                        if d.is_alphanumeric() || d == '_' || d == '-' {
                            ident.push(d);
                            self.pos += 1;
                        } else {
                            break;
                        }
                    }
                    Tok::Ident(ident)
                }
                _ => {
                    self.pos += 1;
                    // two-char comparison operators stay one token
                    if matches!(c, '!' | '<' | '>' | '&' | '|')
                        && matches!(self.peek(0), Some('=' | '&' | '|'))
                    {
                        self.pos += 1;
                    }
                    Tok::Op
                }
            };

            tokens.push(Token {
                tok,
                line,
                start,
                end: self.offset(),
            });
        }

        Ok(tokens)
    }

    fn single(&mut self, tok: Tok) -> Tok {
        self.pos += 1;
        tok
    }

    fn skip_line_comment(&mut self) {
        while let Some(c) = self.peek(0) {
            if c == '\n' {
                break;
            }
            self.pos += 1;
        }
    }

    fn skip_block_comment(&mut self) -> Result<(), HclError> {
        let opened_at = self.line;
        self.pos += 2;
        loop {
            match self.peek(0) {
                Some('*') if self.peek(1) == Some('/') => {
                    self.pos += 2;
                    return Ok(());
                }
                Some(c) => {
                    if c == '\n' {
                        self.line += 1;
                    }
                    self.pos += 1;
                }
                None => {
                    return Err(HclError::Syntax {
                        line: opened_at,
                        message: "unterminated block comment".to_string(),
                    })
                }
            }
        }
    }

    /// Quoted string; interpolation sequences are copied through untouched
    fn string(&mut self) -> Result<String, HclError> {
        self.pos += 1;
        let mut out = String::new();

        loop {
            match self.peek(0) {
                None | Some('\n') => return Err(self.error("unterminated string")),
                Some('"') => {
                    self.pos += 1;
                    return Ok(out);
                }
                Some('\\') => {
                    let escaped = self.peek(1).ok_or_else(|| self.error("unterminated string"))?;
                    self.pos += 2;
                    match escaped {
                        'n' => out.push('\n'),
                        't' => out.push('\t'),
                        'r' => out.push('\r'),
                        '"' => out.push('"'),
                        '\\' => out.push('\\'),
                        other => {
                            out.push('\\');
                            out.push(other);
                        }
                    }
                }
                Some(c @ ('$' | '%')) if self.peek(1) == Some('{') => {
                    out.push(c);
                    self.pos += 1;
                    self.interpolation(&mut out)?;
                }
                Some(c) => {
                    out.push(c);
                    self.pos += 1;
                }
            }
        }
    }

    fn interpolation(&mut self, out: &mut String) -> Result<(), HclError> {
        let mut depth = 0usize;
        let mut in_quote = false;

        while let Some(c) = self.peek(0) {
            out.push(c);
            self.pos += 1;
            if c == '\n' {
                self.line += 1;
            }

            if in_quote {
                if c == '\\' {
                    if let Some(next) = self.peek(0) {
                        out.push(next);
                        self.pos += 1;
                    }
                } else if c == '"' {
                    in_quote = false;
                }
                continue;
            }

            match c {
                '"' => in_quote = true,
                '{' => depth += 1,
                '}' => {
                    depth -= 1;
                    if depth == 0 {
                        return Ok(());
                    }
                }
                _ => {}
            }
        }

        Err(self.error("unterminated interpolation"))
    }

    fn heredoc_ahead(&self) -> bool {
        let mut ahead = 2;
        if self.peek(ahead) == Some('-') {
            ahead += 1;
        }
        matches!(self.peek(ahead), Some(c) if c.is_alphabetic() || c == '_')
    }

    fn heredoc(&mut self) -> Result<String, HclError> {
        let opened_at = self.line;
        self.pos += 2;
        let indented = self.peek(0) == Some('-');
        if indented {
            self.pos += 1;
        }

        let mut marker = String::new();
        while let Some(c) = self.peek(0) {
            if c.is_alphanumeric() || c == '_' {
                marker.push(c);
                self.pos += 1;
            } else {
                break;
            }
        }

        // rest of the opening line is ignored
        while let Some(c) = self.peek(0) {
            self.pos += 1;
            if c == '\n' {
                self.line += 1;
                break;
            }
        }

        let mut lines: Vec<String> = Vec::new();
        let mut current = String::new();
        loop {
            match self.peek(0) {
                Some('\n') | None => {
                    let at_end = self.peek(0).is_none();
                    if current.trim() == marker {
                        return Ok(finish_heredoc(lines, indented));
                    }
                    if at_end {
                        return Err(HclError::Syntax {
                            line: opened_at,
                            message: format!("heredoc missing terminator {}", marker),
                        });
                    }
                    lines.push(std::mem::take(&mut current));
                    self.pos += 1;
                    self.line += 1;
                }
                Some(c) => {
                    current.push(c);
                    self.pos += 1;
                }
            }
        }
    }
}

fn finish_heredoc(lines: Vec<String>, indented: bool) -> String {
    if !indented {
        return lines.iter().map(|l| format!("{}\n", l)).collect();
    }

    let indent = lines
        .iter()
        .filter(|l| !l.trim().is_empty())
        .map(|l| l.len() - l.trim_start().len())
        .min()
        .unwrap_or(0);

    lines
        .iter()
        .map(|l| format!("{}\n", l.get(indent..).unwrap_or("").trim_end_matches('\r')))
        .collect()
}

struct Parser<'a> {
    source: &'a str,
    tokens: Vec<Token>,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn peek(&self) -> Option<&Tok> {
        self.tokens.get(self.pos).map(|t| &t.tok)
    }

    fn line(&self) -> usize {
        self.tokens
            .get(self.pos)
            .or_else(|| self.tokens.last())
            .map(|t| t.line)
            .unwrap_or(1)
    }

    fn error(&self, message: impl Into<String>) -> HclError {
        HclError::Syntax {
            line: self.line(),
            message: message.into(),
        }
    }

    fn skip_newlines(&mut self) {
        while self.peek() == Some(&Tok::Newline) {
            self.pos += 1;
        }
    }

    fn skip_separators(&mut self) {
        while matches!(self.peek(), Some(Tok::Newline | Tok::Comma)) {
            self.pos += 1;
        }
    }

    fn next_significant(&self, from: usize) -> Option<&Tok> {
        self.tokens[from..]
            .iter()
            .map(|t| &t.tok)
            .find(|t| **t != Tok::Newline)
    }

    fn body(&mut self, nested: bool) -> Result<Body, HclError> {
        let mut body = Body::default();

        loop {
            self.skip_newlines();
            match self.peek().cloned() {
                None if nested => return Err(self.error("unexpected end of input, expected '}'")),
                None => return Ok(body),
                Some(Tok::RBrace) if nested => {
                    self.pos += 1;
                    return Ok(body);
                }
                Some(Tok::RBrace) => return Err(self.error("unexpected '}'")),
                Some(Tok::Ident(name)) => {
                    self.pos += 1;
                    if self.peek() == Some(&Tok::Assign) {
                        self.pos += 1;
                        let expr = self.expr()?;
                        body.attributes.push(Attribute { name, expr });
                        self.end_of_item()?;
                    } else {
                        let block = self.block(name)?;
                        body.blocks.push(block);
                    }
                }
                Some(other) => {
                    return Err(self.error(format!("unexpected token {:?}", other)));
                }
            }
        }
    }

    fn end_of_item(&mut self) -> Result<(), HclError> {
        match self.peek() {
            None | Some(Tok::Newline) | Some(Tok::RBrace) => Ok(()),
            Some(other) => Err(self.error(format!("expected newline, found {:?}", other))),
        }
    }

    fn block(&mut self, kind: String) -> Result<Block, HclError> {
        let mut labels = Vec::new();
        loop {
            match self.peek() {
                Some(Tok::Str(label)) | Some(Tok::Ident(label)) => {
                    labels.push(label.clone());
                    self.pos += 1;
                }
                Some(Tok::LBrace) => {
                    self.pos += 1;
                    let body = self.body(true)?;
                    return Ok(Block { kind, labels, body });
                }
                _ => {
                    return Err(self.error(format!("expected '=' or block body after '{}'", kind)));
                }
            }
        }
    }

    fn at_terminator(&self) -> bool {
        matches!(
            self.peek(),
            None | Some(Tok::Newline | Tok::Comma | Tok::RBrace | Tok::RBracket | Tok::RParen)
        )
    }

    fn expr(&mut self) -> Result<Expr, HclError> {
        let start = self.pos;

        let parsed = match self.peek().cloned() {
            Some(Tok::Str(s)) => {
                self.pos += 1;
                Some(Expr::String(s))
            }
            Some(Tok::LBrace) if !self.starts_for_expr() => Some(self.object()?),
            Some(Tok::LBracket) if !self.starts_for_expr() => Some(self.tuple()?),
            Some(_) => None,
            None => return Err(self.error("expected expression")),
        };

        match parsed {
            Some(expr) if self.at_terminator() => Ok(expr),
            _ => {
                self.pos = start;
                self.raw()
            }
        }
    }

    fn starts_for_expr(&self) -> bool {
        matches!(self.next_significant(self.pos + 1), Some(Tok::Ident(word)) if word == "for")
    }

    fn object(&mut self) -> Result<Expr, HclError> {
        self.pos += 1;
        let mut entries = Vec::new();

        loop {
            self.skip_separators();
            let key = match self.peek() {
                Some(Tok::RBrace) => {
                    self.pos += 1;
                    return Ok(Expr::Object(entries));
                }
                Some(Tok::Ident(k)) | Some(Tok::Str(k)) => k.clone(),
                None => return Err(self.error("unterminated object")),
                Some(other) => return Err(self.error(format!("unexpected object key {:?}", other))),
            };
            self.pos += 1;

            match self.peek() {
                Some(Tok::Assign) | Some(Tok::Colon) => self.pos += 1,
                _ => return Err(self.error(format!("expected '=' after object key '{}'", key))),
            }

            let value = self.expr()?;
            entries.push((key, value));
        }
    }

    fn tuple(&mut self) -> Result<Expr, HclError> {
        self.pos += 1;
        let mut items = Vec::new();

        loop {
            self.skip_separators();
            match self.peek() {
                Some(Tok::RBracket) => {
                    self.pos += 1;
                    return Ok(Expr::Tuple(items));
                }
                None => return Err(self.error("unterminated tuple")),
                _ => items.push(self.expr()?),
            }
        }
    }

    /// Consumes tokens up to the next terminator outside any brackets
    fn raw(&mut self) -> Result<Expr, HclError> {
        let start = self.pos;
        let mut depth = 0usize;

        while let Some(tok) = self.peek() {
            match tok {
                Tok::LBrace | Tok::LBracket | Tok::LParen => depth += 1,
                Tok::RBrace | Tok::RBracket | Tok::RParen if depth == 0 => break,
                Tok::RBrace | Tok::RBracket | Tok::RParen => depth -= 1,
                Tok::Newline | Tok::Comma if depth == 0 => break,
                _ => {}
            }
            self.pos += 1;
        }

        if depth > 0 {
            return Err(self.error("unbalanced brackets in expression"));
        }
        if self.pos == start {
            return Err(self.error("expected expression"));
        }

        let from = self.tokens[start].start;
        let to = self.tokens[self.pos - 1].end;
        Ok(Expr::Raw(self.source[from..to].trim().to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_terraform_block() {
        let body = parse(
            r#"
terraform {
  required_version = ">= 1.5.0"

  required_providers {
    aws = {
      source  = "hashicorp/aws"
      version = "~> 5.0"
    }
    random = "~> 3.1"
  }

  backend "s3" {
    bucket = "my-bucket"
  }
}
"#,
        )
        .unwrap();

        let terraform = body.blocks_of("terraform").next().unwrap();
        assert_eq!(
            terraform.body.attribute("required_version").and_then(Expr::as_str),
            Some(">= 1.5.0")
        );

        let providers = terraform.body.blocks_of("required_providers").next().unwrap();
        let aws = providers.body.attribute("aws").unwrap();
        assert_eq!(aws.get("source").and_then(Expr::as_str), Some("hashicorp/aws"));
        assert_eq!(
            providers.body.attribute("random").and_then(Expr::as_str),
            Some("~> 3.1")
        );

        let backend = terraform.body.blocks_of("backend").next().unwrap();
        assert_eq!(backend.label(0), Some("s3"));
    }

    #[test]
    fn test_resources_with_two_labels() {
        let body = parse(
            r#"resource "aws_instance" "web" {
  ami           = "ami-12345"
  instance_type = var.instance_type
  count         = length(var.zones)
  tags = {
    Name = "web-${var.env}"
  }
}
"#,
        )
        .unwrap();

        let resource = &body.blocks[0];
        assert_eq!(resource.labels, vec!["aws_instance", "web"]);
        assert_eq!(
            resource.body.attribute("instance_type"),
            Some(&Expr::Raw("var.instance_type".to_string()))
        );
        assert_eq!(
            resource.body.attribute("count"),
            Some(&Expr::Raw("length(var.zones)".to_string()))
        );
        let tags = resource.body.attribute("tags").unwrap();
        assert_eq!(tags.get("Name").and_then(Expr::as_str), Some("web-${var.env}"));
    }

    #[test]
    fn test_comments_are_ignored() {
        let body = parse(
            r#"# leading comment
// another
/* block
   comment */
variable "region" {
  default = "eu-west-1" # trailing
}
"#,
        )
        .unwrap();
        assert_eq!(body.blocks.len(), 1);
        assert_eq!(body.blocks[0].label(0), Some("region"));
    }

    #[test]
    fn test_heredoc_and_for_expression() {
        let body = parse(
            r#"locals {
  policy = <<-EOT
    {"Version": "2012-10-17"}
  EOT
  upper = { for k, v in var.map : k => upper(v) }
  names = [for s in var.list : s.name]
}
"#,
        )
        .unwrap();
        let locals = &body.blocks[0].body;
        assert_eq!(
            locals.attribute("policy").and_then(Expr::as_str),
            Some("{\"Version\": \"2012-10-17\"}\n")
        );
        assert!(matches!(locals.attribute("upper"), Some(Expr::Raw(_))));
        assert!(matches!(locals.attribute("names"), Some(Expr::Raw(_))));
    }

    #[test]
    fn test_tuple_values() {
        let body = parse("azs = [\"a\", \"b\",\n  \"c\"]\n").unwrap();
        match body.attribute("azs") {
            Some(Expr::Tuple(items)) => assert_eq!(items.len(), 3),
            other => panic!("expected tuple, got {:?}", other),
        }
    }

    #[test]
    fn test_syntax_errors() {
        assert!(parse("terraform {\n  required_version = \">= 1.0\"\n").is_err());
        assert!(parse("}\n").is_err());
        assert!(parse("resource \"x\"\n").is_err());

        let err = parse("a = \"unterminated\n").unwrap_err();
        assert_eq!(
            err,
            HclError::Syntax {
                line: 1,
                message: "unterminated string".to_string()
            }
        );
    }

    #[test]
    fn test_comparison_is_not_assignment() {
        let body = parse("enabled = var.env == \"prod\"\n").unwrap();
        assert_eq!(
            body.attribute("enabled"),
            Some(&Expr::Raw("var.env == \"prod\"".to_string()))
        );
    }
}
