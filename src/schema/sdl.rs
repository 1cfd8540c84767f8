//! SDL loader: parse a GraphQL schema definition document.
//!
//! Supports the type-system subset the explorer needs: `schema`, `scalar`,
//! `type`, `interface`, `union`, `enum`, `input` and their `extend` forms.
//! Descriptions, comments and directives are accepted and discarded.
//! Default values are kept as literal text.

use crate::error::{SchemaError, SchemaResult};

use super::{FieldDef, InputValueDef, NamedType, Schema, TypeKind, TypeRef};

#[derive(Debug, Clone, PartialEq)]
enum TokenKind {
    Name(String),
    /// Numeric literal, kept verbatim.
    Number(String),
    /// String or block string literal, kept verbatim including quotes.
    Str(String),
    Punct(char),
    Spread,
    Eof,
}

#[derive(Debug, Clone)]
struct Token {
    kind: TokenKind,
    line: usize,
}

fn tokenize(source: &str) -> SchemaResult<Vec<Token>> {
    let chars: Vec<char> = source.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;
    let mut line = 1;

    while i < chars.len() {
        let c = chars[i];
        match c {
            '\n' => {
                line += 1;
                i += 1;
            }
            c if c.is_whitespace() || c == ',' || c == '\u{feff}' => i += 1,
            '#' => {
                while i < chars.len() && chars[i] != '\n' {
                    i += 1;
                }
            }
            '.' => {
                if chars.get(i + 1) == Some(&'.') && chars.get(i + 2) == Some(&'.') {
                    tokens.push(Token {
                        kind: TokenKind::Spread,
                        line,
                    });
                    i += 3;
                } else {
                    return Err(SchemaError::Parse {
                        line,
                        message: "unexpected '.'".into(),
                    });
                }
            }
            '!' | '$' | '(' | ')' | ':' | '=' | '@' | '[' | ']' | '{' | '}' | '|' | '&' => {
                tokens.push(Token {
                    kind: TokenKind::Punct(c),
                    line,
                });
                i += 1;
            }
            '"' => {
                let start = i;
                let start_line = line;
                let block = chars.get(i + 1) == Some(&'"') && chars.get(i + 2) == Some(&'"');
                if block {
                    i += 3;
                    loop {
                        if i >= chars.len() {
                            return Err(SchemaError::Parse {
                                line: start_line,
                                message: "unterminated block string".into(),
                            });
                        }
                        if chars[i] == '\\'
                            && chars.get(i + 1) == Some(&'"')
                            && chars.get(i + 2) == Some(&'"')
                            && chars.get(i + 3) == Some(&'"')
                        {
                            i += 4;
                            continue;
                        }
                        if chars[i] == '"'
                            && chars.get(i + 1) == Some(&'"')
                            && chars.get(i + 2) == Some(&'"')
                        {
                            i += 3;
                            break;
                        }
                        if chars[i] == '\n' {
                            line += 1;
                        }
                        i += 1;
                    }
                } else {
                    i += 1;
                    loop {
                        match chars.get(i) {
                            None | Some('\n') => {
                                return Err(SchemaError::Parse {
                                    line: start_line,
                                    message: "unterminated string".into(),
                                });
                            }
                            Some('\\') => i += 2,
                            Some('"') => {
                                i += 1;
                                break;
                            }
                            Some(_) => i += 1,
                        }
                    }
                }
                tokens.push(Token {
                    kind: TokenKind::Str(chars[start..i].iter().collect()),
                    line: start_line,
                });
            }
            c if c == '-' || c.is_ascii_digit() => {
                let start = i;
                i += 1;
                while i < chars.len()
                    && (chars[i].is_ascii_alphanumeric() || matches!(chars[i], '.' | '+' | '-'))
                {
                    i += 1;
                }
                tokens.push(Token {
                    kind: TokenKind::Number(chars[start..i].iter().collect()),
                    line,
                });
            }
            c if c == '_' || c.is_ascii_alphabetic() => {
                let start = i;
                while i < chars.len() && (chars[i] == '_' || chars[i].is_ascii_alphanumeric()) {
                    i += 1;
                }
                tokens.push(Token {
                    kind: TokenKind::Name(chars[start..i].iter().collect()),
                    line,
                });
            }
            other => {
                return Err(SchemaError::Parse {
                    line,
                    message: format!("unexpected character '{other}'"),
                });
            }
        }
    }

    tokens.push(Token {
        kind: TokenKind::Eof,
        line,
    });
    Ok(tokens)
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> &TokenKind {
        &self.tokens[self.pos].kind
    }

    fn line(&self) -> usize {
        self.tokens[self.pos].line
    }

    fn advance(&mut self) -> TokenKind {
        let kind = self.tokens[self.pos].kind.clone();
        if self.pos + 1 < self.tokens.len() {
            self.pos += 1;
        }
        kind
    }

    fn error<T>(&self, message: impl Into<String>) -> SchemaResult<T> {
        Err(SchemaError::Parse {
            line: self.line(),
            message: message.into(),
        })
    }

    fn is_punct(&self, c: char) -> bool {
        *self.peek() == TokenKind::Punct(c)
    }

    fn eat_punct(&mut self, c: char) -> bool {
        if self.is_punct(c) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect_punct(&mut self, c: char) -> SchemaResult<()> {
        if self.eat_punct(c) {
            Ok(())
        } else {
            self.error(format!("expected '{c}', found {:?}", self.peek()))
        }
    }

    fn is_keyword(&self, word: &str) -> bool {
        matches!(self.peek(), TokenKind::Name(n) if n == word)
    }

    fn name(&mut self) -> SchemaResult<String> {
        let line = self.line();
        match self.advance() {
            TokenKind::Name(n) => Ok(n),
            other => Err(SchemaError::Parse {
                line,
                message: format!("expected a name, found {other:?}"),
            }),
        }
    }

    fn skip_description(&mut self) {
        if matches!(self.peek(), TokenKind::Str(_)) {
            self.advance();
        }
    }

    fn skip_directives(&mut self) -> SchemaResult<()> {
        while self.eat_punct('@') {
            self.name()?;
            if self.eat_punct('(') {
                while !self.eat_punct(')') {
                    self.name()?;
                    self.expect_punct(':')?;
                    self.value()?;
                }
            }
        }
        Ok(())
    }

    /// Parse a value literal and return its canonical text.
    fn value(&mut self) -> SchemaResult<String> {
        let line = self.line();
        match self.advance() {
            TokenKind::Punct('$') => Ok(format!("${}", self.name()?)),
            TokenKind::Number(n) => Ok(n),
            TokenKind::Str(s) => Ok(s),
            TokenKind::Name(n) => Ok(n),
            TokenKind::Punct('[') => {
                let mut items = Vec::new();
                while !self.eat_punct(']') {
                    if *self.peek() == TokenKind::Eof {
                        return self.error("unterminated list value");
                    }
                    items.push(self.value()?);
                }
                Ok(format!("[{}]", items.join(", ")))
            }
            TokenKind::Punct('{') => {
                let mut fields = Vec::new();
                while !self.eat_punct('}') {
                    let name = self.name()?;
                    self.expect_punct(':')?;
                    fields.push(format!("{name}: {}", self.value()?));
                }
                Ok(format!("{{{}}}", fields.join(", ")))
            }
            other => Err(SchemaError::Parse {
                line,
                message: format!("expected a value, found {other:?}"),
            }),
        }
    }

    fn type_ref(&mut self) -> SchemaResult<TypeRef> {
        let base = if self.eat_punct('[') {
            let inner = self.type_ref()?;
            self.expect_punct(']')?;
            TypeRef::list(inner)
        } else {
            TypeRef::Named(self.name()?)
        };
        if self.eat_punct('!') {
            Ok(TypeRef::non_null(base))
        } else {
            Ok(base)
        }
    }

    fn input_value(&mut self) -> SchemaResult<InputValueDef> {
        self.skip_description();
        let name = self.name()?;
        self.expect_punct(':')?;
        let ty = self.type_ref()?;
        let default_value = if self.eat_punct('=') {
            Some(self.value()?)
        } else {
            None
        };
        self.skip_directives()?;
        Ok(InputValueDef {
            name,
            ty,
            default_value,
        })
    }

    fn arguments_def(&mut self) -> SchemaResult<Vec<InputValueDef>> {
        let mut args = Vec::new();
        if self.eat_punct('(') {
            while !self.eat_punct(')') {
                args.push(self.input_value()?);
            }
        }
        Ok(args)
    }

    fn fields_def(&mut self) -> SchemaResult<Vec<FieldDef>> {
        let mut fields = Vec::new();
        if self.eat_punct('{') {
            while !self.eat_punct('}') {
                self.skip_description();
                let name = self.name()?;
                let args = self.arguments_def()?;
                self.expect_punct(':')?;
                let ty = self.type_ref()?;
                self.skip_directives()?;
                fields.push(FieldDef { name, args, ty });
            }
        }
        Ok(fields)
    }

    fn implements(&mut self) -> SchemaResult<Vec<String>> {
        let mut interfaces = Vec::new();
        if self.is_keyword("implements") {
            self.advance();
            self.eat_punct('&');
            interfaces.push(self.name()?);
            while self.eat_punct('&') {
                interfaces.push(self.name()?);
            }
        }
        Ok(interfaces)
    }

    fn union_members(&mut self) -> SchemaResult<Vec<String>> {
        let mut members = Vec::new();
        if self.eat_punct('=') {
            self.eat_punct('|');
            members.push(self.name()?);
            while self.eat_punct('|') {
                members.push(self.name()?);
            }
        }
        Ok(members)
    }

    fn enum_values(&mut self) -> SchemaResult<Vec<String>> {
        let mut values = Vec::new();
        if self.eat_punct('{') {
            while !self.eat_punct('}') {
                self.skip_description();
                values.push(self.name()?);
                self.skip_directives()?;
            }
        }
        Ok(values)
    }

    fn input_fields(&mut self) -> SchemaResult<Vec<InputValueDef>> {
        let mut fields = Vec::new();
        if self.eat_punct('{') {
            while !self.eat_punct('}') {
                fields.push(self.input_value()?);
            }
        }
        Ok(fields)
    }

    fn skip_directive_definition(&mut self) -> SchemaResult<()> {
        self.expect_punct('@')?;
        self.name()?;
        self.arguments_def()?;
        if self.is_keyword("repeatable") {
            self.advance();
        }
        if !self.is_keyword("on") {
            return self.error("expected 'on' in directive definition");
        }
        self.advance();
        self.eat_punct('|');
        self.name()?;
        while self.eat_punct('|') {
            self.name()?;
        }
        Ok(())
    }

    /// Parse one type definition after its keyword.
    fn type_definition(&mut self, keyword: &str) -> SchemaResult<NamedType> {
        let name = self.name()?;
        let kind = match keyword {
            "scalar" => TypeKind::Scalar,
            "type" => TypeKind::Object,
            "interface" => TypeKind::Interface,
            "union" => TypeKind::Union,
            "enum" => TypeKind::Enum,
            "input" => TypeKind::InputObject,
            other => return self.error(format!("unknown definition keyword '{other}'")),
        };
        let mut ty = NamedType::new(name, kind);
        match kind {
            TypeKind::Scalar => self.skip_directives()?,
            TypeKind::Object | TypeKind::Interface => {
                ty.interfaces = self.implements()?;
                self.skip_directives()?;
                ty.fields = self.fields_def()?;
            }
            TypeKind::Union => {
                self.skip_directives()?;
                ty.members = self.union_members()?;
            }
            TypeKind::Enum => {
                self.skip_directives()?;
                ty.enum_values = self.enum_values()?;
            }
            TypeKind::InputObject => {
                self.skip_directives()?;
                ty.input_fields = self.input_fields()?;
            }
        }
        Ok(ty)
    }

    fn schema_definition(&mut self) -> SchemaResult<Option<String>> {
        self.skip_directives()?;
        self.expect_punct('{')?;
        let mut query = None;
        while !self.eat_punct('}') {
            let operation = self.name()?;
            self.expect_punct(':')?;
            let ty = self.name()?;
            if operation == "query" {
                query = Some(ty);
            }
        }
        Ok(query)
    }
}

fn merge(target: &mut NamedType, extension: NamedType) {
    target.fields.extend(extension.fields);
    target.input_fields.extend(extension.input_fields);
    target.interfaces.extend(extension.interfaces);
    target.members.extend(extension.members);
    target.enum_values.extend(extension.enum_values);
}

impl Schema {
    /// Parse an SDL document into a schema.
    ///
    /// The query root is taken from a `schema { query: ... }` block, or
    /// defaults to the type named `Query`.
    pub fn from_sdl(source: &str) -> SchemaResult<Self> {
        let mut parser = Parser {
            tokens: tokenize(source)?,
            pos: 0,
        };
        let mut types: indexmap::IndexMap<String, NamedType> = indexmap::IndexMap::new();
        let mut query_type: Option<String> = None;

        while *parser.peek() != TokenKind::Eof {
            parser.skip_description();
            let keyword = parser.name()?;
            match keyword.as_str() {
                "schema" => {
                    if let Some(q) = parser.schema_definition()? {
                        query_type = Some(q);
                    }
                }
                "directive" => parser.skip_directive_definition()?,
                "extend" => {
                    let keyword = parser.name()?;
                    if keyword == "schema" {
                        if let Some(q) = parser.schema_definition()? {
                            query_type = Some(q);
                        }
                        continue;
                    }
                    let ext = parser.type_definition(&keyword)?;
                    match types.get_mut(&ext.name) {
                        Some(existing) => merge(existing, ext),
                        None => {
                            types.insert(ext.name.clone(), ext);
                        }
                    }
                }
                other => {
                    let ty = parser.type_definition(other)?;
                    types.insert(ty.name.clone(), ty);
                }
            }
        }

        Schema::new(
            types.into_values(),
            query_type.unwrap_or_else(|| "Query".to_string()),
        )
    }
}
