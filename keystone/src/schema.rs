//! Column declarations for the command line.
//!
//! A declaration is `NAME=TYPE`, with
//!
//! ```text
//! TYPE := dict | plain | array<TYPE> | struct<TYPE, ...>
//! ```
//!
//! Nested primitive columns are named after their position: `NAME.item`
//! for an array element and `NAME.<i>` for the i-th struct field, so
//! `addr=struct<dict, array<dict>>` declares `addr.0` and `addr.1.item`.

use keystone_base::{err, ColumnDescriptor, ColumnId, ColumnKind, Result, Schema};

pub fn parse_schema<S: AsRef<str>>(decls: &[S]) -> Result<Schema> {
    let mut columns = Vec::with_capacity(decls.len());
    for decl in decls {
        let col = parse_column(decl.as_ref())?;
        if columns.iter().any(|c: &ColumnDescriptor| c.id == col.id) {
            return Err(err(format!("column {} declared twice", col.id)));
        }
        columns.push(col);
    }
    Ok(Schema::new(columns))
}

pub fn parse_column(decl: &str) -> Result<ColumnDescriptor> {
    let (name, ty) = decl
        .split_once('=')
        .ok_or_else(|| err(format!("column declaration {:?} is not NAME=TYPE", decl)))?;
    let name = name.trim();
    if !is_valid_name(name) {
        return Err(err(format!(
            "invalid column name {:?}: use letters, digits, '_' or '-'",
            name
        )));
    }
    let mut parser = TypeParser { text: ty, pos: 0 };
    let col = parser
        .parse_type(ColumnId::new(name))
        .map_err(|e| err(format!("column {}: {}", name, e)))?;
    parser.skip_ws();
    if parser.pos != ty.len() {
        return Err(err(format!(
            "column {}: unexpected {:?} after type",
            name,
            &ty[parser.pos..]
        )));
    }
    Ok(col)
}

fn is_valid_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

struct TypeParser<'a> {
    text: &'a str,
    pos: usize,
}

impl<'a> TypeParser<'a> {
    fn skip_ws(&mut self) {
        let rest = &self.text[self.pos..];
        self.pos += rest.len() - rest.trim_start().len();
    }

    fn word(&mut self) -> &'a str {
        self.skip_ws();
        let text = self.text;
        let rest = &text[self.pos..];
        let n = rest
            .find(|c: char| !c.is_ascii_alphabetic())
            .unwrap_or(rest.len());
        self.pos += n;
        &rest[..n]
    }

    fn eat(&mut self, c: char) -> bool {
        self.skip_ws();
        if self.text[self.pos..].starts_with(c) {
            self.pos += c.len_utf8();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, c: char) -> Result<()> {
        if self.eat(c) {
            Ok(())
        } else {
            Err(err(format!("expected '{}' at offset {}", c, self.pos)))
        }
    }

    fn parse_type(&mut self, id: ColumnId) -> Result<ColumnDescriptor> {
        let kind = match self.word() {
            "dict" => ColumnKind::Primitive { dictionary: true },
            "plain" => ColumnKind::Primitive { dictionary: false },
            "array" => {
                self.expect('<')?;
                let item = self.parse_type(id.array_item())?;
                self.expect('>')?;
                ColumnKind::Array(Box::new(item))
            }
            "struct" => {
                self.expect('<')?;
                let mut fields = Vec::new();
                loop {
                    fields.push(self.parse_type(id.struct_field(fields.len()))?);
                    if self.eat('>') {
                        break;
                    }
                    self.expect(',')?;
                }
                ColumnKind::Struct(fields)
            }
            "" => return Err(err(format!("expected a type at offset {}", self.pos))),
            other => {
                return Err(err(format!(
                    "unknown type {:?}, expected dict, plain, array<..> or struct<..>",
                    other
                )))
            }
        };
        Ok(ColumnDescriptor { id, kind })
    }
}
