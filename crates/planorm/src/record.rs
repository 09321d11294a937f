//! Record introspection.
//!
//! A [`Record`] exposes a static table of [`FieldDescriptor`]s plus index-based accessors.
//! `#[derive(Record)]` generates all three; hand-written impls work the same way.
//!
//! [`RecordShape`] is the resolved, per-type view the plan compiler works from: column names,
//! participation flags and the structural fingerprint. Shapes are built once per type and
//! shared through the [`PlanRegistry`](crate::PlanRegistry).

use crate::error::{OrmError, OrmResult};
use crate::value::{Value, ValueKind};
use std::collections::HashMap;
use std::fmt::Write as _;

/// Identifier of the legacy field that receives the generated id when no field is marked
/// `auto_incr`.
pub const LEGACY_ID_FIELD: &str = "last_insert_id";

/// Tag value that excludes a field from every operation.
pub const SKIP_TAG: &str = "-";

/// Tag flag that marks the auto-increment primary key.
pub const AUTO_INCR: &str = "auto_incr";

/// Compile-time description of one record field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldDescriptor {
    /// Rust identifier of the field.
    pub ident: &'static str,
    /// Mapping tag; `None` for unannotated fields. See [`FieldTag::parse`].
    pub tag: Option<&'static str>,
    /// Table qualifier; the column is addressed as `table.column`.
    pub table: Option<&'static str>,
    pub kind: ValueKind,
    pub nullable: bool,
}

impl FieldDescriptor {
    pub const fn new(ident: &'static str, kind: ValueKind) -> Self {
        Self {
            ident,
            tag: None,
            table: None,
            kind,
            nullable: false,
        }
    }

    pub const fn tag(mut self, tag: &'static str) -> Self {
        self.tag = Some(tag);
        self
    }

    pub const fn table(mut self, table: &'static str) -> Self {
        self.table = Some(table);
        self
    }

    pub const fn nullable(mut self, nullable: bool) -> Self {
        self.nullable = nullable;
        self
    }
}

/// A typed record that can be mapped to and from table rows.
///
/// Indices passed to [`Record::get`] and [`Record::set`] are positions in
/// [`Record::descriptors`].
pub trait Record: Default + 'static {
    fn descriptors() -> &'static [FieldDescriptor];

    /// Read the field at `index` as a wire value.
    fn get(&self, index: usize) -> Value;

    /// Scan `value` into the field at `index`.
    fn set(&mut self, index: usize, value: Value) -> OrmResult<()>;
}

/// Parsed form of a field tag.
///
/// | tag | meaning |
/// |---|---|
/// | `-` | excluded |
/// | `name` | column `name` |
/// | `name,auto_incr` | column `name`, auto-increment |
/// | `auto_incr` or empty | snake_case of the identifier |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FieldTag<'a> {
    pub name: Option<&'a str>,
    pub auto_incr: bool,
    pub excluded: bool,
}

impl<'a> FieldTag<'a> {
    pub fn parse(tag: &'a str) -> Self {
        if tag == SKIP_TAG {
            return Self {
                excluded: true,
                ..Self::default()
            };
        }

        let mut parts = tag.split(',').map(str::trim);
        let name = match parts.next() {
            Some("") | Some(AUTO_INCR) | None => None,
            Some(name) => Some(name),
        };
        let auto_incr = tag.split(',').any(|p| p.trim() == AUTO_INCR);

        Self {
            name,
            auto_incr,
            excluded: false,
        }
    }
}

/// Convert a camelCase or PascalCase identifier to snake_case.
///
/// An underscore goes before every uppercase letter that is not preceded by another
/// uppercase letter, then everything is lowercased: `FirstName` → `first_name`,
/// `UserID` → `user_id`, `HTTPServer` → `httpserver`.
pub fn camel_to_snake(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 4);
    let mut prev_upper = false;
    for (i, c) in s.chars().enumerate() {
        let upper = c.is_uppercase();
        if i > 0 && upper && !prev_upper {
            out.push('_');
        }
        out.extend(c.to_lowercase());
        prev_upper = upper;
    }
    out
}

/// One resolved field of a [`RecordShape`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShapeField {
    /// Position in the record's descriptor table.
    pub index: usize,
    pub ident: &'static str,
    /// Column key, qualified as `table.column` when the field names a table.
    pub column: String,
    pub kind: ValueKind,
    pub nullable: bool,
    /// Whether the field carries an annotation.
    pub tagged: bool,
    pub excluded: bool,
    pub auto_incr: bool,
}

/// Resolved mapping information for one record type.
#[derive(Debug, Clone)]
pub struct RecordShape {
    type_name: &'static str,
    fields: Vec<ShapeField>,
    by_column: HashMap<String, usize>,
    auto_incr: Option<usize>,
    legacy_id: Option<usize>,
    fingerprint: String,
}

impl RecordShape {
    /// Build the shape of `R`.
    pub fn of<R: Record>() -> Self {
        Self::from_descriptors(std::any::type_name::<R>(), R::descriptors())
    }

    pub fn from_descriptors(type_name: &'static str, descriptors: &[FieldDescriptor]) -> Self {
        let mut fields = Vec::with_capacity(descriptors.len());
        let mut by_column = HashMap::with_capacity(descriptors.len());
        let mut auto_incr = None;
        let mut legacy_id = None;
        let mut fingerprint = String::with_capacity(descriptors.len() * 16);

        for (index, d) in descriptors.iter().enumerate() {
            let tag = d.tag.map(FieldTag::parse).unwrap_or_default();
            let name = tag
                .name
                .map(str::to_string)
                .unwrap_or_else(|| camel_to_snake(d.ident));
            let column = match d.table {
                Some(table) => format!("{table}.{name}"),
                None => name,
            };

            if !tag.excluded {
                // First declaration wins when two fields resolve to the same column.
                by_column.entry(column.clone()).or_insert(index);
            }
            if tag.auto_incr && auto_incr.is_none() {
                auto_incr = Some(index);
            }
            if d.ident == LEGACY_ID_FIELD {
                legacy_id = Some(index);
            }

            // ident=column, then flags: `#` tagged, `-` excluded, `+` auto_incr.
            let _ = write!(
                fingerprint,
                "{}={}{}{}{}:{}{};",
                d.ident,
                column,
                if d.tag.is_some() { "#" } else { "" },
                if tag.excluded { "-" } else { "" },
                if tag.auto_incr { "+" } else { "" },
                d.kind,
                if d.nullable { "?" } else { "" },
            );

            fields.push(ShapeField {
                index,
                ident: d.ident,
                column,
                kind: d.kind,
                nullable: d.nullable,
                tagged: d.tag.is_some(),
                excluded: tag.excluded,
                auto_incr: tag.auto_incr,
            });
        }

        Self {
            type_name,
            fields,
            by_column,
            auto_incr,
            legacy_id,
            fingerprint,
        }
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Every field in declaration order, excluded ones included.
    pub fn fields(&self) -> &[ShapeField] {
        &self.fields
    }

    /// Ordered field identifiers, columns, flags and kinds. Two record types with the same
    /// fingerprint compile and bind identically.
    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    /// Look up a non-excluded field by column key.
    pub fn field_by_column(&self, column: &str) -> Option<&ShapeField> {
        self.by_column.get(column).map(|&i| &self.fields[i])
    }

    /// Like [`RecordShape::field_by_column`], failing with an argument error for unknown
    /// columns and an unsupported-type error for excluded or opaque fields.
    pub fn require_column(&self, column: &str) -> OrmResult<&ShapeField> {
        if let Some(field) = self.field_by_column(column) {
            if field.kind == ValueKind::Opaque {
                return Err(OrmError::unsupported(format!(
                    "field '{}' of {} has an opaque type",
                    field.ident, self.type_name
                )));
            }
            return Ok(field);
        }
        if let Some(field) = self.fields.iter().find(|f| f.excluded && f.column == column) {
            return Err(OrmError::unsupported(format!(
                "field '{}' of {} is excluded from mapping",
                field.ident, self.type_name
            )));
        }
        Err(OrmError::argument(format!(
            "no field maps to column '{column}' on {}",
            self.type_name
        )))
    }

    /// Non-excluded fields, as selected by `*`.
    pub fn mapped_fields(&self) -> impl Iterator<Item = &ShapeField> {
        self.fields.iter().filter(|f| !f.excluded)
    }

    /// Fields read and written by select/update without an explicit field list.
    pub fn participating_fields(
        &self,
        use_name_when_tag_empty: bool,
    ) -> impl Iterator<Item = &ShapeField> {
        self.mapped_fields()
            .filter(move |f| f.tagged || use_name_when_tag_empty)
    }

    /// Fields written by insert without an explicit field list.
    pub fn insert_fields(&self) -> impl Iterator<Item = &ShapeField> {
        self.mapped_fields().filter(|f| !f.auto_incr)
    }

    /// The field that receives a generated id: the auto-increment field, else the legacy
    /// id field.
    pub fn id_field(&self) -> Option<&ShapeField> {
        self.auto_incr
            .or(self.legacy_id)
            .map(|i| &self.fields[i])
    }
}
