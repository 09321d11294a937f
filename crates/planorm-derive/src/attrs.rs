//! Field-level `#[orm(...)]` attribute parsing.

use syn::Result;

/// Parsed `#[orm(...)]` content of one field.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub(crate) struct FieldAttr {
    /// The field carries at least one `#[orm]` attribute.
    pub annotated: bool,
    pub skip: bool,
    pub flatten: bool,
    pub auto_incr: bool,
    pub column: Option<String>,
    pub table: Option<String>,
    /// Raw tag, used verbatim.
    pub tag: Option<String>,
}

impl FieldAttr {
    /// Mapping tag in the runtime grammar (`-`, `name`, `name,auto_incr`, ...). `None` for
    /// unannotated fields.
    pub fn tag_string(&self) -> Option<String> {
        if let Some(tag) = &self.tag {
            return Some(tag.clone());
        }
        if self.skip {
            return Some("-".to_string());
        }
        if !self.annotated {
            return None;
        }
        let mut tag = self.column.clone().unwrap_or_default();
        if self.auto_incr {
            if !tag.is_empty() {
                tag.push(',');
            }
            tag.push_str("auto_incr");
        }
        Some(tag)
    }

    fn merge(&mut self, other: FieldAttr) {
        self.skip |= other.skip;
        self.flatten |= other.flatten;
        self.auto_incr |= other.auto_incr;
        if other.column.is_some() {
            self.column = other.column;
        }
        if other.table.is_some() {
            self.table = other.table;
        }
        if other.tag.is_some() {
            self.tag = other.tag;
        }
    }
}

impl syn::parse::Parse for FieldAttr {
    fn parse(input: syn::parse::ParseStream) -> Result<Self> {
        let mut attr = FieldAttr {
            annotated: true,
            ..FieldAttr::default()
        };

        // Comma-separated flags or key = "value" pairs
        loop {
            if input.is_empty() {
                break;
            }

            let ident: syn::Ident = input.parse()?;
            if input.peek(syn::Token![=]) {
                let _: syn::Token![=] = input.parse()?;
                let value: syn::LitStr = input.parse()?;
                match ident.to_string().as_str() {
                    "column" => attr.column = Some(value.value()),
                    "table" => attr.table = Some(value.value()),
                    "tag" => attr.tag = Some(value.value()),
                    _ => {
                        return Err(syn::Error::new_spanned(
                            &ident,
                            "unknown orm key; expected `column`, `table` or `tag`",
                        ));
                    }
                }
            } else {
                match ident.to_string().as_str() {
                    "skip" => attr.skip = true,
                    "flatten" => attr.flatten = true,
                    "auto_incr" => attr.auto_incr = true,
                    _ => {
                        return Err(syn::Error::new_spanned(
                            &ident,
                            "unknown orm flag; expected `skip`, `flatten` or `auto_incr`",
                        ));
                    }
                }
            }

            if input.peek(syn::Token![,]) {
                let _: syn::Token![,] = input.parse()?;
            } else {
                break;
            }
        }

        Ok(attr)
    }
}

/// Collect every `#[orm]` attribute on a field into one [`FieldAttr`].
pub(crate) fn field_attr(field: &syn::Field) -> Result<FieldAttr> {
    let mut out = FieldAttr::default();

    for attr in &field.attrs {
        if !attr.path().is_ident("orm") {
            continue;
        }
        out.annotated = true;
        match &attr.meta {
            syn::Meta::Path(_) => {}
            syn::Meta::List(list) => out.merge(syn::parse2::<FieldAttr>(list.tokens.clone())?),
            syn::Meta::NameValue(nv) => {
                return Err(syn::Error::new_spanned(
                    nv,
                    "expected #[orm] or #[orm(...)], not #[orm = ...]",
                ));
            }
        }
    }

    if out.flatten && (out.skip || out.column.is_some() || out.auto_incr || out.tag.is_some()) {
        return Err(syn::Error::new_spanned(
            field,
            "#[orm(flatten)] cannot be combined with skip, column, auto_incr or tag",
        ));
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use syn::parse_quote;

    fn attr_of(field: syn::Field) -> FieldAttr {
        field_attr(&field).unwrap()
    }

    fn named(fields: syn::FieldsNamed) -> syn::Field {
        fields.named.into_iter().next().unwrap()
    }

    #[test]
    fn unannotated_field_has_no_tag() {
        let f = named(parse_quote!({ age: i32 }));
        let attr = attr_of(f);
        assert!(!attr.annotated);
        assert_eq!(attr.tag_string(), None);
    }

    #[test]
    fn bare_orm_is_annotated_without_rename() {
        let f = named(parse_quote!({ #[orm] age: i32 }));
        assert_eq!(attr_of(f).tag_string().as_deref(), Some(""));

        let f = named(parse_quote!({ #[orm(table = "posts")] title: String }));
        let attr = attr_of(f);
        assert_eq!(attr.tag_string().as_deref(), Some(""));
        assert_eq!(attr.table.as_deref(), Some("posts"));
    }

    #[test]
    fn column_and_auto_incr_build_tag() {
        let f = named(parse_quote!({ #[orm(column = "uid", auto_incr)] id: i64 }));
        assert_eq!(attr_of(f).tag_string().as_deref(), Some("uid,auto_incr"));

        let f = named(parse_quote!({ #[orm(auto_incr)] id: i64 }));
        assert_eq!(attr_of(f).tag_string().as_deref(), Some("auto_incr"));

        let f = named(parse_quote!({ #[orm(column = "n")] name: String }));
        assert_eq!(attr_of(f).tag_string().as_deref(), Some("n"));
    }

    #[test]
    fn skip_and_raw_tag() {
        let f = named(parse_quote!({ #[orm(skip)] cache: Vec<u8> }));
        assert_eq!(attr_of(f).tag_string().as_deref(), Some("-"));

        let f = named(parse_quote!({ #[orm(tag = "x,auto_incr")] id: i64 }));
        assert_eq!(attr_of(f).tag_string().as_deref(), Some("x,auto_incr"));
    }

    #[test]
    fn attributes_merge_across_lines() {
        let f = named(parse_quote!({
            #[orm(column = "uid")]
            #[orm(auto_incr)]
            id: i64
        }));
        assert_eq!(attr_of(f).tag_string().as_deref(), Some("uid,auto_incr"));
    }

    #[test]
    fn invalid_attributes_are_rejected() {
        let f = named(parse_quote!({ #[orm(primary)] id: i64 }));
        assert!(field_attr(&f).is_err());

        let f = named(parse_quote!({ #[orm(name = "x")] id: i64 }));
        assert!(field_attr(&f).is_err());

        let f = named(parse_quote!({ #[orm(flatten, skip)] base: Base }));
        assert!(field_attr(&f).is_err());
    }
}
