//! Record derive macro implementation

use crate::attrs::{FieldAttr, field_attr};
use crate::common::syn_types::{is_phantom, option_inner};
use proc_macro2::TokenStream;
use quote::quote;
use syn::{Data, DeriveInput, Fields, Result};

/// Identifier of the legacy id field; keeps working accessors even when skipped.
const LEGACY_ID_FIELD: &str = "last_insert_id";

enum Slot<'a> {
    /// One column backed by the field itself.
    Column {
        ident: &'a syn::Ident,
        ty: &'a syn::Type,
        attr: FieldAttr,
    },
    /// A skipped field: described, never read or written.
    Skipped { ident: &'a syn::Ident },
    /// An embedded record contributing all of its descriptors.
    Flatten {
        ident: &'a syn::Ident,
        ty: &'a syn::Type,
    },
}

pub fn expand(input: DeriveInput) -> Result<TokenStream> {
    let name = &input.ident;

    if !input.generics.params.is_empty() {
        return Err(syn::Error::new_spanned(
            &input.generics,
            "Record cannot be derived for generic structs",
        ));
    }

    let fields = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(fields) => &fields.named,
            _ => {
                return Err(syn::Error::new_spanned(
                    &input,
                    "Record can only be derived for structs with named fields",
                ));
            }
        },
        _ => {
            return Err(syn::Error::new_spanned(
                &input,
                "Record can only be derived for structs",
            ));
        }
    };

    let mut slots = Vec::with_capacity(fields.len());
    for field in fields {
        let Some(ident) = field.ident.as_ref() else {
            continue;
        };
        let attr = field_attr(field)?;
        let legacy = ident == LEGACY_ID_FIELD;

        let slot = if attr.flatten {
            if option_inner(&field.ty).is_some() {
                return Err(syn::Error::new_spanned(
                    &field.ty,
                    "#[orm(flatten)] needs a Record type, not an Option",
                ));
            }
            Slot::Flatten {
                ident,
                ty: &field.ty,
            }
        } else if (attr.skip && !legacy) || is_phantom(&field.ty) {
            Slot::Skipped { ident }
        } else {
            Slot::Column {
                ident,
                ty: &field.ty,
                attr,
            }
        };
        slots.push(slot);
    }

    let descriptors = slots.iter().map(descriptor_tokens);
    let getters = slots.iter().map(getter_tokens);
    let setters = slots.iter().map(setter_tokens);
    let type_name = name.to_string();

    Ok(quote! {
        impl ::planorm::Record for #name {
            fn descriptors() -> &'static [::planorm::FieldDescriptor] {
                static DESCRIPTORS: ::std::sync::OnceLock<::std::vec::Vec<::planorm::FieldDescriptor>> =
                    ::std::sync::OnceLock::new();
                DESCRIPTORS.get_or_init(|| {
                    let mut d = ::std::vec::Vec::new();
                    #(#descriptors)*
                    d
                })
            }

            #[allow(unused_assignments, unused_variables)]
            fn get(&self, index: usize) -> ::planorm::Value {
                let mut offset = 0usize;
                #(#getters)*
                ::planorm::Value::Null
            }

            #[allow(unused_assignments, unused_variables)]
            fn set(&mut self, index: usize, value: ::planorm::Value) -> ::planorm::OrmResult<()> {
                let mut offset = 0usize;
                #(#setters)*
                ::std::result::Result::Err(::planorm::OrmError::argument(::std::format!(
                    "{} has no field at index {}",
                    #type_name,
                    index
                )))
            }
        }
    })
}

fn descriptor_tokens(slot: &Slot<'_>) -> TokenStream {
    match slot {
        Slot::Column { ident, ty, attr } => {
            let ident = ident.to_string();
            let tag = attr.tag_string().map(|tag| quote! { .tag(#tag) });
            let table = attr.table.as_ref().map(|table| quote! { .table(#table) });
            quote! {
                d.push(
                    ::planorm::FieldDescriptor::new(#ident, <#ty as ::planorm::FromValue>::KIND)
                        #tag
                        #table
                        .nullable(<#ty as ::planorm::FromValue>::NULLABLE),
                );
            }
        }
        Slot::Skipped { ident } => {
            let ident = ident.to_string();
            quote! {
                d.push(
                    ::planorm::FieldDescriptor::new(#ident, ::planorm::ValueKind::Opaque).tag("-"),
                );
            }
        }
        Slot::Flatten { ty, .. } => quote! {
            d.extend_from_slice(<#ty as ::planorm::Record>::descriptors());
        },
    }
}

fn getter_tokens(slot: &Slot<'_>) -> TokenStream {
    match slot {
        Slot::Column { ident, .. } => quote! {
            if index == offset {
                return ::planorm::ToValue::to_value(&self.#ident);
            }
            offset += 1;
        },
        Slot::Skipped { .. } => quote! {
            if index == offset {
                return ::planorm::Value::Null;
            }
            offset += 1;
        },
        Slot::Flatten { ident, ty } => quote! {
            let len = <#ty as ::planorm::Record>::descriptors().len();
            if index < offset + len {
                return ::planorm::Record::get(&self.#ident, index - offset);
            }
            offset += len;
        },
    }
}

fn setter_tokens(slot: &Slot<'_>) -> TokenStream {
    match slot {
        Slot::Column { ident, ty, .. } => quote! {
            if index == offset {
                self.#ident = <#ty as ::planorm::FromValue>::from_value(value)?;
                return ::std::result::Result::Ok(());
            }
            offset += 1;
        },
        Slot::Skipped { .. } => quote! {
            if index == offset {
                return ::std::result::Result::Ok(());
            }
            offset += 1;
        },
        Slot::Flatten { ident, ty } => quote! {
            let len = <#ty as ::planorm::Record>::descriptors().len();
            if index < offset + len {
                return ::planorm::Record::set(&mut self.#ident, index - offset, value);
            }
            offset += len;
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use syn::parse_quote;

    #[test]
    fn rejects_non_structs_and_generics() {
        let input: DeriveInput = parse_quote! {
            enum E { A, B }
        };
        assert!(expand(input).is_err());

        let input: DeriveInput = parse_quote! {
            struct T(i32);
        };
        assert!(expand(input).is_err());

        let input: DeriveInput = parse_quote! {
            struct G<T> { v: T }
        };
        assert!(expand(input).is_err());
    }

    #[test]
    fn expands_descriptor_table_and_accessors() {
        let input: DeriveInput = parse_quote! {
            struct User {
                #[orm(auto_incr)]
                id: i64,
                #[orm(column = "user_name")]
                name: String,
                #[orm(skip)]
                cache: Vec<u8>,
            }
        };
        let out = expand(input).unwrap().to_string();
        assert!(out.contains("impl :: planorm :: Record for User"));
        assert!(out.contains("\"user_name\""));
        assert!(out.contains("\"auto_incr\""));
        assert!(out.contains("ValueKind :: Opaque"));
    }

    #[test]
    fn skipped_legacy_id_keeps_accessors() {
        let input: DeriveInput = parse_quote! {
            struct Legacy {
                #[orm]
                name: String,
                #[orm(skip)]
                last_insert_id: i64,
            }
        };
        let out = expand(input).unwrap().to_string();
        assert!(!out.contains("Opaque"));
        assert!(out.contains("self . last_insert_id ="));
    }

    #[test]
    fn flatten_option_is_rejected() {
        let input: DeriveInput = parse_quote! {
            struct Outer {
                #[orm(flatten)]
                inner: Option<Inner>,
            }
        };
        assert!(expand(input).is_err());
    }
}
