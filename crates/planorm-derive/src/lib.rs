//! Derive macros for planorm
//!
//! Provides `#[derive(Record)]`.

use proc_macro::TokenStream;
use syn::{DeriveInput, parse_macro_input};

mod attrs;
mod common;
mod record;

/// Derive the `Record` trait for a struct with named fields.
///
/// # Example
///
/// ```ignore
/// use planorm::Record;
///
/// #[derive(Default, Record)]
/// struct User {
///     #[orm(auto_incr)]
///     id: i64,
///     #[orm(column = "user_name")]
///     name: String,
///     #[orm]
///     age: i32,
///     nickname: Option<String>,
///     #[orm(skip)]
///     scratch: Vec<u8>,
/// }
/// ```
///
/// # Attributes
///
/// - `#[orm]` - Mark the field as mapped without renaming it
/// - `#[orm(column = "name")]` - Map the field to a different column
/// - `#[orm(auto_incr)]` - Auto-increment key; receives the generated id on insert
/// - `#[orm(table = "t")]` - Address the column as `t.column` (joins)
/// - `#[orm(tag = "name,auto_incr")]` - Raw mapping tag
/// - `#[orm(skip)]` - Exclude the field from every operation
/// - `#[orm(flatten)]` - Embed another `Record`'s fields in place
///
/// Unannotated fields are written by inserts; selects and updates only include them when the
/// table enables `use_name_when_tag_empty`.
#[proc_macro_derive(Record, attributes(orm))]
pub fn derive_record(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    record::expand(input)
        .unwrap_or_else(|e| e.to_compile_error())
        .into()
}
