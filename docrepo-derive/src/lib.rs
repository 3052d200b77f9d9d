#![recursion_limit = "128"]
//! # docrepo Derive Macros
//!
//! Procedural macros deriving the docrepo traits.
//!
//! ## Macros
//!
//! ### `Convertible`
//!
//! Derives `docrepo::common::Convertible` for structs with named fields and
//! for enums. Structs become documents keyed by field name; a missing or
//! null field reads back as `Default::default()`. Enums become
//! `{ variant, value }` documents.
//!
//! - **Container attribute**: `#[converter(ignored = "a, b")]` skips fields
//!
//! ```rust,ignore
//! use docrepo_derive::Convertible;
//!
//! #[derive(Convertible, Default)]
//! pub struct Address {
//!     pub street: String,
//!     pub city: String,
//! }
//!
//! #[derive(Convertible)]
//! pub enum Status {
//!     Open,
//!     Shipped { carrier: String },
//!     Cancelled(String),
//! }
//! ```
//!
//! ### `Entity`
//!
//! Derives `docrepo::repository::Entity` for structs with named fields,
//! together with a `<Name>Fields` struct of typed field handles. Works
//! together with `Convertible`.
//!
//! - `#[entity(name = "orders")]` sets the collection name (default: the type name)
//! - `#[entity(id(field = "code"))]` names the identity field (default: `id`)
//! - `#[entity(id(field = "id", auto_increment))]` draws `i64` ids from the sequence allocator
//!
//! The identity type is the field's type, or `T` for an `Option<T>` field.
//!
//! ```rust,ignore
//! use docrepo_derive::{Convertible, Entity};
//!
//! #[derive(Entity, Convertible, Default, Debug, Clone)]
//! #[entity(name = "orders", id(field = "id", auto_increment))]
//! pub struct Order {
//!     pub id: i64,
//!     pub customer: String,
//!     pub status: Option<String>,
//! }
//!
//! // generated: pub struct OrderFields { pub id: FieldRef<Order, i64>, ... }
//! let paid = repo.get_list_by(|f| f.status.eq("paid"), FindOptions::new()).await?;
//! ```

extern crate proc_macro;
mod convertible;
mod entity;

use crate::convertible::{generate_convertible_for_enum, generate_convertible_for_struct};
use crate::entity::generate_entity_for_struct;
use proc_macro::TokenStream;
use syn::{Data, DeriveInput};

/// Derives `Convertible` for a struct with named fields or an enum.
#[proc_macro_derive(Convertible, attributes(converter))]
pub fn derive_convert(input: TokenStream) -> TokenStream {
    let ast = syn::parse_macro_input!(input as DeriveInput);

    let result = match ast.data {
        Data::Struct(ref data) => generate_convertible_for_struct(&ast, data),
        Data::Enum(ref data) => generate_convertible_for_enum(&ast, data),
        Data::Union(_) => Err(syn::Error::new_spanned(
            &ast,
            "Cannot derive Convertible for unions. Unions are not supported by the Convertible derive macro.",
        )),
    };

    match result {
        Ok(token_stream) => token_stream,
        Err(e) => e.to_compile_error().into(),
    }
}

/// Derives `Entity` and the typed field handles of a struct.
///
/// Must be used with `#[derive(Convertible)]` and a `Default` impl.
#[proc_macro_derive(Entity, attributes(entity))]
pub fn derive_entity(input: TokenStream) -> TokenStream {
    let ast = syn::parse_macro_input!(input as DeriveInput);

    match ast.data {
        Data::Struct(ref data) => match generate_entity_for_struct(&ast, data) {
            Ok(token_stream) => token_stream,
            Err(e) => {
                let error = syn::Error::new(
                    e.span(),
                    format!(
                        "Failed to derive Entity for struct '{}': {}.\n\
                         Example: #[entity(id(field = \"id\"))] pub struct MyEntity {{ id: String }}",
                        ast.ident, e
                    ),
                );
                error.to_compile_error().into()
            }
        },
        Data::Enum(_) => {
            let error = syn::Error::new_spanned(&ast, "Cannot derive Entity for enums. Only structs are supported.");
            error.to_compile_error().into()
        }
        Data::Union(_) => {
            let error = syn::Error::new_spanned(&ast, "Cannot derive Entity for unions. Only structs are supported.");
            error.to_compile_error().into()
        }
    }
}
