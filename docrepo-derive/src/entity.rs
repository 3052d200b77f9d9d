use crate::convertible::{ignored_fields, named_fields};
use proc_macro::TokenStream;
use proc_macro2::Ident;
use quote::{format_ident, quote, ToTokens};
use syn::{DataStruct, DeriveInput, GenericArgument, LitStr, PathArguments, Result, Type};

pub(crate) fn generate_entity_for_struct(ast: &DeriveInput, data: &DataStruct) -> Result<TokenStream> {
    let name = &ast.ident;
    if !ast.generics.params.is_empty() {
        return Err(syn::Error::new_spanned(&ast.generics, "generic entities are not supported"));
    }

    let mut entity_name = name.to_string();
    let mut id_field: Option<String> = None;
    let mut auto_increment = false;
    let mut id_found = false;

    for attr in &ast.attrs {
        if attr.path().is_ident("entity") {
            attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("name") {
                    let value = meta.value()?;
                    let s: LitStr = value.parse()?;
                    entity_name = s.value();
                    Ok(())
                } else if meta.path.is_ident("id") {
                    if id_found {
                        return Err(meta.error("Multiple id attributes are not allowed"));
                    }
                    id_found = true;

                    meta.parse_nested_meta(|meta| {
                        if meta.path.is_ident("field") {
                            let value = meta.value()?;
                            let s: LitStr = value.parse()?;
                            id_field = Some(s.value());
                            Ok(())
                        } else if meta.path.is_ident("auto_increment") {
                            auto_increment = true;
                            Ok(())
                        } else {
                            Err(meta.error("Unknown id attribute"))
                        }
                    })
                } else {
                    Err(meta.error("Unknown entity attribute"))
                }
            })?
        }
    }

    let ignored = ignored_fields(&ast.attrs)?;
    let fields: Vec<(&Ident, &Type)> = named_fields(ast, data)?
        .into_iter()
        .filter_map(|f| f.ident.as_ref().map(|ident| (ident, &f.ty)))
        .filter(|(ident, _)| !ignored.contains(&ident.to_string()))
        .collect();

    let id_field = id_field.unwrap_or_else(|| "id".to_string());
    let (id_ident, id_type) = match fields.iter().find(|(ident, _)| **ident == id_field) {
        Some((ident, ty)) => (*ident, *ty),
        None => {
            return Err(syn::Error::new_spanned(
                ast,
                format!("identity field '{}' not found in struct", id_field),
            ))
        }
    };

    let optional_id = option_inner(id_type);
    let key_type = optional_id.unwrap_or(id_type);

    if auto_increment && (optional_id.is_some() || key_type.to_token_stream().to_string() != "i64") {
        return Err(syn::Error::new_spanned(
            id_type,
            "auto_increment requires a plain i64 identity field",
        ));
    }

    let key_code = if optional_id.is_some() {
        quote! {
            fn key(&self) -> Option<#key_type> {
                self.#id_ident
                    .clone()
                    .filter(|key| !docrepo::repository::EntityKey::is_absent(key))
            }

            fn set_key(&mut self, key: #key_type) {
                self.#id_ident = Some(key);
            }
        }
    } else {
        quote! {
            fn key(&self) -> Option<#key_type> {
                if docrepo::repository::EntityKey::is_absent(&self.#id_ident) {
                    None
                } else {
                    Some(self.#id_ident.clone())
                }
            }

            fn set_key(&mut self, key: #key_type) {
                self.#id_ident = key;
            }
        }
    };

    // typed handles see through Option, so `f.status.eq("paid")` works
    // for an `Option<String>` field
    let vis = &ast.vis;
    let fields_name = format_ident!("{}Fields", name);
    let field_idents: Vec<&Ident> = fields.iter().map(|(ident, _)| *ident).collect();
    let field_names: Vec<String> = field_idents.iter().map(|ident| ident.to_string()).collect();
    let handle_types: Vec<&Type> = fields
        .iter()
        .map(|(_, ty)| option_inner(ty).unwrap_or(*ty))
        .collect();
    let fields_doc = format!("Typed field handles of [{}].", name);

    let capability_code = if auto_increment {
        quote! {
            fn capability() -> docrepo::repository::Capability<Self> {
                docrepo::repository::Capability::AutoIncrement(
                    <Self as docrepo::repository::AutoIncrement>::set_auto_id,
                )
            }
        }
    } else {
        quote! {}
    };

    let auto_increment_code = if auto_increment {
        quote! {
            impl docrepo::repository::AutoIncrement for #name {
                fn set_auto_id(&mut self, id: i64) {
                    self.#id_ident = id;
                }
            }
        }
    } else {
        quote! {}
    };

    let gen = quote! {
        #[doc = #fields_doc]
        #[derive(Debug, Clone, Copy)]
        #vis struct #fields_name {
            #(pub #field_idents: docrepo::filter::FieldRef<#name, #handle_types>,)*
        }

        impl docrepo::repository::Entity for #name {
            type Key = #key_type;
            type Fields = #fields_name;

            fn entity_name() -> &'static str {
                #entity_name
            }

            fn id_field() -> &'static str {
                #id_field
            }

            fn field_names() -> &'static [&'static str] {
                &[#(#field_names),*]
            }

            fn fields() -> #fields_name {
                #fields_name {
                    #(#field_idents: docrepo::filter::FieldRef::new(#field_names),)*
                }
            }

            #key_code

            #capability_code
        }

        #auto_increment_code
    };

    Ok(TokenStream::from(gen))
}

/// `T` for a type written as `Option<T>`.
fn option_inner(ty: &Type) -> Option<&Type> {
    let path = match ty {
        Type::Path(path) if path.qself.is_none() => &path.path,
        _ => return None,
    };
    let segment = path.segments.last()?;
    if segment.ident != "Option" {
        return None;
    }
    match &segment.arguments {
        PathArguments::AngleBracketed(args) if args.args.len() == 1 => match args.args.first() {
            Some(GenericArgument::Type(inner)) => Some(inner),
            _ => None,
        },
        _ => None,
    }
}
