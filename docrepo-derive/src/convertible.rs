use proc_macro::TokenStream;
use proc_macro2::{Ident, Span};
use quote::quote;
use syn::{Attribute, DataEnum, DataStruct, DeriveInput, Field, LitStr, Result, Type};

/// Field names listed in `#[converter(ignored = "a, b")]`.
pub(crate) fn ignored_fields(attrs: &[Attribute]) -> Result<Vec<String>> {
    let mut ignored = vec![];
    for attr in attrs {
        if attr.path().is_ident("converter") {
            attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("ignored") {
                    let value = meta.value()?;
                    let s: LitStr = value.parse()?;
                    ignored.extend(s.value().split(',').map(|field| field.trim().to_string()));
                    Ok(())
                } else {
                    Err(meta.error("Unknown converter attribute"))
                }
            })?;
        }
    }
    Ok(ignored)
}

pub(crate) fn named_fields<'a>(ast: &DeriveInput, data: &'a DataStruct) -> Result<Vec<&'a Field>> {
    match &data.fields {
        syn::Fields::Named(fields) => Ok(fields.named.iter().collect()),
        _ => Err(syn::Error::new_spanned(ast, "only structs with named fields are supported")),
    }
}

pub(crate) fn generate_convertible_for_struct(ast: &DeriveInput, data: &DataStruct) -> Result<TokenStream> {
    let ignored = ignored_fields(&ast.attrs)?;
    let fields = named_fields(ast, data)?;

    let persisted: Vec<&Ident> = fields
        .iter()
        .filter_map(|f| f.ident.as_ref())
        .filter(|ident| !ignored.contains(&ident.to_string()))
        .collect();
    let persisted_names: Vec<String> = persisted.iter().map(|i| i.to_string()).collect();

    // a missing or null field takes its default, so projected documents
    // still map back to the full type
    let initializers: Vec<proc_macro2::TokenStream> = fields
        .iter()
        .filter_map(|f| f.ident.as_ref().map(|ident| (ident, &f.ty)))
        .map(|(ident, ty)| {
            let name = ident.to_string();
            if ignored.contains(&name) {
                quote! { #ident: Default::default() }
            } else {
                quote! {
                    #ident: {
                        let value = doc.get(#name)?;
                        if value.is_null() {
                            Default::default()
                        } else {
                            docrepo::common::from_value::<#ty>(&value)?
                        }
                    }
                }
            }
        })
        .collect();

    let name = &ast.ident;
    let name_str = name.to_string();
    let (impl_generics, ty_generics, where_clause) = ast.generics.split_for_impl();

    let gen = quote! {
        impl #impl_generics docrepo::common::Convertible for #name #ty_generics #where_clause {
            type Output = Self;

            fn to_value(&self) -> docrepo::errors::RepoResult<docrepo::common::Value> {
                let mut doc = docrepo::common::Document::new();
                #(doc.put(#persisted_names, docrepo::common::Convertible::to_value(&self.#persisted)?)?;)*
                Ok(docrepo::common::Value::Document(doc))
            }

            fn from_value(value: &docrepo::common::Value) -> docrepo::errors::RepoResult<Self::Output> {
                match value {
                    docrepo::common::Value::Document(doc) => Ok(#name {
                        #(#initializers,)*
                    }),
                    other => Err(docrepo::errors::RepoError::new(
                        &format!("cannot map {} to {}", other.type_name(), #name_str),
                        docrepo::errors::ErrorKind::ObjectMappingError,
                    )),
                }
            }
        }
    };

    Ok(TokenStream::from(gen))
}

pub(crate) fn generate_convertible_for_enum(ast: &DeriveInput, data: &DataEnum) -> Result<TokenStream> {
    let name = &ast.ident;
    let name_str = name.to_string();
    let (impl_generics, ty_generics, where_clause) = ast.generics.split_for_impl();
    let ignored = ignored_fields(&ast.attrs)?;

    let mut to_value_variants = Vec::with_capacity(data.variants.len());
    let mut from_value_variants = Vec::with_capacity(data.variants.len());

    for variant in &data.variants {
        let variant_ident = &variant.ident;
        let variant_name = variant_ident.to_string();

        match &variant.fields {
            syn::Fields::Named(fields) => {
                let all_idents: Vec<&Ident> = fields.named.iter().filter_map(|f| f.ident.as_ref()).collect();
                let persisted: Vec<&Ident> = all_idents
                    .iter()
                    .copied()
                    .filter(|ident| !ignored.contains(&ident.to_string()))
                    .collect();
                let persisted_names: Vec<String> = persisted.iter().map(|i| i.to_string()).collect();

                to_value_variants.push(quote! {
                    #name::#variant_ident { #(ref #all_idents),* } => {
                        let mut doc = docrepo::common::Document::new();
                        #(doc.put(#persisted_names, docrepo::common::Convertible::to_value(#persisted)?)?;)*
                        let mut document = docrepo::common::Document::new();
                        document.insert("variant", #variant_name);
                        document.insert("value", docrepo::common::Value::Document(doc));
                        Ok(docrepo::common::Value::Document(document))
                    }
                });

                let initializers: Vec<proc_macro2::TokenStream> = fields
                    .named
                    .iter()
                    .filter_map(|f| f.ident.as_ref().map(|ident| (ident, &f.ty)))
                    .map(|(ident, ty)| {
                        let field_name = ident.to_string();
                        if ignored.contains(&field_name) {
                            quote! { #ident: Default::default() }
                        } else {
                            quote! { #ident: docrepo::common::from_value::<#ty>(&data.get(#field_name)?)? }
                        }
                    })
                    .collect();

                from_value_variants.push(quote! {
                    #variant_name => {
                        let data = doc.get("value")?;
                        let data = match data.as_document() {
                            Some(data) => data,
                            None => {
                                return Err(docrepo::errors::RepoError::new(
                                    &format!("value of {}::{} is not a document", #name_str, #variant_name),
                                    docrepo::errors::ErrorKind::ObjectMappingError,
                                ))
                            }
                        };
                        Ok(#name::#variant_ident {
                            #(#initializers,)*
                        })
                    }
                });
            }
            syn::Fields::Unnamed(fields) => {
                let field_count = fields.unnamed.len();
                let field_idents: Vec<Ident> = (0..field_count)
                    .map(|i| Ident::new(&format!("field_{}", i), Span::call_site()))
                    .collect();

                to_value_variants.push(quote! {
                    #name::#variant_ident(#(#field_idents),*) => {
                        let mut array = Vec::with_capacity(#field_count);
                        #(array.push(docrepo::common::Convertible::to_value(#field_idents)?);)*
                        let mut document = docrepo::common::Document::new();
                        document.insert("variant", #variant_name);
                        document.insert("value", docrepo::common::Value::Array(array));
                        Ok(docrepo::common::Value::Document(document))
                    }
                });

                let field_indices: Vec<usize> = (0..field_count).collect();
                let field_types: Vec<&Type> = fields.unnamed.iter().map(|f| &f.ty).collect();

                from_value_variants.push(quote! {
                    #variant_name => {
                        let data = doc.get("value")?;
                        let data = match data.as_array() {
                            Some(data) if data.len() == #field_count => data,
                            _ => {
                                return Err(docrepo::errors::RepoError::new(
                                    &format!("value of {}::{} is not an array of {}", #name_str, #variant_name, #field_count),
                                    docrepo::errors::ErrorKind::ObjectMappingError,
                                ))
                            }
                        };
                        Ok(#name::#variant_ident(
                            #(docrepo::common::from_value::<#field_types>(&data[#field_indices])?,)*
                        ))
                    }
                });
            }
            syn::Fields::Unit => {
                to_value_variants.push(quote! {
                    #name::#variant_ident => {
                        let mut document = docrepo::common::Document::new();
                        document.insert("variant", #variant_name);
                        document.insert("value", docrepo::common::Value::Null);
                        Ok(docrepo::common::Value::Document(document))
                    }
                });

                from_value_variants.push(quote! {
                    #variant_name => Ok(#name::#variant_ident)
                });
            }
        }
    }

    let gen = quote! {
        impl #impl_generics docrepo::common::Convertible for #name #ty_generics #where_clause {
            type Output = Self;

            fn to_value(&self) -> docrepo::errors::RepoResult<docrepo::common::Value> {
                match self {
                    #(#to_value_variants),*
                }
            }

            fn from_value(value: &docrepo::common::Value) -> docrepo::errors::RepoResult<Self::Output> {
                let doc = match value {
                    docrepo::common::Value::Document(doc) => doc,
                    other => {
                        return Err(docrepo::errors::RepoError::new(
                            &format!("cannot map {} to {}", other.type_name(), #name_str),
                            docrepo::errors::ErrorKind::ObjectMappingError,
                        ))
                    }
                };

                match doc.get("variant")? {
                    docrepo::common::Value::String(variant) => match variant.as_str() {
                        #(#from_value_variants,)*
                        unknown => Err(docrepo::errors::RepoError::new(
                            &format!("unknown variant '{}' of {}", unknown, #name_str),
                            docrepo::errors::ErrorKind::ObjectMappingError,
                        )),
                    },
                    _ => Err(docrepo::errors::RepoError::new(
                        &format!("{} value has no variant name", #name_str),
                        docrepo::errors::ErrorKind::ObjectMappingError,
                    )),
                }
            }
        }
    };

    Ok(TokenStream::from(gen))
}
