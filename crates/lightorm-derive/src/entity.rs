//! `#[derive(Entity)]` implementation.

use heck::ToSnakeCase;
use proc_macro2::TokenStream;
use quote::quote;
use syn::{Data, DeriveInput, Fields, LitStr, Result};

/// Struct-level `#[orm(...)]` settings.
#[derive(Debug, Default, PartialEq)]
struct EntityAttrs {
    table: Option<String>,
    primary_key: Option<String>,
    columns: Option<Vec<String>>,
}

fn parse_columns(lit: &LitStr) -> Result<Vec<String>> {
    let columns: Vec<String> = lit
        .value()
        .split(',')
        .map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty())
        .collect();
    if columns.is_empty() {
        return Err(syn::Error::new_spanned(lit, "columns must not be empty"));
    }
    Ok(columns)
}

fn parse_entity_attrs(input: &DeriveInput) -> Result<EntityAttrs> {
    let mut attrs = EntityAttrs::default();
    for attr in &input.attrs {
        if !attr.path().is_ident("orm") {
            continue;
        }
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("table") {
                attrs.table = Some(meta.value()?.parse::<LitStr>()?.value());
            } else if meta.path.is_ident("primary_key") {
                attrs.primary_key = Some(meta.value()?.parse::<LitStr>()?.value());
            } else if meta.path.is_ident("columns") {
                let lit: LitStr = meta.value()?.parse()?;
                attrs.columns = Some(parse_columns(&lit)?);
            } else {
                return Err(meta.error("unsupported orm attribute"));
            }
            Ok(())
        })?;
    }
    Ok(attrs)
}

fn is_state_field(field: &syn::Field) -> Result<bool> {
    let mut marked = false;
    for attr in &field.attrs {
        if !attr.path().is_ident("orm") {
            continue;
        }
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("state") {
                marked = true;
                Ok(())
            } else {
                Err(meta.error("unsupported orm field attribute; expected `state`"))
            }
        })?;
    }
    Ok(marked)
}

pub fn expand(input: DeriveInput) -> Result<TokenStream> {
    let name = &input.ident;
    let attrs = parse_entity_attrs(&input)?;

    let fields = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(fields) => &fields.named,
            _ => {
                return Err(syn::Error::new_spanned(
                    &input,
                    "Entity can only be derived for structs with named fields",
                ));
            }
        },
        _ => {
            return Err(syn::Error::new_spanned(
                &input,
                "Entity can only be derived for structs",
            ));
        }
    };

    let columns = attrs.columns.ok_or_else(|| {
        syn::Error::new_spanned(
            &input,
            "Entity requires #[orm(columns = \"col_a, col_b\")] attribute",
        )
    })?;
    let table = attrs
        .table
        .unwrap_or_else(|| name.to_string().to_snake_case());
    let primary_key = attrs.primary_key.unwrap_or_else(|| "id".to_string());

    if !columns.contains(&primary_key) {
        return Err(syn::Error::new_spanned(
            &input,
            format!("primary key `{primary_key}` must be listed in columns"),
        ));
    }

    let mut marked = Vec::new();
    for field in fields {
        if is_state_field(field)? {
            marked.push(field);
        }
    }
    let state_field = match (marked.as_slice(), fields.len()) {
        ([field], _) => *field,
        ([], 1) => fields.first().ok_or_else(|| {
            syn::Error::new_spanned(&input, "Entity requires an EntityState field")
        })?,
        ([], _) => {
            return Err(syn::Error::new_spanned(
                &input,
                "mark the EntityState field with #[orm(state)]",
            ));
        }
        _ => {
            return Err(syn::Error::new_spanned(
                &input,
                "only one field may be marked #[orm(state)]",
            ));
        }
    };
    let state_ident = &state_field.ident;

    let other_inits = fields
        .iter()
        .filter(|f| f.ident != state_field.ident)
        .map(|f| {
            let ident = &f.ident;
            quote! { #ident: ::core::default::Default::default() }
        });

    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    Ok(quote! {
        impl #impl_generics ::lightorm::Entity for #name #ty_generics #where_clause {
            const TABLE: &'static str = #table;
            const PRIMARY_KEY: &'static str = #primary_key;
            const COLUMNS: &'static [&'static str] = &[#(#columns),*];

            fn from_state(state: ::lightorm::EntityState) -> ::lightorm::OrmResult<Self> {
                ::core::result::Result::Ok(Self {
                    #state_ident: state,
                    #(#other_inits,)*
                })
            }

            fn state(&self) -> &::lightorm::EntityState {
                &self.#state_ident
            }

            fn state_mut(&mut self) -> &mut ::lightorm::EntityState {
                &mut self.#state_ident
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use syn::parse_quote;

    #[test]
    fn test_defaults_from_struct_name() {
        let input: DeriveInput = parse_quote! {
            #[orm(columns = "id, name")]
            struct BlogPost { state: EntityState }
        };
        let out = expand(input).unwrap().to_string();
        assert!(out.contains("\"blog_post\""));
        assert!(out.contains("\"id\""));
        assert!(out.contains("\"name\""));
    }

    #[test]
    fn test_parse_entity_attrs() {
        let input: DeriveInput = parse_quote! {
            #[orm(table = "people", primary_key = "pid", columns = " pid ,name,, age ")]
            struct Person { state: EntityState }
        };
        let attrs = parse_entity_attrs(&input).unwrap();
        assert_eq!(
            attrs,
            EntityAttrs {
                table: Some("people".into()),
                primary_key: Some("pid".into()),
                columns: Some(vec!["pid".into(), "name".into(), "age".into()]),
            }
        );
    }

    #[test]
    fn test_requires_columns() {
        let input: DeriveInput = parse_quote! {
            struct User { state: EntityState }
        };
        let err = expand(input).unwrap_err();
        assert!(err.to_string().contains("columns"));
    }

    #[test]
    fn test_primary_key_must_be_declared() {
        let input: DeriveInput = parse_quote! {
            #[orm(columns = "name")]
            struct User { state: EntityState }
        };
        assert!(expand(input).is_err());
    }

    #[test]
    fn test_state_marker_required_with_many_fields() {
        let unmarked: DeriveInput = parse_quote! {
            #[orm(columns = "id")]
            struct User { state: EntityState, cache: Vec<u8> }
        };
        assert!(expand(unmarked).is_err());

        let marked: DeriveInput = parse_quote! {
            #[orm(columns = "id")]
            struct User { #[orm(state)] state: EntityState, cache: Vec<u8> }
        };
        let out = expand(marked).unwrap().to_string();
        assert!(out.contains("cache"));
    }

    #[test]
    fn test_rejects_tuple_structs() {
        let input: DeriveInput = parse_quote! {
            #[orm(columns = "id")]
            struct User(EntityState);
        };
        assert!(expand(input).is_err());
    }
}
