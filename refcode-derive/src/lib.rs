//! # Refcode Derive Macros
//!
//! This crate provides the procedural macros for `refcode`. It automates the
//! implementation of `Archive` together with either `Populate` (shared,
//! reference-like objects) or `Unarchive` (plain values), and `Identified` for
//! types stored polymorphically.
//!
//! Compatible with `syn 2.0`.

use proc_macro::TokenStream;
use quote::quote;
use syn::{parse_macro_input, Attribute, Data, DeriveInput, Fields, LitStr};

/// Derives `Archive` plus `Populate`, or `Unarchive` with `#[refcode(value)]`.
///
/// Container attributes:
/// - `#[refcode(value)]`: read the type in one step; every field must be present.
/// - `#[refcode(type_id = "Name")]`: implement `Identified` and report the name
///   when the value is stored behind a `Poly` handle.
///
/// Field attributes:
/// - `#[refcode(rename = "key")]`: store the field under another key.
/// - `#[refcode(skip)]`: neither written nor read; reads use `Default`.
///
/// Fields of type `Option<_>` may be absent from the stream and read as `None`;
/// any other absent field fails with `MapFailed`.
#[proc_macro_derive(RefcodeObject, attributes(refcode))]
pub fn derive_refcode_object(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    let name = &input.ident;

    let data_struct = match &input.data {
        Data::Struct(ds) => ds,
        _ => {
            return syn::Error::new(name.span(), "RefcodeObject only supports structs")
                .to_compile_error()
                .into();
        }
    };

    let named = match &data_struct.fields {
        Fields::Named(named) => named,
        Fields::Unit => {
            return syn::Error::new(name.span(), "RefcodeObject requires named fields")
                .to_compile_error()
                .into();
        }
        Fields::Unnamed(unnamed) => {
            return syn::Error::new_spanned(unnamed, "RefcodeObject requires named fields")
                .to_compile_error()
                .into();
        }
    };

    let container = match parse_container_attributes(&input.attrs) {
        Ok(c) => c,
        Err(e) => return e.to_compile_error().into(),
    };

    let mut fields = Vec::new();
    for field in &named.named {
        let attrs = match parse_field_attributes(&field.attrs) {
            Ok(a) => a,
            Err(e) => return e.to_compile_error().into(),
        };
        let Some(ident) = field.ident.clone() else {
            continue;
        };
        let key = attrs.rename.unwrap_or_else(|| ident.to_string());
        fields.push(KeyedField {
            ident,
            ty: field.ty.clone(),
            key,
            skip: attrs.skip,
            optional: is_option(&field.ty),
        });
    }

    let impl_archive = generate_archive(&input, &fields, container.type_id.as_ref());
    let impl_read = if container.value {
        generate_unarchive(&input, &fields)
    } else {
        generate_populate(&input, &fields)
    };
    let impl_identified = container
        .type_id
        .as_ref()
        .map(|type_id| generate_identified(&input, type_id));

    let expanded = quote! {
        #impl_archive
        #impl_read
        #impl_identified
    };

    TokenStream::from(expanded)
}

// --- Internal Data Structures ---

struct KeyedField {
    ident: syn::Ident,
    ty: syn::Type,
    key: String,
    skip: bool,
    optional: bool,
}

// Matches `Option<_>` by its last path segment, which covers `std::option::Option`.
fn is_option(ty: &syn::Type) -> bool {
    match ty {
        syn::Type::Path(p) if p.qself.is_none() => p
            .path
            .segments
            .last()
            .is_some_and(|seg| seg.ident == "Option" && !seg.arguments.is_empty()),
        _ => false,
    }
}

#[derive(Default)]
struct ContainerAttributes {
    value: bool,
    type_id: Option<LitStr>,
}

#[derive(Default)]
struct FieldAttributes {
    rename: Option<String>,
    skip: bool,
}

fn parse_container_attributes(attrs: &[Attribute]) -> syn::Result<ContainerAttributes> {
    let mut parsed = ContainerAttributes::default();
    for attr in attrs {
        if attr.path().is_ident("refcode") {
            attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("value") {
                    parsed.value = true;
                    return Ok(());
                }

                if meta.path.is_ident("type_id") {
                    let s: LitStr = meta.value()?.parse()?;
                    if s.value().is_empty() {
                        return Err(meta.error("type_id must not be empty"));
                    }
                    parsed.type_id = Some(s);
                    return Ok(());
                }
                Err(meta.error("Unknown refcode container attribute. Supported: value, type_id"))
            })?;
        }
    }
    Ok(parsed)
}

fn parse_field_attributes(attrs: &[Attribute]) -> syn::Result<FieldAttributes> {
    let mut parsed = FieldAttributes::default();
    for attr in attrs {
        if attr.path().is_ident("refcode") {
            attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("skip") {
                    parsed.skip = true;
                    return Ok(());
                }

                if meta.path.is_ident("rename") {
                    let s: LitStr = meta.value()?.parse()?;
                    parsed.rename = Some(s.value());
                    return Ok(());
                }
                Err(meta.error("Unknown refcode field attribute. Supported: rename, skip"))
            })?;
        }
    }
    Ok(parsed)
}

// --- Generator: Archive ---

fn generate_archive(
    input: &DeriveInput,
    fields: &[KeyedField],
    type_id: Option<&LitStr>,
) -> proc_macro2::TokenStream {
    let name = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    let emit_fields = fields.iter().filter(|f| !f.skip).map(|f| {
        let ident = &f.ident;
        let key = &f.key;
        quote! { out.field(#key, &self.#ident); }
    });

    let type_identifier = type_id.map(|type_id| {
        quote! {
            fn type_identifier(&self) -> ::core::option::Option<&'static str> {
                ::core::option::Option::Some(#type_id)
            }
        }
    });

    quote! {
        impl #impl_generics refcode::Archive for #name #ty_generics #where_clause {
            fn archive(&self, out: &mut refcode::graph::Archiver<'_>) {
                out.keyed();
                #(#emit_fields)*
            }

            #type_identifier
        }
    }
}

// --- Generator: Populate (reference-like) ---

fn generate_populate(input: &DeriveInput, fields: &[KeyedField]) -> proc_macro2::TokenStream {
    let name = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    let map_fields = fields.iter().filter(|f| !f.skip).map(|f| {
        let ident = &f.ident;
        let key = &f.key;
        if f.optional {
            quote! { fields.map_optional(#key, &mut self.#ident); }
        } else {
            quote! { fields.map(#key, &mut self.#ident); }
        }
    });

    quote! {
        impl #impl_generics refcode::Populate for #name #ty_generics #where_clause {
            #[allow(unused_variables)]
            fn populate(&mut self, fields: &mut refcode::reader::Fields<'_, '_, '_>) {
                #(#map_fields)*
            }
        }
    }
}

// --- Generator: Unarchive (value-like) ---

fn generate_unarchive(input: &DeriveInput, fields: &[KeyedField]) -> proc_macro2::TokenStream {
    let name = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    let read_fields = fields.iter().map(|f| {
        let ident = &f.ident;
        let ty = &f.ty;
        let key = &f.key;
        if f.skip {
            quote! { let #ident: #ty = ::core::default::Default::default(); }
        } else if f.optional {
            quote! { let #ident: #ty = value.optional_field::<#ty>(#key)?.flatten(); }
        } else {
            quote! { let #ident: #ty = value.field(#key)?; }
        }
    });
    let idents = fields.iter().map(|f| &f.ident);

    quote! {
        impl #impl_generics refcode::Unarchive for #name #ty_generics #where_clause {
            fn unarchive(value: &mut refcode::reader::Value<'_, '_>) -> refcode::Result<Self> {
                #(#read_fields)*
                ::core::result::Result::Ok(Self { #(#idents),* })
            }
        }
    }
}

// --- Generator: Identified ---

fn generate_identified(input: &DeriveInput, type_id: &LitStr) -> proc_macro2::TokenStream {
    let name = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    quote! {
        impl #impl_generics refcode::Identified for #name #ty_generics #where_clause {
            const TYPE_ID: &'static str = #type_id;
        }
    }
}
