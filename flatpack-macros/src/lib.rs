use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::{
    parse_macro_input, parse_quote, Attribute, Data, DeriveInput, Fields, GenericParam, Index,
    LitInt, Member, Token,
};

extern crate proc_macro;

/// Derives `flatpack::Packable` for a struct with named, tuple or no fields.
///
/// Field attributes:
/// - `#[pack(skip)]`: not encoded, keeps its value on decode.
/// - `#[pack(compress)]` / `#[pack(compress = N)]`: stored as a DEFLATE frame.
///
/// Container attributes:
/// - `#[pack(packer)]`: encode through the type's `flatpack::Packer` impl.
/// - `#[pack(unpacker)]`: decode through the type's `flatpack::Unpacker` impl.
#[proc_macro_derive(Packable, attributes(pack))]
pub fn packable(item: TokenStream) -> TokenStream {
    let input = parse_macro_input!(item as DeriveInput);

    expand(input)
        .unwrap_or_else(syn::Error::into_compile_error)
        .into()
}

fn expand(mut input: DeriveInput) -> syn::Result<TokenStream2> {
    let name = &input.ident;

    let fields = match &input.data {
        Data::Struct(data) => &data.fields,
        Data::Enum(_) | Data::Union(_) => {
            return Err(syn::Error::new_spanned(
                name,
                "Packable can only be derived for structs",
            ));
        }
    };

    let hooks = Hooks::parse(&input.attrs)?;
    let fields = match fields {
        Fields::Named(fields) => fields
            .named
            .iter()
            .map(|field| {
                let ident = field.ident.clone().expect("named field");
                let label = ident.to_string();
                field_info(&field.attrs, &field.ty, Member::Named(ident), label)
            })
            .collect::<syn::Result<Vec<_>>>()?,
        Fields::Unnamed(fields) => fields
            .unnamed
            .iter()
            .enumerate()
            .map(|(i, field)| {
                field_info(&field.attrs, &field.ty, Member::Unnamed(Index::from(i)), i.to_string())
            })
            .collect::<syn::Result<Vec<_>>>()?,
        Fields::Unit => Vec::new(),
    };

    let packer = if hooks.packer {
        quote! {
            ::core::option::Option::Some(
                ::flatpack::codec::custom::pack_hook::<Self> as ::flatpack::shape::PackHook
            )
        }
    } else {
        quote!(::core::option::Option::None)
    };
    let unpacker = if hooks.unpacker {
        quote! {
            ::core::option::Option::Some(
                ::flatpack::codec::custom::unpack_hook::<Self> as ::flatpack::shape::UnpackHook
            )
        }
    } else {
        quote!(::core::option::Option::None)
    };

    for param in &mut input.generics.params {
        if let GenericParam::Type(param) = param {
            param.bounds.push(parse_quote!(::flatpack::Packable));
        }
    }
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();
    let name = &input.ident;

    Ok(quote! {
        impl #impl_generics ::flatpack::Packable for #name #ty_generics #where_clause {
            fn type_info() -> ::flatpack::TypeInfo {
                ::flatpack::TypeInfo::new(
                    ::core::any::type_name::<Self>(),
                    ::flatpack::Kind::Struct(::flatpack::StructInfo {
                        fields: ::std::vec![#(#fields),*],
                        packer: #packer,
                        unpacker: #unpacker,
                    }),
                )
            }
        }
    })
}

#[derive(Default)]
struct Hooks {
    packer: bool,
    unpacker: bool,
}

impl Hooks {
    fn parse(attrs: &[Attribute]) -> syn::Result<Self> {
        let mut hooks = Hooks::default();
        for attr in attrs.iter().filter(|attr| attr.path().is_ident("pack")) {
            attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("packer") {
                    hooks.packer = true;
                    Ok(())
                } else if meta.path.is_ident("unpacker") {
                    hooks.unpacker = true;
                    Ok(())
                } else {
                    Err(meta.error("expected `packer` or `unpacker`"))
                }
            })?;
        }
        Ok(hooks)
    }
}

fn field_info(
    attrs: &[Attribute],
    ty: &syn::Type,
    member: Member,
    label: String,
) -> syn::Result<TokenStream2> {
    let mut skip = false;
    let mut compression = None;

    for attr in attrs.iter().filter(|attr| attr.path().is_ident("pack")) {
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("skip") {
                skip = true;
                Ok(())
            } else if meta.path.is_ident("compress") {
                let level = if meta.input.peek(Token![=]) {
                    let level: u32 = meta.value()?.parse::<LitInt>()?.base10_parse()?;
                    quote!(#level)
                } else {
                    quote!(::flatpack::DEFAULT_COMPRESSION_LEVEL)
                };
                compression = Some(level);
                Ok(())
            } else {
                Err(meta.error("expected `skip`, `compress` or `compress = <level>`"))
            }
        })?;
    }

    if skip {
        if compression.is_some() {
            return Err(syn::Error::new_spanned(
                ty,
                "a skipped field can't be compressed",
            ));
        }
        return Ok(quote!(::flatpack::FieldInfo::skipped(#label)));
    }

    let compression = match compression {
        Some(level) => quote!(::core::option::Option::Some(#level)),
        None => quote!(::core::option::Option::None),
    };

    Ok(quote! {
        ::flatpack::FieldInfo::packed::<#ty>(
            #label,
            #compression,
            |value| &::flatpack::shape::cast::<Self>(value).#member as &dyn ::core::any::Any,
            |value| {
                &mut ::flatpack::shape::cast_mut::<Self>(value).#member
                    as &mut dyn ::core::any::Any
            },
        )
    })
}
