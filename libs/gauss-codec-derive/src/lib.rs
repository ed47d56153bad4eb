use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::{
    parse_macro_input, Attribute, Data, DeriveInput, Expr, ExprArray, ExprLit, Fields,
    GenericArgument, Ident, Lit, LitStr, PathArguments, Type,
};

/// Derive `gauss_codec::Record` for a struct with named fields.
///
/// Each field becomes one column, in declaration order. The field type
/// picks the shape, most specific first:
///
/// - `Vec<Option<T>>`: sequence with nullable elements
/// - `Vec<u8>`: `bytea` scalar
/// - `Vec<T>`: sequence
/// - `Option<T>`: nullable scalar
/// - anything else: scalar
///
/// `T` must implement `gauss_codec::Scalar`. Nested optionals and nested
/// sequences are rejected at compile time.
///
/// # Example
///
/// ```ignore
/// #[derive(Record)]
/// #[codec(name = "users")]
/// pub struct User {
///     pub id: i64,
///     pub email: Option<String>,
///     pub tags: Vec<String>,
///     #[codec(scalar = "json")]
///     pub meta: serde_json::Value,
///     #[codec(name = "score_list")]
///     pub scores: Vec<Option<i32>>,
/// }
/// ```
#[proc_macro_derive(Record, attributes(codec))]
pub fn derive_record(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    match record_impl(&input) {
        Ok(tokens) => tokens.into(),
        Err(e) => e.to_compile_error().into(),
    }
}

/// Derive `gauss_codec::Enum` and `gauss_codec::Scalar` for a unit-only enum.
///
/// Labels default to the snake_case variant names. Override them all with
/// `#[codec(labels = [...])]` on the enum, or one at a time with
/// `#[codec(label = "...")]` on a variant.
///
/// ```ignore
/// #[derive(Enum)]
/// #[codec(name = "mood", labels = ["sad", "ok", "happy"])]
/// pub enum Mood { Sad, Ok, Happy }
/// ```
#[proc_macro_derive(Enum, attributes(codec))]
pub fn derive_enum(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    match enum_impl(&input) {
        Ok(tokens) => tokens.into(),
        Err(e) => e.to_compile_error().into(),
    }
}

// ════════════════════════════════════════════════════════════════
//  Record
// ════════════════════════════════════════════════════════════════

#[derive(Clone, Copy)]
enum FieldShape {
    Scalar,
    Optional,
    Sequence,
    OptionalSequence,
}

impl FieldShape {
    fn variant(self) -> TokenStream2 {
        match self {
            FieldShape::Scalar => quote! { Scalar },
            FieldShape::Optional => quote! { Optional },
            FieldShape::Sequence => quote! { Sequence },
            FieldShape::OptionalSequence => quote! { OptionalSequence },
        }
    }

    fn adapters(self) -> (TokenStream2, TokenStream2) {
        match self {
            FieldShape::Scalar => (quote! { scalar_from_value }, quote! { scalar_to_value }),
            FieldShape::Optional => (quote! { optional_from_value }, quote! { optional_to_value }),
            FieldShape::Sequence => (quote! { sequence_from_value }, quote! { sequence_to_value }),
            FieldShape::OptionalSequence => (
                quote! { optional_sequence_from_value },
                quote! { optional_sequence_to_value },
            ),
        }
    }
}

fn record_impl(input: &DeriveInput) -> Result<TokenStream2, syn::Error> {
    let ident = &input.ident;

    let fields = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(fields) => &fields.named,
            _ => {
                return Err(syn::Error::new_spanned(
                    ident,
                    "Record only supports structs with named fields",
                ))
            }
        },
        _ => return Err(syn::Error::new_spanned(ident, "Record only supports structs")),
    };

    let attrs = CodecAttrs::parse(&input.attrs)?;
    attrs.reject_labels(ident)?;
    let record_name = attrs.name.unwrap_or_else(|| snake_case(&ident.to_string()));

    let mut shape_tokens = Vec::new();
    let mut read_tokens = Vec::new();
    let mut write_tokens = Vec::new();

    for field in fields {
        let field_ident = field
            .ident
            .as_ref()
            .ok_or_else(|| syn::Error::new_spanned(field, "expected named field"))?;

        let field_attrs = CodecAttrs::parse(&field.attrs)?;
        field_attrs.reject_labels(field_ident)?;
        let column = field_attrs
            .name
            .unwrap_or_else(|| field_ident.to_string().trim_start_matches("r#").to_string());

        let (shape, inner) = classify(&field.ty)?;
        let variant = shape.variant();
        let (from_fn, to_fn) = shape.adapters();

        let scalar_name = match field_attrs.scalar {
            Some(name) => quote! { #name },
            None => quote! { <#inner as ::gauss_codec::Scalar>::TYPE_NAME },
        };

        shape_tokens.push(quote! {
            .field(
                #column,
                ::gauss_codec::SemanticType::new(::gauss_codec::Shape::#variant, #scalar_name),
            )
        });
        read_tokens.push(quote! {
            #field_ident: __fields.take(#column, ::gauss_codec::typed::adapt::#from_fn::<#inner>)?,
        });
        write_tokens.push(quote! {
            __fields.put(#column, ::gauss_codec::typed::adapt::#to_fn::<#inner>(&self.#field_ident))?;
        });
    }

    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    Ok(quote! {
        impl #impl_generics ::gauss_codec::Record for #ident #ty_generics #where_clause {
            fn shape() -> ::gauss_codec::RecordShape {
                ::gauss_codec::RecordShape::new(#record_name)
                    #(#shape_tokens)*
            }

            fn read_fields(
                __fields: &mut ::gauss_codec::typed::FieldReader,
            ) -> ::core::result::Result<Self, ::gauss_codec::DecodeError> {
                ::core::result::Result::Ok(Self {
                    #(#read_tokens)*
                })
            }

            fn write_fields(
                &self,
                __fields: &mut ::gauss_codec::typed::FieldWriter,
            ) -> ::core::result::Result<(), ::gauss_codec::EncodeError> {
                #(#write_tokens)*
                ::core::result::Result::Ok(())
            }
        }
    })
}

/// Shape of a field type and its scalar component.
fn classify(ty: &Type) -> Result<(FieldShape, &Type), syn::Error> {
    if let Some(inner) = generic_arg(ty, "Vec") {
        if is_u8(inner) {
            return Ok((FieldShape::Scalar, ty));
        }
        if let Some(element) = generic_arg(inner, "Option") {
            if is_wrapper(element) {
                return Err(syn::Error::new_spanned(
                    ty,
                    "sequence elements may be optional at most once and cannot be sequences",
                ));
            }
            return Ok((FieldShape::OptionalSequence, element));
        }
        if is_wrapper(inner) {
            return Err(syn::Error::new_spanned(ty, "nested sequences are not supported"));
        }
        return Ok((FieldShape::Sequence, inner));
    }

    if let Some(inner) = generic_arg(ty, "Option") {
        if is_wrapper(inner) {
            return Err(syn::Error::new_spanned(
                ty,
                "optional fields cannot wrap `Option` or `Vec`; use `Vec<Option<T>>` for nullable elements",
            ));
        }
        return Ok((FieldShape::Optional, inner));
    }

    Ok((FieldShape::Scalar, ty))
}

/// `Option<_>`, or `Vec<T>` other than `Vec<u8>`.
fn is_wrapper(ty: &Type) -> bool {
    generic_arg(ty, "Option").is_some() || generic_arg(ty, "Vec").is_some_and(|inner| !is_u8(inner))
}

fn is_u8(ty: &Type) -> bool {
    matches!(ty, Type::Path(p) if p.qself.is_none() && p.path.is_ident("u8"))
}

/// `T` if `ty` is `wrapper<T>` (matched on the last path segment).
fn generic_arg<'a>(ty: &'a Type, wrapper: &str) -> Option<&'a Type> {
    let Type::Path(type_path) = ty else {
        return None;
    };
    let segment = type_path.path.segments.last()?;
    if segment.ident != wrapper {
        return None;
    }
    let PathArguments::AngleBracketed(args) = &segment.arguments else {
        return None;
    };
    if args.args.len() != 1 {
        return None;
    }
    match args.args.first()? {
        GenericArgument::Type(inner) => Some(inner),
        _ => None,
    }
}

// ════════════════════════════════════════════════════════════════
//  Enum
// ════════════════════════════════════════════════════════════════

fn enum_impl(input: &DeriveInput) -> Result<TokenStream2, syn::Error> {
    let ident = &input.ident;

    let variants = match &input.data {
        Data::Enum(data) => &data.variants,
        _ => return Err(syn::Error::new_spanned(ident, "Enum only supports enums")),
    };

    let attrs = CodecAttrs::parse(&input.attrs)?;
    if let Some(scalar) = &attrs.scalar {
        return Err(syn::Error::new_spanned(scalar, "use `name` to set the enum type name"));
    }
    let type_name = attrs.name.unwrap_or_else(|| snake_case(&ident.to_string()));

    let mut constructors = Vec::new();
    let mut variant_labels = Vec::new();
    for variant in variants {
        if !matches!(variant.fields, Fields::Unit) {
            return Err(syn::Error::new_spanned(
                variant,
                "Enum only supports variants without fields",
            ));
        }
        let variant_attrs = CodecAttrs::parse(&variant.attrs)?;
        if variant_attrs.name.is_some() || variant_attrs.scalar.is_some() {
            return Err(syn::Error::new_spanned(variant, "only `label` is allowed on variants"));
        }
        if variant_attrs.labels.is_some() {
            return Err(syn::Error::new_spanned(variant, "use `label` on a single variant"));
        }
        constructors.push(&variant.ident);
        variant_labels.push(variant_attrs.label);
    }

    let labels: Vec<LitStr> = match attrs.labels {
        Some(labels) => {
            if let Some(label) = variant_labels.iter().flatten().next() {
                return Err(syn::Error::new_spanned(
                    label,
                    "`label` on a variant conflicts with `labels` on the enum",
                ));
            }
            if labels.len() != constructors.len() {
                return Err(syn::Error::new_spanned(
                    ident,
                    format!(
                        "{} labels for {} variants",
                        labels.len(),
                        constructors.len()
                    ),
                ));
            }
            labels
        }
        None => constructors
            .iter()
            .zip(variant_labels)
            .map(|(ctor, label)| {
                label.unwrap_or_else(|| LitStr::new(&snake_case(&ctor.to_string()), ctor.span()))
            })
            .collect(),
    };

    for (i, label) in labels.iter().enumerate() {
        if labels[..i].iter().any(|l| l.value() == label.value()) {
            return Err(syn::Error::new_spanned(
                label,
                format!("duplicate label '{}'", label.value()),
            ));
        }
    }

    let ctor_names: Vec<String> = constructors.iter().map(|c| c.to_string()).collect();
    let tags: Vec<usize> = (0..constructors.len()).collect();
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    Ok(quote! {
        impl #impl_generics ::gauss_codec::Enum for #ident #ty_generics #where_clause {
            const TYPE_NAME: &'static str = #type_name;
            const LABELS: &'static [&'static str] = &[#(#labels),*];
            const CONSTRUCTORS: &'static [&'static str] = &[#(#ctor_names),*];

            fn from_tag(tag: usize) -> ::core::option::Option<Self> {
                match tag {
                    #(#tags => ::core::option::Option::Some(Self::#constructors),)*
                    _ => ::core::option::Option::None,
                }
            }

            fn tag(&self) -> usize {
                match *self {
                    #(Self::#constructors => #tags,)*
                }
            }
        }

        impl #impl_generics ::gauss_codec::Scalar for #ident #ty_generics #where_clause {
            const TYPE_NAME: &'static str = #type_name;

            fn to_value(&self) -> ::core::result::Result<::gauss_codec::Value, ::gauss_codec::EncodeError> {
                ::core::result::Result::Ok(::gauss_codec::Value::Enum(::gauss_codec::Enum::tag(self)))
            }

            fn from_value(
                value: ::gauss_codec::Value,
            ) -> ::core::result::Result<Self, ::gauss_codec::DecodeError> {
                ::gauss_codec::enum_from_value(value)
            }
        }
    })
}

// ════════════════════════════════════════════════════════════════
//  #[codec(...)]
// ════════════════════════════════════════════════════════════════

#[derive(Default)]
struct CodecAttrs {
    name: Option<String>,
    scalar: Option<LitStr>,
    labels: Option<Vec<LitStr>>,
    label: Option<LitStr>,
}

impl CodecAttrs {
    fn parse(attrs: &[Attribute]) -> Result<Self, syn::Error> {
        let mut out = Self::default();
        for attr in attrs {
            if !attr.path().is_ident("codec") {
                continue;
            }
            attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("name") {
                    let value: LitStr = meta.value()?.parse()?;
                    out.name = Some(value.value());
                } else if meta.path.is_ident("scalar") {
                    out.scalar = Some(meta.value()?.parse()?);
                } else if meta.path.is_ident("label") {
                    out.label = Some(meta.value()?.parse()?);
                } else if meta.path.is_ident("labels") {
                    let array: ExprArray = meta.value()?.parse()?;
                    out.labels = Some(string_list(&array)?);
                } else {
                    return Err(meta.error("unknown codec attribute"));
                }
                Ok(())
            })?;
        }
        Ok(out)
    }

    fn reject_labels(&self, at: &Ident) -> Result<(), syn::Error> {
        if self.labels.is_some() || self.label.is_some() {
            return Err(syn::Error::new_spanned(at, "labels are only allowed on enums"));
        }
        Ok(())
    }
}

fn string_list(array: &ExprArray) -> Result<Vec<LitStr>, syn::Error> {
    array
        .elems
        .iter()
        .map(|elem| match elem {
            Expr::Lit(ExprLit {
                lit: Lit::Str(s), ..
            }) => Ok(s.clone()),
            other => Err(syn::Error::new_spanned(other, "expected a string literal")),
        })
        .collect()
}

/// `UserAccount` -> `user_account`, `HTTPServer` -> `http_server`.
fn snake_case(ident: &str) -> String {
    let chars: Vec<char> = ident.trim_start_matches("r#").chars().collect();
    let mut out = String::with_capacity(chars.len() + 4);
    for (i, &c) in chars.iter().enumerate() {
        if c.is_uppercase() {
            let prev = i.checked_sub(1).map(|p| chars[p]);
            let next = chars.get(i + 1).copied();
            let boundary = match prev {
                Some(p) if p == '_' => false,
                Some(p) if p.is_lowercase() || p.is_ascii_digit() => true,
                Some(p) if p.is_uppercase() => next.is_some_and(char::is_lowercase),
                _ => false,
            };
            if boundary {
                out.push('_');
            }
            out.extend(c.to_lowercase());
        } else {
            out.push(c);
        }
    }
    out
}
