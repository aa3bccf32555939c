//! Derive macro for remote fixtures.
//!
//! `#[derive(Fixture)]` writes the construction strategy the fixture registry
//! uses (store the resolved component, nothing else) and the canonical
//! default locator for the type.
//!
//! ```ignore
//! use remote_fixtures::{Fixture, RemoteComponent};
//!
//! #[derive(Fixture)]
//! #[fixture(kind = "Tree", container)]
//! struct ProjectTreeFixture {
//!     remote: RemoteComponent,
//! }
//! ```
//!
//! # Attributes
//!
//! On the struct:
//! - `kind = "Widget"`: default locator is `Locator::by_type("Widget")`.
//!   Without it the kind is the struct name minus a `Fixture` suffix.
//! - `any`: default locator is `Locator::any()`.
//! - `container`: also implement `SearchContext`, scoped to the component.
//!
//! On a field:
//! - `remote`: the field holding the `RemoteComponent`. Optional when the
//!   field is called `remote` or is the only field. Every other field is
//!   filled with `Default::default()`.

use proc_macro::TokenStream;
use proc_macro2::{Span, TokenStream as TokenStream2};
use quote::quote;
use syn::{parse_macro_input, Attribute, Data, DeriveInput, Fields, Ident, LitStr, Member};

/// Derive `remote_fixtures::Fixture` (and optionally `SearchContext`).
#[proc_macro_derive(Fixture, attributes(fixture))]
pub fn derive_fixture(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    expand_fixture(&input)
        .unwrap_or_else(syn::Error::into_compile_error)
        .into()
}

/// Struct-level options
#[derive(Debug, Default, PartialEq, Eq)]
struct FixtureOptions {
    kind: Option<String>,
    any: bool,
    container: bool,
}

fn expand_fixture(input: &DeriveInput) -> syn::Result<TokenStream2> {
    let name = &input.ident;
    let options = parse_options(&input.attrs)?;
    let (remote, others) = remote_member(input)?;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    let default_locator = if options.any {
        quote! { ::remote_fixtures::Locator::any() }
    } else {
        let kind = options
            .kind
            .clone()
            .unwrap_or_else(|| default_kind(&name.to_string()));
        quote! { ::remote_fixtures::Locator::by_type(#kind) }
    };

    let mut expanded = quote! {
        impl #impl_generics ::remote_fixtures::Fixture for #name #ty_generics #where_clause {
            fn default_locator() -> ::remote_fixtures::Locator {
                #default_locator
            }

            fn from_remote(remote: ::remote_fixtures::RemoteComponent) -> Self {
                Self {
                    #remote: remote,
                    #( #others: ::core::default::Default::default(), )*
                }
            }

            fn remote(&self) -> &::remote_fixtures::RemoteComponent {
                &self.#remote
            }
        }
    };

    if options.container {
        expanded.extend(quote! {
            impl #impl_generics ::remote_fixtures::SearchContext for #name #ty_generics #where_clause {
                fn finder(&self) -> ::remote_fixtures::Finder {
                    ::remote_fixtures::RemoteComponent::finder(&self.#remote)
                }
            }
        });
    }

    Ok(expanded)
}

fn parse_options(attrs: &[Attribute]) -> syn::Result<FixtureOptions> {
    let mut options = FixtureOptions::default();
    for attr in attrs.iter().filter(|a| a.path().is_ident("fixture")) {
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("kind") {
                let kind: LitStr = meta.value()?.parse()?;
                if kind.value().is_empty() {
                    return Err(meta.error("kind must not be empty"));
                }
                options.kind = Some(kind.value());
                Ok(())
            } else if meta.path.is_ident("any") {
                options.any = true;
                Ok(())
            } else if meta.path.is_ident("container") {
                options.container = true;
                Ok(())
            } else {
                Err(meta.error("expected `kind = \"...\"`, `any` or `container`"))
            }
        })?;
    }
    if options.any && options.kind.is_some() {
        return Err(syn::Error::new(
            Span::call_site(),
            "`any` and `kind` are mutually exclusive",
        ));
    }
    Ok(options)
}

/// The member holding the remote component, and every other member
fn remote_member(input: &DeriveInput) -> syn::Result<(Member, Vec<Member>)> {
    let Data::Struct(data) = &input.data else {
        return Err(syn::Error::new_spanned(
            &input.ident,
            "Fixture can only be derived for structs",
        ));
    };

    let members: Vec<(Member, bool)> = match &data.fields {
        Fields::Named(named) => named
            .named
            .iter()
            .map(|f| {
                let ident = f.ident.clone().unwrap_or_else(|| Ident::new("_", Span::call_site()));
                Ok((Member::Named(ident), has_remote_marker(&f.attrs)?))
            })
            .collect::<syn::Result<_>>()?,
        Fields::Unnamed(unnamed) => unnamed
            .unnamed
            .iter()
            .enumerate()
            .map(|(i, f)| Ok((Member::from(i), has_remote_marker(&f.attrs)?)))
            .collect::<syn::Result<_>>()?,
        Fields::Unit => Vec::new(),
    };

    let marked: Vec<usize> = members
        .iter()
        .enumerate()
        .filter(|(_, (_, marked))| *marked)
        .map(|(i, _)| i)
        .collect();

    let chosen = match marked.as_slice() {
        [one] => Some(*one),
        [] if members.len() == 1 => Some(0),
        [] => members
            .iter()
            .position(|(m, _)| matches!(m, Member::Named(ident) if ident == "remote")),
        _ => {
            return Err(syn::Error::new_spanned(
                &input.ident,
                "only one field may be marked #[fixture(remote)]",
            ))
        }
    };

    let Some(chosen) = chosen else {
        return Err(syn::Error::new_spanned(
            &input.ident,
            "Fixture needs a `RemoteComponent` field: name it `remote` or mark it #[fixture(remote)]",
        ));
    };

    let mut members: Vec<Member> = members.into_iter().map(|(m, _)| m).collect();
    let remote = members.remove(chosen);
    Ok((remote, members))
}

fn has_remote_marker(attrs: &[Attribute]) -> syn::Result<bool> {
    let mut marked = false;
    for attr in attrs.iter().filter(|a| a.path().is_ident("fixture")) {
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("remote") {
                marked = true;
                Ok(())
            } else {
                Err(meta.error("expected `remote`"))
            }
        })?;
    }
    Ok(marked)
}

/// `ButtonFixture` -> `Button`
fn default_kind(type_name: &str) -> String {
    match type_name.strip_suffix("Fixture") {
        Some(kind) if !kind.is_empty() => kind.to_string(),
        _ => type_name.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use syn::parse_quote;

    fn expand(input: DeriveInput) -> String {
        expand_fixture(&input).unwrap().to_string()
    }

    fn expand_err(input: DeriveInput) -> String {
        expand_fixture(&input).unwrap_err().to_string()
    }

    #[test]
    fn test_default_kind() {
        assert_eq!(default_kind("ButtonFixture"), "Button");
        assert_eq!(default_kind("Toolbar"), "Toolbar");
        assert_eq!(default_kind("Fixture"), "Fixture");
    }

    #[test]
    fn test_options() {
        let attrs: Vec<Attribute> = vec![parse_quote!(#[fixture(kind = "Tree", container)])];
        let options = parse_options(&attrs).unwrap();
        assert_eq!(
            options,
            FixtureOptions {
                kind: Some("Tree".into()),
                any: false,
                container: true,
            }
        );
    }

    #[test]
    fn test_unknown_option_rejected() {
        let attrs: Vec<Attribute> = vec![parse_quote!(#[fixture(timeout = 5)])];
        assert!(parse_options(&attrs).is_err());
    }

    #[test]
    fn test_any_and_kind_conflict() {
        let attrs: Vec<Attribute> = vec![parse_quote!(#[fixture(any, kind = "X")])];
        assert!(parse_options(&attrs).is_err());
    }

    #[test]
    fn test_named_remote_field() {
        let out = expand(parse_quote! {
            struct MenuFixture {
                remote: RemoteComponent,
                clicks: u32,
            }
        });
        assert!(out.contains("by_type (\"Menu\")"));
        assert!(out.contains("remote : remote"));
        assert!(out.contains("clicks : :: core :: default :: Default :: default ()"));
        assert!(!out.contains("SearchContext"));
    }

    #[test]
    fn test_tuple_struct() {
        let out = expand(parse_quote! {
            #[fixture(any)]
            struct Anything(RemoteComponent);
        });
        assert!(out.contains("Locator :: any ()"));
        assert!(out.contains("0 : remote"));
    }

    #[test]
    fn test_marked_field_and_container() {
        let out = expand(parse_quote! {
            #[fixture(kind = "Panel", container)]
            struct Side {
                label: String,
                #[fixture(remote)]
                component: RemoteComponent,
            }
        });
        assert!(out.contains("component : remote"));
        assert!(out.contains("SearchContext for Side"));
    }

    #[test]
    fn test_missing_remote_field() {
        let err = expand_err(parse_quote! {
            struct Broken {
                a: RemoteComponent,
                b: RemoteComponent,
            }
        });
        assert!(err.contains("RemoteComponent"));
    }

    #[test]
    fn test_enum_rejected() {
        let err = expand_err(parse_quote! {
            enum NotAStruct { A }
        });
        assert!(err.contains("only be derived for structs"));
    }
}
