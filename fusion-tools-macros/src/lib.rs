//! Procedural macros for tool definitions.
//!
//! `#[tool]` leaves the annotated function untouched and emits a companion
//! `<name>_tool()` constructor returning a `ToolFunction`. The companion decodes
//! each parameter by name from the LLM's argument object, calls the original
//! function and serialises its return value. The function's `///` comments
//! become the documentation the schema is extracted from.
//!
//! ```ignore
//! /// Adds two integers.
//! ///
//! /// Args:
//! ///     a (int): first addend
//! ///     b (int): second addend
//! #[tool]
//! fn add(a: i64, b: i64) -> i64 {
//!     a + b
//! }
//!
//! registry.register_tool(add_tool())?;
//! ```
//!
//! Supported options: `#[tool(name = "other_name")]` overrides the declared name
//! and `#[tool(crate = path::to::fusion_tools)]` points the generated code at a
//! re-export of the tools crate.

use proc_macro::TokenStream;
use proc_macro2::{Ident, Span, TokenStream as TokenStream2};
use quote::{format_ident, quote};
use syn::{
    Expr, ExprLit, FnArg, ItemFn, Lit, LitStr, Meta, Pat, Path, ReturnType, Type, parse_macro_input,
};

/// Marks a free function as a tool and generates its `<name>_tool()` binding.
///
/// `async fn` items become asynchronous tools; everything else is blocking.
/// Functions returning `Result<T, E>` report `Err` values as execution
/// failures using `E`'s `Display` text.
#[proc_macro_attribute]
pub fn tool(attr: TokenStream, item: TokenStream) -> TokenStream {
    let mut options = ToolOptions::default();
    let parser = syn::meta::parser(|meta| options.parse(&meta));
    parse_macro_input!(attr with parser);

    let function = parse_macro_input!(item as ItemFn);
    expand(&options, &function)
        .unwrap_or_else(syn::Error::into_compile_error)
        .into()
}

#[derive(Default)]
struct ToolOptions {
    name: Option<LitStr>,
    krate: Option<Path>,
}

impl ToolOptions {
    fn parse(&mut self, meta: &syn::meta::ParseNestedMeta<'_>) -> syn::Result<()> {
        if meta.path.is_ident("name") {
            self.name = Some(meta.value()?.parse()?);
            Ok(())
        } else if meta.path.is_ident("crate") {
            self.krate = Some(meta.value()?.parse()?);
            Ok(())
        } else {
            Err(meta.error("unsupported tool option; expected `name` or `crate`"))
        }
    }
}

fn expand(options: &ToolOptions, function: &ItemFn) -> syn::Result<TokenStream2> {
    let signature = &function.sig;
    if !signature.generics.params.is_empty() {
        return Err(syn::Error::new_spanned(
            &signature.generics,
            "tool functions cannot be generic",
        ));
    }

    let krate = options
        .krate
        .clone()
        .unwrap_or_else(|| syn::parse_quote!(::fusion_tools));
    let ident = &signature.ident;
    let visibility = &function.vis;
    let binding = format_ident!("{}_tool", ident);
    let tool_name = options
        .name
        .clone()
        .unwrap_or_else(|| LitStr::new(&ident.to_string(), Span::call_site()));
    let documentation = documentation(function);
    // Mixed-site locals cannot collide with parameter names.
    let input = Ident::new("input", Span::mixed_site());
    let arguments = Ident::new("arguments", Span::mixed_site());

    let mut names = Vec::new();
    let mut decoders = Vec::new();
    for input in &signature.inputs {
        let FnArg::Typed(argument) = input else {
            return Err(syn::Error::new_spanned(
                input,
                "tool functions cannot take `self`",
            ));
        };
        let Pat::Ident(pattern) = argument.pat.as_ref() else {
            return Err(syn::Error::new_spanned(
                &argument.pat,
                "tool parameters must be plain identifiers",
            ));
        };
        let name = &pattern.ident;
        let key = LitStr::new(name.to_string().trim_start_matches("r#"), name.span());
        let ty = &argument.ty;
        decoders.push(quote! {
            let #name: #ty = #krate::arguments::required(&#arguments, #key)?;
        });
        names.push(name.clone());
    }

    let convert = if returns_result(&signature.output) {
        quote!(#krate::output::from_result)
    } else {
        quote!(#krate::output::from_value)
    };

    let doc_call = documentation.map(|doc| quote!(.with_documentation(#doc)));
    let binding_doc = format!("Returns the tool binding for [`{ident}`].");

    let body = if signature.asyncness.is_some() {
        quote! {
            #krate::ToolFunction::asynchronous(
                #tool_name,
                |#input: #krate::__private::Value| -> #krate::ToolFuture {
                    ::std::boxed::Box::pin(async move {
                        #[allow(unused_variables)]
                        let #arguments = #krate::arguments::object(&#input)?;
                        #(#decoders)*
                        #convert(#ident(#(#names),*).await)
                    })
                },
            )
        }
    } else {
        quote! {
            #krate::ToolFunction::sync(
                #tool_name,
                |#input: #krate::__private::Value| -> #krate::ToolResult<#krate::__private::Value> {
                    #[allow(unused_variables)]
                    let #arguments = #krate::arguments::object(&#input)?;
                    #(#decoders)*
                    #convert(#ident(#(#names),*))
                },
            )
        }
    };

    Ok(quote! {
        #function

        #[doc = #binding_doc]
        #[must_use]
        #visibility fn #binding() -> #krate::ToolFunction {
            #body #doc_call
        }
    })
}

fn documentation(function: &ItemFn) -> Option<String> {
    let lines: Vec<String> = function
        .attrs
        .iter()
        .filter(|attr| attr.path().is_ident("doc"))
        .filter_map(|attr| match &attr.meta {
            Meta::NameValue(meta) => match &meta.value {
                Expr::Lit(ExprLit {
                    lit: Lit::Str(text),
                    ..
                }) => Some(text.value()),
                _ => None,
            },
            _ => None,
        })
        .flat_map(|text| {
            text.lines()
                .map(|line| line.strip_prefix(' ').unwrap_or(line).to_owned())
                .collect::<Vec<_>>()
        })
        .collect();

    let joined = lines.join("\n");
    if joined.trim().is_empty() {
        None
    } else {
        Some(joined)
    }
}

fn returns_result(output: &ReturnType) -> bool {
    let ReturnType::Type(_, ty) = output else {
        return false;
    };
    let Type::Path(path) = ty.as_ref() else {
        return false;
    };
    path.path
        .segments
        .last()
        .is_some_and(|segment| segment.ident == "Result")
}
