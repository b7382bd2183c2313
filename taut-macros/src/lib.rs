// Copyright (c) The taut Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Proc macros backing `taut`'s `check!`/`require!`/`#[test]` surface.
//!
//! `check!`/`require!` each take one boolean expression and rewrite every
//! `arg!(sub_expr)` marker found anywhere inside it into a call that
//! captures the subexpression's rendered value before returning it
//! unchanged, so the expression still evaluates exactly as written. Each
//! marker is assigned a counter id and nesting depth by walking the
//! parsed `syn::Expr` tree in source order at compile time, so there is
//! no runtime correlation step and no ambiguity from re-ordered
//! evaluation of nested markers: every capture call already carries its
//! own identity.

use proc_macro::TokenStream;
use quote::{format_ident, quote};
use syn::punctuated::Punctuated;
use syn::visit_mut::{self, VisitMut};
use syn::{parse_macro_input, Expr, Ident, ItemFn, Token};

struct ArgRewriter {
    next_counter: usize,
    depth: usize,
}

impl ArgRewriter {
    fn new() -> Self {
        Self {
            next_counter: 0,
            depth: 0,
        }
    }
}

fn is_arg_macro(mac: &syn::Macro) -> bool {
    mac.path.segments.last().map(|seg| seg.ident == "arg").unwrap_or(false)
}

impl VisitMut for ArgRewriter {
    fn visit_expr_mut(&mut self, expr: &mut Expr) {
        let is_marker = matches!(expr, Expr::Macro(m) if is_arg_macro(&m.mac));
        if !is_marker {
            visit_mut::visit_expr_mut(self, expr);
            return;
        }

        let Expr::Macro(expr_macro) = expr else {
            unreachable!("checked above");
        };
        let inner_tokens = expr_macro.mac.tokens.clone();
        let source_text = inner_tokens.to_string();
        let mut inner_expr: Expr = match syn::parse2(inner_tokens) {
            Ok(e) => e,
            Err(err) => {
                *expr = Expr::Verbatim(err.to_compile_error());
                return;
            }
        };

        let counter_id = self.next_counter;
        self.next_counter += 1;
        let depth = self.depth;
        self.depth += 1;
        self.visit_expr_mut(&mut inner_expr);
        self.depth -= 1;

        *expr = Expr::Verbatim(quote! {
            ::taut::assert::capture(#inner_expr, #source_text, #counter_id, #depth)
        });
    }
}

fn expand_assertion(input: TokenStream, flag_variant: &str) -> TokenStream {
    let expr_tokens = proc_macro2::TokenStream::from(input);
    let source_text = expr_tokens.to_string();

    let mut expr: Expr = match syn::parse2(expr_tokens) {
        Ok(e) => e,
        Err(err) => return err.to_compile_error().into(),
    };

    let mut rewriter = ArgRewriter::new();
    rewriter.visit_expr_mut(&mut expr);

    let flag_ident = format_ident!("{flag_variant}");
    let expanded = quote! {
        {
            let __taut_assertion_frame = ::taut::assert::begin_assertion(#source_text);
            let __taut_result: bool = #expr;
            ::std::mem::drop(__taut_assertion_frame);
            ::taut::assert::check_impl(__taut_result, #source_text, ::taut::assert::AssertFlags::#flag_ident)
        }
    };
    expanded.into()
}

/// Evaluates a boolean expression, capturing every `arg!(...)`-marked
/// subexpression for a failure diagram, and marks the current test
/// failing without unwinding if it is false.
#[proc_macro]
pub fn check(input: TokenStream) -> TokenStream {
    expand_assertion(input, "SOFT")
}

/// Like [`check`], but unwinds the current test repetition immediately
/// on failure.
#[proc_macro]
pub fn require(input: TokenStream) -> TokenStream {
    expand_assertion(input, "HARD")
}

/// Registers a function as a test case, discovered at link time via
/// `inventory`. `#[taut::test(disabled)]` registers it but marks it
/// skipped unless force-included, per [`taut::config::NameFilter`].
#[proc_macro_attribute]
pub fn test(attr: TokenStream, item: TokenStream) -> TokenStream {
    let input_fn = parse_macro_input!(item as ItemFn);
    let fn_name = &input_fn.sig.ident;
    let test_name = fn_name.to_string();
    let wrapper_name = format_ident!("__taut_test_body_{fn_name}");

    let flags = parse_macro_input!(attr with Punctuated::<Ident, Token![,]>::parse_terminated);
    let disabled = flags.iter().any(|flag| flag == "disabled");

    let expanded = quote! {
        #input_fn

        #[doc(hidden)]
        fn #wrapper_name() {
            #fn_name()
        }

        ::taut::__inventory::submit! {
            ::taut::runner::TestRegistration(::taut::runner::TestCase {
                name: #test_name,
                location: concat!(file!(), ":", line!()),
                body: #wrapper_name,
                disabled: #disabled,
            })
        }
    };
    expanded.into()
}
