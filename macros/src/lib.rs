// rdispatch-macros/src/lib.rs
extern crate proc_macro;

use proc_macro::TokenStream;
use proc_macro2::Literal;
use quote::quote;
use syn::parse::Parser;
use syn::punctuated::Punctuated;
use syn::{parse_macro_input, Expr, ExprLit, ItemFn, Lit, MetaNameValue, Token};

/// Worker threads used by `#[rdispatch::test]` when none are requested.
const DEFAULT_TEST_WORKERS: usize = 4;

/// Parses the optional `workers = N` argument shared by both attributes.
fn parse_workers(attr: TokenStream) -> syn::Result<Option<usize>> {
  let args = Punctuated::<MetaNameValue, Token![,]>::parse_terminated.parse(attr)?;
  let mut workers = None;
  for arg in args {
    if !arg.path.is_ident("workers") {
      return Err(syn::Error::new_spanned(&arg.path, "unknown argument, expected `workers = N`"));
    }
    match &arg.value {
      Expr::Lit(ExprLit { lit: Lit::Int(n), .. }) => {
        let count: usize = n.base10_parse()?;
        if count == 0 {
          return Err(syn::Error::new_spanned(n, "`workers` must be at least 1"));
        }
        workers = Some(count);
      }
      other => {
        return Err(syn::Error::new_spanned(other, "`workers` expects an integer literal"));
      }
    }
  }
  Ok(workers)
}

/// Runs an `async fn main` on a multi-threaded Tokio runtime.
///
/// Dispatchers only show their concurrency limits on a runtime that actually
/// runs tasks in parallel, so this always selects the `multi_thread` flavor.
/// `#[rdispatch::main(workers = 8)]` fixes the worker thread count; without it
/// Tokio's default (one per core) applies.
///
/// # Example
/// ```ignore
/// #[rdispatch::main(workers = 2)]
/// async fn main() {
///   let dispatcher = rdispatch::Dispatcher::gated(4).unwrap();
///   // ...
/// }
/// ```
#[proc_macro_attribute]
pub fn main(attr: TokenStream, item: TokenStream) -> TokenStream {
  let workers = match parse_workers(attr) {
    Ok(workers) => workers,
    Err(e) => return e.to_compile_error().into(),
  };
  let input_fn = parse_macro_input!(item as ItemFn);

  let fn_vis = &input_fn.vis;
  let fn_sig = &input_fn.sig;
  let fn_block = &input_fn.block;
  let fn_attrs = &input_fn.attrs;

  if fn_sig.asyncness.is_none() {
    let error_msg = "`#[rdispatch::main]` attribute can only be used on `async` functions";
    return syn::Error::new_spanned(&fn_sig.fn_token, error_msg)
      .to_compile_error()
      .into();
  }

  let runtime_attr = match workers {
    Some(count) => {
      let count = Literal::usize_unsuffixed(count);
      quote! { #[tokio::main(flavor = "multi_thread", worker_threads = #count)] }
    }
    None => quote! { #[tokio::main(flavor = "multi_thread")] },
  };

  let expanded_code = quote! {
      #(#fn_attrs)*
      #runtime_attr
      #fn_vis #fn_sig
      #fn_block
  };

  TokenStream::from(expanded_code)
}

/// Marks an `async fn` as a test on a multi-threaded Tokio runtime.
///
/// Uses `workers = N` threads (default 4) so concurrency limits are exercised
/// under real parallelism. Other attributes such as `#[should_panic]` are kept.
#[proc_macro_attribute]
pub fn test(attr: TokenStream, item: TokenStream) -> TokenStream {
  let workers = match parse_workers(attr) {
    Ok(workers) => workers.unwrap_or(DEFAULT_TEST_WORKERS),
    Err(e) => return e.to_compile_error().into(),
  };
  let input_fn = parse_macro_input!(item as ItemFn);
  let fn_vis = &input_fn.vis;
  let fn_sig = &input_fn.sig;
  let fn_block = &input_fn.block;
  let fn_attrs = &input_fn.attrs;

  if fn_sig.asyncness.is_none() {
    let error_msg = "`#[rdispatch::test]` attribute can only be used on `async` functions";
    return syn::Error::new_spanned(&fn_sig.fn_token, error_msg)
      .to_compile_error()
      .into();
  }

  let count = Literal::usize_unsuffixed(workers);
  let expanded_code = quote! {
      #(#fn_attrs)*
      #[tokio::test(flavor = "multi_thread", worker_threads = #count)]
      #fn_vis #fn_sig
      #fn_block
  };

  TokenStream::from(expanded_code)
}
