/*
 * Copyright (c) 2024. Govcraft
 *
 * Licensed under either of
 *   * Apache License, Version 2.0 (the "License");
 *     you may not use this file except in compliance with the License.
 *     You may obtain a copy of the License at http://www.apache.org/licenses/LICENSE-2.0
 *   * MIT license: http://opensource.org/licenses/MIT
 *
 * Unless required by applicable law or agreed to in writing, software
 * distributed under the License is distributed on an "AS IS" BASIS,
 * WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
 * See the applicable License for the specific language governing permissions and
 * limitations under that License.
 */
#![forbid(unsafe_code)]

//! Emissary Macro Library
//!
//! This library provides the procedural macro for the Emissary dispatch
//! framework. The [`dispatchable`] attribute projects a type's inherent
//! methods onto the framework's proxies, so callers dispatch through
//! ordinary method calls instead of building selectors and closures by
//! hand.
//!
//! # Dispatchable Macro
//!
//! ```ignore
//! use emissary::prelude::*;
//!
//! pub struct Counter {
//!     total: u64,
//! }
//!
//! #[dispatchable]
//! impl Counter {
//!     pub fn add(&mut self, amount: u64) {
//!         self.total += amount;
//!     }
//!
//!     pub fn total(&self) -> u64 {
//!         self.total
//!     }
//! }
//!
//! // CounterCastExt: fire-and-forget, unit-returning methods only.
//! handle.as_actor().add(3)?;
//!
//! // CounterCallExt: round-trip with the method's own return type.
//! let total = handle.as_sync().total().await?;
//!
//! // CounterStageExt: buffer now, run at commit.
//! let mut batch = handle.new_batch();
//! let slot = batch.add(7)?;
//! batch.commit().await?;
//! ```

use proc_macro::TokenStream;

use quote::{format_ident, quote};
use syn::{parse_macro_input, FnArg, ImplItem, ItemImpl, Pat, ReturnType, Type, Visibility};

/// Configuration options parsed from `#[dispatchable(...)]` attributes.
struct DispatchableConfig {
    /// The crate whose prelude supplies the proxy types.
    crate_name: String,
}

impl Default for DispatchableConfig {
    fn default() -> Self {
        Self {
            crate_name: "emissary".to_string(),
        }
    }
}

impl DispatchableConfig {
    /// Parse configuration from attribute tokens.
    fn parse(attr: &TokenStream) -> Self {
        let mut config = Self::default();

        // Parse the attribute stream to look for known options
        let attr_string = attr.to_string();
        if let Some(name) = attr_string
            .split(',')
            .find(|s| s.contains("crate"))
            .and_then(|s| s.split('=').nth(1))
        {
            config.crate_name = name.trim().trim_matches('"').to_string();
        }

        config
    }
}

/// One inherent method selected for projection onto the proxies.
struct Projection {
    ident: syn::Ident,
    selector: String,
    arity: usize,
    arg_names: Vec<syn::Ident>,
    arg_types: Vec<syn::Type>,
    ret: syn::Type,
    unit: bool,
}

/// Whether a type can cross into a dispatched closure: it must be owned
/// data, so references, opaque `impl` types, and `Self` mentions are out.
fn is_projectable(tokens: &str) -> bool {
    !tokens.contains('&') && !tokens.contains("impl ") && !tokens.contains("Self")
}

fn is_unit(ty: &syn::Type) -> bool {
    matches!(ty, Type::Tuple(tuple) if tuple.elems.is_empty())
}

fn return_type(sig: &syn::Signature) -> syn::Type {
    match &sig.output {
        ReturnType::Default => syn::parse_quote!(()),
        ReturnType::Type(_, ty) => (**ty).clone(),
    }
}

/// Collect the methods of the impl block that can travel through a proxy.
///
/// A method qualifies when it is public, non-async, non-generic, borrows
/// its receiver, and moves owned data in and out. Everything else stays
/// callable directly but gets no projection.
fn projections(item: &ItemImpl) -> Vec<Projection> {
    let mut methods = Vec::new();
    for entry in &item.items {
        let ImplItem::Fn(method) = entry else {
            continue;
        };
        if !matches!(method.vis, Visibility::Public(_)) {
            continue;
        }
        let sig = &method.sig;
        if sig.asyncness.is_some() || sig.unsafety.is_some() || sig.abi.is_some() {
            continue;
        }
        if !sig.generics.params.is_empty() {
            continue;
        }

        // The receiver must borrow; consuming methods cannot run through
        // a proxy, which never owns the target.
        let mut inputs = sig.inputs.iter();
        let Some(FnArg::Receiver(receiver)) = inputs.next() else {
            continue;
        };
        if receiver.reference.is_none() {
            continue;
        }

        let mut arg_names = Vec::new();
        let mut arg_types = Vec::new();
        let mut eligible = true;
        for input in inputs {
            let FnArg::Typed(arg) = input else {
                eligible = false;
                break;
            };
            let Pat::Ident(pat) = &*arg.pat else {
                eligible = false;
                break;
            };
            let ty = (*arg.ty).clone();
            if !is_projectable(&quote!(#ty).to_string()) {
                eligible = false;
                break;
            }
            arg_names.push(pat.ident.clone());
            arg_types.push(ty);
        }
        if !eligible {
            continue;
        }

        let ret = return_type(sig);
        if !is_projectable(&quote!(#ret).to_string()) {
            continue;
        }

        methods.push(Projection {
            ident: sig.ident.clone(),
            selector: sig.ident.to_string(),
            arity: arg_names.len(),
            arg_names,
            arg_types,
            unit: is_unit(&ret),
            ret,
        });
    }
    methods
}

/// A procedural macro that projects a type's inherent methods onto its
/// Emissary proxies.
///
/// Applied to an inherent `impl` block, the macro re-emits the block
/// unchanged and generates three extension traits named after the type:
///
/// - `{Type}CastExt` on `ActorProxy<Type>` — fire-and-forget dispatch.
///   Only unit-returning methods appear here; a method with a result has
///   no business on the path that discards results, and leaving it out
///   makes that a compile error instead of a runtime
///   `AsyncResultMismatch`.
/// - `{Type}CallExt` on `SyncProxy<Type>` — round-trip dispatch. Every
///   projected method appears, returning a future of
///   `Result<R, DispatchError>` where `R` is the method's own return
///   type.
/// - `{Type}StageExt` on `BatchProxy<Type>` — staged dispatch. Every
///   projected method appears, returning `Result<Pending<R>,
///   DispatchError>`; the slot fills when the block commits.
///
/// # Usage
///
/// ```ignore
/// use emissary::prelude::*;
///
/// #[dispatchable]
/// impl Ledger {
///     pub fn record(&mut self, entry: String) { /* ... */ }
///     pub fn balance(&self) -> i64 { /* ... */ 0 }
/// }
/// ```
///
/// # Method eligibility
///
/// A method is projected when it is `pub`, not `async`, not generic,
/// takes `&self` or `&mut self`, and moves owned data: reference
/// parameters, reference returns, `impl Trait`, and `Self` mentions
/// disqualify a method. Disqualified methods are skipped silently and
/// remain callable directly on the type.
///
/// # Options
///
/// ## `crate`
///
/// Generated code names the proxy types through `::emissary::prelude`.
/// When the facade crate is re-exported under a different name, point
/// the macro at it:
///
/// ```ignore
/// #[dispatchable(crate = "my_emissary")]
/// impl Ledger { /* ... */ }
/// ```
#[proc_macro_attribute]
pub fn dispatchable(attr: TokenStream, item: TokenStream) -> TokenStream {
    // Parse configuration from attributes
    let config = DispatchableConfig::parse(&attr);

    // Parse the input tokens into a syntax tree.
    let input = parse_macro_input!(item as ItemImpl);

    // Trait impls carry their own dispatch surface already.
    if let Some((_, path, _)) = &input.trait_ {
        return syn::Error::new_spanned(path, "dispatchable applies to inherent impl blocks only")
            .to_compile_error()
            .into();
    }
    if !input.generics.params.is_empty() {
        return syn::Error::new_spanned(
            &input.generics,
            "dispatchable requires a non-generic self type",
        )
        .to_compile_error()
        .into();
    }

    // The self type must be a plain path so the traits can be named
    // after it.
    let self_ty = &input.self_ty;
    let type_ident = match self_ty.as_ref() {
        Type::Path(path) if path.qself.is_none() => match path.path.segments.last() {
            Some(segment) if segment.arguments.is_empty() => segment.ident.clone(),
            _ => {
                return syn::Error::new_spanned(
                    self_ty,
                    "dispatchable requires a concrete, non-generic self type",
                )
                .to_compile_error()
                .into();
            }
        },
        _ => {
            return syn::Error::new_spanned(
                self_ty,
                "dispatchable requires a concrete, non-generic self type",
            )
            .to_compile_error()
            .into();
        }
    };

    let root = format_ident!("{}", config.crate_name);
    let methods = projections(&input);

    let cast_trait = format_ident!("{}CastExt", type_ident);
    let call_trait = format_ident!("{}CallExt", type_ident);
    let stage_trait = format_ident!("{}StageExt", type_ident);

    let mut cast_decls = Vec::new();
    let mut cast_impls = Vec::new();
    let mut call_decls = Vec::new();
    let mut call_impls = Vec::new();
    let mut stage_decls = Vec::new();
    let mut stage_impls = Vec::new();

    for method in &methods {
        let ident = &method.ident;
        let selector = &method.selector;
        let arity = method.arity;
        let names = &method.arg_names;
        let types = &method.arg_types;
        let ret = &method.ret;

        let params = quote!(#(#names: #types),*);
        let forward = quote!(#(#names),*);

        if method.unit {
            cast_decls.push(quote! {
                fn #ident(&self, #params) -> ::core::result::Result<(), ::#root::prelude::DispatchError>;
            });
            cast_impls.push(quote! {
                fn #ident(&self, #params) -> ::core::result::Result<(), ::#root::prelude::DispatchError> {
                    self.cast(
                        ::#root::prelude::Selector::new(#selector, #arity),
                        move |target| <#self_ty>::#ident(target, #forward),
                    )
                }
            });
        }

        call_decls.push(quote! {
            fn #ident(&self, #params) -> impl ::core::future::Future<
                Output = ::core::result::Result<#ret, ::#root::prelude::DispatchError>,
            > + ::core::marker::Send;
        });
        call_impls.push(quote! {
            #[allow(clippy::manual_async_fn)]
            fn #ident(&self, #params) -> impl ::core::future::Future<
                Output = ::core::result::Result<#ret, ::#root::prelude::DispatchError>,
            > + ::core::marker::Send {
                let proxy = ::core::clone::Clone::clone(self);
                async move {
                    proxy
                        .call(
                            ::#root::prelude::Selector::new(#selector, #arity),
                            move |target| <#self_ty>::#ident(target, #forward),
                        )
                        .await
                }
            }
        });

        stage_decls.push(quote! {
            fn #ident(&mut self, #params) -> ::core::result::Result<
                ::#root::prelude::Pending<#ret>,
                ::#root::prelude::DispatchError,
            >;
        });
        stage_impls.push(quote! {
            fn #ident(&mut self, #params) -> ::core::result::Result<
                ::#root::prelude::Pending<#ret>,
                ::#root::prelude::DispatchError,
            > {
                self.stage(
                    ::#root::prelude::Selector::new(#selector, #arity),
                    move |target| <#self_ty>::#ident(target, #forward),
                )
            }
        });
    }

    let cast_doc = format!("Fire-and-forget projections of `{type_ident}`'s methods.");
    let call_doc = format!("Round-trip projections of `{type_ident}`'s methods.");
    let stage_doc = format!("Staged projections of `{type_ident}`'s methods.");

    let expanded = quote! {
        #input

        #[doc = #cast_doc]
        pub trait #cast_trait {
            #(#cast_decls)*
        }

        impl #cast_trait for ::#root::prelude::ActorProxy<#self_ty> {
            #(#cast_impls)*
        }

        #[doc = #call_doc]
        pub trait #call_trait {
            #(#call_decls)*
        }

        impl #call_trait for ::#root::prelude::SyncProxy<#self_ty> {
            #(#call_impls)*
        }

        #[doc = #stage_doc]
        pub trait #stage_trait {
            #(#stage_decls)*
        }

        impl #stage_trait for ::#root::prelude::BatchProxy<#self_ty> {
            #(#stage_impls)*
        }
    };

    // Return the generated tokens.
    TokenStream::from(expanded)
}
