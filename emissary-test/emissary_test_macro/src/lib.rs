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

use proc_macro::TokenStream;

use quote::quote;
use syn::{parse_macro_input, ItemFn};

/// Runs an async test on a multi-threaded runtime and fails it when a
/// panic lands on any worker thread during the run.
///
/// Worker tasks detach from the test body, so a panic inside one never
/// unwinds into the test itself; a panic hook records it and the test
/// re-raises it with the captured message and location once the body
/// completes.
#[proc_macro_attribute]
pub fn emissary_test(_attr: TokenStream, item: TokenStream) -> TokenStream {
    let input = parse_macro_input!(item as ItemFn);
    let vis = &input.vis;
    let sig = &input.sig;
    let body = &input.block;
    let attrs = &input.attrs;
    let name = &sig.ident;
    let inputs = &sig.inputs;
    let output = &sig.output;

    // Validate that the function is async
    if sig.asyncness.is_none() {
        return syn::Error::new_spanned(
            sig.fn_token,
            "the async keyword is missing from the function declaration",
        )
        .to_compile_error()
        .into();
    }

    let inner_name = syn::Ident::new(&format!("__{}_inner", name), name.span());

    let expanded = quote! {
        #[test]
        #(#attrs)*
        #vis fn #name() {
            use std::panic;
            use std::sync::Arc;
            use std::sync::atomic::{AtomicBool, Ordering};
            use tracing::error;

            #[derive(Clone, Default)]
            struct CapturedPanic {
                seen: Arc<AtomicBool>,
                detail: Arc<parking_lot::Mutex<Option<String>>>,
                site: Arc<parking_lot::Mutex<Option<String>>>,
            }

            let captured = CapturedPanic::default();
            let recorder = captured.clone();

            // The hook sees panics on every thread, including detached
            // workers the harness would never hear from.
            let chained = panic::take_hook();
            panic::set_hook(Box::new(move |info| {
                recorder.seen.store(true, Ordering::SeqCst);
                let detail = info
                    .payload()
                    .downcast_ref::<&str>()
                    .map(|s| (*s).to_string())
                    .or_else(|| info.payload().downcast_ref::<String>().cloned());
                error!(
                    "panic: {}",
                    detail.clone().unwrap_or_else(|| "no message".to_string())
                );
                *recorder.detail.lock() = detail;
                *recorder.site.lock() = info
                    .location()
                    .map(|l| format!("{}:{}:{}", l.file(), l.line(), l.column()));
                chained(info);
            }));

            let runtime = tokio::runtime::Builder::new_multi_thread()
                .enable_all()
                .build()
                .expect("failed to build test runtime");

            let result = runtime.block_on(async {
                captured.seen.store(false, Ordering::SeqCst);
                *captured.detail.lock() = None;
                *captured.site.lock() = None;

                let span = tracing::info_span!("emissary_test", name = stringify!(#name));
                let _guard = span.enter();

                #inner_name().await
            });

            if captured.seen.load(Ordering::SeqCst) {
                let site = captured
                    .site
                    .lock()
                    .clone()
                    .unwrap_or_else(|| "unknown location".to_string());
                let detail = captured
                    .detail
                    .lock()
                    .clone()
                    .unwrap_or_else(|| "no message".to_string())
                    .trim()
                    .replace('\n', " ");
                panic!("panic at {}: {}", site, detail);
            }

            result.unwrap()
        }

        async fn #inner_name(#inputs) #output #body
    };

    expanded.into()
}
