/*
 * Created on Sun Sep 13 2020
 *
 * This file is a part of Skytable
 * Skytable (formerly known as TerrabaseDB or Skybase) is a free and open-source
 * NoSQL database written by Sayan Nandan ("the Author") with the
 * vision to provide flexibility in data modelling without compromising
 * on performance, queryability or scalability.
 *
 * Copyright (c) 2020, Sayan Nandan <ohsayan@outlook.com>
 *
 * This program is free software: you can redistribute it and/or modify
 * it under the terms of the GNU Affero General Public License as published by
 * the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
 *
 * This program is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 * GNU Affero General Public License for more details.
 *
 * You should have received a copy of the GNU Affero General Public License
 * along with this program. If not, see <https://www.gnu.org/licenses/>.
 *
*/

#![deny(unused_crate_dependencies)]
#![deny(unused_imports)]

//! A library containing a collection of custom derives used by this workspace
//!
//! ## Ghost values
//! We extensively use jargon like 'Ghost values'...but what exactly are they?
//! Ghost values are variables which are provided by the compiler macros, i.e the
//! _proc macros_. These values are just like normal variables except for the fact
//! that they aren't explicitly declared in code, and should be used directly. Make
//! sure that you don't overwrite a macro provided variable!
//!
//! ### Macros and ghost values
//! - `#[rpc_test]`:
//!     - takes the annotated function's single parameter as a ghost binding
//!       for `(Box<dyn TInputProtocol>, Box<dyn TOutputProtocol>)`, connected
//!       to a `TSimpleServer` the macro starts on a background thread for the
//!       duration of the test
//!

use proc_macro::TokenStream;
use quote::quote;
use syn::{self};

/// Expands a plain (non-`async`) test function taking exactly one parameter
/// into a `#[test]` that spins up a `TSimpleServer` on an ephemeral loopback
/// port, connects a client to it, and hands the client-side input/output
/// protocol pair to the function's single parameter as a `(Box<dyn
/// TInputProtocol>, Box<dyn TOutputProtocol>)` tuple. The server is stopped
/// and the background thread joined once the function body returns.
///
/// Only usable from within this workspace's `server` crate: the generated
/// code refers to `crate::serve`/`crate::protocol`/`crate::transport`.
fn parse_rpc_test(mut input: syn::ItemFn) -> Result<TokenStream, syn::Error> {
    let sig = &mut input.sig;
    if sig.asyncness.is_some() {
        let msg = "`rpc_test` functions must not be async";
        return Err(syn::Error::new_spanned(sig.fn_token, msg));
    }
    if sig.inputs.len() != 1 {
        let msg = "`rpc_test` functions take exactly one parameter: the client protocol pair";
        return Err(syn::Error::new_spanned(&sig.inputs, msg));
    }
    let param_pat = match sig.inputs.first().unwrap() {
        syn::FnArg::Typed(pt) => pt.pat.clone(),
        syn::FnArg::Receiver(r) => {
            return Err(syn::Error::new_spanned(r, "expected a typed parameter, not `self`"))
        }
    };
    sig.inputs.clear();
    let body = &input.block;
    let attrs = &input.attrs;
    let vis = &input.vis;
    let result = quote! {
        #[::core::prelude::v1::test]
        #(#attrs)*
        #vis #sig {
            let __rpc_test_listener__ =
                crate::transport::socket::TServerSocket::bind("127.0.0.1:0")
                    .expect("rpc_test: failed to bind ephemeral listener");
            let __rpc_test_addr__ = __rpc_test_listener__
                .local_addr()
                .expect("rpc_test: failed to read local addr");
            let mut __rpc_test_handler__ = crate::serve::ApplicationHandler::new();
            __rpc_test_handler__.register("ping", |seqid, input, output| {
                input.read_struct_begin()?;
                loop {
                    let field = input.read_field_begin()?;
                    if field.field_type == crate::protocol::TType::Stop {
                        break;
                    }
                    crate::protocol::skip(input, field.field_type)?;
                    input.read_field_end()?;
                }
                input.read_struct_end()?;
                input.read_message_end()?;
                output.write_message_begin(&crate::protocol::TMessageIdentifier::new(
                    "ping",
                    crate::protocol::TMessageType::Reply,
                    seqid,
                ))?;
                output.write_struct_begin("pingResult")?;
                output.write_field_stop()?;
                output.write_struct_end()?;
                output.write_message_end()?;
                output.flush()
            });
            let __rpc_test_server__ = crate::serve::TSimpleServer::new(
                __rpc_test_listener__,
                __rpc_test_handler__,
                |t| {
                    Ok(::std::boxed::Box::new(crate::protocol::json::TJsonInputProtocol::new(
                        crate::transport::buffered::TBufferedTransport::new(t),
                    )) as ::std::boxed::Box<dyn crate::protocol::TInputProtocol>)
                },
                |t| {
                    Ok(::std::boxed::Box::new(crate::protocol::json::TJsonOutputProtocol::new(
                        crate::transport::buffered::TBufferedTransport::new(t),
                    )) as ::std::boxed::Box<dyn crate::protocol::TOutputProtocol>)
                },
            );
            let __rpc_test_stop__ = __rpc_test_server__.stop_handle();
            let __rpc_test_thread__ = ::std::thread::spawn(move || {
                let _ = __rpc_test_server__.serve();
            });
            let __rpc_test_stream__ = ::std::net::TcpStream::connect(__rpc_test_addr__)
                .expect("rpc_test: failed to connect to the test server");
            let __rpc_test_client__ =
                crate::transport::socket::TSocket::from_stream(__rpc_test_stream__);
            let __rpc_test_client_reader__ = __rpc_test_client__
                .try_clone()
                .expect("rpc_test: failed to clone client stream");
            let #param_pat: (
                ::std::boxed::Box<dyn crate::protocol::TInputProtocol>,
                ::std::boxed::Box<dyn crate::protocol::TOutputProtocol>,
            ) = (
                ::std::boxed::Box::new(crate::protocol::json::TJsonInputProtocol::new(
                    crate::transport::buffered::TBufferedTransport::new(__rpc_test_client_reader__),
                )),
                ::std::boxed::Box::new(crate::protocol::json::TJsonOutputProtocol::new(
                    crate::transport::buffered::TBufferedTransport::new(__rpc_test_client__),
                )),
            );
            #body
            __rpc_test_stop__.store(true, ::std::sync::atomic::Ordering::Relaxed);
            let _ = ::std::net::TcpStream::connect(__rpc_test_addr__);
            __rpc_test_thread__.join().expect("rpc_test: server thread panicked");
        }
    };
    Ok(result.into())
}

#[proc_macro_attribute]
pub fn rpc_test(_args: TokenStream, item: TokenStream) -> TokenStream {
    let input = syn::parse_macro_input!(item as syn::ItemFn);
    parse_rpc_test(input).unwrap_or_else(|e| e.to_compile_error().into())
}
