use proc_macro2::TokenStream;
use quote::quote;

use crate::helpers::LiteralToken;
use crate::ir::MachineIr;

/// Renders the id constants, the translation table and the dispatcher and
/// machine constructors.
pub fn render_constructors<T: LiteralToken>(ir: &MachineIr<T>) -> TokenStream {
    let state_type = &ir.state_type;
    let token_type = &ir.token_type;
    let values = &ir.values;
    let fingerprint = &ir.fingerprint;

    quote! {
        pub const INIT: ::fsmgen::StateId = ::fsmgen::INIT_ID;
        pub const EXIT: ::fsmgen::StateId = ::fsmgen::EXIT_ID;

        /// Structural fingerprint of the model this machine was generated from.
        pub const FINGERPRINT: &'static str = #fingerprint;

        /// State values indexed by id.
        pub fn states() -> ::std::vec::Vec<#state_type> {
            ::std::vec![#(#values),*]
        }

        pub fn dispatcher() -> ::fsmgen::Result<::fsmgen::Dispatcher<#state_type, #token_type>> {
            ::fsmgen::Dispatcher::new(Self::transit, Self::states())
        }

        pub fn machine() -> ::fsmgen::Result<::fsmgen::Machine<#state_type, #token_type>> {
            Self::dispatcher().map(|dispatcher| dispatcher.machine())
        }
    }
}
