//! Proc macro generating specialized fsmgen dispatch routines ahead of time.

use fsmgen_core::TokenKind;
use proc_macro::TokenStream;
use syn::ItemStruct;

mod attrs;
mod codegen;
mod helpers;
mod ir;
mod validation;

use crate::helpers::LiteralToken;
use crate::ir::MachineIr;
use crate::validation::MachineStructure;

/// Compiles a declarative transition model into a `transit` function at
/// build time.
///
/// The attribute takes the state and token types, the initial and exit
/// states and optional tuning arguments. Transitions are listed as
/// `#[transition]` attributes below it; a transition without `on` is the
/// state's unconditional fallback. Every other state is declared by its
/// first appearance.
///
/// ```rust,ignore
/// #[fsmgen::machine(state = i32, token = char, init = 0, exit = -1)]
/// #[transition(from = 0, to = 1, on = 'a'..='z')]
/// #[transition(from = 1, to = 1, on = ['a', 'e', 'i', 'o', 'u'])]
/// #[transition(from = 1, to = 2, on = '.')]
/// #[transition(from = 1, to = -1)]
/// pub struct Words;
///
/// let machine = Words::machine()?;
/// assert_eq!(*machine.run("ae.".chars()), 2);
/// ```
///
/// Arguments:
/// - `state = TYPE`, `token = TYPE`: token types are `bool`, `char`, the
///   fixed-width integers, `f32`, `f64`, `String` and `&str`.
/// - `init = EXPR`, `exit = EXPR`
/// - `max_delta = INT`: widest hash span still compiled into a dense table.
/// - `strategy = "auto" | "dense" | "sparse"`
/// - `allow_unreachable = BOOL`
///
/// Invalid models are reported as compile errors.
#[proc_macro_attribute]
pub fn machine(args: TokenStream, input: TokenStream) -> TokenStream {
    match expand(args.into(), input.into()) {
        Ok(tokens) => tokens.into(),
        Err(err) => err.to_compile_error().into(),
    }
}

fn expand(args: proc_macro2::TokenStream, input: proc_macro2::TokenStream) -> syn::Result<proc_macro2::TokenStream> {
    let args = syn::parse2(args)?;
    let item: ItemStruct = syn::parse2(input)?;
    let machine = MachineStructure::parse(args, item)?;

    match machine.token_kind {
        TokenKind::Bool => generate_machine::<bool>(&machine),
        TokenKind::Char => generate_machine::<char>(&machine),
        TokenKind::I8 => generate_machine::<i8>(&machine),
        TokenKind::I16 => generate_machine::<i16>(&machine),
        TokenKind::I32 => generate_machine::<i32>(&machine),
        TokenKind::I64 => generate_machine::<i64>(&machine),
        TokenKind::U8 => generate_machine::<u8>(&machine),
        TokenKind::U16 => generate_machine::<u16>(&machine),
        TokenKind::U32 => generate_machine::<u32>(&machine),
        TokenKind::U64 => generate_machine::<u64>(&machine),
        TokenKind::F32 => generate_machine::<f32>(&machine),
        TokenKind::F64 => generate_machine::<f64>(&machine),
        TokenKind::Str => generate_machine::<String>(&machine),
    }
}

fn generate_machine<T: LiteralToken>(machine: &MachineStructure) -> syn::Result<proc_macro2::TokenStream> {
    let ir = MachineIr::<T>::lower(machine)?;
    Ok(codegen::generate(machine, &ir))
}

#[cfg(test)]
mod tests {
    use quote::quote;

    use super::expand;

    fn render(args: proc_macro2::TokenStream, item: proc_macro2::TokenStream) -> String {
        let tokens = expand(args, item).expect("expansion");
        prettyplease::unparse(&syn::parse2(tokens).expect("generated file"))
    }

    fn error(args: proc_macro2::TokenStream, item: proc_macro2::TokenStream) -> String {
        match expand(args, item) {
            Ok(_) => panic!("expected an expansion error"),
            Err(err) => err.to_string(),
        }
    }

    #[test]
    fn strips_transition_attributes() {
        let code = render(
            quote!(state = u8, token = u8, init = 0, exit = 9),
            quote! {
                #[derive(Debug)]
                #[transition(from = 0, to = 1, on = 1)]
                #[transition(from = 1, to = 9)]
                pub struct Tiny;
            },
        );
        assert!(code.contains("#[derive(Debug)]"));
        assert!(!code.contains("#[transition"));
        assert!(code.contains("pub fn transit(state: ::fsmgen::StateId, token: &u8)"));
        assert!(code.contains("vec![9, 0, 1]"));
        assert!(code.contains("pub const FINGERPRINT"));
    }

    #[test]
    fn dense_and_sparse_selectors() {
        let dense = render(
            quote!(state = i32, token = i32, init = 0, exit = -1),
            quote! {
                #[transition(from = 0, to = 1, on = [1, 2, 3])]
                #[transition(from = 0, to = 2, on = 5)]
                #[transition(from = 1, to = -1)]
                #[transition(from = 2, to = -1)]
                struct Dense;
            },
        );
        assert!(dense.contains("hash.wrapping_sub(1i32) as u32"));

        let sparse = render(
            quote!(state = i32, token = i32, init = 0, exit = -1, strategy = "sparse"),
            quote! {
                #[transition(from = 0, to = 1, on = [1, 2, 3])]
                #[transition(from = 0, to = 2, on = -500)]
                #[transition(from = 1, to = -1)]
                #[transition(from = 2, to = -1)]
                struct Sparse;
            },
        );
        assert!(!sparse.contains("wrapping_sub"));
        assert!(sparse.contains("-500i32 =>"));
    }

    #[test]
    fn colliding_strings_compare_content() {
        let code = render(
            quote!(state = &'static str, token = &str, init = "start", exit = "stop"),
            quote! {
                #[transition(from = "start", to = "a", on = "Aa")]
                #[transition(from = "start", to = "b", on = "BB")]
                #[transition(from = "a", to = "stop")]
                #[transition(from = "b", to = "stop")]
                struct Words;
            },
        );
        assert!(code.contains("token: &&'static str"));
        assert!(code.contains("== \"Aa\""));
        assert!(code.contains("== \"BB\""));
    }

    #[test]
    fn ranges_become_checks() {
        let code = render(
            quote!(state = u8, token = char, init = 0, exit = 1),
            quote! {
                #[transition(from = 0, to = 2, on = 'a'..='z')]
                #[transition(from = 2, to = 1)]
                struct Letters;
            },
        );
        assert!(code.contains("::fsmgen::token::within(token, &'a', &'z')"));
    }

    #[test]
    fn invalid_models_are_compile_errors() {
        let item = quote! {
            #[transition(from = 0, to = 1, on = 1)]
            #[transition(from = 0, to = 2, on = 1)]
            #[transition(from = 1, to = 9)]
            #[transition(from = 2, to = 9)]
            struct Ambiguous;
        };
        assert!(error(quote!(state = u8, token = u8, init = 0, exit = 9), item).contains("matches more than one transition"));

        let item = quote! {
            #[transition(from = 0, to = 1, on = 3..=1)]
            struct Backwards;
        };
        assert!(error(quote!(state = u8, token = u8, init = 0, exit = 1), item).contains("start must be less than end"));

        let item = quote! {
            #[transition(from = 9, to = 0)]
            struct IntoInit;
        };
        assert!(error(quote!(state = u8, token = u8, init = 0, exit = 9), item).contains("invalid state"));

        let item = quote!(struct Empty;);
        assert!(error(quote!(state = u8, token = u8, init = 0, exit = 9), item).contains("at least one"));

        let item = quote! {
            #[transition(from = 0, to = 1)]
            struct Unsupported;
        };
        assert!(error(quote!(state = u8, token = Vec<u8>, init = 0, exit = 1), item).contains("unsupported token type"));
        assert!(error(quote!(state = u8, init = 0, exit = 1), quote!(struct Missing;)).contains("missing required `token`"));
        assert!(
            error(quote!(state = u8, token = u8, init = 0, exit = 0), quote!(#[transition(from = 0, to = 0)] struct Same;))
                .contains("must be different")
        );
    }

    #[test]
    fn transition_arguments_are_checked() {
        let args = || quote!(state = u8, token = u8, init = 0, exit = 9);
        let message = error(args(), quote!(#[transition(from = 0, on = 1)] struct NoTarget;));
        assert!(message.to_lowercase().contains("missing field"), "{message}");

        let message = error(args(), quote!(#[transition(from = 0, to = 9, when = 1)] struct Unknown;));
        assert!(message.contains("when"), "{message}");

        let message = error(args(), quote!(#[transition(from = 0, to = 9, on = 1..5)] struct HalfOpen;));
        assert!(message.contains("inclusive and bounded"), "{message}");
    }

    #[test]
    fn string_states_stay_literals() {
        let code = render(
            quote!(state = &'static str, token = u8, init = "idle", exit = "done"),
            quote! {
                #[transition(from = "idle", to = "done", on = 7)]
                struct Quoted;
            },
        );
        assert!(code.contains("\"idle\""));
        assert!(code.contains("\"done\""));
    }
}
