use fsmgen_core::switch::{Bucket, Layout};
use fsmgen_core::{BranchPlan, Comparison, StateId, TokenValue};
use proc_macro2::TokenStream;
use quote::quote;

use crate::helpers::{LiteralToken, suffixed};
use crate::ir::MachineIr;

fn state_id(id: StateId) -> TokenStream {
    suffixed(i128::from(id), "u32")
}

fn hash_literal(hash: i32) -> TokenStream {
    suffixed(i128::from(hash), "i32")
}

/// Renders `transit(state, token) -> state` as a `match` over state ids.
/// The exit state has no arm and falls into the default.
pub fn render_transit<T: LiteralToken>(ir: &MachineIr<T>) -> TokenStream {
    let token_type = &ir.token_type;
    let arms = ir
        .plan
        .branches()
        .iter()
        .enumerate()
        .skip(1)
        .map(|(id, branch)| {
            let id = state_id(id as StateId);
            let body = render_branch(branch);
            quote!(#id => #body,)
        });

    quote! {
        #[allow(unused_variables, clippy::all)]
        pub fn transit(state: ::fsmgen::StateId, token: &#token_type) -> ::fsmgen::StateId {
            match state {
                #(#arms)*
                _ => 0u32,
            }
        }
    }
}

fn render_branch<T: LiteralToken>(branch: &BranchPlan<T>) -> TokenStream {
    match branch {
        BranchPlan::Jump(target) => state_id(*target),
        BranchPlan::Single {
            value,
            target,
            fallback,
        } => {
            let hash = hash_literal(value.switch_hash());
            let (target, fallback) = (state_id(*target), state_id(*fallback));
            let test = if T::KIND.comparison().hash_is_exact() {
                quote!(::fsmgen::TokenValue::switch_hash(token) == #hash)
            } else {
                let exact = value.exact_test();
                quote!(::fsmgen::TokenValue::switch_hash(token) == #hash && #exact)
            };
            quote!(if #test { #target } else { #fallback })
        }
        BranchPlan::Switch {
            map,
            ranges,
            fallback,
        } => {
            let comparison = map.comparison();
            let (selector, cases): (TokenStream, Vec<TokenStream>) = match map.layout() {
                Layout::Dense { min, .. } => {
                    let origin = hash_literal(min);
                    let cases = map
                        .cases()
                        .filter_map(|(hash, bucket)| {
                            let offset = (i64::from(hash) - i64::from(min)) as StateId;
                            let body = render_bucket(bucket?, comparison);
                            let offset = state_id(offset);
                            Some(quote!(#offset => #body,))
                        })
                        .collect();
                    (quote!(hash.wrapping_sub(#origin) as u32), cases)
                }
                Layout::Sparse => {
                    let cases = map
                        .buckets()
                        .iter()
                        .map(|bucket| {
                            let pattern = hash_literal(bucket.hash());
                            let body = render_bucket(bucket, comparison);
                            quote!(#pattern => #body,)
                        })
                        .collect();
                    (quote!(hash), cases)
                }
            };
            let ranges = ranges.iter().map(|arm| {
                let test = T::range_test(&arm.start, &arm.end);
                let target = state_id(arm.target);
                quote!(if #test { return #target; })
            });
            let fallback = state_id(*fallback);

            quote!({
                let hash = ::fsmgen::TokenValue::switch_hash(token);
                match #selector {
                    #(#cases)*
                    _ => {}
                }
                #(#ranges)*
                #fallback
            })
        }
    }
}

/// A bucket of one identity-compared value returns directly; anything else
/// becomes an ordered chain of exact comparisons.
fn render_bucket<T: LiteralToken>(bucket: &Bucket<T, StateId>, comparison: Comparison) -> TokenStream {
    if comparison.hash_is_exact()
        && let [(_, target)] = bucket.entries()
    {
        let target = state_id(*target);
        return quote!(return #target);
    }
    let chain = bucket.entries().iter().map(|(value, target)| {
        let test = value.exact_test();
        let target = state_id(*target);
        quote!(if #test { return #target; })
    });
    quote!({ #(#chain)* })
}
