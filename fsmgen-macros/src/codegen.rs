//! Code generation for `#[machine]` items.

mod impls;
mod transit;

use proc_macro2::TokenStream;
use quote::quote;

use crate::helpers::LiteralToken;
use crate::ir::MachineIr;
use crate::validation::MachineStructure;

/// Emit the item, stripped of its transition attributes, followed by an
/// inherent impl holding the generated routine.
pub fn generate<T: LiteralToken>(machine: &MachineStructure, ir: &MachineIr<T>) -> TokenStream {
    let item = &machine.item;
    let name = &machine.name;
    let (impl_generics, ty_generics, where_clause) = item.generics.split_for_impl();

    let constructors = impls::render_constructors(ir);
    let transit = transit::render_transit(ir);

    quote! {
        #item

        impl #impl_generics #name #ty_generics #where_clause {
            #constructors

            #transit
        }
    }
}
