//! Structural validation of a `#[machine]` item.

use fsmgen_core::{Strategy, TokenKind};
use quote::ToTokens;
use syn::{Error, Expr, Ident, ItemStruct, Type};

use crate::attrs::{MachineArgs, TransitionAttr};
use crate::helpers;

/// A state as written in the attributes. States are identified by their
/// spelling, so `1` and `0 + 1` are distinct states.
#[derive(Clone)]
pub struct StateRef {
    pub spelling: String,
    pub expr: Expr,
}

impl StateRef {
    fn new(expr: &Expr) -> Self {
        Self {
            spelling: expr.to_token_stream().to_string(),
            expr: expr.clone(),
        }
    }
}

/// Everything the macro read from the item and its attributes.
pub struct MachineStructure {
    pub item: ItemStruct,
    pub name: Ident,
    pub state_type: Type,
    pub token_type: Type,
    pub token_kind: TokenKind,
    pub init: StateRef,
    pub exit: StateRef,
    /// Intermediate states in order of first appearance.
    pub states: Vec<StateRef>,
    pub transitions: Vec<TransitionAttr>,
    pub max_delta: Option<u32>,
    pub strategy: Strategy,
    pub allow_unreachable: bool,
}

impl MachineStructure {
    /// Collects `#[transition]` attributes and strips them from the item.
    pub fn parse(args: MachineArgs, mut item: ItemStruct) -> syn::Result<Self> {
        let (token_kind, token_type) = helpers::classify_token_type(&args.token)?;

        let mut transitions = Vec::new();
        let mut errors: Option<Error> = None;
        item.attrs.retain(|attr| {
            if !attr.path().is_ident("transition") {
                return true;
            }
            match TransitionAttr::from_attribute(attr) {
                Ok(transition) => transitions.push(transition),
                Err(err) => match &mut errors {
                    Some(errors) => errors.combine(err),
                    None => errors = Some(err),
                },
            }
            false
        });
        if let Some(errors) = errors {
            return Err(errors);
        }
        if transitions.is_empty() {
            return Err(Error::new_spanned(
                &item.ident,
                "a machine needs at least one #[transition(from = .., to = ..)] attribute",
            ));
        }

        let init = StateRef::new(&args.init);
        let exit = StateRef::new(&args.exit);
        if init.spelling == exit.spelling {
            return Err(Error::new_spanned(&args.exit, "initial and exit state must be different"));
        }

        let mut states: Vec<StateRef> = Vec::new();
        for transition in &transitions {
            for expr in [&transition.from, &transition.to] {
                let state = StateRef::new(expr);
                let known = state.spelling == init.spelling
                    || state.spelling == exit.spelling
                    || states.iter().any(|seen| seen.spelling == state.spelling);
                if !known {
                    states.push(state);
                }
            }
        }

        Ok(Self {
            name: item.ident.clone(),
            item,
            state_type: args.state,
            token_type,
            token_kind,
            init,
            exit,
            states,
            transitions,
            max_delta: args.max_delta,
            strategy: args.strategy,
            allow_unreachable: args.allow_unreachable,
        })
    }

    /// Expression for a state spelling, init and exit included.
    pub fn state_expr(&self, spelling: &str) -> Option<&Expr> {
        std::iter::once(&self.exit)
            .chain(std::iter::once(&self.init))
            .chain(&self.states)
            .find(|state| state.spelling == spelling)
            .map(|state| &state.expr)
    }
}
