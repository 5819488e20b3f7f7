//! Attribute parsing for the `#[machine]` macro.

use darling::FromMeta;
use fsmgen_core::Strategy;
use syn::parse::{Parse, ParseStream};
use syn::{Attribute, Error, Expr, ExprArray, ExprRange, Ident, LitBool, LitInt, LitStr, RangeLimits, Token, Type};

/// Arguments for `#[machine(state = .., token = .., init = .., exit = ..)]`.
pub struct MachineArgs {
    pub state: Type,
    pub token: Type,
    pub init: Expr,
    pub exit: Expr,
    /// Defaults to the runtime compiler's delta.
    pub max_delta: Option<u32>,
    pub strategy: Strategy,
    pub allow_unreachable: bool,
}

impl Parse for MachineArgs {
    fn parse(input: ParseStream) -> syn::Result<Self> {
        let span = input.span();
        let mut state = None;
        let mut token = None;
        let mut init = None;
        let mut exit = None;
        let mut max_delta = None;
        let mut strategy = Strategy::Auto;
        let mut allow_unreachable = false;

        while !input.is_empty() {
            let ident: Ident = input.parse()?;
            let _eq: Token![=] = input.parse()?;

            if ident == "state" {
                state = Some(input.parse()?);
            } else if ident == "token" {
                token = Some(input.parse()?);
            } else if ident == "init" {
                init = Some(input.parse()?);
            } else if ident == "exit" {
                exit = Some(input.parse()?);
            } else if ident == "max_delta" {
                let lit: LitInt = input.parse()?;
                let value: u32 = lit.base10_parse()?;
                if value == 0 {
                    return Err(Error::new(lit.span(), "max_delta must be greater than zero"));
                }
                max_delta = Some(value);
            } else if ident == "strategy" {
                let lit: LitStr = input.parse()?;
                strategy = match lit.value().as_str() {
                    "auto" => Strategy::Auto,
                    "dense" => Strategy::Dense,
                    "sparse" => Strategy::Sparse,
                    _ => {
                        return Err(Error::new(
                            lit.span(),
                            "strategy must be one of \"auto\", \"dense\" or \"sparse\"",
                        ));
                    }
                };
            } else if ident == "allow_unreachable" {
                let lit: LitBool = input.parse()?;
                allow_unreachable = lit.value;
            } else {
                return Err(Error::new(ident.span(), format!("unknown argument `{ident}`")));
            }

            if input.is_empty() {
                break;
            }
            let _comma: Token![,] = input.parse()?;
        }

        let missing = |name: &str| Error::new(span, format!("missing required `{name}` argument"));
        Ok(Self {
            state: state.ok_or_else(|| missing("state"))?,
            token: token.ok_or_else(|| missing("token"))?,
            init: init.ok_or_else(|| missing("init"))?,
            exit: exit.ok_or_else(|| missing("exit"))?,
            max_delta,
            strategy,
            allow_unreachable,
        })
    }
}

/// The `on = ..` argument of a transition.
pub enum OnAttr {
    Single(Expr),
    Set(Vec<Expr>),
    Range { start: Expr, end: Expr },
}

impl FromMeta for OnAttr {
    fn from_expr(expr: &Expr) -> darling::Result<Self> {
        match expr {
            Expr::Group(group) => Self::from_expr(&group.expr),
            Expr::Array(ExprArray { elems, .. }) => Ok(Self::Set(elems.iter().cloned().collect())),
            Expr::Range(ExprRange {
                start: Some(start),
                limits: RangeLimits::Closed(_),
                end: Some(end),
                ..
            }) => Ok(Self::Range {
                start: (**start).clone(),
                end: (**end).clone(),
            }),
            Expr::Range(range) => {
                Err(darling::Error::custom("ranges must be inclusive and bounded: `start..=end`").with_span(range))
            }
            other => Ok(Self::Single(other.clone())),
        }
    }
}

/// A state or token written as a plain expression. Unlike darling's own
/// `Expr` support, string literals stay literals.
struct Verbatim(Expr);

impl FromMeta for Verbatim {
    fn from_expr(expr: &Expr) -> darling::Result<Self> {
        Ok(Self(expr.clone()))
    }
}

#[derive(FromMeta)]
struct TransitionArgs {
    from: Verbatim,
    to: Verbatim,
    #[darling(default)]
    on: Option<OnAttr>,
}

/// Arguments for `#[transition(from = .., to = .. [, on = ..])]`.
pub struct TransitionAttr {
    pub from: Expr,
    pub to: Expr,
    /// `None` for the unconditional fallback.
    pub on: Option<OnAttr>,
    pub attr: Attribute,
}

impl TransitionAttr {
    pub fn from_attribute(attr: &Attribute) -> syn::Result<Self> {
        let args = TransitionArgs::from_meta(&attr.meta).map_err(|err| err.with_span(attr))?;
        Ok(Self {
            from: args.from.0,
            to: args.to.0,
            on: args.on,
            attr: attr.clone(),
        })
    }
}
