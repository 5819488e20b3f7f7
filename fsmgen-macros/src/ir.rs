use fsmgen_core::{Compiler, CompilerConfig, MachinePlan, ModelBuilder, Token};
use quote::ToTokens;
use syn::{Error, Expr, Type};

use crate::attrs::OnAttr;
use crate::helpers::LiteralToken;
use crate::validation::MachineStructure;

/// Lowered form of a machine: everything code generation needs, with every
/// semantic decision already taken by the runtime compiler.
pub struct MachineIr<T> {
    pub state_type: Type,
    pub token_type: Type,
    /// State expressions indexed by id.
    pub values: Vec<Expr>,
    pub plan: MachinePlan<T>,
    pub fingerprint: String,
}

impl<T: LiteralToken> MachineIr<T> {
    /// Replays the attributes through the model builder and plans the
    /// dispatch routine, so that generated code and runtime compilation share
    /// validation and strategy selection.
    pub fn lower(machine: &MachineStructure) -> syn::Result<Self> {
        let mut builder = ModelBuilder::<String, T>::new();
        builder
            .set_init(machine.init.spelling.clone())
            .map_err(|err| Error::new_spanned(&machine.init.expr, err))?;
        builder
            .set_exit(machine.exit.spelling.clone())
            .map_err(|err| Error::new_spanned(&machine.exit.expr, err))?;
        for state in &machine.states {
            builder
                .add_state(state.spelling.clone())
                .map_err(|err| Error::new_spanned(&state.expr, err))?;
        }

        for transition in &machine.transitions {
            let token = match &transition.on {
                None => None,
                Some(OnAttr::Single(expr)) => Some(Token::single(T::parse_literal(expr)?)),
                Some(OnAttr::Set(exprs)) => {
                    let values = exprs.iter().map(T::parse_literal).collect::<syn::Result<Vec<_>>>()?;
                    Some(Token::set(values))
                }
                Some(OnAttr::Range { start, end }) => {
                    let token = Token::range(T::parse_literal(start)?, T::parse_literal(end)?)
                        .map_err(|err| Error::new_spanned(&transition.attr, err))?;
                    Some(token)
                }
            };
            let from = transition.from.to_token_stream().to_string();
            let to = transition.to.to_token_stream().to_string();
            builder
                .add_transition(from, to, token)
                .map_err(|err| Error::new_spanned(&transition.attr, err))?;
        }

        let model = builder
            .allow_unreachable(machine.allow_unreachable)
            .build()
            .map_err(|err| Error::new_spanned(&machine.name, err))?;

        let mut config = CompilerConfig::default().with_strategy(machine.strategy);
        if let Some(max_delta) = machine.max_delta {
            config = config.with_max_delta(max_delta);
        }
        let (translation, plan) = Compiler::new()
            .with_config(config)
            .plan(&model)
            .map_err(|err| Error::new_spanned(&machine.name, err))?;

        let values = translation
            .values()
            .iter()
            .map(|spelling| {
                machine
                    .state_expr(spelling)
                    .cloned()
                    .ok_or_else(|| Error::new_spanned(&machine.name, format!("unknown state `{spelling}`")))
            })
            .collect::<syn::Result<Vec<_>>>()?;

        Ok(Self {
            state_type: machine.state_type.clone(),
            token_type: machine.token_type.clone(),
            values,
            plan,
            fingerprint: model.fingerprint().to_string(),
        })
    }
}
