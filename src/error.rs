use thiserror::Error;

/// Precondition violations of the synthesis pipeline.
///
/// Structural impossibility (a Rabin condition with no parity equivalent) is
/// not an error and is reported as `None` by the construction that hits it.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SynthesisError {
    #[error("automata belong to different managers")]
    FactoryMismatch,

    #[error("automaton is not deterministic")]
    NotDeterministic,

    #[error("automaton is not complete")]
    NotComplete,

    #[error("unsupported acceptance condition: {0}")]
    WrongAcceptance(String),

    #[error("acceptance condition is not in Rabin normal form: {0}")]
    MalformedAcceptance(String),

    #[error("{given} controlled atomic propositions requested, only {available} available")]
    TooManyControlledAps { given: usize, available: usize },

    #[error("automata have different atomic propositions")]
    IncompatibleAlphabets,

    #[error("product of zero automata")]
    EmptyProduct,
}
