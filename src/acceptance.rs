//! Acceptance conditions over local colour indices.

use crate::bitset::BitSet;
use crate::error::SynthesisError;

/// Propositional formula over colour indices.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Formula {
    Var(usize),
    Not(Box<Formula>),
    And(Vec<Formula>),
    Or(Vec<Formula>),
}

impl Formula {
    /// `Fin(f) = ¬f` is visited finitely often, `Inf(i) = i` infinitely often.
    pub fn fin(colour: usize) -> Formula {
        Formula::Not(Box::new(Formula::Var(colour)))
    }

    pub fn inf(colour: usize) -> Formula {
        Formula::Var(colour)
    }

    /// A Rabin condition: `⋁ (Fin(fᵢ) ∧ Inf(iᵢ))`.
    pub fn rabin(pairs: impl IntoIterator<Item = (usize, usize)>) -> Formula {
        Formula::Or(
            pairs
                .into_iter()
                .map(|(f, i)| Formula::And(vec![Formula::fin(f), Formula::inf(i)]))
                .collect(),
        )
    }

    /// Top-level disjuncts; a non-disjunction is its own single disjunct.
    pub fn disjuncts(&self) -> Vec<&Formula> {
        match self {
            Formula::Or(operands) => operands.iter().collect(),
            other => vec![other],
        }
    }

    /// Rebuilds the formula with every variable replaced through `map`.
    pub fn substitute(&self, map: &impl Fn(usize) -> Formula) -> Formula {
        match self {
            Formula::Var(v) => map(*v),
            Formula::Not(operand) => Formula::Not(Box::new(operand.substitute(map))),
            Formula::And(operands) => {
                Formula::And(operands.iter().map(|f| f.substitute(map)).collect())
            }
            Formula::Or(operands) => {
                Formula::Or(operands.iter().map(|f| f.substitute(map)).collect())
            }
        }
    }

    /// Shifts every colour index by `offset`.
    pub fn shift(&self, offset: usize) -> Formula {
        self.substitute(&|v| Formula::Var(v + offset))
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Parity {
    MinEven,
    MinOdd,
}

/// The acceptance condition of a symbolic automaton, over local colour
/// indices `0..sets`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Acceptance {
    Parity { parity: Parity, sets: usize },
    EmersonLei { formula: Formula, sets: usize },
}

impl Acceptance {
    pub fn sets(&self) -> usize {
        match self {
            Acceptance::Parity { sets, .. } => *sets,
            Acceptance::EmersonLei { sets, .. } => *sets,
        }
    }

    pub fn is_min_even_parity(&self) -> bool {
        matches!(
            self,
            Acceptance::Parity {
                parity: Parity::MinEven,
                ..
            }
        )
    }

    /// Parses a Rabin-shaped Emerson-Lei condition into its pairs.
    ///
    /// The expected shape is a disjunction of two-operand conjunctions, one
    /// plain variable (the Inf set) and one negated variable (the Fin set).
    pub fn rabin_pairs(&self) -> Result<Vec<RabinPair>, SynthesisError> {
        let formula = match self {
            Acceptance::EmersonLei { formula, .. } => formula,
            Acceptance::Parity { .. } => {
                return Err(SynthesisError::WrongAcceptance(
                    "expected a Rabin condition, found parity".to_owned(),
                ));
            }
        };

        formula
            .disjuncts()
            .into_iter()
            .map(|disjunct| {
                let conjuncts = match disjunct {
                    Formula::And(conjuncts) if conjuncts.len() == 2 => conjuncts,
                    other => {
                        return Err(SynthesisError::MalformedAcceptance(format!(
                            "disjunct is not a two-operand conjunction: {other:?}"
                        )));
                    }
                };
                let mut fin = None;
                let mut inf = None;
                for conjunct in conjuncts {
                    match conjunct {
                        Formula::Var(v) => inf = Some(*v),
                        Formula::Not(operand) => match operand.as_ref() {
                            Formula::Var(v) => fin = Some(*v),
                            other => {
                                return Err(SynthesisError::MalformedAcceptance(format!(
                                    "negation of a non-variable: {other:?}"
                                )));
                            }
                        },
                        other => {
                            return Err(SynthesisError::MalformedAcceptance(format!(
                                "conjunct is neither Fin nor Inf: {other:?}"
                            )));
                        }
                    }
                }
                match (fin, inf) {
                    (Some(fin), Some(inf)) => Ok(RabinPair::new(fin, inf)),
                    _ => Err(SynthesisError::MalformedAcceptance(
                        "disjunct is missing a Fin or an Inf set".to_owned(),
                    )),
                }
            })
            .collect()
    }
}

/// A Rabin pair over local colour indices. A run satisfies the pair if it
/// visits every `fin` colour finitely often and some `inf` colour infinitely
/// often.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RabinPair {
    pub fin: BitSet,
    pub inf: BitSet,
}

impl RabinPair {
    pub fn new(fin: usize, inf: usize) -> Self {
        Self {
            fin: [fin].into_iter().collect(),
            inf: [inf].into_iter().collect(),
        }
    }
}

/// Removes `pair` from `pairs` and adds its Inf colours to every remaining
/// pair's Fin set. A word accepted by the original condition is accepted
/// either by `pair` or by the result, never by both.
pub fn split_on_pair(pairs: &[RabinPair], pair: &RabinPair) -> Vec<RabinPair> {
    pairs
        .iter()
        .filter(|other| *other != pair)
        .map(|other| RabinPair {
            fin: other.fin.union(&pair.inf),
            inf: other.inf.clone(),
        })
        .collect()
}
