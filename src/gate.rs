use std::fmt;

use crate::{links::LinkVec, GateError, Signal, XorFold};

/// The kind of a gate, which determines how it combines its inputs.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum GateKind {
    And,
    Nand,
    Or,
    Nor,
    Xor,
    Xnor,
}

impl GateKind {
    pub const ALL: [GateKind; 6] = [
        GateKind::And,
        GateKind::Nand,
        GateKind::Or,
        GateKind::Nor,
        GateKind::Xor,
        GateKind::Xnor,
    ];

    /// Returns the accumulator value before any input is folded in.
    pub fn initial(self) -> bool {
        match self {
            GateKind::And | GateKind::Nand => true,
            GateKind::Or | GateKind::Nor | GateKind::Xor | GateKind::Xnor => false,
        }
    }

    /// Folds one input value into the accumulator.
    pub fn fold(self, acc: bool, value: bool, xor_fold: XorFold) -> bool {
        match (self, xor_fold) {
            (GateKind::And | GateKind::Nand, _) => acc & value,
            (GateKind::Or | GateKind::Nor, _) => acc | value,
            (GateKind::Xor | GateKind::Xnor, XorFold::Parity) => acc ^ value,
            (GateKind::Xor | GateKind::Xnor, XorFold::Conjunctive) => acc & value,
        }
    }

    /// Returns true if the folded value is negated to form the output.
    pub fn is_inverting(self) -> bool {
        matches!(self, GateKind::Nand | GateKind::Nor | GateKind::Xnor)
    }

    /// Computes the output of a gate of this kind for the given input values.
    ///
    /// A gate without inputs outputs the (possibly negated) initial value.
    pub fn apply(self, inputs: impl IntoIterator<Item = bool>, xor_fold: XorFold) -> bool {
        let folded = inputs
            .into_iter()
            .fold(self.initial(), |acc, value| self.fold(acc, value, xor_fold));
        folded ^ self.is_inverting()
    }
}

impl fmt::Display for GateKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            GateKind::And => "AND",
            GateKind::Nand => "NAND",
            GateKind::Or => "OR",
            GateKind::Nor => "NOR",
            GateKind::Xor => "XOR",
            GateKind::Xnor => "XNOR",
        };
        write!(f, "{name}")
    }
}

/// A handle to a gate in a [`crate::Graph`].
///
/// Handles stay valid until the gate is removed. A handle to a removed
/// gate is rejected by every operation, even if its storage was reused.
/// Each storage position is reused at most `u32::MAX` times; after that
/// it is retired instead of handing out a handle that could alias an old one.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GateId {
    pub(crate) index: u32,
    pub(crate) generation: u32,
}

impl GateId {
    /// Returns the position of the gate in the graph's storage.
    pub fn index(&self) -> usize {
        self.index as usize
    }
}

impl fmt::Display for GateId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "#{}", self.index)
    }
}

/// What an input slot is connected to.
#[derive(Clone, Debug)]
pub enum Source {
    Signal(Signal),
    Gate(GateId),
}

impl Source {
    pub fn as_gate(&self) -> Option<GateId> {
        match self {
            Source::Gate(id) => Some(*id),
            Source::Signal(_) => None,
        }
    }

    pub fn as_signal(&self) -> Option<&Signal> {
        match self {
            Source::Signal(signal) => Some(signal),
            Source::Gate(_) => None,
        }
    }
}

impl PartialEq for Source {
    /// Signals compare by identity, not by value.
    fn eq(&self, other: &Source) -> bool {
        match (self, other) {
            (Source::Signal(a), Source::Signal(b)) => a.ptr_eq(b),
            (Source::Gate(a), Source::Gate(b)) => a == b,
            _ => false,
        }
    }
}

/// The contents of a bound input slot.
#[derive(Clone, Debug)]
pub(crate) enum Input {
    Signal(Signal),
    /// `link` is the position of the matching [`OutputLink`] in the
    /// producer's output collection.
    Gate { producer: GateId, link: usize },
}

impl Input {
    pub(crate) fn to_source(&self) -> Source {
        match self {
            Input::Signal(signal) => Source::Signal(signal.clone()),
            Input::Gate { producer, .. } => Source::Gate(*producer),
        }
    }
}

/// An entry in a gate's output collection: the output feeds input `slot`
/// of `consumer`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct OutputLink {
    pub(crate) consumer: GateId,
    pub(crate) slot: usize,
}

/// Progress of the current evaluation through a gate.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub(crate) enum Mark {
    #[default]
    Unvisited,
    InProgress,
    Done,
}

#[derive(Debug)]
pub(crate) struct Gate {
    pub(crate) kind: GateKind,
    pub(crate) inputs: LinkVec<Input>,
    pub(crate) outputs: LinkVec<OutputLink>,
    /// Only meaningful during an evaluation.
    pub(crate) mark: Mark,
    pub(crate) value: bool,
    pub(crate) path_len: usize,
}

impl Gate {
    pub(crate) fn new(
        kind: GateKind,
        input_count: usize,
        output_capacity: usize,
    ) -> Result<Self, GateError> {
        Ok(Gate {
            kind,
            inputs: LinkVec::with_capacity(input_count)?,
            outputs: LinkVec::with_capacity(output_capacity)?,
            mark: Mark::Unvisited,
            value: false,
            path_len: 0,
        })
    }

    /// A gate is ready once every input slot is connected.
    pub(crate) fn is_ready(&self) -> bool {
        self.inputs.len() == self.inputs.capacity()
    }
}
