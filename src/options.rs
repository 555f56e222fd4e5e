/// How XOR and XNOR gates combine their inputs.
///
/// The two rules disagree: [`XorFold::Conjunctive`] is the documented
/// fold for these gates, [`XorFold::Parity`] is a deliberate correction
/// of it and the default. Networks that depend on
/// the old results should select `Conjunctive` explicitly.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum XorFold {
    /// True exclusive or: the result is `true` iff an odd number of inputs is `true`.
    ///
    /// Departs from the documented fold, see [`XorFold::Conjunctive`].
    #[default]
    Parity,
    /// Multiplies the inputs into an accumulator that starts at `false`.
    /// This is the documented behaviour of XOR and XNOR gates.
    ///
    /// The accumulator can never become `true`, so XOR gates always
    /// output `false` and XNOR gates always output `true`. Kept for
    /// compatibility with networks built against that behaviour.
    Conjunctive,
}

/// Settings for a [`crate::Graph`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GraphOptions {
    /// Initial (and minimum) capacity of each gate's output link collection.
    pub output_capacity: usize,
    /// Fold rule for XOR and XNOR gates.
    pub xor_fold: XorFold,
}

impl Default for GraphOptions {
    fn default() -> Self {
        Self {
            output_capacity: 1,
            xor_fold: XorFold::default(),
        }
    }
}
