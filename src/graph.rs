use std::collections::HashSet;

use itertools::Itertools;
use tracing::{debug, trace};

use crate::{
    gate::{Gate, Input, OutputLink},
    GateError, GateId, GateKind, GraphOptions, Signal, Source,
};

struct Entry {
    generation: u32,
    gate: Option<Gate>,
}

/// A network of logic gates.
///
/// The graph owns all gates and the links between them. Every input slot
/// that is connected to a gate has exactly one matching entry in that
/// gate's output links, and every output link points back at the slot it
/// feeds. All operations keep both directions in sync.
///
/// Signals connected to inputs are owned by the caller, see [`Signal`].
pub struct Graph {
    entries: Vec<Entry>,
    free: Vec<u32>,
    len: usize,
    pub(crate) options: GraphOptions,
}

impl Default for Graph {
    fn default() -> Self {
        Self::with_options(GraphOptions::default())
    }
}

impl Graph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(options: GraphOptions) -> Self {
        Self {
            entries: Vec::new(),
            free: Vec::new(),
            len: 0,
            options,
        }
    }

    pub fn options(&self) -> &GraphOptions {
        &self.options
    }

    /// Returns the number of gates in the graph.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Returns true if `id` refers to a gate that has not been removed.
    pub fn contains(&self, id: GateId) -> bool {
        self.get(id).is_some()
    }

    /// Iterates over the handles of all gates in the graph.
    pub fn gates(&self) -> impl Iterator<Item = GateId> + '_ {
        self.entries
            .iter()
            .enumerate()
            .filter(|(_, entry)| entry.gate.is_some())
            .map(|(index, entry)| GateId {
                index: index as u32,
                generation: entry.generation,
            })
    }

    /// Creates a gate of the given kind with `input_count` unconnected inputs
    /// and no outputs.
    pub fn add_gate(&mut self, kind: GateKind, input_count: usize) -> Result<GateId, GateError> {
        let gate = Gate::new(kind, input_count, self.options.output_capacity)?;
        let id = match self.free.pop() {
            Some(index) => {
                let entry = &mut self.entries[index as usize];
                entry.gate = Some(gate);
                GateId {
                    index,
                    generation: entry.generation,
                }
            }
            None => {
                let index = u32::try_from(self.entries.len()).map_err(|_| GateError::OutOfMemory)?;
                self.entries.try_reserve(1)?;
                self.entries.push(Entry {
                    generation: 0,
                    gate: Some(gate),
                });
                GateId {
                    index,
                    generation: 0,
                }
            }
        };
        self.len += 1;
        trace!("Added {kind} gate {id} with {input_count} inputs");
        Ok(id)
    }

    /// Removes a gate from the graph.
    ///
    /// Every input that was connected to the gate becomes unconnected and
    /// the gate is removed from the outputs of all gates it was connected to.
    /// Returns false (and does nothing) if `id` does not refer to a gate.
    pub fn remove_gate(&mut self, id: GateId) -> bool {
        let Some(gate) = self.get(id) else {
            return false;
        };
        for slot in 0..gate.inputs.capacity() {
            let previous = self.detach(id, slot);
            self.shrink_outputs(previous);
        }
        let Some(gate) = self.entries[id.index()].gate.take() else {
            return false;
        };
        // Links from the gate to itself went away with its inputs.
        for (_, link) in gate.outputs.iter() {
            if let Some(consumer) = self.get_mut(link.consumer) {
                consumer.inputs.take(link.slot);
            }
        }
        let entry = &mut self.entries[id.index()];
        // An index whose generation is exhausted is never handed out again.
        if let Some(generation) = entry.generation.checked_add(1) {
            entry.generation = generation;
            self.free.push(id.index);
        }
        self.len -= 1;
        debug!(
            "Removed gate {id}, disconnected {} consumer inputs",
            gate.outputs.len()
        );
        true
    }

    /// Connects the output of `producer` to input `slot` of `consumer`,
    /// replacing whatever was connected there before.
    ///
    /// On error, the graph is left unchanged.
    pub fn connect_gate(
        &mut self,
        producer: GateId,
        consumer: GateId,
        slot: usize,
    ) -> Result<(), GateError> {
        self.check_slot(consumer, slot)?;
        self.gate_mut(producer)?.outputs.reserve_one()?;

        let previous = self.detach(consumer, slot);
        let link = self
            .gate_mut(producer)?
            .outputs
            .push(OutputLink { consumer, slot })?;
        self.gate_mut(consumer)?
            .inputs
            .set(slot, Input::Gate { producer, link })?;
        self.shrink_outputs(previous);
        trace!("Connected gate {producer} to input {slot} of gate {consumer}");
        Ok(())
    }

    /// Connects `signal` to input `slot` of `consumer`, replacing whatever was
    /// connected there before.
    ///
    /// The graph keeps a handle to the signal and reads its value on every
    /// evaluation.
    pub fn connect_signal(
        &mut self,
        signal: &Signal,
        consumer: GateId,
        slot: usize,
    ) -> Result<(), GateError> {
        self.check_slot(consumer, slot)?;
        let previous = self.detach(consumer, slot);
        self.gate_mut(consumer)?
            .inputs
            .set(slot, Input::Signal(signal.clone()))?;
        self.shrink_outputs(previous);
        trace!("Connected signal to input {slot} of gate {consumer}");
        Ok(())
    }

    /// Disconnects input `slot` of `consumer` and returns what was connected.
    pub fn disconnect(
        &mut self,
        consumer: GateId,
        slot: usize,
    ) -> Result<Option<Source>, GateError> {
        self.check_slot(consumer, slot)?;
        let previous = self.detach(consumer, slot);
        let source = previous.as_ref().map(Input::to_source);
        self.shrink_outputs(previous);
        Ok(source)
    }

    pub fn kind(&self, id: GateId) -> Result<GateKind, GateError> {
        Ok(self.gate(id)?.kind)
    }

    /// Returns the number of input slots the gate was created with.
    pub fn input_count(&self, id: GateId) -> Result<usize, GateError> {
        Ok(self.gate(id)?.inputs.capacity())
    }

    /// Returns the number of connected inputs.
    pub fn fan_in(&self, id: GateId) -> Result<usize, GateError> {
        Ok(self.gate(id)?.inputs.len())
    }

    /// Returns the number of inputs (of any gates) the output is connected to.
    pub fn fan_out(&self, id: GateId) -> Result<usize, GateError> {
        Ok(self.gate(id)?.outputs.len())
    }

    /// Returns true if all inputs of the gate are connected.
    pub fn is_ready(&self, id: GateId) -> Result<bool, GateError> {
        Ok(self.gate(id)?.is_ready())
    }

    /// Returns what is connected to input `slot`, or `None` if it is unconnected.
    pub fn input(&self, id: GateId, slot: usize) -> Result<Option<Source>, GateError> {
        self.check_slot(id, slot)?;
        Ok(self.gate(id)?.inputs.get(slot).map(Input::to_source))
    }

    /// Returns the gate fed by the `k`-th output link, or `None` if there is
    /// no such link or `id` does not refer to a gate.
    pub fn output(&self, id: GateId, k: usize) -> Option<GateId> {
        Some(self.get(id)?.outputs.get(k)?.consumer)
    }

    /// Iterates over `(consumer, slot)` for all inputs the gate's output feeds.
    pub fn consumers(
        &self,
        id: GateId,
    ) -> Result<impl Iterator<Item = (GateId, usize)> + '_, GateError> {
        Ok(self
            .gate(id)?
            .outputs
            .iter()
            .map(|(_, link)| (link.consumer, link.slot)))
    }

    /// Creates an iterator over the gate itself and all gates it
    /// (transitively) depends on, returning each gate exactly once.
    pub fn upstream(&self, id: GateId) -> Upstream<'_> {
        Upstream {
            graph: self,
            visited: HashSet::new(),
            stack: vec![id],
        }
    }

    /// Renders the gate and its inputs on a single line, e.g. `NAND(#1, true, _)`.
    ///
    /// Signals are shown with their current value, unconnected inputs as `_`.
    pub fn describe(&self, id: GateId) -> Result<String, GateError> {
        let gate = self.gate(id)?;
        let inputs = (0..gate.inputs.capacity()).map(|slot| match gate.inputs.get(slot) {
            None => "_".to_string(),
            Some(Input::Signal(signal)) => signal.get().to_string(),
            Some(Input::Gate { producer, .. }) => producer.to_string(),
        });
        Ok(format!("{}({})", gate.kind, inputs.format(", ")))
    }

    pub(crate) fn gate(&self, id: GateId) -> Result<&Gate, GateError> {
        self.get(id).ok_or_else(|| GateError::unknown_gate(id))
    }

    pub(crate) fn gate_mut(&mut self, id: GateId) -> Result<&mut Gate, GateError> {
        self.get_mut(id).ok_or_else(|| GateError::unknown_gate(id))
    }

    fn get(&self, id: GateId) -> Option<&Gate> {
        let entry = self.entries.get(id.index())?;
        if entry.generation != id.generation {
            return None;
        }
        entry.gate.as_ref()
    }

    fn get_mut(&mut self, id: GateId) -> Option<&mut Gate> {
        let entry = self.entries.get_mut(id.index())?;
        if entry.generation != id.generation {
            return None;
        }
        entry.gate.as_mut()
    }

    fn check_slot(&self, id: GateId, slot: usize) -> Result<(), GateError> {
        let count = self.gate(id)?.inputs.capacity();
        if slot >= count {
            return Err(GateError::slot_out_of_range(id, slot, count));
        }
        Ok(())
    }

    /// Empties input `slot` of `consumer` and, if a gate was connected there,
    /// removes the matching output link from that gate.
    ///
    /// The producer's output collection is not shrunk, see [`Graph::shrink_outputs`].
    fn detach(&mut self, consumer: GateId, slot: usize) -> Option<Input> {
        let input = self.get_mut(consumer)?.inputs.take(slot)?;
        if let Input::Gate { producer, link } = input {
            self.remove_output_link(producer, link);
        }
        Some(input)
    }

    /// Removes the `link`-th output link of `producer` and repoints the input
    /// slot of the link that was moved into its place.
    fn remove_output_link(&mut self, producer: GateId, link: usize) {
        let Some(gate) = self.get_mut(producer) else {
            return;
        };
        gate.outputs.swap_remove(link);
        let Some(moved) = gate.outputs.get(link).copied() else {
            return;
        };
        let moved_input = self
            .get_mut(moved.consumer)
            .and_then(|consumer| consumer.inputs.get_mut(moved.slot));
        if let Some(Input::Gate { link: moved_link, .. }) = moved_input {
            *moved_link = link;
        }
    }

    fn shrink_outputs(&mut self, previous: Option<Input>) {
        if let Some(Input::Gate { producer, .. }) = previous {
            if let Some(gate) = self.get_mut(producer) {
                gate.outputs.shrink();
            }
        }
    }

    /// Checks that every gate input and output link has its counterpart.
    #[cfg(test)]
    pub(crate) fn assert_links_consistent(&self) {
        for id in self.gates() {
            let gate = self.gate(id).unwrap();
            for (slot, input) in gate.inputs.iter() {
                if let Input::Gate { producer, link } = input {
                    let output = self.gate(*producer).unwrap().outputs.get(*link).copied();
                    assert_eq!(
                        output,
                        Some(OutputLink { consumer: id, slot }),
                        "input {slot} of {id}"
                    );
                }
            }
            for (k, output) in gate.outputs.iter() {
                match self.gate(output.consumer).unwrap().inputs.get(output.slot) {
                    Some(Input::Gate { producer, link }) => {
                        assert_eq!((*producer, *link), (id, k), "output {k} of {id}")
                    }
                    other => panic!("output {k} of {id} points at {other:?}"),
                }
            }
        }
    }
}

/// Iterator over a gate and everything upstream of it, see [`Graph::upstream`].
///
/// Terminates on cyclic graphs. Unknown handles are skipped.
pub struct Upstream<'a> {
    graph: &'a Graph,
    visited: HashSet<GateId>,
    stack: Vec<GateId>,
}

impl Iterator for Upstream<'_> {
    type Item = GateId;

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(id) = self.stack.pop() {
            let Some(gate) = self.graph.get(id) else {
                continue;
            };
            if self.visited.insert(id) {
                let producers = gate.inputs.iter().filter_map(|(_, input)| match input {
                    Input::Gate { producer, .. } => Some(*producer),
                    Input::Signal(_) => None,
                });
                self.stack.extend(producers.rev());
                return Some(id);
            }
        }
        None
    }
}
