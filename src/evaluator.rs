use std::cmp::max;

use tracing::{debug, trace};

use crate::{
    gate::{Input, Mark},
    GateError, GateId, Graph,
};

/// The result of evaluating a batch of gates.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Evaluation {
    /// The output value of each gate, in the order the gates were given.
    pub values: Vec<bool>,
    /// The longest chain of gates ending in any of the evaluated gates.
    pub critical_path: usize,
}

impl Graph {
    /// Computes the output values of `gates` from the current values of the
    /// connected signals, together with the critical path length.
    ///
    /// Fails if `gates` is empty or contains an unknown handle, if any gate
    /// that has to be evaluated has an unconnected input, or if one of them
    /// depends on its own output. Either way, the graph can be evaluated again
    /// afterwards.
    pub fn evaluate(&mut self, gates: &[GateId]) -> Result<Evaluation, GateError> {
        let mut values = vec![false; gates.len()];
        let critical_path = self.evaluate_into(gates, &mut values)?;
        Ok(Evaluation {
            values,
            critical_path,
        })
    }

    /// Like [`Graph::evaluate`], but writes the value of `gates[i]` to `values[i]`
    /// and returns the critical path length.
    ///
    /// The contents of `values` are unspecified on error.
    pub fn evaluate_into(
        &mut self,
        gates: &[GateId],
        values: &mut [bool],
    ) -> Result<usize, GateError> {
        if gates.is_empty() {
            return Err(GateError::InvalidArgument("no gates to evaluate".to_string()));
        }
        if gates.len() != values.len() {
            return Err(GateError::InvalidArgument(format!(
                "{} gates but room for {} values",
                gates.len(),
                values.len()
            )));
        }
        if let Some(id) = gates.iter().find(|id| !self.contains(**id)) {
            return Err(GateError::unknown_gate(*id));
        }

        let mut evaluator = Evaluator {
            graph: self,
            stack: vec![],
            touched: vec![],
        };
        let result = evaluator.evaluate_all(gates, values);
        evaluator.reset();
        match &result {
            Ok(critical_path) => {
                debug!("Evaluated {} gates, critical path {critical_path}", gates.len())
            }
            Err(err) => debug!("Evaluation failed: {err}"),
        }
        result
    }
}

struct Evaluator<'a> {
    graph: &'a mut Graph,
    /// Gates still to visit. If the flag is true, all producers of the gate
    /// have been evaluated once we reach it.
    stack: Vec<(GateId, bool)>,
    /// Every gate whose mark was changed.
    touched: Vec<GateId>,
}

impl Evaluator<'_> {
    fn evaluate_all(&mut self, gates: &[GateId], values: &mut [bool]) -> Result<usize, GateError> {
        let mut critical_path = 0;
        for (id, value) in gates.iter().zip(values.iter_mut()) {
            let (result, path_len) = self.evaluate(*id)?;
            *value = result;
            critical_path = max(critical_path, path_len);
        }
        Ok(critical_path)
    }

    /// Evaluates `target` and everything it depends on that has not been
    /// evaluated yet, in post-visit order.
    fn evaluate(&mut self, target: GateId) -> Result<(bool, usize), GateError> {
        self.stack.push((target, false));
        while let Some((id, producers_done)) = self.stack.pop() {
            if producers_done {
                self.finish(id)?;
                continue;
            }
            let gate = self.graph.gate_mut(id)?;
            match gate.mark {
                Mark::Done => {}
                Mark::InProgress => {
                    // Only gates on the current path are in progress.
                    return Err(GateError::CycleDetected { gate: id });
                }
                Mark::Unvisited => {
                    if !gate.is_ready() {
                        return Err(GateError::NotReady { gate: id });
                    }
                    gate.mark = Mark::InProgress;
                    self.touched.push(id);
                    self.stack.push((id, true));
                    let producers = gate.inputs.iter().filter_map(|(_, input)| match input {
                        Input::Gate { producer, .. } => Some((*producer, false)),
                        Input::Signal(_) => None,
                    });
                    self.stack.extend(producers.rev());
                }
            }
        }
        let gate = self.graph.gate(target)?;
        Ok((gate.value, gate.path_len))
    }

    /// Combines the inputs of a gate whose producers are all done.
    fn finish(&mut self, id: GateId) -> Result<(), GateError> {
        let xor_fold = self.graph.options.xor_fold;
        let gate = self.graph.gate(id)?;
        let mut acc = gate.kind.initial();
        let mut path_len = 0;
        for (_, input) in gate.inputs.iter() {
            let value = match input {
                Input::Signal(signal) => signal.get(),
                Input::Gate { producer, .. } => {
                    let producer = self.graph.gate(*producer)?;
                    debug_assert_eq!(producer.mark, Mark::Done);
                    path_len = max(path_len, producer.path_len);
                    producer.value
                }
            };
            acc = gate.kind.fold(acc, value, xor_fold);
        }
        if gate.inputs.capacity() > 0 {
            path_len += 1;
        }
        let value = acc ^ gate.kind.is_inverting();

        let gate = self.graph.gate_mut(id)?;
        gate.value = value;
        gate.path_len = path_len;
        gate.mark = Mark::Done;
        trace!("Gate {id} evaluated to {value}, path length {path_len}");
        Ok(())
    }

    /// Marks every visited gate as unvisited again.
    fn reset(&mut self) {
        self.stack.clear();
        for id in self.touched.drain(..) {
            if let Ok(gate) = self.graph.gate_mut(id) {
                gate.mark = Mark::Unvisited;
            }
        }
    }
}

#[cfg(test)]
mod test {
    use itertools::Itertools;
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::{GateKind, GraphOptions, Signal, Source, XorFold};

    struct Example {
        graph: Graph,
        g0: GateId,
        g1: GateId,
        g2: GateId,
        b0: Signal,
        b1: Signal,
    }

    /// g0 = AND(g1, g2), g1 = NAND(b0, b0), g2 = NAND(b0, b1).
    fn example(options: GraphOptions) -> Example {
        let mut graph = Graph::with_options(options);
        let g0 = graph.add_gate(GateKind::And, 2).unwrap();
        let g1 = graph.add_gate(GateKind::Nand, 2).unwrap();
        let g2 = graph.add_gate(GateKind::Nand, 2).unwrap();
        let b0 = Signal::new(false);
        let b1 = Signal::new(true);
        graph.connect_gate(g1, g0, 0).unwrap();
        graph.connect_gate(g2, g0, 1).unwrap();
        graph.connect_signal(&b0, g1, 0).unwrap();
        graph.connect_signal(&b0, g1, 1).unwrap();
        graph.connect_signal(&b0, g2, 0).unwrap();
        graph.connect_signal(&b1, g2, 1).unwrap();
        Example {
            graph,
            g0,
            g1,
            g2,
            b0,
            b1,
        }
    }

    fn assert_all_unvisited(graph: &Graph) {
        for id in graph.gates() {
            assert_eq!(graph.gate(id).unwrap().mark, Mark::Unvisited, "gate {id}");
        }
    }

    #[test]
    fn scenario() {
        let Example { mut graph, g0, .. } = example(GraphOptions::default());
        let result = graph.evaluate(&[g0]).unwrap();
        assert_eq!(
            result,
            Evaluation {
                values: vec![true],
                critical_path: 2
            }
        );
        assert_all_unvisited(&graph);
    }

    #[test]
    fn scenario_extended() {
        for xor_fold in [XorFold::Parity, XorFold::Conjunctive] {
            let Example {
                mut graph, g0, g1, ..
            } = example(GraphOptions {
                xor_fold,
                ..Default::default()
            });
            let g4 = graph.add_gate(GateKind::Xnor, 2).unwrap();
            graph.connect_gate(g1, g4, 0).unwrap();
            graph.connect_gate(g0, g4, 1).unwrap();
            let mut values = [false];
            assert_eq!(graph.evaluate_into(&[g4], &mut values).unwrap(), 3);
            assert_eq!(values, [true]);
        }
    }

    #[test]
    fn xor_fold_option() {
        let b0 = Signal::new(true);
        let b1 = Signal::new(false);
        let results = [XorFold::Parity, XorFold::Conjunctive]
            .into_iter()
            .map(|xor_fold| {
                let mut graph = Graph::with_options(GraphOptions {
                    xor_fold,
                    ..Default::default()
                });
                let g = graph.add_gate(GateKind::Xor, 2).unwrap();
                graph.connect_signal(&b0, g, 0).unwrap();
                graph.connect_signal(&b1, g, 1).unwrap();
                graph.evaluate(&[g]).unwrap().values[0]
            })
            .collect_vec();
        assert_eq!(results, vec![true, false]);
    }

    #[test]
    fn batch_shares_subgraphs() {
        let Example {
            mut graph,
            g0,
            g1,
            g2,
            ..
        } = example(GraphOptions::default());
        let result = graph.evaluate(&[g1, g0, g2, g0]).unwrap();
        assert_eq!(result.values, vec![true, true, true, true]);
        assert_eq!(result.critical_path, 2);
        let result = graph.evaluate(&[g2]).unwrap();
        assert_eq!(result.critical_path, 1);
    }

    #[test]
    fn repeated_evaluation_is_identical() {
        let Example { mut graph, g0, .. } = example(GraphOptions::default());
        let first = graph.evaluate(&[g0]).unwrap();
        let second = graph.evaluate(&[g0]).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn signals_are_read_on_each_evaluation() {
        let Example {
            mut graph, g0, b0, b1, ..
        } = example(GraphOptions::default());
        b0.set(true);
        // g1 = NAND(true, true) = false, so g0 = false.
        assert_eq!(graph.evaluate(&[g0]).unwrap().values, vec![false]);
        b0.set(false);
        b1.set(false);
        assert_eq!(graph.evaluate(&[g0]).unwrap().values, vec![true]);
    }

    #[test]
    fn unconnected_input_is_not_ready() {
        let mut graph = Graph::new();
        let g = graph.add_gate(GateKind::And, 2).unwrap();
        graph.connect_signal(&Signal::new(true), g, 0).unwrap();
        assert_eq!(
            graph.evaluate(&[g]),
            Err(GateError::NotReady { gate: g })
        );
        assert_eq!(graph.input(g, 1).unwrap(), None);
        assert_eq!(graph.fan_in(g).unwrap(), 1);
        assert_all_unvisited(&graph);
    }

    #[test]
    fn unready_producer_fails_batch() {
        let Example {
            mut graph, g0, g2, ..
        } = example(GraphOptions::default());
        let unready = graph.add_gate(GateKind::Or, 1).unwrap();
        graph.connect_gate(unready, g2, 1).unwrap();
        assert_eq!(
            graph.evaluate(&[g0]),
            Err(GateError::NotReady { gate: unready })
        );
        assert_all_unvisited(&graph);
    }

    #[test]
    fn cycle_is_detected_and_graph_stays_usable() {
        let Example {
            mut graph,
            g0,
            g1,
            b0,
            ..
        } = example(GraphOptions::default());
        // g1 now depends on g0, which depends on g1.
        graph.connect_gate(g0, g1, 1).unwrap();
        let err = graph.evaluate(&[g0]).unwrap_err();
        assert!(matches!(err, GateError::CycleDetected { .. }));
        assert_all_unvisited(&graph);

        graph.connect_signal(&b0, g1, 1).unwrap();
        assert_eq!(graph.evaluate(&[g0]).unwrap().critical_path, 2);
    }

    #[test]
    fn self_loop_is_a_cycle() {
        let mut graph = Graph::new();
        let g = graph.add_gate(GateKind::Nor, 1).unwrap();
        graph.connect_gate(g, g, 0).unwrap();
        assert_eq!(
            graph.evaluate(&[g]),
            Err(GateError::CycleDetected { gate: g })
        );
        assert_all_unvisited(&graph);
    }

    #[test]
    fn failure_in_later_target_resets_earlier_ones() {
        let Example { mut graph, g0, .. } = example(GraphOptions::default());
        let unready = graph.add_gate(GateKind::And, 1).unwrap();
        assert!(graph.evaluate(&[g0, unready]).is_err());
        assert_all_unvisited(&graph);
        assert_eq!(graph.evaluate(&[g0]).unwrap().values, vec![true]);
    }

    #[test]
    fn gate_without_inputs_is_constant() {
        let mut graph = Graph::new();
        let gates = GateKind::ALL
            .iter()
            .map(|kind| graph.add_gate(*kind, 0).unwrap())
            .collect_vec();
        let result = graph.evaluate(&gates).unwrap();
        assert_eq!(result.values, vec![true, false, false, true, false, true]);
        assert_eq!(result.critical_path, 0);
    }

    #[test]
    fn invalid_arguments() {
        let Example { mut graph, g0, .. } = example(GraphOptions::default());
        assert!(matches!(
            graph.evaluate(&[]),
            Err(GateError::InvalidArgument(_))
        ));
        assert!(matches!(
            graph.evaluate_into(&[g0, g0], &mut [false]),
            Err(GateError::InvalidArgument(_))
        ));
        let removed = graph.add_gate(GateKind::And, 0).unwrap();
        graph.remove_gate(removed);
        assert!(matches!(
            graph.evaluate(&[g0, removed]),
            Err(GateError::InvalidArgument(_))
        ));
    }

    #[test]
    fn evaluation_after_removal() {
        let Example {
            mut graph,
            g0,
            g2,
            b1,
            ..
        } = example(GraphOptions::default());
        graph.remove_gate(g2);
        assert_eq!(
            graph.evaluate(&[g0]),
            Err(GateError::NotReady { gate: g0 })
        );
        graph.connect_signal(&b1, g0, 1).unwrap();
        assert_eq!(graph.input(g0, 1).unwrap(), Some(Source::Signal(b1)));
        assert_eq!(
            graph.evaluate(&[g0]).unwrap(),
            Evaluation {
                values: vec![true],
                critical_path: 2
            }
        );
    }

    #[test]
    fn long_chain() {
        let mut graph = Graph::new();
        let signal = Signal::new(false);
        let first = graph.add_gate(GateKind::Nor, 1).unwrap();
        graph.connect_signal(&signal, first, 0).unwrap();
        let last = (1..100_000).fold(first, |previous, _| {
            let gate = graph.add_gate(GateKind::Nand, 1).unwrap();
            graph.connect_gate(previous, gate, 0).unwrap();
            gate
        });
        let result = graph.evaluate(&[last]).unwrap();
        // NOR(false) is true, followed by an odd number of inverters.
        assert_eq!(result.values, vec![false]);
        assert_eq!(result.critical_path, 100_000);
    }
}
