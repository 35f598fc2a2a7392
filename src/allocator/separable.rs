
use quantifiable_derive::Quantifiable;//the derive macro
use crate::arbiter::{Arbiter, new_arbiter};
use crate::error::Error;
use super::{AllocatorCore, MatchingAlgorithm, RequestStorage};

fn build_arbiters(count: usize, size: usize, arbiter: &str) -> Result<Vec<Box<dyn Arbiter>>, Error> {
    (0..count).map(|_| new_arbiter(arbiter, size)).collect()
}

/// Separable allocator, input first.
/// An arbiter per input chooses one of its requests; then an arbiter per output chooses among the inputs that chose it.
/// Only the arbiters of the final matches update their state.
#[derive(Quantifiable)]
pub struct SeparableInputFirst<S: RequestStorage> {
    core: AllocatorCore<S>,
    /// One per input, over the outputs
    input_arbiters: Vec<Box<dyn Arbiter>>,
    /// One per output, over the inputs
    output_arbiters: Vec<Box<dyn Arbiter>>,
}

impl<S: RequestStorage> SeparableInputFirst<S> {
    /// Creates the allocator with arbiters of kind `arbiter`, see [new_arbiter].
    pub fn new(inputs: usize, outputs: usize, arbiter: &str) -> Result<SeparableInputFirst<S>, Error> {
        Ok(SeparableInputFirst {
            core: AllocatorCore::new(inputs, outputs),
            input_arbiters: build_arbiters(inputs, outputs, arbiter)?,
            output_arbiters: build_arbiters(outputs, inputs, arbiter)?,
        })
    }
}

impl<S: RequestStorage> MatchingAlgorithm for SeparableInputFirst<S> {
    type Storage = S;
    fn core(&self) -> &AllocatorCore<S> {
        &self.core
    }
    fn core_mut(&mut self) -> &mut AllocatorCore<S> {
        &mut self.core
    }
    fn compute_matching(&mut self) {
        for input in self.core.requests.occupied_inputs() {
            let arbiter = &mut self.input_arbiters[input];
            for request in self.core.requests.input_requests(input) {
                arbiter.add_request(request.output, request.label, request.in_priority);
            }
            // Propagate the winner to the output arbiters
            if let Some(selection) = arbiter.arbitrate() {
                let output = selection.input;
                let request = self.core.requests.get(input, output).expect("the arbiter chose a missing request");
                self.output_arbiters[output].add_request(input, request.label, request.out_priority);
            }
        }
        for output in self.core.requests.occupied_outputs() {
            if let Some(selection) = self.output_arbiters[output].arbitrate() {
                let input = selection.input;
                self.core.assign(input, output);
                self.input_arbiters[input].update_state();
                self.output_arbiters[output].update_state();
            }
        }
    }
    fn after_clear(&mut self) {
        for arbiter in self.input_arbiters.iter_mut().chain(self.output_arbiters.iter_mut()) {
            arbiter.clear();
        }
    }
}

/// Separable allocator, output first.
/// An arbiter per output chooses one of the inputs requesting it; then an arbiter per input chooses among the outputs that chose it.
#[derive(Quantifiable)]
pub struct SeparableOutputFirst<S: RequestStorage> {
    core: AllocatorCore<S>,
    input_arbiters: Vec<Box<dyn Arbiter>>,
    output_arbiters: Vec<Box<dyn Arbiter>>,
}

impl<S: RequestStorage> SeparableOutputFirst<S> {
    pub fn new(inputs: usize, outputs: usize, arbiter: &str) -> Result<SeparableOutputFirst<S>, Error> {
        Ok(SeparableOutputFirst {
            core: AllocatorCore::new(inputs, outputs),
            input_arbiters: build_arbiters(inputs, outputs, arbiter)?,
            output_arbiters: build_arbiters(outputs, inputs, arbiter)?,
        })
    }
}

impl<S: RequestStorage> MatchingAlgorithm for SeparableOutputFirst<S> {
    type Storage = S;
    fn core(&self) -> &AllocatorCore<S> {
        &self.core
    }
    fn core_mut(&mut self) -> &mut AllocatorCore<S> {
        &mut self.core
    }
    fn compute_matching(&mut self) {
        for output in self.core.requests.occupied_outputs() {
            let arbiter = &mut self.output_arbiters[output];
            for request in self.core.requests.output_requests(output) {
                arbiter.add_request(request.input, request.label, request.out_priority);
            }
            if let Some(selection) = arbiter.arbitrate() {
                let input = selection.input;
                let request = self.core.requests.get(input, output).expect("the arbiter chose a missing request");
                self.input_arbiters[input].add_request(output, request.label, request.in_priority);
            }
        }
        for input in self.core.requests.occupied_inputs() {
            if let Some(selection) = self.input_arbiters[input].arbitrate() {
                let output = selection.input;
                self.core.assign(input, output);
                self.input_arbiters[input].update_state();
                self.output_arbiters[output].update_state();
            }
        }
    }
    fn after_clear(&mut self) {
        for arbiter in self.input_arbiters.iter_mut().chain(self.output_arbiters.iter_mut()) {
            arbiter.clear();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::allocator::{Allocator, Request, SparseRequests, DenseRequests};
    use crate::allocator::tests::check_matching;

    #[test]
    fn only_final_matches_move_the_arbiters() {
        // Every arbiter starts preferring index 0, so both stages collide.
        let requests = [(0, 0), (0, 1), (1, 0), (1, 1)];
        let mut input_first = SeparableInputFirst::<SparseRequests>::new(2, 2, "round_robin").unwrap();
        let mut output_first = SeparableOutputFirst::<DenseRequests>::new(2, 2, "round_robin").unwrap();
        for &(input, output) in requests.iter() {
            input_first.add_request(Request::new(input, output, input, 0, 0)).unwrap();
            output_first.add_request(Request::new(input, output, input, 0, 0)).unwrap();
        }
        input_first.allocate();
        output_first.allocate();
        check_matching(&input_first);
        check_matching(&output_first);
        assert_eq!(input_first.granted_requests().granted_requests.len(), 1);
        assert_eq!(output_first.granted_requests().granted_requests.len(), 1);
        // The winners moved their pointers, so the next allocation is perfect.
        input_first.clear();
        for &(input, output) in requests.iter() {
            input_first.add_request(Request::new(input, output, input, 0, 0)).unwrap();
        }
        input_first.allocate();
        assert_eq!(input_first.granted_requests().granted_requests.len(), 2);
    }
}
