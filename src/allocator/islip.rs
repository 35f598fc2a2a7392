
use quantifiable_derive::Quantifiable;//the derive macro
use super::{AllocatorCore, MatchingAlgorithm, RequestStorage};

/// An iSLIP allocator, more info 'https://doi.org/10.1109/90.769767'
/// Priorities are ignored; outputs grant and inputs accept in round-robin order.
/// The pointers only move for matches accepted in the first iteration.
#[derive(Quantifiable)]
pub struct Islip<S: RequestStorage> {
    core: AllocatorCore<S>,
    /// The number of iterations to perform
    iterations: usize,
    /// Grant pointer of each output, over the inputs
    grant_pointers: Vec<usize>,
    /// Accept pointer of each input, over the outputs
    accept_pointers: Vec<usize>,
}

impl<S: RequestStorage> Islip<S> {
    /// Creates a new iSLIP allocator
    /// # Arguments
    /// * `inputs` - The number of inputs
    /// * `outputs` - The number of outputs
    /// * `iterations` - The number of grant/accept iterations per allocation
    pub fn new(inputs: usize, outputs: usize, iterations: usize) -> Islip<S> {
        Islip {
            core: AllocatorCore::new(inputs, outputs),
            iterations,
            grant_pointers: vec![0; outputs],
            accept_pointers: vec![0; inputs],
        }
    }
}

impl<S: RequestStorage> MatchingAlgorithm for Islip<S> {
    type Storage = S;
    fn core(&self) -> &AllocatorCore<S> {
        &self.core
    }
    fn core_mut(&mut self) -> &mut AllocatorCore<S> {
        &mut self.core
    }
    fn compute_matching(&mut self) {
        let inputs = self.core.inputs;
        let outputs = self.core.outputs;
        for iteration in 0..self.iterations {
            // Grant phase
            // (Indexed by the output)
            let mut grants = vec![None; outputs];
            for output in self.core.requests.occupied_outputs() {
                // skip if the output is already matched
                if self.core.out_match[output].is_some() {
                    continue;
                }
                let offset = self.grant_pointers[output];
                // the first free input at or after the pointer
                grants[output] = self.core.requests.output_requests(output)
                    .map(|request| request.input)
                    .filter(|&input| self.core.in_match[input].is_none())
                    .min_by_key(|&input| (input + inputs - offset) % inputs);
            }
            // Accept phase
            for input in self.core.requests.occupied_inputs() {
                if self.core.in_match[input].is_some() {
                    continue;
                }
                let offset = self.accept_pointers[input];
                let accepted = self.core.requests.input_requests(input)
                    .map(|request| request.output)
                    .filter(|&output| grants[output] == Some(input))
                    .min_by_key(|&output| (output + outputs - offset) % outputs);
                if let Some(output) = accepted {
                    self.core.assign(input, output);
                    // Only update pointers if accepted during the 1st iteration
                    if iteration == 0 {
                        self.grant_pointers[output] = (input + 1) % inputs;
                        self.accept_pointers[input] = (output + 1) % outputs;
                    }
                }
            }
        }
    }
}
