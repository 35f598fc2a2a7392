
use quantifiable_derive::Quantifiable;//the derive macro
use super::{AllocatorCore, MatchingAlgorithm, RequestStorage};

/// Lonely output allocator.
/// Each input requests, among its outputs, the one with fewest requesting inputs (the loneliest), and each output grants one input in round-robin order.
#[derive(Quantifiable)]
pub struct Loa<S: RequestStorage> {
    core: AllocatorCore<S>,
    /// Per input, where to start looking for the lonely output
    request_pointers: Vec<usize>,
    /// Per output, the input with preference
    grant_pointers: Vec<usize>,
}

impl<S: RequestStorage> Loa<S> {
    pub fn new(inputs: usize, outputs: usize) -> Loa<S> {
        Loa {
            core: AllocatorCore::new(inputs, outputs),
            request_pointers: vec![0; inputs],
            grant_pointers: vec![0; outputs],
        }
    }
}

impl<S: RequestStorage> MatchingAlgorithm for Loa<S> {
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
        // Request phase
        let mut chosen = vec![None; inputs];
        for input in self.core.requests.occupied_inputs() {
            let offset = self.request_pointers[input];
            let requests = &self.core.requests;
            // fewest requests first, then round-robin from the pointer
            let lonely = requests.input_requests(input)
                .map(|request| request.output)
                .min_by_key(|&output| (requests.num_output_requests(output), (output + outputs - offset) % outputs));
            if let Some(output) = lonely {
                chosen[input] = Some(output);
                self.request_pointers[input] = (output + 1) % outputs;
            }
        }
        // Grant phase
        for output in self.core.requests.occupied_outputs() {
            let offset = self.grant_pointers[output];
            let granted = (0..inputs)
                .filter(|&input| chosen[input] == Some(output))
                .min_by_key(|&input| (input + inputs - offset) % inputs);
            if let Some(input) = granted {
                self.core.assign(input, output);
                self.grant_pointers[output] = (input + 1) % inputs;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::allocator::{Allocator, Request, DenseRequests};

    #[test]
    fn inputs_prefer_lonely_outputs() {
        let mut loa = Loa::<DenseRequests>::new(3, 2);
        // Output 0 is wanted by everybody; output 1 only by input 1.
        loa.add_request(Request::new(0, 0, 0, 0, 0)).unwrap();
        loa.add_request(Request::new(1, 0, 0, 0, 0)).unwrap();
        loa.add_request(Request::new(1, 1, 0, 0, 0)).unwrap();
        loa.add_request(Request::new(2, 0, 0, 0, 0)).unwrap();
        loa.allocate();
        assert_eq!(loa.output_assigned(1), Some(1));
        assert_eq!(loa.output_assigned(0), Some(0));
        assert_eq!(loa.output_assigned(2), None);
    }
}
