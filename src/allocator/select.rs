
use quantifiable_derive::Quantifiable;//the derive macro
use super::{AllocatorCore, MatchingAlgorithm, RequestStorage, Request, round_robin_order, best_by_priority};

/// Priority aware iterative allocator.
/// Before each iteration every free input reduces its requests to those of highest input priority among the free outputs.
/// Then, like iSLIP, outputs grant and inputs accept, but choosing by priority and using the round-robin pointers only to break ties.
#[derive(Quantifiable)]
pub struct SelectAllocator<S: RequestStorage> {
    core: AllocatorCore<S>,
    iterations: usize,
    grant_pointers: Vec<usize>,
    accept_pointers: Vec<usize>,
}

impl<S: RequestStorage> SelectAllocator<S> {
    pub fn new(inputs: usize, outputs: usize, iterations: usize) -> SelectAllocator<S> {
        SelectAllocator {
            core: AllocatorCore::new(inputs, outputs),
            iterations,
            grant_pointers: vec![0; outputs],
            accept_pointers: vec![0; inputs],
        }
    }
    /// The requests of `input` to free outputs with the highest input priority
    fn selected_requests(&self, input: usize) -> Vec<Request> {
        let free: Vec<Request> = self.core.requests.input_requests(input)
            .filter(|request| self.core.out_match[request.output].is_none())
            .cloned().collect();
        match free.iter().map(|request| request.in_priority).max() {
            Some(top) => free.into_iter().filter(|request| request.in_priority == top).collect(),
            None => free,
        }
    }
}

impl<S: RequestStorage> MatchingAlgorithm for SelectAllocator<S> {
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
            // Request reduction, gathered by output
            let mut reduced: Vec<Vec<Request>> = vec![vec![]; outputs];
            for input in self.core.requests.occupied_inputs() {
                if self.core.in_match[input].is_some() {
                    continue;
                }
                for request in self.selected_requests(input) {
                    reduced[request.output].push(request);
                }
            }
            // Grant phase
            let mut grants: Vec<Vec<Request>> = vec![vec![]; inputs];
            for (output, requests) in reduced.into_iter().enumerate() {
                let ordered = round_robin_order(requests, |r| r.input, self.grant_pointers[output], inputs);
                if let Some(request) = best_by_priority(ordered, |r| r.out_priority) {
                    grants[request.input].push(request);
                }
            }
            // Accept phase
            let mut matched_any = false;
            for (input, granted) in grants.into_iter().enumerate() {
                let ordered = round_robin_order(granted, |r| r.output, self.accept_pointers[input], outputs);
                if let Some(request) = best_by_priority(ordered, |r| r.in_priority) {
                    self.core.assign(input, request.output);
                    matched_any = true;
                    if iteration == 0 {
                        self.grant_pointers[request.output] = (input + 1) % inputs;
                        self.accept_pointers[input] = (request.output + 1) % outputs;
                    }
                }
            }
            if !matched_any {
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::allocator::{Allocator, SparseRequests};
    use crate::allocator::tests::check_matching;

    #[test]
    fn inputs_only_compete_with_their_best_requests() {
        let mut select = SelectAllocator::<SparseRequests>::new(2, 2, 1);
        // Input 0 prefers output 1; input 1 can only use output 0.
        select.add_request(Request::new(0, 0, 0, 1, 0)).unwrap();
        select.add_request(Request::new(0, 1, 0, 3, 0)).unwrap();
        select.add_request(Request::new(1, 0, 1, 0, 0)).unwrap();
        select.allocate();
        check_matching(&select);
        assert_eq!(select.output_assigned(0), Some(1));
        assert_eq!(select.output_assigned(1), Some(0));
    }

    #[test]
    fn output_priority_decides_grants() {
        let mut select = SelectAllocator::<SparseRequests>::new(3, 1, 1);
        select.add_request(Request::new(0, 0, 0, 0, 1)).unwrap();
        select.add_request(Request::new(2, 0, 2, 0, 4)).unwrap();
        select.allocate();
        assert_eq!(select.input_assigned(0), Some(2));
    }
}
