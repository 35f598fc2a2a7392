
use quantifiable_derive::Quantifiable;//the derive macro
use super::{AllocatorCore, MatchingAlgorithm, RequestStorage, Request, round_robin_order, best_by_priority};

/// Parallel iterative matching, more info 'https://doi.org/10.1145/161541.161736'
/// Each iteration every unmatched input proposes to one free output and each output grants one proposal.
/// Choices take the highest priority, breaking ties with round-robin pointers that move on every match.
#[derive(Quantifiable)]
pub struct Pim<S: RequestStorage> {
    core: AllocatorCore<S>,
    /// The number of iterations to perform
    iterations: usize,
    /// For each input, the output with preference among equal priorities
    input_pointers: Vec<usize>,
    /// For each output, the input with preference among equal priorities
    output_pointers: Vec<usize>,
}

impl<S: RequestStorage> Pim<S> {
    pub fn new(inputs: usize, outputs: usize, iterations: usize) -> Pim<S> {
        Pim {
            core: AllocatorCore::new(inputs, outputs),
            iterations,
            input_pointers: vec![0; inputs],
            output_pointers: vec![0; outputs],
        }
    }
}

impl<S: RequestStorage> MatchingAlgorithm for Pim<S> {
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
        for _iteration in 0..self.iterations {
            // Proposal phase, indexed by output
            let mut proposals: Vec<Vec<Request>> = vec![vec![]; outputs];
            for input in self.core.requests.occupied_inputs() {
                if self.core.in_match[input].is_some() {
                    continue;
                }
                let free: Vec<Request> = self.core.requests.input_requests(input)
                    .filter(|request| self.core.out_match[request.output].is_none())
                    .cloned().collect();
                let ordered = round_robin_order(free, |r| r.output, self.input_pointers[input], outputs);
                if let Some(request) = best_by_priority(ordered, |r| r.in_priority) {
                    proposals[request.output].push(request);
                }
            }
            // Grant phase
            let mut matched_any = false;
            for (output, proposed) in proposals.into_iter().enumerate() {
                let ordered = round_robin_order(proposed, |r| r.input, self.output_pointers[output], inputs);
                if let Some(request) = best_by_priority(ordered, |r| r.out_priority) {
                    self.core.assign(request.input, output);
                    self.input_pointers[request.input] = (output + 1) % outputs;
                    self.output_pointers[output] = (request.input + 1) % inputs;
                    matched_any = true;
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
    use crate::allocator::{Allocator, DenseRequests, SparseRequests};
    use crate::allocator::tests::check_matching;

    fn three_by_three<S: RequestStorage>() -> Vec<Option<usize>> {
        let mut pim = Pim::<S>::new(3, 3, 3);
        for &(input, output) in [(0, 0), (0, 1), (1, 0), (2, 0), (2, 2)].iter() {
            pim.add_request(Request::new(input, output, 0, 0, 0)).unwrap();
        }
        pim.allocate();
        check_matching(&pim);
        (0..3).map(|input| pim.output_assigned(input)).collect()
    }

    #[test]
    fn iterations_fill_the_matching() {
        // Everybody proposes to output 0 first; the later iterations match the rest.
        let dense = three_by_three::<DenseRequests>();
        assert_eq!(dense, vec![Some(0), None, Some(2)]);
        assert_eq!(three_by_three::<SparseRequests>(), dense);
    }

    #[test]
    fn higher_priority_proposal_wins() {
        let mut pim = Pim::<DenseRequests>::new(2, 1, 1);
        pim.add_request(Request::new(0, 0, 0, 0, 0)).unwrap();
        pim.add_request(Request::new(1, 0, 0, 0, 9)).unwrap();
        pim.allocate();
        assert_eq!(pim.input_assigned(0), Some(1));
    }
}
