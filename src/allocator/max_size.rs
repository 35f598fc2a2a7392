
use quantifiable_derive::Quantifiable;//the derive macro
use super::{AllocatorCore, MatchingAlgorithm, RequestStorage};

/// Maximum size matching by augmenting paths.
/// Inputs are considered starting from a pointer that advances on each allocation, so equally sized matchings rotate among the inputs.
/// Priorities are not considered.
#[derive(Quantifiable)]
pub struct MaxSize<S: RequestStorage> {
    core: AllocatorCore<S>,
    /// The input considered first
    pointer: usize,
}

impl<S: RequestStorage> MaxSize<S> {
    pub fn new(inputs: usize, outputs: usize) -> MaxSize<S> {
        MaxSize {
            core: AllocatorCore::new(inputs, outputs),
            pointer: 0,
        }
    }
    /// Search an augmenting path from `input`, rematching the outputs along it.
    fn augment(&self, input: usize, visited: &mut Vec<bool>, in_match: &mut Vec<Option<usize>>, out_match: &mut Vec<Option<usize>>) -> bool {
        let outputs: Vec<usize> = self.core.requests.input_requests(input).map(|request| request.output).collect();
        for output in outputs {
            if visited[output] {
                continue;
            }
            visited[output] = true;
            let free = match out_match[output] {
                None => true,
                Some(other) => self.augment(other, visited, in_match, out_match),
            };
            if free {
                in_match[input] = Some(output);
                out_match[output] = Some(input);
                return true;
            }
        }
        false
    }
}

impl<S: RequestStorage> MatchingAlgorithm for MaxSize<S> {
    type Storage = S;
    fn core(&self) -> &AllocatorCore<S> {
        &self.core
    }
    fn core_mut(&mut self) -> &mut AllocatorCore<S> {
        &mut self.core
    }
    fn compute_matching(&mut self) {
        let inputs = self.core.inputs;
        let mut in_match = vec![None; inputs];
        let mut out_match = vec![None; self.core.outputs];
        let mut order = self.core.requests.occupied_inputs();
        let pointer = self.pointer;
        order.sort_by_key(|&input| (input + inputs - pointer) % inputs);
        for input in order {
            let mut visited = vec![false; self.core.outputs];
            self.augment(input, &mut visited, &mut in_match, &mut out_match);
        }
        for (input, output) in in_match.into_iter().enumerate() {
            if let Some(output) = output {
                self.core.assign(input, output);
            }
        }
        self.pointer = (self.pointer + 1) % inputs;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::allocator::{Allocator, Request, DenseRequests, SparseRequests};
    use crate::allocator::tests::check_matching;

    #[test]
    fn finds_augmenting_paths() {
        // Greedy choices of inputs 0 and 1 would leave input 2 without output.
        let mut allocator = MaxSize::<SparseRequests>::new(3, 3);
        for &(input, output) in [(0, 0), (0, 1), (1, 1), (1, 2), (2, 0)].iter() {
            allocator.add_request(Request::new(input, output, 0, 0, 0)).unwrap();
        }
        allocator.allocate();
        check_matching(&allocator);
        assert_eq!(allocator.output_assigned(0), Some(1));
        assert_eq!(allocator.output_assigned(1), Some(2));
        assert_eq!(allocator.output_assigned(2), Some(0));
    }

    #[test]
    fn rotates_among_equal_matchings() {
        let mut allocator = MaxSize::<DenseRequests>::new(3, 1);
        let mut winners = vec![];
        for _ in 0..3 {
            allocator.clear();
            for input in 0..3 {
                allocator.add_request(Request::new(input, 0, input, 0, 0)).unwrap();
            }
            allocator.allocate();
            winners.push(allocator.input_assigned(0).unwrap());
        }
        assert_eq!(winners, vec![0, 1, 2]);
    }
}
