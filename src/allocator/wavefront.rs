
use quantifiable_derive::Quantifiable;//the derive macro
use super::{AllocatorCore, MatchingAlgorithm, RequestStorage};

/// Wavefront allocator.
/// The request matrix is padded to a square and swept by diagonals, the diagonal `d` being the cells with `input - output = d` modulo the side.
/// Every free cell with a request is matched as the sweep reaches it. The first diagonal rotates on each allocation.
/// With `skip_diagonals` the sweep begins, instead, at the diagonal holding a request of highest input priority nearest to the rotating one.
#[derive(Quantifiable)]
pub struct Wavefront<S: RequestStorage> {
    core: AllocatorCore<S>,
    skip_diagonals: bool,
    /// The side of the square matrix
    square: usize,
    /// The diagonal with preference
    priority_diagonal: usize,
}

impl<S: RequestStorage> Wavefront<S> {
    pub fn new(inputs: usize, outputs: usize, skip_diagonals: bool) -> Wavefront<S> {
        Wavefront {
            core: AllocatorCore::new(inputs, outputs),
            skip_diagonals,
            square: inputs.max(outputs),
            priority_diagonal: 0,
        }
    }
    fn diagonal(&self, input: usize, output: usize) -> usize {
        (input + self.square - output) % self.square
    }
}

impl<S: RequestStorage> MatchingAlgorithm for Wavefront<S> {
    type Storage = S;
    fn core(&self) -> &AllocatorCore<S> {
        &self.core
    }
    fn core_mut(&mut self) -> &mut AllocatorCore<S> {
        &mut self.core
    }
    fn compute_matching(&mut self) {
        let square = self.square;
        let first_diagonal = if self.skip_diagonals {
            let mut best: Option<(i64, usize)> = None;
            for input in self.core.requests.occupied_inputs() {
                for request in self.core.requests.input_requests(input) {
                    let distance = (self.diagonal(request.input, request.output) + square - self.priority_diagonal) % square;
                    let better = match best {
                        None => true,
                        Some((priority, best_distance)) => request.in_priority > priority || (request.in_priority == priority && distance < best_distance),
                    };
                    if better {
                        best = Some((request.in_priority, distance));
                    }
                }
            }
            match best {
                Some((_, distance)) => (self.priority_diagonal + distance) % square,
                None => self.priority_diagonal,
            }
        } else {
            self.priority_diagonal
        };
        for p in 0..square {
            let diagonal = (first_diagonal + p) % square;
            for output in 0..square {
                let input = (diagonal + output) % square;
                if input < self.core.inputs && output < self.core.outputs
                    && self.core.in_match[input].is_none() && self.core.out_match[output].is_none()
                    && self.core.requests.get(input, output).is_some()
                {
                    self.core.assign(input, output);
                }
            }
        }
        self.priority_diagonal = (first_diagonal + 1) % square;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::allocator::{Allocator, Request, DenseRequests};
    use crate::allocator::tests::check_matching;

    #[test]
    fn sweeps_from_the_priority_diagonal() {
        let mut wavefront = Wavefront::<DenseRequests>::new(2, 2, false);
        for input in 0..2 {
            for output in 0..2 {
                wavefront.add_request(Request::new(input, output, 0, 0, 0)).unwrap();
            }
        }
        wavefront.allocate();
        check_matching(&wavefront);
        // Diagonal 0 is the main diagonal.
        assert_eq!(wavefront.output_assigned(0), Some(0));
        assert_eq!(wavefront.output_assigned(1), Some(1));
        wavefront.allocate();
        assert_eq!(wavefront.output_assigned(0), Some(1));
        assert_eq!(wavefront.output_assigned(1), Some(0));
    }

    #[test]
    fn skipping_starts_at_the_highest_priority() {
        let mut wavefront = Wavefront::<DenseRequests>::new(3, 3, true);
        wavefront.add_request(Request::new(0, 0, 0, 0, 0)).unwrap();
        wavefront.add_request(Request::new(0, 2, 0, 5, 0)).unwrap();
        wavefront.add_request(Request::new(1, 0, 0, 0, 0)).unwrap();
        wavefront.allocate();
        check_matching(&wavefront);
        assert_eq!(wavefront.output_assigned(0), Some(2));
        assert_eq!(wavefront.output_assigned(1), Some(0));
    }
}
