/*!
 * Two ways to keep the pending requests of an allocator. Both behave the same;
 * `DenseRequests` keeps the full inputs×outputs matrix and `SparseRequests` keeps only the occupied entries.
*/

use std::collections::{BTreeMap, BTreeSet};

use quantifiable_derive::Quantifiable;//the derive macro
use crate::quantify::Quantifiable;
use crate::matrix::Matrix;
use crate::error::Error;
use crate::source_location;
use super::Request;

pub trait RequestStorage : Quantifiable {
    fn new(inputs: usize, outputs: usize) -> Self where Self: Sized;
    fn clear(&mut self);
    fn get(&self, input: usize, output: usize) -> Option<&Request>;
    /// Store a request
    /// # Errors
    /// `DuplicateRequest` if there is one for the same pair
    fn insert(&mut self, request: Request) -> Result<(), Error>;
    fn remove(&mut self, input: usize, output: usize) -> Option<Request>;
    /// The requests of an input, by increasing output
    fn input_requests<'a>(&'a self, input: usize) -> Box<dyn Iterator<Item = &'a Request> + 'a>;
    /// The requests for an output, by increasing input
    fn output_requests<'a>(&'a self, output: usize) -> Box<dyn Iterator<Item = &'a Request> + 'a>;
    fn num_input_requests(&self, input: usize) -> usize;
    fn num_output_requests(&self, output: usize) -> usize;
    /// The inputs with some request, in increasing order
    fn occupied_inputs(&self) -> Vec<usize>;
    /// The outputs with some request, in increasing order
    fn occupied_outputs(&self) -> Vec<usize>;
}

/// The whole request matrix with counters per row and column.
#[derive(Clone, Debug, Quantifiable)]
pub struct DenseRequests {
    requests: Matrix<Option<Request>>,
    input_counts: Vec<usize>,
    output_counts: Vec<usize>,
}

impl RequestStorage for DenseRequests {
    fn new(inputs: usize, outputs: usize) -> DenseRequests {
        DenseRequests {
            requests: Matrix::constant(None, inputs, outputs),
            input_counts: vec![0; inputs],
            output_counts: vec![0; outputs],
        }
    }
    fn clear(&mut self) {
        if self.input_counts.iter().any(|&count| count > 0) {
            self.requests.fill(None);
            for count in self.input_counts.iter_mut() {
                *count = 0;
            }
            for count in self.output_counts.iter_mut() {
                *count = 0;
            }
        }
    }
    fn get(&self, input: usize, output: usize) -> Option<&Request> {
        self.requests.get(input, output).as_ref()
    }
    fn insert(&mut self, request: Request) -> Result<(), Error> {
        let entry = self.requests.get_mut(request.input, request.output);
        if entry.is_some() {
            return Err(Error::duplicate_request(source_location!(), request.input, request.output));
        }
        *entry = Some(request);
        self.input_counts[request.input] += 1;
        self.output_counts[request.output] += 1;
        Ok(())
    }
    fn remove(&mut self, input: usize, output: usize) -> Option<Request> {
        let removed = self.requests.get_mut(input, output).take();
        if removed.is_some() {
            self.input_counts[input] -= 1;
            self.output_counts[output] -= 1;
        }
        removed
    }
    fn input_requests<'a>(&'a self, input: usize) -> Box<dyn Iterator<Item = &'a Request> + 'a> {
        Box::new(self.requests.row(input).iter().filter_map(|entry| entry.as_ref()))
    }
    fn output_requests<'a>(&'a self, output: usize) -> Box<dyn Iterator<Item = &'a Request> + 'a> {
        Box::new((0..self.input_counts.len()).filter_map(move |input| self.requests.get(input, output).as_ref()))
    }
    fn num_input_requests(&self, input: usize) -> usize {
        self.input_counts[input]
    }
    fn num_output_requests(&self, output: usize) -> usize {
        self.output_counts[output]
    }
    fn occupied_inputs(&self) -> Vec<usize> {
        (0..self.input_counts.len()).filter(|&input| self.input_counts[input] > 0).collect()
    }
    fn occupied_outputs(&self) -> Vec<usize> {
        (0..self.output_counts.len()).filter(|&output| self.output_counts[output] > 0).collect()
    }
}

/// Only the existing requests, indexed both by input and by output, plus the sets of occupied ports.
#[derive(Clone, Debug, Quantifiable)]
pub struct SparseRequests {
    in_requests: Vec<BTreeMap<usize, Request>>,
    out_requests: Vec<BTreeMap<usize, Request>>,
    in_occupied: BTreeSet<usize>,
    out_occupied: BTreeSet<usize>,
}

impl RequestStorage for SparseRequests {
    fn new(inputs: usize, outputs: usize) -> SparseRequests {
        SparseRequests {
            in_requests: vec![BTreeMap::new(); inputs],
            out_requests: vec![BTreeMap::new(); outputs],
            in_occupied: BTreeSet::new(),
            out_occupied: BTreeSet::new(),
        }
    }
    fn clear(&mut self) {
        for &input in self.in_occupied.iter() {
            self.in_requests[input].clear();
        }
        for &output in self.out_occupied.iter() {
            self.out_requests[output].clear();
        }
        self.in_occupied.clear();
        self.out_occupied.clear();
    }
    fn get(&self, input: usize, output: usize) -> Option<&Request> {
        self.in_requests[input].get(&output)
    }
    fn insert(&mut self, request: Request) -> Result<(), Error> {
        if self.in_requests[request.input].contains_key(&request.output) {
            return Err(Error::duplicate_request(source_location!(), request.input, request.output));
        }
        self.in_requests[request.input].insert(request.output, request);
        self.out_requests[request.output].insert(request.input, request);
        self.in_occupied.insert(request.input);
        self.out_occupied.insert(request.output);
        Ok(())
    }
    fn remove(&mut self, input: usize, output: usize) -> Option<Request> {
        let removed = self.in_requests[input].remove(&output);
        if removed.is_some() {
            self.out_requests[output].remove(&input);
            if self.in_requests[input].is_empty() {
                self.in_occupied.remove(&input);
            }
            if self.out_requests[output].is_empty() {
                self.out_occupied.remove(&output);
            }
        }
        removed
    }
    fn input_requests<'a>(&'a self, input: usize) -> Box<dyn Iterator<Item = &'a Request> + 'a> {
        Box::new(self.in_requests[input].values())
    }
    fn output_requests<'a>(&'a self, output: usize) -> Box<dyn Iterator<Item = &'a Request> + 'a> {
        Box::new(self.out_requests[output].values())
    }
    fn num_input_requests(&self, input: usize) -> usize {
        self.in_requests[input].len()
    }
    fn num_output_requests(&self, output: usize) -> usize {
        self.out_requests[output].len()
    }
    fn occupied_inputs(&self) -> Vec<usize> {
        self.in_occupied.iter().cloned().collect()
    }
    fn occupied_outputs(&self) -> Vec<usize> {
        self.out_occupied.iter().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn exercise<S: RequestStorage>() -> Vec<String> {
        let mut storage = S::new(3, 4);
        let mut log = vec![];
        storage.insert(Request::new(2, 1, 5, 0, 0)).unwrap();
        storage.insert(Request::new(0, 1, 6, 1, 0)).unwrap();
        storage.insert(Request::new(0, 3, 7, 0, 2)).unwrap();
        assert!(storage.insert(Request::new(0, 3, 8, 0, 0)).is_err());
        log.push(format!("{:?}", storage.input_requests(0).map(|r| r.output).collect::<Vec<_>>()));
        log.push(format!("{:?}", storage.output_requests(1).map(|r| r.input).collect::<Vec<_>>()));
        log.push(format!("{:?} {:?}", storage.occupied_inputs(), storage.occupied_outputs()));
        log.push(format!("{:?}", storage.remove(0, 1).map(|r| r.label)));
        log.push(format!("{} {}", storage.num_input_requests(0), storage.num_output_requests(1)));
        log.push(format!("{:?} {:?}", storage.occupied_inputs(), storage.occupied_outputs()));
        storage.clear();
        log.push(format!("{:?} {:?}", storage.occupied_inputs(), storage.get(0, 3)));
        log
    }

    #[test]
    fn dense_and_sparse_behave_the_same() {
        let dense = exercise::<DenseRequests>();
        let sparse = exercise::<SparseRequests>();
        assert_eq!(dense, sparse);
        assert_eq!(dense[0], "[1, 3]");
        assert_eq!(dense[1], "[0, 2]");
        assert_eq!(dense[2], "[0, 2] [1, 3]");
        assert_eq!(dense[3], "Some(6)");
        assert_eq!(dense[4], "1 1");
        assert_eq!(dense[5], "[0, 2] [1, 3]");
        assert_eq!(dense[6], "[] None");
    }
}
