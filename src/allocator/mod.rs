/*!
 * An Allocator computes a matching between the inputs and outputs of a bipartite request graph,
 * such as the virtual channels of a router competing for output virtual channels, or the input ports competing for the crossbar.
 *
 * Usage per cycle: `clear`, several `add_request`, `allocate`, and then query the matching with `output_assigned` and `input_assigned`.
 * The matching is valid until the next `clear`; no input nor output appears twice in it.
 *
 * see [`new_allocator`](fn.new_allocator.html) for the names of the predefined allocators.
*/

pub mod storage;
pub mod pim;
pub mod islip;
pub mod loa;
pub mod wavefront;
pub mod select;
pub mod separable;
pub mod max_size;

use quantifiable_derive::Quantifiable;//the derive macro
use crate::quantify::Quantifiable;
use crate::Plugs;
use crate::config::parse_name_and_parameters;
use crate::error::Error;
use crate::source_location;

pub use self::storage::{RequestStorage,DenseRequests,SparseRequests};
pub use self::pim::Pim;
pub use self::islip::Islip;
pub use self::loa::Loa;
pub use self::wavefront::Wavefront;
pub use self::select::SelectAllocator;
pub use self::separable::{SeparableInputFirst,SeparableOutputFirst};
pub use self::max_size::MaxSize;

/// An input (e.g., a virtual channel of an input port) wants an output (e.g., an output virtual channel).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Quantifiable)]
pub struct Request {
    /// The input of the bipartite graph
    pub input: usize,
    /// The output of the bipartite graph
    pub output: usize,
    /// A value returned with the grant, such as the virtual channel making the request
    pub label: usize,
    /// Priority used when selecting among the outputs requested by an input
    pub in_priority: i64,
    /// Priority used when selecting among the inputs requesting an output
    pub out_priority: i64,
}

impl Request {
    pub fn new(input: usize, output: usize, label: usize, in_priority: i64, out_priority: i64) -> Request {
        Request { input, output, label, in_priority, out_priority }
    }
}

/// A collection of granted requests (i.e. the requests that have been granted)
#[derive(Clone, Debug, Default)]
pub struct GrantedRequests {
    pub granted_requests: Vec<Request>,
}

pub trait Allocator : Quantifiable {
    /// Get number of inputs
    fn num_inputs(&self) -> usize;
    /// Get number of outputs
    fn num_outputs(&self) -> usize;
    /// Remove every request and the current matching
    fn clear(&mut self);
    /// Add a request
    /// # Errors
    /// `DuplicateRequest` if there is already a request for the same input and output
    fn add_request(&mut self, request: Request) -> Result<(), Error>;
    /// Remove the request between `input` and `output`, if any
    fn remove_request(&mut self, input: usize, output: usize);
    /// The request between `input` and `output`, if any
    fn read_request(&self, input: usize, output: usize) -> Option<Request>;
    /// Compute the matching for the current requests
    fn allocate(&mut self);
    /// The output matched to `input`
    fn output_assigned(&self, input: usize) -> Option<usize>;
    /// The input matched to `output`
    fn input_assigned(&self, output: usize) -> Option<usize>;
    fn input_has_requests(&self, input: usize) -> bool;
    fn output_has_requests(&self, output: usize) -> bool;
    fn num_input_requests(&self, input: usize) -> usize;
    fn num_output_requests(&self, output: usize) -> usize;
    /// The requests in the current matching, by increasing input
    fn granted_requests(&self) -> GrantedRequests {
        let granted_requests = (0..self.num_inputs())
            .filter_map(|input| self.output_assigned(input).and_then(|output| self.read_request(input, output)))
            .collect();
        GrantedRequests { granted_requests }
    }
}

/// The state common to every allocator: the requests and the matching.
#[derive(Clone, Debug, Quantifiable)]
pub struct AllocatorCore<S: RequestStorage> {
    pub inputs: usize,
    pub outputs: usize,
    pub requests: S,
    /// `in_match[input]` is the output matched to `input`
    pub in_match: Vec<Option<usize>>,
    /// `out_match[output]` is the input matched to `output`
    pub out_match: Vec<Option<usize>>,
    /// Whether there are requests since the last clear
    pub dirty: bool,
}

impl<S: RequestStorage> AllocatorCore<S> {
    pub fn new(inputs: usize, outputs: usize) -> AllocatorCore<S> {
        AllocatorCore {
            inputs,
            outputs,
            requests: S::new(inputs, outputs),
            in_match: vec![None; inputs],
            out_match: vec![None; outputs],
            dirty: false,
        }
    }
    /// Record the pair in the matching
    pub fn assign(&mut self, input: usize, output: usize) {
        debug_assert!(self.in_match[input].is_none() && self.out_match[output].is_none());
        self.in_match[input] = Some(output);
        self.out_match[output] = Some(input);
    }
    pub fn clear_matching(&mut self) {
        for m in self.in_match.iter_mut() {
            *m = None;
        }
        for m in self.out_match.iter_mut() {
            *m = None;
        }
    }
}

/// The part that changes between allocators. Every `MatchingAlgorithm` is an `Allocator`.
pub trait MatchingAlgorithm : Quantifiable {
    type Storage: RequestStorage;
    fn core(&self) -> &AllocatorCore<Self::Storage>;
    fn core_mut(&mut self) -> &mut AllocatorCore<Self::Storage>;
    /// Fill the matching of the core, which is empty when called
    fn compute_matching(&mut self);
    /// Called after the requests have been removed
    fn after_clear(&mut self) {}
}

impl<M: MatchingAlgorithm> Allocator for M {
    fn num_inputs(&self) -> usize {
        self.core().inputs
    }
    fn num_outputs(&self) -> usize {
        self.core().outputs
    }
    fn clear(&mut self) {
        let core = self.core_mut();
        core.requests.clear();
        core.clear_matching();
        core.dirty = false;
        self.after_clear();
    }
    fn add_request(&mut self, request: Request) -> Result<(), Error> {
        let core = self.core_mut();
        assert!(request.input < core.inputs && request.output < core.outputs, "request {:?} out of range", request);
        core.requests.insert(request)?;
        core.dirty = true;
        Ok(())
    }
    fn remove_request(&mut self, input: usize, output: usize) {
        self.core_mut().requests.remove(input, output);
    }
    fn read_request(&self, input: usize, output: usize) -> Option<Request> {
        self.core().requests.get(input, output).cloned()
    }
    fn allocate(&mut self) {
        self.core_mut().clear_matching();
        if self.core().dirty {
            self.compute_matching();
        }
    }
    fn output_assigned(&self, input: usize) -> Option<usize> {
        self.core().in_match[input]
    }
    fn input_assigned(&self, output: usize) -> Option<usize> {
        self.core().out_match[output]
    }
    fn input_has_requests(&self, input: usize) -> bool {
        self.core().requests.num_input_requests(input) > 0
    }
    fn output_has_requests(&self, output: usize) -> bool {
        self.core().requests.num_output_requests(output) > 0
    }
    fn num_input_requests(&self, input: usize) -> usize {
        self.core().requests.num_input_requests(input)
    }
    fn num_output_requests(&self, output: usize) -> usize {
        self.core().requests.num_output_requests(output)
    }
}

/// Order `list` as seen by a round-robin pointer at `offset` over `size` ports.
/// `port` gives the port of each element.
pub fn round_robin_order<T, F: Fn(&T) -> usize>(mut list: Vec<T>, port: F, offset: usize, size: usize) -> Vec<T> {
    list.sort_by_key(|element| (port(element) + size - offset) % size);
    list
}

/// Among `candidates`, already in round-robin order, the first with the highest priority
pub fn best_by_priority<T, F: Fn(&T) -> i64>(candidates: Vec<T>, priority: F) -> Option<T> {
    let mut best: Option<T> = None;
    for candidate in candidates {
        let better = match best {
            None => true,
            Some(ref current) => priority(&candidate) > priority(current),
        };
        if better {
            best = Some(candidate);
        }
    }
    best
}

pub struct AllocatorBuilderArgument<'a>
{
    /// The name of the allocator with optional parameters, as in `islip(2)`
    pub name : &'a str,
    /// The number of inputs of the allocator
    pub num_inputs : usize,
    /// The number of outputs of the allocator
    pub num_outputs : usize,
    /// Iterations for the iterative allocators not giving them in the name
    pub iterations : Option<usize>,
    /// Arbiter for the separable allocators not giving it in the name
    pub arbiter : &'a str,
    /// A reference to the Plugs object
    pub plugs : &'a Plugs,
}

fn iterations_parameter(arg: &AllocatorBuilderArgument, parameters: &[&str]) -> Result<usize, Error> {
    match parameters.get(0) {
        Some(text) => text.parse::<usize>().map_err(|_| Error::unknown_allocator(source_location!(), arg.name.to_string()).with_message(format!("bad iteration count {}", text))),
        None => match arg.iterations {
            Some(iterations) => Ok(iterations),
            None => {
                log::warn!("the number of iterations of the allocator {} is not specified, the default value (1) will be used", arg.name);
                Ok(1)
            }
        },
    }
}

/**
Build an allocator from its name. The names admit a parenthesized parameter.

* `max_size`: a maximum size matching.
* `pim(iters)`: parallel iterative matching with round-robin proposals and grants.
* `islip(iters)`: iSLIP, with pointers moving only on the first iteration.
* `loa`: lonely output allocator; inputs request the output with fewest requests.
* `wavefront` and `rr_wavefront`: sweep the diagonals of the request matrix; the second starts on a diagonal with a highest priority request.
* `select(iters)`: priority aware iterative allocator.
* `separable_input_first(arbiter)` and `separable_output_first(arbiter)`: a stage of arbiters per input and another per output; the arbiter name is as in [new_arbiter](crate::arbiter::new_arbiter).

Missing iterations default to `arg.iterations` or 1. Missing arbiter defaults to `arg.arbiter`.
**/
pub fn new_allocator(arg: AllocatorBuilderArgument) -> Result<Box<dyn Allocator>, Error>
{
    let plugs = arg.plugs;
    if let Some(builder) = plugs.allocators.get(arg.name) {
        return builder(arg);
    }
    let (name, parameters) = parse_name_and_parameters(arg.name);
    let inputs = arg.num_inputs;
    let outputs = arg.num_outputs;
    match name {
        "max_size" => Ok(Box::new(MaxSize::<DenseRequests>::new(inputs, outputs))),
        "pim" => Ok(Box::new(Pim::<DenseRequests>::new(inputs, outputs, iterations_parameter(&arg, &parameters)?))),
        "islip" => Ok(Box::new(Islip::<SparseRequests>::new(inputs, outputs, iterations_parameter(&arg, &parameters)?))),
        "loa" => Ok(Box::new(Loa::<DenseRequests>::new(inputs, outputs))),
        "wavefront" => Ok(Box::new(Wavefront::<DenseRequests>::new(inputs, outputs, false))),
        "rr_wavefront" => Ok(Box::new(Wavefront::<DenseRequests>::new(inputs, outputs, true))),
        "select" => Ok(Box::new(SelectAllocator::<SparseRequests>::new(inputs, outputs, iterations_parameter(&arg, &parameters)?))),
        "separable_input_first" => {
            let arbiter = parameters.get(0).cloned().unwrap_or(arg.arbiter);
            Ok(Box::new(SeparableInputFirst::<SparseRequests>::new(inputs, outputs, arbiter)?))
        }
        "separable_output_first" => {
            let arbiter = parameters.get(0).cloned().unwrap_or(arg.arbiter);
            Ok(Box::new(SeparableOutputFirst::<SparseRequests>::new(inputs, outputs, arbiter)?))
        }
        _ => Err(Error::unknown_allocator(source_location!(), arg.name.to_string())),
    }
}

#[cfg(test)]
pub mod tests {
    use super::*;
    use crate::error::ErrorKind;

    pub fn build(name: &str, inputs: usize, outputs: usize) -> Box<dyn Allocator> {
        let plugs = Plugs::default();
        new_allocator(AllocatorBuilderArgument {
            name,
            num_inputs: inputs,
            num_outputs: outputs,
            iterations: Some(2),
            arbiter: "round_robin",
            plugs: &plugs,
        }).unwrap()
    }

    pub const ALL_NAMES: [&str; 11] = ["max_size", "pim", "pim(3)", "islip", "islip(2)", "loa", "wavefront", "rr_wavefront", "select(2)", "separable_input_first(matrix)", "separable_output_first"];

    /// Check that no input nor output appears twice and that every match has a request.
    pub fn check_matching(allocator: &dyn Allocator) {
        let mut used_outputs = vec![false; allocator.num_outputs()];
        for input in 0..allocator.num_inputs() {
            if let Some(output) = allocator.output_assigned(input) {
                assert!(!used_outputs[output], "output {} matched twice", output);
                used_outputs[output] = true;
                assert_eq!(allocator.input_assigned(output), Some(input));
                assert!(allocator.read_request(input, output).is_some(), "matched {}->{} without request", input, output);
            }
        }
        for output in 0..allocator.num_outputs() {
            if let Some(input) = allocator.input_assigned(output) {
                assert_eq!(allocator.output_assigned(input), Some(output));
            }
        }
    }

    #[test]
    fn every_allocator_gives_injective_matchings() {
        for name in ALL_NAMES.iter() {
            let mut allocator = build(name, 5, 4);
            for round in 0..20usize {
                allocator.clear();
                for input in 0..5 {
                    for output in 0..4 {
                        if (input * 7 + output * 3 + round) % 3 != 0 {
                            let priority = ((input + round) % 2) as i64;
                            allocator.add_request(Request::new(input, output, input, priority, priority)).unwrap();
                        }
                    }
                }
                allocator.allocate();
                check_matching(allocator.as_ref());
                assert!(allocator.granted_requests().granted_requests.len() > 0, "{} matched nothing", name);
            }
        }
    }

    #[test]
    fn full_requests_give_perfect_matchings_with_max_size() {
        let mut allocator = build("max_size", 3, 3);
        // Greedy would match 0->0 and leave 1 unmatched.
        allocator.add_request(Request::new(0, 0, 0, 0, 0)).unwrap();
        allocator.add_request(Request::new(0, 1, 0, 0, 0)).unwrap();
        allocator.add_request(Request::new(1, 0, 1, 0, 0)).unwrap();
        allocator.add_request(Request::new(2, 2, 2, 0, 0)).unwrap();
        allocator.allocate();
        check_matching(allocator.as_ref());
        assert_eq!(allocator.granted_requests().granted_requests.len(), 3);
    }

    #[test]
    fn duplicate_requests_are_rejected() {
        let mut allocator = build("islip", 2, 2);
        allocator.add_request(Request::new(0, 1, 0, 0, 0)).unwrap();
        match allocator.add_request(Request::new(0, 1, 3, 0, 0)) {
            Err(Error { kind: ErrorKind::DuplicateRequest { input: 0, output: 1 }, .. }) => (),
            _ => panic!("a duplicate request was accepted"),
        }
        allocator.remove_request(0, 1);
        assert!(!allocator.input_has_requests(0));
        allocator.add_request(Request::new(0, 1, 3, 0, 0)).unwrap();
        assert_eq!(allocator.read_request(0, 1).map(|r| r.label), Some(3));
    }

    #[test]
    fn unknown_names_are_errors() {
        let plugs = Plugs::default();
        let result = new_allocator(AllocatorBuilderArgument {
            name: "random_matching",
            num_inputs: 2,
            num_outputs: 2,
            iterations: None,
            arbiter: "round_robin",
            plugs: &plugs,
        });
        match result {
            Err(Error { kind: ErrorKind::UnknownAllocator { .. }, .. }) => (),
            _ => panic!("random_matching should not be an allocator"),
        }
        let result = new_allocator(AllocatorBuilderArgument {
            name: "separable_input_first(lottery)",
            num_inputs: 2,
            num_outputs: 2,
            iterations: None,
            arbiter: "round_robin",
            plugs: &plugs,
        });
        assert!(result.is_err());
    }

    #[test]
    fn round_robin_allocators_alternate_a_contended_output() {
        // Two inputs keep requesting a single output with equal priority.
        for name in ["islip", "pim", "select(1)", "separable_input_first(round_robin)", "separable_output_first(round_robin)", "loa", "wavefront", "rr_wavefront", "max_size"].iter() {
            let mut allocator = build(name, 2, 1);
            let mut wins = [0usize; 2];
            for _cycle in 0..10 {
                allocator.clear();
                allocator.add_request(Request::new(0, 0, 0, 0, 0)).unwrap();
                allocator.add_request(Request::new(1, 0, 1, 0, 0)).unwrap();
                allocator.allocate();
                let winner = allocator.input_assigned(0).expect("the output was not granted");
                wins[winner] += 1;
            }
            assert!(wins[0] >= 4 && wins[1] >= 4, "{} gave {:?}", name, wins);
        }
    }

    #[test]
    fn requests_counts() {
        let mut allocator = build("pim", 3, 3);
        allocator.add_request(Request::new(0, 1, 0, 0, 0)).unwrap();
        allocator.add_request(Request::new(2, 1, 0, 0, 0)).unwrap();
        assert_eq!(allocator.num_output_requests(1), 2);
        assert_eq!(allocator.num_input_requests(2), 1);
        assert!(!allocator.output_has_requests(0));
        allocator.clear();
        assert_eq!(allocator.num_output_requests(1), 0);
    }
}
