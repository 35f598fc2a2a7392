
use quantifiable_derive::Quantifiable;//the derive macro
use super::{Arbiter,ArbiterRequests,Selection};

/// Grants the highest priority, breaking ties with a rotating pointer.
/// The pointer moves just past the input of each granted selection.
#[derive(Clone,Debug,Quantifiable)]
pub struct RoundRobinArbiter
{
	requests: ArbiterRequests,
	pointer: usize,
	best_input: Option<usize>,
	highest_priority: i64,
}

/// Whether a request at `input1` with `priority1` wins over one at `input2` with `priority2`
/// when the round-robin pointer of a circle of `size` positions is at `offset`.
pub fn supersedes(input1:usize, priority1:i64, input2:usize, priority2:i64, offset:usize, size:usize) -> bool
{
	priority1>priority2 || ( priority1==priority2 && (input1+size-offset)%size < (input2+size-offset)%size )
}

impl RoundRobinArbiter
{
	pub fn new(size:usize) -> RoundRobinArbiter
	{
		RoundRobinArbiter{
			requests: ArbiterRequests::new(size),
			pointer: 0,
			best_input: None,
			highest_priority: i64::MIN,
		}
	}
	pub fn pointer(&self) -> usize
	{
		self.pointer
	}
}

impl Arbiter for RoundRobinArbiter
{
	fn size(&self) -> usize
	{
		self.requests.size()
	}
	fn add_request(&mut self, input:usize, id:usize, priority:i64)
	{
		let improves = match self.requests.entry(input)
		{
			None => true,
			Some(entry) => entry.priority < priority,
		};
		if improves
		{
			let better = match self.best_input
			{
				None => true,
				Some(best) => supersedes(input,priority,best,self.highest_priority,self.pointer,self.size()),
			};
			if better
			{
				self.highest_priority=priority;
				self.best_input=Some(input);
			}
		}
		self.requests.add(input,id,priority);
	}
	fn arbitrate(&mut self) -> Option<Selection>
	{
		let best=self.best_input;
		self.requests.select(best)
	}
	fn update_state(&mut self)
	{
		if let Some(selected)=self.requests.selected()
		{
			self.pointer=(selected+1)%self.size();
		}
	}
	fn clear(&mut self)
	{
		self.highest_priority=i64::MIN;
		self.best_input=None;
		self.requests.clear();
	}
	fn last_winner(&self) -> Option<usize>
	{
		self.requests.selected()
	}
	fn num_requests(&self) -> usize
	{
		self.requests.num_requests()
	}
}
