/*!

Arbiters select a single winner among the requests for one resource.

Usage per decision: `clear`, several `add_request`, `arbitrate` (which may be called again with the same result), and `update_state` if the winner actually got the resource.

see [`new_arbiter`](fn.new_arbiter.html) for documentation on the configuration syntax of predefined arbiters.

*/

pub mod round_robin;
pub mod matrix;
pub mod tree;

use quantifiable_derive::Quantifiable;//the derive macro
use crate::quantify::Quantifiable;
use crate::config::parse_name_and_parameters;
use crate::error::Error;
use crate::source_location;

pub use self::round_robin::RoundRobinArbiter;
pub use self::matrix::MatrixArbiter;
pub use self::tree::TreeArbiter;

/// The request held by an input line of an arbiter.
#[derive(Clone,Copy,Debug,PartialEq,Eq,Quantifiable)]
pub struct ArbiterEntry
{
	pub id: usize,
	pub priority: i64,
}

/// The outcome of an arbitration.
#[derive(Clone,Copy,Debug,PartialEq,Eq)]
pub struct Selection
{
	pub input: usize,
	pub id: usize,
	pub priority: i64,
}

pub trait Arbiter : Quantifiable
{
	///Number of input lines.
	fn size(&self) -> usize;
	///Register a request. A second request from the same input replaces the first only if it has higher priority.
	fn add_request(&mut self, input:usize, id:usize, priority:i64);
	///Choose the winner among the registered requests. Returns `None` when there are no requests.
	fn arbitrate(&mut self) -> Option<Selection>;
	///Move the priority state given that the last selection has been granted.
	fn update_state(&mut self);
	///Remove all the requests.
	fn clear(&mut self);
	///The input selected in the last arbitration.
	fn last_winner(&self) -> Option<usize>;
	///Number of `add_request` calls since the last `clear`.
	fn num_requests(&self) -> usize;
}

/// The bookkeeping shared by all the arbiters.
#[derive(Clone,Debug,Quantifiable)]
pub struct ArbiterRequests
{
	entries: Vec<Option<ArbiterEntry>>,
	selected: Option<usize>,
	num_requests: usize,
}

impl ArbiterRequests
{
	pub fn new(size:usize) -> ArbiterRequests
	{
		ArbiterRequests{
			entries: vec![None;size],
			selected: None,
			num_requests: 0,
		}
	}
	pub fn size(&self) -> usize
	{
		self.entries.len()
	}
	///Store the request. Returns whether it replaced the entry.
	pub fn add(&mut self, input:usize, id:usize, priority:i64) -> bool
	{
		assert!(input<self.entries.len(),"input {} out of range of arbiter of size {}",input,self.entries.len());
		self.num_requests+=1;
		let replace = match self.entries[input]
		{
			None => true,
			Some(ref entry) => entry.priority < priority,
		};
		if replace
		{
			self.entries[input]=Some(ArbiterEntry{id,priority});
		}
		replace
	}
	pub fn entry(&self, input:usize) -> Option<&ArbiterEntry>
	{
		self.entries[input].as_ref()
	}
	pub fn entries(&self) -> &[Option<ArbiterEntry>]
	{
		&self.entries
	}
	pub fn num_requests(&self) -> usize
	{
		self.num_requests
	}
	pub fn selected(&self) -> Option<usize>
	{
		self.selected
	}
	///Record the winner and build its selection.
	pub fn select(&mut self, input:Option<usize>) -> Option<Selection>
	{
		self.selected=input;
		match input
		{
			Some(input) =>
			{
				let entry=self.entries[input].expect("an arbiter selected an input without request");
				Some(Selection{input,id:entry.id,priority:entry.priority})
			},
			None =>
			{
				assert!(self.num_requests==0,"an arbiter with requests selected nothing");
				None
			},
		}
	}
	pub fn clear(&mut self)
	{
		if self.num_requests>0
		{
			for entry in self.entries.iter_mut()
			{
				*entry=None;
			}
			self.num_requests=0;
			self.selected=None;
		}
	}
}

/// Build an arbiter from its name.
///
/// * `round_robin` rotates a pointer past each granted input.
/// * `matrix` keeps a pairwise priority matrix, the last winner becoming the lowest.
/// * `tree(groups)` or `tree(groups,base)` arbitrates among `groups` groups of consecutive inputs, each with its own `base` arbiter (`round_robin` by default), and then among the group winners.
pub fn new_arbiter(name:&str, size:usize) -> Result<Box<dyn Arbiter>,Error>
{
	let (kind,parameters)=parse_name_and_parameters(name);
	match kind
	{
		"round_robin" | "RoundRobin" => Ok(Box::new(RoundRobinArbiter::new(size))),
		"matrix" | "Matrix" => Ok(Box::new(MatrixArbiter::new(size))),
		"tree" | "Tree" =>
		{
			let groups = match parameters.get(0)
			{
				Some(text) => text.parse::<usize>().map_err(|_|Error::unknown_arbiter(source_location!(),name.to_string()).with_message(format!("bad number of groups {}",text)))?,
				None => return Err(Error::unknown_arbiter(source_location!(),name.to_string()).with_message("a tree arbiter needs the number of groups".to_string())),
			};
			let base = parameters.get(1).cloned().unwrap_or("round_robin");
			Ok(Box::new(TreeArbiter::new(size,groups,base)?))
		},
		_ => Err(Error::unknown_arbiter(source_location!(),name.to_string())),
	}
}

#[cfg(test)]
mod tests
{
	use super::*;
	use crate::error::ErrorKind;
	#[test]
	fn factory_names()
	{
		assert_eq!(new_arbiter("round_robin",4).unwrap().size(),4);
		assert_eq!(new_arbiter("matrix",3).unwrap().size(),3);
		assert_eq!(new_arbiter("tree(2,matrix)",8).unwrap().size(),8);
		match new_arbiter("lottery",4)
		{
			Err(Error{kind:ErrorKind::UnknownArbiter{..},..}) => (),
			_ => panic!("lottery should not be an arbiter"),
		}
	}
	#[test]
	fn never_selects_an_input_without_request()
	{
		for name in &["round_robin","matrix","tree(2)"]
		{
			let mut arbiter=new_arbiter(name,4).unwrap();
			assert_eq!(arbiter.arbitrate(),None);
			for round in 0..12
			{
				arbiter.clear();
				let requested=[round%4,(round*3+1)%4];
				for &input in requested.iter()
				{
					arbiter.add_request(input,input*10,0);
				}
				let winner=arbiter.arbitrate().unwrap();
				assert!(requested.contains(&winner.input),"{} selected {}",name,winner.input);
				assert_eq!(winner.id,winner.input*10);
				assert_eq!(arbiter.arbitrate(),Some(winner),"{} is not idempotent",name);
				arbiter.update_state();
			}
		}
	}
}

