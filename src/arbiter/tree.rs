
use quantifiable_derive::Quantifiable;//the derive macro
use crate::error::Error;
use crate::source_location;
use super::{Arbiter,Selection,new_arbiter};

/// A two level arbiter. The inputs are divided into `groups` blocks of consecutive inputs, each with its own arbiter.
/// The winners of the groups compete in a global arbiter of `groups` inputs.
#[derive(Quantifiable)]
pub struct TreeArbiter
{
	size: usize,
	group_size: usize,
	group_arbiters: Vec<Box<dyn Arbiter>>,
	global_arbiter: Box<dyn Arbiter>,
	num_requests: usize,
	selected: Option<usize>,
}

impl TreeArbiter
{
	///Build a tree with `groups` groups using `base` arbiters in both levels.
	pub fn new(size:usize, groups:usize, base:&str) -> Result<TreeArbiter,Error>
	{
		if groups==0 || size%groups!=0
		{
			return Err(Error::unknown_arbiter(source_location!(),format!("tree({},{})",groups,base)).with_message(format!("cannot divide {} inputs into {} groups",size,groups)));
		}
		let group_size=size/groups;
		let group_arbiters=(0..groups).map(|_|new_arbiter(base,group_size)).collect::<Result<Vec<_>,Error>>()?;
		let global_arbiter=new_arbiter(base,groups)?;
		Ok(TreeArbiter{
			size,
			group_size,
			group_arbiters,
			global_arbiter,
			num_requests: 0,
			selected: None,
		})
	}
}

impl Arbiter for TreeArbiter
{
	fn size(&self) -> usize
	{
		self.size
	}
	fn add_request(&mut self, input:usize, id:usize, priority:i64)
	{
		let group=input/self.group_size;
		self.group_arbiters[group].add_request(input%self.group_size,id,priority);
		self.num_requests+=1;
	}
	fn arbitrate(&mut self) -> Option<Selection>
	{
		for (group,arbiter) in self.group_arbiters.iter_mut().enumerate()
		{
			if arbiter.num_requests()>0
			{
				if let Some(winner)=arbiter.arbitrate()
				{
					self.global_arbiter.add_request(group,winner.id,winner.priority);
				}
			}
		}
		match self.global_arbiter.arbitrate()
		{
			Some(global) =>
			{
				let group=global.input;
				let local=self.group_arbiters[group].last_winner().expect("a group without winner won the tree");
				let input=group*self.group_size+local;
				self.selected=Some(input);
				Some(Selection{input,id:global.id,priority:global.priority})
			},
			None =>
			{
				self.selected=None;
				None
			},
		}
	}
	fn update_state(&mut self)
	{
		if let Some(selected)=self.selected
		{
			self.group_arbiters[selected/self.group_size].update_state();
			self.global_arbiter.update_state();
		}
	}
	fn clear(&mut self)
	{
		if self.num_requests>0
		{
			for arbiter in self.group_arbiters.iter_mut()
			{
				arbiter.clear();
			}
			self.global_arbiter.clear();
			self.num_requests=0;
			self.selected=None;
		}
	}
	fn last_winner(&self) -> Option<usize>
	{
		self.selected
	}
	fn num_requests(&self) -> usize
	{
		self.num_requests
	}
}

#[cfg(test)]
mod tests
{
	use super::*;
	#[test]
	fn groups_must_divide_size()
	{
		assert!(TreeArbiter::new(6,4,"round_robin").is_err());
		assert!(TreeArbiter::new(6,3,"round_robin").is_ok());
	}
	#[test]
	fn update_moves_only_the_winning_group()
	{
		let mut arbiter=TreeArbiter::new(4,2,"round_robin").unwrap();
		//Groups {0,1} and {2,3}.
		let mut winners=vec![];
		for _ in 0..4
		{
			arbiter.clear();
			for input in 0..4
			{
				arbiter.add_request(input,input,0);
			}
			winners.push(arbiter.arbitrate().unwrap().input);
			arbiter.update_state();
		}
		assert_eq!(winners,vec![0,2,1,3]);
	}
	#[test]
	fn priorities_cross_groups()
	{
		let mut arbiter=TreeArbiter::new(4,2,"matrix").unwrap();
		arbiter.add_request(0,0,1);
		arbiter.add_request(3,3,6);
		let winner=arbiter.arbitrate().unwrap();
		assert_eq!((winner.input,winner.id),(3,3));
		assert_eq!(arbiter.last_winner(),Some(3));
	}
}

