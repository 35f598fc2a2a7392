/*!

The transient records moving across the network: flits forward and credits backward.

Both are plain owned values. They can be recycled through a [Pool], which resets every field of a returned record before handing it out again.

*/

use std::collections::BTreeSet;

use quantifiable_derive::Quantifiable;//the derive macro
use crate::quantify::Quantifiable;
use crate::route::OutputSet;
use crate::Time;

/// Records that can be cleared for reuse. After `reset` a record must be indistinguishable from a new one.
pub trait Recyclable: Default
{
	fn reset(&mut self);
}

/// The smallest unit of flow control. A packet is a sequence of flits sharing `packet`, the first marked `head` and the last `tail`.
#[derive(Clone,Debug,Default,Quantifiable)]
pub struct Flit
{
	pub id: usize,
	pub packet: usize,
	///Traffic class.
	pub class: usize,
	pub head: bool,
	pub tail: bool,
	///Virtual channel where the flit is or is going to be stored.
	pub vc: usize,
	pub source: usize,
	pub destination: usize,
	pub priority: i64,
	pub hops: usize,
	pub creation_cycle: Time,
	pub injection_cycle: Option<Time>,
	pub arrival_cycle: Option<Time>,
	///Scratchpad of the routing functions.
	pub phase: usize,
	///Scratchpad of the routing functions.
	pub intermediate: Option<usize>,
	///Route already computed for the next router.
	pub lookahead_route: OutputSet,
	///Trace the flit through the log.
	pub watch: bool,
}

impl Flit
{
	pub fn new(id:usize, packet:usize) -> Flit
	{
		Flit{
			id,
			packet,
			..Flit::default()
		}
	}
}

impl Recyclable for Flit
{
	fn reset(&mut self)
	{
		*self=Flit::default();
	}
}

/// Returns buffer slots to the upstream router. Holds every virtual channel that got a slot freed in a cycle.
#[derive(Clone,Debug,Default,Quantifiable)]
pub struct Credit
{
	pub vcs: BTreeSet<usize>,
	pub head: bool,
	pub tail: bool,
	pub id: usize,
}

impl Credit
{
	pub fn for_vc(vc:usize) -> Credit
	{
		let mut credit=Credit::default();
		credit.vcs.insert(vc);
		credit
	}
}

impl Recyclable for Credit
{
	fn reset(&mut self)
	{
		self.vcs.clear();
		self.head=false;
		self.tail=false;
		self.id=0;
	}
}

/// A free list of records, counting how many are currently out of it.
#[derive(Debug,Default,Quantifiable)]
pub struct Pool<T:Recyclable+Quantifiable>
{
	free: Vec<T>,
	///Number of records obtained with `acquire` and not yet released.
	outstanding: usize,
	///Number of records ever created by the pool.
	created: usize,
}

impl<T:Recyclable+Quantifiable> Pool<T>
{
	pub fn new() -> Pool<T>
	{
		Pool{
			free: vec![],
			outstanding: 0,
			created: 0,
		}
	}
	///Get a cleared record, reusing a released one when available.
	pub fn acquire(&mut self) -> T
	{
		self.outstanding+=1;
		match self.free.pop()
		{
			Some(item) => item,
			None =>
			{
				self.created+=1;
				T::default()
			},
		}
	}
	///Give back a record. It is reset before being stored.
	pub fn release(&mut self, mut item:T)
	{
		item.reset();
		self.outstanding=self.outstanding.saturating_sub(1);
		self.free.push(item);
	}
	pub fn outstanding(&self) -> usize
	{
		self.outstanding
	}
	pub fn created(&self) -> usize
	{
		self.created
	}
}

#[cfg(test)]
mod tests
{
	use super::*;
	#[test]
	fn released_credits_come_back_cleared()
	{
		let mut pool:Pool<Credit> = Pool::new();
		let mut credit=pool.acquire();
		credit.vcs.insert(3);
		credit.tail=true;
		credit.id=17;
		assert_eq!(pool.outstanding(),1);
		pool.release(credit);
		assert_eq!(pool.outstanding(),0);
		let again=pool.acquire();
		assert!(again.vcs.is_empty());
		assert!(!again.tail);
		assert_eq!(again.id,0);
		assert_eq!(pool.created(),1);
	}
	#[test]
	fn flit_reset_clears_everything()
	{
		let mut flit=Flit::new(5,2);
		flit.head=true;
		flit.hops=3;
		flit.intermediate=Some(9);
		flit.lookahead_route.add(1,0,1);
		flit.reset();
		assert_eq!(flit.id,0);
		assert_eq!(flit.hops,0);
		assert_eq!(flit.intermediate,None);
		assert!(flit.lookahead_route.is_empty());
	}
}

