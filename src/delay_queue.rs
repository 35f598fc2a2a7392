
use std::collections::VecDeque;
use std::collections::vec_deque::{Iter,IterMut};

use quantifiable_derive::Quantifiable;//the derive macro
use crate::quantify::Quantifiable;
use crate::Time;

/// An entry of a [DelayQueue]. `ready` is `None` until the stage decides when the item completes.
#[derive(Clone,Debug,Quantifiable)]
pub struct Slot<T:Quantifiable>
{
	pub ready: Option<Time>,
	pub item: T,
}

/**
A FIFO of work items of a pipeline stage, each tagged with the cycle in which it is ready.

Items are only released from the front, so an item never overtakes an earlier one, even when it would be ready before.
Items may enter without a ready cycle (`push_unscheduled`); the stage evaluation scans the leading unscheduled
items and sets their ready cycle.
**/
#[derive(Clone,Debug,Quantifiable)]
pub struct DelayQueue<T:Quantifiable>
{
	slots: VecDeque<Slot<T>>,
}

impl<T:Quantifiable> Default for DelayQueue<T>
{
	fn default() -> DelayQueue<T>
	{
		DelayQueue{ slots: VecDeque::new() }
	}
}

impl<T:Quantifiable> DelayQueue<T>
{
	pub fn new() -> DelayQueue<T>
	{
		DelayQueue::default()
	}
	///Append an item that becomes available at cycle `ready`.
	pub fn push(&mut self, item:T, ready:Time)
	{
		self.slots.push_back(Slot{ready:Some(ready),item});
	}
	///Append an item whose ready cycle is still to be decided.
	pub fn push_unscheduled(&mut self, item:T)
	{
		self.slots.push_back(Slot{ready:None,item});
	}
	///Extract the front item if it is ready at cycle `now`.
	pub fn pop_ready(&mut self, now:Time) -> Option<T>
	{
		match self.slots.front()
		{
			Some(&Slot{ready:Some(ready),..}) if ready<=now => self.slots.pop_front().map(|slot|slot.item),
			_ => None,
		}
	}
	///Whether the front item is ready at `now`.
	pub fn front_ready(&self, now:Time) -> bool
	{
		match self.slots.front()
		{
			Some(&Slot{ready:Some(ready),..}) => ready<=now,
			_ => false,
		}
	}
	pub fn front(&self) -> Option<&T>
	{
		self.slots.front().map(|slot|&slot.item)
	}
	pub fn len(&self) -> usize
	{
		self.slots.len()
	}
	pub fn is_empty(&self) -> bool
	{
		self.slots.is_empty()
	}
	pub fn iter(&self) -> Iter<'_,Slot<T>>
	{
		self.slots.iter()
	}
	pub fn iter_mut(&mut self) -> IterMut<'_,Slot<T>>
	{
		self.slots.iter_mut()
	}
	///Number of leading items without a ready cycle.
	pub fn unscheduled_len(&self) -> usize
	{
		self.slots.iter().take_while(|slot|slot.ready.is_none()).count()
	}
	///Number of leading items ready at `now`.
	pub fn ready_len(&self, now:Time) -> usize
	{
		self.slots.iter().take_while(|slot|match slot.ready { Some(ready) => ready<=now, None => false }).count()
	}
	pub fn get(&self, index:usize) -> Option<&Slot<T>>
	{
		self.slots.get(index)
	}
	pub fn get_mut(&mut self, index:usize) -> Option<&mut Slot<T>>
	{
		self.slots.get_mut(index)
	}
}

#[cfg(test)]
mod tests
{
	use super::*;
	#[test]
	fn equal_ready_items_leave_in_order()
	{
		let mut queue=DelayQueue::new();
		queue.push(1usize,5);
		queue.push(2usize,5);
		queue.push(3usize,6);
		assert_eq!(queue.pop_ready(4),None);
		assert_eq!(queue.pop_ready(5),Some(1));
		assert_eq!(queue.pop_ready(5),Some(2));
		assert_eq!(queue.pop_ready(5),None);
		assert_eq!(queue.pop_ready(6),Some(3));
		assert!(queue.is_empty());
	}
	#[test]
	fn front_blocks_later_items()
	{
		let mut queue=DelayQueue::new();
		queue.push(1usize,10);
		queue.push(2usize,3);
		assert_eq!(queue.pop_ready(5),None);
		assert_eq!(queue.ready_len(5),0);
		assert_eq!(queue.pop_ready(10),Some(1));
		assert_eq!(queue.pop_ready(10),Some(2));
	}
	#[test]
	fn unscheduled_items_wait_for_a_schedule()
	{
		let mut queue=DelayQueue::new();
		queue.push_unscheduled(7usize);
		queue.push_unscheduled(8usize);
		assert_eq!(queue.unscheduled_len(),2);
		assert_eq!(queue.pop_ready(100),None);
		assert_eq!(queue.iter().map(|slot|slot.item).collect::<Vec<usize>>(),vec![7,8]);
		for slot in queue.iter_mut()
		{
			slot.ready=Some(2);
		}
		assert_eq!(queue.unscheduled_len(),0);
		assert_eq!(queue.ready_len(2),2);
		assert_eq!(queue.pop_ready(2),Some(7));
	}
}

