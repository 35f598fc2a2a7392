/*!

Links between routers. A [Channel] carries at most one item per cycle in each direction of use, delivering it a fixed number of cycles later, in order.

Each cycle the simulation calls `read_inputs` on the channel, which takes the item given by `send` in the previous cycle, and `write_outputs`, which exposes the item due at that cycle to `receive`.

*/

use std::collections::VecDeque;

use quantifiable_derive::Quantifiable;//the derive macro
use crate::quantify::Quantifiable;
use crate::error::Error;
use crate::flit::{Flit,Credit};
use crate::routing::RouterInfo;
use crate::source_location;
use crate::Time;

/// A port of a router at one end of a channel.
#[derive(Clone,Copy,Debug,PartialEq,Eq,Quantifiable)]
pub struct Endpoint
{
	pub router: RouterInfo,
	pub port: usize,
}

#[derive(Clone,Debug,Quantifiable)]
pub struct Channel<T:Quantifiable>
{
	latency: Time,
	///Item given to `send` and not yet read.
	input: Option<T>,
	///Item available to `receive` in the current cycle.
	output: Option<T>,
	///Items in flight, with the cycle they are delivered.
	wait_queue: VecDeque<(Time,T)>,
	source: Option<Endpoint>,
	sink: Option<Endpoint>,
}

pub type FlitChannel = Channel<Flit>;
pub type CreditChannel = Channel<Credit>;

impl<T:Quantifiable> Channel<T>
{
	///A channel delivering each item `latency` cycles after reading it. Latency must be positive.
	pub fn new(latency:Time) -> Result<Channel<T>,Error>
	{
		if latency==0
		{
			return Err(Error::zero_delay(source_location!(),"channel"));
		}
		Ok(Channel{
			latency,
			input: None,
			output: None,
			wait_queue: VecDeque::new(),
			source: None,
			sink: None,
		})
	}
	pub fn latency(&self) -> Time
	{
		self.latency
	}
	///Put an item into the channel. Only one item is accepted each cycle.
	pub fn send(&mut self, item:T) -> Result<(),Error>
	{
		if self.input.is_some()
		{
			return Err(Error::channel_overrun(source_location!()));
		}
		self.input=Some(item);
		Ok(())
	}
	///Take the item delivered this cycle, if any.
	pub fn receive(&mut self) -> Option<T>
	{
		self.output.take()
	}
	pub fn read_inputs(&mut self, now:Time)
	{
		if let Some(item)=self.input.take()
		{
			self.wait_queue.push_back((now+self.latency-1,item));
		}
	}
	pub fn write_outputs(&mut self, now:Time)
	{
		self.output=None;
		let due = match self.wait_queue.front()
		{
			Some(&(time,_)) => time<=now,
			None => false,
		};
		if due
		{
			debug_assert_eq!(self.wait_queue.front().map(|&(time,_)|time),Some(now),"an item of a channel was not delivered on time");
			self.output=self.wait_queue.pop_front().map(|(_,item)|item);
		}
	}
	///Whether there is nothing in flight.
	pub fn is_idle(&self) -> bool
	{
		self.input.is_none() && self.output.is_none() && self.wait_queue.is_empty()
	}
	pub fn in_flight(&self) -> usize
	{
		self.wait_queue.len() + if self.input.is_some() {1} else {0}
	}
	pub fn set_source(&mut self, source:Endpoint)
	{
		self.source=Some(source);
	}
	pub fn set_sink(&mut self, sink:Endpoint)
	{
		self.sink=Some(sink);
	}
	pub fn source(&self) -> Option<Endpoint>
	{
		self.source
	}
	pub fn sink(&self) -> Option<Endpoint>
	{
		self.sink
	}
}

#[cfg(test)]
mod tests
{
	use super::*;
	use crate::error::ErrorKind;
	#[test]
	fn zero_latency_is_rejected()
	{
		match FlitChannel::new(0)
		{
			Err(Error{kind:ErrorKind::ZeroDelay{stage:"channel"},..}) => (),
			_ => panic!("a channel without latency was built"),
		}
	}
	#[test]
	fn delivers_in_order_after_the_latency()
	{
		let mut channel=CreditChannel::new(3).unwrap();
		let mut received=vec![];
		for cycle in 0..10u64
		{
			if let Some(credit)=channel.receive()
			{
				received.push((cycle,credit.id));
			}
			channel.read_inputs(cycle);
			channel.write_outputs(cycle);
			if cycle<2
			{
				let mut credit=Credit::for_vc(0);
				credit.id=cycle as usize;
				channel.send(credit).unwrap();
			}
		}
		// Sent at cycle t, read at t+1, output at t+3, received at t+4.
		assert_eq!(received,vec![(4,0),(5,1)]);
		assert!(channel.is_idle());
	}
	#[test]
	fn one_item_per_cycle()
	{
		let mut channel=FlitChannel::new(1).unwrap();
		channel.send(Flit::new(0,0)).unwrap();
		match channel.send(Flit::new(1,0))
		{
			Err(Error{kind:ErrorKind::ChannelOverrun,..}) => (),
			_ => panic!("two flits entered a channel in the same cycle"),
		}
		assert_eq!(channel.in_flight(),1);
	}
}
