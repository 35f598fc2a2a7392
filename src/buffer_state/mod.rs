/*!

The view that a router keeps of the input buffer at the other side of each of its output channels.

A [BufferState] counts the flits sent into each remote virtual channel that have not yet been returned as credits, and which upstream virtual channel holds each of them.
It only changes by [BufferState::sending_flit] and [BufferState::process_credit]. How much of the remote buffer each virtual channel may fill is decided by a [BufferPolicy], selected by the `buffer_policy` configuration field:

* `private`: each virtual channel owns `buf_size/num_vcs` slots.
* `shared`: groups of virtual channels own private regions and the remaining slots are shared by all.
* `limited`: `shared`, but no virtual channel may hold more than `max_held_slots`.
* `dynamic`: `limited`, with `max_held_slots` being `buf_size` divided by the number of virtual channels in use.
* `shifting`: `dynamic`, rounding the division to halvings of `buf_size`.
* `feedback`: `shared`, limiting each virtual channel by an estimate of its round trip time.
* `simplefeedback`: `feedback`, measuring the round trip time of a single flit at a time.

*/

pub mod private;
pub mod shared;
pub mod limited;
pub mod feedback;

use quantifiable_derive::Quantifiable;//the derive macro
use crate::quantify::Quantifiable;
use crate::config::RouterConfiguration;
use crate::error::Error;
use crate::flit::{Flit,Credit};
use crate::source_location;
use crate::Time;

pub use self::private::Private;
pub use self::shared::Shared;
pub use self::limited::{Limited,LimitMode};
pub use self::feedback::{Feedback,SimpleFeedback};

/// The counters of a [BufferState], which the policies consult.
#[derive(Clone,Debug,Quantifiable)]
pub struct OccupancyCounters
{
	///Flits in the remote buffer, summing all virtual channels.
	occupancy: usize,
	///Capacity of the remote buffer.
	size: usize,
	vc_occupancy: Vec<usize>,
	///The tag given to `take_buffer`, usually the upstream input virtual channel.
	in_use_by: Vec<Option<usize>>,
	tail_sent: Vec<bool>,
}

impl OccupancyCounters
{
	fn new(size:usize, vcs:usize) -> OccupancyCounters
	{
		OccupancyCounters{
			occupancy: 0,
			size,
			vc_occupancy: vec![0;vcs],
			in_use_by: vec![None;vcs],
			tail_sent: vec![false;vcs],
		}
	}
	pub fn occupancy(&self) -> usize
	{
		self.occupancy
	}
	pub fn size(&self) -> usize
	{
		self.size
	}
	pub fn num_vcs(&self) -> usize
	{
		self.vc_occupancy.len()
	}
	pub fn occupancy_for(&self, vc:usize) -> usize
	{
		self.vc_occupancy[vc]
	}
	pub fn is_empty_for(&self, vc:usize) -> bool
	{
		self.vc_occupancy[vc]==0
	}
	///Whether the virtual channel can be taken.
	pub fn is_available_for(&self, vc:usize) -> bool
	{
		self.in_use_by[vc].is_none()
	}
	pub fn used_by(&self, vc:usize) -> Option<usize>
	{
		self.in_use_by[vc]
	}
	pub fn tail_sent(&self, vc:usize) -> bool
	{
		self.tail_sent[vc]
	}
}

/// How the slots of a remote buffer are distributed among its virtual channels.
/// The hooks are called after the counters have been updated.
pub trait BufferPolicy : Quantifiable
{
	///A virtual channel has been taken by a new packet.
	fn take_buffer(&mut self, _vc:usize, _counters:&OccupancyCounters) -> Result<(),Error>
	{
		Ok(())
	}
	///A flit has been sent.
	fn sending_flit(&mut self, flit:&Flit, counters:&OccupancyCounters, now:Time) -> Result<(),Error>;
	///A credit has freed a slot of `vc`.
	fn free_slot_for(&mut self, _vc:usize, _counters:&OccupancyCounters, _now:Time) -> Result<(),Error>
	{
		Ok(())
	}
	fn is_full_for(&self, vc:usize, counters:&OccupancyCounters, now:Time) -> bool;
	///Slots that `vc` may still fill. May be negative when the limit has shrunk below the occupancy.
	fn available_for(&self, vc:usize, counters:&OccupancyCounters, now:Time) -> i64;
	///Maximum number of slots that `vc` may fill.
	fn limit_for(&self, vc:usize, counters:&OccupancyCounters, now:Time) -> i64;
	///The minimum round trip time of the channel, for the policies that measure latencies.
	fn set_min_latency(&mut self, _min_latency:Time)
	{
	}
}

/// Build the policy named by `config.buffer_policy`.
pub fn new_buffer_policy(config:&RouterConfiguration) -> Result<Box<dyn BufferPolicy>,Error>
{
	match config.buffer_policy.as_ref()
	{
		"private" => Ok(Box::new(Private::new(config)?)),
		"shared" => Ok(Box::new(Shared::new(config)?)),
		"limited" => Ok(Box::new(Limited::new(config,LimitMode::Fixed)?)),
		"dynamic" => Ok(Box::new(Limited::new(config,LimitMode::Dynamic)?)),
		"shifting" => Ok(Box::new(Limited::new(config,LimitMode::Shifting)?)),
		"feedback" => Ok(Box::new(Feedback::new(config)?)),
		"simplefeedback" => Ok(Box::new(SimpleFeedback::new(config)?)),
		_ => Err(Error::unknown_buffer_policy(source_location!(),config.buffer_policy.clone())),
	}
}

/// The state of the buffer at the other end of an output channel.
#[derive(Quantifiable)]
pub struct BufferState
{
	counters: OccupancyCounters,
	policy: Box<dyn BufferPolicy>,
	///Keep a virtual channel in use until the credit of its tail returns, instead of releasing it when the tail is sent.
	wait_for_tail_credit: bool,
	last_id: Vec<Option<usize>>,
	last_packet: Vec<Option<usize>>,
}

impl BufferState
{
	pub fn new(config:&RouterConfiguration) -> Result<BufferState,Error>
	{
		let vcs=config.num_vcs;
		Ok(BufferState{
			counters: OccupancyCounters::new(config.total_buffer_size(),vcs),
			policy: new_buffer_policy(config)?,
			wait_for_tail_credit: config.wait_for_tail_credit,
			last_id: vec![None;vcs],
			last_packet: vec![None;vcs],
		})
	}
	///Account a credit returned by the remote router.
	pub fn process_credit(&mut self, credit:&Credit, now:Time) -> Result<(),Error>
	{
		for &vc in credit.vcs.iter()
		{
			assert!(vc<self.counters.num_vcs(),"credit for virtual channel {} out of range",vc);
			if self.wait_for_tail_credit && self.counters.in_use_by[vc].is_none()
			{
				return Err(Error::credit_for_idle_virtual_channel(source_location!(),vc));
			}
			if self.counters.occupancy==0
			{
				return Err(Error::buffer_underflow(source_location!(),None));
			}
			self.counters.occupancy-=1;
			if self.counters.vc_occupancy[vc]==0
			{
				return Err(Error::buffer_underflow(source_location!(),Some(vc)));
			}
			self.counters.vc_occupancy[vc]-=1;
			if self.wait_for_tail_credit && self.counters.vc_occupancy[vc]==0 && self.counters.tail_sent[vc]
			{
				self.counters.in_use_by[vc]=None;
			}
			self.policy.free_slot_for(vc,&self.counters,now)?;
		}
		Ok(())
	}
	///Account a flit sent into the remote virtual channel `flit.vc`.
	pub fn sending_flit(&mut self, flit:&Flit, now:Time) -> Result<(),Error>
	{
		let vc=flit.vc;
		assert!(vc<self.counters.num_vcs(),"flit sent to virtual channel {} out of range",vc);
		self.counters.occupancy+=1;
		if self.counters.occupancy>self.counters.size
		{
			return Err(Error::buffer_overflow(source_location!(),None).with_message(format!("remote buffer of {} slots",self.counters.size)));
		}
		self.counters.vc_occupancy[vc]+=1;
		self.policy.sending_flit(flit,&self.counters,now)?;
		if flit.tail
		{
			self.counters.tail_sent[vc]=true;
			if !self.wait_for_tail_credit
			{
				self.counters.in_use_by[vc]=None;
			}
		}
		self.last_id[vc]=Some(flit.id);
		self.last_packet[vc]=Some(flit.packet);
		Ok(())
	}
	///Reserve the virtual channel `vc` for the packet identified by `tag`.
	pub fn take_buffer(&mut self, vc:usize, tag:usize) -> Result<(),Error>
	{
		if let Some(used_by)=self.counters.in_use_by[vc]
		{
			return Err(Error::virtual_channel_in_use(source_location!(),vc,used_by));
		}
		self.counters.in_use_by[vc]=Some(tag);
		self.counters.tail_sent[vc]=false;
		self.policy.take_buffer(vc,&self.counters)
	}
	pub fn set_min_latency(&mut self, min_latency:Time)
	{
		self.policy.set_min_latency(min_latency);
	}
	pub fn is_full(&self) -> bool
	{
		self.counters.occupancy==self.counters.size
	}
	pub fn is_full_for(&self, vc:usize, now:Time) -> bool
	{
		self.policy.is_full_for(vc,&self.counters,now)
	}
	pub fn available_for(&self, vc:usize, now:Time) -> i64
	{
		self.policy.available_for(vc,&self.counters,now)
	}
	pub fn limit_for(&self, vc:usize, now:Time) -> i64
	{
		self.policy.limit_for(vc,&self.counters,now)
	}
	pub fn is_empty_for(&self, vc:usize) -> bool
	{
		self.counters.is_empty_for(vc)
	}
	pub fn is_available_for(&self, vc:usize) -> bool
	{
		self.counters.is_available_for(vc)
	}
	pub fn used_by(&self, vc:usize) -> Option<usize>
	{
		self.counters.used_by(vc)
	}
	pub fn occupancy(&self) -> usize
	{
		self.counters.occupancy
	}
	pub fn occupancy_for(&self, vc:usize) -> usize
	{
		self.counters.occupancy_for(vc)
	}
	pub fn size(&self) -> usize
	{
		self.counters.size
	}
	pub fn num_vcs(&self) -> usize
	{
		self.counters.num_vcs()
	}
	///Identifiers of the last flit and packet sent into `vc`.
	pub fn last_sent(&self, vc:usize) -> (Option<usize>,Option<usize>)
	{
		(self.last_id[vc],self.last_packet[vc])
	}
	pub fn counters(&self) -> &OccupancyCounters
	{
		&self.counters
	}
}

#[cfg(test)]
pub mod tests
{
	use super::*;
	use crate::error::ErrorKind;
	pub fn flit(vc:usize, head:bool, tail:bool) -> Flit
	{
		let mut flit=Flit::new(0,0);
		flit.vc=vc;
		flit.head=head;
		flit.tail=tail;
		flit
	}
	pub fn config(policy:&str) -> RouterConfiguration
	{
		RouterConfiguration{
			num_vcs: 4,
			buf_size: Some(16),
			buffer_policy: policy.to_string(),
			..RouterConfiguration::default()
		}
	}
	#[test]
	fn unknown_policy()
	{
		match BufferState::new(&config("greedy"))
		{
			Err(Error{kind:ErrorKind::UnknownBufferPolicy{..},..}) => (),
			_ => panic!("greedy should not be a buffer policy"),
		}
	}
	#[test]
	fn conservation_of_slots()
	{
		for policy in &["private","shared","limited","dynamic","shifting","feedback","simplefeedback"]
		{
			let mut state=BufferState::new(&config(policy)).unwrap();
			state.take_buffer(1,7).unwrap();
			let mut sent=0;
			let mut returned=0;
			for cycle in 0..12u64
			{
				if !state.is_full_for(1,cycle) && sent<6
				{
					state.sending_flit(&flit(1,sent==0,sent==5),cycle).unwrap();
					sent+=1;
				}
				if cycle%2==1 && returned<sent
				{
					state.process_credit(&Credit::for_vc(1),cycle).unwrap();
					returned+=1;
				}
				assert_eq!(state.occupancy_for(1),sent-returned,"{}",policy);
				assert!(state.occupancy_for(1) as i64<=state.limit_for(1,cycle),"{}",policy);
			}
		}
	}
	#[test]
	fn take_twice_is_an_error()
	{
		let mut state=BufferState::new(&config("private")).unwrap();
		state.take_buffer(2,5).unwrap();
		match state.take_buffer(2,6)
		{
			Err(Error{kind:ErrorKind::VirtualChannelInUse{vc:2,used_by:5},..}) => (),
			_ => panic!("a virtual channel was taken twice"),
		}
		state.sending_flit(&flit(2,true,true),0).unwrap();
		assert!(state.is_available_for(2));
		state.take_buffer(2,6).unwrap();
	}
	#[test]
	fn waiting_for_tail_credit()
	{
		let mut config=config("private");
		config.wait_for_tail_credit=true;
		let mut state=BufferState::new(&config).unwrap();
		match state.process_credit(&Credit::for_vc(0),0)
		{
			Err(Error{kind:ErrorKind::CreditForIdleVirtualChannel{vc:0},..}) => (),
			_ => panic!("credit for an idle virtual channel accepted"),
		}
		state.take_buffer(0,1).unwrap();
		state.sending_flit(&flit(0,true,false),0).unwrap();
		state.sending_flit(&flit(0,false,true),1).unwrap();
		assert!(!state.is_available_for(0));
		state.process_credit(&Credit::for_vc(0),2).unwrap();
		assert!(!state.is_available_for(0));
		state.process_credit(&Credit::for_vc(0),3).unwrap();
		assert!(state.is_available_for(0));
	}
	#[test]
	fn underflow_is_an_error()
	{
		let mut state=BufferState::new(&config("private")).unwrap();
		match state.process_credit(&Credit::for_vc(3),0)
		{
			Err(Error{kind:ErrorKind::BufferUnderflow{..},..}) => (),
			_ => panic!("credit without flit accepted"),
		}
	}
}
