
use quantifiable_derive::Quantifiable;//the derive macro
use crate::config::RouterConfiguration;
use crate::error::Error;
use crate::flit::Flit;
use crate::source_location;
use crate::Time;
use super::{BufferPolicy,OccupancyCounters,Shared};

/// How the cap on the slots held by a virtual channel is computed.
#[derive(Clone,Copy,Debug,PartialEq,Eq)]
pub enum LimitMode
{
	///`max_held_slots` from the configuration.
	Fixed,
	///`buf_size` divided among the virtual channels in use.
	Dynamic,
	///`buf_size` halved once per bit of the number of virtual channels in use minus one.
	Shifting,
}

quantifiable_simple!(LimitMode);

/// A [Shared] buffer where each virtual channel can hold at most `max_held_slots` slots.
#[derive(Clone,Debug,Quantifiable)]
pub struct Limited
{
	shared: Shared,
	mode: LimitMode,
	vcs: usize,
	max_held_slots: usize,
	///Virtual channels taken and without their tail sent.
	active_vcs: usize,
}

impl Limited
{
	pub fn new(config:&RouterConfiguration, mode:LimitMode) -> Result<Limited,Error>
	{
		let shared=Shared::new(config)?;
		let max_held_slots = match mode
		{
			LimitMode::Fixed => config.max_held_slots.unwrap_or(shared.buf_size()),
			LimitMode::Dynamic | LimitMode::Shifting => shared.buf_size(),
		};
		if max_held_slots==0
		{
			return Err(Error::incompatible_configuration(source_location!()).with_message("a virtual channel could never hold a slot with max_held_slots 0".to_string()));
		}
		//The smallest cap is reached with every virtual channel active.
		let min_buf_size = match mode
		{
			LimitMode::Fixed => 1,
			LimitMode::Dynamic => config.num_vcs,
			LimitMode::Shifting => config.num_vcs.next_power_of_two(),
		};
		if shared.buf_size()<min_buf_size
		{
			return Err(Error::incompatible_configuration(source_location!()).with_message(format!("a buffer of {} slots would leave some of the {} virtual channels without slots, it needs at least {}",shared.buf_size(),config.num_vcs,min_buf_size)));
		}
		Ok(Limited{
			shared,
			mode,
			vcs: config.num_vcs,
			max_held_slots,
			active_vcs: 0,
		})
	}
	pub fn max_held_slots(&self) -> usize
	{
		self.max_held_slots
	}
	pub fn active_vcs(&self) -> usize
	{
		self.active_vcs
	}
	fn recompute_limit(&mut self)
	{
		if self.active_vcs==0
		{
			return;
		}
		let buf_size=self.shared.buf_size();
		match self.mode
		{
			LimitMode::Fixed => (),
			LimitMode::Dynamic => self.max_held_slots = buf_size/self.active_vcs,
			LimitMode::Shifting =>
			{
				let mut pending=self.active_vcs-1;
				let mut slots=buf_size;
				while pending>0
				{
					slots>>=1;
					pending>>=1;
				}
				self.max_held_slots=slots;
			},
		}
		debug_assert!(self.max_held_slots>0,"the cap of held slots fell to zero");
	}
}

impl BufferPolicy for Limited
{
	fn take_buffer(&mut self, vc:usize, counters:&OccupancyCounters) -> Result<(),Error>
	{
		self.shared.take_buffer(vc,counters)?;
		self.active_vcs+=1;
		if self.active_vcs>self.vcs
		{
			return Err(Error::buffer_overflow(source_location!(),Some(vc)).with_message(format!("{} active virtual channels of {}",self.active_vcs,self.vcs)));
		}
		self.recompute_limit();
		Ok(())
	}
	fn sending_flit(&mut self, flit:&Flit, counters:&OccupancyCounters, now:Time) -> Result<(),Error>
	{
		self.shared.sending_flit(flit,counters,now)?;
		if flit.tail
		{
			if self.active_vcs==0
			{
				return Err(Error::buffer_underflow(source_location!(),Some(flit.vc)).with_message("no active virtual channels".to_string()));
			}
			self.active_vcs-=1;
			self.recompute_limit();
		}
		Ok(())
	}
	fn free_slot_for(&mut self, vc:usize, counters:&OccupancyCounters, now:Time) -> Result<(),Error>
	{
		self.shared.free_slot_for(vc,counters,now)
	}
	fn is_full_for(&self, vc:usize, counters:&OccupancyCounters, now:Time) -> bool
	{
		self.shared.is_full_for(vc,counters,now) || counters.occupancy_for(vc)>=self.max_held_slots
	}
	fn available_for(&self, vc:usize, counters:&OccupancyCounters, now:Time) -> i64
	{
		self.shared.available_for(vc,counters,now).min(self.max_held_slots as i64 - counters.occupancy_for(vc) as i64)
	}
	fn limit_for(&self, vc:usize, counters:&OccupancyCounters, now:Time) -> i64
	{
		self.shared.limit_for(vc,counters,now).min(self.max_held_slots as i64)
	}
}

#[cfg(test)]
mod tests
{
	use super::*;
	use crate::buffer_state::tests::{config,flit};
	use crate::buffer_state::BufferState;
	use crate::error::ErrorKind;
	fn empty_view() -> BufferState
	{
		BufferState::new(&config("private")).unwrap()
	}
	#[test]
	fn dynamic_divides_among_active()
	{
		let view=empty_view();
		let mut policy=Limited::new(&config("dynamic"),LimitMode::Dynamic).unwrap();
		assert_eq!(policy.max_held_slots(),16);
		for active in 1..=4
		{
			policy.take_buffer(active-1,view.counters()).unwrap();
			assert_eq!(policy.max_held_slots(),16/active);
		}
		policy.sending_flit(&flit(0,true,true),view.counters(),0).unwrap();
		assert_eq!(policy.active_vcs(),3);
		assert_eq!(policy.max_held_slots(),16/3);
	}
	#[test]
	fn shifting_halves()
	{
		let view=empty_view();
		let mut policy=Limited::new(&config("shifting"),LimitMode::Shifting).unwrap();
		let expected=[16,8,4,4];
		for active in 1..=4
		{
			policy.take_buffer(active-1,view.counters()).unwrap();
			assert_eq!(policy.max_held_slots(),expected[active-1]);
		}
	}
	#[test]
	fn caps_that_reach_zero_are_rejected()
	{
		let mut small=config("dynamic");
		small.num_vcs=3;
		small.buf_size=Some(3);
		assert!(Limited::new(&small,LimitMode::Dynamic).is_ok());
		match Limited::new(&small,LimitMode::Shifting)
		{
			Err(Error{kind:ErrorKind::IncompatibleConfiguration,..}) => (),
			_ => panic!("shifting with 3 slots for 3 virtual channels must be rejected"),
		}
		small.buf_size=Some(4);
		let mut policy=Limited::new(&small,LimitMode::Shifting).unwrap();
		let view=BufferState::new(&small).unwrap();
		for vc in 0..3
		{
			policy.take_buffer(vc,view.counters()).unwrap();
			assert!(policy.max_held_slots()>0);
		}
		small.buf_size=Some(2);
		match Limited::new(&small,LimitMode::Dynamic)
		{
			Err(Error{kind:ErrorKind::IncompatibleConfiguration,..}) => (),
			_ => panic!("dynamic with 2 slots for 3 virtual channels must be rejected"),
		}
		let mut zero=config("limited");
		zero.max_held_slots=Some(0);
		match BufferState::new(&zero)
		{
			Err(Error{kind:ErrorKind::IncompatibleConfiguration,..}) => (),
			_ => panic!("max_held_slots 0 must be rejected"),
		}
	}
	#[test]
	fn fixed_cap_limits_a_single_vc()
	{
		let mut config=config("limited");
		config.private_buf_size=vec![Some(0)];
		config.max_held_slots=Some(3);
		let mut state=BufferState::new(&config).unwrap();
		state.take_buffer(2,0).unwrap();
		for _ in 0..3
		{
			assert!(!state.is_full_for(2,0));
			state.sending_flit(&flit(2,false,false),0).unwrap();
		}
		assert!(state.is_full_for(2,0));
		assert_eq!(state.available_for(2,0),0);
		assert_eq!(state.available_for(1,0),3);
		assert_eq!(state.limit_for(1,0),3);
	}
}
