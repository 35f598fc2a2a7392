
use quantifiable_derive::Quantifiable;//the derive macro
use crate::config::RouterConfiguration;
use crate::error::Error;
use crate::flit::Flit;
use crate::source_location;
use crate::Time;
use super::{BufferPolicy,OccupancyCounters};

/// Each virtual channel gets an equal and fixed part of the buffer.
#[derive(Clone,Debug,Quantifiable)]
pub struct Private
{
	vc_buf_size: usize,
}

impl Private
{
	pub fn new(config:&RouterConfiguration) -> Result<Private,Error>
	{
		let vc_buf_size = match config.buf_size
		{
			Some(buf_size) => buf_size/config.num_vcs,
			None => config.vc_buf_size,
		};
		if vc_buf_size==0
		{
			return Err(Error::incompatible_configuration(source_location!()).with_message(format!("{} virtual channels do not fit in the buffer",config.num_vcs)));
		}
		Ok(Private{vc_buf_size})
	}
}

impl BufferPolicy for Private
{
	fn sending_flit(&mut self, flit:&Flit, counters:&OccupancyCounters, _now:Time) -> Result<(),Error>
	{
		if counters.occupancy_for(flit.vc)>self.vc_buf_size
		{
			return Err(Error::buffer_overflow(source_location!(),Some(flit.vc)));
		}
		Ok(())
	}
	fn is_full_for(&self, vc:usize, counters:&OccupancyCounters, _now:Time) -> bool
	{
		counters.occupancy_for(vc)>=self.vc_buf_size
	}
	fn available_for(&self, vc:usize, counters:&OccupancyCounters, _now:Time) -> i64
	{
		self.vc_buf_size as i64 - counters.occupancy_for(vc) as i64
	}
	fn limit_for(&self, _vc:usize, _counters:&OccupancyCounters, _now:Time) -> i64
	{
		self.vc_buf_size as i64
	}
}

#[cfg(test)]
mod tests
{
	use crate::buffer_state::BufferState;
	use crate::buffer_state::tests::{config,flit};
	use crate::error::{Error,ErrorKind};
	#[test]
	fn full_exactly_at_the_share()
	{
		let mut state=BufferState::new(&config("private")).unwrap();
		state.take_buffer(0,0).unwrap();
		for sent in 0..4
		{
			assert!(!state.is_full_for(0,0));
			assert_eq!(state.available_for(0,0),4-sent);
			state.sending_flit(&flit(0,sent==0,false),0).unwrap();
		}
		assert!(state.is_full_for(0,0));
		assert_eq!(state.available_for(0,0),0);
		assert!(!state.is_full_for(1,0));
		match state.sending_flit(&flit(0,false,true),0)
		{
			Err(Error{kind:ErrorKind::BufferOverflow{vc:Some(0)},..}) => (),
			_ => panic!("sent beyond the private share"),
		}
	}
}
