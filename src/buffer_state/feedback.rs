
use std::collections::VecDeque;

use quantifiable_derive::Quantifiable;//the derive macro
use crate::config::RouterConfiguration;
use crate::error::Error;
use crate::flit::Flit;
use crate::source_location;
use crate::Time;
use super::{BufferPolicy,OccupancyCounters,Shared};

/**
A [Shared] buffer where each virtual channel is limited according to its round trip time.

Each virtual channel keeps a moving average of the cycles between sending a flit and receiving its credit, aged by `feedback_aging_scale`:
`rtt = ((rtt << scale) + last - rtt) >> scale`. Its slots are then limited to `max(2*min_latency - rtt + feedback_offset, 1)`, so that every cycle of round trip above twice the minimum latency takes one slot away.
While there are flits in flight, the limit also considers the time waited by the oldest of them.
**/
#[derive(Clone,Debug,Quantifiable)]
pub struct Feedback
{
	shared: Shared,
	aging_scale: u32,
	offset: i64,
	///The minimum round trip time of the channel.
	min_latency: i64,
	occupancy_limit: Vec<i64>,
	///Moving average of the round trip time. `None` until the first credit.
	round_trip_time: Vec<Option<i64>>,
	///Sending cycle of the flits in flight.
	flit_sent_time: Vec<VecDeque<Time>>,
	///Sum of the limits of all the virtual channels.
	total_mapped_size: i64,
}

impl Feedback
{
	pub fn new(config:&RouterConfiguration) -> Result<Feedback,Error>
	{
		let shared=Shared::new(config)?;
		let vcs=config.num_vcs;
		let buf_size=shared.buf_size() as i64;
		Ok(Feedback{
			shared,
			aging_scale: config.feedback_aging_scale,
			offset: config.feedback_offset,
			min_latency: 1,
			occupancy_limit: vec![buf_size;vcs],
			round_trip_time: vec![None;vcs],
			flit_sent_time: vec![VecDeque::new();vcs],
			total_mapped_size: buf_size*vcs as i64,
		})
	}
	pub fn round_trip_time(&self, vc:usize) -> Option<i64>
	{
		self.round_trip_time[vc]
	}
	pub fn total_mapped_size(&self) -> i64
	{
		self.total_mapped_size
	}
	fn compute_rtt(&self, vc:usize, last_rtt:i64) -> i64
	{
		match self.round_trip_time[vc]
		{
			None => last_rtt,
			Some(rtt) => ((rtt<<self.aging_scale) + last_rtt - rtt) >> self.aging_scale,
		}
	}
	fn compute_limit(&self, rtt:i64) -> i64
	{
		((self.min_latency<<1) - rtt + self.offset).max(1)
	}
	fn compute_max_slots(&self, vc:usize, now:Time) -> i64
	{
		let max_slots=self.occupancy_limit[vc];
		match self.flit_sent_time[vc].front()
		{
			Some(&sent) =>
			{
				let rtt=self.compute_rtt(vc,(now-sent) as i64);
				max_slots.min(self.compute_limit(rtt))
			},
			None => max_slots,
		}
	}
	fn record_sent(&mut self, vc:usize, now:Time)
	{
		self.flit_sent_time[vc].push_back(now);
	}
	///The credit of the oldest flit in flight has arrived.
	fn record_round_trip(&mut self, vc:usize, now:Time) -> Result<(),Error>
	{
		let sent=self.flit_sent_time[vc].pop_front().ok_or_else(||Error::buffer_underflow(source_location!(),Some(vc)).with_message("credit without flit in flight".to_string()))?;
		let last_rtt=(now-sent) as i64;
		let rtt=self.compute_rtt(vc,last_rtt);
		if self.round_trip_time[vc]!=Some(rtt)
		{
			log::trace!("round trip time estimate of virtual channel {} updated from {:?} to {}",vc,self.round_trip_time[vc],rtt);
		}
		self.round_trip_time[vc]=Some(rtt);
		let limit=self.compute_limit(rtt);
		self.total_mapped_size += limit-self.occupancy_limit[vc];
		self.occupancy_limit[vc]=limit;
		Ok(())
	}
}

impl BufferPolicy for Feedback
{
	fn sending_flit(&mut self, flit:&Flit, counters:&OccupancyCounters, now:Time) -> Result<(),Error>
	{
		self.shared.sending_flit(flit,counters,now)?;
		self.record_sent(flit.vc,now);
		Ok(())
	}
	fn free_slot_for(&mut self, vc:usize, counters:&OccupancyCounters, now:Time) -> Result<(),Error>
	{
		self.shared.free_slot_for(vc,counters,now)?;
		self.record_round_trip(vc,now)
	}
	fn is_full_for(&self, vc:usize, counters:&OccupancyCounters, now:Time) -> bool
	{
		self.shared.is_full_for(vc,counters,now) || counters.occupancy_for(vc) as i64>=self.compute_max_slots(vc,now)
	}
	fn available_for(&self, vc:usize, counters:&OccupancyCounters, now:Time) -> i64
	{
		self.shared.available_for(vc,counters,now).min(self.compute_max_slots(vc,now)-counters.occupancy_for(vc) as i64)
	}
	fn limit_for(&self, vc:usize, counters:&OccupancyCounters, now:Time) -> i64
	{
		self.shared.limit_for(vc,counters,now).min(self.compute_max_slots(vc,now))
	}
	fn set_min_latency(&mut self, min_latency:Time)
	{
		log::debug!("minimum latency of the feedback buffer policy set to {}",min_latency);
		self.min_latency=min_latency as i64;
	}
}

/// A [Feedback] policy that measures one flit at a time. The flits sent while a probe is in flight are not timed, and their credits are skipped until the one of the probe arrives.
#[derive(Clone,Debug,Quantifiable)]
pub struct SimpleFeedback
{
	feedback: Feedback,
	///Credits of untimed flits to skip before the credit of the probe.
	pending_credits: Vec<usize>,
}

impl SimpleFeedback
{
	pub fn new(config:&RouterConfiguration) -> Result<SimpleFeedback,Error>
	{
		Ok(SimpleFeedback{
			feedback: Feedback::new(config)?,
			pending_credits: vec![0;config.num_vcs],
		})
	}
	pub fn round_trip_time(&self, vc:usize) -> Option<i64>
	{
		self.feedback.round_trip_time(vc)
	}
}

impl BufferPolicy for SimpleFeedback
{
	fn sending_flit(&mut self, flit:&Flit, counters:&OccupancyCounters, now:Time) -> Result<(),Error>
	{
		let vc=flit.vc;
		if self.feedback.flit_sent_time[vc].is_empty()
		{
			//The flits ahead of the probe are in flight.
			self.pending_credits[vc]=counters.occupancy_for(vc).saturating_sub(1);
			self.feedback.sending_flit(flit,counters,now)
		}
		else
		{
			self.feedback.shared.sending_flit(flit,counters,now)
		}
	}
	fn free_slot_for(&mut self, vc:usize, counters:&OccupancyCounters, now:Time) -> Result<(),Error>
	{
		if !self.feedback.flit_sent_time[vc].is_empty() && self.pending_credits[vc]==0
		{
			return self.feedback.free_slot_for(vc,counters,now);
		}
		if self.pending_credits[vc]>0
		{
			self.pending_credits[vc]-=1;
		}
		self.feedback.shared.free_slot_for(vc,counters,now)
	}
	fn is_full_for(&self, vc:usize, counters:&OccupancyCounters, now:Time) -> bool
	{
		self.feedback.is_full_for(vc,counters,now)
	}
	fn available_for(&self, vc:usize, counters:&OccupancyCounters, now:Time) -> i64
	{
		self.feedback.available_for(vc,counters,now)
	}
	fn limit_for(&self, vc:usize, counters:&OccupancyCounters, now:Time) -> i64
	{
		self.feedback.limit_for(vc,counters,now)
	}
	fn set_min_latency(&mut self, min_latency:Time)
	{
		self.feedback.set_min_latency(min_latency);
	}
}

#[cfg(test)]
mod tests
{
	use super::*;
	use crate::buffer_state::BufferState;
	use crate::buffer_state::tests::{config,flit};
	use crate::flit::Credit;
	#[test]
	fn slow_credits_shrink_the_limit()
	{
		let mut state=BufferState::new(&config("feedback")).unwrap();
		state.set_min_latency(4);
		state.take_buffer(0,0).unwrap();
		// Nothing measured yet: the private share.
		assert_eq!(state.limit_for(0,0),4);
		state.sending_flit(&flit(0,true,false),0).unwrap();
		state.process_credit(&Credit::for_vc(0),6).unwrap();
		// rtt=6, limit=max(8-6,1)
		assert_eq!(state.limit_for(0,6),2);
		state.sending_flit(&flit(0,false,false),10).unwrap();
		state.process_credit(&Credit::for_vc(0),13).unwrap();
		// rtt=((6<<1)+3-6)>>1=4, limit=4
		assert_eq!(state.limit_for(0,13),4);
		// A flit waiting for long reduces the limit before its credit arrives.
		state.sending_flit(&flit(0,false,false),20).unwrap();
		assert_eq!(state.limit_for(0,40),1);
		assert!(state.is_full_for(0,40));
	}
	#[test]
	fn only_probes_are_timed()
	{
		let mut config=config("simplefeedback");
		config.feedback_aging_scale=0;
		let mut policy=SimpleFeedback::new(&config).unwrap();
		policy.set_min_latency(10);
		let mut state=BufferState::new(&crate::buffer_state::tests::config("private")).unwrap();
		// The counters come from a separate private view.
		state.take_buffer(0,0).unwrap();
		for sent in 0..3u64
		{
			state.sending_flit(&flit(0,sent==0,false),sent).unwrap();
			policy.sending_flit(&flit(0,sent==0,false),state.counters(),sent).unwrap();
		}
		// The first flit is the probe; the other two are untimed.
		assert_eq!(policy.pending_credits[0],0);
		state.process_credit(&Credit::for_vc(0),5).unwrap();
		policy.free_slot_for(0,state.counters(),5).unwrap();
		assert_eq!(policy.round_trip_time(0),Some(5));
		// Next flit is a new probe, with the two untimed flits ahead.
		state.sending_flit(&flit(0,false,false),6).unwrap();
		policy.sending_flit(&flit(0,false,false),state.counters(),6).unwrap();
		assert_eq!(policy.pending_credits[0],2);
		for cycle in 7..9u64
		{
			state.process_credit(&Credit::for_vc(0),cycle).unwrap();
			policy.free_slot_for(0,state.counters(),cycle).unwrap();
			assert_eq!(policy.round_trip_time(0),Some(5));
		}
		state.process_credit(&Credit::for_vc(0),9).unwrap();
		policy.free_slot_for(0,state.counters(),9).unwrap();
		// aging scale 0 keeps the last sample
		assert_eq!(policy.round_trip_time(0),Some(3));
	}
}
