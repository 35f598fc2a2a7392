
use quantifiable_derive::Quantifiable;//the derive macro
use crate::config::RouterConfiguration;
use crate::error::Error;
use crate::flit::Flit;
use crate::source_location;
use crate::Time;
use super::{BufferPolicy,OccupancyCounters};

/**
The buffer is split into private buffers, each serving a range of virtual channels, and a shared region with the remaining slots.
A flit is counted in the private buffer of its virtual channel while it has room, and in the shared region otherwise.

When a credit leaves empty a virtual channel still in use by a packet, its slot is kept reserved for that virtual channel instead of being returned, until the tail of the packet is sent.

Configuration: `private_bufs` (default one per virtual channel), `private_buf_size` (default an even split of `buf_size`; a list gives one size per private buffer, the last one repeated),
`private_buf_start_vc` and `private_buf_end_vc` (default consecutive ranges of the same length).
**/
#[derive(Clone,Debug,Quantifiable)]
pub struct Shared
{
	buf_size: usize,
	///The private buffer of each virtual channel.
	private_buf_vc_map: Vec<usize>,
	private_buf_size: Vec<usize>,
	private_buf_occupancy: Vec<usize>,
	shared_buf_size: usize,
	shared_buf_occupancy: usize,
	reserved_slots: Vec<usize>,
}

impl Shared
{
	pub fn new(config:&RouterConfiguration) -> Result<Shared,Error>
	{
		let vcs=config.num_vcs;
		let num_private_bufs = match config.private_bufs
		{
			None => vcs,
			Some(0) => 1,
			Some(n) => n,
		};
		let buf_size=config.total_buffer_size();
		let mut private_buf_size:Vec<usize> = config.private_buf_size.iter().map(|size|size.unwrap_or(buf_size/num_private_bufs)).collect();
		let last = private_buf_size.last().cloned().unwrap_or(buf_size/num_private_bufs);
		private_buf_size.resize(num_private_bufs,last);
		let start_vc:Vec<usize> = if config.private_buf_start_vc.is_empty() { (0..num_private_bufs).map(|i|i*vcs/num_private_bufs).collect() } else { config.private_buf_start_vc.clone() };
		let end_vc:Vec<usize> = if config.private_buf_end_vc.is_empty() { (0..num_private_bufs).map(|i|(i+1)*vcs/num_private_bufs-1).collect() } else { config.private_buf_end_vc.clone() };
		if start_vc.len()!=num_private_bufs || end_vc.len()!=num_private_bufs
		{
			return Err(Error::incompatible_configuration(source_location!()).with_message(format!("the virtual channel ranges do not match the {} private buffers",num_private_bufs)));
		}
		let mut map=vec![None;vcs];
		for (index,(&start,&end)) in start_vc.iter().zip(end_vc.iter()).enumerate()
		{
			if start>end || end>=vcs
			{
				return Err(Error::incompatible_configuration(source_location!()).with_message(format!("bad virtual channel range {}..={} for private buffer {}",start,end,index)));
			}
			for vc in start..=end
			{
				if map[vc].is_some()
				{
					return Err(Error::incompatible_configuration(source_location!()).with_message(format!("virtual channel {} is in several private buffers",vc)));
				}
				map[vc]=Some(index);
			}
		}
		let private_buf_vc_map = map.into_iter().enumerate().map(|(vc,index)|index.ok_or_else(||Error::incompatible_configuration(source_location!()).with_message(format!("virtual channel {} has no private buffer",vc)))).collect::<Result<Vec<usize>,Error>>()?;
		let private_total:usize = private_buf_size.iter().sum();
		if private_total>buf_size
		{
			return Err(Error::incompatible_configuration(source_location!()).with_message(format!("the private buffers take {} slots of {}",private_total,buf_size)));
		}
		Ok(Shared{
			buf_size,
			private_buf_vc_map,
			private_buf_size,
			private_buf_occupancy: vec![0;num_private_bufs],
			shared_buf_size: buf_size-private_total,
			shared_buf_occupancy: 0,
			reserved_slots: vec![0;vcs],
		})
	}
	pub fn buf_size(&self) -> usize
	{
		self.buf_size
	}
	pub fn shared_occupancy(&self) -> usize
	{
		self.shared_buf_occupancy
	}
	pub fn reserved_slots(&self, vc:usize) -> usize
	{
		self.reserved_slots[vc]
	}
	fn process_free_slot(&mut self, vc:usize) -> Result<(),Error>
	{
		let index=self.private_buf_vc_map[vc];
		if self.private_buf_occupancy[index]==0
		{
			return Err(Error::buffer_underflow(source_location!(),Some(vc)).with_message(format!("private buffer {}",index)));
		}
		self.private_buf_occupancy[index]-=1;
		if self.private_buf_occupancy[index]>=self.private_buf_size[index]
		{
			if self.shared_buf_occupancy==0
			{
				return Err(Error::buffer_underflow(source_location!(),Some(vc)).with_message("shared buffer".to_string()));
			}
			self.shared_buf_occupancy-=1;
		}
		Ok(())
	}
}

impl BufferPolicy for Shared
{
	fn sending_flit(&mut self, flit:&Flit, _counters:&OccupancyCounters, _now:Time) -> Result<(),Error>
	{
		let vc=flit.vc;
		if self.reserved_slots[vc]>0
		{
			self.reserved_slots[vc]-=1;
		}
		else
		{
			let index=self.private_buf_vc_map[vc];
			self.private_buf_occupancy[index]+=1;
			if self.private_buf_occupancy[index]>self.private_buf_size[index]
			{
				self.shared_buf_occupancy+=1;
				if self.shared_buf_occupancy>self.shared_buf_size
				{
					return Err(Error::buffer_overflow(source_location!(),Some(vc)).with_message("shared buffer".to_string()));
				}
			}
		}
		if flit.tail
		{
			while self.reserved_slots[vc]>0
			{
				self.reserved_slots[vc]-=1;
				self.process_free_slot(vc)?;
			}
		}
		Ok(())
	}
	fn free_slot_for(&mut self, vc:usize, counters:&OccupancyCounters, _now:Time) -> Result<(),Error>
	{
		//Reserve before touching the private occupancy.
		if !counters.is_available_for(vc) && counters.is_empty_for(vc)
		{
			self.reserved_slots[vc]+=1;
			Ok(())
		}
		else
		{
			self.process_free_slot(vc)
		}
	}
	fn is_full_for(&self, vc:usize, _counters:&OccupancyCounters, _now:Time) -> bool
	{
		let index=self.private_buf_vc_map[vc];
		self.reserved_slots[vc]==0
			&& self.private_buf_occupancy[index]>=self.private_buf_size[index]
			&& self.shared_buf_occupancy>=self.shared_buf_size
	}
	fn available_for(&self, vc:usize, _counters:&OccupancyCounters, _now:Time) -> i64
	{
		let index=self.private_buf_vc_map[vc];
		let private_room = self.private_buf_size[index].saturating_sub(self.private_buf_occupancy[index]);
		(self.reserved_slots[vc] + private_room + (self.shared_buf_size-self.shared_buf_occupancy)) as i64
	}
	fn limit_for(&self, vc:usize, _counters:&OccupancyCounters, _now:Time) -> i64
	{
		let index=self.private_buf_vc_map[vc];
		(self.private_buf_size[index]+self.shared_buf_size) as i64
	}
}

#[cfg(test)]
mod tests
{
	use super::*;
	use crate::buffer_state::BufferState;
	use crate::buffer_state::tests::flit;
	use crate::flit::Credit;
	fn two_vcs() -> RouterConfiguration
	{
		RouterConfiguration{
			num_vcs: 2,
			buf_size: Some(8),
			buffer_policy: "shared".to_string(),
			private_buf_size: vec![Some(2)],
			..RouterConfiguration::default()
		}
	}
	#[test]
	fn the_shared_pool_is_used_after_the_private_part()
	{
		let mut state=BufferState::new(&two_vcs()).unwrap();
		state.take_buffer(0,0).unwrap();
		state.take_buffer(1,1).unwrap();
		for _ in 0..2
		{
			state.sending_flit(&flit(0,false,false),0).unwrap();
		}
		assert_eq!(state.available_for(0,0),4);
		for _ in 0..3
		{
			assert!(!state.is_full_for(0,0));
			state.sending_flit(&flit(0,false,false),0).unwrap();
		}
		assert!(!state.is_full_for(0,0));
		assert_eq!(state.available_for(1,0),3);
		state.sending_flit(&flit(0,false,false),0).unwrap();
		assert!(state.is_full_for(0,0));
		assert!(!state.is_full_for(1,0));
		assert_eq!(state.available_for(1,0),2);
		for _ in 0..2
		{
			state.sending_flit(&flit(1,false,false),0).unwrap();
		}
		assert!(state.is_full_for(1,0));
		assert_eq!(state.limit_for(1,0),6);
	}
	#[test]
	fn emptied_virtual_channels_keep_a_reserved_slot()
	{
		let mut state=BufferState::new(&two_vcs()).unwrap();
		state.take_buffer(0,0).unwrap();
		state.sending_flit(&flit(0,true,false),0).unwrap();
		state.process_credit(&Credit::for_vc(0),1).unwrap();
		// Empty but still in use: the slot stays counted, as reserved.
		assert_eq!(state.occupancy_for(0),0);
		assert_eq!(state.available_for(0,1),1+1+4);
		state.sending_flit(&flit(0,false,false),2).unwrap();
		assert_eq!(state.available_for(0,2),1+4);
		state.process_credit(&Credit::for_vc(0),3).unwrap();
		state.sending_flit(&flit(0,false,true),4).unwrap();
		assert_eq!(state.available_for(0,4),1+4);
		// Once the tail is sent the virtual channel is released and credits free the slot.
		state.process_credit(&Credit::for_vc(0),5).unwrap();
		assert_eq!(state.available_for(0,5),2+4);
	}
}
