/*!

The input buffers of a router. Each input port has a [Buffer] holding a fixed number of [VirtualChannel]s, each being a FIFO of flits with its own allocation state.

A virtual channel walks the states

```ignore
idle -> routing -> vc_alloc -> active -> idle
idle -> vc_alloc  (the route was computed by the previous router)
active -> routing | vc_alloc  (the next packet is already queued behind the tail)
```

*/

use std::collections::VecDeque;
use std::fmt::{Display,Formatter};

use rand::rngs::StdRng;
use quantifiable_derive::Quantifiable;//the derive macro
use crate::config::RouterConfiguration;
use crate::error::Error;
use crate::flit::Flit;
use crate::route::OutputSet;
use crate::routing::{RouterInfo,RoutingFunction};
use crate::source_location;
use crate::Time;

#[derive(Clone,Copy,Debug,PartialEq,Eq,PartialOrd,Ord)]
pub enum VcState
{
	Idle,
	Routing,
	VcAlloc,
	Active,
}

quantifiable_simple!(VcState);

impl VcState
{
	///Whether the state machine allows going from `self` to `next`.
	pub fn can_change_to(self, next:VcState) -> bool
	{
		use VcState::*;
		match (self,next)
		{
			(Idle,Routing) | (Idle,VcAlloc) => true,
			(Routing,VcAlloc) => true,
			(VcAlloc,Active) => true,
			(Active,Idle) | (Active,Routing) | (Active,VcAlloc) => true,
			_ => false,
		}
	}
}

impl Display for VcState
{
	fn fmt(&self, formatter:&mut Formatter) -> std::fmt::Result
	{
		let name = match self
		{
			VcState::Idle => "idle",
			VcState::Routing => "routing",
			VcState::VcAlloc => "vc_alloc",
			VcState::Active => "active",
		};
		write!(formatter,"{}",name)
	}
}

/// How a virtual channel computes the priority it shows to the allocators.
#[derive(Clone,Copy,Debug,PartialEq,Eq)]
pub enum PriorityKind
{
	///Every flit has priority 0.
	None,
	///Older flits first. The priority of a flit is set on arrival.
	LocalAge,
	///The number of queued flits.
	QueueLength,
	///The number of hops of the flit.
	HopCount,
	///The priority set by the traffic source is kept.
	Other,
}

quantifiable_simple!(PriorityKind);

impl PriorityKind
{
	pub fn from_name(name:&str) -> PriorityKind
	{
		match name
		{
			"none" => PriorityKind::None,
			"local_age" => PriorityKind::LocalAge,
			"queue_length" => PriorityKind::QueueLength,
			"hop_count" => PriorityKind::HopCount,
			_ => PriorityKind::Other,
		}
	}
}

/// A queue of flits of an input port, together with the allocation state of the packet at its front.
#[derive(Clone,Debug,Quantifiable)]
pub struct VirtualChannel
{
	///Index inside its buffer.
	index: usize,
	flits: VecDeque<Flit>,
	state: VcState,
	///The candidates computed by the routing stage.
	route_set: OutputSet,
	///Output port and output virtual channel granted by the VC allocation.
	output: Option<(usize,usize)>,
	priority_kind: PriorityKind,
	priority: i64,
	///Show the highest priority among the queued flits instead of the one of the front flit.
	priority_donation: bool,
	watched: bool,
}

impl VirtualChannel
{
	pub fn new(index:usize, config:&RouterConfiguration) -> VirtualChannel
	{
		VirtualChannel{
			index,
			flits: VecDeque::new(),
			state: VcState::Idle,
			route_set: OutputSet::new(),
			output: None,
			priority_kind: PriorityKind::from_name(&config.priority),
			priority: 0,
			priority_donation: config.vc_priority_donation,
			watched: false,
		}
	}
	pub fn index(&self) -> usize
	{
		self.index
	}
	///Queue a flit arriving at cycle `now`.
	pub fn add_flit(&mut self, mut flit:Flit, now:Time)
	{
		match self.priority_kind
		{
			PriorityKind::LocalAge => flit.priority = i64::MAX - now as i64,
			PriorityKind::HopCount => flit.priority = flit.hops as i64,
			PriorityKind::None => flit.priority = 0,
			PriorityKind::QueueLength | PriorityKind::Other => (),
		}
		if self.watched || flit.watch
		{
			log::trace!("flit {} of packet {} queued into vc {} at cycle {}",flit.id,flit.packet,self.index,now);
		}
		self.flits.push_back(flit);
		self.update_priority();
	}
	pub fn front_flit(&self) -> Option<&Flit>
	{
		self.flits.front()
	}
	pub fn front_flit_mut(&mut self) -> Option<&mut Flit>
	{
		self.flits.front_mut()
	}
	///Extract the front flit. It is an error to extract from an empty or idle virtual channel.
	pub fn remove_flit(&mut self) -> Result<Flit,Error>
	{
		if self.state==VcState::Idle
		{
			return Err(Error::idle_virtual_channel(source_location!(),self.index));
		}
		let flit = self.flits.pop_front().ok_or_else(||Error::empty_virtual_channel(source_location!(),self.index))?;
		self.update_priority();
		Ok(flit)
	}
	pub fn is_empty(&self) -> bool
	{
		self.flits.is_empty()
	}
	pub fn occupancy(&self) -> usize
	{
		self.flits.len()
	}
	pub fn state(&self) -> VcState
	{
		self.state
	}
	pub fn set_state(&mut self, state:VcState) -> Result<(),Error>
	{
		if !self.state.can_change_to(state)
		{
			return Err(Error::invalid_state_transition(source_location!(),self.state,state).with_message(format!("virtual channel {}",self.index)));
		}
		if self.watched
		{
			log::debug!("virtual channel {} changed from {} to {}",self.index,self.state,state);
		}
		self.state=state;
		Ok(())
	}
	pub fn route_set(&self) -> &OutputSet
	{
		&self.route_set
	}
	pub fn set_route_set(&mut self, route_set:OutputSet)
	{
		self.route_set=route_set;
		self.output=None;
	}
	pub fn set_output(&mut self, port:usize, vc:usize)
	{
		self.output=Some((port,vc));
	}
	pub fn output(&self) -> Option<(usize,usize)>
	{
		self.output
	}
	pub fn output_port(&self) -> Option<usize>
	{
		self.output.map(|(port,_)|port)
	}
	pub fn output_vc(&self) -> Option<usize>
	{
		self.output.map(|(_,vc)|vc)
	}
	pub fn priority(&self) -> i64
	{
		self.priority
	}
	pub fn update_priority(&mut self)
	{
		self.priority = match self.priority_kind
		{
			PriorityKind::QueueLength => self.flits.len() as i64,
			PriorityKind::None => 0,
			PriorityKind::LocalAge => self.flits.front().map(|f|f.priority).unwrap_or(0),
			PriorityKind::HopCount | PriorityKind::Other =>
			{
				if self.priority_donation
				{
					self.flits.iter().map(|f|f.priority).max().unwrap_or(0)
				}
				else
				{
					self.flits.front().map(|f|f.priority).unwrap_or(0)
				}
			}
		};
	}
	///Compute the route of the front flit into `route_set`.
	pub fn route(&mut self, routing:&dyn RoutingFunction, router:&RouterInfo, in_channel:usize, rng:&mut StdRng)
	{
		let mut route_set = OutputSet::new();
		if let Some(flit) = self.flits.front_mut()
		{
			route_set = routing.route(router,flit,in_channel,false,rng);
			if flit.watch
			{
				log::debug!("router {} routed flit {} to {:?}",router.index,flit.id,route_set.candidates());
			}
		}
		self.set_route_set(route_set);
	}
	pub fn set_watch(&mut self, watch:bool)
	{
		self.watched=watch;
	}
	pub fn is_watched(&self) -> bool
	{
		self.watched
	}
	pub fn iter_flits(&self) -> impl Iterator<Item=&Flit>
	{
		self.flits.iter()
	}
}

/// The storage of an input port, shared by its virtual channels up to `size` flits.
#[derive(Clone,Debug,Quantifiable)]
pub struct Buffer
{
	occupancy: usize,
	size: usize,
	vcs: Vec<VirtualChannel>,
}

impl Buffer
{
	pub fn new(config:&RouterConfiguration) -> Buffer
	{
		Buffer{
			occupancy: 0,
			size: config.total_buffer_size(),
			vcs: (0..config.num_vcs).map(|index|VirtualChannel::new(index,config)).collect(),
		}
	}
	///Queue a flit into the virtual channel `vc`. Overflowing the buffer is an error.
	pub fn add_flit(&mut self, vc:usize, flit:Flit, now:Time) -> Result<(),Error>
	{
		if self.occupancy>=self.size
		{
			return Err(Error::buffer_overflow(source_location!(),Some(vc)).with_message(format!("input buffer of {} slots",self.size)));
		}
		self.occupancy+=1;
		self.vcs[vc].add_flit(flit,now);
		Ok(())
	}
	pub fn remove_flit(&mut self, vc:usize) -> Result<Flit,Error>
	{
		let flit = self.vcs[vc].remove_flit()?;
		self.occupancy-=1;
		Ok(flit)
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
		self.vcs.len()
	}
	pub fn vc(&self, vc:usize) -> &VirtualChannel
	{
		&self.vcs[vc]
	}
	pub fn vc_mut(&mut self, vc:usize) -> &mut VirtualChannel
	{
		&mut self.vcs[vc]
	}
	pub fn front_flit(&self, vc:usize) -> Option<&Flit>
	{
		self.vcs[vc].front_flit()
	}
	pub fn state(&self, vc:usize) -> VcState
	{
		self.vcs[vc].state()
	}
	pub fn set_state(&mut self, vc:usize, state:VcState) -> Result<(),Error>
	{
		self.vcs[vc].set_state(state)
	}
}

#[cfg(test)]
mod tests
{
	use super::*;
	use crate::error::ErrorKind;
	fn config(priority:&str, donation:bool) -> RouterConfiguration
	{
		RouterConfiguration{
			num_vcs: 2,
			vc_buf_size: 2,
			priority: priority.to_string(),
			vc_priority_donation: donation,
			..RouterConfiguration::default()
		}
	}
	fn flit(id:usize, priority:i64) -> Flit
	{
		let mut flit=Flit::new(id,0);
		flit.priority=priority;
		flit
	}
	#[test]
	fn state_machine()
	{
		let mut vc=VirtualChannel::new(0,&config("none",false));
		assert_eq!(vc.state(),VcState::Idle);
		match vc.set_state(VcState::Active)
		{
			Err(Error{kind:ErrorKind::InvalidStateTransition{from:VcState::Idle,to:VcState::Active},..}) => (),
			_ => panic!("idle went straight to active"),
		}
		vc.set_state(VcState::Routing).unwrap();
		vc.set_state(VcState::VcAlloc).unwrap();
		assert!(vc.set_state(VcState::Routing).is_err());
		vc.set_state(VcState::Active).unwrap();
		vc.set_state(VcState::Idle).unwrap();
	}
	#[test]
	fn no_removal_from_idle_or_empty()
	{
		let mut vc=VirtualChannel::new(1,&config("none",false));
		vc.add_flit(flit(0,0),0);
		match vc.remove_flit()
		{
			Err(Error{kind:ErrorKind::IdleVirtualChannel{vc:1},..}) => (),
			_ => panic!("removed from an idle virtual channel"),
		}
		vc.set_state(VcState::VcAlloc).unwrap();
		assert_eq!(vc.remove_flit().unwrap().id,0);
		match vc.remove_flit()
		{
			Err(Error{kind:ErrorKind::EmptyVirtualChannel{vc:1},..}) => (),
			_ => panic!("removed from an empty virtual channel"),
		}
	}
	#[test]
	fn priorities()
	{
		let mut age=VirtualChannel::new(0,&config("local_age",false));
		age.add_flit(flit(0,99),10);
		age.add_flit(flit(1,99),12);
		assert_eq!(age.priority(),i64::MAX-10);
		let mut length=VirtualChannel::new(0,&config("queue_length",false));
		length.add_flit(flit(0,0),0);
		length.add_flit(flit(1,0),0);
		assert_eq!(length.priority(),2);
		let mut donated=VirtualChannel::new(0,&config("other",true));
		donated.add_flit(flit(0,1),0);
		donated.add_flit(flit(1,7),0);
		assert_eq!(donated.priority(),7);
		let mut plain=VirtualChannel::new(0,&config("other",false));
		plain.add_flit(flit(0,1),0);
		plain.add_flit(flit(1,7),0);
		assert_eq!(plain.priority(),1);
	}
	#[test]
	fn buffer_overflow_is_an_error()
	{
		let mut buffer=Buffer::new(&config("none",false));
		assert_eq!(buffer.size(),4);
		for id in 0..4
		{
			buffer.add_flit(id%2,flit(id,0),0).unwrap();
		}
		match buffer.add_flit(0,flit(4,0),0)
		{
			Err(Error{kind:ErrorKind::BufferOverflow{vc:Some(0)},..}) => (),
			_ => panic!("the buffer accepted a fifth flit"),
		}
		buffer.set_state(1,VcState::VcAlloc).unwrap();
		assert_eq!(buffer.remove_flit(1).unwrap().id,1);
		assert_eq!(buffer.occupancy(),3);
	}
}
