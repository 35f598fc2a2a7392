/*!

The routers of the network. A router is advanced once per cycle by the [Simulation](crate::simulation::Simulation) in three phases:

* `read_inputs`, taking the flits and credits delivered by its channels;
* `evaluate`, advancing every pipeline stage;
* `write_outputs`, sending at most one flit through each output channel and one credit through each input channel.

see [`new_router`](fn.new_router.html) for the available routers.

*/

pub mod input_queued;

use std::rc::Rc;
use std::cell::RefCell;
use std::fmt::{Display,Formatter};

use quantifiable_derive::Quantifiable;//the derive macro
use crate::quantify::Quantifiable;
use crate::channel::{FlitChannel,CreditChannel};
use crate::config_parser::ConfigurationValue;
use crate::delay::DelayConfig;
use crate::error::Error;
use crate::routing::{RouterInfo,RoutingFunction};
use crate::simulation::SimulationContext;
use crate::source_location;
use crate::{Plugs,Time};
use self::input_queued::InputQueued;

///The interface that a router type must follow.
pub trait Router: Quantifiable
{
	///The index of the router in the network.
	fn index(&self) -> usize;
	///The router as seen by the routing functions.
	fn info(&self) -> RouterInfo;
	///To get the number of virtual channels the router uses.
	fn num_virtual_channels(&self) -> usize;
	///Attach the channel delivering flits into `port` together with the channel carrying its credits back.
	fn add_input_channel(&mut self, port:usize, flits:Rc<RefCell<FlitChannel>>, credits:Rc<RefCell<CreditChannel>>);
	///Attach the channel leaving from `port` together with the channel bringing its credits.
	fn add_output_channel(&mut self, port:usize, flits:Rc<RefCell<FlitChannel>>, credits:Rc<RefCell<CreditChannel>>);
	///Take the flits and credits delivered by the channels in the current cycle.
	fn read_inputs(&mut self, context:&mut SimulationContext) -> Result<(),Error>;
	///Advance the pipeline one cycle.
	fn evaluate(&mut self, context:&mut SimulationContext) -> Result<(),Error>;
	///Put the flits and credits ready to leave into the channels.
	fn write_outputs(&mut self, context:&mut SimulationContext) -> Result<(),Error>;
	///Whether the router received something or has pending work. An inactive router may be power gated.
	fn is_active(&self) -> bool;
	///Occupancy of every downstream virtual channel, indexed by `output*vcs+vc`.
	fn used_credits(&self) -> Vec<usize>;
	///Free slots of every downstream virtual channel, indexed by `output*vcs+vc`.
	fn free_credits(&self, now:Time) -> Vec<i64>;
	///Maximum slots each downstream virtual channel may currently hold, indexed by `output*vcs+vc`.
	fn max_credits(&self, now:Time) -> Vec<i64>;
	///Occupancy of the downstream buffer of an output.
	fn used_credit(&self, output:usize) -> usize;
	///Flits stored in the buffer of an input.
	fn buffer_occupancy(&self, input:usize) -> usize;
	fn statistics(&self) -> &RouterStatistics;
	///To optionally write router statistics into the simulation output.
	///Each router receives the aggregate of the statistics of the previous routers.
	///In the first router we have `statistics=None` and `router_index=0`.
	///In the last router we have `router_index+1==total_routers`, that may be used for final normalizations.
	fn aggregate_statistics(&self, statistics:Option<ConfigurationValue>, router_index:usize, total_routers:usize, cycle:Time) -> Option<ConfigurationValue>;
	///Clears all collected statistics
	fn reset_statistics(&mut self, next_cycle:Time);
}

///The argument of a builder function for `Router`s.
pub struct RouterBuilderArgument<'a>
{
	///The index of the router being created
	pub router_index: usize,
	pub inputs: usize,
	pub outputs: usize,
	///A ConfigurationValue::Object defining the router.
	pub cv: &'a ConfigurationValue,
	///The routing function of the network.
	pub routing: Rc<dyn RoutingFunction>,
	///The delays of every router. The router reads its nominal delays at construction.
	pub delays: &'a DelayConfig,
	///The user defined plugs. In case the router needs to create elements.
	pub plugs: &'a Plugs,
}

/**Creates a router from a configuration value.

* `IQRouter` or `InputQueued`: an input queued router with virtual channels, see [InputQueued]. The fields are those of [RouterConfiguration](crate::config::RouterConfiguration).
**/
pub fn new_router(arg:RouterBuilderArgument) -> Result<Rc<RefCell<dyn Router>>,Error>
{
	if let &ConfigurationValue::Object(ref cv_name, ref _cv_pairs)=arg.cv
	{
		if let Some(builder) = arg.plugs.routers.get(cv_name)
		{
			return builder(arg);
		}
		match cv_name.as_ref()
		{
			"IQRouter" | "InputQueued" => Ok(Rc::new(RefCell::new(InputQueued::new(arg)?))),
			_ => Err(Error::unknown_router(source_location!(),cv_name.to_string())),
		}
	}
	else
	{
		panic!("Trying to create a Router from a non-Object");
	}
}

/// Why a pipeline item could not advance in a cycle. The item stays in its stage and is evaluated again.
#[derive(Clone,Copy,Debug,PartialEq,Eq,PartialOrd,Ord)]
pub enum Stall
{
	///No requested downstream virtual channel is free.
	BufferBusy,
	///Lost the virtual channel allocation.
	BufferConflict,
	///The downstream virtual channel has no space.
	BufferFull,
	///The downstream virtual channel has no space of its own, but the downstream buffer is not full.
	BufferReserved,
	///Lost the switch allocation.
	CrossbarConflict,
}

quantifiable_simple!(Stall);

impl Stall
{
	pub const ALL: [Stall;5] = [Stall::BufferBusy,Stall::BufferConflict,Stall::BufferFull,Stall::BufferReserved,Stall::CrossbarConflict];
	pub fn index(self) -> usize
	{
		match self
		{
			Stall::BufferBusy => 0,
			Stall::BufferConflict => 1,
			Stall::BufferFull => 2,
			Stall::BufferReserved => 3,
			Stall::CrossbarConflict => 4,
		}
	}
	///Name used in the statistics.
	pub fn name(self) -> &'static str
	{
		match self
		{
			Stall::BufferBusy => "buffer_busy",
			Stall::BufferConflict => "buffer_conflict",
			Stall::BufferFull => "buffer_full",
			Stall::BufferReserved => "buffer_reserved",
			Stall::CrossbarConflict => "crossbar_conflict",
		}
	}
}

impl Display for Stall
{
	fn fmt(&self, formatter:&mut Formatter) -> std::fmt::Result
	{
		write!(formatter,"{}",self.name())
	}
}

/// Counters of a router since `begin_cycle`.
#[derive(Clone,Debug,Quantifiable)]
pub struct RouterStatistics
{
	pub begin_cycle: Time,
	///Items requeued for each stall, indexed by [Stall::index].
	pub stalls: Vec<u64>,
	///Sum over the active cycles of the flits waiting to be queued.
	pub queue_ticks: u64,
	///Sum over the active cycles of the items in the routing stage.
	pub route_ticks: u64,
	pub vc_alloc_ticks: u64,
	pub sw_alloc_ticks: u64,
	pub crossbar_ticks: u64,
	pub vc_grants: u64,
	pub sw_grants: u64,
	pub flits_received: u64,
	pub flits_sent: u64,
	pub credits_received: u64,
	pub credits_sent: u64,
	pub active_cycles: u64,
}

impl RouterStatistics
{
	pub fn new(begin_cycle:Time) -> RouterStatistics
	{
		RouterStatistics{
			begin_cycle,
			stalls: vec![0;Stall::ALL.len()],
			queue_ticks: 0,
			route_ticks: 0,
			vc_alloc_ticks: 0,
			sw_alloc_ticks: 0,
			crossbar_ticks: 0,
			vc_grants: 0,
			sw_grants: 0,
			flits_received: 0,
			flits_sent: 0,
			credits_received: 0,
			credits_sent: 0,
			active_cycles: 0,
		}
	}
	pub fn count_stall(&mut self, stall:Stall)
	{
		self.stalls[stall.index()]+=1;
	}
	pub fn stall_count(&self, stall:Stall) -> u64
	{
		self.stalls[stall.index()]
	}
	pub fn total_stalls(&self) -> u64
	{
		self.stalls.iter().sum()
	}
	/**
	Add these statistics to those of the previous routers, in an object named `name`.
	Counters are summed. Stage occupancies are averaged per cycle and, at the last router, per router.
	**/
	pub fn aggregate(&self, name:&str, statistics:Option<ConfigurationValue>, router_index:usize, total_routers:usize, cycle:Time) -> Option<ConfigurationValue>
	{
		let cycle_span = cycle.saturating_sub(self.begin_cycle).max(1) as f64;
		let mut content : Vec<(String,f64)> = Stall::ALL.iter().map(|stall|(format!("{}_stalls",stall.name()),self.stall_count(*stall) as f64)).collect();
		let counters = [
			("vc_grants",self.vc_grants),
			("sw_grants",self.sw_grants),
			("flits_received",self.flits_received),
			("flits_sent",self.flits_sent),
			("credits_received",self.credits_received),
			("credits_sent",self.credits_sent),
			("active_cycles",self.active_cycles),
		];
		content.extend(counters.iter().map(|&(field,value)|(field.to_string(),value as f64)));
		let occupancies = [
			("average_queue_occupancy",self.queue_ticks),
			("average_route_occupancy",self.route_ticks),
			("average_vc_alloc_occupancy",self.vc_alloc_ticks),
			("average_sw_alloc_occupancy",self.sw_alloc_ticks),
			("average_crossbar_occupancy",self.crossbar_ticks),
		];
		content.extend(occupancies.iter().map(|&(field,value)|(field.to_string(),value as f64/cycle_span)));
		if let Some(previous)=statistics
		{
			if let ConfigurationValue::Object(cv_name,previous_pairs) = previous
			{
				if cv_name!=name
				{
					panic!("incompatible statistics, should be `{}` object not `{}`",name,cv_name);
				}
				for (ref field,ref value) in previous_pairs
				{
					let previous_value = match value
					{
						&ConfigurationValue::Number(x) => x,
						_ => panic!("The non-number {:?} cannot be added",value),
					};
					match content.iter_mut().find(|(f,_)|f==field)
					{
						Some(entry) => entry.1 += previous_value,
						None => panic!("Nothing to do with field {} in {} statistics",field,name),
					}
				}
			}
			else
			{
				panic!("received incompatible statistics");
			}
		}
		if router_index+1==total_routers
		{
			let factor=1f64 / total_routers as f64;
			for (field,value) in content.iter_mut()
			{
				if field.starts_with("average_")
				{
					*value *= factor;
				}
			}
		}
		let result_content = content.into_iter().map(|(field,value)|(field,ConfigurationValue::Number(value))).collect();
		Some(ConfigurationValue::Object(name.to_string(),result_content))
	}
}

#[cfg(test)]
mod tests
{
	use super::*;
	use crate::error::ErrorKind;
	use crate::config::parse_configuration;
	use crate::config::RouterConfiguration;
	use crate::routing::DestinationTag;
	fn number(cv:&ConfigurationValue, field:&str) -> f64
	{
		match cv
		{
			ConfigurationValue::Object(_,pairs) => match pairs.iter().find(|(f,_)|f==field)
			{
				Some((_,ConfigurationValue::Number(x))) => *x,
				_ => panic!("missing field {}",field),
			},
			_ => panic!("not an object"),
		}
	}
	#[test]
	fn statistics_are_summed_and_averaged()
	{
		let mut first=RouterStatistics::new(0);
		first.count_stall(Stall::CrossbarConflict);
		first.count_stall(Stall::CrossbarConflict);
		first.sw_grants=3;
		first.queue_ticks=10;
		let mut second=RouterStatistics::new(0);
		second.count_stall(Stall::BufferFull);
		second.sw_grants=1;
		second.queue_ticks=30;
		let partial=first.aggregate("InputQueued",None,0,2,10);
		let total=second.aggregate("InputQueued",partial,1,2,10).unwrap();
		assert_eq!(number(&total,"crossbar_conflict_stalls"),2.0);
		assert_eq!(number(&total,"buffer_full_stalls"),1.0);
		assert_eq!(number(&total,"sw_grants"),4.0);
		// (10/10 + 30/10) / 2 routers
		assert_eq!(number(&total,"average_queue_occupancy"),2.0);
	}
	#[test]
	fn unknown_router()
	{
		let cv=parse_configuration("OutputQueued{}").unwrap();
		let plugs=Plugs::default();
		let delays=DelayConfig::synchronous(1,&RouterConfiguration::default());
		let arg=RouterBuilderArgument{
			router_index: 0,
			inputs: 1,
			outputs: 1,
			cv: &cv,
			routing: Rc::new(DestinationTag::with_vcs(4)),
			delays: &delays,
			plugs: &plugs,
		};
		match new_router(arg)
		{
			Err(Error{kind:ErrorKind::UnknownRouter{..},..}) => (),
			_ => panic!("OutputQueued should not be a router"),
		}
	}
}
