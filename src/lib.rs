/*!
encaminador
=====

This crate provides a cycle-accurate model of an input-queued virtual-channel router, the building block of interconnection network simulators.
A router is advanced one cycle at a time through its pipeline of routing, virtual channel allocation, switch allocation and switch traversal,
with credit based flow control towards the next routers.

# Usage

To use it add `encaminador` to your dependencies in your project's `Cargo.toml`.

```toml
[dependencies]
encaminador = "0.1"
```

# Public Interface

* [router::new_router] builds a router from its configuration. [router::input_queued::InputQueued] is the included router.
* [allocator::new_allocator] and [arbiter::new_arbiter] build the allocators and arbiters used by the routers, which may also be used on their own.
* [buffer_state::BufferState] tracks the occupancy of the buffer at the other end of an output under a sharing policy.
* [delay::DelayConfig] gives the delay of each operation of each router, synchronous or with random variation, and optionally power gating.
* [simulation::Simulation] wires routers together with [channel::Channel]s and drives them cycle by cycle.

Every failure of an invariant of the model is reported as an [error::Error] and aborts the simulation.

# Configuration Syntax

The configuration is parsed using the `gramatica` crate into a `ConfigurationValue`.

```ignore
pub enum ConfigurationValue
{
	Literal(String),
	Number(f64),
	Object(String,Vec<(String,ConfigurationValue)>),
	Array(Vec<ConfigurationValue>),
	Experiments(Vec<ConfigurationValue>),
	NamedExperiments(String,Vec<ConfigurationValue>),
	True,
	False,
	Where(Rc<ConfigurationValue>,Expr),
	Expression(Expr),
	None,
}
```

* An `Object` is typed `Name { key1 : value1, key2 : value2, [...] }`.
* An `Array` is typed `[value1, value2, value3, [...]]`.
* A `Number` can be written like 2 or 3.1. Stored as a `f64`.
* A `Literal` is a double-quoted string.
* `True` is written `true` and `False` is written `false`.

## Router example

```ignore
IQRouter
{
	num_vcs: 4,//virtual channels per port
	buf_size: 16,//slots of each input buffer, shared among its virtual channels
	buffer_policy: "private",//how the buffer is split among virtual channels
	routing_delay: 0,//lookahead routing
	vc_allocator: "islip(2)",//allocator name with its iterations
	sw_allocator: "separable_input_first(round_robin)",
	speculative: true,//request the switch while allocating the virtual channel
	hold_switch_for_packet: false,
}
```

The delays of each router are given apart:

```ignore
DelayConfig
{
	routers: 2,
	sw_alloc_delays: [1,2],
	asynchronous: [false,true],
	sw_alloc_std_devs: [0,1],
	seed: 42,
	gating: PowerGating { mode: 1, sleep_threshold: 10, break_even_threshold: 16 },
}
```

# Plugging

The builders receive a `&Plugs` argument that may be used to provide new implementations of `Router`, `RoutingFunction` and `Allocator`, selected by the name given in the configuration.

*/

#[macro_use]
pub mod quantify;
pub mod error;
pub mod config_parser;
pub mod config;
pub mod matrix;
pub mod flit;
pub mod delay_queue;
pub mod arbiter;
pub mod allocator;
pub mod route;
pub mod buffer;
pub mod buffer_state;
pub mod channel;
pub mod routing;
pub mod delay;
pub mod router;
pub mod simulation;

pub use quantifiable_derive::Quantifiable;//the derive macro

use std::rc::Rc;
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fmt::Debug;

use allocator::{Allocator,AllocatorBuilderArgument};
use error::Error;
use router::{Router,RouterBuilderArgument};
use routing::{RoutingFunction,RoutingBuilderArgument};

///Simulated time, in cycles.
pub type Time = u64;

#[derive(Default)]
pub struct Plugs
{
	routers: BTreeMap<String, fn(RouterBuilderArgument) -> Result<Rc<RefCell<dyn Router>>,Error> >,
	routings: BTreeMap<String, fn(RoutingBuilderArgument) -> Result<Box<dyn RoutingFunction>,Error> >,
	allocators: BTreeMap<String, fn(AllocatorBuilderArgument) -> Result<Box<dyn Allocator>,Error> >,
}

impl Plugs
{
	pub fn add_router(&mut self, key:String, builder:fn(RouterBuilderArgument) -> Result<Rc<RefCell<dyn Router>>,Error>)
	{
		self.routers.insert(key,builder);
	}
	pub fn add_routing(&mut self, key:String, builder:fn(RoutingBuilderArgument) -> Result<Box<dyn RoutingFunction>,Error>)
	{
		self.routings.insert(key,builder);
	}
	///The allocator is selected by its full name, including any parameters in parentheses.
	pub fn add_allocator(&mut self, key:String, builder:fn(AllocatorBuilderArgument) -> Result<Box<dyn Allocator>,Error>)
	{
		self.allocators.insert(key,builder);
	}
}

impl Debug for Plugs
{
	fn fmt(&self,f: &mut std::fmt::Formatter<'_>) -> std::result::Result<(), std::fmt::Error>
	{
		write!(f,"{};",self.routers.keys().map(|s|s.to_string()).collect::<Vec<String>>().join(","))?;
		write!(f,"{};",self.routings.keys().map(|s|s.to_string()).collect::<Vec<String>>().join(","))?;
		write!(f,"{};",self.allocators.keys().map(|s|s.to_string()).collect::<Vec<String>>().join(","))?;
		Ok(())
	}
}

#[cfg(test)]
mod tests
{
	use super::*;
	use crate::config::parse_configuration;
	use crate::delay::DelayConfig;
	use crate::config::RouterConfiguration;
	use crate::routing::{DestinationTag,new_routing_function};
	use crate::router::new_router;
	use crate::router::input_queued::InputQueued;
	fn two_vcs(_arg:RoutingBuilderArgument) -> Result<Box<dyn RoutingFunction>,Error>
	{
		Ok(Box::new(DestinationTag::with_vcs(2)))
	}
	fn renamed_router(arg:RouterBuilderArgument) -> Result<Rc<RefCell<dyn Router>>,Error>
	{
		let cv = parse_configuration("IQRouter{num_vcs:2}").unwrap();
		Ok(Rc::new(RefCell::new(InputQueued::new(RouterBuilderArgument{cv:&cv,..arg})?)))
	}
	#[test]
	fn plugged_builders_are_used()
	{
		let mut plugs = Plugs::default();
		plugs.add_routing("TwoVcs".to_string(),two_vcs);
		plugs.add_router("Renamed".to_string(),renamed_router);
		assert_eq!(format!("{:?}",plugs),"Renamed;TwoVcs;;");
		let routing_cv = parse_configuration("TwoVcs{}").unwrap();
		let routing = new_routing_function(RoutingBuilderArgument::new(&routing_cv,4,&plugs)).unwrap();
		let router_cv = parse_configuration("Renamed{}").unwrap();
		let delays = DelayConfig::synchronous(1,&RouterConfiguration::default());
		let router = new_router(RouterBuilderArgument{
			router_index: 0,
			inputs: 2,
			outputs: 2,
			cv: &router_cv,
			routing: routing.into(),
			delays: &delays,
			plugs: &plugs,
		}).unwrap();
		assert_eq!(router.borrow().num_virtual_channels(),2);
	}
}
