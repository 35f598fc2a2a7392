/*!

The interface between the routers and the routing functions.

A routing function receives the router, the flit at the front of a virtual channel and the input port, and returns the candidate output ports with their ranges of virtual channels, see [OutputSet].
The routers call it in their routing stage or, with lookahead routing, one hop in advance on behalf of the next router.

see [`new_routing_function`](fn.new_routing_function.html) for the predefined routing functions.

*/

use rand::rngs::StdRng;
use quantifiable_derive::Quantifiable;//the derive macro
use crate::quantify::Quantifiable;
use crate::config_parser::ConfigurationValue;
use crate::error::Error;
use crate::flit::Flit;
use crate::route::OutputSet;
use crate::source_location;
use crate::{match_object_panic,Plugs};

/// What a routing function may know about a router.
#[derive(Clone,Copy,Debug,PartialEq,Eq,Quantifiable)]
pub struct RouterInfo
{
	pub index: usize,
	pub inputs: usize,
	pub outputs: usize,
}

///A routing algorithm. It may read and write the routing scratchpad of the flit (`phase`, `intermediate`).
pub trait RoutingFunction : Quantifiable
{
	///Compute the candidates of the flit at `router` having entered through `in_channel`. `inject` is set when the flit is entering the network.
	fn route(&self, router:&RouterInfo, flit:&mut Flit, in_channel:usize, inject:bool, rng:&mut StdRng) -> OutputSet;
}

///The argument of a builder function for `RoutingFunction`s.
#[non_exhaustive]
pub struct RoutingBuilderArgument<'a>
{
	///A ConfigurationValue::Object defining the routing.
	pub cv: &'a ConfigurationValue,
	///The number of virtual channels of the routers.
	pub num_vcs: usize,
	///The user defined plugs. In case the routing needs to create elements.
	pub plugs: &'a Plugs,
}

impl<'a> RoutingBuilderArgument<'a>
{
	pub fn new(cv:&'a ConfigurationValue, num_vcs:usize, plugs:&'a Plugs) -> RoutingBuilderArgument<'a>
	{
		RoutingBuilderArgument{cv,num_vcs,plugs}
	}
}

/**Build a new routing function.

* `DestinationTag { radix: r, classes: c }` sends the flit through port `(destination / r^hops) % r`, the digit of the destination for the current hop. Without `radix` the port is `destination % outputs`.
The virtual channels are split evenly among the `c` traffic classes (default 1), each class using its own range.
**/
pub fn new_routing_function(arg:RoutingBuilderArgument) -> Result<Box<dyn RoutingFunction>,Error>
{
	if let &ConfigurationValue::Object(ref cv_name, ref _cv_pairs)=arg.cv
	{
		if let Some(builder) = arg.plugs.routings.get(cv_name)
		{
			return builder(arg);
		}
		match cv_name.as_ref()
		{
			"DestinationTag" => Ok(Box::new(DestinationTag::new(arg))),
			_ => Err(Error::unknown_routing_function(source_location!(),cv_name.to_string())),
		}
	}
	else
	{
		panic!("Trying to create a RoutingFunction from a non-Object");
	}
}

/// Destination tag routing. The destination is read as a sequence of digits, one per hop.
#[derive(Debug,Quantifiable)]
pub struct DestinationTag
{
	radix: Option<usize>,
	classes: usize,
	num_vcs: usize,
}

impl DestinationTag
{
	pub fn new(arg:RoutingBuilderArgument) -> DestinationTag
	{
		let mut radix=None;
		let mut classes=1;
		match_object_panic!(arg.cv,"DestinationTag",value,
			"radix" => radix=Some(value.as_usize().expect("bad value for radix")),
			"classes" => classes=value.as_usize().expect("bad value for classes"),
		);
		assert!(classes>0 && classes<=arg.num_vcs,"DestinationTag needs between 1 and {} classes",arg.num_vcs);
		DestinationTag{
			radix,
			classes,
			num_vcs: arg.num_vcs,
		}
	}
	pub fn with_vcs(num_vcs:usize) -> DestinationTag
	{
		DestinationTag{
			radix: None,
			classes: 1,
			num_vcs,
		}
	}
}

impl RoutingFunction for DestinationTag
{
	fn route(&self, router:&RouterInfo, flit:&mut Flit, _in_channel:usize, _inject:bool, _rng:&mut StdRng) -> OutputSet
	{
		let port = match self.radix
		{
			Some(radix) => (flit.destination / radix.pow(flit.hops as u32)) % radix,
			None => flit.destination % router.outputs,
		};
		let class = flit.class % self.classes;
		let per_class = self.num_vcs/self.classes;
		let mut set=OutputSet::new();
		set.add_range(port,class*per_class,(class+1)*per_class-1,0);
		set
	}
}

#[cfg(test)]
mod tests
{
	use super::*;
	use rand::SeedableRng;
	use crate::config::parse_configuration;
	use crate::error::ErrorKind;
	#[test]
	fn destination_digits()
	{
		let cv=parse_configuration("DestinationTag{radix:4,classes:2}").unwrap();
		let plugs=Plugs::default();
		let routing=new_routing_function(RoutingBuilderArgument::new(&cv,4,&plugs)).unwrap();
		let router=RouterInfo{index:0,inputs:4,outputs:4};
		let mut rng=StdRng::seed_from_u64(1);
		let mut flit=Flit::new(0,0);
		flit.destination=2+4*3;
		flit.class=1;
		let set=routing.route(&router,&mut flit,0,true,&mut rng);
		assert_eq!(set.candidates().len(),1);
		let candidate=set.candidates()[0];
		assert_eq!((candidate.output_port,candidate.vc_start,candidate.vc_end),(2,2,3));
		flit.hops=1;
		assert_eq!(routing.route(&router,&mut flit,0,false,&mut rng).candidates()[0].output_port,3);
	}
	#[test]
	fn unknown_routing()
	{
		let cv=parse_configuration("Teleport{}").unwrap();
		let plugs=Plugs::default();
		match new_routing_function(RoutingBuilderArgument::new(&cv,4,&plugs))
		{
			Err(Error{kind:ErrorKind::UnknownRoutingFunction{..},..}) => (),
			_ => panic!("Teleport should not be a routing"),
		}
	}
}
